/// Follows an access log file and decodes appended lines
pub mod file_tailer;

pub use file_tailer::FileTailer;
