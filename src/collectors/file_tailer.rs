use crate::error::CollectorError;
use crate::events::LogEvent;
use log::{debug, info, warn};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self as std_mpsc, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc::Sender;

/// Access log tailer
///
/// Reads the existing content of a log file, then keeps following it as new
/// lines are appended. Each complete line is decoded into a `LogEvent` and
/// pushed into a bounded channel; a full channel blocks the reader, which is
/// the only backpressure between the tailer and the stats engine.
///
/// The reader thread owns the only sender of that channel, so stopping the
/// tailer closes the channel once the thread has exited.
pub struct FileTailer {
    /// File being followed
    path: PathBuf,
    /// Change notifications for `path`; dropping it wakes the reader thread
    watcher: Option<RecommendedWatcher>,
    /// Handle to the reader thread
    thread_handle: Option<JoinHandle<()>>,
    /// Cleared to ask the reader thread to exit
    running: Arc<AtomicBool>,
}

impl FileTailer {
    /// Open `path` and start following it
    ///
    /// # Arguments
    ///
    /// * `path` - Access log to follow
    /// * `channel` - Bounded channel that receives decoded events
    /// * `poll_interval` - Longest wait between reads when no change
    ///   notification arrives
    ///
    /// # Errors
    ///
    /// Returns `CollectorError::FileOpen` if the file cannot be opened and
    /// `CollectorError::Watch` if change notifications cannot be set up. In
    /// both cases no thread is started.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use logmonitor::collectors::FileTailer;
    /// use std::time::Duration;
    ///
    /// let (tx, _rx) = tokio::sync::mpsc::channel(256);
    /// let tailer = FileTailer::start("/tmp/access.log", tx, Duration::from_millis(500));
    /// ```
    pub fn start(
        path: impl Into<PathBuf>,
        channel: Sender<LogEvent>,
        poll_interval: Duration,
    ) -> Result<Self, CollectorError> {
        let path = path.into();
        let file = File::open(&path).map_err(|source| CollectorError::FileOpen {
            path: path.clone(),
            source,
        })?;

        let (change_tx, change_rx) = std_mpsc::channel();
        let mut watcher =
            notify::recommended_watcher(move |event: notify::Result<notify::Event>| match event {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let _ = change_tx.send(());
                }
                Ok(_) => {}
                Err(e) => warn!("Log file watch error: {}", e),
            })?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let thread_path = path.clone();
        let handle = thread::Builder::new()
            .name("log-tailer".to_string())
            .spawn(move || {
                Self::tail_thread(
                    LogReader::new(file, thread_path),
                    change_rx,
                    channel,
                    thread_running,
                    poll_interval,
                );
            })?;

        info!("FileTailer started on {}", path.display());
        Ok(Self {
            path,
            watcher: Some(watcher),
            thread_handle: Some(handle),
            running,
        })
    }

    /// Stop following the file and wait for the reader thread to exit
    ///
    /// Once this returns the event channel has no sender left.
    ///
    /// # Errors
    ///
    /// Returns `CollectorError::ThreadPanicked` if the reader thread panicked.
    pub fn stop(&mut self) -> Result<(), CollectorError> {
        self.running.store(false, Ordering::SeqCst);
        // Disconnects the change channel, waking the thread
        self.watcher.take();

        if let Some(handle) = self.thread_handle.take() {
            handle.join().map_err(|_| {
                CollectorError::ThreadPanicked(format!("tailer for {}", self.path.display()))
            })?;
            info!("FileTailer stopped on {}", self.path.display());
        }
        Ok(())
    }

    /// Check if the reader thread is still following the file
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Reader thread: read what is available, then wait for a change
    fn tail_thread(
        mut reader: LogReader,
        changes: Receiver<()>,
        channel: Sender<LogEvent>,
        running: Arc<AtomicBool>,
        poll_interval: Duration,
    ) {
        'tail: while running.load(Ordering::SeqCst) {
            if let Err(e) = reader.rewind_if_truncated() {
                warn!("Failed to stat {}: {}", reader.path.display(), e);
            }

            // One line in flight at a time: a full channel stops the reading
            loop {
                if !running.load(Ordering::SeqCst) {
                    break 'tail;
                }
                match reader.next_line() {
                    Ok(Some(line)) => {
                        if !Self::forward_line(&line, &channel) {
                            debug!("Event channel closed, stopping tailer");
                            break 'tail;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Failed to read {}: {}", reader.path.display(), e);
                        break;
                    }
                }
            }

            match changes.recv_timeout(poll_interval) {
                Ok(()) => {
                    // Coalesce a burst of notifications into one read
                    while changes.try_recv().is_ok() {}
                    debug!("Log file modified: {}", reader.path.display());
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        running.store(false, Ordering::SeqCst);
        info!("Log tailer thread finished");
    }

    /// Decode one line and push it downstream
    ///
    /// Returns `false` once the receiving side has gone away.
    fn forward_line(line: &str, channel: &Sender<LogEvent>) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return true;
        }
        match LogEvent::parse(line) {
            Ok(event) => channel.blocking_send(event).is_ok(),
            Err(e) => {
                // Malformed lines are dropped, the stream goes on
                debug!("Failed to parse log line: {}", e);
                true
            }
        }
    }
}

/// Signals the reader thread without joining it
///
/// The thread may be blocked on a full channel whose consumer cannot run
/// until this returns. It exits on its own once that send completes or the
/// receiver is dropped. Use `stop` to wait for it.
impl Drop for FileTailer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.watcher.take();
    }
}

/// Incremental line reader over a growing file
struct LogReader {
    reader: BufReader<File>,
    path: PathBuf,
    /// Bytes consumed so far
    offset: u64,
    /// Trailing bytes of a line whose newline has not been written yet
    partial: Vec<u8>,
}

impl LogReader {
    fn new(file: File, path: PathBuf) -> Self {
        Self {
            reader: BufReader::new(file),
            path,
            offset: 0,
            partial: Vec::new(),
        }
    }

    /// Start over from the beginning if the file shrank below what was read
    fn rewind_if_truncated(&mut self) -> io::Result<()> {
        let len = self.reader.get_ref().metadata()?.len();
        if len < self.offset {
            warn!(
                "{} shrank from {} to {} bytes, reading from the start",
                self.path.display(),
                self.offset,
                len
            );
            self.reader.seek(SeekFrom::Start(0))?;
            self.offset = 0;
            self.partial.clear();
        }
        Ok(())
    }

    /// Next complete line, or `None` once only a partial line is left
    fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let read = self.reader.read_until(b'\n', &mut self.partial)?;
            if read == 0 {
                return Ok(None);
            }
            self.offset += read as u64;
            if self.partial.last() == Some(&b'\n') {
                let line = String::from_utf8_lossy(&self.partial).into_owned();
                self.partial.clear();
                return Ok(Some(line));
            }
        }
    }
}
