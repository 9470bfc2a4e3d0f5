use std::fs::File;
use std::io;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Seek;
use std::io::SeekFrom;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::errors::Result;
use crate::errors::TailError;

/// Default delay between read attempts once the end of the file is reached
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Follows a growing text file from its end, yielding complete lines
///
/// Content present before `open` is never returned. A trailing line without a
/// terminator is buffered until the writer finishes it.
pub struct LogTailer {
    path: PathBuf,
    reader: BufReader<File>,
    /// Bytes of the line currently being assembled
    pending: Vec<u8>,
    /// Offset of the next byte to read
    position: u64,
    poll_interval: Duration,
}

impl LogTailer {
    /// Open `path` and position the reader at its current end
    pub fn open<P: AsRef<Path>>(path: P, poll_interval: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).map_err(|source| TailError::Open { path: path.clone(), source })?;
        let position = file.seek(SeekFrom::End(0)).map_err(|source| TailError::Open { path: path.clone(), source })?;

        info!("Tailing {} from offset {position}", path.display());

        Ok(Self { path, reader: BufReader::new(file), pending: Vec::with_capacity(256), position, poll_interval })
    }

    /// Wait for the next complete line
    ///
    /// Returns `Ok(None)` once `running` is cleared. The flag is checked before
    /// every read attempt, so lines still waiting in the file are left unread.
    pub fn next_line(&mut self, running: &AtomicBool) -> Result<Option<String>> {
        loop {
            if !running.load(Ordering::Relaxed) {
                return Ok(None);
            }

            if let Some(line) = self.try_read_line() {
                return Ok(Some(line));
            }

            std::thread::sleep(self.poll_interval);
            self.check_file()?;
        }
    }

    /// Consume the tailer as an iterator that ends on stop or terminal error
    pub fn lines(self, running: &AtomicBool) -> TailLines<'_> {
        TailLines { tailer: self, running, finished: false }
    }

    /// One non-blocking read attempt
    fn try_read_line(&mut self) -> Option<String> {
        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) => None,
            Ok(read) => {
                self.position += read as u64;
                if self.pending.last() != Some(&b'\n') {
                    // Writer has not finished this line yet
                    return None;
                }
                let line = String::from_utf8_lossy(&self.pending).trim_end_matches(['\n', '\r']).to_string();
                self.pending.clear();
                Some(line)
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => None,
            Err(err) => {
                debug!("Read from {} failed, retrying: {err}", self.path.display());
                None
            }
        }
    }

    /// Detect removal or in-place truncation of the followed file
    fn check_file(&mut self) -> Result<()> {
        match std::fs::metadata(&self.path) {
            Ok(metadata) if metadata.len() < self.position => {
                warn!("{} shrank from {} to {} bytes, continuing from the new end", self.path.display(), self.position, metadata.len());
                self.restart_at_end();
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(TailError::FileRemoved { path: self.path.clone() }),
            Err(err) => {
                debug!("Could not stat {}, retrying: {err}", self.path.display());
                Ok(())
            }
        }
    }

    fn restart_at_end(&mut self) {
        match self.reader.seek(SeekFrom::End(0)) {
            Ok(position) => {
                self.position = position;
                self.pending.clear();
            }
            Err(err) => debug!("Seek in {} failed, retrying: {err}", self.path.display()),
        }
    }
}

/// Iterator over appended lines, see [`LogTailer::lines`]
pub struct TailLines<'a> {
    tailer: LogTailer,
    running: &'a AtomicBool,
    finished: bool,
}

impl Iterator for TailLines<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.tailer.next_line(self.running) {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use super::*;

    const POLL: Duration = Duration::from_millis(5);

    fn append(path: &Path, text: &str) {
        let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file.flush().unwrap();
    }

    #[test]
    fn test_skips_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.txt");
        std::fs::write(&path, "old line 1\nold line 2\n").unwrap();

        let mut tailer = LogTailer::open(&path, POLL).unwrap();
        append(&path, "new line\n");

        let running = AtomicBool::new(true);
        assert_eq!(tailer.next_line(&running).unwrap().as_deref(), Some("new line"));
    }

    #[test]
    fn test_yields_lines_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.txt");
        std::fs::write(&path, "").unwrap();

        let mut tailer = LogTailer::open(&path, POLL).unwrap();
        append(&path, "first\r\nsecond\nthird\n");

        let running = AtomicBool::new(true);
        assert_eq!(tailer.next_line(&running).unwrap().as_deref(), Some("first"));
        assert_eq!(tailer.next_line(&running).unwrap().as_deref(), Some("second"));
        assert_eq!(tailer.next_line(&running).unwrap().as_deref(), Some("third"));
    }

    #[test]
    fn test_partial_line_is_buffered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.txt");
        std::fs::write(&path, "").unwrap();

        let mut tailer = LogTailer::open(&path, POLL).unwrap();
        append(&path, "2024/12/18 21:14:07 1 ff [INFO ");
        assert_eq!(tailer.try_read_line(), None);

        append(&path, "Client 1] [SHADER] Delay: OFF\n");
        assert_eq!(tailer.try_read_line().as_deref(), Some("2024/12/18 21:14:07 1 ff [INFO Client 1] [SHADER] Delay: OFF"));
    }

    #[test]
    fn test_stops_when_flag_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.txt");
        std::fs::write(&path, "existing\n").unwrap();

        let mut tailer = LogTailer::open(&path, POLL).unwrap();
        let running = AtomicBool::new(false);
        assert_eq!(tailer.next_line(&running).unwrap(), None);
    }

    #[test]
    fn test_stop_leaves_backlog_unread() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.txt");
        std::fs::write(&path, "").unwrap();

        let tailer = LogTailer::open(&path, POLL).unwrap();
        let backlog: String = (0..1000).map(|i| format!("line {i}\n")).collect();
        append(&path, &backlog);

        let running = AtomicBool::new(false);
        assert_eq!(tailer.lines(&running).count(), 0);
    }

    #[test]
    fn test_stop_between_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.txt");
        std::fs::write(&path, "").unwrap();

        let mut tailer = LogTailer::open(&path, POLL).unwrap();
        append(&path, "first\nsecond\n");

        let running = AtomicBool::new(true);
        assert_eq!(tailer.next_line(&running).unwrap().as_deref(), Some("first"));

        running.store(false, Ordering::Relaxed);
        assert_eq!(tailer.next_line(&running).unwrap(), None);
    }

    #[test]
    fn test_stop_from_another_thread() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.txt");
        std::fs::write(&path, "").unwrap();

        let tailer = LogTailer::open(&path, POLL).unwrap();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = Arc::clone(&running);

        let handle = std::thread::spawn(move || tailer.lines(&running_clone).count());

        std::thread::sleep(Duration::from_millis(50));
        running.store(false, Ordering::Relaxed);

        assert_eq!(handle.join().unwrap(), 0);
    }

    #[test]
    fn test_missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let result = LogTailer::open(dir.path().join("absent.txt"), POLL);
        assert!(matches!(result, Err(TailError::Open { .. })));
    }

    #[test]
    #[cfg(unix)]
    fn test_removed_file_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.txt");
        std::fs::write(&path, "").unwrap();

        let tailer = LogTailer::open(&path, POLL).unwrap();
        std::fs::remove_file(&path).unwrap();

        let running = AtomicBool::new(true);
        let mut lines = tailer.lines(&running);
        assert!(matches!(lines.next(), Some(Err(TailError::FileRemoved { .. }))));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_truncation_restarts_at_new_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.txt");
        std::fs::write(&path, "a fairly long line of pre-existing content\n").unwrap();

        let mut tailer = LogTailer::open(&path, POLL).unwrap();
        std::fs::write(&path, "short\n").unwrap();
        tailer.check_file().unwrap();

        append(&path, "after truncation\n");
        let running = AtomicBool::new(true);
        assert_eq!(tailer.next_line(&running).unwrap().as_deref(), Some("after truncation"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.txt");
        std::fs::write(&path, "").unwrap();

        let mut tailer = LogTailer::open(&path, POLL).unwrap();
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"bad \xff byte\n").unwrap();

        let running = AtomicBool::new(true);
        assert_eq!(tailer.next_line(&running).unwrap().as_deref(), Some("bad \u{fffd} byte"));
    }
}
