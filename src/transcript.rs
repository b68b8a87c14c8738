//! Run transcript written to the log file.
//!
//! The file is opened once per run and appended to. Operator-facing text,
//! prompts, answers, and `tracing` events all land here. [`TranscriptGuard`]
//! owns the close: dropping it writes the footer and releases the file, so
//! every exit path (success, abort, error) ends the transcript.
use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

const BANNER: &str = "**********************";

type Sink = Arc<Mutex<Option<BufWriter<File>>>>;

/// Cloneable handle to the open transcript.
#[derive(Clone, Debug)]
pub struct Transcript {
    sink: Sink,
    path: PathBuf,
}

/// Closes the transcript when dropped.
#[derive(Debug)]
pub struct TranscriptGuard {
    transcript: Transcript,
}

/// `io::Write` adapter used by the tracing layer.
pub struct TranscriptWriter {
    sink: Sink,
}

impl Transcript {
    /// Open (append) the transcript at `path`, creating parent directories.
    pub fn start(path: &Path) -> Result<(Transcript, TranscriptGuard)> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create log directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        let transcript = Transcript {
            sink: Arc::new(Mutex::new(Some(BufWriter::new(file)))),
            path: path.to_path_buf(),
        };
        transcript.record(BANNER);
        transcript.record("spolabel transcript start");
        transcript.record(&format!("Start time: {}", now_epoch_secs()));
        transcript.record(&format!("Process ID: {}", std::process::id()));
        transcript.record(BANNER);
        let guard = TranscriptGuard {
            transcript: transcript.clone(),
        };
        Ok((transcript, guard))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line. Write failures are ignored so logging never aborts a run.
    pub fn record(&self, line: &str) {
        let mut sink = lock(&self.sink);
        if let Some(file) = sink.as_mut() {
            let _ = writeln!(file, "{line}");
        }
    }

    pub fn writer(&self) -> TranscriptWriter {
        TranscriptWriter {
            sink: Arc::clone(&self.sink),
        }
    }

    fn finish(&self) {
        self.record(BANNER);
        self.record(&format!("spolabel transcript end: {}", now_epoch_secs()));
        self.record(BANNER);
        let mut sink = lock(&self.sink);
        if let Some(mut file) = sink.take() {
            let _ = file.flush();
        }
    }
}

impl Drop for TranscriptGuard {
    fn drop(&mut self) {
        self.transcript.finish();
    }
}

impl Write for TranscriptWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut sink = lock(&self.sink);
        match sink.as_mut() {
            Some(file) => file.write_all(buf).map(|_| buf.len()),
            // Closed: later events are discarded.
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut sink = lock(&self.sink);
        match sink.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

fn lock(sink: &Sink) -> MutexGuard<'_, Option<BufWriter<File>>> {
    match sink.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
