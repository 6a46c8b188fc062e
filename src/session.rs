//! Background analysis for interactive front-ends.
//!
//! The walk runs on a worker thread; the UI thread drains progress and the
//! final result from a channel with [`AnalysisSession::poll`] and never
//! shares mutable state with the worker.

use crate::error::Result;
use crate::render::render_interactive_to_string;
use crate::report::Report;
use crate::walker::{analyze_file, Progress};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// Files larger than this should be confirmed by the user before a walk.
pub const LARGE_HIVE_THRESHOLD: u64 = 100_000_000;

/// Returns true if `path` is large enough to ask before analyzing it.
pub fn needs_confirmation(path: impl AsRef<Path>) -> Result<bool> {
    Ok(fs::metadata(path)?.len() > LARGE_HIVE_THRESHOLD)
}

/// Question shown before analyzing a large file.
pub fn large_file_prompt(size: u64) -> String {
    format!(
        "File size is {:.1}MB. This might take a while. Continue?",
        size as f64 / 1_000_000.0
    )
}

/// Message posted by the analysis worker.
#[derive(Debug)]
pub enum SessionEvent {
    /// Percentage of keys processed.
    Progress(u8),
    /// The walk finished; carries the report and its text rendering.
    Completed {
        /// Finished report.
        report: Report,
        /// Report rendered as text.
        text: String,
    },
    /// The hive could not be opened or rendered.
    Failed(String),
}

impl SessionEvent {
    /// Returns true for the last event a session posts.
    pub fn is_final(&self) -> bool {
        !matches!(self, SessionEvent::Progress(_))
    }
}

/// A running background analysis.
pub struct AnalysisSession {
    path: PathBuf,
    receiver: Receiver<SessionEvent>,
    worker: Option<JoinHandle<()>>,
    finished: bool,
}

impl AnalysisSession {
    /// Starts analyzing `path` on a worker thread.
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, rx) = channel();
        let worker_path = path.clone();

        let worker = thread::spawn(move || {
            let progress_tx = tx.clone();
            let mut last = None;
            let progress = Progress::percent(move |percent| {
                if last != Some(percent) {
                    last = Some(percent);
                    let _ = progress_tx.send(SessionEvent::Progress(percent));
                }
            });

            let event = match analyze_file(&worker_path, progress).and_then(|report| {
                let text = render_interactive_to_string(&report)?;
                Ok(SessionEvent::Completed { report, text })
            }) {
                Ok(event) => event,
                Err(e) => {
                    error!(path = %worker_path.display(), error = %e, "Analysis failed");
                    SessionEvent::Failed(format!("Error: {}", e))
                }
            };
            let _ = tx.send(event);
        });
        debug!(path = %path.display(), "Analysis worker started");

        Self {
            path,
            receiver: rx,
            worker: Some(worker),
            finished: false,
        }
    }

    /// File being analyzed.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true once the final event has been received.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Drains pending events without blocking.
    pub fn poll(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    self.finished |= event.is_final();
                    events.push(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.finished {
                        self.finished = true;
                        events.push(worker_lost());
                    }
                    break;
                }
            }
        }
        events
    }

    /// Blocks until the worker finishes and returns its final event.
    /// Progress events still queued are discarded.
    pub fn wait(mut self) -> SessionEvent {
        let event = loop {
            match self.receiver.recv() {
                Ok(event) if event.is_final() => break event,
                Ok(_) => continue,
                Err(_) => break worker_lost(),
            }
        };
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        event
    }
}

fn worker_lost() -> SessionEvent {
    SessionEvent::Failed("Error: analysis worker stopped unexpectedly".to_string())
}
