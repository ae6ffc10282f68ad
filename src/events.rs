//! Message sum type consumed by the controller, plus the terminal input thread.
//!
//! [`EventHandler`] runs crossterm polling on an OS thread because
//! `crossterm::event::poll()` blocks and would starve the async runtime. Background
//! commands push their results into the same channel through [`EventHandler::sender`].

use crate::app::{Artifact, Branch, Job, JobLogSection, Run, RunQuery, SourcedRun};
use crate::gh::error::GhError;
use crate::logs::ParsedLogs;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    /// UI heartbeat: spinner frames and status-line expiry.
    Tick,
    Resize {
        height: u16,
    },

    /// Watch-mode poll timer fired.
    PollTick,
    /// Live log refresh timer fired for this job.
    LogTick(u64),

    RunsLoaded {
        query: RunQuery,
        runs: Vec<Run>,
    },
    SourcesLoaded {
        query: RunQuery,
        runs: Vec<SourcedRun>,
        /// `(slug, error)` for sources that were skipped.
        failed: Vec<(String, String)>,
    },
    JobsLoaded {
        run_id: u64,
        jobs: Vec<Job>,
    },
    JobDetailLoaded(Job),
    LogsLoaded {
        job_id: u64,
        content: String,
    },
    /// Result of a streaming refresh. Either half may be missing if its fetch failed.
    LogsRefreshed {
        job_id: u64,
        content: Option<String>,
        job: Option<Job>,
    },
    StructuredLogsLoaded {
        job_id: u64,
        logs: ParsedLogs,
    },
    MultiJobLogsLoaded {
        sections: Vec<JobLogSection>,
    },
    ComparisonLoaded {
        left_id: u64,
        right_id: u64,
        left: String,
        right: String,
    },
    BranchesLoaded(Vec<Branch>),
    ArtifactsLoaded {
        run_id: u64,
        artifacts: Vec<Artifact>,
    },
    WorkflowLoaded {
        path: String,
        content: String,
    },
    /// A side effect finished; the text goes to the status line.
    ActionCompleted {
        message: String,
        refresh: bool,
    },
    Error(GhError),
    /// Failure outside the remote client (terminal, panicked task, local file).
    Fatal(String),
}

pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    tx: mpsc::UnboundedSender<AppEvent>,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = shutdown.clone();

        let thread = std::thread::spawn(move || {
            while !shutdown_flag.load(Ordering::Relaxed) {
                match event::poll(tick_rate) {
                    Err(e) => {
                        let _ = event_tx.send(AppEvent::Fatal(format!("Terminal poll error: {e}")));
                        break;
                    }
                    Ok(false) => {
                        if event_tx.send(AppEvent::Tick).is_err() {
                            break;
                        }
                        continue;
                    }
                    Ok(true) => {}
                }
                let forwarded = match event::read() {
                    Ok(CrosstermEvent::Key(key)) => Some(AppEvent::Key(key)),
                    Ok(CrosstermEvent::Resize(_, height)) => Some(AppEvent::Resize { height }),
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => None,
                    Err(e) => {
                        let _ = event_tx.send(AppEvent::Fatal(format!("Terminal read error: {e}")));
                        break;
                    }
                    _ => None,
                };
                if let Some(ev) = forwarded {
                    if event_tx.send(ev).is_err() {
                        break;
                    }
                }
            }
        });

        Self {
            rx,
            tx,
            shutdown,
            thread: Some(thread),
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.tx.clone()
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            if let Err(payload) = handle.join() {
                let msg = payload.downcast::<String>().map_or_else(
                    |p| {
                        p.downcast::<&str>()
                            .map_or_else(|_| "unknown panic".to_string(), |s| s.to_string())
                    },
                    |s| *s,
                );
                tracing::error!("event thread panicked: {msg}");
            }
        }
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        // Joining here could deadlock while poll() blocks during unwinding;
        // the thread exits on its next tick.
        self.shutdown.store(true, Ordering::Relaxed);
    }
}
