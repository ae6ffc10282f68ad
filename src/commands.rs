//! Deferred work issued by the controller.
//!
//! A [`Command`] runs on its own tokio task and yields at most one
//! [`AppEvent`], which re-enters the controller through the event channel.
//! Nothing here touches `AppState`.

use crate::app::{Artifact, JobLogSection, RunQuery, SourcedRun, RUNS_PAGE_SIZE};
use crate::config::Source;
use crate::events::AppEvent;
use crate::export::LogExport;
use crate::gh::error::{ApiError, GhError};
use crate::logs;
use crate::notify::{self, CompletionReport};
use crate::sources;
use crate::traits::RemoteClient;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    FetchRuns(RunQuery),
    FetchJobs {
        source: Source,
        run_id: u64,
    },
    FetchJobDetail {
        source: Source,
        job_id: u64,
    },
    FetchLogs {
        source: Source,
        job_id: u64,
    },
    /// Logs plus the job's current status, for live streaming.
    RefreshLogs {
        source: Source,
        job_id: u64,
    },
    FetchStructuredLogs {
        source: Source,
        job_id: u64,
    },
    /// `(job_id, name)` pairs, fetched one by one.
    FetchMultiJobLogs {
        source: Source,
        jobs: Vec<(u64, String)>,
    },
    /// First job's logs of each run.
    FetchComparison {
        left: SourcedRun,
        right: SourcedRun,
    },
    FetchBranches(Source),
    FetchArtifacts {
        source: Source,
        run_id: u64,
    },
    DownloadArtifact {
        source: Source,
        artifact: Artifact,
        dest: PathBuf,
    },
    FetchWorkflow {
        source: Source,
        path: String,
    },
    Rerun {
        source: Source,
        run_id: u64,
        run_number: u64,
        failed_only: bool,
    },
    Cancel {
        source: Source,
        run_id: u64,
        run_number: u64,
    },
    Dispatch {
        source: Source,
        workflow_file: String,
        git_ref: String,
    },
    SchedulePoll(Duration),
    ScheduleLogRefresh {
        job_id: u64,
        after: Duration,
    },
    OpenBrowser(String),
    SaveLogs {
        export: LogExport,
        dir: PathBuf,
    },
    Notify {
        report: CompletionReport,
        desktop: bool,
        hook: Option<PathBuf>,
    },
}

impl Command {
    /// Task name used in logs and crash reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::FetchRuns(_) => "fetch_runs",
            Self::FetchJobs { .. } => "fetch_jobs",
            Self::FetchJobDetail { .. } => "fetch_job_detail",
            Self::FetchLogs { .. } => "fetch_logs",
            Self::RefreshLogs { .. } => "refresh_logs",
            Self::FetchStructuredLogs { .. } => "fetch_structured_logs",
            Self::FetchMultiJobLogs { .. } => "fetch_multi_job_logs",
            Self::FetchComparison { .. } => "fetch_comparison",
            Self::FetchBranches(_) => "fetch_branches",
            Self::FetchArtifacts { .. } => "fetch_artifacts",
            Self::DownloadArtifact { .. } => "download_artifact",
            Self::FetchWorkflow { .. } => "fetch_workflow",
            Self::Rerun { .. } => "rerun",
            Self::Cancel { .. } => "cancel",
            Self::Dispatch { .. } => "dispatch",
            Self::SchedulePoll(_) => "poll_timer",
            Self::ScheduleLogRefresh { .. } => "log_timer",
            Self::OpenBrowser(_) => "open_browser",
            Self::SaveLogs { .. } => "save_logs",
            Self::Notify { .. } => "notify",
        }
    }
}

/// Downloads a job's log bundle and renders its combined text.
pub async fn fetch_log_text(
    client: &dyn RemoteClient,
    source: &Source,
    job_id: u64,
) -> Result<String, GhError> {
    let bytes = client.fetch_logs_raw(source, job_id).await?;
    Ok(logs::parse_log_bytes(&bytes)?.combined)
}

fn log_text_or_error(result: Result<String, GhError>) -> String {
    result.unwrap_or_else(|e| format!("Error loading logs: {e}"))
}

async fn comparison_side(client: &dyn RemoteClient, side: &SourcedRun) -> Result<String, GhError> {
    let jobs = client
        .fetch_jobs(&side.source, side.run.id)
        .await
        .map_err(|e| {
            GhError::Opaque(ApiError::new(format!(
                "failed to fetch jobs for run #{}: {e}",
                side.run.run_number
            )))
        })?;
    let Some(first) = jobs.first() else {
        return Err(GhError::Opaque(ApiError::new(format!(
            "failed to fetch jobs for run #{}",
            side.run.run_number
        ))));
    };
    Ok(log_text_or_error(
        fetch_log_text(client, &side.source, first.id).await,
    ))
}

fn done(message: String, refresh: bool) -> Option<AppEvent> {
    Some(AppEvent::ActionCompleted { message, refresh })
}

/// Executes one command to completion.
pub async fn run(command: Command, client: &dyn RemoteClient) -> Option<AppEvent> {
    let event = match command {
        Command::FetchRuns(query) => {
            if query.is_multi() {
                sources::fetch_all(client, &query.sources, query.status_filter())
                    .await
                    .map(|agg| AppEvent::SourcesLoaded {
                        runs: agg.runs,
                        failed: agg.failed,
                        query,
                    })
            } else {
                let Some(source) = query.sources.first().cloned() else {
                    return Some(AppEvent::Fatal("no repository configured".to_string()));
                };
                client
                    .fetch_runs(
                        &source,
                        source.branch.as_deref(),
                        query.status_filter(),
                        1,
                        RUNS_PAGE_SIZE,
                    )
                    .await
                    .map(|runs| AppEvent::RunsLoaded { query, runs })
            }
        }
        Command::FetchJobs { source, run_id } => client
            .fetch_jobs(&source, run_id)
            .await
            .map(|jobs| AppEvent::JobsLoaded { run_id, jobs }),
        Command::FetchJobDetail { source, job_id } => client
            .fetch_job_detail(&source, job_id)
            .await
            .map(AppEvent::JobDetailLoaded),
        Command::FetchLogs { source, job_id } => fetch_log_text(client, &source, job_id)
            .await
            .map(|content| AppEvent::LogsLoaded { job_id, content }),
        Command::RefreshLogs { source, job_id } => {
            let (content, job) = tokio::join!(
                fetch_log_text(client, &source, job_id),
                client.fetch_job_detail(&source, job_id)
            );
            if let Err(e) = &content {
                tracing::debug!(job_id, error = %e, "log refresh failed");
            }
            if let Err(e) = &job {
                tracing::debug!(job_id, error = %e, "job status refresh failed");
            }
            Ok(AppEvent::LogsRefreshed {
                job_id,
                content: content.ok(),
                job: job.ok(),
            })
        }
        Command::FetchStructuredLogs { source, job_id } => {
            match client.fetch_logs_raw(&source, job_id).await {
                Ok(bytes) => logs::parse_log_bytes(&bytes)
                    .map(|logs| AppEvent::StructuredLogsLoaded { job_id, logs }),
                Err(e) => Err(e),
            }
        }
        Command::FetchMultiJobLogs { source, jobs } => {
            let mut sections = Vec::with_capacity(jobs.len());
            for (job_id, name) in jobs {
                let content = log_text_or_error(fetch_log_text(client, &source, job_id).await);
                sections.push(JobLogSection {
                    job_id,
                    name,
                    content,
                });
            }
            Ok(AppEvent::MultiJobLogsLoaded { sections })
        }
        Command::FetchComparison { left, right } => {
            match comparison_side(client, &left).await {
                Err(e) => Err(e),
                Ok(left_text) => comparison_side(client, &right).await.map(|right_text| {
                    AppEvent::ComparisonLoaded {
                        left_id: left.run.id,
                        right_id: right.run.id,
                        left: left_text,
                        right: right_text,
                    }
                }),
            }
        }
        Command::FetchBranches(source) => client
            .fetch_branches(&source)
            .await
            .map(AppEvent::BranchesLoaded),
        Command::FetchArtifacts { source, run_id } => client
            .fetch_artifacts(&source, run_id)
            .await
            .map(|artifacts| AppEvent::ArtifactsLoaded { run_id, artifacts }),
        Command::DownloadArtifact {
            source,
            artifact,
            dest,
        } => {
            return match client.download_artifact(&source, artifact.id, &dest).await {
                Ok(()) => done(
                    format!("Downloaded {} to {}", artifact.name, dest.display()),
                    false,
                ),
                Err(e) => Some(AppEvent::Error(e)),
            };
        }
        Command::FetchWorkflow { source, path } => client
            .fetch_file_content(&source, &path)
            .await
            .map(|content| AppEvent::WorkflowLoaded { path, content }),
        Command::Rerun {
            source,
            run_id,
            run_number,
            failed_only,
        } => {
            return match client.rerun(&source, run_id, failed_only).await {
                Ok(()) => {
                    let what = if failed_only { "failed jobs of " } else { "" };
                    done(format!("Rerun requested for {what}run #{run_number}"), true)
                }
                Err(e) => Some(AppEvent::Error(e)),
            };
        }
        Command::Cancel {
            source,
            run_id,
            run_number,
        } => {
            return match client.cancel(&source, run_id).await {
                Ok(()) => done(format!("Cancellation requested for run #{run_number}"), true),
                Err(e) => Some(AppEvent::Error(e)),
            };
        }
        Command::Dispatch {
            source,
            workflow_file,
            git_ref,
        } => {
            return match client.dispatch(&source, &workflow_file, &git_ref).await {
                Ok(()) => done(format!("Dispatched {workflow_file} on {git_ref}"), true),
                Err(e) => Some(AppEvent::Error(e)),
            };
        }
        Command::SchedulePoll(after) => {
            tokio::time::sleep(after).await;
            return Some(AppEvent::PollTick);
        }
        Command::ScheduleLogRefresh { job_id, after } => {
            tokio::time::sleep(after).await;
            return Some(AppEvent::LogTick(job_id));
        }
        Command::OpenBrowser(url) => {
            return match crate::gh::executor::open_in_browser(&url) {
                Ok(()) => None,
                Err(e) => done(e.to_string(), false),
            };
        }
        Command::SaveLogs { export, dir } => {
            return match export.write_to(&dir, chrono::Local::now()) {
                Ok(path) => done(format!("Saved to {}", path.display()), false),
                Err(e) => done(format!("Export failed: {e}"), false),
            };
        }
        Command::Notify {
            report,
            desktop,
            hook,
        } => {
            if desktop {
                let desktop_report = report.clone();
                if let Err(e) =
                    tokio::task::spawn_blocking(move || notify::send_desktop(&desktop_report))
                        .await
                {
                    tracing::warn!("desktop notification task failed: {e}");
                }
            }
            if let Some(hook) = hook {
                if let Err(e) = notify::run_hook(&hook, &report).await {
                    tracing::warn!("hook failed: {e}");
                }
            }
            return None;
        }
    };

    Some(event.unwrap_or_else(AppEvent::Error))
}

/// Runs `fut` on its own task and reports a panic as a `Fatal` event.
pub fn spawn_monitored(
    tx: UnboundedSender<AppEvent>,
    label: &'static str,
    fut: impl Future<Output = ()> + Send + 'static,
) {
    tokio::spawn(async move {
        let handle = tokio::spawn(fut);
        if let Err(join_err) = handle.await {
            let msg = if join_err.is_panic() {
                match join_err.into_panic().downcast::<String>() {
                    Ok(s) => *s,
                    Err(payload) => match payload.downcast::<&str>() {
                        Ok(s) => s.to_string(),
                        Err(_) => "unknown panic".to_string(),
                    },
                }
            } else {
                "task cancelled".to_string()
            };
            tracing::error!("{label} panicked: {msg}");
            if tx
                .send(AppEvent::Fatal(format!("{label} crashed: {msg}")))
                .is_err()
            {
                tracing::warn!("{label}: channel closed while reporting panic");
            }
        }
    });
}

/// Starts `command` in the background; its result is sent on `tx`.
pub fn spawn(command: Command, client: Arc<dyn RemoteClient>, tx: UnboundedSender<AppEvent>) {
    let label = command.label();
    let result_tx = tx.clone();
    spawn_monitored(tx, label, async move {
        if let Some(event) = run(command, client.as_ref()).await {
            if result_tx.send(event).is_err() {
                tracing::warn!("{label}: channel closed");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gh::error::ErrorKind;

    #[test]
    fn per_job_failure_becomes_inline_text() {
        let text = log_text_or_error(Err(GhError::Opaque(ApiError::new("boom"))));
        assert_eq!(text, "Error loading logs: boom");
    }

    #[test]
    fn labels_are_distinct_for_timers() {
        assert_ne!(
            Command::SchedulePoll(Duration::ZERO).label(),
            Command::ScheduleLogRefresh {
                job_id: 1,
                after: Duration::ZERO
            }
            .label()
        );
    }

    #[tokio::test]
    async fn poll_timer_yields_tick() {
        let client = crate::traits::tests::NoopClient;
        let event = run(Command::SchedulePoll(Duration::from_millis(1)), &client).await;
        assert!(matches!(event, Some(AppEvent::PollTick)));
    }

    #[tokio::test]
    async fn log_timer_carries_job() {
        let client = crate::traits::tests::NoopClient;
        let event = run(
            Command::ScheduleLogRefresh {
                job_id: 42,
                after: Duration::from_millis(1),
            },
            &client,
        )
        .await;
        assert!(matches!(event, Some(AppEvent::LogTick(42))));
    }

    #[tokio::test]
    async fn remote_failure_is_reported_as_error() {
        let client = crate::traits::tests::NoopClient;
        let event = run(
            Command::FetchJobs {
                source: Source::new("o", "r"),
                run_id: 1,
            },
            &client,
        )
        .await;
        match event {
            Some(AppEvent::Error(e)) => assert_eq!(e.kind(), ErrorKind::NotFound),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn runs_without_sources_are_fatal() {
        let client = crate::traits::tests::NoopClient;
        let event = run(Command::FetchRuns(RunQuery {
            sources: Vec::new(),
            status: String::new(),
        }), &client)
        .await;
        assert!(matches!(event, Some(AppEvent::Fatal(_))));
    }
}
