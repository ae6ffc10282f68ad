//! One-shot reporting for `--plain` and `--json`.

use crate::app::{exit_code_for, format_duration, Job, Run};
use crate::config::Source;
use crate::gh::error::GhError;
use crate::traits::RemoteClient;
use serde::Serialize;
use std::fmt::Write as _;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Latest run of a branch and its jobs.
#[derive(Debug, Serialize)]
pub struct Report {
    pub repository: String,
    pub branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<Run>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub jobs: Vec<Job>,
}

impl Report {
    pub async fn fetch(client: &dyn RemoteClient, source: &Source) -> Result<Self, GhError> {
        let run = client
            .fetch_runs(source, source.branch.as_deref(), None, 1, 1)
            .await?
            .into_iter()
            .next();
        let jobs = match &run {
            Some(run) => client.fetch_jobs(source, run.id).await?,
            None => Vec::new(),
        };
        Ok(Self {
            repository: source.slug(),
            branch: source.branch_label().to_string(),
            run,
            jobs,
        })
    }

    pub fn exit_code(&self) -> i32 {
        exit_code_for(self.run.as_ref())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_plain(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Repository: {}", self.repository);
        let _ = writeln!(out, "Branch: {}", self.branch);
        out.push('\n');

        let Some(run) = &self.run else {
            out.push_str("No workflow runs found\n");
            return out;
        };

        let _ = writeln!(out, "Run #{}: {}", run.run_number, run.workflow_name());
        let _ = write!(out, "Status: {}", run.status.as_str());
        if let Some(conclusion) = run.conclusion {
            let _ = write!(out, " ({})", conclusion.as_str());
        }
        out.push('\n');
        let _ = writeln!(out, "Event: {}", run.event);
        if !run.actor_login().is_empty() {
            let _ = writeln!(out, "Triggered by: {}", run.actor_login());
        }
        let _ = writeln!(out, "Created: {}", run.created_at.format(TIMESTAMP_FORMAT));
        if run.updated_at != run.created_at {
            let _ = writeln!(out, "Updated: {}", run.updated_at.format(TIMESTAMP_FORMAT));
        }
        let _ = writeln!(out, "URL: {}", run.html_url);
        out.push('\n');

        if self.jobs.is_empty() {
            out.push_str("No jobs found\n");
            return out;
        }
        let _ = writeln!(out, "Jobs ({}):", self.jobs.len());
        for job in &self.jobs {
            let _ = write!(out, "  {}: {}", job.name, job.status.as_str());
            if let Some(conclusion) = job.conclusion {
                let _ = write!(out, " ({})", conclusion.as_str());
            }
            if job.started_at.is_some() && job.completed_at.is_some() {
                let _ = write!(out, " - {}", format_duration(job.duration()));
            }
            out.push('\n');
        }
        out
    }
}
