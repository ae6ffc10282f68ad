//! Completion notifications: desktop popup and user hook script.
//!
//! Both are fire-and-forget; failures are logged and never reach the session.

use crate::app::{Conclusion, Job, Run};
use crate::config::Source;
use color_eyre::eyre::{eyre, Result};
use std::path::Path;

/// Flat summary of a finished run, handed to the hook as `GHMON_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    pub workflow_name: String,
    pub run_number: u64,
    pub run_id: u64,
    pub status: String,
    pub conclusion: String,
    pub repo: String,
    pub branch: String,
    pub event: String,
    pub actor: String,
    pub html_url: String,
    pub job_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
}

impl CompletionReport {
    pub fn new(source: &Source, run: &Run, jobs: &[Job]) -> Self {
        let success_count = jobs
            .iter()
            .filter(|j| j.conclusion == Some(Conclusion::Success))
            .count();
        let failure_count = jobs
            .iter()
            .filter(|j| j.conclusion == Some(Conclusion::Failure))
            .count();
        Self {
            workflow_name: run.workflow_name().to_string(),
            run_number: run.run_number,
            run_id: run.id,
            status: run.status.as_str().to_string(),
            conclusion: run.conclusion.map(|c| c.as_str().to_string()).unwrap_or_default(),
            repo: source.slug(),
            branch: run.branch().to_string(),
            event: run.event.clone(),
            actor: run.actor_login().to_string(),
            html_url: run.html_url.clone(),
            job_count: jobs.len(),
            success_count,
            failure_count,
        }
    }

    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("GHMON_WORKFLOW_NAME", self.workflow_name.clone()),
            ("GHMON_RUN_NUMBER", self.run_number.to_string()),
            ("GHMON_RUN_ID", self.run_id.to_string()),
            ("GHMON_STATUS", self.status.clone()),
            ("GHMON_CONCLUSION", self.conclusion.clone()),
            ("GHMON_REPO", self.repo.clone()),
            ("GHMON_BRANCH", self.branch.clone()),
            ("GHMON_EVENT", self.event.clone()),
            ("GHMON_ACTOR", self.actor.clone()),
            ("GHMON_HTML_URL", self.html_url.clone()),
            ("GHMON_JOB_COUNT", self.job_count.to_string()),
            ("GHMON_SUCCESS_COUNT", self.success_count.to_string()),
            ("GHMON_FAILURE_COUNT", self.failure_count.to_string()),
        ]
    }

    fn icon(&self) -> &'static str {
        match self.conclusion.as_str() {
            "success" => "✓",
            "failure" | "timed_out" | "action_required" => "✗",
            "cancelled" => "⊘",
            _ => "●",
        }
    }

    pub fn title(&self) -> String {
        format!("{} {} #{}", self.icon(), self.workflow_name, self.run_number)
    }

    pub fn body(&self) -> String {
        format!("{} on {} - {}", self.repo, self.branch, self.conclusion)
    }
}

#[cfg(feature = "desktop-notify")]
pub fn send_desktop(report: &CompletionReport) {
    use notify_rust::{Notification, Urgency};

    let urgency = if report.failure_count > 0 || report.conclusion == "failure" {
        Urgency::Critical
    } else {
        Urgency::Normal
    };
    if let Err(e) = Notification::new()
        .appname("ghmon")
        .summary(&report.title())
        .body(&report.body())
        .urgency(urgency)
        .show()
    {
        tracing::warn!("desktop notification failed: {e}");
    }
}

#[cfg(not(feature = "desktop-notify"))]
pub fn send_desktop(report: &CompletionReport) {
    tracing::debug!(title = %report.title(), "desktop notifications disabled at build time");
}

/// A hook must be an existing, executable regular file.
pub fn validate_hook(path: &Path) -> Result<()> {
    let meta = std::fs::metadata(path)
        .map_err(|e| eyre!("hook script {} not found: {e}", path.display()))?;
    if meta.is_dir() {
        return Err(eyre!("hook path {} is a directory", path.display()));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 == 0 {
            return Err(eyre!("hook script {} is not executable", path.display()));
        }
    }
    Ok(())
}

/// Starts the hook with the report in its environment and waits for it.
pub async fn run_hook(path: &Path, report: &CompletionReport) -> Result<()> {
    validate_hook(path)?;
    let status = tokio::process::Command::new(path)
        .envs(report.env_vars())
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await
        .map_err(|e| eyre!("failed to run hook {}: {e}", path.display()))?;
    if !status.success() {
        return Err(eyre!("hook {} exited with {status}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::RunStatus;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn report() -> CompletionReport {
        CompletionReport {
            workflow_name: "CI".to_string(),
            run_number: 12,
            run_id: 3456,
            status: "completed".to_string(),
            conclusion: "failure".to_string(),
            repo: "acme/api".to_string(),
            branch: "main".to_string(),
            event: "push".to_string(),
            actor: "octocat".to_string(),
            html_url: "https://github.com/acme/api/actions/runs/3456".to_string(),
            job_count: 3,
            success_count: 2,
            failure_count: 1,
        }
    }

    fn job(conclusion: Option<Conclusion>) -> Job {
        Job {
            id: 1,
            run_id: 3456,
            name: "build".to_string(),
            status: RunStatus::Completed,
            conclusion,
            started_at: None,
            completed_at: None,
            runner_name: None,
            html_url: None,
            steps: Vec::new(),
        }
    }

    #[test]
    fn env_vars_cover_report() {
        let vars = report().env_vars();
        assert_eq!(vars.len(), 13);
        assert!(vars.contains(&("GHMON_RUN_ID", "3456".to_string())));
        assert!(vars.contains(&("GHMON_FAILURE_COUNT", "1".to_string())));
        assert!(vars.iter().all(|(k, _)| k.starts_with("GHMON_")));
    }

    #[test]
    fn title_and_body() {
        let r = report();
        assert_eq!(r.title(), "✗ CI #12");
        assert_eq!(r.body(), "acme/api on main - failure");
    }

    #[test]
    fn report_counts_jobs() {
        let run = Run {
            id: 3456,
            name: Some("CI".to_string()),
            display_title: None,
            run_number: 12,
            status: RunStatus::Completed,
            conclusion: Some(Conclusion::Failure),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            head_branch: Some("main".to_string()),
            head_sha: String::new(),
            event: "push".to_string(),
            html_url: String::new(),
            path: String::new(),
            actor: None,
        };
        let jobs = vec![
            job(Some(Conclusion::Success)),
            job(Some(Conclusion::Skipped)),
            job(Some(Conclusion::Failure)),
        ];
        let r = CompletionReport::new(&Source::new("acme", "api"), &run, &jobs);
        // Only outright successes and failures are counted.
        assert_eq!((r.job_count, r.success_count, r.failure_count), (3, 1, 1));
        assert_eq!(r.conclusion, "failure");
    }

    #[test]
    fn missing_hook_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_hook(&dir.path().join("nope.sh")).is_err());
        assert!(validate_hook(dir.path()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_hook_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(validate_hook(file.path()).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hook_receives_environment() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let script = dir.path().join("hook.sh");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho \"$GHMON_REPO $GHMON_CONCLUSION\" > {}\n", out.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        run_hook(&script, &report()).await.unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "acme/api failure\n");
    }
}
