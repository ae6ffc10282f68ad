//! `RemoteClient` backed by the `gh` CLI.
//!
//! `gh api` handles authentication, redirects and pagination headers; this
//! module only builds endpoint paths, bounds each call with a timeout and
//! runs it under the retry policy.

use crate::app::{Artifact, Branch, Job, Run};
use crate::config::Source;
use crate::gh::error::{classify, ApiError, GhError};
use crate::gh::parser;
use crate::gh::retry::{retry_with_backoff, RetryPolicy};
use crate::traits::RemoteClient;
use async_trait::async_trait;
use color_eyre::eyre::{eyre, Result};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Log bundles can be large; give downloads a generous bound.
const GH_TIMEOUT: Duration = Duration::from_secs(60);
const JSON_ACCEPT: &str = "Accept: application/vnd.github+json";
const RAW_ACCEPT: &str = "Accept: application/vnd.github.raw+json";

async fn run_gh(args: &[String]) -> Result<Vec<u8>, GhError> {
    let start = Instant::now();
    let output = tokio::time::timeout(GH_TIMEOUT, Command::new("gh").args(args).output())
        .await
        .map_err(|_| {
            classify(ApiError::new(format!(
                "gh request timeout after {}s",
                GH_TIMEOUT.as_secs()
            )))
        })?
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GhError::Opaque(ApiError::new(
                    "gh CLI not found. Install it from https://cli.github.com/",
                ))
            } else {
                GhError::Opaque(ApiError::new(format!("failed to run gh: {e}")))
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr
        };
        tracing::debug!(args = ?args, error = %message, "gh command failed");
        return Err(classify(ApiError::new(message)));
    }

    tracing::debug!(
        args = ?args,
        elapsed_ms = start.elapsed().as_millis(),
        bytes = output.stdout.len(),
        "gh command completed"
    );
    Ok(output.stdout)
}

fn repo_path(source: &Source, rest: &str) -> String {
    format!("repos/{}/{}/{rest}", source.owner, source.repo)
}

/// `gh api` arguments for a request. GET parameters become the query string.
fn api_args(method: &str, path: &str, accept: &str, params: &[(&str, String)]) -> Vec<String> {
    let mut args = vec![
        "api".to_string(),
        "-X".to_string(),
        method.to_string(),
        path.to_string(),
        "-H".to_string(),
        accept.to_string(),
    ];
    for (key, value) in params {
        args.push("-f".to_string());
        args.push(format!("{key}={value}"));
    }
    args
}

pub struct GhClient {
    policy: RetryPolicy,
}

impl Default for GhClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GhClient {
    pub fn new() -> Self {
        Self::with_policy(RetryPolicy::default())
    }

    pub fn with_policy(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    async fn call(&self, args: Vec<String>) -> Result<Vec<u8>, GhError> {
        retry_with_backoff(&self.policy, || run_gh(&args)).await
    }

    async fn get_text(
        &self,
        path: &str,
        accept: &str,
        params: &[(&str, String)],
    ) -> Result<String, GhError> {
        let bytes = self.call(api_args("GET", path, accept, params)).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn post(&self, path: &str, params: &[(&str, String)]) -> Result<(), GhError> {
        self.call(api_args("POST", path, JSON_ACCEPT, params))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl RemoteClient for GhClient {
    async fn fetch_runs(
        &self,
        source: &Source,
        branch: Option<&str>,
        status: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Run>, GhError> {
        let mut params = vec![("page", page.to_string()), ("per_page", per_page.to_string())];
        if let Some(branch) = branch.filter(|b| !b.is_empty()) {
            params.push(("branch", branch.to_string()));
        }
        if let Some(status) = status.filter(|s| !s.is_empty()) {
            params.push(("status", status.to_string()));
        }
        let json = self
            .get_text(&repo_path(source, "actions/runs"), JSON_ACCEPT, &params)
            .await?;
        parser::parse_runs(&json)
    }

    async fn fetch_jobs(&self, source: &Source, run_id: u64) -> Result<Vec<Job>, GhError> {
        let path = repo_path(source, &format!("actions/runs/{run_id}/jobs"));
        let json = self
            .get_text(&path, JSON_ACCEPT, &[("per_page", "100".to_string())])
            .await?;
        parser::parse_jobs(&json)
    }

    async fn fetch_job_detail(&self, source: &Source, job_id: u64) -> Result<Job, GhError> {
        let path = repo_path(source, &format!("actions/jobs/{job_id}"));
        let json = self.get_text(&path, JSON_ACCEPT, &[]).await?;
        parser::parse_job(&json)
    }

    async fn fetch_logs_raw(&self, source: &Source, job_id: u64) -> Result<Vec<u8>, GhError> {
        let path = repo_path(source, &format!("actions/jobs/{job_id}/logs"));
        self.call(api_args("GET", &path, JSON_ACCEPT, &[])).await
    }

    async fn fetch_branches(&self, source: &Source) -> Result<Vec<Branch>, GhError> {
        let json = self
            .get_text(
                &repo_path(source, "branches"),
                JSON_ACCEPT,
                &[("per_page", "100".to_string())],
            )
            .await?;
        parser::parse_branches(&json)
    }

    async fn fetch_artifacts(
        &self,
        source: &Source,
        run_id: u64,
    ) -> Result<Vec<Artifact>, GhError> {
        let path = repo_path(source, &format!("actions/runs/{run_id}/artifacts"));
        let json = self.get_text(&path, JSON_ACCEPT, &[]).await?;
        parser::parse_artifacts(&json)
    }

    async fn download_artifact(
        &self,
        source: &Source,
        artifact_id: u64,
        dest: &Path,
    ) -> Result<(), GhError> {
        let path = repo_path(source, &format!("actions/artifacts/{artifact_id}/zip"));
        let bytes = self.call(api_args("GET", &path, JSON_ACCEPT, &[])).await?;
        tokio::fs::write(dest, bytes).await.map_err(|e| {
            GhError::Opaque(ApiError::new(format!(
                "failed to write {}: {e}",
                dest.display()
            )))
        })
    }

    async fn fetch_file_content(&self, source: &Source, path: &str) -> Result<String, GhError> {
        let path = repo_path(source, &format!("contents/{}", path.trim_start_matches('/')));
        self.get_text(&path, RAW_ACCEPT, &[]).await
    }

    async fn default_branch(&self, source: &Source) -> Result<String, GhError> {
        let json = self
            .get_text(&format!("repos/{}", source.slug()), JSON_ACCEPT, &[])
            .await?;
        parser::parse_default_branch(&json)
    }

    async fn rerun(&self, source: &Source, run_id: u64, failed_only: bool) -> Result<(), GhError> {
        let endpoint = if failed_only { "rerun-failed-jobs" } else { "rerun" };
        self.post(
            &repo_path(source, &format!("actions/runs/{run_id}/{endpoint}")),
            &[],
        )
        .await
    }

    async fn cancel(&self, source: &Source, run_id: u64) -> Result<(), GhError> {
        self.post(&repo_path(source, &format!("actions/runs/{run_id}/cancel")), &[])
            .await
    }

    async fn dispatch(
        &self,
        source: &Source,
        workflow_file: &str,
        git_ref: &str,
    ) -> Result<(), GhError> {
        let path = repo_path(
            source,
            &format!("actions/workflows/{workflow_file}/dispatches"),
        );
        self.post(&path, &[("ref", git_ref.to_string())]).await
    }
}

// --- Environment detection ---

pub async fn check_gh_available() -> Result<()> {
    run_gh(&["auth".to_string(), "status".to_string()])
        .await
        .map(|_| ())
        .map_err(|e| eyre!("{e}\n{}", e.hint()))
}

/// `owner/name` of the repository in the working directory.
pub async fn detect_repo() -> Result<String> {
    let args: Vec<String> = ["repo", "view", "--json", "nameWithOwner", "-q", ".nameWithOwner"]
        .iter()
        .map(ToString::to_string)
        .collect();
    let output = run_gh(&args)
        .await
        .map_err(|e| eyre!("could not determine repository: {e}\nRun inside a git repo or pass --repo owner/name"))?;
    let repo = String::from_utf8_lossy(&output).trim().to_string();
    if repo.is_empty() {
        return Err(eyre!("could not determine repository. Use --repo flag."));
    }
    Ok(repo)
}

/// Current branch of the checkout; `None` when HEAD is detached.
pub async fn detect_branch() -> Result<Option<String>> {
    let output = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .output()
        .await
        .map_err(|e| eyre!("failed to detect branch: {e}"))?;

    if !output.status.success() {
        return Err(eyre!("failed to detect branch: not a git repository"));
    }
    Ok(parse_head_ref(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_head_ref(output: &str) -> Option<String> {
    let name = output.trim();
    (!name.is_empty() && name != "HEAD").then(|| name.to_string())
}

/// Opens a URL in the user's default browser.
///
/// WSL compiles as linux but needs `wslview` rather than `xdg-open`.
pub fn open_in_browser(url: &str) -> Result<()> {
    use std::process::{Command, Stdio};

    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(eyre!("Refusing to open non-HTTP URL: {url}"));
    }

    let (program, args): (&str, Vec<&str>) = if cfg!(target_os = "macos") {
        ("open", vec![url])
    } else if cfg!(target_os = "windows") {
        ("cmd", vec!["/C", "start", "", url])
    } else if std::env::var_os("WSL_DISTRO_NAME").is_some() {
        ("wslview", vec![url])
    } else {
        ("xdg-open", vec![url])
    };

    Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|e| eyre!("Failed to open browser: {e}"))
}
