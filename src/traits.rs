use crate::app::{Artifact, Branch, Job, Run};
use crate::config::Source;
use crate::gh::error::GhError;
use async_trait::async_trait;
use std::path::Path;

/// Everything the session needs from the CI provider.
///
/// Implementations own transport, authentication, retry and error
/// classification; callers only ever see a classified [`GhError`].
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn fetch_runs(
        &self,
        source: &Source,
        branch: Option<&str>,
        status: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Run>, GhError>;
    async fn fetch_jobs(&self, source: &Source, run_id: u64) -> Result<Vec<Job>, GhError>;
    async fn fetch_job_detail(&self, source: &Source, job_id: u64) -> Result<Job, GhError>;
    /// Raw log bundle for one job (zip, or plain text on some endpoints).
    async fn fetch_logs_raw(&self, source: &Source, job_id: u64) -> Result<Vec<u8>, GhError>;
    async fn fetch_branches(&self, source: &Source) -> Result<Vec<Branch>, GhError>;
    async fn fetch_artifacts(&self, source: &Source, run_id: u64)
        -> Result<Vec<Artifact>, GhError>;
    async fn download_artifact(
        &self,
        source: &Source,
        artifact_id: u64,
        dest: &Path,
    ) -> Result<(), GhError>;
    async fn fetch_file_content(&self, source: &Source, path: &str) -> Result<String, GhError>;
    async fn default_branch(&self, source: &Source) -> Result<String, GhError>;
    /// Reruns the whole run, or only its failed jobs.
    async fn rerun(&self, source: &Source, run_id: u64, failed_only: bool) -> Result<(), GhError>;
    async fn cancel(&self, source: &Source, run_id: u64) -> Result<(), GhError>;
    async fn dispatch(&self, source: &Source, workflow_file: &str, git_ref: &str)
        -> Result<(), GhError>;
}
