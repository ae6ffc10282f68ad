use crate::app::{Artifact, Branch, Job, Run};
use crate::gh::error::GhError;
use serde::Deserialize;

#[derive(Deserialize)]
struct RunsResponse {
    #[serde(default)]
    workflow_runs: Vec<Run>,
}

#[derive(Deserialize)]
struct JobsResponse {
    #[serde(default)]
    jobs: Vec<Job>,
}

#[derive(Deserialize)]
struct ArtifactsResponse {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[derive(Deserialize)]
struct BranchCommit {
    sha: String,
}

#[derive(Deserialize)]
struct BranchPayload {
    name: String,
    commit: BranchCommit,
    #[serde(default)]
    protected: bool,
}

#[derive(Deserialize)]
struct RepositoryPayload {
    default_branch: String,
}

pub fn parse_runs(json: &str) -> Result<Vec<Run>, GhError> {
    let resp: RunsResponse = serde_json::from_str(json)?;
    Ok(resp.workflow_runs.into_iter().map(Run::normalize).collect())
}

pub fn parse_jobs(json: &str) -> Result<Vec<Job>, GhError> {
    let resp: JobsResponse = serde_json::from_str(json)?;
    Ok(resp.jobs.into_iter().map(Job::normalize).collect())
}

pub fn parse_job(json: &str) -> Result<Job, GhError> {
    let job: Job = serde_json::from_str(json)?;
    Ok(job.normalize())
}

pub fn parse_branches(json: &str) -> Result<Vec<Branch>, GhError> {
    let payload: Vec<BranchPayload> = serde_json::from_str(json)?;
    Ok(payload
        .into_iter()
        .map(|b| Branch {
            name: b.name,
            sha: b.commit.sha,
            protected: b.protected,
        })
        .collect())
}

pub fn parse_artifacts(json: &str) -> Result<Vec<Artifact>, GhError> {
    let resp: ArtifactsResponse = serde_json::from_str(json)?;
    Ok(resp.artifacts)
}

pub fn parse_default_branch(json: &str) -> Result<String, GhError> {
    let repo: RepositoryPayload = serde_json::from_str(json)?;
    Ok(repo.default_branch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{Conclusion, RunStatus};
    use pretty_assertions::assert_eq;

    const RUNS_JSON: &str = r#"{
        "total_count": 2,
        "workflow_runs": [
            {
                "id": 123,
                "name": "CI",
                "display_title": "Fix flaky test",
                "run_number": 42,
                "status": "completed",
                "conclusion": "success",
                "created_at": "2024-01-15T10:00:00Z",
                "updated_at": "2024-01-15T10:05:00Z",
                "head_branch": "main",
                "head_sha": "abc123",
                "event": "push",
                "html_url": "https://github.com/o/r/actions/runs/123",
                "path": ".github/workflows/ci.yml",
                "actor": { "login": "octocat", "id": 1 }
            },
            {
                "id": 124,
                "name": null,
                "run_number": 43,
                "status": "in_progress",
                "conclusion": "failure",
                "created_at": "2024-01-15T11:00:00Z",
                "updated_at": "2024-01-15T11:01:00Z",
                "head_branch": null,
                "event": "pull_request"
            }
        ]
    }"#;

    const JOBS_JSON: &str = r#"{
        "total_count": 1,
        "jobs": [
            {
                "id": 900,
                "run_id": 123,
                "name": "build",
                "status": "completed",
                "conclusion": "failure",
                "started_at": "2024-01-15T10:00:10Z",
                "completed_at": "2024-01-15T10:03:10Z",
                "runner_name": "ubuntu-latest",
                "html_url": "https://github.com/o/r/actions/runs/123/job/900",
                "steps": [
                    {
                        "number": 1,
                        "name": "Set up job",
                        "status": "completed",
                        "conclusion": "success",
                        "started_at": "2024-01-15T10:00:10Z",
                        "completed_at": "2024-01-15T10:00:12Z"
                    },
                    {
                        "number": 2,
                        "name": "Run tests",
                        "status": "queued",
                        "conclusion": null
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn parse_completed_run() {
        let runs = parse_runs(RUNS_JSON).unwrap();
        assert_eq!(runs.len(), 2);
        let run = &runs[0];
        assert_eq!(run.id, 123);
        assert_eq!(run.run_number, 42);
        assert_eq!(run.title(), "Fix flaky test");
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.conclusion, Some(Conclusion::Success));
        assert_eq!(run.actor_login(), "octocat");
        assert_eq!(run.branch(), "main");
    }

    #[test]
    fn nullable_fields_fall_back() {
        let runs = parse_runs(RUNS_JSON).unwrap();
        let run = &runs[1];
        assert_eq!(run.workflow_name(), "workflow");
        assert_eq!(run.branch(), "");
        assert_eq!(run.html_url, "");
    }

    #[test]
    fn running_run_loses_conclusion() {
        let runs = parse_runs(RUNS_JSON).unwrap();
        assert_eq!(runs[1].conclusion, None);
    }

    #[test]
    fn parse_empty_runs() {
        assert!(parse_runs(r#"{"total_count":0,"workflow_runs":[]}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn unknown_status_does_not_fail() {
        let json = RUNS_JSON.replace("\"in_progress\"", "\"brand_new_state\"");
        let runs = parse_runs(&json).unwrap();
        assert_eq!(runs[1].status, RunStatus::Unknown);
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(parse_runs("not json"), Err(GhError::Parse(_))));
    }

    #[test]
    fn parse_jobs_with_steps() {
        let jobs = parse_jobs(JOBS_JSON).unwrap();
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.id, 900);
        assert_eq!(job.runner_name.as_deref(), Some("ubuntu-latest"));
        assert_eq!(job.steps.len(), 2);
        assert_eq!(job.steps[1].status, RunStatus::Queued);
        assert_eq!(job.duration().num_seconds(), 180);
    }

    #[test]
    fn parse_single_job() {
        let json = r#"{"id": 5, "name": "lint", "status": "in_progress", "conclusion": null}"#;
        let job = parse_job(json).unwrap();
        assert!(job.is_running());
        assert!(job.steps.is_empty());
    }

    #[test]
    fn parse_branch_list() {
        let json = r#"[
            {"name": "main", "commit": {"sha": "aaa", "url": "x"}, "protected": true},
            {"name": "dev", "commit": {"sha": "bbb", "url": "y"}}
        ]"#;
        let branches = parse_branches(json).unwrap();
        assert_eq!(
            branches,
            vec![
                Branch { name: "main".into(), sha: "aaa".into(), protected: true },
                Branch { name: "dev".into(), sha: "bbb".into(), protected: false },
            ]
        );
    }

    #[test]
    fn parse_artifact_list() {
        let json = r#"{"total_count": 1, "artifacts": [
            {"id": 11, "name": "coverage", "size_in_bytes": 2048, "expired": false}
        ]}"#;
        let artifacts = parse_artifacts(json).unwrap();
        assert_eq!(artifacts[0].name, "coverage");
        assert_eq!(artifacts[0].size_in_bytes, 2048);
    }

    #[test]
    fn parse_repository_default_branch() {
        let json = r#"{"full_name": "o/r", "default_branch": "trunk"}"#;
        assert_eq!(parse_default_branch(json).unwrap(), "trunk");
    }
}
