//! Merges recent runs from several repositories into one timeline.

use crate::app::{Run, SourcedRun};
use crate::config::Source;
use crate::gh::error::GhError;
use crate::traits::RemoteClient;

/// Recent runs requested from each source.
pub const RUNS_PER_SOURCE: u32 = 5;

/// Result of one aggregation pass.
#[derive(Debug, Default)]
pub struct Aggregate {
    pub runs: Vec<SourcedRun>,
    /// `(slug, error)` for every source that could not be fetched.
    pub failed: Vec<(String, String)>,
}

/// Orders runs by last update, newest first. Ties keep source order.
pub fn sort_by_recency(runs: &mut [SourcedRun]) {
    runs.sort_by(|a, b| b.run.updated_at.cmp(&a.run.updated_at));
}

pub fn tag_runs(source: &Source, runs: Vec<Run>) -> impl Iterator<Item = SourcedRun> + '_ {
    runs.into_iter().map(move |run| SourcedRun {
        source: source.clone(),
        run,
    })
}

/// Fetches every source, skipping the ones that fail.
///
/// Fails only when no source produced a single run.
pub async fn fetch_all(
    client: &dyn RemoteClient,
    sources: &[Source],
    status: Option<&str>,
) -> Result<Aggregate, GhError> {
    let mut aggregate = Aggregate::default();

    for source in sources {
        match client
            .fetch_runs(source, source.branch.as_deref(), status, 1, RUNS_PER_SOURCE)
            .await
        {
            Ok(runs) => aggregate.runs.extend(tag_runs(source, runs)),
            Err(e) => {
                tracing::warn!(source = %source.slug(), error = %e, "skipping source");
                aggregate.failed.push((source.slug(), e.to_string()));
            }
        }
    }

    if aggregate.runs.is_empty() {
        return Err(GhError::NoRunsAcrossSources);
    }
    sort_by_recency(&mut aggregate.runs);
    Ok(aggregate)
}
