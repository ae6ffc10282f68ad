//! Monitored sources and startup resolution.
//!
//! Precedence: `--repos`, then the YAML file, then `--repo`, then whatever
//! the working directory's git checkout points at. A single configured
//! repository is treated exactly like `--repo`.

use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "ghmon.yml";

/// One monitored repository, optionally pinned to a branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Source {
    pub owner: String,
    pub repo: String,
    pub branch: Option<String>,
}

impl Source {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: None,
        }
    }

    pub fn with_branch(mut self, branch: Option<String>) -> Self {
        self.branch = branch.filter(|b| !b.is_empty());
        self
    }

    /// Parses `owner/name`, rejecting anything that could not be a GitHub slug.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let Some((owner, repo)) = spec.split_once('/') else {
            return Err(eyre!("invalid repo format {spec:?}: expected owner/name"));
        };
        if !valid_segment(owner) || !valid_segment(repo) {
            return Err(eyre!("invalid repo format {spec:?}: expected owner/name"));
        }
        Ok(Self::new(owner, repo))
    }

    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn branch_label(&self) -> &str {
        self.branch.as_deref().unwrap_or("")
    }
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Contents of `ghmon.yml`.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub repositories: Vec<String>,
}

impl FileConfig {
    pub fn sources(&self) -> Result<Vec<Source>> {
        self.repositories
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(|r| Source::parse(r).map_err(|e| eyre!("{e} in config file")))
            .collect()
    }
}

/// Reads the YAML config. A missing file is not an error.
pub fn load_config_file(path: &Path) -> Result<Option<FileConfig>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(eyre!("failed to read config file {}: {e}", path.display())),
    };
    let cfg: FileConfig = serde_yaml::from_str(&text)
        .map_err(|e| eyre!("invalid config file {}: {e}", path.display()))?;
    Ok(Some(cfg))
}

/// Splits a comma-separated `owner/name` list.
pub fn parse_repo_list(list: &str) -> Result<Vec<Source>> {
    list.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(Source::parse)
        .collect()
}

/// What the session will monitor once flags and files are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelection {
    /// One repository; `None` means it must be detected from the checkout.
    Single(Option<Source>),
    Multi(Vec<Source>),
}

pub fn select_sources(
    repos_flag: Option<&str>,
    file: Option<&FileConfig>,
    repo_flag: Option<&str>,
) -> Result<SourceSelection> {
    let mut configured = match repos_flag {
        Some(list) => parse_repo_list(list)?,
        None => match file {
            Some(cfg) => cfg.sources()?,
            None => Vec::new(),
        },
    };

    if configured.len() > 1 {
        return Ok(SourceSelection::Multi(configured));
    }
    if let Some(only) = configured.pop() {
        return Ok(SourceSelection::Single(Some(only)));
    }
    match repo_flag {
        Some(spec) => Ok(SourceSelection::Single(Some(Source::parse(spec)?))),
        None => Ok(SourceSelection::Single(None)),
    }
}
