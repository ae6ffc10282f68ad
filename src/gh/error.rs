//! Error taxonomy shared by every remote call.

use thiserror::Error;

/// Unclassified failure text as reported by the transport (usually `gh` stderr).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Taxonomy tag of a [`GhError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    NotFound,
    RateLimit,
    Transient,
    Opaque,
}

#[derive(Debug, Error)]
pub enum GhError {
    #[error("GitHub authentication failed: {reason}: {source}")]
    Auth {
        reason: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("resource not found, check repository and branch names: {source}")]
    NotFound {
        #[source]
        source: ApiError,
    },

    #[error("GitHub API rate limited: {source}")]
    RateLimit {
        #[source]
        source: ApiError,
    },

    #[error("{cause} error (will retry): {source}")]
    Transient {
        cause: &'static str,
        #[source]
        source: ApiError,
    },

    #[error(transparent)]
    Opaque(#[from] ApiError),

    #[error("failed after {retries} retries: {source}")]
    RetriesExhausted {
        retries: u32,
        #[source]
        source: Box<GhError>,
    },

    #[error("no workflow runs found across repositories")]
    NoRunsAcrossSources,

    #[error("unexpected API response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unreadable log archive: {0}")]
    LogArchive(#[from] zip::result::ZipError),
}

impl GhError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth { .. } => ErrorKind::Auth,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::RateLimit { .. } => ErrorKind::RateLimit,
            Self::Transient { .. } => ErrorKind::Transient,
            Self::RetriesExhausted { source, .. } => source.kind(),
            Self::Opaque(_) | Self::NoRunsAcrossSources | Self::Parse(_) | Self::LogArchive(_) => {
                ErrorKind::Opaque
            }
        }
    }

    /// The transport error this classification was built from, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Auth { source, .. }
            | Self::NotFound { source }
            | Self::RateLimit { source }
            | Self::Transient { source, .. } => Some(source),
            Self::Opaque(source) => Some(source),
            Self::RetriesExhausted { source, .. } => source.api_error(),
            Self::NoRunsAcrossSources | Self::Parse(_) | Self::LogArchive(_) => None,
        }
    }

    /// Human-readable next step for this error.
    pub fn hint(&self) -> &'static str {
        error_hint(&self.to_string())
    }
}

/// Tags a raw transport error by the status markers found in its text.
pub fn classify(err: ApiError) -> GhError {
    let text = err.message.to_lowercase();

    if text.contains("401") {
        return GhError::Auth {
            reason: "invalid or expired token",
            source: err,
        };
    }
    if text.contains("403") {
        if text.contains("rate limit") {
            return GhError::RateLimit { source: err };
        }
        return GhError::Auth {
            reason: "access forbidden",
            source: err,
        };
    }
    if text.contains("404") {
        return GhError::NotFound { source: err };
    }
    if text.contains("429") {
        return GhError::RateLimit { source: err };
    }
    if text.contains("502") || text.contains("503") || text.contains("504") {
        return GhError::Transient {
            cause: "server",
            source: err,
        };
    }
    if text.contains("timeout") || text.contains("connection") {
        return GhError::Transient {
            cause: "network",
            source: err,
        };
    }
    GhError::Opaque(err)
}

/// Maps any surfaced error text to an actionable suggestion.
pub fn error_hint(message: &str) -> &'static str {
    let text = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

    if has(&["authentication", "401"]) {
        "Run 'gh auth login' to authenticate with GitHub, or set GITHUB_TOKEN environment variable"
    } else if has(&["403", "forbidden"]) {
        "Check that you have access to this repository and the correct permissions"
    } else if has(&["not found", "404"]) {
        "Verify the repository exists and the branch name is correct"
    } else if has(&["rate limit", "429", "too many requests"]) {
        "GitHub API rate limit exceeded - wait a few minutes before retrying"
    } else if has(&["timeout", "connection"]) {
        "Network connectivity issue - check your internet connection and try again"
    } else if has(&["502", "503", "504"]) {
        "GitHub servers are temporarily unavailable - try again in a moment"
    } else if has(&["no workflow runs"]) {
        "No CI runs found - push a commit or check that workflows are configured for this branch"
    } else if has(&["detached head"]) {
        "Currently in detached HEAD state - checkout a branch or use --branch flag"
    } else {
        "Press 'r' to retry the operation or check your configuration"
    }
}
