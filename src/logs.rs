//! Turns a job's log bundle into per-step text.
//!
//! GitHub serves step logs as a zip with one `{number}_{name}.txt` entry per
//! step. The combined view is what the log viewer shows; step filters render
//! the same format restricted to a set of step numbers.

use crate::gh::error::GhError;
use std::collections::HashMap;
use std::io::{Cursor, Read};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Name given to a log body that did not arrive as an archive.
const PLAIN_LOG_NAME: &str = "log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepLog {
    pub number: u64,
    pub name: String,
    pub content: String,
}

impl StepLog {
    /// Lookup key and header label, `"{number}_{name}"`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.number, self.name)
    }

    fn write_section(&self, out: &mut String) {
        out.push_str("=== ");
        out.push_str(&self.key());
        out.push_str(" ===\n");
        out.push_str(&self.content);
        out.push_str("\n\n");
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLogs {
    pub steps: Vec<StepLog>,
    pub combined: String,
    pub by_key: HashMap<String, String>,
}

impl ParsedLogs {
    /// Sorts `steps` by number and derives the combined text and lookup.
    pub fn from_steps(mut steps: Vec<StepLog>) -> Self {
        steps.sort_by_key(|s| s.number);

        let mut combined = String::new();
        let mut by_key = HashMap::with_capacity(steps.len());
        for step in &steps {
            step.write_section(&mut combined);
            by_key.insert(step.key(), step.content.clone());
        }

        Self {
            steps,
            combined,
            by_key,
        }
    }

    /// Combined-format text for the given step numbers. An empty set means no filter.
    pub fn filtered(&self, numbers: &[u64]) -> String {
        if numbers.is_empty() {
            return self.combined.clone();
        }
        let mut out = String::new();
        for step in self.steps.iter().filter(|s| numbers.contains(&s.number)) {
            step.write_section(&mut out);
        }
        out
    }

    pub fn step(&self, key: &str) -> Option<&str> {
        self.by_key.get(key).map(String::as_str)
    }
}

/// Splits an archive entry name into `(number, name)`.
///
/// Directory prefixes are dropped. Names without a numeric prefix map to step 0.
pub fn parse_entry_name(path: &str) -> (u64, String) {
    let file = path.rsplit('/').next().unwrap_or(path);
    let stem = file.strip_suffix(".txt");

    if let Some((digits, name)) = stem.and_then(|s| s.split_once('_')) {
        if !digits.is_empty() && !name.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(number) = digits.parse() {
                return (number, name.to_string());
            }
        }
    }
    (0, stem.unwrap_or(file).to_string())
}

/// Decodes a log bundle. Entries that cannot be opened or read are skipped.
pub fn parse_log_archive(bytes: &[u8]) -> Result<ParsedLogs, GhError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut steps = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(index = i, error = %e, "skipping unreadable log entry");
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let (number, name) = parse_entry_name(entry.name());
        let mut raw = Vec::new();
        if let Err(e) = entry.read_to_end(&mut raw) {
            tracing::debug!(entry = %name, error = %e, "skipping unreadable log entry");
            continue;
        }
        steps.push(StepLog {
            number,
            name,
            content: String::from_utf8_lossy(&raw).into_owned(),
        });
    }

    Ok(ParsedLogs::from_steps(steps))
}

/// Accepts either a zip bundle or a plain-text job log.
pub fn parse_log_bytes(bytes: &[u8]) -> Result<ParsedLogs, GhError> {
    if bytes.starts_with(ZIP_MAGIC) {
        return parse_log_archive(bytes);
    }
    if bytes.is_empty() {
        return Ok(ParsedLogs::default());
    }
    Ok(ParsedLogs::from_steps(vec![StepLog {
        number: 0,
        name: PLAIN_LOG_NAME.to_string(),
        content: String::from_utf8_lossy(bytes).into_owned(),
    }]))
}
