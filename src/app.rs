//! Session data model and the single mutable state object the controller owns.

use crate::config::Source;
use crate::diff::DiffLine;
use crate::gh::error::GhError;
use crate::logs::ParsedLogs;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthChar;

/// Runs requested per page in single-source mode.
pub const RUNS_PAGE_SIZE: u32 = 10;
/// Delay between live log refreshes while a job is running.
pub const LOG_REFRESH_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Most jobs that can be shown side by side.
pub const MAX_MULTI_JOBS: usize = 4;
pub const STATUS_MESSAGE_TTL_SECS: u64 = 5;
pub const NARROW_WIDTH_THRESHOLD: u16 = 80;

/// Status filter choices; the empty string means "all".
pub const STATUS_FILTER_OPTIONS: &[&str] =
    &["", "success", "failure", "in_progress", "completed", "queued"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Requested,
    Waiting,
    Pending,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Requested => "requested",
            Self::Waiting => "waiting",
            Self::Pending => "pending",
            Self::Unknown => "unknown",
        }
    }

    /// Still queued or executing.
    pub fn is_running(self) -> bool {
        matches!(self, Self::InProgress | Self::Queued)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    Cancelled,
    Skipped,
    TimedOut,
    ActionRequired,
    Neutral,
    StartupFailure,
    Stale,
    #[serde(other)]
    Unknown,
}

impl Conclusion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
            Self::TimedOut => "timed_out",
            Self::ActionRequired => "action_required",
            Self::Neutral => "neutral",
            Self::StartupFailure => "startup_failure",
            Self::Stale => "stale",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::Neutral | Self::Skipped)
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::Failure | Self::Cancelled | Self::TimedOut | Self::ActionRequired
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Actor {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Run {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_title: Option<String>,
    pub run_number: u64,
    pub status: RunStatus,
    #[serde(default)]
    pub conclusion: Option<Conclusion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub head_branch: Option<String>,
    #[serde(default)]
    pub head_sha: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub html_url: String,
    /// Workflow file, e.g. `.github/workflows/ci.yml`.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub actor: Option<Actor>,
}

impl Run {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn is_success(&self) -> bool {
        self.conclusion.is_some_and(Conclusion::is_success)
    }

    pub fn is_failure(&self) -> bool {
        self.conclusion.is_some_and(Conclusion::is_failure)
    }

    /// Drops a conclusion reported for a run that has not completed.
    pub fn normalize(mut self) -> Self {
        if !self.is_completed() {
            self.conclusion = None;
        }
        self
    }

    pub fn workflow_name(&self) -> &str {
        self.name.as_deref().unwrap_or("workflow")
    }

    pub fn title(&self) -> &str {
        self.display_title
            .as_deref()
            .unwrap_or_else(|| self.workflow_name())
    }

    pub fn branch(&self) -> &str {
        self.head_branch.as_deref().unwrap_or("")
    }

    pub fn actor_login(&self) -> &str {
        self.actor.as_ref().map_or("", |a| a.login.as_str())
    }

    /// Workflow file name without its directory, as `dispatch` expects it.
    pub fn workflow_file(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn outcome_label(&self) -> &'static str {
        match self.conclusion {
            Some(c) => c.as_str(),
            None => self.status.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Step {
    pub number: u64,
    pub name: String,
    pub status: RunStatus,
    #[serde(default)]
    pub conclusion: Option<Conclusion>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Job {
    pub id: u64,
    #[serde(default)]
    pub run_id: u64,
    pub name: String,
    pub status: RunStatus,
    #[serde(default)]
    pub conclusion: Option<Conclusion>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub runner_name: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Job {
    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn normalize(mut self) -> Self {
        if !self.is_completed() {
            self.conclusion = None;
        }
        self
    }

    /// Zero unless both timestamps are known.
    pub fn duration(&self) -> TimeDelta {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => end - start,
            _ => TimeDelta::zero(),
        }
    }

    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("Job {}", self.id)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub name: String,
    pub sha: String,
    pub protected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Artifact {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub size_in_bytes: u64,
    #[serde(default)]
    pub expired: bool,
}

/// A run tagged with the repository it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedRun {
    pub source: Source,
    pub run: Run,
}

/// Exactly one screen is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Loading,
    Ready,
    Watching,
    Error,
    JobDetails,
    LogViewer,
    BranchSelection,
    StatusFilter,
    Help,
    WorkflowViewer,
    ArtifactSelection,
    LogFilter,
    MultiJobSelect,
    CompareSelect,
    CompareView,
}

impl Screen {
    /// Screens a background refresh may replace without losing operator context.
    pub fn is_overview(self) -> bool {
        matches!(self, Self::Loading | Self::Ready | Self::Watching)
    }
}

/// Selection index kept inside `[0, len)`, or empty when the list is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor(Option<usize>);

impl Cursor {
    pub fn index(self) -> Option<usize> {
        self.0
    }

    /// `-1` when nothing is selected.
    pub fn position(self) -> i64 {
        self.0.map_or(-1, |i| i as i64)
    }

    pub fn reset(&mut self, len: usize) {
        self.0 = (len > 0).then_some(0);
    }

    pub fn set(&mut self, index: usize, len: usize) {
        self.0 = (len > 0).then(|| index.min(len - 1));
    }

    /// Keeps the current index if still valid, otherwise pulls it back in range.
    pub fn clamp(&mut self, len: usize) {
        self.0 = match (self.0, len) {
            (_, 0) => None,
            (None, _) => Some(0),
            (Some(i), n) => Some(i.min(n - 1)),
        };
    }

    /// Keeps a still-valid index, otherwise starts over at the first item.
    pub fn keep_or_first(&mut self, len: usize) {
        match self.0 {
            Some(i) if i < len => {}
            _ => self.reset(len),
        }
    }

    pub fn up(&mut self) {
        if let Some(i) = self.0 {
            self.0 = Some(i.saturating_sub(1));
        }
    }

    pub fn down(&mut self, len: usize) {
        self.0 = match self.0 {
            None if len > 0 => Some(0),
            Some(i) if i + 1 < len => Some(i + 1),
            other => other,
        };
    }

    pub fn is(self, index: usize) -> bool {
        self.0 == Some(index)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchState {
    /// Term being typed; `Some` while the search prompt is open.
    pub input: Option<String>,
    pub term: String,
    /// Line numbers containing the term.
    pub matches: Vec<usize>,
    pub current: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct LogView {
    pub job_id: Option<u64>,
    pub title: String,
    pub content: String,
    pub scroll: usize,
    pub streaming: bool,
    pub highlight: bool,
    pub search: SearchState,
}

impl LogView {
    pub fn lines(&self) -> Vec<&str> {
        self.content.trim_end_matches('\n').split('\n').collect()
    }

    pub fn line_count(&self) -> usize {
        self.content.trim_end_matches('\n').split('\n').count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLogSection {
    pub job_id: u64,
    pub name: String,
    pub content: String,
}

impl JobLogSection {
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            format!("Job {}", self.job_id)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MultiJobState {
    pub selected: Vec<u64>,
    pub cursor: Cursor,
    pub sections: Vec<JobLogSection>,
    pub split: bool,
    /// Log viewer is showing the multi-job concatenation.
    pub active: bool,
    /// Logs for the selection are being fetched.
    pub loading: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CompareState {
    pub cursor: Cursor,
    pub first: Option<usize>,
    pub second: Option<usize>,
    /// Run ids of the comparison in flight.
    pub pending: Option<(u64, u64)>,
    pub left_title: String,
    pub right_title: String,
    pub lines: Vec<DiffLine>,
    pub scroll: usize,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowView {
    pub path: String,
    pub content: String,
    pub scroll: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub message: String,
    pub hint: String,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub at: Instant,
}

/// Settings fixed at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Every monitored source; more than one enables the aggregated timeline.
    pub sources: Vec<Source>,
    pub poll_interval: Duration,
    pub watch: bool,
    pub notify: bool,
    pub hook: Option<PathBuf>,
    /// Directory exports and artifact downloads are written to.
    pub output_dir: PathBuf,
}

impl AppConfig {
    pub fn new(sources: Vec<Source>) -> Self {
        Self {
            sources,
            poll_interval: DEFAULT_POLL_INTERVAL,
            watch: false,
            notify: false,
            hook: None,
            output_dir: PathBuf::from("."),
        }
    }
}

/// Parameters a runs fetch was issued with; results for an outdated query are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunQuery {
    pub sources: Vec<Source>,
    pub status: String,
}

impl RunQuery {
    pub fn is_multi(&self) -> bool {
        self.sources.len() > 1
    }

    pub fn status_filter(&self) -> Option<&str> {
        (!self.status.is_empty()).then_some(self.status.as_str())
    }
}

pub struct AppState {
    pub config: AppConfig,

    /// Active single-source context; its branch follows branch selection.
    pub source: Source,
    pub status_filter: String,

    pub screen: Screen,
    pub loading_message: String,

    // Runs and jobs
    pub runs: Vec<Run>,
    pub run_cursor: Cursor,
    pub jobs: Vec<Job>,
    pub job_cursor: Cursor,
    pub selected_job: Option<Job>,
    pub pending_job_detail: Option<u64>,
    /// View an in-flight fetch opens when it lands, while `Loading` is shown.
    pub pending_view: Option<Screen>,
    /// Highlighted step in job details.
    pub step_cursor: Cursor,

    // Aggregated timeline
    pub sourced_runs: Vec<SourcedRun>,
    pub sourced_cursor: Cursor,
    pub active_sourced: Option<usize>,
    pub failed_sources: Vec<String>,

    // Pickers
    pub branches: Vec<Branch>,
    pub branch_cursor: Cursor,
    pub filter_cursor: Cursor,
    pub artifacts: Vec<Artifact>,
    pub artifact_cursor: Cursor,
    pub workflow: WorkflowView,

    // Logs
    pub log: LogView,
    pub parsed_logs: Option<ParsedLogs>,
    pub log_filter: Vec<u64>,
    pub log_filter_cursor: Cursor,
    pub multi_job: MultiJobState,
    pub compare: CompareState,

    // Watch
    pub watching: bool,
    pub notification_sent: bool,
    /// A poll timer is armed; at most one runs at a time.
    pub poll_pending: bool,
    /// Job a log refresh timer is armed for.
    pub log_refresh_pending: Option<u64>,
    pub last_refresh: Option<DateTime<Utc>>,

    pub error: Option<ErrorInfo>,
    pub status_message: Option<StatusMessage>,
    pub exit_code: i32,
    pub should_quit: bool,
    pub spinner_frame: usize,
    /// Rows available to scrollable views, updated from the terminal size.
    pub viewport_height: usize,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let source = config
            .sources
            .first()
            .cloned()
            .unwrap_or_else(|| Source::new("", ""));
        let watching = config.watch;
        Self {
            config,
            source,
            status_filter: String::new(),
            screen: Screen::Loading,
            loading_message: "Loading workflow runs...".to_string(),
            runs: Vec::new(),
            run_cursor: Cursor::default(),
            jobs: Vec::new(),
            job_cursor: Cursor::default(),
            selected_job: None,
            pending_job_detail: None,
            pending_view: None,
            step_cursor: Cursor::default(),
            sourced_runs: Vec::new(),
            sourced_cursor: Cursor::default(),
            active_sourced: None,
            failed_sources: Vec::new(),
            branches: Vec::new(),
            branch_cursor: Cursor::default(),
            filter_cursor: Cursor::default(),
            artifacts: Vec::new(),
            artifact_cursor: Cursor::default(),
            workflow: WorkflowView::default(),
            log: LogView::default(),
            parsed_logs: None,
            log_filter: Vec::new(),
            log_filter_cursor: Cursor::default(),
            multi_job: MultiJobState::default(),
            compare: CompareState::default(),
            watching,
            notification_sent: false,
            poll_pending: false,
            log_refresh_pending: None,
            last_refresh: None,
            error: None,
            status_message: None,
            exit_code: 0,
            should_quit: false,
            spinner_frame: 0,
            viewport_height: 20,
        }
    }

    pub fn is_multi_source(&self) -> bool {
        self.config.sources.len() > 1
    }

    pub fn run_query(&self) -> RunQuery {
        let sources = if self.is_multi_source() {
            self.config.sources.clone()
        } else {
            vec![self.source.clone()]
        };
        RunQuery {
            sources,
            status: self.status_filter.clone(),
        }
    }

    /// The run whose jobs are loaded.
    pub fn current_run(&self) -> Option<&Run> {
        if self.is_multi_source() {
            self.active_sourced
                .and_then(|i| self.sourced_runs.get(i))
                .map(|s| &s.run)
        } else {
            self.run_cursor.index().and_then(|i| self.runs.get(i))
        }
    }

    /// Repository the current run belongs to.
    pub fn active_source(&self) -> Source {
        if self.is_multi_source() {
            if let Some(sourced) = self.active_sourced.and_then(|i| self.sourced_runs.get(i)) {
                return sourced.source.clone();
            }
        }
        self.source.clone()
    }

    /// Runs in the order the run list shows them.
    pub fn visible_runs(&self) -> Vec<&Run> {
        if self.is_multi_source() {
            self.sourced_runs.iter().map(|s| &s.run).collect()
        } else {
            self.runs.iter().collect()
        }
    }

    /// Run at `index` of the run list together with its repository.
    pub fn sourced_run_at(&self, index: usize) -> Option<SourcedRun> {
        if self.is_multi_source() {
            self.sourced_runs.get(index).cloned()
        } else {
            self.runs.get(index).map(|run| SourcedRun {
                source: self.source.clone(),
                run: run.clone(),
            })
        }
    }

    pub fn highlighted_job(&self) -> Option<&Job> {
        self.job_cursor.index().and_then(|i| self.jobs.get(i))
    }

    pub fn job_name(&self, job_id: u64) -> Option<&str> {
        self.jobs
            .iter()
            .find(|j| j.id == job_id)
            .map(|j| j.name.as_str())
    }

    // --- Errors and status line ---

    pub fn set_error(&mut self, err: &GhError) {
        self.set_error_message(err.to_string());
    }

    pub fn set_error_message(&mut self, message: String) {
        let hint = crate::gh::error::error_hint(&message).to_string();
        self.error = Some(ErrorInfo { message, hint });
        self.drop_log();
        self.screen = Screen::Error;
        self.exit_code = 2;
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status_message = Some(StatusMessage {
            text: text.into(),
            at: Instant::now(),
        });
    }

    pub fn prune_status(&mut self) {
        if self
            .status_message
            .as_ref()
            .is_some_and(|m| m.at.elapsed().as_secs() >= STATUS_MESSAGE_TTL_SECS)
        {
            self.status_message = None;
        }
    }

    pub fn begin_loading(&mut self, message: &str) {
        self.screen = Screen::Loading;
        self.loading_message = message.to_string();
    }

    /// Screen to settle on after data arrives.
    pub fn resting_screen(&self) -> Screen {
        if self.watching {
            Screen::Watching
        } else {
            Screen::Ready
        }
    }

    pub fn advance_spinner(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
    }

    pub fn update_exit_code(&mut self) {
        self.exit_code = exit_code_for(self.current_run());
    }

    // --- Streaming ---

    /// Streaming holds while the viewed job is still queued or running.
    pub fn refresh_streaming(&mut self) {
        let Some(job_id) = self.log.job_id else {
            self.log.streaming = false;
            return;
        };
        if let Some(job) = self.jobs.iter().find(|j| j.id == job_id) {
            self.log.streaming = job.is_running() && !self.multi_job.active;
        }
    }

    /// Replaces a job in the list (and the selection) with fresher data.
    pub fn merge_job(&mut self, job: Job) {
        if let Some(slot) = self.jobs.iter_mut().find(|j| j.id == job.id) {
            *slot = job.clone();
        }
        if self.selected_job.as_ref().is_some_and(|j| j.id == job.id) {
            self.selected_job = Some(job);
        }
    }

    // --- Log view ---

    pub fn open_log(&mut self, job_id: u64, title: String) {
        self.log = LogView {
            job_id: Some(job_id),
            title,
            highlight: self.log.highlight,
            ..LogView::default()
        };
        self.parsed_logs = None;
        self.log_filter.clear();
        self.multi_job.active = false;
    }

    /// Detaches the log view so no refresh timer targets it.
    pub fn drop_log(&mut self) {
        self.log.streaming = false;
        self.log.job_id = None;
        self.log.search = SearchState::default();
        self.multi_job.active = false;
    }

    pub fn close_log(&mut self) {
        self.drop_log();
        self.screen = if self.selected_job.is_some() {
            Screen::JobDetails
        } else {
            self.resting_screen()
        };
    }

    /// Swaps in new log text, keeping the scroll position and search valid.
    pub fn set_log_content(&mut self, content: String) {
        self.log.content = content;
        let max = self.max_log_scroll();
        self.log.scroll = self.log.scroll.min(max);
        if !self.log.search.term.is_empty() {
            self.recompute_matches();
        }
    }

    pub fn max_log_scroll(&self) -> usize {
        self.log.line_count().saturating_sub(self.viewport_height)
    }

    pub fn scroll_log_up(&mut self, amount: usize) {
        self.log.scroll = self.log.scroll.saturating_sub(amount);
    }

    pub fn scroll_log_down(&mut self, amount: usize) {
        self.log.scroll = (self.log.scroll + amount).min(self.max_log_scroll());
    }

    /// Scrolls just enough to bring `line` into view.
    pub fn scroll_to_line(&mut self, line: usize) {
        let height = self.viewport_height.max(1);
        if line < self.log.scroll {
            self.log.scroll = line;
        } else if line >= self.log.scroll + height {
            self.log.scroll = line + 1 - height;
        }
    }

    // --- Search ---

    pub fn recompute_matches(&mut self) {
        let needle = self.log.search.term.to_lowercase();
        self.log.search.matches = if needle.is_empty() {
            Vec::new()
        } else {
            self.log
                .lines()
                .iter()
                .enumerate()
                .filter(|(_, l)| l.to_lowercase().contains(&needle))
                .map(|(i, _)| i)
                .collect()
        };
        self.log.search.current = if self.log.search.matches.is_empty() {
            None
        } else {
            Some(
                self.log
                    .search
                    .current
                    .unwrap_or(0)
                    .min(self.log.search.matches.len() - 1),
            )
        };
    }

    /// Commits the typed term and jumps to its first match.
    pub fn confirm_search(&mut self) {
        let term = self.log.search.input.take().unwrap_or_default();
        self.log.search.term = term;
        self.log.search.current = None;
        self.recompute_matches();
        if let Some(&line) = self.log.search.matches.first() {
            self.log.search.current = Some(0);
            self.scroll_to_line(line);
        }
    }

    pub fn cancel_search(&mut self) {
        self.log.search = SearchState::default();
    }

    pub fn next_match(&mut self) {
        let count = self.log.search.matches.len();
        if count == 0 {
            return;
        }
        let next = self.log.search.current.map_or(0, |c| (c + 1) % count);
        self.jump_to_match(next);
    }

    pub fn prev_match(&mut self) {
        let count = self.log.search.matches.len();
        if count == 0 {
            return;
        }
        let prev = self
            .log
            .search
            .current
            .map_or(count - 1, |c| (c + count - 1) % count);
        self.jump_to_match(prev);
    }

    fn jump_to_match(&mut self, index: usize) {
        self.log.search.current = Some(index);
        if let Some(&line) = self.log.search.matches.get(index) {
            self.scroll_to_line(line);
        }
    }

    // --- Selection sets ---

    /// Adds or removes a step number from the log filter.
    pub fn toggle_log_step(&mut self, number: u64) {
        if let Some(pos) = self.log_filter.iter().position(|&n| n == number) {
            self.log_filter.remove(pos);
        } else {
            self.log_filter.push(number);
        }
    }

    /// Adds or removes a job; adding beyond [`MAX_MULTI_JOBS`] is ignored.
    pub fn toggle_multi_job(&mut self, job_id: u64) -> bool {
        let selected = &mut self.multi_job.selected;
        if let Some(pos) = selected.iter().position(|&id| id == job_id) {
            selected.remove(pos);
            return true;
        }
        if selected.len() >= MAX_MULTI_JOBS {
            return false;
        }
        selected.push(job_id);
        true
    }
}

/// Process exit code for a session that ended on `run`.
pub fn exit_code_for(run: Option<&Run>) -> i32 {
    match run {
        None => 2,
        Some(r) if r.is_failure() => 1,
        Some(_) => 0,
    }
}

/// Labeled concatenation of several jobs' logs.
pub fn combine_job_sections(sections: &[JobLogSection]) -> String {
    let rule = "═".repeat(78);
    let mut out = String::new();
    for section in sections {
        out.push('\n');
        out.push_str(&rule);
        out.push_str("\n  JOB: ");
        out.push_str(&section.label());
        out.push('\n');
        out.push_str(&rule);
        out.push_str("\n\n");
        out.push_str(&section.content);
        out.push('\n');
    }
    out
}

pub fn format_duration(delta: TimeDelta) -> String {
    let secs = delta.num_seconds().max(0);
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Cuts `s` to `max_width` terminal columns, ending with `…` when shortened.
pub fn truncate(s: &str, max_width: usize) -> String {
    if unicode_width::UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut width = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if width + w + 1 > max_width {
            break;
        }
        out.push(c);
        width += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn make_run(id: u64, status: RunStatus, conclusion: Option<Conclusion>) -> Run {
        Run {
            id,
            name: Some("CI".to_string()),
            display_title: Some(format!("Build {id}")),
            run_number: id,
            status,
            conclusion,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap(),
            head_branch: Some("main".to_string()),
            head_sha: String::new(),
            event: "push".to_string(),
            html_url: format!("https://github.com/o/r/actions/runs/{id}"),
            path: ".github/workflows/ci.yml".to_string(),
            actor: None,
        }
    }

    fn make_job(id: u64, status: RunStatus) -> Job {
        Job {
            id,
            run_id: 1,
            name: format!("job-{id}"),
            status,
            conclusion: None,
            started_at: None,
            completed_at: None,
            runner_name: None,
            html_url: None,
            steps: Vec::new(),
        }
    }

    fn state() -> AppState {
        AppState::new(AppConfig::new(vec![Source::new("o", "r")]))
    }

    // --- Run predicates ---

    #[test]
    fn completed_matches_status() {
        for status in [RunStatus::Queued, RunStatus::InProgress, RunStatus::Completed] {
            let run = make_run(1, status, None);
            assert_eq!(run.is_completed(), status == RunStatus::Completed);
        }
    }

    #[test]
    fn success_and_failure_are_exclusive() {
        let all = [
            Conclusion::Success,
            Conclusion::Failure,
            Conclusion::Cancelled,
            Conclusion::Skipped,
            Conclusion::TimedOut,
            Conclusion::ActionRequired,
            Conclusion::Neutral,
        ];
        for c in all {
            let run = make_run(1, RunStatus::Completed, Some(c));
            assert!(!(run.is_success() && run.is_failure()), "{c:?}");
            assert!(run.is_success() || run.is_failure(), "{c:?}");
        }
    }

    #[test]
    fn no_conclusion_is_neither() {
        let run = make_run(1, RunStatus::InProgress, None);
        assert!(!run.is_success());
        assert!(!run.is_failure());
    }

    #[test]
    fn normalize_drops_conclusion_of_running_run() {
        let run = make_run(1, RunStatus::InProgress, Some(Conclusion::Failure)).normalize();
        assert_eq!(run.conclusion, None);
    }

    #[test]
    fn workflow_file_strips_directory() {
        assert_eq!(make_run(1, RunStatus::Queued, None).workflow_file(), "ci.yml");
    }

    // --- Jobs ---

    #[test]
    fn job_duration_needs_both_timestamps() {
        let mut job = make_job(1, RunStatus::Completed);
        assert_eq!(job.duration(), TimeDelta::zero());
        job.started_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(job.duration(), TimeDelta::zero());
        job.completed_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 30).unwrap());
        assert_eq!(job.duration(), TimeDelta::seconds(90));
    }

    // --- Cursor ---

    #[test]
    fn cursor_empty_is_minus_one() {
        let mut cursor = Cursor::default();
        cursor.clamp(0);
        assert_eq!(cursor.position(), -1);
        cursor.down(0);
        assert_eq!(cursor.index(), None);
    }

    #[test]
    fn cursor_moves_within_bounds() {
        let mut cursor = Cursor::default();
        cursor.reset(3);
        cursor.up();
        assert_eq!(cursor.index(), Some(0));
        cursor.down(3);
        cursor.down(3);
        cursor.down(3);
        assert_eq!(cursor.index(), Some(2));
    }

    #[test]
    fn cursor_clamps_on_shrink() {
        let mut cursor = Cursor::default();
        cursor.set(5, 10);
        cursor.clamp(3);
        assert_eq!(cursor.index(), Some(2));
        cursor.clamp(0);
        assert_eq!(cursor.index(), None);
    }

    #[test]
    fn cursor_keeps_valid_index() {
        let mut cursor = Cursor::default();
        cursor.set(1, 4);
        cursor.clamp(4);
        assert_eq!(cursor.index(), Some(1));
    }

    // --- Exit codes ---

    #[test]
    fn exit_codes() {
        assert_eq!(exit_code_for(None), 2);
        assert_eq!(
            exit_code_for(Some(&make_run(1, RunStatus::Completed, Some(Conclusion::Skipped)))),
            0
        );
        assert_eq!(
            exit_code_for(Some(&make_run(1, RunStatus::Completed, Some(Conclusion::TimedOut)))),
            1
        );
        assert_eq!(exit_code_for(Some(&make_run(1, RunStatus::InProgress, None))), 0);
    }

    // --- Selection sets ---

    #[test]
    fn log_step_toggle_has_no_duplicates() {
        let mut s = state();
        s.toggle_log_step(2);
        s.toggle_log_step(3);
        s.toggle_log_step(2);
        assert_eq!(s.log_filter, vec![3]);
    }

    #[test]
    fn multi_job_toggle_twice_removes() {
        let mut s = state();
        assert!(s.toggle_multi_job(7));
        assert!(s.toggle_multi_job(7));
        assert!(s.multi_job.selected.is_empty());
    }

    #[test]
    fn multi_job_fifth_is_rejected() {
        let mut s = state();
        for id in 1..=4 {
            assert!(s.toggle_multi_job(id));
        }
        assert!(!s.toggle_multi_job(5));
        assert_eq!(s.multi_job.selected, vec![1, 2, 3, 4]);
    }

    // --- Search ---

    fn with_log(content: &str) -> AppState {
        let mut s = state();
        s.viewport_height = 2;
        s.open_log(1, "job".to_string());
        s.set_log_content(content.to_string());
        s
    }

    #[test]
    fn search_is_case_insensitive() {
        let mut s = with_log("Error one\nfine\nanother ERROR\n");
        s.log.search.input = Some("error".to_string());
        s.confirm_search();
        assert_eq!(s.log.search.matches, vec![0, 2]);
        assert_eq!(s.log.search.current, Some(0));
    }

    #[test]
    fn match_navigation_wraps() {
        let mut s = with_log("a\nx\nb\nx\nc\nx");
        s.log.search.input = Some("x".to_string());
        s.confirm_search();
        s.next_match();
        s.next_match();
        assert_eq!(s.log.search.current, Some(2));
        s.next_match();
        assert_eq!(s.log.search.current, Some(0));
        s.prev_match();
        assert_eq!(s.log.search.current, Some(2));
        assert_eq!(s.log.scroll, 4);
    }

    #[test]
    fn cancel_search_clears_term() {
        let mut s = with_log("abc");
        s.log.search.input = Some("a".to_string());
        s.confirm_search();
        s.cancel_search();
        assert!(s.log.search.term.is_empty());
        assert!(s.log.search.matches.is_empty());
    }

    #[test]
    fn scroll_is_bounded() {
        let mut s = with_log("1\n2\n3\n4\n5");
        s.scroll_log_down(100);
        assert_eq!(s.log.scroll, 3);
        s.scroll_log_up(100);
        assert_eq!(s.log.scroll, 0);
    }

    // --- Streaming ---

    #[test]
    fn streaming_follows_job_status() {
        let mut s = state();
        s.jobs = vec![make_job(1, RunStatus::InProgress)];
        s.open_log(1, "job".to_string());
        s.refresh_streaming();
        assert!(s.log.streaming);
        s.merge_job(make_job(1, RunStatus::Completed));
        s.refresh_streaming();
        assert!(!s.log.streaming);
    }

    // --- Errors ---

    #[test]
    fn error_sets_screen_hint_and_exit_code() {
        let mut s = state();
        s.set_error_message("HTTP 404: Not Found".to_string());
        assert_eq!(s.screen, Screen::Error);
        assert_eq!(s.exit_code, 2);
        let hint = s.error.as_ref().map(|e| e.hint.clone()).unwrap_or_default();
        assert!(hint.contains("repository exists"));
    }

    // --- Formatting ---

    #[test]
    fn combine_sections_labels_jobs() {
        let text = combine_job_sections(&[JobLogSection {
            job_id: 9,
            name: String::new(),
            content: "hello".to_string(),
        }]);
        let rule = "═".repeat(78);
        assert_eq!(text, format!("\n{rule}\n  JOB: Job 9\n{rule}\n\nhello\n"));
    }

    #[test]
    fn durations_format() {
        assert_eq!(format_duration(TimeDelta::seconds(42)), "42s");
        assert_eq!(format_duration(TimeDelta::seconds(125)), "2m 5s");
        assert_eq!(format_duration(TimeDelta::seconds(3720)), "1h 2m");
    }

    #[test]
    fn truncate_by_width() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 6), "hello…");
        assert_eq!(truncate("日本語テキスト", 5), "日本…");
    }
}
