//! The update step.
//!
//! [`update`] is the only place `AppState` changes. It handles one event,
//! mutates the state and returns the commands to run next; it never awaits.
//! Results of commands come back as events, and every handler checks that
//! the result still matches what is on screen before applying it.

use crate::app::{
    combine_job_sections, AppState, CompareState, Job, LogView, Screen, LOG_REFRESH_INTERVAL,
    MAX_MULTI_JOBS, STATUS_FILTER_OPTIONS,
};
use crate::commands::Command;
use crate::diff;
use crate::events::AppEvent;
use crate::export::LogExport;
use crate::input::{self, Action, InputContext};
use crate::notify::CompletionReport;
use chrono::Utc;

/// Rows of the log view taken up by header, footer, borders and status line.
const VIEW_CHROME_ROWS: u16 = 7;

/// Commands to issue when the session starts.
pub fn init(state: &mut AppState) -> Vec<Command> {
    let message = if state.is_multi_source() {
        format!(
            "Loading runs from {} repositories...",
            state.config.sources.len()
        )
    } else {
        "Loading workflow runs...".to_string()
    };
    state.begin_loading(&message);
    vec![fetch_runs(state)]
}

pub fn update(state: &mut AppState, event: AppEvent) -> Vec<Command> {
    match event {
        AppEvent::Key(key) => {
            let ctx = InputContext {
                screen: state.screen,
                search_input: state.log.search.input.is_some(),
            };
            handle_action(state, input::map_key(key, &ctx))
        }
        AppEvent::Tick => {
            state.advance_spinner();
            state.prune_status();
            Vec::new()
        }
        AppEvent::Resize { height } => {
            state.viewport_height = usize::from(height.saturating_sub(VIEW_CHROME_ROWS).max(1));
            state.log.scroll = state.log.scroll.min(state.max_log_scroll());
            Vec::new()
        }
        AppEvent::PollTick => on_poll_tick(state),
        AppEvent::LogTick(job_id) => on_log_tick(state, job_id),
        AppEvent::RunsLoaded { query, runs } => {
            if query != state.run_query() {
                tracing::debug!("dropping runs fetched for an outdated query");
                return Vec::new();
            }
            state.last_refresh = Some(Utc::now());
            state.runs = runs;
            let len = state.runs.len();
            state.run_cursor.keep_or_first(len);
            after_runs_loaded(state)
        }
        AppEvent::SourcesLoaded {
            query,
            runs,
            failed,
        } => {
            if query != state.run_query() {
                tracing::debug!("dropping aggregated runs for an outdated query");
                return Vec::new();
            }
            state.last_refresh = Some(Utc::now());
            state.sourced_runs = runs;
            state.failed_sources = failed.into_iter().map(|(slug, _)| slug).collect();
            let len = state.sourced_runs.len();
            state.sourced_cursor.keep_or_first(len);
            state.active_sourced = state.sourced_cursor.index();
            after_runs_loaded(state)
        }
        AppEvent::JobsLoaded { run_id, jobs } => on_jobs_loaded(state, run_id, jobs),
        AppEvent::JobDetailLoaded(job) => {
            if state.pending_job_detail != Some(job.id) || !state.screen.is_overview() {
                return Vec::new();
            }
            state.pending_job_detail = None;
            state.step_cursor.reset(job.steps.len());
            state.selected_job = Some(job);
            state.screen = Screen::JobDetails;
            Vec::new()
        }
        AppEvent::LogsLoaded { job_id, content } => {
            if state.log.job_id != Some(job_id)
                || state.multi_job.active
                || !awaited(state, Screen::LogViewer)
            {
                return Vec::new();
            }
            state.set_log_content(content);
            state.screen = Screen::LogViewer;
            state.refresh_streaming();
            schedule_log_refresh(state).into_iter().collect()
        }
        AppEvent::LogsRefreshed {
            job_id,
            content,
            job,
        } => on_logs_refreshed(state, job_id, content, job),
        AppEvent::StructuredLogsLoaded { job_id, logs } => {
            if state.log.job_id != Some(job_id) || !awaited(state, Screen::LogFilter) {
                return Vec::new();
            }
            state.log_filter_cursor.reset(logs.steps.len());
            state.parsed_logs = Some(logs);
            state.screen = Screen::LogFilter;
            Vec::new()
        }
        AppEvent::MultiJobLogsLoaded { sections } => {
            if !state.multi_job.loading {
                return Vec::new();
            }
            state.multi_job.loading = false;
            state.log = LogView {
                title: format!("{} jobs", sections.len()),
                highlight: state.log.highlight,
                ..LogView::default()
            };
            state.parsed_logs = None;
            state.log_filter.clear();
            state.multi_job.sections = sections;
            state.multi_job.active = true;
            let content = combine_job_sections(&state.multi_job.sections);
            state.set_log_content(content);
            state.screen = Screen::LogViewer;
            Vec::new()
        }
        AppEvent::ComparisonLoaded {
            left_id,
            right_id,
            left,
            right,
        } => {
            if state.compare.pending != Some((left_id, right_id)) {
                return Vec::new();
            }
            state.compare.pending = None;
            state.compare.lines = diff::compute(&left, &right);
            state.compare.scroll = 0;
            state.screen = Screen::CompareView;
            Vec::new()
        }
        AppEvent::BranchesLoaded(branches) => {
            if !awaited(state, Screen::BranchSelection) {
                return Vec::new();
            }
            let current = state.source.branch.clone();
            let len = branches.len();
            match branches
                .iter()
                .position(|b| current.as_deref() == Some(b.name.as_str()))
            {
                Some(i) => state.branch_cursor.set(i, len),
                None => state.branch_cursor.reset(len),
            }
            state.branches = branches;
            state.screen = Screen::BranchSelection;
            Vec::new()
        }
        AppEvent::ArtifactsLoaded { run_id, artifacts } => {
            if state.current_run().map(|r| r.id) != Some(run_id)
                || !awaited(state, Screen::ArtifactSelection)
            {
                return Vec::new();
            }
            state.artifact_cursor.reset(artifacts.len());
            state.artifacts = artifacts;
            state.screen = Screen::ArtifactSelection;
            Vec::new()
        }
        AppEvent::WorkflowLoaded { path, content } => {
            if state.current_run().map(|r| r.path.as_str()) != Some(path.as_str())
                || !awaited(state, Screen::WorkflowViewer)
            {
                return Vec::new();
            }
            state.workflow.path = path;
            state.workflow.content = content;
            state.workflow.scroll = 0;
            state.screen = Screen::WorkflowViewer;
            Vec::new()
        }
        AppEvent::ActionCompleted { message, refresh } => {
            state.set_status(message);
            if refresh {
                vec![fetch_runs(state)]
            } else {
                Vec::new()
            }
        }
        AppEvent::Error(err) => {
            tracing::debug!(kind = ?err.kind(), "command failed: {err}");
            abandon_pending(state);
            state.set_error(&err);
            Vec::new()
        }
        AppEvent::Fatal(message) => {
            abandon_pending(state);
            state.set_error_message(message);
            Vec::new()
        }
    }
}

// --- Scheduling ---

fn fetch_runs(state: &AppState) -> Command {
    Command::FetchRuns(state.run_query())
}

fn fetch_current_jobs(state: &AppState) -> Vec<Command> {
    state
        .current_run()
        .map(|run| Command::FetchJobs {
            source: state.active_source(),
            run_id: run.id,
        })
        .into_iter()
        .collect()
}

/// Arms the poll timer unless one is already running.
fn schedule_poll(state: &mut AppState) -> Option<Command> {
    if !state.watching || state.poll_pending {
        return None;
    }
    state.poll_pending = true;
    Some(Command::SchedulePoll(state.config.poll_interval))
}

fn schedule_log_refresh(state: &mut AppState) -> Option<Command> {
    if !state.log.streaming {
        return None;
    }
    let job_id = state.log.job_id?;
    if state.log_refresh_pending == Some(job_id) {
        return None;
    }
    state.log_refresh_pending = Some(job_id);
    Some(Command::ScheduleLogRefresh {
        job_id,
        after: LOG_REFRESH_INTERVAL,
    })
}

/// Claims the loading screen for `view` if it is still waiting on that fetch.
fn awaited(state: &mut AppState, view: Screen) -> bool {
    if state.screen != Screen::Loading || state.pending_view != Some(view) {
        tracing::debug!(?view, screen = ?state.screen, "dropping result nothing waits for");
        return false;
    }
    state.pending_view = None;
    true
}

/// Starts a fetch whose result opens `view`.
fn await_view(state: &mut AppState, view: Screen, message: &str) {
    state.begin_loading(message);
    state.pending_view = Some(view);
}

fn abandon_pending(state: &mut AppState) {
    state.pending_job_detail = None;
    state.pending_view = None;
    state.multi_job.loading = false;
    state.compare.pending = None;
}

fn on_poll_tick(state: &mut AppState) -> Vec<Command> {
    state.poll_pending = false;
    if !state.watching {
        return Vec::new();
    }
    state.loading_message = "Watching for updates...".to_string();
    vec![fetch_runs(state)]
}

fn on_log_tick(state: &mut AppState, job_id: u64) -> Vec<Command> {
    if state.log_refresh_pending == Some(job_id) {
        state.log_refresh_pending = None;
    }
    let viewing = matches!(state.screen, Screen::LogViewer | Screen::LogFilter);
    if !viewing || !state.log.streaming || state.log.job_id != Some(job_id) {
        return Vec::new();
    }
    vec![Command::RefreshLogs {
        source: state.active_source(),
        job_id,
    }]
}

// --- Results ---

fn after_runs_loaded(state: &mut AppState) -> Vec<Command> {
    if state.current_run().is_some() {
        return fetch_current_jobs(state);
    }
    state.jobs.clear();
    state.job_cursor.reset(0);
    state.update_exit_code();
    if state.screen.is_overview() {
        state.screen = Screen::Ready;
    }
    schedule_poll(state).into_iter().collect()
}

fn on_jobs_loaded(state: &mut AppState, run_id: u64, jobs: Vec<Job>) -> Vec<Command> {
    if state.current_run().map(|r| r.id) != Some(run_id) {
        tracing::debug!(run_id, "dropping jobs of a run that is no longer selected");
        return Vec::new();
    }
    state.jobs = jobs;
    state.job_cursor.clamp(state.jobs.len());
    state.multi_job.cursor.clamp(state.jobs.len());
    if let Some(selected) = state.selected_job.as_ref().map(|j| j.id) {
        if let Some(fresh) = state.jobs.iter().find(|j| j.id == selected).cloned() {
            state.selected_job = Some(fresh);
        }
    }
    state.refresh_streaming();

    let mut commands = Vec::new();
    commands.extend(schedule_log_refresh(state));

    let completed = state.current_run().is_some_and(|r| r.is_completed());
    if state.watching && completed {
        state.watching = false;
        if !state.notification_sent {
            state.notification_sent = true;
            commands.extend(notify_command(state));
        }
    }
    state.update_exit_code();
    if state.screen.is_overview() {
        state.screen = state.resting_screen();
    }
    commands.extend(schedule_poll(state));
    commands
}

fn notify_command(state: &AppState) -> Option<Command> {
    if !state.config.notify && state.config.hook.is_none() {
        return None;
    }
    let run = state.current_run()?;
    Some(Command::Notify {
        report: CompletionReport::new(&state.active_source(), run, &state.jobs),
        desktop: state.config.notify,
        hook: state.config.hook.clone(),
    })
}

fn on_logs_refreshed(
    state: &mut AppState,
    job_id: u64,
    content: Option<String>,
    job: Option<Job>,
) -> Vec<Command> {
    if state.log.job_id != Some(job_id) {
        return Vec::new();
    }
    match job {
        Some(job) => {
            let running = job.is_running();
            state.merge_job(job);
            state.log.streaming = running && !state.multi_job.active;
        }
        None => state.refresh_streaming(),
    }
    if let Some(content) = content {
        if content != state.log.content {
            state.set_log_content(content);
            if state.log.streaming && state.log.search.term.is_empty() {
                state.log.scroll = state.max_log_scroll();
            }
        }
    }
    schedule_log_refresh(state).into_iter().collect()
}

// --- Keys ---

fn handle_action(state: &mut AppState, action: Action) -> Vec<Command> {
    match action {
        Action::None => Vec::new(),
        Action::Quit => {
            state.should_quit = true;
            Vec::new()
        }
        Action::SearchChar(c) => {
            if let Some(input) = state.log.search.input.as_mut() {
                input.push(c);
            }
            Vec::new()
        }
        Action::SearchBackspace => {
            if let Some(input) = state.log.search.input.as_mut() {
                input.pop();
            }
            Vec::new()
        }
        Action::SearchConfirm => {
            state.confirm_search();
            Vec::new()
        }
        Action::SearchCancel => {
            state.cancel_search();
            Vec::new()
        }
        Action::ShowHelp => {
            abandon_pending(state);
            state.drop_log();
            state.screen = Screen::Help;
            Vec::new()
        }
        Action::CloseHelp => {
            state.selected_job = None;
            state.screen = state.resting_screen();
            Vec::new()
        }
        Action::Refresh => refresh(state),
        Action::ToggleWatch => toggle_watch(state),
        Action::OpenBrowser => open_browser(state),
        Action::MoveUp => {
            move_up(state);
            Vec::new()
        }
        Action::MoveDown => {
            move_down(state);
            Vec::new()
        }
        Action::PageUp => {
            page(state, false);
            Vec::new()
        }
        Action::PageDown => {
            page(state, true);
            Vec::new()
        }
        Action::ScrollToTop => {
            if state.screen == Screen::LogViewer {
                state.log.scroll = 0;
            }
            Vec::new()
        }
        Action::ScrollToBottom => {
            if state.screen == Screen::LogViewer {
                state.log.scroll = state.max_log_scroll();
            }
            Vec::new()
        }
        Action::Select => select(state),
        Action::ToggleLogs => toggle_logs(state),
        Action::NextRun => step_run(state, true),
        Action::PrevRun => step_run(state, false),
        Action::Branches => {
            if !on_run_list(state) || state.is_multi_source() {
                return Vec::new();
            }
            await_view(state, Screen::BranchSelection, "Loading branches...");
            vec![Command::FetchBranches(state.source.clone())]
        }
        Action::StatusFilter => match state.screen {
            Screen::Ready | Screen::Watching => {
                let current = STATUS_FILTER_OPTIONS
                    .iter()
                    .position(|o| *o == state.status_filter)
                    .unwrap_or(0);
                state
                    .filter_cursor
                    .set(current, STATUS_FILTER_OPTIONS.len());
                state.screen = Screen::StatusFilter;
                Vec::new()
            }
            Screen::StatusFilter => commit_status_filter(state),
            _ => Vec::new(),
        },
        Action::Workflow => open_workflow(state),
        Action::Artifacts => {
            if !matches!(
                state.screen,
                Screen::Ready | Screen::Watching | Screen::JobDetails
            ) {
                return Vec::new();
            }
            let Some(run_id) = state.current_run().map(|r| r.id) else {
                return Vec::new();
            };
            await_view(state, Screen::ArtifactSelection, "Loading artifacts...");
            vec![Command::FetchArtifacts {
                source: state.active_source(),
                run_id,
            }]
        }
        Action::LogFilter => match state.screen {
            Screen::LogViewer if !state.multi_job.active => {
                let Some(job_id) = state.log.job_id else {
                    return Vec::new();
                };
                await_view(state, Screen::LogFilter, "Loading step structure...");
                vec![Command::FetchStructuredLogs {
                    source: state.active_source(),
                    job_id,
                }]
            }
            Screen::LogFilter => {
                apply_log_filter(state);
                Vec::new()
            }
            _ => Vec::new(),
        },
        Action::SaveLogs => save_logs(state),
        Action::ToggleHighlight => {
            if state.screen == Screen::LogViewer {
                state.log.highlight = !state.log.highlight;
            }
            Vec::new()
        }
        Action::Compare => match state.screen {
            Screen::Ready | Screen::Watching if state.visible_runs().len() >= 2 => {
                let len = state.visible_runs().len();
                state.compare = CompareState::default();
                state.compare.cursor.reset(len);
                state.screen = Screen::CompareSelect;
                Vec::new()
            }
            Screen::CompareSelect => compare_pick(state),
            Screen::CompareView => {
                state.screen = state.resting_screen();
                Vec::new()
            }
            _ => Vec::new(),
        },
        Action::MultiJob => match state.screen {
            Screen::Ready | Screen::Watching | Screen::LogViewer if state.jobs.len() > 1 => {
                state.multi_job.cursor.reset(state.jobs.len());
                state.screen = Screen::MultiJobSelect;
                Vec::new()
            }
            Screen::MultiJobSelect => apply_multi_job(state),
            _ => Vec::new(),
        },
        Action::ToggleSplit => {
            if state.screen == Screen::LogViewer && state.multi_job.active {
                state.multi_job.split = !state.multi_job.split;
            }
            Vec::new()
        }
        Action::Back => back(state),
        Action::Toggle => {
            toggle_selection(state);
            Vec::new()
        }
        Action::Rerun => rerun(state),
        Action::CancelRun => cancel_run(state),
        Action::Dispatch => dispatch(state),
        Action::StartSearch => {
            if state.screen == Screen::LogViewer && state.log.search.input.is_none() {
                state.log.search.input = Some(String::new());
            }
            Vec::new()
        }
        Action::NextMatch => {
            if state.screen == Screen::LogViewer {
                state.next_match();
            }
            Vec::new()
        }
        Action::PrevMatch => {
            if state.screen == Screen::LogViewer {
                state.prev_match();
            }
            Vec::new()
        }
    }
}

fn on_run_list(state: &AppState) -> bool {
    matches!(state.screen, Screen::Ready | Screen::Watching)
}

fn refresh(state: &mut AppState) -> Vec<Command> {
    state.clear_error();
    state.log.streaming = false;
    state.log.job_id = None;
    state.log.search = Default::default();
    state.multi_job.active = false;
    state.selected_job = None;
    abandon_pending(state);
    state.begin_loading("Refreshing...");
    vec![fetch_runs(state)]
}

fn toggle_watch(state: &mut AppState) -> Vec<Command> {
    state.watching = !state.watching;
    if state.watching {
        state.notification_sent = false;
        if state.screen.is_overview() {
            state.screen = Screen::Watching;
        }
        return schedule_poll(state).into_iter().collect();
    }
    if state.screen == Screen::Watching {
        state.screen = Screen::Ready;
    }
    Vec::new()
}

fn open_browser(state: &AppState) -> Vec<Command> {
    let url = if state.screen == Screen::JobDetails {
        state.selected_job.as_ref().and_then(|j| j.html_url.clone())
    } else {
        state.current_run().map(|r| r.html_url.clone())
    };
    url.filter(|u| !u.is_empty())
        .map(Command::OpenBrowser)
        .into_iter()
        .collect()
}

fn move_up(state: &mut AppState) {
    match state.screen {
        Screen::LogViewer => state.scroll_log_up(1),
        Screen::BranchSelection => state.branch_cursor.up(),
        Screen::StatusFilter => state.filter_cursor.up(),
        Screen::ArtifactSelection => state.artifact_cursor.up(),
        Screen::LogFilter => state.log_filter_cursor.up(),
        Screen::MultiJobSelect => state.multi_job.cursor.up(),
        Screen::CompareSelect => state.compare.cursor.up(),
        Screen::CompareView => state.compare.scroll = state.compare.scroll.saturating_sub(1),
        Screen::WorkflowViewer => state.workflow.scroll = state.workflow.scroll.saturating_sub(1),
        Screen::JobDetails => state.step_cursor.up(),
        Screen::Ready | Screen::Watching if state.is_multi_source() => state.sourced_cursor.up(),
        Screen::Ready | Screen::Watching => state.job_cursor.up(),
        Screen::Loading | Screen::Error | Screen::Help => {}
    }
}

fn move_down(state: &mut AppState) {
    match state.screen {
        Screen::LogViewer => state.scroll_log_down(1),
        Screen::BranchSelection => state.branch_cursor.down(state.branches.len()),
        Screen::StatusFilter => state.filter_cursor.down(STATUS_FILTER_OPTIONS.len()),
        Screen::ArtifactSelection => state.artifact_cursor.down(state.artifacts.len()),
        Screen::LogFilter => {
            let len = state.parsed_logs.as_ref().map_or(0, |p| p.steps.len());
            state.log_filter_cursor.down(len);
        }
        Screen::MultiJobSelect => state.multi_job.cursor.down(state.jobs.len()),
        Screen::CompareSelect => {
            let len = state.visible_runs().len();
            state.compare.cursor.down(len);
        }
        Screen::CompareView => {
            let max = compare_max_scroll(state);
            state.compare.scroll = (state.compare.scroll + 1).min(max);
        }
        Screen::WorkflowViewer => {
            let max = workflow_max_scroll(state);
            state.workflow.scroll = (state.workflow.scroll + 1).min(max);
        }
        Screen::JobDetails => {
            let len = state.selected_job.as_ref().map_or(0, |j| j.steps.len());
            state.step_cursor.down(len);
        }
        Screen::Ready | Screen::Watching if state.is_multi_source() => {
            state.sourced_cursor.down(state.sourced_runs.len());
        }
        Screen::Ready | Screen::Watching => state.job_cursor.down(state.jobs.len()),
        Screen::Loading | Screen::Error | Screen::Help => {}
    }
}

fn compare_max_scroll(state: &AppState) -> usize {
    state
        .compare
        .lines
        .len()
        .saturating_sub(state.viewport_height)
}

fn workflow_max_scroll(state: &AppState) -> usize {
    state
        .workflow
        .content
        .lines()
        .count()
        .saturating_sub(state.viewport_height)
}

fn page(state: &mut AppState, down: bool) {
    let amount = state.viewport_height.max(1);
    match state.screen {
        Screen::LogViewer if down => state.scroll_log_down(amount),
        Screen::LogViewer => state.scroll_log_up(amount),
        Screen::CompareView => {
            state.compare.scroll = if down {
                (state.compare.scroll + amount).min(compare_max_scroll(state))
            } else {
                state.compare.scroll.saturating_sub(amount)
            };
        }
        Screen::WorkflowViewer => {
            state.workflow.scroll = if down {
                (state.workflow.scroll + amount).min(workflow_max_scroll(state))
            } else {
                state.workflow.scroll.saturating_sub(amount)
            };
        }
        _ => {}
    }
}

fn select(state: &mut AppState) -> Vec<Command> {
    match state.screen {
        Screen::LogFilter => {
            apply_log_filter(state);
            Vec::new()
        }
        Screen::MultiJobSelect => apply_multi_job(state),
        Screen::CompareSelect => compare_pick(state),
        Screen::Ready | Screen::Watching if state.is_multi_source() => activate_sourced_run(state),
        Screen::Ready | Screen::Watching => {
            let Some(job_id) = state.highlighted_job().map(|j| j.id) else {
                return Vec::new();
            };
            state.pending_job_detail = Some(job_id);
            vec![Command::FetchJobDetail {
                source: state.active_source(),
                job_id,
            }]
        }
        Screen::JobDetails => {
            state.selected_job = None;
            state.step_cursor.reset(0);
            state.screen = Screen::Ready;
            Vec::new()
        }
        Screen::BranchSelection => commit_branch(state),
        Screen::StatusFilter => commit_status_filter(state),
        Screen::ArtifactSelection => download_artifact(state),
        _ => Vec::new(),
    }
}

fn activate_sourced_run(state: &mut AppState) -> Vec<Command> {
    let Some(index) = state.sourced_cursor.index() else {
        return Vec::new();
    };
    let Some(slug) = state.sourced_runs.get(index).map(|s| s.source.slug()) else {
        return Vec::new();
    };
    state.active_sourced = Some(index);
    state.jobs.clear();
    state.job_cursor.reset(0);
    state.begin_loading(&format!("Loading jobs for {slug}..."));
    fetch_current_jobs(state)
}

fn commit_branch(state: &mut AppState) -> Vec<Command> {
    let Some(name) = state
        .branch_cursor
        .index()
        .and_then(|i| state.branches.get(i))
        .map(|b| b.name.clone())
    else {
        return Vec::new();
    };
    state.begin_loading(&format!("Switching to branch '{name}'..."));
    state.source.branch = Some(name);
    state.run_cursor = Default::default();
    vec![fetch_runs(state)]
}

fn commit_status_filter(state: &mut AppState) -> Vec<Command> {
    let Some(option) = state
        .filter_cursor
        .index()
        .and_then(|i| STATUS_FILTER_OPTIONS.get(i))
    else {
        return Vec::new();
    };
    let label = if option.is_empty() { "all" } else { option };
    state.begin_loading(&format!("Applying '{label}' filter..."));
    state.status_filter = (*option).to_string();
    state.run_cursor = Default::default();
    state.sourced_cursor = Default::default();
    vec![fetch_runs(state)]
}

fn download_artifact(state: &mut AppState) -> Vec<Command> {
    let Some(artifact) = state
        .artifact_cursor
        .index()
        .and_then(|i| state.artifacts.get(i))
        .cloned()
    else {
        return Vec::new();
    };
    if artifact.expired {
        state.set_status(format!("Artifact {} has expired", artifact.name));
        return Vec::new();
    }
    state.set_status(format!("Downloading {}...", artifact.name));
    let dest = state
        .config
        .output_dir
        .join(format!("{}.zip", artifact.name));
    vec![Command::DownloadArtifact {
        source: state.active_source(),
        artifact,
        dest,
    }]
}

fn toggle_logs(state: &mut AppState) -> Vec<Command> {
    let target = match state.screen {
        Screen::Ready | Screen::Watching => state.highlighted_job(),
        Screen::JobDetails => state.selected_job.as_ref(),
        Screen::LogViewer => {
            state.close_log();
            return Vec::new();
        }
        _ => None,
    };
    let Some((job_id, name)) = target.map(|j| (j.id, j.display_name())) else {
        return Vec::new();
    };
    state.open_log(job_id, format!("Logs: {name}"));
    await_view(state, Screen::LogViewer, "Loading logs...");
    vec![Command::FetchLogs {
        source: state.active_source(),
        job_id,
    }]
}

fn step_run(state: &mut AppState, forward: bool) -> Vec<Command> {
    let len = state.runs.len();
    if !on_run_list(state) || state.is_multi_source() || len < 2 {
        return Vec::new();
    }
    let current = state.run_cursor.index().unwrap_or(0);
    let next = if forward {
        (current + 1 < len).then_some(current + 1)
    } else {
        current.checked_sub(1)
    };
    let Some(next) = next else {
        return Vec::new();
    };
    state.run_cursor.set(next, len);
    state.job_cursor = Default::default();
    state.pending_job_detail = None;
    fetch_current_jobs(state)
}

fn open_workflow(state: &mut AppState) -> Vec<Command> {
    if !matches!(
        state.screen,
        Screen::Ready | Screen::Watching | Screen::JobDetails
    ) {
        return Vec::new();
    }
    let Some(path) = state
        .current_run()
        .map(|r| r.path.clone())
        .filter(|p| !p.is_empty())
    else {
        return Vec::new();
    };
    await_view(
        state,
        Screen::WorkflowViewer,
        &format!("Loading workflow file {path}..."),
    );
    vec![Command::FetchWorkflow {
        source: state.active_source(),
        path,
    }]
}

fn apply_log_filter(state: &mut AppState) {
    if let Some(content) = state
        .parsed_logs
        .as_ref()
        .map(|p| p.filtered(&state.log_filter))
    {
        state.log.scroll = 0;
        state.set_log_content(content);
    }
    state.screen = Screen::LogViewer;
}

fn apply_multi_job(state: &mut AppState) -> Vec<Command> {
    if state.multi_job.selected.is_empty() {
        state.screen = state.resting_screen();
        return Vec::new();
    }
    let jobs: Vec<(u64, String)> = state
        .multi_job
        .selected
        .iter()
        .map(|&id| (id, state.job_name(id).unwrap_or_default().to_string()))
        .collect();
    state.multi_job.loading = true;
    state.begin_loading(&format!("Loading logs for {} jobs...", jobs.len()));
    vec![Command::FetchMultiJobLogs {
        source: state.active_source(),
        jobs,
    }]
}

fn compare_pick(state: &mut AppState) -> Vec<Command> {
    let len = state.visible_runs().len();
    let Some(cursor) = state.compare.cursor.index() else {
        return Vec::new();
    };
    let Some(first) = state.compare.first else {
        state.compare.first = Some(cursor);
        if cursor == 0 && len > 1 {
            state.compare.cursor.set(1, len);
        }
        return Vec::new();
    };
    if first == cursor {
        return Vec::new();
    }
    let (Some(left), Some(right)) = (state.sourced_run_at(first), state.sourced_run_at(cursor))
    else {
        return Vec::new();
    };
    state.compare.second = Some(cursor);
    state.compare.pending = Some((left.run.id, right.run.id));
    state.compare.left_title = format!("#{} {}", left.run.run_number, left.run.title());
    state.compare.right_title = format!("#{} {}", right.run.run_number, right.run.title());
    state.begin_loading("Loading logs for comparison...");
    vec![Command::FetchComparison { left, right }]
}

fn back(state: &mut AppState) -> Vec<Command> {
    match state.screen {
        Screen::LogFilter => state.screen = Screen::LogViewer,
        Screen::LogViewer => {
            if state.log.search.term.is_empty() {
                state.close_log();
            } else {
                state.cancel_search();
            }
        }
        Screen::JobDetails => {
            state.selected_job = None;
            state.screen = state.resting_screen();
        }
        Screen::Error => {
            state.clear_error();
            state.screen = state.resting_screen();
        }
        Screen::MultiJobSelect
        | Screen::CompareSelect
        | Screen::CompareView
        | Screen::BranchSelection
        | Screen::StatusFilter
        | Screen::ArtifactSelection
        | Screen::WorkflowViewer => state.screen = state.resting_screen(),
        Screen::Loading | Screen::Ready | Screen::Watching | Screen::Help => {}
    }
    Vec::new()
}

fn toggle_selection(state: &mut AppState) {
    match state.screen {
        Screen::LogFilter => {
            let number = state.log_filter_cursor.index().and_then(|i| {
                state
                    .parsed_logs
                    .as_ref()
                    .and_then(|p| p.steps.get(i))
                    .map(|s| s.number)
            });
            if let Some(number) = number {
                state.toggle_log_step(number);
            }
        }
        Screen::MultiJobSelect => {
            let Some(job_id) = state
                .multi_job
                .cursor
                .index()
                .and_then(|i| state.jobs.get(i))
                .map(|j| j.id)
            else {
                return;
            };
            if !state.toggle_multi_job(job_id) {
                state.set_status(format!("At most {MAX_MULTI_JOBS} jobs can be selected"));
            }
        }
        _ => {}
    }
}

fn save_logs(state: &mut AppState) -> Vec<Command> {
    if state.screen != Screen::LogViewer || state.log.content.is_empty() {
        return Vec::new();
    }
    let Some(run) = state.current_run() else {
        return Vec::new();
    };
    let source = state.active_source();
    let branch = run
        .head_branch
        .clone()
        .or_else(|| source.branch.clone())
        .unwrap_or_default();
    let export = LogExport {
        repo_slug: source.slug(),
        branch,
        run_number: run.run_number,
        run_id: run.id,
        job_id: state.log.job_id,
        content: state.log.content.clone(),
    };
    vec![Command::SaveLogs {
        export,
        dir: state.config.output_dir.clone(),
    }]
}

fn run_action_allowed(state: &AppState) -> bool {
    matches!(
        state.screen,
        Screen::Ready | Screen::Watching | Screen::JobDetails
    )
}

fn rerun(state: &mut AppState) -> Vec<Command> {
    if !run_action_allowed(state) {
        return Vec::new();
    }
    let Some(run) = state.current_run().cloned() else {
        return Vec::new();
    };
    if !run.is_completed() {
        state.set_status("Cannot rerun: run is still in progress");
        return Vec::new();
    }
    state.set_status(format!("Requesting rerun of #{}...", run.run_number));
    vec![Command::Rerun {
        source: state.active_source(),
        run_id: run.id,
        run_number: run.run_number,
        failed_only: run.is_failure(),
    }]
}

fn cancel_run(state: &mut AppState) -> Vec<Command> {
    if !run_action_allowed(state) {
        return Vec::new();
    }
    let Some(run) = state.current_run().cloned() else {
        return Vec::new();
    };
    if run.is_completed() {
        state.set_status(format!("Run #{} has already completed", run.run_number));
        return Vec::new();
    }
    state.set_status(format!("Cancelling #{}...", run.run_number));
    vec![Command::Cancel {
        source: state.active_source(),
        run_id: run.id,
        run_number: run.run_number,
    }]
}

fn dispatch(state: &mut AppState) -> Vec<Command> {
    if !run_action_allowed(state) {
        return Vec::new();
    }
    let Some(run) = state.current_run().cloned() else {
        return Vec::new();
    };
    let workflow_file = run.workflow_file().to_string();
    if workflow_file.is_empty() {
        state.set_status("Run has no workflow file to dispatch");
        return Vec::new();
    }
    let source = state.active_source();
    let git_ref = source
        .branch
        .clone()
        .unwrap_or_else(|| run.branch().to_string());
    if git_ref.is_empty() {
        state.set_status("No branch to dispatch on");
        return Vec::new();
    }
    state.set_status(format!("Dispatching {workflow_file} on {git_ref}..."));
    vec![Command::Dispatch {
        source,
        workflow_file,
        git_ref,
    }]
}
