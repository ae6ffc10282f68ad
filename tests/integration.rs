
use fixtures::*;
use ghmon::app::{AppConfig, AppState, RunStatus, Screen};
use ghmon::commands::{self, Command};
use ghmon::config::Source;
use ghmon::controller;
use ghmon::events::AppEvent;
use ghmon::gh::error::{ErrorKind, GhError};
use ghmon::output::Report;
use ghmon::sources;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use std::collections::VecDeque;

fn press(code: KeyCode) -> AppEvent {
    AppEvent::Key(KeyEvent {
        code,
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Press,
        state: KeyEventState::NONE,
    })
}

fn ch(c: char) -> AppEvent {
    press(KeyCode::Char(c))
}

fn single_source_state() -> AppState {
    let source = Source::new("o", "r").with_branch(Some("main".to_string()));
    AppState::new(AppConfig::new(vec![source]))
}

fn is_deferred(command: &Command) -> bool {
    matches!(
        command,
        Command::SchedulePoll(_)
            | Command::ScheduleLogRefresh { .. }
            | Command::Notify { .. }
            | Command::OpenBrowser(_)
            | Command::SaveLogs { .. }
    )
}

/// Runs commands against `client` and feeds their results back until the
/// session settles. Timers and local side effects are returned unexecuted.
async fn drive(state: &mut AppState, client: &FakeClient, initial: Vec<Command>) -> Vec<Command> {
    let mut queue: VecDeque<Command> = initial.into();
    let mut deferred = Vec::new();
    while let Some(command) = queue.pop_front() {
        if is_deferred(&command) {
            deferred.push(command);
            continue;
        }
        if let Some(event) = commands::run(command, client).await {
            queue.extend(controller::update(state, event));
        }
    }
    deferred
}

async fn press_and_drive(state: &mut AppState, client: &FakeClient, event: AppEvent) -> Vec<Command> {
    let commands = controller::update(state, event);
    drive(state, client, commands).await
}

// ========== Aggregation ==========

#[tokio::test]
async fn aggregation_orders_runs_across_sources() {
    let client = FakeClient::new()
        .with_runs("org/a", vec![run_updated_at(1, 10), run_updated_at(2, 30)])
        .with_runs("org/b", vec![run_updated_at(3, 20)]);
    let sources = [Source::new("org", "a"), Source::new("org", "b")];

    let aggregate = sources::fetch_all(&client, &sources, None).await.unwrap();

    let order: Vec<(u64, String)> = aggregate
        .runs
        .iter()
        .map(|s| (s.run.id, s.source.slug()))
        .collect();
    assert_eq!(
        order,
        vec![
            (2, "org/a".to_string()),
            (3, "org/b".to_string()),
            (1, "org/a".to_string()),
        ]
    );
    assert!(aggregate.failed.is_empty());
}

#[tokio::test]
async fn aggregation_skips_failing_source() {
    let client = FakeClient::new()
        .with_runs("org/a", vec![run_with_id(1)])
        .failing("org/b");
    let sources = [Source::new("org", "a"), Source::new("org", "b")];

    let aggregate = sources::fetch_all(&client, &sources, None).await.unwrap();

    assert_eq!(aggregate.runs.len(), 1);
    assert_eq!(aggregate.failed.len(), 1);
    assert_eq!(aggregate.failed[0].0, "org/b");
}

#[tokio::test]
async fn aggregation_fails_when_no_source_answers() {
    let client = FakeClient::new().failing("org/a").failing("org/b");
    let sources = [Source::new("org", "a"), Source::new("org", "b")];

    let err = sources::fetch_all(&client, &sources, None).await.unwrap_err();
    assert!(matches!(err, GhError::NoRunsAcrossSources));
}

#[tokio::test]
async fn aggregation_passes_branch_and_status_per_source() {
    let client = FakeClient::new()
        .with_runs("org/a", vec![run_with_id(1)])
        .with_runs("org/b", vec![run_failed(2)]);
    let sources = [
        Source::new("org", "a").with_branch(Some("dev".to_string())),
        Source::new("org", "b"),
    ];

    let aggregate = sources::fetch_all(&client, &sources, Some("failure"))
        .await
        .unwrap();

    assert_eq!(aggregate.runs.len(), 1);
    assert_eq!(aggregate.runs[0].run.id, 2);
    assert_eq!(
        client.calls(),
        vec!["runs org/a dev failure", "runs org/b - failure"]
    );
}

// ========== Session flows ==========

#[tokio::test]
async fn session_loads_runs_jobs_and_streams_logs() {
    let client = FakeClient::new()
        .with_runs("o/r", vec![run_in_progress(1)])
        .with_jobs(1, vec![job(10, 1, RunStatus::InProgress)])
        .with_log(10, "line one");
    let mut state = single_source_state();

    let init = controller::init(&mut state);
    assert_eq!(state.screen, Screen::Loading);
    drive(&mut state, &client, init).await;

    assert_eq!(state.screen, Screen::Ready);
    assert_eq!(state.runs.len(), 1);
    assert_eq!(state.jobs.len(), 1);
    assert_eq!(client.calls(), vec!["runs o/r main -", "jobs 1"]);

    let timers = press_and_drive(&mut state, &client, ch('l')).await;
    assert_eq!(state.screen, Screen::LogViewer);
    assert!(state.log.content.contains("line one"));
    assert!(state.log.streaming);
    assert!(matches!(
        timers.as_slice(),
        [Command::ScheduleLogRefresh { job_id: 10, .. }]
    ));

    client.set_log(10, "line one\nline two");
    client.set_jobs(1, vec![job(10, 1, RunStatus::Completed)]);
    let timers = press_and_drive(&mut state, &client, AppEvent::LogTick(10)).await;

    assert!(state.log.content.contains("line two"));
    assert!(!state.log.streaming);
    assert!(timers.is_empty());
    assert_eq!(state.screen, Screen::LogViewer);
}

#[tokio::test]
async fn watch_session_stops_when_run_completes() {
    let client = FakeClient::new()
        .with_runs("o/r", vec![run_in_progress(1)])
        .with_jobs(1, vec![job(10, 1, RunStatus::InProgress)]);
    let mut state = single_source_state();
    let init = controller::init(&mut state);
    drive(&mut state, &client, init).await;

    let timers = press_and_drive(&mut state, &client, ch('w')).await;
    assert_eq!(state.screen, Screen::Watching);
    assert!(matches!(timers.as_slice(), [Command::SchedulePoll(_)]));

    client.set_runs("o/r", vec![run_failed(1)]);
    client.set_jobs(1, vec![job(10, 1, RunStatus::Completed)]);
    let timers = press_and_drive(&mut state, &client, AppEvent::PollTick).await;

    assert!(!state.watching);
    assert_eq!(state.screen, Screen::Ready);
    assert_eq!(state.exit_code, 1);
    assert!(!timers.iter().any(|c| matches!(c, Command::SchedulePoll(_))));
}

#[tokio::test]
async fn missing_repository_surfaces_error_with_hint() {
    let client = FakeClient::new().failing("o/r");
    let mut state = single_source_state();
    let init = controller::init(&mut state);
    drive(&mut state, &client, init).await;

    assert_eq!(state.screen, Screen::Error);
    assert_eq!(state.exit_code, 2);
    let error = state.error.as_ref().unwrap();
    assert!(error.message.contains("not found"));
    assert!(!error.hint.is_empty());
}

#[tokio::test]
async fn multi_job_view_inlines_per_job_failures() {
    let client = FakeClient::new()
        .with_runs("o/r", vec![run_with_id(1)])
        .with_jobs(
            1,
            vec![
                job(10, 1, RunStatus::Completed),
                job(11, 1, RunStatus::Completed),
            ],
        )
        .with_log(10, "build ok");
    let mut state = single_source_state();
    let init = controller::init(&mut state);
    drive(&mut state, &client, init).await;

    press_and_drive(&mut state, &client, ch('m')).await;
    press_and_drive(&mut state, &client, ch(' ')).await;
    press_and_drive(&mut state, &client, press(KeyCode::Down)).await;
    press_and_drive(&mut state, &client, ch(' ')).await;
    press_and_drive(&mut state, &client, press(KeyCode::Enter)).await;

    assert_eq!(state.screen, Screen::LogViewer);
    assert!(state.multi_job.active);
    let sections = &state.multi_job.sections;
    assert_eq!(sections.len(), 2);
    assert!(sections[0].content.contains("build ok"));
    assert!(sections[1].content.starts_with("Error loading logs:"));
    assert!(state.log.content.contains("JOB: job-11"));
}

#[tokio::test]
async fn comparison_names_the_run_without_jobs() {
    let client = FakeClient::new()
        .with_runs("o/r", vec![run_with_id(1), run_with_id(2)])
        .with_jobs(1, vec![job(10, 1, RunStatus::Completed)])
        .with_log(10, "same");
    let mut state = single_source_state();
    let init = controller::init(&mut state);
    drive(&mut state, &client, init).await;

    press_and_drive(&mut state, &client, ch('c')).await;
    press_and_drive(&mut state, &client, press(KeyCode::Enter)).await;
    press_and_drive(&mut state, &client, press(KeyCode::Enter)).await;

    assert_eq!(state.screen, Screen::Error);
    let error = state.error.as_ref().unwrap();
    assert!(error.message.contains("failed to fetch jobs for run #2"));
    assert_eq!(state.compare.pending, None);
}

#[tokio::test]
async fn comparison_of_two_runs_shows_diff() {
    let client = FakeClient::new()
        .with_runs("o/r", vec![run_with_id(1), run_with_id(2)])
        .with_jobs(1, vec![job(10, 1, RunStatus::Completed)])
        .with_jobs(2, vec![job(20, 2, RunStatus::Completed)])
        .with_log(10, "a\nb")
        .with_log(20, "a\nc");
    let mut state = single_source_state();
    let init = controller::init(&mut state);
    drive(&mut state, &client, init).await;

    press_and_drive(&mut state, &client, ch('c')).await;
    press_and_drive(&mut state, &client, press(KeyCode::Enter)).await;
    press_and_drive(&mut state, &client, press(KeyCode::Enter)).await;

    assert_eq!(state.screen, Screen::CompareView);
    assert!(state.compare.lines.iter().any(|l| l.rendered() == "- b"));
    assert!(state.compare.lines.iter().any(|l| l.rendered() == "+ c"));
}

#[tokio::test]
async fn rerun_of_failed_run_reports_and_refreshes() {
    let client = FakeClient::new()
        .with_runs("o/r", vec![run_failed(1)])
        .with_jobs(1, vec![job(10, 1, RunStatus::Completed)]);
    let mut state = single_source_state();
    let init = controller::init(&mut state);
    drive(&mut state, &client, init).await;

    press_and_drive(&mut state, &client, ch('R')).await;

    let calls = client.calls();
    assert!(calls.contains(&"rerun 1 true".to_string()));
    assert_eq!(
        calls.iter().filter(|c| c.starts_with("runs ")).count(),
        2,
        "runs are refetched after the rerun"
    );
    assert_eq!(
        state.status_message.as_ref().map(|m| m.text.as_str()),
        Some("Rerun requested for failed jobs of run #1")
    );
}

#[tokio::test]
async fn multi_source_session_reports_unavailable_sources() {
    let client = FakeClient::new()
        .with_runs("org/a", vec![run_updated_at(1, 10)])
        .with_jobs(1, vec![job(10, 1, RunStatus::Completed)])
        .failing("org/b");
    let mut state = AppState::new(AppConfig::new(vec![
        Source::new("org", "a"),
        Source::new("org", "b"),
    ]));
    let init = controller::init(&mut state);
    assert_eq!(state.loading_message, "Loading runs from 2 repositories...");
    drive(&mut state, &client, init).await;

    assert_eq!(state.screen, Screen::Ready);
    assert_eq!(state.sourced_runs.len(), 1);
    assert_eq!(state.failed_sources, vec!["org/b".to_string()]);
    assert_eq!(state.jobs.len(), 1);
}

// ========== One-shot report ==========

#[tokio::test]
async fn report_describes_latest_run() {
    let client = FakeClient::new()
        .with_runs("o/r", vec![run_failed(7)])
        .with_jobs(7, vec![job(70, 7, RunStatus::Completed)]);
    let source = Source::new("o", "r").with_branch(Some("main".to_string()));

    let report = Report::fetch(&client, &source).await.unwrap();

    assert_eq!(report.exit_code(), 1);
    let plain = report.to_plain();
    assert!(plain.contains("Repository: o/r"));
    assert!(plain.contains("Run #7"));
    assert!(plain.contains("job-70"));
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["run"]["id"], 7);
    assert_eq!(json["jobs"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn report_without_runs_exits_two() {
    let client = FakeClient::new();
    let source = Source::new("o", "r");

    let report = Report::fetch(&client, &source).await.unwrap();

    assert_eq!(report.exit_code(), 2);
    assert!(report.to_plain().contains("No workflow runs found"));
    assert!(!report.to_json().unwrap().contains("\"jobs\""));
}

#[tokio::test]
async fn report_propagates_classified_errors() {
    let client = FakeClient::new().failing("o/r");
    let err = Report::fetch(&client, &Source::new("o", "r"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
