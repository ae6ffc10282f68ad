//! Overview screen: recent runs on the left, jobs of the current run on the right.

use crate::app::{
    format_duration, truncate, AppState, Conclusion, Job, Run, RunStatus, NARROW_WIDTH_THRESHOLD,
};
use chrono::{DateTime, Utc};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub fn status_icon(status: RunStatus, conclusion: Option<Conclusion>) -> (&'static str, Color) {
    match (status, conclusion) {
        (RunStatus::Completed, Some(Conclusion::Success)) => ("✓", Color::Green),
        (RunStatus::Completed, Some(Conclusion::Failure | Conclusion::StartupFailure)) => {
            ("✗", Color::Red)
        }
        (RunStatus::Completed, Some(Conclusion::TimedOut)) => ("✗", Color::Red),
        (RunStatus::Completed, Some(Conclusion::Cancelled)) => ("⊘", Color::Yellow),
        (RunStatus::Completed, Some(Conclusion::Skipped | Conclusion::Neutral)) => {
            ("⊘", Color::DarkGray)
        }
        (RunStatus::Completed, Some(Conclusion::ActionRequired)) => ("!", Color::Yellow),
        (RunStatus::Completed, _) => ("·", Color::DarkGray),
        (RunStatus::InProgress, _) => ("⟳", Color::Yellow),
        (
            RunStatus::Queued
            | RunStatus::Waiting
            | RunStatus::Pending
            | RunStatus::Requested
            | RunStatus::Unknown,
            _,
        ) => ("·", Color::DarkGray),
    }
}

/// Compact age such as `42s`, `5m`, `3h` or `2d`.
pub fn format_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{s}s"),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3600),
        s => format!("{}d", s / 86_400),
    }
}

/// First visible row so that `selected` stays on screen.
pub fn scroll_offset(selected: Option<usize>, height: usize) -> usize {
    match selected {
        Some(i) if height > 0 && i >= height => i + 1 - height,
        _ => 0,
    }
}

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let narrow = area.width < NARROW_WIDTH_THRESHOLD;
    let chunks = Layout::default()
        .direction(if narrow {
            Direction::Vertical
        } else {
            Direction::Horizontal
        })
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_runs(f, chunks[0], state);
    render_jobs(f, chunks[1], state);
}

fn render_runs(f: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .title(" Runs ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner_height = area.height.saturating_sub(2) as usize;
    let inner_width = area.width.saturating_sub(2) as usize;

    if state.visible_runs().is_empty() {
        let msg = if state.status_filter.is_empty() {
            "No workflow runs found".to_string()
        } else {
            format!("No '{}' runs", state.status_filter)
        };
        let para = Paragraph::new(msg)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(para, area);
        return;
    }

    let now = Utc::now();
    let lines: Vec<Line> = if state.is_multi_source() {
        let offset = scroll_offset(state.sourced_cursor.index(), inner_height);
        state
            .sourced_runs
            .iter()
            .enumerate()
            .skip(offset)
            .take(inner_height)
            .map(|(i, sourced)| {
                run_line(
                    &sourced.run,
                    Some(&sourced.source.slug()),
                    state.sourced_cursor.is(i),
                    state.active_sourced == Some(i),
                    inner_width,
                    now,
                )
            })
            .collect()
    } else {
        let offset = scroll_offset(state.run_cursor.index(), inner_height);
        state
            .runs
            .iter()
            .enumerate()
            .skip(offset)
            .take(inner_height)
            .map(|(i, run)| {
                let current = state.run_cursor.is(i);
                run_line(run, None, current, current, inner_width, now)
            })
            .collect()
    };

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn run_line<'a>(
    run: &'a Run,
    repo: Option<&str>,
    selected: bool,
    active: bool,
    width: usize,
    now: DateTime<Utc>,
) -> Line<'a> {
    let (icon, color) = status_icon(run.status, run.conclusion);
    let marker = if active { "▸ " } else { "  " };
    let age = format_age(run.updated_at, now);

    let mut prefix = format!("#{} ", run.run_number);
    if let Some(repo) = repo {
        prefix = format!("{repo} {prefix}");
    }
    let branch = run.branch();
    // marker + icon + spaces + prefix + branch + age
    let fixed = 2 + 2 + prefix.chars().count() + branch.chars().count() + age.len() + 4;
    let title = truncate(run.title(), width.saturating_sub(fixed));

    let base = if selected {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::styled(marker, base.fg(Color::Cyan)),
        Span::styled(format!("{icon} "), base.fg(color)),
        Span::styled(prefix, base.fg(Color::DarkGray)),
        Span::styled(title, base.fg(Color::White)),
        Span::styled(format!(" {branch}"), base.fg(Color::Yellow)),
        Span::styled(format!(" {age}"), base.fg(Color::DarkGray)),
    ])
}

fn render_jobs(f: &mut Frame, area: Rect, state: &AppState) {
    let title = match state.current_run() {
        Some(run) => format!(" Jobs: {} #{} ", run.workflow_name(), run.run_number),
        None => " Jobs ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner_height = area.height.saturating_sub(2) as usize;
    let inner_width = area.width.saturating_sub(2) as usize;

    if state.jobs.is_empty() {
        let para = Paragraph::new("No jobs")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(para, area);
        return;
    }

    let offset = scroll_offset(state.job_cursor.index(), inner_height);
    let lines: Vec<Line> = state
        .jobs
        .iter()
        .enumerate()
        .skip(offset)
        .take(inner_height)
        .map(|(i, job)| job_line(job, state.job_cursor.is(i), inner_width))
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn job_line(job: &Job, selected: bool, width: usize) -> Line<'static> {
    let (icon, color) = status_icon(job.status, job.conclusion);
    let duration = if job.is_completed() {
        format!(" {}", format_duration(job.duration()))
    } else {
        String::new()
    };
    let name = truncate(&job.display_name(), width.saturating_sub(duration.len() + 4));
    let base = if selected {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::styled(format!(" {icon} "), base.fg(color)),
        Span::styled(name, base.fg(Color::White)),
        Span::styled(duration, base.fg(Color::DarkGray)),
    ])
}
