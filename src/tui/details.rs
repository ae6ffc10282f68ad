use crate::app::{format_duration, truncate, AppState, Job, Step};
use crate::tui::runs::{scroll_offset, status_icon};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let Some(job) = &state.selected_job else {
        return;
    };

    let fields = summary(job);
    let chunks = Layout::vertical([
        Constraint::Length(fields.len() as u16 + 2),
        Constraint::Min(3),
    ])
    .split(area);

    let label_width = fields
        .iter()
        .map(|(l, _)| UnicodeWidthStr::width(*l))
        .max()
        .unwrap_or(0);
    let value_max = (chunks[0].width as usize).saturating_sub(label_width + 4);
    let lines: Vec<Line> = fields
        .iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(
                    format!("{label:>label_width$}  "),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(truncate(value, value_max), Style::default().fg(Color::White)),
            ])
        })
        .collect();
    let block = Block::default()
        .title(format!(" {} ", job.display_name()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(Paragraph::new(lines).block(block), chunks[0]);

    render_steps(f, chunks[1], state, &job.steps);
}

/// Label/value rows shown above the step list.
pub fn summary(job: &Job) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Status", job.status.as_str().to_string()),
        (
            "Conclusion",
            job.conclusion.map_or("-", |c| c.as_str()).to_string(),
        ),
    ];
    if let Some(runner) = &job.runner_name {
        rows.push(("Runner", runner.clone()));
    }
    if let Some(started) = job.started_at {
        rows.push((
            "Started",
            started
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        ));
    }
    if job.is_completed() {
        rows.push(("Duration", format_duration(job.duration())));
    }
    if let Some(url) = &job.html_url {
        rows.push(("URL", url.clone()));
    }
    rows
}

fn render_steps(f: &mut Frame, area: Rect, state: &AppState, steps: &[Step]) {
    let block = Block::default()
        .title(format!(" Steps ({}) ", steps.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner_height = area.height.saturating_sub(2) as usize;
    let offset = scroll_offset(state.step_cursor.index(), inner_height);

    let lines: Vec<Line> = steps
        .iter()
        .enumerate()
        .skip(offset)
        .take(inner_height)
        .map(|(i, step)| {
            let (icon, color) = status_icon(step.status, step.conclusion);
            let base = if state.step_cursor.is(i) {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            let duration = match (step.started_at, step.completed_at) {
                (Some(start), Some(end)) => format!(" {}", format_duration(end - start)),
                _ => String::new(),
            };
            Line::from(vec![
                Span::styled(format!(" {icon} "), base.fg(color)),
                Span::styled(format!("{:>2}. ", step.number), base.fg(Color::DarkGray)),
                Span::styled(step.name.clone(), base.fg(Color::White)),
                Span::styled(duration, base.fg(Color::DarkGray)),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}
