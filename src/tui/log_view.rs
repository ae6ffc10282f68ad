//! Log viewer, split multi-job layout and the workflow file viewer.

use crate::app::{AppState, JobLogSection};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Content class used by syntax highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Error,
    Warning,
    Group,
    StepHeader,
    Command,
    Plain,
}

impl LineKind {
    pub fn classify(line: &str) -> Self {
        let body = strip_timestamp(line).1;
        let lower = body.to_lowercase();
        if body.starts_with("=== ") && body.ends_with(" ===") {
            Self::StepHeader
        } else if body.starts_with("##[group]") || body.starts_with("##[endgroup]") {
            Self::Group
        } else if lower.starts_with("##[error]") || lower.contains("error") || lower.contains("fail")
        {
            Self::Error
        } else if lower.starts_with("##[warning]") || lower.contains("warning") {
            Self::Warning
        } else if body.starts_with("##[command]") || body.starts_with("[command]") {
            Self::Command
        } else {
            Self::Plain
        }
    }

    pub fn style(self) -> Style {
        match self {
            Self::Error => Style::default().fg(Color::Red),
            Self::Warning => Style::default().fg(Color::Yellow),
            Self::Group => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            Self::StepHeader => Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            Self::Command => Style::default().fg(Color::Blue),
            Self::Plain => Style::default(),
        }
    }
}

/// Splits a leading runner timestamp (`2024-01-01T10:00:00.1234567Z `) off a line.
pub fn strip_timestamp(line: &str) -> (&str, &str) {
    let Some((first, rest)) = line.split_once(' ') else {
        return ("", line);
    };
    let bytes = first.as_bytes();
    let looks_like_timestamp = bytes.len() >= 20
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[10] == b'T'
        && first.ends_with('Z');
    if looks_like_timestamp {
        (first, rest)
    } else {
        ("", line)
    }
}

fn styled_line<'a>(line: &'a str, highlight: bool, search: Option<bool>) -> Line<'a> {
    let mut spans = Vec::with_capacity(2);
    if highlight {
        let (stamp, body) = strip_timestamp(line);
        if !stamp.is_empty() {
            spans.push(Span::styled(
                format!("{stamp} "),
                Style::default().fg(Color::DarkGray),
            ));
        }
        spans.push(Span::styled(body, LineKind::classify(line).style()));
    } else {
        spans.push(Span::raw(line));
    }

    let line = Line::from(spans);
    match search {
        Some(true) => line.style(Style::default().bg(Color::Yellow).fg(Color::Black)),
        Some(false) => line.style(Style::default().bg(Color::DarkGray)),
        None => line,
    }
}

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    if state.multi_job.active && state.multi_job.split && state.multi_job.sections.len() > 1 {
        render_split(f, area, state, &state.multi_job.sections);
        return;
    }

    let inner_height = area.height.saturating_sub(2) as usize;
    let lines = state.log.lines();
    let total = lines.len();

    let mut title = format!(" {} ", state.log.title);
    if state.log.streaming {
        title.push_str("● LIVE ");
    }
    if total > inner_height {
        title.push_str(&format!(
            "[{}-{}/{}] ",
            state.log.scroll + 1,
            (state.log.scroll + inner_height).min(total),
            total
        ));
    }
    let search = &state.log.search;
    if !search.term.is_empty() {
        let position = search.current.map_or(0, |c| c + 1);
        title.push_str(&format!(
            "/{} ({position}/{}) ",
            search.term,
            search.matches.len()
        ));
    }

    let current_line = search.current.and_then(|c| search.matches.get(c)).copied();
    let visible: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(state.log.scroll)
        .take(inner_height)
        .map(|(i, l)| {
            let mark = if current_line == Some(i) {
                Some(true)
            } else if search.matches.binary_search(&i).is_ok() {
                Some(false)
            } else {
                None
            };
            styled_line(l, state.log.highlight, mark)
        })
        .collect();

    let border = if state.log.streaming {
        Color::Green
    } else {
        Color::Yellow
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    f.render_widget(Paragraph::new(visible).block(block), area);
}

fn render_split(f: &mut Frame, area: Rect, state: &AppState, sections: &[JobLogSection]) {
    let count = sections.len() as u32;
    let constraints: Vec<Constraint> = sections
        .iter()
        .map(|_| Constraint::Ratio(1, count))
        .collect();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    let inner_height = area.height.saturating_sub(2) as usize;
    for (section, column) in sections.iter().zip(columns.iter()) {
        let lines: Vec<Line> = section
            .content
            .lines()
            .skip(state.log.scroll)
            .take(inner_height)
            .map(|l| styled_line(l, state.log.highlight, None))
            .collect();
        let block = Block::default()
            .title(format!(" {} ", section.label()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow));
        f.render_widget(Paragraph::new(lines).block(block), *column);
    }
}

pub fn render_workflow(f: &mut Frame, area: Rect, state: &AppState) {
    let inner_height = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = state
        .workflow
        .content
        .lines()
        .enumerate()
        .skip(state.workflow.scroll)
        .take(inner_height)
        .map(|(i, l)| {
            Line::from(vec![
                Span::styled(format!("{:>4} ", i + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(l, yaml_style(l)),
            ])
        })
        .collect();
    let block = Block::default()
        .title(format!(" {} ", state.workflow.path))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn yaml_style(line: &str) -> Style {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') {
        Style::default().fg(Color::DarkGray)
    } else if trimmed.ends_with(':') {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    }
}
