//! Centered list overlays: branches, status filter, artifacts, log steps,
//! multi-job selection and the comparison run picker.

use crate::app::{format_bytes, AppState, Cursor, Screen, MAX_MULTI_JOBS, STATUS_FILTER_OPTIONS};
use crate::tui::render::centered;
use crate::tui::runs::{scroll_offset, status_icon};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

struct Picker<'a> {
    title: String,
    items: Vec<Line<'a>>,
    cursor: Cursor,
    empty: &'static str,
}

fn checkbox(checked: bool) -> &'static str {
    if checked {
        "[x] "
    } else {
        "[ ] "
    }
}

fn build(state: &AppState) -> Option<Picker<'_>> {
    let picker = match state.screen {
        Screen::BranchSelection => Picker {
            title: "Select branch".to_string(),
            items: state
                .branches
                .iter()
                .map(|b| {
                    let current = state.source.branch.as_deref() == Some(b.name.as_str());
                    let mut spans = vec![
                        Span::raw(if current { "● " } else { "  " }),
                        Span::raw(b.name.as_str()),
                    ];
                    if b.protected {
                        spans.push(Span::styled(
                            " (protected)",
                            Style::default().fg(Color::DarkGray),
                        ));
                    }
                    Line::from(spans)
                })
                .collect(),
            cursor: state.branch_cursor,
            empty: "No branches",
        },
        Screen::StatusFilter => Picker {
            title: "Filter by status".to_string(),
            items: STATUS_FILTER_OPTIONS
                .iter()
                .map(|option| {
                    let current = state.status_filter == *option;
                    let label = if option.is_empty() { "all" } else { *option };
                    Line::from(vec![
                        Span::raw(if current { "● " } else { "  " }),
                        Span::raw(label),
                    ])
                })
                .collect(),
            cursor: state.filter_cursor,
            empty: "",
        },
        Screen::ArtifactSelection => Picker {
            title: "Artifacts".to_string(),
            items: state
                .artifacts
                .iter()
                .map(|a| {
                    let detail = if a.expired {
                        " expired".to_string()
                    } else {
                        format!(" {}", format_bytes(a.size_in_bytes))
                    };
                    let name_style = if a.expired {
                        Style::default().fg(Color::DarkGray)
                    } else {
                        Style::default()
                    };
                    Line::from(vec![
                        Span::styled(a.name.as_str(), name_style),
                        Span::styled(detail, Style::default().fg(Color::DarkGray)),
                    ])
                })
                .collect(),
            cursor: state.artifact_cursor,
            empty: "No artifacts for this run",
        },
        Screen::LogFilter => Picker {
            title: format!("Show steps ({} selected)", state.log_filter.len()),
            items: state
                .parsed_logs
                .iter()
                .flat_map(|p| p.steps.iter())
                .map(|step| {
                    Line::from(format!(
                        "{}{:>2}. {}",
                        checkbox(state.log_filter.contains(&step.number)),
                        step.number,
                        step.name
                    ))
                })
                .collect(),
            cursor: state.log_filter_cursor,
            empty: "No steps in this log",
        },
        Screen::MultiJobSelect => Picker {
            title: format!(
                "Jobs to view ({}/{MAX_MULTI_JOBS})",
                state.multi_job.selected.len()
            ),
            items: state
                .jobs
                .iter()
                .map(|job| {
                    let (icon, color) = status_icon(job.status, job.conclusion);
                    Line::from(vec![
                        Span::raw(checkbox(state.multi_job.selected.contains(&job.id))),
                        Span::styled(format!("{icon} "), Style::default().fg(color)),
                        Span::raw(job.display_name()),
                    ])
                })
                .collect(),
            cursor: state.multi_job.cursor,
            empty: "No jobs",
        },
        Screen::CompareSelect => Picker {
            title: if state.compare.first.is_some() {
                "Compare with...".to_string()
            } else {
                "Compare: pick first run".to_string()
            },
            items: state
                .visible_runs()
                .into_iter()
                .enumerate()
                .map(|(i, run)| {
                    let (icon, color) = status_icon(run.status, run.conclusion);
                    let marker = if state.compare.first == Some(i) {
                        "1 "
                    } else {
                        "  "
                    };
                    Line::from(vec![
                        Span::styled(marker, Style::default().fg(Color::Cyan)),
                        Span::styled(format!("{icon} "), Style::default().fg(color)),
                        Span::raw(format!("#{} {}", run.run_number, run.title())),
                    ])
                })
                .collect(),
            cursor: state.compare.cursor,
            empty: "Not enough runs to compare",
        },
        _ => return None,
    };
    Some(picker)
}

pub fn render(f: &mut Frame, state: &AppState) {
    let Some(picker) = build(state) else {
        return;
    };
    let area = f.area();
    let height = (picker.items.len().max(1) as u16).saturating_add(2);
    let overlay_area = centered(area, (area.width * 6 / 10).max(30), height.max(5));
    f.render_widget(Clear, overlay_area);

    let block = Block::default()
        .title(format!(" {} ", picker.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .style(Style::default().bg(Color::Black));

    if picker.items.is_empty() {
        let para = Paragraph::new(picker.empty)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(para, overlay_area);
        return;
    }

    let inner_height = overlay_area.height.saturating_sub(2) as usize;
    let offset = scroll_offset(picker.cursor.index(), inner_height);
    let lines: Vec<Line> = picker
        .items
        .into_iter()
        .enumerate()
        .skip(offset)
        .take(inner_height)
        .map(|(i, line)| {
            if picker.cursor.is(i) {
                line.style(Style::default().add_modifier(Modifier::REVERSED))
            } else {
                line
            }
        })
        .collect();
    f.render_widget(Paragraph::new(lines).block(block), overlay_area);
}
