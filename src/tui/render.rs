use crate::app::{AppState, Screen};
use crate::tui::{compare, details, footer, header, help, log_view, pickers, runs, spinner};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

pub fn render(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // header
            Constraint::Min(1),    // body
            Constraint::Length(2), // footer
        ])
        .split(f.area());

    header::render(f, chunks[0], state);
    footer::render(f, chunks[2], state);

    let body = chunks[1];
    match state.screen {
        Screen::Loading => render_loading(f, body, state),
        Screen::JobDetails => details::render(f, body, state),
        Screen::LogViewer | Screen::LogFilter => log_view::render(f, body, state),
        Screen::WorkflowViewer => log_view::render_workflow(f, body, state),
        Screen::CompareView => compare::render(f, body, state),
        Screen::Ready
        | Screen::Watching
        | Screen::Error
        | Screen::Help
        | Screen::BranchSelection
        | Screen::StatusFilter
        | Screen::ArtifactSelection
        | Screen::MultiJobSelect
        | Screen::CompareSelect => runs::render(f, body, state),
    }

    // Overlays (drawn on top of the body)
    match state.screen {
        Screen::Error => render_error(f, state),
        Screen::Help => help::render(f),
        Screen::BranchSelection
        | Screen::StatusFilter
        | Screen::ArtifactSelection
        | Screen::LogFilter
        | Screen::MultiJobSelect
        | Screen::CompareSelect => pickers::render(f, state),
        _ => {}
    }
}

/// Rect of at most `width` x `height` centered in `area`.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn render_loading(f: &mut Frame, area: Rect, state: &AppState) {
    let vertical = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .split(area);

    let line = Line::from(vec![
        Span::styled(
            format!("{} ", spinner::frame(state.spinner_frame)),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(&state.loading_message, Style::default().fg(Color::White)),
    ]);
    f.render_widget(Paragraph::new(line).centered(), vertical[1]);
}

fn render_error(f: &mut Frame, state: &AppState) {
    let Some(err) = &state.error else {
        return;
    };
    let area = f.area();
    let overlay_area = centered(area, (area.width * 7 / 10).max(40), 9);
    f.render_widget(Clear, overlay_area);

    let hints = Line::from(vec![
        Span::styled("r", Style::default().fg(Color::Cyan)),
        Span::styled(" retry  ", Style::default().fg(Color::DarkGray)),
        Span::styled("Esc", Style::default().fg(Color::Cyan)),
        Span::styled(" dismiss  ", Style::default().fg(Color::DarkGray)),
        Span::styled("q", Style::default().fg(Color::Cyan)),
        Span::styled(" quit ", Style::default().fg(Color::DarkGray)),
    ]);

    let block = Block::default()
        .title(" Error ")
        .title_bottom(hints.centered())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .style(Style::default().bg(Color::Black));

    let lines = vec![
        Line::from(Span::styled(
            err.message.as_str(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Hint: ", Style::default().fg(Color::Yellow)),
            Span::styled(err.hint.as_str(), Style::default().fg(Color::White)),
        ]),
    ];

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, overlay_area);
}
