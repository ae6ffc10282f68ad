use crate::app::{AppState, Screen};
use crate::tui::spinner;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let mut spans = vec![
        Span::styled(
            format!(
                " ghmon v{}+{} ",
                env!("CARGO_PKG_VERSION"),
                env!("BUILD_NUMBER")
            ),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("│ "),
        Span::styled(
            target_label(state),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    ];

    if let Some(branch) = state.source.branch.as_deref().filter(|_| !state.is_multi_source()) {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format!("[{branch}]"),
            Style::default().fg(Color::Yellow),
        ));
    }

    if !state.status_filter.is_empty() {
        spans.push(Span::styled(
            format!(" [{}]", state.status_filter),
            Style::default().fg(Color::Magenta),
        ));
    }

    if state.watching {
        spans.push(Span::styled(
            " ● WATCHING",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ));
    }

    if state.screen == Screen::Loading {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            spinner::frame(state.spinner_frame).to_string(),
            Style::default().fg(Color::Yellow),
        ));
    } else if let Some(at) = state.last_refresh {
        spans.push(Span::styled(
            format!(" updated {}", at.with_timezone(&chrono::Local).format("%H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        ));
    }

    if !state.failed_sources.is_empty() {
        spans.push(Span::styled(
            format!(" ⚠ unavailable: {}", state.failed_sources.join(", ")),
            Style::default().fg(Color::Red),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    f.render_widget(header, area);
}

fn target_label(state: &AppState) -> String {
    if state.is_multi_source() {
        format!("{} repositories", state.config.sources.len())
    } else {
        state.source.slug()
    }
}
