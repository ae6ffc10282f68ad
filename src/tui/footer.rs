use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::{AppState, Screen};

/// Key hints for the active screen; the short list is used on narrow terminals.
pub fn hints(screen: Screen, narrow: bool) -> &'static [(&'static str, &'static str)] {
    match screen {
        Screen::LogViewer if narrow => &[("j/k", "scroll"), ("/", "search"), ("Esc", "back")],
        Screen::LogViewer => &[
            ("j/k", "scroll"),
            ("g/G", "top/end"),
            ("/", "search"),
            ("n/N", "match"),
            ("F", "steps"),
            ("H", "highlight"),
            ("m", "jobs"),
            ("v", "split"),
            ("s", "save"),
            ("Esc", "back"),
        ],
        Screen::JobDetails => &[
            ("j/k", "steps"),
            ("l", "logs"),
            ("o", "open"),
            ("a", "artifacts"),
            ("Enter/Esc", "back"),
        ],
        Screen::BranchSelection | Screen::StatusFilter | Screen::ArtifactSelection => {
            &[("j/k", "move"), ("Enter", "select"), ("Esc", "cancel")]
        }
        Screen::LogFilter | Screen::MultiJobSelect => &[
            ("j/k", "move"),
            ("Space", "toggle"),
            ("Enter", "apply"),
            ("Esc", "cancel"),
        ],
        Screen::CompareSelect => &[("j/k", "move"), ("Enter", "pick"), ("Esc", "cancel")],
        Screen::CompareView | Screen::WorkflowViewer => {
            &[("j/k", "scroll"), ("PgUp/PgDn", "page"), ("Esc", "back")]
        }
        Screen::Error => &[("r", "retry"), ("Esc", "dismiss"), ("q", "quit")],
        Screen::Help => &[("any key", "close")],
        Screen::Loading => &[("q", "quit")],
        Screen::Ready | Screen::Watching if narrow => &[
            ("j/k", "nav"),
            ("Enter", "details"),
            ("l", "logs"),
            ("w", "watch"),
            ("?", "help"),
            ("q", "quit"),
        ],
        Screen::Ready | Screen::Watching => &[
            ("j/k", "jobs"),
            ("←/→", "runs"),
            ("Enter", "details"),
            ("l", "logs"),
            ("w", "watch"),
            ("b", "branch"),
            ("f", "filter"),
            ("c", "compare"),
            ("R", "rerun"),
            ("o", "open"),
            ("?", "help"),
            ("q", "quit"),
        ],
    }
}

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let narrow = area.width < crate::app::NARROW_WIDTH_THRESHOLD;

    let line = if let Some(input) = &state.log.search.input {
        Line::from(vec![
            Span::styled("/", Style::default().fg(Color::Cyan)),
            Span::styled(input.as_str(), Style::default().fg(Color::White)),
            Span::styled("█", Style::default().fg(Color::Cyan)),
        ])
    } else if let Some(status) = &state.status_message {
        Line::from(vec![
            Span::styled("★ ", Style::default().fg(Color::Yellow)),
            Span::styled(status.text.as_str(), Style::default().fg(Color::Yellow)),
        ])
    } else {
        let mut spans: Vec<Span> = Vec::new();
        for (i, (key, desc)) in hints(state.screen, narrow).iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            spans.push(Span::styled(*key, Style::default().fg(Color::Cyan)));
            spans.push(Span::styled(
                format!(" {desc}"),
                Style::default().fg(Color::DarkGray),
            ));
        }
        Line::from(spans)
    };

    let footer = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_hints_are_shorter() {
        for screen in [Screen::Ready, Screen::LogViewer] {
            assert!(hints(screen, true).len() < hints(screen, false).len());
        }
    }

    #[test]
    fn every_screen_offers_a_way_out() {
        for screen in [
            Screen::BranchSelection,
            Screen::LogFilter,
            Screen::CompareView,
            Screen::JobDetails,
            Screen::Error,
        ] {
            assert!(
                hints(screen, false)
                    .iter()
                    .any(|(k, _)| k.contains("Esc")),
                "{screen:?}"
            );
        }
    }
}
