use crate::tui::render::centered;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Navigation",
        &[
            ("↑/k ↓/j", "Move selection or scroll"),
            ("←/h →", "Previous / next run"),
            ("PgUp PgDn", "Page through logs"),
            ("g G", "Top / bottom of logs"),
            ("Enter", "Job details / select"),
            ("Esc", "Back"),
        ],
    ),
    (
        "Views",
        &[
            ("l", "Toggle job logs"),
            ("F", "Filter log steps"),
            ("m", "View several jobs"),
            ("v", "Split multi-job view"),
            ("c", "Compare two runs"),
            ("y", "Workflow file"),
            ("a", "Artifacts"),
            ("H", "Toggle highlighting"),
            ("/ n N", "Search logs"),
        ],
    ),
    (
        "Actions",
        &[
            ("r", "Refresh"),
            ("w", "Toggle watch mode"),
            ("b", "Switch branch"),
            ("f", "Filter by status"),
            ("R", "Rerun (failed jobs of a failed run)"),
            ("X", "Cancel running run"),
            ("D", "Dispatch workflow"),
            ("s", "Save logs to file"),
            ("o", "Open in browser"),
            ("q", "Quit"),
        ],
    ),
];

fn lines() -> Vec<Line<'static>> {
    let mut out = Vec::new();
    for (i, (heading, keys)) in SECTIONS.iter().enumerate() {
        if i > 0 {
            out.push(Line::from(""));
        }
        out.push(Line::from(Span::styled(
            *heading,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )));
        for (key, desc) in *keys {
            out.push(Line::from(vec![
                Span::styled(format!("  {key:<12}"), Style::default().fg(Color::Cyan)),
                Span::styled(*desc, Style::default().fg(Color::White)),
            ]));
        }
    }
    out
}

pub fn render(f: &mut Frame) {
    let content = lines();
    let area = f.area();
    let overlay_area = centered(area, 56, content.len() as u16 + 2);
    f.render_widget(Clear, overlay_area);

    let block = Block::default()
        .title(" Help ")
        .title_bottom(Line::from(" any key to close ").centered())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .style(Style::default().bg(Color::Black));
    f.render_widget(Paragraph::new(content).block(block), overlay_area);
}
