use crate::app::AppState;
use crate::diff::{self, DiffKind};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

fn kind_style(kind: DiffKind) -> Style {
    match kind {
        DiffKind::Context => Style::default().fg(Color::Gray),
        DiffKind::Removed => Style::default().fg(Color::Red),
        DiffKind::Added => Style::default().fg(Color::Green),
    }
}

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let compare = &state.compare;
    let chunks = Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).split(area);

    let (removed, added) = diff::stats(&compare.lines);
    let summary = Line::from(vec![
        Span::styled(
            format!(" - {}", compare.left_title),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  vs  "),
        Span::styled(
            format!("+ {}", compare.right_title),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("   {removed} removed, {added} added"),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(summary), chunks[0]);

    let inner_height = chunks[1].height.saturating_sub(2) as usize;
    let lines: Vec<Line> = compare
        .lines
        .iter()
        .skip(compare.scroll)
        .take(inner_height)
        .map(|l| Line::from(Span::styled(l.rendered(), kind_style(l.kind))))
        .collect();

    let total = compare.lines.len();
    let title = if total > inner_height {
        format!(
            " First job logs [{}-{}/{}] ",
            compare.scroll + 1,
            (compare.scroll + inner_height).min(total),
            total
        )
    } else {
        " First job logs ".to_string()
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));
    f.render_widget(Paragraph::new(lines).block(block), chunks[1]);
}
