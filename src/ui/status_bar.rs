use crate::app::controller::App;
use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthStr;

const HINTS: &str = " 1-9 open  a about  b back  r refresh  q quit ";

pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let nav = app.navigator();
    let mut parts: Vec<Span> = Vec::new();

    parts.push(Span::styled(
        format!(" [{}] ", nav.current_route().unwrap_or("-")),
        Style::default().fg(Color::Green).bg(Color::DarkGray),
    ));
    parts.push(Span::styled(
        format!(" history:{} ", nav.history_len()),
        Theme::status_bar(),
    ));

    let running = app.tasks.in_flight();
    if running > 0 {
        parts.push(Span::styled(
            format!(" | tasks:{running} "),
            Style::default().fg(Color::Yellow).bg(Color::DarkGray),
        ));
    }

    if let Some(note) = app.latest_notification() {
        parts.push(Span::styled(
            format!(" | {} {} ", note.timestamp, note.message),
            Theme::notification(note.level),
        ));
    }

    // Pad to fill remaining space
    let used: usize = parts.iter().map(|s| s.content.width()).sum();
    let remaining = (area.width as usize).saturating_sub(used + HINTS.width());
    parts.push(Span::styled(" ".repeat(remaining), Theme::status_bar()));
    parts.push(Span::styled(
        HINTS,
        Style::default().fg(Color::Cyan).bg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(parts)), area);
}
