mod layout;
mod status_bar;
pub mod theme;
pub mod view;
pub mod window;

use crate::app::controller::App;
use crate::ui::theme::Theme;
use crate::ui::view::ViewKind;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let app_layout = layout::compute_layout(area);

    render_header(frame, app_layout.header, app);
    render_page(frame, app_layout.page, app);
    status_bar::render(frame, app_layout.status_bar, app);
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let mut parts = vec![Span::styled(format!(" {} ", app.title()), Theme::header())];
    if let Some(route) = app.navigator().current_route() {
        parts.push(Span::styled(format!("/{route}"), Theme::dim()));
    }
    frame.render_widget(Paragraph::new(Line::from(parts)), area);
}

fn render_page(frame: &mut Frame, area: Rect, app: &App) {
    let Some(view) = app.navigator().renderer().current() else {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Theme::border());
        let waiting = Paragraph::new(Span::styled(" Loading...", Theme::dim())).block(block);
        frame.render_widget(waiting, area);
        return;
    };

    let border = match view.kind {
        ViewKind::Page => Theme::border(),
        ViewKind::Error => Theme::border_error(),
    };
    let block = Block::default()
        .title(format!(" {} ", view.title))
        .title_style(Theme::title())
        .borders(Borders::ALL)
        .border_style(border);

    let paragraph = Paragraph::new(view.body.clone())
        .style(Theme::text())
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
