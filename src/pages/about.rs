use crate::app::navigation::{Context, Page, RouteArgs};
use crate::ui::theme::Theme;
use crate::ui::view::View;
use ratatui::text::{Line, Span};

pub struct AboutPage;

impl Page for AboutPage {
    fn build(&mut self, _ctx: &mut Context<'_>, _args: &RouteArgs) -> anyhow::Result<View> {
        let body = vec![
            Line::from(Span::styled(
                format!("pagewright {}", env!("CARGO_PKG_VERSION")),
                Theme::highlight(),
            )),
            Line::from(""),
            Line::from("Pages are built from routes and mounted into this window."),
            Line::from("State changes, events and background work all land on the UI loop."),
            Line::from(""),
            Line::from(Span::styled("Press b to go back.", Theme::hint())),
        ];
        Ok(View::new("About", body))
    }
}
