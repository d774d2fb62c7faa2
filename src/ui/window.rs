//! The mount target: holds whatever view the navigator installed last.

use crate::app::error::AppError;
use crate::app::navigation::Renderer;
use crate::ui::theme::Theme;
use crate::ui::view::{View, ViewKind};
use ratatui::text::{Line, Span};
use tracing::debug;

#[derive(Debug, Default)]
pub struct Window {
    content: Option<View>,
    mounts: usize,
}

impl Window {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of views mounted so far.
    pub fn mounts(&self) -> usize {
        self.mounts
    }
}

impl Renderer for Window {
    fn mount(&mut self, view: View) -> anyhow::Result<()> {
        debug!(title = %view.title, kind = ?view.kind, "mounting view");
        self.content = Some(view);
        self.mounts += 1;
        Ok(())
    }

    fn render_error_page(&mut self, error: &AppError) -> anyhow::Result<View> {
        let mut body = vec![
            Line::from(Span::styled("This page could not be shown.", Theme::error())),
            Line::from(""),
            Line::from(error.to_string()),
        ];
        if let Some(route) = error.route() {
            body.push(Line::from(Span::styled(format!("route: {route}"), Theme::dim())));
        }
        body.push(Line::from(""));
        body.push(Line::from(Span::styled(
            "Press b to go back or h for home.",
            Theme::hint(),
        )));
        Ok(View {
            title: "Error".to_string(),
            body,
            kind: ViewKind::Error,
        })
    }

    fn current(&self) -> Option<&View> {
        self.content.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_replaces_content() {
        let mut window = Window::new();
        assert!(window.current().is_none());
        window.mount(View::text("a", "first")).unwrap();
        window.mount(View::text("b", "second")).unwrap();
        assert_eq!(window.current().unwrap().title, "b");
        assert_eq!(window.mounts(), 2);
    }

    #[test]
    fn test_error_page_mentions_route() {
        let mut window = Window::new();
        let view = window
            .render_error_page(&AppError::RouteNotFound("settings".into()))
            .unwrap();
        assert!(view.is_error());
        assert!(view
            .body
            .iter()
            .any(|line| line.to_string().contains("route: settings")));
    }
}
