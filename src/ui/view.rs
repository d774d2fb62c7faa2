//! What a page hands to the window: a title and styled lines.

use crate::ui::theme::Theme;
use ratatui::text::{Line, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Page,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub title: String,
    pub body: Vec<Line<'static>>,
    pub kind: ViewKind,
}

impl View {
    pub fn new(title: impl Into<String>, body: Vec<Line<'static>>) -> Self {
        Self {
            title: title.into(),
            body,
            kind: ViewKind::Page,
        }
    }

    /// Plain text, one line per `\n`.
    pub fn text(title: &str, text: &str) -> Self {
        let body = text.lines().map(|l| Line::from(l.to_string())).collect();
        Self::new(title, body)
    }

    /// Error view built without any page involvement.
    pub fn fallback(message: &str) -> Self {
        Self {
            title: "Error".to_string(),
            body: vec![
                Line::from(Span::styled("Something went wrong.", Theme::error())),
                Line::from(message.to_string()),
            ],
            kind: ViewKind::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == ViewKind::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_splits_lines() {
        let view = View::text("t", "one\ntwo");
        assert_eq!(view.body.len(), 2);
        assert_eq!(view.kind, ViewKind::Page);
    }

    #[test]
    fn test_fallback_is_error() {
        assert!(View::fallback("boom").is_error());
    }
}
