use crate::app::navigation::{Context, Page, RouteArgs};
use crate::pages::home::ITEMS;
use crate::ui::theme::Theme;
use crate::ui::view::View;
use anyhow::Context as _;
use ratatui::text::{Line, Span};

/// Total number of times any details page was mounted.
pub const VISITS: &str = "visits";

pub struct DetailsPage {
    id: u64,
}

impl DetailsPage {
    /// Requires an integer `id` argument.
    pub fn from_args(args: &RouteArgs) -> anyhow::Result<Self> {
        let id = args
            .get("id")
            .and_then(|v| v.as_u64())
            .context("details page needs a numeric 'id' argument")?;
        Ok(Self { id })
    }
}

impl Page for DetailsPage {
    fn build(&mut self, ctx: &mut Context<'_>, _args: &RouteArgs) -> anyhow::Result<View> {
        let items: Vec<String> = ctx.state.get_or(ITEMS, Vec::new())?;
        let visits: u64 = ctx.state.get_or(VISITS, 0)?;

        let index = usize::try_from(self.id)?.checked_sub(1);
        let item = index.and_then(|i| items.get(i));
        let mut body = vec![match item {
            Some(name) => Line::from(Span::styled(name.clone(), Theme::highlight())),
            None => Line::from(Span::styled(
                format!("No item #{} loaded yet. Press r on the home page.", self.id),
                Theme::dim(),
            )),
        }];
        body.push(Line::from(""));
        body.push(Line::from(format!("Details pages opened before this one: {visits}")));
        body.push(Line::from(Span::styled("Press b to go back.", Theme::hint())));

        Ok(View::new(format!("Item {}", self.id), body))
    }

    fn on_mount(&mut self, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        let visits: u64 = ctx.state.get_or(VISITS, 0)?;
        ctx.state.set(VISITS, visits + 1)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_is_required() {
        assert!(DetailsPage::from_args(&RouteArgs::new()).is_err());
        let args = crate::app::navigation::route_args(json!({"id": "seven"}));
        assert!(DetailsPage::from_args(&args).is_err());
    }

    #[test]
    fn test_id_parsed() {
        let args = crate::app::navigation::route_args(json!({"id": 4}));
        assert_eq!(DetailsPage::from_args(&args).unwrap().id, 4);
    }
}
