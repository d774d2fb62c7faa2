use crate::app::controller::App;
use crate::app::event::{Subscription, TaskId};
use crate::app::navigation::{Context, Page, RouteArgs};
use crate::app::tasks::Task;
use crate::ui::theme::Theme;
use crate::ui::view::View;
use chrono::Local;
use ratatui::text::{Line, Span};
use serde_json::json;
use std::thread;
use std::time::Duration;

pub const ITEMS: &str = "items";
pub const LAST_REFRESH: &str = "last_refresh";
pub const REFRESH_COUNT: &str = "refresh_count";

/// Published after a refresh wrote new items, payload `{"count": n}`.
pub const REFRESHED: &str = "items_refreshed";

const ITEMS_PER_BATCH: usize = 5;

#[derive(Default)]
pub struct HomePage {
    refreshed: Option<Subscription>,
}

impl Page for HomePage {
    fn build(&mut self, ctx: &mut Context<'_>, _args: &RouteArgs) -> anyhow::Result<View> {
        let items: Vec<String> = ctx.state.get_or(ITEMS, Vec::new())?;
        let mut body = Vec::new();

        if items.is_empty() {
            body.push(Line::from(Span::styled(
                "Nothing loaded yet. Press r to load items.",
                Theme::dim(),
            )));
        } else {
            for (i, item) in items.iter().enumerate() {
                body.push(Line::from(vec![
                    Span::styled(format!("{:>2}. ", i + 1), Theme::highlight()),
                    Span::raw(item.clone()),
                ]));
            }
        }

        body.push(Line::from(""));
        if let Ok(at) = ctx.state.get::<String>(LAST_REFRESH) {
            body.push(Line::from(Span::styled(format!("Last refresh: {at}"), Theme::dim())));
        }
        body.push(Line::from(Span::styled(
            "1-9 open an item, r refresh, f run a failing job, x open a missing page",
            Theme::hint(),
        )));
        Ok(View::new("Home", body))
    }

    fn on_mount(&mut self, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        let sub = ctx.events.subscribe(REFRESHED, |app, _| {
            if app.navigator().current_route() == Some("home") {
                app.refresh()?;
            }
            Ok(())
        });
        self.refreshed = Some(sub);
        Ok(())
    }

    fn on_unmount(&mut self, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        if let Some(sub) = self.refreshed.take() {
            ctx.events.unsubscribe(&sub);
        }
        Ok(())
    }
}

/// Load a new batch of items in the background and store it on completion.
pub fn start_refresh(app: &mut App) -> anyhow::Result<TaskId> {
    let batch = app.state.get_or(REFRESH_COUNT, 0_u64)? + 1;
    app.state.set(REFRESH_COUNT, batch)?;

    let task = Task::new(move || {
        // Stands in for a slow fetch
        thread::sleep(Duration::from_millis(400));
        Ok(load_batch(batch))
    })
    .named(format!("refresh #{batch}"))
    .on_done(|app, items: Vec<String>| {
        let count = items.len();
        app.state.set(ITEMS, items)?;
        app.state
            .set(LAST_REFRESH, Local::now().format("%H:%M:%S").to_string())?;
        app.events.publish(REFRESHED, json!({ "count": count }));
        Ok(())
    });
    Ok(app.tasks.run(task))
}

/// A job that always fails; nothing handles the error, so it ends up as a
/// notification.
pub fn start_failing_task(app: &App) -> TaskId {
    app.tasks.run(
        Task::new(|| -> anyhow::Result<()> {
            thread::sleep(Duration::from_millis(200));
            anyhow::bail!("upstream service unavailable")
        })
        .named("failing job"),
    )
}

fn load_batch(batch: u64) -> Vec<String> {
    (1..=ITEMS_PER_BATCH)
        .map(|i| format!("Item {i} from batch {batch}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_batch() {
        let items = load_batch(3);
        assert_eq!(items.len(), ITEMS_PER_BATCH);
        assert_eq!(items[0], "Item 1 from batch 3");
    }
}
