//! Demo pages hosted by the binary.
//!
//! `home` lists items loaded by a background task, `details` shows one item
//! and counts visits in state, `about` is static.

pub mod about;
pub mod details;
pub mod home;

use crate::app::controller::{App, NotificationLevel};
use crate::app::error::Result;
use crate::app::navigation::{Page, PageFactory, RouteArgs};
use std::rc::Rc;
use tracing::info;

pub fn register(app: &mut App) -> Result<()> {
    app.state.define(home::ITEMS, Vec::<String>::new())?;
    app.state.define(home::REFRESH_COUNT, 0_u64)?;
    app.state.define(details::VISITS, 0_u64)?;

    app.register_routes(routes())?;

    app.state
        .subscribe(home::ITEMS, |old: &Vec<String>, new: &Vec<String>| {
            info!(before = old.len(), after = new.len(), "item list changed");
            Ok(())
        })?;
    app.events.subscribe(home::REFRESHED, |app, payload| {
        let count = payload["count"].as_u64().unwrap_or_default();
        app.notify(NotificationLevel::Info, format!("Loaded {count} items"));
        Ok(())
    });
    Ok(())
}

fn routes() -> Vec<(String, PageFactory)> {
    vec![
        factory("home", |_| Ok(Box::new(home::HomePage::default()))),
        factory("details", |args| Ok(Box::new(details::DetailsPage::from_args(args)?))),
        factory("about", |_| Ok(Box::new(about::AboutPage))),
    ]
}

fn factory<F>(route: &str, build: F) -> (String, PageFactory)
where
    F: Fn(&RouteArgs) -> anyhow::Result<Box<dyn Page>> + 'static,
{
    (route.to_string(), Rc::new(build))
}
