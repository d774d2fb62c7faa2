//! Navigation engine.
//!
//! Maps route ids to page factories, keeps the back-history and fires page
//! lifecycle hooks. It never builds or styles anything itself: construction
//! goes through [`Renderer::render_page`] and installation through
//! [`Renderer::mount`].
//!
//! History holds the entries you can go back *to*. A successful forward
//! navigation pushes the entry being left; [`Navigator::back`] pops and
//! re-navigates without pushing. The stack is bounded by `max_history`
//! (oldest entries are evicted).

use crate::app::bus::{EventBus, NAVIGATION_BACK};
use crate::app::error::{AppError, Result};
use crate::app::event::Dispatcher;
use crate::app::state::StateStore;
use crate::app::tasks::TaskManager;
use crate::logging::log_exception;
use crate::ui::view::View;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use tracing::{debug, error, info};

pub const DEFAULT_MAX_HISTORY: usize = 20;

/// Arguments a page is constructed with.
pub type RouteArgs = Map<String, Value>;

/// Build [`RouteArgs`] from a JSON object; anything else yields no arguments.
pub fn route_args(value: Value) -> RouteArgs {
    match value {
        Value::Object(map) => map,
        _ => RouteArgs::new(),
    }
}

/// The services a page can reach while it is built or mounted.
pub struct Context<'a> {
    pub state: &'a mut StateStore,
    pub events: &'a mut EventBus,
    pub tasks: &'a TaskManager,
    pub dispatcher: &'a Dispatcher,
}

/// A page controller.
///
/// `on_mount` and `on_unmount` are optional; the defaults do nothing.
pub trait Page {
    /// Build the page's view from its construction arguments.
    fn build(&mut self, ctx: &mut Context<'_>, args: &RouteArgs) -> anyhow::Result<View>;

    fn on_mount(&mut self, _ctx: &mut Context<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_unmount(&mut self, _ctx: &mut Context<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

pub type PageFactory = Rc<dyn Fn(&RouteArgs) -> anyhow::Result<Box<dyn Page>>>;

/// The window side of navigation: builds pages and installs views.
pub trait Renderer {
    /// Construct a page instance and build its view.
    fn render_page(
        &mut self,
        factory: &PageFactory,
        args: &RouteArgs,
        ctx: &mut Context<'_>,
    ) -> anyhow::Result<(Box<dyn Page>, View)> {
        let mut page = factory(args)?;
        let view = page.build(ctx, args)?;
        Ok((page, view))
    }

    /// Install `view` as the window's content.
    fn mount(&mut self, view: View) -> anyhow::Result<()>;

    /// Build the fallback view shown when navigation fails.
    fn render_error_page(&mut self, error: &AppError) -> anyhow::Result<View>;

    /// What the window currently shows.
    fn current(&self) -> Option<&View>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub route: String,
    pub args: RouteArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavPhase {
    /// Nothing mounted yet
    Idle,
    Navigating,
    Mounted,
    /// The error page is showing
    Failed,
}

struct MountedPage {
    entry: HistoryEntry,
    page: Box<dyn Page>,
}

pub struct Navigator {
    routes: HashMap<String, PageFactory>,
    history: VecDeque<HistoryEntry>,
    max_history: usize,
    current: Option<MountedPage>,
    phase: NavPhase,
    renderer: Box<dyn Renderer>,
}

impl Navigator {
    pub fn new(renderer: Box<dyn Renderer>, max_history: usize) -> Self {
        info!(max_history, "navigator initialized");
        Self {
            routes: HashMap::new(),
            history: VecDeque::new(),
            max_history: max_history.max(1),
            current: None,
            phase: NavPhase::Idle,
            renderer,
        }
    }

    pub fn register_route<F>(&mut self, route: &str, factory: F) -> Result<()>
    where
        F: Fn(&RouteArgs) -> anyhow::Result<Box<dyn Page>> + 'static,
    {
        self.register_factory(route, Rc::new(factory))
    }

    /// Register several routes; stops at the first duplicate.
    pub fn register_routes<I>(&mut self, routes: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, PageFactory)>,
    {
        for (route, factory) in routes {
            self.register_factory(&route, factory)?;
        }
        Ok(())
    }

    fn register_factory(&mut self, route: &str, factory: PageFactory) -> Result<()> {
        if self.routes.contains_key(route) {
            return Err(AppError::DuplicateRoute(route.to_string()));
        }
        self.routes.insert(route.to_string(), factory);
        info!(route = %route, "registered route");
        Ok(())
    }

    /// Navigate forward to `route`.
    ///
    /// On error the previous page may already be unmounted; the caller is
    /// expected to show the error page via [`show_error`](Self::show_error).
    pub fn navigate(&mut self, route: &str, args: RouteArgs, ctx: &mut Context<'_>) -> Result<()> {
        let target = HistoryEntry {
            route: route.to_string(),
            args,
        };
        self.go(target, true, ctx)
    }

    /// Go back one entry. Returns `Ok(false)` when there is no history.
    ///
    /// `navigation_back` is published whenever an entry was popped, whether
    /// or not navigating to it succeeded.
    pub fn back(&mut self, ctx: &mut Context<'_>) -> Result<bool> {
        let Some(previous) = self.history.pop_back() else {
            info!("back navigation: history is empty");
            return Ok(false);
        };
        let route = previous.route.clone();
        let outcome = self.go(previous, false, ctx);
        ctx.events.publish(NAVIGATION_BACK, json!({ "route": route }));
        outcome.map(|()| true)
    }

    /// Rebuild the current page in place without touching history.
    pub fn reload(&mut self, ctx: &mut Context<'_>) -> Result<bool> {
        let Some(entry) = self.current.as_ref().map(|m| m.entry.clone()) else {
            return Ok(false);
        };
        self.go(entry, false, ctx)?;
        Ok(true)
    }

    /// Replace whatever is showing with the error page for `err`.
    pub fn show_error(&mut self, err: &AppError, ctx: &mut Context<'_>) {
        self.unmount_current(ctx, true);
        self.phase = NavPhase::Failed;

        let view = self.renderer.render_error_page(err).unwrap_or_else(|e| {
            error!(error = %e, "error page failed to build, using fallback");
            View::fallback(&err.to_string())
        });
        if let Err(e) = self.renderer.mount(view) {
            error!(error = %e, "error page failed to mount");
        }
    }

    fn go(&mut self, target: HistoryEntry, record: bool, ctx: &mut Context<'_>) -> Result<()> {
        let factory = self
            .routes
            .get(&target.route)
            .cloned()
            .ok_or_else(|| AppError::RouteNotFound(target.route.clone()))?;

        let previous_phase = self.phase;
        self.phase = NavPhase::Navigating;
        debug!(route = %target.route, "navigating");

        let (mut page, view) = match self.renderer.render_page(&factory, &target.args, ctx) {
            Ok(built) => built,
            Err(source) => {
                self.phase = previous_phase;
                return Err(AppError::Render {
                    route: target.route,
                    source,
                });
            }
        };

        let same_entry = self.current.as_ref().is_some_and(|m| m.entry == target);
        self.unmount_current(ctx, record && !same_entry);

        if let Err(source) = self.renderer.mount(view) {
            return Err(AppError::Mount {
                route: target.route,
                source,
            });
        }

        if let Err(e) = page.on_mount(ctx) {
            log_exception(&format!("on_mount hook failed for '{}'", target.route), &e);
        }

        info!(route = %target.route, history = self.history.len(), "navigated");
        self.current = Some(MountedPage {
            entry: target,
            page,
        });
        self.phase = NavPhase::Mounted;
        Ok(())
    }

    fn unmount_current(&mut self, ctx: &mut Context<'_>, record: bool) {
        let Some(MountedPage { entry, mut page }) = self.current.take() else {
            return;
        };
        if let Err(e) = page.on_unmount(ctx) {
            log_exception(&format!("on_unmount hook failed for '{}'", entry.route), &e);
        }
        if record {
            self.push_history(entry);
        }
    }

    fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push_back(entry);
        while self.history.len() > self.max_history {
            if let Some(dropped) = self.history.pop_front() {
                debug!(route = %dropped.route, "history full, dropping oldest entry");
            }
        }
    }

    pub fn current_route(&self) -> Option<&str> {
        self.current.as_ref().map(|m| m.entry.route.as_str())
    }

    pub fn current_entry(&self) -> Option<&HistoryEntry> {
        self.current.as_ref().map(|m| &m.entry)
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn phase(&self) -> NavPhase {
        self.phase
    }

    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }
}
