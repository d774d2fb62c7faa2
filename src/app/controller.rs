//! Application controller: the composition root.
//!
//! Owns the state store, event bus, task manager and navigator, wires the
//! [`Dispatcher`] into the bus and the task manager, and hosts the error
//! boundary. Failures that reach the boundary are logged and turned into an
//! in-app [`Notification`]; navigation failures also put the error page up.
//! Nothing that goes through here terminates the process.

use crate::app::bus::{EventBus, NAVIGATED};
use crate::app::error::{panic_message, AppError, Result};
use crate::app::event::{AppEvent, Dispatcher, UiJob};
use crate::app::navigation::{
    Context, NavPhase, Navigator, Page, PageFactory, Renderer, RouteArgs,
};
use crate::app::state::StateStore;
use crate::app::tasks::TaskManager;
use crate::config::AppConfig;
use crate::logging::log_exception;
use chrono::Local;
use serde_json::json;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub timestamp: String,
    pub level: NotificationLevel,
    pub message: String,
}

pub struct App {
    pub state: StateStore,
    pub events: EventBus,
    pub tasks: TaskManager,
    navigator: Navigator,
    dispatcher: Dispatcher,
    notifications: VecDeque<Notification>,
    max_notifications: usize,
    timestamp_format: String,
    title: String,
    should_quit: bool,
}

impl App {
    pub fn new(
        config: &AppConfig,
        renderer: Box<dyn Renderer>,
        event_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let dispatcher = Dispatcher::new(event_tx);
        Self {
            state: StateStore::new(),
            events: EventBus::new(dispatcher.clone()),
            tasks: TaskManager::new(dispatcher.clone(), config.tasks.max_workers),
            navigator: Navigator::new(renderer, config.navigation.max_history),
            dispatcher,
            notifications: VecDeque::new(),
            max_notifications: config.ui.max_notifications.max(1),
            timestamp_format: config.ui.timestamp_format.clone(),
            title: config.ui.title.clone(),
            should_quit: false,
        }
    }

    /// Handle for code that runs off the UI thread.
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    pub fn register_route<F>(&mut self, route: &str, factory: F) -> Result<()>
    where
        F: Fn(&RouteArgs) -> anyhow::Result<Box<dyn Page>> + 'static,
    {
        self.navigator.register_route(route, factory)
    }

    pub fn register_routes<I>(&mut self, routes: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, PageFactory)>,
    {
        self.navigator.register_routes(routes)
    }

    /// Navigate to `route`. On failure the error page is shown and the
    /// error is also returned for the caller's information.
    pub fn navigate(&mut self, route: &str, args: RouteArgs) -> Result<()> {
        let (navigator, mut ctx) = self.split();
        match navigator.navigate(route, args, &mut ctx) {
            Ok(()) => {
                self.events.publish(NAVIGATED, json!({ "route": route }));
                Ok(())
            }
            Err(err) => Err(self.navigation_failed(err)),
        }
    }

    /// Go back one page. `Ok(false)` when there is nothing to go back to.
    pub fn back(&mut self) -> Result<bool> {
        let (navigator, mut ctx) = self.split();
        match navigator.back(&mut ctx) {
            Ok(moved) => {
                if moved {
                    if let Some(route) = self.navigator.current_route() {
                        self.events.publish(NAVIGATED, json!({ "route": route }));
                    }
                }
                Ok(moved)
            }
            Err(err) => Err(self.navigation_failed(err)),
        }
    }

    /// Rebuild the page currently showing, e.g. after its state changed.
    pub fn refresh(&mut self) -> Result<()> {
        let (navigator, mut ctx) = self.split();
        match navigator.reload(&mut ctx) {
            Ok(_) => Ok(()),
            Err(err) => Err(self.navigation_failed(err)),
        }
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// Run one UI job inside the error boundary.
    pub fn run_job(&mut self, job: UiJob) {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| job(self))) {
            self.report_failure(
                "dispatched job panicked",
                AppError::TaskFailure(panic_message(panic.as_ref())),
            );
        }
    }

    /// Run every job already queued on `rx`, including jobs queued while
    /// draining. Other events are discarded. Returns the number of jobs run.
    pub fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> usize {
        let mut ran = 0;
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Dispatch(job) = event {
                self.run_job(job);
                ran += 1;
            }
        }
        ran
    }

    /// Wait up to `timeout` for the next UI job and run it.
    pub async fn next_job(
        &mut self,
        rx: &mut mpsc::UnboundedReceiver<AppEvent>,
        timeout: Duration,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(AppEvent::Dispatch(job))) => {
                    self.run_job(job);
                    return true;
                }
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => return false,
            }
        }
    }

    /// Error boundary: log `err` and surface it as a notification.
    pub fn report_failure(&mut self, context: &str, err: AppError) {
        log_exception(context, &err);
        let level = match err {
            AppError::SubscriberFailure { .. } => NotificationLevel::Warning,
            _ => NotificationLevel::Error,
        };
        self.notify(level, err.to_string());
    }

    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.notifications.push_back(Notification {
            timestamp: Local::now().format(&self.timestamp_format).to_string(),
            level,
            message: message.into(),
        });
        while self.notifications.len() > self.max_notifications {
            self.notifications.pop_front();
        }
    }

    /// Oldest first.
    pub fn notifications(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter()
    }

    pub fn latest_notification(&self) -> Option<&Notification> {
        self.notifications.back()
    }

    pub fn dismiss_notifications(&mut self) {
        self.notifications.clear();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn navigation_failed(&mut self, err: AppError) -> AppError {
        log_exception("navigation failed", &err);
        let (navigator, mut ctx) = self.split();
        navigator.show_error(&err, &mut ctx);
        debug_assert_eq!(self.navigator.phase(), NavPhase::Failed);
        self.notify(NotificationLevel::Error, err.to_string());
        err
    }

    fn split(&mut self) -> (&mut Navigator, Context<'_>) {
        (
            &mut self.navigator,
            Context {
                state: &mut self.state,
                events: &mut self.events,
                tasks: &self.tasks,
                dispatcher: &self.dispatcher,
            },
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ui::window::Window;

    pub(crate) fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(&AppConfig::default(), Box::new(Window::new()), tx);
        (app, rx)
    }

    #[test]
    fn test_dispatched_panic_is_contained() {
        let (mut app, mut rx) = test_app();
        app.dispatcher().dispatch(|_app| panic!("job panic"));
        app.dispatcher().set_state("after", 1_u8);
        assert_eq!(app.drain(&mut rx), 2);
        assert_eq!(app.state.get::<u8>("after").unwrap(), 1);
        assert_eq!(app.latest_notification().unwrap().level, NotificationLevel::Error);
    }

    #[test]
    fn test_notifications_are_bounded() {
        let (mut app, _rx) = test_app();
        for i in 0..20 {
            app.notify(NotificationLevel::Info, format!("note {i}"));
        }
        assert_eq!(app.notifications().count(), AppConfig::default().ui.max_notifications);
        assert_eq!(app.latest_notification().unwrap().message, "note 19");
        app.dismiss_notifications();
        assert!(app.latest_notification().is_none());
    }

    #[test]
    fn test_navigated_event_published() {
        let (mut app, mut rx) = test_app();
        let routes = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let r = routes.clone();
        app.events.subscribe(NAVIGATED, move |_app, payload| {
            r.lock().unwrap().push(payload["route"].as_str().unwrap_or_default().to_string());
            Ok(())
        });
        app.register_route("home", |_| Ok(Box::new(crate::pages::about::AboutPage)))
            .unwrap();
        app.navigate("home", RouteArgs::new()).unwrap();
        let _ = app.navigate("nowhere", RouteArgs::new());
        app.drain(&mut rx);
        assert_eq!(*routes.lock().unwrap(), vec!["home"]);
    }

    #[test]
    fn test_dispatcher_navigation_from_worker() {
        let (mut app, mut rx) = test_app();
        app.register_route("home", |_| Ok(Box::new(crate::pages::about::AboutPage)))
            .unwrap();
        let dispatcher = app.dispatcher();
        std::thread::spawn(move || dispatcher.navigate("home", RouteArgs::new()))
            .join()
            .unwrap();
        app.drain(&mut rx);
        assert_eq!(app.navigator().current_route(), Some("home"));
    }

    #[test]
    fn test_quit_flag() {
        let (mut app, _rx) = test_app();
        assert!(!app.should_quit());
        app.quit();
        assert!(app.should_quit());
    }
}
