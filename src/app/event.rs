//! Events drained by the UI loop and the handle used to reach it.
//!
//! Every piece of work that must touch the [`App`] (state writes, event
//! delivery, task completions, navigation) travels as an [`AppEvent::Dispatch`]
//! job over one unbounded channel. The task that owns the receiver is the UI
//! thread; [`Dispatcher`] is the only thing other threads ever hold.

use crate::app::controller::App;
use crate::app::navigation::RouteArgs;
use crate::app::state::StateValue;
use crossterm::event::Event as CrosstermEvent;
use serde_json::Value;
use std::fmt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub type TaskId = usize;

/// A closure scheduled to run on the UI thread with exclusive access to the app.
pub type UiJob = Box<dyn FnOnce(&mut App) + Send + 'static>;

pub enum AppEvent {
    /// Terminal input event
    Terminal(CrosstermEvent),

    /// Work marshaled onto the UI thread
    Dispatch(UiJob),

    /// Tick for UI refresh
    Tick,
}

impl fmt::Debug for AppEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppEvent::Terminal(event) => f.debug_tuple("Terminal").field(event).finish(),
            AppEvent::Dispatch(_) => f.write_str("Dispatch(..)"),
            AppEvent::Tick => f.write_str("Tick"),
        }
    }
}

/// Opaque registration handle returned by the state store and the event bus.
///
/// Only usable for unsubscription. Unsubscribing twice is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    key: String,
    id: u64,
}

impl Subscription {
    pub(crate) fn new(key: &str, id: u64) -> Self {
        Self {
            key: key.to_string(),
            id,
        }
    }

    /// The state key or event topic this subscription is attached to.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

/// Cloneable, thread-safe handle that schedules closures on the UI thread.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl Dispatcher {
    pub fn new(tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self { tx }
    }

    /// Schedule `job` on the UI thread. Returns `false` if the UI loop is gone.
    pub fn dispatch<F>(&self, job: F) -> bool
    where
        F: FnOnce(&mut App) + Send + 'static,
    {
        match self.tx.send(AppEvent::Dispatch(Box::new(job))) {
            Ok(()) => true,
            Err(_) => {
                debug!("UI loop closed, dropping dispatched job");
                false
            }
        }
    }

    /// Publish an event from any thread. Delivery happens on the UI thread.
    pub fn publish(&self, topic: impl Into<String>, payload: Value) -> bool {
        let topic = topic.into();
        self.dispatch(move |app| app.events.publish(&topic, payload))
    }

    /// Write a state slot from any thread.
    pub fn set_state<T>(&self, key: impl Into<String>, value: T) -> bool
    where
        T: StateValue + Send,
    {
        let key = key.into();
        self.dispatch(move |app| {
            if let Err(e) = app.state.set(&key, value) {
                warn!(key = %key, error = %e, "dispatched state write rejected");
            }
        })
    }

    /// Request a navigation from any thread. Failures go through the app's
    /// error boundary like any other navigation.
    pub fn navigate(&self, route: impl Into<String>, args: RouteArgs) -> bool {
        let route = route.into();
        self.dispatch(move |app| {
            let _ = app.navigate(&route, args);
        })
    }

    pub fn back(&self) -> bool {
        self.dispatch(|app| {
            let _ = app.back();
        })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_queues_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(tx);
        assert!(dispatcher.dispatch(|_| {}));
        assert!(dispatcher.publish("topic", Value::Null));
        assert!(matches!(rx.try_recv(), Ok(AppEvent::Dispatch(_))));
        assert!(matches!(rx.try_recv(), Ok(AppEvent::Dispatch(_))));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dispatch_after_loop_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(tx);
        drop(rx);
        assert!(dispatcher.is_closed());
        assert!(!dispatcher.dispatch(|_| {}));
    }

    #[test]
    fn test_dispatcher_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Dispatcher>();
    }
}
