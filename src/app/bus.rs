//! Publish/subscribe event bus.
//!
//! Publishers don't know about subscribers. Every delivery is scheduled
//! through the [`Dispatcher`], so callbacks always run on the UI thread with
//! `&mut App`, in subscription order, even when the publish came from a worker
//! via [`Dispatcher::publish`]. Publishing to a topic nobody listens to is a
//! silent no-op.

use crate::app::controller::App;
use crate::app::error::{panic_message, AppError};
use crate::app::event::{Dispatcher, Subscription};
use serde_json::Value;
use std::any::type_name;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Published by the controller after every successful navigation.
pub const NAVIGATED: &str = "navigated";
/// Published by the navigator after a back navigation.
pub const NAVIGATION_BACK: &str = "navigation_back";

type Callback = Arc<dyn Fn(&mut App, &Value) -> anyhow::Result<()> + Send + Sync>;

struct Subscriber {
    id: u64,
    name: &'static str,
    callback: Callback,
}

pub struct EventBus {
    subscribers: HashMap<String, Vec<Subscriber>>,
    dispatcher: Dispatcher,
    next_subscription: u64,
}

impl EventBus {
    pub fn new(dispatcher: Dispatcher) -> Self {
        info!("event bus initialized");
        Self {
            subscribers: HashMap::new(),
            dispatcher,
            next_subscription: 0,
        }
    }

    pub fn subscribe<F>(&mut self, topic: &str, callback: F) -> Subscription
    where
        F: Fn(&mut App, &Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription += 1;
        let name = type_name::<F>();
        self.subscribers
            .entry(topic.to_string())
            .or_default()
            .push(Subscriber {
                id,
                name,
                callback: Arc::new(callback),
            });
        info!(topic = %topic, subscriber = name, "subscribed to event");
        Subscription::new(topic, id)
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, subscription: &Subscription) -> bool {
        let Some(subs) = self.subscribers.get_mut(subscription.key()) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|s| s.id != subscription.id());
        if subs.is_empty() {
            self.subscribers.remove(subscription.key());
        }
        let removed = before != self.subscriber_count(subscription.key());
        if removed {
            debug!(topic = %subscription.key(), "unsubscribed from event");
        }
        removed
    }

    /// Queue one delivery per current subscriber of `topic`.
    ///
    /// Subscribers added or removed after this call do not affect the
    /// deliveries already queued.
    pub fn publish(&self, topic: &str, payload: Value) {
        let Some(subs) = self.subscribers.get(topic).filter(|s| !s.is_empty()) else {
            debug!(topic = %topic, "no subscribers, event dropped");
            return;
        };
        info!(topic = %topic, subscribers = subs.len(), "publishing event");

        let payload = Arc::new(payload);
        for sub in subs {
            let callback = Arc::clone(&sub.callback);
            let payload = Arc::clone(&payload);
            let topic_name = topic.to_string();
            let name = sub.name;
            let queued = self
                .dispatcher
                .dispatch(move |app| deliver(app, &topic_name, name, &callback, &payload));
            if !queued {
                warn!(topic = %topic, subscriber = name, "UI loop closed, delivery dropped");
            }
        }
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscribers.get(topic).map_or(0, Vec::len)
    }
}

fn deliver(app: &mut App, topic: &str, name: &'static str, callback: &Callback, payload: &Value) {
    let outcome = catch_unwind(AssertUnwindSafe(|| callback(app, payload)));
    let message = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(e)) => format!("{e:#}"),
        Err(panic) => panic_message(panic.as_ref()),
    };
    app.report_failure(
        &format!("event subscriber error for '{topic}'"),
        AppError::SubscriberFailure {
            name: name.to_string(),
            message,
        },
    );
}

#[cfg(test)]
mod tests {
    use crate::app::controller::tests::test_app;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let (mut app, mut rx) = test_app();
        app.events.publish("nobody", json!({"x": 1}));
        assert_eq!(app.drain(&mut rx), 0);
    }

    #[test]
    fn test_delivery_in_subscription_order_on_drain() {
        let (mut app, mut rx) = test_app();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in 1..=3 {
            let seen = seen.clone();
            app.events.subscribe("saved", move |_app, payload| {
                seen.lock().unwrap().push((tag, payload["id"].clone()));
                Ok(())
            });
        }

        app.events.publish("saved", json!({"id": 9}));
        assert!(seen.lock().unwrap().is_empty(), "delivery must go through the dispatcher");

        assert_eq!(app.drain(&mut rx), 3);
        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![(1, json!(9)), (2, json!(9)), (3, json!(9))]);
    }

    #[test]
    fn test_failing_subscriber_does_not_block_others() {
        let (mut app, mut rx) = test_app();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s1 = seen.clone();
        app.events.subscribe("topic", move |_app, _| {
            s1.lock().unwrap().push("s1");
            Ok(())
        });
        app.events.subscribe("topic", |_app, _| anyhow::bail!("s2 exploded"));
        let s3 = seen.clone();
        app.events.subscribe("topic", move |_app, _| {
            s3.lock().unwrap().push("s3");
            Ok(())
        });

        app.events.publish("topic", json!(null));
        app.drain(&mut rx);

        assert_eq!(*seen.lock().unwrap(), vec!["s1", "s3"]);
        assert_eq!(app.notifications().count(), 1);
    }

    #[test]
    fn test_panicking_subscriber_is_contained() {
        let (mut app, mut rx) = test_app();
        let hits = Arc::new(Mutex::new(0));
        app.events
            .subscribe("topic", |_app, _| -> anyhow::Result<()> { panic!("subscriber panic") });
        let h = hits.clone();
        app.events.subscribe("topic", move |_app, _| {
            *h.lock().unwrap() += 1;
            Ok(())
        });

        app.events.publish("topic", json!(1));
        app.drain(&mut rx);
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn test_subscriber_can_mutate_state() {
        let (mut app, mut rx) = test_app();
        app.events.subscribe("count", |app, payload| {
            let n = payload.as_i64().unwrap_or_default();
            app.state.set("count", n)?;
            Ok(())
        });
        app.events.publish("count", json!(4));
        app.drain(&mut rx);
        assert_eq!(app.state.get::<i64>("count").unwrap(), 4);
    }

    #[test]
    fn test_unsubscribe_twice_is_noop() {
        let (mut app, mut rx) = test_app();
        let hits = Arc::new(Mutex::new(0));
        let first = app.events.subscribe("topic", |_app, _| Ok(()));
        let h = hits.clone();
        app.events.subscribe("topic", move |_app, _| {
            *h.lock().unwrap() += 1;
            Ok(())
        });

        assert!(app.events.unsubscribe(&first));
        assert!(!app.events.unsubscribe(&first));
        assert_eq!(app.events.subscriber_count("topic"), 1);

        app.events.publish("topic", json!(null));
        app.drain(&mut rx);
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn test_publish_from_worker_thread() {
        let (mut app, mut rx) = test_app();
        let ui_thread = std::thread::current().id();
        let delivered_on = Arc::new(Mutex::new(None));
        let d = delivered_on.clone();
        app.events.subscribe("from_worker", move |_app, _| {
            *d.lock().unwrap() = Some(std::thread::current().id());
            Ok(())
        });

        let dispatcher = app.dispatcher();
        std::thread::spawn(move || dispatcher.publish("from_worker", json!("hi")))
            .join()
            .unwrap();

        // one job for the marshaled publish, one for the delivery it queues
        assert_eq!(app.drain(&mut rx), 2);
        assert_eq!(*delivered_on.lock().unwrap(), Some(ui_thread));
    }
}
