//! Reactive application state store.
//!
//! Each key holds one value whose type is fixed by the first write. Later
//! writes with another type fail with [`AppError::TypeMismatch`] and leave the
//! slot untouched. Subscribers are notified synchronously, in subscription
//! order, with `(old, new)`; a failing subscriber is logged and skipped.
//!
//! The store is owned by the [`App`](crate::app::controller::App) and only
//! ever mutated on the UI thread. Reads copy the value out.

use crate::app::error::{panic_message, AppError, Result};
use crate::app::event::Subscription;
use crate::logging::log_exception;
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, info};

/// Types that can live in a state slot.
pub trait StateValue: Any + Clone + PartialEq + Serialize {}

impl<T: Any + Clone + PartialEq + Serialize> StateValue for T {}

type ChangeFn = Box<dyn Fn(&dyn Any, &dyn Any) -> anyhow::Result<()>>;

struct Slot {
    value: Box<dyn Any>,
    type_id: TypeId,
    type_name: &'static str,
    to_json: fn(&dyn Any) -> Option<serde_json::Result<Value>>,
}

impl Slot {
    fn new<T: StateValue>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            to_json: |any| any.downcast_ref::<T>().map(serde_json::to_value),
        }
    }

    fn check<T: StateValue>(&self, key: &str) -> Result<()> {
        if self.type_id == TypeId::of::<T>() {
            Ok(())
        } else {
            Err(AppError::TypeMismatch {
                key: key.to_string(),
                expected: self.type_name,
                found: type_name::<T>(),
            })
        }
    }
}

struct Subscriber {
    id: u64,
    name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    on_change: ChangeFn,
}

pub struct StateStore {
    slots: HashMap<String, Slot>,
    subscribers: HashMap<String, Vec<Subscriber>>,
    next_subscription: u64,
}

impl StateStore {
    pub fn new() -> Self {
        info!("state store initialized");
        Self {
            slots: HashMap::new(),
            subscribers: HashMap::new(),
            next_subscription: 0,
        }
    }

    /// Declare a slot up front. Fails if the key already exists.
    pub fn define<T: StateValue>(&mut self, key: &str, initial: T) -> Result<()> {
        if self.slots.contains_key(key) {
            return Err(AppError::DuplicateKey(key.to_string()));
        }
        self.check_subscribed::<T>(key)?;
        self.declare(key, initial);
        Ok(())
    }

    /// Copy out the current value of `key`.
    pub fn get<T: StateValue>(&self, key: &str) -> Result<T> {
        let slot = self
            .slots
            .get(key)
            .ok_or_else(|| AppError::KeyNotFound(key.to_string()))?;
        slot.check::<T>(key)?;
        slot.value
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| AppError::TypeMismatch {
                key: key.to_string(),
                expected: slot.type_name,
                found: type_name::<T>(),
            })
    }

    /// Like [`get`](Self::get) but falls back to `default` when the key is unset.
    pub fn get_or<T: StateValue>(&self, key: &str, default: T) -> Result<T> {
        match self.get(key) {
            Err(AppError::KeyNotFound(_)) => Ok(default),
            other => other,
        }
    }

    /// Write `value` to `key`.
    ///
    /// The first write declares the slot's type and does not notify. Writing
    /// a value equal to the current one is a no-op.
    pub fn set<T: StateValue>(&mut self, key: &str, value: T) -> Result<()> {
        let Some(slot) = self.slots.get_mut(key) else {
            self.check_subscribed::<T>(key)?;
            self.declare(key, value);
            return Ok(());
        };
        slot.check::<T>(key)?;

        if slot.value.downcast_ref::<T>() == Some(&value) {
            debug!(key = %key, "state unchanged, skipping notification");
            return Ok(());
        }

        let old = std::mem::replace(&mut slot.value, Box::new(value));
        let subscribers = self.subscribers.get(key).map(Vec::as_slice).unwrap_or(&[]);
        info!(key = %key, subscribers = subscribers.len(), "state updated");

        for sub in subscribers {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                (sub.on_change)(old.as_ref(), slot.value.as_ref())
            }));
            let message = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => format!("{e:#}"),
                Err(payload) => panic_message(payload.as_ref()),
            };
            log_exception(
                &format!("state subscriber error for key '{key}'"),
                &AppError::SubscriberFailure {
                    name: sub.name.to_string(),
                    message,
                },
            );
        }
        Ok(())
    }

    /// Register `on_change(old, new)` for `key`.
    ///
    /// The key may be unset, in which case the subscription fixes the type
    /// its first write must have. A type other than the declared one is
    /// refused.
    pub fn subscribe<T, F>(&mut self, key: &str, on_change: F) -> Result<Subscription>
    where
        T: StateValue,
        F: Fn(&T, &T) -> anyhow::Result<()> + 'static,
    {
        match self.slots.get(key) {
            Some(slot) => slot.check::<T>(key)?,
            None => self.check_subscribed::<T>(key)?,
        }

        let id = self.next_subscription;
        self.next_subscription += 1;
        let name = type_name::<F>();
        let wrapped: ChangeFn = Box::new(move |old, new| {
            match (old.downcast_ref::<T>(), new.downcast_ref::<T>()) {
                (Some(old), Some(new)) => on_change(old, new),
                _ => anyhow::bail!("subscriber expects {}", type_name::<T>()),
            }
        });

        self.subscribers
            .entry(key.to_string())
            .or_default()
            .push(Subscriber {
                id,
                name,
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                on_change: wrapped,
            });
        debug!(key = %key, subscriber = name, "subscribed to state");
        Ok(Subscription::new(key, id))
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, subscription: &Subscription) -> bool {
        let Some(subs) = self.subscribers.get_mut(subscription.key()) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|s| s.id != subscription.id());
        let removed = subs.len() != before;
        if removed {
            debug!(key = %subscription.key(), "unsubscribed from state");
        }
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn subscriber_count(&self, key: &str) -> usize {
        self.subscribers.get(key).map_or(0, Vec::len)
    }

    /// Serialize every slot. Values that fail to serialize are logged and left out.
    pub fn snapshot(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, slot) in &self.slots {
            match (slot.to_json)(slot.value.as_ref()) {
                Some(Ok(value)) => {
                    out.insert(key.clone(), value);
                }
                Some(Err(e)) => {
                    tracing::warn!(key = %key, error = %e, "state value not serializable");
                }
                None => {}
            }
        }
        out
    }

    /// Keys whose value differs between this store and `other`, with
    /// `(ours, theirs)`. Missing keys appear as `None`.
    pub fn diff(&self, other: &Map<String, Value>) -> BTreeMap<String, (Option<Value>, Option<Value>)> {
        let ours = self.snapshot();
        let mut changes = BTreeMap::new();
        for key in ours.keys().chain(other.keys()) {
            let (a, b) = (ours.get(key), other.get(key));
            if a != b {
                changes.insert(key.clone(), (a.cloned(), b.cloned()));
            }
        }
        changes
    }

    /// An undeclared key takes its type from the subscribers already waiting on it.
    fn check_subscribed<T: StateValue>(&self, key: &str) -> Result<()> {
        let waiting = self.subscribers.get(key).and_then(|subs| subs.first());
        match waiting {
            Some(sub) if sub.type_id != TypeId::of::<T>() => Err(AppError::TypeMismatch {
                key: key.to_string(),
                expected: sub.type_name,
                found: type_name::<T>(),
            }),
            _ => Ok(()),
        }
    }

    fn declare<T: StateValue>(&mut self, key: &str, value: T) {
        info!(key = %key, declared_type = type_name::<T>(), "state slot declared");
        self.slots.insert(key.to_string(), Slot::new(value));
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
