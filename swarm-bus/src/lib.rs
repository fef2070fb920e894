//! # swarm-bus — the in-process event bus
//!
//! Synchronous, ordered, wildcard-capable publish/subscribe (spec §4.1).
//! "Synchronous" here means delivery happens on the publisher's await
//! point — a subscriber's handler is awaited to completion before the next
//! subscriber runs, and `publish` itself resolves only once every matching
//! handler has been invoked. Subscribers that need to do slow, unrelated
//! work should hand off internally (e.g. push onto their own bounded queue
//! and return immediately) rather than block the bus.
//!
//! The dispatch shape — an ordered list of registered handlers, invoked in
//! registration order, with per-call error capture instead of global
//! failure — is the same one `neuron-hooks::HookRegistry` uses for the hook
//! pipeline; this bus generalizes it to arbitrary string-typed events, exact
//! or wildcard (`"*"`) matched, instead of a fixed five-point enum.

#![deny(missing_docs)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use swarm_proto::Event;
use tokio::sync::RwLock;

/// A subscriber invoked for every event whose type matches the pattern it
/// was registered under.
///
/// Returning `Err` does not stop the bus from delivering the event to other
/// subscribers — the error is captured and re-surfaced as a
/// `event.subscriber.failed` event instead.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle one event.
    async fn handle(&self, event: &Event);
}

/// A handler that can fail. Most handlers can just implement [`EventHandler`]
/// directly; this variant exists for subscribers that want the bus to turn
/// their failures into `event.subscriber.failed` events automatically.
#[async_trait]
pub trait FallibleEventHandler: Send + Sync {
    /// Handle one event, possibly failing.
    async fn handle(&self, event: &Event) -> Result<(), String>;
}

/// Opaque handle returned by `subscribe`, used to `unsubscribe` later.
pub type SubscriptionId = u64;

struct Subscription {
    id: SubscriptionId,
    pattern: String,
    handler: Arc<dyn FallibleEventHandler>,
}

/// The universal wildcard pattern, matching every event type.
pub const WILDCARD: &str = "*";

/// An in-process, ordered, wildcard-capable event bus.
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create a new, empty bus.
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe an infallible handler to `pattern` (an exact event type or
    /// `"*"`). Returns a handle usable with `unsubscribe`.
    pub async fn subscribe(
        &self,
        pattern: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> SubscriptionId {
        self.subscribe_fallible(pattern, Arc::new(InfallibleAdapter(handler)))
            .await
    }

    /// Subscribe a handler that can report failures. Failures are captured
    /// and surfaced as a separate `event.subscriber.failed` event rather
    /// than propagated to the publisher.
    pub async fn subscribe_fallible(
        &self,
        pattern: impl Into<String>,
        handler: Arc<dyn FallibleEventHandler>,
    ) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subs = self.subscriptions.write().await;
        subs.push(Subscription {
            id,
            pattern: pattern.into(),
            handler,
        });
        id
    }

    /// Remove a single subscription. Returns `false` if the id was unknown.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.write().await;
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    /// Number of subscribers registered under the given pattern string
    /// (exact match on the pattern, not event-matching semantics).
    pub async fn listener_count(&self, pattern: &str) -> usize {
        let subs = self.subscriptions.read().await;
        subs.iter().filter(|s| s.pattern == pattern).count()
    }

    /// Remove all subscriptions, or only those registered under `pattern` if
    /// given.
    pub async fn remove_all_listeners(&self, pattern: Option<&str>) {
        let mut subs = self.subscriptions.write().await;
        match pattern {
            Some(p) => subs.retain(|s| s.pattern != p),
            None => subs.clear(),
        }
    }

    /// Publish an event. Delivers synchronously, in registration order, to
    /// every subscriber whose pattern matches `event.event_type`. Never
    /// propagates subscriber errors — a failing subscriber is logged and
    /// surfaced as one `event.subscriber.failed` event, delivered once, with
    /// no further failure events generated for failures within that
    /// delivery (bounded recursion).
    pub async fn publish(&self, event: Event) {
        let mut failures = Vec::new();
        self.dispatch(&event, Some(&mut failures)).await;
        for failure in failures {
            self.dispatch(&failure, None).await;
        }
    }

    async fn dispatch(&self, event: &Event, mut failures: Option<&mut Vec<Event>>) {
        let matching: Vec<Arc<dyn FallibleEventHandler>> = {
            let subs = self.subscriptions.read().await;
            subs.iter()
                .filter(|s| event.matches(&s.pattern))
                .map(|s| Arc::clone(&s.handler))
                .collect()
        };

        for handler in matching {
            if let Err(err) = handler.handle(event).await {
                tracing::warn!(
                    event_type = %event.event_type,
                    error = %err,
                    "event subscriber failed"
                );
                if let Some(failures) = failures.as_deref_mut() {
                    failures.push(Event::new(
                        format!("{}-failed", event.id),
                        "event.subscriber.failed",
                        event.timestamp,
                        "event_bus",
                        serde_json::json!({
                            "original_type": event.event_type,
                            "error": err,
                        }),
                    ));
                }
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

struct InfallibleAdapter(Arc<dyn EventHandler>);

#[async_trait]
impl FallibleEventHandler for InfallibleAdapter {
    async fn handle(&self, event: &Event) -> Result<(), String> {
        self.0.handle(event).await;
        Ok(())
    }
}
