//! Response event dispatch.
//!
//! Inbound objects that the transport does not consume itself are turned
//! into events and handed to subscribed listeners.
//!
//! | Event | Fired by | Correlated by |
//! |-------|----------|---------------|
//! | [`EventType::Ack`] | `requestAckNotification` | `params.requestId` |
//! | [`EventType::Done`] | [`Response`](crate::protocol::Response) | `id` |
//! | [`EventType::EmptyResponse`] | `emptyResponseNotification` | (none) |
//! | [`EventType::ServerReady`] | `serverReadyNotification` | (none) |
//!
//! A listener registered with a correlation ID only fires for events
//! carrying the same ID. Events without an ID reach every listener of their
//! type.
//!
//! # Reentrancy
//!
//! Callbacks run with the registry unlocked and may add or remove
//! listeners. Firing works on a snapshot of matching listener IDs taken up
//! front, and each ID is re-checked right before its callback runs, so a
//! listener removed by an earlier callback is skipped and one added during
//! firing waits for the next event. One-time listeners are removed just
//! before they are invoked.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::identifiers::{ListenerId, RequestId};
use crate::protocol::{NotificationKind, RpcObject};

// ============================================================================
// Types
// ============================================================================

/// Listener callback type.
pub type ResponseCallback = Arc<dyn Fn(&RpcObject) + Send + Sync>;

// ============================================================================
// EventType
// ============================================================================

/// Event categories listeners subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// The remote acknowledged a request.
    Ack,
    /// A response arrived.
    Done,
    /// The remote has no saved response.
    EmptyResponse,
    /// The popup is ready.
    ServerReady,
}

impl EventType {
    /// Maps an object to its event, if it fires one.
    #[must_use]
    pub fn of(message: &RpcObject) -> Option<Self> {
        match message {
            RpcObject::Response(_) => Some(Self::Done),
            RpcObject::Notification(n) => match n.kind()? {
                NotificationKind::RequestAck => Some(Self::Ack),
                NotificationKind::EmptyResponse => Some(Self::EmptyResponse),
                NotificationKind::ServerReady => Some(Self::ServerReady),
                NotificationKind::ClientReady => None,
            },
            RpcObject::Request(_) => None,
        }
    }

    /// Returns the event name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ack => "ack",
            Self::Done => "done",
            Self::EmptyResponse => "emptyResponse",
            Self::ServerReady => "serverReady",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlation ID carried by an object, for ack and response only.
fn correlation_of(message: &RpcObject) -> Option<&str> {
    match message {
        RpcObject::Response(r) => Some(r.id().as_str()),
        RpcObject::Notification(n) => n.request_id(),
        RpcObject::Request(_) => None,
    }
}

// ============================================================================
// Registry
// ============================================================================

struct Listener {
    id: ListenerId,
    callback: ResponseCallback,
    event_type: EventType,
    one_time: bool,
    correlation_id: Option<RequestId>,
}

impl Listener {
    fn matches(&self, event_type: EventType, correlation: Option<&str>) -> bool {
        if self.event_type != event_type {
            return false;
        }
        match (self.correlation_id.as_ref(), correlation) {
            (Some(wanted), Some(actual)) => wanted.as_str() == actual,
            _ => true,
        }
    }
}

#[derive(Default)]
struct Registry {
    listeners: Vec<Listener>,
    next_id: u64,
}

// ============================================================================
// EventDispatcher
// ============================================================================

/// Ordered listener registry.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    inner: Arc<Mutex<Registry>>,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EventDispatcher {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener.
    ///
    /// With `correlation_id` set, the listener only fires for ack and
    /// response objects carrying that ID.
    pub fn add_response_listener(
        &self,
        callback: ResponseCallback,
        event_type: EventType,
        one_time: bool,
        correlation_id: Option<RequestId>,
    ) -> ListenerId {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = ListenerId::new(inner.next_id);
        inner.listeners.push(Listener {
            id,
            callback,
            event_type,
            one_time,
            correlation_id,
        });
        trace!(listener = %id, event = %event_type, one_time, "Listener added");
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn remove_response_listener(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|l| l.id != id);
        inner.listeners.len() != before
    }

    /// Removes every listener sharing `callback`. Returns the count removed.
    pub fn remove_callback(&self, callback: &ResponseCallback) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.listeners.len();
        inner
            .listeners
            .retain(|l| !Arc::ptr_eq(&l.callback, callback));
        before - inner.listeners.len()
    }

    /// Removes every listener.
    pub fn clear_response_listeners(&self) {
        self.inner.lock().listeners.clear();
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Returns `true` if `id` is still registered.
    #[must_use]
    pub fn has_listener(&self, id: ListenerId) -> bool {
        self.inner.lock().listeners.iter().any(|l| l.id == id)
    }

    /// Fires the event for `message`. Returns the number of callbacks run.
    pub fn fire_response_event(&self, message: &RpcObject) -> usize {
        let Some(event_type) = EventType::of(message) else {
            trace!(method = ?message.method(), "No event for object");
            return 0;
        };
        let correlation = correlation_of(message);

        let candidates: Vec<ListenerId> = self
            .inner
            .lock()
            .listeners
            .iter()
            .filter(|l| l.matches(event_type, correlation))
            .map(|l| l.id)
            .collect();

        let mut fired = 0;
        for id in candidates {
            let callback = {
                let mut inner = self.inner.lock();
                let Some(pos) = inner.listeners.iter().position(|l| l.id == id) else {
                    continue;
                };
                let callback = Arc::clone(&inner.listeners[pos].callback);
                if inner.listeners[pos].one_time {
                    inner.listeners.remove(pos);
                }
                callback
            };
            callback(message);
            fired += 1;
        }

        trace!(event = %event_type, fired, "Event fired");
        fired
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::protocol::{Notification, Response};

    fn recorder() -> (ResponseCallback, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ResponseCallback = Arc::new(move |message: &RpcObject| {
            sink.lock().push(message.to_value().to_string());
        });
        (callback, seen)
    }

    fn response(id: &str) -> RpcObject {
        let id = RequestId::new(id).expect("valid");
        Response::success(id, json!({})).expect("valid").into()
    }

    fn rid(id: &str) -> Option<RequestId> {
        Some(RequestId::new(id).expect("valid"))
    }

    #[test]
    fn test_event_type_mapping() {
        let ack = Notification::request_ack(&RequestId::new("a").expect("valid")).into();
        assert_eq!(EventType::of(&ack), Some(EventType::Ack));
        assert_eq!(EventType::of(&response("a")), Some(EventType::Done));
        assert_eq!(
            EventType::of(&Notification::server_ready().into()),
            Some(EventType::ServerReady)
        );
        assert_eq!(EventType::of(&Notification::client_ready().into()), None);
    }

    #[test]
    fn test_correlation_filter() {
        let dispatcher = EventDispatcher::new();
        let (store_cb, store_seen) = recorder();
        let (any_cb, any_seen) = recorder();

        dispatcher.add_response_listener(store_cb, EventType::Done, false, rid("store"));
        dispatcher.add_response_listener(any_cb, EventType::Done, false, None);

        assert_eq!(dispatcher.fire_response_event(&response("select")), 1);
        assert_eq!(dispatcher.fire_response_event(&response("store")), 2);

        assert_eq!(store_seen.lock().len(), 1);
        assert_eq!(any_seen.lock().len(), 2);
    }

    #[test]
    fn test_events_without_id_bypass_filter() {
        let dispatcher = EventDispatcher::new();
        let (cb, seen) = recorder();
        dispatcher.add_response_listener(cb, EventType::EmptyResponse, false, rid("store"));

        dispatcher.fire_response_event(&Notification::empty_response().into());
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_one_time_listener_fires_once() {
        let dispatcher = EventDispatcher::new();
        let (cb, seen) = recorder();
        let id = dispatcher.add_response_listener(cb, EventType::Done, true, rid("q1"));

        dispatcher.fire_response_event(&response("q2"));
        assert!(dispatcher.has_listener(id));

        dispatcher.fire_response_event(&response("q1"));
        dispatcher.fire_response_event(&response("q1"));
        assert_eq!(seen.lock().len(), 1);
        assert!(!dispatcher.has_listener(id));
    }

    #[test]
    fn test_one_time_correlated_pair() {
        let dispatcher = EventDispatcher::new();
        let (first_cb, first_seen) = recorder();
        let (second_cb, second_seen) = recorder();
        let first = dispatcher.add_response_listener(first_cb, EventType::Done, true, rid("s1"));
        let second = dispatcher.add_response_listener(second_cb, EventType::Done, true, rid("s2"));

        assert_eq!(dispatcher.fire_response_event(&response("s1")), 1);
        assert_eq!(first_seen.lock().len(), 1);
        assert_eq!(second_seen.lock().len(), 0);

        assert_eq!(dispatcher.fire_response_event(&response("s1")), 0);
        assert_eq!(first_seen.lock().len(), 1);
        assert_eq!(second_seen.lock().len(), 0);

        assert!(!dispatcher.has_listener(first));
        assert!(dispatcher.has_listener(second));
    }

    #[test]
    fn test_registration_order() {
        let dispatcher = EventDispatcher::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            let order = Arc::clone(&order);
            dispatcher.add_response_listener(
                Arc::new(move |_: &RpcObject| order.lock().push(n)),
                EventType::Done,
                false,
                None,
            );
        }

        dispatcher.fire_response_event(&response("x"));
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_callback_removes_all_records() {
        let dispatcher = EventDispatcher::new();
        let (cb, seen) = recorder();
        dispatcher.add_response_listener(Arc::clone(&cb), EventType::Done, false, None);
        dispatcher.add_response_listener(Arc::clone(&cb), EventType::Ack, false, None);

        assert_eq!(dispatcher.remove_callback(&cb), 2);
        assert_eq!(dispatcher.fire_response_event(&response("x")), 0);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_removal_during_fire_skips_removed_neighbor() {
        let dispatcher = EventDispatcher::new();
        let (second_cb, second_seen) = recorder();
        let second_id = Arc::new(Mutex::new(None));

        let remover = {
            let dispatcher = dispatcher.clone();
            let second_id = Arc::clone(&second_id);
            Arc::new(move |_: &RpcObject| {
                if let Some(id) = *second_id.lock() {
                    dispatcher.remove_response_listener(id);
                }
            })
        };
        dispatcher.add_response_listener(remover, EventType::Done, false, None);
        *second_id.lock() =
            Some(dispatcher.add_response_listener(second_cb, EventType::Done, false, None));

        assert_eq!(dispatcher.fire_response_event(&response("x")), 1);
        assert!(second_seen.lock().is_empty());
    }

    #[test]
    fn test_one_time_removal_does_not_skip_neighbor() {
        let dispatcher = EventDispatcher::new();
        let (first_cb, first_seen) = recorder();
        let (second_cb, second_seen) = recorder();
        dispatcher.add_response_listener(first_cb, EventType::Done, true, None);
        dispatcher.add_response_listener(second_cb, EventType::Done, false, None);

        assert_eq!(dispatcher.fire_response_event(&response("x")), 2);
        assert_eq!(first_seen.lock().len(), 1);
        assert_eq!(second_seen.lock().len(), 1);
        assert_eq!(dispatcher.listener_count(), 1);
    }

    #[test]
    fn test_addition_during_fire_waits_for_next_event() {
        let dispatcher = EventDispatcher::new();
        let (late_cb, late_seen) = recorder();

        let adder = {
            let dispatcher = dispatcher.clone();
            Arc::new(move |_: &RpcObject| {
                dispatcher.add_response_listener(Arc::clone(&late_cb), EventType::Done, true, None);
            })
        };
        dispatcher.add_response_listener(adder, EventType::Done, true, None);

        assert_eq!(dispatcher.fire_response_event(&response("x")), 1);
        assert!(late_seen.lock().is_empty());

        assert_eq!(dispatcher.fire_response_event(&response("x")), 1);
        assert_eq!(late_seen.lock().len(), 1);
    }

    #[test]
    fn test_clear() {
        let dispatcher = EventDispatcher::new();
        let (cb, _) = recorder();
        dispatcher.add_response_listener(cb, EventType::Done, false, None);
        dispatcher.clear_response_listeners();
        assert_eq!(dispatcher.listener_count(), 0);
    }
}
