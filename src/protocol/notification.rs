//! Notification message types.
//!
//! Notifications are fire-and-forget objects; no response is expected.
//!
//! | Kind | Method | Direction | Params |
//! |------|--------|-----------|--------|
//! | [`NotificationKind::RequestAck`] | `requestAckNotification` | Remote → Page | `requestId` |
//! | [`NotificationKind::ServerReady`] | `serverReadyNotification` | Remote → Page | none |
//! | [`NotificationKind::ClientReady`] | `clientReadyNotification` | Page → Remote | none |
//! | [`NotificationKind::EmptyResponse`] | `emptyResponseNotification` | Remote → Page | none |

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::message::{envelope, raw_timestamp, truthy};

// ============================================================================
// NotificationKind
// ============================================================================

/// Known notification kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// The remote received a request and is about to handle it.
    RequestAck,
    /// The popup page is loaded and can accept queued requests.
    ServerReady,
    /// The page is ready to receive saved responses (sent into the iframe).
    ClientReady,
    /// The remote holds no saved response for this page.
    EmptyResponse,
}

impl NotificationKind {
    /// All notification kinds.
    pub const ALL: [Self; 4] = [
        Self::RequestAck,
        Self::ServerReady,
        Self::ClientReady,
        Self::EmptyResponse,
    ];

    /// Returns the wire method name.
    #[inline]
    #[must_use]
    pub const fn method(self) -> &'static str {
        match self {
            Self::RequestAck => "requestAckNotification",
            Self::ServerReady => "serverReadyNotification",
            Self::ClientReady => "clientReadyNotification",
            Self::EmptyResponse => "emptyResponseNotification",
        }
    }

    /// Looks a kind up by method name.
    #[must_use]
    pub fn from_method(method: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.method() == method)
    }

    /// Parses a raw object as this kind.
    ///
    /// Returns `None` if the method name or required params do not match.
    #[must_use]
    pub fn parse(self, raw: &Value) -> Option<Notification> {
        if raw.get("method").and_then(Value::as_str) != Some(self.method()) {
            return None;
        }

        let notification = match self {
            Self::RequestAck => {
                let request_id = raw
                    .get("params")
                    .and_then(|p| p.get("requestId"))
                    .filter(|v| truthy(v))
                    .and_then(Value::as_str)
                    .and_then(|id| RequestId::new(id).ok())?;
                Notification::request_ack(&request_id)
            }
            Self::ServerReady => Notification::server_ready(),
            Self::ClientReady => Notification::client_ready(),
            Self::EmptyResponse => Notification::empty_response(),
        };

        Some(match raw_timestamp(raw) {
            Some(ts) => notification.with_timestamp(ts),
            None => notification,
        })
    }
}

// ============================================================================
// Notification
// ============================================================================

/// A one-way message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    method: String,
    params: Option<Map<String, Value>>,
    timestamp: Option<u64>,
}

impl Notification {
    /// Creates a notification with an arbitrary method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `method` is empty.
    pub fn new(method: impl Into<String>, params: Option<Map<String, Value>>) -> Result<Self> {
        let method = method.into();
        if method.is_empty() {
            return Err(Error::invalid_argument("method must not be empty"));
        }
        Ok(Self {
            method,
            params,
            timestamp: None,
        })
    }

    /// Creates a notification of a known kind without params.
    fn of_kind(kind: NotificationKind) -> Self {
        Self {
            method: kind.method().to_string(),
            params: None,
            timestamp: None,
        }
    }

    /// Creates a `requestAckNotification`.
    #[must_use]
    pub fn request_ack(request_id: &RequestId) -> Self {
        let mut params = Map::new();
        params.insert("requestId".to_string(), Value::from(request_id.as_str()));
        Self {
            params: Some(params),
            ..Self::of_kind(NotificationKind::RequestAck)
        }
    }

    /// Creates a `serverReadyNotification`.
    #[inline]
    #[must_use]
    pub fn server_ready() -> Self {
        Self::of_kind(NotificationKind::ServerReady)
    }

    /// Creates a `clientReadyNotification`.
    #[inline]
    #[must_use]
    pub fn client_ready() -> Self {
        Self::of_kind(NotificationKind::ClientReady)
    }

    /// Creates an `emptyResponseNotification`.
    #[inline]
    #[must_use]
    pub fn empty_response() -> Self {
        Self::of_kind(NotificationKind::EmptyResponse)
    }

    /// Returns the method name.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the known kind, if the method is one.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<NotificationKind> {
        NotificationKind::from_method(&self.method)
    }

    /// Returns the params object.
    #[inline]
    #[must_use]
    pub fn params(&self) -> Option<&Map<String, Value>> {
        self.params.as_ref()
    }

    /// Returns a single param.
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.as_ref().and_then(|p| p.get(name))
    }

    /// Returns the acknowledged request ID of a `requestAckNotification`.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        if self.kind() != Some(NotificationKind::RequestAck) {
            return None;
        }
        self.param("requestId").and_then(Value::as_str)
    }

    /// Returns the timestamp, if stamped.
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> Option<u64> {
        self.timestamp
    }

    /// Returns a copy stamped with `timestamp`.
    #[inline]
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Returns the wire representation.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut json = envelope(self.timestamp);
        json.insert("method".to_string(), Value::from(self.method.as_str()));
        if let Some(ref params) = self.params {
            json.insert("params".to_string(), Value::Object(params.clone()));
        }
        Value::Object(json)
    }
}

// ============================================================================
// Tests
// ============================================================================
