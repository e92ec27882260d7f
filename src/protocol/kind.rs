//! Classification of raw inbound objects.
//!
//! [`parse_rpc_object`] probes a raw JSON value against an ordered list of
//! acceptable kinds and returns the first match. It never errors; anything
//! it cannot classify is `None`.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::trace;

use super::message::{JSONRPC_VERSION, Response, RpcObject};
use super::notification::NotificationKind;
use super::request::RequestKind;

// ============================================================================
// RpcKind
// ============================================================================

/// Any parseable object kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcKind {
    /// A notification kind.
    Notification(NotificationKind),
    /// A client request kind.
    Request(RequestKind),
    /// A response.
    Response,
}

impl RpcKind {
    /// Parses `raw` as this kind.
    #[must_use]
    pub fn parse(self, raw: &Value) -> Option<RpcObject> {
        match self {
            Self::Notification(kind) => kind.parse(raw).map(RpcObject::Notification),
            Self::Request(kind) => kind.parse(raw).map(RpcObject::Request),
            Self::Response => Response::parse(raw).map(RpcObject::Response),
        }
    }

    /// Returns the method name, `None` for responses.
    #[must_use]
    pub const fn method(self) -> Option<&'static str> {
        match self {
            Self::Notification(kind) => Some(kind.method()),
            Self::Request(kind) => Some(kind.method()),
            Self::Response => None,
        }
    }
}

impl From<NotificationKind> for RpcKind {
    fn from(kind: NotificationKind) -> Self {
        Self::Notification(kind)
    }
}

impl From<RequestKind> for RpcKind {
    fn from(kind: RequestKind) -> Self {
        Self::Request(kind)
    }
}

/// Kinds the page accepts from the remote end.
pub const CLIENT_INBOUND_KINDS: [RpcKind; 4] = [
    RpcKind::Notification(NotificationKind::RequestAck),
    RpcKind::Notification(NotificationKind::ServerReady),
    RpcKind::Notification(NotificationKind::EmptyResponse),
    RpcKind::Response,
];

// ============================================================================
// Parsing
// ============================================================================

/// Classifies a raw object against `acceptable` kinds, in order.
///
/// Fails closed unless `raw.jsonrpc == "2.0"`. Objects carrying a `method`
/// are only tried against method kinds; objects without one only against
/// [`RpcKind::Response`].
#[must_use]
pub fn parse_rpc_object(raw: &Value, acceptable: &[RpcKind]) -> Option<RpcObject> {
    if raw.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        trace!("Missing or wrong jsonrpc version tag");
        return None;
    }

    if raw.get("method").is_some_and(|m| !m.is_null()) {
        return acceptable
            .iter()
            .filter(|kind| kind.method().is_some())
            .find_map(|kind| kind.parse(raw));
    }

    if acceptable.contains(&RpcKind::Response) {
        return Response::parse(raw).map(RpcObject::Response);
    }
    None
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::protocol::Notification;

    #[test]
    fn test_requires_version_tag() {
        let raw = json!({"method": "serverReadyNotification"});
        assert!(parse_rpc_object(&raw, &CLIENT_INBOUND_KINDS).is_none());

        let wrong = json!({"jsonrpc": "1.0", "method": "serverReadyNotification"});
        assert!(parse_rpc_object(&wrong, &CLIENT_INBOUND_KINDS).is_none());
    }

    #[test]
    fn test_classifies_inbound_kinds() {
        let ready = Notification::server_ready().to_value();
        let parsed = parse_rpc_object(&ready, &CLIENT_INBOUND_KINDS).expect("parse");
        assert_eq!(
            parsed.as_notification().and_then(Notification::kind),
            Some(NotificationKind::ServerReady)
        );

        let response = json!({"jsonrpc": "2.0", "id": "store", "result": {}});
        let parsed = parse_rpc_object(&response, &CLIENT_INBOUND_KINDS).expect("parse");
        assert!(parsed.as_response().is_some());
    }

    #[test]
    fn test_unacceptable_kind_is_rejected() {
        let client_ready = Notification::client_ready().to_value();
        assert!(parse_rpc_object(&client_ready, &CLIENT_INBOUND_KINDS).is_none());

        let store = json!({
            "jsonrpc": "2.0",
            "id": "s",
            "method": "store",
            "params": {"accounts": [{"email": "a@b.com"}]}
        });
        assert!(parse_rpc_object(&store, &CLIENT_INBOUND_KINDS).is_none());
        assert!(parse_rpc_object(&store, &[RequestKind::Store.into()]).is_some());
    }

    #[test]
    fn test_method_objects_never_parse_as_response() {
        let raw = json!({"jsonrpc": "2.0", "method": "custom", "id": "a", "result": 1});
        assert!(parse_rpc_object(&raw, &CLIENT_INBOUND_KINDS).is_none());
    }

    #[test]
    fn test_response_not_acceptable() {
        let raw = json!({"jsonrpc": "2.0", "id": "a", "result": 1});
        let kinds = [RpcKind::Notification(NotificationKind::ServerReady)];
        assert!(parse_rpc_object(&raw, &kinds).is_none());
    }

    #[test]
    fn test_first_matching_kind_wins() {
        let raw = json!({"jsonrpc": "2.0", "id": "m", "method": "manage"});
        let kinds = [
            RpcKind::Request(RequestKind::About),
            RpcKind::Request(RequestKind::Manage),
        ];
        let parsed = parse_rpc_object(&raw, &kinds).expect("parse");
        assert_eq!(parsed.method(), Some("manage"));
    }
}
