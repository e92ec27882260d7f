//! RPC object envelope and the [`Response`] type.
//!
//! Every wire object is a JSON object tagged `"jsonrpc": "2.0"` with an
//! optional epoch-millis `timestamp`.
//!
//! # Format
//!
//! Success:
//! ```json
//! { "jsonrpc": "2.0", "id": "store", "result": { ... } }
//! ```
//!
//! Error:
//! ```json
//! { "jsonrpc": "2.0", "id": "query_acEmpty_1", "error": { "code": -32601, "message": "Method not found" } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::{ClientRequest, Notification};

// ============================================================================
// Constants
// ============================================================================

/// Protocol version tag carried by every object.
pub const JSONRPC_VERSION: &str = "2.0";

// ============================================================================
// Envelope Helpers
// ============================================================================

/// Starts a wire object with the version tag and optional timestamp.
pub(crate) fn envelope(timestamp: Option<u64>) -> Map<String, Value> {
    let mut json = Map::new();
    json.insert("jsonrpc".to_string(), Value::from(JSONRPC_VERSION));
    if let Some(timestamp) = timestamp {
        json.insert("timestamp".to_string(), Value::from(timestamp));
    }
    json
}

/// Reads the optional timestamp of a raw object.
#[inline]
pub(crate) fn raw_timestamp(raw: &Value) -> Option<u64> {
    raw.get("timestamp").and_then(Value::as_u64)
}

/// Reads a truthy string `id` from a raw object.
#[inline]
pub(crate) fn raw_id(raw: &Value) -> Option<RequestId> {
    raw.get("id")
        .and_then(Value::as_str)
        .and_then(|id| RequestId::new(id).ok())
}

/// JavaScript truthiness of a JSON value.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Returns the field if present and not null.
#[inline]
pub(crate) fn present<'a>(raw: &'a Value, key: &str) -> Option<&'a Value> {
    raw.get(key).filter(|v| !v.is_null())
}

// ============================================================================
// RpcObject
// ============================================================================

/// Any protocol unit: notification, client request or response.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcObject {
    /// One-way message.
    Notification(Notification),
    /// Request expecting one correlated response.
    Request(ClientRequest),
    /// Response to a request.
    Response(Response),
}

impl RpcObject {
    /// Returns the wire representation.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Notification(n) => n.to_value(),
            Self::Request(r) => r.to_value(),
            Self::Response(r) => r.to_value(),
        }
    }

    /// Returns the timestamp, if stamped.
    #[must_use]
    pub fn timestamp(&self) -> Option<u64> {
        match self {
            Self::Notification(n) => n.timestamp(),
            Self::Request(r) => r.timestamp(),
            Self::Response(r) => r.timestamp(),
        }
    }

    /// Returns a copy stamped with `timestamp`.
    #[must_use]
    pub fn with_timestamp(self, timestamp: u64) -> Self {
        match self {
            Self::Notification(n) => Self::Notification(n.with_timestamp(timestamp)),
            Self::Request(r) => Self::Request(r.with_timestamp(timestamp)),
            Self::Response(r) => Self::Response(r.with_timestamp(timestamp)),
        }
    }

    /// Returns the method name for notifications and requests.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Notification(n) => Some(n.method()),
            Self::Request(r) => Some(r.method()),
            Self::Response(_) => None,
        }
    }

    /// Returns the inner notification, if any.
    #[inline]
    #[must_use]
    pub fn as_notification(&self) -> Option<&Notification> {
        match self {
            Self::Notification(n) => Some(n),
            _ => None,
        }
    }

    /// Returns the inner request, if any.
    #[inline]
    #[must_use]
    pub fn as_request(&self) -> Option<&ClientRequest> {
        match self {
            Self::Request(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the inner response, if any.
    #[inline]
    #[must_use]
    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Self::Response(r) => Some(r),
            _ => None,
        }
    }
}

impl From<Notification> for RpcObject {
    fn from(notification: Notification) -> Self {
        Self::Notification(notification)
    }
}

impl From<ClientRequest> for RpcObject {
    fn from(request: ClientRequest) -> Self {
        Self::Request(request)
    }
}

impl From<Response> for RpcObject {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl Serialize for RpcObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl fmt::Display for RpcObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

// ============================================================================
// RpcError
// ============================================================================

/// JSON-RPC 2.0 error object.
///
/// Errors read off the wire keep every field the remote sent, so
/// [`RpcError::to_value`] hands back exactly what arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code, e.g. `-32601`.
    pub code: i64,

    /// Short description.
    pub message: String,

    /// Additional information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Fields beyond `code`, `message` and `data`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// Verbatim error when it is not a well-formed object.
    #[serde(skip)]
    raw: Option<Value>,
}

impl RpcError {
    /// Code for an unsupported method or operation.
    pub const METHOD_NOT_FOUND: i64 = -32601;

    /// Creates an error object.
    #[inline]
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
            extra: Map::new(),
            raw: None,
        }
    }

    /// Creates a "Method not found" error.
    #[inline]
    #[must_use]
    pub fn method_not_found(data: Option<Value>) -> Self {
        Self::new(Self::METHOD_NOT_FOUND, "Method not found", data)
    }

    /// Reads an error object leniently.
    ///
    /// Missing or ill-typed `code`/`message` read as `0` and `""`; a
    /// non-object value becomes the `data` of an otherwise empty error. In
    /// both cases the original value is kept for [`RpcError::to_value`].
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(map) = value else {
            let mut error = Self::new(0, "", Some(value.clone()));
            error.raw = Some(value.clone());
            return error;
        };

        let code = map.get("code").and_then(Value::as_i64);
        let message = map.get("message").and_then(Value::as_str);
        let mut error = Self::new(
            code.unwrap_or_default(),
            message.unwrap_or_default(),
            map.get("data").filter(|v| !v.is_null()).cloned(),
        );
        error.extra = map
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "code" | "message" | "data"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if code.is_none() || message.is_none() || map.get("data").is_some_and(Value::is_null) {
            error.raw = Some(value.clone());
        }
        error
    }

    /// Returns the wire representation.
    #[must_use]
    pub fn to_value(&self) -> Value {
        if let Some(ref raw) = self.raw {
            return raw.clone();
        }
        let mut json = self.extra.clone();
        json.insert("code".to_string(), Value::from(self.code));
        json.insert("message".to_string(), Value::from(self.message.clone()));
        if let Some(ref data) = self.data {
            json.insert("data".to_string(), data.clone());
        }
        Value::Object(json)
    }
}

// ============================================================================
// Response
// ============================================================================

/// Outcome of a request: exactly one of result or error.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Successful result (never null).
    Result(Value),
    /// Error object.
    Error(RpcError),
}

/// A response from the remote end, correlated by request `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    id: RequestId,
    outcome: Outcome,
    timestamp: Option<u64>,
}

impl Response {
    /// Creates a success response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `result` is null.
    pub fn success(id: RequestId, result: Value) -> Result<Self> {
        if result.is_null() {
            return Err(Error::invalid_argument(
                "Either result or error should be set",
            ));
        }
        Ok(Self {
            id,
            outcome: Outcome::Result(result),
            timestamp: None,
        })
    }

    /// Creates an error response.
    #[inline]
    #[must_use]
    pub fn failure(id: RequestId, error: RpcError) -> Self {
        Self {
            id,
            outcome: Outcome::Error(error),
            timestamp: None,
        }
    }

    /// Parses a raw object.
    ///
    /// Returns `None` unless `id` is a non-empty string and exactly one of
    /// `result`/`error` is non-null.
    #[must_use]
    pub fn parse(raw: &Value) -> Option<Self> {
        let id = raw_id(raw)?;
        let outcome = match (present(raw, "result"), present(raw, "error")) {
            (Some(result), None) => Outcome::Result(result.clone()),
            (None, Some(error)) => Outcome::Error(RpcError::from_value(error)),
            _ => return None,
        };
        Some(Self {
            id,
            outcome,
            timestamp: raw_timestamp(raw),
        })
    }

    /// Returns the correlated request ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// Returns the outcome.
    #[inline]
    #[must_use]
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Returns the result, if successful.
    #[inline]
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        match self.outcome {
            Outcome::Result(ref v) => Some(v),
            Outcome::Error(_) => None,
        }
    }

    /// Returns the error, if failed.
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&RpcError> {
        match self.outcome {
            Outcome::Error(ref e) => Some(e),
            Outcome::Result(_) => None,
        }
    }

    /// Returns `true` if this is a success response.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Result(_))
    }

    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        !self.is_success()
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

    /// Extracts the result value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Remote`] if the response carries an error.
    pub fn into_result(self) -> Result<Value> {
        match self.outcome {
            Outcome::Result(v) => Ok(v),
            Outcome::Error(e) => Err(Error::remote(e)),
        }
    }

    /// Returns the wire representation.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut json = envelope(self.timestamp);
        json.insert("id".to_string(), Value::from(self.id.as_str()));
        match self.outcome {
            Outcome::Result(ref v) => {
                json.insert("result".to_string(), v.clone());
            }
            Outcome::Error(ref e) => {
                json.insert("error".to_string(), e.to_value());
            }
        }
        Value::Object(json)
    }
}

// ============================================================================
// Tests
// ============================================================================
