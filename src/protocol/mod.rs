//! Cross-window JSON-RPC message types.
//!
//! This module defines the message format exchanged between the page
//! (local end) and the account chooser (remote end) over `postMessage`.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`ClientRequest`] | Page → Remote | Service call |
//! | [`Response`] | Remote → Page | Result or error for a request |
//! | [`Notification`] | Both | Handshakes and acknowledgements |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Envelope, [`RpcObject`] and [`Response`] |
//! | `notification` | Notification kinds |
//! | `request` | Request kinds and [`Query`] |
//! | `payload` | Typed `params` helpers |
//! | `kind` | Inbound classification |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound classification.
pub mod kind;

/// Envelope, RPC object and response types.
pub mod message;

/// Notification message types.
pub mod notification;

/// Typed request payloads.
pub mod payload;

/// Client request types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use kind::{CLIENT_INBOUND_KINDS, RpcKind, parse_rpc_object};
pub use message::{JSONRPC_VERSION, Outcome, Response, RpcError, RpcObject};
pub use notification::{Notification, NotificationKind};
pub use payload::{Account, ClientConfig, UiOptions};
pub use request::{ClientRequest, Query, RequestKind};
