//! Account chooser relay - cross-window JSON-RPC for an account chooser.
//!
//! This library lets a relying-party page talk to a remote account chooser
//! service through `postMessage`, over a hidden iframe or a popup window.
//!
//! # Architecture
//!
//! The relay follows a client-server model:
//!
//! - **Local End (Rust)**: Builds and validates requests, tracks transport
//!   state, dispatches responses to listeners
//! - **Remote End (account chooser)**: Serves the iframe, popup and redirect
//!   pages and answers requests
//!
//! Key design principles:
//!
//! - The browser sits behind the [`Host`] trait; nothing touches a DOM
//! - Wire format is JSON-RPC 2.0 with an optional `timestamp` extension
//! - Every outbound request is validated and sanitized before it leaves
//! - Event-driven: one ordered event loop per [`Client`], no polling
//!
//! # Quick Start
//!
//! ```ignore
//! use account_chooser_relay::{Account, AccountChooserBuilder, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let chooser = AccountChooserBuilder::new()
//!         .callback("store", |result, error| println!("{result:?} {error:?}"))
//!         .build(MyHost::new())?;
//!
//!     // Forward the page's message and iframe load events
//!     let events = chooser.client().host_events();
//!
//!     chooser.store(vec![Account::new("user@example.com")], None)?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | High-level [`AccountChooser`] |
//! | [`config`] | Init options and [`ClientBuilder`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`event`] | Response event dispatch |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | JSON-RPC message model |
//! | [`transport`] | Iframe and popup transport |
//! | [`validation`] | Request validators and schemas |

// ============================================================================
// Modules
// ============================================================================

/// High-level account chooser API.
pub mod api;

/// Client configuration.
///
/// Use [`ClientBuilder`] to create a configured client.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Response event dispatch.
pub mod event;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing request IDs with window handles.
pub mod identifiers;

/// JSON-RPC protocol message types.
pub mod protocol;

/// Cross-window transport layer.
pub mod transport;

/// Validation framework and request schemas.
pub mod validation;

// ============================================================================
// Re-exports
// ============================================================================

// API types
pub use api::{AccountChooser, AccountChooserBuilder, EMPTY_RESPONSE_CALLBACK, ServiceCallback};

// Config types
pub use config::{ClientBuilder, ClientOptions, Endpoints, ServerSpec};

// Error types
pub use error::{Error, Result};

// Event types
pub use event::{EventDispatcher, EventType, ResponseCallback};

// Identifier types
pub use identifiers::{FrameHandle, ListenerId, PopupHandle, RequestId};

// Protocol types
pub use protocol::{
    Account, ClientConfig, ClientRequest, Notification, NotificationKind, Outcome, Query,
    RequestKind, Response, RpcError, RpcKind, RpcObject, UiOptions,
};

// Transport types
pub use transport::{
    Client, Host, HostEvent, HostEventSender, IframeSpec, MessageTarget, Session, SessionState,
};

// Validation types
pub use validation::{ValidationError, Validator};
