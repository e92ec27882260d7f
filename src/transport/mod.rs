//! Cross-window transport layer.
//!
//! This module moves JSON-RPC objects between the page (Rust) and the
//! account chooser (remote) through `postMessage`, over either a hidden
//! iframe or a popup window.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Page (Rust)    │         postMessage          │  Account        │
//! │                 │◄────────────────────────────►│  Chooser        │
//! │  Client         │   hidden iframe  OR  popup   │  (remote)       │
//! │  → Session      │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Session Lifecycle
//!
//! Iframe mode:
//!
//! 1. `Session::new` - Insert the hidden relay iframe
//! 2. Queue requests until the iframe load event
//! 3. Post `clientReadyNotification`, flush the queue
//! 4. On `requestAckNotification`, redirect the top-level page
//!
//! Popup mode:
//!
//! 1. A non-query request opens (or reuses) the popup and is queued
//! 2. On `serverReadyNotification`, flush the queue to the popup
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | Async client and event loop |
//! | `host` | Browser capabilities behind a trait |
//! | `session` | Transport state machine |

// ============================================================================
// Submodules
// ============================================================================

/// Async client and event loop.
pub mod client;

/// Browser capabilities.
pub mod host;

/// Transport state machine.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::{Client, HostEventSender};
pub use host::{
    Host, HostEvent, IFRAME_ID, IFRAME_SANDBOX, IFRAME_STYLE, IframeSpec, MessageTarget,
    popup_features,
};
pub use session::{
    IframeState, PopupState, QUERY_IN_POPUP_MESSAGE, RpcHandler, Session, SessionState,
};
