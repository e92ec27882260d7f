//! Client configuration.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Fluent construction of a [`Client`](crate::transport::Client) |
//! | `options` | Init options and server endpoints |

// ============================================================================
// Submodules
// ============================================================================

/// Client builder.
pub mod builder;

/// Init options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use options::{
    ClientOptions, DEFAULT_DOMAIN, DEFAULT_IFRAME_PATH, DEFAULT_POPUP_HEIGHT, DEFAULT_POPUP_NAME,
    DEFAULT_POPUP_PATH, DEFAULT_POPUP_WIDTH, DEFAULT_REDIRECT_PATH, Endpoints, ServerSpec,
};
