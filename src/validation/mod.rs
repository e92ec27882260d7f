//! Outbound request validation.
//!
//! Every request is checked against its method schema before it leaves the
//! page. Validators sanitize as they go: HTML is stripped from account
//! text, over-long text is truncated, language codes are normalized and
//! unrecognized fields are dropped.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `validator` | [`Validator`] forms and [`ValidationError`] |
//! | `schema` | Predefined validators and per-method schemas |
//! | `language` | Language code normalization |
//! | `url` | http(s) URL helpers |

// ============================================================================
// Submodules
// ============================================================================

/// Language code normalization.
pub mod language;

/// Predefined validators and per-method schemas.
pub mod schema;

/// URL helpers.
pub mod url;

/// Composable value validators.
pub mod validator;

// ============================================================================
// Re-exports
// ============================================================================

pub use language::{find_language_code, is_right_to_left};
pub use schema::{request_validator, validate_request};
pub use validator::{ExceptionHandler, ObjectSchema, Rule, ValidationError, Validator, strip_html};
