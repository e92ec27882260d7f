//! Predefined validators and per-method request schemas.
//!
//! | Method | Required | Optional |
//! |--------|----------|----------|
//! | `store` | `accounts`, `clientConfig` | |
//! | `select` | `clientConfig` | `localAccounts` |
//! | `update` | `account`, `clientConfig` | |
//! | `bootstrap` | `origin`, `clientConfig` | `accounts` |
//! | `query` | `query` | `account` |
//! | other | | (all fields dropped) |
//!
//! Every URL inside `clientConfig` is pinned to the page origin.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Result;
use crate::protocol::{ClientRequest, Query, RequestKind};

use super::validator::{ValidationError, Validator};

// ============================================================================
// Constants
// ============================================================================

/// Maximum length of account text fields.
pub const ACCOUNT_TEXT_MAX_LEN: usize = 128;

/// Maximum URL length.
pub const URL_MAX_LEN: usize = 2048;

/// Maximum length of the custom UI title.
pub const UI_TITLE_MAX_LEN: usize = 64;

// ============================================================================
// Predefined Validators
// ============================================================================

/// Account text field: HTML stripped, truncated to 128 characters.
#[must_use]
pub fn account_text() -> Validator {
    Validator::sanitized_text(ACCOUNT_TEXT_MAX_LEN, true)
}

/// Account photo URL: HTTPS only, dropped instead of failing.
#[must_use]
pub fn account_photo_url() -> Validator {
    Validator::url(URL_MAX_LEN, None, true).with_handler(|_, _| Value::Null)
}

/// A single account record.
///
/// # Errors
///
/// Never fails in practice; the field names are fixed.
pub fn account() -> Result<Validator> {
    Validator::strict_object()
        .required("email", account_text())
        .optional("displayName", account_text())
        .optional("photoUrl", account_photo_url())
        .optional("providerId", account_text())
        .build()
}

/// A list of accounts.
///
/// # Errors
///
/// Never fails in practice; the field names are fixed.
pub fn account_list() -> Result<Validator> {
    Ok(Validator::array(account()?))
}

/// A list of identity provider IDs.
#[must_use]
pub fn provider_list() -> Validator {
    Validator::array(account_text())
}

fn pinned_url(origin: &str) -> Validator {
    Validator::url(URL_MAX_LEN, Some(origin), false)
}

/// `clientConfig` of update and bootstrap.
fn callback_config(origin: &str) -> Result<Validator> {
    Validator::lenient_object()
        .optional("clientCallbackUrl", pinned_url(origin))
        .optional("positiveCallbackUrl", pinned_url(origin))
        .optional("negativeCallbackUrl", pinned_url(origin))
        .optional("keepPopup", Validator::boolean())
        .optional("language", Validator::language())
        .build()
}

// ============================================================================
// Request Schemas
// ============================================================================

/// Builds the params validator for a request kind.
///
/// `origin` is the page host; URLs in `clientConfig` must point at it.
/// `None` selects the lenient empty schema used for manage, about and
/// unknown methods.
///
/// # Errors
///
/// Never fails in practice; the field names are fixed.
pub fn request_validator(kind: Option<RequestKind>, origin: &str) -> Result<Validator> {
    match kind {
        Some(RequestKind::Store) => {
            let client_config = Validator::lenient_object()
                .optional("clientCallbackUrl", pinned_url(origin))
                .optional("positiveCallbackUrl", pinned_url(origin))
                .optional("negativeCallbackUrl", pinned_url(origin))
                .optional("silent", Validator::boolean())
                .optional("keepPopup", Validator::boolean())
                .optional("language", Validator::language())
                .build()?;
            Validator::lenient_object()
                .required("accounts", account_list()?)
                .required("clientConfig", client_config)
                .build()
        }
        Some(RequestKind::Select) => {
            let ui = Validator::lenient_object()
                .optional("title", Validator::text(UI_TITLE_MAX_LEN, true))
                .optional("favicon", pinned_url(origin))
                .optional("branding", pinned_url(origin))
                .build()?;
            let client_config = Validator::lenient_object()
                .optional("clientCallbackUrl", pinned_url(origin))
                .optional("providers", provider_list())
                .optional("showAll", Validator::boolean())
                .optional("ui", ui)
                .optional("keepPopup", Validator::boolean())
                .optional("language", Validator::language())
                .build()?;
            Validator::lenient_object()
                .optional("localAccounts", account_list()?)
                .required("clientConfig", client_config)
                .build()
        }
        Some(RequestKind::Update) => Validator::lenient_object()
            .required("account", account()?)
            .required("clientConfig", callback_config(origin)?)
            .build(),
        Some(RequestKind::Bootstrap) => Validator::lenient_object()
            .required("origin", pinned_url(origin))
            .optional("accounts", account_list()?)
            .required("clientConfig", callback_config(origin)?)
            .build(),
        Some(RequestKind::Query) => Validator::lenient_object()
            .required(
                "query",
                Validator::enumeration(Query::ALL.iter().map(|q| q.as_str())),
            )
            .optional("account", account()?)
            .build(),
        Some(RequestKind::Manage | RequestKind::About) | None => {
            Validator::lenient_object().build()
        }
    }
}

/// Validates a request against its method schema.
///
/// Returns the request with its params replaced by the sanitized copy.
/// Missing params validate as an empty object.
///
/// # Errors
///
/// Returns [`Error::Validation`](crate::Error::Validation) if the params are
/// invalid.
pub fn validate_request(request: ClientRequest, origin: &str) -> Result<ClientRequest> {
    let validator = request_validator(request.kind(), origin)?;
    let params = request
        .params()
        .cloned()
        .map_or_else(|| Value::Object(Map::new()), Value::Object);

    let sanitized = validator.validate(params).inspect_err(|e| {
        debug!(method = %request.method(), id = %request.id(), error = %e, "Request rejected");
    })?;

    match sanitized {
        Value::Object(map) => Ok(request.with_params(Some(map))),
        _ => Err(ValidationError::new("params must be an object").into()),
    }
}

// ============================================================================
// Tests
// ============================================================================
