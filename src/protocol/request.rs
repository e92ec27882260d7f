//! Client request types.
//!
//! A [`ClientRequest`] expects exactly one correlated
//! [`Response`](super::Response).
//!
//! # Format
//!
//! ```json
//! {
//!   "jsonrpc": "2.0",
//!   "id": "store",
//!   "method": "store",
//!   "params": { "accounts": [ ... ], "clientConfig": { ... } }
//! }
//! ```
//!
//! # Method Catalogue
//!
//! | Kind | Params |
//! |------|--------|
//! | `store` | `accounts` (non-empty), `clientConfig` |
//! | `select` | `localAccounts?`, `clientConfig` |
//! | `update` | `account`, `clientConfig` |
//! | `manage` | `clientConfig?` |
//! | `about` | `clientConfig?` |
//! | `bootstrap` | `origin`, `accounts?`, `clientConfig` |
//! | `query` | `query`, `account?` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::message::{envelope, present, raw_id, raw_timestamp, truthy};
use super::payload::{Account, ClientConfig};

// ============================================================================
// Query
// ============================================================================

/// Passive questions answered through the iframe channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Query {
    /// Is the chooser disabled for this user?
    #[serde(rename = "acDisabled")]
    AcDisabled,
    /// Is the chooser empty?
    #[serde(rename = "acEmpty")]
    AcEmpty,
    /// Does the chooser hold this account?
    #[serde(rename = "accountExist")]
    AccountExist,
    /// Should this account be updated?
    #[serde(rename = "shouldUpdate")]
    ShouldUpdate,
}

impl Query {
    /// All queries.
    pub const ALL: [Self; 4] = [
        Self::AcDisabled,
        Self::AcEmpty,
        Self::AccountExist,
        Self::ShouldUpdate,
    ];

    /// Returns the wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AcDisabled => "acDisabled",
            Self::AcEmpty => "acEmpty",
            Self::AccountExist => "accountExist",
            Self::ShouldUpdate => "shouldUpdate",
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Query {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == s)
            .ok_or_else(|| Error::invalid_argument(format!("{s} is not a valid query")))
    }
}

// ============================================================================
// RequestKind
// ============================================================================

/// Known request kinds, each owning a method name and a param schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Store accounts in the chooser.
    Store,
    /// Let the user select an account.
    Select,
    /// Update a stored account.
    Update,
    /// Show the manage page.
    Manage,
    /// Show the about page.
    About,
    /// Make this site the default bootstrapping domain.
    Bootstrap,
    /// Ask a passive question.
    Query,
}

impl RequestKind {
    /// All request kinds.
    pub const ALL: [Self; 7] = [
        Self::Store,
        Self::Select,
        Self::Update,
        Self::Manage,
        Self::About,
        Self::Bootstrap,
        Self::Query,
    ];

    /// Returns the wire method name.
    #[inline]
    #[must_use]
    pub const fn method(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Select => "select",
            Self::Update => "update",
            Self::Manage => "manage",
            Self::About => "about",
            Self::Bootstrap => "bootstrap",
            Self::Query => "query",
        }
    }

    /// Looks a kind up by method name.
    #[must_use]
    pub fn from_method(method: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.method() == method)
    }

    /// Parses a raw object as this kind.
    ///
    /// Returns `None` if the method name, `id` or required params do not
    /// match. Only the params this kind defines are kept.
    #[must_use]
    pub fn parse(self, raw: &Value) -> Option<ClientRequest> {
        if raw.get("method").and_then(Value::as_str) != Some(self.method()) {
            return None;
        }
        let id = raw_id(raw)?;
        let params = raw.get("params").filter(|p| p.is_object());
        let param = |name: &str| params.and_then(|p| present(p, name));

        let required: &[&str] = match self {
            Self::Store => {
                let accounts = param("accounts").and_then(Value::as_array)?;
                if accounts.is_empty() {
                    return None;
                }
                &[]
            }
            Self::Update => &["account"],
            Self::Bootstrap => &["origin"],
            Self::Query => &["query"],
            Self::Select | Self::Manage | Self::About => &[],
        };
        if !required
            .iter()
            .all(|name| param(name).is_some_and(truthy))
        {
            return None;
        }

        let mut kept = Map::new();
        for name in self.param_names() {
            if let Some(value) = param(name) {
                kept.insert((*name).to_string(), value.clone());
            }
        }

        Some(ClientRequest {
            id,
            method: self.method().to_string(),
            params: Some(kept),
            timestamp: raw_timestamp(raw),
        })
    }

    /// Param names defined for this kind.
    #[must_use]
    pub const fn param_names(self) -> &'static [&'static str] {
        match self {
            Self::Store => &["accounts", "clientConfig"],
            Self::Select => &["localAccounts", "clientConfig"],
            Self::Update => &["account", "clientConfig"],
            Self::Manage | Self::About => &["clientConfig"],
            Self::Bootstrap => &["origin", "accounts", "clientConfig"],
            Self::Query => &["query", "account"],
        }
    }
}

// ============================================================================
// ClientRequest
// ============================================================================

/// A request from the page to the remote end.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientRequest {
    id: RequestId,
    method: String,
    params: Option<Map<String, Value>>,
    timestamp: Option<u64>,
}

impl ClientRequest {
    /// Creates a request with an arbitrary method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `id` or `method` is empty.
    pub fn new(
        id: impl Into<String>,
        method: impl Into<String>,
        params: Option<Map<String, Value>>,
    ) -> Result<Self> {
        let id = RequestId::new(id)?;
        let method = method.into();
        if method.is_empty() {
            return Err(Error::invalid_argument("method must not be empty"));
        }
        Ok(Self {
            id,
            method,
            params,
            timestamp: None,
        })
    }

    /// Creates a `store` request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `id` or `accounts` is empty.
    pub fn store(
        id: impl Into<String>,
        accounts: Vec<Account>,
        client_config: ClientConfig,
    ) -> Result<Self> {
        if accounts.is_empty() {
            return Err(Error::invalid_argument("accounts must not be empty"));
        }
        let mut params = Map::new();
        params.insert("accounts".to_string(), serde_json::to_value(accounts)?);
        params.insert("clientConfig".to_string(), serde_json::to_value(client_config)?);
        Self::new(id, RequestKind::Store.method(), Some(params))
    }

    /// Creates a `select` request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `id` is empty.
    pub fn select(
        id: impl Into<String>,
        local_accounts: Option<Vec<Account>>,
        client_config: ClientConfig,
    ) -> Result<Self> {
        let mut params = Map::new();
        if let Some(local_accounts) = local_accounts {
            params.insert(
                "localAccounts".to_string(),
                serde_json::to_value(local_accounts)?,
            );
        }
        params.insert("clientConfig".to_string(), serde_json::to_value(client_config)?);
        Self::new(id, RequestKind::Select.method(), Some(params))
    }

    /// Creates an `update` request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `id` is empty.
    pub fn update(
        id: impl Into<String>,
        account: Account,
        client_config: ClientConfig,
    ) -> Result<Self> {
        let mut params = Map::new();
        params.insert("account".to_string(), serde_json::to_value(account)?);
        params.insert("clientConfig".to_string(), serde_json::to_value(client_config)?);
        Self::new(id, RequestKind::Update.method(), Some(params))
    }

    /// Creates a `manage` request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `id` is empty.
    pub fn manage(id: impl Into<String>, client_config: Option<ClientConfig>) -> Result<Self> {
        Self::new(
            id,
            RequestKind::Manage.method(),
            Some(Self::config_params(client_config)?),
        )
    }

    /// Creates an `about` request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `id` is empty.
    pub fn about(id: impl Into<String>, client_config: Option<ClientConfig>) -> Result<Self> {
        Self::new(
            id,
            RequestKind::About.method(),
            Some(Self::config_params(client_config)?),
        )
    }

    /// Creates a `bootstrap` request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `id` or `origin` is empty.
    pub fn bootstrap(
        id: impl Into<String>,
        origin: impl Into<String>,
        accounts: Option<Vec<Account>>,
        client_config: ClientConfig,
    ) -> Result<Self> {
        let origin = origin.into();
        if origin.is_empty() {
            return Err(Error::invalid_argument("origin must not be empty"));
        }
        let mut params = Map::new();
        params.insert("origin".to_string(), Value::from(origin));
        if let Some(accounts) = accounts {
            params.insert("accounts".to_string(), serde_json::to_value(accounts)?);
        }
        params.insert("clientConfig".to_string(), serde_json::to_value(client_config)?);
        Self::new(id, RequestKind::Bootstrap.method(), Some(params))
    }

    /// Creates a `query` request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `id` is empty.
    pub fn query(id: impl Into<String>, query: Query, account: Option<Account>) -> Result<Self> {
        let mut params = Map::new();
        params.insert("query".to_string(), Value::from(query.as_str()));
        if let Some(account) = account {
            params.insert("account".to_string(), serde_json::to_value(account)?);
        }
        Self::new(id, RequestKind::Query.method(), Some(params))
    }

    fn config_params(client_config: Option<ClientConfig>) -> Result<Map<String, Value>> {
        let mut params = Map::new();
        if let Some(client_config) = client_config {
            params.insert("clientConfig".to_string(), serde_json::to_value(client_config)?);
        }
        Ok(params)
    }

    /// Returns the request ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &RequestId {
        &self.id
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
    pub fn kind(&self) -> Option<RequestKind> {
        RequestKind::from_method(&self.method)
    }

    /// Returns `true` for `query` requests.
    #[inline]
    #[must_use]
    pub fn is_query(&self) -> bool {
        self.kind() == Some(RequestKind::Query)
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

    /// Returns `params.clientConfig`, or one key of it.
    #[must_use]
    pub fn client_config(&self, key: Option<&str>) -> Option<&Value> {
        let config = self.param("clientConfig")?;
        match key {
            Some(key) => config.get(key),
            None => Some(config),
        }
    }

    /// Returns `params.query` of a query request.
    #[must_use]
    pub fn query_param(&self) -> Option<Query> {
        self.param("query")
            .and_then(Value::as_str)
            .and_then(|q| q.parse().ok())
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

    /// Returns a copy carrying sanitized params.
    #[inline]
    #[must_use]
    pub(crate) fn with_params(mut self, params: Option<Map<String, Value>>) -> Self {
        self.params = params;
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
        json.insert("id".to_string(), Value::from(self.id.as_str()));
        Value::Object(json)
    }
}

// ============================================================================
// Tests
// ============================================================================
