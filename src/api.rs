//! High-level account chooser API.
//!
//! [`AccountChooser`] wraps a [`Client`] with page-wide defaults: a client
//! config merged into every request, service callbacks registered up front
//! and one-shot query callbacks.
//!
//! # Example
//!
//! ```ignore
//! let chooser = AccountChooserBuilder::new()
//!     .popup_mode(true)
//!     .callback("select", |result, error| {
//!         if let Some(error) = error {
//!             eprintln!("select failed: {error}");
//!         } else if let Some(account) = result {
//!             println!("selected {account}");
//!         }
//!     })
//!     .build(host)?;
//!
//! chooser.select(None, None)?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::config::{ClientBuilder, ServerSpec};
use crate::error::Result;
use crate::event::{EventDispatcher, EventType, ResponseCallback};
use crate::identifiers::{PopupHandle, RequestId};
use crate::protocol::{
    Account, ClientConfig, ClientRequest, Query, RequestKind, RpcError, RpcObject,
};
use crate::transport::{Client, Host};

// ============================================================================
// Constants
// ============================================================================

/// Callback name bound to the empty response event.
pub const EMPTY_RESPONSE_CALLBACK: &str = "empty";

// ============================================================================
// Types
// ============================================================================

/// Service callback: `(result, error)`.
///
/// Exactly one of the two is set for a response. Both are `None` for the
/// empty response event.
pub type ServiceCallback = Arc<dyn Fn(Option<&Value>, Option<&RpcError>) + Send + Sync>;

/// Adapts a service callback to the raw listener signature.
fn wrap_callback(callback: ServiceCallback) -> ResponseCallback {
    Arc::new(move |object: &RpcObject| match object.as_response() {
        Some(response) => callback(response.result(), response.error()),
        None => callback(None, None),
    })
}

// ============================================================================
// AccountChooserBuilder
// ============================================================================

/// Builder for [`AccountChooser`].
#[derive(Default)]
pub struct AccountChooserBuilder {
    client: ClientBuilder,
    client_config: ClientConfig,
    callbacks: Vec<(String, ServiceCallback)>,
}

impl std::fmt::Debug for AccountChooserBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountChooserBuilder")
            .field("client", &self.client)
            .field("client_config", &self.client_config)
            .field(
                "callbacks",
                &self.callbacks.iter().map(|(s, _)| s.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl AccountChooserBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the remote endpoints.
    #[must_use]
    pub fn server_spec(mut self, spec: ServerSpec) -> Self {
        self.client = self.client.server_spec(spec);
        self
    }

    /// Starts in popup mode.
    #[must_use]
    pub fn popup_mode(mut self, popup_mode: bool) -> Self {
        self.client = self.client.popup_mode(popup_mode);
        self
    }

    /// Adopts a popup the page already opened.
    #[must_use]
    pub fn popup_window(mut self, popup: PopupHandle) -> Self {
        self.client = self.client.popup_window(popup);
        self
    }

    /// Sets the popup size. Zero keeps the default for that dimension.
    #[must_use]
    pub fn popup_size(mut self, width: u32, height: u32) -> Self {
        self.client = self.client.popup_size(width, height);
        self
    }

    /// Sets the page-wide client config.
    ///
    /// Unset fields fall back to the defaults: the current page URL as
    /// callback URL, `keepPopup` and `showAll` off.
    #[inline]
    #[must_use]
    pub fn client_config(mut self, client_config: ClientConfig) -> Self {
        self.client_config = client_config;
        self
    }

    /// Registers a callback for `service` responses.
    ///
    /// Use [`EMPTY_RESPONSE_CALLBACK`] to hear about empty responses.
    #[must_use]
    pub fn callback<F>(mut self, service: impl Into<String>, callback: F) -> Self
    where
        F: Fn(Option<&Value>, Option<&RpcError>) + Send + Sync + 'static,
    {
        self.callbacks.push((service.into(), Arc::new(callback)));
        self
    }

    /// Builds the API and spawns the transport.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) if the server spec is incomplete
    /// - [`Error::InvalidArgument`](crate::Error::InvalidArgument) if a
    ///   callback is bound to an empty service name
    pub fn build<H: Host>(self, host: H) -> Result<AccountChooser<H>> {
        let dispatcher = EventDispatcher::new();
        for (service, callback) in self.callbacks {
            let callback = wrap_callback(callback);
            if service == EMPTY_RESPONSE_CALLBACK {
                dispatcher.add_response_listener(callback, EventType::EmptyResponse, false, None);
            } else {
                let id = RequestId::new(service)?;
                dispatcher.add_response_listener(callback, EventType::Done, false, Some(id));
            }
        }

        let defaults = ClientConfig {
            client_callback_url: Some(host.current_url()),
            keep_popup: Some(false),
            show_all: Some(false),
            ..Default::default()
        };
        let client_config = defaults.merge(&self.client_config);

        let client = self.client.dispatcher(dispatcher.clone()).build(host)?;
        debug!(listeners = dispatcher.listener_count(), "Account chooser ready");

        Ok(AccountChooser {
            client,
            dispatcher,
            client_config,
        })
    }
}

// ============================================================================
// AccountChooser
// ============================================================================

/// Page-level entry point to the account chooser.
pub struct AccountChooser<H: Host> {
    client: Client<H>,
    dispatcher: EventDispatcher,
    client_config: ClientConfig,
}

impl<H: Host> AccountChooser<H> {
    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the transport client.
    #[inline]
    #[must_use]
    pub fn client(&self) -> &Client<H> {
        &self.client
    }

    /// Returns the listener registry.
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Returns the page-wide client config.
    #[inline]
    #[must_use]
    pub fn client_config(&self) -> &ClientConfig {
        &self.client_config
    }

    fn merged(&self, overrides: Option<&ClientConfig>) -> ClientConfig {
        match overrides {
            Some(overrides) => self.client_config.merge(overrides),
            None => self.client_config.clone(),
        }
    }

    // ========================================================================
    // Services
    // ========================================================================

    /// Asks the chooser to store `accounts`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`](crate::Error::InvalidArgument) if `accounts` is empty
    /// - [`Error::Validation`](crate::Error::Validation) if the request fails its schema
    pub fn store(&self, accounts: Vec<Account>, overrides: Option<&ClientConfig>) -> Result<()> {
        let request =
            ClientRequest::store(RequestKind::Store.method(), accounts, self.merged(overrides))?;
        self.client.call_server(request)
    }

    /// Lets the user select an account, offering `local_accounts` too.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](crate::Error::Validation) if the
    /// request fails its schema.
    pub fn select(
        &self,
        local_accounts: Option<Vec<Account>>,
        overrides: Option<&ClientConfig>,
    ) -> Result<()> {
        let request = ClientRequest::select(
            RequestKind::Select.method(),
            local_accounts,
            self.merged(overrides),
        )?;
        self.client.call_server(request)
    }

    /// Asks the chooser to update `account`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](crate::Error::Validation) if the
    /// request fails its schema.
    pub fn update(&self, account: Account, overrides: Option<&ClientConfig>) -> Result<()> {
        let request =
            ClientRequest::update(RequestKind::Update.method(), account, self.merged(overrides))?;
        self.client.call_server(request)
    }

    /// Opens the account management page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`](crate::Error::ChannelClosed) if the
    /// client has shut down.
    pub fn manage(&self, overrides: Option<&ClientConfig>) -> Result<()> {
        let request =
            ClientRequest::manage(RequestKind::Manage.method(), Some(self.merged(overrides)))?;
        self.client.call_server(request)
    }

    /// Opens the about page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`](crate::Error::ChannelClosed) if the
    /// client has shut down.
    pub fn about(&self, overrides: Option<&ClientConfig>) -> Result<()> {
        let request =
            ClientRequest::about(RequestKind::About.method(), Some(self.merged(overrides)))?;
        self.client.call_server(request)
    }

    /// Bootstraps accounts on behalf of `origin`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`](crate::Error::InvalidArgument) if `origin` is empty
    /// - [`Error::Validation`](crate::Error::Validation) if the request fails its schema
    pub fn bootstrap(
        &self,
        origin: impl Into<String>,
        accounts: Option<Vec<Account>>,
        overrides: Option<&ClientConfig>,
    ) -> Result<()> {
        let request = ClientRequest::bootstrap(
            RequestKind::Bootstrap.method(),
            origin,
            accounts,
            self.merged(overrides),
        )?;
        self.client.call_server(request)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Checks whether the chooser is disabled.
    ///
    /// # Errors
    ///
    /// See [`AccountChooser::query`].
    pub fn check_disabled<F>(&self, callback: F) -> Result<RequestId>
    where
        F: Fn(Option<&Value>, Option<&RpcError>) + Send + Sync + 'static,
    {
        self.query(Query::AcDisabled, None, callback)
    }

    /// Checks whether the chooser holds no accounts.
    ///
    /// # Errors
    ///
    /// See [`AccountChooser::query`].
    pub fn check_empty<F>(&self, callback: F) -> Result<RequestId>
    where
        F: Fn(Option<&Value>, Option<&RpcError>) + Send + Sync + 'static,
    {
        self.query(Query::AcEmpty, None, callback)
    }

    /// Checks whether the chooser stores `account`.
    ///
    /// # Errors
    ///
    /// See [`AccountChooser::query`].
    pub fn check_account_exist<F>(&self, account: Account, callback: F) -> Result<RequestId>
    where
        F: Fn(Option<&Value>, Option<&RpcError>) + Send + Sync + 'static,
    {
        self.query(Query::AccountExist, Some(account), callback)
    }

    /// Checks whether `account` is stored and outdated. Only a hint.
    ///
    /// # Errors
    ///
    /// See [`AccountChooser::query`].
    pub fn check_should_update<F>(&self, account: Account, callback: F) -> Result<RequestId>
    where
        F: Fn(Option<&Value>, Option<&RpcError>) + Send + Sync + 'static,
    {
        self.query(Query::ShouldUpdate, Some(account), callback)
    }

    /// Sends `query` under a fresh ID and calls `callback` once with the
    /// answer. Returns the request ID.
    ///
    /// In popup mode the callback receives a method-not-found error.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`](crate::Error::Validation) if the request fails its schema
    /// - [`Error::ChannelClosed`](crate::Error::ChannelClosed) if the client has shut down
    ///
    /// The callback is unregistered on error.
    pub fn query<F>(&self, query: Query, account: Option<Account>, callback: F) -> Result<RequestId>
    where
        F: Fn(Option<&Value>, Option<&RpcError>) + Send + Sync + 'static,
    {
        let id = RequestId::generate(&format!("query_{query}"));
        let listener = self.dispatcher.add_response_listener(
            wrap_callback(Arc::new(callback)),
            EventType::Done,
            true,
            Some(id.clone()),
        );

        let sent = ClientRequest::query(id.as_str(), query, account)
            .and_then(|request| self.client.call_server(request));
        if let Err(e) = sent {
            self.dispatcher.remove_response_listener(listener);
            return Err(e);
        }
        Ok(id)
    }

    // ========================================================================
    // Popup Management
    // ========================================================================

    /// Switches between popup and redirect mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`](crate::Error::ChannelClosed) if the
    /// client has shut down.
    pub fn change_popup_mode_to(&self, popup_mode: bool) -> Result<()> {
        self.client.set_popup_mode(popup_mode)
    }

    /// Adopts a popup the page opened.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`](crate::Error::ChannelClosed) if the
    /// client has shut down.
    pub fn set_popup_window(&self, popup: PopupHandle) -> Result<()> {
        self.client.set_popup_window(popup)
    }

    /// Returns the managed popup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`](crate::Error::ChannelClosed) if the
    /// client has shut down.
    pub async fn popup_window(&self) -> Result<Option<PopupHandle>> {
        self.client.popup_window().await
    }

    /// Closes the popup if it is still open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`](crate::Error::ChannelClosed) if the
    /// client has shut down.
    pub fn close_popup_window(&self) -> Result<()> {
        self.client.close_popup_window()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    use crate::error::Error;
    use crate::transport::host::mock::MockHost;
    use crate::transport::{HostEventSender, PopupState, SessionState};

    const DOMAIN: &str = "https://ac.test";

    type Calls = Arc<Mutex<Vec<(Option<Value>, Option<i64>)>>>;

    fn recorder() -> (Calls, impl Fn(Option<&Value>, Option<&RpcError>) + Send + Sync + 'static) {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let callback = move |result: Option<&Value>, error: Option<&RpcError>| {
            sink.lock().push((result.cloned(), error.map(|e| e.code)));
        };
        (calls, callback)
    }

    async fn ready_iframe(
        host: &MockHost,
        builder: AccountChooserBuilder,
    ) -> (AccountChooser<MockHost>, HostEventSender) {
        let chooser = builder
            .server_spec(ServerSpec::for_domain(DOMAIN))
            .build(host.clone())
            .expect("chooser");
        let events = chooser.client().host_events();
        events
            .frame_loaded(host.last_iframe().expect("iframe"))
            .expect("send");
        chooser.client().pending_count().await.expect("sync");
        (chooser, events)
    }

    fn respond(events: &HostEventSender, id: &str, result: Value) {
        let response = json!({"jsonrpc": "2.0", "id": id, "result": result});
        events.message(DOMAIN, response.to_string()).expect("send");
    }

    #[tokio::test]
    async fn test_default_client_config() {
        let host = MockHost::new();
        let (chooser, _) = ready_iframe(&host, AccountChooserBuilder::new()).await;

        let config = chooser.client_config();
        assert_eq!(config.client_callback_url.as_deref(), Some("https://site.com/login"));
        assert_eq!(config.keep_popup, Some(false));
        assert_eq!(config.show_all, Some(false));
    }

    #[tokio::test]
    async fn test_store_merges_overrides() {
        let host = MockHost::new();
        let (chooser, _) = ready_iframe(&host, AccountChooserBuilder::new()).await;

        let overrides = ClientConfig {
            keep_popup: Some(true),
            ..Default::default()
        };
        chooser
            .store(vec![Account::new("a@b.com")], Some(&overrides))
            .expect("store");
        chooser.client().pending_count().await.expect("sync");

        let posted = host.state.lock().posted_json();
        let store = posted.last().expect("posted");
        assert_eq!(store["method"], "store");
        assert_eq!(store["id"], "store");
        assert_eq!(store["params"]["clientConfig"]["keepPopup"], true);
        assert_eq!(
            store["params"]["clientConfig"]["clientCallbackUrl"],
            "https://site.com/login"
        );
    }

    #[tokio::test]
    async fn test_store_rejects_foreign_callback_url() {
        let host = MockHost::new();
        let (chooser, _) = ready_iframe(&host, AccountChooserBuilder::new()).await;

        let overrides = ClientConfig {
            client_callback_url: Some("https://evil.com/cb".into()),
            ..Default::default()
        };
        let err = chooser
            .store(vec![Account::new("a@b.com")], Some(&overrides))
            .unwrap_err();
        assert!(err.is_validation_error());
        assert!(err.to_string().contains("Invalid domain"));
    }

    #[tokio::test]
    async fn test_service_callback_receives_result() {
        let host = MockHost::new();
        let (calls, callback) = recorder();
        let (chooser, events) =
            ready_iframe(&host, AccountChooserBuilder::new().callback("select", callback)).await;

        respond(&events, "store", json!("ignored"));
        respond(&events, "select", json!({"email": "a@b.com"}));
        let failure = json!({
            "jsonrpc": "2.0",
            "id": "select",
            "error": {"code": -32000, "message": "canceled"}
        });
        events.message(DOMAIN, failure.to_string()).expect("send");
        chooser.client().pending_count().await.expect("sync");

        let calls = calls.lock();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], (Some(json!({"email": "a@b.com"})), None));
        assert_eq!(calls[1], (None, Some(-32000)));
    }

    #[tokio::test]
    async fn test_empty_callback() {
        let host = MockHost::new();
        let (calls, callback) = recorder();
        let (chooser, events) = ready_iframe(
            &host,
            AccountChooserBuilder::new().callback(EMPTY_RESPONSE_CALLBACK, callback),
        )
        .await;

        let empty = json!({"jsonrpc": "2.0", "method": "emptyResponseNotification"});
        events.message(DOMAIN, empty.to_string()).expect("send");
        chooser.client().pending_count().await.expect("sync");

        assert_eq!(*calls.lock(), vec![(None, None)]);
    }

    #[tokio::test]
    async fn test_query_callback_fires_once() {
        let host = MockHost::new();
        let (calls, callback) = recorder();
        let (chooser, events) = ready_iframe(&host, AccountChooserBuilder::new()).await;

        let id = chooser.check_empty(callback).expect("query");
        assert!(id.as_str().starts_with("query_acEmpty_"));
        chooser.client().pending_count().await.expect("sync");

        let posted = host.state.lock().posted_json();
        let query = posted.last().expect("posted");
        assert_eq!(query["method"], "query");
        assert_eq!(query["params"]["query"], "acEmpty");

        respond(&events, id.as_str(), json!(true));
        respond(&events, id.as_str(), json!(false));
        chooser.client().pending_count().await.expect("sync");

        assert_eq!(*calls.lock(), vec![(Some(json!(true)), None)]);
        assert_eq!(chooser.dispatcher().listener_count(), 0);
    }

    #[tokio::test]
    async fn test_query_ids_are_unique() {
        let host = MockHost::new();
        let (chooser, _) = ready_iframe(&host, AccountChooserBuilder::new()).await;

        let first = chooser
            .check_account_exist(Account::new("a@b.com"), |_, _| {})
            .expect("query");
        let second = chooser
            .check_should_update(Account::new("a@b.com"), |_, _| {})
            .expect("query");
        assert_ne!(first, second);
        assert!(second.as_str().starts_with("query_shouldUpdate_"));
    }

    #[tokio::test]
    async fn test_query_in_popup_mode_reports_error() {
        let host = MockHost::new();
        let (calls, callback) = recorder();
        let chooser = AccountChooserBuilder::new()
            .server_spec(ServerSpec::for_domain(DOMAIN))
            .popup_mode(true)
            .build(host.clone())
            .expect("chooser");

        chooser.check_disabled(callback).expect("query");
        chooser.client().pending_count().await.expect("sync");

        assert_eq!(*calls.lock(), vec![(None, Some(RpcError::METHOD_NOT_FOUND))]);
        assert!(host.state.lock().opened_popups.is_empty());
    }

    #[tokio::test]
    async fn test_query_failure_removes_listener() {
        let host = MockHost::new();
        let (chooser, _) = ready_iframe(&host, AccountChooserBuilder::new()).await;
        chooser.client().shutdown();
        let _ = chooser.client().state().await;

        let err = chooser.check_empty(|_, _| {}).unwrap_err();
        assert!(matches!(err, Error::ChannelClosed));
        assert_eq!(chooser.dispatcher().listener_count(), 0);
    }

    #[tokio::test]
    async fn test_popup_helpers() {
        let host = MockHost::new();
        let (chooser, _) = ready_iframe(&host, AccountChooserBuilder::new()).await;

        chooser.change_popup_mode_to(true).expect("mode");
        chooser.set_popup_window(PopupHandle::new(77)).expect("adopt");
        assert_eq!(
            chooser.popup_window().await.expect("popup"),
            Some(PopupHandle::new(77))
        );
        assert_eq!(
            chooser.client().state().await.expect("state"),
            SessionState::Popup(PopupState::Opening)
        );

        chooser.close_popup_window().expect("close");
        assert_eq!(chooser.popup_window().await.expect("popup"), None);
        assert_eq!(host.state.lock().closed, vec![PopupHandle::new(77)]);
    }
}
