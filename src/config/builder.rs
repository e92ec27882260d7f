//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//! Inbound objects the transport does not consume go either to a custom
//! handler or, by default, to an [`EventDispatcher`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::event::EventDispatcher;
use crate::identifiers::PopupHandle;
use crate::protocol::RpcObject;
use crate::transport::{Client, Host, RpcHandler, Session};

use super::options::{ClientOptions, ServerSpec};

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    /// Init options.
    options: ClientOptions,
    /// Dispatcher receiving inbound objects.
    dispatcher: Option<EventDispatcher>,
    /// Custom handler; wins over the dispatcher.
    handler: Option<RpcHandler>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("options", &self.options)
            .field("dispatcher", &self.dispatcher)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every option at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the remote endpoints.
    #[inline]
    #[must_use]
    pub fn server_spec(mut self, spec: ServerSpec) -> Self {
        self.options.server_spec = spec;
        self
    }

    /// Starts in popup mode.
    #[inline]
    #[must_use]
    pub fn popup_mode(mut self, popup_mode: bool) -> Self {
        self.options.popup_mode = popup_mode;
        self
    }

    /// Adopts a popup the page already opened.
    #[inline]
    #[must_use]
    pub fn popup_window(mut self, popup: PopupHandle) -> Self {
        self.options.popup_window = Some(popup);
        self
    }

    /// Sets the popup size. Zero keeps the default for that dimension.
    #[inline]
    #[must_use]
    pub fn popup_size(mut self, width: u32, height: u32) -> Self {
        self.options = self.options.with_popup_size(width, height);
        self
    }

    /// Routes inbound objects to `dispatcher`.
    #[inline]
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: EventDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Routes inbound objects to `handler` instead of a dispatcher.
    #[must_use]
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(RpcObject) + Send + Sync + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Returns the configured options.
    #[inline]
    #[must_use]
    pub fn client_options(&self) -> &ClientOptions {
        &self.options
    }

    /// Builds a bare session for callers driving events themselves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the server spec
    /// has an empty field.
    pub fn build_session<H: Host>(self, host: H) -> Result<Session<H>> {
        self.build_parts(Arc::new(host)).map(|(_, session)| session)
    }

    /// Builds the client and spawns its event loop.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the server spec
    /// has an empty field.
    pub fn build<H: Host>(self, host: H) -> Result<Client<H>> {
        let (host, session) = self.build_parts(Arc::new(host))?;
        Ok(Client::spawn(host, session))
    }

    fn build_parts<H: Host>(self, host: Arc<H>) -> Result<(Arc<H>, Session<H>)> {
        let handler = match self.handler {
            Some(handler) => handler,
            None => {
                let dispatcher = self.dispatcher.unwrap_or_default();
                Box::new(move |object: RpcObject| {
                    dispatcher.fire_response_event(&object);
                }) as RpcHandler
            }
        };
        let session = Session::new(Arc::clone(&host), &self.options, handler)?;
        Ok((host, session))
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

    use crate::config::DEFAULT_POPUP_WIDTH;
    use crate::event::EventType;
    use crate::transport::host::mock::MockHost;
    use crate::transport::{IframeState, PopupState, SessionState};

    const DOMAIN: &str = "https://ac.test";

    #[test]
    fn test_new_uses_defaults() {
        let builder = ClientBuilder::new();
        assert_eq!(builder.client_options(), &ClientOptions::default());
    }

    #[test]
    fn test_setters_update_options() {
        let builder = ClientBuilder::new()
            .server_spec(ServerSpec::for_domain(DOMAIN))
            .popup_mode(true)
            .popup_window(PopupHandle::new(3))
            .popup_size(0, 600);

        let options = builder.client_options();
        assert!(options.popup_mode);
        assert_eq!(options.server_spec.domain, DOMAIN);
        assert_eq!(options.popup_window, Some(PopupHandle::new(3)));
        assert_eq!(options.popup_width, DEFAULT_POPUP_WIDTH);
        assert_eq!(options.popup_height, 600);
    }

    #[test]
    fn test_build_session_iframe_mode() {
        let host = MockHost::new();
        let session = ClientBuilder::new()
            .server_spec(ServerSpec::for_domain(DOMAIN))
            .build_session(host.clone())
            .expect("session");

        assert_eq!(session.state(), SessionState::Iframe(IframeState::Loading));
        assert_eq!(host.state.lock().iframes.len(), 1);
    }

    #[test]
    fn test_build_session_adopts_popup() {
        let session = ClientBuilder::new()
            .popup_mode(true)
            .popup_window(PopupHandle::new(9))
            .build_session(MockHost::new())
            .expect("session");

        assert_eq!(session.state(), SessionState::Popup(PopupState::Opening));
    }

    #[test]
    fn test_build_fails_with_empty_domain() {
        let err = ClientBuilder::new()
            .server_spec(ServerSpec::for_domain(""))
            .build_session(MockHost::new())
            .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_custom_handler_wins() {
        let host = MockHost::new();
        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        let dispatcher = EventDispatcher::new();
        let fired = Arc::new(Mutex::new(0));
        let fired_sink = Arc::clone(&fired);
        dispatcher.add_response_listener(
            Arc::new(move |_: &RpcObject| *fired_sink.lock() += 1),
            EventType::Done,
            false,
            None,
        );

        let mut session = ClientBuilder::new()
            .server_spec(ServerSpec::for_domain(DOMAIN))
            .dispatcher(dispatcher)
            .handler(move |_| *sink.lock() += 1)
            .build_session(host)
            .expect("session");

        let response = json!({"jsonrpc": "2.0", "id": "x", "result": {}});
        session.handle_message(DOMAIN, &response.to_string());

        assert_eq!(*seen.lock(), 1);
        assert_eq!(*fired.lock(), 0);
    }

    #[test]
    fn test_default_handler_fires_dispatcher() {
        let dispatcher = EventDispatcher::new();
        let fired = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&fired);
        dispatcher.add_response_listener(
            Arc::new(move |_: &RpcObject| *sink.lock() += 1),
            EventType::EmptyResponse,
            false,
            None,
        );

        let mut session = ClientBuilder::new()
            .server_spec(ServerSpec::for_domain(DOMAIN))
            .dispatcher(dispatcher)
            .build_session(MockHost::new())
            .expect("session");

        let empty = json!({"jsonrpc": "2.0", "method": "emptyResponseNotification"});
        session.handle_message(DOMAIN, &empty.to_string());

        assert_eq!(*fired.lock(), 1);
    }
}
