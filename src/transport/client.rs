//! Async client and event loop.
//!
//! The client owns a [`Session`] inside a spawned tokio task. Host events
//! (cross-window messages, iframe loads) and API commands share ONE
//! unbounded channel, so the session sees them in exactly the order they
//! were submitted.
//!
//! # Event Loop
//!
//! The loop task handles:
//!
//! - Inbound messages from the remote (via [`HostEventSender`])
//! - Iframe load events
//! - Outbound requests and mode changes from the Rust API
//! - State queries answered over oneshot channels
//!
//! The loop runs until [`Client::shutdown`] or until every [`Client`] and
//! every [`HostEventSender`] is dropped. A live sender alone keeps the
//! session running.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::{FrameHandle, PopupHandle};
use crate::protocol::ClientRequest;
use crate::validation::validate_request;

use super::host::{Host, HostEvent};
use super::session::{Session, SessionState};

// ============================================================================
// ClientCommand
// ============================================================================

/// Internal commands for the event loop.
enum ClientCommand {
    /// Send a validated request.
    Submit(ClientRequest),
    /// Switch transport mode.
    SetPopupMode(bool),
    /// Adopt a popup window.
    SetPopupWindow(PopupHandle),
    /// Close and forget the popup window.
    ClosePopupWindow,
    /// Report the session state.
    State(oneshot::Sender<SessionState>),
    /// Report the popup window.
    PopupWindow(oneshot::Sender<Option<PopupHandle>>),
    /// Report the queue length.
    PendingCount(oneshot::Sender<usize>),
    /// Stop the event loop.
    Shutdown,
}

/// Everything the event loop consumes, in one ordered stream.
enum LoopInput {
    Host(HostEvent),
    Command(ClientCommand),
}

// ============================================================================
// HostEventSender
// ============================================================================

/// Feeds host events into a client's event loop.
///
/// Hand this to the glue that receives `message` and iframe `load` events.
#[derive(Clone)]
pub struct HostEventSender {
    tx: mpsc::UnboundedSender<LoopInput>,
}

impl HostEventSender {
    /// Delivers a cross-window message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the client has shut down.
    pub fn message(&self, origin: impl Into<String>, data: impl Into<String>) -> Result<()> {
        self.send(HostEvent::Message {
            origin: origin.into(),
            data: data.into(),
        })
    }

    /// Delivers an iframe load event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the client has shut down.
    pub fn frame_loaded(&self, frame: FrameHandle) -> Result<()> {
        self.send(HostEvent::FrameLoaded(frame))
    }

    /// Delivers any host event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the client has shut down.
    pub fn send(&self, event: HostEvent) -> Result<()> {
        self.tx
            .send(LoopInput::Host(event))
            .map_err(|_| Error::ChannelClosed)
    }
}

// ============================================================================
// Client
// ============================================================================

/// Handle to a running transport session.
///
/// Cheap to clone; clones drive the same session. The event loop stops on
/// [`Client::shutdown`] or once every client clone and every
/// [`HostEventSender`] is dropped.
pub struct Client<H: Host> {
    host: Arc<H>,
    tx: mpsc::UnboundedSender<LoopInput>,
}

impl<H: Host> Clone for Client<H> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
            tx: self.tx.clone(),
        }
    }
}

impl<H: Host> Client<H> {
    /// Spawns the event loop for `session`.
    ///
    /// Must be called inside a tokio runtime.
    pub(crate) fn spawn(host: Arc<H>, session: Session<H>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(Self::run_event_loop(session, rx));
        Self { host, tx }
    }

    /// Returns the host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Returns a sender for host events.
    #[must_use]
    pub fn host_events(&self) -> HostEventSender {
        HostEventSender {
            tx: self.tx.clone(),
        }
    }

    /// Validates `request` and hands it to the transport.
    ///
    /// Validation runs synchronously; the send itself happens on the event
    /// loop. The outcome arrives through the registered handler.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the request fails its schema
    /// - [`Error::ChannelClosed`] if the client has shut down
    pub fn call_server(&self, request: ClientRequest) -> Result<()> {
        let request = validate_request(request, &self.host.current_host())?;
        self.command(ClientCommand::Submit(request))
    }

    /// Switches between popup and iframe mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the client has shut down.
    pub fn set_popup_mode(&self, popup_mode: bool) -> Result<()> {
        self.command(ClientCommand::SetPopupMode(popup_mode))
    }

    /// Adopts a popup window opened by the page.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the client has shut down.
    pub fn set_popup_window(&self, popup: PopupHandle) -> Result<()> {
        self.command(ClientCommand::SetPopupWindow(popup))
    }

    /// Closes the popup window if it is still open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the client has shut down.
    pub fn close_popup_window(&self) -> Result<()> {
        self.command(ClientCommand::ClosePopupWindow)
    }

    /// Returns the session state once every earlier input is processed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the client has shut down.
    pub async fn state(&self) -> Result<SessionState> {
        let (tx, rx) = oneshot::channel();
        self.command(ClientCommand::State(tx))?;
        Ok(rx.await?)
    }

    /// Returns the managed popup window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the client has shut down.
    pub async fn popup_window(&self) -> Result<Option<PopupHandle>> {
        let (tx, rx) = oneshot::channel();
        self.command(ClientCommand::PopupWindow(tx))?;
        Ok(rx.await?)
    }

    /// Returns the number of queued requests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the client has shut down.
    pub async fn pending_count(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.command(ClientCommand::PendingCount(tx))?;
        Ok(rx.await?)
    }

    /// Stops the event loop. Queued requests are abandoned.
    pub fn shutdown(&self) {
        let _ = self.command(ClientCommand::Shutdown);
    }

    fn command(&self, command: ClientCommand) -> Result<()> {
        self.tx
            .send(LoopInput::Command(command))
            .map_err(|_| Error::ChannelClosed)
    }

    /// Event loop owning the session.
    async fn run_event_loop(
        mut session: Session<H>,
        mut rx: mpsc::UnboundedReceiver<LoopInput>,
    ) {
        while let Some(input) = rx.recv().await {
            match input {
                LoopInput::Host(event) => session.handle_event(event),

                LoopInput::Command(ClientCommand::Submit(request)) => session.submit(request),

                LoopInput::Command(ClientCommand::SetPopupMode(popup_mode)) => {
                    session.set_popup_mode(popup_mode);
                }

                LoopInput::Command(ClientCommand::SetPopupWindow(popup)) => {
                    session.set_popup_window(popup);
                }

                LoopInput::Command(ClientCommand::ClosePopupWindow) => {
                    session.close_popup_window();
                }

                LoopInput::Command(ClientCommand::State(reply)) => {
                    let _ = reply.send(session.state());
                }

                LoopInput::Command(ClientCommand::PopupWindow(reply)) => {
                    let _ = reply.send(session.popup_window());
                }

                LoopInput::Command(ClientCommand::PendingCount(reply)) => {
                    let _ = reply.send(session.pending_count());
                }

                LoopInput::Command(ClientCommand::Shutdown) => {
                    debug!("Shutdown command received");
                    break;
                }
            }
        }

        if session.pending_count() > 0 {
            debug!(abandoned = session.pending_count(), "Dropping queued requests");
        }
        debug!("Event loop terminated");
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

    use crate::config::{ClientBuilder, ServerSpec};
    use crate::event::{EventDispatcher, EventType};
    use crate::protocol::{Account, ClientConfig, Notification, Query, RpcObject};
    use crate::transport::host::mock::MockHost;
    use crate::transport::session::{IframeState, PopupState};

    const DOMAIN: &str = "https://ac.test";

    fn config() -> ClientConfig {
        ClientConfig {
            client_callback_url: Some("https://site.com/cb".into()),
            ..Default::default()
        }
    }

    fn store(id: &str) -> ClientRequest {
        ClientRequest::store(id, vec![Account::new("a@b.com")], config()).expect("valid")
    }

    fn build(host: &MockHost, popup_mode: bool) -> (Client<MockHost>, EventDispatcher) {
        let dispatcher = EventDispatcher::new();
        let client = ClientBuilder::new()
            .server_spec(ServerSpec::for_domain(DOMAIN))
            .popup_mode(popup_mode)
            .dispatcher(dispatcher.clone())
            .build(host.clone())
            .expect("client");
        (client, dispatcher)
    }

    #[tokio::test]
    async fn test_iframe_flow_preserves_order() {
        let host = MockHost::new();
        let (client, _) = build(&host, false);
        let events = client.host_events();

        client.call_server(store("s1")).expect("send");
        client.call_server(store("s2")).expect("send");
        events
            .frame_loaded(host.last_iframe().expect("iframe"))
            .expect("send");
        client.call_server(store("s3")).expect("send");

        assert_eq!(
            client.state().await.expect("state"),
            SessionState::Iframe(IframeState::Ready)
        );
        assert_eq!(
            host.state.lock().posted_labels(),
            vec!["clientReadyNotification", "store", "store", "store"]
        );
        assert_eq!(host.state.lock().posted_ids(), vec!["s1", "s2", "s3"]);
    }

    #[tokio::test]
    async fn test_response_reaches_listener() {
        let host = MockHost::new();
        let (client, dispatcher) = build(&host, false);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dispatcher.add_response_listener(
            Arc::new(move |object: &RpcObject| sink.lock().push(object.clone())),
            EventType::Done,
            false,
            None,
        );

        let response = json!({"jsonrpc": "2.0", "id": "store", "result": {"ok": true}});
        client
            .host_events()
            .message(DOMAIN, response.to_string())
            .expect("send");
        client.pending_count().await.expect("sync");

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].as_response().and_then(|r| r.result()),
            Some(&json!({"ok": true}))
        );
    }

    #[tokio::test]
    async fn test_popup_flow() {
        let host = MockHost::new();
        let (client, _) = build(&host, true);

        client.call_server(store("s1")).expect("send");
        assert_eq!(
            client.state().await.expect("state"),
            SessionState::Popup(PopupState::Opening)
        );
        assert_eq!(client.pending_count().await.expect("count"), 1);

        client
            .host_events()
            .message(DOMAIN, Notification::server_ready().to_value().to_string())
            .expect("send");
        assert_eq!(
            client.state().await.expect("state"),
            SessionState::Popup(PopupState::Ready)
        );
        assert_eq!(host.state.lock().posted_ids(), vec!["s1"]);

        let popup = client.popup_window().await.expect("popup");
        assert_eq!(popup, host.last_popup());
        client.close_popup_window().expect("send");
        assert_eq!(client.popup_window().await.expect("popup"), None);
    }

    #[tokio::test]
    async fn test_popup_query_error_reaches_listener() {
        let host = MockHost::new();
        let (client, dispatcher) = build(&host, true);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dispatcher.add_response_listener(
            Arc::new(move |object: &RpcObject| sink.lock().push(object.clone())),
            EventType::Done,
            true,
            Some(crate::identifiers::RequestId::new("q1").expect("valid")),
        );

        client
            .call_server(ClientRequest::query("q1", Query::AcEmpty, None).expect("valid"))
            .expect("send");
        client.pending_count().await.expect("sync");

        let seen = seen.lock();
        assert_eq!(
            seen[0].as_response().and_then(|r| r.error()).map(|e| e.code),
            Some(-32601)
        );
    }

    #[tokio::test]
    async fn test_validation_error_is_synchronous() {
        let host = MockHost::new();
        let (client, _) = build(&host, false);
        let request =
            ClientRequest::new("s1", "update", store("s1").params().cloned()).expect("valid");

        let err = client.call_server(request).unwrap_err();
        assert!(err.is_validation_error());
        assert_eq!(client.pending_count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn test_mode_switch_through_client() {
        let host = MockHost::new();
        let (client, _) = build(&host, false);

        client.set_popup_mode(true).expect("send");
        assert_eq!(
            client.state().await.expect("state"),
            SessionState::Popup(PopupState::NoPopup)
        );
        assert_eq!(host.state.lock().removed_iframes.len(), 1);

        client.set_popup_window(crate::identifiers::PopupHandle::new(42)).expect("send");
        assert_eq!(
            client.state().await.expect("state"),
            SessionState::Popup(PopupState::Opening)
        );
    }

    #[tokio::test]
    async fn test_host_sender_outlives_client() {
        let host = MockHost::new();
        let (client, _) = build(&host, false);
        let events = client.host_events();
        drop(client);

        events
            .frame_loaded(host.last_iframe().expect("iframe"))
            .expect("loop still running");
        for _ in 0..100 {
            if !host.state.lock().posts.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(
            host.state.lock().posted_labels(),
            vec!["clientReadyNotification"]
        );
    }

    #[tokio::test]
    async fn test_shutdown_closes_channel() {
        let host = MockHost::new();
        let (client, _) = build(&host, false);
        client.shutdown();

        assert!(matches!(client.state().await, Err(Error::ChannelClosed)));
        assert!(matches!(
            client.host_events().message(DOMAIN, "{}"),
            Err(Error::ChannelClosed)
        ));
    }
}
