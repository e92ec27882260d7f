//! Transport session state machine.
//!
//! A [`Session`] owns everything the page knows about the relay: the
//! transport mode, the iframe and popup handles, the readiness flags and the
//! queue of requests waiting for a ready channel.
//!
//! # States
//!
//! | Mode | State | Meaning |
//! |------|-------|---------|
//! | Iframe | `Loading` | Relay iframe inserted, load event pending |
//! | Iframe | `Ready` | Requests post straight to the iframe |
//! | Popup | `NoPopup` | No open popup |
//! | Popup | `Opening` | Popup open, waiting for `serverReadyNotification` |
//! | Popup | `Ready` | Requests post straight to the popup |
//!
//! Requests sent before the channel is ready are queued in submission order
//! and flushed all at once on the readiness transition.
//!
//! The session is synchronous and has a single owner. The async
//! [`Client`](super::Client) drives it from its event loop.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::{ClientOptions, DEFAULT_POPUP_NAME, Endpoints};
use crate::error::{Error, Result};
use crate::identifiers::{FrameHandle, PopupHandle, RequestId, now_millis};
use crate::protocol::{
    CLIENT_INBOUND_KINDS, ClientRequest, Notification, NotificationKind, Response, RpcError,
    RpcObject, parse_rpc_object,
};
use crate::validation::validate_request;

use super::host::{Host, HostEvent, IframeSpec, MessageTarget, popup_features};

// ============================================================================
// Types
// ============================================================================

/// Receiver of every inbound object the transport does not consume.
pub type RpcHandler = Box<dyn Fn(RpcObject) + Send + Sync>;

/// Error data of the synthesized response to a query in popup mode.
pub const QUERY_IN_POPUP_MESSAGE: &str = "Query request is not supported in popup mode.";

// ============================================================================
// SessionState
// ============================================================================

/// Iframe channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IframeState {
    /// Waiting for the iframe load event.
    Loading,
    /// Loaded; requests are posted directly.
    Ready,
}

/// Popup channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupState {
    /// No open popup.
    NoPopup,
    /// Popup open, server not ready yet.
    Opening,
    /// Server ready; requests are posted directly.
    Ready,
}

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Iframe mode.
    Iframe(IframeState),
    /// Popup mode.
    Popup(PopupState),
}

// ============================================================================
// PendingQueue
// ============================================================================

/// FIFO of requests waiting for a ready channel, unique by ID.
#[derive(Debug, Default)]
struct PendingQueue {
    requests: VecDeque<ClientRequest>,
    ids: FxHashSet<RequestId>,
}

impl PendingQueue {
    /// Appends `request`, or replaces the queued request with the same ID
    /// in place.
    fn push(&mut self, request: ClientRequest) {
        if self.ids.contains(request.id()) {
            if let Some(slot) = self.requests.iter_mut().find(|r| r.id() == request.id()) {
                debug!(id = %request.id(), "Replacing queued request");
                *slot = request;
            }
            return;
        }
        self.ids.insert(request.id().clone());
        self.requests.push_back(request);
    }

    /// Removes and returns every queued request.
    fn take(&mut self) -> Vec<ClientRequest> {
        self.ids.clear();
        self.requests.drain(..).collect()
    }

    fn len(&self) -> usize {
        self.requests.len()
    }

    fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

// ============================================================================
// Session
// ============================================================================

/// Transport state for one page.
pub struct Session<H: Host> {
    host: Arc<H>,
    endpoints: Endpoints,
    popup_mode: bool,
    popup: Option<PopupHandle>,
    popup_width: u32,
    popup_height: u32,
    iframe: Option<FrameHandle>,
    iframe_loaded: bool,
    server_ready: bool,
    queue: PendingQueue,
    handler: RpcHandler,
}

impl<H: Host> std::fmt::Debug for Session<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoints", &self.endpoints)
            .field("state", &self.state())
            .field("popup", &self.popup)
            .field("iframe", &self.iframe)
            .field("pending", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl<H: Host> Session<H> {
    /// Creates a session and enters the initial mode.
    ///
    /// In iframe mode this inserts the relay iframe right away.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the server spec is incomplete.
    pub(crate) fn new(host: Arc<H>, options: &ClientOptions, handler: RpcHandler) -> Result<Self> {
        let endpoints = options.server_spec.resolve()?;
        let mut session = Self {
            host,
            endpoints,
            popup_mode: options.popup_mode,
            popup: None,
            popup_width: options.popup_width,
            popup_height: options.popup_height,
            iframe: None,
            iframe_loaded: false,
            server_ready: false,
            queue: PendingQueue::default(),
            handler,
        };
        session.set_popup_mode(options.popup_mode);
        if let Some(popup) = options.popup_window {
            session.set_popup_window(popup);
        }
        debug!(
            domain = %session.endpoints.domain,
            popup_mode = session.popup_mode,
            "Session initialized"
        );
        Ok(session)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the host.
    #[inline]
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Returns the resolved endpoints.
    #[inline]
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Returns `true` in popup mode.
    #[inline]
    #[must_use]
    pub fn popup_mode(&self) -> bool {
        self.popup_mode
    }

    /// Returns the managed popup, if any.
    #[inline]
    #[must_use]
    pub fn popup_window(&self) -> Option<PopupHandle> {
        self.popup
    }

    /// Returns the current iframe, if any.
    #[inline]
    #[must_use]
    pub fn iframe(&self) -> Option<FrameHandle> {
        self.iframe
    }

    /// Returns the number of queued requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if !self.popup_mode {
            return SessionState::Iframe(if self.iframe_loaded {
                IframeState::Ready
            } else {
                IframeState::Loading
            });
        }
        let open = self.popup.is_some_and(|p| !self.host.is_popup_closed(p));
        SessionState::Popup(match (open, self.server_ready) {
            (false, _) => PopupState::NoPopup,
            (true, false) => PopupState::Opening,
            (true, true) => PopupState::Ready,
        })
    }

    // ========================================================================
    // Mode & Popup Management
    // ========================================================================

    /// Switches transport mode.
    ///
    /// Popup mode tears down the iframe; iframe mode inserts it if missing.
    pub fn set_popup_mode(&mut self, popup_mode: bool) {
        self.popup_mode = popup_mode;
        if popup_mode {
            self.remove_iframe();
        } else {
            self.init_iframe();
        }
        debug!(popup_mode, "Transport mode set");
    }

    /// Adopts a popup opened by the page.
    pub fn set_popup_window(&mut self, popup: PopupHandle) {
        debug!(%popup, "Popup window adopted");
        self.popup = Some(popup);
    }

    /// Closes the popup if it is still open and forgets it.
    pub fn close_popup_window(&mut self) {
        if let Some(popup) = self.popup.take()
            && !self.host.is_popup_closed(popup)
        {
            self.host.close_popup(popup);
            debug!(%popup, "Popup window closed");
        }
    }

    fn init_iframe(&mut self) {
        if self.iframe.is_some() {
            return;
        }
        let frame = self
            .host
            .create_iframe(&IframeSpec::hidden(self.endpoints.iframe.as_str()));
        debug!(%frame, src = %self.endpoints.iframe, "Relay iframe inserted");
        self.iframe = Some(frame);
    }

    fn remove_iframe(&mut self) {
        if let Some(frame) = self.iframe.take() {
            self.host.remove_iframe(frame);
            self.iframe_loaded = false;
            debug!(%frame, "Relay iframe removed");
        }
    }

    /// Opens the popup at the popup endpoint, or refocuses and re-navigates
    /// the open one. Readiness always starts over.
    fn open_popup_window(&mut self) {
        self.server_ready = false;
        match self.popup {
            Some(popup) if !self.host.is_popup_closed(popup) => {
                self.host.focus_popup(popup);
                self.host.navigate_popup(popup, &self.endpoints.popup);
                debug!(%popup, "Popup window reused");
            }
            _ => {
                let features = popup_features(
                    self.popup_width,
                    self.popup_height,
                    self.host.viewport_size(),
                );
                self.popup = self
                    .host
                    .open_popup(&self.endpoints.popup, DEFAULT_POPUP_NAME, &features);
                match self.popup {
                    Some(popup) => {
                        self.host.focus_popup(popup);
                        debug!(%popup, "Popup window opened");
                    }
                    None => warn!("Popup window blocked"),
                }
            }
        }
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    /// Validates `request` against its method schema and sends it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the request fails its schema.
    /// Nothing is sent or queued in that case.
    pub fn call_server(&mut self, request: ClientRequest) -> Result<()> {
        let request = validate_request(request, &self.host.current_host())?;
        self.submit(request);
        Ok(())
    }

    /// Sends an already validated request over the current channel.
    pub(crate) fn submit(&mut self, request: ClientRequest) {
        if !self.popup_mode {
            match self.iframe {
                Some(frame) if self.iframe_loaded => {
                    self.post(MessageTarget::Frame(frame), request.into());
                }
                _ => self.enqueue(request),
            }
            return;
        }

        if request.is_query() {
            debug!(id = %request.id(), "Query rejected in popup mode");
            let error = RpcError::method_not_found(Some(Value::from(QUERY_IN_POPUP_MESSAGE)));
            (self.handler)(Response::failure(request.id().clone(), error).into());
            return;
        }

        self.open_popup_window();
        match self.popup {
            Some(popup) if self.server_ready => {
                self.post(MessageTarget::Popup(popup), request.into());
            }
            _ => self.enqueue(request),
        }
    }

    fn enqueue(&mut self, request: ClientRequest) {
        trace!(id = %request.id(), method = %request.method(), "Request queued");
        self.queue.push(request);
    }

    /// Posts `message` stamped with the current time.
    fn post(&self, target: MessageTarget, message: RpcObject) {
        let json = message.with_timestamp(now_millis()).to_string();
        trace!(%target, message = %json, "Posting message");
        self.host.post_message(target, &json, &self.endpoints.domain);
    }

    /// Posts every queued request to `target`, in order.
    fn flush(&mut self, target: MessageTarget) {
        if self.queue.is_empty() {
            return;
        }
        let pending = self.queue.take();
        debug!(%target, count = pending.len(), "Flushing queued requests");
        for request in pending {
            self.post(target, request.into());
        }
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    /// Handles one host event.
    pub fn handle_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::Message { origin, data } => self.handle_message(&origin, &data),
            HostEvent::FrameLoaded(frame) => self.handle_frame_loaded(frame),
        }
    }

    /// Handles the load event of an iframe.
    ///
    /// Events for anything but the current iframe are ignored.
    pub fn handle_frame_loaded(&mut self, frame: FrameHandle) {
        if self.iframe != Some(frame) {
            debug!(%frame, "Ignoring load event of stale iframe");
            return;
        }
        self.iframe_loaded = true;
        debug!(%frame, "Relay iframe loaded");
        if !self.popup_mode {
            let target = MessageTarget::Frame(frame);
            self.post(target, Notification::client_ready().into());
            self.flush(target);
        }
    }

    /// Handles a cross-window message.
    ///
    /// Messages from foreign origins, invalid JSON and unrecognized objects
    /// are logged and dropped.
    pub fn handle_message(&mut self, origin: &str, data: &str) {
        trace!(%origin, message = %data, "Received message");
        let object = match self.classify(origin, data) {
            Ok(object) => object,
            Err(e) => {
                warn!(%origin, error = %e, "Dropping inbound message");
                return;
            }
        };

        match object.as_notification().and_then(Notification::kind) {
            Some(NotificationKind::ServerReady) => self.on_server_ready(),
            Some(NotificationKind::RequestAck) => self.on_request_ack(),
            _ => (self.handler)(object),
        }
    }

    fn classify(&self, origin: &str, data: &str) -> Result<RpcObject> {
        if origin != self.endpoints.domain {
            return Err(Error::protocol(format!("unexpected origin {origin}")));
        }
        let raw: Value = serde_json::from_str(data)
            .map_err(|e| Error::protocol(format!("invalid JSON: {e}")))?;
        parse_rpc_object(&raw, &CLIENT_INBOUND_KINDS)
            .ok_or_else(|| Error::protocol(format!("unrecognized object: {data}")))
    }

    fn on_server_ready(&mut self) {
        if !self.popup_mode {
            return;
        }
        self.server_ready = true;
        debug!("Popup server ready");
        match self.popup {
            Some(popup) => self.flush(MessageTarget::Popup(popup)),
            None => warn!(pending = self.queue.len(), "Server ready without a popup"),
        }
    }

    fn on_request_ack(&self) {
        if self.popup_mode {
            return;
        }
        let url = format!("{}#{}", self.endpoints.redirect, self.host.current_host());
        debug!(%url, "Request acknowledged, redirecting");
        self.host.navigate_top(&url);
    }
}

// ============================================================================
// Tests
// ============================================================================
