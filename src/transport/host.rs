//! Browser capabilities the transport relies on.
//!
//! The transport never touches a DOM directly. Everything it needs from the
//! embedding page goes through [`Host`]: posting messages, inserting the
//! relay iframe, managing the popup and navigating the top-level page.
//! Inbound traffic flows the other way as [`HostEvent`]s.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::identifiers::{FrameHandle, PopupHandle};
use crate::validation::url::url_host;

// ============================================================================
// Constants
// ============================================================================

/// DOM id of the relay iframe.
pub const IFRAME_ID: &str = "accountchooser-iframe";

/// Inline style keeping the relay iframe off-screen.
pub const IFRAME_STYLE: &str = "position: absolute; width: 1px; height: 1px; left: -9999px;";

/// Sandbox flags of the relay iframe.
pub const IFRAME_SANDBOX: &str = "allow-scripts allow-same-origin";

// ============================================================================
// Types
// ============================================================================

/// Window a message is posted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTarget {
    /// Content window of the relay iframe.
    Frame(FrameHandle),
    /// The popup window.
    Popup(PopupHandle),
}

impl fmt::Display for MessageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(h) => write!(f, "{h}"),
            Self::Popup(h) => write!(f, "{h}"),
        }
    }
}

/// Attributes of the relay iframe element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IframeSpec {
    /// Element id.
    pub id: &'static str,
    /// Inline style.
    pub style: &'static str,
    /// Sandbox flags.
    pub sandbox: &'static str,
    /// Absolute URL of the iframe endpoint.
    pub src: String,
}

impl IframeSpec {
    /// Creates the standard hidden, sandboxed relay iframe pointing at `src`.
    #[must_use]
    pub fn hidden(src: impl Into<String>) -> Self {
        Self {
            id: IFRAME_ID,
            style: IFRAME_STYLE,
            sandbox: IFRAME_SANDBOX,
            src: src.into(),
        }
    }
}

/// Inbound event delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A cross-window message arrived.
    Message {
        /// Sender origin, e.g. `https://www.accountchooser.com`.
        origin: String,
        /// Raw message payload.
        data: String,
    },
    /// An iframe finished loading.
    FrameLoaded(FrameHandle),
}

// ============================================================================
// Host
// ============================================================================

/// The embedding page.
///
/// Implementations bridge to a real browser (wasm glue, a webview) or record
/// calls in tests. Methods are called from the client event loop only.
pub trait Host: Send + Sync + 'static {
    /// Posts `message` to `target`, restricted to `target_origin`.
    fn post_message(&self, target: MessageTarget, message: &str, target_origin: &str);

    /// Inserts an iframe and starts loading `spec.src`.
    ///
    /// The host reports completion with [`HostEvent::FrameLoaded`].
    fn create_iframe(&self, spec: &IframeSpec) -> FrameHandle;

    /// Removes a previously created iframe.
    fn remove_iframe(&self, frame: FrameHandle);

    /// Opens a popup window. Returns `None` if the browser blocked it.
    fn open_popup(&self, url: &str, name: &str, features: &str) -> Option<PopupHandle>;

    /// Brings the popup to the front.
    fn focus_popup(&self, popup: PopupHandle);

    /// Navigates the popup to `url`.
    fn navigate_popup(&self, popup: PopupHandle, url: &str);

    /// Closes the popup.
    fn close_popup(&self, popup: PopupHandle);

    /// Returns `true` if the user or the page closed the popup.
    fn is_popup_closed(&self, popup: PopupHandle) -> bool;

    /// Navigates the top-level page to `url`.
    fn navigate_top(&self, url: &str);

    /// Returns the current page URL.
    fn current_url(&self) -> String;

    /// Returns the current page `host[:port]`.
    fn current_host(&self) -> String {
        url_host(&self.current_url()).unwrap_or_default()
    }

    /// Returns the viewport `(width, height)` in CSS pixels.
    fn viewport_size(&self) -> (u32, u32);
}

// ============================================================================
// Popup Placement
// ============================================================================

/// Builds the `window.open` feature string for a popup centered in the
/// viewport. Offsets never go negative.
#[must_use]
pub fn popup_features(width: u32, height: u32, viewport: (u32, u32)) -> String {
    let left = ((i64::from(viewport.0) - i64::from(width)) / 2).max(0);
    let top = ((i64::from(viewport.1) - i64::from(height)) / 2).max(0);
    format!(
        "width={width},height={height},left={left},top={top},status=1,location=1,\
         resizable=yes,menubar=no,toolbar=no,titlebar=no,channelmode=no,\
         directories=no,fullscreen=no"
    )
}

// ============================================================================
// Recording Host
// ============================================================================


// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::mock::MockHost;
    use super::*;

    #[test]
    fn test_popup_features_centered() {
        let features = popup_features(520, 550, (1280, 800));
        assert!(features.starts_with("width=520,height=550,left=380,top=125,status=1,location=1,"));
        assert!(features.ends_with("directories=no,fullscreen=no"));
    }

    #[test]
    fn test_popup_features_clamped() {
        let features = popup_features(520, 550, (300, 200));
        assert!(features.contains("left=0,top=0"));
    }

    #[test]
    fn test_current_host_default() {
        assert_eq!(MockHost::new().current_host(), "site.com");
    }

    #[test]
    fn test_hidden_iframe_spec() {
        let spec = IframeSpec::hidden("https://ac.com/iframe.html");
        assert_eq!(spec.sandbox, "allow-scripts allow-same-origin");
        assert_eq!(spec.id, "accountchooser-iframe");
    }
}
