//! Client init options.
//!
//! Options deserialize from the same camelCase shape pages pass at init:
//!
//! ```json
//! {
//!   "serverSpec": {
//!     "domain": "https://www.accountchooser.com",
//!     "iframe": "/iframe.html",
//!     "popup": "/popup.html",
//!     "redirect": "/redirect.html"
//!   },
//!   "popupMode": true,
//!   "popupWidth": 520,
//!   "popupHeight": 550
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifiers::PopupHandle;

// ============================================================================
// Constants
// ============================================================================

/// Default account chooser domain.
pub const DEFAULT_DOMAIN: &str = "https://www.accountchooser.com";

/// Default iframe endpoint path.
pub const DEFAULT_IFRAME_PATH: &str = "/iframe.html";

/// Default popup endpoint path.
pub const DEFAULT_POPUP_PATH: &str = "/popup.html";

/// Default redirect endpoint path.
pub const DEFAULT_REDIRECT_PATH: &str = "/redirect.html";

/// Default popup width in pixels.
pub const DEFAULT_POPUP_WIDTH: u32 = 520;

/// Default popup height in pixels.
pub const DEFAULT_POPUP_HEIGHT: u32 = 550;

/// Window name of the popup.
pub const DEFAULT_POPUP_NAME: &str = "acPopup";

// ============================================================================
// ServerSpec
// ============================================================================

/// Remote endpoints: a domain plus three paths on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerSpec {
    /// Origin of the remote, including scheme.
    pub domain: String,
    /// Path of the iframe page.
    pub iframe: String,
    /// Path of the popup page.
    pub popup: String,
    /// Path of the redirect page.
    pub redirect: String,
}

impl Default for ServerSpec {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            iframe: DEFAULT_IFRAME_PATH.to_string(),
            popup: DEFAULT_POPUP_PATH.to_string(),
            redirect: DEFAULT_REDIRECT_PATH.to_string(),
        }
    }
}

impl ServerSpec {
    /// Creates a spec for `domain` with the default paths.
    #[must_use]
    pub fn for_domain(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Default::default()
        }
    }

    /// Checks every field and prefixes the domain onto each path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any field is empty.
    pub fn resolve(&self) -> Result<Endpoints> {
        for (name, value) in [
            ("domain", &self.domain),
            ("iframe", &self.iframe),
            ("popup", &self.popup),
            ("redirect", &self.redirect),
        ] {
            if value.is_empty() {
                return Err(Error::config(format!("serverSpec.{name} is required")));
            }
        }
        Ok(Endpoints {
            domain: self.domain.clone(),
            iframe: format!("{}{}", self.domain, self.iframe),
            popup: format!("{}{}", self.domain, self.popup),
            redirect: format!("{}{}", self.domain, self.redirect),
        })
    }
}

/// Absolute endpoint URLs resolved from a [`ServerSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Remote origin; outbound target origin and inbound origin filter.
    pub domain: String,
    /// Iframe page URL.
    pub iframe: String,
    /// Popup page URL.
    pub popup: String,
    /// Redirect page URL.
    pub redirect: String,
}

// ============================================================================
// ClientOptions
// ============================================================================

/// Transport init options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientOptions {
    /// Remote endpoints.
    pub server_spec: ServerSpec,

    /// Start in popup mode instead of iframe mode.
    pub popup_mode: bool,

    /// Popup window the page already opened.
    #[serde(skip)]
    pub popup_window: Option<PopupHandle>,

    /// Popup width in pixels.
    pub popup_width: u32,

    /// Popup height in pixels.
    pub popup_height: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            server_spec: ServerSpec::default(),
            popup_mode: false,
            popup_window: None,
            popup_width: DEFAULT_POPUP_WIDTH,
            popup_height: DEFAULT_POPUP_HEIGHT,
        }
    }
}

impl ClientOptions {
    /// Creates options with every default.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the JSON does not match the options shape.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the server spec.
    #[inline]
    #[must_use]
    pub fn with_server_spec(mut self, spec: ServerSpec) -> Self {
        self.server_spec = spec;
        self
    }

    /// Enables popup mode.
    #[inline]
    #[must_use]
    pub fn with_popup_mode(mut self, popup_mode: bool) -> Self {
        self.popup_mode = popup_mode;
        self
    }

    /// Adopts an already opened popup.
    #[inline]
    #[must_use]
    pub fn with_popup_window(mut self, popup: PopupHandle) -> Self {
        self.popup_window = Some(popup);
        self
    }

    /// Sets the popup size. Zero keeps the default for that dimension.
    #[inline]
    #[must_use]
    pub fn with_popup_size(mut self, width: u32, height: u32) -> Self {
        if width > 0 {
            self.popup_width = width;
        }
        if height > 0 {
            self.popup_height = height;
        }
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::default();
        assert!(!options.popup_mode);
        assert_eq!(options.popup_width, 520);
        assert_eq!(options.popup_height, 550);
        assert_eq!(options.server_spec.domain, DEFAULT_DOMAIN);
    }

    #[test]
    fn test_resolve_prefixes_domain() {
        let endpoints = ServerSpec::for_domain("https://ac.test").resolve().expect("valid");
        assert_eq!(endpoints.iframe, "https://ac.test/iframe.html");
        assert_eq!(endpoints.popup, "https://ac.test/popup.html");
        assert_eq!(endpoints.redirect, "https://ac.test/redirect.html");
    }

    #[test]
    fn test_resolve_rejects_empty_fields() {
        let spec = ServerSpec {
            popup: String::new(),
            ..Default::default()
        };
        let err = spec.resolve().unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(err.to_string(), "Configuration error: serverSpec.popup is required");
    }

    #[test]
    fn test_from_json_camel_case() {
        let options = ClientOptions::from_json(
            r#"{"serverSpec": {"domain": "https://ac.test"}, "popupMode": true, "popupWidth": 600}"#,
        )
        .expect("parse");

        assert!(options.popup_mode);
        assert_eq!(options.popup_width, 600);
        assert_eq!(options.popup_height, DEFAULT_POPUP_HEIGHT);
        assert_eq!(options.server_spec.iframe, DEFAULT_IFRAME_PATH);
    }

    #[test]
    fn test_popup_size_zero_keeps_default() {
        let options = ClientOptions::new().with_popup_size(0, 700);
        assert_eq!(options.popup_width, DEFAULT_POPUP_WIDTH);
        assert_eq!(options.popup_height, 700);
    }
}
