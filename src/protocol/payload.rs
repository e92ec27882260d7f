//! Typed request payloads.
//!
//! These serialize to the `params` fields of the request kinds. Absent
//! fields are omitted from the wire object.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Account
// ============================================================================

/// An account record shown in or stored to the chooser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Email address (required on the wire).
    pub email: String,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Photo URL (HTTPS only, silently dropped if invalid).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,

    /// Identity provider ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
}

impl Account {
    /// Creates an account with only an email.
    #[inline]
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Default::default()
        }
    }

    /// Sets the display name.
    #[inline]
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the photo URL.
    #[inline]
    #[must_use]
    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    /// Sets the provider ID.
    #[inline]
    #[must_use]
    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }
}

// ============================================================================
// UiOptions
// ============================================================================

/// Customized chooser UI for the select service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiOptions {
    /// Window title (truncated to 64 characters).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Favicon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,

    /// Branding content URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branding: Option<String>,
}

// ============================================================================
// ClientConfig
// ============================================================================

/// Per-request client configuration (`params.clientConfig`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// URL the chooser returns to in redirect mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_callback_url: Option<String>,

    /// URL used instead of the callback URL after a positive action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positive_callback_url: Option<String>,

    /// URL used instead of the callback URL after a negative action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_callback_url: Option<String>,

    /// Keep the popup open after the flow completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_popup: Option<bool>,

    /// Show accounts without an email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_all: Option<bool>,

    /// Store accounts without confirmation (bootstrapping domain only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silent: Option<bool>,

    /// Supported identity providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<Vec<String>>,

    /// UI language code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Customized UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<UiOptions>,
}

impl ClientConfig {
    /// Returns a copy where every field set in `overrides` wins.
    #[must_use]
    pub fn merge(&self, overrides: &ClientConfig) -> ClientConfig {
        ClientConfig {
            client_callback_url: overrides
                .client_callback_url
                .clone()
                .or_else(|| self.client_callback_url.clone()),
            positive_callback_url: overrides
                .positive_callback_url
                .clone()
                .or_else(|| self.positive_callback_url.clone()),
            negative_callback_url: overrides
                .negative_callback_url
                .clone()
                .or_else(|| self.negative_callback_url.clone()),
            keep_popup: overrides.keep_popup.or(self.keep_popup),
            show_all: overrides.show_all.or(self.show_all),
            silent: overrides.silent.or(self.silent),
            providers: overrides
                .providers
                .clone()
                .or_else(|| self.providers.clone()),
            language: overrides.language.clone().or_else(|| self.language.clone()),
            ui: overrides.ui.clone().or_else(|| self.ui.clone()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
