//! Composable value validators.
//!
//! A [`Validator`] sanitizes a JSON value and returns the cleaned copy, or
//! fails with a [`ValidationError`]. An optional [`ExceptionHandler`] turns a
//! failure into a replacement value instead. A `Null` output means the value
//! is absent; object validators drop such fields.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::{Error, Result};

use super::language::find_language_code;
use super::url::{is_http_or_https_url, is_https_url, strip_scheme, url_host};

// ============================================================================
// ValidationError
// ============================================================================

/// A value failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    /// Creates a validation error.
    #[inline]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Replacement value producer for a failed validation.
///
/// Receives the rejected input and the error. Returning `Value::Null` drops
/// the value.
pub type ExceptionHandler = Arc<dyn Fn(&Value, &ValidationError) -> Value + Send + Sync>;

type ValidationResult = std::result::Result<Value, ValidationError>;

// ============================================================================
// HTML Stripping
// ============================================================================

static SCRIPT_BLOCKS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").ok());

static STYLE_BLOCKS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").ok());

static COMMENTS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").ok());

static TAGS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]*>").ok());

/// Removes every HTML tag from `text`, along with script and style content.
#[must_use]
pub fn strip_html(text: &str) -> String {
    let mut out = text.to_string();
    for re in [&SCRIPT_BLOCKS, &STYLE_BLOCKS, &COMMENTS, &TAGS] {
        if let Some(re) = re.as_ref() {
            out = re.replace_all(&out, "").into_owned();
        }
    }
    out
}

// ============================================================================
// Rule
// ============================================================================

/// The check a [`Validator`] performs.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Accepts anything unchanged.
    Noop,
    /// Coerces to a boolean by truthiness.
    Boolean,
    /// Normalizes a language code; unknown codes become absent.
    Language,
    /// Accepts one of a fixed set of strings.
    Enum(Vec<String>),
    /// Length-bounded text.
    Text {
        /// Maximum length in characters, `0` for unlimited.
        max_len: usize,
        /// Truncate instead of failing when too long.
        truncate: bool,
        /// Strip HTML before the length check.
        sanitize: bool,
    },
    /// Absolute http(s) URL.
    Url {
        /// Maximum length in bytes.
        max_len: usize,
        /// Required `host[:port]`, empty for any host.
        origin: String,
        /// Reject plain `http`.
        https_only: bool,
    },
    /// Applies a validator to every element.
    Array(Box<Validator>),
    /// Field-by-field object validation.
    Object(ObjectRule),
}

/// Field validators of an object rule.
#[derive(Debug, Clone, Default)]
pub struct ObjectRule {
    fail_on_unrecognized: bool,
    required: Vec<(String, Validator)>,
    optional: Vec<(String, Validator)>,
}

impl ObjectRule {
    fn field(&self, name: &str) -> Option<&Validator> {
        self.required
            .iter()
            .chain(self.optional.iter())
            .find(|(field, _)| field == name)
            .map(|(_, validator)| validator)
    }
}

// ============================================================================
// Validator
// ============================================================================

/// A composable validator with an optional soft-fail handler.
#[derive(Clone)]
pub struct Validator {
    rule: Rule,
    handler: Option<ExceptionHandler>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("rule", &self.rule)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

impl From<Rule> for Validator {
    fn from(rule: Rule) -> Self {
        Self {
            rule,
            handler: None,
        }
    }
}

impl Validator {
    /// Accepts anything.
    #[inline]
    #[must_use]
    pub fn noop() -> Self {
        Rule::Noop.into()
    }

    /// Coerces to a boolean.
    #[inline]
    #[must_use]
    pub fn boolean() -> Self {
        Rule::Boolean.into()
    }

    /// Normalizes a language code.
    #[inline]
    #[must_use]
    pub fn language() -> Self {
        Rule::Language.into()
    }

    /// Accepts one of `values`.
    #[must_use]
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rule::Enum(values.into_iter().map(Into::into).collect()).into()
    }

    /// Bounds text length; `max_len == 0` means unlimited.
    #[inline]
    #[must_use]
    pub fn text(max_len: usize, truncate: bool) -> Self {
        Rule::Text {
            max_len,
            truncate,
            sanitize: false,
        }
        .into()
    }

    /// Strips HTML, then bounds text length.
    #[inline]
    #[must_use]
    pub fn sanitized_text(max_len: usize, truncate: bool) -> Self {
        Rule::Text {
            max_len,
            truncate,
            sanitize: true,
        }
        .into()
    }

    /// Checks an http(s) URL.
    ///
    /// `origin` may carry a scheme, which is ignored, and matches hosts
    /// case-insensitively. An empty origin allows any host.
    #[must_use]
    pub fn url(max_len: usize, origin: Option<&str>, https_only: bool) -> Self {
        Rule::Url {
            max_len,
            origin: origin.map(strip_scheme).unwrap_or_default().to_ascii_lowercase(),
            https_only,
        }
        .into()
    }

    /// Validates every element with `element`.
    #[inline]
    #[must_use]
    pub fn array(element: Validator) -> Self {
        Rule::Array(Box::new(element)).into()
    }

    /// Starts a strict object schema: unrecognized fields fail.
    #[inline]
    #[must_use]
    pub fn strict_object() -> ObjectSchema {
        ObjectSchema::new(true)
    }

    /// Starts a lenient object schema: unrecognized fields are dropped.
    #[inline]
    #[must_use]
    pub fn lenient_object() -> ObjectSchema {
        ObjectSchema::new(false)
    }

    /// Sets the soft-fail handler.
    #[must_use]
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Value, &ValidationError) -> Value + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Returns the rule.
    #[inline]
    #[must_use]
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Validates `value`, returning the sanitized copy.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the value is invalid and no handler is
    /// set.
    pub fn validate(&self, value: Value) -> ValidationResult {
        match self.execute(&value) {
            Ok(validated) => Ok(validated),
            Err(e) => match self.handler {
                Some(ref handler) => Ok(handler(&value, &e)),
                None => Err(e),
            },
        }
    }

    fn execute(&self, value: &Value) -> ValidationResult {
        match self.rule {
            Rule::Noop => Ok(value.clone()),
            Rule::Boolean => Ok(Value::Bool(crate::protocol::message::truthy(value))),
            Rule::Language => {
                let language = expect_str(value, "language")?;
                Ok(find_language_code(language).map_or(Value::Null, Value::from))
            }
            Rule::Enum(ref values) => match value.as_str() {
                Some(s) if values.iter().any(|v| v == s) => Ok(value.clone()),
                _ => Err(ValidationError::new(format!(
                    "{} is not a valid enum",
                    display_raw(value)
                ))),
            },
            Rule::Text {
                max_len,
                truncate,
                sanitize,
            } => {
                let raw = expect_str(value, "text")?;
                let text = if sanitize {
                    strip_html(raw)
                } else {
                    raw.to_string()
                };
                if max_len > 0 && text.chars().count() > max_len {
                    if !truncate {
                        return Err(ValidationError::new(format!(
                            "Text is too long. MaxLen: {max_len}"
                        )));
                    }
                    return Ok(Value::from(text.chars().take(max_len).collect::<String>()));
                }
                Ok(Value::from(text))
            }
            Rule::Url {
                max_len,
                ref origin,
                https_only,
            } => {
                let url = expect_str(value, "URL")?;
                if url.len() > max_len {
                    return Err(ValidationError::new(format!(
                        "URL is too long. MaxLen: {max_len}"
                    )));
                }
                let scheme_ok = if https_only {
                    is_https_url(url)
                } else {
                    is_http_or_https_url(url)
                };
                if !scheme_ok {
                    return Err(ValidationError::new(format!("Invalid scheme: {url}")));
                }
                if !origin.is_empty() && url_host(url).as_deref() != Some(origin.as_str()) {
                    return Err(ValidationError::new(format!("Invalid domain: {url}")));
                }
                Ok(value.clone())
            }
            Rule::Array(ref element) => {
                let items = value
                    .as_array()
                    .ok_or_else(|| ValidationError::new("Not an array"))?;
                items
                    .iter()
                    .map(|item| element.validate(item.clone()))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            Rule::Object(ref rule) => {
                let object = value
                    .as_object()
                    .ok_or_else(|| ValidationError::new("Not an object"))?;
                let mut out = Map::new();
                for (name, field) in object {
                    let Some(validator) = rule.field(name) else {
                        if rule.fail_on_unrecognized {
                            return Err(ValidationError::new(format!(
                                "Unrecognized field: {name}"
                            )));
                        }
                        continue;
                    };
                    if field.is_null() {
                        continue;
                    }
                    let validated = validator.validate(field.clone())?;
                    if !validated.is_null() {
                        out.insert(name.clone(), validated);
                    }
                }
                if let Some((name, _)) = rule
                    .required
                    .iter()
                    .find(|(name, _)| !out.contains_key(name))
                {
                    return Err(ValidationError::new(format!("{name} is required.")));
                }
                Ok(Value::Object(out))
            }
        }
    }
}

fn expect_str<'a>(value: &'a Value, what: &str) -> std::result::Result<&'a str, ValidationError> {
    value
        .as_str()
        .ok_or_else(|| ValidationError::new(format!("Invalid {what}: {}", display_raw(value))))
}

fn display_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// ObjectSchema
// ============================================================================

/// Builder for an object validator.
///
/// # Example
///
/// ```ignore
/// let account = Validator::strict_object()
///     .required("email", Validator::sanitized_text(128, true))
///     .optional("displayName", Validator::sanitized_text(128, true))
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    rule: ObjectRule,
}

impl ObjectSchema {
    fn new(fail_on_unrecognized: bool) -> Self {
        Self {
            rule: ObjectRule {
                fail_on_unrecognized,
                ..Default::default()
            },
        }
    }

    /// Adds a required field.
    #[must_use]
    pub fn required(mut self, name: impl Into<String>, validator: Validator) -> Self {
        self.rule.required.push((name.into(), validator));
        self
    }

    /// Adds an optional field.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, validator: Validator) -> Self {
        self.rule.optional.push((name.into(), validator));
        self
    }

    /// Builds the validator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a field is both required and
    /// optional.
    pub fn build(self) -> Result<Validator> {
        if let Some((name, _)) = self
            .rule
            .required
            .iter()
            .find(|(name, _)| self.rule.optional.iter().any(|(o, _)| o == name))
        {
            return Err(Error::invalid_argument(format!(
                "{name} can not be both required and optional."
            )));
        }
        Ok(Rule::Object(self.rule).into())
    }
}

// ============================================================================
// Tests
// ============================================================================
