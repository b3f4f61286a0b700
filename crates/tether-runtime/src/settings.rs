#![forbid(unsafe_code)]

//! Binding engine settings.
//!
//! Settings are thread-local, like the rest of the engine. The defaults match
//! the placeholders transform helpers fall back to when no explicit
//! placeholder is given.
//!
//! | Field | Default | Env var |
//! |-------|---------|---------|
//! | `log_bindings` | `false` | `TETHER_LOG_BINDINGS` |
//! | `multiple_placeholder` | `"@@MULT@@"` | `TETHER_MULTIPLE_PLACEHOLDER` |
//! | `empty_placeholder` | `"@@EMPTY@@"` | `TETHER_EMPTY_PLACEHOLDER` |
//!
//! With the `settings-config` feature, settings can also be loaded from TOML
//! or JSON documents.

use std::cell::RefCell;
use std::env;
use std::fmt;

use tether_core::Value;

/// Default placeholder for multiple values.
pub const DEFAULT_MULTIPLE_PLACEHOLDER: &str = "@@MULT@@";
/// Default placeholder for empty values.
pub const DEFAULT_EMPTY_PLACEHOLDER: &str = "@@EMPTY@@";

/// Errors from loading settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// The document could not be parsed.
    Parse(String),
    /// A field had an unusable value.
    InvalidValue { key: String, value: String },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "settings parse error: {msg}"),
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value '{value}' for setting '{key}'")
            }
        }
    }
}

impl std::error::Error for SettingsError {}

/// Engine-wide knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "settings-config", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "settings-config", serde(default, deny_unknown_fields))]
pub struct BindingSettings {
    /// Log every binding that fires and every drain pass.
    pub log_bindings: bool,
    /// Placeholder `single` uses for arrays with more than one element.
    pub multiple_placeholder: String,
    /// Placeholder `not_empty` / `not_null` use.
    pub empty_placeholder: String,
}

impl Default for BindingSettings {
    fn default() -> Self {
        Self {
            log_bindings: false,
            multiple_placeholder: DEFAULT_MULTIPLE_PLACEHOLDER.to_owned(),
            empty_placeholder: DEFAULT_EMPTY_PLACEHOLDER.to_owned(),
        }
    }
}

impl BindingSettings {
    /// Defaults overridden by `TETHER_*` environment variables.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let mut settings = Self::default();
        if let Some(raw) = lookup("TETHER_LOG_BINDINGS") {
            settings.log_bindings = parse_flag("log_bindings", &raw)?;
        }
        if let Some(raw) = lookup("TETHER_MULTIPLE_PLACEHOLDER") {
            settings.multiple_placeholder = raw;
        }
        if let Some(raw) = lookup("TETHER_EMPTY_PLACEHOLDER") {
            settings.empty_placeholder = raw;
        }
        Ok(settings)
    }

    /// Parse settings from a TOML document. Missing fields keep defaults.
    #[cfg(feature = "settings-config")]
    pub fn from_toml_str(input: &str) -> Result<Self, SettingsError> {
        toml::from_str(input).map_err(|err| SettingsError::Parse(err.to_string()))
    }

    /// Parse settings from a JSON document. Missing fields keep defaults.
    #[cfg(feature = "settings-config")]
    pub fn from_json_str(input: &str) -> Result<Self, SettingsError> {
        serde_json::from_str(input).map_err(|err| SettingsError::Parse(err.to_string()))
    }

    /// The multiple placeholder as a value.
    #[must_use]
    pub fn multiple_value(&self) -> Value {
        Value::string(&self.multiple_placeholder)
    }

    /// The empty placeholder as a value.
    #[must_use]
    pub fn empty_value(&self) -> Value {
        Value::string(&self.empty_placeholder)
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, SettingsError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(SettingsError::InvalidValue {
            key: key.to_owned(),
            value: raw.to_owned(),
        }),
    }
}

thread_local! {
    static CURRENT: RefCell<BindingSettings> = RefCell::new(BindingSettings::default());
}

/// Snapshot of the current thread's settings.
#[must_use]
pub fn current() -> BindingSettings {
    CURRENT.with(|s| s.borrow().clone())
}

/// Replace the current thread's settings, returning the previous ones.
pub fn replace(settings: BindingSettings) -> BindingSettings {
    CURRENT.with(|s| std::mem::replace(&mut *s.borrow_mut(), settings))
}

/// Whether binding logging is on, without cloning the settings.
#[must_use]
pub fn log_bindings() -> bool {
    CURRENT.with(|s| s.borrow().log_bindings)
}
