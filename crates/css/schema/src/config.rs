//! Per-workspace schema configuration.

use anyhow::{Context as _, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// URL schemes a stylesheet can be loaded from.
const SUPPORTED_SCHEMES: [&str; 3] = ["http", "https", "file"];

/// A named selector scope redefining the same custom properties.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ThemeConfig {
    /// Display name, e.g. `Dark`.
    pub name: String,
    /// Selector text the theme's rules are written with, e.g. `.theme-dark`.
    pub selector: String,
}

impl ThemeConfig {
    pub fn new(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: selector.into(),
        }
    }
}

/// Where the stylesheet lives and which themes to read from it.
///
/// Deserializes from the editor settings shape:
///
/// ```json
/// { "sourceUrl": "https://cdn.example.com/theme.css",
///   "themes": [{ "name": "Light", "selector": ":root" }] }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaConfig {
    pub source_url: Url,
    /// Themes in declaration order. May be empty.
    #[serde(default)]
    pub themes: Vec<ThemeConfig>,
}

impl SchemaConfig {
    pub fn new(source_url: Url, themes: Vec<ThemeConfig>) -> Self {
        Self { source_url, themes }
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    /// Returns an error if the JSON does not describe a configuration or fails [`Self::validate`].
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).context("Invalid css schema configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from an already parsed settings value.
    ///
    /// # Errors
    /// Returns an error if the value does not describe a configuration or fails [`Self::validate`].
    pub fn from_value(value: Value) -> Result<Self> {
        let config: Self =
            serde_json::from_value(value).context("Invalid css schema configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the source URL can be fetched.
    ///
    /// # Errors
    /// Returns an error for URLs without a hierarchical scheme this crate can load from.
    pub fn validate(&self) -> Result<()> {
        let url = &self.source_url;
        if url.cannot_be_a_base() || !SUPPORTED_SCHEMES.contains(&url.scheme()) {
            bail!(
                "Unsupported source url \"{url}\": expected one of {}",
                SUPPORTED_SCHEMES.join(", ")
            );
        }
        Ok(())
    }
}
