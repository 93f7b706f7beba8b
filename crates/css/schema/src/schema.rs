//! Theme graphs and the completion/hover projection built from them.

use crate::config::{SchemaConfig, ThemeConfig};
use crate::fetch::{FetchError, SourceFetcher};
use css_variables::{DependencyGraph, GraphNode, ThemeSource};
use log::{debug, error};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Turn user input into a property name: leading hyphens are dropped and `--` prepended.
///
/// `"color"`, `"-color"` and `"--color"` all become `--color`; empty input becomes `--`,
/// which prefixes every custom property.
pub fn normalize_name(input: &str) -> String {
    format!("--{}", input.trim_start_matches('-'))
}

/// One completion suggestion, merged across every theme defining the property.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEntry {
    /// Full property name.
    pub label: String,
    /// Description from the first theme declaring the property.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Markdown with the deprecation note and one value block per theme.
    pub documentation_markdown: String,
    pub deprecated: bool,
}

impl CompletionEntry {
    fn first_seen(node: &GraphNode) -> Self {
        let metadata = node.metadata();
        let documentation_markdown = match (metadata.deprecated, &metadata.deprecated_description) {
            (false, _) => String::new(),
            (true, Some(reason)) => format!("`[deprecated]: {reason}`"),
            (true, None) => String::from("`[deprecated]`"),
        };
        Self {
            label: metadata.name.clone(),
            detail: metadata.description.clone(),
            documentation_markdown,
            deprecated: metadata.deprecated,
        }
    }

    fn push_theme(&mut self, theme: &str, node: &GraphNode) {
        let docs = &mut self.documentation_markdown;
        if !docs.is_empty() {
            docs.push_str("\n\n");
        }
        docs.push_str(&format!("**`{theme}:`**\n\n"));
        if node.is_substituted() {
            docs.push_str(node.raw_value());
            docs.push_str("\n\n");
        }
        docs.push_str(node.resolved_value());
    }
}

/// A property's values in one theme.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeValue {
    pub theme_name: String,
    /// Resolved value.
    pub value: String,
    /// Declared value.
    pub original_value: String,
}

/// Hover data for one property.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDetails {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated_description: Option<String>,
    /// Every theme defining the property, in theme declaration order.
    pub per_theme_values: Vec<ThemeValue>,
}

/// The resolved graph of one configured theme.
#[derive(Clone, Debug)]
struct ThemeGraph {
    name: String,
    graph: DependencyGraph,
}

/// Resolved custom properties of every configured theme.
///
/// Graphs are published one theme at a time, each only once fully built. Queries never
/// fail: before anything is published they return empty results.
#[derive(Debug, Default)]
pub struct CssSchema {
    themes: RwLock<Vec<ThemeGraph>>,
}

impl CssSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a schema and start loading it in the background.
    ///
    /// The returned schema is empty until the load publishes its graphs. A failed load is
    /// logged once and leaves the schema empty; the handle resolves to the same outcome.
    pub fn spawn<F>(config: SchemaConfig, fetcher: F) -> (Arc<Self>, JoinHandle<Result<(), FetchError>>)
    where
        F: SourceFetcher + 'static,
    {
        let schema = Arc::new(Self::new());
        let loader = Arc::clone(&schema);
        let handle = tokio::spawn(async move {
            let loaded = loader.load(&config, &fetcher).await;
            if let Err(err) = &loaded {
                error!("Failed to load css schema: {err}");
            }
            loaded
        });
        (schema, handle)
    }

    /// Fetch the configured stylesheet and publish a graph per theme.
    ///
    /// # Errors
    /// Returns the fetch failure; nothing is published in that case.
    pub async fn load<F>(&self, config: &SchemaConfig, fetcher: &F) -> Result<(), FetchError>
    where
        F: SourceFetcher,
    {
        let css = fetcher.fetch(&config.source_url).await?;
        self.load_css(&css, &config.themes);
        Ok(())
    }

    /// Build and publish the graphs of `themes` from stylesheet text.
    pub fn load_css(&self, css: &str, themes: &[ThemeConfig]) {
        let source = ThemeSource::parse(css);
        for theme in themes {
            let graph = source.graph(&theme.selector);
            debug!(
                "Theme \"{}\" ({}): {} custom properties",
                theme.name,
                theme.selector,
                graph.len()
            );
            self.publish(ThemeGraph {
                name: theme.name.clone(),
                graph,
            });
        }
    }

    /// A theme configured twice keeps its first position and its latest graph.
    fn publish(&self, theme: ThemeGraph) {
        let mut themes = self.themes.write();
        if let Some(existing) = themes.iter_mut().find(|known| known.name == theme.name) {
            *existing = theme;
        } else {
            themes.push(theme);
        }
    }

    /// Names of the published themes, in declaration order.
    pub fn theme_names(&self) -> Vec<String> {
        self.themes
            .read()
            .iter()
            .map(|theme| theme.name.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.read().is_empty()
    }

    /// Properties whose name starts with the normalized `partial`, one entry per name.
    ///
    /// Description and deprecation come only from the first theme (in declaration order)
    /// defining the property; every defining theme adds its own value block.
    pub fn completions(&self, partial: &str) -> Vec<CompletionEntry> {
        let prefix = normalize_name(partial);
        let themes = self.themes.read();
        let mut entries: Vec<CompletionEntry> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for theme in themes.iter() {
            for node in theme.graph.iter().filter(|node| node.name().starts_with(&prefix)) {
                let position = *positions.entry(node.name()).or_insert_with(|| {
                    entries.push(CompletionEntry::first_seen(node));
                    entries.len() - 1
                });
                if let Some(entry) = entries.get_mut(position) {
                    entry.push_theme(&theme.name, node);
                }
            }
        }
        entries
    }

    /// Hover data for `name`, or `None` when no theme defines it.
    pub fn variable_details(&self, name: &str) -> Option<VariableDetails> {
        let name = normalize_name(name);
        let themes = self.themes.read();
        let mut defining = themes
            .iter()
            .filter_map(|theme| theme.graph.get(&name).map(|node| (theme, node)))
            .peekable();

        let (_, first) = defining.peek()?;
        let metadata = first.metadata();
        let mut details = VariableDetails {
            name: name.clone(),
            description: metadata.description.clone(),
            deprecated: metadata.deprecated,
            deprecated_description: metadata.deprecated_description.clone(),
            per_theme_values: Vec::new(),
        };
        details.per_theme_values = defining
            .map(|(theme, node)| ThemeValue {
                theme_name: theme.name.clone(),
                value: node.resolved_value().to_owned(),
                original_value: node.raw_value().to_owned(),
            })
            .collect();
        Some(details)
    }
}
