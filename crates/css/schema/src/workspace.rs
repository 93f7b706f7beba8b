//! Schemas of every open workspace, owned by the request handlers.

use crate::config::SchemaConfig;
use crate::fetch::{FetchError, SourceFetcher};
use crate::schema::{CompletionEntry, CssSchema, VariableDetails};
use crate::trigger::completion_prefix;
use anyhow::Error;
use log::warn;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Configuration and schema of one workspace.
#[derive(Debug)]
struct WorkspaceEntry {
    config: SchemaConfig,
    schema: Arc<CssSchema>,
}

/// Workspace URI to schema map, built once at startup and passed to request handlers.
#[derive(Debug, Default)]
pub struct WorkspaceSchemas {
    workspaces: HashMap<String, WorkspaceEntry>,
}

impl WorkspaceSchemas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the configuration fetched for each workspace and start loading its schema.
    ///
    /// Workspaces whose configuration could not be fetched are logged and skipped. The
    /// returned handles resolve when the corresponding loads finish.
    pub fn load<F, I>(&mut self, entries: I, fetcher: &F) -> Vec<JoinHandle<Result<(), FetchError>>>
    where
        F: SourceFetcher + Clone + 'static,
        I: IntoIterator<Item = (String, Result<SchemaConfig, Error>)>,
    {
        let mut loads = Vec::new();
        for (uri, config) in entries {
            match config {
                Ok(loaded) => {
                    let (schema, load) = CssSchema::spawn(loaded.clone(), fetcher.clone());
                    loads.push(load);
                    self.workspaces.insert(
                        uri,
                        WorkspaceEntry {
                            config: loaded,
                            schema,
                        },
                    );
                }
                Err(err) => warn!("Failed to load configuration from \"{uri}\": {err:#}"),
            }
        }
        loads
    }

    pub fn schema(&self, uri: &str) -> Option<Arc<CssSchema>> {
        self.workspaces
            .get(uri)
            .map(|entry| Arc::clone(&entry.schema))
    }

    pub fn config(&self, uri: &str) -> Option<&SchemaConfig> {
        self.workspaces.get(uri).map(|entry| &entry.config)
    }

    pub fn workspace_uris(&self) -> impl Iterator<Item = &str> {
        self.workspaces.keys().map(String::as_str)
    }

    /// Completions for a cursor in `uri` with `line_before_cursor` typed on its line.
    ///
    /// Empty unless the workspace is known and the cursor is inside an unclosed `var(`.
    pub fn completions(&self, uri: &str, line_before_cursor: &str) -> Vec<CompletionEntry> {
        let Some(entry) = self.workspaces.get(uri) else {
            return Vec::new();
        };
        completion_prefix(line_before_cursor)
            .map(|partial| entry.schema.completions(partial))
            .unwrap_or_default()
    }

    pub fn variable_details(&self, uri: &str, name: &str) -> Option<VariableDetails> {
        self.workspaces.get(uri)?.schema.variable_details(name)
    }
}
