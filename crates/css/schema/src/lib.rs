//! Completion and hover data for CSS custom properties, resolved per theme.
//!
//! A [`CssSchema`] is populated from a remote stylesheet: the text is fetched once, each
//! configured theme selector gets its own resolved dependency graph, and queries read from
//! the graphs published so far. Until a load completes, queries see an empty schema.

pub mod config;
pub mod fetch;
pub mod schema;
pub mod trigger;
pub mod workspace;

pub use config::{SchemaConfig, ThemeConfig};
pub use fetch::{FetchError, FetchOptions, HttpFetcher, SourceFetcher};
pub use schema::{CompletionEntry, CssSchema, ThemeValue, VariableDetails, normalize_name};
pub use trigger::completion_prefix;
pub use workspace::WorkspaceSchemas;
