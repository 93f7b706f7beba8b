//! CSS Custom Properties for Cascading Variables Module Level 1: CSS variables.
//! See <https://www.w3.org/TR/css-variables-1/>
//!
//! Builds, per theme selector, a dependency graph of custom property declarations and
//! resolves each property's value by substituting the properties it references through
//! `var()`. Circular references are reported and left unsubstituted.

#![forbid(unsafe_code)]

pub mod annotations;
pub mod graph;
pub mod references;
pub mod theme;

pub use annotations::{Annotations, CommentIndex};
pub use graph::{CircularDependency, DependencyGraph, GraphNode, PropertyMetadata};
pub use references::{referenced_names, substitute};
pub use theme::ThemeSource;
