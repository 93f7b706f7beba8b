//! Custom property extraction for theme selectors.

use crate::annotations::CommentIndex;
use crate::graph::{DependencyGraph, PropertyMetadata};
use css_syntax::{Stylesheet, parse_stylesheet};
use log::trace;

/// A stylesheet parsed once and queried per theme selector.
#[derive(Clone, Debug, Default)]
pub struct ThemeSource {
    sheet: Stylesheet,
    comments: CommentIndex,
}

impl ThemeSource {
    pub fn parse(css: &str) -> Self {
        Self::from_stylesheet(parse_stylesheet(css))
    }

    pub fn from_stylesheet(sheet: Stylesheet) -> Self {
        let comments = CommentIndex::new(&sheet.comments);
        trace!(
            "Theme source: {} rules, {} tagged comments",
            sheet.rules.len(),
            comments.len()
        );
        Self { sheet, comments }
    }

    /// Custom properties declared in every top-level rule whose selector text equals
    /// `selector`, in source order, annotated from the comment right above each one.
    pub fn properties(&self, selector: &str) -> Vec<PropertyMetadata> {
        self.sheet
            .rules_matching(selector)
            .flat_map(|rule| rule.declarations.iter())
            .filter(|decl| decl.is_custom_property())
            .map(|decl| {
                PropertyMetadata::new(decl.name.as_str(), decl.value.as_str())
                    .with_annotations(self.comments.annotations_for(decl.line))
            })
            .collect()
    }

    /// Resolved dependency graph for one theme selector.
    pub fn graph(&self, selector: &str) -> DependencyGraph {
        DependencyGraph::new(self.properties(selector))
    }
}
