//! Property annotations read from the comment right above a declaration.
//!
//! ```css
//! :root {
//!   /* @description Base text color @deprecated Use --color-text instead */
//!   --color-base: #111;
//! }
//! ```

use css_syntax::Comment;
use std::collections::HashMap;

/// Marks a property description.
pub const DESCRIPTION_TAG: &str = "@description";
/// Marks a property as deprecated, optionally followed by a reason.
pub const DEPRECATED_TAG: &str = "@deprecated";

const TAGS: [&str; 2] = [DESCRIPTION_TAG, DEPRECATED_TAG];

/// Metadata carried by a tagged comment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Annotations {
    pub description: Option<String>,
    pub deprecated: bool,
    pub deprecated_description: Option<String>,
}

/// Whether `text` carries any recognized tag.
#[inline]
pub fn is_tagged(text: &str) -> bool {
    TAGS.iter().any(|tag| text.contains(tag))
}

/// Drop the `*` decoration of block comments and join the lines with single spaces.
fn comment_body(text: &str) -> String {
    text.lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text following `tag` up to the next tag or the end of the comment, trimmed.
fn tag_value<'text>(text: &'text str, tag: &str) -> Option<&'text str> {
    let start = text.find(tag)? + tag.len();
    let rest = text.get(start..)?;
    let end = TAGS
        .iter()
        .filter_map(|next| rest.find(next))
        .min()
        .unwrap_or(rest.len());
    rest.get(..end).map(str::trim)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|text| !text.is_empty()).map(str::to_owned)
}

impl Annotations {
    /// Parse the tags of one comment's text.
    pub fn parse(comment: &str) -> Self {
        let body = comment_body(comment);
        Self {
            description: non_empty(tag_value(&body, DESCRIPTION_TAG)),
            deprecated: body.contains(DEPRECATED_TAG),
            deprecated_description: non_empty(tag_value(&body, DEPRECATED_TAG)),
        }
    }
}

/// Tagged comments of a stylesheet keyed by the line they end on.
#[derive(Clone, Debug, Default)]
pub struct CommentIndex {
    by_end_line: HashMap<u32, String>,
}

impl CommentIndex {
    /// Index the comments that carry at least one tag. A later comment ending on the same
    /// line replaces an earlier one.
    pub fn new(comments: &[Comment]) -> Self {
        let by_end_line = comments
            .iter()
            .filter(|comment| is_tagged(&comment.text))
            .map(|comment| (comment.end_line, comment.text.clone()))
            .collect();
        Self { by_end_line }
    }

    /// Annotations for a declaration starting on `line`.
    ///
    /// Only a comment ending on the line immediately above counts; anything further up, or
    /// on the same line, contributes nothing.
    pub fn annotations_for(&self, line: u32) -> Annotations {
        line.checked_sub(1)
            .and_then(|above| self.by_end_line.get(&above))
            .map(|text| Annotations::parse(text))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_end_line.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_end_line.is_empty()
    }
}
