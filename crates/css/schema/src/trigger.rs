//! Detects when the cursor sits inside an unfinished `var(` call.

const VAR_OPEN: &str = "var(";

/// The partially typed property name when `line_before_cursor` ends inside an unclosed
/// `var(`; `None` otherwise.
///
/// ```
/// use css_schema::completion_prefix;
///
/// assert_eq!(completion_prefix("  color: var(--co"), Some("--co"));
/// assert_eq!(completion_prefix("  color: var("), Some(""));
/// assert_eq!(completion_prefix("  color: var(--a) "), None);
/// ```
pub fn completion_prefix(line_before_cursor: &str) -> Option<&str> {
    let open = line_before_cursor.rfind(VAR_OPEN)?;
    let partial = line_before_cursor.get(open + VAR_OPEN.len()..)?;
    (!partial.contains(')')).then(|| partial.trim_start())
}
