//! `var()` reference scanning and substitution.
//!
//! See <https://www.w3.org/TR/css-variables-1/#using-variables>
//!
//! Parsing is string-based and tolerant: a `var(` without a matching `)` is left as-is, and
//! parentheses are balanced so fallbacks such as `var(--a, rgb(0 0 0))` stay intact.

use core::ops::Range;

const VAR_OPEN: &str = "var(";

/// Location of one `var(...)` expression inside a value.
struct VarExpr {
    /// Byte offset of the `v` in `var(`.
    start: usize,
    /// Argument text between the parentheses.
    args: Range<usize>,
    /// Byte offset just past the closing `)`.
    end: usize,
}

#[inline]
fn is_name_char(ch: char) -> bool {
    ch == '-' || ch == '_' || ch.is_alphanumeric()
}

/// Byte offset of the `)` closing the parenthesis opened just before `from`.
fn matching_paren(value: &str, from: usize) -> Option<usize> {
    let mut depth: usize = 1;
    for (offset, byte) in value.bytes().enumerate().skip(from) {
        match byte {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find the next well-formed `var(...)` expression starting at or after `from`.
fn next_var(value: &str, from: usize) -> Option<VarExpr> {
    let mut search = from;
    while let Some(offset) = value.get(search..).and_then(|rest| rest.find(VAR_OPEN)) {
        let start = search + offset;
        let args_start = start + VAR_OPEN.len();
        // `somevar(` is a different function.
        let standalone = value
            .get(..start)
            .and_then(|head| head.chars().next_back())
            .is_none_or(|prev| !is_name_char(prev));
        if standalone && let Some(close) = matching_paren(value, args_start) {
            return Some(VarExpr {
                start,
                args: args_start..close,
                end: close + 1,
            });
        }
        search = args_start;
    }
    None
}

/// The custom property named by the first argument of a `var()` expression.
fn var_name(args: &str) -> Option<&str> {
    let trimmed = args.trim_start();
    let rest = trimmed.strip_prefix("--")?;
    let len = rest
        .find(|ch: char| !is_name_char(ch))
        .unwrap_or(rest.len());
    if len == 0 {
        return None;
    }
    let tail = rest.get(len..)?;
    let terminated =
        tail.is_empty() || tail.starts_with(',') || tail.starts_with(char::is_whitespace);
    if !terminated {
        return None;
    }
    trimmed.get(..len + 2)
}

fn collect_names<'value>(value: &'value str, out: &mut Vec<&'value str>) {
    let mut cursor = 0;
    while let Some(expr) = next_var(value, cursor) {
        let Some(args) = value.get(expr.args) else {
            return;
        };
        if let Some(name) = var_name(args)
            && !out.contains(&name)
        {
            out.push(name);
        }
        // References nested in fallbacks.
        collect_names(args, out);
        cursor = expr.end;
    }
}

/// Names referenced through `var()` in `value`, in order of first appearance, without
/// duplicates. References nested inside fallbacks are included.
///
/// ```
/// use css_variables::referenced_names;
///
/// let names = referenced_names("var(--gap) calc(var(--gap) * 2) var(--x, var(--y))");
/// assert_eq!(names, ["--gap", "--x", "--y"]);
/// ```
pub fn referenced_names(value: &str) -> Vec<&str> {
    let mut names = Vec::new();
    collect_names(value, &mut names);
    names
}

/// Replace every `var()` expression whose property `lookup` knows by the looked-up text.
///
/// The whole expression, fallback included, is replaced. Expressions `lookup` does not
/// know are kept verbatim except for `var()` expressions nested in their arguments, which
/// are substituted in turn.
pub fn substitute<'resolved, F>(value: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<&'resolved str>,
{
    let mut out = String::with_capacity(value.len());
    let mut cursor = 0;
    while let Some(expr) = next_var(value, cursor) {
        let (Some(head), Some(args)) = (value.get(cursor..expr.start), value.get(expr.args))
        else {
            break;
        };
        out.push_str(head);
        match var_name(args).and_then(lookup) {
            Some(resolved) => out.push_str(resolved),
            None => {
                out.push_str(VAR_OPEN);
                out.push_str(&substitute(args, lookup));
                out.push(')');
            }
        }
        cursor = expr.end;
    }
    if let Some(tail) = value.get(cursor..) {
        out.push_str(tail);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_color(name: &str) -> Option<&'static str> {
        (name == "--color").then_some("#222")
    }

    #[test]
    fn names_require_a_double_dash_token() {
        assert_eq!(referenced_names("var(--a)"), ["--a"]);
        assert_eq!(referenced_names("var(  --a_b-1 )"), ["--a_b-1"]);
        assert!(referenced_names("var(a)").is_empty());
        assert!(referenced_names("var(--)").is_empty());
        assert!(referenced_names("var(--a").is_empty());
        assert!(referenced_names("somevar(--a)").is_empty());
    }

    #[test]
    fn names_are_case_sensitive() {
        assert_eq!(referenced_names("var(--Gap) var(--gap)"), ["--Gap", "--gap"]);
    }

    #[test]
    fn substitution_replaces_known_references() {
        assert_eq!(
            substitute("color-mix(in srgb, var(--color) 80%, white)", &lookup_color),
            "color-mix(in srgb, #222 80%, white)"
        );
        assert_eq!(substitute("var(--color, red)", &lookup_color), "#222");
    }

    #[test]
    fn unknown_references_keep_their_text() {
        assert_eq!(substitute("var(--other)", &lookup_color), "var(--other)");
        assert_eq!(
            substitute("var(--other, var(--color))", &lookup_color),
            "var(--other, #222)"
        );
        assert_eq!(substitute("var(--color", &lookup_color), "var(--color");
    }
}
