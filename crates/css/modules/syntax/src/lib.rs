//! CSS Syntax Module Level 3: rule, declaration and comment extraction.
//! See <https://www.w3.org/TR/css-syntax-3/>
//!
//! Only what the custom property tooling needs is extracted: top-level style rules with
//! their declarations and source lines, plus every comment in the sheet with the line it
//! ends on. At-rules are skipped.
use cssparser::AtRuleParser as CssAtRuleParser;
use cssparser::BasicParseErrorKind;
use cssparser::CowRcStr;
use cssparser::DeclarationParser as CssDeclarationParser;
use cssparser::ParseError;
use cssparser::Parser;
use cssparser::ParserInput;
use cssparser::ParserState;
use cssparser::QualifiedRuleParser as CssQualifiedRuleParser;
use cssparser::RuleBodyItemParser as CssRuleBodyItemParser;
use cssparser::RuleBodyParser as CssRuleBodyParser;
use cssparser::StyleSheetParser;
use cssparser::Token;

/// A single CSS declaration (property: value [!important]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// Property name. Custom properties (`--*`) keep their case, others are lowercased.
    pub name: String,
    /// Whitespace-normalized value text (without trailing !important).
    pub value: String,
    /// Whether the declaration was marked as `!important`.
    pub important: bool,
    /// Zero-based line on which the property name starts.
    pub line: u32,
}

impl Declaration {
    /// Whether this declaration defines a custom property (`--*`).
    #[inline]
    pub fn is_custom_property(&self) -> bool {
        self.name.starts_with("--")
    }
}

/// A single style rule with a normalized prelude and parsed declarations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleRule {
    /// Prelude text (typically the selector list), trimmed with whitespace runs collapsed.
    pub prelude: String,
    /// Declarations within the rule block, in source order.
    pub declarations: Vec<Declaration>,
}

/// A comment found anywhere in the stylesheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    /// Text between `/*` and `*/`.
    pub text: String,
    /// Zero-based line on which the comment ends.
    pub end_line: u32,
}

/// A parsed stylesheet consisting of style rules and the comment stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stylesheet {
    /// Top-level style rules in source order.
    pub rules: Vec<StyleRule>,
    /// Every comment in source order, including those nested inside blocks.
    pub comments: Vec<Comment>,
}

impl Stylesheet {
    /// Iterate over the rules whose prelude equals `selector` exactly.
    ///
    /// This is plain string equality on the normalized prelude: `.a, .b` does not match `.a`.
    pub fn rules_matching<'sheet>(
        &'sheet self,
        selector: &'sheet str,
    ) -> impl Iterator<Item = &'sheet StyleRule> + 'sheet {
        let wanted = normalize_css_text(selector);
        self.rules
            .iter()
            .filter(move |rule| rule.prelude == wanted)
    }
}

/// Trim `text`, drop its comments and collapse every run of whitespace or comments into a
/// single space. Quoted strings keep their exact text.
pub fn normalize_css_text(text: &str) -> String {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    component_text(&mut parser)
}

/// Closing character of a block opened by `token`.
fn closing_char(token: &Token<'_>) -> char {
    match token {
        Token::SquareBracketBlock => ']',
        Token::CurlyBracketBlock => '}',
        _ => ')',
    }
}

/// Append the remaining tokens of `input` to `out` with their source text, except that
/// whitespace and comments become a single space.
fn write_tokens<'input>(input: &mut Parser<'input, '_>, out: &mut String) {
    loop {
        let start = input.position();
        let Ok(token) = input.next_including_whitespace_and_comments().cloned() else {
            return;
        };
        match token {
            Token::WhiteSpace(_) | Token::Comment(_) => {
                if !out.is_empty() && !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                out.push_str(input.slice_from(start));
                let nested = input.parse_nested_block(|block| {
                    write_tokens(block, out);
                    Ok::<(), ParseError<'input, ()>>(())
                });
                if nested.is_err() {
                    return;
                }
                let close = closing_char(&token);
                // Unterminated blocks at the end of input stay unterminated.
                if input.slice_from(start).ends_with(close) {
                    out.push(close);
                }
            }
            _ => out.push_str(input.slice_from(start)),
        }
    }
}

/// Normalized text of everything left in `input`, without trailing whitespace.
fn component_text(input: &mut Parser<'_, '_>) -> String {
    let mut text = String::new();
    write_tokens(input, &mut text);
    text.truncate(text.trim_end().len());
    text
}

/// Whether a `{}` block appears at the top level of what is left in `input`.
fn has_top_level_block(input: &mut Parser<'_, '_>) -> bool {
    let state = input.state();
    let mut found = false;
    while let Ok(token) = input.next_including_whitespace_and_comments() {
        if matches!(token, Token::CurlyBracketBlock) {
            found = true;
            break;
        }
    }
    input.reset(&state);
    found
}

/// Parse `!important` at the end of a value, returning (`value_without_important`, `important_flag`).
fn split_important_tail(value: &str) -> (&str, bool) {
    let trimmed = value.trim();
    if let Some(prefix) = trimmed.strip_suffix("important")
        && let Some(head) = prefix.trim_end().strip_suffix('!')
    {
        return (head.trim_end(), true);
    }
    (trimmed, false)
}

/// A declaration parser that records property name, raw value and start line.
struct BodyDeclParser;

impl CssDeclarationParser<'_> for BodyDeclParser {
    type Declaration = Declaration;
    type Error = ();

    fn parse_value<'input>(
        &mut self,
        name: CowRcStr<'input>,
        input: &mut Parser<'input, '_>,
        decl_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'input, Self::Error>> {
        let custom = name.starts_with("--");
        if !custom && has_top_level_block(input) {
            // `a:hover { ... }` is a nested rule, reparsed as such by the body parser.
            return Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid));
        }
        let raw = component_text(input);
        let (value, important) = split_important_tail(&raw);
        let name = if custom {
            (*name).to_owned()
        } else {
            name.to_ascii_lowercase()
        };
        Ok(Declaration {
            name,
            value: value.to_owned(),
            important,
            line: decl_start.source_location().line,
        })
    }
}

impl CssAtRuleParser<'_> for BodyDeclParser {
    type Prelude = ();
    type AtRule = Declaration; // Not produced
    type Error = ();

    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        _name: CowRcStr<'input>,
        _input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Ok(())
    }

    #[inline]
    fn parse_block<'input>(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::AtRule, ParseError<'input, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::AtRuleBodyInvalid))
    }

    #[inline]
    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
    ) -> Result<Self::AtRule, Self::Error> {
        Err(())
    }
}

impl CssQualifiedRuleParser<'_> for BodyDeclParser {
    type Prelude = ();
    type QualifiedRule = Declaration; // Not produced
    type Error = ();

    /// Nested style rules are consumed whole so the declarations after them survive.
    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        while input.next_including_whitespace_and_comments().is_ok() {}
        Ok(())
    }

    #[inline]
    fn parse_block<'input>(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::QualifiedRule, ParseError<'input, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }
}

impl CssRuleBodyItemParser<'_, Declaration, ()> for BodyDeclParser {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        true
    }
}

/// Top-level parser that builds `StyleRule` items for qualified rules.
struct TopLevelParser;

impl CssAtRuleParser<'_> for TopLevelParser {
    type Prelude = ();
    type AtRule = StyleRule;
    type Error = ();

    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        _name: CowRcStr<'input>,
        _input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Ok(())
    }

    #[inline]
    fn parse_block<'input>(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::AtRule, ParseError<'input, Self::Error>> {
        // At-rule blocks (`@media`, `@layer`, ...) are not top-level style rules.
        Err(input.new_error(BasicParseErrorKind::AtRuleBodyInvalid))
    }

    #[inline]
    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
    ) -> Result<Self::AtRule, Self::Error> {
        Err(())
    }
}

impl CssQualifiedRuleParser<'_> for TopLevelParser {
    type Prelude = String;
    type QualifiedRule = StyleRule;
    type Error = ();

    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Ok(component_text(input))
    }

    #[inline]
    fn parse_block<'input>(
        &mut self,
        prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::QualifiedRule, ParseError<'input, Self::Error>> {
        let declarations = parse_declarations_from_block(input);
        Ok(StyleRule {
            prelude,
            declarations,
        })
    }
}

/// Parse declarations from a rule block using `cssparser` body parser.
fn parse_declarations_from_block(block: &mut Parser) -> Vec<Declaration> {
    let mut out: Vec<Declaration> = Vec::new();
    let mut body = BodyDeclParser;
    for decl in CssRuleBodyParser::new(block, &mut body).flatten() {
        out.push(decl);
    }
    out
}

/// Walk every token (descending into blocks) and record comments with their end line.
fn collect_comments<'input>(input: &mut Parser<'input, '_>, out: &mut Vec<Comment>) {
    loop {
        let Ok(token) = input.next_including_whitespace_and_comments().cloned() else {
            return;
        };
        match token {
            Token::Comment(text) => out.push(Comment {
                text: text.to_owned(),
                end_line: input.current_source_location().line,
            }),
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                let nested = input.parse_nested_block(|block| {
                    collect_comments(block, out);
                    Ok::<(), ParseError<'input, ()>>(())
                });
                if nested.is_err() {
                    return;
                }
            }
            _ => {}
        }
    }
}

/// Collect every comment of `css` in source order.
pub fn parse_comments(css: &str) -> Vec<Comment> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut comments = Vec::new();
    collect_comments(&mut parser, &mut comments);
    comments
}

/// Parse a full stylesheet into a `Stylesheet` using cssparser.
pub fn parse_stylesheet(css: &str) -> Stylesheet {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut top = TopLevelParser;
    let mut sheet = Stylesheet::default();
    for rule in StyleSheetParser::new(&mut parser, &mut top).flatten() {
        sheet.rules.push(rule);
    }
    sheet.comments = parse_comments(css);
    sheet
}
