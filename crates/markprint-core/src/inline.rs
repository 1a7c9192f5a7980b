//! Character-level inline parser.
//!
//! Recursive descent over a text span producing styled runs. Constructs are
//! tried in fixed priority at every position; paired delimiters, link
//! bodies and tag bodies run against a transactional cursor clone that is
//! only committed back on success, so a missing closing delimiter safely
//! degrades to literal text.

use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::context::{Definitions, DocContext};
use crate::error::{ErrorKind, Result};
use crate::node::{Decoration, Props, Run, RunContent, RunStyle, StyledRun};

static RE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^`([^`]*)`").unwrap());
static RE_AUTONUM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\\\\((?:\([^\s).]*\)\.|\[[^\s\].]*\]\.)+)(?:\{#([^\s}]+)\})?").unwrap()
});
static RE_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[[^\]]*\]\([^)]+\)").unwrap());
static RE_LINK_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\(([^)]+)\)").unwrap());
static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\\\\(\w+)").unwrap());
static RE_TAG_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\\\\w+(?:\(([^)]*)\))?\{").unwrap());
static RE_INSERT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\\\insert\s*\(([^\s)]+)\)").unwrap());
static RE_ESCAPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\\\S").unwrap());
static RE_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\p{L}\p{N}]+").unwrap());

/// Punctuation that an escaping backslash is dropped for.
const ESCAPABLE: &str = "\\`*_{}[]()<>#+-.!'\"";

/// Shared state the inline parser needs from the enclosing block parse.
pub struct InlineScope<'a> {
    pub ctx: &'a mut DocContext,
    pub defs: &'a Definitions,
    pub file: &'a Path,
    pub line: usize,
}

/// Parse a text span into styled runs.
pub fn parse_inline(text: &str, scope: &mut InlineScope<'_>) -> Result<Vec<Run>> {
    let mut parser = InlineParser { scope };
    let mut cursor = Cursor { text, pos: 0 };
    let runs = parser.parse_until(&mut cursor, None, None)?;
    // No terminator was expected, so the parse always completes.
    Ok(runs.unwrap_or_default())
}

/// Character cursor with committed-text lookbehind.
#[derive(Clone, Copy)]
struct Cursor<'t> {
    text: &'t str,
    pos: usize,
}

impl<'t> Cursor<'t> {
    fn ahead(&self) -> &'t str {
        &self.text[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek(&self) -> Option<char> {
        self.ahead().chars().next()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.ahead().starts_with(prefix)
    }

    /// Consume `n` bytes (callers pass lengths of matched text).
    fn shift(&mut self, n: usize) -> &'t str {
        let taken = &self.text[self.pos..self.pos + n];
        self.pos += n;
        taken
    }

    fn shift_char(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn captures(&self, re: &Regex) -> Option<Captures<'t>> {
        re.captures(self.ahead())
    }

    /// Whether the last consumed character is non-whitespace (smart quotes).
    fn behind_nonspace(&self) -> bool {
        self.text[..self.pos]
            .chars()
            .next_back()
            .is_some_and(|c| !c.is_whitespace())
    }
}

/// Run a nested parse against a cursor clone; commit only on success.
fn attempt<T>(
    cursor: &mut Cursor<'_>,
    f: impl FnOnce(&mut Cursor<'_>) -> Result<Option<T>>,
) -> Result<Option<T>> {
    let mut trial = *cursor;
    let result = f(&mut trial)?;
    if result.is_some() {
        *cursor = trial;
    }
    Ok(result)
}

/// Clone inherited formatting and apply an override.
fn derive_style(props: Option<&RunStyle>, f: impl FnOnce(&mut RunStyle)) -> RunStyle {
    let mut style = props.cloned().unwrap_or_default();
    f(&mut style);
    style
}

/// Collapse parts and assign additional formatting onto the result.
fn assign_style(parts: Vec<Run>, f: impl FnOnce(&mut RunStyle)) -> Run {
    let mut styled = match Run::from_parts(parts) {
        Run::Text(s) => StyledRun {
            content: RunContent::Text(s),
            style: RunStyle::default(),
        },
        Run::Styled(boxed) => *boxed,
    };
    f(&mut styled.style);
    Run::Styled(Box::new(styled))
}

/// Merge a named style's property bag into run formatting; keys the run
/// model types explicitly are interpreted, the rest pass through.
fn merge_style_props(style: &mut RunStyle, bag: &Props) {
    for (key, value) in bag {
        match (key.as_str(), value) {
            ("bold", Value::Bool(b)) => style.bold = Some(*b),
            ("italics", Value::Bool(b)) => style.italics = Some(*b),
            ("color", Value::String(s)) => style.color = Some(s.clone()),
            ("font", Value::String(s)) => style.font = Some(s.clone()),
            ("style", Value::String(s)) => style.style = Some(s.clone()),
            _ => {
                style.extra.insert(key.clone(), value.clone());
            }
        }
    }
}

struct InlineParser<'a, 'b> {
    scope: &'a mut InlineScope<'b>,
}

impl InlineParser<'_, '_> {
    /// Parse until the expected terminator; `None` when a terminator was
    /// expected but the input ran out (signals the caller to backtrack).
    fn parse_until(
        &mut self,
        cursor: &mut Cursor<'_>,
        expect: Option<&str>,
        props: Option<&RunStyle>,
    ) -> Result<Option<Vec<Run>>> {
        let mut result: Vec<Run> = Vec::new();
        let mut literal = String::new();

        loop {
            if let Some(terminator) = expect {
                if cursor.starts_with(terminator) {
                    break;
                }
            }
            if cursor.at_end() {
                if expect.is_some() {
                    return Ok(None);
                }
                break;
            }

            if let Some(run) = self.match_construct(cursor, props)? {
                flush(&mut literal, &mut result, props);
                result.push(run);
                continue;
            }

            self.take_punctuation(cursor, &mut literal);
        }

        flush(&mut literal, &mut result, props);
        Ok(Some(result))
    }

    /// Try every construct in fixed priority; the first match wins.
    fn match_construct(
        &mut self,
        cursor: &mut Cursor<'_>,
        props: Option<&RunStyle>,
    ) -> Result<Option<Run>> {
        if let Some(run) = self.code_span(cursor)? {
            return Ok(Some(run));
        }
        for (delim, bold, italics, strike) in [
            ("**", true, false, false),
            ("__", true, false, false),
            ("*", false, true, false),
            ("_", false, true, false),
            ("~~", false, false, true),
        ] {
            let style = derive_style(props, |s| {
                if bold {
                    s.bold = Some(true);
                }
                if italics {
                    s.italics = Some(true);
                }
                if strike {
                    s.decoration = Some(Decoration::LineThrough);
                }
            });
            if let Some(run) = self.paired(cursor, delim, &style)? {
                return Ok(Some(run));
            }
        }
        if let Some(run) = self.autonum(cursor, props)? {
            return Ok(Some(run));
        }
        if let Some(run) = self.link(cursor, props)? {
            return Ok(Some(run));
        }
        self.tag(cursor, props)
    }

    /// Inline literal (code) span.
    fn code_span(&mut self, cursor: &mut Cursor<'_>) -> Result<Option<Run>> {
        let Some(caps) = cursor.captures(&RE_CODE) else {
            return Ok(None);
        };
        let text = caps[1].to_string();
        cursor.shift(caps[0].len());
        Ok(Some(Run::styled(text, RunStyle::named("code"))))
    }

    /// Content between paired delimiters, with merged formatting.
    fn paired(
        &mut self,
        cursor: &mut Cursor<'_>,
        delim: &str,
        style: &RunStyle,
    ) -> Result<Option<Run>> {
        if !cursor.starts_with(delim) {
            return Ok(None);
        }
        let parsed = attempt(cursor, |trial| {
            trial.shift(delim.len());
            self.parse_until(trial, Some(delim), Some(style))
        })?;
        match parsed {
            Some(parts) => {
                cursor.shift(delim.len());
                Ok(Some(Run::from_parts(parts)))
            }
            None => Ok(None),
        }
    }

    /// Autonumber token, e.g. `\\(chapter).[item].{#anchor}`.
    fn autonum(
        &mut self,
        cursor: &mut Cursor<'_>,
        props: Option<&RunStyle>,
    ) -> Result<Option<Run>> {
        let Some(caps) = cursor.captures(&RE_AUTONUM) else {
            return Ok(None);
        };
        let pattern = caps[1].to_string();
        let anchor = caps.get(2).map(|m| m.as_str().to_string());
        cursor.shift(caps[0].len());

        let label = self.scope.ctx.autonumber(&pattern);
        let style = derive_style(props, |s| {
            s.style = Some("autonum".to_string());
            s.id = anchor.clone();
        });
        if let Some(id) = &anchor {
            self.scope.ctx.add_ref(id, label.trim().to_string(), 0);
        }
        Ok(Some(Run::styled(label, style)))
    }

    /// `[text](target)` links: internal references and external hyperlinks.
    fn link(&mut self, cursor: &mut Cursor<'_>, props: Option<&RunStyle>) -> Result<Option<Run>> {
        if cursor.captures(&RE_LINK).is_none() {
            return Ok(None);
        }
        attempt(cursor, |trial| {
            trial.shift(1);
            let Some(text) = self.parse_until(trial, Some("]"), props)? else {
                return Ok(None);
            };
            trial.shift(1);
            let Some(caps) = trial.captures(&RE_LINK_URL) else {
                return Ok(None);
            };
            let url = caps[1].trim().to_string();
            trial.shift(caps[0].len());

            if let Some(id) = url.strip_prefix('#') {
                if text.is_empty() {
                    // Forward reference: text is patched during finalize.
                    let scope = &mut *self.scope;
                    return Ok(Some(scope.ctx.add_forward_ref(id, scope.file, scope.line)));
                }
                let id = id.to_string();
                return Ok(Some(assign_style(text, |s| {
                    s.link_to = Some(id);
                    s.style = Some("doclink".to_string());
                })));
            }
            Ok(Some(assign_style(text, |s| {
                s.link = Some(url);
                s.style = Some("link".to_string());
            })))
        })
    }

    /// Inline tags: bare tags, `insert`, and `\\name(params){body}`.
    fn tag(&mut self, cursor: &mut Cursor<'_>, props: Option<&RunStyle>) -> Result<Option<Run>> {
        let Some(caps) = cursor.captures(&RE_TAG) else {
            return Ok(None);
        };
        let tag = caps[1].to_lowercase();

        match tag.as_str() {
            "blank" => {
                cursor.shift("\\\\blank".len());
                return Ok(Some(Run::Text(String::new())));
            }
            "newline" => {
                cursor.shift("\\\\newline".len());
                return Ok(Some(Run::Text("\n".to_string())));
            }
            "v" | "verb" | "verbatim" => {
                cursor.shift(tag.len() + 2);
                let stop = cursor.shift_char();
                let mut text = String::new();
                while let Some(c) = cursor.shift_char() {
                    if Some(c) == stop {
                        break;
                    }
                    text.push(c);
                }
                let run = match props {
                    Some(style) => Run::styled(text, style.clone()),
                    None => Run::Text(text),
                };
                return Ok(Some(run));
            }
            _ => {}
        }

        if let Some(caps) = cursor.captures(&RE_INSERT) {
            // Mid-line insert; start-of-line inserts are expanded by the
            // line cursor because they repeat the line prefix.
            let name = caps[1].to_string();
            cursor.shift(caps[0].len());
            return Ok(Some(Run::Text(self.scope.defs.get(&name)?)));
        }

        let parsed = attempt(cursor, |trial| {
            let Some(caps) = trial.captures(&RE_TAG_BODY) else {
                return Ok(None);
            };
            let params = caps.get(1).map(|m| m.as_str()).unwrap_or("").to_string();
            let style = self.tag_style(&tag, &params, props)?;
            trial.shift(caps[0].len());
            self.parse_until(trial, Some("}"), Some(&style))
        })?;
        match parsed {
            Some(parts) => {
                cursor.shift(1);
                Ok(Some(Run::from_parts(parts)))
            }
            None => Ok(None),
        }
    }

    /// Formatting for a body tag, merged on top of inherited properties.
    fn tag_style(
        &mut self,
        tag: &str,
        params: &str,
        props: Option<&RunStyle>,
    ) -> Result<RunStyle> {
        let mut style = props.cloned().unwrap_or_default();
        match tag {
            "bold" | "b" => style.bold = Some(true),
            "italics" | "italic" | "i" => style.italics = Some(true),
            "code" | "kbd" => style.style = Some("code".to_string()),
            "underline" | "overline" | "strikethrough" | "linethrough" => {
                style.decoration = Some(match tag {
                    "underline" => Decoration::Underline,
                    "overline" => Decoration::Overline,
                    // Both strikethrough aliases normalize to one kind.
                    _ => Decoration::LineThrough,
                });
                let mut parts = params.trim().split_whitespace();
                if let Some(deco_style) = parts.next() {
                    style.decoration_style = Some(deco_style.to_string());
                }
                if let Some(deco_color) = parts.next() {
                    style.decoration_color = Some(deco_color.to_string());
                }
            }
            "symbol" | "sym" => {
                style.font = Some("Symbol".to_string());
                style.bold = Some(false);
                style.italics = Some(false);
            }
            "color" => style.color = Some(params.trim().to_string()),
            "style" => {
                let bag = self.scope.ctx.style_props(params.trim())?.clone();
                merge_style_props(&mut style, &bag);
            }
            _ => return Err(ErrorKind::InvalidInlineTag(tag.to_string()).into()),
        }
        Ok(style)
    }

    /// Punctuation fallthrough: escapes, em dash, ellipsis, smart quotes,
    /// or one run of letters/digits, or a single arbitrary character.
    fn take_punctuation(&mut self, cursor: &mut Cursor<'_>, literal: &mut String) {
        if let Some(m) = cursor.captures(&RE_ESCAPE) {
            let escaped = m[0].chars().nth(1).unwrap_or('\\');
            cursor.shift(m[0].len());
            if escaped == '~' {
                literal.push('\u{00A0}');
            } else {
                if !ESCAPABLE.contains(escaped) {
                    literal.push('\\');
                }
                literal.push(escaped);
            }
        } else if cursor.starts_with("--") {
            cursor.shift(2);
            literal.push('\u{2014}');
        } else if cursor.starts_with("...") {
            cursor.shift(3);
            literal.push('\u{2026}');
        } else if cursor.peek() == Some('\'') {
            literal.push(if cursor.behind_nonspace() { '\u{2019}' } else { '\u{2018}' });
            cursor.shift(1);
        } else if cursor.peek() == Some('"') {
            literal.push(if cursor.behind_nonspace() { '\u{201D}' } else { '\u{201C}' });
            cursor.shift(1);
        } else if let Some(m) = cursor.captures(&RE_WORD) {
            literal.push_str(cursor.shift(m[0].len()));
        } else if let Some(c) = cursor.shift_char() {
            literal.push(c);
        }
    }
}

/// Push accumulated literal text as a run, styled with inherited formatting.
fn flush(literal: &mut String, result: &mut Vec<Run>, props: Option<&RunStyle>) {
    if literal.is_empty() {
        return;
    }
    let text = std::mem::take(literal);
    match props {
        Some(style) => result.push(Run::styled(text, style.clone())),
        None => result.push(Run::Text(text)),
    }
}
