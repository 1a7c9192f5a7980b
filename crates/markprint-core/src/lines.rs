//! Line cursor for the block parser.
//!
//! Splits input into an owned line buffer and provides peek/consume access
//! with 1-based line numbers. Each line is preprocessed on access: HTML
//! comments are stripped and start-of-line `\\insert(name)` tags are
//! expanded, repeating the line's leading prefix across every line of a
//! multi-line definition. Preprocessing is disabled inside code fences.

use std::collections::VecDeque;
use std::sync::LazyLock;

use memchr::memchr2_iter;
use regex::Regex;

use crate::context::Definitions;
use crate::error::Result;

static RE_COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<!--(.*?)-->").unwrap());
static RE_INSERT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([-*> \t]+)\\\\insert\s*\(([^\s)]+)\)").unwrap());

/// Peek/consume cursor over preprocessed input lines.
pub struct LineCursor {
    lines: VecDeque<String>,
    /// 1-based number of the line currently at the front.
    line_no: usize,
    no_replace: bool,
    defs: Definitions,
}

impl LineCursor {
    /// Create a cursor over the given source text.
    pub fn new(text: &str, defs: Definitions) -> Self {
        Self {
            lines: split_lines(text),
            line_no: 1,
            no_replace: false,
            defs,
        }
    }

    /// Create a sub-cursor over already-collected lines, numbering them
    /// from `start_line` so errors still map to the source file.
    pub fn from_lines(lines: Vec<String>, start_line: usize, defs: Definitions) -> Self {
        Self {
            lines: lines.into(),
            line_no: start_line,
            no_replace: false,
            defs,
        }
    }

    /// The current 1-based line number.
    pub fn line_number(&self) -> usize {
        self.line_no
    }

    /// Check whether the cursor is at the given line number.
    pub fn is_at(&self, line: usize) -> bool {
        self.line_no == line
    }

    /// Check whether more lines are available.
    pub fn has_input(&self) -> bool {
        !self.lines.is_empty()
    }

    /// The definition map used for insert expansion.
    pub fn definitions(&self) -> &Definitions {
        &self.defs
    }

    /// Peek the next line after preprocessing; empty at end of input.
    pub fn peek(&mut self) -> Result<&str> {
        self.preprocess_front()?;
        Ok(self.lines.front().map(String::as_str).unwrap_or(""))
    }

    /// Consume and return the next line; empty at end of input.
    pub fn shift(&mut self) -> Result<String> {
        self.line_no += 1;
        self.preprocess_front()?;
        Ok(self.lines.pop_front().unwrap_or_default())
    }

    /// Enable or disable input-level replacements (comments, insert tags);
    /// disabled inside code fences so their content stays verbatim.
    pub fn set_replacements(&mut self, enabled: bool) {
        self.no_replace = !enabled;
    }

    /// Replace comments and expand a start-of-line insert tag on the front
    /// line. A multi-line definition is spliced into the buffer with the
    /// original line prefix repeated on every inserted line.
    fn preprocess_front(&mut self) -> Result<()> {
        if self.no_replace || self.lines.is_empty() {
            return Ok(());
        }
        let line = &self.lines[0];
        let mut replaced = RE_COMMENT.replace_all(line, "").into_owned();
        if let Some(caps) = RE_INSERT_LINE.captures(&replaced) {
            let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
            let prefix = &caps[1];
            let value = self.defs.get(&caps[2])?;
            let mut def_lines = value.split('\n');
            let first = def_lines.next().unwrap_or("");
            let rest: Vec<String> = def_lines.map(|s| format!("{prefix}{s}")).collect();
            let mut expanded = String::with_capacity(replaced.len() + value.len());
            expanded.push_str(prefix);
            expanded.push_str(first);
            expanded.push_str(&replaced[whole.1..]);
            for (i, extra) in rest.into_iter().enumerate() {
                self.lines.insert(1 + i, extra);
            }
            replaced = expanded;
        }
        self.lines[0] = replaced;
        Ok(())
    }
}

/// Split source text into lines. LF, CR, CRLF and LFCR each count as one
/// line break.
fn split_lines(text: &str) -> VecDeque<String> {
    let bytes = text.as_bytes();
    let mut lines = VecDeque::new();
    let mut start = 0;
    let mut prev_break: Option<(usize, u8)> = None;
    for i in memchr2_iter(b'\n', b'\r', bytes) {
        if let Some((at, byte)) = prev_break {
            if i == at + 1 && bytes[i] != byte {
                // second half of a two-byte break
                prev_break = None;
                start = i + 1;
                continue;
            }
        }
        lines.push_back(text[start..i].to_string());
        start = i + 1;
        prev_break = Some((i, bytes[i]));
    }
    if start < bytes.len() {
        lines.push_back(text[start..].to_string());
    }
    lines
}
