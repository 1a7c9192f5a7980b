//! Block-level parser.
//!
//! Consumes lines from a [`LineCursor`] and produces document nodes.
//! Dispatch happens per line on the text after the current indent level;
//! nested content (list items, quote blocks, transclusion captions) is
//! parsed recursively at a deeper indent. A stall guard asserts that every
//! dispatch consumes at least one line.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use serde_json::{Map, Value};

use crate::context::DocContext;
use crate::error::{Error, ErrorKind, Result};
use crate::inline::{parse_inline, InlineScope};
use crate::lines::LineCursor;
use crate::node::{
    flatten_text, Alignment, CellContent, Node, NodeKind, Props, Run, RunStyle, Table, TableCell,
};
use crate::transclude::resolve_file_ref;

/// Lines that terminate paragraph accumulation. Only `1. ` starts an
/// ordered list mid-paragraph; other ordinals stay continuation text.
static RE_NOT_PLAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\s*#|-\s|\*\s|1\.\s|```|-{3,}\s*$|\\\\\{|\\\\include|\\\\image|\\\\img|\\\\toc|\\\\pagebreak)",
    )
    .unwrap()
});
static RE_TABLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\|\s*)?(:?-{3,}:?\s*\|?\s*)+$").unwrap());
static RE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-{3,}\s*$").unwrap());
static RE_DASH_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-\s").unwrap());
static RE_STAR_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\*\s").unwrap());
static RE_NUM_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s").unwrap());
static RE_DASH_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*-\s").unwrap());
static RE_STAR_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\*\s").unwrap());
static RE_NUM_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\d+\.\s").unwrap());
static RE_QUOTE_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^>\s").unwrap());
static RE_QUOTE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*>\s?").unwrap());
static RE_PROPS_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\\\\").unwrap());
static RE_STYLE_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\s*([-,;\w\s]+)\}").unwrap());
static RE_HEADING_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#+\s*").unwrap());
static RE_HEADING_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\{#([^\s}]+)\}\s*$").unwrap());
static RE_TICKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(`+)").unwrap());
static RE_BLOCK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\\\\(\w+)(?:\(([^)]+)\))?(.*)").unwrap());

/// Parse a whole source file into document nodes.
pub(crate) fn parse_file(
    path: &Path,
    ctx: &mut DocContext,
    overrides: Map<String, Value>,
) -> Result<Vec<Node>> {
    let source =
        fs::read_to_string(path).map_err(|e| Error::from(ErrorKind::Io(path.to_path_buf(), e)))?;
    debug!("parsing {}", path.display());
    parse_source(&source, path, ctx, overrides)
}

/// Parse source text into document nodes. Errors are tagged with `file` and
/// the cursor's line number unless a nested parse located them already.
pub fn parse_source(
    source: &str,
    file: &Path,
    ctx: &mut DocContext,
    overrides: Map<String, Value>,
) -> Result<Vec<Node>> {
    let defs = ctx.merge_definitions(overrides);
    let mut parser = BlockParser {
        cursor: LineCursor::new(source, defs),
        file: file.to_path_buf(),
        ctx,
        pending: None,
    };
    match parser.parse_any(0) {
        Ok(nodes) => Ok(nodes),
        Err(e) => Err(e.locate(file, parser.cursor.line_number())),
    }
}

/// Block parser state for one file.
pub(crate) struct BlockParser<'a> {
    pub(crate) cursor: LineCursor,
    pub(crate) file: PathBuf,
    pub(crate) ctx: &'a mut DocContext,
    /// Properties declared by `\\{...}` lines, applied to the next block.
    pending: Option<Props>,
}

impl BlockParser<'_> {
    /// Parse blocks as long as lines stay at `indent` or deeper.
    fn parse_any(&mut self, indent: usize) -> Result<Vec<Node>> {
        let mut content = Vec::new();
        let start = self.cursor.line_number();
        while self.cursor.has_input() {
            let line = self.cursor.peek()?.to_string();
            let i = if self.cursor.is_at(start) {
                indent
            } else {
                indent_of(&line)
            };
            let text = slice_from(&line, i).to_string();
            if i < indent && !text.is_empty() {
                return Ok(content);
            }

            let before = self.cursor.line_number();
            if text.is_empty() {
                self.cursor.shift()?;
            } else if text.starts_with("\\\\{") {
                self.parse_custom_props(i)?;
            } else if text.starts_with('#') {
                content.push(self.parse_heading(i)?);
            } else if RE_SEPARATOR.is_match(&text) {
                content.push(self.parse_separator()?);
            } else if RE_DASH_ITEM.is_match(&text) {
                content.push(self.parse_list(i, &RE_DASH_MARKER)?);
            } else if RE_STAR_ITEM.is_match(&text) {
                content.push(self.parse_list(i, &RE_STAR_MARKER)?);
            } else if RE_NUM_ITEM.is_match(&text) {
                content.push(self.parse_list(i, &RE_NUM_MARKER)?);
            } else if RE_QUOTE_START.is_match(&text) {
                content.push(self.parse_quote(i)?);
            } else if text.starts_with("```") {
                content.push(self.parse_pre(i)?);
            } else {
                let tag = RE_BLOCK_TAG.captures(&text).map(|caps| {
                    (
                        caps[1].to_lowercase(),
                        caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
                        caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default(),
                    )
                });
                match tag {
                    Some((tag, pattern, remainder))
                        if matches!(tag.as_str(), "include" | "image" | "img") =>
                    {
                        content.extend(self.parse_include(i, &tag, &pattern, &remainder)?);
                    }
                    Some((tag, _, _)) if tag == "pagebreak" => {
                        self.cursor.shift()?;
                        content.push(Node::new(NodeKind::PageBreak));
                    }
                    Some((tag, _, _)) if tag == "toc" => {
                        self.cursor.shift()?;
                        content.push(Node::new(NodeKind::Toc));
                    }
                    _ => content.push(self.parse_paragraph(i)?),
                }
            }

            // every dispatch must consume input
            if self.cursor.is_at(before) {
                let desc = if self.cursor.has_input() {
                    let next = self.cursor.peek()?;
                    if next.is_empty() {
                        "<blank line>".to_string()
                    } else {
                        next.to_string()
                    }
                } else {
                    "<end>".to_string()
                };
                return Err(ErrorKind::Stalled(desc).into());
            }
        }
        Ok(content)
    }

    /// Run the inline parser with this file's scope.
    pub(crate) fn parse_inline(&mut self, text: &str) -> Result<Vec<Run>> {
        let line = self.cursor.line_number();
        let mut scope = InlineScope {
            ctx: &mut *self.ctx,
            defs: self.cursor.definitions(),
            file: self.file.as_path(),
            line,
        };
        parse_inline(text, &mut scope)
    }

    fn take_pending(&mut self) -> Props {
        self.pending.take().unwrap_or_default()
    }

    /// Merge named styles into the pending property set.
    fn add_pending_styles(&mut self, names: &str) -> Result<()> {
        let mut merged = Props::new();
        for name in names.split([' ', '\t', ',', ';']) {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            merged.extend(self.ctx.style_props(name)?.clone());
        }
        self.pending.get_or_insert_with(Props::new).extend(merged);
        Ok(())
    }

    fn add_pending_props(&mut self, props: Props) {
        self.pending.get_or_insert_with(Props::new).extend(props);
    }

    /// Accumulate `\\{...}` lines until they form either a style name list
    /// or a valid JSON object; applies to the next block.
    fn parse_custom_props(&mut self, indent: usize) -> Result<()> {
        let mut text = String::new();
        let start = self.cursor.line_number();
        let mut last_err: Option<Error> = None;
        while self.cursor.has_input() {
            let line = self.cursor.peek()?.to_string();
            let i = indent_of(&line);
            if i < indent && !self.cursor.is_at(start) {
                break;
            }
            let part = slice_from(&line, indent);
            if !RE_PROPS_PREFIX.is_match(part) {
                break;
            }
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(RE_PROPS_PREFIX.replace(part, "").trim());
            self.cursor.shift()?;

            let applied = self.apply_props_text(&text);
            match applied {
                Ok(()) => {
                    text.clear();
                    break;
                }
                Err(e) => last_err = Some(e),
            }
        }
        if !text.is_empty() {
            return Err(last_err.unwrap_or_else(|| ErrorKind::InvalidProps(text).into()));
        }
        Ok(())
    }

    fn apply_props_text(&mut self, text: &str) -> Result<()> {
        if let Some(caps) = RE_STYLE_LIST.captures(text) {
            let names = caps[1].to_string();
            return self.add_pending_styles(&names);
        }
        let value: Value = serde_json::from_str(text)
            .map_err(|_| Error::from(ErrorKind::InvalidProps(text.to_string())))?;
        match value {
            Value::Object(map) => {
                self.add_pending_props(map);
                Ok(())
            }
            _ => Err(ErrorKind::InvalidProps(text.to_string()).into()),
        }
    }

    /// Eat the current line and emit a horizontal separator.
    fn parse_separator(&mut self) -> Result<Node> {
        self.cursor.shift()?;
        let mut props = self.ctx.style_props("separator")?.clone();
        props.extend(self.take_pending());
        Ok(Node::new(NodeKind::Separator)
            .with_style("separator")
            .with_props(props))
    }

    /// Parse a single-line heading with an optional `{#id}` anchor.
    fn parse_heading(&mut self, indent: usize) -> Result<Node> {
        let line = self.cursor.shift()?;
        let text = slice_from(&line, indent);
        let level = text.chars().take_while(|&c| c == '#').count() as u8;
        let mut text = RE_HEADING_PREFIX.replace(text, "").into_owned();

        // the counter advances for every heading, anchored or not
        let synthetic = format!("heading__{}", self.ctx.next_heading_id());
        let mut id = None;
        if let Some(caps) = RE_HEADING_ANCHOR.captures(&text) {
            id = Some(caps[1].to_string());
            let range = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            text.replace_range(range, "");
        }
        let id = id.unwrap_or(synthetic);

        let mut runs = self.parse_inline(&text)?;
        for run in &mut runs {
            if run.style_name() == Some("autonum") {
                run.set_style_name(format!("autonum_h{level}"));
            }
        }
        self.ctx
            .add_ref(&id, crate::node::flatten_runs(&runs, ""), level);

        let mut node = Node::new(NodeKind::Heading {
            level,
            content: Run::from_parts(runs),
        })
        .with_style(format!("h{level}"));
        node.id = Some(id);
        Ok(node.with_props(self.take_pending()))
    }

    /// Accumulate paragraph lines; a table separator line turns the
    /// accumulated text into a table heading instead.
    fn parse_paragraph(&mut self, indent: usize) -> Result<Node> {
        let props = self.take_pending();
        let start = self.cursor.line_number();
        let mut paragraph = String::new();
        while self.cursor.has_input() {
            let line = self.cursor.peek()?.to_string();
            let i = if self.cursor.is_at(start) {
                indent
            } else {
                indent_of(&line)
            };
            if i < indent || line.chars().count() <= i {
                break;
            }
            let mut text = slice_from(&line, i).to_string();
            if text.ends_with('\\') {
                text.pop();
                text.push('\n');
            }
            if RE_NOT_PLAIN.is_match(&text) {
                break;
            }
            if RE_TABLE_SEPARATOR.is_match(&text) {
                return self.parse_table(i, &std::mem::take(&mut paragraph), props);
            }
            if !paragraph.is_empty() {
                paragraph.push(' ');
            }
            paragraph.push_str(&text);
            self.cursor.shift()?;
        }
        let runs = self.parse_inline(&paragraph)?;
        Ok(Node::new(NodeKind::Paragraph {
            content: Run::from_parts(runs),
        })
        .with_style("p")
        .with_props(props))
    }

    /// Parse a pipe table. `first_line` is the already-accumulated heading
    /// row; the next buffered line is the alignment separator.
    fn parse_table(&mut self, indent: usize, first_line: &str, mut props: Props) -> Result<Node> {
        let header_rows = usize::from(!first_line.is_empty());

        // column count and alignment from the separator line
        let sep_line = self.cursor.shift()?;
        let sep: Vec<String> = sep_line.split('|').map(|s| s.trim().to_string()).collect();
        let mut widths: Vec<Value> = Vec::new();
        let mut alignment: Vec<Option<Alignment>> = vec![None; sep.len()];
        for (i, col) in sep.iter().enumerate() {
            if col.is_empty() {
                continue;
            }
            widths.push(Value::from("auto"));
            if col.ends_with(':') {
                alignment[i] = Some(if col.starts_with(':') {
                    Alignment::Center
                } else {
                    Alignment::Right
                });
            }
        }

        let mut rows: Vec<Vec<TableCell>> = Vec::new();
        if header_rows == 1 {
            self.table_row(first_line, "tableHeader", &sep, &alignment, widths.len(), &mut rows)?;
        }
        loop {
            let line = self.cursor.peek()?.to_string();
            let i = indent_of(&line);
            if i < indent || line.chars().count() <= i {
                break;
            }
            let line = self.cursor.shift()?;
            let text = slice_from(&line, i).to_string();
            self.table_row(&text, "tableCell", &sep, &alignment, widths.len(), &mut rows)?;
        }

        if let Some(w) = props.get("widths").and_then(Value::as_array) {
            widths = w.clone();
        }
        let layout = match props.remove("layout") {
            Some(Value::String(s)) => s,
            _ => "default".to_string(),
        };
        Ok(Node::new(NodeKind::Table(Table {
            rows,
            widths,
            header_rows,
            layout,
        }))
        .with_style("table")
        .with_props(props))
    }

    /// Parse one table row, splitting plain runs on unescaped pipes.
    fn table_row(
        &mut self,
        text: &str,
        style: &str,
        sep: &[String],
        alignment: &[Option<Alignment>],
        width_count: usize,
        rows: &mut Vec<Vec<TableCell>>,
    ) -> Result<()> {
        let runs = self.parse_inline(text)?;
        let mut cols: Vec<Vec<Run>> = vec![Vec::new()];
        for run in runs {
            let run = match run {
                Run::Text(s) => {
                    let mut parts = split_unescaped_pipes(&s);
                    if parts.len() > 1 {
                        let tail = parts.pop().unwrap_or_default();
                        for part in parts {
                            if let Some(current) = cols.last_mut() {
                                if current.is_empty() {
                                    current.push(Run::Text(part.trim().to_string()));
                                } else if !part.is_empty() {
                                    current.push(Run::Text(part.trim_end().to_string()));
                                }
                            }
                            cols.push(Vec::new());
                        }
                        Run::Text(tail.trim_start().to_string())
                    } else {
                        Run::Text(s)
                    }
                }
                other => other,
            };
            if let Some(current) = cols.last_mut() {
                let only_empty = current.len() == 1
                    && matches!(&current[0], Run::Text(t) if t.is_empty());
                if only_empty {
                    current[0] = run;
                } else {
                    current.push(run);
                }
            }
        }

        let mut row: Vec<TableCell> = Vec::new();
        for (i, col) in cols.into_iter().enumerate() {
            let sep_empty = sep.get(i).map(|s| s.is_empty()).unwrap_or(true);
            let col_trivial = col.is_empty()
                || (col.len() == 1 && matches!(&col[0], Run::Text(t) if t.is_empty()));
            if sep_empty && col_trivial {
                continue;
            }
            row.push(TableCell {
                content: CellContent::Run(Run::from_parts(col)),
                alignment: alignment.get(i).copied().flatten(),
                style: Some(style.to_string()),
            });
        }
        if row.len() != width_count {
            let mut preview = row
                .iter()
                .map(|cell| match &cell.content {
                    CellContent::Run(run) => flatten_text(run),
                    _ => String::new(),
                })
                .collect::<Vec<_>>()
                .join(" | ");
            if preview.chars().count() > 40 {
                preview = preview.chars().take(37).collect::<String>() + "...";
            }
            return Err(ErrorKind::TableRowLength(preview).into());
        }
        rows.push(row);
        Ok(())
    }

    /// Parse list items at `indent` that start with `marker`.
    fn parse_list(&mut self, indent: usize, marker: &Regex) -> Result<Node> {
        let first = self.cursor.peek()?;
        let is_ordered = slice_from(first, indent)
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit());
        let mut props = self.take_pending();
        let start = self.cursor.line_number();

        let mut items: Vec<Node> = Vec::new();
        while self.cursor.has_input() {
            let line = self.cursor.peek()?.to_string();
            let i = if self.cursor.is_at(start) {
                indent
            } else {
                indent_of(&line)
            };
            let text = slice_from(&line, i);
            if text.is_empty() {
                // blank lines between items stay inside the list
                self.cursor.shift()?;
                continue;
            }
            if i < indent || !marker.is_match(text) {
                break;
            }
            let stripped = marker.replace(text, "");
            let text_indent = line.chars().count() - stripped.chars().count();
            let item = self.parse_any(text_indent)?;
            items.push(list_item(item));
        }

        if props.contains_key("table") {
            return self.list_to_table(items, props);
        }
        if props.contains_key("columns") || props.contains_key("columnGap") {
            props.remove("columns");
            return Ok(list_to_columns(items, props));
        }

        let style = match (is_ordered, indent > 0) {
            (true, true) => "ol_inner",
            (true, false) => "ol",
            (false, true) => "ul_inner",
            (false, false) => "ul",
        };
        Ok(Node::new(NodeKind::List {
            ordered: is_ordered,
            items,
        })
        .with_style(style)
        .with_props(props))
    }

    /// Convert a list of nested unordered lists into a table, one row per
    /// top-level item.
    fn list_to_table(&mut self, items: Vec<Node>, mut props: Props) -> Result<Node> {
        let layout = match props.remove("table") {
            Some(Value::String(s)) => s,
            _ => "default".to_string(),
        };
        let header_rows = props
            .get("headerRows")
            .and_then(Value::as_u64)
            .unwrap_or(1) as usize;
        let widths = props
            .get("widths")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut rows: Vec<Vec<TableCell>> = Vec::new();
        for (i, item) in items.into_iter().enumerate() {
            let Some(cells) = row_cells(item) else {
                continue;
            };
            let cell_style = if i >= header_rows {
                "tableCell"
            } else {
                "tableHeader"
            };
            let row = cells
                .into_iter()
                .map(|mut cell| {
                    if cell.style.as_deref() == Some("li") {
                        cell.style = Some(cell_style.to_string());
                    }
                    TableCell {
                        content: CellContent::Node(Box::new(cell)),
                        alignment: None,
                        style: None,
                    }
                })
                .collect();
            rows.push(row);
        }
        if rows.is_empty() {
            return Err(ErrorKind::EmptyTable.into());
        }

        Ok(Node::new(NodeKind::Table(Table {
            rows,
            widths,
            header_rows,
            layout,
        }))
        .with_style("table")
        .with_props(props))
    }

    /// Parse a fenced preformatted block; replacements stay disabled so the
    /// content is kept verbatim.
    fn parse_pre(&mut self, indent: usize) -> Result<Node> {
        let first_line = self.cursor.shift()?;
        let ticks = RE_TICKS
            .captures(&first_line)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| "```".to_string());
        let start = self.cursor.line_number();

        let mut code_style = RunStyle::named("code");
        code_style
            .extra
            .insert("preserveLeadingSpaces".to_string(), Value::Bool(true));

        let mut lines: Vec<Run> = Vec::new();
        self.cursor.set_replacements(false);
        while self.cursor.has_input() {
            let line = self.cursor.peek()?.to_string();
            let i = if self.cursor.is_at(start) {
                indent
            } else {
                indent_of(&line)
            };
            let text = slice_from(&line, indent).to_string();
            if i < indent && !text.is_empty() {
                break;
            }
            self.cursor.shift()?;
            if text.starts_with(&ticks) {
                break;
            }
            // blank lines keep their place as non-breaking spaces
            let text = if text.is_empty() {
                "\u{00A0}".to_string()
            } else {
                text
            };
            lines.push(Run::styled(text, code_style.clone()));
        }
        self.cursor.set_replacements(true);

        let mut props = Props::new();
        if lines.len() <= 5 {
            props.insert("unbreakable".to_string(), Value::Bool(true));
        }
        props.extend(self.take_pending());
        Ok(Node::new(NodeKind::CodeBlock { lines })
            .with_style("pre")
            .with_props(props))
    }

    /// Parse a `>`-prefixed quote block by re-parsing the stripped lines.
    fn parse_quote(&mut self, indent: usize) -> Result<Node> {
        let start = self.cursor.line_number();
        let mut collected: Vec<String> = Vec::new();
        while self.cursor.has_input() {
            let line = self.cursor.peek()?;
            let i = indent_of(line);
            if i != indent || line.chars().nth(i) != Some('>') {
                break;
            }
            let line = self.cursor.shift()?;
            collected.push(RE_QUOTE_PREFIX.replace(&line, "").into_owned());
        }

        let defs = self.cursor.definitions().clone();
        let mut sub = BlockParser {
            cursor: LineCursor::from_lines(collected, start, defs),
            file: self.file.clone(),
            ctx: &mut *self.ctx,
            pending: None,
        };
        let mut children = sub.parse_any(0)?;

        // a lone paragraph renders as plain text inside the block
        if children.len() == 1 && children[0].style.as_deref() == Some("p") {
            children[0].style = None;
        }
        let mut node = Node::new(NodeKind::Quote { children }).with_style("block");
        node.props
            .insert("unbreakable".to_string(), Value::Bool(true));
        Ok(node.with_props(self.take_pending()))
    }

    /// Parse an `\\include`/`\\image` directive, transcluding matched files.
    fn parse_include(
        &mut self,
        indent: usize,
        tag: &str,
        pattern: &str,
        remainder: &str,
    ) -> Result<Vec<Node>> {
        self.cursor.shift()?;
        if pattern.is_empty() {
            return Err(ErrorKind::MissingFileName(tag.to_string()).into());
        }
        let props = self.take_pending();
        resolve_file_ref(pattern, remainder, self, indent, props)
    }
}

/// Wrap parsed item content as a single list item node.
fn list_item(mut nodes: Vec<Node>) -> Node {
    if nodes.len() == 1 {
        let mut node = nodes.remove(0);
        if matches!(node.kind, NodeKind::List { .. }) {
            return node;
        }
        if matches!(node.style.as_deref(), None | Some("p")) {
            node.style = Some("li".to_string());
        }
        node
    } else {
        Node::new(NodeKind::Stack { children: nodes }).with_style("li")
    }
}

/// The nested unordered list forming one table row, if the item has one.
fn row_cells(item: Node) -> Option<Vec<Node>> {
    match item.kind {
        NodeKind::List {
            ordered: false,
            items,
        } => Some(items),
        NodeKind::Stack { children } => children.into_iter().find_map(|child| match child.kind {
            NodeKind::List {
                ordered: false,
                items,
            } => Some(items),
            _ => None,
        }),
        _ => None,
    }
}

/// Convert list items to a column group, assigning configured widths
/// positionally.
fn list_to_columns(mut items: Vec<Node>, props: Props) -> Node {
    if let Some(Value::Array(widths)) = props.get("widths").cloned() {
        for (i, width) in widths.into_iter().enumerate() {
            if let Some(item) = items.get_mut(i) {
                item.props.insert("width".to_string(), width);
            }
        }
    }
    Node::new(NodeKind::Columns { columns: items })
        .with_style("block_outer")
        .with_props(props)
}

/// Number of leading whitespace characters.
pub(crate) fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// The line content from character position `n` on; empty past the end.
pub(crate) fn slice_from(line: &str, n: usize) -> &str {
    line.char_indices()
        .nth(n)
        .map(|(i, _)| &line[i..])
        .unwrap_or("")
}

/// Split on `|` characters not preceded by a backslash, unescaping `\|`.
fn split_unescaped_pipes(s: &str) -> Vec<String> {
    let mut parts = vec![String::new()];
    let mut prev_escape = false;
    for c in s.chars() {
        if c == '|' {
            if prev_escape {
                if let Some(last) = parts.last_mut() {
                    last.pop();
                    last.push('|');
                }
            } else {
                parts.push(String::new());
            }
            prev_escape = false;
            continue;
        }
        if let Some(last) = parts.last_mut() {
            last.push(c);
        }
        prev_escape = c == '\\';
    }
    parts
}
