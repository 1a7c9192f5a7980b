//! Styled document tree.
//!
//! Output of the parsing engine: a flat sequence of block [`Node`]s, each
//! carrying inline [`Run`] content. Nodes serialize to the renderer's JSON
//! shape, with block kind, style name, id and free-form properties merged
//! into a single object.

use std::path::PathBuf;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

/// Free-form property bag attached to nodes, cells and runs.
pub type Props = serde_json::Map<String, Value>;

/// A block-level node of the document tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Reference anchor.
    pub id: Option<String>,
    /// Style name resolved by the renderer.
    pub style: Option<String>,
    /// Additional renderer properties.
    pub props: Props,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            id: None,
            style: None,
            props: Props::new(),
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Merge a property bag into the node. String-valued `style` and `id`
    /// entries land in the typed fields, so explicit properties override
    /// defaults set earlier.
    pub fn with_props(mut self, props: Props) -> Self {
        for (key, value) in props {
            match (key.as_str(), &value) {
                ("style", Value::String(s)) => self.style = Some(s.clone()),
                ("id", Value::String(s)) => self.id = Some(s.clone()),
                _ => {
                    self.props.insert(key, value);
                }
            }
        }
        self
    }
}

/// The block-level content kinds.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Paragraph {
        content: Run,
    },
    Heading {
        /// 1-based heading level.
        level: u8,
        content: Run,
    },
    List {
        ordered: bool,
        items: Vec<Node>,
    },
    Columns {
        columns: Vec<Node>,
    },
    Table(Table),
    /// Indented quote block containing nested block content.
    Quote {
        children: Vec<Node>,
    },
    /// Preformatted block, one run per source line.
    CodeBlock {
        lines: Vec<Run>,
    },
    /// Plain vertical grouping of nodes.
    Stack {
        children: Vec<Node>,
    },
    Separator,
    Image {
        path: PathBuf,
    },
    PageBreak,
    /// Placeholder replaced with the assembled TOC table during finalize.
    Toc,
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match &self.kind {
            NodeKind::Paragraph { content } => {
                map.serialize_entry("text", content)?;
            }
            NodeKind::Heading { level, content } => {
                map.serialize_entry("text", content)?;
                map.serialize_entry("headlineLevel", level)?;
            }
            NodeKind::List { ordered, items } => {
                map.serialize_entry(if *ordered { "ol" } else { "ul" }, items)?;
            }
            NodeKind::Columns { columns } => {
                map.serialize_entry("columns", columns)?;
            }
            NodeKind::Table(table) => {
                map.serialize_entry("table", table)?;
                map.serialize_entry("layout", &table.layout)?;
            }
            NodeKind::Quote { children } => {
                map.serialize_entry("quote", children)?;
            }
            NodeKind::CodeBlock { lines } => {
                map.serialize_entry("code", lines)?;
            }
            NodeKind::Stack { children } => {
                map.serialize_entry("stack", children)?;
            }
            NodeKind::Separator => {
                map.serialize_entry("separator", &true)?;
            }
            NodeKind::Image { path } => {
                map.serialize_entry("image", path)?;
            }
            NodeKind::PageBreak => {
                map.serialize_entry("stack", &[(); 0])?;
                map.serialize_entry("pageBreak", "after")?;
            }
            NodeKind::Toc => {
                map.serialize_entry("toc", &true)?;
            }
        }
        if let Some(id) = &self.id {
            map.serialize_entry("id", id)?;
        }
        if let Some(style) = &self.style {
            map.serialize_entry("style", style)?;
        }
        for (key, value) in &self.props {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Table content: the node-level `layout` is serialized next to the table
/// object, not inside it.
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    #[serde(rename = "body")]
    pub rows: Vec<Vec<TableCell>>,
    pub widths: Vec<Value>,
    #[serde(rename = "headerRows")]
    pub header_rows: usize,
    #[serde(skip)]
    pub layout: String,
}

/// One table cell.
#[derive(Debug, Clone, Serialize)]
pub struct TableCell {
    #[serde(flatten)]
    pub content: CellContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

/// Cell payload: inline runs, a nested block, or a page-number reference.
#[derive(Debug, Clone)]
pub enum CellContent {
    Run(Run),
    Node(Box<Node>),
    PageRef(PageRef),
}

impl Serialize for CellContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellContent::Run(run) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("text", run)?;
                map.end()
            }
            CellContent::Node(node) => node.serialize(serializer),
            CellContent::PageRef(page_ref) => page_ref.serialize(serializer),
        }
    }
}

/// Resolved at render time to the page number of the referenced anchor.
#[derive(Debug, Clone, Serialize)]
pub struct PageRef {
    #[serde(rename = "pageReference")]
    pub page_reference: String,
}

/// Horizontal cell alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Text decoration kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Decoration {
    Underline,
    Overline,
    LineThrough,
}

/// Inline content: plain text or a styled run.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Run {
    Text(String),
    Styled(Box<StyledRun>),
}

impl Run {
    /// Wrap text with formatting.
    pub fn styled(text: impl Into<String>, style: RunStyle) -> Self {
        Run::Styled(Box::new(StyledRun {
            content: RunContent::Text(text.into()),
            style,
        }))
    }

    /// Collapse parsed parts: empty becomes empty text, a single part is
    /// used as-is, several parts become an unformatted container.
    pub fn from_parts(mut parts: Vec<Run>) -> Self {
        match parts.len() {
            0 => Run::Text(String::new()),
            1 => parts.remove(0),
            _ => Run::Styled(Box::new(StyledRun {
                content: RunContent::Runs(parts),
                style: RunStyle::default(),
            })),
        }
    }

    /// The run's style name, if any.
    pub fn style_name(&self) -> Option<&str> {
        match self {
            Run::Text(_) => None,
            Run::Styled(styled) => styled.style.style.as_deref(),
        }
    }

    /// Replace the run's style name; no-op for plain text runs.
    pub fn set_style_name(&mut self, name: impl Into<String>) {
        if let Run::Styled(styled) = self {
            styled.style.style = Some(name.into());
        }
    }
}

/// A run with formatting, serialized as `{ "text": …, …style }`.
#[derive(Debug, Clone, Serialize)]
pub struct StyledRun {
    #[serde(rename = "text")]
    pub content: RunContent,
    #[serde(flatten)]
    pub style: RunStyle,
}

/// Payload of a styled run.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RunContent {
    Text(String),
    Runs(Vec<Run>),
    /// Unresolved reference id, replaced with the target's text during
    /// finalize.
    PendingRef(String),
}

/// Formatting attached to a run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italics: Option<bool>,
    /// Style name resolved by the renderer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoration: Option<Decoration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoration_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoration_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    /// External link URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Internal link target id.
    #[serde(rename = "linkToDestination", skip_serializing_if = "Option::is_none")]
    pub link_to: Option<String>,
    /// Reference anchor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Additional renderer properties.
    #[serde(flatten)]
    pub extra: Props,
}

impl RunStyle {
    /// Formatting that only sets a style name.
    pub fn named(style: impl Into<String>) -> Self {
        Self {
            style: Some(style.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bold.is_none()
            && self.italics.is_none()
            && self.style.is_none()
            && self.decoration.is_none()
            && self.decoration_style.is_none()
            && self.decoration_color.is_none()
            && self.color.is_none()
            && self.font.is_none()
            && self.link.is_none()
            && self.link_to.is_none()
            && self.id.is_none()
            && self.extra.is_empty()
    }
}

/// Flatten a run to plain text, collapsing whitespace sequences to single
/// spaces. Unresolved references flatten to nothing.
pub fn flatten_text(run: &Run) -> String {
    match run {
        Run::Text(s) => collapse_whitespace(s),
        Run::Styled(styled) => match &styled.content {
            RunContent::Text(s) => collapse_whitespace(s),
            RunContent::Runs(runs) => flatten_runs(runs, ""),
            RunContent::PendingRef(_) => String::new(),
        },
    }
}

/// Flatten a sequence of runs, joined by `separator`.
pub fn flatten_runs(runs: &[Run], separator: &str) -> String {
    let joined = runs
        .iter()
        .map(flatten_text)
        .collect::<Vec<_>>()
        .join(separator);
    collapse_whitespace(&joined)
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
