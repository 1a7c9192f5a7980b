//! Per-document shared context.
//!
//! One `DocContext` is created per generation run and threaded by mutable
//! reference through every nested parse, including transcluded files. It
//! owns the reference registry, the TOC sequence, the autonumber state and
//! the generator registry, and performs the single finalize pass that
//! resolves forward references and assembles the TOC.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::autonum::AutoNumber;
use crate::config::Config;
use crate::error::{Error, ErrorKind, Location, Result};
use crate::node::{
    Alignment, CellContent, Node, NodeKind, PageRef, Props, Run, RunContent, RunStyle, StyledRun,
    Table, TableCell,
};

/// A registered reference target.
#[derive(Debug, Clone)]
struct RefEntry {
    /// Flattened plain text of the target.
    text: String,
    /// Heading level, 0 for non-TOC anchors.
    level: u8,
}

/// A forward reference awaiting resolution, with its registration site for
/// error reporting.
#[derive(Debug)]
struct PendingRef {
    id: String,
    file: PathBuf,
    line: usize,
}

/// Input to a registered content generator.
pub struct GeneratorCall<'a> {
    /// The matched file.
    pub path: &'a Path,
    /// Inner content or caption text from the referencing directive.
    pub content: &'a str,
    /// Pending properties attached to the directive.
    pub props: &'a Props,
}

/// Callback producing nodes for generated-content transclusion.
pub type Generator = Box<dyn Fn(&GeneratorCall) -> Result<Vec<Node>>>;

/// Definition map visible to `\\insert(name)`.
#[derive(Debug, Clone, Default)]
pub struct Definitions(Map<String, Value>);

impl Definitions {
    /// Look up a definition as a string.
    pub fn get(&self, name: &str) -> Result<String> {
        match self.0.get(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Null) | None => {
                Err(ErrorKind::UndefinedDefinition(name.to_string()).into())
            }
            Some(other) => Ok(other.to_string()),
        }
    }
}

/// Shared per-document registry and configuration.
pub struct DocContext {
    pub config: Config,
    autonum: AutoNumber,
    next_heading_id: u32,
    refs: HashMap<String, RefEntry>,
    pending: Vec<PendingRef>,
    /// Heading ids in first-seen order, filtered to TOC levels.
    toc: Vec<String>,
    generators: HashMap<String, Generator>,
}

impl DocContext {
    /// Create the context for one generation run.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            autonum: AutoNumber::new(),
            next_heading_id: 1,
            refs: HashMap::new(),
            pending: Vec::new(),
            toc: Vec::new(),
            generators: HashMap::new(),
        }
    }

    /// Base directory for rooted transclusion patterns.
    pub fn base_dir(&self) -> PathBuf {
        self.config
            .input
            .base_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Look up a named style's property bag; undefined names are fatal.
    pub fn style_props(&self, name: &str) -> Result<&Props> {
        self.config
            .styles
            .get(name)
            .ok_or_else(|| ErrorKind::UndefinedStyle(name.to_string()).into())
    }

    /// Allocate the next synthetic heading id.
    pub fn next_heading_id(&mut self) -> u32 {
        let id = self.next_heading_id;
        self.next_heading_id += 1;
        id
    }

    /// Maximum heading level included in the TOC.
    pub fn max_toc_level(&self) -> u8 {
        self.config.output.toc_level.max(1)
    }

    /// Resolve and advance an autonumber pattern to its label.
    pub fn autonumber(&mut self, pattern: &str) -> String {
        self.autonum
            .label(pattern, &self.config.output.autonum_suffix)
    }

    /// Build the definition map for one file parse: configured definitions,
    /// document info fields, then per-parse overrides.
    pub fn merge_definitions(&self, overrides: Map<String, Value>) -> Definitions {
        let mut defs = self.config.define.clone();
        let info = &self.config.output.info;
        for (key, value) in [
            ("title", &info.title),
            ("author", &info.author),
            ("subject", &info.subject),
            ("keywords", &info.keywords),
            ("creator", &info.creator),
            ("producer", &info.producer),
        ] {
            defs.insert(key.to_string(), Value::String(value.clone()));
        }
        for (key, value) in overrides {
            defs.insert(key, value);
        }
        Definitions(defs)
    }

    /// Register a reference target.
    ///
    /// Later registrations of the same id overwrite the stored entry, while
    /// the TOC sequence keeps every in-range registration in first-seen
    /// order; link resolution always uses the last-written entry.
    pub fn add_ref(&mut self, id: &str, text: String, level: u8) {
        self.refs.insert(id.to_string(), RefEntry { text, level });
        if level >= 1 && level <= self.max_toc_level() {
            self.toc.push(id.to_string());
        }
    }

    /// Register a forward reference and return its placeholder run,
    /// resolved during [`finalize`](Self::finalize).
    pub fn add_forward_ref(&mut self, id: &str, file: &Path, line: usize) -> Run {
        self.pending.push(PendingRef {
            id: id.to_string(),
            file: file.to_path_buf(),
            line,
        });
        Run::Styled(Box::new(StyledRun {
            content: RunContent::PendingRef(id.to_string()),
            style: RunStyle {
                link_to: Some(id.to_string()),
                style: Some("doclink".to_string()),
                ..RunStyle::default()
            },
        }))
    }

    /// Register a generator invoked for generated-content transclusion,
    /// keyed by the matched file's stem.
    pub fn register_generator(&mut self, name: impl Into<String>, generator: Generator) {
        self.generators.insert(name.into(), generator);
    }

    /// Look up a generator by file stem.
    pub fn generator(&self, name: &str) -> Option<&Generator> {
        self.generators.get(name)
    }

    /// Resolve every forward reference and replace TOC placeholders.
    ///
    /// Must run exactly once, after the entire document tree including all
    /// transcluded sub-documents has been parsed; references may point
    /// forward or backward with respect to parse order.
    pub fn finalize(&mut self, nodes: &mut [Node]) -> Result<()> {
        for pending in &self.pending {
            if !self.refs.contains_key(&pending.id) {
                return Err(Error {
                    kind: ErrorKind::ReferenceNotFound(pending.id.clone()),
                    location: Some(Location {
                        file: pending.file.clone(),
                        line: pending.line,
                    }),
                });
            }
        }
        self.pending.clear();

        let toc = self.build_toc();
        for node in nodes {
            self.patch_node(node, &toc);
        }
        Ok(())
    }

    /// Assemble the TOC table from the recorded heading sequence.
    fn build_toc(&self) -> Node {
        let toc_style = self.config.styles.get("toc");
        let widths = toc_style
            .and_then(|s| s.get("widths"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_else(|| vec![Value::from("*"), Value::from("auto")]);

        let mut rows = Vec::with_capacity(self.toc.len());
        for id in &self.toc {
            let Some(entry) = self.refs.get(id) else {
                continue;
            };
            let title = Run::Styled(Box::new(StyledRun {
                content: RunContent::Text(entry.text.clone()),
                style: RunStyle {
                    link_to: Some(id.clone()),
                    style: Some(format!("toc{}", entry.level)),
                    ..RunStyle::default()
                },
            }));
            rows.push(vec![
                TableCell {
                    content: CellContent::Run(title),
                    alignment: None,
                    style: None,
                },
                TableCell {
                    content: CellContent::PageRef(PageRef {
                        page_reference: id.clone(),
                    }),
                    alignment: Some(Alignment::Right),
                    style: None,
                },
            ]);
        }

        let mut node = Node::new(NodeKind::Table(Table {
            rows,
            widths,
            header_rows: 0,
            layout: "toc".to_string(),
        }))
        .with_style("toc");
        if let Some(props) = toc_style {
            node = node.with_props(props.clone());
        }
        node
    }

    fn patch_node(&self, node: &mut Node, toc: &Node) {
        match &mut node.kind {
            NodeKind::Toc => {
                *node = toc.clone();
                return;
            }
            NodeKind::Paragraph { content } | NodeKind::Heading { content, .. } => {
                self.patch_run(content);
            }
            NodeKind::List { items, .. } => {
                for item in items {
                    self.patch_node(item, toc);
                }
            }
            NodeKind::Columns { columns } => {
                for column in columns {
                    self.patch_node(column, toc);
                }
            }
            NodeKind::Quote { children } | NodeKind::Stack { children } => {
                for child in children {
                    self.patch_node(child, toc);
                }
            }
            NodeKind::CodeBlock { lines } => {
                for line in lines {
                    self.patch_run(line);
                }
            }
            NodeKind::Table(table) => {
                for row in &mut table.rows {
                    for cell in row {
                        match &mut cell.content {
                            CellContent::Run(run) => self.patch_run(run),
                            CellContent::Node(inner) => self.patch_node(inner, toc),
                            CellContent::PageRef(_) => {}
                        }
                    }
                }
            }
            NodeKind::Separator | NodeKind::Image { .. } | NodeKind::PageBreak => {}
        }
    }

    fn patch_run(&self, run: &mut Run) {
        if let Run::Styled(styled) = run {
            match &mut styled.content {
                RunContent::PendingRef(id) => {
                    let text = self.refs.get(id).map(|e| e.text.clone()).unwrap_or_default();
                    styled.content = RunContent::Text(text);
                }
                RunContent::Runs(runs) => {
                    for r in runs {
                        self.patch_run(r);
                    }
                }
                RunContent::Text(_) => {}
            }
        }
    }
}
