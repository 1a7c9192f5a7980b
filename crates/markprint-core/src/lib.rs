//! # Markprint Core
//!
//! A markdown-dialect parsing engine producing a styled document tree.
//!
//! Source text is parsed into a flat sequence of block nodes (headings,
//! paragraphs, lists, tables, quote and code blocks) carrying styled inline
//! runs, ready to be serialized for a print renderer. On top of the basic
//! dialect the engine supports hierarchical autonumbering, document-wide
//! cross references with a generated table of contents, and transclusion of
//! other files through glob patterns.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::path::Path;
//! use markprint_core::{parse_source, Config, DocContext};
//!
//! let mut ctx = DocContext::new(Config::default());
//! let nodes = parse_source(
//!     "# Hello\n\nA **bold** statement.",
//!     Path::new("doc.md"),
//!     &mut ctx,
//!     Default::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(nodes.len(), 2);
//! ```
//!
//! ## Documents
//!
//! A full document is parsed from its configured entry file; transcluded
//! files share one [`DocContext`], so references and autonumbering work
//! across file boundaries:
//!
//! ```rust,no_run
//! use markprint_core::{parse_document, Config, DocContext};
//!
//! let mut ctx = DocContext::new(Config::default());
//! let nodes = parse_document(&mut ctx).unwrap();
//! println!("parsed {} blocks", nodes.len());
//! ```

pub mod autonum;
pub mod block;
pub mod config;
pub mod context;
pub mod error;
mod inline;
mod lines;
pub mod node;
mod transclude;

pub use block::parse_source;
pub use config::{Config, DocInfo, InputConfig, OutputConfig};
pub use context::{Definitions, DocContext, Generator, GeneratorCall};
pub use error::{Error, ErrorKind, Location, Result};
pub use node::{
    flatten_runs, flatten_text, Alignment, CellContent, Decoration, Node, NodeKind, PageRef,
    Props, Run, RunContent, RunStyle, StyledRun, Table, TableCell,
};

/// Parse the configured entry file into the final document tree.
///
/// Runs the finalize pass afterwards, so forward references are resolved
/// and `\\toc` placeholders are replaced with the assembled table of
/// contents. The context must be fresh; finalize runs exactly once.
pub fn parse_document(ctx: &mut DocContext) -> Result<Vec<Node>> {
    let entry = ctx.base_dir().join(&ctx.config.input.entry);
    let mut nodes = block::parse_file(&entry, ctx, serde_json::Map::new())?;
    ctx.finalize(&mut nodes)?;
    Ok(nodes)
}
