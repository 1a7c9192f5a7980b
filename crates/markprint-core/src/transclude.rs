//! File transclusion.
//!
//! Resolves `\\include`/`\\image` directives: glob-expands the referenced
//! pattern, then inserts each match as an image, a parsed sub-document, or
//! the output of a registered generator, depending on each matched file's
//! extension. Content indented below the directive is collected first and
//! passed along as caption text or the `content` definition.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::block::{indent_of, parse_file, slice_from, BlockParser};
use crate::context::GeneratorCall;
use crate::error::{ErrorKind, Result};
use crate::node::{Node, NodeKind, Props, Run};

enum FileKind {
    Image,
    Document,
    Generated,
}

/// Resolve a file reference directive into document nodes.
///
/// Transclusion depth is unbounded; a file including itself recurses until
/// the stack runs out.
pub(crate) fn resolve_file_ref(
    pattern: &str,
    caption: &str,
    parser: &mut BlockParser<'_>,
    indent: usize,
    props: Props,
) -> Result<Vec<Node>> {
    // content indented below the directive line
    let mut inner: Vec<String> = Vec::new();
    let mut first_inner = indent + 8;
    while parser.cursor.has_input() {
        let line = parser.cursor.peek()?.to_string();
        if line.is_empty() {
            // blank lines are kept once inner content has started
            parser.cursor.shift()?;
            if !inner.is_empty() {
                inner.push(String::new());
            }
            continue;
        }
        let next_indent = indent_of(&line);
        if next_indent <= indent {
            break;
        }
        if next_indent < first_inner {
            first_inner = next_indent;
        }
        inner.push(parser.cursor.shift()?);
    }
    let inner: Vec<String> = inner
        .iter()
        .map(|s| slice_from(s, first_inner).to_string())
        .collect();

    let pattern = pattern.trim();

    // relative patterns resolve against the including file, rooted ones
    // against the configured base directory
    let cwd = if pattern.starts_with('/') {
        parser.ctx.base_dir()
    } else {
        parser
            .file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    };
    let full_pattern = cwd.join(pattern.trim_start_matches('/'));
    let mut files: Vec<PathBuf> = glob::glob(&full_pattern.to_string_lossy())
        .map_err(|_| ErrorKind::FileNotFound(pattern.to_string()))?
        .filter_map(|entry| entry.ok())
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(ErrorKind::FileNotFound(pattern.to_string()).into());
    }

    let mut result = Vec::new();
    for path in files {
        // dispatch per matched file; zero matches were already fatal above
        let kind = match path
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase)
            .unwrap_or_default()
            .as_str()
        {
            "jpg" | "jpeg" | "png" => FileKind::Image,
            "md" | "txt" => FileKind::Document,
            "gen" => FileKind::Generated,
            _ => return Err(ErrorKind::UnknownFileType(path.display().to_string()).into()),
        };
        match kind {
            FileKind::Image => {
                let caption_text = if !inner.is_empty() {
                    inner.join(" ")
                } else {
                    caption.trim().to_string()
                };
                let caption_runs = if caption_text.is_empty() {
                    None
                } else {
                    Some(parser.parse_inline(&caption_text)?)
                };
                result.push(make_image(path, caption_runs, &props));
            }
            FileKind::Document => {
                let content = if !inner.is_empty() {
                    inner.join("\n")
                } else {
                    caption.trim().to_string()
                };
                let mut overrides = serde_json::Map::new();
                overrides.insert("content".to_string(), Value::String(content));
                result.extend(parse_file(&path, parser.ctx, overrides)?);
            }
            FileKind::Generated => {
                let stem = path
                    .file_stem()
                    .and_then(OsStr::to_str)
                    .unwrap_or_default()
                    .to_string();
                let content = if !inner.is_empty() {
                    inner.join("\n")
                } else {
                    caption.trim().to_string()
                };
                let call = GeneratorCall {
                    path: &path,
                    content: &content,
                    props: &props,
                };
                match parser.ctx.generator(&stem) {
                    Some(generator) => result.extend(generator(&call)?),
                    None => return Err(ErrorKind::UnknownGenerator(stem).into()),
                }
            }
        }
    }
    Ok(result)
}

/// An image with an optional caption, grouped so they stay together.
fn make_image(path: PathBuf, caption: Option<Vec<Run>>, props: &Props) -> Node {
    let image = Node::new(NodeKind::Image { path })
        .with_style("img")
        .with_props(props.clone());
    let mut children = vec![image];
    if let Some(runs) = caption {
        children.push(
            Node::new(NodeKind::Paragraph {
                content: Run::from_parts(runs),
            })
            .with_style("caption"),
        );
    }
    let mut node = Node::new(NodeKind::Stack { children });
    node.props
        .insert("unbreakable".to_string(), Value::Bool(true));
    node
}
