//! Integration tests for file transclusion and whole-document parsing

use std::fs;

use markprint_core::{
    flatten_text, parse_document, parse_source, Config, DocContext, Node, NodeKind, Run,
};
use serde_json::json;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) {
    fs::write(dir.path().join(name), content).unwrap();
}

fn parse_in(dir: &TempDir, input: &str) -> Vec<Node> {
    let mut ctx = DocContext::new(Config::default());
    parse_in_ctx(dir, input, &mut ctx)
}

fn parse_in_ctx(dir: &TempDir, input: &str, ctx: &mut DocContext) -> Vec<Node> {
    parse_source(input, &dir.path().join("index.md"), ctx, Default::default()).unwrap()
}

fn paragraph_text(node: &Node) -> String {
    match &node.kind {
        NodeKind::Paragraph { content } => flatten_text(content),
        other => panic!("expected paragraph, got {other:?}"),
    }
}

// ============================================================================
// Markdown Transclusion Tests
// ============================================================================

#[test]
fn test_include_single_file() {
    let dir = TempDir::new().unwrap();
    write(&dir, "part.md", "included text");
    let nodes = parse_in(&dir, "before\n\n\\\\include(part.md)\n\nafter");
    assert_eq!(nodes.len(), 3);
    assert_eq!(paragraph_text(&nodes[1]), "included text");
}

#[test]
fn test_include_glob_in_sorted_order() {
    let dir = TempDir::new().unwrap();
    write(&dir, "ch2.md", "two");
    write(&dir, "ch1.md", "one");
    let nodes = parse_in(&dir, "\\\\include(ch*.md)");
    assert_eq!(nodes.len(), 2);
    assert_eq!(paragraph_text(&nodes[0]), "one");
    assert_eq!(paragraph_text(&nodes[1]), "two");
}

#[test]
fn test_include_resolves_relative_to_including_file() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    write(&dir, "sub/inner.md", "deep");
    write(&dir, "sub/outer.md", "\\\\include(inner.md)");
    let nodes = parse_in(&dir, "\\\\include(sub/outer.md)");
    assert_eq!(paragraph_text(&nodes[0]), "deep");
}

#[test]
fn test_include_rooted_pattern_uses_base_dir() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    write(&dir, "rooted.md", "from base");
    write(&dir, "sub/outer.md", "\\\\include(/rooted.md)");
    let config = Config::from_overrides(json!({
        "input": { "baseDir": dir.path().to_str().unwrap() }
    }))
    .unwrap();
    let mut ctx = DocContext::new(config);
    let nodes = parse_in_ctx(&dir, "\\\\include(sub/outer.md)", &mut ctx);
    assert_eq!(paragraph_text(&nodes[0]), "from base");
}

#[test]
fn test_include_missing_file_is_error() {
    let dir = TempDir::new().unwrap();
    let mut ctx = DocContext::new(Config::default());
    let err = parse_source(
        "\\\\include(missing.md)",
        &dir.path().join("index.md"),
        &mut ctx,
        Default::default(),
    )
    .unwrap_err()
    .to_string();
    assert!(err.contains("transclusion file not found"), "got: {err}");
}

#[test]
fn test_include_without_pattern_is_error() {
    let dir = TempDir::new().unwrap();
    let mut ctx = DocContext::new(Config::default());
    let err = parse_source(
        "\\\\include",
        &dir.path().join("index.md"),
        &mut ctx,
        Default::default(),
    )
    .unwrap_err()
    .to_string();
    assert!(err.contains("missing file name"), "got: {err}");
}

#[test]
fn test_include_unknown_extension_is_error() {
    let dir = TempDir::new().unwrap();
    write(&dir, "data.xyz", "");
    let mut ctx = DocContext::new(Config::default());
    let err = parse_source(
        "\\\\include(data.xyz)",
        &dir.path().join("index.md"),
        &mut ctx,
        Default::default(),
    )
    .unwrap_err()
    .to_string();
    assert!(err.contains("unknown file type"), "got: {err}");
}

#[test]
fn test_unmatched_pattern_reports_not_found_before_extension() {
    // zero matches win over the extension check
    let dir = TempDir::new().unwrap();
    let mut ctx = DocContext::new(Config::default());
    let err = parse_source(
        "\\\\include(missing.xyz)",
        &dir.path().join("index.md"),
        &mut ctx,
        Default::default(),
    )
    .unwrap_err()
    .to_string();
    assert!(err.contains("transclusion file not found"), "got: {err}");
}

#[test]
fn test_error_in_nested_file_keeps_inner_location() {
    let dir = TempDir::new().unwrap();
    write(&dir, "broken.md", "fine\n\n\\\\insert(nope)");
    let mut ctx = DocContext::new(Config::default());
    let err = parse_source(
        "\\\\include(broken.md)",
        &dir.path().join("index.md"),
        &mut ctx,
        Default::default(),
    )
    .unwrap_err()
    .to_string();
    assert!(err.contains("definition not found: nope"), "got: {err}");
    assert!(err.contains("broken.md"), "got: {err}");
}

#[test]
fn test_include_passes_inner_content_as_definition() {
    let dir = TempDir::new().unwrap();
    write(&dir, "template.md", "Field: \\\\insert(content)");
    let nodes = parse_in(&dir, "\\\\include(template.md)\n    hello there");
    assert_eq!(paragraph_text(&nodes[0]), "Field: hello there");
}

#[test]
fn test_include_passes_caption_as_definition() {
    let dir = TempDir::new().unwrap();
    write(&dir, "template.md", "Got: \\\\insert(content)");
    let nodes = parse_in(&dir, "\\\\include(template.md) trailing words");
    assert_eq!(paragraph_text(&nodes[0]), "Got: trailing words");
}

// ============================================================================
// Image Transclusion Tests
// ============================================================================

#[test]
fn test_image_with_caption() {
    let dir = TempDir::new().unwrap();
    write(&dir, "fig.png", "");
    let nodes = parse_in(&dir, "\\\\image(fig.png) A **nice** figure");
    let NodeKind::Stack { children } = &nodes[0].kind else {
        panic!("expected stack, got {:?}", nodes[0].kind);
    };
    assert_eq!(children.len(), 2);
    let NodeKind::Image { path } = &children[0].kind else {
        panic!("expected image, got {:?}", children[0].kind);
    };
    assert!(path.ends_with("fig.png"));
    assert_eq!(children[0].style.as_deref(), Some("img"));
    assert_eq!(children[1].style.as_deref(), Some("caption"));
    assert_eq!(paragraph_text(&children[1]), "A nice figure");
    assert_eq!(nodes[0].props.get("unbreakable"), Some(&json!(true)));
}

#[test]
fn test_image_without_caption() {
    let dir = TempDir::new().unwrap();
    write(&dir, "fig.png", "");
    let nodes = parse_in(&dir, "\\\\image(fig.png)");
    let NodeKind::Stack { children } = &nodes[0].kind else {
        panic!("expected stack");
    };
    assert_eq!(children.len(), 1);
}

#[test]
fn test_image_indented_content_wins_over_caption() {
    let dir = TempDir::new().unwrap();
    write(&dir, "fig.png", "");
    let nodes = parse_in(&dir, "\\\\img(fig.png) inline\n    indented caption");
    let NodeKind::Stack { children } = &nodes[0].kind else {
        panic!("expected stack");
    };
    assert_eq!(paragraph_text(&children[1]), "indented caption");
}

#[test]
fn test_image_pending_props_apply() {
    let dir = TempDir::new().unwrap();
    write(&dir, "fig.png", "");
    let nodes = parse_in(&dir, "\\\\{ \"width\": 200 }\n\\\\image(fig.png)");
    let NodeKind::Stack { children } = &nodes[0].kind else {
        panic!("expected stack");
    };
    assert_eq!(children[0].props.get("width"), Some(&json!(200)));
}

// ============================================================================
// Generator Transclusion Tests
// ============================================================================

#[test]
fn test_generator_invoked_with_content() {
    let dir = TempDir::new().unwrap();
    write(&dir, "chart.gen", "");
    let mut ctx = DocContext::new(Config::default());
    ctx.register_generator(
        "chart",
        Box::new(|call| {
            Ok(vec![Node::new(NodeKind::Paragraph {
                content: Run::Text(format!("chart: {}", call.content)),
            })])
        }),
    );
    let nodes = parse_in_ctx(&dir, "\\\\include(chart.gen)\n    q1 data", &mut ctx);
    assert_eq!(paragraph_text(&nodes[0]), "chart: q1 data");
}

#[test]
fn test_unregistered_generator_is_error() {
    let dir = TempDir::new().unwrap();
    write(&dir, "chart.gen", "");
    let mut ctx = DocContext::new(Config::default());
    let err = parse_source(
        "\\\\include(chart.gen)",
        &dir.path().join("index.md"),
        &mut ctx,
        Default::default(),
    )
    .unwrap_err()
    .to_string();
    assert!(err.contains("generator not registered"), "got: {err}");
}

// ============================================================================
// Whole Document Tests
// ============================================================================

#[test]
fn test_parse_document_entry_and_cross_file_refs() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "index.md",
        "\\\\toc\n\nSee [](#deep).\n\n\\\\include(chapter.md)",
    );
    write(&dir, "chapter.md", "# Deep Dive {#deep}");
    let config = Config::from_overrides(json!({
        "input": { "baseDir": dir.path().to_str().unwrap(), "entry": "index.md" }
    }))
    .unwrap();
    let mut ctx = DocContext::new(config);
    let nodes = parse_document(&mut ctx).unwrap();

    // reference into the transcluded file resolves
    assert_eq!(paragraph_text(&nodes[1]), "See Deep Dive.");
    // the transcluded heading appears in the TOC
    let NodeKind::Table(table) = &nodes[0].kind else {
        panic!("expected TOC table, got {:?}", nodes[0].kind);
    };
    assert_eq!(table.rows.len(), 1);
}

#[test]
fn test_heading_ids_unique_across_files() {
    let dir = TempDir::new().unwrap();
    write(&dir, "a.md", "# In A");
    let mut ctx = DocContext::new(Config::default());
    let nodes = parse_in_ctx(&dir, "# In Index\n\n\\\\include(a.md)", &mut ctx);
    assert_eq!(nodes[0].id.as_deref(), Some("heading__1"));
    assert_eq!(nodes[1].id.as_deref(), Some("heading__2"));
}

#[test]
fn test_missing_entry_file_is_error() {
    let dir = TempDir::new().unwrap();
    let config = Config::from_overrides(json!({
        "input": { "baseDir": dir.path().to_str().unwrap(), "entry": "nope.md" }
    }))
    .unwrap();
    let mut ctx = DocContext::new(config);
    let err = parse_document(&mut ctx).unwrap_err().to_string();
    assert!(err.contains("cannot read"), "got: {err}");
}

#[test]
fn test_config_file_single_and_array() {
    let dir = TempDir::new().unwrap();
    write(&dir, "single.json", r#"{ "output": { "tocLevel": 5 } }"#);
    write(
        &dir,
        "multi.json",
        r#"[{ "skip": true }, { "output": { "tocLevel": 1 } }]"#,
    );
    let single = Config::load(&dir.path().join("single.json")).unwrap();
    assert_eq!(single.len(), 1);
    assert_eq!(single[0].output.toc_level, 5);
    let multi = Config::load(&dir.path().join("multi.json")).unwrap();
    assert_eq!(multi.len(), 2);
    assert!(multi[0].skip);
    assert_eq!(multi[1].output.toc_level, 1);
}

#[test]
fn test_config_file_invalid_json_is_error() {
    let dir = TempDir::new().unwrap();
    write(&dir, "bad.json", "{ nope");
    let err = Config::load(&dir.path().join("bad.json"))
        .unwrap_err()
        .to_string();
    assert!(err.contains("invalid configuration"), "got: {err}");
}

#[test]
fn test_tree_is_serializable_after_document_parse() {
    let dir = TempDir::new().unwrap();
    write(&dir, "index.md", "# T\n\nbody");
    let config = Config::from_overrides(json!({
        "input": { "baseDir": dir.path().to_str().unwrap() }
    }))
    .unwrap();
    let mut ctx = DocContext::new(config);
    let nodes = parse_document(&mut ctx).unwrap();
    let text = serde_json::to_string(&nodes).unwrap();
    assert!(text.contains("\"headlineLevel\":1"));
}
