//! Integration tests for autonumbering, cross references and the TOC

use std::path::Path;

use markprint_core::{
    flatten_text, parse_source, CellContent, Config, DocContext, Node, NodeKind, Run, RunContent,
};
use serde_json::json;

fn parse_with(input: &str, ctx: &mut DocContext) -> Vec<Node> {
    parse_source(input, Path::new("test.md"), ctx, Default::default()).unwrap()
}

fn parse_finalized(input: &str) -> (Vec<Node>, DocContext) {
    let mut ctx = DocContext::new(Config::default());
    let mut nodes = parse_with(input, &mut ctx);
    ctx.finalize(&mut nodes).unwrap();
    (nodes, ctx)
}

fn paragraph_content(node: &Node) -> &Run {
    match &node.kind {
        NodeKind::Paragraph { content } => content,
        other => panic!("expected paragraph, got {other:?}"),
    }
}

// ============================================================================
// Autonumbering Tests
// ============================================================================

#[test]
fn test_autonum_top_level_sequence() {
    let mut ctx = DocContext::new(Config::default());
    let nodes = parse_with(
        "\\\\(chapter). First\n\n\\\\(chapter). Second",
        &mut ctx,
    );
    assert_eq!(flatten_text(paragraph_content(&nodes[0])), "1 First");
    assert_eq!(flatten_text(paragraph_content(&nodes[1])), "2 Second");
}

#[test]
fn test_autonum_nested_counters_reset() {
    let mut ctx = DocContext::new(Config::default());
    let input = "\\\\(ch). A\n\n\\\\(ch).(sec). a1\n\n\\\\(ch).(sec). a2\n\n\\\\(ch). B\n\n\\\\(ch).(sec). b1";
    let nodes = parse_with(input, &mut ctx);
    assert_eq!(flatten_text(paragraph_content(&nodes[1])), "1.1 a1");
    assert_eq!(flatten_text(paragraph_content(&nodes[2])), "1.2 a2");
    // advancing the parent discards the nested counter
    assert_eq!(flatten_text(paragraph_content(&nodes[4])), "2.1 b1");
}

#[test]
fn test_autonum_alphabetic_counters() {
    let mut ctx = DocContext::new(Config::default());
    let nodes = parse_with("\\\\[appendix]. One\n\n\\\\[appendix]. Two", &mut ctx);
    assert_eq!(flatten_text(paragraph_content(&nodes[0])), "A One");
    assert_eq!(flatten_text(paragraph_content(&nodes[1])), "B Two");
}

#[test]
fn test_autonum_independent_names() {
    let mut ctx = DocContext::new(Config::default());
    let nodes = parse_with("\\\\(fig). f\n\n\\\\(tbl). t\n\n\\\\(fig). f", &mut ctx);
    assert_eq!(flatten_text(paragraph_content(&nodes[0])), "1 f");
    assert_eq!(flatten_text(paragraph_content(&nodes[1])), "1 t");
    assert_eq!(flatten_text(paragraph_content(&nodes[2])), "2 f");
}

#[test]
fn test_autonum_default_counter_name() {
    let mut ctx = DocContext::new(Config::default());
    let nodes = parse_with("\\\\(). a\n\n\\\\(). b", &mut ctx);
    assert_eq!(flatten_text(paragraph_content(&nodes[0])), "1 a");
    assert_eq!(flatten_text(paragraph_content(&nodes[1])), "2 b");
}

#[test]
fn test_autonum_custom_suffix() {
    let config = Config::from_overrides(json!({
        "output": { "autonumSuffix": ". " }
    }))
    .unwrap();
    let mut ctx = DocContext::new(config);
    let nodes = parse_with("\\\\(n). item", &mut ctx);
    assert_eq!(flatten_text(paragraph_content(&nodes[0])), "1. item");
}

#[test]
fn test_autonum_in_heading_gets_level_style() {
    let mut ctx = DocContext::new(Config::default());
    let nodes = parse_with("## \\\\(sec). Setup", &mut ctx);
    let NodeKind::Heading { content, .. } = &nodes[0].kind else {
        panic!("expected heading");
    };
    let value = serde_json::to_value(content).unwrap();
    assert_eq!(value["text"][0]["style"], json!("autonum_h2"));
    assert_eq!(flatten_text(content), "1 Setup");
}

#[test]
fn test_autonum_spans_transcluded_scope() {
    // one context carries counter state across separate source parses
    let mut ctx = DocContext::new(Config::default());
    let first = parse_with("\\\\(ch). one", &mut ctx);
    let second = parse_with("\\\\(ch). two", &mut ctx);
    assert_eq!(flatten_text(paragraph_content(&first[0])), "1 one");
    assert_eq!(flatten_text(paragraph_content(&second[0])), "2 two");
}

// ============================================================================
// Cross Reference Tests
// ============================================================================

#[test]
fn test_backward_reference_resolves() {
    let (nodes, _) = parse_finalized("# Setup {#setup}\n\nSee [](#setup).");
    let runs = match paragraph_content(&nodes[1]) {
        Run::Styled(styled) => match &styled.content {
            RunContent::Runs(runs) => runs.clone(),
            other => panic!("expected container, got {other:?}"),
        },
        other => panic!("expected styled run, got {other:?}"),
    };
    let Run::Styled(link) = &runs[1] else {
        panic!("expected styled link run");
    };
    assert_eq!(link.style.link_to.as_deref(), Some("setup"));
    assert_eq!(link.style.style.as_deref(), Some("doclink"));
    match &link.content {
        RunContent::Text(t) => assert_eq!(t, "Setup"),
        other => panic!("expected resolved text, got {other:?}"),
    }
}

#[test]
fn test_forward_reference_resolves() {
    let (nodes, _) = parse_finalized("See [](#late).\n\n# Later {#late}");
    assert_eq!(flatten_text(paragraph_content(&nodes[0])), "See Later.");
}

#[test]
fn test_reference_to_autonum_anchor() {
    let (nodes, _) =
        parse_finalized("\\\\(fig).{#fig-a} The figure\n\nSee figure [](#fig-a).");
    // the anchor resolves to the trimmed label
    assert_eq!(flatten_text(paragraph_content(&nodes[1])), "See figure 1.");
}

#[test]
fn test_unresolved_reference_is_error() {
    let mut ctx = DocContext::new(Config::default());
    let mut nodes = parse_with("See [](#ghost).", &mut ctx);
    let err = ctx.finalize(&mut nodes).unwrap_err().to_string();
    assert!(err.contains("reference not found"), "got: {err}");
    assert!(err.contains("test.md:1"), "got: {err}");
}

#[test]
fn test_duplicate_anchor_last_write_wins() {
    let (nodes, _) = parse_finalized("# First {#dup}\n\n# Second {#dup}\n\nGo to [](#dup).");
    assert_eq!(flatten_text(paragraph_content(&nodes[2])), "Go to Second.");
}

// ============================================================================
// TOC Tests
// ============================================================================

fn toc_table(node: &Node) -> &markprint_core::Table {
    match &node.kind {
        NodeKind::Table(table) => table,
        other => panic!("expected TOC table, got {other:?}"),
    }
}

fn toc_row_title(table: &markprint_core::Table, row: usize) -> String {
    match &table.rows[row][0].content {
        CellContent::Run(run) => flatten_text(run),
        other => panic!("expected run cell, got {other:?}"),
    }
}

#[test]
fn test_toc_collects_headings_in_order() {
    let (nodes, _) = parse_finalized("\\\\toc\n\n# One\n\n## Two\n\n# Three");
    let table = toc_table(&nodes[0]);
    assert_eq!(table.rows.len(), 3);
    assert_eq!(toc_row_title(table, 0), "One");
    assert_eq!(toc_row_title(table, 1), "Two");
    assert_eq!(toc_row_title(table, 2), "Three");
    assert_eq!(table.layout, "toc");
}

#[test]
fn test_toc_level_limit() {
    let (nodes, _) = parse_finalized("\\\\toc\n\n# A\n\n## B\n\n### C");
    let table = toc_table(&nodes[0]);
    // default tocLevel is 2; deeper headings stay out
    assert_eq!(table.rows.len(), 2);
}

#[test]
fn test_toc_level_limit_configurable() {
    let config = Config::from_overrides(json!({
        "output": { "tocLevel": 3 }
    }))
    .unwrap();
    let mut ctx = DocContext::new(config);
    let mut nodes = parse_with("\\\\toc\n\n# A\n\n## B\n\n### C", &mut ctx);
    ctx.finalize(&mut nodes).unwrap();
    assert_eq!(toc_table(&nodes[0]).rows.len(), 3);
}

#[test]
fn test_toc_rows_link_and_page_reference() {
    let (nodes, _) = parse_finalized("\\\\toc\n\n# One {#one}");
    let table = toc_table(&nodes[0]);
    let CellContent::Run(Run::Styled(title)) = &table.rows[0][0].content else {
        panic!("expected styled title run");
    };
    assert_eq!(title.style.link_to.as_deref(), Some("one"));
    assert_eq!(title.style.style.as_deref(), Some("toc1"));
    let CellContent::PageRef(page) = &table.rows[0][1].content else {
        panic!("expected page reference cell");
    };
    assert_eq!(page.page_reference, "one");
}

#[test]
fn test_toc_includes_forward_headings() {
    // the placeholder at the top of the document sees every heading
    let (nodes, _) = parse_finalized("\\\\toc\n\n# Only Later");
    assert_eq!(toc_table(&nodes[0]).rows.len(), 1);
}

#[test]
fn test_toc_duplicate_anchor_keeps_both_rows() {
    let (nodes, _) = parse_finalized("\\\\toc\n\n# First {#dup}\n\n# Second {#dup}");
    let table = toc_table(&nodes[0]);
    assert_eq!(table.rows.len(), 2);
    // both rows resolve through the overwritten registry entry
    assert_eq!(toc_row_title(table, 0), "Second");
    assert_eq!(toc_row_title(table, 1), "Second");
}

#[test]
fn test_toc_inside_nested_block_is_patched() {
    let (nodes, _) = parse_finalized("> \\\\toc\n\n# One");
    let NodeKind::Quote { children } = &nodes[0].kind else {
        panic!("expected quote, got {:?}", nodes[0].kind);
    };
    assert_eq!(toc_table(&children[0]).rows.len(), 1);
}

#[test]
fn test_toc_widths_from_stylesheet() {
    let config = Config::from_overrides(json!({
        "styles": { "toc": { "widths": [200, "auto"] } }
    }))
    .unwrap();
    let mut ctx = DocContext::new(config);
    let mut nodes = parse_with("\\\\toc\n\n# A", &mut ctx);
    ctx.finalize(&mut nodes).unwrap();
    assert_eq!(toc_table(&nodes[0]).widths, vec![json!(200), json!("auto")]);
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_config_overrides_deep_merge() {
    let config = Config::from_overrides(json!({
        "output": { "tocLevel": 4 },
        "styles": { "p": { "margin": [1, 2, 3, 4] } }
    }))
    .unwrap();
    assert_eq!(config.output.toc_level, 4);
    // untouched defaults survive the merge
    assert_eq!(config.output.autonum_suffix, " ");
    assert_eq!(
        config.styles.get("p").and_then(|p| p.get("margin")),
        Some(&json!([1, 2, 3, 4]))
    );
    assert!(config.styles.contains_key("h1"));
}

#[test]
fn test_config_added_style() {
    let config = Config::from_overrides(json!({
        "styles": { "warning": { "color": "#cc0000" } }
    }))
    .unwrap();
    let ctx = DocContext::new(config);
    assert_eq!(
        ctx.style_props("warning").unwrap().get("color"),
        Some(&json!("#cc0000"))
    );
}
