//! Hierarchical autonumbering.
//!
//! Counters form a tree addressed by `(kind, name)` segments below a root
//! sentinel. Incrementing a counter discards its entire child set, which is
//! how nested counters reset when an ancestor advances: fresh children are
//! created lazily on next access.
//!
//! The tree is stored as an index arena; nodes orphaned by a reset simply
//! become unreachable.

use std::collections::HashMap;

/// Counter kind within a path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Kind {
    /// Rendered as `1, 2, 3, …`
    Numeric,
    /// Rendered as `A, B, C, …`
    Alphabetic,
}

#[derive(Debug)]
struct Counter {
    parent: Option<usize>,
    kind: Kind,
    /// 0 means unset; first increment (or render) takes it to 1.
    value: u32,
    children: HashMap<(Kind, String), usize>,
}

/// Arena of hierarchical counters producing outline-style labels.
#[derive(Debug)]
pub struct AutoNumber {
    nodes: Vec<Counter>,
}

impl AutoNumber {
    /// Create an empty counter tree with its root sentinel.
    pub fn new() -> Self {
        Self {
            nodes: vec![Counter {
                parent: None,
                kind: Kind::Numeric,
                value: 0,
                children: HashMap::new(),
            }],
        }
    }

    /// Resolve a pattern like `(chapter).[item].`, increment the counter at
    /// the end of the path, and return the rendered label with `suffix`
    /// appended.
    ///
    /// Segment syntax: `(name).` selects a numeric counter, `[name].` an
    /// alphabetic one; an empty name selects the unnamed default counter.
    pub fn label(&mut self, pattern: &str, suffix: &str) -> String {
        let mut index = 0;
        let mut rest = pattern;
        while !rest.is_empty() {
            let next = rest.find('.').map(|i| i + 1);
            match rest.as_bytes()[0] {
                b'(' => {
                    let name = segment_name(rest, ')');
                    index = self.child(index, Kind::Numeric, name);
                }
                b'[' => {
                    let name = segment_name(rest, ']');
                    index = self.child(index, Kind::Alphabetic, name);
                }
                _ => {}
            }
            match next {
                Some(n) => rest = &rest[n..],
                None => break,
            }
        }
        self.increment(index);
        let mut out = self.render(index, "");
        out.push_str(suffix);
        out
    }

    /// Look up or lazily create a child counter.
    fn child(&mut self, parent: usize, kind: Kind, name: &str) -> usize {
        let key = (kind, if name.is_empty() { "default" } else { name }.to_string());
        if let Some(&existing) = self.nodes[parent].children.get(&key) {
            return existing;
        }
        let index = self.nodes.len();
        self.nodes.push(Counter {
            parent: Some(parent),
            kind,
            value: 0,
            children: HashMap::new(),
        });
        self.nodes[parent].children.insert(key, index);
        index
    }

    /// Advance a counter and discard all of its children.
    fn increment(&mut self, index: usize) {
        let node = &mut self.nodes[index];
        node.value += 1;
        node.children.clear();
    }

    /// Render the label for a counter: each ancestor's current value joined
    /// by `.`, the root sentinel contributing nothing. Rendering an unset
    /// ancestor initializes it to 1.
    fn render(&mut self, index: usize, suffix: &str) -> String {
        let Some(parent) = self.nodes[index].parent else {
            return String::new();
        };
        if self.nodes[index].value == 0 {
            self.nodes[index].value = 1;
        }
        let mut out = self.render(parent, ".");
        let node = &self.nodes[index];
        match node.kind {
            Kind::Numeric => out.push_str(&node.value.to_string()),
            Kind::Alphabetic => out.push(alpha(node.value)),
        }
        out.push_str(suffix);
        out
    }
}

impl Default for AutoNumber {
    fn default() -> Self {
        Self::new()
    }
}

/// Name between the opening bracket and `close`, empty if unterminated.
fn segment_name(segment: &str, close: char) -> &str {
    match segment.find(close) {
        Some(end) if end > 0 => &segment[1..end],
        _ => "",
    }
}

/// 1-based ordinal to `A, B, C, …`
fn alpha(value: u32) -> char {
    char::from_u32(64 + value).unwrap_or('?')
}
