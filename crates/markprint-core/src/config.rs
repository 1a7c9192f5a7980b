//! Generation configuration.
//!
//! Mirrors the JSON configuration file consumed by the CLI: input location,
//! output options, named definitions for `\\insert`, and the stylesheet the
//! renderer resolves style names against. Overrides are deep-merged onto the
//! built-in defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{ErrorKind, Result};
use crate::node::Props;

/// Full configuration for one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Skip this entry entirely (multi-entry configuration files).
    pub skip: bool,
    /// Named definitions available to `\\insert(name)`.
    pub define: Map<String, Value>,
    pub input: InputConfig,
    pub output: OutputConfig,
    /// Style name to property-bag stylesheet.
    pub styles: BTreeMap<String, Props>,
}

/// Input location options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputConfig {
    /// Base directory for rooted transclusion patterns and the entry file.
    pub base_dir: Option<PathBuf>,
    /// Entry markdown file.
    pub entry: PathBuf,
}

/// Output options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputConfig {
    /// Emit per-file parse logging and a pretty-printed debug tree.
    pub debug: bool,
    /// Maximum heading level collected into the TOC.
    pub toc_level: u8,
    /// Suffix appended to every autonumber label.
    pub autonum_suffix: String,
    /// Output file written by the CLI.
    pub file: PathBuf,
    /// Document information fields, merged into the definition map.
    pub info: DocInfo,
}

/// Document metadata fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocInfo {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: String,
    pub creator: String,
    pub producer: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            entry: PathBuf::from("index.md"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            debug: false,
            toc_level: 2,
            autonum_suffix: " ".to_string(),
            file: PathBuf::from("dist/out.json"),
            info: DocInfo::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            skip: false,
            define: Map::new(),
            input: InputConfig::default(),
            output: OutputConfig::default(),
            styles: default_styles(),
        }
    }
}

impl Config {
    /// Build a configuration from JSON overrides deep-merged onto defaults.
    pub fn from_overrides(overrides: Value) -> Result<Self> {
        let mut base = serde_json::to_value(Config::default()).map_err(ErrorKind::from)?;
        merge_value(&mut base, overrides);
        let config = serde_json::from_value(base).map_err(ErrorKind::from)?;
        Ok(config)
    }

    /// Load one or more configurations from a JSON file.
    ///
    /// A top-level array yields one configuration per entry.
    pub fn load(path: &Path) -> Result<Vec<Self>> {
        let text = fs::read_to_string(path)
            .map_err(|e| ErrorKind::Io(path.to_path_buf(), e))?;
        let value: Value = serde_json::from_str(&text).map_err(ErrorKind::from)?;
        let entries = match value {
            Value::Array(entries) => entries,
            other => vec![other],
        };
        entries.into_iter().map(Self::from_overrides).collect()
    }
}

/// Overwrite `target` with `source`, recursing into object values.
fn merge_value(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

/// Built-in stylesheet covering every style name the engine emits.
fn default_styles() -> BTreeMap<String, Props> {
    let styles = json!({
        "default": { "font": "Body", "fontSize": 10, "lineHeight": 1.3 },
        "p": { "margin": [0, 2, 0, 6] },
        "h1": { "font": "Headings Bold", "fontSize": 20, "margin": [0, 12, 0, 6] },
        "h2": { "font": "Headings Bold", "fontSize": 16, "margin": [0, 10, 0, 5] },
        "h3": { "font": "Headings", "fontSize": 13, "margin": [0, 8, 0, 4] },
        "h4": { "font": "Headings", "fontSize": 11, "margin": [0, 8, 0, 4] },
        "h5": { "font": "Headings", "fontSize": 10, "margin": [0, 6, 0, 3] },
        "h6": { "font": "Headings", "fontSize": 9, "margin": [0, 6, 0, 3] },
        "li": { "margin": [0, 1, 0, 1] },
        "ul": { "margin": [0, 2, 0, 6] },
        "ol": { "margin": [0, 2, 0, 6] },
        "ul_inner": { "margin": [0, 0, 0, 0] },
        "ol_inner": { "margin": [0, 0, 0, 0] },
        "code": { "font": "Monospaced", "fontSize": 9 },
        "pre": { "margin": [0, 4, 0, 8] },
        "block": { "margin": [8, 6, 8, 6] },
        "block_outer": { "margin": [0, 4, 0, 8] },
        "img": { "margin": [0, 4, 0, 2] },
        "caption": { "italics": true, "fontSize": 9, "margin": [0, 2, 0, 8] },
        "table": { "margin": [0, 4, 0, 8] },
        "tableHeader": { "bold": true },
        "tableCell": {},
        "separator": { "lineWidth": 0.5, "margin": [0, 8, 0, 8] },
        "link": { "color": "#0563c1" },
        "doclink": { "color": "#0563c1" },
        "autonum": {},
        "autonum_h1": {},
        "autonum_h2": {},
        "autonum_h3": {},
        "autonum_h4": {},
        "autonum_h5": {},
        "autonum_h6": {},
        "toc": { "widths": ["*", "auto"], "margin": [0, 8, 0, 16] },
        "toc1": { "bold": true, "margin": [0, 3, 0, 1] },
        "toc2": { "margin": [8, 1, 0, 1] },
        "toc3": { "margin": [16, 1, 0, 1] }
    });

    let Value::Object(map) = styles else {
        unreachable!("stylesheet literal is an object");
    };
    map.into_iter()
        .map(|(name, props)| {
            let Value::Object(props) = props else {
                unreachable!("style entries are objects");
            };
            (name, props)
        })
        .collect()
}
