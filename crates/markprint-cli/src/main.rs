//! Markprint CLI - Parse a markdown document tree for print rendering
//!
//! Usage:
//!   markprint [OPTIONS] [CONFIGFILE]
//!
//! Reads a JSON configuration file (default: markprint.json), parses the
//! configured entry document, and writes the styled document tree as JSON
//! to the configured output file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use log::{info, warn};
use markprint_core::{parse_document, Config, DocContext};

const PROGRAM_NAME: &str = "markprint";
const DEFAULT_CONFIG: &str = "markprint.json";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: Vec<String> = env::args().collect();

    match run(&args) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                process::exit(0);
            }
            "-V" | "--version" => {
                println!("{} {}", PROGRAM_NAME, env!("CARGO_PKG_VERSION"));
                process::exit(0);
            }
            _ if arg.starts_with('-') => {
                return Err(format!("unknown option: {}", arg));
            }
            _ => {
                if config_path.is_some() {
                    return Err("multiple configuration files specified".to_string());
                }
                config_path = Some(PathBuf::from(arg));
            }
        }
        i += 1;
    }

    if config_path.is_none() && Path::new(DEFAULT_CONFIG).exists() {
        config_path = Some(PathBuf::from(DEFAULT_CONFIG));
    }

    let configs = match &config_path {
        Some(path) => Config::load(path).map_err(|e| e.to_string())?,
        None => vec![Config::default()],
    };
    let config_base = config_path
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf);

    for mut config in configs {
        if config.skip {
            continue;
        }

        // resolve configured paths relative to the configuration file
        if let Some(base) = &config_base {
            config.output.file = base.join(&config.output.file);
            config.input.base_dir = Some(match &config.input.base_dir {
                Some(dir) => base.join(dir),
                None => base.clone(),
            });
        }

        if config.output.info.creator.is_empty() {
            config.output.info.creator = PROGRAM_NAME.to_string();
        }
        if config.output.info.producer.is_empty() {
            config.output.info.producer = PROGRAM_NAME.to_string();
        }
        for (field, value) in [
            ("author", &config.output.info.author),
            ("title", &config.output.info.title),
            ("subject", &config.output.info.subject),
        ] {
            if value.is_empty() {
                warn!("missing {} field in config (output.info.{})", field, field);
            }
        }

        generate(config)?;
    }
    Ok(())
}

/// Parse one configured document and write its tree.
fn generate(config: Config) -> Result<(), String> {
    let debug = config.output.debug;
    let out_file = config.output.file.clone();

    let mut ctx = DocContext::new(config);
    let nodes = parse_document(&mut ctx).map_err(|e| e.to_string())?;

    if debug {
        let pretty = serde_json::to_string_pretty(&nodes)
            .map_err(|e| format!("cannot serialize document: {}", e))?;
        fs::write("debug.json", pretty)
            .map_err(|e| format!("cannot write debug.json: {}", e))?;
    }

    let json = serde_json::to_string(&nodes)
        .map_err(|e| format!("cannot serialize document: {}", e))?;
    if let Some(dir) = out_file.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .map_err(|e| format!("cannot create '{}': {}", dir.display(), e))?;
        }
    }
    info!("writing to {}", out_file.display());
    fs::write(&out_file, json)
        .map_err(|e| format!("cannot write '{}': {}", out_file.display(), e))?;
    Ok(())
}

fn print_help() {
    eprintln!(
        "Usage: {name} [OPTIONS] [CONFIGFILE]

Parses the entry document named by the configuration file (default:
{default}) and writes the styled document tree as JSON to the configured
output file. A configuration file holding an array runs one generation
per entry.

Options:
  -h, --help     Show this help
  -V, --version  Show version",
        name = PROGRAM_NAME,
        default = DEFAULT_CONFIG,
    );
}
