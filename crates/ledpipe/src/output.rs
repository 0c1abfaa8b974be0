use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct LineOutput<'a> {
    kind: &'static str,
    target: &'a str,
    size: usize,
    line: Value,
    timestamp: String,
}

/// Print one received line. JSON lines are embedded as values, anything
/// else as a string.
pub fn print_line(line: &str, target: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = LineOutput {
                kind: "line",
                target,
                size: line.len(),
                line: serde_json::from_str(line).unwrap_or_else(|_| Value::String(line.to_string())),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TARGET", "SIZE", "LINE"])
                .add_row(vec![target.to_string(), line.len().to_string(), line.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("target={} size={} line={}", target, line.len(), line);
        }
        OutputFormat::Raw => print_raw(line),
    }
}

/// Print an accumulated state map.
pub fn print_state(state: &Map<String, Value>, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            println!(
                "{}",
                serde_json::to_string(state).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KEY", "VALUE"]);
            for (key, value) in state {
                table.add_row(vec![key.clone(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (key, value) in state {
                println!("{key}={value}");
            }
        }
    }
}

pub fn print_raw(line: &str) {
    let mut out = std::io::stdout();
    let _ = writeln!(out, "{line}");
    let _ = out.flush();
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
