//! `ab`: offline inspection of stored Artboard design records.
//!
//! Reads the JSON records the document store exchanges and either
//! summarizes them or rewrites them in canonical form.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ab_core::{
    CodecError, DesignRecord, Document, ObjectKind, decode_document, decode_document_or_blank,
    encode_document,
};
use ab_editor::{ConfigError, EditorConfig};
use clap::{Parser, Subcommand};
use thiserror::Error;

#[derive(Parser)]
#[command(name = "ab")]
#[command(about = "Inspect and normalize stored Artboard designs")]
struct Cli {
    /// Editor configuration (JSON). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a per-object summary of a design record
    Inspect {
        /// Stored design record (JSON)
        record: PathBuf,
    },

    /// Re-encode a design record with canonical canvas data
    Normalize {
        /// Stored design record (JSON)
        record: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} is not a design record: {source}")]
    Record {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("failed to serialize record: {0}")]
    Serialize(serde_json::Error),
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };

    match cli.command {
        Commands::Inspect { record } => {
            let record = read_record(&record)?;
            let (doc, recovered_from) =
                decode_document_or_blank(&record, config.fallback_dimensions());
            if let Some(e) = &recovered_from {
                log::warn!("malformed canvas data ({e}); showing blank canvas");
            }
            print!("{}", summarize(&doc));
            Ok(())
        }
        Commands::Normalize { record, output } => {
            let normalized = normalize(&read_record(&record)?)?;
            let text = serde_json::to_string_pretty(&normalized).map_err(CliError::Serialize)?;
            match output {
                Some(path) => {
                    fs::write(&path, text + "\n").map_err(|source| CliError::Write {
                        path: path.clone(),
                        source,
                    })?;
                    log::info!("wrote {}", path.display());
                }
                None => println!("{text}"),
            }
            Ok(())
        }
    }
}

fn read_record(path: &Path) -> Result<DesignRecord, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Record {
        path: path.to_path_buf(),
        source,
    })
}

/// Decode strictly and encode again. Legacy pre-parsed `canvasData`
/// becomes a string; the store-maintained timestamp is kept.
fn normalize(record: &DesignRecord) -> Result<DesignRecord, CodecError> {
    let doc = decode_document(record)?;
    let mut normalized = encode_document(&doc, record.category.clone())?;
    normalized.updated_at = record.updated_at;
    Ok(normalized)
}

fn object_label(kind: &ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Shape(geometry) => geometry.tag(),
        ObjectKind::Text(_) => "text",
        ObjectKind::Image(_) => "image",
        ObjectKind::Freehand(_) => "path",
    }
}

fn summarize(doc: &Document) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({}x{}, background {})",
        doc.name,
        doc.width,
        doc.height,
        doc.effective_background().to_hex()
    );
    let _ = writeln!(out, "{} objects", doc.objects.len());
    for object in &doc.objects {
        let _ = writeln!(
            out,
            "  {:<20} {:<10} ({}, {})",
            object.id.as_str(),
            object_label(&object.kind),
            object.transform.left,
            object.transform.top
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_core::CanvasPayload;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(canvas: CanvasPayload) -> DesignRecord {
        DesignRecord {
            id: Some("d1".into()),
            name: Some("Flyer".into()),
            width: Some(300.0),
            height: Some(200.0),
            canvas_data: Some(canvas),
            category: Some("flyer".into()),
            updated_at: Some(17),
        }
    }

    #[test]
    fn summary_lists_objects_in_paint_order() {
        let canvas = json!({
            "background": "#000000",
            "objects": [
                { "type": "rect", "id": "cli-rect", "left": 5, "top": 6, "width": 10, "height": 10 },
                { "type": "textbox", "id": "cli-title", "left": 40, "top": 50, "text": "Hi" }
            ]
        });
        let doc = decode_document(&record(CanvasPayload::Parsed(canvas))).unwrap();
        assert_eq!(
            summarize(&doc),
            "Flyer (300x200, background #000000)\n\
             2 objects\n  \
             cli-rect             rect       (5, 6)\n  \
             cli-title            text       (40, 50)\n"
        );
    }

    #[test]
    fn normalize_encodes_legacy_canvas_as_string() {
        let canvas = json!({ "objects": [{ "type": "circle", "id": "cli-dot", "radius": 4 }] });
        let normalized = normalize(&record(CanvasPayload::Parsed(canvas))).unwrap();
        assert!(matches!(normalized.canvas_data, Some(CanvasPayload::Encoded(_))));
        assert_eq!(normalized.category.as_deref(), Some("flyer"));
        assert_eq!(normalized.updated_at, Some(17));

        let again = normalize(&normalized).unwrap();
        assert_eq!(again, normalized);
    }

    #[test]
    fn normalize_refuses_malformed_canvas() {
        let err = normalize(&record(CanvasPayload::Encoded("{not json".into()))).unwrap_err();
        assert!(matches!(err, CodecError::InvalidJson(_)));
    }

    #[test]
    fn cli_parses_global_config() {
        let cli = Cli::parse_from([
            "ab", "normalize", "in.json", "-o", "out.json", "--config", "ab.json",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("ab.json")));
        match cli.command {
            Commands::Normalize { record, output } => {
                assert_eq!(record, PathBuf::from("in.json"));
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            Commands::Inspect { .. } => panic!("expected normalize"),
        }
    }
}
