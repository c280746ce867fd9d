//! kiln-flatten: Flatten nested JSON documents into flat records
//!
//! Usage:
//!   # Read from file, write JSON Lines to stdout
//!   kiln-flatten orders.json --select item
//!
//!   # Infer the repeating node, read from stdin
//!   echo '{"feed": {"entry": [{"id": 1}, {"id": 2}]}}' | kiln-flatten
//!
//!   # One document per line, fail on conflicting fields
//!   kiln-flatten --ndjson --strict-fields events.jsonl
//!
//!   # Inspect the flattened tree
//!   kiln-flatten data.json --root-name data --format xml

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use kiln::{CollisionPolicy, Document, FlattenConfig, Flattener, JsonOptions, RecordSet, RecordWriter};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One JSON object per row
    Jsonl,
    /// One `{"<root>": [...], "recordCount": n}` object per document
    Json,
    /// The flattened document as XML
    Xml,
}

#[derive(Parser, Debug)]
#[command(name = "kiln-flatten")]
#[command(about = "Flatten nested JSON documents into flat records", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Path or tag name of the repeating node (inferred when omitted)
    #[arg(long, short = 's')]
    select: Option<String>,

    /// Wrap each document in a root element with this name
    #[arg(long)]
    root_name: Option<String>,

    /// Process newline-delimited JSON (one document per line)
    #[arg(long)]
    ndjson: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Jsonl)]
    format: OutputFormat,

    /// Separator for promoted names (default: "_")
    #[arg(long)]
    vertical_separator: Option<String>,

    /// Separator for collapsed names (default: "-")
    #[arg(long)]
    lateral_separator: Option<String>,

    /// Prefix for root-level fields copied into every row (default: "base")
    #[arg(long)]
    base_prefix: Option<String>,

    /// Fail when a row gets two different values for one field
    #[arg(long)]
    strict_fields: bool,

    /// Element name for items of a top-level array (default: "item")
    #[arg(long)]
    item_name: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Build config
    let mut config = FlattenConfig::default();
    if let Some(sep) = args.vertical_separator.clone() {
        config.vertical_separator = sep;
    }
    if let Some(sep) = args.lateral_separator.clone() {
        config.lateral_separator = sep;
    }
    if let Some(prefix) = args.base_prefix.clone() {
        config.base_prefix = prefix;
    }
    if args.strict_fields {
        config.collision_policy = CollisionPolicy::Reject;
    }
    config.validate()?;

    let mut options = JsonOptions::default();
    options.root_name = args.root_name.clone();
    if let Some(name) = args.item_name.clone() {
        options.array_item_name = name;
    }

    // Without a root name a top-level array is a stream of documents
    let documents: Vec<Value> = read_documents(args.input.as_deref(), args.ndjson)?
        .into_iter()
        .flat_map(|value| match value {
            Value::Array(items) if options.root_name.is_none() => items,
            other => vec![other],
        })
        .collect();
    debug!(documents = documents.len(), "input parsed");

    let flattener = Flattener::new(config);
    let stdout = std::io::stdout();
    let mut writer = RecordWriter::new(stdout.lock());

    for (index, value) in documents.iter().enumerate() {
        let doc = Document::from_json(value, &options)
            .with_context(|| format!("Document {} cannot be converted to a tree", index + 1))?;
        let flat = flattener
            .flatten(doc, args.select.as_deref())
            .with_context(|| format!("Failed to flatten document {}", index + 1))?;

        match args.format {
            OutputFormat::Xml => {
                write_text(&mut writer, &flat.to_xml_string(Some(2)))?;
            }
            OutputFormat::Json | OutputFormat::Jsonl => {
                let records = RecordSet::from_document(&flat, None, flattener.config().collision_policy)
                    .with_context(|| format!("Failed to build records for document {}", index + 1))?;

                if args.format == OutputFormat::Jsonl {
                    writer.write_records(&records)?;
                } else {
                    let root = flat.name(flat.root());
                    let json = serde_json::to_string_pretty(&records.to_json(root))
                        .context("Failed to serialize record set")?;
                    write_text(&mut writer, &json)?;
                }
            }
        }
    }

    writer.flush()?;
    Ok(())
}

fn write_text<W: Write>(writer: &mut RecordWriter<W>, text: &str) -> Result<()> {
    let out = writer.get_mut();
    writeln!(out, "{}", text).context("Failed to write output")
}

/// Read every input document using SIMD-accelerated JSON parsing when possible
fn read_documents(input_file: Option<&str>, ndjson: bool) -> Result<Vec<Value>> {
    let reader = if let Some(file_path) = input_file {
        let file = File::open(file_path).with_context(|| format!("Failed to open file: {}", file_path))?;
        Box::new(BufReader::new(file)) as Box<dyn Read>
    } else {
        Box::new(std::io::stdin()) as Box<dyn Read>
    };

    let mut content = Vec::new();
    BufReader::new(reader)
        .read_to_end(&mut content)
        .context("Failed to read input")?;

    if !ndjson {
        // simd-json parses in place, so keep the original bytes for the fallback
        let mut scratch = content.clone();
        match simd_json::serde::from_slice::<Value>(&mut scratch) {
            Ok(value) => return Ok(vec![value]),
            Err(err) => debug!(error = %err, "SIMD parse failed, falling back to line parsing"),
        }
    }

    // Fallback to serde_json for NDJSON
    let content_str = String::from_utf8_lossy(&content);
    let mut documents = Vec::new();
    for (number, line) in content_str.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse JSON on line {}", number + 1))?;
        documents.push(value);
    }

    Ok(documents)
}
