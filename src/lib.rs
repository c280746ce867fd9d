//! # Kiln - nested documents to flat records
//!
//! Turns an arbitrarily nested tree (imported from JSON or built by hand)
//! into a record set of same-shaped rows with scalar string fields.
//!
//! ## Modules
//!
//! - **tree**: owned arena document with JSON import and JSON/XML rendering
//! - **flatten**: repeat node detection, promotion and collapsing of structure
//! - **records**: flat records, the cursor-based `RecordSet`, JSON Lines output
//!
//! ## Quick Start
//!
//! ```rust
//! use kiln::{flatten_json, FlattenConfig, JsonOptions};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), kiln::KilnError> {
//! let data = json!({"catalog": {
//!     "currency": "USD",
//!     "item": [
//!         {"id": "1", "name": "Apple"},
//!         {"id": "2", "name": "Pear"}
//!     ]
//! }});
//!
//! let mut records = flatten_json(&data, &JsonOptions::default(), Some("item"), FlattenConfig::default())?;
//!
//! // Each item picks up the root-level currency
//! assert_eq!(records.record_count(), 2);
//! assert_eq!(records.keys(), vec!["id", "name", "base-currency"]);
//! records.move_next();
//! assert_eq!(records.item("name"), "Pear");
//! # Ok(())
//! # }
//! ```
//!
//! Without a selector the repeating node is inferred from the most frequent
//! `(name, depth)` pair of structured nodes.

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::{BufRead, Write};

pub mod error;
pub mod flatten;
pub mod records;
pub mod tree;

// Re-export commonly used types for convenience
pub use error::KilnError;
pub use flatten::{FlattenConfig, Flattener};
pub use records::{CollisionPolicy, Record, RecordSet, RecordWriter};
pub use tree::{Document, JsonOptions, NodeId};

/// Flatten one JSON document into a record set
pub fn flatten_json(
    value: &Value,
    options: &JsonOptions,
    selector: Option<&str>,
    config: FlattenConfig,
) -> Result<RecordSet, KilnError> {
    let doc = Document::from_json(value, options)?;
    Flattener::new(config).flatten_to_records(doc, selector)
}

/// Flatten a stream of newline-delimited JSON documents, writing every row
/// as a JSON line. Returns the number of rows written.
pub fn flatten_json_lines<R: BufRead, W: Write>(
    reader: R,
    writer: &mut RecordWriter<W>,
    options: &JsonOptions,
    selector: Option<&str>,
    config: FlattenConfig,
) -> Result<usize> {
    let flattener = Flattener::new(config);
    let start = writer.written();

    for (number, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read line")?;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse JSON on line {}", number + 1))?;

        let doc = Document::from_json(&value, options)?;
        let records = flattener
            .flatten_to_records(doc, selector)
            .with_context(|| format!("Failed to flatten document on line {}", number + 1))?;
        writer.write_records(&records)?;
    }

    writer.flush()?;
    Ok(writer.written() - start)
}
