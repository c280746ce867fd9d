use thiserror::Error;

/// Errors raised while flattening a document or walking a record set
#[derive(Debug, Error)]
pub enum KilnError {
    /// No explicit or inferred repeating node could be located
    #[error("Could not find any repeating nodes in the document")]
    StructureNotFound,

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The input cannot be represented as a single-rooted tree
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Column {index} wasn't found in the current row ({count} columns)")]
    FieldNotFound { index: usize, count: usize },

    /// Guard against loops that never advance the cursor
    #[error("Infinite loop detected: read counter exceeded the maximum of {limit} reads in a single row")]
    RunawayRead { limit: usize },

    #[error("Field '{field}' was produced twice with different values in row {row}")]
    FieldNameCollision { field: String, row: usize },

    #[error("No current row; call add_row() before add_column()")]
    NoCurrentRow,
}
