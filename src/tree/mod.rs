//! In-memory tree documents
//!
//! The flattener operates on an owned `Document`. Documents are built
//! programmatically or imported from JSON, and can be rendered back to JSON
//! or XML text for inspection.

pub mod document;
pub mod json;
pub mod xml;

pub use document::{Document, Node, NodeId};
pub use json::JsonOptions;
