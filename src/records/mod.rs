//! Flat records and the cursor used to walk them
//!
//! A `RecordSet` is the tabular view of a flattened document: one `Record`
//! per row, fields in document order, and a cursor with BOF/EOF states.

pub mod cursor;
pub mod record;
pub mod writer;

pub use cursor::{RecordSet, DEFAULT_MAX_READ_COUNT};
pub use record::{CollisionPolicy, Record};
pub use writer::RecordWriter;
