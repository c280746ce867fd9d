use crate::records::cursor::RecordSet;
use crate::records::record::Record;
use anyhow::{Context, Result};
use std::io::Write;

/// Writes records as JSON Lines, one object per row
pub struct RecordWriter<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W) -> Self {
        RecordWriter { writer, written: 0 }
    }

    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        let json = serde_json::to_string(record).context("Failed to serialize record")?;
        writeln!(self.writer, "{}", json).context("Failed to write record")?;
        self.written += 1;
        Ok(())
    }

    pub fn write_records(&mut self, records: &RecordSet) -> Result<()> {
        for record in records.records() {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Number of rows written so far
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }

    /// Access the underlying output for non-record text
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
