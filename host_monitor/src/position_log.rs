//! Append-only log of position fixes, one `x y` line per fix.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Result;

pub struct PositionLog<W: Write> {
    writer: W,
}

impl PositionLog<BufWriter<File>> {
    /// Open `path` for appending, creating it if needed.
    pub fn append(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> PositionLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one fix and flush so the file is usable while we run.
    pub fn record(&mut self, x: f32, y: f32) -> Result<()> {
        writeln!(self.writer, "{} {}", format_coordinate(x), format_coordinate(y))?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn format_coordinate(value: f32) -> String {
    format!("{:.3}", value)
}
