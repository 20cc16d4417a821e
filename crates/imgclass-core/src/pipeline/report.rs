//! Plain-text classification report.
//!
//! Each classified file produces a three-line record followed by a blank line:
//!
//! ```text
//! File: <path>
//! Predicted class: <index>
//! Class probabilities: <s0> <s1> ... <sN-1>
//!
//! ```

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{ClassifyError, Result};

use super::invoker::ScoreTensor;

/// Index of the largest score, preferring the lowest index on ties.
///
/// NaN scores are never selected. Returns `None` when no score is a number.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, max)) if score <= max => {}
            _ => best = Some((idx, score)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// One file's classification, formatted as a report record.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRecord<'a> {
    pub source: &'a str,
    pub predicted_class: Option<usize>,
    pub scores: &'a [f32],
}

impl<'a> ClassificationRecord<'a> {
    pub fn new(source: &'a str, scores: &'a [f32]) -> Self {
        Self {
            source,
            predicted_class: argmax(scores),
            scores,
        }
    }
}

impl fmt::Display for ClassificationRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File: {}", self.source)?;
        match self.predicted_class {
            Some(idx) => writeln!(f, "Predicted class: {}", idx)?,
            None => writeln!(f, "Predicted class: none")?,
        }
        write!(f, "Class probabilities:")?;
        for score in self.scores {
            write!(f, " {}", score)?;
        }
        writeln!(f)?;
        writeln!(f)
    }
}

/// Appends records to a report sink.
///
/// Scores are written with the shortest decimal that reads back to the same
/// `f32` (`0.84018773`, `1`), not rounded to a fixed number of significant
/// digits. Values are separated by single spaces with no trailing space.
pub struct ReportWriter<W: Write> {
    sink: W,
    records: usize,
}

impl ReportWriter<BufWriter<File>> {
    /// Create (or truncate) the report file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(ClassifyError::SinkWrite)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, records: 0 }
    }

    /// Write the record for `source` and return the predicted class.
    pub fn report(&mut self, source: &str, scores: &ScoreTensor<'_>) -> Result<Option<usize>> {
        let record = ClassificationRecord::new(source, scores.scores());
        self.write_record(&record)?;
        Ok(record.predicted_class)
    }

    pub fn write_record(&mut self, record: &ClassificationRecord<'_>) -> Result<()> {
        write!(self.sink, "{}", record).map_err(ClassifyError::SinkWrite)?;
        self.records += 1;
        Ok(())
    }

    /// Record a file that could not be classified.
    pub fn report_error(&mut self, source: &str, error: &dyn fmt::Display) -> Result<()> {
        write!(self.sink, "File: {}\nError: {}\n\n", source, error)
            .map_err(ClassifyError::SinkWrite)?;
        self.records += 1;
        Ok(())
    }

    /// Records written so far, including error records.
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush().map_err(ClassifyError::SinkWrite)
    }

    /// Flush and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.sink)
    }
}
