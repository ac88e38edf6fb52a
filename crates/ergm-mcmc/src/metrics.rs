use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Append-only matrix of statistic snapshots, one row per recorded sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    names: Vec<String>,
    values: Vec<f64>,
}

impl SampleRecord {
    /// Empty record with the given column names.
    pub fn new(names: Vec<String>) -> Self {
        Self {
            names,
            values: Vec::new(),
        }
    }

    /// Column names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of columns.
    pub fn dimension(&self) -> usize {
        self.names.len()
    }

    /// Appends a snapshot. `row` must have one value per column.
    pub fn push(&mut self, row: &[f64]) {
        debug_assert_eq!(row.len(), self.dimension());
        self.values.extend_from_slice(row);
    }

    /// Number of recorded rows.
    pub fn len(&self) -> usize {
        if self.names.is_empty() {
            0
        } else {
            self.values.len() / self.names.len()
        }
    }

    /// Returns true when no row has been recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Row-major view of the whole matrix.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterates rows in recording order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.values.chunks(self.dimension().max(1))
    }

    /// Arithmetic mean of every column (zeros for an empty record).
    pub fn column_means(&self) -> Vec<f64> {
        let mut means = vec![0.0; self.dimension()];
        if self.is_empty() {
            return means;
        }
        for row in self.rows() {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        let count = self.len() as f64;
        means.iter_mut().for_each(|mean| *mean /= count);
        means
    }

    /// Population variance of every column.
    pub fn column_variances(&self) -> Vec<f64> {
        let means = self.column_means();
        let mut variances = vec![0.0; self.dimension()];
        if self.len() < 2 {
            return variances;
        }
        for row in self.rows() {
            for ((variance, value), mean) in variances.iter_mut().zip(row).zip(&means) {
                *variance += (value - mean) * (value - mean);
            }
        }
        let count = self.len() as f64;
        variances.iter_mut().for_each(|variance| *variance /= count);
        variances
    }

    /// Writes the record as CSV with a `sample` index column.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let mut file = BufWriter::new(File::create(path)?);
        write!(file, "sample")?;
        for name in &self.names {
            write!(file, ",{name}")?;
        }
        writeln!(file)?;
        for (index, row) in self.rows().enumerate().take(self.len()) {
            write!(file, "{index}")?;
            for value in row {
                write!(file, ",{value}")?;
            }
            writeln!(file)?;
        }
        file.flush()
    }
}
