// ============================================================
// Layer 6 - Metrics Logger
// ============================================================
// Appends one CSV row per epoch record.
//
// Columns: epoch, iterations_done, train_cost, then every
// monitored metric in name order. The column set is fixed by
// the first record logged (or by the header of an existing
// file, so a resumed run keeps appending to the same table).
// Missing values are written as empty cells.
//
// Example output for the default MNIST run:
//   epoch,iterations_done,train_cost,test_cost,test_error_rate
//   0,0,,2.302571,0.901800
//   1,1200,0.405712,0.275113,0.080100
//   2,2400,0.264077,0.226315,0.064700

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::{error::Result, state::EpochRecord};

const FIXED_COLUMNS: [&str; 3] = ["epoch", "iterations_done", "train_cost"];

pub struct MetricsLogger {
    csv_path: PathBuf,
    /// Metric columns after the fixed ones; empty until a header exists
    columns:  Vec<String>,
}

impl MetricsLogger {
    /// Opens `csv_path` for appending, picking up the header of an
    /// existing file.
    pub fn new(csv_path: impl Into<PathBuf>) -> Result<Self> {
        let csv_path = csv_path.into();
        if let Some(dir) = csv_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let columns = match fs::read_to_string(&csv_path) {
            Ok(existing) => existing
                .lines()
                .next()
                .map(|header| {
                    header
                        .split(',')
                        .skip(FIXED_COLUMNS.len())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { csv_path, columns })
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    /// Appends `record` as one row, writing the header first if needed.
    pub fn log(&mut self, record: &EpochRecord) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.csv_path)?;

        if f.metadata()?.len() == 0 {
            self.columns = record.metrics.keys().cloned().collect();
            let header: Vec<&str> = FIXED_COLUMNS
                .iter()
                .copied()
                .chain(self.columns.iter().map(String::as_str))
                .collect();
            writeln!(f, "{}", header.join(","))?;
            tracing::debug!("Created metrics CSV: '{}'", self.csv_path.display());
        }

        writeln!(f, "{}", self.row(record))?;
        Ok(())
    }

    fn row(&self, record: &EpochRecord) -> String {
        let mut cells = vec![
            record.epoch.to_string(),
            record.iterations_done.to_string(),
            record.train_cost.map(|c| format!("{c:.6}")).unwrap_or_default(),
        ];
        cells.extend(self.columns.iter().map(|name| {
            record
                .metrics
                .get(name)
                .map(|v| format!("{v:.6}"))
                .unwrap_or_default()
        }));
        cells.join(",")
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(epoch: usize, train_cost: Option<f64>, metrics: &[(&str, f64)]) -> EpochRecord {
        EpochRecord {
            epoch,
            iterations_done: epoch * 1200,
            train_cost,
            metrics: metrics
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn writes_header_once_then_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/metrics.csv");
        let mut logger = MetricsLogger::new(&path).unwrap();

        logger
            .log(&record(0, None, &[("test_error_rate", 0.9), ("test_cost", 2.3)]))
            .unwrap();
        logger
            .log(&record(1, Some(0.4), &[("test_error_rate", 0.08), ("test_cost", 0.27)]))
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "epoch,iterations_done,train_cost,test_cost,test_error_rate",
                "0,0,,2.300000,0.900000",
                "1,1200,0.400000,0.270000,0.080000",
            ]
        );
    }

    #[test]
    fn reopening_keeps_existing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        MetricsLogger::new(&path)
            .unwrap()
            .log(&record(1, Some(0.5), &[("test_cost", 0.3)]))
            .unwrap();

        let mut resumed = MetricsLogger::new(&path).unwrap();
        // a metric unknown to the header is dropped from the row
        resumed
            .log(&record(2, Some(0.25), &[("test_cost", 0.2), ("valid_cost", 0.1)]))
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert_eq!(text.lines().last(), Some("2,2400,0.250000,0.200000"));
    }
}
