//! CSV input and output for the enrichment run.
//!
//! The input table is kept intact so the output file carries every original
//! column followed by the enrichment columns.

use crate::enrichment::ResultSink;
use crate::errors::{AppError, ResultExt};
use crate::models::EnrichmentResult;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

pub const OUTPUT_COLUMNS: [&str; 4] = [
    "Company_Status",
    "Status_Change_Date",
    "Active_Directors",
    "Directors_Ages",
];

/// Input rows plus the column holding company numbers.
#[derive(Debug, Clone)]
pub struct InputTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    identifier_column: usize,
}

impl InputTable {
    /// Reads a CSV file with a header row and locates `column`.
    pub fn read(path: &Path, column: &str) -> Result<Self, AppError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| {
                AppError::Input(format!("Error reading input file {}: {}", path.display(), e))
            })?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::Input(format!("Failed to read header row: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let identifier_column = headers.iter().position(|h| h == column).ok_or_else(|| {
            AppError::Input(format!(
                "Column '{}' not found in the input file. Available columns: {}",
                column,
                headers.join(", ")
            ))
        })?;

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record
                .map_err(|e| AppError::Input(format!("Failed to read row {}: {}", idx + 1, e)))?;
            rows.push(record.iter().map(String::from).collect());
        }

        tracing::info!("Loaded {} rows from {}", rows.len(), path.display());

        Ok(Self {
            headers,
            rows,
            identifier_column,
        })
    }

    /// Raw identifier cells, one per row. Short rows yield an empty string.
    pub fn identifiers(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.get(self.identifier_column).cloned().unwrap_or_default())
            .collect()
    }
}

/// Collects results and writes the enriched table in one go.
pub struct CsvResultWriter {
    table: InputTable,
    results: Vec<Option<EnrichmentResult>>,
}

impl CsvResultWriter {
    pub fn new(table: InputTable) -> Self {
        let results = vec![None; table.rows.len()];
        Self { table, results }
    }

    /// Writes every input row with its enrichment columns to `path`.
    ///
    /// Rows without a result (not reached, or cut off) get empty columns.
    pub fn finish(&self, path: &Path) -> Result<(), AppError> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;

        let mut header: Vec<&str> = self.table.headers.iter().map(String::as_str).collect();
        header.extend(OUTPUT_COLUMNS);
        writer.write_record(&header).context("Failed to write header row")?;

        for (row, result) in self.table.rows.iter().zip(&self.results) {
            let mut record = row.clone();
            // Pad ragged rows so the enrichment columns line up
            record.resize(self.table.headers.len().max(row.len()), String::new());
            record.extend(enrichment_columns(result.as_ref()));
            writer.write_record(&record).context("Failed to write row")?;
        }

        writer.flush()?;
        tracing::info!("Results saved to {}", path.display());
        Ok(())
    }
}

impl ResultSink for CsvResultWriter {
    fn accept(&mut self, position: usize, result: EnrichmentResult) -> Result<(), AppError> {
        let slot = self.results.get_mut(position).ok_or_else(|| {
            AppError::Output(format!("No input row at position {}", position))
        })?;
        *slot = Some(result);
        Ok(())
    }
}

fn enrichment_columns(result: Option<&EnrichmentResult>) -> [String; 4] {
    match result {
        Some(r) => [
            r.status.clone().unwrap_or_default(),
            r.status_change_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            r.active_directors.clone().unwrap_or_default(),
            r.directors_ages.clone().unwrap_or_default(),
        ],
        None => Default::default(),
    }
}

/// `output_YYYYmmdd_HHMMSS.csv` inside `dir`.
pub fn output_path(dir: &Path, now: DateTime<Local>) -> PathBuf {
    dir.join(format!("output_{}.csv", now.format("%Y%m%d_%H%M%S")))
}
