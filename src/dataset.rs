//! Movie dataset loading and cleaning
//!
//! The CSV is read fully into memory. Cells are typed per column the way a
//! dataframe reader does it: missing-value tokens become [`Value::Missing`],
//! all-integer columns become [`Value::Int`] (promoted to floats if the column
//! has gaps), all-numeric columns become [`Value::Float`], anything else stays
//! text.

use crate::error::DatasetError;
use crate::types::{MovieRecord, Value, CERTIFICATE, GROSS, META_SCORE, OVERVIEW, SERIES_TITLE};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Dataset file, relative to the working directory
pub const MOVIES_DATASET: &str = "imdb_top_1000.csv";

/// Columns the pipeline reads or cleans
pub const REQUIRED_COLUMNS: [&str; 5] = [SERIES_TITLE, OVERVIEW, GROSS, CERTIFICATE, META_SCORE];

/// Cell contents treated as missing
const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_na(raw: &str) -> bool {
    NA_TOKENS.contains(&raw)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnKind {
    Int,
    Float,
    Text,
}

fn infer_kind(cells: &[Option<&str>]) -> ColumnKind {
    let present: Vec<&str> = cells.iter().flatten().copied().collect();
    if present.is_empty() {
        // an all-empty column reads as float NaN
        return ColumnKind::Float;
    }
    let has_gaps = present.len() < cells.len();
    if present.iter().all(|s| s.trim().parse::<i64>().is_ok()) {
        if has_gaps {
            ColumnKind::Float
        } else {
            ColumnKind::Int
        }
    } else if present.iter().all(|s| s.trim().parse::<f64>().is_ok()) {
        ColumnKind::Float
    } else {
        ColumnKind::Text
    }
}

fn typed(raw: Option<&str>, kind: ColumnKind) -> Value {
    let Some(raw) = raw else {
        return Value::Missing;
    };
    match kind {
        ColumnKind::Int => raw.trim().parse().map(Value::Int).unwrap_or(Value::Missing),
        ColumnKind::Float => match raw.trim().parse::<f64>() {
            Ok(f) if f.is_nan() => Value::Missing,
            Ok(f) => Value::Float(f),
            Err(_) => Value::Missing,
        },
        ColumnKind::Text => Value::Text(raw.to_string()),
    }
}

/// Give repeated header names a `.N` suffix so every column stays addressable.
/// A suffixed name that is already taken gets suffixed again (`A.1.1`).
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::with_capacity(headers.len());
    for mut name in headers {
        let mut count = seen.get(&name).copied().unwrap_or(0);
        while count > 0 {
            seen.insert(name.clone(), count + 1);
            name = format!("{}.{}", name, count);
            count = seen.get(&name).copied().unwrap_or(0);
        }
        seen.insert(name.clone(), count + 1);
        out.push(name);
    }
    out
}

/// In-memory movie table (rows × named columns), in file order
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Load and type a CSV file
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Parse CSV from any reader. The first record is the header.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv.headers()?.iter().map(str::to_string).collect();
        let columns = dedupe_headers(headers);
        let width = columns.len();

        let mut raw_rows = Vec::new();
        for (idx, record) in csv.records().enumerate() {
            let record = record?;
            if record.len() > width {
                return Err(DatasetError::RaggedRow {
                    row: idx + 1,
                    expected: width,
                    found: record.len(),
                });
            }
            let mut cells: Vec<Option<String>> = record
                .iter()
                .map(|raw| (!is_na(raw)).then(|| raw.to_string()))
                .collect();
            cells.resize(width, None);
            raw_rows.push(cells);
        }

        let kinds: Vec<ColumnKind> = (0..width)
            .map(|col| {
                let cells: Vec<Option<&str>> =
                    raw_rows.iter().map(|row| row[col].as_deref()).collect();
                infer_kind(&cells)
            })
            .collect();

        let rows = raw_rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&kinds)
                    .map(|(cell, kind)| typed(cell.as_deref(), *kind))
                    .collect()
            })
            .collect();

        let table = Self { columns, rows };
        for column in REQUIRED_COLUMNS {
            table.column_index(column)?;
        }

        tracing::debug!(rows = table.len(), columns = table.columns.len(), "dataset loaded");
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, column: &'static str) -> Result<usize, DatasetError> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or(DatasetError::MissingColumn(column))
    }

    /// Cell at `row` (0-based) in `column`
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Count of missing cells in a column
    pub fn missing_count(&self, column: &str) -> usize {
        match self.columns.iter().position(|c| c == column) {
            Some(col) => self.rows.iter().filter(|r| r[col].is_missing()).count(),
            None => 0,
        }
    }

    /// Apply the cleaning rules to the whole table, in order:
    ///
    /// 1. `Gross`: drop thousands separators, parse as float, missing → `0.0`
    /// 2. `Certificate`: missing → `"NA"`
    /// 3. `Meta_score`: missing → `-1`
    ///
    /// Running it again on a cleaned table changes nothing.
    pub fn clean(&mut self) -> Result<(), DatasetError> {
        let gross = self.column_index(GROSS)?;
        for (idx, row) in self.rows.iter_mut().enumerate() {
            row[gross] = clean_gross(&row[gross], idx + 1)?;
        }

        let certificate = self.column_index(CERTIFICATE)?;
        for row in &mut self.rows {
            if row[certificate].is_missing() {
                row[certificate] = Value::Text("NA".to_string());
            }
        }

        let meta_score = self.column_index(META_SCORE)?;
        for row in &mut self.rows {
            if row[meta_score].is_missing() {
                row[meta_score] = Value::Float(-1.0);
            }
        }

        Ok(())
    }

    /// Split the table into one record per row, preserving order
    pub fn into_records(self) -> Vec<MovieRecord> {
        let columns = self.columns;
        self.rows
            .into_iter()
            .map(|row| MovieRecord::new(columns.iter().cloned().zip(row).collect()))
            .collect()
    }
}

fn clean_gross(value: &Value, row: usize) -> Result<Value, DatasetError> {
    if let Some(f) = value.as_f64() {
        return Ok(Value::Float(if f.is_nan() { 0.0 } else { f }));
    }
    match value {
        Value::Text(raw) => {
            let stripped = raw.replace(',', "");
            let stripped = stripped.trim();
            if stripped.is_empty() || is_na(stripped) {
                return Ok(Value::Float(0.0));
            }
            match stripped.parse::<f64>() {
                Ok(f) if f.is_nan() => Ok(Value::Float(0.0)),
                Ok(f) => Ok(Value::Float(f)),
                Err(_) => Err(DatasetError::MalformedNumber {
                    column: GROSS,
                    row,
                    value: raw.clone(),
                }),
            }
        }
        _ => Ok(Value::Float(0.0)),
    }
}
