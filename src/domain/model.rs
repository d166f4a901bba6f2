use crate::utils::error::{AnalysisError, Result};
use serde::Serialize;
use std::fmt;

/// A single cell of the selected range.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(raw.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            // 整數不顯示小數點，和試算表一致
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// Rectangular selection: row 0 of the source holds the column names.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Grid {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { headers, rows }
    }

    /// Builds a grid from raw cell text. Blank headers become `Column{n}`,
    /// short rows are padded and extra cells are dropped.
    pub fn from_rows(raw: Vec<Vec<String>>) -> Result<Self> {
        let mut iter = raw.into_iter();
        let header_row = iter.next().ok_or_else(|| AnalysisError::EmptySelectionError {
            message: "no header row".to_string(),
        })?;

        if header_row.is_empty() {
            return Err(AnalysisError::EmptySelectionError {
                message: "header row has no columns".to_string(),
            });
        }

        let headers: Vec<String> = header_row
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let name = name.trim();
                if name.is_empty() {
                    format!("Column{}", i + 1)
                } else {
                    name.to_string()
                }
            })
            .collect();

        let width = headers.len();
        let rows = iter
            .map(|row| {
                let mut cells: Vec<CellValue> =
                    row.iter().take(width).map(|c| CellValue::parse(c)).collect();
                cells.resize(width, CellValue::Empty);
                cells
            })
            .collect();

        Ok(Self { headers, rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Per-column value kind and empty-cell count over every data row.
    pub fn column_profiles(&self) -> Vec<ColumnProfile> {
        self.headers
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let mut numbers = 0;
                let mut texts = 0;
                let mut empty_cells = 0;
                for cell in self.rows.iter().filter_map(|row| row.get(col)) {
                    match cell {
                        CellValue::Empty => empty_cells += 1,
                        CellValue::Number(_) => numbers += 1,
                        CellValue::Text(_) => texts += 1,
                    }
                }

                let kind = match (numbers, texts) {
                    (0, 0) => ColumnKind::Empty,
                    (_, 0) => ColumnKind::Number,
                    (0, _) => ColumnKind::Text,
                    _ => ColumnKind::Mixed,
                };

                ColumnProfile {
                    name: name.clone(),
                    kind,
                    empty_cells,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Empty,
    Number,
    Text,
    Mixed,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnKind::Empty => "empty",
            ColumnKind::Number => "number",
            ColumnKind::Text => "text",
            ColumnKind::Mixed => "mixed",
        };
        f.write_str(label)
    }
}

/// Summary of one column, rendered as `Revenue (number, 1 empty)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub empty_cells: usize,
}

impl fmt::Display for ColumnProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            // 全空欄位不再重複空白數
            ColumnKind::Empty => write!(f, "{} (empty)", self.name),
            _ if self.empty_cells > 0 => {
                write!(f, "{} ({}, {} empty)", self.name, self.kind, self.empty_cells)
            }
            _ => write!(f, "{} ({})", self.name, self.kind),
        }
    }
}

/// Rows picked from a grid for the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub grid: Grid,
    pub total_rows: usize,
    /// Positions of the kept rows in the source grid.
    pub row_indices: Vec<usize>,
    /// Column profiles of the source grid, before sampling.
    pub columns: Vec<ColumnProfile>,
}

impl Sample {
    pub fn is_sampled(&self) -> bool {
        self.grid.rows.len() < self.total_rows
    }
}

/// Result of the transform phase.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub prompt: String,
    pub text: String,
    pub lines: Vec<String>,
    pub total_rows: usize,
    pub sampled_rows: usize,
    pub warnings: Vec<String>,
}

/// Result of the load phase.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub sheet_name: String,
    pub lines_written: usize,
    pub used_fallback: bool,
    pub warnings: Vec<String>,
}
