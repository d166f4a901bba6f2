use crate::utils::error::{AnalysisError, Result};
use std::fmt;
use std::str::FromStr;

/// Largest sheet Excel can address (XFD1048576).
pub const MAX_ROWS: usize = 1_048_576;
pub const MAX_COLUMNS: usize = 16_384;

/// Zero-based, inclusive cell rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl CellRange {
    pub fn new(start_row: usize, start_col: usize, end_row: usize, end_col: usize) -> Self {
        Self {
            start_row: start_row.min(end_row),
            start_col: start_col.min(end_col),
            end_row: start_row.max(end_row),
            end_col: start_col.max(end_col),
        }
    }

    /// Parses `A1:C10` or a single cell such as `B2`.
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = |reason: &str| AnalysisError::InvalidRangeError {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(invalid("range is empty"));
        }

        let (first, second) = match trimmed.split_once(':') {
            Some((a, b)) => (a, b),
            None => (trimmed, trimmed),
        };

        let (r1, c1) = parse_cell_ref(first.trim()).ok_or_else(|| invalid("expected cells like A1 or A1:C10"))?;
        let (r2, c2) = parse_cell_ref(second.trim()).ok_or_else(|| invalid("expected cells like A1 or A1:C10"))?;

        if r1.max(r2) >= MAX_ROWS || c1.max(c2) >= MAX_COLUMNS {
            return Err(invalid("range is outside the sheet limits"));
        }

        Ok(Self::new(r1, c1, r2, c2))
    }

    pub fn row_count(&self) -> usize {
        self.end_row - self.start_row + 1
    }

    pub fn column_count(&self) -> usize {
        self.end_col - self.start_col + 1
    }

    /// Cuts the range out of a sheet. Rows past the end of the sheet are
    /// omitted, missing cells become empty strings, and trailing blank rows
    /// are dropped.
    pub fn apply(&self, sheet: &[Vec<String>]) -> Vec<Vec<String>> {
        let mut selected: Vec<Vec<String>> = sheet
            .iter()
            .skip(self.start_row)
            .take(self.row_count())
            .map(|row| {
                (self.start_col..=self.end_col)
                    .map(|col| row.get(col).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        while selected
            .last()
            .is_some_and(|row| row.iter().all(|c| c.trim().is_empty()))
        {
            selected.pop();
        }
        selected
    }
}

impl FromStr for CellRange {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}{}",
            column_letters(self.start_col),
            self.start_row + 1,
            column_letters(self.end_col),
            self.end_row + 1
        )
    }
}

/// Splits `Sheet!A1:B2` into its sheet and range parts. Quoted sheet names
/// (`'My Data'!A1:B2`) are unquoted.
pub fn parse_reference(reference: &str) -> Result<(Option<String>, CellRange)> {
    match reference.rsplit_once('!') {
        Some((sheet, range)) => {
            let sheet = sheet.trim();
            let sheet = sheet
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
                .unwrap_or(sheet);
            if sheet.is_empty() {
                return Err(AnalysisError::InvalidRangeError {
                    reference: reference.to_string(),
                    reason: "sheet name before '!' is empty".to_string(),
                });
            }
            Ok((Some(sheet.to_string()), CellRange::parse(range)?))
        }
        None => Ok((None, CellRange::parse(reference)?)),
    }
}

/// Parses `B3` into zero-based `(row, col)`; `$` anchors are ignored.
pub fn parse_cell_ref(s: &str) -> Option<(usize, usize)> {
    let s = s.replace('$', "").to_uppercase();
    let mut col_str = String::new();
    let mut row_str = String::new();

    for c in s.chars() {
        if c.is_ascii_alphabetic() && row_str.is_empty() {
            col_str.push(c);
        } else if c.is_ascii_digit() {
            row_str.push(c);
        } else {
            return None;
        }
    }

    if col_str.is_empty() || row_str.is_empty() || col_str.len() > 3 {
        return None;
    }

    // A=0, B=1, ..., Z=25, AA=26, ...
    let mut col: usize = 0;
    for c in col_str.chars() {
        col = col * 26 + (c as usize - 'A' as usize + 1);
    }
    col -= 1;

    let row: usize = row_str.parse().ok()?;
    if row == 0 {
        return None;
    }

    Some((row - 1, col))
}

pub fn column_letters(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (col % 26) as u8) as char);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.iter().rev().collect()
}
