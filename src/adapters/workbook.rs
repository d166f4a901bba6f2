use crate::domain::ports::{Storage, Workbook};
use crate::utils::error::{AnalysisError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

const SHEET_EXTENSION: &str = "csv";

fn sheet_file(name: &str) -> String {
    format!("{}.{}", name, SHEET_EXTENSION)
}

fn parse_csv(data: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }
    Ok(rows)
}

fn to_csv(rows: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(Vec::new());

    for row in rows {
        writer.write_record(row)?;
    }
    writer.into_inner().map_err(|e| AnalysisError::IoError(e.into_error()))
}

fn lines_as_rows(lines: &[String]) -> Vec<Vec<String>> {
    lines.iter().map(|line| vec![line.clone()]).collect()
}

/// A directory of CSV files, one file per sheet.
pub struct DirectoryWorkbook<S: Storage> {
    storage: S,
    active: String,
}

impl<S: Storage> DirectoryWorkbook<S> {
    pub fn new(storage: S, active: impl Into<String>) -> Self {
        Self {
            storage,
            active: active.into(),
        }
    }

    /// Finds the file backing a sheet. The extension may be in any case
    /// (`Data.CSV`); an exact stem match wins over a case-insensitive one.
    async fn resolve_file(&self, name: &str) -> Result<Option<String>> {
        let files = self.storage.list_files(SHEET_EXTENSION).await?;
        let stem_of = |file: &String| {
            std::path::Path::new(file)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(|stem| stem.to_string())
        };

        let exact = files.iter().find(|f| stem_of(f).as_deref() == Some(name));
        let found = exact.or_else(|| {
            files
                .iter()
                .find(|f| stem_of(f).is_some_and(|stem| stem.eq_ignore_ascii_case(name)))
        });
        Ok(found.cloned())
    }

    async fn existing_file(&self, name: &str) -> Result<String> {
        self.resolve_file(name)
            .await?
            .ok_or_else(|| AnalysisError::SheetError {
                name: name.to_string(),
                message: "sheet does not exist".to_string(),
            })
    }
}

#[async_trait]
impl<S: Storage> Workbook for DirectoryWorkbook<S> {
    async fn sheet_names(&self) -> Result<Vec<String>> {
        let files = self.storage.list_files(SHEET_EXTENSION).await?;
        Ok(files
            .iter()
            .filter_map(|f| std::path::Path::new(f).file_stem())
            .filter_map(|stem| stem.to_str())
            .map(|stem| stem.to_string())
            .collect())
    }

    async fn active_sheet(&self) -> Result<String> {
        Ok(self.active.clone())
    }

    async fn read_sheet(&self, name: &str) -> Result<Vec<Vec<String>>> {
        let file = self.existing_file(name).await?;
        let data = self.storage.read_file(&file).await?;
        parse_csv(&data)
    }

    async fn create_sheet(&self, name: &str) -> Result<()> {
        if self.resolve_file(name).await?.is_some() {
            return Err(AnalysisError::SheetError {
                name: name.to_string(),
                message: "sheet already exists".to_string(),
            });
        }

        tracing::debug!("Creating sheet file {}", sheet_file(name));
        self.storage.write_file(&sheet_file(name), &[]).await
    }

    async fn write_lines(&self, name: &str, lines: &[String]) -> Result<()> {
        let file = self
            .resolve_file(name)
            .await?
            .unwrap_or_else(|| sheet_file(name));
        let data = to_csv(&lines_as_rows(lines))?;
        self.storage.write_file(&file, &data).await
    }

    async fn append_lines(&self, name: &str, lines: &[String]) -> Result<()> {
        let file = self.existing_file(name).await?;
        let mut rows = parse_csv(&self.storage.read_file(&file).await?)?;
        if !rows.is_empty() {
            rows.push(vec![String::new()]);
        }
        rows.extend(lines_as_rows(lines));

        let data = to_csv(&rows)?;
        self.storage.write_file(&file, &data).await
    }

    async fn remove_sheet(&self, name: &str) -> Result<()> {
        let file = self.existing_file(name).await?;
        tracing::debug!("Removing sheet file {}", file);
        self.storage.remove_file(&file).await
    }
}

/// In-memory workbook. `refuse_new_sheets` makes `create_sheet` fail, the
/// way a protected workbook does.
pub struct MemoryWorkbook {
    sheets: Mutex<BTreeMap<String, Vec<Vec<String>>>>,
    active: String,
    refuse_new_sheets: bool,
    fail_writes: bool,
}

impl MemoryWorkbook {
    pub fn new(active: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        let active = active.into();
        let mut sheets = BTreeMap::new();
        sheets.insert(active.clone(), rows);
        Self {
            sheets: Mutex::new(sheets),
            active,
            refuse_new_sheets: false,
            fail_writes: false,
        }
    }

    pub fn with_sheet(mut self, name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        self.sheets.get_mut().insert(name.into(), rows);
        self
    }

    pub fn refuse_new_sheets(mut self) -> Self {
        self.refuse_new_sheets = true;
        self
    }

    /// Makes `write_lines` fail, like a disk running full mid-run.
    pub fn fail_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub async fn sheet(&self, name: &str) -> Option<Vec<Vec<String>>> {
        self.sheets.lock().await.get(name).cloned()
    }
}

#[async_trait]
impl Workbook for MemoryWorkbook {
    async fn sheet_names(&self) -> Result<Vec<String>> {
        Ok(self.sheets.lock().await.keys().cloned().collect())
    }

    async fn active_sheet(&self) -> Result<String> {
        Ok(self.active.clone())
    }

    async fn read_sheet(&self, name: &str) -> Result<Vec<Vec<String>>> {
        self.sheets
            .lock()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AnalysisError::SheetError {
                name: name.to_string(),
                message: "sheet does not exist".to_string(),
            })
    }

    async fn create_sheet(&self, name: &str) -> Result<()> {
        if self.refuse_new_sheets {
            return Err(AnalysisError::SheetError {
                name: name.to_string(),
                message: "workbook structure is protected".to_string(),
            });
        }

        let mut sheets = self.sheets.lock().await;
        if sheets.keys().any(|s| s.eq_ignore_ascii_case(name)) {
            return Err(AnalysisError::SheetError {
                name: name.to_string(),
                message: "sheet already exists".to_string(),
            });
        }
        sheets.insert(name.to_string(), Vec::new());
        Ok(())
    }

    async fn write_lines(&self, name: &str, lines: &[String]) -> Result<()> {
        if self.fail_writes {
            return Err(AnalysisError::SheetError {
                name: name.to_string(),
                message: "write failed".to_string(),
            });
        }
        self.sheets
            .lock()
            .await
            .insert(name.to_string(), lines_as_rows(lines));
        Ok(())
    }

    async fn append_lines(&self, name: &str, lines: &[String]) -> Result<()> {
        let mut sheets = self.sheets.lock().await;
        let rows = sheets.entry(name.to_string()).or_default();
        if !rows.is_empty() {
            rows.push(vec![String::new()]);
        }
        rows.extend(lines_as_rows(lines));
        Ok(())
    }

    async fn remove_sheet(&self, name: &str) -> Result<()> {
        self.sheets
            .lock()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AnalysisError::SheetError {
                name: name.to_string(),
                message: "sheet does not exist".to_string(),
            })
    }
}
