use crate::domain::model::{AnalysisOutcome, AnalysisResult, Grid};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = Result<bool>> + Send;
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
    /// File names (not paths) directly under the storage root with the given extension.
    fn list_files(
        &self,
        extension: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn server_url(&self) -> &str;
    fn model(&self) -> &str;
    fn timeout_seconds(&self) -> u64;
    fn model_options(&self) -> &BTreeMap<String, serde_json::Value>;
    fn instruction(&self) -> &str;
    fn range(&self) -> Option<&str>;
    fn sample_threshold(&self) -> usize;
    fn sample_size(&self) -> usize;
    fn prompt_rows(&self) -> usize;
    fn max_prompt_chars(&self) -> usize;
    fn output_sheet_name(&self) -> &str;
    fn timestamp_names(&self) -> bool;
    fn strip_thinking(&self) -> bool;
}

/// Host spreadsheet as seen by the pipeline.
#[async_trait]
pub trait Workbook: Send + Sync {
    async fn sheet_names(&self) -> Result<Vec<String>>;
    /// Sheet the selection is read from and the fallback output target.
    async fn active_sheet(&self) -> Result<String>;
    async fn read_sheet(&self, name: &str) -> Result<Vec<Vec<String>>>;
    /// Fails if the sheet already exists or cannot be created.
    async fn create_sheet(&self, name: &str) -> Result<()>;
    /// Replaces the sheet content with one line per row in the first column.
    async fn write_lines(&self, name: &str, lines: &[String]) -> Result<()>;
    /// Adds the lines below the existing content, after one blank row.
    async fn append_lines(&self, name: &str, lines: &[String]) -> Result<()>;
    async fn remove_sheet(&self, name: &str) -> Result<()>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Grid>;
    async fn transform(&self, grid: Grid) -> Result<AnalysisResult>;
    async fn load(&self, result: AnalysisResult) -> Result<AnalysisOutcome>;
}
