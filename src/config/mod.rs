#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::adapters::ollama::{DEFAULT_MODEL, DEFAULT_SERVER_URL, DEFAULT_TIMEOUT_SECS};
use crate::core::naming::DEFAULT_OUTPUT_SHEET;
use crate::core::prompt::{DEFAULT_INSTRUCTION, DEFAULT_MAX_CHARS, DEFAULT_MAX_ROWS};
use crate::core::range::parse_reference;
use crate::core::sampling::{DEFAULT_SAMPLE_SIZE, DEFAULT_SAMPLE_THRESHOLD};
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

/// Fully resolved settings for one analysis run (defaults, then config
/// file, then command line flags).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSettings {
    pub input_path: String,
    pub range: Option<String>,
    pub server_url: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub model_options: BTreeMap<String, serde_json::Value>,
    pub instruction: String,
    pub sample_threshold: usize,
    pub sample_size: usize,
    pub prompt_rows: usize,
    pub max_prompt_chars: usize,
    pub output_sheet_name: String,
    pub timestamp_names: bool,
    pub strip_thinking: bool,
    pub monitor: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            input_path: String::new(),
            range: None,
            server_url: DEFAULT_SERVER_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            model_options: BTreeMap::new(),
            instruction: DEFAULT_INSTRUCTION.to_string(),
            sample_threshold: DEFAULT_SAMPLE_THRESHOLD,
            sample_size: DEFAULT_SAMPLE_SIZE,
            prompt_rows: DEFAULT_MAX_ROWS,
            max_prompt_chars: DEFAULT_MAX_CHARS,
            output_sheet_name: DEFAULT_OUTPUT_SHEET.to_string(),
            timestamp_names: false,
            strip_thinking: true,
            monitor: false,
        }
    }
}

impl AnalysisSettings {
    /// 取得 workbook 目錄與工作表名稱 (檔名去掉副檔名)
    pub fn workbook_location(&self) -> (String, String) {
        let path = Path::new(&self.input_path);
        let dir = path
            .parent()
            .and_then(|p| p.to_str())
            .filter(|p| !p.is_empty())
            .unwrap_or(".")
            .to_string();
        let sheet = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        (dir, sheet)
    }
}

impl ConfigProvider for AnalysisSettings {
    fn server_url(&self) -> &str {
        &self.server_url
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    fn model_options(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.model_options
    }

    fn instruction(&self) -> &str {
        &self.instruction
    }

    fn range(&self) -> Option<&str> {
        self.range.as_deref()
    }

    fn sample_threshold(&self) -> usize {
        self.sample_threshold
    }

    fn sample_size(&self) -> usize {
        self.sample_size
    }

    fn prompt_rows(&self) -> usize {
        self.prompt_rows
    }

    fn max_prompt_chars(&self) -> usize {
        self.max_prompt_chars
    }

    fn output_sheet_name(&self) -> &str {
        &self.output_sheet_name
    }

    fn timestamp_names(&self) -> bool {
        self.timestamp_names
    }

    fn strip_thinking(&self) -> bool {
        self.strip_thinking
    }
}

impl Validate for AnalysisSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input", &self.input_path)?;
        validation::validate_file_extension("input", &self.input_path, &["csv"])?;
        validation::validate_url("server.url", &self.server_url)?;
        validation::validate_non_empty_string("server.model", &self.model)?;
        validation::validate_range("server.timeout_seconds", self.timeout_seconds, 1, 3600)?;
        validation::validate_positive_number("sampling.sample_size", self.sample_size, 1)?;
        validation::validate_positive_number("prompt.max_rows", self.prompt_rows, 1)?;
        validation::validate_range("prompt.max_chars", self.max_prompt_chars, 200, 100_000)?;
        validation::validate_non_empty_string("output.sheet_name", &self.output_sheet_name)?;

        if let Some(range) = &self.range {
            parse_reference(range)?;
        }

        if self.timeout_seconds > 600 {
            tracing::warn!(
                "Ollama timeout is very high ({}s > 10 minutes)",
                self.timeout_seconds
            );
        }
        if self.sample_size > 50_000 {
            tracing::warn!("Large sample size may cause memory issues");
        }

        Ok(())
    }
}
