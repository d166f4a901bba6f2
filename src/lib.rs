pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{
    ollama::OllamaClient,
    storage::LocalStorage,
    workbook::{DirectoryWorkbook, MemoryWorkbook},
};
pub use config::{toml_config::TomlConfig, AnalysisSettings};
pub use core::{engine::AnalysisEngine, pipeline::RangeAnalysisPipeline};
pub use utils::error::{AnalysisError, Result};
