use crate::config::AnalysisSettings;
use crate::utils::error::{AnalysisError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub input: InputSection,
    pub server: ServerSection,
    pub sampling: SamplingSection,
    pub prompt: PromptSection,
    pub output: OutputSection,
    pub monitoring: MonitoringSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSection {
    pub path: Option<String>,
    pub range: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub url: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub options: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingSection {
    pub threshold: Option<usize>,
    pub sample_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSection {
    pub instruction: Option<String>,
    pub max_rows: Option<usize>,
    pub max_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub sheet_name: Option<String>,
    pub strip_thinking: Option<bool>,
    pub timestamp_names: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSection {
    pub enabled: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| AnalysisError::ConfigError {
            message: format!("Cannot read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${OLLAMA_HOST})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AnalysisError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                tracing::warn!("Environment variable {} is not set", var_name);
                format!("${{{}}}", var_name)
            })
        });

        Ok(result.to_string())
    }

    /// 將檔案中有設定的值覆蓋到 settings
    pub fn apply_to(&self, settings: &mut AnalysisSettings) {
        if let Some(path) = &self.input.path {
            settings.input_path = path.clone();
        }
        if let Some(range) = &self.input.range {
            settings.range = Some(range.clone());
        }

        if let Some(url) = &self.server.url {
            settings.server_url = url.clone();
        }
        if let Some(model) = &self.server.model {
            settings.model = model.clone();
        }
        if let Some(timeout) = self.server.timeout_seconds {
            settings.timeout_seconds = timeout;
        }
        if let Some(options) = &self.server.options {
            settings.model_options = options.clone();
        }

        if let Some(threshold) = self.sampling.threshold {
            settings.sample_threshold = threshold;
        }
        if let Some(size) = self.sampling.sample_size {
            settings.sample_size = size;
        }

        if let Some(instruction) = &self.prompt.instruction {
            settings.instruction = instruction.clone();
        }
        if let Some(max_rows) = self.prompt.max_rows {
            settings.prompt_rows = max_rows;
        }
        if let Some(max_chars) = self.prompt.max_chars {
            settings.max_prompt_chars = max_chars;
        }

        if let Some(name) = &self.output.sheet_name {
            settings.output_sheet_name = name.clone();
        }
        if let Some(strip) = self.output.strip_thinking {
            settings.strip_thinking = strip;
        }
        if let Some(timestamp) = self.output.timestamp_names {
            settings.timestamp_names = timestamp;
        }

        if let Some(enabled) = self.monitoring.enabled {
            settings.monitor = enabled;
        }
    }

    pub fn to_settings(&self) -> AnalysisSettings {
        let mut settings = AnalysisSettings::default();
        self.apply_to(&mut settings);
        settings
    }
}
