use crate::config::toml_config::TomlConfig;
use crate::config::AnalysisSettings;
use crate::utils::error::Result;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "excel-ollama")]
#[command(about = "Send a spreadsheet range to an Ollama server and write the answer to a new sheet")]
pub struct CliConfig {
    /// Input sheet (CSV file); its directory is the workbook
    #[arg(short, long)]
    pub input: Option<String>,

    /// Cell range to analyze, e.g. A1:D200 or Data!A1:D200
    #[arg(short, long)]
    pub range: Option<String>,

    /// Ollama server URL, e.g. http://your-ec2-ip:11434
    #[arg(long)]
    pub server: Option<String>,

    #[arg(short, long)]
    pub model: Option<String>,

    /// Instruction placed at the top of the prompt
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Base name of the output sheet
    #[arg(long)]
    pub sheet_name: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long)]
    pub max_prompt_chars: Option<usize>,

    #[arg(long)]
    pub sample_threshold: Option<usize>,

    #[arg(long)]
    pub sample_size: Option<usize>,

    /// Data rows included in the prompt
    #[arg(long)]
    pub prompt_rows: Option<usize>,

    /// Keep <think> blocks from reasoning models in the output
    #[arg(long)]
    pub keep_thinking: bool,

    /// Append a timestamp to the output sheet name
    #[arg(long)]
    pub timestamp_names: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log per-phase CPU and memory usage")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

impl CliConfig {
    /// 預設值 -> 設定檔 -> 命令列參數
    pub fn resolve(&self) -> Result<AnalysisSettings> {
        let mut settings = AnalysisSettings::default();

        if let Some(path) = &self.config {
            tracing::info!("📁 Loading configuration from: {}", path);
            TomlConfig::from_file(path)?.apply_to(&mut settings);
        }

        if let Some(input) = &self.input {
            settings.input_path = input.clone();
        }
        if let Some(range) = &self.range {
            settings.range = Some(range.clone());
        }
        if let Some(server) = &self.server {
            settings.server_url = server.clone();
        }
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(prompt) = &self.prompt {
            settings.instruction = prompt.clone();
        }
        if let Some(name) = &self.sheet_name {
            settings.output_sheet_name = name.clone();
        }
        if let Some(timeout) = self.timeout {
            settings.timeout_seconds = timeout;
        }
        if let Some(max_chars) = self.max_prompt_chars {
            settings.max_prompt_chars = max_chars;
        }
        if let Some(threshold) = self.sample_threshold {
            settings.sample_threshold = threshold;
        }
        if let Some(size) = self.sample_size {
            settings.sample_size = size;
        }
        if let Some(rows) = self.prompt_rows {
            settings.prompt_rows = rows;
        }
        if self.keep_thinking {
            settings.strip_thinking = false;
        }
        if self.timestamp_names {
            settings.timestamp_names = true;
        }
        if self.monitor {
            settings.monitor = true;
        }

        Ok(settings)
    }
}
