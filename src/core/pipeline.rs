use crate::adapters::ollama::OllamaClient;
use crate::core::naming::{timestamped_sheet_name, unique_sheet_name};
use crate::core::prompt::PromptBuilder;
use crate::core::range::parse_reference;
use crate::core::response::{parse_generate_response, split_lines, strip_thinking};
use crate::core::sampling::apply_sampling_policy;
use crate::core::{AnalysisOutcome, AnalysisResult, ConfigProvider, Grid, Pipeline, Workbook};
use crate::utils::error::{AnalysisError, Result};
use std::time::Duration;

pub const EMPTY_RESPONSE_LINE: &str = "(empty response)";

/// Selection -> prompt -> `/api/generate` -> new sheet.
pub struct RangeAnalysisPipeline<W: Workbook, C: ConfigProvider> {
    workbook: W,
    config: C,
    client: OllamaClient,
    prompt_builder: PromptBuilder,
}

impl<W: Workbook, C: ConfigProvider> RangeAnalysisPipeline<W, C> {
    pub fn new(workbook: W, config: C) -> Result<Self> {
        let client = OllamaClient::new(
            config.server_url(),
            config.model(),
            Duration::from_secs(config.timeout_seconds()),
        )?
        .with_options(config.model_options());

        let prompt_builder = PromptBuilder::new()
            .with_instruction(config.instruction())
            .with_max_rows(config.prompt_rows())
            .with_max_chars(config.max_prompt_chars());

        Ok(Self {
            workbook,
            config,
            client,
            prompt_builder,
        })
    }

    pub fn workbook(&self) -> &W {
        &self.workbook
    }

    async fn source_sheet(&self) -> Result<String> {
        if let Some(reference) = self.config.range() {
            if let (Some(sheet), _) = parse_reference(reference)? {
                return Ok(sheet);
            }
        }
        self.workbook.active_sheet().await
    }

    fn output_base_name(&self) -> String {
        let base = self.config.output_sheet_name();
        if self.config.timestamp_names() {
            timestamped_sheet_name(base)
        } else {
            base.to_string()
        }
    }
}

#[async_trait::async_trait]
impl<W: Workbook, C: ConfigProvider> Pipeline for RangeAnalysisPipeline<W, C> {
    async fn extract(&self) -> Result<Grid> {
        let sheet = self.source_sheet().await?;
        tracing::debug!("Reading sheet '{}'", sheet);
        let cells = self.workbook.read_sheet(&sheet).await?;

        let selected = match self.config.range() {
            Some(reference) => {
                let (_, range) = parse_reference(reference)?;
                tracing::debug!("Applying range {} to sheet '{}'", range, sheet);
                range.apply(&cells)
            }
            None => cells,
        };

        if selected.len() < 2 {
            return Err(AnalysisError::EmptySelectionError {
                message: format!(
                    "'{}' has {} row(s); a header row and at least one data row are needed",
                    sheet,
                    selected.len()
                ),
            });
        }

        Grid::from_rows(selected)
    }

    async fn transform(&self, grid: Grid) -> Result<AnalysisResult> {
        let mut warnings = Vec::new();
        let sample = apply_sampling_policy(
            grid,
            self.config.sample_threshold(),
            self.config.sample_size(),
        );

        let prompt = self.prompt_builder.build(&sample);
        tracing::debug!(
            "Prompt is {} chars (limit {})",
            prompt.chars().count(),
            self.prompt_builder.max_chars()
        );

        tracing::info!(
            "🤖 Sending {} of {} rows to {} ({})",
            sample.grid.row_count(),
            sample.total_rows,
            self.client.base_url(),
            self.client.model()
        );
        let body = self.client.generate_raw(&prompt).await?;
        let raw_text = parse_generate_response(&body)?;

        let mut text = raw_text.trim().to_string();
        if self.config.strip_thinking() {
            let stripped = strip_thinking(&raw_text);
            if stripped.is_empty() && !text.is_empty() {
                tracing::warn!("Response only contained <think> content, keeping it as is");
                warnings.push(
                    "The model returned only reasoning (<think>) text; it was kept unfiltered"
                        .to_string(),
                );
            } else {
                text = stripped;
            }
        }

        let mut lines = split_lines(&text);
        if lines.is_empty() {
            tracing::warn!("Model returned an empty response");
            warnings.push("The model returned an empty response".to_string());
            lines.push(EMPTY_RESPONSE_LINE.to_string());
        }

        Ok(AnalysisResult {
            prompt,
            text,
            lines,
            total_rows: sample.total_rows,
            sampled_rows: sample.grid.row_count(),
            warnings,
        })
    }

    async fn load(&self, result: AnalysisResult) -> Result<AnalysisOutcome> {
        let mut warnings = result.warnings;
        let existing = self.workbook.sheet_names().await?;
        let name = unique_sheet_name(&self.output_base_name(), &existing);

        let created = match self.workbook.create_sheet(&name).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Could not create sheet '{}': {}", name, e);
                false
            }
        };

        if created {
            if let Err(e) = self.workbook.write_lines(&name, &result.lines).await {
                // 寫入失敗時移除剛建立的空白工作表
                tracing::warn!("Writing sheet '{}' failed, removing it: {}", name, e);
                if let Err(remove_err) = self.workbook.remove_sheet(&name).await {
                    tracing::error!("Could not remove sheet '{}': {}", name, remove_err);
                }
                return Err(e);
            }
            return Ok(AnalysisOutcome {
                sheet_name: name,
                lines_written: result.lines.len(),
                used_fallback: false,
                warnings,
            });
        }

        // 無法建立新工作表時改寫入目前的工作表
        let active = self.source_sheet().await?;
        self.workbook.append_lines(&active, &result.lines).await?;
        warnings.push(format!(
            "Could not create sheet '{}'; results were written to the active sheet '{}' instead",
            name, active
        ));

        Ok(AnalysisOutcome {
            sheet_name: active,
            lines_written: result.lines.len(),
            used_fallback: true,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::workbook::MemoryWorkbook;
    use crate::config::AnalysisSettings;
    use httpmock::prelude::*;

    fn sales_rows() -> Vec<Vec<String>> {
        vec![
            vec!["Region".to_string(), "Revenue".to_string()],
            vec!["North".to_string(), "1200".to_string()],
            vec!["South".to_string(), "900".to_string()],
        ]
    }

    fn settings_for(server: &MockServer) -> AnalysisSettings {
        AnalysisSettings {
            input_path: "Data.csv".to_string(),
            server_url: server.base_url(),
            timeout_seconds: 5,
            ..Default::default()
        }
    }

    fn mock_answer<'a>(server: &'a MockServer, answer: &str) -> httpmock::Mock<'a> {
        let answer = answer.to_string();
        server.mock(move |when, then| {
            when.method(POST).path("/api/generate");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"response": answer, "done": true}));
        })
    }

    #[tokio::test]
    async fn test_extract_requires_data_row() {
        let server = MockServer::start();
        let workbook = MemoryWorkbook::new("Data", vec![vec!["Region".to_string()]]);
        let pipeline = RangeAnalysisPipeline::new(workbook, settings_for(&server)).unwrap();

        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, AnalysisError::EmptySelectionError { .. }));
    }

    #[tokio::test]
    async fn test_extract_applies_range_on_named_sheet() {
        let server = MockServer::start();
        let workbook = MemoryWorkbook::new("Notes", vec![]).with_sheet("Data", sales_rows());
        let settings = AnalysisSettings {
            range: Some("Data!B1:B3".to_string()),
            ..settings_for(&server)
        };
        let pipeline = RangeAnalysisPipeline::new(workbook, settings).unwrap();

        let grid = pipeline.extract().await.unwrap();
        assert_eq!(grid.headers, vec!["Revenue"]);
        assert_eq!(grid.row_count(), 2);
    }

    #[tokio::test]
    async fn test_transform_strips_thinking() {
        let server = MockServer::start();
        let api_mock = mock_answer(&server, "<think>hmm</think>\nNorth leads.\nSouth lags.\n");
        let workbook = MemoryWorkbook::new("Data", sales_rows());
        let pipeline = RangeAnalysisPipeline::new(workbook, settings_for(&server)).unwrap();

        let grid = pipeline.extract().await.unwrap();
        let result = pipeline.transform(grid).await.unwrap();

        api_mock.assert();
        assert_eq!(result.lines, vec!["North leads.", "South lags."]);
        assert!(result.warnings.is_empty());
        assert!(result.prompt.contains("Columns: Region (text), Revenue (number)"));
    }

    #[tokio::test]
    async fn test_transform_keeps_thinking_only_response() {
        let server = MockServer::start();
        mock_answer(&server, "<think>only reasoning</think>");
        let workbook = MemoryWorkbook::new("Data", sales_rows());
        let pipeline = RangeAnalysisPipeline::new(workbook, settings_for(&server)).unwrap();

        let grid = pipeline.extract().await.unwrap();
        let result = pipeline.transform(grid).await.unwrap();
        assert_eq!(result.lines, vec!["<think>only reasoning</think>"]);
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_transform_empty_response_placeholder() {
        let server = MockServer::start();
        mock_answer(&server, "  ");
        let workbook = MemoryWorkbook::new("Data", sales_rows());
        let pipeline = RangeAnalysisPipeline::new(workbook, settings_for(&server)).unwrap();

        let grid = pipeline.extract().await.unwrap();
        let result = pipeline.transform(grid).await.unwrap();
        assert_eq!(result.lines, vec![EMPTY_RESPONSE_LINE]);
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_load_falls_back_to_active_sheet() {
        let server = MockServer::start();
        let workbook = MemoryWorkbook::new("Data", sales_rows()).refuse_new_sheets();
        let pipeline = RangeAnalysisPipeline::new(workbook, settings_for(&server)).unwrap();

        let result = AnalysisResult {
            prompt: String::new(),
            text: "A\nB".to_string(),
            lines: vec!["A".to_string(), "B".to_string()],
            total_rows: 2,
            sampled_rows: 2,
            warnings: vec![],
        };
        let outcome = pipeline.load(result).await.unwrap();

        assert!(outcome.used_fallback);
        assert_eq!(outcome.sheet_name, "Data");
        assert_eq!(outcome.warnings.len(), 1);

        let data = pipeline.workbook().sheet("Data").await.unwrap();
        assert_eq!(data.len(), 6);
        assert_eq!(data[4], vec!["A"]);
        assert_eq!(data[5], vec!["B"]);
    }

    #[tokio::test]
    async fn test_load_write_failure_removes_new_sheet() {
        let server = MockServer::start();
        let workbook = MemoryWorkbook::new("Data", sales_rows()).fail_writes();
        let pipeline = RangeAnalysisPipeline::new(workbook, settings_for(&server)).unwrap();

        let result = AnalysisResult {
            prompt: String::new(),
            text: "A".to_string(),
            lines: vec!["A".to_string()],
            total_rows: 2,
            sampled_rows: 2,
            warnings: vec![],
        };
        let err = pipeline.load(result).await.unwrap_err();

        assert!(matches!(err, AnalysisError::SheetError { .. }));
        assert_eq!(
            pipeline.workbook().sheet_names().await.unwrap(),
            vec!["Data".to_string()]
        );
        assert_eq!(pipeline.workbook().sheet("Data").await.unwrap(), sales_rows());
    }
}
