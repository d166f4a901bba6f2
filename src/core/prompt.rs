use crate::domain::model::Sample;

pub const DEFAULT_INSTRUCTION: &str =
    "Analyze this data and provide key insights, trends, and patterns.";
pub const DEFAULT_MAX_ROWS: usize = 5;
pub const DEFAULT_MAX_CHARS: usize = 3500;

/// Turns a sample into the text sent to the model.
///
/// Layout, in order: instruction, dataset summary, the column list (each
/// header exactly once, annotated with its kind and empty-cell count when
/// that fits), then up to `max_rows` data rows as values only.
/// The prompt never exceeds `max_chars` characters: whole rows are dropped
/// first, then the column annotations, then the instruction is shortened.
/// Only a column list that alone exceeds the limit is cut.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    instruction: String,
    max_rows: usize,
    max_chars: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            instruction: DEFAULT_INSTRUCTION.to_string(),
            max_rows: DEFAULT_MAX_ROWS,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        let instruction = instruction.into();
        if !instruction.trim().is_empty() {
            self.instruction = instruction;
        }
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn build(&self, sample: &Sample) -> String {
        let grid = &sample.grid;

        let mut dataset_line = format!(
            "Dataset: {} rows x {} columns",
            sample.total_rows,
            grid.column_count()
        );
        if sample.is_sampled() {
            dataset_line.push_str(&format!(" (sampled {} rows)", grid.row_count()));
        }
        dataset_line.push('\n');

        let plain_columns = format!("Columns: {}\n", grid.headers.join(", "));
        let annotated_columns = (sample.columns.len() == grid.column_count()).then(|| {
            let described: Vec<String> = sample.columns.iter().map(|c| c.to_string()).collect();
            format!("Columns: {}\n", described.join(", "))
        });

        let instruction = self.instruction.trim();
        let instruction_len = instruction.chars().count() + 2;
        let dataset_len = dataset_line.chars().count();

        // 型別說明放不下時退回只列欄名
        let columns_line = match annotated_columns {
            Some(line)
                if instruction_len + dataset_len + line.chars().count() <= self.max_chars =>
            {
                line
            }
            _ => plain_columns,
        };
        let essential_len = dataset_len + columns_line.chars().count();

        // 欄名優先於說明文字
        let mut prompt = String::new();
        if instruction_len + essential_len <= self.max_chars {
            prompt.push_str(instruction);
            prompt.push_str("\n\n");
        } else if essential_len + 2 < self.max_chars {
            let keep = self.max_chars - essential_len - 2;
            tracing::warn!(
                "Instruction shortened to {} chars to keep every column in the prompt",
                keep
            );
            let shortened: String = instruction.chars().take(keep).collect();
            prompt.push_str(&shortened);
            prompt.push_str("\n\n");
        } else {
            tracing::warn!("Column list alone fills the prompt limit, instruction dropped");
        }
        prompt.push_str(&dataset_line);
        prompt.push_str(&columns_line);

        let mut used = prompt.chars().count();
        let rows_heading = "\nSample data:\n";
        let heading_len = rows_heading.chars().count();

        let mut row_lines = Vec::new();
        let mut rows_len = heading_len;
        for (i, row) in grid.rows.iter().take(self.max_rows).enumerate() {
            let values: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            let line = format!("{}. {}\n", i + 1, values.join(" | "));
            let line_len = line.chars().count();
            if used + rows_len + line_len > self.max_chars {
                tracing::debug!(
                    "Prompt limit {} reached, keeping {} sample rows",
                    self.max_chars,
                    row_lines.len()
                );
                break;
            }
            rows_len += line_len;
            row_lines.push(line);
        }

        if !row_lines.is_empty() {
            prompt.push_str(rows_heading);
            for line in &row_lines {
                prompt.push_str(line);
            }
            used += rows_len;
        }

        if used > self.max_chars {
            tracing::warn!(
                "Column list is {} chars, cutting prompt to {}",
                used,
                self.max_chars
            );
            prompt = prompt.chars().take(self.max_chars).collect();
        }

        prompt
    }
}
