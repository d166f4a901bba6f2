use crate::core::{AnalysisOutcome, Pipeline};
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;

pub struct AnalysisEngine<P: Pipeline> {
    pipeline: P,
    monitor: RunMonitor,
}

impl<P: Pipeline> AnalysisEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: RunMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<AnalysisOutcome> {
        tracing::info!("🚀 Starting range analysis");

        // Extract
        let grid = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Selection: {} data rows x {} columns",
            grid.row_count(),
            grid.column_count()
        );
        self.monitor.record_phase("extract");

        // Transform
        let analysis = self.pipeline.transform(grid).await?;
        tracing::info!(
            "📝 Model answered with {} lines ({} of {} rows sent)",
            analysis.lines.len(),
            analysis.sampled_rows,
            analysis.total_rows
        );
        self.monitor.record_phase("transform");

        // Load
        let outcome = self.pipeline.load(analysis).await?;
        for warning in &outcome.warnings {
            tracing::warn!("⚠️ {}", warning);
        }
        tracing::info!(
            "📄 Wrote {} lines to sheet '{}'",
            outcome.lines_written,
            outcome.sheet_name
        );
        self.monitor.record_phase("load");
        self.monitor.log_summary();

        Ok(outcome)
    }
}
