use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use std::fmt;

/// 單次執行的狀態；`Done` 與 `Failed` 為終止狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Extracting,
    Transforming,
    Loading,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Extracting => "extracting",
            RunState::Transforming => "transforming",
            RunState::Loading => "loading",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub records_extracted: usize,
    pub rows_transformed: usize,
    pub rows_written: u64,
    pub table: String,
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Extract → Transform → Load，任何階段失敗即中止本次執行
    pub async fn run(&self) -> Result<RunSummary> {
        let mut state = RunState::Idle;
        let outcome = self.run_stages(&mut state).await;

        match &outcome {
            Ok(_) => transition(&mut state, RunState::Done),
            Err(e) => {
                tracing::error!("❌ Run failed while {}: {}", state, e);
                transition(&mut state, RunState::Failed);
            }
        }

        outcome
    }

    async fn run_stages(&self, state: &mut RunState) -> Result<RunSummary> {
        transition(state, RunState::Extracting);
        let raw_data = self.pipeline.extract().await?;
        tracing::info!("Extracted {} records", raw_data.len());
        let records_extracted = raw_data.len();

        transition(state, RunState::Transforming);
        let batch = self.pipeline.transform(raw_data).await?;
        tracing::info!("Transformed {} records", batch.len());
        for row in &batch.rows {
            tracing::debug!(
                "  {} | {:.2} °C | {} | {}",
                row.city,
                row.temperature_c,
                row.humidity_percent
                    .map(|h| format!("{}%", h))
                    .unwrap_or_else(|| "-".to_string()),
                row.description
            );
        }
        let rows_transformed = batch.len();

        transition(state, RunState::Loading);
        let report = self.pipeline.load(batch).await?;

        Ok(RunSummary {
            records_extracted,
            rows_transformed,
            rows_written: report.rows_written,
            table: report.table,
        })
    }
}

fn transition(state: &mut RunState, next: RunState) {
    tracing::debug!("Run state: {} -> {}", state, next);
    *state = next;
}
