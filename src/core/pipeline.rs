use crate::core::{load, transform};
use crate::domain::model::{Batch, LoadReport, RawSourceRecord, TableRef};
use crate::domain::ports::{Pipeline, Warehouse, WeatherSource};
use crate::utils::error::{EtlError, Result};
use chrono::Utc;
use futures::stream::{self, StreamExt};

/// 每次執行注入的設定值
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub cities: Vec<String>,
    /// 同時進行的請求數；結果永遠維持設定順序
    pub concurrent_requests: usize,
    pub table: TableRef,
}

pub struct WeatherPipeline<S: WeatherSource, W: Warehouse> {
    source: S,
    warehouse: W,
    settings: PipelineSettings,
}

impl<S: WeatherSource, W: Warehouse> WeatherPipeline<S, W> {
    pub fn new(source: S, warehouse: W, settings: PipelineSettings) -> Self {
        Self {
            source,
            warehouse,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }
}

#[async_trait::async_trait]
impl<S: WeatherSource, W: Warehouse> Pipeline for WeatherPipeline<S, W> {
    async fn extract(&self) -> Result<Vec<RawSourceRecord>> {
        let cities = &self.settings.cities;
        tracing::info!("🚀 Fetching current weather for {} source(s)", cities.len());

        let source = &self.source;
        let outcomes: Vec<(String, Result<RawSourceRecord>)> = stream::iter(cities.clone())
            .map(move |city| async move {
                let outcome = source.fetch(&city).await;
                (city, outcome)
            })
            .buffered(self.settings.concurrent_requests.max(1))
            .collect()
            .await;

        let mut records = Vec::with_capacity(outcomes.len());
        for (city, outcome) in outcomes {
            match outcome {
                Ok(record) => {
                    tracing::info!("✅ Successfully fetched data for {}.", city);
                    records.push(record);
                }
                Err(e) => tracing::warn!("❌ Failed to fetch data for {}: {}", city, e),
            }
        }

        if records.is_empty() {
            return Err(EtlError::NoDataExtracted {
                attempted: cities.len(),
            });
        }

        Ok(records)
    }

    async fn transform(&self, data: Vec<RawSourceRecord>) -> Result<Batch> {
        transform::transform_records(&data, Utc::now())
    }

    async fn load(&self, batch: Batch) -> Result<LoadReport> {
        load::load_batch(&self.warehouse, &self.settings.table, &batch).await
    }
}
