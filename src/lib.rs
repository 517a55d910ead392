pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::TomlConfig;

pub use crate::adapters::http::OpenWeatherClient;
pub use crate::adapters::storage::LocalStorage;
pub use crate::adapters::warehouse::memory::MemoryWarehouse;
pub use crate::adapters::warehouse::postgres::PostgresWarehouse;
pub use crate::core::{
    etl::{EtlEngine, RunState, RunSummary},
    pipeline::{PipelineSettings, WeatherPipeline},
};
pub use crate::utils::error::{EtlError, RecordValidationError, Result};
