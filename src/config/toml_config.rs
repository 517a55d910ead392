use crate::adapters::http::OpenWeatherClient;
use crate::adapters::warehouse::postgres::PostgresSettings;
use crate::core::pipeline::PipelineSettings;
use crate::domain::model::TableRef;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/weather";
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_CONCURRENT_REQUESTS: usize = 5;
const DEFAULT_WAREHOUSE_PORT: u16 = 5432;
const WAREHOUSE_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineInfo,
    pub source: SourceConfig,
    pub extract: ExtractConfig,
    pub load: LoadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineInfo {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub endpoint: Option<String>,
    pub api_key: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub cities: Vec<String>,
    pub concurrent_requests: Option<usize>,
}

/// 目的倉儲連線參數；`account` 為倉儲主機
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub account: String,
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub table: String,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OPENWEATHER_API_KEY})
    ///
    /// 未設定的變數保持原樣，交給驗證報錯
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| {
            EtlError::ConfigError {
                message: format!("invalid substitution pattern: {}", e),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn endpoint(&self) -> &str {
        self.source.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    pub fn concurrent_requests(&self) -> usize {
        self.extract
            .concurrent_requests
            .unwrap_or(DEFAULT_CONCURRENT_REQUESTS)
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.load.database, &self.load.schema, &self.load.table)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            cities: self.extract.cities.clone(),
            concurrent_requests: self.concurrent_requests(),
            table: self.table_ref(),
        }
    }

    pub fn weather_client(&self) -> Result<OpenWeatherClient> {
        OpenWeatherClient::new(self.endpoint(), &self.source.api_key, self.request_timeout())
    }

    pub fn postgres_settings(&self) -> PostgresSettings {
        PostgresSettings {
            host: self.load.account.clone(),
            port: self.load.port.unwrap_or(DEFAULT_WAREHOUSE_PORT),
            user: self.load.user.clone(),
            password: self.load.password.clone(),
            database: self.load.database.clone(),
            warehouse: self.load.warehouse.clone(),
            connect_timeout: WAREHOUSE_CONNECT_TIMEOUT,
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;

        validation::validate_url("source.endpoint", self.endpoint())?;
        validation::validate_secret("source.api_key", &self.source.api_key)?;
        if let Some(timeout) = self.source.timeout_seconds {
            validation::validate_range("source.timeout_seconds", timeout, 1, 300)?;
        }

        validation::validate_non_empty_list("extract.cities", &self.extract.cities)?;
        validation::validate_range(
            "extract.concurrent_requests",
            self.concurrent_requests(),
            1,
            100,
        )?;

        validation::validate_non_empty_string("load.account", &self.load.account)?;
        validation::validate_non_empty_string("load.user", &self.load.user)?;
        validation::validate_secret("load.password", &self.load.password)?;
        validation::validate_non_empty_string("load.warehouse", &self.load.warehouse)?;
        validation::validate_identifier("load.database", &self.load.database)?;
        validation::validate_identifier("load.schema", &self.load.schema)?;
        validation::validate_identifier("load.table", &self.load.table)?;

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[pipeline]
name = "weather_etl_pipeline"
description = "Daily weather snapshot"

[source]
api_key = "abc123"
timeout_seconds = 10

[extract]
cities = ["Chennai", "Mumbai", "Delhi", "Bangalore", "Tiruchirappalli"]

[load]
account = "warehouse.internal"
user = "etl"
password = "secret"
warehouse = "COMPUTE_WH"
database = "weather_db"
schema = "pipeline"
table = "daily_weather"
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = TomlConfig::from_toml_str(SAMPLE).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.concurrent_requests(), 5);
        assert_eq!(config.extract.cities.len(), 5);
        assert_eq!(
            config.table_ref().qualified_name(),
            "WEATHER_DB.PIPELINE.DAILY_WEATHER"
        );
        assert_eq!(config.postgres_settings().port, 5432);
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("WEATHER_ETL_TEST_API_KEY", "from-env");
        let content = SAMPLE.replace("\"abc123\"", "\"${WEATHER_ETL_TEST_API_KEY}\"");

        let config = TomlConfig::from_toml_str(&content).unwrap();

        assert_eq!(config.source.api_key, "from-env");
    }

    #[test]
    fn test_unresolved_placeholder_fails_validation() {
        let content = SAMPLE.replace("\"secret\"", "\"${WEATHER_ETL_TEST_UNSET_PASSWORD}\"");

        let config = TomlConfig::from_toml_str(&content).unwrap();

        assert!(matches!(
            config.validate(),
            Err(EtlError::ConfigValidationError { ref field, .. }) if field == "load.password"
        ));
    }

    #[test]
    fn test_empty_city_list_fails_validation() {
        let content = SAMPLE.replace(
            "cities = [\"Chennai\", \"Mumbai\", \"Delhi\", \"Bangalore\", \"Tiruchirappalli\"]",
            "cities = []",
        );

        let config = TomlConfig::from_toml_str(&content).unwrap();

        assert!(matches!(
            config.validate(),
            Err(EtlError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = TomlConfig::from_toml_str("[pipeline\nname = ");
        assert!(matches!(
            result,
            Err(EtlError::ConfigValidationError { .. })
        ));
    }
}
