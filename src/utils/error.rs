use thiserror::Error;

/// 單筆記錄驗證失敗的原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    #[error("record for '{city}' has no temperature reading")]
    MissingTemperature { city: String },

    #[error("record for '{city}' has no weather conditions")]
    MissingConditions { city: String },
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Failed to fetch weather for '{source_name}': {reason}")]
    SourceFetchError { source_name: String, reason: String },

    #[error("Record validation failed: {0}")]
    RecordValidationError(#[from] RecordValidationError),

    #[error("No weather data extracted from {attempted} configured source(s)")]
    NoDataExtracted { attempted: usize },

    #[error("No valid records after transformation ({dropped} record(s) dropped)")]
    EmptyBatch { dropped: usize },

    #[error("Failed to connect to warehouse: {message}")]
    LoadConnectionError { message: String },

    #[error("Failed to append rows to {table}: {message}")]
    LoadWriteError { table: String, message: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Handoff format error: {message}")]
    HandoffFormatError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field '{field}'")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Extract,
    Transform,
    Load,
    Handoff,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// 單一來源或記錄，流程繼續
    Low,
    /// 外部暫時性問題，排程器重跑即可
    Medium,
    /// 資料或寫入問題，需要人工檢查
    High,
    /// 配置或系統問題
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::SourceFetchError { .. }
            | EtlError::NoDataExtracted { .. }
            | EtlError::ApiError(_) => ErrorCategory::Extract,
            EtlError::RecordValidationError(_) | EtlError::EmptyBatch { .. } => {
                ErrorCategory::Transform
            }
            EtlError::LoadConnectionError { .. } | EtlError::LoadWriteError { .. } => {
                ErrorCategory::Load
            }
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::HandoffFormatError { .. } => ErrorCategory::Handoff,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::SourceFetchError { .. } | EtlError::RecordValidationError(_) => {
                ErrorSeverity::Low
            }
            EtlError::NoDataExtracted { .. }
            | EtlError::LoadConnectionError { .. }
            | EtlError::ApiError(_) => ErrorSeverity::Medium,
            EtlError::EmptyBatch { .. }
            | EtlError::LoadWriteError { .. }
            | EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::HandoffFormatError { .. } => ErrorSeverity::High,
            EtlError::IoError(_)
            | EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::SourceFetchError { .. } | EtlError::ApiError(_) => {
                "Check network access to the weather API and the city name"
            }
            EtlError::RecordValidationError(_) => {
                "The API returned an incomplete record; it will be retried on the next run"
            }
            EtlError::NoDataExtracted { .. } => {
                "Every source failed; verify the API key and endpoint, then let the scheduler retry"
            }
            EtlError::EmptyBatch { .. } => {
                "No record had a temperature and weather condition; inspect the raw API responses"
            }
            EtlError::LoadConnectionError { .. } => {
                "Verify warehouse host, credentials and network access; the run can be retried"
            }
            EtlError::LoadWriteError { .. } => {
                "Make sure the destination table exists with the expected columns"
            }
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::HandoffFormatError { .. } => {
                "Regenerate the handoff file with the previous stage"
            }
            EtlError::IoError(_) => "Check file paths and permissions",
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => {
                "Fix the configuration file or the environment variables it references"
            }
        }
    }

    /// CLI 結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
