use thiserror::Error;

/// 單筆資料列解析失敗的原因
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Row has {found} fields, at least {expected} are required")]
    TooFewFields { expected: usize, found: usize },

    #[error("Unable to parse service count value '{value}'")]
    InvalidServiceCount { value: String },

    #[error("Unable to parse average estimated charge value '{value}'")]
    InvalidEstimatedCharge { value: String },

    #[error("Unable to parse average total payment value '{value}'")]
    InvalidTotalPayment { value: String },
}

/// 地理編碼服務的錯誤
#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Geocoding service responded with HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("Geocoding service returned status {status}{}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Status {
        status: String,
        message: Option<String>,
    },

    #[error("No geocoding results")]
    NoResults,
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Search service request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid record: {0}")]
    RecordError(#[from] RecordError),

    #[error("Geocoding error: {0}")]
    GeocodeError(#[from] GeocodeError),

    #[error("Search service {operation} failed with HTTP {status}: {body}")]
    SearchError {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 啟動前即可發現的問題：旗標、設定檔、輸入檔
    Configuration,
    /// 單筆資料的問題，記錄後略過
    Record,
    /// 搜尋服務或網路層的問題
    Infrastructure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::IoError(_) => ErrorCategory::Configuration,
            EtlError::CsvError(_) | EtlError::RecordError(_) | EtlError::GeocodeError(_) => {
                ErrorCategory::Record
            }
            EtlError::ApiError(_)
            | EtlError::SerializationError(_)
            | EtlError::SearchError { .. } => ErrorCategory::Infrastructure,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Record => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Infrastructure => ErrorSeverity::Critical,
        }
    }

    /// 給操作人員看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            EtlError::IoError(e) => format!("Could not read the input file: {}", e),
            EtlError::MissingConfigError { field } => {
                format!("Required option '{}' was not provided", field)
            }
            EtlError::InvalidConfigValueError { field, value, .. } => {
                format!("Option '{}' has an invalid value '{}'", field, value)
            }
            EtlError::ConfigError { message } => format!("Configuration problem: {}", message),
            EtlError::ApiError(_) => "Could not reach the search service".to_string(),
            EtlError::SearchError {
                operation, status, ..
            } => format!("Search service rejected {} (HTTP {})", operation, status),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::IoError(_) => "Check that the path given to --files exists and is readable",
            EtlError::MissingConfigError { .. } | EtlError::InvalidConfigValueError { .. } => {
                "Run with --help to see the required options"
            }
            EtlError::ConfigError { .. } => "Check the settings file passed with --config",
            EtlError::ApiError(_) => {
                "Check --search-hostname and --search-port and that the search service is running"
            }
            EtlError::SearchError { .. } => "Inspect the search service logs for the rejected request",
            EtlError::SerializationError(_) => "The search service returned an unexpected response body",
            EtlError::CsvError(_) | EtlError::RecordError(_) | EtlError::GeocodeError(_) => {
                "The record was skipped; inspect the input row"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
