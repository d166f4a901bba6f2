use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Server returned HTTP {status} {reason}")]
    HttpStatusError { status: u16, reason: String },

    #[error("No response field found: {detail}")]
    NoResponseField { detail: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid range '{reference}': {reason}")]
    InvalidRangeError { reference: String, reason: String },

    #[error("Selection is empty: {message}")]
    EmptySelectionError { message: String },

    #[error("Sheet '{name}' error: {message}")]
    SheetError { name: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Server,
    Response,
    Configuration,
    Input,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AnalysisError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AnalysisError::HttpError(_) => ErrorCategory::Network,
            AnalysisError::HttpStatusError { .. } => ErrorCategory::Server,
            AnalysisError::NoResponseField { .. } | AnalysisError::SerializationError(_) => {
                ErrorCategory::Response
            }
            AnalysisError::TomlError(_)
            | AnalysisError::ConfigError { .. }
            | AnalysisError::InvalidConfigValueError { .. }
            | AnalysisError::MissingConfigError { .. } => ErrorCategory::Configuration,
            AnalysisError::CsvError(_)
            | AnalysisError::InvalidRangeError { .. }
            | AnalysisError::EmptySelectionError { .. } => ErrorCategory::Input,
            AnalysisError::IoError(_) | AnalysisError::SheetError { .. } => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 網路與伺服器端錯誤，使用者稍後重試即可
            AnalysisError::HttpError(_) => ErrorSeverity::Medium,
            AnalysisError::HttpStatusError { status, .. } if *status >= 500 => {
                ErrorSeverity::Medium
            }
            AnalysisError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// 是否為逾時錯誤
    pub fn is_timeout(&self) -> bool {
        matches!(self, AnalysisError::HttpError(e) if e.is_timeout())
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            AnalysisError::HttpError(e) if e.is_timeout() => {
                "Increase --timeout; large models can take minutes to load on first use".to_string()
            }
            AnalysisError::HttpError(e) if e.is_connect() => {
                "Check that the Ollama service is running and port 11434 is reachable (security group / firewall)".to_string()
            }
            AnalysisError::HttpError(_) => {
                "Run the test-connection tool against the same server URL".to_string()
            }
            AnalysisError::HttpStatusError { status: 404, .. } => {
                "Pull the model on the server first (ollama pull <model>) or pick one listed by test-connection".to_string()
            }
            AnalysisError::HttpStatusError { status, .. } if *status >= 500 => {
                "Check the Ollama server logs (journalctl -u ollama) and try again".to_string()
            }
            AnalysisError::HttpStatusError { .. } => {
                "Check the model name and server URL".to_string()
            }
            AnalysisError::NoResponseField { .. } | AnalysisError::SerializationError(_) => {
                "Make sure the URL points at an Ollama server and not a proxy or web page".to_string()
            }
            AnalysisError::TomlError(_) => "Fix the syntax of the TOML configuration file".to_string(),
            AnalysisError::ConfigError { .. }
            | AnalysisError::InvalidConfigValueError { .. }
            | AnalysisError::MissingConfigError { .. } => {
                "Review the command line flags and the configuration file".to_string()
            }
            AnalysisError::CsvError(_) => "Make sure the input sheet is a valid CSV file".to_string(),
            AnalysisError::InvalidRangeError { .. } => {
                "Use an A1-style range such as A1:D200 or Data!B2:F50".to_string()
            }
            AnalysisError::EmptySelectionError { .. } => {
                "Select a header row plus at least one data row".to_string()
            }
            AnalysisError::IoError(_) => {
                "Check that the workbook directory exists and is writable".to_string()
            }
            AnalysisError::SheetError { .. } => {
                "Close any program holding the sheet file open and try again".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AnalysisError::HttpError(e) if e.is_timeout() => {
                "The Ollama server did not answer in time".to_string()
            }
            AnalysisError::HttpError(e) if e.is_connect() => {
                "Could not connect to the Ollama server".to_string()
            }
            AnalysisError::HttpError(e) => format!("Request to the Ollama server failed: {}", e),
            AnalysisError::HttpStatusError { status, reason } => {
                format!("The Ollama server rejected the request (HTTP {} {})", status, reason)
            }
            AnalysisError::NoResponseField { .. } => {
                "The server answered, but no response text was found in it".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_error_mentions_code() {
        let err = AnalysisError::HttpStatusError {
            status: 503,
            reason: "Service Unavailable".to_string(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.user_friendly_message().contains("Service Unavailable"));
        assert_eq!(err.category(), ErrorCategory::Server);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
    }

    #[test]
    fn test_client_status_is_high_severity() {
        let err = AnalysisError::HttpStatusError {
            status: 404,
            reason: "Not Found".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.recovery_suggestion().contains("ollama pull"));
    }

    #[test]
    fn test_no_response_field_is_response_category() {
        let err = AnalysisError::NoResponseField {
            detail: "malformed JSON".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Response);
        assert!(!err.is_timeout());
    }
}
