//! Error types for Webforge

use thiserror::Error;

/// Result type alias using Webforge's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Prefix placed in front of a failed assistant message
pub const ERROR_MARKER: &str = "❌";

/// Webforge error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Entity errors (E001-E099)
    #[error("Project '{0}' not found. Run `webforge projects list` to see all projects.")]
    ProjectNotFound(String),

    #[error("File '{0}' not found. Run `webforge files list` to see the project's files.")]
    FileNotFound(String),

    #[error("A project must keep at least one file.")]
    LastFileRemaining,

    #[error("At least one project must remain.")]
    LastProjectRemaining,

    // Generation errors (E100-E199)
    #[error("API key not configured. Set it with `webforge settings set api_key <KEY>`.")]
    MissingApiKey,

    #[error("Invalid API key: {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("LLM API error: {0}")]
    LLMError(String),

    // Storage errors (E400-E499)
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Stored record could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProjectNotFound(_) => "E001",
            Self::FileNotFound(_) => "E002",
            Self::LastFileRemaining => "E003",
            Self::LastProjectRemaining => "E004",
            Self::MissingApiKey => "E100",
            Self::Unauthorized(_) => "E101",
            Self::Forbidden(_) => "E102",
            Self::QuotaExceeded(_) => "E103",
            Self::ServerError(..) => "E104",
            Self::NetworkError(_) => "E105",
            Self::LLMError(_) => "E106",
            Self::DatabaseError(_) => "E400",
            Self::Serialization(_) => "E401",
            Self::ConfigError(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::ProjectNotFound(_) => Some("webforge projects list".to_string()),
            Self::FileNotFound(_) => Some("webforge files list".to_string()),
            Self::MissingApiKey | Self::Unauthorized(_) | Self::QuotaExceeded(_) => {
                Some("webforge settings set api_key <KEY>".to_string())
            }
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::ConfigError(_) => Some("webforge config list".to_string()),
            _ => None,
        }
    }

    /// Message shown in the chat transcript when a generation fails
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingApiKey => {
                "API key not configured. Add your key in the settings.".to_string()
            }
            Self::Unauthorized(_) => {
                "Invalid API key. Check the key configured in the settings.".to_string()
            }
            Self::Forbidden(_) => {
                "Access denied. Your API key does not have permission to use this model."
                    .to_string()
            }
            Self::QuotaExceeded(_) => {
                "Quota exceeded (429). Check your plan and billing details, or configure another API key."
                    .to_string()
            }
            Self::ServerError(status, _) => format!(
                "The generation service failed ({}). Try again in a moment.",
                status
            ),
            Self::NetworkError(_) => {
                "Network error. Check your internet connection and try again.".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Whether this failure should bring the settings surface back up
    pub fn reopens_settings(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_not_found_error() {
        let error = Error::ProjectNotFound("my-project".to_string());
        assert_eq!(error.code(), "E001");
        assert_eq!(
            error.suggestion(),
            Some("webforge projects list".to_string())
        );
        assert!(error.to_string().contains("my-project"));
    }

    #[test]
    fn test_quota_error_reopens_settings() {
        let error = Error::QuotaExceeded("You exceeded your current quota".to_string());
        assert_eq!(error.code(), "E103");
        assert!(error.reopens_settings());
        assert!(error.user_message().contains("Quota"));
        assert!(error.user_message().contains("429"));
    }

    #[test]
    fn test_other_errors_do_not_reopen_settings() {
        assert!(!Error::Unauthorized("bad key".to_string()).reopens_settings());
        assert!(!Error::ServerError(503, "down".to_string()).reopens_settings());
        assert!(!Error::LastFileRemaining.reopens_settings());
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let unauthorized = Error::Unauthorized("x".to_string()).user_message();
        let forbidden = Error::Forbidden("x".to_string()).user_message();
        let server = Error::ServerError(500, "x".to_string()).user_message();

        assert!(unauthorized.contains("Invalid API key"));
        assert!(forbidden.contains("permission"));
        assert!(server.contains("500"));
        assert_ne!(unauthorized, forbidden);
    }

    #[test]
    fn test_unclassified_error_echoes_message() {
        let error = Error::LLMError("model exploded".to_string());
        assert!(error.user_message().contains("model exploded"));
    }

    #[test]
    fn test_invariant_errors() {
        assert_eq!(Error::LastFileRemaining.code(), "E003");
        assert_eq!(Error::LastProjectRemaining.code(), "E004");
        assert_eq!(Error::LastFileRemaining.suggestion(), None);
    }

    #[test]
    fn test_result_type() {
        fn returns_error() -> Result<()> {
            Err(Error::InvalidInput("empty name".to_string()))
        }

        let err = returns_error().unwrap_err();
        assert_eq!(err.code(), "E800");
        assert!(err.to_string().contains("empty name"));
    }
}
