use thiserror::Error;

/// Structured error types for the elderly companion
#[derive(Error, Debug, Clone)]
pub enum CompanionError {
    /// A required form field was left empty
    #[error("Please fill out all fields.")]
    MissingFields,

    /// Validation errors
    #[error("Validation error: {field} is invalid: {message}")]
    Validation { field: String, message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Authentication errors
    #[error("Authentication error: {service} authentication failed: {message}")]
    Authentication { service: String, message: String },

    /// API call errors (Google Calendar, OAuth2 token endpoint)
    #[error("API error: {service} API call failed: {message}")]
    Api { service: String, message: String },

    /// Network connectivity errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// File system errors
    #[error("{message}")]
    FileSystem {
        operation: String,
        path: String,
        message: String,
    },

    /// Parsing errors (JSON, TOML, etc.)
    #[error("Parsing error: Failed to parse {format}: {message}")]
    Parsing { format: String, message: String },

    /// Timeout errors
    #[error("Timeout error: {operation} timed out after {timeout_seconds}s")]
    Timeout {
        operation: String,
        timeout_seconds: u64,
    },

    /// Outbound mail errors
    #[error("Email error: {message}")]
    Email { message: String },
}

/// Result type alias using CompanionError
pub type CompanionResult<T> = std::result::Result<T, CompanionError>;

impl CompanionError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn authentication(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Authentication {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn api(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn email(message: impl Into<String>) -> Self {
        Self::Email {
            message: message.into(),
        }
    }

    /// Missing or unreadable file, keeping the path in the rendered message
    pub fn file_not_found(what: &str, path: &std::path::Path) -> Self {
        Self::FileSystem {
            operation: "read".to_string(),
            path: path.display().to_string(),
            message: format!("The {} was not found at: {}", what, path.display()),
        }
    }
}

/// Convert std::io::Error to CompanionError
impl From<std::io::Error> for CompanionError {
    fn from(error: std::io::Error) -> Self {
        Self::FileSystem {
            operation: "unknown".to_string(),
            path: "unknown".to_string(),
            message: format!("File system error: {}", error),
        }
    }
}

/// Convert serde_json::Error to CompanionError
impl From<serde_json::Error> for CompanionError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parsing {
            format: "JSON".to_string(),
            message: error.to_string(),
        }
    }
}

/// Convert toml::de::Error to CompanionError
impl From<toml::de::Error> for CompanionError {
    fn from(error: toml::de::Error) -> Self {
        Self::Parsing {
            format: "TOML".to_string(),
            message: error.to_string(),
        }
    }
}

impl CompanionError {
    /// Map a failed HTTP call made by a client built with `timeout_seconds`
    pub fn from_request(error: reqwest::Error, timeout_seconds: u64) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                operation: "HTTP request".to_string(),
                timeout_seconds,
            }
        } else {
            error.into()
        }
    }
}

/// Convert reqwest::Error to CompanionError
///
/// The client timeout is not known here, so timeouts only keep the reqwest
/// message. Request sites that know it go through `from_request`.
impl From<reqwest::Error> for CompanionError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Network {
                message: format!("Request timed out: {}", error),
            }
        } else if error.is_connect() {
            Self::Network {
                message: format!("Connection failed: {}", error),
            }
        } else {
            Self::Api {
                service: "HTTP".to_string(),
                message: error.to_string(),
            }
        }
    }
}

impl From<lettre::address::AddressError> for CompanionError {
    fn from(error: lettre::address::AddressError) -> Self {
        Self::Email {
            message: format!("Invalid email address: {}", error),
        }
    }
}

impl From<lettre::error::Error> for CompanionError {
    fn from(error: lettre::error::Error) -> Self {
        Self::Email {
            message: format!("Failed to build message: {}", error),
        }
    }
}

impl From<lettre::transport::smtp::Error> for CompanionError {
    fn from(error: lettre::transport::smtp::Error) -> Self {
        Self::Email {
            message: format!("Failed to send email: {}", error),
        }
    }
}
