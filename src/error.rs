//! Error types and handling for `trailscope`

use thiserror::Error;

/// Main error type for trail lookups
#[derive(Error, Debug)]
pub enum TrailError {
    /// Transport-level failures (DNS, connect, timeout)
    #[error("Network error: {message}")]
    Network { message: String },

    /// The remote service answered with a non-2xx status
    #[error("{service} returned HTTP {status}")]
    HttpStatus { service: String, status: u16 },

    /// The remote service answered with something other than JSON
    #[error("{service} returned unexpected content type '{content_type}'")]
    ContentType {
        service: String,
        content_type: String,
    },

    /// The body parsed but did not have the expected shape
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    /// Geocode miss
    #[error("Location not found: {query}")]
    NotFound { query: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl TrailError {
    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn http_status<S: Into<String>>(service: S, status: u16) -> Self {
        Self::HttpStatus {
            service: service.into(),
            status,
        }
    }

    pub fn content_type<S: Into<String>, C: Into<String>>(service: S, content_type: C) -> Self {
        Self::ContentType {
            service: service.into(),
            content_type: content_type.into(),
        }
    }

    /// Create a new malformed response error
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(query: S) -> Self {
        Self::NotFound {
            query: query.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message, suitable for the trail panel
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TrailError::Network { .. } => {
                "Unable to reach the map data service. Please check your internet connection."
                    .to_string()
            }
            TrailError::HttpStatus { service, status } => {
                format!("{service} is unavailable right now (HTTP {status}). Please try again.")
            }
            TrailError::ContentType { service, .. } => {
                format!("{service} sent an unexpected response.")
            }
            TrailError::MalformedResponse { .. } => {
                "Received trail data in an unexpected format.".to_string()
            }
            TrailError::NotFound { query } => format!("Location not found: {query}"),
            TrailError::Validation { message } => format!("Invalid input: {message}"),
            TrailError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            TrailError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for TrailError {
    fn from(err: reqwest::Error) -> Self {
        TrailError::network(err.to_string())
    }
}

impl From<reqwest_middleware::Error> for TrailError {
    fn from(err: reqwest_middleware::Error) -> Self {
        TrailError::network(err.to_string())
    }
}
