/*!
 * Error types for the slidelingo library.
 *
 * This module contains custom error types for the different layers of the
 * application, using the thiserror crate for ergonomic error definitions.
 * Cancellation is deliberately absent: it is reported as a scope status.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::ParseError(_) | Self::AuthenticationError(_) => false,
        }
    }
}

/// Failures talking to the presentation host.
///
/// These are never fatal to a scope: the affected shape or cell is skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    /// The host does not support the requested capability
    #[error("Unsupported host capability: {0}")]
    Unsupported(String),

    /// The slide index is out of range
    #[error("Slide {0} not found")]
    SlideNotFound(usize),

    /// The shape could not be resolved (removed or moved since extraction)
    #[error("Shape not found: {0}")]
    ShapeNotFound(String),

    /// The table cell could not be resolved
    #[error("Table cell not found: {shape} row {row} column {column}")]
    CellNotFound {
        shape: String,
        row: usize,
        column: usize,
    },

    /// A character range fell outside the shape text
    #[error("Invalid text range {start}+{length} for text of {text_length} characters")]
    InvalidRange {
        start: usize,
        length: usize,
        text_length: usize,
    },

    /// The children of a group could not be enumerated
    #[error("Failed to enumerate group {0}")]
    Enumeration(String),
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The provider answered but the payload does not match the expected schema
    #[error("Provider response violates the expected schema: {0}")]
    SchemaViolation(String),

    /// The provider requires a credential that is missing or invalid
    #[error("Missing or invalid credential: {0}")]
    MissingCredential(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the presentation host
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
