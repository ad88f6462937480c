use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Transport errors
    NetworkError,
    NetworkTimeout,
    InvalidResponse,
    UnexpectedStatus,

    // Authorization errors
    Unauthorized,
    Forbidden,

    // Rate limiting
    RateLimited,

    // Remote evaluation errors
    ProviderNotReady,
    ParseError,
    TargetingKeyMissing,
    InvalidContext,
    FlagNotFound,
    TypeMismatch,
    General,

    // Data collector errors
    NoEventToSend,

    // Configuration errors
    ConfigInvalidEndpoint,

    // Lifecycle errors
    ProviderFatal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::NetworkTimeout => "NETWORK_TIMEOUT",
            ErrorCode::InvalidResponse => "INVALID_RESPONSE",
            ErrorCode::UnexpectedStatus => "UNEXPECTED_STATUS",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::ProviderNotReady => "PROVIDER_NOT_READY",
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::TargetingKeyMissing => "TARGETING_KEY_MISSING",
            ErrorCode::InvalidContext => "INVALID_CONTEXT",
            ErrorCode::FlagNotFound => "FLAG_NOT_FOUND",
            ErrorCode::TypeMismatch => "TYPE_MISMATCH",
            ErrorCode::General => "GENERAL",
            ErrorCode::NoEventToSend => "NO_EVENT_TO_SEND",
            ErrorCode::ConfigInvalidEndpoint => "CONFIG_INVALID_ENDPOINT",
            ErrorCode::ProviderFatal => "PROVIDER_FATAL",
        }
    }

    /// Maps an OFREP `errorCode` string to an error code.
    ///
    /// Unknown codes collapse to [`ErrorCode::General`].
    pub fn from_remote(code: &str) -> Self {
        match code {
            "PROVIDER_NOT_READY" => ErrorCode::ProviderNotReady,
            "PARSE_ERROR" => ErrorCode::ParseError,
            "TARGETING_KEY_MISSING" => ErrorCode::TargetingKeyMissing,
            "INVALID_CONTEXT" => ErrorCode::InvalidContext,
            "FLAG_NOT_FOUND" => ErrorCode::FlagNotFound,
            "TYPE_MISMATCH" => ErrorCode::TypeMismatch,
            _ => ErrorCode::General,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorCode::NetworkError
                | ErrorCode::NetworkTimeout
                | ErrorCode::UnexpectedStatus
                | ErrorCode::RateLimited
                | ErrorCode::ProviderNotReady
        )
    }

    /// Authorization failures put the provider in its terminal state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorCode::Unauthorized | ErrorCode::Forbidden)
    }

    pub fn is_evaluation_error(&self) -> bool {
        matches!(
            self,
            ErrorCode::ProviderNotReady
                | ErrorCode::ParseError
                | ErrorCode::TargetingKeyMissing
                | ErrorCode::InvalidContext
                | ErrorCode::FlagNotFound
                | ErrorCode::TypeMismatch
                | ErrorCode::General
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("[{code}] {message}")]
pub struct OfrepError {
    pub code: ErrorCode,
    pub message: String,
    /// Deadline carried by a rate-limit response, if the server sent a usable `Retry-After`.
    pub retry_after: Option<DateTime<Utc>>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl OfrepError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retry_after: None,
            source: None,
        }
    }

    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            retry_after: None,
            source: Some(Box::new(source)),
        }
    }

    pub fn rate_limited(retry_after: Option<DateTime<Utc>>) -> Self {
        Self {
            code: ErrorCode::RateLimited,
            message: "Too many requests".to_string(),
            retry_after,
            source: None,
        }
    }

    pub fn config_error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message)
    }

    pub fn network_error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message)
    }

    pub fn evaluation_error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message)
    }

    pub fn not_ready() -> Self {
        Self::new(ErrorCode::ProviderNotReady, "Provider is not ready")
    }

    pub fn flag_not_found(key: &str) -> Self {
        Self::new(ErrorCode::FlagNotFound, format!("Flag not found: {}", key))
    }

    pub fn type_mismatch(key: &str) -> Self {
        Self::new(
            ErrorCode::TypeMismatch,
            format!("Flag {} does not hold a value of the requested type", key),
        )
    }

    /// Builds the error for a remote evaluation failure.
    ///
    /// Missing details fall back to a generic message per code.
    pub fn from_remote(code: ErrorCode, details: Option<&str>) -> Self {
        let message = match details {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => match code {
                ErrorCode::ParseError => "parse error".to_string(),
                ErrorCode::General => "general error".to_string(),
                other => other.as_str().to_lowercase().replace('_', " "),
            },
        };
        Self::new(code, message)
    }

    pub fn is_recoverable(&self) -> bool {
        self.code.is_recoverable()
    }

    pub fn is_fatal(&self) -> bool {
        self.code.is_fatal()
    }

    pub fn is_network_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::NetworkError
                | ErrorCode::NetworkTimeout
                | ErrorCode::InvalidResponse
                | ErrorCode::UnexpectedStatus
                | ErrorCode::Unauthorized
                | ErrorCode::Forbidden
                | ErrorCode::RateLimited
        )
    }
}

pub type Result<T> = std::result::Result<T, OfrepError>;
