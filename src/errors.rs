use std::fmt;

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// Missing or invalid configuration. Fatal before any processing starts.
    Config(String),
    /// The registry answered 429 Too Many Requests.
    RateLimited {
        /// The resource that was being fetched.
        resource: String,
    },
    /// Network failure or per-call timeout.
    Transport(String),
    /// Response body could not be decoded into the expected shape.
    MalformedResponse {
        /// The resource that was being fetched.
        resource: String,
        /// Decoder message.
        detail: String,
    },
    /// Any non-success status other than 429.
    HttpStatus {
        /// The resource that was being fetched.
        resource: String,
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
    /// The input list could not be read.
    Input(String),
    /// The output sink could not be written.
    Output(String),
    /// The run was cancelled by the caller.
    Cancelled,
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Whether another attempt may succeed.
    ///
    /// Rate-limit responses, network failures and undecodable bodies are
    /// transient. Everything else is not retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::RateLimited { .. }
            | AppError::Transport(_)
            | AppError::MalformedResponse { .. } => true,
            AppError::WithContext { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Whether this error is (or wraps) a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            AppError::Cancelled => true,
            AppError::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::RateLimited { resource } => {
                write!(f, "Rate limit hit while fetching {}", resource)
            }
            AppError::Transport(msg) => write!(f, "Request failed: {}", msg),
            AppError::MalformedResponse { resource, detail } => {
                write!(f, "Malformed response for {}: {}", resource, detail)
            }
            AppError::HttpStatus {
                resource,
                status,
                body,
            } => write!(f, "Failed to get {}. Status code: {}: {}", resource, status, body),
            AppError::Input(msg) => write!(f, "Input error: {}", msg),
            AppError::Output(msg) => write!(f, "Output error: {}", msg),
            AppError::Cancelled => write!(f, "Run cancelled"),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    ///
    /// Timeouts and connection failures both map to `Transport`, which is retried.
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Transport(format!("request timed out: {}", err))
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Output(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Output(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that produces the context message.
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for csv::Error to add context
impl<T> ResultExt<T> for Result<T, csv::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::from(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::from(e)),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AppError::RateLimited {
            resource: "company profile".to_string()
        }
        .is_retryable());
        assert!(AppError::Transport("connection reset".to_string()).is_retryable());
        assert!(AppError::MalformedResponse {
            resource: "officers".to_string(),
            detail: "expected value".to_string()
        }
        .is_retryable());

        assert!(!AppError::HttpStatus {
            resource: "company profile".to_string(),
            status: 404,
            body: String::new()
        }
        .is_retryable());
        assert!(!AppError::Config("missing key".to_string()).is_retryable());
        assert!(!AppError::Cancelled.is_retryable());
    }

    #[test]
    fn test_context_chain_display() {
        let err: Result<(), AppError> = Err(AppError::Output("disk full".to_string()));
        let err = err.context("Failed to write results").unwrap_err();

        assert_eq!(err.to_string(), "Failed to write results: Output error: disk full");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_context_preserves_cancellation() {
        let err: Result<(), AppError> = Err(AppError::Cancelled);
        let err = err.with_context(|| "while processing 00000001".to_string()).unwrap_err();
        assert!(err.is_cancelled());
    }
}
