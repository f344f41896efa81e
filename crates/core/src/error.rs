//! Error types for the Chatterbox domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures of a single Model Gateway call.
///
/// Both variants are recoverable: the orchestrator maps them to a fallback
/// sentence and the turn completes normally.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The backend was unreachable or returned an error.
    #[error("Model backend failed: {0}")]
    Backend(#[from] ProviderError),

    /// The call did not finish within its wall-clock budget and was abandoned.
    #[error("Model call exceeded its {timeout_ms}ms deadline")]
    DeadlineExceeded { timeout_ms: u64 },

    /// The unit of work running the call died before producing a result.
    #[error("Model call aborted: {0}")]
    Aborted(String),
}

impl GatewayError {
    /// Whether this failure was a deadline expiry rather than a backend fault.
    pub fn is_deadline(&self) -> bool {
        matches!(self, GatewayError::DeadlineExceeded { .. })
    }
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Message delivery failed to {channel}: {reason}")]
    DeliveryFailed { channel: String, reason: String },

    #[error("Channel connection lost: {0}")]
    ConnectionLost(String),

    #[error("Topic feed unavailable: {0}")]
    FeedUnavailable(String),
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Malformed history data: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{tool_name} failed: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}
