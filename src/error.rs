//! Error types for the sync layer
//!
//! Read-style operations swallow these into container state; write-style
//! operations hand them back to the caller.

use thiserror::Error;

// ============================================
// REMOTE API
// ============================================

/// Failure of a single request against the lender API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Network, DNS or timeout failure before a response arrived
    #[error("Network error: {0}")]
    Transport(String),

    /// Server answered with a non-2xx status
    #[error("HTTP error! status: {status}")]
    Http { status: u16 },

    /// Response body did not match the expected structure
    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// Numeric status for HTTP errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

// ============================================
// WALLET
// ============================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// A connect call is already awaiting the provider
    #[error("Wallet connection already in progress")]
    ConnectInProgress,

    /// The wallet provider rejected or failed the call
    #[error("{0}")]
    Provider(String),
}

// ============================================
// PERSISTENT STORAGE
// ============================================

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_message_embeds_status() {
        let err = ApiError::Http { status: 500 };
        assert!(err.to_string().contains("500"));
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_decode_error_from_serde() {
        let err: ApiError = serde_json::from_str::<Vec<u32>>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, ApiError::Decode(_)));
        assert_eq!(err.status(), None);
    }
}
