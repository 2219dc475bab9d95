//! Error types for minipd

use crate::coordinator::region::RegionEpoch;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Region Errors ===
    #[error("invalid region {region_id}: {reason}")]
    InvalidRegion { region_id: u64, reason: String },

    #[error("invalid region epoch, request: {request}, current: {current}")]
    StaleEpoch {
        request: RegionEpoch,
        current: RegionEpoch,
    },

    #[error("invalid split region, left: {left}, right: {right}")]
    InvalidSplit { left: String, right: String },

    #[error("Region not found for key {0}")]
    RegionNotFound(String),

    #[error("Region lookup for key {key} timed out after {timeout:?}")]
    LookupTimeout { key: String, timeout: Duration },

    // === Allocation Errors ===
    #[error("Id allocation failed: {0}")]
    AllocationFailed(String),

    // === Scheduling Errors ===
    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Network Errors ===
    #[error("HTTP error: {0}")]
    Http(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Can the caller retry this after refreshing its view of the region?
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::StaleEpoch { .. } | Error::AllocationFailed(_) | Error::LookupTimeout { .. }
        )
    }

    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::InvalidRegion { .. } | Error::InvalidSplit { .. } | Error::InvalidConfig(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::StaleEpoch { .. } => StatusCode::CONFLICT,
            Error::RegionNotFound(_) => StatusCode::NOT_FOUND,
            Error::AllocationFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::LookupTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        let stale = Error::StaleEpoch {
            request: RegionEpoch::new(1, 1),
            current: RegionEpoch::new(2, 1),
        };
        assert!(stale.is_retryable());
        assert!(Error::AllocationFailed("etcd down".into()).is_retryable());

        let invalid = Error::InvalidSplit {
            left: "[61, 6d)".into(),
            right: "[6e, +inf)".into(),
        };
        assert!(!invalid.is_retryable());
        assert!(!Error::InvalidRegion {
            region_id: 7,
            reason: "zero region peer count".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_http_status_mapping() {
        use axum::http::StatusCode;

        let stale = Error::StaleEpoch {
            request: RegionEpoch::new(1, 1),
            current: RegionEpoch::new(2, 1),
        };
        assert_eq!(stale.to_http_status(), StatusCode::CONFLICT);
        assert_eq!(
            Error::LookupTimeout {
                key: "61".into(),
                timeout: Duration::from_millis(10)
            }
            .to_http_status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            Error::Internal("boom".into()).to_http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_stale_epoch_message_carries_both_epochs() {
        let err = Error::StaleEpoch {
            request: RegionEpoch::new(1, 2),
            current: RegionEpoch::new(3, 4),
        };
        let msg = err.to_string();
        assert!(msg.contains("conf_ver: 2, version: 1"));
        assert!(msg.contains("conf_ver: 4, version: 3"));
    }
}
