//! Transport client interface.
//!
//! One client per wire protocol is supplied by the host. Clients own their
//! connections; the dispatcher only hands them payloads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hubbridge_protocol::{TransportKind, TransportPayload};

use crate::accessory::Accessory;

/// Transport client error types.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    #[error("Transmit failed: {0}")]
    Transmit(String),

    #[error("Transport not connected")]
    NotConnected,

    #[error("Timeout waiting for device")]
    Timeout,

    #[error("Payload not supported by {0} transport")]
    UnsupportedPayload(TransportKind),
}

/// A client able to deliver payloads over one transport.
#[async_trait]
pub trait TransportClient: Send + Sync {
    /// Which transport this client speaks.
    fn kind(&self) -> TransportKind;

    /// Deliver a payload to a device.
    async fn update_device(
        &self,
        accessory: &Accessory,
        payload: &TransportPayload,
    ) -> Result<(), TransportError>;
}

/// Per-transport dispatch counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportStats {
    /// Transport
    pub transport: TransportKind,
    /// Number of delivery attempts
    pub attempts: u64,
    /// Number of successful deliveries
    pub successes: u64,
    /// Number of failed deliveries
    pub failures: u64,
    /// Last error message
    pub last_error: Option<String>,
    /// When the last error happened
    pub last_error_at: Option<DateTime<Utc>>,
}

impl TransportStats {
    pub fn new(transport: TransportKind) -> Self {
        Self {
            transport,
            attempts: 0,
            successes: 0,
            failures: 0,
            last_error: None,
            last_error_at: None,
        }
    }

    pub(crate) fn record_success(&mut self) {
        self.attempts += 1;
        self.successes += 1;
    }

    pub(crate) fn record_failure(&mut self, error: impl ToString) {
        self.attempts += 1;
        self.failures += 1;
        self.last_error = Some(error.to_string());
        self.last_error_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_recording() {
        let mut stats = TransportStats::new(TransportKind::Cloud);
        stats.record_success();
        stats.record_failure(TransportError::NotConnected);

        assert_eq!(stats.attempts, 2);
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.last_error.as_deref(), Some("Transport not connected"));
        assert!(stats.last_error_at.is_some());
    }
}
