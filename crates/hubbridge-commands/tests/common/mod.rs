//! Shared test helpers: a recording transport client and accessory builders.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use hubbridge_commands::{Accessory, Capabilities, TransportClient, TransportError};
use hubbridge_protocol::{TransportKind, TransportPayload};
use tokio::time::Instant;

/// One recorded `update_device` call.
#[derive(Debug, Clone)]
pub struct Call {
    pub device_id: String,
    pub payload: TransportPayload,
    pub at: Instant,
}

/// Transport client that records every call and answers as configured.
pub struct MockClient {
    kind: TransportKind,
    fail: bool,
    delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
}

impl MockClient {
    pub fn new(kind: TransportKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            fail: false,
            delay: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(kind: TransportKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            fail: true,
            delay: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(kind: TransportKind, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            kind,
            fail: false,
            delay: Some(delay),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TransportClient for MockClient {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn update_device(
        &self,
        accessory: &Accessory,
        payload: &TransportPayload,
    ) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(Call {
            device_id: accessory.device_id.clone(),
            payload: payload.clone(),
            at: Instant::now(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(TransportError::Transmit(format!("{} offline", self.kind)));
        }
        Ok(())
    }
}

/// Accessory with the given (has, use) flags for LAN, cloud and BLE.
pub fn accessory(lan: (bool, bool), cloud: (bool, bool), ble: (bool, bool)) -> Accessory {
    Accessory::new("AA:BB:CC:DD:EE:FF:00:11", "Desk Lamp")
        .with_model("H6008")
        .with_capabilities(Capabilities::from_flags(lan, cloud, ble))
}

pub const ON: (bool, bool) = (true, true);
pub const OFF: (bool, bool) = (true, false);
pub const NONE: (bool, bool) = (false, false);
