//! Scripted carrier for unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use super::traits::{Carrier, CarrierError, CarrierResult};
use crate::domain::{ResultStatus, ShipmentRecord, ShipmentResult};

/// Issues sequential PINs unless a rejection is queued
#[derive(Default)]
pub struct FakeCarrier {
    calls: AtomicUsize,
    rejections: Mutex<VecDeque<String>>,
    pub shipped: Mutex<Vec<ShipmentRecord>>,
    pub label: Option<Vec<u8>>,
}

impl FakeCarrier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(label: &[u8]) -> Self {
        FakeCarrier {
            label: Some(label.to_vec()),
            ..Default::default()
        }
    }

    /// Make the next call fail with the given carrier message
    pub fn reject_next(&self, message: &str) {
        self.rejections.lock().unwrap().push_back(message.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Carrier for FakeCarrier {
    fn code(&self) -> &'static str {
        "fake"
    }

    fn name(&self) -> &'static str {
        "Fake Carrier"
    }

    async fn create_shipment(&self, shipment: &ShipmentRecord) -> CarrierResult<ShipmentResult> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.shipped.lock().unwrap().push(shipment.clone());

        let mut result = ShipmentResult::failed(shipment.effective_reference(), "");
        if let Some(message) = self.rejections.lock().unwrap().pop_front() {
            result.http_status = Some(500);
            result.message = message;
            return Ok(result);
        }
        result.status = ResultStatus::Success;
        result.http_status = Some(200);
        result.shipment_pin = Some(format!("PIN{:04}", n));
        result.message = "Shipment created successfully".to_string();
        Ok(result)
    }

    async fn fetch_label(&self, shipment_pin: &str) -> CarrierResult<Bytes> {
        match &self.label {
            Some(bytes) => Ok(Bytes::from(bytes.clone())),
            None => Err(CarrierError::NotFound(format!("no label for {}", shipment_pin))),
        }
    }
}
