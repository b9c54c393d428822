//! Deterministic collaborators for tests and offline demos.

use crate::environment::{CodeImageEncoder, CodeImageOptions, EncodeError, PointsLedger, WasteIdGenerator};
use crate::types::WasteId;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Waste ids `WT00000001`, `WT00000002`, ... optionally preceded by scripted ids
#[derive(Debug, Default)]
pub struct SequentialWasteIdGenerator {
    scripted: Mutex<VecDeque<WasteId>>,
    next: AtomicU64,
}

impl SequentialWasteIdGenerator {
    /// Counting generator starting at 1
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out `ids` first, then count
    #[must_use]
    pub fn scripted(ids: impl IntoIterator<Item = WasteId>) -> Self {
        Self {
            scripted: Mutex::new(ids.into_iter().collect()),
            next: AtomicU64::new(0),
        }
    }
}

impl WasteIdGenerator for SequentialWasteIdGenerator {
    fn generate(&self) -> WasteId {
        let scripted = match self.scripted.lock() {
            Ok(mut queue) => queue.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        scripted.unwrap_or_else(|| {
            let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
            WasteId::new(format!("{}{n:08}", WasteId::PREFIX))
        })
    }
}

/// Always returns the same id
#[derive(Debug, Clone)]
pub struct ConstantWasteIdGenerator(pub WasteId);

impl WasteIdGenerator for ConstantWasteIdGenerator {
    fn generate(&self) -> WasteId {
        self.0.clone()
    }
}

/// Encodes `text` as `code:<text>`
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticEncoder;

#[async_trait]
impl CodeImageEncoder for StaticEncoder {
    async fn encode(&self, text: &str, _options: &CodeImageOptions) -> Result<String, EncodeError> {
        Ok(format!("code:{text}"))
    }
}

/// [`StaticEncoder`] that takes `delay` to answer
#[derive(Debug, Clone, Copy)]
pub struct DelayedEncoder {
    /// Time spent before each answer
    pub delay: Duration,
}

#[async_trait]
impl CodeImageEncoder for DelayedEncoder {
    async fn encode(&self, text: &str, options: &CodeImageOptions) -> Result<String, EncodeError> {
        tokio::time::sleep(self.delay).await;
        StaticEncoder.encode(text, options).await
    }
}

/// Encoder that always fails
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingEncoder;

#[async_trait]
impl CodeImageEncoder for FailingEncoder {
    async fn encode(&self, _text: &str, _options: &CodeImageOptions) -> Result<String, EncodeError> {
        Err(EncodeError::Render("encoder offline".to_string()))
    }
}

/// Ledger that records every credit
#[derive(Debug, Default)]
pub struct RecordingLedger {
    credits: Mutex<Vec<(String, u32)>>,
}

impl RecordingLedger {
    /// Empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All credits in order
    #[must_use]
    pub fn credits(&self) -> Vec<(String, u32)> {
        match self.credits.lock() {
            Ok(credits) => credits.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Sum credited to `citizen_id`
    #[must_use]
    pub fn total_for(&self, citizen_id: &str) -> u32 {
        self.credits()
            .iter()
            .filter(|(citizen, _)| citizen == citizen_id)
            .map(|(_, amount)| amount)
            .sum()
    }
}

impl PointsLedger for RecordingLedger {
    fn credit(&self, citizen_id: &str, amount: u32) {
        match self.credits.lock() {
            Ok(mut credits) => credits.push((citizen_id.to_string(), amount)),
            Err(poisoned) => poisoned.into_inner().push((citizen_id.to_string(), amount)),
        }
    }
}
