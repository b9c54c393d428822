//! Injected dependencies of the ticket reducer.
//!
//! Everything the reducer cannot compute from state alone (time, random
//! codes, code images, point crediting) comes through these traits so tests
//! can substitute deterministic fakes.

use crate::types::{Location, WasteId};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use thiserror::Error;
use wastetrack_core::environment::{Clock, SystemClock};

// ============================================================================
// Waste id generation
// ============================================================================

/// Source of fresh waste ids
pub trait WasteIdGenerator: Send + Sync {
    /// Produce a candidate id; the reducer rejects ids already issued
    fn generate(&self) -> WasteId;
}

/// `WT` followed by 8 random characters from `[A-Z0-9]`
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomWasteIdGenerator;

impl WasteIdGenerator for RandomWasteIdGenerator {
    fn generate(&self) -> WasteId {
        let mut rng = rand::thread_rng();
        let mut code = String::with_capacity(WasteId::PREFIX.len() + WasteId::CODE_LEN);
        code.push_str(WasteId::PREFIX);
        for _ in 0..WasteId::CODE_LEN {
            let index = rng.gen_range(0..WasteId::ALPHABET.len());
            code.push(char::from(WasteId::ALPHABET[index]));
        }
        WasteId::new(code)
    }
}

// ============================================================================
// Code images
// ============================================================================

/// Rendering options for code images
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeImageOptions {
    /// Image width in pixels
    pub width: u32,
    /// Quiet zone around the code, in modules
    pub margin: u32,
    /// Colour of dark modules (`#RRGGBB`)
    pub dark: String,
    /// Background colour (`#RRGGBB`)
    pub light: String,
}

impl Default for CodeImageOptions {
    fn default() -> Self {
        Self {
            width: 200,
            margin: 2,
            dark: "#059669".to_string(),
            light: "#FFFFFF".to_string(),
        }
    }
}

/// Errors from code image encoders
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The text cannot be represented as a code
    #[error("Cannot encode input: {0}")]
    InvalidInput(String),

    /// Rendering the image failed
    #[error("Rendering failed: {0}")]
    Render(String),
}

/// Renders text as a scannable code image
#[async_trait]
pub trait CodeImageEncoder: Send + Sync {
    /// Encode `text`, returning displayable image data (usually a data URL)
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] when the image cannot be produced.
    async fn encode(&self, text: &str, options: &CodeImageOptions) -> Result<String, EncodeError>;
}

// ============================================================================
// Points
// ============================================================================

/// Capability to credit eco points to a citizen
pub trait PointsLedger: Send + Sync {
    /// Add `amount` to the running total of `citizen_id`
    fn credit(&self, citizen_id: &str, amount: u32);
}

// ============================================================================
// Environment
// ============================================================================

/// Static settings applied when tickets are created
#[derive(Debug, Clone, PartialEq)]
pub struct TicketSettings {
    /// Location used when a submission carries none
    pub fallback_location: Location,
    /// Options passed to the code image encoder
    pub code_image: CodeImageOptions,
}

impl Default for TicketSettings {
    fn default() -> Self {
        Self {
            fallback_location: Location::new(18.463_499, 73.868_136, "Pune, India"),
            code_image: CodeImageOptions::default(),
        }
    }
}

/// Environment for the ticket reducer
#[derive(Clone)]
pub struct TicketEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
    /// Waste id source
    pub waste_ids: Arc<dyn WasteIdGenerator>,
    /// Code image encoder
    pub encoder: Arc<dyn CodeImageEncoder>,
    /// Eco point ledger
    pub ledger: Arc<dyn PointsLedger>,
    /// Creation settings
    pub settings: Arc<TicketSettings>,
}

impl TicketEnvironment {
    /// Creates a new `TicketEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        waste_ids: Arc<dyn WasteIdGenerator>,
        encoder: Arc<dyn CodeImageEncoder>,
        ledger: Arc<dyn PointsLedger>,
        settings: TicketSettings,
    ) -> Self {
        Self {
            clock,
            waste_ids,
            encoder,
            ledger,
            settings: Arc::new(settings),
        }
    }

    /// Production environment: system clock and random waste ids
    #[must_use]
    pub fn live(
        encoder: Arc<dyn CodeImageEncoder>,
        ledger: Arc<dyn PointsLedger>,
        settings: TicketSettings,
    ) -> Self {
        Self::new(
            Arc::new(SystemClock),
            Arc::new(RandomWasteIdGenerator),
            encoder,
            ledger,
            settings,
        )
    }
}

impl std::fmt::Debug for TicketEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketEnvironment")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn random_ids_are_well_formed() {
        let generator = RandomWasteIdGenerator;
        for _ in 0..200 {
            let id = generator.generate();
            assert!(id.is_well_formed(), "{id} is not well formed");
        }
    }

    #[test]
    fn random_ids_do_not_repeat_in_practice() {
        let generator = RandomWasteIdGenerator;
        let ids: HashSet<_> = (0..10_000).map(|_| generator.generate()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn default_settings() {
        let settings = TicketSettings::default();
        assert_eq!(settings.fallback_location.address, "Pune, India");
        assert_eq!(settings.code_image.width, 200);
        assert_eq!(settings.code_image.margin, 2);
        assert_eq!(settings.code_image.dark, "#059669");
    }
}
