//! Citizen submission flow: classify a photo, then create its ticket.

use crate::store::{TicketError, WasteTicketStore};
use crate::types::{Location, WasteTicket};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use thiserror::Error;
use wastetrack_classifier::{Classified, Classifier, ClassifierError, ImageUpload};

/// Why a submission did not produce a ticket
///
/// Either case is shown to the citizen as a retryable failure.
#[derive(Error, Debug)]
pub enum SubmissionError {
    /// The classification service could not be reached
    #[error("Classification failed: {0}")]
    Classification(#[from] ClassifierError),

    /// The store did not create the ticket
    #[error("Ticket creation failed: {0}")]
    Ticket(#[from] TicketError),
}

/// Runs the classify-then-create sequence against a ticket store
#[derive(Clone)]
pub struct SubmissionFlow {
    store: WasteTicketStore,
    classifier: Arc<dyn Classifier>,
}

impl SubmissionFlow {
    /// Flow creating tickets in `store`
    #[must_use]
    pub fn new(store: WasteTicketStore, classifier: Arc<dyn Classifier>) -> Self {
        Self { store, classifier }
    }

    /// Store tickets are created in
    #[must_use]
    pub const fn store(&self) -> &WasteTicketStore {
        &self.store
    }

    /// Submit a photo taken at the fallback location
    ///
    /// # Errors
    ///
    /// See [`SubmissionFlow::submit_at`].
    pub async fn submit(
        &self,
        citizen_id: &str,
        image: ImageUpload,
    ) -> Result<Arc<WasteTicket>, SubmissionError> {
        self.submit_at(citizen_id, image, None).await
    }

    /// Submit a photo taken at `location`
    ///
    /// An unavailable classification creates the ticket without one.
    ///
    /// # Errors
    ///
    /// - [`SubmissionError::Classification`] when the classify request fails
    /// - [`SubmissionError::Ticket`] when the store rejects the ticket
    #[tracing::instrument(skip(self, image, location), fields(bytes = image.bytes.len()))]
    pub async fn submit_at(
        &self,
        citizen_id: &str,
        image: ImageUpload,
        location: Option<Location>,
    ) -> Result<Arc<WasteTicket>, SubmissionError> {
        let image_url = data_url(&image);

        let classified = match self.classifier.classify(image).await {
            Ok(classified) => classified,
            Err(error) => {
                tracing::error!(error = %error, "Classification request failed");
                metrics::counter!("wastetrack_classifications_total", "outcome" => "failed")
                    .increment(1);
                return Err(error.into());
            },
        };

        let classification = match classified {
            Classified::Detected(classification) => {
                tracing::debug!(total = classification.total(), "Waste classified");
                metrics::counter!("wastetrack_classifications_total", "outcome" => "detected")
                    .increment(1);
                Some(classification)
            },
            Classified::Unavailable => {
                tracing::warn!("Classification unavailable, creating ticket without it");
                metrics::counter!("wastetrack_classifications_total", "outcome" => "unavailable")
                    .increment(1);
                None
            },
        };

        let ticket = self
            .store
            .create_waste_ticket(citizen_id, &image_url, classification, location)
            .await?;
        Ok(ticket)
    }
}

impl std::fmt::Debug for SubmissionFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionFlow")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Embed the uploaded image as a `data:` URL
fn data_url(image: &ImageUpload) -> String {
    format!("data:{};base64,{}", image.content_type, STANDARD.encode(&image.bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_become_data_urls() {
        let url = data_url(&ImageUpload::jpeg(vec![0xFF, 0xD8, 0xFF]));
        assert_eq!(url, "data:image/jpeg;base64,/9j/");
    }
}
