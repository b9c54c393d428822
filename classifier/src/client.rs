//! HTTP classification client

use crate::{
    error::ClassifierError,
    types::{Classification, Classified, ImageUpload},
    Classifier,
};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde_json::Value;
use std::time::Duration;

/// Endpoint used when none is configured
pub const DEFAULT_CLASSIFIER_URL: &str = "http://127.0.0.1:8000/classify-image";

/// Multipart field carrying the image
const FILE_FIELD: &str = "file";

/// Response field carrying the category mapping
const CLASSIFICATION_FIELD: &str = "classification";

/// Classification service client
///
/// Posts the image as multipart field `file` and reads the mapping from the
/// `classification` field of the JSON response.
#[derive(Clone, Debug)]
pub struct ClassifierClient {
    client: Client,
    url: String,
}

impl ClassifierClient {
    /// Create a client for the given endpoint URL
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    /// Create a client whose requests give up after `timeout`
    ///
    /// # Errors
    ///
    /// Returns `ClassifierError::Build` if the HTTP client cannot be built
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, ClassifierError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::Build(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Endpoint this client posts to
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn form(image: ImageUpload) -> Result<Form, ClassifierError> {
        let part = Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.content_type)
            .map_err(|e| ClassifierError::InvalidUpload(e.to_string()))?;

        Ok(Form::new().part(FILE_FIELD, part))
    }
}

impl Default for ClassifierClient {
    fn default() -> Self {
        Self::new(DEFAULT_CLASSIFIER_URL)
    }
}

#[async_trait]
impl Classifier for ClassifierClient {
    #[tracing::instrument(skip(self, image), fields(url = %self.url, bytes = image.bytes.len()))]
    async fn classify(&self, image: ImageUpload) -> Result<Classified, ClassifierError> {
        let form = Self::form(image)?;

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClassifierError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "Classifier returned an error status");
            return Ok(Classified::Unavailable);
        }

        let body = match response.json::<Value>().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Classifier response is not JSON");
                return Ok(Classified::Unavailable);
            },
        };

        match body.get(CLASSIFICATION_FIELD).and_then(Classification::from_value) {
            Some(classification) => {
                tracing::debug!(total = classification.total(), "Image classified");
                Ok(Classified::Detected(classification))
            },
            None => {
                tracing::warn!("Classifier response has no usable classification");
                Ok(Classified::Unavailable)
            },
        }
    }
}
