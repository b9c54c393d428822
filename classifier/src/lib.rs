//! # Wastetrack Classifier
//!
//! Client for the image classification service that tags a photographed
//! waste item with per-category counts.
//!
//! ## Example
//!
//! ```no_run
//! use wastetrack_classifier::{Classified, Classifier, ClassifierClient, ImageUpload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClassifierClient::new("http://127.0.0.1:8000/classify-image");
//!
//!     let image = ImageUpload::jpeg(std::fs::read("bottle.jpg")?);
//!     match client.classify(image).await? {
//!         Classified::Detected(classification) => println!("{classification:?}"),
//!         Classified::Unavailable => println!("no classification"),
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;

pub mod client;
pub mod error;
pub mod types;

pub use client::{ClassifierClient, DEFAULT_CLASSIFIER_URL};
pub use error::ClassifierError;
pub use types::{Classification, Classified, ImageUpload, WasteCategory};

/// Turns a captured image into a category → count mapping
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one image
    ///
    /// # Errors
    ///
    /// Returns an error only when the service could not be reached. A
    /// reachable service without a usable answer yields
    /// [`Classified::Unavailable`].
    async fn classify(&self, image: ImageUpload) -> Result<Classified, ClassifierError>;
}

/// Mock classifiers for tests and offline demos
pub mod mocks {
    use super::{async_trait, Classified, Classifier, ClassifierError, ImageUpload};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns the same answer for every image
    #[derive(Debug)]
    pub struct StaticClassifier {
        answer: Result<Classified, String>,
        calls: AtomicUsize,
    }

    impl StaticClassifier {
        /// Always answer with `classified`
        #[must_use]
        pub const fn answering(classified: Classified) -> Self {
            Self {
                answer: Ok(classified),
                calls: AtomicUsize::new(0),
            }
        }

        /// Always fail as if the service were unreachable
        #[must_use]
        pub fn unreachable(reason: impl Into<String>) -> Self {
            Self {
                answer: Err(reason.into()),
                calls: AtomicUsize::new(0),
            }
        }

        /// Number of classify calls so far
        #[must_use]
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Classifier for StaticClassifier {
        async fn classify(&self, _image: ImageUpload) -> Result<Classified, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
                .clone()
                .map_err(ClassifierError::RequestFailed)
        }
    }
}
