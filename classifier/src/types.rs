//! Waste categories and classification results

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Category reported by the classification model
///
/// Variant order is the canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WasteCategory {
    /// Cardboard boxes and packaging
    Cardboard,
    /// Glass bottles and jars
    Glass,
    /// Cans and other metal items
    Metal,
    /// Paper
    Paper,
    /// Plastic
    Plastic,
    /// Non-recyclable residual waste
    Trash,
}

impl WasteCategory {
    /// All categories in canonical order
    pub const ALL: [Self; 6] = [
        Self::Cardboard,
        Self::Glass,
        Self::Metal,
        Self::Paper,
        Self::Plastic,
        Self::Trash,
    ];

    /// Wire label (`"plastic"`)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cardboard => "cardboard",
            Self::Glass => "glass",
            Self::Metal => "metal",
            Self::Paper => "paper",
            Self::Plastic => "plastic",
            Self::Trash => "trash",
        }
    }

    /// Capitalized display label (`"Plastic"`)
    #[must_use]
    pub const fn display_label(self) -> &'static str {
        match self {
            Self::Cardboard => "Cardboard",
            Self::Glass => "Glass",
            Self::Metal => "Metal",
            Self::Paper => "Paper",
            Self::Plastic => "Plastic",
            Self::Trash => "Trash",
        }
    }

    /// Look up a category by label, ignoring case and surrounding whitespace
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for WasteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category → count mapping produced by the classifier
///
/// Iteration follows [`WasteCategory::ALL`] order. Zero counts are kept;
/// presentation decides whether to show them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Classification {
    counts: BTreeMap<WasteCategory, u32>,
}

impl Classification {
    /// Empty classification
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, category: WasteCategory, count: u32) -> Self {
        self.counts.insert(category, count);
        self
    }

    /// Count for a category (0 when not reported)
    #[must_use]
    pub fn get(&self, category: WasteCategory) -> u32 {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// All reported categories with their counts, zeros included
    pub fn iter(&self) -> impl Iterator<Item = (WasteCategory, u32)> + '_ {
        self.counts.iter().map(|(category, count)| (*category, *count))
    }

    /// Categories with a count above zero
    pub fn detected(&self) -> impl Iterator<Item = (WasteCategory, u32)> + '_ {
        self.iter().filter(|(_, count)| *count > 0)
    }

    /// Whether no category was reported
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts
    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts.values().fold(0, |sum, count| sum.saturating_add(*count))
    }

    /// Parse classification JSON text
    ///
    /// Returns `None` for anything that is not a valid mapping; see
    /// [`Classification::from_value`].
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        Self::from_value(&value)
    }

    /// Build a classification from a JSON value
    ///
    /// Accepts an object of non-negative integer counts, or a string holding
    /// such an object as JSON text. Unknown labels are skipped. A count that
    /// is negative, fractional or not a number makes the whole payload
    /// malformed.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = match value {
            Value::Object(object) => object,
            Value::String(text) => {
                let inner: Value = serde_json::from_str(text).ok()?;
                return match inner {
                    Value::Object(_) => Self::from_value(&inner),
                    _ => None,
                };
            },
            _ => return None,
        };

        let mut counts = BTreeMap::new();
        for (label, count) in object {
            let count = parse_count(count)?;
            match WasteCategory::from_label(label) {
                Some(category) => {
                    let entry = counts.entry(category).or_insert(0_u32);
                    *entry = entry.saturating_add(count);
                },
                None => tracing::debug!(label = %label, "Ignoring unknown waste category"),
            }
        }

        Some(Self { counts })
    }
}

fn parse_count(value: &Value) -> Option<u32> {
    if let Some(count) = value.as_u64() {
        return u32::try_from(count).ok();
    }
    // Some models emit 2.0 for integral counts
    let float = value.as_f64()?;
    if float >= 0.0 && float.fract() == 0.0 && float <= f64::from(u32::MAX) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        return Some(float as u32);
    }
    None
}

impl FromIterator<(WasteCategory, u32)> for Classification {
    fn from_iter<I: IntoIterator<Item = (WasteCategory, u32)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

impl<'de> Deserialize<'de> for Classification {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom("invalid classification mapping"))
    }
}

/// Outcome of a classification request that reached the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// The service returned a usable mapping
    Detected(Classification),
    /// The service answered but produced nothing usable
    Unavailable,
}

impl Classified {
    /// The detected mapping, if any
    #[must_use]
    pub fn into_classification(self) -> Option<Classification> {
        match self {
            Self::Detected(classification) => Some(classification),
            Self::Unavailable => None,
        }
    }
}

/// Image captured by the citizen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Raw image bytes
    pub bytes: Vec<u8>,
    /// File name sent with the multipart part
    pub file_name: String,
    /// MIME type, e.g. `image/jpeg`
    pub content_type: String,
}

impl ImageUpload {
    /// JPEG capture with the default file name
    #[must_use]
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            file_name: "waste.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
        }
    }
}
