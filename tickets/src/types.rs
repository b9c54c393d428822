//! Domain types for waste ticket tracking.
//!
//! A [`WasteTicket`] follows one photographed waste item from submission
//! through collection to recycling. Tickets are shared as `Arc<WasteTicket>`
//! and never mutated in place; an update replaces the `Arc`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;
use wastetrack_classifier::Classification;

/// Points credited when a ticket is submitted
pub const SUBMISSION_AWARD: u32 = 5;

/// Total points a ticket is worth once recycled
pub const RECYCLING_AWARD: u32 = 15;

// ============================================================================
// Identifiers
// ============================================================================

/// Internal identifier of a ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Creates a new random `TicketId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `TicketId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public tracking code printed on a ticket, e.g. `WT7K2M9QXA`
///
/// Any string is accepted so callers can look up codes typed by users;
/// [`WasteId::is_well_formed`] checks the generated format.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WasteId(String);

impl WasteId {
    /// Prefix of every generated code
    pub const PREFIX: &'static str = "WT";

    /// Number of random characters after the prefix
    pub const CODE_LEN: usize = 8;

    /// Characters the random part is drawn from
    pub const ALPHABET: &'static [u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Wrap an existing code
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The code as text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this code has the generated `WT` + 8 × `[A-Z0-9]` shape
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.0.strip_prefix(Self::PREFIX).is_some_and(|code| {
            code.len() == Self::CODE_LEN && code.bytes().all(|b| Self::ALPHABET.contains(&b))
        })
    }
}

impl fmt::Display for WasteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WasteId {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// Lifecycle status; variants are ordered pending < collected < recycled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Submitted, waiting for a collector
    Pending,
    /// Picked up by a collector
    Collected,
    /// Recycling completed
    Recycled,
}

impl TicketStatus {
    /// Lowercase label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Collected => "collected",
            Self::Recycled => "recycled",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Milestone that carries a one-time point award
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Milestone {
    /// Ticket submitted
    Submission,
    /// Ticket recycled
    Recycling,
}

impl Milestone {
    /// Lowercase label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submission => "submission",
            Self::Recycling => "recycling",
        }
    }
}

/// Where the waste was photographed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lng: f64,
    /// Human-readable address
    pub address: String,
}

impl Location {
    /// Create a location
    #[must_use]
    pub fn new(lat: f64, lng: f64, address: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            address: address.into(),
        }
    }
}

/// Milestone timestamps of a ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// When the ticket was created
    pub created: DateTime<Utc>,
    /// When the ticket first reached `collected`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected: Option<DateTime<Utc>>,
    /// When the ticket first reached `recycled`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recycled: Option<DateTime<Utc>>,
}

impl Timestamps {
    /// Timestamps of a ticket created at `created`
    #[must_use]
    pub const fn created_at(created: DateTime<Utc>) -> Self {
        Self {
            created,
            collected: None,
            recycled: None,
        }
    }

    /// Timestamp recorded for reaching `status`
    #[must_use]
    pub const fn for_status(&self, status: TicketStatus) -> Option<DateTime<Utc>> {
        match status {
            TicketStatus::Pending => Some(self.created),
            TicketStatus::Collected => self.collected,
            TicketStatus::Recycled => self.recycled,
        }
    }
}

// ============================================================================
// Ticket
// ============================================================================

/// One submitted waste item
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteTicket {
    /// Internal identifier
    pub id: TicketId,
    /// Public tracking code
    pub waste_id: WasteId,
    /// Owning citizen
    pub citizen_id: String,
    /// Collector who picked the item up; written once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collector_id: Option<String>,
    /// Detected categories; `None` when unclassified or unreadable
    #[serde(
        default,
        deserialize_with = "lenient_classification",
        skip_serializing_if = "Option::is_none"
    )]
    pub classification: Option<Classification>,
    /// Lifecycle status
    pub status: TicketStatus,
    /// Photo of the waste (URL or data URL)
    pub image_url: String,
    /// Scannable code image encoding the waste id; empty if encoding failed
    #[serde(default)]
    pub qr_code: String,
    /// Photo taken by the collector as proof of pickup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_image_url: Option<String>,
    /// Where the item was photographed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Milestone timestamps
    pub timestamps: Timestamps,
    /// Points credited to the citizen for this ticket so far
    pub eco_points_awarded: u32,
}

/// Read a stored classification without ever failing the surrounding ticket
///
/// Objects and JSON-encoded strings are parsed; anything else becomes `None`.
fn lenient_classification<'de, D>(deserializer: D) -> Result<Option<Classification>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(value) => {
            let parsed = Classification::from_value(&value);
            if parsed.is_none() {
                tracing::warn!(payload = %value, "Discarding unreadable classification");
            }
            parsed
        },
    })
}

// ============================================================================
// State
// ============================================================================

/// State owned by the ticket store
#[derive(Clone, Debug, Default)]
pub struct TicketState {
    /// All tickets, newest first
    pub tickets: Vec<Arc<WasteTicket>>,
    /// Ticket currently focused by the presentation layer
    pub current_ticket: Option<Arc<WasteTicket>>,
    /// Every waste id handed out this session, including ones still being created
    pub issued_waste_ids: HashSet<WasteId>,
    /// Last rejected command
    pub last_error: Option<String>,
}

impl TicketState {
    /// Rebuild state from persisted tickets
    ///
    /// The focused ticket is re-linked to the matching collection entry when
    /// the two are equal, so both share one allocation again.
    #[must_use]
    pub fn restore(
        tickets: Vec<Arc<WasteTicket>>,
        current_ticket: Option<Arc<WasteTicket>>,
    ) -> Self {
        let issued_waste_ids = tickets.iter().map(|t| t.waste_id.clone()).collect();
        let current_ticket = current_ticket.map(|current| {
            tickets
                .iter()
                .find(|t| t.waste_id == current.waste_id && t.as_ref() == current.as_ref())
                .map_or(current, Arc::clone)
        });

        Self {
            tickets,
            current_ticket,
            issued_waste_ids,
            last_error: None,
        }
    }

    /// Position of the ticket with `waste_id`
    #[must_use]
    pub fn position(&self, waste_id: &WasteId) -> Option<usize> {
        self.tickets.iter().position(|t| &t.waste_id == waste_id)
    }

    /// Ticket with `waste_id`
    #[must_use]
    pub fn find(&self, waste_id: &WasteId) -> Option<&Arc<WasteTicket>> {
        self.tickets.iter().find(|t| &t.waste_id == waste_id)
    }

    /// Tickets owned by `citizen_id`, in collection order
    #[must_use]
    pub fn tickets_by_user(&self, citizen_id: &str) -> Vec<Arc<WasteTicket>> {
        self.tickets
            .iter()
            .filter(|t| t.citizen_id == citizen_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ticket(waste_id: &str) -> WasteTicket {
        WasteTicket {
            id: TicketId::new(),
            waste_id: WasteId::new(waste_id),
            citizen_id: "c1".to_string(),
            collector_id: None,
            classification: None,
            status: TicketStatus::Pending,
            image_url: "data:image/jpeg;base64,AAAA".to_string(),
            qr_code: String::new(),
            proof_image_url: None,
            location: None,
            timestamps: Timestamps::created_at(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()),
            eco_points_awarded: SUBMISSION_AWARD,
        }
    }

    #[test]
    fn waste_id_format() {
        assert!(WasteId::new("WT7K2M9QXA").is_well_formed());
        assert!(!WasteId::new("WT7K2M9QX").is_well_formed());
        assert!(!WasteId::new("WT7k2m9qxa").is_well_formed());
        assert!(!WasteId::new("XX7K2M9QXA").is_well_formed());
    }

    #[test]
    fn status_order_is_lifecycle_order() {
        assert!(TicketStatus::Pending < TicketStatus::Collected);
        assert!(TicketStatus::Collected < TicketStatus::Recycled);
    }

    #[test]
    fn ticket_json_uses_camel_case() {
        let value = serde_json::to_value(ticket("WTAAAA0001")).unwrap();
        assert_eq!(value["wasteId"], "WTAAAA0001");
        assert_eq!(value["ecoPointsAwarded"], 5);
        assert_eq!(value["status"], "pending");
        assert!(value.get("classification").is_none());
    }

    #[test]
    fn unreadable_classification_loads_as_none() {
        let mut value = serde_json::to_value(ticket("WTAAAA0001")).unwrap();

        value["classification"] = json!("Plastic Waste");
        let loaded: WasteTicket = serde_json::from_value(value.clone()).unwrap();
        assert!(loaded.classification.is_none());

        value["classification"] = json!(42);
        let loaded: WasteTicket = serde_json::from_value(value.clone()).unwrap();
        assert!(loaded.classification.is_none());

        value["classification"] = json!("{\"plastic\":2}");
        let loaded: WasteTicket = serde_json::from_value(value).unwrap();
        assert_eq!(
            loaded.classification.unwrap().get(wastetrack_classifier::WasteCategory::Plastic),
            2
        );
    }

    #[test]
    fn restore_relinks_current_ticket() {
        let first = Arc::new(ticket("WTAAAA0001"));
        let second = Arc::new(ticket("WTAAAA0002"));
        let current = Arc::new((*second).clone());

        let state = TicketState::restore(vec![Arc::clone(&first), Arc::clone(&second)], Some(current));

        assert!(Arc::ptr_eq(state.current_ticket.as_ref().unwrap(), &second));
        assert_eq!(state.issued_waste_ids.len(), 2);
        assert_eq!(state.position(&WasteId::new("WTAAAA0002")), Some(1));
    }

    #[test]
    fn tickets_by_user_keeps_order() {
        let mut other = ticket("WTAAAA0002");
        other.citizen_id = "c2".to_string();
        let state = TicketState::restore(
            vec![
                Arc::new(ticket("WTAAAA0003")),
                Arc::new(other),
                Arc::new(ticket("WTAAAA0001")),
            ],
            None,
        );

        let mine: Vec<_> = state
            .tickets_by_user("c1")
            .iter()
            .map(|t| t.waste_id.to_string())
            .collect();
        assert_eq!(mine, vec!["WTAAAA0003", "WTAAAA0001"]);
        assert!(state.tickets_by_user("nobody").is_empty());
    }
}
