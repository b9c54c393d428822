//! Snapshot persistence for the ticket store.
//!
//! The full `{tickets, currentTicket}` snapshot is serialized as JSON and
//! written to a [`SnapshotStore`] after every reduced action. At startup
//! [`restore_state`] reads it back; anything unreadable starts an empty
//! session instead of failing.

use crate::types::{TicketState, WasteTicket};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use wastetrack_core::persistence::{PersistenceError, SnapshotStore, StatePersistence};

/// Key the ticket snapshot is stored under by default
pub const DEFAULT_STORAGE_KEY: &str = "waste-storage";

/// Persisted part of [`TicketState`]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSnapshot {
    /// All tickets, newest first
    #[serde(default)]
    pub tickets: Vec<Arc<WasteTicket>>,
    /// Focused ticket
    #[serde(default)]
    pub current_ticket: Option<Arc<WasteTicket>>,
}

impl TicketSnapshot {
    /// Capture the persisted fields of `state`
    #[must_use]
    pub fn from_state(state: &TicketState) -> Self {
        Self {
            tickets: state.tickets.clone(),
            current_ticket: state.current_ticket.clone(),
        }
    }

    /// Rebuild store state from this snapshot
    #[must_use]
    pub fn into_state(self) -> TicketState {
        TicketState::restore(self.tickets, self.current_ticket)
    }

    /// Serialize to JSON bytes
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Serialization` if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PersistenceError> {
        serde_json::to_vec(self).map_err(|e| PersistenceError::Serialization(e.to_string()))
    }

    /// Deserialize from JSON bytes
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Serialization` if the bytes are not a snapshot.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistenceError> {
        serde_json::from_slice(bytes).map_err(|e| PersistenceError::Serialization(e.to_string()))
    }
}

/// Writes ticket snapshots to a medium under one key
#[derive(Clone)]
pub struct TicketPersistence {
    medium: Arc<dyn SnapshotStore>,
    key: String,
}

impl TicketPersistence {
    /// Persist under `key` in `medium`
    #[must_use]
    pub fn new(medium: Arc<dyn SnapshotStore>, key: impl Into<String>) -> Self {
        Self {
            medium,
            key: key.into(),
        }
    }

    /// Storage key
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for TicketPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketPersistence")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl StatePersistence<TicketState> for TicketPersistence {
    fn persist(&self, state: &TicketState) -> Result<(), PersistenceError> {
        let bytes = TicketSnapshot::from_state(state).to_bytes()?;
        self.medium.save(&self.key, &bytes)
    }
}

/// Load the session stored under `key`
///
/// A missing snapshot is a fresh session. An unreadable one is logged,
/// counted and also treated as a fresh session.
#[must_use]
pub fn restore_state(medium: &dyn SnapshotStore, key: &str) -> TicketState {
    let bytes = match medium.load(key) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            tracing::info!(key, "No stored tickets, starting empty");
            return TicketState::default();
        },
        Err(error) => {
            tracing::error!(key, error = %error, "Failed to load ticket snapshot, starting empty");
            metrics::counter!("wastetrack_snapshot_restore_failures_total", "reason" => "load")
                .increment(1);
            return TicketState::default();
        },
    };

    match TicketSnapshot::from_bytes(&bytes) {
        Ok(snapshot) => {
            let state = snapshot.into_state();
            tracing::info!(key, tickets = state.tickets.len(), "Restored ticket snapshot");
            state
        },
        Err(error) => {
            tracing::error!(key, error = %error, "Corrupt ticket snapshot, starting empty");
            metrics::counter!("wastetrack_snapshot_restore_failures_total", "reason" => "decode")
                .increment(1);
            TicketState::default()
        },
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::types::{Location, TicketId, TicketStatus, Timestamps, WasteId, RECYCLING_AWARD};
    use chrono::{TimeZone, Utc};
    use wastetrack_classifier::{Classification, WasteCategory};
    use wastetrack_core::persistence::{FileSnapshotStore, InMemorySnapshotStore};

    fn sample_state() -> TicketState {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let recycled = Arc::new(WasteTicket {
            id: TicketId::new(),
            waste_id: WasteId::new("WTQ4Z8M2K1"),
            citizen_id: "c1".to_string(),
            collector_id: Some("col-1".to_string()),
            classification: Some(Classification::new().with(WasteCategory::Plastic, 2)),
            status: TicketStatus::Recycled,
            image_url: "img-1".to_string(),
            qr_code: "code-1".to_string(),
            proof_image_url: Some("proof-1".to_string()),
            location: Some(Location::new(18.463_499, 73.868_136, "Pune, India")),
            timestamps: Timestamps {
                created,
                collected: Some(created + chrono::Duration::hours(2)),
                recycled: Some(created + chrono::Duration::hours(5)),
            },
            eco_points_awarded: RECYCLING_AWARD,
        });
        let pending = Arc::new(WasteTicket {
            id: TicketId::new(),
            waste_id: WasteId::new("WTA1B2C3D4"),
            citizen_id: "c2".to_string(),
            collector_id: None,
            classification: None,
            status: TicketStatus::Pending,
            image_url: "img-2".to_string(),
            qr_code: String::new(),
            proof_image_url: None,
            location: None,
            timestamps: Timestamps::created_at(created + chrono::Duration::hours(6)),
            eco_points_awarded: 5,
        });
        TicketState::restore(vec![Arc::clone(&pending), recycled], Some(pending))
    }

    #[test]
    fn snapshot_round_trips_through_medium() {
        let medium = Arc::new(InMemorySnapshotStore::new());
        let persistence = TicketPersistence::new(medium.clone(), DEFAULT_STORAGE_KEY);
        let state = sample_state();

        persistence.persist(&state).unwrap();
        let restored = restore_state(medium.as_ref(), DEFAULT_STORAGE_KEY);

        assert_eq!(TicketSnapshot::from_state(&restored), TicketSnapshot::from_state(&state));
        assert_eq!(restored.issued_waste_ids, state.issued_waste_ids);
    }

    #[test]
    fn file_medium_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let medium = Arc::new(FileSnapshotStore::new(dir.path()));
        let persistence = TicketPersistence::new(medium.clone(), "tickets");
        let state = sample_state();

        persistence.persist(&state).unwrap();
        let restored = restore_state(medium.as_ref(), "tickets");

        assert_eq!(restored.tickets, state.tickets);
        assert_eq!(restored.current_ticket, state.current_ticket);
    }

    #[test]
    fn missing_snapshot_is_empty_state() {
        let medium = InMemorySnapshotStore::new();
        let state = restore_state(&medium, DEFAULT_STORAGE_KEY);
        assert!(state.tickets.is_empty());
        assert!(state.current_ticket.is_none());
    }

    #[test]
    fn corrupt_snapshot_is_empty_state() {
        let medium = InMemorySnapshotStore::new();
        medium.save(DEFAULT_STORAGE_KEY, b"{\"tickets\": [").unwrap();
        let state = restore_state(&medium, DEFAULT_STORAGE_KEY);
        assert!(state.tickets.is_empty());
    }

    #[test]
    fn snapshot_json_shape() {
        let value: serde_json::Value =
            serde_json::from_slice(&TicketSnapshot::from_state(&sample_state()).to_bytes().unwrap())
                .unwrap();
        assert_eq!(value["tickets"].as_array().unwrap().len(), 2);
        assert_eq!(value["currentTicket"]["wasteId"], "WTA1B2C3D4");
        assert_eq!(value["tickets"][1]["classification"]["plastic"], 2);
    }

    #[test]
    fn malformed_classification_does_not_lose_the_ticket() {
        let mut value: serde_json::Value =
            serde_json::from_slice(&TicketSnapshot::from_state(&sample_state()).to_bytes().unwrap())
                .unwrap();
        value["tickets"][1]["classification"] = serde_json::json!("Plastic Waste");
        let medium = InMemorySnapshotStore::new();
        medium
            .save(DEFAULT_STORAGE_KEY, &serde_json::to_vec(&value).unwrap())
            .unwrap();

        let state = restore_state(&medium, DEFAULT_STORAGE_KEY);
        assert_eq!(state.tickets.len(), 2);
        assert!(state.tickets[1].classification.is_none());
    }
}
