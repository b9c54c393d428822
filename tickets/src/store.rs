//! Ticket store facade.
//!
//! [`WasteTicketStore`] wraps the reducer runtime with the command and query
//! surface the presentation layer uses. Commands return once their effects
//! (code image generation, point credits) have resolved.

use crate::environment::TicketEnvironment;
use crate::persistence::{restore_state, TicketPersistence};
use crate::reducer::{TicketAction, TicketReducer};
use crate::types::{Location, TicketState, TicketStatus, WasteId, WasteTicket};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;
use wastetrack_classifier::Classification;
use wastetrack_core::persistence::SnapshotStore;
use wastetrack_runtime::{Store, StoreConfig, StoreError};

/// Default time allowed for a ticket to be created and credited
pub const DEFAULT_CREATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Reducer runtime specialised to tickets
pub type TicketStore = Store<TicketState, TicketAction, TicketEnvironment, TicketReducer>;

/// Errors surfaced by ticket store commands
#[derive(Error, Debug)]
pub enum TicketError {
    /// The command was rejected by the reducer
    #[error("Invalid ticket request: {0}")]
    Validation(String),

    /// The runtime refused the command or it did not finish in time
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Command and query surface over the ticket store
#[derive(Clone)]
pub struct WasteTicketStore {
    store: TicketStore,
    creation_timeout: Duration,
}

impl WasteTicketStore {
    /// Empty, unpersisted store
    #[must_use]
    pub fn new(env: TicketEnvironment) -> Self {
        Self::from_state(TicketState::default(), env)
    }

    /// Unpersisted store starting from `state`
    #[must_use]
    pub fn from_state(state: TicketState, env: TicketEnvironment) -> Self {
        Self::from_store(Store::new(state, TicketReducer::new(), env))
    }

    /// Store restored from `key` in `medium`, writing a snapshot back after every action
    #[must_use]
    pub fn open(
        medium: Arc<dyn SnapshotStore>,
        key: &str,
        env: TicketEnvironment,
        config: StoreConfig,
    ) -> Self {
        let state = restore_state(medium.as_ref(), key);
        let store = Store::with_config(state, TicketReducer::new(), env, config)
            .with_persistence(Arc::new(TicketPersistence::new(medium, key)));
        Self::from_store(store)
    }

    /// Wrap an existing runtime
    #[must_use]
    pub fn from_store(store: TicketStore) -> Self {
        Self {
            store,
            creation_timeout: DEFAULT_CREATION_TIMEOUT,
        }
    }

    /// Bound how long commands wait for their effects
    #[must_use]
    pub fn with_creation_timeout(mut self, timeout: Duration) -> Self {
        self.creation_timeout = timeout;
        self
    }

    /// Underlying runtime
    #[must_use]
    pub const fn runtime(&self) -> &TicketStore {
        &self.store
    }

    // ========== Commands ==========

    /// Create a pending ticket for `citizen_id` and credit the submission award
    ///
    /// Resolves once the code image has been generated (or given up on) and
    /// the award has been credited.
    ///
    /// # Errors
    ///
    /// - [`TicketError::Validation`] when `citizen_id` is blank or no unused
    ///   waste id could be drawn
    /// - [`TicketError::Store`] when the store is shutting down or the ticket
    ///   was not created within the creation timeout
    #[tracing::instrument(skip(self, image_url, classification, location), fields(request_id))]
    pub async fn create_waste_ticket(
        &self,
        citizen_id: &str,
        image_url: &str,
        classification: Option<Classification>,
        location: Option<Location>,
    ) -> Result<Arc<WasteTicket>, TicketError> {
        let request_id = Uuid::new_v4();
        tracing::Span::current().record("request_id", tracing::field::display(request_id));

        let mut handle = self
            .store
            .send(TicketAction::CreateTicket {
                request_id,
                citizen_id: citizen_id.to_string(),
                image_url: image_url.to_string(),
                classification,
                location,
            })
            .await?;
        handle.wait_with_timeout(self.creation_timeout).await?;

        let outcome = handle.actions().into_iter().find(|action| match action {
            TicketAction::TicketCreated { request_id: id, .. }
            | TicketAction::ValidationFailed { request_id: id, .. } => *id == request_id,
            _ => false,
        });

        match outcome {
            Some(TicketAction::TicketCreated { ticket, .. }) => Ok(ticket),
            Some(TicketAction::ValidationFailed { error, .. }) => {
                tracing::warn!(error = %error, "Ticket creation rejected");
                Err(TicketError::Validation(error))
            },
            _ => {
                tracing::error!("Ticket creation finished without a result");
                Err(TicketError::Store(StoreError::NoResult))
            },
        }
    }

    /// Move a ticket forward, crediting the recycling award if it is due
    ///
    /// Unknown waste ids and backward transitions are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Store`] when the store is shutting down or the
    /// award credit did not finish within the creation timeout.
    #[tracing::instrument(skip(self, collector_id, proof_image_url))]
    pub async fn update_ticket_status(
        &self,
        waste_id: &WasteId,
        status: TicketStatus,
        collector_id: Option<String>,
        proof_image_url: Option<String>,
    ) -> Result<(), TicketError> {
        let mut handle = self
            .store
            .send(TicketAction::UpdateStatus {
                waste_id: waste_id.clone(),
                status,
                collector_id,
                proof_image_url,
            })
            .await?;
        handle.wait_with_timeout(self.creation_timeout).await?;
        Ok(())
    }

    /// Focus `ticket` for display, or clear the focus
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Store`] when the store is shutting down.
    pub async fn set_current_ticket(&self, ticket: Option<Arc<WasteTicket>>) -> Result<(), TicketError> {
        self.store.send(TicketAction::SetCurrentTicket { ticket }).await?;
        Ok(())
    }

    // ========== Queries ==========

    /// Tickets owned by `citizen_id`, newest first
    pub async fn get_tickets_by_user(&self, citizen_id: &str) -> Vec<Arc<WasteTicket>> {
        self.store.state(|s| s.tickets_by_user(citizen_id)).await
    }

    /// Ticket with `waste_id`, if held
    pub async fn get_ticket_by_waste_id(&self, waste_id: &WasteId) -> Option<Arc<WasteTicket>> {
        self.store.state(|s| s.find(waste_id).cloned()).await
    }

    /// Focused ticket
    pub async fn current_ticket(&self) -> Option<Arc<WasteTicket>> {
        self.store.state(|s| s.current_ticket.clone()).await
    }

    /// All tickets, newest first
    pub async fn tickets(&self) -> Vec<Arc<WasteTicket>> {
        self.store.state(|s| s.tickets.clone()).await
    }

    /// Reason the last rejected creation failed
    pub async fn last_error(&self) -> Option<String> {
        self.store.state(|s| s.last_error.clone()).await
    }

    /// Change notifications; the value is a revision bumped after every action
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.store.subscribe_changes()
    }

    /// Stop accepting commands and wait for running effects
    ///
    /// Commands already issued run to completion, including their point
    /// credits, before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::Store`] if effects were still running when the
    /// configured shutdown timeout expired.
    pub async fn shutdown(&self) -> Result<(), TicketError> {
        self.store.shutdown_gracefully().await?;
        Ok(())
    }
}

impl std::fmt::Debug for WasteTicketStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasteTicketStore")
            .field("creation_timeout", &self.creation_timeout)
            .field("revision", &self.store.revision())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::environment::TicketSettings;
    use crate::mocks::{ConstantWasteIdGenerator, RecordingLedger, SequentialWasteIdGenerator, StaticEncoder};
    use wastetrack_testing::test_clock;

    fn environment(ledger: Arc<RecordingLedger>) -> TicketEnvironment {
        TicketEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(SequentialWasteIdGenerator::new()),
            Arc::new(StaticEncoder),
            ledger,
            TicketSettings::default(),
        )
    }

    #[tokio::test]
    async fn create_returns_the_stored_ticket() {
        let ledger = Arc::new(RecordingLedger::new());
        let store = WasteTicketStore::new(environment(ledger.clone()));

        let ticket = store.create_waste_ticket("c1", "img", None, None).await.unwrap();

        assert_eq!(ticket.qr_code, format!("code:{}", ticket.waste_id));
        assert_eq!(store.current_ticket().await, Some(Arc::clone(&ticket)));
        assert_eq!(store.get_ticket_by_waste_id(&ticket.waste_id).await, Some(ticket));
        assert_eq!(ledger.credits(), vec![("c1".to_string(), 5)]);
    }

    #[tokio::test]
    async fn blank_citizen_is_rejected() {
        let ledger = Arc::new(RecordingLedger::new());
        let store = WasteTicketStore::new(environment(ledger.clone()));

        let result = store.create_waste_ticket("   ", "img", None, None).await;

        assert!(matches!(result, Err(TicketError::Validation(_))));
        assert!(store.tickets().await.is_empty());
        assert!(store.last_error().await.is_some());
        assert!(ledger.credits().is_empty());
    }

    #[tokio::test]
    async fn exhausted_waste_ids_are_rejected() {
        let env = TicketEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(ConstantWasteIdGenerator(WasteId::new("WTSAMESAME"))),
            Arc::new(StaticEncoder),
            Arc::new(RecordingLedger::new()),
            TicketSettings::default(),
        );
        let store = WasteTicketStore::new(env);

        store.create_waste_ticket("c1", "img", None, None).await.unwrap();
        let second = store.create_waste_ticket("c1", "img", None, None).await;

        assert!(matches!(second, Err(TicketError::Validation(_))));
        assert_eq!(store.tickets().await.len(), 1);
    }

    #[tokio::test]
    async fn commands_fail_after_shutdown() {
        let store = WasteTicketStore::new(environment(Arc::new(RecordingLedger::new())));
        store.shutdown().await.unwrap();

        let result = store.create_waste_ticket("c1", "img", None, None).await;
        assert!(matches!(result, Err(TicketError::Store(StoreError::ShutdownInProgress))));
    }

    #[tokio::test]
    async fn subscribers_see_revisions() {
        let store = WasteTicketStore::new(environment(Arc::new(RecordingLedger::new())));
        let changes = store.subscribe();
        let before = *changes.borrow();

        store.create_waste_ticket("c1", "img", None, None).await.unwrap();

        assert!(*changes.borrow() > before);
    }
}
