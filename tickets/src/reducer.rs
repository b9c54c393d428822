//! Ticket lifecycle reducer.
//!
//! Commands create tickets and move them forward through
//! pending → collected → recycled. Point awards leave the reducer as
//! effects against the injected [`PointsLedger`](crate::environment::PointsLedger)
//! and come back as `PointsCredited` events.
//!
//! Invariants kept here:
//! - waste ids are unique among all ids issued this session
//! - status never moves backward
//! - each milestone timestamp is written once and never precedes the previous one
//! - the submission and recycling awards are credited at most once per ticket
//! - an update replaces exactly one `Arc` and clones the others

use crate::environment::TicketEnvironment;
use crate::types::{
    Location, Milestone, TicketId, TicketState, TicketStatus, Timestamps, WasteId, WasteTicket,
    RECYCLING_AWARD, SUBMISSION_AWARD,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;
use wastetrack_classifier::Classification;
use wastetrack_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};

/// Attempts at drawing an unused waste id before giving up
const MAX_WASTE_ID_ATTEMPTS: usize = 16;

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the ticket store
#[derive(Clone, Debug, PartialEq)]
pub enum TicketAction {
    // Commands
    /// Create a ticket for a submitted item
    CreateTicket {
        /// Correlates the resulting `TicketCreated` or `ValidationFailed`
        request_id: Uuid,
        /// Owning citizen
        citizen_id: String,
        /// Photo of the waste
        image_url: String,
        /// Detected categories, if classification succeeded
        classification: Option<Classification>,
        /// Where the photo was taken; the configured fallback when absent
        location: Option<Location>,
    },

    /// Move a ticket forward in its lifecycle
    UpdateStatus {
        /// Ticket to update; unknown ids are ignored
        waste_id: WasteId,
        /// Target status
        status: TicketStatus,
        /// Collector performing the pickup
        collector_id: Option<String>,
        /// Proof-of-pickup photo
        proof_image_url: Option<String>,
    },

    /// Focus a ticket for display
    SetCurrentTicket {
        /// Ticket to focus, or `None` to clear
        ticket: Option<Arc<WasteTicket>>,
    },

    // Events
    /// A ticket was created and its code image resolved
    TicketCreated {
        /// Correlation id of the originating `CreateTicket`
        request_id: Uuid,
        /// The new ticket
        ticket: Arc<WasteTicket>,
    },

    /// Points were credited to a citizen
    PointsCredited {
        /// Citizen credited
        citizen_id: String,
        /// Ticket the award belongs to
        waste_id: WasteId,
        /// Milestone reached
        milestone: Milestone,
        /// Points added
        amount: u32,
    },

    /// A `CreateTicket` command was rejected
    ValidationFailed {
        /// Correlation id of the rejected command
        request_id: Uuid,
        /// Reason
        error: String,
    },
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the ticket store
#[derive(Clone, Copy, Debug, Default)]
pub struct TicketReducer;

impl TicketReducer {
    /// Creates a new `TicketReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn reserve_waste_id(state: &mut TicketState, env: &TicketEnvironment) -> Option<WasteId> {
        for _ in 0..MAX_WASTE_ID_ATTEMPTS {
            let candidate = env.waste_ids.generate();
            if state.issued_waste_ids.insert(candidate.clone()) {
                return Some(candidate);
            }
            tracing::warn!(waste_id = %candidate, "Generated waste id already issued, regenerating");
            metrics::counter!("wastetrack_waste_id_collisions_total").increment(1);
        }
        None
    }

    fn reject(request_id: Uuid, error: &str) -> SmallVec<[Effect<TicketAction>; 4]> {
        metrics::counter!("wastetrack_validation_failures_total").increment(1);
        let error = error.to_string();
        smallvec![Effect::future(async move {
            Some(TicketAction::ValidationFailed { request_id, error })
        })]
    }

    fn credit(
        env: &TicketEnvironment,
        citizen_id: String,
        waste_id: WasteId,
        milestone: Milestone,
        amount: u32,
    ) -> Effect<TicketAction> {
        let ledger = Arc::clone(&env.ledger);
        Effect::future(async move {
            ledger.credit(&citizen_id, amount);
            Some(TicketAction::PointsCredited {
                citizen_id,
                waste_id,
                milestone,
                amount,
            })
        })
    }

    /// Write the milestone timestamp for `status` unless already set
    fn stamp(timestamps: &mut Timestamps, status: TicketStatus, now: DateTime<Utc>) {
        match status {
            TicketStatus::Pending => {},
            TicketStatus::Collected => {
                if timestamps.collected.is_none() {
                    timestamps.collected = Some(now.max(timestamps.created));
                }
            },
            TicketStatus::Recycled => {
                if timestamps.recycled.is_none() {
                    let floor = timestamps.collected.unwrap_or(timestamps.created);
                    timestamps.recycled = Some(now.max(floor));
                }
            },
        }
    }

    fn create_ticket(
        state: &mut TicketState,
        env: &TicketEnvironment,
        request_id: Uuid,
        citizen_id: String,
        image_url: String,
        classification: Option<Classification>,
        location: Option<Location>,
    ) -> SmallVec<[Effect<TicketAction>; 4]> {
        if citizen_id.trim().is_empty() {
            return Self::reject(request_id, "citizen id must not be empty");
        }

        let Some(waste_id) = Self::reserve_waste_id(state, env) else {
            tracing::error!("Could not draw an unused waste id");
            return Self::reject(request_id, "could not allocate a unique waste id");
        };

        let ticket = WasteTicket {
            id: TicketId::new(),
            waste_id,
            citizen_id,
            collector_id: None,
            classification,
            status: TicketStatus::Pending,
            image_url,
            qr_code: String::new(),
            proof_image_url: None,
            location: Some(location.unwrap_or_else(|| env.settings.fallback_location.clone())),
            timestamps: Timestamps::created_at(env.clock.now()),
            eco_points_awarded: SUBMISSION_AWARD,
        };

        let encoder = Arc::clone(&env.encoder);
        let options = env.settings.code_image.clone();

        smallvec![Effect::future(async move {
            let mut ticket = ticket;
            let encoded = encoder.encode(ticket.waste_id.as_str(), &options).await;
            match encoded {
                Ok(image) => ticket.qr_code = image,
                Err(error) => {
                    tracing::warn!(
                        waste_id = %ticket.waste_id,
                        error = %error,
                        "Code image generation failed, creating ticket without it"
                    );
                    metrics::counter!("wastetrack_code_image_failures_total").increment(1);
                },
            }
            Some(TicketAction::TicketCreated {
                request_id,
                ticket: Arc::new(ticket),
            })
        })]
    }

    fn ticket_created(
        state: &mut TicketState,
        env: &TicketEnvironment,
        ticket: Arc<WasteTicket>,
    ) -> SmallVec<[Effect<TicketAction>; 4]> {
        if state.find(&ticket.waste_id).is_some() {
            tracing::debug!(waste_id = %ticket.waste_id, "Ticket already held, ignoring duplicate");
            return SmallVec::new();
        }

        state.issued_waste_ids.insert(ticket.waste_id.clone());

        let mut tickets = Vec::with_capacity(state.tickets.len() + 1);
        tickets.push(Arc::clone(&ticket));
        tickets.extend(state.tickets.iter().cloned());
        state.tickets = tickets;
        state.current_ticket = Some(Arc::clone(&ticket));
        state.last_error = None;

        metrics::counter!("wastetrack_tickets_created_total").increment(1);
        tracing::info!(
            waste_id = %ticket.waste_id,
            citizen_id = %ticket.citizen_id,
            "Waste ticket created"
        );

        smallvec![Self::credit(
            env,
            ticket.citizen_id.clone(),
            ticket.waste_id.clone(),
            Milestone::Submission,
            ticket.eco_points_awarded,
        )]
    }

    fn update_status(
        state: &mut TicketState,
        env: &TicketEnvironment,
        waste_id: &WasteId,
        status: TicketStatus,
        collector_id: Option<String>,
        proof_image_url: Option<String>,
    ) -> SmallVec<[Effect<TicketAction>; 4]> {
        let Some(index) = state.position(waste_id) else {
            tracing::debug!(waste_id = %waste_id, "Status update for unknown ticket ignored");
            metrics::counter!("wastetrack_updates_ignored_total", "reason" => "unknown_ticket")
                .increment(1);
            return SmallVec::new();
        };

        let current = Arc::clone(&state.tickets[index]);

        if status < current.status {
            tracing::warn!(
                waste_id = %waste_id,
                from = %current.status,
                to = %status,
                "Backward status transition ignored"
            );
            metrics::counter!("wastetrack_updates_ignored_total", "reason" => "backward")
                .increment(1);
            return SmallVec::new();
        }

        let mut updated = (*current).clone();
        updated.status = status;
        Self::stamp(&mut updated.timestamps, status, env.clock.now());

        // A collector is only recorded once the ticket has been picked up
        if let Some(collector_id) = collector_id.filter(|_| status >= TicketStatus::Collected) {
            match &updated.collector_id {
                None => updated.collector_id = Some(collector_id),
                Some(existing) if *existing != collector_id => {
                    tracing::debug!(
                        waste_id = %waste_id,
                        kept = %existing,
                        ignored = %collector_id,
                        "Collector already recorded"
                    );
                },
                Some(_) => {},
            }
        }
        if let Some(proof_image_url) = proof_image_url {
            updated.proof_image_url = Some(proof_image_url);
        }

        let mut effects = SmallVec::new();
        if status == TicketStatus::Recycled && updated.eco_points_awarded < RECYCLING_AWARD {
            let amount = RECYCLING_AWARD - updated.eco_points_awarded;
            updated.eco_points_awarded = RECYCLING_AWARD;
            effects.push(Self::credit(
                env,
                updated.citizen_id.clone(),
                updated.waste_id.clone(),
                Milestone::Recycling,
                amount,
            ));
        }

        if updated == *current {
            metrics::counter!("wastetrack_updates_ignored_total", "reason" => "unchanged")
                .increment(1);
            return effects;
        }

        if status != current.status {
            metrics::counter!("wastetrack_status_transitions_total", "status" => status.as_str())
                .increment(1);
            tracing::info!(waste_id = %waste_id, from = %current.status, to = %status, "Ticket status updated");
        }

        let updated = Arc::new(updated);
        state.tickets = state
            .tickets
            .iter()
            .enumerate()
            .map(|(i, ticket)| {
                if i == index {
                    Arc::clone(&updated)
                } else {
                    Arc::clone(ticket)
                }
            })
            .collect();

        if state
            .current_ticket
            .as_ref()
            .is_some_and(|focused| &focused.waste_id == waste_id)
        {
            state.current_ticket = Some(updated);
        }

        effects
    }
}

impl Reducer for TicketReducer {
    type State = TicketState;
    type Action = TicketAction;
    type Environment = TicketEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            TicketAction::CreateTicket {
                request_id,
                citizen_id,
                image_url,
                classification,
                location,
            } => Self::create_ticket(
                state,
                env,
                request_id,
                citizen_id,
                image_url,
                classification,
                location,
            ),

            TicketAction::UpdateStatus {
                waste_id,
                status,
                collector_id,
                proof_image_url,
            } => Self::update_status(state, env, &waste_id, status, collector_id, proof_image_url),

            TicketAction::SetCurrentTicket { ticket } => {
                state.current_ticket = ticket;
                SmallVec::new()
            },

            // ========== Events ==========
            TicketAction::TicketCreated { ticket, .. } => Self::ticket_created(state, env, ticket),

            TicketAction::PointsCredited {
                citizen_id,
                waste_id,
                milestone,
                amount,
            } => {
                metrics::counter!("wastetrack_points_awarded_total", "milestone" => milestone.as_str())
                    .increment(u64::from(amount));
                tracing::info!(
                    citizen_id = %citizen_id,
                    waste_id = %waste_id,
                    milestone = milestone.as_str(),
                    amount,
                    "Eco points credited"
                );
                SmallVec::new()
            },

            TicketAction::ValidationFailed { error, .. } => {
                tracing::warn!(error = %error, "Ticket command rejected");
                state.last_error = Some(error);
                SmallVec::new()
            },
        }
    }
}
