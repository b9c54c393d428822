//! Identity collaborator and point ledgers.
//!
//! The reducer only ever sees [`PointsLedger`]; these types adapt it to the
//! signed-in session or keep per-citizen totals in memory.

use crate::environment::PointsLedger;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Dashboard a user signs in to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Submits waste
    Citizen,
    /// Picks up waste
    Collector,
    /// Municipal staff
    Municipality,
}

/// Signed-in user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User identifier (the citizen id on tickets)
    pub id: String,
    /// Display name
    pub name: String,
    /// Role
    pub role: Role,
    /// Running eco point total
    pub eco_points: u32,
}

impl User {
    /// New user with zero points
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            eco_points: 0,
        }
    }
}

/// Source of the current user
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, if any
    fn current_user(&self) -> Option<User>;

    /// Add `amount` to the signed-in user's eco points
    fn credit_points(&self, amount: u32);
}

/// In-memory session holding at most one signed-in user
#[derive(Debug, Default)]
pub struct SessionIdentity {
    user: RwLock<Option<User>>,
}

impl SessionIdentity {
    /// Session with nobody signed in
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Session with `user` signed in
    #[must_use]
    pub fn signed_in(user: User) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    /// Replace the signed-in user
    pub fn sign_in(&self, user: User) {
        tracing::info!(user_id = %user.id, role = ?user.role, "User signed in");
        match self.user.write() {
            Ok(mut slot) => *slot = Some(user),
            Err(poisoned) => *poisoned.into_inner() = Some(user),
        }
    }

    /// Clear the session
    pub fn sign_out(&self) {
        match self.user.write() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

impl IdentityProvider for SessionIdentity {
    fn current_user(&self) -> Option<User> {
        match self.user.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn credit_points(&self, amount: u32) {
        let mut slot = match self.user.write() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        match slot.as_mut() {
            Some(user) => user.eco_points = user.eco_points.saturating_add(amount),
            None => tracing::warn!(amount, "No signed-in user to credit"),
        }
    }
}

/// Credits the signed-in user when they own the ticket
///
/// Credits for any other citizen are logged and skipped; the session only
/// knows one user's total.
#[derive(Clone)]
pub struct SessionLedger {
    identity: Arc<dyn IdentityProvider>,
}

impl SessionLedger {
    /// Ledger over `identity`
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }
}

impl std::fmt::Debug for SessionLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLedger").finish_non_exhaustive()
    }
}

impl PointsLedger for SessionLedger {
    fn credit(&self, citizen_id: &str, amount: u32) {
        match self.identity.current_user() {
            Some(user) if user.id == citizen_id => self.identity.credit_points(amount),
            Some(user) => tracing::warn!(
                citizen_id,
                signed_in = %user.id,
                amount,
                "Points belong to another citizen, not credited to this session"
            ),
            None => tracing::warn!(citizen_id, amount, "No session to credit points to"),
        }
    }
}

/// Per-citizen running totals kept in memory
#[derive(Debug, Default)]
pub struct InMemoryPointsLedger {
    totals: RwLock<HashMap<String, u32>>,
}

impl InMemoryPointsLedger {
    /// Empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Points credited to `citizen_id` so far
    #[must_use]
    pub fn balance(&self, citizen_id: &str) -> u32 {
        match self.totals.read() {
            Ok(totals) => totals.get(citizen_id).copied().unwrap_or(0),
            Err(poisoned) => poisoned.into_inner().get(citizen_id).copied().unwrap_or(0),
        }
    }
}

impl PointsLedger for InMemoryPointsLedger {
    fn credit(&self, citizen_id: &str, amount: u32) {
        let mut totals = match self.totals.write() {
            Ok(totals) => totals,
            Err(poisoned) => poisoned.into_inner(),
        };
        let total = totals.entry(citizen_id.to_string()).or_insert(0);
        *total = total.saturating_add(amount);
    }
}
