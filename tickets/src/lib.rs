//! Waste ticket lifecycle store.
//!
//! Citizens photograph waste, a classification service tags it, collectors
//! pick it up and recyclers close it out. This crate owns the ticket record
//! through that lifecycle:
//!
//! - **Reducer**: creates tickets, moves them forward through
//!   `pending → collected → recycled`, and awards eco points once per milestone
//! - **Store facade**: [`WasteTicketStore`] commands and queries over the
//!   reducer runtime, with a snapshot written after every action
//! - **Views**: read-only transformations used by the dashboards
//! - **Submission flow**: classify a photo, then create its ticket
//!
//! # Architecture
//!
//! ```text
//! Presentation ──command──▶ WasteTicketStore ──▶ Store<TicketReducer>
//!      ▲                                              │
//!      │                                    ┌─────────┴─────────┐
//!      │                                    ▼                   ▼
//!   subscribe()                     CodeImageEncoder       PointsLedger
//!      │                                    │                   │
//!      └──────── revision ◀── snapshot ◀────┴──── events ◀──────┘
//! ```
//!
//! Collaborators (clock, waste id generator, encoder, ledger) are injected
//! through [`TicketEnvironment`], so every flow runs against deterministic
//! fakes in tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod environment;
pub mod identity;
pub mod metrics;
pub mod mocks;
pub mod persistence;
pub mod qr;
pub mod reducer;
pub mod store;
pub mod submission;
pub mod types;
pub mod views;

pub use config::Config;
pub use environment::{
    CodeImageEncoder, CodeImageOptions, EncodeError, PointsLedger, RandomWasteIdGenerator,
    TicketEnvironment, TicketSettings, WasteIdGenerator,
};
pub use identity::{IdentityProvider, InMemoryPointsLedger, Role, SessionIdentity, SessionLedger, User};
pub use persistence::{restore_state, TicketPersistence, TicketSnapshot, DEFAULT_STORAGE_KEY};
pub use qr::QrCodeEncoder;
pub use reducer::{TicketAction, TicketReducer};
pub use store::{TicketError, TicketStore, WasteTicketStore};
pub use submission::{SubmissionError, SubmissionFlow};
pub use types::*;
