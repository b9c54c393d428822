//! Presentation-facing read models.
//!
//! Pure functions over ticket slices. None of them touch the store, so they
//! can be tested and reused independently of effects.

use crate::types::{TicketStatus, WasteTicket};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use wastetrack_classifier::Classification;

/// Label shown when a ticket has no usable classification
pub const NOT_AVAILABLE: &str = "Not available";

/// Pickups a collector aims for per day
pub const DAILY_PICKUP_TARGET: u32 = 15;

/// Number of tickets in the municipality's recent list
pub const DEFAULT_RECENT_LIMIT: usize = 5;

// ============================================================================
// Ticket history
// ============================================================================

/// Tickets ordered newest `created` first; equal timestamps keep input order
#[must_use]
pub fn sort_by_recency(tickets: &[Arc<WasteTicket>]) -> Vec<Arc<WasteTicket>> {
    let mut sorted = tickets.to_vec();
    sorted.sort_by(|a, b| b.timestamps.created.cmp(&a.timestamps.created));
    sorted
}

/// `"Metal: 1, Plastic: 2"` style summary of the detected categories, in category order
///
/// Categories with a zero count are left out. An absent or empty
/// classification renders [`NOT_AVAILABLE`].
#[must_use]
pub fn classification_summary(classification: Option<&Classification>) -> String {
    let Some(classification) = classification else {
        return NOT_AVAILABLE.to_string();
    };

    let parts: Vec<String> = classification
        .detected()
        .map(|(category, count)| format!("{}: {count}", category.display_label()))
        .collect();

    if parts.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        parts.join(", ")
    }
}

/// Summary of a raw classification payload; unparsable text is "not available"
#[must_use]
pub fn classification_summary_raw(raw: Option<&str>) -> String {
    classification_summary(raw.and_then(Classification::parse).as_ref())
}

// ============================================================================
// Stage progress
// ============================================================================

/// Lifecycle stage shown on a ticket card
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Ticket submitted
    Submitted,
    /// Picked up
    Collected,
    /// Recycled
    Recycled,
}

impl Stage {
    /// Display label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Submitted => "Submitted",
            Self::Collected => "Collected",
            Self::Recycled => "Recycled",
        }
    }
}

/// One stage of a ticket's progress indicator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageProgress {
    /// Stage
    pub stage: Stage,
    /// Whether the ticket has reached this stage
    pub completed: bool,
    /// When the stage was reached; only present for completed stages
    pub timestamp: Option<DateTime<Utc>>,
}

/// Submitted, Collected and Recycled stages of `ticket`, derived from its status
#[must_use]
pub fn stage_progress(ticket: &WasteTicket) -> [StageProgress; 3] {
    let collected = ticket.status >= TicketStatus::Collected;
    let recycled = ticket.status == TicketStatus::Recycled;

    [
        StageProgress {
            stage: Stage::Submitted,
            completed: true,
            timestamp: Some(ticket.timestamps.created),
        },
        StageProgress {
            stage: Stage::Collected,
            completed: collected,
            timestamp: ticket.timestamps.collected.filter(|_| collected),
        },
        StageProgress {
            stage: Stage::Recycled,
            completed: recycled,
            timestamp: ticket.timestamps.recycled.filter(|_| recycled),
        },
    ]
}

// ============================================================================
// Citizen dashboard
// ============================================================================

/// Ticket counts per status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusCounts {
    /// Waiting for pickup
    pub pending: usize,
    /// Picked up
    pub collected: usize,
    /// Recycled
    pub recycled: usize,
}

impl StatusCounts {
    /// All tickets counted
    #[must_use]
    pub const fn total(&self) -> usize {
        self.pending + self.collected + self.recycled
    }
}

/// Count tickets by status
#[must_use]
pub fn status_counts(tickets: &[Arc<WasteTicket>]) -> StatusCounts {
    tickets
        .iter()
        .fold(StatusCounts::default(), |mut counts, ticket| {
            match ticket.status {
                TicketStatus::Pending => counts.pending += 1,
                TicketStatus::Collected => counts.collected += 1,
                TicketStatus::Recycled => counts.recycled += 1,
            }
            counts
        })
}

/// Achievement shown on the citizen dashboard
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EcoBadge {
    /// Badge name
    pub name: &'static str,
    /// What earns it
    pub description: &'static str,
    /// Whether the citizen has earned it
    pub unlocked: bool,
}

/// Green Hero, Recycling Champion and Eco Warrior badges for a citizen
///
/// `tickets` are the citizen's own tickets; `eco_points` is their running total.
#[must_use]
pub fn eco_badges(tickets: &[Arc<WasteTicket>], eco_points: u32) -> [EcoBadge; 3] {
    let counts = status_counts(tickets);
    [
        EcoBadge {
            name: "Green Hero",
            description: "Uploaded 10+ waste items",
            unlocked: counts.total() >= 10,
        },
        EcoBadge {
            name: "Recycling Champion",
            description: "Completed recycling process 5+ times",
            unlocked: counts.recycled >= 5,
        },
        EcoBadge {
            name: "Eco Warrior",
            description: "Earned 100+ eco points",
            unlocked: eco_points >= 100,
        },
    ]
}

// ============================================================================
// Collector dashboard
// ============================================================================

/// A collector's progress for one day
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DailyProgress {
    /// Tickets the collector picked up that day
    pub pickups: u32,
    /// Daily pickup target
    pub target: u32,
    /// Pickups as a percentage of the target, capped at 100
    pub progress_percent: u32,
    /// Share of the day's pickups that carry a proof photo, in percent
    pub verification_rate: u32,
    /// The collector's tickets recycled that day
    pub completed: u32,
    /// Achievement labels earned that day
    pub achievements: Vec<&'static str>,
}

fn rounded_percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    let percent = (u64::from(part) * 100 + u64::from(whole) / 2) / u64::from(whole);
    u32::try_from(percent).unwrap_or(u32::MAX)
}

fn on_day(timestamp: Option<DateTime<Utc>>, day: NaiveDate) -> bool {
    timestamp.is_some_and(|t| t.date_naive() == day)
}

/// Pickups, verification and completions of `collector_id` on `day` (UTC)
#[must_use]
pub fn collector_daily_progress(
    tickets: &[Arc<WasteTicket>],
    collector_id: &str,
    day: NaiveDate,
) -> DailyProgress {
    let mine = tickets
        .iter()
        .filter(|t| t.collector_id.as_deref() == Some(collector_id));

    let (mut pickups, mut verified, mut completed) = (0_u32, 0_u32, 0_u32);
    for ticket in mine {
        if on_day(ticket.timestamps.collected, day) {
            pickups += 1;
            if ticket.proof_image_url.is_some() {
                verified += 1;
            }
        }
        if on_day(ticket.timestamps.recycled, day) {
            completed += 1;
        }
    }

    let verification_rate = rounded_percent(verified, pickups);
    let mut achievements = Vec::new();
    if pickups >= 10 {
        achievements.push("10+ Pickups");
    }
    if pickups > 0 && verification_rate >= 95 {
        achievements.push("High Accuracy");
    }

    DailyProgress {
        pickups,
        target: DAILY_PICKUP_TARGET,
        progress_percent: rounded_percent(pickups, DAILY_PICKUP_TARGET).min(100),
        verification_rate,
        completed,
        achievements,
    }
}

// ============================================================================
// Municipality dashboard
// ============================================================================

/// Weighted point for the city heatmap
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeatPoint {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
    /// Intensity; outstanding work weighs more
    pub weight: f64,
}

/// Heatmap intensity for a status
#[must_use]
pub const fn heat_weight(status: TicketStatus) -> f64 {
    match status {
        TicketStatus::Pending => 0.8,
        TicketStatus::Collected => 0.5,
        TicketStatus::Recycled => 0.3,
    }
}

/// City-wide view for municipal staff
#[derive(Clone, Debug, PartialEq)]
pub struct MunicipalityOverview {
    /// Counts across all citizens
    pub counts: StatusCounts,
    /// Newest tickets, at most the requested limit
    pub recent: Vec<Arc<WasteTicket>>,
    /// One point per located ticket
    pub heat_points: Vec<HeatPoint>,
}

/// Aggregate counts, recent tickets and heat points over all tickets
#[must_use]
pub fn municipality_overview(tickets: &[Arc<WasteTicket>], recent_limit: usize) -> MunicipalityOverview {
    let mut recent = sort_by_recency(tickets);
    recent.truncate(recent_limit);

    let heat_points = tickets
        .iter()
        .filter_map(|ticket| {
            ticket.location.as_ref().map(|location| HeatPoint {
                lat: location.lat,
                lng: location.lng,
                weight: heat_weight(ticket.status),
            })
        })
        .collect();

    MunicipalityOverview {
        counts: status_counts(tickets),
        recent,
        heat_points,
    }
}
