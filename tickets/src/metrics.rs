//! Business metrics for waste tracking.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `wastetrack_tickets_created_total` - Tickets created
//! - `wastetrack_status_transitions_total{status}` - Applied status changes by target status
//! - `wastetrack_updates_ignored_total{reason}` - Status updates that changed nothing
//! - `wastetrack_points_awarded_total{milestone}` - Eco points credited
//! - `wastetrack_code_image_failures_total` - Tickets created with an empty code image
//! - `wastetrack_waste_id_collisions_total` - Generated waste ids that were already taken
//! - `wastetrack_validation_failures_total` - Rejected commands
//! - `wastetrack_snapshot_restore_failures_total{reason}` - Snapshots that could not be restored
//! - `wastetrack_classifications_total{outcome}` - Classification requests by outcome

use metrics::describe_counter;

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!("wastetrack_tickets_created_total", "Total number of waste tickets created");
    describe_counter!(
        "wastetrack_status_transitions_total",
        "Status changes applied to tickets, by target status"
    );
    describe_counter!(
        "wastetrack_updates_ignored_total",
        "Status updates ignored (unknown_ticket, backward, unchanged)"
    );
    describe_counter!(
        "wastetrack_points_awarded_total",
        "Eco points credited to citizens, by milestone"
    );
    describe_counter!(
        "wastetrack_code_image_failures_total",
        "Tickets whose code image could not be generated"
    );
    describe_counter!(
        "wastetrack_waste_id_collisions_total",
        "Generated waste ids discarded because they were already issued"
    );
    describe_counter!(
        "wastetrack_validation_failures_total",
        "Commands rejected by validation"
    );
    describe_counter!(
        "wastetrack_snapshot_restore_failures_total",
        "Startup snapshot restores that fell back to an empty state"
    );
    describe_counter!(
        "wastetrack_classifications_total",
        "Classification requests by outcome (detected, unavailable, failed)"
    );

    tracing::info!("Business metrics registered");
}
