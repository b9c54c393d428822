//! Waste tracking demo
//!
//! Walks one waste item through its lifecycle against a file-backed store:
//! a citizen submits a photo, a collector picks it up, and it is recycled.
//! Tickets persist in the data directory, so repeated runs accumulate
//! history.
//!
//! # Usage
//!
//! ```bash
//! # Offline: a canned classification is used
//! cargo run --bin wastetrack
//!
//! # Against a running classification service, with a real photo
//! cargo run --bin wastetrack -- --live path/to/photo.jpg
//! ```

use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wastetrack_classifier::{
    mocks::StaticClassifier, Classification, Classified, Classifier, ClassifierClient, ImageUpload,
    WasteCategory,
};
use wastetrack_core::persistence::FileSnapshotStore;
use wastetrack_runtime::metrics::MetricsServer;
use wastetrack_tickets::{
    metrics::register_business_metrics,
    views::{
        classification_summary, collector_daily_progress, eco_badges, municipality_overview,
        stage_progress, DEFAULT_RECENT_LIMIT,
    },
    Config, IdentityProvider, QrCodeEncoder, Role, SessionIdentity, SessionLedger, SubmissionFlow,
    TicketEnvironment, TicketStatus, User, WasteTicketStore,
};

const CITIZEN_ID: &str = "citizen-demo";
const COLLECTOR_ID: &str = "collector-demo";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,wastetrack_tickets=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(data_dir = %config.storage.data_dir.display(), "Starting wastetrack demo");

    let metrics_server = match config.metrics_addr {
        Some(addr) => {
            let mut server = MetricsServer::new(addr);
            server.start().context("starting metrics recorder")?;
            register_business_metrics();
            Some(server)
        },
        None => None,
    };

    let mut args = std::env::args().skip(1).peekable();
    let live = args.next_if(|arg| arg == "--live").is_some();
    let image = match args.next() {
        Some(path) => ImageUpload::jpeg(
            tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading photo {path}"))?,
        ),
        None => ImageUpload::jpeg(vec![0xFF, 0xD8, 0xFF, 0xD9]),
    };

    let classifier: Arc<dyn Classifier> = if live {
        Arc::new(
            ClassifierClient::with_timeout(&config.classifier.url, config.classifier.timeout)
                .context("building classifier client")?,
        )
    } else {
        Arc::new(StaticClassifier::answering(Classified::Detected(
            Classification::new()
                .with(WasteCategory::Plastic, 2)
                .with(WasteCategory::Metal, 1),
        )))
    };

    // Session and store
    let identity = Arc::new(SessionIdentity::signed_in(User::new(
        CITIZEN_ID,
        "Demo Citizen",
        Role::Citizen,
    )));
    let env = TicketEnvironment::live(
        Arc::new(QrCodeEncoder),
        Arc::new(SessionLedger::new(identity.clone())),
        config.tickets.clone(),
    );
    let store = WasteTicketStore::open(
        Arc::new(FileSnapshotStore::new(config.storage.data_dir.clone())),
        &config.storage.key,
        env,
        config.store_config(),
    )
    .with_creation_timeout(config.runtime.creation_timeout);

    println!("\n♻️  Waste tracking demo");
    println!("   {} tickets restored from storage\n", store.tickets().await.len());

    // 1. Citizen submits a photo
    let flow = SubmissionFlow::new(store.clone(), classifier);
    let ticket = flow.submit(CITIZEN_ID, image).await.context("submitting waste")?;
    println!("1️⃣  Submitted {}", ticket.waste_id);
    println!("   Classification: {}", classification_summary(ticket.classification.as_ref()));
    println!("   Code image: {} bytes", ticket.qr_code.len());

    // 2. Collector picks it up
    store
        .update_ticket_status(
            &ticket.waste_id,
            TicketStatus::Collected,
            Some(COLLECTOR_ID.to_string()),
            Some("proof://pickup.jpg".to_string()),
        )
        .await?;
    println!("2️⃣  Collected by {COLLECTOR_ID}");

    // 3. Recycled
    store
        .update_ticket_status(&ticket.waste_id, TicketStatus::Recycled, None, None)
        .await?;
    println!("3️⃣  Recycled\n");

    // Dashboards
    if let Some(latest) = store.get_ticket_by_waste_id(&ticket.waste_id).await {
        for progress in stage_progress(&latest) {
            let when = progress
                .timestamp
                .map_or_else(|| "-".to_string(), |t| t.format("%H:%M:%S").to_string());
            let mark = if progress.completed { "✓" } else { "·" };
            println!("   {mark} {:<9} {when}", progress.stage.label());
        }
    }

    let eco_points = identity.current_user().map_or(0, |user| user.eco_points);
    let mine = store.get_tickets_by_user(CITIZEN_ID).await;
    println!("\n   Eco points this session: {eco_points}");
    for badge in eco_badges(&mine, eco_points) {
        let mark = if badge.unlocked { "🏅" } else { "  " };
        println!("   {mark} {} ({})", badge.name, badge.description);
    }

    let all = store.tickets().await;
    let daily = collector_daily_progress(&all, COLLECTOR_ID, Utc::now().date_naive());
    println!(
        "\n   Collector today: {}/{} pickups, {}% verified",
        daily.pickups, daily.target, daily.verification_rate
    );

    let overview = municipality_overview(&all, DEFAULT_RECENT_LIMIT);
    println!(
        "   City: {} pending, {} collected, {} recycled, {} on the map",
        overview.counts.pending,
        overview.counts.collected,
        overview.counts.recycled,
        overview.heat_points.len()
    );

    if let Some(text) = metrics_server.as_ref().and_then(MetricsServer::render) {
        println!("\n{text}");
    }

    store.shutdown().await?;
    println!("\n✓ Snapshot saved under {}", config.storage.data_dir.display());
    Ok(())
}
