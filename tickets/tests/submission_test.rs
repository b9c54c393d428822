//! Submission flow against canned classifiers and a session ledger

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::Arc;
use wastetrack_classifier::mocks::StaticClassifier;
use wastetrack_classifier::{Classification, Classified, ImageUpload, WasteCategory};
use wastetrack_testing::{init_test_tracing, test_clock};
use wastetrack_tickets::mocks::{SequentialWasteIdGenerator, StaticEncoder};
use wastetrack_tickets::views::{classification_summary, NOT_AVAILABLE};
use wastetrack_tickets::{
    IdentityProvider, Location, Role, SessionIdentity, SessionLedger, SubmissionError,
    SubmissionFlow, TicketEnvironment, TicketError, TicketSettings, TicketStatus, User,
    WasteTicketStore,
};

fn flow(classifier: Arc<StaticClassifier>) -> (SubmissionFlow, Arc<SessionIdentity>) {
    init_test_tracing();
    let identity = Arc::new(SessionIdentity::signed_in(User::new("c1", "Asha", Role::Citizen)));
    let env = TicketEnvironment::new(
        Arc::new(test_clock()),
        Arc::new(SequentialWasteIdGenerator::new()),
        Arc::new(StaticEncoder),
        Arc::new(SessionLedger::new(identity.clone())),
        TicketSettings::default(),
    );
    (SubmissionFlow::new(WasteTicketStore::new(env), classifier), identity)
}

fn photo() -> ImageUpload {
    ImageUpload::jpeg(vec![0xFF, 0xD8, 0xFF, 0xD9])
}

#[tokio::test]
async fn detected_classification_is_stored_on_the_ticket() {
    let classifier = Arc::new(StaticClassifier::answering(Classified::Detected(
        Classification::new()
            .with(WasteCategory::Plastic, 2)
            .with(WasteCategory::Paper, 1),
    )));
    let (flow, identity) = flow(classifier.clone());

    let ticket = flow.submit("c1", photo()).await.unwrap();

    assert_eq!(classifier.calls(), 1);
    assert_eq!(ticket.status, TicketStatus::Pending);
    assert_eq!(
        classification_summary(ticket.classification.as_ref()),
        "Paper: 1, Plastic: 2"
    );
    assert!(ticket.image_url.starts_with("data:image/jpeg;base64,"));
    assert_eq!(identity.current_user().unwrap().eco_points, 5);
}

#[tokio::test]
async fn unavailable_classification_still_creates_the_ticket() {
    let (flow, _) = flow(Arc::new(StaticClassifier::answering(Classified::Unavailable)));

    let ticket = flow.submit("c1", photo()).await.unwrap();

    assert!(ticket.classification.is_none());
    assert_eq!(classification_summary(ticket.classification.as_ref()), NOT_AVAILABLE);
    assert_eq!(flow.store().tickets().await.len(), 1);
}

#[tokio::test]
async fn unreachable_classifier_fails_without_a_ticket() {
    let (flow, identity) = flow(Arc::new(StaticClassifier::unreachable("connection refused")));

    let result = flow.submit("c1", photo()).await;

    assert!(matches!(result, Err(SubmissionError::Classification(_))));
    assert!(flow.store().tickets().await.is_empty());
    assert_eq!(identity.current_user().unwrap().eco_points, 0);
}

#[tokio::test]
async fn blank_citizen_surfaces_as_ticket_error() {
    let (flow, _) = flow(Arc::new(StaticClassifier::answering(Classified::Unavailable)));

    let result = flow.submit("", photo()).await;

    assert!(matches!(
        result,
        Err(SubmissionError::Ticket(TicketError::Validation(_)))
    ));
}

#[tokio::test]
async fn location_is_passed_through() {
    let (flow, _) = flow(Arc::new(StaticClassifier::answering(Classified::Unavailable)));
    let location = Location::new(18.52, 73.856_7, "Shivajinagar, Pune");

    let ticket = flow
        .submit_at("c1", photo(), Some(location.clone()))
        .await
        .unwrap();

    assert_eq!(ticket.location, Some(location));
}

#[tokio::test]
async fn recycling_credits_the_signed_in_citizen() {
    let (flow, identity) = flow(Arc::new(StaticClassifier::answering(Classified::Unavailable)));
    let ticket = flow.submit("c1", photo()).await.unwrap();

    flow.store()
        .update_ticket_status(&ticket.waste_id, TicketStatus::Recycled, None, None)
        .await
        .unwrap();

    assert_eq!(identity.current_user().unwrap().eco_points, 15);
}
