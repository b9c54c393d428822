//! Integration tests for the Store runtime
//!
//! Exercises effect feedback, completion tracking, action broadcasting,
//! change subscription and the persistence hook with a small drop-off bin
//! domain.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::{Arc, Mutex};
use std::time::Duration;
use wastetrack_core::persistence::{PersistenceError, StatePersistence};
use wastetrack_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use wastetrack_runtime::{Store, StoreConfig, StoreError};

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum BinAction {
    /// Drop items into the bin; weighing happens asynchronously
    Deposit { items: u32 },
    /// Scale reported the new fill level
    Weighed { fill: u32 },
    /// Bin crossed the pickup threshold
    PickupRequested { fill: u32 },
    /// Sort a mixed load into several streams at once
    Sort { streams: Vec<u32> },
    /// One stream finished sorting
    Sorted { items: u32 },
}

#[derive(Debug, Clone, Default)]
struct BinState {
    fill: u32,
    pickups: u32,
    sorted: u32,
}

#[derive(Clone)]
struct BinEnvironment {
    pickup_threshold: u32,
}

#[derive(Clone)]
struct BinReducer;

impl Reducer for BinReducer {
    type State = BinState;
    type Action = BinAction;
    type Environment = BinEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            BinAction::Deposit { items } => {
                let fill = state.fill + items;
                smallvec![Effect::future(async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Some(BinAction::Weighed { fill })
                })]
            },
            BinAction::Weighed { fill } => {
                state.fill = fill;
                if fill >= env.pickup_threshold {
                    smallvec![Effect::future(async move {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Some(BinAction::PickupRequested { fill })
                    })]
                } else {
                    SmallVec::new()
                }
            },
            BinAction::PickupRequested { .. } => {
                state.pickups += 1;
                SmallVec::new()
            },
            BinAction::Sort { streams } => {
                let effects = streams
                    .into_iter()
                    .map(|items| Effect::future(async move { Some(BinAction::Sorted { items }) }))
                    .collect();
                smallvec![Effect::merge(effects)]
            },
            BinAction::Sorted { items } => {
                state.sorted += items;
                SmallVec::new()
            },
        }
    }
}

fn bin_store() -> Store<BinState, BinAction, BinEnvironment, BinReducer> {
    Store::new(
        BinState::default(),
        BinReducer,
        BinEnvironment { pickup_threshold: 10 },
    )
}

#[derive(Default)]
struct RecordingPersistence {
    fills: Mutex<Vec<u32>>,
}

impl StatePersistence<BinState> for RecordingPersistence {
    fn persist(&self, state: &BinState) -> Result<(), PersistenceError> {
        self.fills.lock().unwrap().push(state.fill);
        Ok(())
    }
}

struct BrokenPersistence;

impl StatePersistence<BinState> for BrokenPersistence {
    fn persist(&self, _state: &BinState) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unavailable("disk gone".to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn effect_feedback_updates_state() {
    let store = bin_store();

    let mut handle = store.send(BinAction::Deposit { items: 3 }).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(2)).await.unwrap();

    assert_eq!(store.state(|s| s.fill).await, 3);
    assert_eq!(store.state(|s| s.pickups).await, 0);
}

#[tokio::test]
async fn handle_waits_for_cascading_feedback() {
    let store = bin_store();

    // Deposit -> Weighed -> PickupRequested, two hops of feedback
    let mut handle = store.send(BinAction::Deposit { items: 12 }).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(2)).await.unwrap();

    assert_eq!(handle.pending(), 0);
    assert_eq!(store.state(|s| s.pickups).await, 1);
}

#[tokio::test]
async fn send_and_wait_for_returns_reduced_action() {
    let store = bin_store();

    let result = store
        .send_and_wait_for(
            BinAction::Deposit { items: 4 },
            |a| matches!(a, BinAction::Weighed { .. }),
            Duration::from_secs(2),
        )
        .await
        .unwrap();

    assert_eq!(result, BinAction::Weighed { fill: 4 });
    // The broadcast happens after the reducer ran
    assert_eq!(store.state(|s| s.fill).await, 4);
}

#[tokio::test]
async fn send_and_wait_for_times_out() {
    let store = bin_store();

    let result = store
        .send_and_wait_for(
            BinAction::Deposit { items: 1 },
            |a| matches!(a, BinAction::PickupRequested { .. }),
            Duration::from_millis(100),
        )
        .await;

    assert!(matches!(result, Err(StoreError::Timeout)));
}

#[tokio::test]
async fn parallel_effects_all_feed_back() {
    let store = bin_store();

    let mut handle = store
        .send(BinAction::Sort { streams: vec![2, 3, 5] })
        .await
        .unwrap();
    handle.wait_with_timeout(Duration::from_secs(2)).await.unwrap();

    assert_eq!(store.state(|s| s.sorted).await, 10);
}

#[tokio::test]
async fn persistence_runs_after_every_action() {
    let persistence = Arc::new(RecordingPersistence::default());
    let store = bin_store().with_persistence(persistence.clone());

    let mut handle = store.send(BinAction::Deposit { items: 2 }).await.unwrap();
    handle.wait().await;
    let mut handle = store.send(BinAction::Deposit { items: 9 }).await.unwrap();
    handle.wait().await;

    // Deposit, Weighed, Deposit, Weighed, PickupRequested
    let fills = persistence.fills.lock().unwrap().clone();
    assert_eq!(fills, vec![0, 2, 2, 11, 11]);
}

#[tokio::test]
async fn persistence_failure_does_not_reject_actions() {
    let store = bin_store().with_persistence(Arc::new(BrokenPersistence));

    let mut handle = store.send(BinAction::Deposit { items: 5 }).await.unwrap();
    handle.wait().await;

    assert_eq!(store.state(|s| s.fill).await, 5);
}

#[tokio::test]
async fn change_subscription_sees_every_reduction() {
    let store = bin_store();
    let mut changes = store.subscribe_changes();
    assert_eq!(*changes.borrow_and_update(), 0);

    let mut handle = store.send(BinAction::Deposit { items: 1 }).await.unwrap();
    handle.wait().await;

    changes.changed().await.unwrap();
    assert_eq!(*changes.borrow_and_update(), 2);
    assert_eq!(store.revision(), 2);
}

#[tokio::test]
async fn subscribe_actions_only_sees_effect_output() {
    let store = bin_store();
    let mut rx = store.subscribe_actions();

    let mut handle = store.send(BinAction::Deposit { items: 1 }).await.unwrap();
    handle.wait().await;

    assert_eq!(rx.recv().await.unwrap(), BinAction::Weighed { fill: 1 });
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn shutdown_rejects_new_actions() {
    let store = Store::with_config(
        BinState::default(),
        BinReducer,
        BinEnvironment { pickup_threshold: 10 },
        StoreConfig::default().with_shutdown_timeout(Duration::from_secs(2)),
    );

    let _ = store.send(BinAction::Deposit { items: 1 }).await.unwrap();
    store.shutdown_gracefully().await.unwrap();

    assert!(store.is_shutting_down());
    let result = store.send(BinAction::Deposit { items: 1 }).await;
    assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
}

#[tokio::test]
async fn handle_records_every_fed_back_action() {
    let store = bin_store();

    let mut handle = store.send(BinAction::Deposit { items: 12 }).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(2)).await.unwrap();

    assert_eq!(
        handle.actions(),
        vec![
            BinAction::Weighed { fill: 12 },
            BinAction::PickupRequested { fill: 12 },
        ]
    );
}

#[tokio::test]
async fn handle_records_without_an_observer_keeping_up() {
    let store = Store::with_config(
        BinState::default(),
        BinReducer,
        BinEnvironment { pickup_threshold: 1000 },
        StoreConfig::default().with_broadcast_capacity(1),
    );
    let _lagging = store.subscribe_actions();

    let mut handles = Vec::new();
    for _ in 0..20 {
        handles.push(store.send(BinAction::Sort { streams: vec![1, 1] }).await.unwrap());
    }
    for handle in &mut handles {
        handle.wait_with_timeout(Duration::from_secs(2)).await.unwrap();
        assert_eq!(handle.actions(), vec![BinAction::Sorted { items: 1 }; 2]);
    }
    assert_eq!(store.state(|s| s.sorted).await, 40);
}

#[tokio::test]
async fn shutdown_lets_running_effects_feed_back() {
    let store = bin_store();

    // Deposit -> Weighed -> PickupRequested, all after shutdown has begun
    let mut handle = store.send(BinAction::Deposit { items: 12 }).await.unwrap();
    store.shutdown(Duration::from_secs(2)).await.unwrap();

    handle.wait().await;
    assert_eq!(store.state(|s| s.fill).await, 12);
    assert_eq!(store.state(|s| s.pickups).await, 1);
    assert!(matches!(
        store.send(BinAction::Deposit { items: 1 }).await,
        Err(StoreError::ShutdownInProgress)
    ));
}
