use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use matchday_back::{
    config::AppConfig,
    dao::{
        match_store::{MatchStore, MemoryMatchStore},
        models::{MatchStatus, Visibility},
    },
    error::ServiceError,
    services::{
        match_service::{self, NewMatch},
        roster_service::{self, Placement},
        status_updater,
    },
    state::{AppState, SharedState},
};

async fn state_with_store() -> (SharedState, MemoryMatchStore) {
    let store = MemoryMatchStore::new();
    let state = AppState::new(AppConfig::default());
    state.install_match_store(Arc::new(store.clone())).await;
    (state, store)
}

fn five_a_side(start_time: SystemTime) -> NewMatch {
    NewMatch {
        title: "Five-a-side at the park".into(),
        creator_id: "organizer".into(),
        total_slots: 5,
        visibility: Visibility::Public,
        start_time,
        duration_minutes: None,
    }
}

#[tokio::test]
async fn full_match_queues_and_promotes_in_arrival_order() {
    let (state, store) = state_with_store().await;
    let created = match_service::create_match(
        &state,
        five_a_side(SystemTime::now() + Duration::from_secs(86_400)),
    )
    .await
    .unwrap();
    let id = created.id;

    for player in ["p1", "p2", "p3", "p4"] {
        let (_, placement) = roster_service::join_match(&state, id, player).await.unwrap();
        assert_eq!(placement, Placement::Roster);
    }
    for waiting in ["w1", "w2", "w3"] {
        let (_, placement) = roster_service::join_match(&state, id, waiting).await.unwrap();
        assert_eq!(placement, Placement::Queue);
    }

    let after_leaves = {
        roster_service::leave_match(&state, id, "p1").await.unwrap();
        roster_service::leave_match(&state, id, "p2").await.unwrap()
    };
    assert_eq!(after_leaves.filled_slots, 5);
    assert!(after_leaves.has_member("w1"));
    assert!(after_leaves.has_member("w2"));
    assert_eq!(after_leaves.queue.len(), 1);
    assert_eq!(after_leaves.queue[0].user_id, "w3");

    let stored = store.find_match(id).await.unwrap().unwrap();
    assert_eq!(stored.filled_slots as usize, stored.roster.len());
    assert!(stored.has_member("organizer"));
}

#[tokio::test]
async fn creator_stays_and_can_cancel_instead() {
    let (state, _store) = state_with_store().await;
    let created = match_service::create_match(
        &state,
        five_a_side(SystemTime::now() + Duration::from_secs(3_600)),
    )
    .await
    .unwrap();

    let err = roster_service::leave_match(&state, created.id, "organizer")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::CreatorCannotLeave(_)));

    let cancelled = match_service::cancel_match(&state, created.id, "organizer")
        .await
        .unwrap();
    assert_eq!(cancelled.status, MatchStatus::Cancelled);

    let err = roster_service::join_match(&state, created.id, "late")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));
}

#[tokio::test]
async fn status_pass_settles_everything_once() {
    let (state, _store) = state_with_store().await;
    let now = SystemTime::now();
    let finished = match_service::create_match(&state, five_a_side(now - Duration::from_secs(3 * 3_600)))
        .await
        .unwrap();
    let running = match_service::create_match(&state, five_a_side(now - Duration::from_secs(1_800)))
        .await
        .unwrap();
    let upcoming = match_service::create_match(&state, five_a_side(now + Duration::from_secs(3_600)))
        .await
        .unwrap();

    let first = status_updater::run_status_update_pass(&state).await.unwrap();
    assert_eq!(first.updated, 2);
    assert_eq!(first.skipped, 1);

    let second = status_updater::run_status_update_pass(&state).await.unwrap();
    assert_eq!(second.updated, 0);
    assert_eq!(second.queue_processed, 0);

    let status_of = |id| {
        let state = state.clone();
        async move { match_service::get_match(&state, id).await.unwrap().status }
    };
    assert_eq!(status_of(finished.id).await, MatchStatus::Completed);
    assert_eq!(status_of(running.id).await, MatchStatus::InProgress);
    assert_eq!(status_of(upcoming.id).await, MatchStatus::Scheduled);
}
