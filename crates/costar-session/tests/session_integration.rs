#![allow(clippy::unwrap_used, clippy::expect_used)]

use costar_session::{CorrelationTracker, SessionState, SessionStore, Step};
use std::collections::HashSet;
use std::sync::Arc;

#[test]
fn test_fresh_get_is_idle_and_idempotent() {
    let store = SessionStore::new();

    for id in [1_i64, -100_200_300, i64::MAX] {
        let first = store.get(id);
        assert_eq!(first, SessionState::new());
        let second = store.get(id);
        assert_eq!(first, second);
    }
    assert_eq!(store.len(), 3);
}

#[test]
fn test_second_get_sees_same_session() {
    let store = Arc::new(SessionStore::new());
    let tracker = CorrelationTracker::new(store.clone());

    store.get(42);
    let cid = tracker.correlation_id(42);
    let again = store.get(42);
    assert_eq!(again.correlation_id, Some(cid));
}

#[test]
fn test_concurrent_first_access_never_loses_updates() {
    let store = SessionStore::new();
    std::thread::scope(|scope| {
        for i in 0..16_i64 {
            let store = &store;
            scope.spawn(move || {
                store.get(7);
                store.update(7, |s| s.outstanding_media.push(i));
            });
        }
    });

    let mut media = store.get(7).outstanding_media;
    media.sort_unstable();
    assert_eq!(media, (0..16).collect::<Vec<_>>());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_concurrent_correlation_ids_agree() {
    let store = Arc::new(SessionStore::new());
    let tracker = CorrelationTracker::new(store);
    let ids: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                scope.spawn(move || tracker.correlation_id(99))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    let distinct: HashSet<_> = ids.into_iter().collect();
    assert_eq!(distinct.len(), 1);
}

#[test]
fn test_concurrent_operations_on_distinct_ids() {
    let store = SessionStore::new();
    std::thread::scope(|scope| {
        for worker in 0..8_i64 {
            let store = &store;
            scope.spawn(move || {
                for n in 0..200_i64 {
                    let id = worker * 1_000 + n;
                    let state = store.get(id);
                    assert_eq!(state.step, Step::Idle);
                    store.set(id, SessionState::started(None));
                    assert_eq!(store.get(id).step, Step::AwaitingFirstActor);
                    if n % 2 == 0 {
                        assert!(store.reset(id).is_some());
                    }
                }
            });
        }
    });

    let ids = store.list_active_ids();
    assert_eq!(ids.len(), 8 * 100);
    for worker in 0..8_i64 {
        for n in (1..200_i64).step_by(2) {
            let id = worker * 1_000 + n;
            assert!(ids.contains(&id));
            assert_eq!(store.get(id).step, Step::AwaitingFirstActor);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_delivery_commits_once() {
    let store = Arc::new(SessionStore::new());
    let mut selecting = SessionState::started(None);
    selecting.advance(Step::SelectingFirstActor).unwrap();
    store.set(1, selecting.clone());

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        let mut next = selecting.clone();
        tasks.push(tokio::spawn(async move {
            next.record_selection(5).unwrap();
            store.compare_and_set(1, Step::SelectingFirstActor, next)
        }));
    }

    let mut committed = 0;
    for task in tasks {
        if task.await.unwrap() {
            committed += 1;
        }
    }
    assert_eq!(committed, 1);
    let state = store.get(1);
    assert_eq!(state.step, Step::AwaitingSecondActor);
    assert_eq!(state.first_actor_id, Some(5));
}
