//! Contention behavior of the registration protocol.
//!
//! These tests drive real concurrent registrations through the coordinator
//! and assert the single correctness property the core exists for: seats
//! are never oversold and the seat counter never drifts from the membership
//! lists.

mod helpers;

use futures::future::join_all;
use gatherly::{GatherlyError, ProfileKey};
use helpers::{activity_form, caller, TestContext};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_racing_registrations_for_the_last_seat_produce_one_winner() {
    let ctx = TestContext::new();
    let key = ctx
        .services
        .registration_service
        .create_activity(&caller("owner"), &activity_form("Solo dinner", 1))
        .await
        .unwrap()
        .key();

    let tasks: Vec<_> = ["bob", "carol"]
        .into_iter()
        .map(|user| {
            let service = ctx.services.registration_service.clone();
            let key = key.clone();
            let user = caller(user);
            tokio::spawn(async move { service.register(&user, &key).await })
        })
        .collect();

    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = outcomes.into_iter().find(|o| o.is_err()).unwrap();
    assert!(matches!(
        loser,
        Err(GatherlyError::Conflict(msg)) if msg.contains("no seats available")
    ));

    let stored = ctx.store.get_activity(&key).unwrap().unwrap();
    assert_eq!(stored.available_seats, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn at_most_k_of_n_concurrent_registrations_succeed() {
    const SEATS: u32 = 3;
    const CALLERS: usize = 8;

    let ctx = TestContext::new();
    let key = ctx
        .services
        .registration_service
        .create_activity(&caller("owner"), &activity_form("Workshop", SEATS))
        .await
        .unwrap()
        .key();

    let tasks: Vec<_> = (0..CALLERS)
        .map(|n| {
            let service = ctx.services.registration_service.clone();
            let key = key.clone();
            let user = caller(&format!("user-{n}"));
            tokio::spawn(async move { (user.user_id.clone(), service.register(&user, &key).await) })
        })
        .collect();

    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let mut winners = Vec::new();
    for (user_id, outcome) in outcomes {
        match outcome {
            Ok(true) => winners.push(user_id),
            Ok(false) => panic!("register never returns false"),
            Err(GatherlyError::Conflict(msg)) => {
                assert!(msg.contains("no seats available"), "unexpected conflict: {msg}");
            }
            Err(other) => panic!("unexpected failure: {other}"),
        }
    }
    assert_eq!(winners.len(), SEATS as usize);

    // The counter and the membership lists agree exactly.
    let stored = ctx.store.get_activity(&key).unwrap().unwrap();
    assert_eq!(stored.available_seats, 0);
    for user_id in &winners {
        let profile = ctx
            .store
            .get_profile(&ProfileKey::new(user_id))
            .unwrap()
            .unwrap();
        assert!(profile.activities_to_attend.contains(&key));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_register_and_unregister_keep_the_counter_consistent() {
    let ctx = TestContext::new();
    let key = ctx
        .services
        .registration_service
        .create_activity(&caller("owner"), &activity_form("Open gym", 3))
        .await
        .unwrap()
        .key();

    // bob holds a seat; he unregisters while two others scramble for seats.
    // Two seats stay free throughout, so every interleaving must succeed.
    ctx.services
        .registration_service
        .register(&caller("bob"), &key)
        .await
        .unwrap();

    let mut tasks = Vec::new();
    {
        let service = ctx.services.registration_service.clone();
        let key = key.clone();
        tasks.push(tokio::spawn(async move {
            service.unregister(&caller("bob"), &key).await.map(|_| ())
        }));
    }
    for user in ["carol", "dave"] {
        let service = ctx.services.registration_service.clone();
        let key = key.clone();
        let user = caller(user);
        tasks.push(tokio::spawn(async move {
            service.register(&user, &key).await.map(|_| ())
        }));
    }

    for joined in join_all(tasks).await {
        joined.unwrap().unwrap();
    }

    let stored = ctx.store.get_activity(&key).unwrap().unwrap();
    assert_eq!(stored.available_seats, 1);

    let bob = ctx
        .store
        .get_profile(&ProfileKey::new("bob"))
        .unwrap()
        .unwrap();
    assert!(bob.activities_to_attend.is_empty());
}
