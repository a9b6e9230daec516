//! Runs against a real PostgreSQL server: `DATABASE_URL=... cargo test -- --ignored`

mod integration_db;

use futures::future::join_all;
use integration_db::IntegrationTestDb;
use poll_server::{
    db::{PgStore, PollStore},
    error::PollError,
    services::{self, NewPoll},
};
use std::sync::Arc;

fn store(db: &IntegrationTestDb) -> PgStore {
    PgStore::new(db.pool())
}

#[actix_rt::test]
#[ignore = "needs DATABASE_URL"]
async fn test_poll_round_trip() {
    let db = IntegrationTestDb::new().await;
    let store = store(&db);

    let poll = services::create_poll(
        &store,
        NewPoll::new("Best color?", vec!["Red", "Blue", "Green"]).with_description("Pick one"),
        "creator".into(),
    )
    .await
    .unwrap();

    let loaded = services::get_poll(&store, &poll.id)
        .await
        .unwrap()
        .expect("poll should exist");
    assert_eq!(loaded.id, poll.id);
    assert_eq!(loaded.description.as_deref(), Some("Pick one"));
    let texts: Vec<&str> = loaded.options.iter().map(|option| option.text.as_str()).collect();
    assert_eq!(texts, vec!["Red", "Blue", "Green"]);
    assert_eq!(loaded.total_votes, 0);
}

#[actix_rt::test]
#[ignore = "needs DATABASE_URL"]
async fn test_votes_are_tallied() {
    let db = IntegrationTestDb::new().await;
    let store = store(&db);
    let poll = services::create_poll(
        &store,
        NewPoll::new("Best color?", vec!["Red", "Blue"]),
        "creator".into(),
    )
    .await
    .unwrap();

    services::cast_vote(&store, &poll.id, &poll.options[0].id, &"a".into())
        .await
        .unwrap();
    services::cast_vote(&store, &poll.id, &poll.options[1].id, &"b".into())
        .await
        .unwrap();
    let repeat = services::cast_vote(&store, &poll.id, &poll.options[0].id, &"a".into()).await;
    assert!(matches!(repeat, Err(PollError::VoteConflict)));

    let polls = services::list_polls(&store).await.unwrap();
    assert_eq!(polls.len(), 1);
    assert_eq!(polls[0].total_votes, 2);
    assert!(polls[0].options.iter().all(|option| option.percentage == 50));
    assert!(services::has_voted(&store, &poll.id, &"a".into()).await.unwrap());
}

#[actix_rt::test]
#[ignore = "needs DATABASE_URL"]
async fn test_uniqueness_is_enforced_by_the_database() {
    let db = IntegrationTestDb::new().await;
    let store: Arc<dyn PollStore> = Arc::new(store(&db));
    let poll = services::create_poll(
        store.as_ref(),
        NewPoll::new("Race", vec!["Left", "Right"]),
        "creator".into(),
    )
    .await
    .unwrap();

    let handles = (0..8).map(|i| {
        let store = store.clone();
        let poll_id = poll.id;
        let option_id = poll.options[i % 2].id;
        actix_rt::spawn(async move {
            services::cast_vote(store.as_ref(), &poll_id, &option_id, &"racer".into()).await
        })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|result| matches!(result, Err(PollError::VoteConflict)))
            .count(),
        7
    );
    let poll = services::get_poll(store.as_ref(), &poll.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(poll.total_votes, 1);
}

#[actix_rt::test]
#[ignore = "needs DATABASE_URL"]
async fn test_foreign_option_is_rejected_by_the_database() {
    let db = IntegrationTestDb::new().await;
    let store = store(&db);
    let poll = services::create_poll(&store, NewPoll::new("One", vec!["a", "b"]), "c".into())
        .await
        .unwrap();
    let other = services::create_poll(&store, NewPoll::new("Two", vec!["a", "b"]), "c".into())
        .await
        .unwrap();

    // bypass the service check to hit the composite foreign key
    let result = store
        .insert_vote(poll_server::db::vote::NewVote {
            id: poll_server::db::vote::VoteId::new(),
            poll_id: poll.id,
            option_id: other.options[0].id,
            user_id: "a".into(),
        })
        .await;
    assert!(matches!(
        result,
        Err(poll_server::db::StoreError::ForeignKeyViolation)
    ));
}
