#![allow(dead_code)]

use async_trait::async_trait;
use poll_server::db::{
    poll::{NewPollRecord, PollId},
    user::UserId,
    vote::{InternalVote, NewVote},
    MemoryStore, PollStore, StoreError, StoredPoll,
};

/// Store that persists a poll but loses every option after the first one,
/// like a backend without atomic multi-row inserts failing halfway.
#[derive(Default)]
pub struct DroppingOptionsStore {
    inner: MemoryStore,
}

#[async_trait]
impl PollStore for DroppingOptionsStore {
    async fn create_poll(&self, mut poll: NewPollRecord) -> Result<StoredPoll, StoreError> {
        poll.options.truncate(1);
        self.inner.create_poll(poll).await
    }

    async fn polls(&self) -> Result<Vec<StoredPoll>, StoreError> {
        self.inner.polls().await
    }

    async fn poll_by_id(&self, id: &PollId) -> Result<Option<StoredPoll>, StoreError> {
        self.inner.poll_by_id(id).await
    }

    async fn insert_vote(&self, vote: NewVote) -> Result<InternalVote, StoreError> {
        self.inner.insert_vote(vote).await
    }

    async fn vote_for_user(
        &self,
        poll_id: &PollId,
        user_id: &UserId,
    ) -> Result<Option<InternalVote>, StoreError> {
        self.inner.vote_for_user(poll_id, user_id).await
    }
}

/// Store whose backend is unreachable.
pub struct UnavailableStore;

fn unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl PollStore for UnavailableStore {
    async fn create_poll(&self, _poll: NewPollRecord) -> Result<StoredPoll, StoreError> {
        Err(unavailable())
    }

    async fn polls(&self) -> Result<Vec<StoredPoll>, StoreError> {
        Err(unavailable())
    }

    async fn poll_by_id(&self, _id: &PollId) -> Result<Option<StoredPoll>, StoreError> {
        Err(unavailable())
    }

    async fn insert_vote(&self, _vote: NewVote) -> Result<InternalVote, StoreError> {
        Err(unavailable())
    }

    async fn vote_for_user(
        &self,
        _poll_id: &PollId,
        _user_id: &UserId,
    ) -> Result<Option<InternalVote>, StoreError> {
        Err(unavailable())
    }
}

pub fn user(name: &str) -> UserId {
    UserId::from(name)
}
