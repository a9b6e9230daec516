use super::{poll::PollId, poll_option::OptionId, user::UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, Deserialize, Serialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct VoteId(pub Uuid);

impl VoteId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VoteId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, PartialEq, Eq, Debug, sqlx::FromRow)]
pub struct InternalVote {
    pub id: VoteId,
    pub poll_id: PollId,
    pub option_id: OptionId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewVote {
    pub id: VoteId,
    pub poll_id: PollId,
    pub option_id: OptionId,
    pub user_id: UserId,
}
