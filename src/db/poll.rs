use super::{poll_option::NewOptionRecord, user::UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, Deserialize, Serialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct PollId(pub Uuid);

impl PollId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PollId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for PollId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct InternalPoll {
    pub id: PollId,
    pub title: String,
    pub description: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

/// A poll and its options as they are handed to the store in one unit.
#[derive(Clone, Debug)]
pub struct NewPollRecord {
    pub id: PollId,
    pub title: String,
    pub description: Option<String>,
    pub created_by: UserId,
    pub options: Vec<NewOptionRecord>,
}
