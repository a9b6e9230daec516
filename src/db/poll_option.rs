use super::poll::PollId;
use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug, Deserialize, Serialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct OptionId(pub Uuid);

impl OptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for OptionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Option row joined with the number of votes recorded against it.
#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct InternalOption {
    pub id: OptionId,
    pub poll_id: PollId,
    pub text: String,
    pub position: i32,
    pub votes: i64,
}

#[derive(Clone, Debug)]
pub struct NewOptionRecord {
    pub id: OptionId,
    pub text: String,
    pub position: i32,
}
