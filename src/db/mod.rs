pub mod memory;
pub mod poll;
pub mod poll_option;
pub mod postgres;
pub mod user;
pub mod vote;

use crate::config::Config;
use async_trait::async_trait;
use poll::{InternalPoll, NewPollRecord, PollId};
use poll_option::InternalOption;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use thiserror::Error;
use user::UserId;
use vote::{InternalVote, NewVote};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("foreign key constraint violated")]
    ForeignKeyViolation,
    #[error("poll stored with {actual} of {expected} options")]
    IncompletePoll { expected: usize, actual: usize },
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::UniqueViolation
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                StoreError::ForeignKeyViolation
            }
            _ => StoreError::Database(err),
        }
    }
}

/// A poll together with its options, ordered by position.
#[derive(Clone, Debug)]
pub struct StoredPoll {
    pub poll: InternalPoll,
    pub options: Vec<InternalOption>,
}

/// Persistence boundary for polls and votes.
///
/// Implementations own all shared state; callers hold nothing between calls.
/// Option vote counts are always derived from the recorded votes at read time.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Persists the poll and every option as a single unit.
    async fn create_poll(&self, poll: NewPollRecord) -> Result<StoredPoll, StoreError>;

    /// All polls, newest first.
    async fn polls(&self) -> Result<Vec<StoredPoll>, StoreError>;

    async fn poll_by_id(&self, id: &PollId) -> Result<Option<StoredPoll>, StoreError>;

    /// Inserts the vote unless one already exists for `(poll_id, user_id)`.
    ///
    /// The existence check and the insert are a single atomic step. A duplicate
    /// yields [`StoreError::UniqueViolation`], an option outside the poll
    /// yields [`StoreError::ForeignKeyViolation`].
    async fn insert_vote(&self, vote: NewVote) -> Result<InternalVote, StoreError>;

    async fn vote_for_user(
        &self,
        poll_id: &PollId,
        user_id: &UserId,
    ) -> Result<Option<InternalVote>, StoreError>;
}

pub async fn new_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    new_pool_with(database_url.parse()?).await
}

pub async fn new_pool_with(connect_options: PgConnectOptions) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await
}

/// Builds a pool using the configured size and acquire timeout.
pub async fn connect(database_url: &str, config: &Config) -> Result<PgPool, sqlx::Error> {
    let connect_options: PgConnectOptions = database_url.parse()?;
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_options)
        .await
}

pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
