use super::{
    poll::{InternalPoll, NewPollRecord, PollId},
    poll_option::InternalOption,
    user::UserId,
    vote::{InternalVote, NewVote},
    PollStore, StoreError, StoredPoll,
};
use async_trait::async_trait;
use sqlx::{types::Uuid, PgConnection, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// [`PollStore`] backed by PostgreSQL.
///
/// Vote uniqueness and option ownership are enforced by the schema
/// (`votes_poll_user_key` and `votes_option_poll_fkey`), so concurrent
/// requests are adjudicated by the database rather than by this process.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> PgPool {
        self.pool.clone()
    }
}

async fn options_for_polls(
    conn: &mut PgConnection,
    poll_ids: Vec<Uuid>,
) -> Result<HashMap<PollId, Vec<InternalOption>>, sqlx::Error> {
    let options = sqlx::query_as::<_, InternalOption>(
        r#"
        SELECT o.id, o.poll_id, o.text, o.position, COUNT(v.id) AS votes
        FROM poll_options o
        LEFT JOIN votes v ON v.option_id = o.id
        WHERE o.poll_id = ANY($1)
        GROUP BY o.id
        ORDER BY o.poll_id, o.position
        "#,
    )
    .bind(poll_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_poll: HashMap<PollId, Vec<InternalOption>> = HashMap::new();
    for option in options {
        by_poll.entry(option.poll_id).or_default().push(option);
    }
    Ok(by_poll)
}

// Reads run in one snapshot so options and counts agree with each other
async fn begin_snapshot(pool: &PgPool) -> Result<Transaction<'static, Postgres>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;
    Ok(tx)
}

#[async_trait]
impl PollStore for PgStore {
    #[instrument(skip(self, poll), fields(poll_id = %poll.id))]
    async fn create_poll(&self, poll: NewPollRecord) -> Result<StoredPoll, StoreError> {
        let mut tx = self.pool.begin().await?;

        let stored = sqlx::query_as::<_, InternalPoll>(
            r#"
            INSERT INTO polls (id, title, description, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, description, created_by, created_at
            "#,
        )
        .bind(poll.id)
        .bind(&poll.title)
        .bind(&poll.description)
        .bind(&poll.created_by)
        .fetch_one(&mut *tx)
        .await?;

        let mut options = Vec::with_capacity(poll.options.len());
        for option in &poll.options {
            let row = sqlx::query_as::<_, InternalOption>(
                r#"
                INSERT INTO poll_options (id, poll_id, text, position)
                VALUES ($1, $2, $3, $4)
                RETURNING id, poll_id, text, position, 0::BIGINT AS votes
                "#,
            )
            .bind(option.id)
            .bind(stored.id)
            .bind(&option.text)
            .bind(option.position)
            .fetch_one(&mut *tx)
            .await?;
            options.push(row);
        }

        tx.commit().await?;
        debug!(options = options.len(), "Poll committed");

        Ok(StoredPoll {
            poll: stored,
            options,
        })
    }

    #[instrument(skip(self))]
    async fn polls(&self) -> Result<Vec<StoredPoll>, StoreError> {
        let mut tx = begin_snapshot(&self.pool).await?;

        let polls = sqlx::query_as::<_, InternalPoll>(
            r#"
            SELECT id, title, description, created_by, created_at
            FROM polls
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;
        debug!("Found {} polls", polls.len());

        let ids = polls.iter().map(|poll| poll.id.0).collect();
        let mut options = options_for_polls(&mut *tx, ids).await?;
        tx.commit().await?;

        Ok(polls
            .into_iter()
            .map(|poll| StoredPoll {
                options: options.remove(&poll.id).unwrap_or_default(),
                poll,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn poll_by_id(&self, id: &PollId) -> Result<Option<StoredPoll>, StoreError> {
        let mut tx = begin_snapshot(&self.pool).await?;

        let poll = sqlx::query_as::<_, InternalPoll>(
            r#"
            SELECT id, title, description, created_by, created_at
            FROM polls
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let poll = match poll {
            Some(poll) => poll,
            None => {
                debug!("Poll not found");
                tx.commit().await?;
                return Ok(None);
            }
        };

        let mut options = options_for_polls(&mut *tx, vec![poll.id.0]).await?;
        tx.commit().await?;

        Ok(Some(StoredPoll {
            options: options.remove(&poll.id).unwrap_or_default(),
            poll,
        }))
    }

    #[instrument(skip(self, vote), fields(poll_id = %vote.poll_id, option_id = %vote.option_id))]
    async fn insert_vote(&self, vote: NewVote) -> Result<InternalVote, StoreError> {
        let vote = sqlx::query_as::<_, InternalVote>(
            r#"
            INSERT INTO votes (id, poll_id, option_id, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, poll_id, option_id, user_id, created_at
            "#,
        )
        .bind(vote.id)
        .bind(vote.poll_id)
        .bind(vote.option_id)
        .bind(&vote.user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(vote)
    }

    #[instrument(skip(self))]
    async fn vote_for_user(
        &self,
        poll_id: &PollId,
        user_id: &UserId,
    ) -> Result<Option<InternalVote>, StoreError> {
        let vote = sqlx::query_as::<_, InternalVote>(
            r#"
            SELECT id, poll_id, option_id, user_id, created_at
            FROM votes
            WHERE poll_id = $1 AND user_id = $2
            "#,
        )
        .bind(poll_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(vote)
    }
}
