use super::{
    poll::{InternalPoll, NewPollRecord, PollId},
    poll_option::{InternalOption, OptionId},
    user::UserId,
    vote::{InternalVote, NewVote},
    PollStore, StoreError, StoredPoll,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Tables {
    // insertion order, oldest first
    polls: Vec<InternalPoll>,
    options: HashMap<PollId, Vec<(OptionId, String, i32)>>,
    votes: Vec<InternalVote>,
    voters: HashSet<(PollId, UserId)>,
}

impl Tables {
    fn stored(&self, poll: &InternalPoll) -> StoredPoll {
        let mut counts: HashMap<OptionId, i64> = HashMap::new();
        for vote in self.votes.iter().filter(|vote| vote.poll_id == poll.id) {
            *counts.entry(vote.option_id).or_insert(0) += 1;
        }
        let mut options: Vec<InternalOption> = self
            .options
            .get(&poll.id)
            .into_iter()
            .flatten()
            .map(|(id, text, position)| InternalOption {
                id: *id,
                poll_id: poll.id,
                text: text.clone(),
                position: *position,
                votes: counts.get(id).copied().unwrap_or(0),
            })
            .collect();
        options.sort_by_key(|option| option.position);
        StoredPoll {
            poll: poll.clone(),
            options,
        }
    }
}

/// In-process [`PollStore`].
///
/// Every operation runs under a single lock, which makes poll creation
/// all-or-nothing and vote insertion an atomic insert-if-absent.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn create_poll(&self, poll: NewPollRecord) -> Result<StoredPoll, StoreError> {
        let mut tables = self.tables.write().await;
        let stored = InternalPoll {
            id: poll.id,
            title: poll.title,
            description: poll.description,
            created_by: poll.created_by,
            created_at: Utc::now(),
        };
        let options = poll
            .options
            .into_iter()
            .map(|option| (option.id, option.text, option.position))
            .collect();
        tables.options.insert(stored.id, options);
        tables.polls.push(stored.clone());
        debug!(poll_id = %stored.id, "Poll stored in memory");
        Ok(tables.stored(&stored))
    }

    async fn polls(&self) -> Result<Vec<StoredPoll>, StoreError> {
        let tables = self.tables.read().await;
        let mut polls: Vec<&InternalPoll> = tables.polls.iter().rev().collect();
        // stable sort keeps later insertions first among equal timestamps
        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(polls.into_iter().map(|poll| tables.stored(poll)).collect())
    }

    async fn poll_by_id(&self, id: &PollId) -> Result<Option<StoredPoll>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .polls
            .iter()
            .find(|poll| poll.id == *id)
            .map(|poll| tables.stored(poll)))
    }

    async fn insert_vote(&self, vote: NewVote) -> Result<InternalVote, StoreError> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .options
            .get(&vote.poll_id)
            .map_or(false, |options| {
                options.iter().any(|(id, _, _)| *id == vote.option_id)
            });
        if !owned {
            return Err(StoreError::ForeignKeyViolation);
        }
        if !tables.voters.insert((vote.poll_id, vote.user_id.clone())) {
            return Err(StoreError::UniqueViolation);
        }
        let vote = InternalVote {
            id: vote.id,
            poll_id: vote.poll_id,
            option_id: vote.option_id,
            user_id: vote.user_id,
            created_at: Utc::now(),
        };
        tables.votes.push(vote.clone());
        Ok(vote)
    }

    async fn vote_for_user(
        &self,
        poll_id: &PollId,
        user_id: &UserId,
    ) -> Result<Option<InternalVote>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .votes
            .iter()
            .find(|vote| vote.poll_id == *poll_id && vote.user_id == *user_id)
            .cloned())
    }
}
