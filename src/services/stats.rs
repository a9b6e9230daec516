use super::{
    poll::{list_polls, Poll},
    tally,
};
use crate::{
    db::{poll::PollId, PollStore},
    error::PollError,
};
use serde::Serialize;
use tracing::instrument;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PopularPoll {
    pub id: PollId,
    pub title: String,
    pub total_votes: i64,
}

/// Dashboard summary across all polls.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PollStats {
    pub total_polls: i64,
    pub total_votes: i64,
    pub average_votes: i64,
    pub most_popular: Option<PopularPoll>,
}

impl PollStats {
    /// `polls` in list order; ties for most votes go to the earliest listed.
    pub fn from_polls(polls: &[Poll]) -> Self {
        let total_polls = polls.len() as i64;
        let total_votes = tally::total(polls.iter().map(|poll| poll.total_votes));
        let most_popular = polls
            .iter()
            .fold(None, |best: Option<&Poll>, poll| match best {
                Some(best) if best.total_votes >= poll.total_votes => Some(best),
                _ => Some(poll),
            })
            .map(|poll| PopularPoll {
                id: poll.id,
                title: poll.title.clone(),
                total_votes: poll.total_votes,
            });

        Self {
            total_polls,
            total_votes,
            average_votes: tally::average(total_votes, total_polls),
            most_popular,
        }
    }
}

#[instrument(skip(store))]
pub async fn poll_stats(store: &dyn PollStore) -> Result<PollStats, PollError> {
    let polls = list_polls(store).await?;
    Ok(PollStats::from_polls(&polls))
}
