use crate::{
    db::{
        poll::PollId,
        poll_option::OptionId,
        user::UserId,
        vote::{InternalVote, NewVote, VoteId},
        PollStore, StoreError,
    },
    error::{PollError, ValidationErrors},
};
use tracing::{debug, info, instrument, warn};

/// Records `user_id`'s single vote on `poll_id`.
///
/// There is no "has this user voted" pre-check: the store inserts only if no
/// vote exists for the pair, so of several concurrent attempts exactly one
/// succeeds and the rest get [`PollError::VoteConflict`].
#[instrument(skip(store))]
pub async fn cast_vote(
    store: &dyn PollStore,
    poll_id: &PollId,
    option_id: &OptionId,
    user_id: &UserId,
) -> Result<InternalVote, PollError> {
    let poll = store.poll_by_id(poll_id).await?.ok_or(PollError::NotFound)?;

    if !poll.options.iter().any(|option| option.id == *option_id) {
        debug!("Option is not part of this poll");
        return Err(option_mismatch().into());
    }

    let vote = NewVote {
        id: VoteId::new(),
        poll_id: *poll_id,
        option_id: *option_id,
        user_id: user_id.clone(),
    };
    match store.insert_vote(vote).await {
        Ok(vote) => {
            info!(vote_id = ?vote.id, "Vote recorded");
            Ok(vote)
        }
        Err(StoreError::UniqueViolation) => {
            warn!("User has already voted in this poll");
            Err(PollError::VoteConflict)
        }
        Err(StoreError::ForeignKeyViolation) => Err(option_mismatch().into()),
        Err(err) => Err(PollError::Storage(err)),
    }
}

#[instrument(skip(store))]
pub async fn has_voted(
    store: &dyn PollStore,
    poll_id: &PollId,
    user_id: &UserId,
) -> Result<bool, PollError> {
    Ok(store.vote_for_user(poll_id, user_id).await?.is_some())
}

fn option_mismatch() -> ValidationErrors {
    ValidationErrors::single("optionId", "Option does not belong to this poll")
}
