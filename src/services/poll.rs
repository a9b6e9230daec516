use super::tally;
use crate::{
    db::{
        poll::{NewPollRecord, PollId},
        poll_option::{NewOptionRecord, OptionId},
        user::UserId,
        PollStore, StoreError, StoredPoll,
    },
    error::{PollError, ValidationErrors},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument};

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PollOption {
    pub id: OptionId,
    pub poll_id: PollId,
    pub text: String,
    pub votes: i64,
    pub percentage: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Poll {
    pub id: PollId,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
    pub options: Vec<PollOption>,
    pub total_votes: i64,
}

/// Observed from the vote count, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollState {
    Created,
    Active,
}

impl Poll {
    pub fn from_db(stored: StoredPoll) -> Self {
        let StoredPoll { poll, options } = stored;
        let total_votes = tally::total(options.iter().map(|option| option.votes));
        Self {
            id: poll.id,
            title: poll.title,
            description: poll.description,
            created_at: poll.created_at,
            created_by: poll.created_by,
            options: options
                .into_iter()
                .map(|option| PollOption {
                    id: option.id,
                    poll_id: poll.id,
                    text: option.text,
                    percentage: tally::percentage(option.votes, total_votes),
                    votes: option.votes,
                })
                .collect(),
            total_votes,
        }
    }

    pub fn state(&self) -> PollState {
        if self.total_votes > 0 {
            PollState::Active
        } else {
            PollState::Created
        }
    }

    pub fn option(&self, id: &OptionId) -> Option<&PollOption> {
        self.options.iter().find(|option| option.id == *id)
    }
}

#[derive(Clone, Debug, Default)]
pub struct NewPoll {
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
}

impl NewPoll {
    pub fn new<T: Into<String>>(
        title: impl Into<String>,
        options: impl IntoIterator<Item = T>,
    ) -> Self {
        Self {
            title: title.into(),
            description: None,
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Trims every field and checks the bounds, collecting every violation.
    pub fn validate(self) -> Result<NewPoll, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = self.title.trim().to_owned();
        if title.is_empty() {
            errors.push("title", "Title is required");
        } else if title.chars().count() > MAX_TITLE_CHARS {
            errors.push("title", "Title too long");
        }

        let description = self
            .description
            .map(|description| description.trim().to_owned())
            .filter(|description| !description.is_empty());
        if let Some(description) = &description {
            if description.chars().count() > MAX_DESCRIPTION_CHARS {
                errors.push("description", "Description too long");
            }
        }

        if self.options.len() < MIN_OPTIONS {
            errors.push("options", "At least 2 options required");
        } else if self.options.len() > MAX_OPTIONS {
            errors.push("options", "Maximum 10 options allowed");
        }
        let options: Vec<String> = self
            .options
            .iter()
            .map(|option| option.trim().to_owned())
            .collect();
        for (index, option) in options.iter().enumerate() {
            if option.is_empty() {
                errors.push(format!("options[{}]", index), "Option cannot be empty");
            }
        }

        if errors.is_empty() {
            Ok(NewPoll {
                title,
                description,
                options,
            })
        } else {
            Err(errors)
        }
    }
}

/// Creates a poll and all of its options as one unit.
///
/// A store that hands back fewer options than were requested is reported as a
/// storage failure rather than returned as a smaller poll.
#[instrument(skip(store, new_poll, creator), fields(creator = %creator))]
pub async fn create_poll(
    store: &dyn PollStore,
    new_poll: NewPoll,
    creator: UserId,
) -> Result<Poll, PollError> {
    let new_poll = new_poll.validate()?;
    let expected = new_poll.options.len();

    let record = NewPollRecord {
        id: PollId::new(),
        title: new_poll.title,
        description: new_poll.description,
        created_by: creator,
        options: new_poll
            .options
            .into_iter()
            .enumerate()
            .map(|(position, text)| NewOptionRecord {
                id: OptionId::new(),
                text,
                position: position as i32,
            })
            .collect(),
    };

    let stored = store.create_poll(record).await?;
    let actual = stored.options.len();
    if actual != expected {
        error!(poll_id = %stored.poll.id, expected, actual, "Poll stored with missing options");
        return Err(StoreError::IncompletePoll { expected, actual }.into());
    }

    info!(poll_id = %stored.poll.id, "Created poll");
    Ok(Poll::from_db(stored))
}

/// Every poll, newest first, with tallies derived from the current votes.
#[instrument(skip(store))]
pub async fn list_polls(store: &dyn PollStore) -> Result<Vec<Poll>, PollError> {
    let polls = store.polls().await?;
    debug!("Listing {} polls", polls.len());
    Ok(polls.into_iter().map(Poll::from_db).collect())
}

/// `Ok(None)` when no poll has this id.
#[instrument(skip(store))]
pub async fn get_poll(store: &dyn PollStore, id: &PollId) -> Result<Option<Poll>, PollError> {
    let poll = store.poll_by_id(id).await?;
    if poll.is_none() {
        debug!("No poll with this id");
    }
    Ok(poll.map(Poll::from_db))
}
