//! Poll and vote semantics on top of a [`PollStore`](crate::db::PollStore).
//!
//! Every operation takes the store handle explicitly and keeps no state of its
//! own between calls, so reads always reflect the latest committed votes.

pub mod poll;
pub mod stats;
pub mod tally;
pub mod vote;

pub use poll::{create_poll, get_poll, list_polls, NewPoll, Poll, PollOption, PollState};
pub use stats::{poll_stats, PollStats};
pub use vote::{cast_vote, has_voted};
