//! Vote tally — yes / no / abstain counts over the unblocked ballots of a
//! resource (or the unblocked child requests of a membership request).
//!
//! Percentages are taken over every counted voter, abstentions included, and
//! rounded to the nearest integer. An empty tally reports 0 everywhere.

use polis_common::models::{RequestMember, UserVotingResult};
use serde::Serialize;

use crate::thresholds::{Thresholds, round_half_up};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Tally {
    pub yes: u32,
    pub no: u32,
    pub abstain: u32,
}

impl Tally {
    pub fn from_votes(votes: impl IntoIterator<Item = Option<bool>>) -> Self {
        votes.into_iter().fold(Tally::default(), |mut tally, vote| {
            match vote {
                Some(true) => tally.yes += 1,
                Some(false) => tally.no += 1,
                None => tally.abstain += 1,
            }
            tally
        })
    }

    pub fn from_ballots(ballots: &[UserVotingResult]) -> Self {
        Self::from_votes(ballots.iter().filter(|b| !b.is_blocked).map(|b| b.vote))
    }

    pub fn from_requests(children: &[RequestMember]) -> Self {
        Self::from_votes(children.iter().filter(|r| !r.is_blocked).map(|r| r.vote))
    }

    /// Number of eligible voters.
    pub fn total(&self) -> u32 {
        self.yes + self.no + self.abstain
    }

    fn percent(&self, count: u32) -> i32 {
        match self.total() {
            0 => 0,
            total => round_half_up(count as f64 * 100.0 / total as f64),
        }
    }

    pub fn yes_percent(&self) -> i32 {
        self.percent(self.yes)
    }

    pub fn no_percent(&self) -> i32 {
        self.percent(self.no)
    }

    pub fn abstain_percent(&self) -> i32 {
        self.percent(self.abstain)
    }

    /// Participation: the rounded yes and no percentages added up.
    pub fn quorum_percent(&self) -> i32 {
        self.yes_percent() + self.no_percent()
    }

    /// Quorum check. A tally without eligible voters never reaches quorum,
    /// whatever the threshold.
    pub fn has_quorum(&self, thresholds: &Thresholds) -> bool {
        self.total() > 0 && self.quorum_percent() >= thresholds.quorum
    }

    pub fn has_decision(&self, thresholds: &Thresholds) -> bool {
        self.yes_percent() >= thresholds.vote
    }

    pub fn passes(&self, thresholds: &Thresholds) -> bool {
        self.has_quorum(thresholds) && self.has_decision(thresholds)
    }

    /// Derived vote: `Some(true)` approved, `Some(false)` rejected with
    /// quorum, `None` no quorum.
    pub fn verdict_vote(&self, thresholds: &Thresholds) -> Option<bool> {
        if !self.has_quorum(thresholds) {
            None
        } else {
            Some(self.has_decision(thresholds))
        }
    }
}
