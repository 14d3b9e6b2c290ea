//! Ballot model — one member's vote on one resource (a `UserVotingResult`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A member's choice: yes / no / abstain plus any picked options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Choice {
    /// `None` is an abstention
    pub vote: Option<bool>,
    pub options: Vec<Uuid>,
    pub noncompliance: Vec<Uuid>,
}

impl Choice {
    pub fn yes() -> Self {
        Self {
            vote: Some(true),
            ..Default::default()
        }
    }

    pub fn no() -> Self {
        Self {
            vote: Some(false),
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: Vec<Uuid>) -> Self {
        self.options = options;
        self
    }

    pub fn with_noncompliance(mut self, noncompliance: Vec<Uuid>) -> Self {
        self.noncompliance = noncompliance;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserVotingResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub resource_id: Uuid,
    pub community_id: Uuid,

    pub vote: Option<bool>,
    pub options: Vec<Uuid>,
    pub noncompliance: Vec<Uuid>,

    pub is_blocked: bool,
    /// Cast directly by the member rather than received from a delegate
    pub is_voted_myself: bool,

    pub updated_at: DateTime<Utc>,
}

impl UserVotingResult {
    pub fn choice(&self) -> Choice {
        Choice {
            vote: self.vote,
            options: self.options.clone(),
            noncompliance: self.noncompliance.clone(),
        }
    }

    pub fn apply(&mut self, choice: Choice) {
        self.vote = choice.vote;
        self.options = choice.options;
        self.noncompliance = choice.noncompliance;
        self.updated_at = Utc::now();
    }
}
