//! Community models — the consolidated community settings and each member's
//! personal preferences they are derived from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Snapshot of the thresholds a community's last full recount ran with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VotingParams {
    pub quorum: i32,
    pub vote: i32,
    pub significant_minority: i32,
}

/// The canonical, consensus-derived state of a community.
///
/// Written only by the settings consolidator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunitySettings {
    pub id: Uuid,
    pub community_id: Uuid,

    /// Participation percentage required before a decision counts (0-100)
    pub quorum: i32,
    /// "Yes" percentage required for approval (0-100)
    pub vote: i32,
    /// Share of losing support that turns an approval into a compromise (0-100)
    pub significant_minority: i32,

    /// Days between approval and entry into force
    pub decision_delay: i32,
    /// Days during which a decision can be disputed
    pub dispute_time_limit: i32,

    pub is_secret_ballot: bool,
    pub is_can_offer: bool,
    pub is_minority_not_participate: bool,
    pub is_workgroup: bool,
    pub workgroup: i32,

    pub name_id: Option<Uuid>,
    pub description_id: Option<Uuid>,
    pub categories: Vec<Uuid>,
    pub sub_communities: Vec<Uuid>,
    pub responsibilities: Vec<Uuid>,

    pub last_voting_params: Option<VotingParams>,
    pub updated_at: DateTime<Utc>,
}

impl CommunitySettings {
    /// Fresh settings for a community nobody has expressed preferences for yet.
    pub fn empty(id: Uuid, community_id: Uuid) -> Self {
        Self {
            id,
            community_id,
            quorum: 0,
            vote: 0,
            significant_minority: 0,
            decision_delay: 0,
            dispute_time_limit: 0,
            is_secret_ballot: false,
            is_can_offer: false,
            is_minority_not_participate: false,
            is_workgroup: false,
            workgroup: 0,
            name_id: None,
            description_id: None,
            categories: Vec::new(),
            sub_communities: Vec::new(),
            responsibilities: Vec::new(),
            last_voting_params: None,
            updated_at: Utc::now(),
        }
    }

    pub fn voting_params(&self) -> VotingParams {
        VotingParams {
            quorum: self.quorum,
            vote: self.vote,
            significant_minority: self.significant_minority,
        }
    }
}

/// One member's personal preferences within one community.
///
/// `is_blocked` removes the member from every aggregation without deleting
/// their history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UserCommunitySettings {
    pub id: Uuid,
    pub user_id: Uuid,
    pub community_id: Uuid,

    #[validate(range(min = 0, max = 100, message = "quorum must be within 0-100"))]
    pub quorum: i32,
    #[validate(range(min = 0, max = 100, message = "vote must be within 0-100"))]
    pub vote: i32,
    #[validate(range(min = 0, max = 100, message = "significant minority must be within 0-100"))]
    pub significant_minority: i32,
    #[validate(range(min = 0, message = "decision delay cannot be negative"))]
    pub decision_delay: i32,
    #[validate(range(min = 0, message = "dispute time limit cannot be negative"))]
    pub dispute_time_limit: i32,

    pub is_secret_ballot: bool,
    pub is_can_offer: bool,
    pub is_minority_not_participate: bool,
    pub is_workgroup: bool,
    #[validate(range(min = 0, message = "workgroup size cannot be negative"))]
    pub workgroup: i32,

    /// Preferred community name
    pub name_id: Option<Uuid>,
    /// Preferred community description
    pub description_id: Option<Uuid>,
    pub categories: Vec<Uuid>,
    pub sub_communities: Vec<Uuid>,
    pub responsibilities: Vec<Uuid>,

    pub is_blocked: bool,
    /// Member refuses to act as anyone's delegate
    pub is_not_delegate: bool,
    /// Vote "yes" by default on requests to join the community
    pub is_default_add_member: bool,

    pub created_at: DateTime<Utc>,
}

impl UserCommunitySettings {
    /// New member row seeded with the community's current consolidated
    /// settings, so a newcomer does not shift any median on arrival.
    pub fn seeded_from(id: Uuid, user_id: Uuid, settings: &CommunitySettings) -> Self {
        Self {
            id,
            user_id,
            community_id: settings.community_id,
            quorum: settings.quorum,
            vote: settings.vote,
            significant_minority: settings.significant_minority,
            decision_delay: settings.decision_delay,
            dispute_time_limit: settings.dispute_time_limit,
            is_secret_ballot: settings.is_secret_ballot,
            is_can_offer: settings.is_can_offer,
            is_minority_not_participate: settings.is_minority_not_participate,
            is_workgroup: settings.is_workgroup,
            workgroup: settings.workgroup,
            name_id: settings.name_id,
            description_id: settings.description_id,
            categories: settings.categories.clone(),
            sub_communities: settings.sub_communities.clone(),
            responsibilities: settings.responsibilities.clone(),
            is_blocked: false,
            is_not_delegate: false,
            is_default_add_member: false,
            created_at: Utc::now(),
        }
    }
}
