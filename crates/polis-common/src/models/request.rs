//! Membership request model.
//!
//! A root request (`parent_id = None`) concerns one subject member and fans
//! out into one child request per member of the target community. A child
//! may itself act as a root for a sub-community, in which case its vote is
//! derived from its own children.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::resource::Votable;
use super::status::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum RequestKind {
    /// Admit the subject to the community
    Join,
    /// Exclude the subject from the community
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMember {
    pub id: Uuid,
    pub community_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub kind: RequestKind,

    /// Member the request is about
    pub member_id: Uuid,
    /// Member whose vote this child carries (`None` on roots)
    pub voter_id: Option<Uuid>,

    pub vote: Option<bool>,
    pub is_blocked: bool,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

impl RequestMember {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Status a child request shows for its current vote.
    pub fn child_status(vote: Option<bool>) -> Status {
        match vote {
            Some(_) => Status::Voted,
            None => Status::OnConsideration,
        }
    }

    /// Whether `status` admits the subject into the community.
    pub fn admits(&self, status: Status) -> Option<bool> {
        match (self.kind, status) {
            (RequestKind::Join, Status::CommunityMember)
            | (RequestKind::Exclude, Status::RequestDenied) => Some(true),
            (RequestKind::Join, Status::MemberExcluded)
            | (RequestKind::Exclude, Status::RequestSuccessful) => Some(false),
            _ => None,
        }
    }
}

impl Votable for RequestMember {
    fn id(&self) -> Uuid {
        self.id
    }

    fn community_id(&self) -> Uuid {
        self.community_id
    }

    fn status(&self) -> Status {
        self.status
    }

    fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    fn approved_status(&self) -> Status {
        match self.kind {
            RequestKind::Join => Status::CommunityMember,
            RequestKind::Exclude => Status::RequestSuccessful,
        }
    }

    fn revoked_status(&self) -> Status {
        match self.kind {
            RequestKind::Join => Status::MemberExcluded,
            RequestKind::Exclude => Status::RequestDenied,
        }
    }
}
