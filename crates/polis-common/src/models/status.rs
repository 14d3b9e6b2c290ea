//! Status — the state-machine alphabet shared by rules, initiatives and
//! membership requests.
//!
//! Stored as its code string (`RULE_APPROVED`, …). Parsing an unknown code is
//! an error rather than a silent fallback, so a status row added to the
//! database without a matching variant is caught at load time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PolisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    OnConsideration,
    RuleApproved,
    RuleRevoked,
    InitiativeApproved,
    InitiativeRevoked,
    /// Approved, but a significant minority backed other options.
    Compromise,
    /// Approved in principle; optional options were left undecided.
    PrincipalAgreement,
    CommunityMember,
    MemberExcluded,
    RequestSuccessful,
    RequestDenied,
    /// Child membership request that carries a vote.
    Voted,
}

impl Status {
    pub const ALL: [Status; 12] = [
        Status::OnConsideration,
        Status::RuleApproved,
        Status::RuleRevoked,
        Status::InitiativeApproved,
        Status::InitiativeRevoked,
        Status::Compromise,
        Status::PrincipalAgreement,
        Status::CommunityMember,
        Status::MemberExcluded,
        Status::RequestSuccessful,
        Status::RequestDenied,
        Status::Voted,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Status::OnConsideration => "ON_CONSIDERATION",
            Status::RuleApproved => "RULE_APPROVED",
            Status::RuleRevoked => "RULE_REVOKED",
            Status::InitiativeApproved => "INITIATIVE_APPROVED",
            Status::InitiativeRevoked => "INITIATIVE_REVOKED",
            Status::Compromise => "COMPROMISE",
            Status::PrincipalAgreement => "PRINCIPAL_AGREEMENT",
            Status::CommunityMember => "COMMUNITY_MEMBER",
            Status::MemberExcluded => "MEMBER_EXCLUDED",
            Status::RequestSuccessful => "REQUEST_SUCCESSFUL",
            Status::RequestDenied => "REQUEST_DENIED",
            Status::Voted => "VOTED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Status {
    type Err = PolisError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .ok_or_else(|| PolisError::missing_reference(format!("status {code}")))
    }
}
