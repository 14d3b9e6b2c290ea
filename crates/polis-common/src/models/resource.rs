//! Votable resources — rules and initiatives — and their derived voting result.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::Status;

/// Whether a resource offers extra options and whether picking one is
/// needed for a full approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum ExtraOptions {
    #[default]
    None,
    /// Options are offered; leaving them undecided yields a principal agreement.
    Optional,
    /// Options are offered; leaving them undecided blocks the decision.
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum ResourceKind {
    Rule,
    Initiative,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Rule => "rule",
            ResourceKind::Initiative => "initiative",
        }
    }
}

/// Shared capability of everything the outcome state machine drives.
pub trait Votable {
    fn id(&self) -> Uuid;
    fn community_id(&self) -> Uuid;
    fn status(&self) -> Status;
    fn set_status(&mut self, status: Status);

    /// Status reached on a clean approval.
    fn approved_status(&self) -> Status;
    /// Status an approved item falls back to when support is lost.
    fn revoked_status(&self) -> Status;

    fn extra_options(&self) -> ExtraOptions {
        ExtraOptions::None
    }

    fn is_multi_select(&self) -> bool {
        false
    }

    /// Whether a noncompliance consequence must be chosen for approval.
    fn requires_noncompliance(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: Uuid,
    pub community_id: Uuid,
    pub category_id: Uuid,
    /// Category the rule had before its category was de-selected.
    pub prior_category_id: Option<Uuid>,
    pub status: Status,
    pub extra_options: ExtraOptions,
    pub is_multi_select: bool,
    /// Candidate consequences for breaking the rule
    pub noncompliance: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initiative {
    pub id: Uuid,
    pub community_id: Uuid,
    pub category_id: Uuid,
    pub prior_category_id: Option<Uuid>,
    pub status: Status,
    pub extra_options: ExtraOptions,
    pub is_multi_select: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    Rule(Rule),
    Initiative(Initiative),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Rule(_) => ResourceKind::Rule,
            Resource::Initiative(_) => ResourceKind::Initiative,
        }
    }

    pub fn category_id(&self) -> Uuid {
        match self {
            Resource::Rule(rule) => rule.category_id,
            Resource::Initiative(initiative) => initiative.category_id,
        }
    }

    pub fn prior_category_id(&self) -> Option<Uuid> {
        match self {
            Resource::Rule(rule) => rule.prior_category_id,
            Resource::Initiative(initiative) => initiative.prior_category_id,
        }
    }

    /// Move the resource to `category_id`, remembering where it came from.
    pub fn set_category(&mut self, category_id: Uuid, prior_category_id: Option<Uuid>) {
        let (category, prior) = match self {
            Resource::Rule(rule) => (&mut rule.category_id, &mut rule.prior_category_id),
            Resource::Initiative(initiative) => (
                &mut initiative.category_id,
                &mut initiative.prior_category_id,
            ),
        };
        *category = category_id;
        *prior = prior_category_id;
    }
}

impl Votable for Resource {
    fn id(&self) -> Uuid {
        match self {
            Resource::Rule(rule) => rule.id,
            Resource::Initiative(initiative) => initiative.id,
        }
    }

    fn community_id(&self) -> Uuid {
        match self {
            Resource::Rule(rule) => rule.community_id,
            Resource::Initiative(initiative) => initiative.community_id,
        }
    }

    fn status(&self) -> Status {
        match self {
            Resource::Rule(rule) => rule.status,
            Resource::Initiative(initiative) => initiative.status,
        }
    }

    fn set_status(&mut self, status: Status) {
        match self {
            Resource::Rule(rule) => rule.status = status,
            Resource::Initiative(initiative) => initiative.status = status,
        }
    }

    fn approved_status(&self) -> Status {
        match self {
            Resource::Rule(_) => Status::RuleApproved,
            Resource::Initiative(_) => Status::InitiativeApproved,
        }
    }

    fn revoked_status(&self) -> Status {
        match self {
            Resource::Rule(_) => Status::RuleRevoked,
            Resource::Initiative(_) => Status::InitiativeRevoked,
        }
    }

    fn extra_options(&self) -> ExtraOptions {
        match self {
            Resource::Rule(rule) => rule.extra_options,
            Resource::Initiative(initiative) => initiative.extra_options,
        }
    }

    fn is_multi_select(&self) -> bool {
        match self {
            Resource::Rule(rule) => rule.is_multi_select,
            Resource::Initiative(initiative) => initiative.is_multi_select,
        }
    }

    fn requires_noncompliance(&self) -> bool {
        match self {
            Resource::Rule(rule) => !rule.noncompliance.is_empty(),
            Resource::Initiative(_) => false,
        }
    }
}

/// Derived outcome of a resource's vote. One per resource.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VotingResult {
    pub id: Uuid,
    pub resource_id: Uuid,

    /// `Some(true)` approved, `Some(false)` rejected with quorum, `None` undecided
    pub vote: Option<bool>,
    pub is_significant_minority: bool,
    pub is_noncompliance_minority: bool,

    pub selected_options: Vec<Uuid>,
    pub minority_options: Vec<Uuid>,
    pub selected_noncompliance: Vec<Uuid>,
    pub minority_noncompliance: Vec<Uuid>,
}

impl VotingResult {
    pub fn new(id: Uuid, resource_id: Uuid) -> Self {
        Self {
            id,
            resource_id,
            ..Default::default()
        }
    }

    pub fn clear_options(&mut self) {
        self.is_significant_minority = false;
        self.selected_options.clear();
        self.minority_options.clear();
    }

    pub fn clear_noncompliance(&mut self) {
        self.is_noncompliance_minority = false;
        self.selected_noncompliance.clear();
        self.minority_noncompliance.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> Resource {
        Resource::Rule(Rule {
            id: Uuid::now_v7(),
            community_id: Uuid::now_v7(),
            category_id: Uuid::now_v7(),
            prior_category_id: None,
            status: Status::OnConsideration,
            extra_options: ExtraOptions::None,
            is_multi_select: false,
            noncompliance: vec![Uuid::now_v7()],
        })
    }

    #[test]
    fn test_rule_status_pair() {
        let resource = rule();
        assert_eq!(resource.approved_status(), Status::RuleApproved);
        assert_eq!(resource.revoked_status(), Status::RuleRevoked);
        assert!(resource.requires_noncompliance());
    }

    #[test]
    fn test_set_category_remembers_prior() {
        let mut resource = rule();
        let original = resource.category_id();
        let system = Uuid::now_v7();
        resource.set_category(system, Some(original));
        assert_eq!(resource.category_id(), system);
        assert_eq!(resource.prior_category_id(), Some(original));
    }
}
