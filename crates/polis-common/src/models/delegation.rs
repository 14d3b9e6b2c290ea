//! Delegation model — liquid-democracy vote delegation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Grants `delegate_id` the right to vote on behalf of `principals` within
/// one (community, category) scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegateSettings {
    pub id: Uuid,
    pub delegate_id: Uuid,
    pub community_id: Uuid,
    pub category_id: Uuid,
    pub principals: Vec<Uuid>,
}
