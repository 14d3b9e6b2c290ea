//! Store contract — the unit of work every engine operation runs against.
//!
//! One `Store` value is one transaction. It is handed to engine operations
//! explicitly as `&mut S`, so the transaction boundary is visible at every
//! call site. Nested recount steps use named savepoints inside it.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::PolisResult;
use crate::models::{
    Category, CommunityDescription, CommunityName, CommunitySettings, DelegateSettings,
    RequestMember, Resource, Responsibility, UserCommunitySettings, UserVotingResult,
    VotingResult,
};

#[async_trait]
pub trait Store: Send {
    // === Reference data ===

    /// The category resources fall back to when theirs is de-selected.
    async fn system_category(&mut self) -> PolisResult<Option<Category>>;
    async fn category(&mut self, id: Uuid) -> PolisResult<Option<Category>>;
    async fn responsibility(&mut self, id: Uuid) -> PolisResult<Option<Responsibility>>;
    async fn community_name(&mut self, id: Uuid) -> PolisResult<Option<CommunityName>>;
    async fn community_description(
        &mut self,
        id: Uuid,
    ) -> PolisResult<Option<CommunityDescription>>;

    // === Community ===

    async fn community_settings(
        &mut self,
        community_id: Uuid,
    ) -> PolisResult<Option<CommunitySettings>>;
    async fn update_community_settings(&mut self, settings: &CommunitySettings)
    -> PolisResult<()>;

    /// All member rows of a community, blocked ones included, oldest first.
    async fn list_member_settings(
        &mut self,
        community_id: Uuid,
    ) -> PolisResult<Vec<UserCommunitySettings>>;
    async fn find_member_settings(
        &mut self,
        user_id: Uuid,
        community_id: Uuid,
    ) -> PolisResult<Option<UserCommunitySettings>>;
    async fn create_member_settings(&mut self, settings: &UserCommunitySettings)
    -> PolisResult<()>;
    async fn update_member_settings(&mut self, settings: &UserCommunitySettings)
    -> PolisResult<()>;

    // === Resources ===

    async fn list_resources(&mut self, community_id: Uuid) -> PolisResult<Vec<Resource>>;
    async fn find_resource(&mut self, id: Uuid) -> PolisResult<Option<Resource>>;
    async fn update_resource(&mut self, resource: &Resource) -> PolisResult<()>;

    async fn voting_result(&mut self, resource_id: Uuid) -> PolisResult<Option<VotingResult>>;
    async fn create_voting_result(&mut self, result: &VotingResult) -> PolisResult<()>;
    async fn update_voting_result(&mut self, result: &VotingResult) -> PolisResult<()>;

    // === Ballots ===

    /// Every ballot on a resource, oldest first.
    async fn list_ballots(&mut self, resource_id: Uuid) -> PolisResult<Vec<UserVotingResult>>;
    async fn find_ballot(&mut self, id: Uuid) -> PolisResult<Option<UserVotingResult>>;
    async fn find_member_ballot(
        &mut self,
        user_id: Uuid,
        resource_id: Uuid,
    ) -> PolisResult<Option<UserVotingResult>>;
    async fn create_ballot(&mut self, ballot: &UserVotingResult) -> PolisResult<()>;
    async fn update_ballot(&mut self, ballot: &UserVotingResult) -> PolisResult<()>;
    /// Block or unblock every ballot a member holds in a community.
    /// Returns the number of rows touched.
    async fn set_member_ballots_blocked(
        &mut self,
        user_id: Uuid,
        community_id: Uuid,
        is_blocked: bool,
    ) -> PolisResult<u64>;

    // === Delegation ===

    async fn list_delegations_by_delegate(
        &mut self,
        delegate_id: Uuid,
        community_id: Uuid,
        category_id: Uuid,
    ) -> PolisResult<Vec<DelegateSettings>>;
    async fn find_delegation_for_principal(
        &mut self,
        principal_id: Uuid,
        community_id: Uuid,
        category_id: Uuid,
    ) -> PolisResult<Option<DelegateSettings>>;

    // === Membership requests ===

    async fn find_request(&mut self, id: Uuid) -> PolisResult<Option<RequestMember>>;
    async fn list_child_requests(&mut self, parent_id: Uuid) -> PolisResult<Vec<RequestMember>>;
    async fn list_root_requests(&mut self, community_id: Uuid) -> PolisResult<Vec<RequestMember>>;
    async fn create_request(&mut self, request: &RequestMember) -> PolisResult<()>;
    async fn update_request(&mut self, request: &RequestMember) -> PolisResult<()>;
    /// Block or unblock every child request carrying a member's vote in a
    /// community, except their vote on requests about themselves. Returns
    /// the number of rows touched.
    async fn set_member_requests_blocked(
        &mut self,
        voter_id: Uuid,
        community_id: Uuid,
        is_blocked: bool,
    ) -> PolisResult<u64>;

    // === Savepoints ===

    async fn savepoint(&mut self, name: &str) -> PolisResult<()>;
    async fn release_savepoint(&mut self, name: &str) -> PolisResult<()>;
    async fn rollback_to_savepoint(&mut self, name: &str) -> PolisResult<()>;
}
