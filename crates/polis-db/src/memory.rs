//! In-process store.
//!
//! Backs tests and single-process "lite" deployments. Savepoints snapshot the
//! whole state, so rolling back to one restores every table at once.

use std::collections::HashSet;

use async_trait::async_trait;
use polis_common::error::{PolisError, PolisResult};
use polis_common::models::{
    Category, CommunityDescription, CommunityName, CommunitySettings, DelegateSettings,
    RequestMember, Resource, Responsibility, UserCommunitySettings, UserVotingResult, Votable,
    VotingResult,
};
use polis_common::store::Store;
use uuid::Uuid;

/// Every table of the in-process store, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub categories: Vec<Category>,
    pub responsibilities: Vec<Responsibility>,
    pub names: Vec<CommunityName>,
    pub descriptions: Vec<CommunityDescription>,
    pub community_settings: Vec<CommunitySettings>,
    pub member_settings: Vec<UserCommunitySettings>,
    pub resources: Vec<Resource>,
    pub voting_results: Vec<VotingResult>,
    pub ballots: Vec<UserVotingResult>,
    pub delegations: Vec<DelegateSettings>,
    pub requests: Vec<RequestMember>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: MemoryState,
    savepoints: Vec<(String, MemoryState)>,
    failing: HashSet<Uuid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &MemoryState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MemoryState {
        &mut self.state
    }

    /// Make every write to the resource (its row or its voting result) fail.
    pub fn fail_writes_for(&mut self, resource_id: Uuid) {
        self.failing.insert(resource_id);
    }

    fn check_writable(&self, resource_id: Uuid) -> PolisResult<()> {
        if self.failing.contains(&resource_id) {
            return Err(PolisError::Internal(anyhow::anyhow!(
                "write to resource {resource_id} rejected"
            )));
        }
        Ok(())
    }

    pub fn insert_category(&mut self, category: Category) {
        self.state.categories.push(category);
    }

    pub fn insert_responsibility(&mut self, responsibility: Responsibility) {
        self.state.responsibilities.push(responsibility);
    }

    pub fn insert_name(&mut self, name: CommunityName) {
        self.state.names.push(name);
    }

    pub fn insert_description(&mut self, description: CommunityDescription) {
        self.state.descriptions.push(description);
    }

    pub fn insert_community_settings(&mut self, settings: CommunitySettings) {
        self.state.community_settings.push(settings);
    }

    pub fn insert_member_settings(&mut self, settings: UserCommunitySettings) {
        self.state.member_settings.push(settings);
    }

    pub fn insert_resource(&mut self, resource: Resource) {
        self.state.resources.push(resource);
    }

    pub fn insert_voting_result(&mut self, result: VotingResult) {
        self.state.voting_results.push(result);
    }

    pub fn insert_ballot(&mut self, ballot: UserVotingResult) {
        self.state.ballots.push(ballot);
    }

    pub fn insert_delegation(&mut self, delegation: DelegateSettings) {
        self.state.delegations.push(delegation);
    }

    pub fn insert_request(&mut self, request: RequestMember) {
        self.state.requests.push(request);
    }
}

/// Replace the element matching `same` or report it missing.
fn replace<T: Clone>(
    rows: &mut [T],
    value: &T,
    what: &str,
    same: impl Fn(&T) -> bool,
) -> PolisResult<()> {
    match rows.iter_mut().find(|row| same(row)) {
        Some(row) => {
            *row = value.clone();
            Ok(())
        }
        None => Err(PolisError::not_found(what)),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn system_category(&mut self) -> PolisResult<Option<Category>> {
        Ok(self.state.categories.iter().find(|c| c.is_system).cloned())
    }

    async fn category(&mut self, id: Uuid) -> PolisResult<Option<Category>> {
        Ok(self.state.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn responsibility(&mut self, id: Uuid) -> PolisResult<Option<Responsibility>> {
        Ok(self.state.responsibilities.iter().find(|r| r.id == id).cloned())
    }

    async fn community_name(&mut self, id: Uuid) -> PolisResult<Option<CommunityName>> {
        Ok(self.state.names.iter().find(|n| n.id == id).cloned())
    }

    async fn community_description(
        &mut self,
        id: Uuid,
    ) -> PolisResult<Option<CommunityDescription>> {
        Ok(self.state.descriptions.iter().find(|d| d.id == id).cloned())
    }

    async fn community_settings(
        &mut self,
        community_id: Uuid,
    ) -> PolisResult<Option<CommunitySettings>> {
        Ok(self
            .state
            .community_settings
            .iter()
            .find(|s| s.community_id == community_id)
            .cloned())
    }

    async fn update_community_settings(
        &mut self,
        settings: &CommunitySettings,
    ) -> PolisResult<()> {
        replace(
            &mut self.state.community_settings,
            settings,
            "Community settings",
            |s| s.id == settings.id,
        )
    }

    async fn list_member_settings(
        &mut self,
        community_id: Uuid,
    ) -> PolisResult<Vec<UserCommunitySettings>> {
        Ok(self
            .state
            .member_settings
            .iter()
            .filter(|s| s.community_id == community_id)
            .cloned()
            .collect())
    }

    async fn find_member_settings(
        &mut self,
        user_id: Uuid,
        community_id: Uuid,
    ) -> PolisResult<Option<UserCommunitySettings>> {
        Ok(self
            .state
            .member_settings
            .iter()
            .find(|s| s.user_id == user_id && s.community_id == community_id)
            .cloned())
    }

    async fn create_member_settings(
        &mut self,
        settings: &UserCommunitySettings,
    ) -> PolisResult<()> {
        let exists = self
            .state
            .member_settings
            .iter()
            .any(|s| s.user_id == settings.user_id && s.community_id == settings.community_id);
        if exists {
            return self.update_member_settings(settings).await;
        }
        self.state.member_settings.push(settings.clone());
        Ok(())
    }

    async fn update_member_settings(
        &mut self,
        settings: &UserCommunitySettings,
    ) -> PolisResult<()> {
        replace(
            &mut self.state.member_settings,
            settings,
            "Member settings",
            |s| s.user_id == settings.user_id && s.community_id == settings.community_id,
        )
    }

    async fn list_resources(&mut self, community_id: Uuid) -> PolisResult<Vec<Resource>> {
        Ok(self
            .state
            .resources
            .iter()
            .filter(|r| r.community_id() == community_id)
            .cloned()
            .collect())
    }

    async fn find_resource(&mut self, id: Uuid) -> PolisResult<Option<Resource>> {
        Ok(self.state.resources.iter().find(|r| r.id() == id).cloned())
    }

    async fn update_resource(&mut self, resource: &Resource) -> PolisResult<()> {
        self.check_writable(resource.id())?;
        replace(&mut self.state.resources, resource, "Resource", |r| {
            r.id() == resource.id()
        })
    }

    async fn voting_result(&mut self, resource_id: Uuid) -> PolisResult<Option<VotingResult>> {
        Ok(self
            .state
            .voting_results
            .iter()
            .find(|v| v.resource_id == resource_id)
            .cloned())
    }

    async fn create_voting_result(&mut self, result: &VotingResult) -> PolisResult<()> {
        let exists = self
            .state
            .voting_results
            .iter()
            .any(|v| v.resource_id == result.resource_id);
        if !exists {
            self.state.voting_results.push(result.clone());
        }
        Ok(())
    }

    async fn update_voting_result(&mut self, result: &VotingResult) -> PolisResult<()> {
        self.check_writable(result.resource_id)?;
        replace(&mut self.state.voting_results, result, "Voting result", |v| {
            v.id == result.id
        })
    }

    async fn list_ballots(&mut self, resource_id: Uuid) -> PolisResult<Vec<UserVotingResult>> {
        Ok(self
            .state
            .ballots
            .iter()
            .filter(|b| b.resource_id == resource_id)
            .cloned()
            .collect())
    }

    async fn find_ballot(&mut self, id: Uuid) -> PolisResult<Option<UserVotingResult>> {
        Ok(self.state.ballots.iter().find(|b| b.id == id).cloned())
    }

    async fn find_member_ballot(
        &mut self,
        user_id: Uuid,
        resource_id: Uuid,
    ) -> PolisResult<Option<UserVotingResult>> {
        Ok(self
            .state
            .ballots
            .iter()
            .find(|b| b.user_id == user_id && b.resource_id == resource_id)
            .cloned())
    }

    async fn create_ballot(&mut self, ballot: &UserVotingResult) -> PolisResult<()> {
        let exists = self
            .state
            .ballots
            .iter()
            .any(|b| b.user_id == ballot.user_id && b.resource_id == ballot.resource_id);
        if !exists {
            self.state.ballots.push(ballot.clone());
        }
        Ok(())
    }

    async fn update_ballot(&mut self, ballot: &UserVotingResult) -> PolisResult<()> {
        replace(&mut self.state.ballots, ballot, "Ballot", |b| b.id == ballot.id)
    }

    async fn set_member_ballots_blocked(
        &mut self,
        user_id: Uuid,
        community_id: Uuid,
        is_blocked: bool,
    ) -> PolisResult<u64> {
        let mut touched = 0;
        for ballot in self.state.ballots.iter_mut().filter(|b| {
            b.user_id == user_id && b.community_id == community_id && b.is_blocked != is_blocked
        }) {
            ballot.is_blocked = is_blocked;
            touched += 1;
        }
        Ok(touched)
    }

    async fn list_delegations_by_delegate(
        &mut self,
        delegate_id: Uuid,
        community_id: Uuid,
        category_id: Uuid,
    ) -> PolisResult<Vec<DelegateSettings>> {
        Ok(self
            .state
            .delegations
            .iter()
            .filter(|d| {
                d.delegate_id == delegate_id
                    && d.community_id == community_id
                    && d.category_id == category_id
            })
            .cloned()
            .collect())
    }

    async fn find_delegation_for_principal(
        &mut self,
        principal_id: Uuid,
        community_id: Uuid,
        category_id: Uuid,
    ) -> PolisResult<Option<DelegateSettings>> {
        Ok(self
            .state
            .delegations
            .iter()
            .find(|d| {
                d.principals.contains(&principal_id)
                    && d.community_id == community_id
                    && d.category_id == category_id
            })
            .cloned())
    }

    async fn find_request(&mut self, id: Uuid) -> PolisResult<Option<RequestMember>> {
        Ok(self.state.requests.iter().find(|r| r.id == id).cloned())
    }

    async fn list_child_requests(&mut self, parent_id: Uuid) -> PolisResult<Vec<RequestMember>> {
        Ok(self
            .state
            .requests
            .iter()
            .filter(|r| r.parent_id == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn list_root_requests(&mut self, community_id: Uuid) -> PolisResult<Vec<RequestMember>> {
        Ok(self
            .state
            .requests
            .iter()
            .filter(|r| r.community_id == community_id && r.is_root())
            .cloned()
            .collect())
    }

    async fn create_request(&mut self, request: &RequestMember) -> PolisResult<()> {
        self.state.requests.push(request.clone());
        Ok(())
    }

    async fn update_request(&mut self, request: &RequestMember) -> PolisResult<()> {
        replace(&mut self.state.requests, request, "Membership request", |r| {
            r.id == request.id
        })
    }

    async fn set_member_requests_blocked(
        &mut self,
        voter_id: Uuid,
        community_id: Uuid,
        is_blocked: bool,
    ) -> PolisResult<u64> {
        let mut touched = 0;
        for request in self.state.requests.iter_mut().filter(|r| {
            r.voter_id == Some(voter_id)
                && r.member_id != voter_id
                && r.community_id == community_id
                && r.is_blocked != is_blocked
        }) {
            request.is_blocked = is_blocked;
            touched += 1;
        }
        Ok(touched)
    }

    async fn savepoint(&mut self, name: &str) -> PolisResult<()> {
        self.savepoints.push((name.to_string(), self.state.clone()));
        Ok(())
    }

    async fn release_savepoint(&mut self, name: &str) -> PolisResult<()> {
        let position = self
            .savepoints
            .iter()
            .rposition(|(n, _)| n == name)
            .ok_or_else(|| PolisError::not_found(format!("Savepoint {name}")))?;
        self.savepoints.truncate(position);
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> PolisResult<()> {
        let position = self
            .savepoints
            .iter()
            .rposition(|(n, _)| n == name)
            .ok_or_else(|| PolisError::not_found(format!("Savepoint {name}")))?;
        // Like SQL, the savepoint itself survives a rollback to it.
        self.savepoints.truncate(position + 1);
        self.state = self.savepoints[position].1.clone();
        Ok(())
    }
}
