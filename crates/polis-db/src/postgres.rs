//! PostgreSQL unit of work — one transaction implementing [`Store`].

use async_trait::async_trait;
use polis_common::error::{PolisError, PolisResult};
use polis_common::models::{
    Category, CommunityDescription, CommunityName, CommunitySettings, DelegateSettings,
    RequestMember, Resource, Responsibility, UserCommunitySettings, UserVotingResult,
    VotingResult,
};
use polis_common::store::Store;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::repository::{ballots, communities, delegations, reference, requests, resources};

/// Health check — verify the database is reachable.
pub async fn health_check(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

/// A transaction scoped to one trigger invocation.
///
/// Dropping it without calling [`PgUnitOfWork::commit`] rolls everything back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl PgUnitOfWork {
    pub async fn begin(pool: &PgPool) -> PolisResult<Self> {
        Ok(Self {
            tx: pool.begin().await?,
        })
    }

    pub async fn commit(self) -> PolisResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> PolisResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Savepoint names are interpolated into SQL, so only identifiers pass.
fn savepoint_ident(name: &str) -> PolisResult<&str> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(name)
    } else {
        Err(PolisError::Validation {
            message: format!("invalid savepoint name '{name}'"),
        })
    }
}

#[async_trait]
impl Store for PgUnitOfWork {
    async fn system_category(&mut self) -> PolisResult<Option<Category>> {
        Ok(reference::find_system_category(&mut self.tx).await?)
    }

    async fn category(&mut self, id: Uuid) -> PolisResult<Option<Category>> {
        Ok(reference::find_category(&mut self.tx, id).await?)
    }

    async fn responsibility(&mut self, id: Uuid) -> PolisResult<Option<Responsibility>> {
        Ok(reference::find_responsibility(&mut self.tx, id).await?)
    }

    async fn community_name(&mut self, id: Uuid) -> PolisResult<Option<CommunityName>> {
        Ok(reference::find_community_name(&mut self.tx, id).await?)
    }

    async fn community_description(
        &mut self,
        id: Uuid,
    ) -> PolisResult<Option<CommunityDescription>> {
        Ok(reference::find_community_description(&mut self.tx, id).await?)
    }

    async fn community_settings(
        &mut self,
        community_id: Uuid,
    ) -> PolisResult<Option<CommunitySettings>> {
        Ok(communities::find_settings(&mut self.tx, community_id).await?)
    }

    async fn update_community_settings(
        &mut self,
        settings: &CommunitySettings,
    ) -> PolisResult<()> {
        Ok(communities::update_settings(&mut self.tx, settings).await?)
    }

    async fn list_member_settings(
        &mut self,
        community_id: Uuid,
    ) -> PolisResult<Vec<UserCommunitySettings>> {
        Ok(communities::list_member_settings(&mut self.tx, community_id).await?)
    }

    async fn find_member_settings(
        &mut self,
        user_id: Uuid,
        community_id: Uuid,
    ) -> PolisResult<Option<UserCommunitySettings>> {
        Ok(communities::find_member_settings(&mut self.tx, user_id, community_id).await?)
    }

    async fn create_member_settings(
        &mut self,
        settings: &UserCommunitySettings,
    ) -> PolisResult<()> {
        Ok(communities::upsert_member_settings(&mut self.tx, settings).await?)
    }

    async fn update_member_settings(
        &mut self,
        settings: &UserCommunitySettings,
    ) -> PolisResult<()> {
        Ok(communities::upsert_member_settings(&mut self.tx, settings).await?)
    }

    async fn list_resources(&mut self, community_id: Uuid) -> PolisResult<Vec<Resource>> {
        Ok(resources::list_by_community(&mut self.tx, community_id).await?)
    }

    async fn find_resource(&mut self, id: Uuid) -> PolisResult<Option<Resource>> {
        Ok(resources::find_by_id(&mut self.tx, id).await?)
    }

    async fn update_resource(&mut self, resource: &Resource) -> PolisResult<()> {
        Ok(resources::update_resource(&mut self.tx, resource).await?)
    }

    async fn voting_result(&mut self, resource_id: Uuid) -> PolisResult<Option<VotingResult>> {
        Ok(resources::find_voting_result(&mut self.tx, resource_id).await?)
    }

    async fn create_voting_result(&mut self, result: &VotingResult) -> PolisResult<()> {
        Ok(resources::create_voting_result(&mut self.tx, result).await?)
    }

    async fn update_voting_result(&mut self, result: &VotingResult) -> PolisResult<()> {
        Ok(resources::update_voting_result(&mut self.tx, result).await?)
    }

    async fn list_ballots(&mut self, resource_id: Uuid) -> PolisResult<Vec<UserVotingResult>> {
        Ok(ballots::list_by_resource(&mut self.tx, resource_id).await?)
    }

    async fn find_ballot(&mut self, id: Uuid) -> PolisResult<Option<UserVotingResult>> {
        Ok(ballots::find_by_id(&mut self.tx, id).await?)
    }

    async fn find_member_ballot(
        &mut self,
        user_id: Uuid,
        resource_id: Uuid,
    ) -> PolisResult<Option<UserVotingResult>> {
        Ok(ballots::find_member_ballot(&mut self.tx, user_id, resource_id).await?)
    }

    async fn create_ballot(&mut self, ballot: &UserVotingResult) -> PolisResult<()> {
        Ok(ballots::create_ballot(&mut self.tx, ballot).await?)
    }

    async fn update_ballot(&mut self, ballot: &UserVotingResult) -> PolisResult<()> {
        Ok(ballots::update_ballot(&mut self.tx, ballot).await?)
    }

    async fn set_member_ballots_blocked(
        &mut self,
        user_id: Uuid,
        community_id: Uuid,
        is_blocked: bool,
    ) -> PolisResult<u64> {
        Ok(ballots::set_member_blocked(&mut self.tx, user_id, community_id, is_blocked).await?)
    }

    async fn list_delegations_by_delegate(
        &mut self,
        delegate_id: Uuid,
        community_id: Uuid,
        category_id: Uuid,
    ) -> PolisResult<Vec<DelegateSettings>> {
        Ok(
            delegations::list_by_delegate(&mut self.tx, delegate_id, community_id, category_id)
                .await?,
        )
    }

    async fn find_delegation_for_principal(
        &mut self,
        principal_id: Uuid,
        community_id: Uuid,
        category_id: Uuid,
    ) -> PolisResult<Option<DelegateSettings>> {
        Ok(
            delegations::find_for_principal(&mut self.tx, principal_id, community_id, category_id)
                .await?,
        )
    }

    async fn find_request(&mut self, id: Uuid) -> PolisResult<Option<RequestMember>> {
        Ok(requests::find_by_id(&mut self.tx, id).await?)
    }

    async fn list_child_requests(&mut self, parent_id: Uuid) -> PolisResult<Vec<RequestMember>> {
        Ok(requests::list_children(&mut self.tx, parent_id).await?)
    }

    async fn list_root_requests(&mut self, community_id: Uuid) -> PolisResult<Vec<RequestMember>> {
        Ok(requests::list_roots(&mut self.tx, community_id).await?)
    }

    async fn create_request(&mut self, request: &RequestMember) -> PolisResult<()> {
        Ok(requests::create_request(&mut self.tx, request).await?)
    }

    async fn update_request(&mut self, request: &RequestMember) -> PolisResult<()> {
        Ok(requests::update_request(&mut self.tx, request).await?)
    }

    async fn set_member_requests_blocked(
        &mut self,
        voter_id: Uuid,
        community_id: Uuid,
        is_blocked: bool,
    ) -> PolisResult<u64> {
        Ok(requests::set_voter_blocked(&mut self.tx, voter_id, community_id, is_blocked).await?)
    }

    async fn savepoint(&mut self, name: &str) -> PolisResult<()> {
        let name = savepoint_ident(name)?;
        sqlx::query(&format!("SAVEPOINT {name}"))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn release_savepoint(&mut self, name: &str) -> PolisResult<()> {
        let name = savepoint_ident(name)?;
        sqlx::query(&format!("RELEASE SAVEPOINT {name}"))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> PolisResult<()> {
        let name = savepoint_ident(name)?;
        sqlx::query(&format!("ROLLBACK TO SAVEPOINT {name}"))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }
}
