//! Trigger points.
//!
//! The layer that mutates votes, preferences and membership calls one of
//! these afterwards, inside the same unit of work. Each returns a
//! [`RecountOutcome`] so the caller can retry or alert on a partial recount.

use std::collections::BTreeSet;

use polis_common::config::EngineConfig;
use polis_common::error::PolisResult;
use polis_common::models::{Choice, RequestMember};
use polis_common::store::Store;
use uuid::Uuid;

use crate::consolidation::consolidate;
use crate::delegation::propagate_vote;
use crate::membership::{self, MembershipChange};
use crate::recount::{RecountOutcome, Steps, Subject};
use crate::voting;

#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Recompute a community's settings after a membership or preference
    /// change. The full recount runs only when the thresholds moved.
    pub async fn recompute_community_settings<S: Store + ?Sized>(
        &self,
        store: &mut S,
        community_id: Uuid,
    ) -> PolisResult<RecountOutcome> {
        let mut steps = Steps::new();
        self.settle(store, community_id, false, &mut steps).await?;
        Ok(steps.finish())
    }

    /// Consolidate and recount a community unconditionally.
    pub async fn recount<S: Store + ?Sized>(
        &self,
        store: &mut S,
        community_id: Uuid,
    ) -> PolisResult<RecountOutcome> {
        let mut steps = Steps::new();
        self.settle(store, community_id, true, &mut steps).await?;
        Ok(steps.finish())
    }

    /// Propagate the choice on `ballot_id` to its holder's principals and
    /// re-tally the resource.
    pub async fn propagate<S: Store + ?Sized>(
        &self,
        store: &mut S,
        ballot_id: Uuid,
    ) -> PolisResult<RecountOutcome> {
        let mut steps = Steps::new();
        let savepoint = steps.enter(store).await?;
        let result = propagate_vote(store, ballot_id).await;
        steps
            .settle(store, &savepoint, Subject::Ballot(ballot_id), result)
            .await?;
        Ok(steps.finish())
    }

    pub async fn cast_vote<S: Store + ?Sized>(
        &self,
        store: &mut S,
        ballot_id: Uuid,
        choice: Choice,
    ) -> PolisResult<RecountOutcome> {
        let mut steps = Steps::new();
        let savepoint = steps.enter(store).await?;
        let result = voting::cast_vote(store, ballot_id, choice).await;
        steps
            .settle(store, &savepoint, Subject::Ballot(ballot_id), result)
            .await?;
        Ok(steps.finish())
    }

    pub async fn withdraw_vote<S: Store + ?Sized>(
        &self,
        store: &mut S,
        ballot_id: Uuid,
    ) -> PolisResult<RecountOutcome> {
        let mut steps = Steps::new();
        let savepoint = steps.enter(store).await?;
        let result = voting::withdraw_vote(store, ballot_id).await;
        steps
            .settle(store, &savepoint, Subject::Ballot(ballot_id), result)
            .await?;
        Ok(steps.finish())
    }

    /// Open a newly created resource for voting.
    pub async fn open_ballots<S: Store + ?Sized>(
        &self,
        store: &mut S,
        resource_id: Uuid,
    ) -> PolisResult<usize> {
        voting::open_ballots(store, resource_id).await
    }

    /// Persist and fan out a root membership request.
    pub async fn open_request<S: Store + ?Sized>(
        &self,
        store: &mut S,
        root: RequestMember,
    ) -> PolisResult<RecountOutcome> {
        let changes = membership::open_request(store, root).await?;
        let mut steps = Steps::new();
        self.follow_changes(store, &changes, &mut steps).await?;
        Ok(steps.finish())
    }

    pub async fn cast_request_vote<S: Store + ?Sized>(
        &self,
        store: &mut S,
        child_id: Uuid,
        vote: Option<bool>,
    ) -> PolisResult<RecountOutcome> {
        let mut steps = Steps::new();
        let savepoint = steps.enter(store).await?;
        let result = membership::cast_request_vote(store, child_id, vote).await;
        let changes = steps
            .settle(store, &savepoint, Subject::Request(child_id), result)
            .await?
            .unwrap_or_default();
        self.follow_changes(store, &changes, &mut steps).await?;
        Ok(steps.finish())
    }

    /// Re-derive the ancestors of a child request after its vote changed.
    pub async fn resolve_parent_request<S: Store + ?Sized>(
        &self,
        store: &mut S,
        child_id: Uuid,
    ) -> PolisResult<RecountOutcome> {
        let mut steps = Steps::new();
        let savepoint = steps.enter(store).await?;
        let result = membership::resolve_parent_request(store, child_id).await;
        let changes = steps
            .settle(store, &savepoint, Subject::Request(child_id), result)
            .await?
            .unwrap_or_default();
        self.follow_changes(store, &changes, &mut steps).await?;
        Ok(steps.finish())
    }

    /// Block or unblock a member by hand, then recount their community.
    pub async fn set_member_blocked<S: Store + ?Sized>(
        &self,
        store: &mut S,
        user_id: Uuid,
        community_id: Uuid,
        is_blocked: bool,
    ) -> PolisResult<RecountOutcome> {
        membership::set_member_blocked(store, user_id, community_id, is_blocked).await?;
        let mut steps = Steps::new();
        let force = self.config.recount_on_membership_change;
        self.settle(store, community_id, force, &mut steps).await?;
        Ok(steps.finish())
    }

    async fn follow_changes<S: Store + ?Sized>(
        &self,
        store: &mut S,
        changes: &[MembershipChange],
        steps: &mut Steps,
    ) -> PolisResult<()> {
        let communities: BTreeSet<Uuid> = changes.iter().map(|c| c.community_id).collect();
        for community_id in communities {
            self.settle(store, community_id, self.config.recount_on_membership_change, steps)
                .await?;
        }
        Ok(())
    }

    /// Consolidate until membership stops changing, at most
    /// `max_recount_passes` times.
    async fn settle<S: Store + ?Sized>(
        &self,
        store: &mut S,
        community_id: Uuid,
        force_recount: bool,
        steps: &mut Steps,
    ) -> PolisResult<()> {
        let passes = self.config.max_recount_passes.max(1);
        let mut force = force_recount;

        for pass in 1..=passes {
            let consolidation = consolidate(store, community_id, force, steps).await?;
            if consolidation.changes.is_empty() || !self.config.recount_on_membership_change {
                return Ok(());
            }
            tracing::info!(
                community_id = %community_id,
                pass,
                changes = consolidation.changes.len(),
                "Membership changed during recount, consolidating again"
            );
            force = true;
        }

        tracing::warn!(
            community_id = %community_id,
            passes,
            "Membership still changing after the last recount pass"
        );
        Ok(())
    }
}
