//! Ballots — opening a resource for voting, direct votes and withdrawals.

use chrono::Utc;
use polis_common::error::{PolisError, PolisResult};
use polis_common::ids::generate_id;
use polis_common::models::{
    Choice, ExtraOptions, Resource, Status, UserCommunitySettings, UserVotingResult, Votable,
    VotingResult,
};
use polis_common::store::Store;
use uuid::Uuid;

use crate::delegation::{delegated_choice, propagate_vote};
use crate::outcome::resolve_resource;

/// Create the voting result of `resource_id` and one ballot per member row
/// of its community, then tally. Returns the number of ballots created.
pub async fn open_ballots<S: Store + ?Sized>(
    store: &mut S,
    resource_id: Uuid,
) -> PolisResult<usize> {
    let resource = load_resource(store, resource_id).await?;

    if store.voting_result(resource_id).await?.is_none() {
        store
            .create_voting_result(&VotingResult::new(generate_id(), resource_id))
            .await?;
    }

    let members = store.list_member_settings(resource.community_id()).await?;
    let mut created = 0;
    for member in &members {
        if ensure_ballot(store, &resource, member).await? {
            created += 1;
        }
    }

    tracing::info!(resource_id = %resource_id, created, "Ballots opened");
    resolve_resource(store, resource_id).await?;
    Ok(created)
}

/// Give `member` a ballot on `resource` if they have none yet. Blocked
/// members get a blocked ballot; everyone else starts from their
/// delegate's current choice, or an abstention.
pub async fn ensure_ballot<S: Store + ?Sized>(
    store: &mut S,
    resource: &Resource,
    member: &UserCommunitySettings,
) -> PolisResult<bool> {
    if store
        .find_member_ballot(member.user_id, resource.id())
        .await?
        .is_some()
    {
        return Ok(false);
    }

    let choice = if member.is_blocked {
        Choice::default()
    } else {
        delegated_choice(store, member.user_id, resource)
            .await?
            .unwrap_or_default()
    };

    let ballot = UserVotingResult {
        id: generate_id(),
        user_id: member.user_id,
        resource_id: resource.id(),
        community_id: resource.community_id(),
        vote: choice.vote,
        options: choice.options,
        noncompliance: choice.noncompliance,
        is_blocked: member.is_blocked,
        is_voted_myself: false,
        updated_at: Utc::now(),
    };
    store.create_ballot(&ballot).await?;
    Ok(true)
}

/// Record a direct vote, propagate it to the voter's principals and
/// re-tally.
pub async fn cast_vote<S: Store + ?Sized>(
    store: &mut S,
    ballot_id: Uuid,
    choice: Choice,
) -> PolisResult<Status> {
    let mut ballot = load_ballot(store, ballot_id).await?;
    if ballot.is_blocked {
        return Err(PolisError::Validation {
            message: format!("ballot {ballot_id} is blocked"),
        });
    }
    let resource = load_resource(store, ballot.resource_id).await?;
    check_choice(&resource, &choice)?;

    ballot.apply(choice);
    ballot.is_voted_myself = true;
    store.update_ballot(&ballot).await?;
    tracing::info!(ballot_id = %ballot_id, resource_id = %resource.id(), "Vote cast");

    propagate_vote(store, ballot_id).await
}

/// Hand a ballot back to delegation: it takes the member's delegate's
/// current choice (or abstains without one) and follows it from then on.
pub async fn withdraw_vote<S: Store + ?Sized>(
    store: &mut S,
    ballot_id: Uuid,
) -> PolisResult<Status> {
    let mut ballot = load_ballot(store, ballot_id).await?;
    let resource = load_resource(store, ballot.resource_id).await?;

    let inherited = delegated_choice(store, ballot.user_id, &resource)
        .await?
        .unwrap_or_default();
    ballot.apply(inherited);
    ballot.is_voted_myself = false;
    store.update_ballot(&ballot).await?;
    tracing::info!(ballot_id = %ballot_id, resource_id = %resource.id(), "Vote withdrawn");

    propagate_vote(store, ballot_id).await
}

fn check_choice(resource: &Resource, choice: &Choice) -> PolisResult<()> {
    let invalid = |message: String| Err(PolisError::Validation { message });

    if resource.extra_options() == ExtraOptions::None && !choice.options.is_empty() {
        return invalid(format!("resource {} offers no extra options", resource.id()));
    }
    if !resource.is_multi_select() && choice.options.len() > 1 {
        return invalid(format!("resource {} is single-select", resource.id()));
    }
    match resource {
        Resource::Rule(rule) => {
            if let Some(unknown) = choice
                .noncompliance
                .iter()
                .find(|id| !rule.noncompliance.contains(id))
            {
                return invalid(format!(
                    "{unknown} is not a noncompliance candidate of rule {}",
                    rule.id
                ));
            }
        }
        Resource::Initiative(initiative) if !choice.noncompliance.is_empty() => {
            return invalid(format!("initiative {} has no noncompliance candidates", initiative.id));
        }
        Resource::Initiative(_) => {}
    }
    Ok(())
}

async fn load_resource<S: Store + ?Sized>(
    store: &mut S,
    resource_id: Uuid,
) -> PolisResult<Resource> {
    store
        .find_resource(resource_id)
        .await?
        .ok_or_else(|| PolisError::not_found(format!("Resource {resource_id}")))
}

async fn load_ballot<S: Store + ?Sized>(
    store: &mut S,
    ballot_id: Uuid,
) -> PolisResult<UserVotingResult> {
    store
        .find_ballot(ballot_id)
        .await?
        .ok_or_else(|| PolisError::not_found(format!("Ballot {ballot_id}")))
}
