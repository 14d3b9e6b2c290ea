//! Delegate vote propagation.
//!
//! A delegate's choice on a resource is copied to every principal who trusts
//! them for the resource's (community, category) and has not voted
//! themselves, then onwards to those principals' own principals. The walk is
//! breadth-first over a visited set, so each member is considered at most
//! once per pass whatever the shape of the delegation graph.

use std::collections::{HashSet, VecDeque};

use polis_common::error::{PolisError, PolisResult};
use polis_common::models::{Choice, Resource, Status, Votable};
use polis_common::store::Store;
use uuid::Uuid;

use crate::outcome::resolve_resource;

/// Copy `choice` from `delegate_id` down the delegation tree of `resource`.
/// Returns the number of ballots rewritten.
///
/// Members who opted out of acting as a delegate, blocked members and
/// members who voted themselves stop the walk. The latter keep their own
/// vote and are marked visited like everyone else.
pub async fn spread<S: Store + ?Sized>(
    store: &mut S,
    resource: &Resource,
    delegate_id: Uuid,
    choice: &Choice,
) -> PolisResult<usize> {
    let community_id = resource.community_id();
    let category_id = resource.category_id();

    let mut visited = HashSet::from([delegate_id]);
    let mut queue = VecDeque::from([delegate_id]);
    let mut rewritten = 0;

    while let Some(delegate_id) = queue.pop_front() {
        if !acts_as_delegate(store, delegate_id, community_id).await? {
            continue;
        }

        let delegations = store
            .list_delegations_by_delegate(delegate_id, community_id, category_id)
            .await?;

        for principal_id in delegations.into_iter().flat_map(|d| d.principals) {
            if !visited.insert(principal_id) {
                continue;
            }
            let Some(mut ballot) = store
                .find_member_ballot(principal_id, resource.id())
                .await?
            else {
                continue;
            };
            if ballot.is_blocked || ballot.is_voted_myself {
                continue;
            }

            if ballot.choice() != *choice {
                ballot.apply(choice.clone());
                store.update_ballot(&ballot).await?;
                rewritten += 1;
                tracing::debug!(
                    resource_id = %resource.id(),
                    delegate_id = %delegate_id,
                    principal_id = %principal_id,
                    "Delegated vote copied"
                );
            }
            queue.push_back(principal_id);
        }
    }

    Ok(rewritten)
}

async fn acts_as_delegate<S: Store + ?Sized>(
    store: &mut S,
    user_id: Uuid,
    community_id: Uuid,
) -> PolisResult<bool> {
    Ok(store
        .find_member_settings(user_id, community_id)
        .await?
        .is_some_and(|settings| !settings.is_blocked && !settings.is_not_delegate))
}

/// The choice a member inherits on `resource` from their delegate, if they
/// have a delegate for its category who holds an unblocked ballot.
pub async fn delegated_choice<S: Store + ?Sized>(
    store: &mut S,
    user_id: Uuid,
    resource: &Resource,
) -> PolisResult<Option<Choice>> {
    let Some(delegation) = store
        .find_delegation_for_principal(user_id, resource.community_id(), resource.category_id())
        .await?
    else {
        return Ok(None);
    };
    if !acts_as_delegate(store, delegation.delegate_id, resource.community_id()).await? {
        return Ok(None);
    }

    Ok(store
        .find_member_ballot(delegation.delegate_id, resource.id())
        .await?
        .filter(|ballot| !ballot.is_blocked)
        .map(|ballot| ballot.choice()))
}

/// Propagate the choice held on `ballot_id` and re-tally its resource once.
pub async fn propagate_vote<S: Store + ?Sized>(
    store: &mut S,
    ballot_id: Uuid,
) -> PolisResult<Status> {
    let ballot = store
        .find_ballot(ballot_id)
        .await?
        .ok_or_else(|| PolisError::not_found(format!("Ballot {ballot_id}")))?;
    let resource = store
        .find_resource(ballot.resource_id)
        .await?
        .ok_or_else(|| PolisError::not_found(format!("Resource {}", ballot.resource_id)))?;

    if ballot.is_blocked {
        tracing::debug!(ballot_id = %ballot_id, "Blocked ballot, nothing to propagate");
    } else {
        let rewritten = spread(store, &resource, ballot.user_id, &ballot.choice()).await?;
        tracing::info!(
            resource_id = %resource.id(),
            delegate_id = %ballot.user_id,
            rewritten,
            "Vote propagated"
        );
    }

    resolve_resource(store, resource.id()).await
}
