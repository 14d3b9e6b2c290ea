//! Membership requests.
//!
//! A root request fans out into one child per member of the target
//! community. Children carry individual votes; the root's vote and status are
//! derived from them. A child may itself have children (a sub-community
//! deciding as a block), in which case its vote is derived the same way.
//!
//! When a root flips to a status that admits or excludes its subject, the
//! subject's member row is unblocked (or created) or blocked, and the block
//! cascades to every ballot and child request they hold in the community.

use std::collections::{HashSet, VecDeque};

use chrono::Utc;
use polis_common::error::{PolisError, PolisResult};
use polis_common::ids::generate_id;
use polis_common::models::{RequestMember, Status, UserCommunitySettings, Votable};
use polis_common::store::Store;
use serde::Serialize;
use uuid::Uuid;

use crate::outcome::{Verdict, community_thresholds, next_status};
use crate::tally::Tally;
use crate::voting::ensure_ballot;

/// A member admitted to or excluded from a community by a request outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MembershipChange {
    pub community_id: Uuid,
    pub member_id: Uuid,
    pub admitted: bool,
}

/// Persist a root request, fan it out to the community's members and
/// resolve it, which may already settle it when default votes suffice.
pub async fn open_request<S: Store + ?Sized>(
    store: &mut S,
    root: RequestMember,
) -> PolisResult<Vec<MembershipChange>> {
    if !root.is_root() {
        return Err(PolisError::Validation {
            message: format!("request {} has a parent and cannot be opened", root.id),
        });
    }
    store.create_request(&root).await?;

    let members = store.list_member_settings(root.community_id).await?;
    let mut created = 0;
    for member in &members {
        if ensure_child(store, &root, member).await? {
            created += 1;
        }
    }

    tracing::info!(
        request_id = %root.id,
        community_id = %root.community_id,
        member_id = %root.member_id,
        created,
        "Membership request opened"
    );
    resolve_request_tree(store, root.id).await
}

/// Default vote of a freshly created child: yes when the voter is the
/// subject or agrees to membership requests by default, whatever their kind.
fn default_vote(root: &RequestMember, member: &UserCommunitySettings) -> Option<bool> {
    (member.user_id == root.member_id || member.is_default_add_member).then_some(true)
}

async fn ensure_child<S: Store + ?Sized>(
    store: &mut S,
    root: &RequestMember,
    member: &UserCommunitySettings,
) -> PolisResult<bool> {
    let children = store.list_child_requests(root.id).await?;
    if children.iter().any(|c| c.voter_id == Some(member.user_id)) {
        return Ok(false);
    }

    let vote = if member.is_blocked {
        None
    } else {
        default_vote(root, member)
    };
    let child = RequestMember {
        id: generate_id(),
        community_id: root.community_id,
        parent_id: Some(root.id),
        kind: root.kind,
        member_id: root.member_id,
        voter_id: Some(member.user_id),
        vote,
        is_blocked: member.is_blocked,
        status: RequestMember::child_status(vote),
        created_at: Utc::now(),
    };
    store.create_request(&child).await?;
    Ok(true)
}

/// Record a member's vote on a child request and resolve its ancestors.
pub async fn cast_request_vote<S: Store + ?Sized>(
    store: &mut S,
    child_id: Uuid,
    vote: Option<bool>,
) -> PolisResult<Vec<MembershipChange>> {
    let mut child = load_request(store, child_id).await?;
    if child.is_root() {
        return Err(PolisError::Validation {
            message: format!("request {child_id} is a root; its vote is derived"),
        });
    }
    if child.is_blocked {
        return Err(PolisError::Validation {
            message: format!("request {child_id} is blocked"),
        });
    }

    child.vote = vote;
    child.status = RequestMember::child_status(vote);
    store.update_request(&child).await?;

    resolve_parent_request(store, child_id).await
}

/// Re-derive every ancestor of `child_id`, innermost first, and apply the
/// membership changes their outcomes imply.
pub async fn resolve_parent_request<S: Store + ?Sized>(
    store: &mut S,
    child_id: Uuid,
) -> PolisResult<Vec<MembershipChange>> {
    let mut current = load_request(store, child_id).await?;
    let mut visited = HashSet::from([current.id]);
    let mut changes = Vec::new();

    while let Some(parent_id) = current.parent_id {
        if !visited.insert(parent_id) {
            tracing::warn!(request_id = %parent_id, "Request ancestry loops back, stopping");
            break;
        }
        let (parent, change) = resolve_request(store, parent_id).await?;
        changes.extend(change);
        current = parent;
    }

    for change in &changes {
        apply_change(store, change).await?;
    }
    Ok(changes)
}

/// Re-derive a whole request tree bottom-up and apply the resulting
/// membership changes.
pub async fn resolve_request_tree<S: Store + ?Sized>(
    store: &mut S,
    root_id: Uuid,
) -> PolisResult<Vec<MembershipChange>> {
    // Breadth-first listing of the nodes that have children; resolving it in
    // reverse settles every child before its parent.
    let mut visited = HashSet::from([root_id]);
    let mut queue = VecDeque::from([root_id]);
    let mut inner = Vec::new();
    while let Some(id) = queue.pop_front() {
        let children = store.list_child_requests(id).await?;
        if id == root_id || !children.is_empty() {
            inner.push(id);
        }
        for child in children {
            if visited.insert(child.id) {
                queue.push_back(child.id);
            }
        }
    }

    let mut changes = Vec::new();
    for id in inner.into_iter().rev() {
        let (_, change) = resolve_request(store, id).await?;
        changes.extend(change);
    }
    for change in &changes {
        apply_change(store, change).await?;
    }
    Ok(changes)
}

/// Derive one request's vote and status from its direct children.
///
/// Roots move through their kind's status pair; an inner child keeps the
/// child status of its derived vote. The returned change is set only when a
/// root newly reaches a status that admits or excludes its subject.
async fn resolve_request<S: Store + ?Sized>(
    store: &mut S,
    request_id: Uuid,
) -> PolisResult<(RequestMember, Option<MembershipChange>)> {
    let mut request = load_request(store, request_id).await?;
    let children = store.list_child_requests(request_id).await?;
    // Children of an inner node vote in the sub-community, under its thresholds.
    let voting_community = children
        .first()
        .map_or(request.community_id, |child| child.community_id);
    let thresholds = community_thresholds(store, voting_community).await?;

    let tally = Tally::from_requests(&children);
    let current = request.status;
    let vote = tally.verdict_vote(&thresholds);

    let status = if request.is_root() {
        let verdict = if tally.passes(&thresholds) {
            Verdict::Approved
        } else {
            Verdict::Rejected
        };
        next_status(current, request.approved_status(), request.revoked_status(), verdict)
    } else {
        RequestMember::child_status(vote)
    };

    if vote == request.vote && status == current {
        return Ok((request, None));
    }

    request.vote = vote;
    request.set_status(status);
    store.update_request(&request).await?;
    tracing::info!(
        request_id = %request_id,
        yes = tally.yes,
        no = tally.no,
        abstain = tally.abstain,
        from = %current,
        to = %status,
        "Membership request resolved"
    );

    let change = match (request.is_root(), request.admits(status)) {
        (true, Some(admitted)) if status != current => Some(MembershipChange {
            community_id: request.community_id,
            member_id: request.member_id,
            admitted,
        }),
        _ => None,
    };
    Ok((request, change))
}

async fn apply_change<S: Store + ?Sized>(
    store: &mut S,
    change: &MembershipChange,
) -> PolisResult<()> {
    if change.admitted {
        return admit_member(store, change.member_id, change.community_id).await;
    }
    if store
        .find_member_settings(change.member_id, change.community_id)
        .await?
        .is_some()
    {
        set_member_blocked(store, change.member_id, change.community_id, true).await?;
    }
    Ok(())
}

/// Make `user_id` an active member: unblock or create their member row,
/// then give them a ballot on every resource and a vote on every undecided
/// request about someone else.
pub async fn admit_member<S: Store + ?Sized>(
    store: &mut S,
    user_id: Uuid,
    community_id: Uuid,
) -> PolisResult<()> {
    let member = match store.find_member_settings(user_id, community_id).await? {
        Some(existing) => {
            if existing.is_blocked {
                set_member_blocked(store, user_id, community_id, false).await?;
            }
            UserCommunitySettings {
                is_blocked: false,
                ..existing
            }
        }
        None => {
            let settings = store
                .community_settings(community_id)
                .await?
                .ok_or_else(|| {
                    PolisError::not_found(format!("Community settings for {community_id}"))
                })?;
            let member = UserCommunitySettings::seeded_from(generate_id(), user_id, &settings);
            store.create_member_settings(&member).await?;
            tracing::info!(
                user_id = %user_id,
                community_id = %community_id,
                "Member settings created"
            );
            member
        }
    };

    for resource in store.list_resources(community_id).await? {
        ensure_ballot(store, &resource, &member).await?;
    }
    for root in store.list_root_requests(community_id).await? {
        if root.status == Status::OnConsideration && root.member_id != user_id {
            ensure_child(store, &root, &member).await?;
        }
    }
    Ok(())
}

/// Block or unblock a member, cascading to their ballots and request
/// votes in the community. Returns whether the member row changed.
pub async fn set_member_blocked<S: Store + ?Sized>(
    store: &mut S,
    user_id: Uuid,
    community_id: Uuid,
    is_blocked: bool,
) -> PolisResult<bool> {
    let Some(mut member) = store.find_member_settings(user_id, community_id).await? else {
        return Err(PolisError::not_found(format!(
            "Member {user_id} of community {community_id}"
        )));
    };

    let changed = member.is_blocked != is_blocked;
    if changed {
        member.is_blocked = is_blocked;
        store.update_member_settings(&member).await?;
    }

    let ballots = store
        .set_member_ballots_blocked(user_id, community_id, is_blocked)
        .await?;
    let requests = store
        .set_member_requests_blocked(user_id, community_id, is_blocked)
        .await?;
    tracing::info!(
        user_id = %user_id,
        community_id = %community_id,
        is_blocked,
        ballots,
        requests,
        "Member block state applied"
    );
    Ok(changed)
}

async fn load_request<S: Store + ?Sized>(
    store: &mut S,
    request_id: Uuid,
) -> PolisResult<RequestMember> {
    store
        .find_request(request_id)
        .await?
        .ok_or_else(|| PolisError::not_found(format!("Request {request_id}")))
}
