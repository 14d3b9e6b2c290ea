//! Outcome resolution — the status state machine shared by rules,
//! initiatives and membership requests.
//!
//! Evaluation is split in two: [`evaluate`] turns ballots into a
//! [`VotingResult`] and a [`Verdict`] without touching the store, and
//! [`next_status`] maps the verdict onto the item's status pair. Both are
//! written against [`Votable`] so every item kind shares one transition table.

use polis_common::error::{PolisError, PolisResult};
use polis_common::ids::generate_id;
use polis_common::models::{ExtraOptions, Resource, Status, UserVotingResult, Votable, VotingResult};
use polis_common::store::Store;
use uuid::Uuid;

use crate::selection::{SelectionMode, select};
use crate::tally::Tally;
use crate::thresholds::Thresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Quorum or decision failed, or a required selection is missing.
    Rejected,
    /// Passed, but optional extra options were left undecided.
    PrincipalAgreement,
    /// Passed with a significant minority on options or noncompliance.
    Compromise,
    Approved,
}

/// Next status of an item currently in `current`.
///
/// Only an approved item is revoked when it stops qualifying; a revoked one
/// stays revoked until it is approved or reaches a compromise again. Every
/// other status falls back to consideration.
pub fn next_status(current: Status, approved: Status, revoked: Status, verdict: Verdict) -> Status {
    match verdict {
        Verdict::Approved => approved,
        Verdict::Compromise => Status::Compromise,
        Verdict::Rejected if current == approved || current == revoked => revoked,
        Verdict::Rejected => Status::OnConsideration,
        Verdict::PrincipalAgreement if current == revoked => revoked,
        Verdict::PrincipalAgreement => Status::PrincipalAgreement,
    }
}

/// Recompute `result` from `ballots` and classify the outcome.
///
/// Option and noncompliance fields are cleared whenever the vote did not
/// pass or the item offers none, so nothing stale survives a failed vote.
pub fn evaluate(
    item: &Resource,
    ballots: &[UserVotingResult],
    thresholds: &Thresholds,
    result: &mut VotingResult,
) -> Verdict {
    let tally = Tally::from_ballots(ballots);
    result.vote = tally.verdict_vote(thresholds);

    if !tally.passes(thresholds) {
        result.clear_options();
        result.clear_noncompliance();
        return Verdict::Rejected;
    }

    let active: Vec<&UserVotingResult> = ballots.iter().filter(|b| !b.is_blocked).collect();

    if item.extra_options() == ExtraOptions::None {
        result.clear_options();
    } else {
        let picks: Vec<Vec<Uuid>> = active.iter().map(|b| b.options.clone()).collect();
        let mode = if item.is_multi_select() {
            SelectionMode::Multi
        } else {
            SelectionMode::Single
        };
        let selection = select(&picks, thresholds, mode);
        result.is_significant_minority = selection.has_minority();
        result.selected_options = selection.selected;
        result.minority_options = selection.minority;
    }

    match item {
        Resource::Rule(rule) if !rule.noncompliance.is_empty() => {
            let picks: Vec<Vec<Uuid>> = active
                .iter()
                .map(|b| {
                    b.noncompliance
                        .iter()
                        .copied()
                        .filter(|id| rule.noncompliance.contains(id))
                        .collect()
                })
                .collect();
            let selection = select(&picks, thresholds, SelectionMode::Single);
            result.is_noncompliance_minority = selection.has_minority();
            result.selected_noncompliance = selection.selected;
            result.minority_noncompliance = selection.minority;
        }
        _ => result.clear_noncompliance(),
    }

    let options_missing = result.selected_options.is_empty();
    let required_missing = (item.extra_options() == ExtraOptions::Required && options_missing)
        || (item.requires_noncompliance() && result.selected_noncompliance.is_empty());

    if required_missing {
        Verdict::Rejected
    } else if item.extra_options() == ExtraOptions::Optional && options_missing {
        Verdict::PrincipalAgreement
    } else if result.is_significant_minority || result.is_noncompliance_minority {
        Verdict::Compromise
    } else {
        Verdict::Approved
    }
}

/// The consolidated thresholds every tally of a community is judged by.
pub async fn community_thresholds<S: Store + ?Sized>(
    store: &mut S,
    community_id: Uuid,
) -> PolisResult<Thresholds> {
    let settings = store
        .community_settings(community_id)
        .await?
        .ok_or_else(|| PolisError::not_found(format!("Community settings for {community_id}")))?;
    Ok(Thresholds::from_settings(&settings))
}

/// Re-tally one resource and persist its voting result and status.
pub async fn resolve_resource<S: Store + ?Sized>(
    store: &mut S,
    resource_id: Uuid,
) -> PolisResult<Status> {
    let mut resource = store
        .find_resource(resource_id)
        .await?
        .ok_or_else(|| PolisError::not_found(format!("Resource {resource_id}")))?;
    let thresholds = community_thresholds(store, resource.community_id()).await?;
    let ballots = store.list_ballots(resource_id).await?;

    let (mut result, exists) = match store.voting_result(resource_id).await? {
        Some(result) => (result, true),
        None => (VotingResult::new(generate_id(), resource_id), false),
    };

    let verdict = evaluate(&resource, &ballots, &thresholds, &mut result);
    if exists {
        store.update_voting_result(&result).await?;
    } else {
        store.create_voting_result(&result).await?;
    }

    let current = resource.status();
    let status = next_status(
        current,
        resource.approved_status(),
        resource.revoked_status(),
        verdict,
    );
    if status != current {
        resource.set_status(status);
        store.update_resource(&resource).await?;
        tracing::info!(
            resource_id = %resource_id,
            kind = resource.kind().as_str(),
            from = %current,
            to = %status,
            "Resource status changed"
        );
    } else {
        tracing::debug!(resource_id = %resource_id, status = %status, "Resource status unchanged");
    }

    Ok(status)
}
