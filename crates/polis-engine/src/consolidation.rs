//! Community settings consolidation.
//!
//! Merges the preferences of a community's active members into its canonical
//! settings, moves resources out of de-selected categories, and recounts the
//! whole community when the thresholds moved since the last full recount.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use polis_common::error::{PolisError, PolisResult};
use polis_common::models::{CommunitySettings, Resource, UserCommunitySettings, Votable};
use polis_common::store::Store;
use uuid::Uuid;

use crate::membership::MembershipChange;
use crate::recount::{Steps, Subject, recount_community};
use crate::selection::{SelectionMode, percent_of, select};
use crate::thresholds::{Thresholds, eligible_preferences, median};

#[derive(Debug, Clone)]
pub struct Consolidation {
    pub settings: CommunitySettings,
    /// Whether the full recount ran.
    pub recounted: bool,
    pub changes: Vec<MembershipChange>,
}

/// Whether a `count` out of `active` members reaches `threshold` percent.
fn reaches_share(count: usize, active: usize, threshold: i32) -> bool {
    count > 0 && percent_of(count as f64, active) >= threshold as f64
}

/// Ids listed by enough active members, in id order.
fn consensus_set<'a>(
    lists: impl Iterator<Item = &'a [Uuid]>,
    active: usize,
    threshold: i32,
) -> Vec<Uuid> {
    let mut counts: BTreeMap<Uuid, usize> = BTreeMap::new();
    for list in lists {
        for id in list.iter().copied().collect::<BTreeSet<_>>() {
            *counts.entry(id).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .filter(|&(_, count)| reaches_share(count, active, threshold))
        .map(|(id, _)| id)
        .collect()
}

/// Single preferred id per member, weight 1 each. `None` keeps the
/// previous value.
fn consensus_choice(
    choices: impl Iterator<Item = Option<Uuid>>,
    thresholds: &Thresholds,
) -> Option<Uuid> {
    let picks: Vec<Vec<Uuid>> = choices.map(|choice| choice.into_iter().collect()).collect();
    select(&picks, thresholds, SelectionMode::Single)
        .selected
        .first()
        .copied()
}

fn consensus_flag(
    active: &[&UserCommunitySettings],
    flag: fn(&UserCommunitySettings) -> bool,
    threshold: i32,
) -> bool {
    let count = active.iter().filter(|&&member| flag(member)).count();
    reaches_share(count, active.len(), threshold)
}

/// Fold member preferences into `settings`. Pure; reference checks and
/// persistence happen in [`consolidate`]. Blocked and invalid rows take no
/// part in any of the consensus values.
pub fn merge_preferences(settings: &mut CommunitySettings, members: &[UserCommunitySettings]) {
    let active = eligible_preferences(members);
    let thresholds = Thresholds::from_eligible(&active);
    thresholds.apply_to(settings);
    let vote = thresholds.vote;

    if let Some(name_id) = consensus_choice(active.iter().map(|m| m.name_id), &thresholds) {
        settings.name_id = Some(name_id);
    }
    if let Some(description_id) =
        consensus_choice(active.iter().map(|m| m.description_id), &thresholds)
    {
        settings.description_id = Some(description_id);
    }

    settings.categories =
        consensus_set(active.iter().map(|m| m.categories.as_slice()), active.len(), vote);
    settings.sub_communities =
        consensus_set(active.iter().map(|m| m.sub_communities.as_slice()), active.len(), vote);
    settings.responsibilities =
        consensus_set(active.iter().map(|m| m.responsibilities.as_slice()), active.len(), vote);

    settings.is_secret_ballot = consensus_flag(&active, |m| m.is_secret_ballot, vote);
    settings.is_can_offer = consensus_flag(&active, |m| m.is_can_offer, vote);
    settings.is_minority_not_participate =
        consensus_flag(&active, |m| m.is_minority_not_participate, vote);
    settings.is_workgroup = consensus_flag(&active, |m| m.is_workgroup, vote);
    settings.workgroup = median(&active.iter().map(|m| m.workgroup).collect::<Vec<_>>());
}

/// Drop merged ids that reference data does not know, and fall back to the
/// previous name or description when the winner is unknown.
async fn check_references<S: Store + ?Sized>(
    store: &mut S,
    merged: &mut CommunitySettings,
    previous: &CommunitySettings,
) -> PolisResult<()> {
    let community_id = merged.community_id;

    let name_changed = merged.name_id.filter(|id| Some(*id) != previous.name_id);
    if let Some(name_id) = name_changed {
        if store.community_name(name_id).await?.is_none() {
            tracing::warn!(
                community_id = %community_id,
                name_id = %name_id,
                "Unknown community name, keeping previous"
            );
            merged.name_id = previous.name_id;
        }
    }
    let description_changed = merged
        .description_id
        .filter(|id| Some(*id) != previous.description_id);
    if let Some(description_id) = description_changed {
        if store.community_description(description_id).await?.is_none() {
            tracing::warn!(
                community_id = %community_id,
                description_id = %description_id,
                "Unknown community description, keeping previous"
            );
            merged.description_id = previous.description_id;
        }
    }

    let mut categories = Vec::with_capacity(merged.categories.len());
    for id in std::mem::take(&mut merged.categories) {
        if store.category(id).await?.is_some() {
            categories.push(id);
        } else {
            tracing::warn!(
                community_id = %community_id,
                category_id = %id,
                "Dropping unknown category"
            );
        }
    }
    merged.categories = categories;

    let mut responsibilities = Vec::with_capacity(merged.responsibilities.len());
    for id in std::mem::take(&mut merged.responsibilities) {
        if store.responsibility(id).await?.is_some() {
            responsibilities.push(id);
        } else {
            tracing::warn!(
                community_id = %community_id,
                responsibility_id = %id,
                "Dropping unknown responsibility"
            );
        }
    }
    merged.responsibilities = responsibilities;
    Ok(())
}

/// Category a resource should sit in under `selected`, or `None` to stay.
fn category_move(
    resource: &Resource,
    selected: &[Uuid],
    system_id: Uuid,
) -> Option<(Uuid, Option<Uuid>)> {
    let category_id = resource.category_id();
    if category_id == system_id {
        resource
            .prior_category_id()
            .filter(|prior| selected.contains(prior))
            .map(|prior| (prior, None))
    } else if !selected.contains(&category_id) {
        Some((system_id, Some(category_id)))
    } else {
        None
    }
}

/// Move resources whose category was de-selected to the system category,
/// and restore those whose prior category is selected again.
async fn reassign_categories<S: Store + ?Sized>(
    store: &mut S,
    resources: Vec<Resource>,
    selected: &[Uuid],
    system_id: Uuid,
    steps: &mut Steps,
) -> PolisResult<usize> {
    let mut moved = 0;
    for mut resource in resources {
        let Some((category_id, prior)) = category_move(&resource, selected, system_id) else {
            continue;
        };
        let from = resource.category_id();
        resource.set_category(category_id, prior);

        let savepoint = steps.enter(store).await?;
        let result = store.update_resource(&resource).await;
        if steps
            .settle(store, &savepoint, Subject::Resource(resource.id()), result)
            .await?
            .is_some()
        {
            moved += 1;
            tracing::info!(
                resource_id = %resource.id(),
                from = %from,
                to = %category_id,
                "Resource category reassigned"
            );
        }
    }
    Ok(moved)
}

/// Recompute a community's settings from its members and persist them,
/// recounting every resource and request when the thresholds moved since
/// the last full recount or when `force_recount` is set.
///
/// `last_voting_params` advances only after a recount without failures, so
/// a partial recount is retried by the next consolidation.
pub async fn consolidate<S: Store + ?Sized>(
    store: &mut S,
    community_id: Uuid,
    force_recount: bool,
    steps: &mut Steps,
) -> PolisResult<Consolidation> {
    let previous = store
        .community_settings(community_id)
        .await?
        .ok_or_else(|| PolisError::not_found(format!("Community settings for {community_id}")))?;
    let members = store.list_member_settings(community_id).await?;

    let resources = store.list_resources(community_id).await?;
    let system_id = if resources.is_empty() {
        None
    } else {
        let system = store
            .system_category()
            .await?
            .ok_or_else(|| PolisError::missing_reference("system category"))?;
        Some(system.id)
    };

    let mut settings = previous.clone();
    merge_preferences(&mut settings, &members);
    check_references(store, &mut settings, &previous).await?;
    if settings != previous {
        settings.updated_at = Utc::now();
        store.update_community_settings(&settings).await?;
    }

    let moved = match system_id {
        Some(system_id) => {
            reassign_categories(store, resources, &settings.categories, system_id, steps).await?
        }
        None => 0,
    };

    let params = settings.voting_params();
    let thresholds_moved = previous.last_voting_params != Some(params);
    let recounted = force_recount || thresholds_moved || moved > 0;
    let mut changes = Vec::new();

    if recounted {
        let failures_before = steps.failed();
        changes = recount_community(store, community_id, steps).await?;
        if steps.failed() == failures_before && settings.last_voting_params != Some(params) {
            settings.last_voting_params = Some(params);
            settings.updated_at = Utc::now();
            store.update_community_settings(&settings).await?;
        }
    }

    tracing::info!(
        community_id = %community_id,
        quorum = settings.quorum,
        vote = settings.vote,
        significant_minority = settings.significant_minority,
        categories = settings.categories.len(),
        moved,
        recounted,
        "Community settings consolidated"
    );

    Ok(Consolidation {
        settings,
        recounted,
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polis_common::models::{ExtraOptions, Initiative, Status};

    fn member(community: &CommunitySettings) -> UserCommunitySettings {
        UserCommunitySettings::seeded_from(Uuid::now_v7(), Uuid::now_v7(), community)
    }

    fn community() -> CommunitySettings {
        CommunitySettings::empty(Uuid::now_v7(), Uuid::now_v7())
    }

    #[test]
    fn test_consensus_set_threshold() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let lists = [vec![a, b], vec![a], vec![a, a], vec![]];
        // a: 3 of 4 = 75%, b: 1 of 4 = 25%
        let selected = consensus_set(lists.iter().map(Vec::as_slice), 4, 60);
        assert_eq!(selected, vec![a]);
    }

    #[test]
    fn test_merge_preferences() {
        let base = community();
        let (name, other_name, category) = (Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7());
        let mut members: Vec<UserCommunitySettings> = (0..4).map(|_| member(&base)).collect();
        for (i, m) in members.iter_mut().enumerate() {
            m.quorum = 50;
            m.vote = 50;
            m.significant_minority = 20;
            m.workgroup = 3 + i as i32;
            m.name_id = Some(if i < 3 { name } else { other_name });
            m.categories = if i < 2 { vec![category] } else { Vec::new() };
            m.is_secret_ballot = i == 0;
        }

        let mut settings = base.clone();
        merge_preferences(&mut settings, &members);

        assert_eq!(settings.vote, 50);
        assert_eq!(settings.name_id, Some(name));
        // 2 of 4 = 50% meets the 50% threshold
        assert_eq!(settings.categories, vec![category]);
        assert!(!settings.is_secret_ballot);
        // median of 3, 4, 5, 6
        assert_eq!(settings.workgroup, 5);
    }

    #[test]
    fn test_name_without_majority_keeps_previous() {
        let mut base = community();
        let previous = Uuid::now_v7();
        base.name_id = Some(previous);
        let mut members: Vec<UserCommunitySettings> = (0..2).map(|_| member(&base)).collect();
        for m in &mut members {
            m.vote = 60;
            m.name_id = Some(Uuid::now_v7());
        }

        let mut settings = base.clone();
        merge_preferences(&mut settings, &members);
        assert_eq!(settings.name_id, Some(previous));
    }

    #[test]
    fn test_tied_name_keeps_previous() {
        let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
        let thresholds = Thresholds {
            vote: 50,
            ..Default::default()
        };
        assert_eq!(consensus_choice([Some(b), Some(a)].into_iter(), &thresholds), None);

        let mut base = community();
        let previous = Uuid::now_v7();
        base.name_id = Some(previous);
        let mut members: Vec<UserCommunitySettings> = (0..2).map(|_| member(&base)).collect();
        members[0].vote = 50;
        members[0].name_id = Some(a);
        members[1].vote = 50;
        members[1].name_id = Some(b);

        let mut settings = base.clone();
        merge_preferences(&mut settings, &members);
        assert_eq!(settings.name_id, Some(previous));
    }

    #[test]
    fn test_invalid_rows_are_ignored() {
        let base = community();
        let category = Uuid::now_v7();
        let mut members: Vec<UserCommunitySettings> = (0..3).map(|_| member(&base)).collect();
        for m in &mut members[..2] {
            m.vote = 50;
            m.workgroup = 4;
        }
        members[2].vote = 50;
        members[2].workgroup = -30;
        members[2].categories = vec![category];
        members[2].is_secret_ballot = true;

        let mut settings = base.clone();
        merge_preferences(&mut settings, &members);
        assert_eq!(settings.workgroup, 4);
        assert!(settings.categories.is_empty());
        assert!(!settings.is_secret_ballot);
    }

    #[test]
    fn test_blocked_members_are_ignored() {
        let base = community();
        let category = Uuid::now_v7();
        let mut members: Vec<UserCommunitySettings> = (0..3).map(|_| member(&base)).collect();
        members[0].vote = 50;
        members[0].categories = vec![category];
        members[1].vote = 50;
        members[2].vote = 100;
        members[2].is_blocked = true;

        let mut settings = base.clone();
        merge_preferences(&mut settings, &members);
        assert_eq!(settings.vote, 50);
        assert_eq!(settings.categories, vec![category]);
    }

    #[test]
    fn test_category_move_and_restore() {
        let (system, original) = (Uuid::now_v7(), Uuid::now_v7());
        let mut resource = Resource::Initiative(Initiative {
            id: Uuid::now_v7(),
            community_id: Uuid::now_v7(),
            category_id: original,
            prior_category_id: None,
            status: Status::OnConsideration,
            extra_options: ExtraOptions::None,
            is_multi_select: false,
        });

        assert_eq!(category_move(&resource, &[original], system), None);
        assert_eq!(category_move(&resource, &[], system), Some((system, Some(original))));

        resource.set_category(system, Some(original));
        assert_eq!(category_move(&resource, &[], system), None);
        assert_eq!(category_move(&resource, &[original], system), Some((original, None)));
    }
}
