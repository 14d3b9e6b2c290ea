//! Community settings consolidation and the recount it triggers.

mod common;

use common::Fixture;
use polis_common::models::{Choice, CommunityName, Responsibility, Status};
use uuid::Uuid;

#[tokio::test]
async fn test_moved_thresholds_trigger_recount() {
    let mut fx = Fixture::new(4, 60, 60, 25);
    let rule = fx.rule(Vec::new()).await;
    for (member, yes) in [(0, true), (1, true), (2, true), (3, false)] {
        let ballot = fx.ballot(fx.member(member), rule);
        let choice = if yes { Choice::yes() } else { Choice::no() };
        fx.engine.cast_vote(&mut fx.store, ballot.id, choice).await.unwrap();
    }
    assert_eq!(fx.status(rule), Status::RuleApproved);

    for member in 0..4 {
        let user = fx.member(member);
        fx.edit_member(user, |m| m.vote = 80).await;
    }
    let outcome = fx
        .engine
        .recompute_community_settings(&mut fx.store, fx.community_id)
        .await
        .unwrap();
    assert!(outcome.is_complete());

    let settings = fx.settings();
    assert_eq!(settings.vote, 80);
    assert_eq!(settings.last_voting_params.map(|p| p.vote), Some(80));
    // 75% yes no longer clears 80%.
    assert_eq!(fx.status(rule), Status::RuleRevoked);
}

#[tokio::test]
async fn test_unchanged_thresholds_skip_recount() {
    let mut fx = Fixture::new(4, 60, 60, 25);
    let rule = fx.rule(Vec::new()).await;
    for member in 0..4 {
        let user = fx.member(member);
        fx.overwrite_vote(user, rule, Some(true)).await;
    }

    fx.engine
        .recompute_community_settings(&mut fx.store, fx.community_id)
        .await
        .unwrap();
    assert_eq!(fx.status(rule), Status::OnConsideration);

    fx.engine.recount(&mut fx.store, fx.community_id).await.unwrap();
    assert_eq!(fx.status(rule), Status::RuleApproved);
}

#[tokio::test]
async fn test_deselected_category_moves_to_system_and_back() {
    let mut fx = Fixture::new(2, 50, 50, 25);
    let rule = fx.rule(Vec::new()).await;
    let (category, system) = (fx.category_id, fx.system_category_id);

    for member in 0..2 {
        let user = fx.member(member);
        fx.edit_member(user, |m| m.categories.clear()).await;
    }
    fx.engine
        .recompute_community_settings(&mut fx.store, fx.community_id)
        .await
        .unwrap();

    assert!(fx.settings().categories.is_empty());
    let resource = fx.resource(rule);
    assert_eq!(resource.category_id(), system);
    assert_eq!(resource.prior_category_id(), Some(category));

    let user = fx.member(0);
    fx.edit_member(user, |m| m.categories = vec![category]).await;
    fx.engine
        .recompute_community_settings(&mut fx.store, fx.community_id)
        .await
        .unwrap();

    // 1 of 2 members is 50%, enough at a 50% threshold.
    assert_eq!(fx.settings().categories, vec![category]);
    let resource = fx.resource(rule);
    assert_eq!(resource.category_id(), category);
    assert_eq!(resource.prior_category_id(), None);
}

#[tokio::test]
async fn test_missing_system_category_aborts_without_mutation() {
    let mut fx = Fixture::new(2, 50, 50, 25);
    fx.rule(Vec::new()).await;
    fx.store.state_mut().categories.retain(|c| !c.is_system);
    for member in 0..2 {
        let user = fx.member(member);
        fx.edit_member(user, |m| m.vote = 90).await;
    }
    let before = fx.settings();

    let err = fx
        .engine
        .recompute_community_settings(&mut fx.store, fx.community_id)
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), "MISSING_REFERENCE");
    assert_eq!(fx.settings(), before);
}

#[tokio::test]
async fn test_name_and_responsibilities_follow_members() {
    let mut fx = Fixture::new(4, 50, 50, 25);
    let (popular, other) = (Uuid::now_v7(), Uuid::now_v7());
    for id in [popular, other] {
        fx.store.insert_name(CommunityName {
            id,
            name: format!("name-{id}"),
        });
    }
    let (known, unknown) = (Uuid::now_v7(), Uuid::now_v7());
    fx.store.insert_responsibility(Responsibility {
        id: known,
        name: "Maintenance".into(),
    });

    for member in 0..4 {
        let user = fx.member(member);
        let name = if member < 3 { popular } else { other };
        fx.edit_member(user, |m| {
            m.name_id = Some(name);
            m.responsibilities = vec![known, unknown];
            m.is_secret_ballot = member < 2;
            m.workgroup = 5;
        })
        .await;
    }

    fx.engine
        .recompute_community_settings(&mut fx.store, fx.community_id)
        .await
        .unwrap();

    let settings = fx.settings();
    assert_eq!(settings.name_id, Some(popular));
    assert_eq!(settings.responsibilities, vec![known]);
    assert!(settings.is_secret_ballot);
    assert_eq!(settings.workgroup, 5);
}

#[tokio::test]
async fn test_unknown_name_keeps_previous() {
    let mut fx = Fixture::new(2, 50, 50, 25);
    let unanimous = Uuid::now_v7();
    for member in 0..2 {
        let user = fx.member(member);
        fx.edit_member(user, |m| m.name_id = Some(unanimous)).await;
    }

    fx.engine
        .recompute_community_settings(&mut fx.store, fx.community_id)
        .await
        .unwrap();
    assert_eq!(fx.settings().name_id, None);
}

#[tokio::test]
async fn test_zero_thresholds_need_an_eligible_voter() {
    let mut fx = Fixture::new(1, 0, 0, 0);
    let rule = fx.rule(Vec::new()).await;
    // A single abstaining member meets 0% quorum and 0% vote.
    assert_eq!(fx.status(rule), Status::RuleApproved);

    let only = fx.member(0);
    fx.engine
        .set_member_blocked(&mut fx.store, only, fx.community_id, true)
        .await
        .unwrap();

    let settings = fx.settings();
    assert_eq!((settings.quorum, settings.vote), (0, 0));
    assert_eq!(fx.voting_result(rule).vote, None);
    assert_eq!(fx.status(rule), Status::RuleRevoked);
}
