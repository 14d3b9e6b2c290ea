//! Tallying, option selection and the outcome state machine, driven through
//! the engine's trigger points.

mod common;

use common::Fixture;
use polis_common::models::{Choice, ExtraOptions, Status};
use polis_engine::{RecountOutcome, Subject};
use uuid::Uuid;

async fn vote(
    fx: &mut Fixture,
    member: usize,
    resource_id: Uuid,
    choice: Choice,
) -> RecountOutcome {
    let ballot = fx.ballot(fx.member(member), resource_id);
    fx.engine
        .cast_vote(&mut fx.store, ballot.id, choice)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_open_ballots_one_per_member() {
    let mut fx = Fixture::new(4, 60, 60, 25);
    let rule = fx.rule(Vec::new()).await;

    let ballots: Vec<_> = fx
        .store
        .state()
        .ballots
        .iter()
        .filter(|b| b.resource_id == rule)
        .collect();
    assert_eq!(ballots.len(), 4);
    assert!(ballots.iter().all(|b| b.vote.is_none() && !b.is_voted_myself));

    // Nobody has voted yet: no quorum.
    assert_eq!(fx.status(rule), Status::OnConsideration);
    assert_eq!(fx.voting_result(rule).vote, None);
}

#[tokio::test]
async fn test_three_of_four_approves_rule() {
    let mut fx = Fixture::new(4, 60, 60, 25);
    let rule = fx.rule(Vec::new()).await;

    for member in 0..3 {
        assert!(vote(&mut fx, member, rule, Choice::yes()).await.is_complete());
    }
    assert!(vote(&mut fx, 3, rule, Choice::no()).await.is_complete());

    assert_eq!(fx.status(rule), Status::RuleApproved);
    assert_eq!(fx.voting_result(rule).vote, Some(true));
}

#[tokio::test]
async fn test_noncompliance_tie_stays_on_consideration() {
    let mut fx = Fixture::new(4, 60, 60, 25);
    let (n1, n2) = (Uuid::now_v7(), Uuid::now_v7());
    let rule = fx.rule(vec![n1, n2]).await;

    vote(&mut fx, 0, rule, Choice::yes().with_noncompliance(vec![n1])).await;
    vote(&mut fx, 1, rule, Choice::yes().with_noncompliance(vec![n1])).await;
    vote(&mut fx, 2, rule, Choice::yes().with_noncompliance(vec![n2])).await;
    vote(&mut fx, 3, rule, Choice::yes().with_noncompliance(vec![n2])).await;

    assert_eq!(fx.status(rule), Status::OnConsideration);
    let result = fx.voting_result(rule);
    assert_eq!(result.vote, Some(true));
    assert!(result.selected_noncompliance.is_empty());
}

#[tokio::test]
async fn test_noncompliance_leader_approves_with_minority() {
    let mut fx = Fixture::new(4, 60, 60, 25);
    let (n1, n2) = (Uuid::now_v7(), Uuid::now_v7());
    let rule = fx.rule(vec![n1, n2]).await;

    for member in 0..3 {
        vote(&mut fx, member, rule, Choice::yes().with_noncompliance(vec![n1])).await;
    }
    vote(&mut fx, 3, rule, Choice::yes().with_noncompliance(vec![n2])).await;

    let result = fx.voting_result(rule);
    assert_eq!(result.selected_noncompliance, vec![n1]);
    assert_eq!(result.minority_noncompliance, vec![n2]);
    assert!(result.is_noncompliance_minority);
    assert_eq!(fx.status(rule), Status::Compromise);
}

#[tokio::test]
async fn test_single_select_leader_below_threshold() {
    let mut fx = Fixture::new(20, 60, 60, 100);
    let initiative = fx.initiative(ExtraOptions::Optional, false).await;
    let (leading, trailing) = (Uuid::now_v7(), Uuid::now_v7());

    for member in 0..20 {
        let option = if member < 11 { leading } else { trailing };
        vote(&mut fx, member, initiative, Choice::yes().with_options(vec![option])).await;
    }

    let result = fx.voting_result(initiative);
    assert_eq!(result.vote, Some(true));
    assert!(result.selected_options.is_empty());
    assert_eq!(fx.status(initiative), Status::PrincipalAgreement);
}

#[tokio::test]
async fn test_multi_select_weights_split_per_voter() {
    let mut fx = Fixture::new(4, 50, 50, 100);
    let initiative = fx.initiative(ExtraOptions::Required, true).await;
    let (a, b) = (Uuid::now_v7(), Uuid::now_v7());

    vote(&mut fx, 0, initiative, Choice::yes().with_options(vec![a])).await;
    vote(&mut fx, 1, initiative, Choice::yes().with_options(vec![a])).await;
    vote(&mut fx, 2, initiative, Choice::yes().with_options(vec![a, b])).await;
    vote(&mut fx, 3, initiative, Choice::yes().with_options(vec![b])).await;

    // a: 1 + 1 + 0.5 = 2.5 of 4 (62.5%), b: 0.5 + 1 = 1.5 of 4 (37.5%)
    let result = fx.voting_result(initiative);
    assert_eq!(result.selected_options, vec![a]);
    assert_eq!(fx.status(initiative), Status::InitiativeApproved);
}

#[tokio::test]
async fn test_lost_support_revokes() {
    let mut fx = Fixture::new(4, 60, 60, 25);
    let rule = fx.rule(Vec::new()).await;
    for member in 0..4 {
        vote(&mut fx, member, rule, Choice::yes()).await;
    }
    assert_eq!(fx.status(rule), Status::RuleApproved);

    vote(&mut fx, 0, rule, Choice::no()).await;
    vote(&mut fx, 1, rule, Choice::no()).await;
    assert_eq!(fx.status(rule), Status::RuleRevoked);
    assert_eq!(fx.voting_result(rule).vote, Some(false));

    // Abstaining back below quorum keeps it revoked.
    for member in 0..4 {
        vote(&mut fx, member, rule, Choice::default()).await;
    }
    assert_eq!(fx.status(rule), Status::RuleRevoked);
    assert_eq!(fx.voting_result(rule).vote, None);
}

#[tokio::test]
async fn test_split_options_weaken_approval_to_principal_agreement() {
    let mut fx = Fixture::new(4, 60, 60, 100);
    let initiative = fx.initiative(ExtraOptions::Optional, false).await;
    let (a, b) = (Uuid::now_v7(), Uuid::now_v7());
    for member in 0..4 {
        vote(&mut fx, member, initiative, Choice::yes().with_options(vec![a])).await;
    }
    assert_eq!(fx.status(initiative), Status::InitiativeApproved);

    // An exact 50/50 split leaves no option selected, but the vote still passes.
    for member in 2..4 {
        vote(&mut fx, member, initiative, Choice::yes().with_options(vec![b])).await;
    }
    let result = fx.voting_result(initiative);
    assert_eq!(result.vote, Some(true));
    assert!(result.selected_options.is_empty());
    assert_eq!(fx.status(initiative), Status::PrincipalAgreement);
}

#[tokio::test]
async fn test_invalid_choice_is_reported_not_applied() {
    let mut fx = Fixture::new(4, 60, 60, 25);
    let rule = fx.rule(vec![Uuid::now_v7()]).await;
    let ballot = fx.ballot(fx.member(0), rule);

    let outcome = fx
        .engine
        .cast_vote(&mut fx.store, ballot.id, Choice::yes().with_noncompliance(vec![Uuid::now_v7()]))
        .await
        .unwrap();

    let failures = outcome.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].subject, Subject::Ballot(ballot.id));
    assert_eq!(failures[0].code, "VALIDATION_ERROR");
    assert_eq!(fx.ballot(fx.member(0), rule).vote, None);
}

#[tokio::test]
async fn test_recount_is_idempotent() {
    let mut fx = Fixture::new(4, 60, 60, 25);
    let (n1, n2) = (Uuid::now_v7(), Uuid::now_v7());
    let rule = fx.rule(vec![n1, n2]).await;
    let initiative = fx.initiative(ExtraOptions::Optional, true).await;
    for member in 0..4 {
        let pick = if member == 0 { n2 } else { n1 };
        vote(&mut fx, member, rule, Choice::yes().with_noncompliance(vec![pick])).await;
        vote(&mut fx, member, initiative, Choice::yes().with_options(vec![Uuid::now_v7()])).await;
    }

    assert!(fx.engine.recount(&mut fx.store, fx.community_id).await.unwrap().is_complete());
    let first = fx.store.state().clone();

    assert!(fx.engine.recount(&mut fx.store, fx.community_id).await.unwrap().is_complete());
    let second = fx.store.state();

    assert_eq!(first.voting_results, second.voting_results);
    assert_eq!(first.community_settings, second.community_settings);
    assert_eq!(first.resources, second.resources);
    assert_eq!(first.ballots, second.ballots);
}

#[tokio::test]
async fn test_failed_step_rolls_back_and_the_rest_goes_through() {
    let mut fx = Fixture::new(4, 60, 60, 25);
    let broken = fx.rule(Vec::new()).await;
    let healthy = fx.rule(Vec::new()).await;
    for member in 0..4 {
        vote(&mut fx, member, broken, Choice::yes()).await;
        vote(&mut fx, member, healthy, Choice::yes()).await;
    }

    // Support collapses on both rules behind the engine's back.
    for member in 0..4 {
        let user = fx.member(member);
        fx.overwrite_vote(user, broken, Some(false)).await;
        fx.overwrite_vote(user, healthy, Some(false)).await;
    }
    fx.store.fail_writes_for(broken);

    let outcome = fx.engine.recount(&mut fx.store, fx.community_id).await.unwrap();

    assert_eq!(outcome.failures().len(), 1);
    assert_eq!(outcome.failures()[0].subject, Subject::Resource(broken));
    assert_eq!(fx.status(broken), Status::RuleApproved);
    assert_eq!(fx.voting_result(broken).vote, Some(true));
    assert_eq!(fx.status(healthy), Status::RuleRevoked);
    assert!(fx.store.state().community_settings[0].last_voting_params.is_some());
}
