//! Shared fixture for engine behaviour tests.
//!
//! Builds one community in a `MemoryStore`, with a system category, one
//! regular category and a set of members whose preferences match the
//! consolidated settings, so nothing moves until a test changes it.

#![allow(dead_code)]

use chrono::Utc;
use polis_common::models::{
    Category, CommunitySettings, DelegateSettings, ExtraOptions, Initiative, RequestKind,
    RequestMember, Resource, Rule, Status, UserCommunitySettings, UserVotingResult, VotingResult,
};
use polis_common::store::Store;
use polis_db::MemoryStore;
use polis_engine::Engine;
use uuid::Uuid;

pub struct Fixture {
    pub store: MemoryStore,
    pub engine: Engine,
    pub community_id: Uuid,
    pub category_id: Uuid,
    pub system_category_id: Uuid,
    pub members: Vec<Uuid>,
}

impl Fixture {
    pub fn new(members: usize, quorum: i32, vote: i32, significant_minority: i32) -> Self {
        let mut store = MemoryStore::new();
        let community_id = Uuid::now_v7();
        let system_category_id = Uuid::now_v7();
        let category_id = Uuid::now_v7();

        store.insert_category(Category {
            id: system_category_id,
            name: "General".into(),
            is_system: true,
        });
        store.insert_category(Category {
            id: category_id,
            name: "Housing".into(),
            is_system: false,
        });

        let mut settings = CommunitySettings::empty(Uuid::now_v7(), community_id);
        settings.quorum = quorum;
        settings.vote = vote;
        settings.significant_minority = significant_minority;
        settings.categories = vec![category_id];
        settings.last_voting_params = Some(settings.voting_params());

        let members: Vec<Uuid> = (0..members).map(|_| Uuid::now_v7()).collect();
        for &user_id in &members {
            store.insert_member_settings(UserCommunitySettings::seeded_from(
                Uuid::now_v7(),
                user_id,
                &settings,
            ));
        }
        store.insert_community_settings(settings);

        Self {
            store,
            engine: Engine::default(),
            community_id,
            category_id,
            system_category_id,
            members,
        }
    }

    pub fn member(&self, index: usize) -> Uuid {
        self.members[index]
    }

    /// Insert a rule with the given noncompliance candidates and open it.
    pub async fn rule(&mut self, noncompliance: Vec<Uuid>) -> Uuid {
        let id = Uuid::now_v7();
        self.store.insert_resource(Resource::Rule(Rule {
            id,
            community_id: self.community_id,
            category_id: self.category_id,
            prior_category_id: None,
            status: Status::OnConsideration,
            extra_options: ExtraOptions::None,
            is_multi_select: false,
            noncompliance,
        }));
        self.engine.open_ballots(&mut self.store, id).await.unwrap();
        id
    }

    /// Insert an initiative and open it.
    pub async fn initiative(&mut self, extra_options: ExtraOptions, is_multi_select: bool) -> Uuid {
        let id = Uuid::now_v7();
        self.store.insert_resource(Resource::Initiative(Initiative {
            id,
            community_id: self.community_id,
            category_id: self.category_id,
            prior_category_id: None,
            status: Status::OnConsideration,
            extra_options,
            is_multi_select,
        }));
        self.engine.open_ballots(&mut self.store, id).await.unwrap();
        id
    }

    /// `delegate_id` votes for `principals` in the fixture's category.
    pub fn delegate(&mut self, delegate_id: Uuid, principals: Vec<Uuid>) {
        self.store.insert_delegation(DelegateSettings {
            id: Uuid::now_v7(),
            delegate_id,
            community_id: self.community_id,
            category_id: self.category_id,
            principals,
        });
    }

    pub fn ballot(&self, user_id: Uuid, resource_id: Uuid) -> UserVotingResult {
        self.store
            .state()
            .ballots
            .iter()
            .find(|b| b.user_id == user_id && b.resource_id == resource_id)
            .cloned()
            .expect("ballot exists")
    }

    pub fn resource(&self, id: Uuid) -> Resource {
        self.store
            .state()
            .resources
            .iter()
            .find(|r| match r {
                Resource::Rule(rule) => rule.id == id,
                Resource::Initiative(initiative) => initiative.id == id,
            })
            .cloned()
            .expect("resource exists")
    }

    pub fn status(&self, id: Uuid) -> Status {
        match self.resource(id) {
            Resource::Rule(rule) => rule.status,
            Resource::Initiative(initiative) => initiative.status,
        }
    }

    pub fn voting_result(&self, resource_id: Uuid) -> VotingResult {
        self.store
            .state()
            .voting_results
            .iter()
            .find(|r| r.resource_id == resource_id)
            .cloned()
            .expect("voting result exists")
    }

    pub fn settings(&self) -> CommunitySettings {
        self.store
            .state()
            .community_settings
            .iter()
            .find(|s| s.community_id == self.community_id)
            .cloned()
            .expect("community settings exist")
    }

    pub fn member_settings(&self, user_id: Uuid) -> Option<UserCommunitySettings> {
        self.store
            .state()
            .member_settings
            .iter()
            .find(|m| m.user_id == user_id && m.community_id == self.community_id)
            .cloned()
    }

    pub fn request(&self, id: Uuid) -> RequestMember {
        self.store
            .state()
            .requests
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .expect("request exists")
    }

    /// Child of `root_id` carrying `voter_id`'s vote.
    pub fn child_request(&self, root_id: Uuid, voter_id: Uuid) -> RequestMember {
        self.store
            .state()
            .requests
            .iter()
            .find(|r| r.parent_id == Some(root_id) && r.voter_id == Some(voter_id))
            .cloned()
            .expect("child request exists")
    }

    pub fn root_request(&self, kind: RequestKind, member_id: Uuid) -> RequestMember {
        RequestMember {
            id: Uuid::now_v7(),
            community_id: self.community_id,
            parent_id: None,
            kind,
            member_id,
            voter_id: None,
            vote: None,
            is_blocked: false,
            status: Status::OnConsideration,
            created_at: Utc::now(),
        }
    }

    /// Change one member's preferences in place.
    pub async fn edit_member(
        &mut self,
        user_id: Uuid,
        edit: impl FnOnce(&mut UserCommunitySettings),
    ) {
        let mut row = self
            .member_settings(user_id)
            .expect("member settings exist");
        edit(&mut row);
        self.store.update_member_settings(&row).await.unwrap();
    }

    /// Overwrite a ballot without any propagation or re-tally.
    pub async fn overwrite_vote(&mut self, user_id: Uuid, resource_id: Uuid, vote: Option<bool>) {
        let mut ballot = self.ballot(user_id, resource_id);
        ballot.vote = vote;
        self.store.update_ballot(&ballot).await.unwrap();
    }
}
