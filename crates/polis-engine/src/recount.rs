//! Recount passes and their report.
//!
//! Every sub-step of a recount (one resource, one request tree, one
//! category move) runs inside its own savepoint. A failing step is rolled
//! back, logged and recorded, and the pass carries on with the next one. The
//! caller gets a [`RecountOutcome`] listing what did not go through.

use polis_common::error::{PolisError, PolisResult};
use polis_common::models::Votable;
use polis_common::store::Store;
use serde::Serialize;
use uuid::Uuid;

use crate::membership::{MembershipChange, resolve_request_tree};
use crate::outcome::resolve_resource;

/// What a recount step was working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Subject {
    Resource(Uuid),
    Request(Uuid),
    Ballot(Uuid),
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subject::Resource(id) => write!(f, "resource {id}"),
            Subject::Request(id) => write!(f, "request {id}"),
            Subject::Ballot(id) => write!(f, "ballot {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub subject: Subject,
    pub code: String,
    pub reason: String,
}

impl StepFailure {
    pub fn new(subject: Subject, error: &PolisError) -> Self {
        Self {
            subject,
            code: error.error_code().to_string(),
            reason: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecountOutcome {
    Complete,
    Partial { failures: Vec<StepFailure> },
}

impl RecountOutcome {
    pub fn from_failures(failures: Vec<StepFailure>) -> Self {
        if failures.is_empty() {
            Self::Complete
        } else {
            Self::Partial { failures }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    pub fn failures(&self) -> &[StepFailure] {
        match self {
            Self::Complete => &[],
            Self::Partial { failures } => failures,
        }
    }
}

/// Savepoint bookkeeping for one recount pass.
#[derive(Debug, Default)]
pub struct Steps {
    opened: usize,
    failures: Vec<StepFailure>,
}

impl Steps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a savepoint for the next step and return its name.
    pub async fn enter<S: Store + ?Sized>(&mut self, store: &mut S) -> PolisResult<String> {
        self.opened += 1;
        let name = format!("recount_step_{}", self.opened);
        store.savepoint(&name).await?;
        Ok(name)
    }

    /// Close the step opened as `savepoint`. A failed step is rolled back and
    /// recorded, and yields `None`. Only a failure of the rollback itself is
    /// returned as an error.
    pub async fn settle<S: Store + ?Sized, T>(
        &mut self,
        store: &mut S,
        savepoint: &str,
        subject: Subject,
        result: PolisResult<T>,
    ) -> PolisResult<Option<T>> {
        match result {
            Ok(value) => {
                store.release_savepoint(savepoint).await?;
                Ok(Some(value))
            }
            Err(e) => {
                store.rollback_to_savepoint(savepoint).await?;
                store.release_savepoint(savepoint).await?;
                tracing::error!(
                    subject = %subject,
                    code = e.error_code(),
                    "Recount step rolled back: {e}"
                );
                self.failures.push(StepFailure::new(subject, &e));
                Ok(None)
            }
        }
    }

    /// Number of steps rolled back so far.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn finish(self) -> RecountOutcome {
        RecountOutcome::from_failures(self.failures)
    }
}

/// Re-tally every resource and re-derive every membership request tree of a
/// community, one savepoint per item.
pub async fn recount_community<S: Store + ?Sized>(
    store: &mut S,
    community_id: Uuid,
    steps: &mut Steps,
) -> PolisResult<Vec<MembershipChange>> {
    let resources = store.list_resources(community_id).await?;
    for resource in &resources {
        let subject = Subject::Resource(resource.id());
        let savepoint = steps.enter(store).await?;
        let result = resolve_resource(store, resource.id()).await;
        steps.settle(store, &savepoint, subject, result).await?;
    }

    let mut changes = Vec::new();
    let roots = store.list_root_requests(community_id).await?;
    for root in &roots {
        let subject = Subject::Request(root.id);
        let savepoint = steps.enter(store).await?;
        let result = resolve_request_tree(store, root.id).await;
        if let Some(tree_changes) = steps.settle(store, &savepoint, subject, result).await? {
            changes.extend(tree_changes);
        }
    }

    tracing::info!(
        community_id = %community_id,
        resources = resources.len(),
        requests = roots.len(),
        membership_changes = changes.len(),
        "Community recounted"
    );
    Ok(changes)
}
