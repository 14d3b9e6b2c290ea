//! # polis-engine
//!
//! Consensus computation for Polis communities:
//! - **Thresholds** — median of the active members' preferences
//! - **Tally** — yes / no / abstain over unblocked ballots
//! - **Selection** — weighted option and noncompliance outcomes with their significant minority
//! - **Outcome** — status state machine shared by rules, initiatives and membership requests
//! - **Delegation** — breadth-first vote propagation from delegates to principals
//! - **Membership** — nested membership requests and the block cascade
//! - **Consolidation** — canonical community settings and the full recount
//!
//! Every operation takes the unit of work explicitly as `&mut S where S: Store`.

pub mod consolidation;
pub mod delegation;
pub mod engine;
pub mod membership;
pub mod outcome;
pub mod recount;
pub mod selection;
pub mod tally;
pub mod thresholds;
pub mod voting;

pub use engine::Engine;
pub use recount::{RecountOutcome, StepFailure, Subject};
