//! Repository layer — query functions organized by domain.
//!
//! Every function takes the connection of the caller's transaction so that
//! all reads and writes of one unit of work share it.

pub mod ballots;
pub mod communities;
pub mod delegations;
pub mod reference;
pub mod requests;
pub mod resources;
