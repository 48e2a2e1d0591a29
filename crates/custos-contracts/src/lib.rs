//! # custos-contracts
//!
//! Shared types and error contracts for the custos audit ledger.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions, the scope resolution rule (which is
//! part of the data's identity, not logic), and error types.

pub mod error;
pub mod query;
pub mod record;
pub mod report;
pub mod scope;
