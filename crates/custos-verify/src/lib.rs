//! # custos-verify
//!
//! Chain verification for the custos audit ledger.
//!
//! [`engine::ChainVerifier`] replays a filtered window of the ledger in
//! chain order, recomputes every record's hash, and checks every record's
//! link to its predecessor — bridging windowed scans back to full history
//! so a scan over recent records still detects a link broken just before
//! the window. Results come back as a structured
//! [`VerificationReport`](custos_contracts::report::VerificationReport),
//! never as an error.

pub mod engine;

pub use engine::ChainVerifier;

// ── Tests ─────────────────────────────────────────────────────────────────────
