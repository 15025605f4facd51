//! Sales representative tier board.
//!
//! Classifies representatives against a fixed ladder of achievement tiers from branch
//! metric feeds, and lets each branch close a month into an immutable snapshot that can
//! later be served verbatim next to the live view.

pub mod config;
pub mod error;
pub mod feed;
pub mod periods;
pub mod snapshots;
pub mod telemetry;
pub mod tiers;
