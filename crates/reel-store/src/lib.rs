//! SQLite persistence for the footage library.
//!
//! One database holds three record kinds:
//! - `footage_assets`: ingested raw videos
//! - `forensic_segments`: per-interval tags, cascading with their asset
//! - `trend_snapshots`: cached trend payloads keyed by category
//!
//! Repositories are stateless and take the pool by reference.

pub mod db;
pub mod error;
pub mod footage_repo;
pub mod trend_repo;

pub use db::{connect, connect_in_memory, DbPool};
pub use error::{StoreError, StoreResult};
pub use footage_repo::{FootageRepo, NewAsset, NewSegment};
pub use trend_repo::TrendRepo;
