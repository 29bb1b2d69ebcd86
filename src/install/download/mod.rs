//! GitHub release discovery and asset download
//!
//! ## Module Organization
//!
//! - `github` - release metadata types and the latest-release request
//! - `core` - asset download with bounded redirect following

mod core;
mod github;

// Re-export public API
pub use github::{ReleaseAsset, ReleaseClient, ReleaseMetadata};
