//! Core type system and domain definitions
//!
//! Strongly-typed domain models for Bitbucket resources. Identifiers are
//! newtype wrappers so that workspaces, repository slugs, and pull request
//! ids cannot be confused with plain strings at call sites.

pub mod commit;
pub mod diff;
pub mod issue;
pub mod pull_request;
pub mod repository;

pub use commit::*;
pub use diff::*;
pub use issue::*;
pub use pull_request::*;
pub use repository::*;
