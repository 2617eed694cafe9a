//! Gitdrop Test - Shared test utilities for gitdrop.
//!
//! This crate provides local git remotes and archive builders that can be
//! used across gitdrop crates as a dev-dependency.
//!
//! # Usage
//!
//! ```rust,ignore
//! use gitdrop_test::{RemoteFixture, zip_archive};
//!
//! #[tokio::test]
//! async fn uploads_to_a_new_branch() {
//!     let remote = RemoteFixture::new();
//!     // ... upload to remote.url() on "feature-x"
//!     assert!(remote.branches().contains(&"feature-x".to_string()));
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod harness;

pub use fixtures::*;
pub use harness::*;
