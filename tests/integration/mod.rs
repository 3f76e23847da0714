//! Integration test suite for vic
//!
//! End-to-end tests against a mock npm registry (`wiremock`) and the compiled
//! `vic` binary (`assert_cmd`).
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **registry**: `NpmRegistry` against a mock registry
//! - **cache_lifecycle**: `PackageCache` driven through the real registry client
//! - **cli**: the `vic` binary, including a scripted installer (unix only)

mod common;

mod cache_lifecycle;
mod cli;
mod registry;
