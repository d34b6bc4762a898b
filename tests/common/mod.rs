//! Common test utilities and helpers
//!
//! Shared by the integration tests: a scripted svn client and job fixtures.

#![allow(dead_code)]

pub mod mock_services;
pub mod test_fixtures;
