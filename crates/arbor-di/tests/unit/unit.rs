//! Unit tests for arbor-di crate components
//!
//! Each test file exercises one area of the container through its public API.
//! Shared services and the default fixture live in `fixtures`.

pub mod fixtures;

pub mod build_up_tests;
pub mod collection_tests;
pub mod cycle_detection_tests;
pub mod generic_tests;
pub mod hierarchy_tests;
pub mod injection_member_tests;
pub mod lifetime_tests;
pub mod override_tests;
pub mod policy_tests;
pub mod unregistered_tests;
