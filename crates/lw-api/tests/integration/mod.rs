//! Integration test modules.

pub mod common;
pub mod event_tests;
pub mod health_tests;
