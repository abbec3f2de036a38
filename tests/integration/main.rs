//! Integration tests for sumi-atlas
//!
//! Explorer scenarios run against a scripted in-memory browser session;
//! the WebDriver readiness probe and the per-engine runner run against
//! wiremock servers standing in for a driver.

mod driver_tests;
mod explorer_tests;
mod runner_tests;
mod support;
