//! Shared test utilities for delfin integration tests.
//!
//! - `TestHarness` owns a temp directory with a file-backed database and an
//!   export directory, plus a scripted inference client.
//! - `RecordingNotifier` keeps every notification for assertions.

pub mod harness;

pub use harness::{jpeg, TestHarness};
