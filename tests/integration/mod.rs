//! End-to-end tests for Sarathi against in-memory links and services.
//!
//! Every scenario wires a real `Context` to `MockLink`s and the mock vision,
//! planner and camera services, with navigation pauses disabled.
//!
//! ```bash
//! cargo test --test integration -- --nocapture
//! ```

mod harness;
mod scenarios;

pub use harness::TestHarness;
