//! HomeOps Doctor - read-only health doctor for Home Assistant
//!
//! Polls the hub, classifies entity state, groups abnormal entities by
//! domain and owning device/integration, and ranks them into one
//! prioritized, explainable report.
//!
//! # Architecture
//!
//! - **hub**: snapshot types and the REST client (the only I/O toward the hub)
//! - **analysis**: deterministic classify → group → rank → assemble pipeline
//! - **doctor**: one bounded fetch + analysis pass, terminal rendering
//! - **poller**: repeated passes, atomic publication, stale fallback
//! - **http**: read-only routes over the published report

pub mod errors;
pub mod config;
pub mod hub;
pub mod analysis;
pub mod doctor;
pub mod poller;
pub mod http;
pub mod cli;

// Re-export commonly used types
pub use analysis::{Analyzer, Report};
pub use errors::{DoctorError, Result};
