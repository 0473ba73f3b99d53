//! examforge-core: test-taking session engine, scoring, and analytics.
//!
//! This crate defines the data model, the per-question navigation state
//! machine and countdown, the answer scoring rules, and the aggregation
//! engine that rolls scored responses up into subject/topic/subtopic
//! statistics. Storage is reached only through the traits in [`traits`].

pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod results;
pub mod scoring;
pub mod session;
pub mod statistics;
pub mod submission;
pub mod timer;
pub mod timestamp;
pub mod traits;
