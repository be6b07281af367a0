#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Conversation session engine.
//!
//! Owns per-session state behind a TTL-bounded in-memory cache, keeps it
//! consistent with the durable store, and routes each turn through the
//! external generation service.

pub mod cache;
pub mod engine;
pub mod prompt;

pub use cache::SessionCache;
pub use engine::{
    ConsultationEngine, EngineConfig, EngineError, EngineStats, SessionListing, SessionView,
    StartedSession, SummaryResult, TurnReply,
};
