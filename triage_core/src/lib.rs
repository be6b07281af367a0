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

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod extract;
pub mod phase;
pub mod record;
pub mod retention;

pub use extract::{PatientFields, extract};
pub use phase::{PhaseDecision, PhaseLimits, decide};
pub use record::{DEFAULT_MAX_HISTORY, SessionRecord};
pub use retention::trim;

/// Default lifetime of a cached session, measured from creation.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Clinician,
}

/// A single message in a consultation. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            timestamp: Utc::now(),
        }
    }
}

/// External natural-language generation service.
///
/// The engine has no timeout of its own for this call; cancellation is the
/// caller's concern.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a reply for the given history under a system instruction.
    async fn generate(
        &self,
        model: &str,
        system_instruction: &str,
        history: &[Message],
    ) -> anyhow::Result<String>;

    fn default_model(&self) -> &str;
}

/// Durable key-value store for session records, one entry per session id
/// with full-overwrite semantics.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Overwrite the durable entry for the record's id.
    async fn put(&self, record: &SessionRecord) -> anyhow::Result<()>;

    /// Load a record, defaulting any missing field.
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<SessionRecord>>;

    /// Remove the durable entry. Returns whether an entry existed.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;

    async fn list_ids(&self) -> anyhow::Result<Vec<Uuid>>;

    /// Persist a summary artifact for the session, returning its reference.
    async fn save_summary(&self, id: Uuid, text: &str) -> anyhow::Result<String>;

    /// Best-effort removal of a previously saved summary artifact.
    async fn delete_summary(&self, document_ref: &str) -> anyhow::Result<()>;
}
