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

//! Durable session storage: one JSON file per session id.
//!
//! Every write is a full overwrite of the session's file, performed after
//! each mutating operation. There is no write-ahead log and no atomic
//! rename; a crash mid-write can leave a truncated file for that session,
//! which is an accepted failure mode. Reads default any missing field so a
//! partially written or older-schema record still loads.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use triage_core::record::DEFAULT_MAX_HISTORY;
use triage_core::{Message, PatientFields, SessionRecord, SessionStore};

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Durable on-disk representation of a session.
///
/// Every field defaults on read so older or partial records never fail to
/// load. `message_count` is denormalized for listing and recomputed from
/// `history` when the record is reconstructed.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    #[serde(default)]
    session_id: Option<Uuid>,
    #[serde(default = "default_timestamp")]
    created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    last_updated: DateTime<Utc>,
    #[serde(default)]
    patient_data: PatientFields,
    #[serde(default)]
    questions_asked: u32,
    #[serde(default)]
    history: Vec<Message>,
    #[serde(default)]
    message_count: usize,
    #[serde(default)]
    summary_filename: Option<String>,
}

impl StoredSession {
    fn from_record(record: &SessionRecord) -> Self {
        Self {
            session_id: Some(record.id),
            created_at: record.created_at,
            last_updated: record.last_updated,
            patient_data: record.fields.clone(),
            questions_asked: record.questions_asked,
            history: record.history.clone(),
            message_count: record.history.len(),
            summary_filename: record.document_ref.clone(),
        }
    }

    /// Rebuild the in-memory record, falling back to the requested id when
    /// the file predates the id field.
    fn into_record(self, requested: Uuid) -> SessionRecord {
        SessionRecord {
            id: self.session_id.unwrap_or(requested),
            created_at: self.created_at,
            last_updated: self.last_updated,
            history: self.history,
            fields: self.patient_data,
            questions_asked: self.questions_asked,
            max_history: DEFAULT_MAX_HISTORY,
            document_ref: self.summary_filename,
        }
    }
}

/// File-per-session JSON store with a sibling directory for summary
/// artifacts.
pub struct JsonFileStore {
    sessions_dir: PathBuf,
    summaries_dir: PathBuf,
}

impl JsonFileStore {
    /// Open (and create if needed) the storage directories.
    pub fn new(
        sessions_dir: impl Into<PathBuf>,
        summaries_dir: impl Into<PathBuf>,
    ) -> anyhow::Result<Self> {
        let sessions_dir = sessions_dir.into();
        let summaries_dir = summaries_dir.into();
        std::fs::create_dir_all(&sessions_dir)?;
        std::fs::create_dir_all(&summaries_dir)?;
        info!("Session storage at {}", sessions_dir.display());

        Ok(Self {
            sessions_dir,
            summaries_dir,
        })
    }

    fn session_path(&self, id: Uuid) -> PathBuf {
        self.sessions_dir.join(format!("{id}.json"))
    }

    #[must_use]
    pub fn summary_path(&self, document_ref: &str) -> PathBuf {
        self.summaries_dir.join(document_ref)
    }

    #[must_use]
    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn put(&self, record: &SessionRecord) -> anyhow::Result<()> {
        let stored = StoredSession::from_record(record);
        let json = serde_json::to_string_pretty(&stored)?;
        tokio::fs::write(self.session_path(record.id), json).await?;
        debug!("Persisted session {}", record.id);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<SessionRecord>> {
        let content = match tokio::fs::read_to_string(self.session_path(id)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<StoredSession>(&content) {
            Ok(stored) => Ok(Some(stored.into_record(id))),
            Err(e) => {
                // Truncated or unparseable file; treat as absent rather than
                // failing every subsequent read of this id.
                warn!("Skipping unreadable session file for {id}: {e}");
                Ok(None)
            }
        }
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        match tokio::fs::remove_file(self.session_path(id)).await {
            Ok(()) => {
                info!("Deleted session file for {id}");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_ids(&self) -> anyhow::Result<Vec<Uuid>> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.sessions_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if let Ok(id) = stem.parse::<Uuid>() {
                    ids.push(id);
                }
            }
        }

        Ok(ids)
    }

    async fn save_summary(&self, id: Uuid, text: &str) -> anyhow::Result<String> {
        let document_ref = format!("{id}_summary.md");
        tokio::fs::write(self.summary_path(&document_ref), text).await?;
        info!("Saved summary artifact {document_ref}");
        Ok(document_ref)
    }

    async fn delete_summary(&self, document_ref: &str) -> anyhow::Result<()> {
        let _ = tokio::fs::remove_file(self.summary_path(document_ref)).await;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use triage_core::Role;

    fn temp_store() -> (JsonFileStore, PathBuf) {
        let root = std::env::temp_dir().join(format!("triage-store-{}", Uuid::now_v7()));
        let store = JsonFileStore::new(root.join("sessions"), root.join("summaries"))
            .expect("store setup");
        (store, root)
    }

    fn sample_record() -> SessionRecord {
        let mut record = SessionRecord::new(Uuid::now_v7(), DEFAULT_MAX_HISTORY);
        record.push_message(Role::Clinician, "Hello, what is your name?".into());
        record.push_message(Role::Patient, "I'm Alice, I have a fever".into());
        record.absorb_fields(&triage_core::extract("I'm Alice, I have a fever"));
        record
    }

    #[tokio::test]
    async fn round_trips_a_record() {
        let (store, root) = temp_store();
        let record = sample_record();

        store.put(&record).await.expect("put");
        let loaded = store
            .get(record.id)
            .await
            .expect("get")
            .expect("record should exist");

        assert_eq!(loaded.id, record.id);
        assert_eq!(loaded.created_at, record.created_at);
        assert_eq!(loaded.questions_asked, 1);
        assert_eq!(loaded.history.len(), 2);
        assert_eq!(loaded.fields.name.as_deref(), Some("Alice"));
        assert!(loaded.fields.has_symptoms);

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn get_on_unknown_id_is_none() {
        let (store, root) = temp_store();
        assert!(store.get(Uuid::now_v7()).await.expect("get").is_none());
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn put_is_full_overwrite() {
        let (store, root) = temp_store();
        let mut record = sample_record();
        store.put(&record).await.expect("first put");

        record.push_message(Role::Clinician, "How long has this lasted?".into());
        store.put(&record).await.expect("second put");

        let loaded = store
            .get(record.id)
            .await
            .expect("get")
            .expect("record should exist");
        assert_eq!(loaded.history.len(), 3);
        assert_eq!(loaded.questions_asked, 2);

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn partial_record_loads_with_defaults() {
        let (store, root) = temp_store();
        let id = Uuid::now_v7();
        std::fs::write(store.session_path(id), r#"{"questions_asked": 3}"#).expect("write");

        let loaded = store
            .get(id)
            .await
            .expect("get")
            .expect("partial record should load");

        assert_eq!(loaded.id, id);
        assert_eq!(loaded.questions_asked, 3);
        assert!(loaded.history.is_empty());
        assert!(loaded.fields.is_empty());
        assert_eq!(loaded.max_history, DEFAULT_MAX_HISTORY);

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn truncated_record_reads_as_absent() {
        let (store, root) = temp_store();
        let id = Uuid::now_v7();
        std::fs::write(store.session_path(id), r#"{"history": [{"rol"#).expect("write");

        assert!(store.get(id).await.expect("get").is_none());

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn delete_reports_whether_entry_existed() {
        let (store, root) = temp_store();
        let record = sample_record();
        store.put(&record).await.expect("put");

        assert!(store.delete(record.id).await.expect("first delete"));
        assert!(!store.delete(record.id).await.expect("second delete"));
        assert!(store.get(record.id).await.expect("get").is_none());

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn lists_only_session_files() {
        let (store, root) = temp_store();
        let a = sample_record();
        let b = sample_record();
        store.put(&a).await.expect("put a");
        store.put(&b).await.expect("put b");
        std::fs::write(store.sessions_dir().join("notes.txt"), "x").expect("write");

        let mut ids = store.list_ids().await.expect("list");
        ids.sort();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(ids, expected);

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn summary_artifacts_round_trip() {
        let (store, root) = temp_store();
        let id = Uuid::now_v7();

        let document_ref = store
            .save_summary(id, "Consultation summary body")
            .await
            .expect("save summary");
        assert_eq!(document_ref, format!("{id}_summary.md"));
        assert!(store.summary_path(&document_ref).exists());

        store
            .delete_summary(&document_ref)
            .await
            .expect("delete summary");
        assert!(!store.summary_path(&document_ref).exists());

        let _ = std::fs::remove_dir_all(root);
    }
}
