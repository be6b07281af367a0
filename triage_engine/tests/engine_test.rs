//! End-to-end engine tests against a scripted provider and a real file
//! store in a throwaway directory.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use triage_core::{LLMProvider, Message, SessionStore};
use triage_engine::{ConsultationEngine, EngineConfig, EngineError};
use triage_store::JsonFileStore;

/// Provider that pops pre-scripted outcomes in order.
struct ScriptedProvider {
    script: Mutex<VecDeque<anyhow::Result<String>>>,
}

impl ScriptedProvider {
    fn new(outcomes: Vec<anyhow::Result<String>>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
        }
    }

    fn replying(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok((*r).to_string())).collect())
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn generate(
        &self,
        _model: &str,
        _system_instruction: &str,
        _history: &[Message],
    ) -> anyhow::Result<String> {
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Ok("Understood.".to_string()))
    }

    fn default_model(&self) -> &str {
        "scripted"
    }
}

fn temp_root() -> PathBuf {
    std::env::temp_dir().join(format!("triage-engine-{}", Uuid::now_v7()))
}

fn engine_at(
    root: &std::path::Path,
    provider: ScriptedProvider,
) -> ConsultationEngine<ScriptedProvider, JsonFileStore> {
    let store =
        JsonFileStore::new(root.join("sessions"), root.join("summaries")).expect("store setup");
    ConsultationEngine::new(provider, store, EngineConfig::default())
}

fn raw_store(root: &std::path::Path) -> JsonFileStore {
    JsonFileStore::new(root.join("sessions"), root.join("summaries")).expect("store setup")
}

#[tokio::test]
async fn start_session_persists_greeting() {
    let root = temp_root();
    let engine = engine_at(&root, ScriptedProvider::replying(&[]));

    let started = engine.start_session().await.expect("start");
    assert!(started.message.contains("name"));

    let stored = raw_store(&root)
        .get(started.session_id)
        .await
        .expect("get")
        .expect("persisted");
    assert_eq!(stored.history.len(), 1);
    assert_eq!(stored.questions_asked, 1); // the greeting asks for a name

    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn chat_extracts_fields_and_appends_both_turns() {
    let root = temp_root();
    let engine = engine_at(
        &root,
        ScriptedProvider::replying(&["Hello Alice, what brings you in today?"]),
    );

    let started = engine.start_session().await.expect("start");
    let reply = engine
        .chat(Some(started.session_id), "Hi, my name is Alice")
        .await
        .expect("chat");

    assert_eq!(reply.session_id, started.session_id);
    assert_eq!(reply.fields.name.as_deref(), Some("Alice"));
    assert!(reply.reply.contains("Alice"));

    let view = engine.history(started.session_id).await.expect("history");
    assert_eq!(view.history.len(), 3); // greeting + patient + clinician
    assert_eq!(view.questions_asked, 2);

    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn chat_without_id_creates_session_without_greeting() {
    let root = temp_root();
    let engine = engine_at(&root, ScriptedProvider::replying(&["What symptoms do you have?"]));

    let reply = engine.chat(None, "hello").await.expect("chat");

    let view = engine.history(reply.session_id).await.expect("history");
    assert_eq!(view.history.len(), 2); // patient + clinician only
    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn chat_with_unknown_id_allocates_a_new_one() {
    let root = temp_root();
    let engine = engine_at(&root, ScriptedProvider::replying(&["Noted."]));

    let unknown = Uuid::now_v7();
    let reply = engine.chat(Some(unknown), "hello").await.expect("chat");

    assert_ne!(reply.session_id, unknown);
    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn generation_failure_does_not_roll_back_the_turn() {
    let root = temp_root();
    let engine = engine_at(
        &root,
        ScriptedProvider::new(vec![Err(anyhow::anyhow!("upstream unavailable"))]),
    );

    let started = engine.start_session().await.expect("start");
    let err = engine
        .chat(Some(started.session_id), "I'm Bob and I have a fever")
        .await
        .expect_err("generation should fail");
    assert!(matches!(err, EngineError::Generation(_)));
    assert!(err.to_string().contains("generation service error"));

    // The patient message and the extracted fields survived the failure.
    let stored = raw_store(&root)
        .get(started.session_id)
        .await
        .expect("get")
        .expect("persisted");
    assert_eq!(stored.history.len(), 2);
    assert_eq!(stored.fields.name.as_deref(), Some("Bob"));
    assert!(stored.fields.has_symptoms);

    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn load_session_reads_through_and_populates_cache() {
    let root = temp_root();

    let session_id = {
        let engine = engine_at(&root, ScriptedProvider::replying(&["Okay."]));
        let started = engine.start_session().await.expect("start");
        engine
            .chat(Some(started.session_id), "my name is Carol")
            .await
            .expect("chat");
        started.session_id
    };

    // Fresh engine over the same directory: empty cache, durable records.
    let engine = engine_at(&root, ScriptedProvider::replying(&[]));

    let first = engine.load_session(session_id).await.expect("load");
    assert!(!first.from_cache);
    assert_eq!(first.fields.name.as_deref(), Some("Carol"));
    assert_eq!(first.history.len(), 3);

    let second = engine.load_session(session_id).await.expect("load again");
    assert!(second.from_cache);

    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn load_session_on_unknown_id_is_not_found() {
    let root = temp_root();
    let engine = engine_at(&root, ScriptedProvider::replying(&[]));

    let id = Uuid::now_v7();
    let err = engine.load_session(id).await.expect_err("should miss");
    assert!(matches!(err, EngineError::NotFound(missing) if missing == id));

    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn restart_resets_state_under_the_same_id() {
    let root = temp_root();
    let engine = engine_at(&root, ScriptedProvider::replying(&["Could you describe the pain?"]));

    let started = engine.start_session().await.expect("start");
    engine
        .chat(Some(started.session_id), "I'm Dave, severe pain")
        .await
        .expect("chat");

    let restarted = engine
        .restart_session(started.session_id)
        .await
        .expect("restart");
    assert_eq!(restarted.session_id, started.session_id);

    let view = engine.load_session(started.session_id).await.expect("load");
    assert_eq!(view.history.len(), 1);
    assert_eq!(view.questions_asked, 1); // just the restart greeting
    assert!(view.fields.is_empty());

    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn list_sessions_is_sorted_by_recency() {
    let root = temp_root();
    let engine = engine_at(
        &root,
        ScriptedProvider::replying(&["Okay.", "Okay.", "Okay."]),
    );

    let a = engine.start_session().await.expect("start a");
    let b = engine.start_session().await.expect("start b");
    engine
        .chat(Some(a.session_id), "my name is Erin")
        .await
        .expect("chat");

    let listings = engine.list_sessions().await.expect("list");
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0].session_id, a.session_id); // updated last
    assert_eq!(listings[0].name.as_deref(), Some("Erin"));
    assert_eq!(listings[1].session_id, b.session_id);
    assert!(listings[0].last_updated >= listings[1].last_updated);

    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn summary_writes_artifact_and_document_ref() {
    let root = temp_root();
    let engine = engine_at(
        &root,
        ScriptedProvider::replying(&["Take rest.", "Full consultation summary."]),
    );

    let started = engine.start_session().await.expect("start");
    engine
        .chat(Some(started.session_id), "I feel sick")
        .await
        .expect("chat");

    let result = engine
        .generate_summary(started.session_id)
        .await
        .expect("summary");
    assert_eq!(result.summary, "Full consultation summary.");
    assert_eq!(
        result.document_ref,
        format!("{}_summary.md", started.session_id)
    );

    let stored = raw_store(&root)
        .get(started.session_id)
        .await
        .expect("get")
        .expect("persisted");
    assert_eq!(stored.document_ref.as_deref(), Some(result.document_ref.as_str()));

    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn delete_removes_cache_store_and_artifact() {
    let root = temp_root();
    let engine = engine_at(&root, ScriptedProvider::replying(&["Okay.", "Summary."]));

    let started = engine.start_session().await.expect("start");
    engine
        .chat(Some(started.session_id), "hello")
        .await
        .expect("chat");
    let summary = engine
        .generate_summary(started.session_id)
        .await
        .expect("summary");

    engine
        .delete_session(started.session_id)
        .await
        .expect("delete");

    assert!(matches!(
        engine.load_session(started.session_id).await,
        Err(EngineError::NotFound(_))
    ));
    let store = raw_store(&root);
    assert!(store.get(started.session_id).await.expect("get").is_none());
    assert!(!store.summary_path(&summary.document_ref).exists());

    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn delete_unknown_session_is_not_found() {
    let root = temp_root();
    let engine = engine_at(&root, ScriptedProvider::replying(&[]));

    let err = engine
        .delete_session(Uuid::now_v7())
        .await
        .expect_err("nothing to delete");
    assert!(matches!(err, EngineError::NotFound(_)));

    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn delete_of_store_only_session_succeeds() {
    let root = temp_root();

    let session_id = {
        let engine = engine_at(&root, ScriptedProvider::replying(&[]));
        engine.start_session().await.expect("start").session_id
    };

    // New engine: the session exists durably but is not cached.
    let engine = engine_at(&root, ScriptedProvider::replying(&[]));
    engine.delete_session(session_id).await.expect("delete");
    assert!(raw_store(&root)
        .get(session_id)
        .await
        .expect("get")
        .is_none());

    let _ = std::fs::remove_dir_all(root);
}

#[tokio::test]
async fn stats_evicts_expired_sessions_but_store_copy_survives() {
    let root = temp_root();
    let store =
        JsonFileStore::new(root.join("sessions"), root.join("summaries")).expect("store setup");
    let config = EngineConfig {
        session_ttl_secs: 0, // everything expires immediately
        ..EngineConfig::default()
    };
    let engine = ConsultationEngine::new(ScriptedProvider::replying(&[]), store, config);

    let started = engine.start_session().await.expect("start");
    assert_eq!(engine.cache().len().await, 1);

    let stats = engine.stats().await.expect("stats");
    assert_eq!(stats.active_sessions, 0);
    assert_eq!(stats.stored_sessions, 1);

    // Cache miss now falls through to the durable copy.
    let view = engine.load_session(started.session_id).await.expect("load");
    assert!(!view.from_cache);
    assert_eq!(view.history.len(), 1);

    let _ = std::fs::remove_dir_all(root);
}
