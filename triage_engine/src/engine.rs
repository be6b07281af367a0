//! The consultation engine: session lifecycle operations over cached state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use triage_core::phase::{self, PhaseLimits};
use triage_core::record::DEFAULT_MAX_HISTORY;
use triage_core::{
    DEFAULT_SESSION_TTL_SECS, LLMProvider, Message, PatientFields, Role, SessionRecord,
    SessionStore, extract,
};

use crate::cache::{SessionCache, SessionHandle};
use crate::prompt;

/// Engine configuration with the documented defaults.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Model identifier passed to the generation service.
    pub model: String,
    /// History bound applied to every session at creation.
    pub max_history: usize,
    /// Cache lifetime measured from session creation.
    pub session_ttl_secs: u64,
    /// Interview-phase thresholds.
    pub limits: PhaseLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_history: DEFAULT_MAX_HISTORY,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            limits: PhaseLimits::default(),
        }
    }
}

/// Errors surfaced by engine operations.
///
/// `NotFound` is a client error; the rest are server errors for that turn
/// only and never fatal to the process.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("session not found: {0}")]
    NotFound(Uuid),

    #[error("generation service error: {0}")]
    Generation(#[source] anyhow::Error),

    #[error("session store error: {0}")]
    Store(#[source] anyhow::Error),

    #[error("empty reply from generation service")]
    EmptyReply,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartedSession {
    pub session_id: Uuid,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub session_id: Uuid,
    pub reply: String,
    pub timestamp: DateTime<Utc>,
    pub fields: PatientFields,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub history: Vec<Message>,
    pub fields: PatientFields,
    pub created_at: DateTime<Utc>,
    pub questions_asked: u32,
    pub document_ref: Option<String>,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionListing {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub name: Option<String>,
    pub message_count: usize,
    pub has_summary: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResult {
    pub session_id: Uuid,
    pub summary: String,
    pub document_ref: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub active_sessions: usize,
    pub stored_sessions: usize,
    pub timestamp: DateTime<Utc>,
}

/// Stateful conversation session engine.
///
/// Composes the TTL cache, the durable store, and the generation service.
/// Every mutating operation persists the full record before returning, so a
/// downstream generation failure never rolls back the turn's extracted
/// fields or the already-appended patient message.
pub struct ConsultationEngine<P, S> {
    provider: P,
    store: S,
    cache: SessionCache,
    config: EngineConfig,
}

impl<P, S> ConsultationEngine<P, S>
where
    P: LLMProvider,
    S: SessionStore,
{
    pub fn new(provider: P, store: S, mut config: EngineConfig) -> Self {
        if config.model.is_empty() {
            config.model = provider.default_model().to_string();
        }
        let cache = SessionCache::new(config.session_ttl_secs);
        Self {
            provider,
            store,
            cache,
            config,
        }
    }

    /// Start a new session with the opening greeting.
    pub async fn start_session(&self) -> Result<StartedSession, EngineError> {
        let id = Uuid::now_v7();
        info!("Starting session {id}");
        self.open_fresh(id, prompt::GREETING).await
    }

    /// Unconditionally replace any record under `id` with a fresh one.
    pub async fn restart_session(&self, id: Uuid) -> Result<StartedSession, EngineError> {
        self.cache.remove(id).await;
        info!("Restarting session {id}");
        self.open_fresh(id, prompt::RESTART_GREETING).await
    }

    /// Process one caller turn.
    ///
    /// A missing or unknown session id allocates a fresh session. The whole
    /// read-modify-write cycle runs under the per-session lock, including
    /// the generation call, so a slow provider blocks concurrent turns on
    /// this session only.
    pub async fn chat(
        &self,
        session_id: Option<Uuid>,
        message: &str,
    ) -> Result<TurnReply, EngineError> {
        let (id, handle) = match session_id {
            Some(id) => match self.cache.lookup(id).await {
                Some(handle) => (id, handle),
                None => self.implicit_session().await,
            },
            None => self.implicit_session().await,
        };

        let mut record = handle.lock().await;

        record.absorb_fields(&extract(message));
        record.push_message(Role::Patient, message.to_string());
        self.persist(&record).await?;

        let decision = phase::decide(&record.fields, record.questions_asked, &self.config.limits);
        debug!(
            "Session {id}: questions_asked={}, should_recommend={}",
            record.questions_asked, decision.should_recommend
        );
        let system = format!("{}{}", prompt::CLINICIAN_SYSTEM_PROMPT, decision.directive);

        let reply = self
            .provider
            .generate(&self.config.model, &system, &record.history)
            .await
            .map_err(EngineError::Generation)?;
        if reply.trim().is_empty() {
            return Err(EngineError::EmptyReply);
        }

        record.push_message(Role::Clinician, reply.clone());
        self.persist(&record).await?;

        Ok(TurnReply {
            session_id: id,
            reply,
            timestamp: record.last_updated,
            fields: record.fields.clone(),
        })
    }

    /// Load a session, reading through to the store on cache miss and
    /// populating the cache on that path.
    pub async fn load_session(&self, id: Uuid) -> Result<SessionView, EngineError> {
        if let Some(handle) = self.cache.lookup(id).await {
            let record = handle.lock().await;
            return Ok(Self::view(&record, true));
        }

        let record = self
            .store
            .get(id)
            .await
            .map_err(EngineError::Store)?
            .ok_or(EngineError::NotFound(id))?;
        let handle = self.cache.insert(record).await;
        let record = handle.lock().await;
        Ok(Self::view(&record, false))
    }

    /// Read-only view of a session's history; does not populate the cache.
    pub async fn history(&self, id: Uuid) -> Result<SessionView, EngineError> {
        if let Some(handle) = self.cache.lookup(id).await {
            let record = handle.lock().await;
            return Ok(Self::view(&record, true));
        }

        let record = self
            .store
            .get(id)
            .await
            .map_err(EngineError::Store)?
            .ok_or(EngineError::NotFound(id))?;
        Ok(Self::view(&record, false))
    }

    /// Store-backed session listing, most recently updated first.
    ///
    /// Doubles as the opportunistic eviction point; eviction is lazy and
    /// only runs from here and from `stats`.
    pub async fn list_sessions(&self) -> Result<Vec<SessionListing>, EngineError> {
        self.cache.evict_expired().await;

        let ids = self.store.list_ids().await.map_err(EngineError::Store)?;
        let mut listings = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.store.get(id).await.map_err(EngineError::Store)? {
                listings.push(SessionListing {
                    session_id: record.id,
                    created_at: record.created_at,
                    last_updated: record.last_updated,
                    name: record.fields.name.clone(),
                    message_count: record.message_count(),
                    has_summary: record.document_ref.is_some(),
                });
            }
        }

        listings.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(listings)
    }

    /// Generate a consultation summary and persist it as an artifact.
    pub async fn generate_summary(&self, id: Uuid) -> Result<SummaryResult, EngineError> {
        let handle = self.fetch(id).await?;
        let mut record = handle.lock().await;

        let mut transcript = record.history.clone();
        transcript.push(Message::new(Role::Patient, prompt::SUMMARY_REQUEST.to_string()));

        let summary = self
            .provider
            .generate(&self.config.model, prompt::CLINICIAN_SYSTEM_PROMPT, &transcript)
            .await
            .map_err(EngineError::Generation)?;

        let document_ref = self
            .store
            .save_summary(id, &summary)
            .await
            .map_err(EngineError::Store)?;
        record.set_document_ref(document_ref.clone());
        self.persist(&record).await?;

        info!("Generated summary for session {id}");
        Ok(SummaryResult {
            session_id: id,
            summary,
            document_ref,
        })
    }

    /// Remove the cache entry, the durable record, and any summary artifact.
    /// Not-found only when none of them existed.
    pub async fn delete_session(&self, id: Uuid) -> Result<(), EngineError> {
        let cached = self.cache.remove(id).await;
        let document_ref = match &cached {
            Some(handle) => handle.lock().await.document_ref.clone(),
            None => self
                .store
                .get(id)
                .await
                .map_err(EngineError::Store)?
                .and_then(|record| record.document_ref),
        };

        let stored = self.store.delete(id).await.map_err(EngineError::Store)?;
        if cached.is_none() && !stored {
            return Err(EngineError::NotFound(id));
        }

        if let Some(document_ref) = document_ref {
            self.store
                .delete_summary(&document_ref)
                .await
                .map_err(EngineError::Store)?;
        }

        info!("Deleted session {id}");
        Ok(())
    }

    /// Cache and store counts for health reporting; also an opportunistic
    /// eviction point.
    pub async fn stats(&self) -> Result<EngineStats, EngineError> {
        self.cache.evict_expired().await;
        let stored = self.store.list_ids().await.map_err(EngineError::Store)?;

        Ok(EngineStats {
            active_sessions: self.cache.len().await,
            stored_sessions: stored.len(),
            timestamp: Utc::now(),
        })
    }

    #[must_use]
    pub const fn cache(&self) -> &SessionCache {
        &self.cache
    }

    async fn open_fresh(&self, id: Uuid, greeting: &str) -> Result<StartedSession, EngineError> {
        let mut record = SessionRecord::new(id, self.config.max_history);
        record.push_message(Role::Clinician, greeting.to_string());
        self.persist(&record).await?;

        let timestamp = record.last_updated;
        self.cache.insert(record).await;

        Ok(StartedSession {
            session_id: id,
            message: greeting.to_string(),
            timestamp,
        })
    }

    /// Fresh session for a chat call that arrived without a usable id. No
    /// greeting: the patient's message opens the history.
    async fn implicit_session(&self) -> (Uuid, SessionHandle) {
        let id = Uuid::now_v7();
        info!("Creating implicit session {id}");
        let record = SessionRecord::new(id, self.config.max_history);
        let handle = self.cache.insert(record).await;
        (id, handle)
    }

    /// Cache-aside fetch that populates the cache on a store hit.
    async fn fetch(&self, id: Uuid) -> Result<SessionHandle, EngineError> {
        if let Some(handle) = self.cache.lookup(id).await {
            return Ok(handle);
        }

        let record = self
            .store
            .get(id)
            .await
            .map_err(EngineError::Store)?
            .ok_or(EngineError::NotFound(id))?;
        Ok(self.cache.insert(record).await)
    }

    async fn persist(&self, record: &SessionRecord) -> Result<(), EngineError> {
        self.store.put(record).await.map_err(EngineError::Store)
    }

    fn view(record: &SessionRecord, from_cache: bool) -> SessionView {
        SessionView {
            session_id: record.id,
            history: record.history.clone(),
            fields: record.fields.clone(),
            created_at: record.created_at,
            questions_asked: record.questions_asked,
            document_ref: record.document_ref.clone(),
            from_cache,
        }
    }
}
