//! Per-session aggregate state.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::extract::PatientFields;
use crate::retention;
use crate::{Message, Role};

/// Default bound on retained history length.
pub const DEFAULT_MAX_HISTORY: usize = 20;

/// The complete state of one consultation session.
///
/// History is bounded by the retention policy after every append; extracted
/// fields are merged last-write-wins; `questions_asked` counts clinician
/// messages containing a question mark and only resets on a full restart.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Session identifier, assigned at creation and never reassigned.
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub history: Vec<Message>,
    pub fields: PatientFields,
    pub questions_asked: u32,
    /// History bound, fixed at creation.
    pub max_history: usize,
    /// Reference to a previously generated summary artifact, if any.
    pub document_ref: Option<String>,
}

impl SessionRecord {
    #[must_use]
    pub fn new(id: Uuid, max_history: usize) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            last_updated: now,
            history: Vec::new(),
            fields: PatientFields::default(),
            questions_asked: 0,
            max_history,
            document_ref: None,
        }
    }

    /// Append a message, counting clinician questions and applying the
    /// retention policy.
    pub fn push_message(&mut self, role: Role, content: String) {
        if role == Role::Clinician && content.contains('?') {
            self.questions_asked += 1;
        }

        self.history.push(Message::new(role, content));
        if self.history.len() > self.max_history {
            self.history = retention::trim(std::mem::take(&mut self.history), self.max_history);
        }

        self.last_updated = Utc::now();
    }

    /// Merge extracted fields into the record, last-write-wins.
    pub fn absorb_fields(&mut self, update: &PatientFields) {
        if update.is_empty() {
            return;
        }
        self.fields.merge(update);
        self.last_updated = Utc::now();
    }

    pub fn set_document_ref(&mut self, document_ref: String) {
        self.document_ref = Some(document_ref);
        self.last_updated = Utc::now();
    }

    #[must_use]
    pub const fn message_count(&self) -> usize {
        self.history.len()
    }
}
