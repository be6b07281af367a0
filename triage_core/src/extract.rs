//! Best-effort structured-field extraction from free text.
//!
//! These are keyword heuristics, not language understanding. The function is
//! stateless and never fails; absence of a cue simply yields no field. The
//! caller merges the returned partial fields into the session record.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// First standalone 1-3 digit number in the text.
#[expect(clippy::expect_used, reason = "the pattern is a compile-time constant")]
static AGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,3})\b").expect("valid age pattern"));

/// Self-reference cues that precede a name.
const NAME_CUES: [&str; 4] = ["name is", "i'm", "i am", "im"];

/// Fields extracted from patient messages over the course of a session.
///
/// Values are overwritten last-write-wins and never validated. `has_symptoms`
/// is sticky: once set it is never cleared by extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientFields {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub has_symptoms: bool,
}

impl PatientFields {
    /// Merge a partial extraction result into these fields.
    ///
    /// Name and age overwrite last-write-wins; the symptom flag only ever
    /// moves from false to true.
    pub fn merge(&mut self, update: &Self) {
        if let Some(name) = &update.name {
            self.name = Some(name.clone());
        }
        if let Some(age) = &update.age {
            self.age = Some(age.clone());
        }
        if update.has_symptoms {
            self.has_symptoms = true;
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.age.is_none() && !self.has_symptoms
    }
}

/// Scan a message for name, age, and symptom cues.
///
/// Heuristics apply independently; any subset may fire. A 3-digit "age" such
/// as `911` is accepted as-is, intentionally.
#[must_use]
pub fn extract(text: &str) -> PatientFields {
    let mut fields = PatientFields::default();
    let lower = text.to_lowercase();

    if NAME_CUES.iter().any(|cue| lower.contains(cue)) {
        let words: Vec<&str> = text.split_whitespace().collect();
        for (i, word) in words.iter().enumerate() {
            let is_cue = matches!(word.to_lowercase().as_str(), "is" | "i'm" | "am" | "im");
            if is_cue {
                if let Some(next) = words.get(i + 1) {
                    let name = next.trim_matches(&['.', ',', '!', '?'][..]);
                    fields.name = Some(name.to_string());
                }
            }
        }
    }

    if lower.contains("year") || lower.contains("age") {
        if let Some(caps) = AGE_RE.captures(text) {
            fields.age = Some(caps[1].to_string());
        }
    }

    if lower.contains("fever") || lower.contains("pain") || lower.contains("sick") {
        fields.has_symptoms = true;
    }

    fields
}
