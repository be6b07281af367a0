//! Interview-phase control.
//!
//! Decides when the interaction should move from information-gathering to
//! recommendation, and produces the advisory directive prepended to the
//! system instruction for the generation service. The directive is advisory
//! text only; the engine never verifies that the service complies.

use std::fmt::Write as _;

use crate::extract::PatientFields;

/// Named thresholds for the interview phase.
#[derive(Debug, Clone, Copy)]
pub struct PhaseLimits {
    /// Total number of clinician questions budgeted for the interview.
    pub question_budget: u32,
    /// Question count at which the directive starts nudging toward wrap-up.
    pub wrapup_threshold: u32,
}

impl Default for PhaseLimits {
    fn default() -> Self {
        Self {
            question_budget: 7,
            wrapup_threshold: 5,
        }
    }
}

/// Outcome of a phase decision for one turn.
#[derive(Debug, Clone)]
pub struct PhaseDecision {
    /// Whether the interview should switch to recommendations.
    pub should_recommend: bool,
    /// Session-context annotation for the generation service.
    pub directive: String,
}

/// Decide the interview phase for the current turn.
///
/// Recommendation mode is entered once the question budget is exhausted or
/// symptoms have been reported, whichever comes first.
#[must_use]
pub fn decide(fields: &PatientFields, questions_asked: u32, limits: &PhaseLimits) -> PhaseDecision {
    let should_recommend = questions_asked >= limits.question_budget || fields.has_symptoms;

    let mut directive = String::from("\n[Session Context: ");
    if let Some(name) = &fields.name {
        let _ = write!(directive, "Name: {name}, ");
    }
    if let Some(age) = &fields.age {
        let _ = write!(directive, "Age: {age}, ");
    }
    let _ = write!(
        directive,
        "Questions asked: {questions_asked}/{}, ",
        limits.question_budget
    );

    if questions_asked >= limits.wrapup_threshold {
        directive.push_str(
            "IMPORTANT: You've asked enough questions. After the next 1-2 answers, \
             IMMEDIATELY provide comprehensive medical recommendations.]",
        );
    } else if questions_asked >= limits.question_budget {
        // Unreachable while wrapup_threshold <= question_budget; kept as-is
        // pending product clarification of the two thresholds.
        directive.push_str(
            "CRITICAL: You MUST provide comprehensive medical recommendations NOW. \
             Do not ask more questions!]",
        );
    } else {
        let remaining = limits.question_budget - questions_asked;
        let _ = write!(
            directive,
            "Ask {remaining} more essential questions then give recommendations.]"
        );
    }

    PhaseDecision {
        should_recommend,
        directive,
    }
}
