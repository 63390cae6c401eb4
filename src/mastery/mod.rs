//! Mastery State Machine
//!
//! Moves one word record through its mastery states per attempt.
//!
//! States:
//! - New: step 0 and no attempts
//! - Practicing: below the mastery threshold
//! - MasteredActive: mastered and still cooling down, attempts are debounced
//! - MasteredIdle: mastered with cooldown 0, eligible for revision
//!
//! Cooldown only ever decreases through session-completion housekeeping
//! ([`decrement_cooldown`]), never per attempt.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MasteryPolicy;
use crate::types::{Attempt, Outcome, WordRecord};

// ==================== States ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MasteryState {
    New,
    Practicing,
    MasteredActive,
    MasteredIdle,
}

impl MasteryState {
    pub const fn as_str(self) -> &'static str {
        match self {
            MasteryState::New => "NEW",
            MasteryState::Practicing => "PRACTICING",
            MasteryState::MasteredActive => "MASTERED_ACTIVE",
            MasteryState::MasteredIdle => "MASTERED_IDLE",
        }
    }

    pub fn is_mastered(self) -> bool {
        matches!(self, MasteryState::MasteredActive | MasteryState::MasteredIdle)
    }
}

/// What a single attempt did to a word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Transition {
    /// Correct answer while practicing
    Promoted { from: u32, to: u32, reached_mastery: bool },
    /// Wrong answer while practicing
    Demoted { from: u32, to: u32 },
    /// Correct answer on a revision
    Revised { step: u32 },
    /// Wrong answer on a revision
    RevisionFailed { from: u32, to: u32 },
    /// Attempt on a word still cooling down; recorded only
    Debounced,
}

// ==================== Predicates ====================

pub fn is_mastered(word: &WordRecord, policy: &MasteryPolicy) -> bool {
    word.mastery_step >= policy.mastery_threshold
}

pub fn state_of(word: &WordRecord, policy: &MasteryPolicy) -> MasteryState {
    if is_mastered(word, policy) {
        if word.cooldown > 0 {
            MasteryState::MasteredActive
        } else {
            MasteryState::MasteredIdle
        }
    } else if word.mastery_step == 0 && !word.has_attempts() {
        MasteryState::New
    } else {
        MasteryState::Practicing
    }
}

/// Resolved words count towards session completion and are never picked
/// again within the same session.
pub fn is_resolved(word: &WordRecord, policy: &MasteryPolicy) -> bool {
    state_of(word, policy) == MasteryState::MasteredActive
}

/// Mastered-idle and far enough from its last revision
pub fn is_revision_due(word: &WordRecord, policy: &MasteryPolicy, now: DateTime<Utc>) -> bool {
    if state_of(word, policy) != MasteryState::MasteredIdle {
        return false;
    }
    match word.last_revised_at {
        Some(revised_at) => {
            now - revised_at >= Duration::seconds(policy.revision_min_interval_secs)
        }
        None => true,
    }
}

// ==================== Transitions ====================

/// Apply one attempt to a word record
pub fn apply(
    word: &mut WordRecord,
    outcome: Outcome,
    now: DateTime<Utc>,
    policy: &MasteryPolicy,
) -> Transition {
    word.attempts.push(Attempt {
        timestamp: now,
        outcome,
    });

    let from = word.mastery_step.min(policy.step_max);

    let transition = match state_of(word, policy) {
        MasteryState::MasteredActive => Transition::Debounced,
        MasteryState::MasteredIdle => match outcome {
            Outcome::Correct => {
                word.last_revised_at = Some(now);
                word.cooldown = 1;
                Transition::Revised { step: from }
            }
            Outcome::Wrong => {
                let to = policy.revision_demotion_step.min(policy.step_max);
                word.mastery_step = to;
                word.cooldown = 0;
                Transition::RevisionFailed { from, to }
            }
        },
        MasteryState::New | MasteryState::Practicing => match outcome {
            Outcome::Correct => {
                let to = (from + 1).min(policy.step_max);
                word.mastery_step = to;
                word.last_practiced_at = Some(now);
                let reached_mastery = from < policy.mastery_threshold && to >= policy.mastery_threshold;
                if reached_mastery {
                    word.last_revised_at = Some(now);
                    word.cooldown = 1;
                }
                Transition::Promoted {
                    from,
                    to,
                    reached_mastery,
                }
            }
            Outcome::Wrong => {
                let to = from.saturating_sub(1);
                word.mastery_step = to;
                word.last_practiced_at = Some(now);
                Transition::Demoted { from, to }
            }
        },
    };

    tracing::debug!(
        word_id = %word.id,
        outcome = outcome.as_str(),
        ?transition,
        "mastery transition"
    );

    transition
}

/// Session-completion housekeeping, floor 0
pub fn decrement_cooldown(word: &mut WordRecord) {
    word.cooldown = word.cooldown.saturating_sub(1);
}

/// Step as a fraction of the ceiling, for progress bars
pub fn progress_fraction(word: &WordRecord, policy: &MasteryPolicy) -> f64 {
    if policy.step_max == 0 {
        return 0.0;
    }
    (word.mastery_step.min(policy.step_max) as f64 / policy.step_max as f64).clamp(0.0, 1.0)
}
