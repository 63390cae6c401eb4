//! Common Types and Constants
//!
//! Shared data structures for the learner profile aggregate: word records,
//! sessions and per-subject settings.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==================== Constants ====================

/// Default upper bound of the per-word mastery step
pub const DEFAULT_STEP_MAX: u32 = 5;

/// Default step at which a word counts as mastered
pub const DEFAULT_MASTERY_THRESHOLD: u32 = 2;

/// Default highest complexity level of a subject
pub const DEFAULT_MAX_LEVEL: u32 = 10;

/// Default number of words drawn into a session
pub const DEFAULT_SESSION_SIZE: usize = 12;

/// Upper bound accepted by `set_session_size`
pub const MAX_SESSION_SIZE: usize = 50;

/// Default fraction of resolved words that completes a session
pub const DEFAULT_COMPLETION_THRESHOLD: f64 = 0.8;

/// Lowest complexity level of every subject
pub const MIN_LEVEL: u32 = 1;

// ==================== Attempts ====================

/// Result of a single practice attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Correct,
    Wrong,
}

impl Outcome {
    pub fn is_correct(self) -> bool {
        matches!(self, Outcome::Correct)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Outcome::Correct => "correct",
            Outcome::Wrong => "wrong",
        }
    }
}

/// One entry of a word's append-only attempt history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub timestamp: DateTime<Utc>,
    pub outcome: Outcome,
}

// ==================== Word Record ====================

/// Mutable mastery state layered on top of one catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordRecord {
    pub id: String,
    pub subject_code: String,
    pub complexity_level: u32,
    pub attempts: Vec<Attempt>,
    pub mastery_step: u32,
    pub cooldown: u32,
    pub last_practiced_at: Option<DateTime<Utc>>,
    pub last_revised_at: Option<DateTime<Utc>>,
    pub reveal_count: u32,
}

impl WordRecord {
    /// Fresh record with no history
    pub fn new(id: impl Into<String>, subject_code: impl Into<String>, complexity_level: u32) -> Self {
        Self {
            id: id.into(),
            subject_code: subject_code.into(),
            complexity_level: complexity_level.max(MIN_LEVEL),
            attempts: Vec::new(),
            mastery_step: 0,
            cooldown: 0,
            last_practiced_at: None,
            last_revised_at: None,
            reveal_count: 0,
        }
    }

    pub fn has_attempts(&self) -> bool {
        !self.attempts.is_empty()
    }

    pub fn correct_count(&self) -> usize {
        self.attempts.iter().filter(|a| a.outcome.is_correct()).count()
    }
}

// ==================== Session ====================

/// Fixed-membership working set of words for one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub subject_code: String,
    /// Unlocked level of the subject when the session was drawn
    pub complexity_level: u32,
    word_ids: Vec<String>,
    pub current_index: usize,
    pub revealed: bool,
    pub last_outcome: Option<Outcome>,
    pub completion_signal: bool,
    pub created_at: DateTime<Utc>,
    pub retired_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Build a session; duplicate ids are dropped keeping first occurrence.
    pub fn new(
        id: Uuid,
        subject_code: impl Into<String>,
        complexity_level: u32,
        word_ids: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(word_ids.len());
        for word_id in word_ids {
            if !unique.contains(&word_id) {
                unique.push(word_id);
            }
        }

        Self {
            id,
            subject_code: subject_code.into(),
            complexity_level,
            word_ids: unique,
            current_index: 0,
            revealed: false,
            last_outcome: None,
            completion_signal: false,
            created_at,
            retired_at: None,
        }
    }

    pub fn word_ids(&self) -> &[String] {
        &self.word_ids
    }

    pub fn len(&self) -> usize {
        self.word_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word_ids.is_empty()
    }

    pub fn contains(&self, word_id: &str) -> bool {
        self.word_ids.iter().any(|id| id == word_id)
    }

    pub fn current_word_id(&self) -> Option<&str> {
        self.word_ids.get(self.current_index).map(String::as_str)
    }

    pub fn is_retired(&self) -> bool {
        self.retired_at.is_some()
    }
}

// ==================== Settings ====================

/// Relative weights of the three sampling buckets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionWeights {
    pub struggling: f64,
    pub new: f64,
    pub revision: f64,
}

impl SelectionWeights {
    pub const fn new(struggling: f64, new: f64, revision: f64) -> Self {
        Self {
            struggling,
            new,
            revision,
        }
    }

    pub fn total(&self) -> f64 {
        self.struggling + self.new + self.revision
    }
}

impl Default for SelectionWeights {
    fn default() -> Self {
        Self {
            struggling: 0.4,
            new: 0.4,
            revision: 0.2,
        }
    }
}

/// Per-subject learner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSettings {
    pub unlocked_level: u32,
    pub session_size: usize,
    pub selection_weights: SelectionWeights,
}

impl Default for SubjectSettings {
    fn default() -> Self {
        Self {
            unlocked_level: MIN_LEVEL,
            session_size: DEFAULT_SESSION_SIZE,
            selection_weights: SelectionWeights::default(),
        }
    }
}

// ==================== Learner Profile ====================

/// Aggregate root holding all mutable learner state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    pub learner_id: String,
    pub words: HashMap<String, WordRecord>,
    pub sessions: HashMap<Uuid, Session>,
    pub active_session_by_subject: HashMap<String, Uuid>,
    pub settings: HashMap<String, SubjectSettings>,
    pub selected_subjects: Vec<String>,
}

impl LearnerProfile {
    pub fn new(learner_id: impl Into<String>) -> Self {
        Self {
            learner_id: learner_id.into(),
            ..Self::default()
        }
    }

    /// Words belonging to one subject
    pub fn subject_words<'a>(&'a self, subject_code: &'a str) -> impl Iterator<Item = &'a WordRecord> + 'a {
        self.words
            .values()
            .filter(move |w| w.subject_code == subject_code)
    }

    pub fn active_session_id(&self, subject_code: &str) -> Option<Uuid> {
        self.active_session_by_subject.get(subject_code).copied()
    }

    /// Settings for a subject, falling back to defaults when none are stored
    pub fn settings_for(&self, subject_code: &str) -> SubjectSettings {
        self.settings.get(subject_code).cloned().unwrap_or_default()
    }

    pub fn is_active_session(&self, session_id: Uuid) -> bool {
        self.active_session_by_subject
            .values()
            .any(|id| *id == session_id)
    }
}
