//! Guidance Derivation
//!
//! Pure, read-only summaries the presentation layer turns into short
//! messages. Invalid input never errors; it yields `None` ("no guidance").
//!
//! - [`word_guidance`]: per-word message category and urgency
//! - [`session_guidance`]: lifecycle moments of a session (first card ever,
//!   level transition, full completion)

use serde::{Deserialize, Serialize};

use crate::config::{GuidancePolicy, MasteryPolicy};
use crate::sanitize::is_invalid;
use crate::types::Attempt;

// ==================== Word Guidance ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WordCategory {
    Initial,
    FirstSuccess,
    FirstWrong,
    Progressing,
    Mastered,
    Struggling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordGuidance {
    pub category: WordCategory,
    pub urgency: Urgency,
}

impl WordGuidance {
    fn new(category: WordCategory) -> Self {
        let urgency = match category {
            WordCategory::Struggling => Urgency::High,
            WordCategory::FirstWrong => Urgency::Medium,
            WordCategory::Initial
            | WordCategory::FirstSuccess
            | WordCategory::Progressing
            | WordCategory::Mastered => Urgency::Low,
        };
        Self { category, urgency }
    }
}

/// Share of correct answers among the last `window` attempts
pub fn recent_accuracy(attempts: &[Attempt], window: usize) -> Option<f64> {
    if attempts.is_empty() || window == 0 {
        return None;
    }
    let start = attempts.len().saturating_sub(window);
    let recent = &attempts[start..];
    let correct = recent.iter().filter(|a| a.outcome.is_correct()).count();
    Some(correct as f64 / recent.len() as f64)
}

pub fn word_guidance(
    mastery_step: u32,
    attempts: &[Attempt],
    reveal_count: u32,
    mastery: &MasteryPolicy,
    policy: &GuidancePolicy,
) -> Option<WordGuidance> {
    if mastery_step > mastery.step_max || is_invalid(policy.accuracy_floor) {
        return None;
    }

    if attempts.is_empty() {
        return Some(WordGuidance::new(WordCategory::Initial));
    }

    let mastered = mastery_step >= mastery.mastery_threshold;
    let over_revealed = reveal_count > policy.reveal_ceiling;
    let low_accuracy = attempts.len() >= policy.min_attempts_for_accuracy.max(1)
        && recent_accuracy(attempts, policy.recent_window)
            .map(|accuracy| accuracy < policy.accuracy_floor)
            .unwrap_or(false);
    if !mastered && (over_revealed || low_accuracy) {
        return Some(WordGuidance::new(WordCategory::Struggling));
    }

    let category = if attempts.len() == 1 {
        if attempts[0].outcome.is_correct() {
            WordCategory::FirstSuccess
        } else {
            WordCategory::FirstWrong
        }
    } else if mastered {
        WordCategory::Mastered
    } else {
        WordCategory::Progressing
    };

    Some(WordGuidance::new(category))
}

// ==================== Session Guidance ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionGuidance {
    /// Very first card the learner ever sees in this subject
    Welcome,
    /// Session done, tier done, a harder tier is waiting
    LevelTransition,
    /// Session done, tier done, nothing harder remains
    FullCompletion,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGuidanceInput {
    pub session_index: usize,
    pub total_in_session: usize,
    pub mastered_in_session: usize,
    pub all_mastered_at_level: bool,
    pub more_levels_exist: bool,
    pub is_first_card_ever: bool,
    /// Fraction of mastered words that counts as a completed session
    pub completion_threshold: f64,
}

/// `None` outside the three lifecycle moments; callers then fall back to
/// word guidance.
pub fn session_guidance(input: &SessionGuidanceInput) -> Option<SessionGuidance> {
    if input.total_in_session == 0
        || input.session_index >= input.total_in_session
        || input.mastered_in_session > input.total_in_session
        || is_invalid(input.completion_threshold)
        || input.completion_threshold <= 0.0
        || input.completion_threshold > 1.0
    {
        return None;
    }

    if input.is_first_card_ever && input.session_index == 0 {
        return Some(SessionGuidance::Welcome);
    }

    let ratio = input.mastered_in_session as f64 / input.total_in_session as f64;
    let session_completed = ratio + 1e-9 >= input.completion_threshold;
    if !session_completed || !input.all_mastered_at_level {
        return None;
    }

    if input.more_levels_exist {
        Some(SessionGuidance::LevelTransition)
    } else {
        Some(SessionGuidance::FullCompletion)
    }
}
