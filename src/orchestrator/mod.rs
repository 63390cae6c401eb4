//! Session Orchestrator
//!
//! Handles `advance` for a subject's active session. The work is split into
//! two read-only queries and one sequencing command:
//! - [`is_session_complete`]: has the session reached its completion ratio
//! - [`crate::progression::check_unlock`]: should the subject's tier advance
//! - [`advance`]: continue within the session, or retire it and draw the next
//!
//! A word is resolved within a session once it is mastered and cooling
//! down. Revision words (mastered, cooldown 0) stay unresolved until they are
//! answered correctly again.
//!
//! A subject is out of content once no higher level holds words and every
//! word up to the unlocked level is mastered. Its last session then stays
//! active with `completion_signal` set, and later advances leave the profile
//! alone until a word falls out of mastery.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bucketer;
use crate::config::{EngineConfig, MasteryPolicy};
use crate::error::{EngineError, EngineResult};
use crate::mastery::{self, MasteryState};
use crate::progression::{self, LevelDecision};
use crate::types::{LearnerProfile, Session, SubjectSettings, WordRecord};

/// Tolerance for ratio comparisons
const RATIO_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum AdvanceOutcome {
    /// Moved to another unresolved word of the same session
    Continued { index: usize, word_id: String },
    /// Session completed and a fresh one became active
    Rotated {
        retired: Uuid,
        session: Uuid,
        level_unlocked: Option<u32>,
    },
    /// Session completed but the subject has nothing left to draw
    NoMoreContent,
}

// ==================== Queries ====================

/// Indices of session words that are not yet resolved. Ids missing from
/// `words` are skipped.
pub fn unresolved_indices(
    session: &Session,
    words: &HashMap<String, WordRecord>,
    policy: &MasteryPolicy,
) -> Vec<usize> {
    session
        .word_ids()
        .iter()
        .enumerate()
        .filter_map(|(idx, id)| match words.get(id) {
            Some(word) if !mastery::is_resolved(word, policy) => Some(idx),
            _ => None,
        })
        .collect()
}

pub fn resolved_count(
    session: &Session,
    words: &HashMap<String, WordRecord>,
    policy: &MasteryPolicy,
) -> usize {
    session
        .word_ids()
        .iter()
        .filter_map(|id| words.get(id))
        .filter(|word| mastery::is_resolved(word, policy))
        .count()
}

/// Resolved fraction reached `completion_threshold`, or nothing is left to
/// practice.
pub fn is_session_complete(
    session: &Session,
    words: &HashMap<String, WordRecord>,
    policy: &MasteryPolicy,
    completion_threshold: f64,
) -> bool {
    if session.is_empty() {
        return true;
    }
    if unresolved_indices(session, words, policy).is_empty() {
        return true;
    }

    let ratio = resolved_count(session, words, policy) as f64 / session.len() as f64;
    ratio + RATIO_EPSILON >= completion_threshold
}

/// Candidate pool for a subject: every word up to the unlocked tier that is
/// not cooling down, sorted by id so seeded draws replay exactly.
pub fn candidate_pool<'a>(
    profile: &'a LearnerProfile,
    subject_code: &'a str,
    unlocked_level: u32,
    policy: &MasteryPolicy,
) -> Vec<&'a WordRecord> {
    let mut pool: Vec<&WordRecord> = profile
        .subject_words(subject_code)
        .filter(|w| w.complexity_level <= unlocked_level)
        .filter(|w| mastery::state_of(w, policy) != MasteryState::MasteredActive)
        .collect();
    pool.sort_by(|a, b| a.id.cmp(&b.id));
    pool
}

// ==================== Commands ====================

/// Draw and activate the first session of a subject
pub fn open_session<R: Rng + ?Sized>(
    profile: &mut LearnerProfile,
    subject_code: &str,
    config: &EngineConfig,
    rng: &mut R,
    now: DateTime<Utc>,
) -> EngineResult<Uuid> {
    let session_id = draw_session(profile, subject_code, config, rng, now)?;
    if let Some(previous) = profile
        .active_session_by_subject
        .insert(subject_code.to_string(), session_id)
    {
        retire(profile, previous, now);
    }

    tracing::info!(subject = subject_code, session = %session_id, "session opened");
    Ok(session_id)
}

/// Continue within the session or complete and rotate it
pub fn advance<R: Rng + ?Sized>(
    profile: &mut LearnerProfile,
    session_id: Uuid,
    config: &EngineConfig,
    rng: &mut R,
    now: DateTime<Utc>,
) -> EngineResult<AdvanceOutcome> {
    let session = profile
        .sessions
        .get(&session_id)
        .ok_or(EngineError::UnknownSession(session_id))?;
    if session.is_retired() {
        return Err(EngineError::RetiredSession(session_id));
    }
    // starved earlier and still active: housekeeping already ran
    if session.completion_signal {
        return reopen_starved(profile, session_id, config, rng, now);
    }

    let complete = is_session_complete(
        session,
        &profile.words,
        &config.mastery,
        config.session.completion_threshold,
    );
    if !complete {
        return continue_session(profile, session_id, config, rng);
    }

    complete_session(profile, session_id, config, rng, now)
}

fn continue_session<R: Rng + ?Sized>(
    profile: &mut LearnerProfile,
    session_id: Uuid,
    config: &EngineConfig,
    rng: &mut R,
) -> EngineResult<AdvanceOutcome> {
    let session = profile
        .sessions
        .get_mut(&session_id)
        .ok_or(EngineError::UnknownSession(session_id))?;

    let unresolved = unresolved_indices(session, &profile.words, &config.mastery);
    let index = *unresolved
        .choose(rng)
        .ok_or_else(|| EngineError::ExhaustedPool(session.subject_code.clone()))?;

    session.current_index = index;
    session.revealed = false;
    session.last_outcome = None;

    let word_id = session.word_ids()[index].clone();
    tracing::debug!(session = %session_id, index, word_id = %word_id, "continue session");
    Ok(AdvanceOutcome::Continued { index, word_id })
}

fn complete_session<R: Rng + ?Sized>(
    profile: &mut LearnerProfile,
    session_id: Uuid,
    config: &EngineConfig,
    rng: &mut R,
    now: DateTime<Utc>,
) -> EngineResult<AdvanceOutcome> {
    let (subject_code, word_ids) = match profile.sessions.get(&session_id) {
        Some(session) => (session.subject_code.clone(), session.word_ids().to_vec()),
        None => return Err(EngineError::UnknownSession(session_id)),
    };

    for word_id in &word_ids {
        if let Some(word) = profile.words.get_mut(word_id) {
            mastery::decrement_cooldown(word);
        }
    }

    let mut settings = profile.settings_for(&subject_code);
    if progression::subject_exhausted(
        profile.words.values(),
        &subject_code,
        settings.unlocked_level,
        &config.mastery,
        &config.levels,
    ) {
        return Ok(starve(profile, session_id, &subject_code));
    }

    let decision = progression::check_unlock(
        profile.words.values(),
        &subject_code,
        settings.unlocked_level,
        &config.mastery,
        &config.levels,
    );
    let level_unlocked = match decision {
        LevelDecision::Unlock { from, to } => {
            settings.unlocked_level = to;
            tracing::info!(subject = %subject_code, from, to, "complexity level unlocked");
            Some(to)
        }
        LevelDecision::Hold | LevelDecision::AtMaximum => None,
    };
    profile.settings.insert(subject_code.clone(), settings);

    match draw_session(profile, &subject_code, config, rng, now) {
        Ok(next) => Ok(rotate(profile, session_id, &subject_code, next, level_unlocked, now)),
        Err(EngineError::ExhaustedPool(_)) => Ok(starve(profile, session_id, &subject_code)),
        Err(err) => Err(err),
    }
}

/// Retry a starved session. Stays put until new content or a settings
/// change makes something drawable; cooldowns and levels are left alone.
fn reopen_starved<R: Rng + ?Sized>(
    profile: &mut LearnerProfile,
    session_id: Uuid,
    config: &EngineConfig,
    rng: &mut R,
    now: DateTime<Utc>,
) -> EngineResult<AdvanceOutcome> {
    let subject_code = match profile.sessions.get(&session_id) {
        Some(session) => session.subject_code.clone(),
        None => return Err(EngineError::UnknownSession(session_id)),
    };

    let unlocked_level = profile.settings_for(&subject_code).unlocked_level;
    if progression::subject_exhausted(
        profile.words.values(),
        &subject_code,
        unlocked_level,
        &config.mastery,
        &config.levels,
    ) {
        return Ok(AdvanceOutcome::NoMoreContent);
    }

    match draw_session(profile, &subject_code, config, rng, now) {
        Ok(next) => Ok(rotate(profile, session_id, &subject_code, next, None, now)),
        Err(EngineError::ExhaustedPool(_)) => Ok(AdvanceOutcome::NoMoreContent),
        Err(err) => Err(err),
    }
}

/// Keep the completed session active and flag it
fn starve(profile: &mut LearnerProfile, session_id: Uuid, subject_code: &str) -> AdvanceOutcome {
    if let Some(session) = profile.sessions.get_mut(&session_id) {
        session.completion_signal = true;
    }
    tracing::info!(subject = subject_code, session = %session_id, "no more content");
    AdvanceOutcome::NoMoreContent
}

fn rotate(
    profile: &mut LearnerProfile,
    session_id: Uuid,
    subject_code: &str,
    next: Uuid,
    level_unlocked: Option<u32>,
    now: DateTime<Utc>,
) -> AdvanceOutcome {
    retire(profile, session_id, now);
    profile
        .active_session_by_subject
        .insert(subject_code.to_string(), next);

    tracing::info!(
        subject = subject_code,
        retired = %session_id,
        session = %next,
        "session rotated"
    );

    AdvanceOutcome::Rotated {
        retired: session_id,
        session: next,
        level_unlocked,
    }
}

/// Bucket a new session for the subject and register it (not yet active)
fn draw_session<R: Rng + ?Sized>(
    profile: &mut LearnerProfile,
    subject_code: &str,
    config: &EngineConfig,
    rng: &mut R,
    now: DateTime<Utc>,
) -> EngineResult<Uuid> {
    let settings = profile
        .settings
        .entry(subject_code.to_string())
        .or_insert_with(|| SubjectSettings {
            session_size: config.session.default_session_size,
            selection_weights: config.session.default_weights,
            ..Default::default()
        })
        .clone();

    let selection = {
        let pool = candidate_pool(profile, subject_code, settings.unlocked_level, &config.mastery);
        bucketer::select(
            &pool,
            settings.selection_weights,
            settings.session_size,
            &config.mastery,
            now,
            rng,
        )
    };
    if selection.word_ids.is_empty() {
        return Err(EngineError::ExhaustedPool(subject_code.to_string()));
    }

    let session_id = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
    let mut session = Session::new(
        session_id,
        subject_code,
        settings.unlocked_level,
        selection.word_ids,
        now,
    );
    if let Some(&first) = unresolved_indices(&session, &profile.words, &config.mastery).first() {
        session.current_index = first;
    }

    profile.sessions.insert(session_id, session);
    Ok(session_id)
}

fn retire(profile: &mut LearnerProfile, session_id: Uuid, now: DateTime<Utc>) {
    if let Some(session) = profile.sessions.get_mut(&session_id) {
        session.completion_signal = true;
        session.retired_at = Some(now);
    }
}
