//! Practice Engine
//!
//! Command and query surface for the presentation layer. The learner profile
//! is passed into every call; the engine itself only owns configuration, the
//! content catalog, the subject registry and the random source.
//!
//! Every command recovers from its own errors: invalid references, exhausted
//! pools and out-of-range input are logged and surface as `None`, never as a
//! failure the presentation layer has to handle.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::guidance::{self, SessionGuidance, SessionGuidanceInput, WordGuidance};
use crate::mastery::{self, MasteryState, Transition};
use crate::orchestrator::{self, AdvanceOutcome};
use crate::progression;
use crate::sanitize::{sanitize_session_size, sanitize_weights};
use crate::subjects::{DisplayFields, SubjectRegistry};
use crate::types::{LearnerProfile, Outcome, SelectionWeights, Session, SubjectSettings};

// ==================== Views ====================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryProgress {
    pub step: u32,
    pub step_max: u32,
    pub mastery_threshold: u32,
    pub state: MasteryState,
    /// step / step_max in [0, 1]
    pub fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub session_id: Uuid,
    pub word_id: String,
    pub subject_code: String,
    pub display: DisplayFields,
    pub progress: MasteryProgress,
    pub revealed: bool,
    pub last_outcome: Option<Outcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub completed_count: usize,
    pub total_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordGuidanceView {
    #[serde(flatten)]
    pub guidance: WordGuidance,
    pub message: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGuidanceView {
    pub guidance: SessionGuidance,
    pub message: &'static str,
}

// ==================== Engine ====================

pub struct PracticeEngine<R: Rng = ChaCha8Rng> {
    config: EngineConfig,
    catalog: Catalog,
    registry: SubjectRegistry,
    rng: R,
}

impl PracticeEngine<ChaCha8Rng> {
    /// Engine seeded from the system clock
    pub fn new(config: EngineConfig, catalog: Catalog) -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42);
        Self::with_seed(config, catalog, seed)
    }

    /// Engine with a fixed seed, for replayable runs
    pub fn with_seed(config: EngineConfig, catalog: Catalog, seed: u64) -> Self {
        Self::with_rng(config, catalog, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> PracticeEngine<R> {
    pub fn with_rng(config: EngineConfig, catalog: Catalog, rng: R) -> Self {
        Self {
            config: config.sanitized(),
            catalog,
            registry: SubjectRegistry::builtin(),
            rng,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn registry(&self) -> &SubjectRegistry {
        &self.registry
    }

    // ========== Profile bootstrap ==========

    /// New profile with one word record per catalog item and default
    /// settings for every catalog subject. No session is opened until a
    /// subject is selected.
    pub fn bootstrap_profile(&self, learner_id: impl Into<String>) -> LearnerProfile {
        let mut profile = LearnerProfile::new(learner_id);
        self.refresh_profile(&mut profile);
        profile
    }

    /// Add records for catalog items the profile has not seen yet
    pub fn refresh_profile(&self, profile: &mut LearnerProfile) -> usize {
        let created = self.catalog.seed_profile(profile);
        for subject in self.catalog.subjects() {
            profile
                .settings
                .entry(subject)
                .or_insert_with(|| self.default_settings());
        }
        if created > 0 {
            tracing::info!(learner = %profile.learner_id, created, "profile seeded from catalog");
        }
        created
    }

    fn default_settings(&self) -> SubjectSettings {
        SubjectSettings {
            session_size: self.config.session.default_session_size,
            selection_weights: self.config.session.default_weights,
            ..SubjectSettings::default()
        }
    }

    // ========== Commands ==========

    /// Record one answer for a word of the session. `timestamp` defaults to now.
    pub fn record_attempt(
        &mut self,
        profile: &mut LearnerProfile,
        session_id: Uuid,
        word_id: &str,
        outcome: Outcome,
        timestamp: Option<DateTime<Utc>>,
    ) -> Option<Transition> {
        let result = self.try_record_attempt(
            profile,
            session_id,
            word_id,
            outcome,
            timestamp.unwrap_or_else(Utc::now),
        );
        recover("record_attempt", result)
    }

    fn try_record_attempt(
        &self,
        profile: &mut LearnerProfile,
        session_id: Uuid,
        word_id: &str,
        outcome: Outcome,
        now: DateTime<Utc>,
    ) -> EngineResult<Transition> {
        let session = live_session_mut(&mut profile.sessions, session_id)?;
        if !session.contains(word_id) {
            return Err(EngineError::WordNotInSession {
                session_id,
                word_id: word_id.to_string(),
            });
        }

        let word = profile
            .words
            .get_mut(word_id)
            .ok_or_else(|| EngineError::UnknownWord(word_id.to_string()))?;
        let transition = mastery::apply(word, outcome, now, &self.config.mastery);
        session.last_outcome = Some(outcome);

        Ok(transition)
    }

    /// Show the answer of the current card; counts one reveal per card visit
    pub fn reveal_answer(&mut self, profile: &mut LearnerProfile, session_id: Uuid) -> Option<CardView> {
        let result = self.try_reveal_answer(profile, session_id);
        recover("reveal_answer", result)?;
        self.current_card(profile, session_id)
    }

    fn try_reveal_answer(&self, profile: &mut LearnerProfile, session_id: Uuid) -> EngineResult<()> {
        let session = live_session_mut(&mut profile.sessions, session_id)?;
        let word_id = session
            .current_word_id()
            .ok_or_else(|| EngineError::OutOfRange(format!("current index {}", session.current_index)))?
            .to_string();
        if session.revealed {
            return Ok(());
        }

        let word = profile
            .words
            .get_mut(&word_id)
            .ok_or_else(|| EngineError::UnknownWord(word_id.clone()))?;
        word.reveal_count = word.reveal_count.saturating_add(1);
        session.revealed = true;
        Ok(())
    }

    /// Continue within the session or rotate to the next one
    pub fn advance(&mut self, profile: &mut LearnerProfile, session_id: Uuid) -> Option<AdvanceOutcome> {
        self.advance_at(profile, session_id, Utc::now())
    }

    pub fn advance_at(
        &mut self,
        profile: &mut LearnerProfile,
        session_id: Uuid,
        now: DateTime<Utc>,
    ) -> Option<AdvanceOutcome> {
        let result = orchestrator::advance(profile, session_id, &self.config, &mut self.rng, now);
        recover("advance", result)
    }

    /// Replace the learner's subject selection and open a session for every
    /// selected subject that has none. Returns the subjects kept.
    pub fn set_subject_selection(
        &mut self,
        profile: &mut LearnerProfile,
        subjects: &[&str],
    ) -> Vec<String> {
        self.set_subject_selection_at(profile, subjects, Utc::now())
    }

    pub fn set_subject_selection_at(
        &mut self,
        profile: &mut LearnerProfile,
        subjects: &[&str],
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let mut selected: Vec<String> = Vec::with_capacity(subjects.len());
        for &subject in subjects {
            if selected.iter().any(|s| s == subject) {
                continue;
            }
            if !self.catalog.has_subject(subject) {
                recover::<()>(
                    "set_subject_selection",
                    Err(EngineError::UnknownSubject(subject.to_string())),
                );
                continue;
            }
            selected.push(subject.to_string());
        }

        for subject in &selected {
            let default_settings = self.default_settings();
            profile
                .settings
                .entry(subject.clone())
                .or_insert(default_settings);

            if profile.active_session_id(subject).is_some() {
                continue;
            }
            let opened = orchestrator::open_session(profile, subject, &self.config, &mut self.rng, now);
            recover("set_subject_selection", opened);
        }

        profile.selected_subjects = selected.clone();
        selected
    }

    /// Size of the next session drawn for the subject, clamped to
    /// `[1, max_session_size]`
    pub fn set_session_size(
        &mut self,
        profile: &mut LearnerProfile,
        subject_code: &str,
        size: usize,
    ) -> Option<usize> {
        let max = self.config.session.max_session_size;
        let result = self.update_settings(profile, subject_code, |settings| {
            settings.session_size = sanitize_session_size(size, max);
            settings.session_size
        });
        recover("set_session_size", result)
    }

    /// Manual level override, clamped to `[1, max_level]`; may lower the level
    pub fn set_complexity_level(
        &mut self,
        profile: &mut LearnerProfile,
        subject_code: &str,
        level: u32,
    ) -> Option<u32> {
        let levels = self.config.levels;
        let result = self.update_settings(profile, subject_code, |settings| {
            settings.unlocked_level = levels.clamp(level);
            settings.unlocked_level
        });
        if let Ok(applied) = &result {
            tracing::info!(subject = subject_code, level = *applied, "complexity level overridden");
        }
        recover("set_complexity_level", result)
    }

    pub fn set_selection_weights(
        &mut self,
        profile: &mut LearnerProfile,
        subject_code: &str,
        weights: SelectionWeights,
    ) -> Option<SelectionWeights> {
        let result = self.update_settings(profile, subject_code, |settings| {
            settings.selection_weights = sanitize_weights(weights);
            settings.selection_weights
        });
        recover("set_selection_weights", result)
    }

    fn update_settings<T>(
        &self,
        profile: &mut LearnerProfile,
        subject_code: &str,
        update: impl FnOnce(&mut SubjectSettings) -> T,
    ) -> EngineResult<T> {
        if !self.catalog.has_subject(subject_code) {
            return Err(EngineError::UnknownSubject(subject_code.to_string()));
        }
        let settings = profile
            .settings
            .entry(subject_code.to_string())
            .or_insert_with(|| self.default_settings());
        Ok(update(settings))
    }

    // ========== Queries ==========

    pub fn active_session(&self, profile: &LearnerProfile, subject_code: &str) -> Option<Uuid> {
        profile.active_session_id(subject_code)
    }

    pub fn current_card(&self, profile: &LearnerProfile, session_id: Uuid) -> Option<CardView> {
        let session = profile.sessions.get(&session_id)?;
        let word_id = session.current_word_id()?;
        let word = profile.words.get(word_id)?;
        let item = self.catalog.get(word_id)?;
        let descriptor = self.registry.resolve(&session.subject_code);
        let policy = &self.config.mastery;

        Some(CardView {
            session_id,
            word_id: word_id.to_string(),
            subject_code: session.subject_code.clone(),
            display: descriptor.display_fields(item, session.revealed),
            progress: MasteryProgress {
                step: word.mastery_step,
                step_max: policy.step_max,
                mastery_threshold: policy.mastery_threshold,
                state: mastery::state_of(word, policy),
                fraction: mastery::progress_fraction(word, policy),
            },
            revealed: session.revealed,
            last_outcome: session.last_outcome,
        })
    }

    pub fn session_progress(&self, profile: &LearnerProfile, session_id: Uuid) -> Option<SessionProgress> {
        let session = profile.sessions.get(&session_id)?;
        Some(SessionProgress {
            completed_count: orchestrator::resolved_count(session, &profile.words, &self.config.mastery),
            total_count: session.len(),
        })
    }

    pub fn word_guidance(&self, profile: &LearnerProfile, word_id: &str) -> Option<WordGuidanceView> {
        let word = profile.words.get(word_id)?;
        let guidance = guidance::word_guidance(
            word.mastery_step,
            &word.attempts,
            word.reveal_count,
            &self.config.mastery,
            &self.config.guidance,
        )?;
        let descriptor = self.registry.resolve(&word.subject_code);

        Some(WordGuidanceView {
            guidance,
            message: descriptor.tips.for_category(guidance.category),
        })
    }

    /// Lifecycle guidance for a session. A completed session (retired, or
    /// starved and still active) is judged at the level it was drawn at and
    /// counts mastered rather than resolved words.
    pub fn session_guidance(&self, profile: &LearnerProfile, session_id: Uuid) -> Option<SessionGuidanceView> {
        let session = profile.sessions.get(&session_id)?;
        let subject = session.subject_code.as_str();
        let policy = &self.config.mastery;

        let (level, mastered_in_session) = if session.completion_signal {
            let mastered = session
                .word_ids()
                .iter()
                .filter_map(|id| profile.words.get(id))
                .filter(|word| mastery::is_mastered(word, policy))
                .count();
            (session.complexity_level, mastered)
        } else {
            (
                profile.settings_for(subject).unlocked_level,
                orchestrator::resolved_count(session, &profile.words, policy),
            )
        };

        let input = SessionGuidanceInput {
            session_index: session.current_index,
            total_in_session: session.len(),
            mastered_in_session,
            all_mastered_at_level: progression::level_mastered(
                profile.words.values(),
                subject,
                level,
                policy,
            ),
            more_levels_exist: progression::more_levels_exist(
                profile.words.values(),
                subject,
                level,
                &self.config.levels,
            ),
            is_first_card_ever: profile.subject_words(subject).all(|w| !w.has_attempts()),
            completion_threshold: self.config.session.completion_threshold,
        };
        let guidance = guidance::session_guidance(&input)?;

        Some(SessionGuidanceView {
            guidance,
            message: self.registry.resolve(subject).session_message(guidance),
        })
    }
}

/// Active (non-retired) session for a command
fn live_session_mut(
    sessions: &mut HashMap<Uuid, Session>,
    session_id: Uuid,
) -> EngineResult<&mut Session> {
    let session = sessions
        .get_mut(&session_id)
        .ok_or(EngineError::UnknownSession(session_id))?;
    if session.is_retired() {
        return Err(EngineError::RetiredSession(session_id));
    }
    Ok(session)
}

fn recover<T>(command: &'static str, result: EngineResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(
                command,
                kind = err.kind().as_str(),
                error = %err,
                "command ignored"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogItem;

    fn arithmetic_engine() -> PracticeEngine {
        let items = (1..=4)
            .map(|n| CatalogItem {
                item_id: format!("{n}+{n}"),
                subject_code: "arithmetic".into(),
                display_text: format!("{n} + {n}"),
                complexity_level: 1,
                answer: Some((n * 2).to_string()),
                notes: Some("doubles".into()),
            })
            .collect();
        PracticeEngine::with_seed(EngineConfig::default(), Catalog::from_items(items).unwrap(), 3)
    }

    #[test]
    fn test_bootstrap_seeds_words_and_settings() {
        let engine = arithmetic_engine();
        let mut profile = engine.bootstrap_profile("kid");
        assert_eq!(profile.words.len(), 4);
        assert_eq!(profile.settings["arithmetic"].session_size, 12);
        assert!(profile.sessions.is_empty());

        assert_eq!(engine.refresh_profile(&mut profile), 0);
    }

    #[test]
    fn test_current_card_uses_subject_descriptor() {
        let mut engine = arithmetic_engine();
        let mut profile = engine.bootstrap_profile("kid");
        engine.set_subject_selection(&mut profile, &["arithmetic"]);
        let session = engine.active_session(&profile, "arithmetic").unwrap();

        let card = engine.current_card(&profile, session).unwrap();
        assert_eq!(card.subject_code, "arithmetic");
        assert_eq!(card.display.hint, None);
        assert_eq!(card.display.answer, None);
        assert_eq!(card.progress.state, MasteryState::New);
        assert_eq!(card.progress.step_max, 5);
        assert_eq!(card.last_outcome, None);

        engine.record_attempt(&mut profile, session, &card.word_id, Outcome::Wrong, None);
        let card = engine.current_card(&profile, session).unwrap();
        assert_eq!(card.last_outcome, Some(Outcome::Wrong));
        assert_eq!(card.progress.state, MasteryState::Practicing);
    }

    #[test]
    fn test_live_session_rejects_retired() {
        let mut sessions = HashMap::new();
        let id = Uuid::from_u128(7);
        let mut session = Session::new(id, "arithmetic", 1, vec!["1+1".into()], Utc::now());
        session.retired_at = Some(Utc::now());
        sessions.insert(id, session);

        assert_eq!(
            live_session_mut(&mut sessions, id).map(|_| ()),
            Err(EngineError::RetiredSession(id))
        );
        assert_eq!(
            live_session_mut(&mut sessions, Uuid::nil()).map(|_| ()),
            Err(EngineError::UnknownSession(Uuid::nil()))
        );
    }

    #[test]
    fn test_recover_turns_errors_into_none() {
        assert_eq!(recover("test", Ok::<_, EngineError>(3)), Some(3));
        assert_eq!(
            recover::<u32>("test", Err(EngineError::OutOfRange("index".into()))),
            None
        );
    }
}
