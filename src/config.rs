//! Engine configuration
//!
//! Policy constants for mastery, session rotation, level progression and
//! guidance. Every knob can be overridden through `PRACTICE_*` environment
//! variables; values that fail to parse keep their defaults.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::sanitize::{sanitize_ratio, sanitize_weights};
use crate::types::{
    SelectionWeights, DEFAULT_COMPLETION_THRESHOLD, DEFAULT_MASTERY_THRESHOLD, DEFAULT_MAX_LEVEL,
    DEFAULT_SESSION_SIZE, DEFAULT_STEP_MAX, MAX_SESSION_SIZE, MIN_LEVEL,
};

/// Ten years; keeps interval arithmetic far from chrono's bounds
const MAX_REVISION_INTERVAL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Per-word step machine constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryPolicy {
    /// Ceiling of `mastery_step`
    pub step_max: u32,
    /// Step at which a word counts as mastered; independent of `step_max`
    pub mastery_threshold: u32,
    /// Step a mastered word falls to after a failed revision
    pub revision_demotion_step: u32,
    /// Minimum seconds since the last revision before a word is due again
    pub revision_min_interval_secs: i64,
}

impl Default for MasteryPolicy {
    fn default() -> Self {
        Self {
            step_max: DEFAULT_STEP_MAX,
            mastery_threshold: DEFAULT_MASTERY_THRESHOLD,
            revision_demotion_step: 1,
            revision_min_interval_secs: 0,
        }
    }
}

/// Session sizing and rotation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPolicy {
    /// Fraction of resolved words that completes a session, in (0, 1]
    pub completion_threshold: f64,
    pub default_session_size: usize,
    pub max_session_size: usize,
    pub default_weights: SelectionWeights,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
            default_session_size: DEFAULT_SESSION_SIZE,
            max_session_size: MAX_SESSION_SIZE,
            default_weights: SelectionWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelPolicy {
    pub max_level: u32,
}

impl Default for LevelPolicy {
    fn default() -> Self {
        Self {
            max_level: DEFAULT_MAX_LEVEL,
        }
    }
}

impl LevelPolicy {
    pub fn clamp(&self, level: u32) -> u32 {
        level.clamp(MIN_LEVEL, self.max_level.max(MIN_LEVEL))
    }
}

/// Thresholds for the struggling heuristic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidancePolicy {
    /// Number of most recent attempts used for accuracy
    pub recent_window: usize,
    /// Recent accuracy below this marks a word as struggling
    pub accuracy_floor: f64,
    /// Attempts required before accuracy is judged
    pub min_attempts_for_accuracy: usize,
    /// Reveals above this mark a word as struggling
    pub reveal_ceiling: u32,
}

impl Default for GuidancePolicy {
    fn default() -> Self {
        Self {
            recent_window: 5,
            accuracy_floor: 0.5,
            min_attempts_for_accuracy: 3,
            reveal_ceiling: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub mastery: MasteryPolicy,
    pub session: SessionPolicy,
    pub levels: LevelPolicy,
    pub guidance: GuidancePolicy,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mastery = MasteryPolicy {
            step_max: env_or("PRACTICE_STEP_MAX", defaults.mastery.step_max),
            mastery_threshold: env_or(
                "PRACTICE_MASTERY_THRESHOLD",
                defaults.mastery.mastery_threshold,
            ),
            revision_demotion_step: env_or(
                "PRACTICE_REVISION_DEMOTION_STEP",
                defaults.mastery.revision_demotion_step,
            ),
            revision_min_interval_secs: env_or(
                "PRACTICE_REVISION_MIN_INTERVAL_SECS",
                defaults.mastery.revision_min_interval_secs,
            ),
        };

        let default_weights = SelectionWeights {
            struggling: env_or(
                "PRACTICE_WEIGHT_STRUGGLING",
                defaults.session.default_weights.struggling,
            ),
            new: env_or("PRACTICE_WEIGHT_NEW", defaults.session.default_weights.new),
            revision: env_or(
                "PRACTICE_WEIGHT_REVISION",
                defaults.session.default_weights.revision,
            ),
        };

        let session = SessionPolicy {
            completion_threshold: env_or(
                "PRACTICE_COMPLETION_THRESHOLD",
                defaults.session.completion_threshold,
            ),
            default_session_size: env_or(
                "PRACTICE_SESSION_SIZE",
                defaults.session.default_session_size,
            ),
            max_session_size: env_or(
                "PRACTICE_MAX_SESSION_SIZE",
                defaults.session.max_session_size,
            ),
            default_weights,
        };

        let levels = LevelPolicy {
            max_level: env_or("PRACTICE_MAX_LEVEL", defaults.levels.max_level),
        };

        let guidance = GuidancePolicy {
            recent_window: env_or("PRACTICE_RECENT_WINDOW", defaults.guidance.recent_window),
            accuracy_floor: env_or(
                "PRACTICE_ACCURACY_FLOOR",
                defaults.guidance.accuracy_floor,
            ),
            min_attempts_for_accuracy: env_or(
                "PRACTICE_MIN_ATTEMPTS_FOR_ACCURACY",
                defaults.guidance.min_attempts_for_accuracy,
            ),
            reveal_ceiling: env_or("PRACTICE_REVEAL_CEILING", defaults.guidance.reveal_ceiling),
        };

        Self {
            mastery,
            session,
            levels,
            guidance,
        }
        .sanitized()
    }

    /// Clamp inconsistent values into a usable configuration
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        self.mastery.step_max = self.mastery.step_max.max(1);
        self.mastery.mastery_threshold = self
            .mastery
            .mastery_threshold
            .clamp(1, self.mastery.step_max);
        self.mastery.revision_demotion_step =
            self.mastery.revision_demotion_step.clamp(1, self.mastery.step_max);
        self.mastery.revision_min_interval_secs = self
            .mastery
            .revision_min_interval_secs
            .clamp(0, MAX_REVISION_INTERVAL_SECS);

        self.session.completion_threshold = sanitize_ratio(
            self.session.completion_threshold,
            defaults.session.completion_threshold,
        );
        if self.session.completion_threshold == 0.0 {
            self.session.completion_threshold = defaults.session.completion_threshold;
        }
        self.session.max_session_size = self.session.max_session_size.max(1);
        self.session.default_session_size = self
            .session
            .default_session_size
            .clamp(1, self.session.max_session_size);
        self.session.default_weights = sanitize_weights(self.session.default_weights);

        self.levels.max_level = self.levels.max_level.max(MIN_LEVEL);

        self.guidance.recent_window = self.guidance.recent_window.max(1);
        self.guidance.accuracy_floor =
            sanitize_ratio(self.guidance.accuracy_floor, defaults.guidance.accuracy_floor);

        self
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}
