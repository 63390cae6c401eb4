//! # danci-practice - adaptive practice session engine
//!
//! Keeps a learner practicing small items (words, arithmetic facts, quiz
//! questions) until they are mastered, rotates sessions onto fresh content
//! and unlocks harder tiers as whole tiers are mastered.
//!
//! ## Modules
//!
//! - [`mastery`] - per-word mastery state machine
//! - [`bucketer`] - weighted session sampling (struggling / new / revision)
//! - [`progression`] - complexity level unlocks
//! - [`orchestrator`] - `advance` handling: continue vs. complete-and-rotate
//! - [`guidance`] - read-only word and session guidance
//! - [`engine`] - command and query surface over a learner profile
//! - [`subjects`] - subject capability registry
//! - [`catalog`] - immutable content catalog
//! - [`config`] - policy constants, environment overrides
//! - [`sanitize`] - numeric input hygiene
//! - [`types`] - shared data model and constants
//!
//! ## Example
//!
//! ```rust
//! use danci_practice::{Catalog, EngineConfig, Outcome, PracticeEngine};
//!
//! let catalog = Catalog::from_json(
//!     r#"[{"itemId": "2+2", "subjectCode": "arithmetic", "displayText": "2 + 2", "complexityLevel": 1, "answer": "4"}]"#,
//! ).unwrap();
//! let mut engine = PracticeEngine::with_seed(EngineConfig::default(), catalog, 42);
//! let mut profile = engine.bootstrap_profile("learner-1");
//!
//! engine.set_subject_selection(&mut profile, &["arithmetic"]);
//! let session = engine.active_session(&profile, "arithmetic").unwrap();
//! let card = engine.current_card(&profile, session).unwrap();
//! engine.record_attempt(&mut profile, session, &card.word_id, Outcome::Correct, None);
//! engine.advance(&mut profile, session);
//! ```

// ============================================================================
// Module declarations
// ============================================================================

pub mod bucketer;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod guidance;
pub mod logging;
pub mod mastery;
pub mod orchestrator;
pub mod progression;
pub mod sanitize;
pub mod subjects;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use bucketer::{Bucket, BucketCounts, BucketSelection};
pub use catalog::{Catalog, CatalogItem};
pub use config::{EngineConfig, GuidancePolicy, LevelPolicy, MasteryPolicy, SessionPolicy};
pub use engine::{
    CardView, MasteryProgress, PracticeEngine, SessionGuidanceView, SessionProgress,
    WordGuidanceView,
};
pub use error::{CatalogError, EngineError, ErrorKind};
pub use guidance::{SessionGuidance, SessionGuidanceInput, Urgency, WordCategory, WordGuidance};
pub use mastery::{MasteryState, Transition};
pub use orchestrator::AdvanceOutcome;
pub use progression::LevelDecision;
pub use subjects::{DisplayFields, SubjectDescriptor, SubjectRegistry};
