//! Practice simulator
//!
//! Runs a seeded simulated learner against a catalog and logs how sessions
//! rotate and levels unlock.
//!
//! Usage: `danci-practice [catalog.json]`
//!
//! Environment:
//! - `PRACTICE_SIM_SEED` (default 42)
//! - `PRACTICE_SIM_ACCURACY` chance of a correct answer (default 0.75)
//! - `PRACTICE_SIM_ROUNDS` maximum answered cards (default 400)
//! - every `PRACTICE_*` engine knob read by `EngineConfig::from_env`

use std::collections::HashSet;
use std::process::ExitCode;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use danci_practice::logging::{init_tracing, LogSettings};
use danci_practice::sanitize::sanitize_ratio;
use danci_practice::{AdvanceOutcome, Catalog, CatalogItem, EngineConfig, Outcome, PracticeEngine};

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let _log_guard = init_tracing(&LogSettings::from_env());

    let catalog = match std::env::args().nth(1) {
        Some(path) => match Catalog::from_path(&path) {
            Ok(catalog) => catalog,
            Err(err) => {
                tracing::error!(%path, error = %err, "failed to load catalog");
                return ExitCode::FAILURE;
            }
        },
        None => match Catalog::from_items(demo_items()) {
            Ok(catalog) => catalog,
            Err(err) => {
                tracing::error!(error = %err, "demo catalog invalid");
                return ExitCode::FAILURE;
            }
        },
    };

    let seed: u64 = env_or("PRACTICE_SIM_SEED", 42);
    let accuracy = sanitize_ratio(env_or("PRACTICE_SIM_ACCURACY", 0.75), 0.75);
    let max_rounds: usize = env_or("PRACTICE_SIM_ROUNDS", 400);

    let config = EngineConfig::from_env();
    let subjects = catalog.subjects();
    let mut engine = PracticeEngine::with_seed(config, catalog, seed);
    let mut learner = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));

    let mut profile = engine.bootstrap_profile("simulated-learner");
    let subject_refs: Vec<&str> = subjects.iter().map(String::as_str).collect();
    let selected = engine.set_subject_selection(&mut profile, &subject_refs);
    tracing::info!(?selected, seed, accuracy, "simulation started");

    let mut finished: HashSet<String> = HashSet::new();
    let mut rotations = 0usize;
    let mut answered = 0usize;

    while answered < max_rounds && finished.len() < selected.len() {
        for subject in &selected {
            if finished.contains(subject) || answered >= max_rounds {
                continue;
            }
            let Some(session_id) = engine.active_session(&profile, subject) else {
                finished.insert(subject.clone());
                continue;
            };
            let Some(card) = engine.current_card(&profile, session_id) else {
                finished.insert(subject.clone());
                continue;
            };

            let outcome = if learner.gen_bool(accuracy) {
                Outcome::Correct
            } else {
                engine.reveal_answer(&mut profile, session_id);
                Outcome::Wrong
            };
            engine.record_attempt(&mut profile, session_id, &card.word_id, outcome, None);
            answered += 1;

            match engine.advance(&mut profile, session_id) {
                Some(AdvanceOutcome::Rotated { level_unlocked, .. }) => {
                    rotations += 1;
                    if let Some(level) = level_unlocked {
                        tracing::info!(subject = %subject, level, answered, "learner reached new level");
                    }
                }
                Some(AdvanceOutcome::NoMoreContent) | None => {
                    finished.insert(subject.clone());
                }
                Some(AdvanceOutcome::Continued { .. }) => {}
            }
        }
    }

    for subject in &selected {
        let settings = profile.settings_for(subject);
        let mastered = profile
            .subject_words(subject)
            .filter(|w| danci_practice::mastery::is_mastered(w, &engine.config().mastery))
            .count();
        let total = profile.subject_words(subject).count();
        tracing::info!(
            subject = %subject,
            unlocked_level = settings.unlocked_level,
            mastered,
            total,
            "subject summary"
        );
    }
    tracing::info!(answered, rotations, sessions = profile.sessions.len(), "simulation finished");

    ExitCode::SUCCESS
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn demo_items() -> Vec<CatalogItem> {
    let mut items = Vec::new();

    for a in 1..=5u32 {
        for b in 1..=4u32 {
            let level = if a + b <= 5 { 1 } else { 2 };
            items.push(CatalogItem {
                item_id: format!("add-{a}-{b}"),
                subject_code: "arithmetic".to_string(),
                display_text: format!("{a} + {b}"),
                complexity_level: level,
                answer: Some((a + b).to_string()),
                notes: None,
            });
        }
    }
    for a in 2..=5u32 {
        for b in 2..=5u32 {
            items.push(CatalogItem {
                item_id: format!("mul-{a}-{b}"),
                subject_code: "arithmetic".to_string(),
                display_text: format!("{a} x {b}"),
                complexity_level: 3,
                answer: Some((a * b).to_string()),
                notes: None,
            });
        }
    }

    let words = [
        ("cat", "gato", 1),
        ("dog", "perro", 1),
        ("house", "casa", 1),
        ("water", "agua", 1),
        ("book", "libro", 2),
        ("window", "ventana", 2),
        ("butterfly", "mariposa", 3),
    ];
    for (word, answer, level) in words {
        items.push(CatalogItem {
            item_id: format!("vocab-{word}"),
            subject_code: "vocabulary".to_string(),
            display_text: word.to_string(),
            complexity_level: level,
            answer: Some(answer.to_string()),
            notes: None,
        });
    }

    items
}
