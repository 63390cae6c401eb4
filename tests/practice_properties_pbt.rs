//! Property-Based Tests for the practice engine
//!
//! Tests the following invariants:
//! - Step bounds: mastery step stays within [0, step_max] for any attempt sequence
//! - Bucketer size: output holds min(requested, pool) distinct ids for any weights
//! - Session membership: word ids never change after a session is drawn
//! - Liveness: advancing a fully resolved session never continues within it
//! - Monotonicity: unlocked level never decreases without a manual override

use std::collections::{HashMap, HashSet};

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

use danci_practice::bucketer;
use danci_practice::mastery;
use danci_practice::orchestrator;
use danci_practice::{
    AdvanceOutcome, Attempt, Catalog, CatalogItem, EngineConfig, MasteryPolicy, Outcome,
    PracticeEngine, SelectionWeights, WordRecord,
};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![Just(Outcome::Correct), Just(Outcome::Wrong)]
}

fn arb_policy() -> impl Strategy<Value = MasteryPolicy> {
    (1u32..=8)
        .prop_flat_map(|step_max| (Just(step_max), 1u32..=step_max, 1u32..=step_max))
        .prop_map(|(step_max, mastery_threshold, revision_demotion_step)| MasteryPolicy {
            step_max,
            mastery_threshold,
            revision_demotion_step,
            revision_min_interval_secs: 0,
        })
}

fn arb_weight() -> impl Strategy<Value = f64> {
    prop_oneof![
        (0u32..=100).prop_map(|v| v as f64 / 100.0),
        Just(0.0),
        Just(-1.0),
        Just(f64::NAN),
    ]
}

fn arb_weights() -> impl Strategy<Value = SelectionWeights> {
    (arb_weight(), arb_weight(), arb_weight())
        .prop_map(|(struggling, new, revision)| SelectionWeights::new(struggling, new, revision))
}

/// (step, cooldown, has attempts)
fn arb_word_state() -> impl Strategy<Value = (u32, u32, bool)> {
    (0u32..=5, 0u32..=2, any::<bool>())
}

fn arb_pool() -> impl Strategy<Value = Vec<WordRecord>> {
    prop::collection::vec(arb_word_state(), 0..60).prop_map(|states| {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        states
            .into_iter()
            .enumerate()
            .map(|(i, (step, cooldown, attempted))| {
                let mut word = WordRecord::new(format!("w{i:03}"), "quiz", 1);
                word.mastery_step = step;
                word.cooldown = cooldown;
                if attempted {
                    word.attempts.push(Attempt {
                        timestamp: at,
                        outcome: Outcome::Correct,
                    });
                }
                word
            })
            .collect()
    })
}

fn catalog(per_level: usize, levels: u32) -> Catalog {
    let items = (1..=levels)
        .flat_map(|level| {
            (0..per_level).map(move |i| CatalogItem {
                item_id: format!("l{level}-{i:02}"),
                subject_code: "quiz".to_string(),
                display_text: format!("question {level}.{i}"),
                complexity_level: level,
                answer: Some("yes".to_string()),
                notes: None,
            })
        })
        .collect();
    Catalog::from_items(items).unwrap()
}

// ============================================================================
// Mastery
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_mastery_step_stays_in_bounds(
        policy in arb_policy(),
        steps in prop::collection::vec((arb_outcome(), any::<bool>()), 0..80),
    ) {
        let mut word = WordRecord::new("w", "quiz", 1);
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        for (i, (outcome, housekeeping)) in steps.into_iter().enumerate() {
            mastery::apply(&mut word, outcome, start + Duration::seconds(i as i64), &policy);
            if housekeeping {
                mastery::decrement_cooldown(&mut word);
            }
            prop_assert!(word.mastery_step <= policy.step_max);
            let fraction = mastery::progress_fraction(&word, &policy);
            prop_assert!((0.0..=1.0).contains(&fraction));
        }
    }

    #[test]
    fn prop_correct_streak_reaches_mastery(policy in arb_policy()) {
        let mut word = WordRecord::new("w", "quiz", 1);
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        for _ in 0..policy.mastery_threshold {
            mastery::apply(&mut word, Outcome::Correct, now, &policy);
        }

        prop_assert!(mastery::is_mastered(&word, &policy));
        prop_assert_eq!(word.cooldown, 1);
    }
}

// ============================================================================
// Bucketer
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_bucketer_size_is_min_of_request_and_pool(
        words in arb_pool(),
        weights in arb_weights(),
        size in 0usize..40,
        seed in any::<u64>(),
    ) {
        let pool: Vec<&WordRecord> = words.iter().collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let now = Utc.timestamp_opt(1_700_100_000, 0).unwrap();

        let selection = bucketer::select(&pool, weights, size, &MasteryPolicy::default(), now, &mut rng);

        prop_assert_eq!(selection.word_ids.len(), size.min(pool.len()));
        let unique: HashSet<&String> = selection.word_ids.iter().collect();
        prop_assert_eq!(unique.len(), selection.word_ids.len());
        prop_assert_eq!(selection.exhausted, pool.len() < size);
    }

    #[test]
    fn prop_bucket_targets_sum_to_size(weights in arb_weights(), size in 0usize..100) {
        let targets = bucketer::bucket_targets(weights, size);
        prop_assert_eq!(targets.total(), size);
    }

    #[test]
    fn prop_bucketer_ignores_duplicate_pool_entries(
        words in arb_pool(),
        size in 0usize..40,
        seed in any::<u64>(),
    ) {
        let doubled: Vec<&WordRecord> = words.iter().chain(words.iter()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let now = Utc.timestamp_opt(1_700_100_000, 0).unwrap();

        let selection = bucketer::select(
            &doubled,
            SelectionWeights::default(),
            size,
            &MasteryPolicy::default(),
            now,
            &mut rng,
        );

        prop_assert_eq!(selection.word_ids.len(), size.min(words.len()));
    }
}

// ============================================================================
// Engine sessions
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_sessions_keep_membership_and_levels_never_drop(
        seed in any::<u64>(),
        outcomes in prop::collection::vec(prop::bool::weighted(0.8), 1..300),
    ) {
        let mut engine = PracticeEngine::with_seed(EngineConfig::default(), catalog(6, 3), seed);
        let mut profile = engine.bootstrap_profile("prop");
        engine.set_subject_selection(&mut profile, &["quiz"]);

        let mut memberships: HashMap<Uuid, Vec<String>> = HashMap::new();
        let mut level = profile.settings_for("quiz").unlocked_level;

        for correct in outcomes {
            let session = engine.active_session(&profile, "quiz").unwrap();
            memberships
                .entry(session)
                .or_insert_with(|| profile.sessions[&session].word_ids().to_vec());

            let card = engine.current_card(&profile, session).unwrap();
            let outcome = if correct { Outcome::Correct } else { Outcome::Wrong };
            engine.record_attempt(&mut profile, session, &card.word_id, outcome, None);

            let advanced = engine.advance(&mut profile, session);
            prop_assert!(advanced.is_some());

            let next_level = profile.settings_for("quiz").unlocked_level;
            prop_assert!(next_level >= level);
            level = next_level;

            for (id, words) in &memberships {
                prop_assert_eq!(profile.sessions[id].word_ids(), words.as_slice());
            }
            for word in profile.words.values() {
                prop_assert!(word.mastery_step <= engine.config().mastery.step_max);
            }
        }
    }

    #[test]
    fn prop_fully_resolved_session_always_rotates_or_stops(
        seed in any::<u64>(),
        per_level in 1usize..15,
        levels in 1u32..4,
    ) {
        let mut engine = PracticeEngine::with_seed(EngineConfig::default(), catalog(per_level, levels), seed);
        let mut profile = engine.bootstrap_profile("prop");
        engine.set_subject_selection(&mut profile, &["quiz"]);
        let session = engine.active_session(&profile, "quiz").unwrap();

        for word_id in profile.sessions[&session].word_ids().to_vec() {
            engine.record_attempt(&mut profile, session, &word_id, Outcome::Correct, None);
            engine.record_attempt(&mut profile, session, &word_id, Outcome::Correct, None);
        }
        let policy = engine.config().mastery;
        prop_assert!(orchestrator::unresolved_indices(&profile.sessions[&session], &profile.words, &policy).is_empty());

        let outcome = engine.advance(&mut profile, session);

        let stopped_or_rotated = matches!(
            outcome,
            Some(AdvanceOutcome::Rotated { .. }) | Some(AdvanceOutcome::NoMoreContent)
        );
        prop_assert!(stopped_or_rotated, "unexpected outcome {:?}", outcome);
    }
}
