//! Session Bucketer
//!
//! Draws a fixed-size working set from a candidate pool using three
//! proportional buckets:
//! - Struggling: attempted but not yet mastered
//! - New: never attempted
//! - Revision: mastered, cooled down and due
//!
//! Per-bucket targets follow the selection weights. A bucket that cannot
//! meet its target hands the shortfall to the rest of the pool, so the
//! result always has `min(size, pool)` distinct words. All randomness comes
//! from the caller's generator.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::MasteryPolicy;
use crate::mastery::{self, MasteryState};
use crate::sanitize::sanitize_weights;
use crate::types::{SelectionWeights, WordRecord};

// ==================== Buckets ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Bucket {
    Struggling,
    New,
    Revision,
}

impl Bucket {
    /// Fixed order; also the tie-break order for equal weights
    pub const ALL: [Bucket; 3] = [Bucket::Struggling, Bucket::New, Bucket::Revision];

    pub const fn index(self) -> usize {
        match self {
            Bucket::Struggling => 0,
            Bucket::New => 1,
            Bucket::Revision => 2,
        }
    }

    fn weight(self, weights: &SelectionWeights) -> f64 {
        match self {
            Bucket::Struggling => weights.struggling,
            Bucket::New => weights.new,
            Bucket::Revision => weights.revision,
        }
    }
}

/// Bucket of a word, or `None` for words only reachable through the cascade
/// (still cooling down, or idle but not yet due).
pub fn classify(word: &WordRecord, policy: &MasteryPolicy, now: DateTime<Utc>) -> Option<Bucket> {
    match mastery::state_of(word, policy) {
        MasteryState::New => Some(Bucket::New),
        // step 0 without attempts is New; step > 0 without attempts only
        // happens on imported records and is treated as practice
        MasteryState::Practicing if !word.has_attempts() => Some(Bucket::New),
        MasteryState::Practicing => Some(Bucket::Struggling),
        MasteryState::MasteredIdle if mastery::is_revision_due(word, policy, now) => {
            Some(Bucket::Revision)
        }
        MasteryState::MasteredIdle | MasteryState::MasteredActive => None,
    }
}

// ==================== Targets ====================

/// Per-bucket counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketCounts {
    pub struggling: usize,
    pub new: usize,
    pub revision: usize,
}

impl BucketCounts {
    pub fn get(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::Struggling => self.struggling,
            Bucket::New => self.new,
            Bucket::Revision => self.revision,
        }
    }

    fn slot(&mut self, bucket: Bucket) -> &mut usize {
        match bucket {
            Bucket::Struggling => &mut self.struggling,
            Bucket::New => &mut self.new,
            Bucket::Revision => &mut self.revision,
        }
    }

    pub fn total(&self) -> usize {
        self.struggling + self.new + self.revision
    }
}

/// `round(w_i / Σw * size)` per bucket; rounding drift is absorbed by the
/// heaviest bucket so the targets always sum to `size`.
pub fn bucket_targets(weights: SelectionWeights, size: usize) -> BucketCounts {
    let weights = sanitize_weights(weights);
    let total = weights.total();

    let mut targets = BucketCounts::default();
    for bucket in Bucket::ALL {
        let share = bucket.weight(&weights) / total * size as f64;
        *targets.slot(bucket) = share.round() as usize;
    }

    // heaviest first; stable sort keeps Bucket::ALL order on ties
    let mut by_weight = Bucket::ALL;
    by_weight.sort_by(|a, b| {
        b.weight(&weights)
            .partial_cmp(&a.weight(&weights))
            .unwrap_or(Ordering::Equal)
    });

    let assigned = targets.total();
    if assigned < size {
        *targets.slot(by_weight[0]) += size - assigned;
    } else {
        let mut surplus = assigned - size;
        for bucket in by_weight {
            if surplus == 0 {
                break;
            }
            let slot = targets.slot(bucket);
            let take = surplus.min(*slot);
            *slot -= take;
            surplus -= take;
        }
    }

    targets
}

// ==================== Selection ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSelection {
    /// Selected ids, shuffled, no duplicates
    pub word_ids: Vec<String>,
    /// Requested per-bucket targets
    pub targets: BucketCounts,
    /// Members each bucket actually delivered
    pub delivered: BucketCounts,
    /// Words drawn by the shortfall cascade
    pub cascaded: usize,
    /// The pool could not fill the requested size
    pub exhausted: bool,
}

/// Draw up to `size` words from `pool`
pub fn select<R: Rng + ?Sized>(
    pool: &[&WordRecord],
    weights: SelectionWeights,
    size: usize,
    policy: &MasteryPolicy,
    now: DateTime<Utc>,
    rng: &mut R,
) -> BucketSelection {
    let mut seen = HashSet::with_capacity(pool.len());
    let pool: Vec<&WordRecord> = pool
        .iter()
        .copied()
        .filter(|word| seen.insert(word.id.as_str()))
        .collect();

    let mut members: [Vec<usize>; 3] = Default::default();
    for (idx, word) in pool.iter().enumerate() {
        if let Some(bucket) = classify(word, policy, now) {
            members[bucket.index()].push(idx);
        }
    }

    let wanted = size.min(pool.len());
    let targets = bucket_targets(weights, size);
    let mut delivered = BucketCounts::default();
    let mut taken = vec![false; pool.len()];
    let mut picked: Vec<usize> = Vec::with_capacity(wanted);

    for bucket in Bucket::ALL {
        for &idx in members[bucket.index()].choose_multiple(rng, targets.get(bucket)) {
            taken[idx] = true;
            picked.push(idx);
            *delivered.slot(bucket) += 1;
        }
    }

    let shortfall = wanted.saturating_sub(picked.len());
    let mut cascaded = 0;
    if shortfall > 0 {
        let remaining: Vec<usize> = (0..pool.len()).filter(|&idx| !taken[idx]).collect();
        for &idx in remaining.choose_multiple(rng, shortfall) {
            picked.push(idx);
            cascaded += 1;
        }
    }

    picked.shuffle(rng);

    let selection = BucketSelection {
        word_ids: picked.into_iter().map(|idx| pool[idx].id.clone()).collect(),
        targets,
        delivered,
        cascaded,
        exhausted: wanted < size,
    };

    tracing::debug!(
        pool = pool.len(),
        requested = size,
        selected = selection.word_ids.len(),
        cascaded = selection.cascaded,
        exhausted = selection.exhausted,
        "bucketed session"
    );

    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attempt, Outcome};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn policy() -> MasteryPolicy {
        MasteryPolicy::default()
    }

    fn new_word(id: &str) -> WordRecord {
        WordRecord::new(id, "vocabulary", 1)
    }

    fn struggling_word(id: &str) -> WordRecord {
        let mut word = new_word(id);
        word.mastery_step = 1;
        word.attempts.push(Attempt {
            timestamp: Utc::now(),
            outcome: Outcome::Wrong,
        });
        word
    }

    fn idle_word(id: &str) -> WordRecord {
        let mut word = struggling_word(id);
        word.mastery_step = 4;
        word.cooldown = 0;
        word
    }

    fn cooling_word(id: &str) -> WordRecord {
        let mut word = idle_word(id);
        word.cooldown = 1;
        word
    }

    fn pool_of(words: &[WordRecord]) -> Vec<&WordRecord> {
        words.iter().collect()
    }

    #[test]
    fn test_classify() {
        let now = Utc::now();
        let policy = policy();
        assert_eq!(classify(&new_word("a"), &policy, now), Some(Bucket::New));
        assert_eq!(
            classify(&struggling_word("b"), &policy, now),
            Some(Bucket::Struggling)
        );
        assert_eq!(classify(&idle_word("c"), &policy, now), Some(Bucket::Revision));
        assert_eq!(classify(&cooling_word("d"), &policy, now), None);
    }

    #[test]
    fn test_targets_sum_to_size() {
        let targets = bucket_targets(SelectionWeights::new(0.4, 0.4, 0.2), 12);
        // 4.8 -> 5, 4.8 -> 5, 2.4 -> 2 = 12
        assert_eq!(targets.struggling, 5);
        assert_eq!(targets.new, 5);
        assert_eq!(targets.revision, 2);
    }

    #[test]
    fn test_targets_deficit_goes_to_heaviest() {
        let targets = bucket_targets(SelectionWeights::new(1.0, 1.0, 1.0), 1);
        assert_eq!(targets.total(), 1);
        assert_eq!(targets.struggling, 1);

        let targets = bucket_targets(SelectionWeights::new(0.2, 0.5, 0.3), 1);
        assert_eq!(targets.new, 1);
        assert_eq!(targets.total(), 1);
    }

    #[test]
    fn test_targets_surplus_taken_from_heaviest() {
        // 1.5 -> 2 and 1.5 -> 2 overshoot 3 by one
        let targets = bucket_targets(SelectionWeights::new(0.5, 0.5, 0.0), 3);
        assert_eq!(targets.total(), 3);
        assert_eq!(targets.struggling, 1);
        assert_eq!(targets.new, 2);
        assert_eq!(targets.revision, 0);
    }

    #[test]
    fn test_targets_zero_size() {
        assert_eq!(bucket_targets(SelectionWeights::default(), 0).total(), 0);
    }

    #[test]
    fn test_select_respects_targets_when_buckets_are_full() {
        let mut words = Vec::new();
        for i in 0..10 {
            words.push(new_word(&format!("n{i}")));
            words.push(struggling_word(&format!("s{i}")));
            words.push(idle_word(&format!("r{i}")));
        }
        let pool = pool_of(&words);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let selection = select(
            &pool,
            SelectionWeights::new(0.5, 0.25, 0.25),
            8,
            &policy(),
            Utc::now(),
            &mut rng,
        );

        assert_eq!(selection.word_ids.len(), 8);
        assert_eq!(selection.delivered, selection.targets);
        assert_eq!(selection.cascaded, 0);
        assert!(!selection.exhausted);
        let strugglers = selection.word_ids.iter().filter(|id| id.starts_with('s')).count();
        assert_eq!(strugglers, 4);
    }

    #[test]
    fn test_select_cascades_shortfall() {
        let mut words: Vec<WordRecord> = (0..10).map(|i| new_word(&format!("n{i}"))).collect();
        words.push(struggling_word("s0"));
        let pool = pool_of(&words);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let selection = select(
            &pool,
            SelectionWeights::new(0.6, 0.2, 0.2),
            6,
            &policy(),
            Utc::now(),
            &mut rng,
        );

        assert_eq!(selection.word_ids.len(), 6);
        assert_eq!(selection.delivered.struggling, 1);
        assert_eq!(selection.delivered.revision, 0);
        assert!(selection.cascaded > 0);
        assert!(selection.word_ids.contains(&"s0".to_string()));
    }

    #[test]
    fn test_select_small_pool_never_pads() {
        let words = vec![new_word("a"), struggling_word("b"), cooling_word("c")];
        let pool = pool_of(&words);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let selection = select(
            &pool,
            SelectionWeights::default(),
            12,
            &policy(),
            Utc::now(),
            &mut rng,
        );

        let mut ids = selection.word_ids.clone();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(selection.exhausted);
    }

    #[test]
    fn test_select_ignores_duplicate_pool_entries() {
        let words = vec![new_word("a"), new_word("b")];
        let pool = vec![&words[0], &words[0], &words[1], &words[0]];
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let selection = select(
            &pool,
            SelectionWeights::default(),
            4,
            &policy(),
            Utc::now(),
            &mut rng,
        );

        assert_eq!(selection.word_ids.len(), 2);
    }

    #[test]
    fn test_select_empty_pool() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let selection = select(
            &[],
            SelectionWeights::default(),
            12,
            &policy(),
            Utc::now(),
            &mut rng,
        );
        assert!(selection.word_ids.is_empty());
        assert!(selection.exhausted);
    }

    #[test]
    fn test_select_is_replayable_with_same_seed() {
        let words: Vec<WordRecord> = (0..40).map(|i| new_word(&format!("w{i:02}"))).collect();
        let pool = pool_of(&words);
        let now = Utc::now();

        let first = select(
            &pool,
            SelectionWeights::default(),
            12,
            &policy(),
            now,
            &mut ChaCha8Rng::seed_from_u64(99),
        );
        let second = select(
            &pool,
            SelectionWeights::default(),
            12,
            &policy(),
            now,
            &mut ChaCha8Rng::seed_from_u64(99),
        );

        assert_eq!(first.word_ids, second.word_ids);
    }
}
