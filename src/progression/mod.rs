//! Complexity Level Progressor
//!
//! A subject's next tier unlocks only when every word at the currently
//! unlocked tier is mastered. The scan covers the whole tier, so it is only
//! run when a session completes.

use serde::{Deserialize, Serialize};

use crate::config::{LevelPolicy, MasteryPolicy};
use crate::mastery;
use crate::types::WordRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "decision")]
pub enum LevelDecision {
    /// Current tier still has unmastered words
    Hold,
    /// Tier complete; move to `to`
    Unlock { from: u32, to: u32 },
    /// Tier complete but already at the top
    AtMaximum,
}

/// Every word of `subject_code` at `level` is mastered. An empty tier counts
/// as mastered so gaps in the catalog never block progress.
pub fn level_mastered<'a, I>(words: I, subject_code: &str, level: u32, policy: &MasteryPolicy) -> bool
where
    I: IntoIterator<Item = &'a WordRecord>,
{
    words
        .into_iter()
        .filter(|w| w.subject_code == subject_code && w.complexity_level == level)
        .all(|w| mastery::is_mastered(w, policy))
}

/// Decide whether the subject's unlocked level should advance
pub fn check_unlock<'a, I>(
    words: I,
    subject_code: &str,
    unlocked_level: u32,
    mastery: &MasteryPolicy,
    levels: &LevelPolicy,
) -> LevelDecision
where
    I: IntoIterator<Item = &'a WordRecord>,
{
    if !level_mastered(words, subject_code, unlocked_level, mastery) {
        return LevelDecision::Hold;
    }

    let to = levels.clamp(unlocked_level.saturating_add(1));
    if to > unlocked_level {
        LevelDecision::Unlock {
            from: unlocked_level,
            to,
        }
    } else {
        LevelDecision::AtMaximum
    }
}

/// Catalog holds content above the unlocked level and the cap allows it
pub fn more_levels_exist<'a, I>(words: I, subject_code: &str, unlocked_level: u32, levels: &LevelPolicy) -> bool
where
    I: IntoIterator<Item = &'a WordRecord>,
{
    if unlocked_level >= levels.max_level {
        return false;
    }
    words.into_iter().any(|w| {
        w.subject_code == subject_code
            && w.complexity_level > unlocked_level
            && w.complexity_level <= levels.max_level
    })
}

/// Nothing left to practice: every word up to the unlocked level is mastered
/// and no reachable level holds more content.
pub fn subject_exhausted<'a, I>(
    words: I,
    subject_code: &str,
    unlocked_level: u32,
    mastery: &MasteryPolicy,
    levels: &LevelPolicy,
) -> bool
where
    I: IntoIterator<Item = &'a WordRecord> + Clone,
{
    if more_levels_exist(words.clone(), subject_code, unlocked_level, levels) {
        return false;
    }
    words
        .into_iter()
        .filter(|w| w.subject_code == subject_code && w.complexity_level <= unlocked_level)
        .all(|w| mastery::is_mastered(w, mastery))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(id: &str, level: u32, step: u32) -> WordRecord {
        let mut word = WordRecord::new(id, "arithmetic", level);
        word.mastery_step = step;
        word
    }

    #[test]
    fn test_full_level_unlocks_next() {
        let words = vec![word("a", 1, 2), word("b", 1, 5), word("c", 2, 0)];
        let decision = check_unlock(
            &words,
            "arithmetic",
            1,
            &MasteryPolicy::default(),
            &LevelPolicy::default(),
        );
        assert_eq!(decision, LevelDecision::Unlock { from: 1, to: 2 });
    }

    #[test]
    fn test_partial_level_holds() {
        let words = vec![word("a", 1, 2), word("b", 1, 1)];
        let decision = check_unlock(
            &words,
            "arithmetic",
            1,
            &MasteryPolicy::default(),
            &LevelPolicy::default(),
        );
        assert_eq!(decision, LevelDecision::Hold);
    }

    #[test]
    fn test_unlock_clamps_at_maximum() {
        let words = vec![word("a", 3, 5)];
        let levels = LevelPolicy { max_level: 3 };
        let decision = check_unlock(&words, "arithmetic", 3, &MasteryPolicy::default(), &levels);
        assert_eq!(decision, LevelDecision::AtMaximum);
    }

    #[test]
    fn test_other_subjects_are_ignored() {
        let mut other = word("x", 1, 0);
        other.subject_code = "vocabulary".into();
        let words = vec![word("a", 1, 3), other];
        assert!(level_mastered(&words, "arithmetic", 1, &MasteryPolicy::default()));
    }

    #[test]
    fn test_empty_level_counts_as_mastered() {
        let words = vec![word("a", 3, 0)];
        assert!(level_mastered(&words, "arithmetic", 2, &MasteryPolicy::default()));
    }

    #[test]
    fn test_more_levels_exist() {
        let words = vec![word("a", 1, 0), word("b", 4, 0)];
        let levels = LevelPolicy { max_level: 10 };
        assert!(more_levels_exist(&words, "arithmetic", 1, &levels));
        assert!(!more_levels_exist(&words, "arithmetic", 4, &levels));
        assert!(!more_levels_exist(&words, "arithmetic", 1, &LevelPolicy { max_level: 1 }));
    }

    #[test]
    fn test_subject_exhausted_only_without_higher_content() {
        let mastery = MasteryPolicy::default();
        let levels = LevelPolicy { max_level: 10 };
        let words = vec![word("a", 1, 2), word("b", 2, 3)];
        assert!(!subject_exhausted(&words, "arithmetic", 1, &mastery, &levels));
        assert!(subject_exhausted(&words, "arithmetic", 2, &mastery, &levels));

        let capped = LevelPolicy { max_level: 1 };
        let words = vec![word("a", 1, 2), word("b", 2, 0)];
        assert!(subject_exhausted(&words, "arithmetic", 1, &mastery, &capped));

        let words = vec![word("a", 1, 2), word("b", 1, 1)];
        assert!(!subject_exhausted(&words, "arithmetic", 1, &mastery, &levels));
    }
}
