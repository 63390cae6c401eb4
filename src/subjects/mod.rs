//! Subject Registry
//!
//! Closed map from subject code to a small capability descriptor: which
//! catalog field is the prompt, which is the answer, what hint to show and
//! the tip text per guidance category. Built once; unknown codes resolve to a
//! generic descriptor instead of branching on string literals elsewhere.

use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::CatalogItem;
use crate::guidance::{SessionGuidance, WordCategory};

/// Catalog field a descriptor reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CardField {
    DisplayText,
    Answer,
    Notes,
}

impl CardField {
    fn read(self, item: &CatalogItem) -> Option<&str> {
        match self {
            CardField::DisplayText => Some(item.display_text.as_str()),
            CardField::Answer => item.answer.as_deref(),
            CardField::Notes => item.notes.as_deref(),
        }
    }
}

/// Tip text per word guidance category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TipSet {
    pub initial: &'static str,
    pub first_success: &'static str,
    pub first_wrong: &'static str,
    pub progressing: &'static str,
    pub mastered: &'static str,
    pub struggling: &'static str,
}

impl TipSet {
    pub fn for_category(&self, category: WordCategory) -> &'static str {
        match category {
            WordCategory::Initial => self.initial,
            WordCategory::FirstSuccess => self.first_success,
            WordCategory::FirstWrong => self.first_wrong,
            WordCategory::Progressing => self.progressing,
            WordCategory::Mastered => self.mastered,
            WordCategory::Struggling => self.struggling,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDescriptor {
    pub code: &'static str,
    pub display_name: &'static str,
    pub prompt_field: CardField,
    pub answer_field: CardField,
    pub hint_field: Option<CardField>,
    pub tips: TipSet,
}

/// Fields the presentation layer renders for one card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFields {
    pub prompt: String,
    /// Only filled once the learner asked to reveal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl SubjectDescriptor {
    pub fn display_fields(&self, item: &CatalogItem, revealed: bool) -> DisplayFields {
        let prompt = self
            .prompt_field
            .read(item)
            .unwrap_or(item.display_text.as_str())
            .to_string();
        let answer = if revealed {
            self.answer_field.read(item).map(str::to_string)
        } else {
            None
        };
        let hint = self
            .hint_field
            .and_then(|field| field.read(item))
            .map(str::to_string);

        DisplayFields {
            prompt,
            answer,
            hint,
        }
    }

    pub fn session_message(&self, guidance: SessionGuidance) -> &'static str {
        match guidance {
            SessionGuidance::Welcome => "Let's start! Take your time with each card.",
            SessionGuidance::LevelTransition => "Level complete! Harder cards are unlocked.",
            SessionGuidance::FullCompletion => "You finished everything here. Amazing work!",
        }
    }
}

const VOCABULARY: SubjectDescriptor = SubjectDescriptor {
    code: "vocabulary",
    display_name: "Words",
    prompt_field: CardField::DisplayText,
    answer_field: CardField::Answer,
    hint_field: Some(CardField::Notes),
    tips: TipSet {
        initial: "Read the word out loud first.",
        first_success: "Great start! You knew this one.",
        first_wrong: "Not quite. Look at the meaning and try again.",
        progressing: "Getting there. One more correct answer helps.",
        mastered: "You know this word!",
        struggling: "Tricky word. Say it slowly and use the hint.",
    },
};

const ARITHMETIC: SubjectDescriptor = SubjectDescriptor {
    code: "arithmetic",
    display_name: "Numbers",
    prompt_field: CardField::DisplayText,
    answer_field: CardField::Answer,
    hint_field: None,
    tips: TipSet {
        initial: "Work it out step by step.",
        first_success: "Correct! Nice counting.",
        first_wrong: "Almost. Try counting on your fingers.",
        progressing: "Good progress on this fact.",
        mastered: "You remember this fact!",
        struggling: "Break it into smaller numbers first.",
    },
};

const QUIZ: SubjectDescriptor = SubjectDescriptor {
    code: "quiz",
    display_name: "Quiz",
    prompt_field: CardField::DisplayText,
    answer_field: CardField::Answer,
    hint_field: Some(CardField::Notes),
    tips: TipSet {
        initial: "Read the whole question before answering.",
        first_success: "Right answer!",
        first_wrong: "Not this time. Check the hint.",
        progressing: "You're learning this one.",
        mastered: "You've got this question down.",
        struggling: "Look at the hint and think about each choice.",
    },
};

const GENERIC: SubjectDescriptor = SubjectDescriptor {
    code: "generic",
    display_name: "Practice",
    prompt_field: CardField::DisplayText,
    answer_field: CardField::Answer,
    hint_field: Some(CardField::Notes),
    tips: TipSet {
        initial: "Give it a try.",
        first_success: "Well done!",
        first_wrong: "Keep going, you'll get it.",
        progressing: "Nice progress.",
        mastered: "Mastered!",
        struggling: "Take a hint and try again.",
    },
};

#[derive(Debug, Clone)]
pub struct SubjectRegistry {
    descriptors: HashMap<&'static str, SubjectDescriptor>,
    fallback: SubjectDescriptor,
}

impl SubjectRegistry {
    pub fn builtin() -> Self {
        let descriptors = [VOCABULARY, ARITHMETIC, QUIZ]
            .into_iter()
            .map(|descriptor| (descriptor.code, descriptor))
            .collect();
        Self {
            descriptors,
            fallback: GENERIC,
        }
    }

    /// Descriptor for a code, or the generic one
    pub fn resolve(&self, subject_code: &str) -> &SubjectDescriptor {
        self.descriptors.get(subject_code).unwrap_or(&self.fallback)
    }

    pub fn is_known(&self, subject_code: &str) -> bool {
        self.descriptors.contains_key(subject_code)
    }
}

impl Default for SubjectRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
