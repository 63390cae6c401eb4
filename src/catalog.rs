//! Content catalog
//!
//! Immutable per-subject item lists supplied by the content collaborator.
//! The engine layers mastery state on top and never edits catalog content.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::types::{LearnerProfile, WordRecord, MIN_LEVEL};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub item_id: String,
    pub subject_code: String,
    pub display_text: String,
    pub complexity_level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: HashMap<String, CatalogItem>,
}

impl Catalog {
    /// Validate and index items; ids must be unique and levels positive
    pub fn from_items(items: Vec<CatalogItem>) -> Result<Self, CatalogError> {
        let mut indexed = HashMap::with_capacity(items.len());
        for item in items {
            if item.item_id.trim().is_empty() {
                return Err(CatalogError::InvalidItem {
                    item_id: item.item_id,
                    reason: "empty item id".to_string(),
                });
            }
            if item.subject_code.trim().is_empty() {
                return Err(CatalogError::InvalidItem {
                    item_id: item.item_id,
                    reason: "empty subject code".to_string(),
                });
            }
            if item.complexity_level < MIN_LEVEL {
                return Err(CatalogError::InvalidItem {
                    item_id: item.item_id,
                    reason: format!("complexity level must be at least {MIN_LEVEL}"),
                });
            }
            if indexed.contains_key(&item.item_id) {
                return Err(CatalogError::DuplicateItem(item.item_id));
            }
            indexed.insert(item.item_id.clone(), item);
        }
        Ok(Self { items: indexed })
    }

    /// Parse a JSON array of items
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let items: Vec<CatalogItem> = serde_json::from_str(json)?;
        Self::from_items(items)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn get(&self, item_id: &str) -> Option<&CatalogItem> {
        self.items.get(item_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &CatalogItem> {
        self.items.values()
    }

    pub fn has_subject(&self, subject_code: &str) -> bool {
        self.items.values().any(|item| item.subject_code == subject_code)
    }

    /// Subject codes in sorted order
    pub fn subjects(&self) -> Vec<String> {
        self.items
            .values()
            .map(|item| item.subject_code.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Add a fresh word record for every item the profile does not know yet.
    /// Returns the number of records created.
    pub fn seed_profile(&self, profile: &mut LearnerProfile) -> usize {
        let mut created = 0;
        for item in self.items.values() {
            if profile.words.contains_key(&item.item_id) {
                continue;
            }
            profile.words.insert(
                item.item_id.clone(),
                WordRecord::new(&item.item_id, &item.subject_code, item.complexity_level),
            );
            created += 1;
        }
        created
    }
}
