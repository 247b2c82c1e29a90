//! Static game content: classes, items, skills, magic and enemies.
//!
//! Every collection is an id-keyed JSON object loaded once per session.
//! Lookups never panic; a missing id surfaces as [`ContentError::NotFound`]
//! and the caller decides how to degrade.

use crate::i18n::{Lang, LocalizedText};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors from content lookup and loading.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{collection} '{id}' not found")]
    NotFound { collection: Collection, id: String },

    #[error("Failed to load {document}: {reason}")]
    Load { document: String, reason: String },

    #[error("Failed to parse {document}: {source}")]
    Parse {
        document: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ContentError {
    pub fn not_found(collection: Collection, id: impl Into<String>) -> Self {
        ContentError::NotFound {
            collection,
            id: id.into(),
        }
    }

    /// Whether this error came from fetching a document rather than a lookup.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, ContentError::Load { .. } | ContentError::Parse { .. })
    }
}

/// The content collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Classes,
    Items,
    Skills,
    Magic,
    Enemies,
    Nodes,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Classes => "class",
            Collection::Items => "item",
            Collection::Skills => "skill",
            Collection::Magic => "magic",
            Collection::Enemies => "enemy",
            Collection::Nodes => "node",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Definitions
// ============================================================================

/// Base combat stats shared by classes and enemies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BaseStats {
    #[serde(default)]
    pub max_hp: u32,
    #[serde(default)]
    pub max_mp: u32,
    #[serde(default)]
    pub atk: u32,
    #[serde(default)]
    pub def: u32,
}

/// An item stack granted at class selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub id: String,
    pub qty: u32,
}

/// A playable class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDefinition {
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(flatten)]
    pub stats: BaseStats,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub magics: Vec<String>,
    #[serde(default)]
    pub start_items: Vec<ItemStack>,
}

/// What a consumable does when used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemEffectKind {
    HealHp,
    HealMp,
    EscapeBoost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    #[serde(default)]
    pub name: LocalizedText,
    pub effect: ItemEffectKind,
    #[serde(default)]
    pub value: u32,
}

/// A physical technique. Damage scales the basic attack by `multiplier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDefinition {
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(default)]
    pub mp_cost: u32,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

/// A spell. Damage is `power` plus a share of the caster's attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagicDefinition {
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(default)]
    pub mp_cost: u32,
    #[serde(default)]
    pub power: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyDefinition {
    #[serde(default)]
    pub name: LocalizedText,
    #[serde(flatten)]
    pub stats: BaseStats,
}

// ============================================================================
// Library
// ============================================================================

/// The five static collections, keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentLibrary {
    pub classes: BTreeMap<String, ClassDefinition>,
    pub items: BTreeMap<String, ItemDefinition>,
    pub skills: BTreeMap<String, SkillDefinition>,
    pub magic: BTreeMap<String, MagicDefinition>,
    pub enemies: BTreeMap<String, EnemyDefinition>,
}

fn lookup<'a, T>(
    map: &'a BTreeMap<String, T>,
    collection: Collection,
    id: &str,
) -> Result<&'a T, ContentError> {
    map.get(id)
        .ok_or_else(|| ContentError::not_found(collection, id))
}

impl ContentLibrary {
    pub fn class(&self, id: &str) -> Result<&ClassDefinition, ContentError> {
        lookup(&self.classes, Collection::Classes, id)
    }

    pub fn item(&self, id: &str) -> Result<&ItemDefinition, ContentError> {
        lookup(&self.items, Collection::Items, id)
    }

    pub fn skill(&self, id: &str) -> Result<&SkillDefinition, ContentError> {
        lookup(&self.skills, Collection::Skills, id)
    }

    pub fn magic(&self, id: &str) -> Result<&MagicDefinition, ContentError> {
        lookup(&self.magic, Collection::Magic, id)
    }

    pub fn enemy(&self, id: &str) -> Result<&EnemyDefinition, ContentError> {
        lookup(&self.enemies, Collection::Enemies, id)
    }

    /// Display name of an item, or its id when the item is unknown.
    pub fn item_name(&self, id: &str, lang: Lang) -> String {
        self.item(id)
            .map(|item| item.name.get(lang).to_string())
            .unwrap_or_else(|_| id.to_string())
    }

    /// Display name of a class, or its id when the class is unknown.
    pub fn class_name(&self, id: &str, lang: Lang) -> String {
        self.class(id)
            .map(|class| class.name.get(lang).to_string())
            .unwrap_or_else(|_| id.to_string())
    }
}
