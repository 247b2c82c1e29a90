//! The player record: stats, progression, learned abilities and inventory.

use crate::content::ClassDefinition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PLAYER_NAME: &str = "Hero";

// ============================================================================
// Stats
// ============================================================================

/// Live combat stats. `hp <= max_hp` and `mp <= max_mp` always hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub hp: u32,
    pub max_hp: u32,
    pub mp: u32,
    pub max_mp: u32,
    pub atk: u32,
    pub def: u32,
}

impl Stats {
    pub fn set_hp(&mut self, value: u32) {
        self.hp = value.min(self.max_hp);
    }

    /// Heal up to the maximum, returning the amount actually restored.
    pub fn heal_hp(&mut self, amount: u32) -> u32 {
        let old = self.hp;
        self.hp = self.hp.saturating_add(amount).min(self.max_hp);
        self.hp - old
    }

    pub fn restore_mp(&mut self, amount: u32) -> u32 {
        let old = self.mp;
        self.mp = self.mp.saturating_add(amount).min(self.max_mp);
        self.mp - old
    }

    /// Take damage, returning true if hp dropped to zero.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        self.hp = self.hp.saturating_sub(amount);
        self.hp == 0
    }

    /// Spend mp if enough is available.
    pub fn spend_mp(&mut self, cost: u32) -> bool {
        if self.mp < cost {
            return false;
        }
        self.mp -= cost;
        true
    }

    pub fn is_valid(&self) -> bool {
        self.hp <= self.max_hp && self.mp <= self.max_mp
    }
}

impl Default for Stats {
    /// Placeholder stats before a class is chosen.
    fn default() -> Self {
        Self {
            hp: 1,
            max_hp: 1,
            mp: 0,
            max_mp: 0,
            atk: 1,
            def: 0,
        }
    }
}

// ============================================================================
// Inventory
// ============================================================================

/// Item counts keyed by item id. Never stores a zero count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Inventory {
    items: BTreeMap<String, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quantity(&self, item_id: &str) -> u32 {
        self.items.get(item_id).copied().unwrap_or(0)
    }

    pub fn has(&self, item_id: &str) -> bool {
        self.quantity(item_id) > 0
    }

    /// Add (or with a negative delta, remove) units of an item.
    ///
    /// Returns the resulting count; an entry that reaches zero is removed.
    pub fn adjust(&mut self, item_id: &str, delta: i64) -> u32 {
        let current = i64::from(self.quantity(item_id));
        let next = current.saturating_add(delta).clamp(0, i64::from(u32::MAX)) as u32;
        if next == 0 {
            self.items.remove(item_id);
        } else {
            self.items.insert(item_id.to_string(), next);
        }
        next
    }

    /// Remove one unit. Returns false if there was none.
    pub fn consume_one(&mut self, item_id: &str) -> bool {
        if !self.has(item_id) {
            return false;
        }
        self.adjust(item_id, -1);
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.items.iter().map(|(id, qty)| (id.as_str(), *qty))
    }

    /// True if no entry has a zero count (a deserialized inventory may not).
    pub fn is_valid(&self) -> bool {
        self.items.values().all(|qty| *qty > 0)
    }
}

// ============================================================================
// Player
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub name: String,
    /// Empty until a class is chosen.
    #[serde(default)]
    pub class_id: String,
    pub level: u32,
    pub exp: u32,
    pub gold: u32,
    pub stats: Stats,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub magics: Vec<String>,
    #[serde(default)]
    pub inventory: Inventory,
}

impl PlayerState {
    /// A fresh level-1 player with placeholder stats and nothing learned.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_id: String::new(),
            level: 1,
            exp: 0,
            gold: 0,
            stats: Stats::default(),
            skills: Vec::new(),
            magics: Vec::new(),
            inventory: Inventory::new(),
        }
    }

    pub fn has_class(&self) -> bool {
        !self.class_id.is_empty()
    }

    /// Adopt a class: stats reset to the class base at full hp/mp, and
    /// skills, magics and inventory are replaced by the class's starting kit.
    pub fn apply_class(&mut self, class_id: &str, class: &ClassDefinition) {
        self.class_id = class_id.to_string();
        self.stats = Stats {
            hp: class.stats.max_hp,
            max_hp: class.stats.max_hp,
            mp: class.stats.max_mp,
            max_mp: class.stats.max_mp,
            atk: class.stats.atk,
            def: class.stats.def,
        };
        self.skills = class.skills.clone();
        self.magics = class.magics.clone();
        self.inventory.clear();
        for stack in &class.start_items {
            self.inventory.adjust(&stack.id, i64::from(stack.qty));
        }
    }

    pub fn knows_skill(&self, skill_id: &str) -> bool {
        self.skills.iter().any(|s| s == skill_id)
    }

    pub fn knows_magic(&self, magic_id: &str) -> bool {
        self.magics.iter().any(|m| m == magic_id)
    }

    pub fn is_defeated(&self) -> bool {
        self.stats.hp == 0
    }

    /// Basic shape check for records read back from storage.
    pub fn is_valid(&self) -> bool {
        self.stats.is_valid() && self.inventory.is_valid()
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new(DEFAULT_PLAYER_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{BaseStats, ItemStack};
    use crate::i18n::LocalizedText;

    fn mage() -> ClassDefinition {
        ClassDefinition {
            name: LocalizedText::from("Mage"),
            stats: BaseStats {
                max_hp: 24,
                max_mp: 30,
                atk: 4,
                def: 2,
            },
            skills: vec![],
            magics: vec!["fireball".to_string()],
            start_items: vec![
                ItemStack {
                    id: "ether".to_string(),
                    qty: 2,
                },
                ItemStack {
                    id: "ether".to_string(),
                    qty: 1,
                },
                ItemStack {
                    id: "dust".to_string(),
                    qty: 0,
                },
            ],
        }
    }

    #[test]
    fn test_new_player_defaults() {
        let player = PlayerState::new("Hero");
        assert_eq!(player.level, 1);
        assert_eq!(player.stats, Stats { hp: 1, max_hp: 1, mp: 0, max_mp: 0, atk: 1, def: 0 });
        assert!(player.inventory.is_empty());
        assert!(player.skills.is_empty());
        assert!(player.magics.is_empty());
        assert!(!player.has_class());
    }

    #[test]
    fn test_apply_class_full_restore_and_replace() {
        let mut player = PlayerState::new("Hero");
        player.inventory.adjust("old_sword", 1);
        player.skills.push("old_skill".to_string());

        player.apply_class("mage", &mage());

        assert_eq!(player.class_id, "mage");
        assert_eq!(player.stats.hp, 24);
        assert_eq!(player.stats.mp, 30);
        assert_eq!(player.stats.max_mp, 30);
        assert!(player.skills.is_empty());
        assert_eq!(player.magics, vec!["fireball".to_string()]);
        // Replaced, not merged; duplicate stacks add up; zero stacks vanish
        assert!(!player.inventory.has("old_sword"));
        assert_eq!(player.inventory.quantity("ether"), 3);
        assert!(!player.inventory.has("dust"));
        assert_eq!(player.inventory.len(), 1);
    }

    #[test]
    fn test_inventory_adjust_never_negative() {
        let mut inv = Inventory::new();
        assert_eq!(inv.adjust("potion", 2), 2);
        assert_eq!(inv.adjust("potion", -5), 0);
        assert!(!inv.has("potion"));
        assert!(inv.is_empty());
        assert_eq!(inv.adjust("potion", -1), 0);
        assert!(inv.is_empty());
    }

    #[test]
    fn test_inventory_consume_one() {
        let mut inv = Inventory::new();
        inv.adjust("potion", 1);
        assert!(inv.consume_one("potion"));
        assert!(!inv.consume_one("potion"));
        assert!(inv.is_valid());
    }

    #[test]
    fn test_stats_clamping() {
        let mut stats = Stats { hp: 5, max_hp: 10, mp: 1, max_mp: 4, atk: 3, def: 1 };
        assert_eq!(stats.heal_hp(100), 5);
        assert_eq!(stats.hp, 10);
        assert_eq!(stats.restore_mp(2), 2);
        assert!(!stats.spend_mp(4));
        assert_eq!(stats.mp, 3);
        assert!(stats.take_damage(50));
        assert_eq!(stats.hp, 0);
        stats.set_hp(99);
        assert_eq!(stats.hp, 10);
    }

    #[test]
    fn test_player_serde_shape() {
        let mut player = PlayerState::new("Hero");
        player.inventory.adjust("potion", 2);
        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(json["inventory"]["potion"], 2);
        assert_eq!(json["stats"]["max_hp"], 1);
        let back: PlayerState = serde_json::from_value(json).unwrap();
        assert_eq!(back, player);
    }

    #[test]
    fn test_invalid_shapes_detected() {
        let json = r#"{"name":"Hero","level":1,"exp":0,"gold":0,
            "stats":{"hp":9,"max_hp":5,"mp":0,"max_mp":0,"atk":1,"def":0}}"#;
        let player: PlayerState = serde_json::from_str(json).unwrap();
        assert!(!player.is_valid());

        let json = r#"{"name":"Hero","level":1,"exp":0,"gold":0,
            "stats":{"hp":1,"max_hp":1,"mp":0,"max_mp":0,"atk":1,"def":0},
            "inventory":{"potion":0}}"#;
        let player: PlayerState = serde_json::from_str(json).unwrap();
        assert!(!player.is_valid());
    }
}
