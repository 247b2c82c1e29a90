//! Declarative effects attached to story nodes.
//!
//! Effects describe concrete changes to the player. They are applied in
//! list order, each one seeing the result of the previous, and never touch
//! anything besides the player passed in. Persisting the result is the
//! caller's job.

use crate::player::PlayerState;
use serde::{Deserialize, Serialize};

/// A single change to the player record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// Add (or subtract) gold. The total never drops below zero.
    AddGold { value: i64 },

    /// Add (or subtract) experience. The total never drops below zero.
    AddExp { value: i64 },

    /// Set hp to an absolute value, clamped to `[0, max_hp]`.
    SetHp { value: i64 },

    /// Add units of an item; a negative quantity consumes units.
    AddItem { item: String, qty: i64 },

    /// Any effect type this engine does not know. Applying it does nothing.
    #[serde(other)]
    Unknown,
}

fn add_clamped(current: u32, delta: i64) -> u32 {
    i64::from(current)
        .saturating_add(delta)
        .clamp(0, i64::from(u32::MAX)) as u32
}

/// Apply a list of effects to the player, in order.
pub fn apply_effects(player: &mut PlayerState, effects: &[Effect]) {
    for effect in effects {
        apply_effect(player, effect);
    }
}

/// Apply a single effect to the player.
pub fn apply_effect(player: &mut PlayerState, effect: &Effect) {
    match effect {
        Effect::AddGold { value } => {
            player.gold = add_clamped(player.gold, *value);
        }
        Effect::AddExp { value } => {
            player.exp = add_clamped(player.exp, *value);
        }
        Effect::SetHp { value } => {
            let hp = (*value).clamp(0, i64::from(player.stats.max_hp)) as u32;
            player.stats.set_hp(hp);
        }
        Effect::AddItem { item, qty } => {
            player.inventory.adjust(item, *qty);
        }
        Effect::Unknown => {
            tracing::warn!("skipping unknown effect type");
            return;
        }
    }
    tracing::debug!(?effect, "applied effect");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Stats;

    fn player() -> PlayerState {
        let mut player = PlayerState::new("Tester");
        player.stats = Stats {
            hp: 10,
            max_hp: 20,
            mp: 5,
            max_mp: 5,
            atk: 6,
            def: 2,
        };
        player.gold = 10;
        player
    }

    #[test]
    fn test_gold_and_exp_clamp_at_zero() {
        let mut p = player();
        apply_effects(
            &mut p,
            &[
                Effect::AddGold { value: 5 },
                Effect::AddGold { value: -100 },
                Effect::AddExp { value: 7 },
                Effect::AddExp { value: -3 },
            ],
        );
        assert_eq!(p.gold, 0);
        assert_eq!(p.exp, 4);
    }

    #[test]
    fn test_set_hp_clamped() {
        let mut p = player();
        apply_effect(&mut p, &Effect::SetHp { value: 500 });
        assert_eq!(p.stats.hp, 20);
        apply_effect(&mut p, &Effect::SetHp { value: -4 });
        assert_eq!(p.stats.hp, 0);
        apply_effect(&mut p, &Effect::SetHp { value: 7 });
        assert_eq!(p.stats.hp, 7);
    }

    #[test]
    fn test_add_item_sequence() {
        let mut p = player();
        apply_effects(
            &mut p,
            &[
                Effect::AddItem { item: "potion".into(), qty: 2 },
                Effect::AddItem { item: "potion".into(), qty: -1 },
                Effect::AddItem { item: "key".into(), qty: -3 },
            ],
        );
        assert_eq!(p.inventory.quantity("potion"), 1);
        assert!(!p.inventory.has("key"));

        apply_effect(&mut p, &Effect::AddItem { item: "potion".into(), qty: -9 });
        assert!(p.inventory.is_empty());
        assert!(p.inventory.is_valid());
    }

    #[test]
    fn test_effects_see_earlier_results() {
        let mut p = player();
        apply_effects(
            &mut p,
            &[
                Effect::AddGold { value: -10 },
                Effect::AddGold { value: 3 },
            ],
        );
        assert_eq!(p.gold, 3);
    }

    #[test]
    fn test_effect_json_shape() {
        let effects: Vec<Effect> = serde_json::from_str(
            r#"[{"type":"add_gold","value":15},
                {"type":"add_item","item":"potion","qty":1},
                {"type":"set_hp","value":3}]"#,
        )
        .unwrap();
        assert_eq!(effects[0], Effect::AddGold { value: 15 });
        assert_eq!(
            effects[1],
            Effect::AddItem { item: "potion".to_string(), qty: 1 }
        );
        assert_eq!(effects[2], Effect::SetHp { value: 3 });
    }

    #[test]
    fn test_unknown_effect_is_ignored() {
        let effects: Vec<Effect> = serde_json::from_str(
            r#"[{"type":"heal_mp","value":3},
                {"type":"add_gold","value":4}]"#,
        )
        .unwrap();
        assert_eq!(effects, vec![Effect::Unknown, Effect::AddGold { value: 4 }]);

        let mut p = player();
        let before = p.clone();
        apply_effect(&mut p, &Effect::Unknown);
        assert_eq!(p, before);

        apply_effects(&mut p, &effects);
        assert_eq!(p.gold, 14);
        assert_eq!(p.stats.mp, 5);
    }
}
