//! Turn-based combat resolution.
//!
//! A fight is a strict alternation: every player action that consumes a turn
//! is followed, in the same resolution step, by exactly one enemy attack
//! unless the action itself ended the fight. Damage uses a single formula:
//!
//! ```text
//! base(atk, def) = max(1, atk - floor(def * 0.6))
//! skill          = max(1, floor(base(user.atk, enemy.def) * multiplier))
//! magic          = max(1, power + floor(user.atk * 0.3))
//! ```
//!
//! Fleeing succeeds when a d100 roll is at most
//! `clamp(35 + escape_boost, 5, 90)`.

use crate::content::{ContentError, ContentLibrary, ItemEffectKind};
use crate::dice::RollSource;
use crate::episode::CombatTrigger;
use crate::i18n::{Lang, LocalizedText, Strings};
use crate::player::{PlayerState, Stats};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_LOG_CAPACITY: usize = 6;

pub const BASE_ESCAPE_CHANCE: u32 = 35;
pub const MIN_ESCAPE_CHANCE: u32 = 5;
pub const MAX_ESCAPE_CHANCE: u32 = 90;

// ============================================================================
// Formulas
// ============================================================================

/// Basic attack damage. Always at least 1.
pub fn base_damage(atk: u32, def: u32) -> u32 {
    let reduction = i64::from(def) * 6 / 10;
    (i64::from(atk) - reduction).max(1) as u32
}

/// Skill damage: the basic attack scaled by the skill multiplier.
pub fn skill_damage(atk: u32, def: u32, multiplier: f64) -> u32 {
    let scaled = (f64::from(base_damage(atk, def)) * multiplier).floor();
    if scaled.is_nan() || scaled < 1.0 {
        1
    } else {
        scaled.min(f64::from(u32::MAX)) as u32
    }
}

/// Magic damage: flat spell power plus 30% of the caster's attack.
pub fn magic_damage(power: u32, atk: u32) -> u32 {
    let bonus = u64::from(atk) * 3 / 10;
    (u64::from(power) + bonus).clamp(1, u64::from(u32::MAX)) as u32
}

/// Flee success chance in percent.
pub fn escape_chance(escape_boost: u32) -> u32 {
    BASE_ESCAPE_CHANCE
        .saturating_add(escape_boost)
        .clamp(MIN_ESCAPE_CHANCE, MAX_ESCAPE_CHANCE)
}

// ============================================================================
// State
// ============================================================================

/// Rolling window of recent combat messages. The oldest entry is dropped
/// once the log is full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatLog {
    capacity: usize,
    entries: VecDeque<String>,
}

impl CombatLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push_back(entry.into());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// The live enemy in an encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: String,
    pub name: LocalizedText,
    pub stats: Stats,
}

impl Combatant {
    pub fn name(&self, lang: Lang) -> &str {
        self.name.get(lang)
    }

    pub fn is_defeated(&self) -> bool {
        self.stats.hp == 0
    }
}

/// Where an encounter is in its turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatPhase {
    /// Waiting for the player's action.
    PlayerTurn,
    /// Applying an action and the enemy's answer.
    Resolving,
    Won,
    Lost,
    Escaped,
}

/// State of an active encounter. Exists only while the session is in combat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatState {
    pub enemy: Combatant,
    pub win_target: String,
    pub lose_target: String,
    pub log: CombatLog,
    pub escape_boost: u32,
    pub phase: CombatPhase,
    pub round: u32,
}

impl CombatState {
    pub fn enemy_id(&self) -> &str {
        &self.enemy.id
    }

    /// The node the story continues at for a finished fight.
    pub fn exit_target(&self) -> Option<&str> {
        match self.phase {
            CombatPhase::Won => Some(&self.win_target),
            CombatPhase::Lost | CombatPhase::Escaped => Some(&self.lose_target),
            CombatPhase::PlayerTurn | CombatPhase::Resolving => None,
        }
    }
}

/// A player action during combat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CombatAction {
    Attack,
    Skill(String),
    Magic(String),
    Item(String),
    Flee,
}

/// Result of resolving one combat action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatOutcome {
    /// The exchange happened and the fight goes on.
    Continue,
    /// The action could not be taken; no turn was consumed.
    Rejected,
    Won,
    Lost,
    /// The player fled. Routed like a non-win exit.
    Escaped,
}

impl CombatOutcome {
    pub fn is_over(&self) -> bool {
        matches!(
            self,
            CombatOutcome::Won | CombatOutcome::Lost | CombatOutcome::Escaped
        )
    }
}

/// An entry in the combat action menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOption {
    pub action: CombatAction,
    pub label: String,
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves combat actions against the static content.
pub struct CombatResolver<'a> {
    library: &'a ContentLibrary,
    strings: Strings,
}

impl<'a> CombatResolver<'a> {
    pub fn new(library: &'a ContentLibrary, lang: Lang) -> Self {
        Self {
            library,
            strings: Strings::new(lang),
        }
    }

    fn lang(&self) -> Lang {
        self.strings.lang()
    }

    /// Start an encounter from a node's combat trigger.
    pub fn start(
        &self,
        trigger: &CombatTrigger,
        log_capacity: usize,
    ) -> Result<CombatState, ContentError> {
        let enemy = self.library.enemy(&trigger.enemy)?;
        let base = enemy.stats;
        let combatant = Combatant {
            id: trigger.enemy.clone(),
            name: enemy.name.clone(),
            stats: Stats {
                hp: base.max_hp,
                max_hp: base.max_hp,
                mp: base.max_mp,
                max_mp: base.max_mp,
                atk: base.atk,
                def: base.def,
            },
        };

        let mut log = CombatLog::new(log_capacity);
        log.push(self.strings.encounter(combatant.name(self.lang())));
        tracing::info!(enemy = %trigger.enemy, "combat started");

        Ok(CombatState {
            enemy: combatant,
            win_target: trigger.win.clone(),
            lose_target: trigger.lose.clone(),
            log,
            escape_boost: 0,
            phase: CombatPhase::PlayerTurn,
            round: 1,
        })
    }

    /// Actions the player can pick right now. Abilities or items whose
    /// content is missing are left out.
    pub fn action_menu(&self, player: &PlayerState) -> Vec<ActionOption> {
        let lang = self.lang();
        let mut options = vec![ActionOption {
            action: CombatAction::Attack,
            label: self.strings.attack().to_string(),
        }];

        for skill_id in &player.skills {
            match self.library.skill(skill_id) {
                Ok(skill) => options.push(ActionOption {
                    action: CombatAction::Skill(skill_id.clone()),
                    label: format!("{} ({} MP)", skill.name.get(lang), skill.mp_cost),
                }),
                Err(e) => tracing::warn!("skipping skill button: {e}"),
            }
        }

        for magic_id in &player.magics {
            match self.library.magic(magic_id) {
                Ok(magic) => options.push(ActionOption {
                    action: CombatAction::Magic(magic_id.clone()),
                    label: format!("{} ({} MP)", magic.name.get(lang), magic.mp_cost),
                }),
                Err(e) => tracing::warn!("skipping magic button: {e}"),
            }
        }

        for (item_id, qty) in player.inventory.iter() {
            match self.library.item(item_id) {
                Ok(item) => options.push(ActionOption {
                    action: CombatAction::Item(item_id.to_string()),
                    label: format!("{} x{}", item.name.get(lang), qty),
                }),
                Err(e) => tracing::warn!("skipping item button: {e}"),
            }
        }

        options.push(ActionOption {
            action: CombatAction::Flee,
            label: self.strings.flee().to_string(),
        });
        options
    }

    /// Resolve one player action, followed by the enemy's retaliation when
    /// the fight is still on.
    pub fn resolve(
        &self,
        combat: &mut CombatState,
        player: &mut PlayerState,
        action: &CombatAction,
        rolls: &mut dyn RollSource,
    ) -> CombatOutcome {
        if combat.phase != CombatPhase::PlayerTurn {
            tracing::warn!(phase = ?combat.phase, "combat action outside the player's turn");
            return CombatOutcome::Rejected;
        }
        combat.phase = CombatPhase::Resolving;

        let outcome = match self.player_action(combat, player, action, rolls) {
            PlayerStep::Rejected => CombatOutcome::Rejected,
            PlayerStep::Escaped => {
                combat.log.push(self.strings.escape_succeeded());
                CombatOutcome::Escaped
            }
            PlayerStep::TurnTaken => {
                if combat.enemy.is_defeated() {
                    combat
                        .log
                        .push(self.strings.enemy_defeated(combat.enemy.name(self.lang())));
                    CombatOutcome::Won
                } else {
                    self.enemy_turn(combat, player)
                }
            }
        };

        combat.phase = match outcome {
            CombatOutcome::Continue | CombatOutcome::Rejected => CombatPhase::PlayerTurn,
            CombatOutcome::Won => CombatPhase::Won,
            CombatOutcome::Lost => CombatPhase::Lost,
            CombatOutcome::Escaped => CombatPhase::Escaped,
        };
        if outcome == CombatOutcome::Continue {
            combat.round += 1;
        }
        tracing::debug!(?action, ?outcome, round = combat.round, "combat action resolved");
        outcome
    }

    fn player_action(
        &self,
        combat: &mut CombatState,
        player: &mut PlayerState,
        action: &CombatAction,
        rolls: &mut dyn RollSource,
    ) -> PlayerStep {
        let lang = self.lang();
        match action {
            CombatAction::Attack => {
                let damage = base_damage(player.stats.atk, combat.enemy.stats.def);
                combat.enemy.stats.take_damage(damage);
                combat
                    .log
                    .push(self.strings.player_hits(combat.enemy.name(lang), damage));
                PlayerStep::TurnTaken
            }
            CombatAction::Skill(skill_id) => {
                let skill = match self.library.skill(skill_id) {
                    Ok(skill) if player.knows_skill(skill_id) => skill,
                    Ok(_) => return self.reject(combat, skill_id),
                    Err(e) => {
                        tracing::warn!("{e}");
                        return self.reject(combat, skill_id);
                    }
                };
                let name = skill.name.get(lang);
                if !player.stats.spend_mp(skill.mp_cost) {
                    combat.log.push(self.strings.not_enough_mp(name));
                    return PlayerStep::Rejected;
                }
                let damage =
                    skill_damage(player.stats.atk, combat.enemy.stats.def, skill.multiplier);
                combat.enemy.stats.take_damage(damage);
                combat
                    .log
                    .push(self.strings.skill_hits(name, combat.enemy.name(lang), damage));
                PlayerStep::TurnTaken
            }
            CombatAction::Magic(magic_id) => {
                let magic = match self.library.magic(magic_id) {
                    Ok(magic) if player.knows_magic(magic_id) => magic,
                    Ok(_) => return self.reject(combat, magic_id),
                    Err(e) => {
                        tracing::warn!("{e}");
                        return self.reject(combat, magic_id);
                    }
                };
                let name = magic.name.get(lang);
                if !player.stats.spend_mp(magic.mp_cost) {
                    combat.log.push(self.strings.not_enough_mp(name));
                    return PlayerStep::Rejected;
                }
                let damage = magic_damage(magic.power, player.stats.atk);
                combat.enemy.stats.take_damage(damage);
                combat
                    .log
                    .push(self.strings.skill_hits(name, combat.enemy.name(lang), damage));
                PlayerStep::TurnTaken
            }
            CombatAction::Item(item_id) => {
                let item = match self.library.item(item_id) {
                    Ok(item) => item,
                    Err(e) => {
                        tracing::warn!("{e}");
                        return self.reject(combat, item_id);
                    }
                };
                let name = item.name.get(lang);
                if !player.inventory.consume_one(item_id) {
                    combat.log.push(self.strings.unavailable(name));
                    return PlayerStep::Rejected;
                }
                combat.log.push(self.strings.item_used(name));
                match item.effect {
                    ItemEffectKind::HealHp => {
                        let healed = player.stats.heal_hp(item.value);
                        combat.log.push(self.strings.restored_hp(healed));
                    }
                    ItemEffectKind::HealMp => {
                        let restored = player.stats.restore_mp(item.value);
                        combat.log.push(self.strings.restored_mp(restored));
                    }
                    ItemEffectKind::EscapeBoost => {
                        combat.escape_boost = combat.escape_boost.saturating_add(item.value);
                        combat
                            .log
                            .push(self.strings.escape_boosted(escape_chance(combat.escape_boost)));
                    }
                }
                PlayerStep::TurnTaken
            }
            CombatAction::Flee => {
                let chance = escape_chance(combat.escape_boost);
                let roll = rolls.roll_percent();
                tracing::debug!(roll, chance, "escape roll");
                if roll <= chance {
                    PlayerStep::Escaped
                } else {
                    combat.log.push(self.strings.escape_failed());
                    PlayerStep::TurnTaken
                }
            }
        }
    }

    fn reject(&self, combat: &mut CombatState, what: &str) -> PlayerStep {
        combat.log.push(self.strings.unavailable(what));
        PlayerStep::Rejected
    }

    fn enemy_turn(&self, combat: &mut CombatState, player: &mut PlayerState) -> CombatOutcome {
        let damage = base_damage(combat.enemy.stats.atk, player.stats.def);
        let dropped = player.stats.take_damage(damage);
        combat
            .log
            .push(self.strings.enemy_hits(combat.enemy.name(self.lang()), damage));
        if dropped {
            combat.log.push(self.strings.player_defeated());
            CombatOutcome::Lost
        } else {
            CombatOutcome::Continue
        }
    }
}

enum PlayerStep {
    TurnTaken,
    Rejected,
    Escaped,
}
