//! Testing utilities for the engine.
//!
//! This module provides tools for unit and integration testing:
//! - Small deterministic content fixtures (`sample_library`, `sample_episode`)
//! - `sample_source` serving those fixtures as documents
//! - `TestHarness` for scripted game scenarios
//! - Assertion helpers for verifying session state

use crate::content::{
    BaseStats, ClassDefinition, ContentLibrary, EnemyDefinition, ItemDefinition, ItemEffectKind,
    ItemStack, MagicDefinition, SkillDefinition,
};
use crate::dice::FixedRolls;
use crate::effects::Effect;
use crate::episode::{Choice, CombatTrigger, Episode, NodeUi, StoryNode};
use crate::i18n::{Lang, LocalizedText};
use crate::loader::{Document, MemorySource};
use crate::persist::MemorySaveStore;
use crate::player::PlayerState;
use crate::session::{GameMode, GameSession, SessionConfig};
use crate::story::END_NODE;
use crate::view::{Intent, ViewModel};
use std::collections::BTreeMap;

/// The class roster used by the fixtures.
pub const ROSTER: [&str; 3] = ["warrior", "mage", "rogue"];

fn named(id: &str, en: &str) -> LocalizedText {
    LocalizedText::PerLang(BTreeMap::from([
        (Lang::Id, id.to_string()),
        (Lang::En, en.to_string()),
    ]))
}

fn stats(max_hp: u32, max_mp: u32, atk: u32, def: u32) -> BaseStats {
    BaseStats {
        max_hp,
        max_mp,
        atk,
        def,
    }
}

fn stack(id: &str, qty: u32) -> ItemStack {
    ItemStack {
        id: id.to_string(),
        qty,
    }
}

fn class(
    name: &str,
    base: BaseStats,
    skills: &[&str],
    magics: &[&str],
    start_items: Vec<ItemStack>,
) -> ClassDefinition {
    ClassDefinition {
        name: LocalizedText::from(name),
        stats: base,
        skills: skills.iter().map(|s| s.to_string()).collect(),
        magics: magics.iter().map(|m| m.to_string()).collect(),
        start_items,
    }
}

/// A small content library: three classes, three items, two skills,
/// one spell and three enemies of rising strength.
pub fn sample_library() -> ContentLibrary {
    let mut library = ContentLibrary::default();

    library.classes.insert(
        "warrior".into(),
        class("Warrior", stats(40, 5, 8, 6), &["power_strike"], &[], vec![stack("potion", 2)]),
    );
    library.classes.insert(
        "mage".into(),
        class("Mage", stats(24, 20, 4, 2), &[], &["fireball"], vec![stack("ether", 2)]),
    );
    library.classes.insert(
        "rogue".into(),
        class(
            "Rogue",
            stats(30, 8, 7, 4),
            &["quick_stab"],
            &[],
            vec![stack("potion", 1), stack("smoke_bomb", 1)],
        ),
    );

    library.items.insert(
        "potion".into(),
        ItemDefinition {
            name: named("Ramuan", "Potion"),
            effect: ItemEffectKind::HealHp,
            value: 20,
        },
    );
    library.items.insert(
        "ether".into(),
        ItemDefinition {
            name: named("Eter", "Ether"),
            effect: ItemEffectKind::HealMp,
            value: 10,
        },
    );
    library.items.insert(
        "smoke_bomb".into(),
        ItemDefinition {
            name: named("Bom Asap", "Smoke Bomb"),
            effect: ItemEffectKind::EscapeBoost,
            value: 25,
        },
    );

    library.skills.insert(
        "power_strike".into(),
        SkillDefinition {
            name: named("Tebasan Kuat", "Power Strike"),
            mp_cost: 3,
            multiplier: 1.5,
        },
    );
    library.skills.insert(
        "quick_stab".into(),
        SkillDefinition {
            name: named("Tusukan Cepat", "Quick Stab"),
            mp_cost: 2,
            multiplier: 1.2,
        },
    );

    library.magic.insert(
        "fireball".into(),
        MagicDefinition {
            name: named("Bola Api", "Fireball"),
            mp_cost: 5,
            power: 12,
        },
    );

    library.enemies.insert(
        "slime".into(),
        EnemyDefinition {
            name: named("Lendir", "Slime"),
            stats: stats(12, 0, 4, 1),
        },
    );
    library.enemies.insert(
        "wolf".into(),
        EnemyDefinition {
            name: named("Serigala", "Wolf"),
            stats: stats(30, 0, 7, 2),
        },
    );
    library.enemies.insert(
        "ogre".into(),
        EnemyDefinition {
            name: named("Raksasa", "Ogre"),
            stats: stats(80, 0, 12, 6),
        },
    );

    library
}

/// A player who has already picked `class_id` from [`sample_library`].
pub fn sample_player(class_id: &str) -> PlayerState {
    let library = sample_library();
    let mut player = PlayerState::new("Hero");
    if let Ok(class) = library.class(class_id) {
        player.apply_class(class_id, class);
    }
    player
}

fn node(title: &str, text: &str) -> StoryNode {
    StoryNode {
        title: title.to_string(),
        text: text.to_string(),
        ..StoryNode::default()
    }
}

fn choice(label: &str, next: &str) -> Choice {
    Choice {
        label: label.to_string(),
        next: next.to_string(),
    }
}

/// Episode `ep1` in one language.
///
/// ```text
/// intro (class select) -> intro_after_class -> crossroads
/// crossroads -> treasure -> ambush | crossroads -> ambush
/// ambush (slime) -> victory -> gate (to ep2) | -> defeat -> finale (end)
/// ```
pub fn sample_episode(lang: Lang) -> Episode {
    let t = |id: &'static str, en: &'static str| lang.pick(id, en);
    let mut nodes = BTreeMap::new();

    let mut intro = node(t("Prolog", "Prologue"), t("Kamu terbangun.", "You wake up."));
    intro.ui = Some(NodeUi::ClassSelect);
    nodes.insert("intro".to_string(), intro);

    let mut after_class = node(t("Desa", "Village"), t("Tetua memberimu bekal.", "The elder gives you supplies."));
    after_class.effects = vec![Effect::AddGold { value: 10 }];
    after_class.choices = vec![choice(t("Berangkat", "Set out"), "crossroads")];
    nodes.insert("intro_after_class".to_string(), after_class);

    let mut crossroads = node(t("Persimpangan", "Crossroads"), t("Jalan bercabang.", "The road splits."));
    crossroads.choices = vec![
        choice(t("Periksa reruntuhan", "Search the ruins"), "treasure"),
        choice(t("Ambil jalan hutan", "Take the forest path"), "ambush"),
    ];
    nodes.insert("crossroads".to_string(), crossroads);

    let mut treasure = node(t("Reruntuhan", "Ruins"), t("Ada peti tua.", "An old chest."));
    treasure.effects = vec![
        Effect::AddGold { value: 25 },
        Effect::AddItem {
            item: "potion".to_string(),
            qty: 1,
        },
    ];
    treasure.choices = vec![choice(t("Lanjut", "Move on"), "ambush")];
    nodes.insert("treasure".to_string(), treasure);

    let mut ambush = node(t("Penyergapan", "Ambush"), t("Sesuatu bergerak.", "Something moves."));
    ambush.combat = Some(CombatTrigger {
        enemy: "slime".to_string(),
        win: "victory".to_string(),
        lose: "defeat".to_string(),
    });
    nodes.insert("ambush".to_string(), ambush);

    let mut victory = node(t("Menang", "Victory"), t("Jalan terbuka.", "The way is clear."));
    victory.effects = vec![Effect::AddExp { value: 10 }];
    victory.choices = vec![choice(t("Ke gerbang", "To the gate"), "gate")];
    nodes.insert("victory".to_string(), victory);

    let mut defeat = node(t("Kalah", "Defeat"), t("Kamu diseret pulang.", "You are dragged home."));
    defeat.effects = vec![Effect::SetHp { value: 1 }];
    defeat.choices = vec![choice(t("Bangkit", "Get up"), "finale")];
    nodes.insert("defeat".to_string(), defeat);

    let mut gate = node(t("Gerbang", "Gate"), t("Gerbang ke utara.", "A gate to the north."));
    gate.next_episode = Some("ep2".to_string());
    nodes.insert("gate".to_string(), gate);

    let mut finale = node(t("Akhir", "Finale"), t("Kisah ini usai.", "The tale is over."));
    finale.end = true;
    nodes.insert("finale".to_string(), finale);

    Episode {
        id: "ep1".to_string(),
        start: "intro".to_string(),
        nodes,
    }
}

/// Episode `ep2`: a single ending node, entered at `camp`.
pub fn sample_sequel(lang: Lang) -> Episode {
    let mut camp = node(
        lang.pick("Perkemahan", "Camp"),
        lang.pick("Malam yang tenang.", "A quiet night."),
    );
    camp.end = true;
    Episode {
        id: "ep2".to_string(),
        start: "camp".to_string(),
        nodes: BTreeMap::from([("camp".to_string(), camp)]),
    }
}

/// Every fixture served as documents: the five collections plus `ep1` and
/// `ep2` in both languages.
pub fn sample_source() -> MemorySource {
    let library = sample_library();
    let mut source = MemorySource::new()
        .with(Document::Classes, serde_json::json!(library.classes).to_string())
        .with(Document::Items, serde_json::json!(library.items).to_string())
        .with(Document::Skills, serde_json::json!(library.skills).to_string())
        .with(Document::Magic, serde_json::json!(library.magic).to_string())
        .with(Document::Enemies, serde_json::json!(library.enemies).to_string());

    for lang in Lang::all() {
        source.insert(
            Document::episode("ep1", lang),
            serde_json::json!(sample_episode(lang)).to_string(),
        );
        source.insert(
            Document::episode("ep2", lang),
            serde_json::json!(sample_sequel(lang)).to_string(),
        );
    }
    source
}

// ============================================================================
// Harness
// ============================================================================

/// Drives a [`GameSession`] over in-memory content and storage.
///
/// Escape rolls come from a [`FixedRolls`] queue; with nothing queued every
/// flee attempt fails.
pub struct TestHarness {
    session: GameSession<MemorySource, MemorySaveStore>,
    last_view: ViewModel,
}

impl TestHarness {
    /// A booted session over the fixtures, in English, with no save.
    pub async fn new() -> Self {
        Self::with_store(MemorySaveStore::new()).await
    }

    /// Boot over an existing store (e.g. one taken from a previous harness).
    pub async fn with_store(store: MemorySaveStore) -> Self {
        Self::with_parts(
            SessionConfig::new().with_default_lang(Lang::En),
            sample_source(),
            store,
        )
        .await
    }

    pub async fn with_parts(
        config: SessionConfig,
        source: MemorySource,
        store: MemorySaveStore,
    ) -> Self {
        let session = GameSession::start(config, source, store)
            .await
            .with_roller(FixedRolls::default());
        let last_view = session.view();
        Self { session, last_view }
    }

    pub fn session(&self) -> &GameSession<MemorySource, MemorySaveStore> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut GameSession<MemorySource, MemorySaveStore> {
        &mut self.session
    }

    pub fn into_store(self) -> MemorySaveStore {
        self.session.into_store()
    }

    /// Script the next escape rolls.
    pub fn queue_rolls(&mut self, rolls: impl IntoIterator<Item = u32>) {
        self.session.set_roller(FixedRolls::new(rolls));
    }

    /// Send an intent and keep the resulting view.
    pub async fn send(&mut self, intent: Intent) -> &ViewModel {
        self.last_view = self.session.apply(intent).await;
        &self.last_view
    }

    /// Follow a story branch.
    pub async fn choose(&mut self, target: &str) -> &ViewModel {
        self.send(Intent::Choose {
            target: target.to_string(),
        })
        .await
    }

    /// Press the first offered action whose label contains `label`.
    ///
    /// Panics if no such action is on screen.
    pub async fn press(&mut self, label: &str) -> &ViewModel {
        let intent = self
            .last_view
            .actions
            .iter()
            .find(|a| a.label.contains(label))
            .map(|a| a.intent.clone());
        match intent {
            Some(intent) => self.send(intent).await,
            None => panic!(
                "no action labelled {label:?}; offered: {:?}",
                self.last_view.actions.iter().map(|a| &a.label).collect::<Vec<_>>()
            ),
        }
    }

    /// New game, then pick `class_id`.
    pub async fn start_as(&mut self, class_id: &str) -> &ViewModel {
        self.send(Intent::NewGame).await;
        self.send(Intent::SelectClass {
            class_id: class_id.to_string(),
        })
        .await
    }

    pub fn view(&self) -> &ViewModel {
        &self.last_view
    }

    pub fn mode(&self) -> GameMode {
        self.session.mode()
    }

    pub fn node_id(&self) -> &str {
        &self.session.state().node_id
    }

    pub fn player(&self) -> Option<&PlayerState> {
        self.session.player()
    }

    /// Get player HP as (current, max). `(0, 0)` without a player.
    pub fn player_hp(&self) -> (u32, u32) {
        self.player()
            .map(|p| (p.stats.hp, p.stats.max_hp))
            .unwrap_or_default()
    }

    pub fn gold(&self) -> u32 {
        self.player().map(|p| p.gold).unwrap_or_default()
    }

    pub fn in_combat(&self) -> bool {
        self.session.combat().is_some()
    }

    pub fn at_end(&self) -> bool {
        self.node_id() == END_NODE
    }
}

// ============================================================================
// Assertions
// ============================================================================

/// Assert the session is on a given node.
pub fn assert_node(harness: &TestHarness, node_id: &str) {
    assert_eq!(
        harness.node_id(),
        node_id,
        "Expected to be at node '{node_id}'"
    );
}

/// Assert the combat/mode invariant and that combat is running.
pub fn assert_in_combat(harness: &TestHarness) {
    assert!(harness.in_combat(), "Expected to be in combat");
    assert_eq!(harness.mode(), GameMode::Combat);
}

/// Assert no combat is running.
pub fn assert_not_in_combat(harness: &TestHarness) {
    assert!(!harness.in_combat(), "Expected to NOT be in combat");
    assert_ne!(harness.mode(), GameMode::Combat);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::dangling_references;

    #[test]
    fn test_fixture_episode_is_closed() {
        for lang in Lang::all() {
            assert!(dangling_references(&sample_episode(lang)).is_empty());
            assert!(dangling_references(&sample_sequel(lang)).is_empty());
        }
    }

    #[test]
    fn test_sample_player_has_class_kit() {
        let player = sample_player("warrior");
        assert_eq!(player.class_id, "warrior");
        assert_eq!(player.inventory.quantity("potion"), 2);
        assert!(player.knows_skill("power_strike"));
    }

    #[tokio::test]
    async fn test_harness_boots_to_title() {
        let harness = TestHarness::new().await;
        assert_eq!(harness.mode(), GameMode::Title);
        assert!(harness.view().offers(&Intent::NewGame));
        assert_not_in_combat(&harness);
    }
}
