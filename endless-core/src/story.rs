//! Story navigation.
//!
//! Resolving a node decides what the player is shown; entering a node is a
//! separate step that applies its effects. The session calls
//! [`Navigator::enter_node`] once per navigation, so re-rendering a node
//! never applies its effects twice.

use crate::content::{Collection, ContentError, ContentLibrary};
use crate::effects::apply_effects;
use crate::episode::{Choice, CombatTrigger, Episode, NodeKind, StoryNode};
use crate::i18n::{Lang, Strings};
use crate::player::PlayerState;
use serde::{Deserialize, Serialize};

/// Reserved node id that always routes to the end screen.
pub const END_NODE: &str = "__end__";

pub fn is_terminal(node_id: &str) -> bool {
    node_id == END_NODE
}

/// Where the player is in the story. Saved as `{"episodeId", "nodeId"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryPointer {
    pub episode_id: String,
    pub node_id: String,
}

impl StoryPointer {
    pub fn new(episode_id: impl Into<String>, node_id: impl Into<String>) -> Self {
        Self {
            episode_id: episode_id.into(),
            node_id: node_id.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        is_terminal(&self.node_id)
    }
}

/// A class offered on the class-select screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassOption {
    pub class_id: String,
    pub name: String,
    pub blurb: Option<String>,
}

impl ClassOption {
    pub fn label(&self) -> String {
        match &self.blurb {
            Some(blurb) => format!("{} — {}", self.name, blurb),
            None => self.name.clone(),
        }
    }
}

/// What a node resolves to for rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderIntent<'e> {
    /// The reserved end sentinel.
    Terminal,
    /// Prompt to continue into another episode.
    EpisodeTransition {
        node: &'e StoryNode,
        episode: &'e str,
    },
    ClassSelect {
        node: &'e StoryNode,
        options: Vec<ClassOption>,
    },
    /// A single action that starts the encounter.
    CombatPrompt {
        node: &'e StoryNode,
        trigger: &'e CombatTrigger,
    },
    /// Node text followed by one finishing action.
    Ending { node: &'e StoryNode },
    /// Node text with its branches; no branches means a finishing action.
    Scene {
        node: &'e StoryNode,
        choices: &'e [Choice],
    },
}

/// Resolves node transitions against an episode and the class roster.
pub struct Navigator<'a> {
    library: &'a ContentLibrary,
    roster: &'a [String],
    strings: Strings,
}

impl<'a> Navigator<'a> {
    pub fn new(library: &'a ContentLibrary, roster: &'a [String], lang: Lang) -> Self {
        Self {
            library,
            roster,
            strings: Strings::new(lang),
        }
    }

    /// Decide what to show for a node. Does not mutate anything.
    pub fn resolve_node<'e>(
        &self,
        episode: &'e Episode,
        node_id: &str,
    ) -> Result<RenderIntent<'e>, ContentError> {
        if is_terminal(node_id) {
            return Ok(RenderIntent::Terminal);
        }
        let node = episode.node(node_id)?;
        Ok(match node.kind() {
            NodeKind::EpisodeLink { episode } => RenderIntent::EpisodeTransition { node, episode },
            NodeKind::ClassSelect => RenderIntent::ClassSelect {
                node,
                options: self.class_options(),
            },
            NodeKind::Combat(trigger) => RenderIntent::CombatPrompt { node, trigger },
            NodeKind::Ending => RenderIntent::Ending { node },
            NodeKind::Scene { choices } => RenderIntent::Scene { node, choices },
        })
    }

    /// Classes from the roster that exist in the loaded content.
    pub fn class_options(&self) -> Vec<ClassOption> {
        let lang = self.strings.lang();
        self.roster
            .iter()
            .filter_map(|class_id| match self.library.class(class_id) {
                Ok(class) => Some(ClassOption {
                    class_id: class_id.clone(),
                    name: class.name.get(lang).to_string(),
                    blurb: self.strings.class_blurb(class_id).map(str::to_string),
                }),
                Err(e) => {
                    tracing::warn!("class option unavailable: {e}");
                    None
                }
            })
            .collect()
    }

    /// Apply a node's entry effects. Call once per navigation into the node.
    ///
    /// Every node kind carries effects. On a class-select node they land
    /// before the class is applied, so only gold and exp outlive the pick.
    pub fn enter_node(
        &self,
        player: &mut PlayerState,
        episode: &Episode,
        node_id: &str,
    ) -> Result<(), ContentError> {
        if is_terminal(node_id) {
            return Ok(());
        }
        let node = episode.node(node_id)?;
        if !node.effects.is_empty() {
            tracing::debug!(node = node_id, count = node.effects.len(), "applying node effects");
            apply_effects(player, &node.effects);
        }
        Ok(())
    }

    /// Apply a roster class to the player.
    pub fn select_class(&self, player: &mut PlayerState, class_id: &str) -> Result<(), ContentError> {
        if !self.roster.iter().any(|c| c == class_id) {
            return Err(ContentError::not_found(Collection::Classes, class_id));
        }
        let class = self.library.class(class_id)?;
        player.apply_class(class_id, class);
        tracing::info!(class = class_id, "class selected");
        Ok(())
    }

    /// Where a branch leads, if the current node offers it.
    pub fn validate_choice(&self, node: &StoryNode, target: &str) -> bool {
        match node.kind() {
            NodeKind::Scene { choices } if !choices.is_empty() => {
                choices.iter().any(|c| c.next == target)
            }
            NodeKind::Scene { .. } | NodeKind::Ending => is_terminal(target),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::Effect;
    use crate::testing::{sample_episode, sample_library, ROSTER};

    fn roster() -> Vec<String> {
        ROSTER.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_terminal_needs_no_lookup() {
        let library = sample_library();
        let roster = roster();
        let nav = Navigator::new(&library, &roster, Lang::En);
        let empty = Episode {
            id: "void".into(),
            start: "intro".into(),
            nodes: Default::default(),
        };
        assert_eq!(nav.resolve_node(&empty, END_NODE).unwrap(), RenderIntent::Terminal);
        assert!(nav.resolve_node(&empty, "intro").is_err());
    }

    #[test]
    fn test_resolve_variants() {
        let library = sample_library();
        let roster = roster();
        let episode = sample_episode(Lang::En);
        let nav = Navigator::new(&library, &roster, Lang::En);

        assert!(matches!(
            nav.resolve_node(&episode, "intro").unwrap(),
            RenderIntent::ClassSelect { ref options, .. } if options.len() == 3
        ));
        assert!(matches!(
            nav.resolve_node(&episode, "ambush").unwrap(),
            RenderIntent::CombatPrompt { trigger, .. } if trigger.enemy == "slime"
        ));
        assert!(matches!(
            nav.resolve_node(&episode, "gate").unwrap(),
            RenderIntent::EpisodeTransition { episode: "ep2", .. }
        ));
        assert!(matches!(
            nav.resolve_node(&episode, "crossroads").unwrap(),
            RenderIntent::Scene { choices, .. } if choices.len() == 2
        ));
    }

    #[test]
    fn test_class_options_skip_missing_classes() {
        let mut library = sample_library();
        library.classes.remove("rogue");
        let roster = roster();
        let nav = Navigator::new(&library, &roster, Lang::En);
        let options = nav.class_options();
        assert_eq!(options.len(), 2);
        assert!(options.iter().all(|o| o.class_id != "rogue"));
        assert_eq!(options[0].label(), "Warrior — Tanky & high DEF.");
    }

    #[test]
    fn test_enter_node_applies_effects_once_per_call() {
        let library = sample_library();
        let roster = roster();
        let episode = sample_episode(Lang::En);
        let nav = Navigator::new(&library, &roster, Lang::En);
        let mut player = PlayerState::new("Hero");

        let node = episode.node("treasure").unwrap();
        assert_eq!(node.effects[0], Effect::AddGold { value: 25 });

        nav.enter_node(&mut player, &episode, "treasure").unwrap();
        assert_eq!(player.gold, 25);

        // Resolving (rendering) does not apply anything
        nav.resolve_node(&episode, "treasure").unwrap();
        nav.resolve_node(&episode, "treasure").unwrap();
        assert_eq!(player.gold, 25);
    }

    #[test]
    fn test_link_and_class_select_nodes_apply_effects() {
        let library = sample_library();
        let roster = roster();
        let mut episode = sample_episode(Lang::En);
        episode.nodes.get_mut("gate").unwrap().effects = vec![Effect::AddGold { value: 50 }];
        episode.nodes.get_mut("intro").unwrap().effects = vec![
            Effect::AddExp { value: 3 },
            Effect::AddItem {
                item: "ether".into(),
                qty: 1,
            },
        ];
        let nav = Navigator::new(&library, &roster, Lang::En);
        let mut player = PlayerState::new("Hero");

        nav.enter_node(&mut player, &episode, "gate").unwrap();
        assert_eq!(player.gold, 50);

        nav.enter_node(&mut player, &episode, "intro").unwrap();
        assert_eq!(player.exp, 3);
        assert_eq!(player.inventory.quantity("ether"), 1);

        // The class kit replaces the inventory but keeps gold and exp
        nav.select_class(&mut player, "warrior").unwrap();
        assert_eq!((player.gold, player.exp), (50, 3));
        assert_eq!(player.inventory.quantity("ether"), 0);
        assert_eq!(player.inventory.quantity("potion"), 2);
    }

    #[test]
    fn test_select_class_requires_roster() {
        let mut library = sample_library();
        let mage = library.classes["mage"].clone();
        library.classes.insert("bard".to_string(), mage);
        let roster = roster();
        let nav = Navigator::new(&library, &roster, Lang::En);
        let mut player = PlayerState::new("Hero");

        assert!(nav.select_class(&mut player, "bard").is_err());
        assert!(!player.has_class());

        nav.select_class(&mut player, "mage").unwrap();
        assert_eq!(player.class_id, "mage");
        assert_eq!(player.stats.hp, player.stats.max_hp);
    }

    #[test]
    fn test_validate_choice() {
        let library = sample_library();
        let roster = roster();
        let episode = sample_episode(Lang::En);
        let nav = Navigator::new(&library, &roster, Lang::En);

        let crossroads = episode.node("crossroads").unwrap();
        assert!(nav.validate_choice(crossroads, "treasure"));
        assert!(!nav.validate_choice(crossroads, "gate_of_nowhere"));
        assert!(!nav.validate_choice(crossroads, END_NODE));

        let finale = episode.node("finale").unwrap();
        assert!(nav.validate_choice(finale, END_NODE));
    }
}
