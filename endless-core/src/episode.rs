//! Episodes and story nodes.
//!
//! An episode is one independently loaded story graph: a map of node ids to
//! nodes, one document per language. Nodes are stored in their document
//! shape ([`StoryNode`]) and classified into a [`NodeKind`] when the
//! navigator needs to decide what to show.

use crate::content::{Collection, ContentError};
use crate::effects::Effect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_ENTRY_NODE: &str = "intro";

fn default_entry() -> String {
    DEFAULT_ENTRY_NODE.to_string()
}

/// A loaded episode in one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    /// Node the episode starts at when entered through an episode link.
    #[serde(default = "default_entry")]
    pub start: String,
    pub nodes: BTreeMap<String, StoryNode>,
}

impl Episode {
    pub fn node(&self, node_id: &str) -> Result<&StoryNode, ContentError> {
        self.nodes
            .get(node_id)
            .ok_or_else(|| ContentError::not_found(Collection::Nodes, node_id))
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }
}

/// One branch of a choice node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub next: String,
}

/// Encounter declared by a node: the enemy and where each exit leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatTrigger {
    pub enemy: String,
    pub win: String,
    pub lose: String,
}

/// Special UI a node asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeUi {
    ClassSelect,
}

/// A story node as written in episode documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StoryNode {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat: Option<CombatTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<NodeUi>,
    /// Id of the episode this node leads into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_episode: Option<String>,
    /// Marks the node as an ending.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub end: bool,
}

/// What a node is, in order of precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<'a> {
    /// Leads into another episode.
    EpisodeLink { episode: &'a str },
    /// Class selection screen.
    ClassSelect,
    /// Starts an encounter.
    Combat(&'a CombatTrigger),
    /// An ending: text and a single way out.
    Ending,
    /// Plain narrative with zero or more branches.
    Scene { choices: &'a [Choice] },
}

impl StoryNode {
    pub fn kind(&self) -> NodeKind<'_> {
        if let Some(episode) = &self.next_episode {
            return NodeKind::EpisodeLink { episode };
        }
        if self.ui == Some(NodeUi::ClassSelect) {
            return NodeKind::ClassSelect;
        }
        if let Some(trigger) = &self.combat {
            return NodeKind::Combat(trigger);
        }
        if self.end {
            return NodeKind::Ending;
        }
        NodeKind::Scene {
            choices: &self.choices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> StoryNode {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_episode_document() {
        let episode: Episode = serde_json::from_str(
            r#"{
                "id": "ep1",
                "nodes": {
                    "intro": {"title": "Start", "text": "Hello", "ui": {"type": "class_select"}},
                    "road": {"title": "Road", "text": "...",
                             "choices": [{"label": "Go", "next": "intro"}]}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(episode.start, "intro");
        assert!(episode.contains("road"));
        assert_eq!(episode.node("intro").unwrap().kind(), NodeKind::ClassSelect);
        assert!(matches!(
            episode.node("cave"),
            Err(ContentError::NotFound { collection: Collection::Nodes, .. })
        ));
    }

    #[test]
    fn test_kind_precedence() {
        let node = parse(
            r#"{"next_episode": "ep2", "ui": {"type": "class_select"},
                "combat": {"enemy": "slime", "win": "a", "lose": "b"}}"#,
        );
        assert_eq!(node.kind(), NodeKind::EpisodeLink { episode: "ep2" });

        let node = parse(
            r#"{"ui": {"type": "class_select"},
                "combat": {"enemy": "slime", "win": "a", "lose": "b"}}"#,
        );
        assert_eq!(node.kind(), NodeKind::ClassSelect);

        let node = parse(r#"{"combat": {"enemy": "slime", "win": "a", "lose": "b"}, "end": true}"#);
        assert!(matches!(node.kind(), NodeKind::Combat(t) if t.enemy == "slime"));

        let node = parse(r#"{"end": true, "choices": [{"label": "x", "next": "y"}]}"#);
        assert_eq!(node.kind(), NodeKind::Ending);

        let node = parse(r#"{"title": "Quiet"}"#);
        assert_eq!(node.kind(), NodeKind::Scene { choices: &[] });
    }

    #[test]
    fn test_node_effects_parse() {
        let node = parse(r#"{"effects": [{"type": "add_exp", "value": 5}]}"#);
        assert_eq!(node.effects, vec![Effect::AddExp { value: 5 }]);
    }
}
