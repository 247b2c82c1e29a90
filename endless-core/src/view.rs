//! What the presentation layer sees and sends.
//!
//! The engine never renders anything. After every intent it produces a
//! [`ViewModel`]: panel text, the ordered list of actions the player may take
//! (each carrying the [`Intent`] to send back), and a HUD summary.

use crate::combat::CombatAction;
use crate::i18n::Lang;
use crate::player::PlayerState;
use serde::{Deserialize, Serialize};

/// A discrete player action submitted to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    NewGame,
    ContinueGame,
    SelectLanguage { lang: Lang },
    /// Pick a class on the class-select screen.
    SelectClass { class_id: String },
    /// Follow a story branch (or the finish action) to a node.
    Choose { target: String },
    /// Confirm an episode transition.
    EnterEpisode { episode: String },
    BeginCombat,
    Combat { action: CombatAction },
    ReturnToTitle,
    DeleteSave,
}

/// Visual emphasis hint for an action button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionStyle {
    #[default]
    Normal,
    Primary,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewAction {
    pub label: String,
    pub intent: Intent,
    #[serde(default)]
    pub style: ActionStyle,
}

impl ViewAction {
    pub fn new(label: impl Into<String>, intent: Intent) -> Self {
        Self {
            label: label.into(),
            intent,
            style: ActionStyle::Normal,
        }
    }

    pub fn primary(label: impl Into<String>, intent: Intent) -> Self {
        Self::new(label, intent).with_style(ActionStyle::Primary)
    }

    pub fn with_style(mut self, style: ActionStyle) -> Self {
        self.style = style;
        self
    }
}

/// Player summary shown alongside every panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hud {
    pub name: String,
    pub class_label: String,
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub mp: u32,
    pub max_mp: u32,
    pub atk: u32,
    pub def: u32,
    pub gold: u32,
    pub exp: u32,
}

impl Hud {
    pub fn from_player(player: &PlayerState, class_label: impl Into<String>) -> Self {
        let s = &player.stats;
        Self {
            name: player.name.clone(),
            class_label: class_label.into(),
            level: player.level,
            hp: s.hp,
            max_hp: s.max_hp,
            mp: s.mp,
            max_mp: s.max_mp,
            atk: s.atk,
            def: s.def,
            gold: player.gold,
            exp: player.exp,
        }
    }
}

/// Live enemy summary during combat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyView {
    pub name: String,
    pub hp: u32,
    pub max_hp: u32,
}

/// Read-only projection of the session, produced after every intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ViewModel {
    pub title: String,
    pub body: String,
    pub subtitle: String,
    pub actions: Vec<ViewAction>,
    pub hud: Option<Hud>,
    pub enemy: Option<EnemyView>,
    /// Recent combat messages, oldest first.
    pub combat_log: Vec<String>,
    /// One-line message for recoverable errors and confirmations.
    pub notice: Option<String>,
}

impl ViewModel {
    pub fn panel(
        title: impl Into<String>,
        body: impl Into<String>,
        subtitle: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            subtitle: subtitle.into(),
            ..Self::default()
        }
    }

    pub fn with_actions(mut self, actions: Vec<ViewAction>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_notice(mut self, notice: Option<String>) -> Self {
        self.notice = notice;
        self
    }

    /// Find an offered action by its intent.
    pub fn find_action(&self, intent: &Intent) -> Option<&ViewAction> {
        self.actions.iter().find(|a| &a.intent == intent)
    }

    pub fn offers(&self, intent: &Intent) -> bool {
        self.find_action(intent).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_json_shape() {
        let intent = Intent::Choose {
            target: "forest".to_string(),
        };
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["intent"], "choose");
        assert_eq!(json["target"], "forest");

        let combat: Intent = serde_json::from_str(
            r#"{"intent":"combat","action":{"kind":"skill","id":"power_strike"}}"#,
        )
        .unwrap();
        assert_eq!(
            combat,
            Intent::Combat {
                action: CombatAction::Skill("power_strike".to_string())
            }
        );

        let attack: Intent =
            serde_json::from_str(r#"{"intent":"combat","action":{"kind":"attack"}}"#).unwrap();
        assert_eq!(attack, Intent::Combat { action: CombatAction::Attack });
    }

    #[test]
    fn test_hud_from_player() {
        let mut player = PlayerState::new("Ayu");
        player.gold = 12;
        let hud = Hud::from_player(&player, "Mage");
        assert_eq!(hud.name, "Ayu");
        assert_eq!(hud.class_label, "Mage");
        assert_eq!(hud.gold, 12);
        assert_eq!((hud.hp, hud.max_hp), (1, 1));
    }

    #[test]
    fn test_find_action() {
        let view = ViewModel::panel("T", "B", "").with_actions(vec![
            ViewAction::primary("New Game", Intent::NewGame),
            ViewAction::new("Back", Intent::ReturnToTitle),
        ]);
        assert!(view.offers(&Intent::NewGame));
        assert!(!view.offers(&Intent::DeleteSave));
        assert_eq!(
            view.find_action(&Intent::NewGame).unwrap().style,
            ActionStyle::Primary
        );
    }
}
