//! GameSession - the single entry point for play.
//!
//! The presentation layer sends an [`Intent`] and gets back a [`ViewModel`].
//! Everything in between (navigation, combat, effects, content loading and
//! save writes) happens here, one intent at a time. A failed intent is
//! rolled back in memory and surfaces as the view's notice. Files already
//! written by the failed intent (the settings slot) are not restored.

use crate::combat::{CombatAction, CombatOutcome, CombatResolver, CombatState, DEFAULT_LOG_CAPACITY};
use crate::content::{Collection, ContentError, ContentLibrary};
use crate::dice::{RngRoller, RollSource};
use crate::episode::{Episode, NodeKind, StoryNode, DEFAULT_ENTRY_NODE};
use crate::i18n::{Lang, Settings, Strings, GAME_TITLE};
use crate::loader::{load_episode, load_library, ContentSource};
use crate::persist::{self, PersistError, SaveRecord, SaveStore};
use crate::player::{PlayerState, DEFAULT_PLAYER_NAME};
use crate::story::{is_terminal, Navigator, RenderIntent, StoryPointer, END_NODE};
use crate::view::{ActionStyle, EnemyView, Hud, Intent, ViewAction, ViewModel};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

/// Errors from GameSession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("Save error: {0}")]
    Persist(#[from] PersistError),

    #[error("No save found")]
    NoSaveFound,

    #[error("Save is corrupt: {0}")]
    SaveCorrupt(String),

    #[error("No game in progress")]
    NoActiveGame,

    #[error("Node not found: {0}")]
    Navigation(String),

    #[error("Action not available: {0}")]
    InvalidIntent(String),
}

/// Configuration for a game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name given to new players.
    pub player_name: String,

    /// Episode a new game starts in.
    pub first_episode: String,

    /// Node a new game starts at.
    pub entry_node: String,

    /// Node the story continues at after a class is picked.
    pub post_class_node: String,

    /// Classes offered on the class-select screen, in order.
    pub roster: Vec<String>,

    /// Number of combat log lines kept.
    pub log_capacity: usize,

    /// Language used when no settings have been saved yet.
    pub default_lang: Lang,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            player_name: DEFAULT_PLAYER_NAME.to_string(),
            first_episode: "ep1".to_string(),
            entry_node: DEFAULT_ENTRY_NODE.to_string(),
            post_class_node: "intro_after_class".to_string(),
            roster: ["warrior", "mage", "rogue"].map(String::from).to_vec(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            default_lang: Lang::default(),
        }
    }

    /// Set the name given to new players.
    pub fn with_player_name(mut self, name: impl Into<String>) -> Self {
        self.player_name = name.into();
        self
    }

    /// Set the episode and node a new game starts at.
    pub fn with_start(mut self, episode: impl Into<String>, node: impl Into<String>) -> Self {
        self.first_episode = episode.into();
        self.entry_node = node.into();
        self
    }

    pub fn with_post_class_node(mut self, node: impl Into<String>) -> Self {
        self.post_class_node = node.into();
        self
    }

    pub fn with_roster<I, T>(mut self, roster: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.roster = roster.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    pub fn with_default_lang(mut self, lang: Lang) -> Self {
        self.default_lang = lang;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Which screen the session is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameMode {
    #[default]
    Title,
    Story,
    Combat,
}

/// The session's single source of truth.
///
/// `combat` is `Some` exactly when `mode` is [`GameMode::Combat`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub episode_id: String,
    pub node_id: String,
    pub mode: GameMode,
    pub player: Option<PlayerState>,
    pub combat: Option<CombatState>,
}

impl SessionState {
    fn story(episode_id: &str, node_id: &str, player: PlayerState) -> Self {
        Self {
            episode_id: episode_id.to_string(),
            node_id: node_id.to_string(),
            mode: GameMode::Story,
            player: Some(player),
            combat: None,
        }
    }

    pub fn pointer(&self) -> StoryPointer {
        StoryPointer::new(&self.episode_id, &self.node_id)
    }
}

/// A game session over a content source and a save store.
pub struct GameSession<C, S> {
    config: SessionConfig,
    source: C,
    store: S,
    rolls: Box<dyn RollSource + Send>,
    settings: Settings,
    library: Option<ContentLibrary>,
    episode: Option<Episode>,
    state: SessionState,
    notice: Option<String>,
}

impl<C: ContentSource, S: SaveStore> GameSession<C, S> {
    /// Create a session at the title screen. Reads settings but loads no
    /// content; see [`GameSession::start`].
    pub fn new(config: SessionConfig, source: C, store: S) -> Self {
        let settings =
            persist::load_settings(&store).unwrap_or_else(|| Settings::new(config.default_lang));
        Self {
            config,
            source,
            store,
            rolls: Box::new(RngRoller::new(StdRng::from_entropy())),
            settings,
            library: None,
            episode: None,
            state: SessionState::default(),
            notice: None,
        }
    }

    /// Create a session and boot it: load the static content, then resume
    /// from a valid save if there is one.
    ///
    /// Never fails. Problems are reported through the view's notice and the
    /// session stays on the title screen.
    pub async fn start(config: SessionConfig, source: C, store: S) -> Self {
        let mut session = Self::new(config, source, store);
        session.boot().await;
        session
    }

    /// Replace the escape roll source.
    pub fn with_roller(mut self, rolls: impl RollSource + Send + 'static) -> Self {
        self.set_roller(rolls);
        self
    }

    pub fn set_roller(&mut self, rolls: impl RollSource + Send + 'static) {
        self.rolls = Box::new(rolls);
    }

    async fn boot(&mut self) {
        if let Err(e) = self.ensure_library().await {
            tracing::warn!("content unavailable at boot: {e}");
            self.notice = Some(self.describe(&SessionError::Content(e)));
            return;
        }

        match persist::load_record(&self.store) {
            Ok(Some(record)) if record.player.is_some() => {
                if let Err(e) = self.restore(record).await {
                    tracing::warn!("could not resume saved game: {e}");
                    self.notice = Some(self.describe(&e));
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("ignoring unreadable save: {e}");
                self.notice = Some(Strings::new(self.settings.lang).save_corrupt().to_string());
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn lang(&self) -> Lang {
        self.settings.lang
    }

    pub fn mode(&self) -> GameMode {
        self.state.mode
    }

    pub fn player(&self) -> Option<&PlayerState> {
        self.state.player.as_ref()
    }

    pub fn combat(&self) -> Option<&CombatState> {
        self.state.combat.as_ref()
    }

    pub fn library(&self) -> Option<&ContentLibrary> {
        self.library.as_ref()
    }

    pub fn episode(&self) -> Option<&Episode> {
        self.episode.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Tear the session down, keeping its save store.
    pub fn into_store(self) -> S {
        self.store
    }

    fn strings(&self) -> Strings {
        Strings::new(self.settings.lang)
    }

    // ========================================================================
    // Intents
    // ========================================================================

    /// Apply one intent and return the resulting view.
    ///
    /// A failed intent, including a failed save write, is rolled back: the
    /// in-memory state, settings and loaded episode return to what they were
    /// before the intent.
    pub async fn apply(&mut self, intent: Intent) -> ViewModel {
        self.notice = None;
        tracing::debug!(?intent, "applying intent");

        let checkpoint = Checkpoint {
            state: self.state.clone(),
            settings: self.settings,
            episode: swaps_episode(&intent).then(|| self.episode.clone()),
        };

        let result = match intent {
            Intent::NewGame => self.new_game().await,
            Intent::ContinueGame => self.continue_game().await,
            Intent::SelectLanguage { lang } => self.select_language(lang).await,
            Intent::SelectClass { class_id } => self.select_class(&class_id),
            Intent::Choose { target } => self.handle_choice(&target),
            Intent::EnterEpisode { episode } => self.enter_episode(&episode).await,
            Intent::BeginCombat => self.begin_combat(),
            Intent::Combat { action } => self.handle_combat_action(&action),
            Intent::ReturnToTitle => {
                self.return_to_title();
                Ok(())
            }
            Intent::DeleteSave => self.delete_save(),
        };

        if let Err(e) = result {
            tracing::warn!("intent failed: {e}");
            self.state = checkpoint.state;
            self.settings = checkpoint.settings;
            if let Some(episode) = checkpoint.episode {
                self.episode = episode;
            }
            self.notice = Some(self.describe(&e));
        }
        self.view()
    }

    /// Start over with a fresh player at the first episode's entry node.
    pub async fn new_game(&mut self) -> Result<(), SessionError> {
        self.ensure_library().await?;
        let episode =
            load_episode(&self.source, &self.config.first_episode, self.settings.lang).await?;

        self.episode = Some(episode);
        self.state = SessionState::story(
            &self.config.first_episode,
            &self.config.entry_node,
            PlayerState::new(&self.config.player_name),
        );
        tracing::info!(episode = %self.state.episode_id, "new game");

        let entry = self.state.node_id.clone();
        self.navigate(&entry)
    }

    /// Resume from the save slot.
    pub async fn continue_game(&mut self) -> Result<(), SessionError> {
        let record = match persist::load_record(&self.store) {
            Ok(Some(record)) => record,
            Ok(None) => return Err(SessionError::NoSaveFound),
            Err(PersistError::Corrupt(reason)) => return Err(SessionError::SaveCorrupt(reason)),
            Err(e) => return Err(e.into()),
        };
        self.restore(record).await
    }

    async fn restore(&mut self, record: SaveRecord) -> Result<(), SessionError> {
        let Some(player) = record.player else {
            return Err(SessionError::NoSaveFound);
        };
        self.ensure_library().await?;
        let episode = load_episode(&self.source, &record.story.episode_id, record.settings.lang).await?;

        if record.settings != self.settings {
            self.settings = record.settings;
            if let Err(e) = persist::write_settings(&mut self.store, &self.settings) {
                tracing::warn!("could not write settings: {e}");
            }
        }
        self.episode = Some(episode);
        self.state = SessionState::story(&record.story.episode_id, &record.story.node_id, player);
        tracing::info!(
            episode = %self.state.episode_id,
            node = %self.state.node_id,
            "game resumed"
        );
        Ok(())
    }

    /// Switch language. A running game reloads its episode in the new
    /// language first; if that fails the language stays as it was.
    pub async fn select_language(&mut self, lang: Lang) -> Result<(), SessionError> {
        if lang == self.settings.lang {
            return Ok(());
        }

        let in_game = self.state.mode != GameMode::Title && self.state.player.is_some();
        if in_game {
            let episode = load_episode(&self.source, &self.state.episode_id, lang)
                .await
                .map_err(|e| {
                    tracing::warn!(%lang, "keeping previous language: {e}");
                    e
                })?;
            self.episode = Some(episode);
        }

        self.settings.lang = lang;
        persist::write_settings(&mut self.store, &self.settings)?;
        tracing::info!(%lang, "language changed");
        if in_game {
            self.save()?;
        }
        Ok(())
    }

    /// Follow a branch offered by the current node.
    pub fn handle_choice(&mut self, target: &str) -> Result<(), SessionError> {
        self.require_story()?;
        if is_terminal(&self.state.node_id) {
            return Err(SessionError::InvalidIntent(target.to_string()));
        }
        let valid = {
            let node = self.current_node()?;
            self.navigator()?.validate_choice(node, target)
        };
        if !valid {
            return Err(SessionError::InvalidIntent(target.to_string()));
        }
        self.navigate(target)
    }

    /// Pick a class on the class-select screen.
    pub fn select_class(&mut self, class_id: &str) -> Result<(), SessionError> {
        self.require_story()?;
        if self.current_node()?.kind() != NodeKind::ClassSelect {
            return Err(SessionError::InvalidIntent(class_id.to_string()));
        }

        let (Some(library), Some(player)) = (self.library.as_ref(), self.state.player.as_mut())
        else {
            return Err(SessionError::NoActiveGame);
        };
        Navigator::new(library, &self.config.roster, self.settings.lang)
            .select_class(player, class_id)?;

        let next = self.config.post_class_node.clone();
        self.navigate(&next)
    }

    /// Confirm an episode transition: load the linked episode and jump to
    /// its entry node.
    pub async fn enter_episode(&mut self, episode_id: &str) -> Result<(), SessionError> {
        self.require_story()?;
        match self.current_node()?.kind() {
            NodeKind::EpisodeLink { episode } if episode == episode_id => {}
            _ => return Err(SessionError::InvalidIntent(episode_id.to_string())),
        }

        let episode = load_episode(&self.source, episode_id, self.settings.lang).await?;
        let start = episode.start.clone();
        self.state.episode_id = episode_id.to_string();
        self.episode = Some(episode);
        tracing::info!(episode = episode_id, "entered episode");
        self.navigate(&start)
    }

    /// Start the encounter declared by the current node.
    pub fn begin_combat(&mut self) -> Result<(), SessionError> {
        self.require_story()?;
        let trigger = match self.current_node()?.kind() {
            NodeKind::Combat(trigger) => trigger.clone(),
            _ => return Err(SessionError::InvalidIntent("begin combat".to_string())),
        };

        let library = self.library.as_ref().ok_or(SessionError::NoActiveGame)?;
        let combat = CombatResolver::new(library, self.settings.lang)
            .start(&trigger, self.config.log_capacity)?;

        self.state.combat = Some(combat);
        self.state.mode = GameMode::Combat;
        self.save()
    }

    /// Resolve one combat action. A finished fight leaves combat and
    /// continues the story at the exit node.
    pub fn handle_combat_action(&mut self, action: &CombatAction) -> Result<(), SessionError> {
        if self.state.mode != GameMode::Combat {
            return Err(SessionError::InvalidIntent("no combat in progress".to_string()));
        }
        let (Some(library), Some(player), Some(combat)) = (
            self.library.as_ref(),
            self.state.player.as_mut(),
            self.state.combat.as_mut(),
        ) else {
            return Err(SessionError::NoActiveGame);
        };

        let resolver = CombatResolver::new(library, self.settings.lang);
        let outcome = resolver.resolve(combat, player, action, self.rolls.as_mut());
        let exit = combat.exit_target().map(str::to_string);
        let last_line = combat.log.last().map(str::to_string);

        match outcome {
            CombatOutcome::Rejected => Ok(()),
            CombatOutcome::Continue => self.save(),
            CombatOutcome::Won | CombatOutcome::Lost | CombatOutcome::Escaped => {
                self.state.combat = None;
                self.state.mode = GameMode::Story;
                self.notice = last_line;
                tracing::info!(?outcome, "combat ended");
                match exit {
                    Some(target) => self.navigate(&target),
                    None => self.save(),
                }
            }
        }
    }

    /// Leave the game for the title screen. The save slot is untouched.
    pub fn return_to_title(&mut self) {
        self.state.mode = GameMode::Title;
        self.state.player = None;
        self.state.combat = None;
    }

    /// Remove the save slot. The current game, if any, keeps running.
    pub fn delete_save(&mut self) -> Result<(), SessionError> {
        persist::delete_record(&mut self.store)?;
        self.notice = Some(self.strings().save_deleted().to_string());
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn ensure_library(&mut self) -> Result<(), ContentError> {
        if self.library.is_none() {
            self.library = Some(load_library(&self.source).await?);
        }
        Ok(())
    }

    fn require_story(&self) -> Result<(), SessionError> {
        match self.state.mode {
            GameMode::Story if self.state.player.is_some() => Ok(()),
            GameMode::Combat => Err(SessionError::InvalidIntent(
                "combat in progress".to_string(),
            )),
            _ => Err(SessionError::NoActiveGame),
        }
    }

    fn navigator(&self) -> Result<Navigator<'_>, SessionError> {
        let library = self.library.as_ref().ok_or(SessionError::NoActiveGame)?;
        Ok(Navigator::new(library, &self.config.roster, self.settings.lang))
    }

    fn current_node(&self) -> Result<&StoryNode, SessionError> {
        let episode = self.episode.as_ref().ok_or(SessionError::NoActiveGame)?;
        episode
            .node(&self.state.node_id)
            .map_err(|_| SessionError::Navigation(self.state.node_id.clone()))
    }

    /// Move to a node, apply its entry effects once and save. A target that
    /// does not exist is kept as the pointer so the view shows the error
    /// panel, but nothing is saved.
    fn navigate(&mut self, target: &str) -> Result<(), SessionError> {
        self.state.node_id = target.to_string();
        tracing::debug!(episode = %self.state.episode_id, node = target, "entering node");

        let (Some(library), Some(episode), Some(player)) = (
            self.library.as_ref(),
            self.episode.as_ref(),
            self.state.player.as_mut(),
        ) else {
            return Err(SessionError::NoActiveGame);
        };
        let navigator = Navigator::new(library, &self.config.roster, self.settings.lang);
        match navigator.enter_node(player, episode, target) {
            Ok(()) => self.save(),
            Err(ContentError::NotFound {
                collection: Collection::Nodes,
                id,
            }) => {
                tracing::warn!(episode = %self.state.episode_id, node = %id, "node not found");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&mut self) -> Result<(), SessionError> {
        let record = SaveRecord::new(
            self.settings,
            self.state.pointer(),
            self.state.player.clone(),
        );
        persist::write_record(&mut self.store, &record)?;
        Ok(())
    }

    fn describe(&self, error: &SessionError) -> String {
        let strings = self.strings();
        match error {
            SessionError::NoSaveFound => strings.no_save().to_string(),
            SessionError::SaveCorrupt(_) => strings.save_corrupt().to_string(),
            SessionError::Content(e) if e.is_load_failure() => strings.load_failed(&e.to_string()),
            SessionError::Navigation(node_id) => strings.node_not_found(node_id),
            other => other.to_string(),
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Project the current state into a view.
    pub fn view(&self) -> ViewModel {
        let strings = self.strings();
        let mut view = match self.state.mode {
            GameMode::Title => self.title_view(&strings),
            GameMode::Story => self.story_view(&strings),
            GameMode::Combat => self.combat_view(&strings),
        };
        if self.state.mode != GameMode::Title {
            view.hud = self.hud();
        }
        view.with_notice(self.notice.clone())
    }

    fn hud(&self) -> Option<Hud> {
        let player = self.state.player.as_ref()?;
        let class_label = match (&self.library, player.has_class()) {
            (Some(library), true) => library.class_name(&player.class_id, self.settings.lang),
            _ => "-".to_string(),
        };
        Some(Hud::from_player(player, class_label))
    }

    fn subtitle(&self, heading: &str) -> String {
        format!("{} • {}", self.state.episode_id.to_uppercase(), heading)
    }

    fn title_view(&self, strings: &Strings) -> ViewModel {
        let has_save = persist::has_save(&self.store);
        let mut actions = vec![ViewAction::primary(strings.new_game(), Intent::NewGame)];
        if has_save {
            actions.push(ViewAction::primary(strings.continue_game(), Intent::ContinueGame));
        }
        actions.push(ViewAction::new(
            strings.switch_language(),
            Intent::SelectLanguage {
                lang: self.settings.lang.toggled(),
            },
        ));
        if has_save {
            actions.push(
                ViewAction::new(strings.delete_save(), Intent::DeleteSave)
                    .with_style(ActionStyle::Danger),
            );
        }
        ViewModel::panel(GAME_TITLE, strings.title_body(), "").with_actions(actions)
    }

    fn error_view(&self, strings: &Strings) -> ViewModel {
        ViewModel::panel(
            strings.error_title(),
            strings.node_not_found(&self.state.node_id),
            "",
        )
        .with_actions(vec![ViewAction::new(strings.back(), Intent::ReturnToTitle)])
    }

    fn story_view(&self, strings: &Strings) -> ViewModel {
        let Some(episode) = &self.episode else {
            return self.error_view(strings);
        };
        let navigator = match self.navigator() {
            Ok(navigator) => navigator,
            Err(_) => return self.error_view(strings),
        };
        let intent = match navigator.resolve_node(episode, &self.state.node_id) {
            Ok(intent) => intent,
            Err(_) => return self.error_view(strings),
        };

        match intent {
            RenderIntent::Terminal => ViewModel::panel(
                strings.the_end(),
                strings.the_end_body(),
                self.subtitle(strings.the_end()),
            )
            .with_actions(vec![
                ViewAction::primary(strings.new_game(), Intent::NewGame),
                ViewAction::new(strings.back(), Intent::ReturnToTitle),
            ]),
            RenderIntent::EpisodeTransition { node, episode } => {
                let body = if node.text.is_empty() {
                    strings.next_episode_body(episode)
                } else {
                    format!("{}\n\n{}", node.text, strings.next_episode_body(episode))
                };
                ViewModel::panel(&node.title, body, self.subtitle(&node.title)).with_actions(vec![
                    ViewAction::primary(
                        strings.next_episode(),
                        Intent::EnterEpisode {
                            episode: episode.to_string(),
                        },
                    ),
                ])
            }
            RenderIntent::ClassSelect { options, .. } => ViewModel::panel(
                strings.choose_class(),
                strings.choose_class_body(),
                self.subtitle(strings.choose_class()),
            )
            .with_actions(
                options
                    .iter()
                    .map(|option| {
                        ViewAction::primary(
                            option.label(),
                            Intent::SelectClass {
                                class_id: option.class_id.clone(),
                            },
                        )
                    })
                    .collect(),
            ),
            RenderIntent::CombatPrompt { node, .. } => {
                ViewModel::panel(&node.title, &node.text, self.subtitle(&node.title))
                    .with_actions(vec![ViewAction::primary(
                        strings.begin_combat(),
                        Intent::BeginCombat,
                    )
                    .with_style(ActionStyle::Danger)])
            }
            RenderIntent::Ending { node } => {
                ViewModel::panel(&node.title, &node.text, self.subtitle(&node.title))
                    .with_actions(vec![finish_action(strings)])
            }
            RenderIntent::Scene { node, choices } => {
                let actions = if choices.is_empty() {
                    vec![finish_action(strings)]
                } else {
                    choices
                        .iter()
                        .map(|choice| {
                            ViewAction::primary(
                                &choice.label,
                                Intent::Choose {
                                    target: choice.next.clone(),
                                },
                            )
                        })
                        .collect()
                };
                ViewModel::panel(&node.title, &node.text, self.subtitle(&node.title))
                    .with_actions(actions)
            }
        }
    }

    fn combat_view(&self, strings: &Strings) -> ViewModel {
        let (Some(combat), Some(player), Some(library)) =
            (&self.state.combat, &self.state.player, &self.library)
        else {
            return self.story_view(strings);
        };
        let lang = self.settings.lang;
        let enemy_name = combat.enemy.name(lang);

        let actions = CombatResolver::new(library, lang)
            .action_menu(player)
            .into_iter()
            .map(|option| {
                let style = match option.action {
                    CombatAction::Attack => ActionStyle::Primary,
                    CombatAction::Flee => ActionStyle::Danger,
                    _ => ActionStyle::Normal,
                };
                ViewAction::new(option.label, Intent::Combat { action: option.action })
                    .with_style(style)
            })
            .collect();

        let mut view = ViewModel::panel(
            strings.combat_title(),
            strings.encounter(enemy_name),
            self.subtitle(strings.combat_title()),
        )
        .with_actions(actions);
        view.enemy = Some(EnemyView {
            name: enemy_name.to_string(),
            hp: combat.enemy.stats.hp,
            max_hp: combat.enemy.stats.max_hp,
        });
        view.combat_log = combat.log.entries().map(str::to_string).collect();
        view
    }
}

/// What an intent may change in memory, kept until the intent succeeds.
struct Checkpoint {
    state: SessionState,
    settings: Settings,
    /// Only taken for intents that can load a different episode.
    episode: Option<Option<Episode>>,
}

fn swaps_episode(intent: &Intent) -> bool {
    matches!(
        intent,
        Intent::NewGame
            | Intent::ContinueGame
            | Intent::SelectLanguage { .. }
            | Intent::EnterEpisode { .. }
    )
}

fn finish_action(strings: &Strings) -> ViewAction {
    ViewAction::primary(
        strings.finish(),
        Intent::Choose {
            target: END_NODE.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::FixedRolls;
    use crate::loader::{Document, MemorySource};
    use crate::persist::{MemorySaveStore, Slot};
    use crate::testing::{sample_episode, sample_source};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// In-memory store whose writes fail while the shared flag is set.
    struct FailingStore {
        inner: MemorySaveStore,
        fail_writes: Arc<AtomicBool>,
    }

    impl SaveStore for FailingStore {
        fn read(&self, slot: Slot) -> Result<Option<String>, PersistError> {
            self.inner.read(slot)
        }

        fn write(&mut self, slot: Slot, contents: &str) -> Result<(), PersistError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "disk is read-only").into());
            }
            self.inner.write(slot, contents)
        }

        fn remove(&mut self, slot: Slot) -> Result<(), PersistError> {
            self.inner.remove(slot)
        }
    }

    async fn session() -> GameSession<MemorySource, MemorySaveStore> {
        GameSession::start(
            SessionConfig::new().with_default_lang(Lang::En),
            sample_source(),
            MemorySaveStore::new(),
        )
        .await
        .with_roller(FixedRolls::default())
    }

    #[test]
    fn test_config_builder() {
        let config = SessionConfig::new()
            .with_player_name("Ayu")
            .with_start("ep2", "camp")
            .with_roster(["mage"])
            .with_log_capacity(3);
        assert_eq!(config.player_name, "Ayu");
        assert_eq!(config.first_episode, "ep2");
        assert_eq!(config.entry_node, "camp");
        assert_eq!(config.roster, vec!["mage".to_string()]);
        assert_eq!(config.log_capacity, 3);
        assert_eq!(config.post_class_node, "intro_after_class");
    }

    #[tokio::test]
    async fn test_boot_without_save_shows_title() {
        let session = session().await;
        assert_eq!(session.mode(), GameMode::Title);
        assert!(session.library().is_some());

        let view = session.view();
        assert_eq!(view.title, GAME_TITLE);
        assert!(view.offers(&Intent::NewGame));
        assert!(!view.offers(&Intent::ContinueGame));
        assert!(view.hud.is_none());
    }

    #[tokio::test]
    async fn test_boot_with_broken_content_stays_on_title() {
        let mut source = sample_source();
        source.remove(&Document::Enemies);
        let mut session =
            GameSession::start(SessionConfig::new(), source, MemorySaveStore::new()).await;
        assert_eq!(session.mode(), GameMode::Title);
        assert!(session.notice().is_some());

        let view = session.apply(Intent::NewGame).await;
        assert_eq!(session.mode(), GameMode::Title);
        assert!(view.notice.unwrap().contains("enemies.json"));
    }

    #[tokio::test]
    async fn test_new_game_lands_on_class_select() {
        let mut session = session().await;
        let view = session.apply(Intent::NewGame).await;

        assert_eq!(session.mode(), GameMode::Story);
        assert_eq!(session.state().node_id, "intro");
        let player = session.player().unwrap();
        assert_eq!(player.stats, crate::player::Stats::default());
        assert!(player.inventory.is_empty());
        assert!(view.offers(&Intent::SelectClass {
            class_id: "warrior".to_string()
        }));
        assert!(persist::has_save(session.store()));
    }

    #[tokio::test]
    async fn test_intents_outside_their_screen_are_rejected() {
        let mut session = session().await;
        let view = session.apply(Intent::BeginCombat).await;
        assert!(view.notice.is_some());
        assert_eq!(session.mode(), GameMode::Title);

        session.apply(Intent::NewGame).await;
        let before = session.state().clone();
        let view = session
            .apply(Intent::Choose {
                target: "treasure".to_string(),
            })
            .await;
        assert!(view.notice.is_some());
        assert_eq!(session.state(), &before);
    }

    #[tokio::test]
    async fn test_continue_without_save() {
        let mut session = session().await;
        let before = session.state().clone();
        assert!(matches!(
            session.continue_game().await,
            Err(SessionError::NoSaveFound)
        ));
        assert_eq!(session.state(), &before);
    }

    #[tokio::test]
    async fn test_corrupt_save_reported_at_boot() {
        let store = MemorySaveStore::new().with(Slot::Save, "][");
        let session = GameSession::start(
            SessionConfig::new().with_default_lang(Lang::En),
            sample_source(),
            store,
        )
        .await;
        assert_eq!(session.mode(), GameMode::Title);
        assert_eq!(session.notice(), Some("Save is corrupt / unreadable."));
    }

    #[tokio::test]
    async fn test_failed_save_rolls_back_navigation() {
        let fail_writes = Arc::new(AtomicBool::new(false));
        let store = FailingStore {
            inner: MemorySaveStore::new(),
            fail_writes: Arc::clone(&fail_writes),
        };
        let mut session = GameSession::start(
            SessionConfig::new().with_default_lang(Lang::En),
            sample_source(),
            store,
        )
        .await
        .with_roller(FixedRolls::default());
        session.apply(Intent::NewGame).await;
        session
            .apply(Intent::SelectClass {
                class_id: "warrior".to_string(),
            })
            .await;
        assert_eq!(session.player().unwrap().gold, 10);

        fail_writes.store(true, Ordering::SeqCst);
        let before = session.state().clone();
        let view = session
            .apply(Intent::Choose {
                target: "crossroads".to_string(),
            })
            .await;
        assert!(view.notice.unwrap().contains("disk is read-only"));
        assert_eq!(session.state(), &before);

        // Treasure's effects are undone along with the move
        fail_writes.store(false, Ordering::SeqCst);
        session
            .apply(Intent::Choose {
                target: "crossroads".to_string(),
            })
            .await;
        fail_writes.store(true, Ordering::SeqCst);
        session
            .apply(Intent::Choose {
                target: "treasure".to_string(),
            })
            .await;
        assert_eq!(session.state().node_id, "crossroads");
        assert_eq!(session.player().unwrap().gold, 10);
        assert_eq!(session.player().unwrap().inventory.quantity("potion"), 2);
    }

    #[tokio::test]
    async fn test_failed_save_rolls_back_combat() {
        let fail_writes = Arc::new(AtomicBool::new(false));
        let store = FailingStore {
            inner: MemorySaveStore::new(),
            fail_writes: Arc::clone(&fail_writes),
        };
        let mut session = GameSession::start(
            SessionConfig::new().with_default_lang(Lang::En),
            sample_source(),
            store,
        )
        .await
        .with_roller(FixedRolls::default());
        session.apply(Intent::NewGame).await;
        session
            .apply(Intent::SelectClass {
                class_id: "warrior".to_string(),
            })
            .await;
        for target in ["crossroads", "ambush"] {
            session
                .apply(Intent::Choose {
                    target: target.to_string(),
                })
                .await;
        }
        session.apply(Intent::BeginCombat).await;
        assert_eq!(session.mode(), GameMode::Combat);

        fail_writes.store(true, Ordering::SeqCst);
        let before = session.state().clone();
        // Power Strike would finish the slime and leave combat
        let view = session
            .apply(Intent::Combat {
                action: CombatAction::Skill("power_strike".to_string()),
            })
            .await;
        assert!(view.notice.is_some());
        assert_eq!(session.state(), &before);
        assert_eq!(session.mode(), GameMode::Combat);
        assert_eq!(session.combat().unwrap().enemy.stats.hp, 12);
        assert_eq!(session.player().unwrap().stats.mp, 5);

        fail_writes.store(false, Ordering::SeqCst);
        session
            .apply(Intent::Combat {
                action: CombatAction::Skill("power_strike".to_string()),
            })
            .await;
        assert_eq!(session.mode(), GameMode::Story);
        assert_eq!(session.state().node_id, "victory");
    }

    #[tokio::test]
    async fn test_link_node_effects_apply_on_entry() {
        let mut episode = sample_episode(Lang::En);
        episode.nodes.get_mut("crossroads").unwrap().choices[0].next = "gate".to_string();
        episode.nodes.get_mut("gate").unwrap().effects =
            vec![crate::effects::Effect::AddGold { value: 50 }];
        let source = sample_source().with(
            Document::episode("ep1", Lang::En),
            serde_json::json!(episode).to_string(),
        );
        let mut session =
            GameSession::start(SessionConfig::new().with_default_lang(Lang::En), source, MemorySaveStore::new())
                .await;
        session.apply(Intent::NewGame).await;
        session
            .apply(Intent::SelectClass {
                class_id: "warrior".to_string(),
            })
            .await;
        for target in ["crossroads", "gate"] {
            session
                .apply(Intent::Choose {
                    target: target.to_string(),
                })
                .await;
        }

        assert_eq!(session.state().node_id, "gate");
        assert_eq!(session.player().unwrap().gold, 60);
        // Re-rendering the transition prompt applies nothing more
        session.view();
        assert_eq!(session.player().unwrap().gold, 60);
    }
}
