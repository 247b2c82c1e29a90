//! Story and combat engine for the Endless Advanture text RPG.
//!
//! This crate provides:
//! - Data-driven content (classes, items, skills, magic, enemies, episodes)
//! - An effect engine and a turn-based combat resolver
//! - Story navigation over per-language episode graphs
//! - A session controller that turns player intents into view models
//! - Single-slot save persistence
//!
//! # Quick Start
//!
//! ```ignore
//! use endless_core::{DirectorySource, FileSaveStore, GameSession, Intent, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut session = GameSession::start(
//!         SessionConfig::new().with_player_name("Ayu"),
//!         DirectorySource::new("data"),
//!         FileSaveStore::new("saves"),
//!     )
//!     .await;
//!
//!     let view = session.apply(Intent::NewGame).await;
//!     for action in &view.actions {
//!         println!("{}", action.label);
//!     }
//! }
//! ```

pub mod combat;
pub mod content;
pub mod dice;
pub mod effects;
pub mod episode;
pub mod i18n;
pub mod loader;
pub mod persist;
pub mod player;
pub mod session;
pub mod story;
pub mod testing;
pub mod view;

// Primary public API
pub use combat::{CombatAction, CombatOutcome, CombatPhase, CombatResolver, CombatState};
pub use content::{ContentError, ContentLibrary};
pub use dice::{FixedRolls, RngRoller, RollSource};
pub use effects::{apply_effect, apply_effects, Effect};
pub use episode::{Episode, NodeKind, StoryNode};
pub use i18n::{Lang, Settings};
pub use loader::{ContentSource, DirectorySource, Document, MemorySource};
pub use persist::{FileSaveStore, MemorySaveStore, PersistError, SaveRecord, SaveStore};
pub use player::{Inventory, PlayerState, Stats};
pub use session::{GameMode, GameSession, SessionConfig, SessionError, SessionState};
pub use story::{Navigator, RenderIntent, StoryPointer, END_NODE};
pub use testing::TestHarness;
pub use view::{ActionStyle, Hud, Intent, ViewAction, ViewModel};
