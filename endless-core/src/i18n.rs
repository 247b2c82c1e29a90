//! Language selection and the engine's own localized strings.
//!
//! Story content is localized per document (one episode file per language).
//! The strings here cover everything the engine writes itself: combat log
//! lines, prompts, button labels and notices.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One of the two supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    /// Indonesian.
    #[default]
    Id,
    /// English.
    En,
}

impl Lang {
    /// The language code used in document names (`ep1.id.json`).
    pub fn code(&self) -> &'static str {
        match self {
            Lang::Id => "id",
            Lang::En => "en",
        }
    }

    pub fn all() -> [Lang; 2] {
        [Lang::Id, Lang::En]
    }

    /// The other supported language.
    pub fn toggled(&self) -> Lang {
        match self {
            Lang::Id => Lang::En,
            Lang::En => Lang::Id,
        }
    }

    /// Pick between an Indonesian and an English string.
    pub fn pick<'a>(&self, id: &'a str, en: &'a str) -> &'a str {
        match self {
            Lang::Id => id,
            Lang::En => en,
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "id" => Ok(Lang::Id),
            "en" => Ok(Lang::En),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

/// Player settings persisted alongside (and independently of) the save slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub lang: Lang,
}

impl Settings {
    pub fn new(lang: Lang) -> Self {
        Self { lang }
    }
}

/// Display text that is either shared by every language or given per language.
///
/// Content documents may write `"name": "Slime"` or
/// `"name": { "id": "Lendir", "en": "Slime" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocalizedText {
    Plain(String),
    PerLang(BTreeMap<Lang, String>),
}

impl LocalizedText {
    /// Resolve for a language, falling back to any available variant.
    pub fn get(&self, lang: Lang) -> &str {
        match self {
            LocalizedText::Plain(text) => text,
            LocalizedText::PerLang(map) => map
                .get(&lang)
                .or_else(|| map.values().next())
                .map(String::as_str)
                .unwrap_or(""),
        }
    }
}

impl Default for LocalizedText {
    fn default() -> Self {
        LocalizedText::Plain(String::new())
    }
}

impl From<&str> for LocalizedText {
    fn from(text: &str) -> Self {
        LocalizedText::Plain(text.to_string())
    }
}

// ============================================================================
// Engine strings
// ============================================================================

pub const GAME_TITLE: &str = "Endless Advanture";

/// Localized strings the engine produces on its own.
#[derive(Debug, Clone, Copy)]
pub struct Strings {
    lang: Lang,
}

impl Strings {
    pub fn new(lang: Lang) -> Self {
        Self { lang }
    }

    pub fn lang(&self) -> Lang {
        self.lang
    }

    pub fn title_body(&self) -> &'static str {
        self.lang.pick(
            "RPG berbasis teks. Kemajuanmu tersimpan otomatis.\n\nPilih New Game untuk mulai.",
            "Text-based RPG. Your progress is saved automatically.\n\nChoose New Game to start.",
        )
    }

    pub fn new_game(&self) -> &'static str {
        "New Game"
    }

    pub fn continue_game(&self) -> &'static str {
        "Continue"
    }

    pub fn switch_language(&self) -> &'static str {
        self.lang.pick("Bahasa: English", "Language: Indonesia")
    }

    pub fn finish(&self) -> &'static str {
        self.lang.pick("Selesai", "Finish")
    }

    pub fn back(&self) -> &'static str {
        self.lang.pick("Kembali", "Back")
    }

    pub fn the_end(&self) -> &'static str {
        self.lang.pick("Tamat", "The End")
    }

    pub fn the_end_body(&self) -> &'static str {
        self.lang.pick(
            "Petualanganmu berakhir di sini... untuk sekarang.",
            "Your adventure ends here... for now.",
        )
    }

    pub fn choose_class(&self) -> &'static str {
        self.lang.pick("Pilih Kelas", "Choose Class")
    }

    pub fn choose_class_body(&self) -> &'static str {
        self.lang.pick(
            "Kelas menentukan stat awal dan kemampuanmu.",
            "Your class determines starting stats and abilities.",
        )
    }

    /// Short blurb for a roster class, if the engine knows one.
    pub fn class_blurb(&self, class_id: &str) -> Option<&'static str> {
        match class_id {
            "warrior" => Some(self.lang.pick("Tangguh & DEF tinggi.", "Tanky & high DEF.")),
            "mage" => Some(self.lang.pick("MP tinggi & magic.", "High MP & magic.")),
            "rogue" => Some(self.lang.pick("Cepat & seimbang.", "Fast & balanced.")),
            _ => None,
        }
    }

    pub fn begin_combat(&self) -> &'static str {
        self.lang.pick("Mulai Pertarungan", "Begin Combat")
    }

    pub fn next_episode(&self) -> &'static str {
        self.lang.pick("Episode Berikutnya", "Next Episode")
    }

    pub fn next_episode_body(&self, episode_id: &str) -> String {
        match self.lang {
            Lang::Id => format!("Lanjut ke {}?", episode_id.to_uppercase()),
            Lang::En => format!("Continue to {}?", episode_id.to_uppercase()),
        }
    }

    pub fn attack(&self) -> &'static str {
        self.lang.pick("Serang", "Attack")
    }

    pub fn flee(&self) -> &'static str {
        self.lang.pick("Kabur", "Flee")
    }

    pub fn combat_title(&self) -> &'static str {
        self.lang.pick("Pertarungan", "Combat")
    }

    pub fn encounter(&self, enemy: &str) -> String {
        match self.lang {
            Lang::Id => format!("{enemy} menghadang!"),
            Lang::En => format!("{enemy} blocks your way!"),
        }
    }

    pub fn player_hits(&self, target: &str, damage: u32) -> String {
        match self.lang {
            Lang::Id => format!("Kamu menyerang {target}: {damage} damage."),
            Lang::En => format!("You strike {target} for {damage} damage."),
        }
    }

    pub fn skill_hits(&self, skill: &str, target: &str, damage: u32) -> String {
        match self.lang {
            Lang::Id => format!("{skill} mengenai {target}: {damage} damage."),
            Lang::En => format!("{skill} hits {target} for {damage} damage."),
        }
    }

    pub fn enemy_hits(&self, enemy: &str, damage: u32) -> String {
        match self.lang {
            Lang::Id => format!("{enemy} menyerangmu: {damage} damage."),
            Lang::En => format!("{enemy} hits you for {damage} damage."),
        }
    }

    pub fn not_enough_mp(&self, action: &str) -> String {
        match self.lang {
            Lang::Id => format!("MP tidak cukup untuk {action}."),
            Lang::En => format!("Not enough MP for {action}."),
        }
    }

    pub fn unavailable(&self, what: &str) -> String {
        match self.lang {
            Lang::Id => format!("{what} tidak bisa digunakan."),
            Lang::En => format!("{what} cannot be used."),
        }
    }

    pub fn item_used(&self, item: &str) -> String {
        match self.lang {
            Lang::Id => format!("Kamu memakai {item}."),
            Lang::En => format!("You use {item}."),
        }
    }

    pub fn restored_hp(&self, amount: u32) -> String {
        match self.lang {
            Lang::Id => format!("HP pulih {amount}."),
            Lang::En => format!("Restored {amount} HP."),
        }
    }

    pub fn restored_mp(&self, amount: u32) -> String {
        match self.lang {
            Lang::Id => format!("MP pulih {amount}."),
            Lang::En => format!("Restored {amount} MP."),
        }
    }

    pub fn escape_boosted(&self, chance: u32) -> String {
        match self.lang {
            Lang::Id => format!("Peluang kabur naik menjadi {chance}%."),
            Lang::En => format!("Escape chance rises to {chance}%."),
        }
    }

    pub fn escape_failed(&self) -> &'static str {
        self.lang.pick("Gagal kabur!", "You failed to escape!")
    }

    pub fn escape_succeeded(&self) -> &'static str {
        self.lang.pick("Kamu berhasil kabur.", "You got away.")
    }

    pub fn enemy_defeated(&self, enemy: &str) -> String {
        match self.lang {
            Lang::Id => format!("{enemy} dikalahkan!"),
            Lang::En => format!("{enemy} is defeated!"),
        }
    }

    pub fn player_defeated(&self) -> &'static str {
        self.lang.pick("Kamu tumbang...", "You collapse...")
    }

    pub fn delete_save(&self) -> &'static str {
        self.lang.pick("Hapus Save", "Delete Save")
    }

    pub fn error_title(&self) -> &'static str {
        "Error"
    }

    pub fn node_not_found(&self, node_id: &str) -> String {
        format!("Node not found: {node_id}")
    }

    pub fn no_save(&self) -> &'static str {
        self.lang.pick("Belum ada save.", "No save found.")
    }

    pub fn save_corrupt(&self) -> &'static str {
        self.lang.pick("Save rusak / tidak bisa dibaca.", "Save is corrupt / unreadable.")
    }

    pub fn save_deleted(&self) -> &'static str {
        self.lang.pick("Save dihapus.", "Save deleted.")
    }

    pub fn load_failed(&self, detail: &str) -> String {
        match self.lang {
            Lang::Id => format!("Gagal memuat data. {detail}"),
            Lang::En => format!("Failed to load game data. {detail}"),
        }
    }
}
