//! Loading content documents.
//!
//! Fetching a document is the only suspending operation in the engine. The
//! five static collections are fetched together; episodes are fetched one
//! at a time per (episode, language).

use crate::content::{ContentError, ContentLibrary};
use crate::episode::Episode;
use crate::i18n::Lang;
use crate::story::is_terminal;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;

/// A content document the engine can ask for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Document {
    Classes,
    Items,
    Skills,
    Magic,
    Enemies,
    Episode { id: String, lang: Lang },
}

impl Document {
    pub fn episode(id: impl Into<String>, lang: Lang) -> Self {
        Document::Episode { id: id.into(), lang }
    }

    /// Path of the document relative to the data root.
    pub fn relative_path(&self) -> PathBuf {
        match self {
            Document::Classes => PathBuf::from("classes.json"),
            Document::Items => PathBuf::from("items.json"),
            Document::Skills => PathBuf::from("skills.json"),
            Document::Magic => PathBuf::from("magic.json"),
            Document::Enemies => PathBuf::from("enemies.json"),
            Document::Episode { id, lang } => {
                Path::new("episodes").join(format!("{id}.{}.json", lang.code()))
            }
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.relative_path().display())
    }
}

/// Where content documents come from.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch the raw text of a document.
    async fn fetch(&self, document: &Document) -> Result<String, ContentError>;
}

/// Reads documents from a data directory laid out as
/// `classes.json`, ..., `episodes/<id>.<lang>.json`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ContentSource for DirectorySource {
    async fn fetch(&self, document: &Document) -> Result<String, ContentError> {
        let path = self.root.join(document.relative_path());
        fs::read_to_string(&path)
            .await
            .map_err(|e| ContentError::Load {
                document: document.to_string(),
                reason: format!("{}: {e}", path.display()),
            })
    }
}

/// In-memory documents, for tests and embedded content.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: HashMap<Document, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, document: Document, contents: impl Into<String>) {
        self.documents.insert(document, contents.into());
    }

    pub fn with(mut self, document: Document, contents: impl Into<String>) -> Self {
        self.insert(document, contents);
        self
    }

    pub fn remove(&mut self, document: &Document) -> Option<String> {
        self.documents.remove(document)
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn fetch(&self, document: &Document) -> Result<String, ContentError> {
        self.documents
            .get(document)
            .cloned()
            .ok_or_else(|| ContentError::Load {
                document: document.to_string(),
                reason: "document not available".to_string(),
            })
    }
}

fn parse<T: DeserializeOwned>(document: &Document, raw: &str) -> Result<T, ContentError> {
    serde_json::from_str(raw).map_err(|source| ContentError::Parse {
        document: document.to_string(),
        source,
    })
}

async fn fetch_parsed<T: DeserializeOwned>(
    source: &(impl ContentSource + ?Sized),
    document: Document,
) -> Result<T, ContentError> {
    let raw = source.fetch(&document).await?;
    parse(&document, &raw)
}

/// Load the five static collections concurrently.
pub async fn load_library(
    source: &(impl ContentSource + ?Sized),
) -> Result<ContentLibrary, ContentError> {
    let (classes, items, skills, magic, enemies) = futures::try_join!(
        fetch_parsed(source, Document::Classes),
        fetch_parsed(source, Document::Items),
        fetch_parsed(source, Document::Skills),
        fetch_parsed(source, Document::Magic),
        fetch_parsed(source, Document::Enemies),
    )?;

    let library = ContentLibrary {
        classes,
        items,
        skills,
        magic,
        enemies,
    };
    tracing::info!(
        classes = library.classes.len(),
        items = library.items.len(),
        enemies = library.enemies.len(),
        "content library loaded"
    );
    Ok(library)
}

/// Load one episode in one language.
pub async fn load_episode(
    source: &(impl ContentSource + ?Sized),
    episode_id: &str,
    lang: Lang,
) -> Result<Episode, ContentError> {
    let document = Document::episode(episode_id, lang);
    let episode: Episode = fetch_parsed(source, document).await?;

    if episode.id != episode_id {
        tracing::warn!(requested = episode_id, found = %episode.id, "episode id mismatch");
    }
    for (node_id, target) in dangling_references(&episode) {
        tracing::warn!(episode = episode_id, node = node_id, missing = target, "node points to a missing node");
    }
    tracing::info!(episode = episode_id, %lang, nodes = episode.nodes.len(), "episode loaded");
    Ok(episode)
}

/// Node references that do not resolve inside the episode, as
/// `(from_node, target)` pairs.
pub fn dangling_references(episode: &Episode) -> Vec<(&str, &str)> {
    let mut dangling = Vec::new();
    for (node_id, node) in &episode.nodes {
        let targets = node
            .choices
            .iter()
            .map(|c| c.next.as_str())
            .chain(node.combat.iter().flat_map(|t| [t.win.as_str(), t.lose.as_str()]));
        for target in targets {
            if !is_terminal(target) && !episode.contains(target) {
                dangling.push((node_id.as_str(), target));
            }
        }
    }
    if !is_terminal(&episode.start) && !episode.contains(&episode.start) {
        dangling.push(("<start>", episode.start.as_str()));
    }
    dangling
}
