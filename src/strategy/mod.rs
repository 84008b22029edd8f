//! Bank strategies.
//!
//! A strategy turns "this content, banked into that library" into the entry
//! data the registry stores. The built-in strategies are selected from
//! configuration at startup:
//!
//! - `in_place`: reference the content where it already lives
//! - `copy`: copy the source file next to the library first
//! - `command`: hand the work to an external program (e.g. a headless
//!   publishing run of the host application)

pub mod command;
pub mod copy;
pub mod in_place;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::BankSettings;
use crate::library::Entry;

pub use command::CommandStrategy;
pub use copy::CopyStrategy;
pub use in_place::InPlaceStrategy;

/// The content a caller asks to bank
#[derive(Debug, Clone)]
pub struct ContentHandle {
    /// Name of the content block (e.g. the collection name)
    pub name: String,

    /// File currently holding the content
    pub source_path: PathBuf,

    /// Tags chosen by the user
    pub tags: Vec<String>,
}

impl ContentHandle {
    pub fn new(name: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source_path: source_path.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    fn tags_or_none(&self) -> Option<Vec<String>> {
        if self.tags.is_empty() {
            None
        } else {
            Some(self.tags.clone())
        }
    }
}

/// What a strategy tells the bank to store
#[derive(Debug, Clone, PartialEq)]
pub struct EntryData {
    pub content_name: String,
    pub source_path: String,
    /// `None` leaves the entry on the default thumbnail location
    pub thumbnail_path: Option<String>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<Map<String, Value>>,
}

impl EntryData {
    pub fn new(content_name: impl Into<String>, source_path: impl Into<String>) -> Self {
        Self {
            content_name: content_name.into(),
            source_path: source_path.into(),
            thumbnail_path: None,
            tags: None,
            metadata: None,
        }
    }

    /// Build the registry entry
    pub fn into_entry(self) -> Entry {
        let mut entry = Entry::new(self.content_name, self.source_path);
        entry.thumbnail_path = self.thumbnail_path;
        entry.tags = self.tags;
        entry.metadata = self.metadata;
        entry
    }
}

/// Pluggable behavior for producing entries
#[async_trait]
pub trait BankStrategy: Send + Sync {
    /// Human-readable strategy name
    fn name(&self) -> &str;

    /// Produce the entry data for `content` banked into the library
    /// stored in `library_dir`
    async fn produce_entry(&self, content: &ContentHandle, library_dir: &Path) -> Result<EntryData>;

    /// Whether the library should be backed up before the entry is written
    fn backup(&self) -> bool {
        true
    }

    /// Release anything held by the strategy
    async fn teardown(&self) -> Result<()> {
        Ok(())
    }
}

/// Built-in strategy selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    InPlace,
    Copy,
    Command,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::InPlace => write!(f, "in_place"),
            StrategyKind::Copy => write!(f, "copy"),
            StrategyKind::Command => write!(f, "command"),
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "in_place" | "in-place" | "default" => Ok(StrategyKind::InPlace),
            "copy" | "publish" => Ok(StrategyKind::Copy),
            "command" | "cmd" => Ok(StrategyKind::Command),
            _ => anyhow::bail!("Unknown bank strategy: {}", s),
        }
    }
}

/// Build the strategy named in the bank settings
pub fn from_config(settings: &BankSettings) -> Result<Box<dyn BankStrategy>> {
    let strategy: Box<dyn BankStrategy> = match settings.strategy {
        StrategyKind::InPlace => Box::new(InPlaceStrategy::new()),
        StrategyKind::Copy => Box::new(CopyStrategy::new()),
        StrategyKind::Command => Box::new(CommandStrategy::new(
            settings.command.clone(),
            Duration::from_secs(settings.timeout_seconds),
        )?),
    };

    Ok(strategy)
}

/// `{library_dir}/{name}.{ext of source}`.
///
/// The content name must be a plain file name so the copy stays inside the
/// library directory.
pub(crate) fn library_copy_path(content: &ContentHandle, library_dir: &Path) -> Result<PathBuf> {
    let name = content.name.as_str();
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
    {
        anyhow::bail!("Content name '{}' cannot be used as a file name", name);
    }

    let file_name = match content.source_path.extension() {
        Some(ext) => format!("{}.{}", content.name, ext.to_string_lossy()),
        None => content.name.clone(),
    };
    Ok(library_dir.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_kind_from_str() {
        assert_eq!("in_place".parse::<StrategyKind>().unwrap(), StrategyKind::InPlace);
        assert_eq!("publish".parse::<StrategyKind>().unwrap(), StrategyKind::Copy);
        assert_eq!("COMMAND".parse::<StrategyKind>().unwrap(), StrategyKind::Command);
        assert!("plugin.py".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_from_config_selects_strategy() {
        let settings = BankSettings::default();
        assert_eq!(from_config(&settings).unwrap().name(), "in_place");

        let settings = BankSettings {
            strategy: StrategyKind::Copy,
            ..BankSettings::default()
        };
        assert_eq!(from_config(&settings).unwrap().name(), "copy");
    }

    #[test]
    fn test_command_strategy_requires_command() {
        let settings = BankSettings {
            strategy: StrategyKind::Command,
            ..BankSettings::default()
        };
        assert!(from_config(&settings).is_err());
    }

    #[test]
    fn test_library_copy_path() {
        let content = ContentHandle::new("Hero", "/work/scene.blend");
        assert_eq!(
            library_copy_path(&content, Path::new("/libs")).unwrap(),
            PathBuf::from("/libs/Hero.blend")
        );
    }

    #[test]
    fn test_library_copy_path_rejects_separators() {
        for name in ["../x", "a/b", "a\\b", "..", ""] {
            let content = ContentHandle::new(name, "/work/scene.blend");
            assert!(
                library_copy_path(&content, Path::new("/libs")).is_err(),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_entry_data_into_entry() {
        let mut data = EntryData::new("Hero", "/libs/Hero.blend");
        data.tags = Some(vec!["rigged".to_string()]);

        let entry = data.clone().into_entry();
        assert_eq!(entry.content_name, "Hero");
        assert!(entry.thumbnail_path.is_none());

        data.thumbnail_path = Some("/libs/thumbnails/Hero.jpg".to_string());
        let entry = data.into_entry();
        assert_eq!(entry.thumbnail_path.as_deref(), Some("/libs/thumbnails/Hero.jpg"));
        assert_eq!(entry.tags(), ["rigged".to_string()]);
        assert!(entry.metadata.is_none());
    }
}
