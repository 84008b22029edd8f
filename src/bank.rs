//! Banking: turning content into a library entry.
//!
//! [`BankContext`] owns the active strategy and the registry. It is built once
//! at startup from configuration and shut down explicitly, so nothing about
//! the active strategy lives in process-wide state.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::config::{LibraryConfig, ResolvedConfig};
use crate::library::{default_thumbnail_path, Entry, EntryId, IdScheme, Registry, RegistryError};
use crate::strategy::{self, BankStrategy, ContentHandle};

/// Result of a successful bank
#[derive(Debug, Clone)]
pub struct BankOutcome {
    pub id: EntryId,

    /// Where the preview image is expected. The stored thumbnail, or the
    /// default location when the entry has none.
    pub thumbnail_path: String,

    pub entry: Entry,
}

/// Everything needed to bank content and edit libraries
pub struct BankContext {
    registry: Registry,
    strategy: Box<dyn BankStrategy>,
    id_scheme: IdScheme,
    backup: bool,
}

impl BankContext {
    pub fn new(registry: Registry, strategy: Box<dyn BankStrategy>) -> Self {
        Self {
            registry,
            strategy,
            id_scheme: IdScheme::Stem,
            backup: true,
        }
    }

    /// Build the context described by the configuration
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let strategy = strategy::from_config(&config.bank)
            .context("Failed to initialize bank strategy")?;

        info!(strategy = strategy.name(), write_mode = %config.registry.write_mode, "Bank ready");

        Ok(Self {
            registry: Registry::new(config.registry.write_mode),
            strategy,
            id_scheme: config.registry.id_scheme,
            backup: config.registry.backup,
        })
    }

    pub fn with_id_scheme(mut self, id_scheme: IdScheme) -> Self {
        self.id_scheme = id_scheme;
        self
    }

    /// Disable backups regardless of what the strategy asks for
    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn strategy(&self) -> &dyn BankStrategy {
        self.strategy.as_ref()
    }

    /// Bank `content` into `library`.
    ///
    /// The strategy produces the entry data. A missing thumbnail is stored as
    /// absent; the outcome reports the default location derived from the
    /// source path instead.
    #[instrument(skip(self, library, content), fields(library = %library.name, content = %content.name))]
    pub async fn bank(&self, library: &LibraryConfig, content: &ContentHandle) -> Result<BankOutcome> {
        ensure_writable(library)?;
        self.registry.ensure_library(&library.path)?;

        let data = self
            .strategy
            .produce_entry(content, &library.dir())
            .await
            .with_context(|| format!("Bank strategy '{}' failed", self.strategy.name()))?;

        let thumbnail_path = match &data.thumbnail_path {
            Some(path) => path.clone(),
            None => default_thumbnail_path(&data.source_path, &data.content_name)
                .to_string_lossy()
                .into_owned(),
        };

        let id = self.id_scheme.derive(&data.content_name, &data.source_path);
        let entry = data.into_entry();
        let backup = self.backup && self.strategy.backup();

        self.registry
            .add_entry(&library.path, &id, entry.clone(), backup)?;

        info!(%id, "Banked content");
        Ok(BankOutcome {
            id,
            thumbnail_path,
            entry,
        })
    }

    /// Remove an entry from `library`, returning whether it existed
    pub fn remove(&self, library: &LibraryConfig, id: &EntryId) -> Result<bool> {
        ensure_writable(library)?;
        Ok(self.registry.delete_entry(&library.path, id, self.backup)?)
    }

    /// Tear down the active strategy
    pub async fn shutdown(self) -> Result<()> {
        self.strategy
            .teardown()
            .await
            .with_context(|| format!("Failed to tear down bank strategy '{}'", self.strategy.name()))
    }
}

fn ensure_writable(library: &LibraryConfig) -> Result<(), RegistryError> {
    if library.readonly {
        return Err(RegistryError::ReadOnly(library.name.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{backup_path, ErrorKind, WriteMode};
    use crate::strategy::{EntryData, InPlaceStrategy};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Strategy that records a fixed thumbnail and opts out of backups
    struct NoBackupStrategy;

    #[async_trait]
    impl BankStrategy for NoBackupStrategy {
        fn name(&self) -> &str {
            "no_backup"
        }

        async fn produce_entry(&self, content: &ContentHandle, library_dir: &Path) -> Result<EntryData> {
            let mut data = EntryData::new(&content.name, content.source_path.to_string_lossy());
            data.thumbnail_path = Some(library_dir.join("shot.jpg").to_string_lossy().into_owned());
            Ok(data)
        }

        fn backup(&self) -> bool {
            false
        }
    }

    fn library(dir: &Path, readonly: bool) -> LibraryConfig {
        LibraryConfig {
            name: "Main".to_string(),
            path: dir.join("main.json"),
            enabled: true,
            readonly,
        }
    }

    async fn source_file(dir: &Path) -> PathBuf {
        let source = dir.join("chars").join("hero_v2.blend");
        tokio::fs::create_dir_all(source.parent().unwrap()).await.unwrap();
        tokio::fs::write(&source, b"blend").await.unwrap();
        source
    }

    #[tokio::test]
    async fn test_bank_in_place() {
        let temp = TempDir::new().unwrap();
        let source = source_file(temp.path()).await;
        let lib = library(temp.path(), false);
        let context = BankContext::new(Registry::default(), Box::new(InPlaceStrategy::new()));

        let outcome = context
            .bank(&lib, &ContentHandle::new("Hero", &source).with_tags(["rigged"]))
            .await
            .unwrap();

        assert_eq!(outcome.id.as_str(), "Hero:hero_v2");
        assert_eq!(
            PathBuf::from(&outcome.thumbnail_path),
            temp.path().join("chars").join("thumbnails").join("UASBANK_hero_v2_Hero.jpg")
        );

        let entries = context.registry().list_entries(&lib.path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].1.tags(), ["rigged".to_string()]);
        assert!(entries[0].1.thumbnail_path.is_none());
        assert_eq!(
            entries[0].1.thumbnail_or_default(),
            PathBuf::from(&outcome.thumbnail_path)
        );

        let raw = std::fs::read_to_string(&lib.path).unwrap();
        assert!(!raw.contains("thumbnail_path"));
    }

    #[tokio::test]
    async fn test_rebank_replaces_and_backs_up() {
        let temp = TempDir::new().unwrap();
        let source = source_file(temp.path()).await;
        let lib = library(temp.path(), false);
        let context = BankContext::new(Registry::new(WriteMode::Atomic), Box::new(InPlaceStrategy::new()));

        context
            .bank(&lib, &ContentHandle::new("Hero", &source).with_tags(["old"]))
            .await
            .unwrap();
        let before = std::fs::read_to_string(&lib.path).unwrap();

        context
            .bank(&lib, &ContentHandle::new("Hero", &source))
            .await
            .unwrap();

        let entries = context.registry().list_entries(&lib.path).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].1.tags.is_none());
        assert_eq!(std::fs::read_to_string(backup_path(&lib.path)).unwrap(), before);
    }

    #[tokio::test]
    async fn test_strategy_can_skip_backup() {
        let temp = TempDir::new().unwrap();
        let source = source_file(temp.path()).await;
        let lib = library(temp.path(), false);
        let context = BankContext::new(Registry::default(), Box::new(NoBackupStrategy));

        context.bank(&lib, &ContentHandle::new("Hero", &source)).await.unwrap();
        context.bank(&lib, &ContentHandle::new("Villain", &source)).await.unwrap();

        assert!(!backup_path(&lib.path).exists());
        let entries = context.registry().list_entries(&lib.path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].1.thumbnail_path,
            Some(temp.path().join("shot.jpg").to_string_lossy().into_owned())
        );
    }

    #[tokio::test]
    async fn test_readonly_library_rejected() {
        let temp = TempDir::new().unwrap();
        let source = source_file(temp.path()).await;
        let lib = library(temp.path(), true);
        let context = BankContext::new(Registry::default(), Box::new(InPlaceStrategy::new()));

        let err = context
            .bank(&lib, &ContentHandle::new("Hero", &source))
            .await
            .unwrap_err();
        let registry_err = err.downcast_ref::<RegistryError>().unwrap();
        assert_eq!(registry_err.kind(), ErrorKind::ReadOnly);
        assert!(!lib.path.exists());

        let id = EntryId::new("Hero:hero_v2").unwrap();
        assert!(context.remove(&lib, &id).is_err());
    }

    #[tokio::test]
    async fn test_remove_entry() {
        let temp = TempDir::new().unwrap();
        let source = source_file(temp.path()).await;
        let lib = library(temp.path(), false);
        let context = BankContext::new(Registry::default(), Box::new(InPlaceStrategy::new()));

        let outcome = context.bank(&lib, &ContentHandle::new("Hero", &source)).await.unwrap();

        assert!(context.remove(&lib, &outcome.id).unwrap());
        assert!(!context.remove(&lib, &outcome.id).unwrap());
        assert!(context.registry().list_entries(&lib.path).unwrap().is_empty());

        context.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_qualified_ids() {
        let temp = TempDir::new().unwrap();
        let source = source_file(temp.path()).await;
        let lib = library(temp.path(), false);
        let context = BankContext::new(Registry::default(), Box::new(InPlaceStrategy::new()))
            .with_id_scheme(IdScheme::Qualified);

        let outcome = context.bank(&lib, &ContentHandle::new("Hero", &source)).await.unwrap();
        assert!(outcome.id.as_str().starts_with("Hero:hero_v2@"));
    }
}
