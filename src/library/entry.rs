//! Entry records and the identifiers derived from them.
//!
//! On disk an entry keeps the historical key names `blend_path` and
//! `data_name`; existing libraries must stay readable, so those names are
//! part of the format.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::error::{RegistryError, RegistryResult};

/// Key of an entry inside a library document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Wrap an existing identifier, rejecting the empty string
    pub fn new(id: impl Into<String>) -> RegistryResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(RegistryError::Validation("entry id is empty".to_string()));
        }
        Ok(Self(id))
    }

    /// Canonical id: `{content_name}:{stem of source_path}`.
    ///
    /// Two entries with the same content name and the same file stem share
    /// an id, even when their files live in different directories.
    pub fn derive(content_name: &str, source_path: &str) -> Self {
        Self(format!("{}:{}", content_name, stem_of(source_path)))
    }

    /// Id widened with a short hash of the source directory.
    ///
    /// Not understood by libraries written with [`EntryId::derive`]; only
    /// used when [`IdScheme::Qualified`] is configured.
    pub fn derive_qualified(content_name: &str, source_path: &str) -> Self {
        let dir = Path::new(source_path)
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(dir.as_bytes());
        let digest = hasher.finalize();

        Self(format!(
            "{}:{}@{}",
            content_name,
            stem_of(source_path),
            hex::encode(&digest[..4])
        ))
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How entry ids are derived when banking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdScheme {
    /// `{name}:{stem}`, compatible with existing libraries
    #[default]
    Stem,

    /// `{name}:{stem}@{dir-hash}`
    Qualified,
}

impl IdScheme {
    pub fn derive(&self, content_name: &str, source_path: &str) -> EntryId {
        match self {
            IdScheme::Stem => EntryId::derive(content_name, source_path),
            IdScheme::Qualified => EntryId::derive_qualified(content_name, source_path),
        }
    }
}

/// One cataloged asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// File containing the content
    #[serde(rename = "blend_path")]
    pub source_path: String,

    /// Named content block inside `source_path`
    #[serde(rename = "data_name")]
    pub content_name: String,

    /// Preview image; see [`default_thumbnail_path`] when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<String>,

    /// Free-text labels used for filtering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// Opaque pass-through data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,

    /// Keys written by other tools, kept as-is across rewrites
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entry {
    /// Create an entry with only the required fields
    pub fn new(content_name: impl Into<String>, source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            content_name: content_name.into(),
            thumbnail_path: None,
            tags: None,
            metadata: None,
            extra: Map::new(),
        }
    }

    /// Set the thumbnail path
    pub fn with_thumbnail(mut self, thumbnail_path: impl Into<String>) -> Self {
        self.thumbnail_path = Some(thumbnail_path.into());
        self
    }

    /// Set the tags
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Set the metadata object
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Tags, treating an absent list as empty
    pub fn tags(&self) -> &[String] {
        self.tags.as_deref().unwrap_or(&[])
    }

    /// Stored thumbnail, or the default one derived from the source path
    pub fn thumbnail_or_default(&self) -> PathBuf {
        match &self.thumbnail_path {
            Some(path) => PathBuf::from(path),
            None => default_thumbnail_path(&self.source_path, &self.content_name),
        }
    }

    /// Check required fields
    pub fn validate(&self) -> RegistryResult<()> {
        if self.content_name.is_empty() {
            return Err(RegistryError::Validation("content name is empty".to_string()));
        }
        if self.source_path.is_empty() {
            return Err(RegistryError::Validation("source path is empty".to_string()));
        }
        Ok(())
    }
}

/// File name of `path` without directory and extension
pub fn stem_of(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Default preview location:
/// `{dir of source}/thumbnails/UASBANK_{stem}_{content_name}.jpg`
pub fn default_thumbnail_path(source_path: &str, content_name: &str) -> PathBuf {
    let source = Path::new(source_path);
    let dir = source.parent().unwrap_or_else(|| Path::new(""));

    dir.join("thumbnails").join(format!(
        "UASBANK_{}_{}.jpg",
        stem_of(source_path),
        content_name
    ))
}
