//! Copy strategy: publish the source file into the library directory.
//!
//! The banked file is named after the content (`{name}.{ext}`) and the
//! proposed thumbnail sits in `thumbnails/{name}.jpg` next to it.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;
use tracing::info;

use super::{library_copy_path, BankStrategy, ContentHandle, EntryData};

#[derive(Debug, Default)]
pub struct CopyStrategy;

impl CopyStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BankStrategy for CopyStrategy {
    fn name(&self) -> &str {
        "copy"
    }

    async fn produce_entry(&self, content: &ContentHandle, library_dir: &Path) -> Result<EntryData> {
        let dest = library_copy_path(content, library_dir)?;

        fs::create_dir_all(library_dir)
            .await
            .with_context(|| format!("Failed to create library directory: {}", library_dir.display()))?;

        if dest != content.source_path {
            fs::copy(&content.source_path, &dest).await.with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    content.source_path.display(),
                    dest.display()
                )
            })?;
            info!(source = %content.source_path.display(), dest = %dest.display(), "Copied content into library");
        }

        let thumbnail = library_dir
            .join("thumbnails")
            .join(format!("{}.jpg", content.name));

        let mut metadata = Map::new();
        metadata.insert(
            "published_from".to_string(),
            Value::from(content.source_path.to_string_lossy().into_owned()),
        );

        let mut data = EntryData::new(&content.name, dest.to_string_lossy());
        data.thumbnail_path = Some(thumbnail.to_string_lossy().into_owned());
        data.tags = content.tags_or_none();
        data.metadata = Some(metadata);
        Ok(data)
    }
}
