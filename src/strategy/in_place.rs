//! Default strategy: bank the content where it already lives.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;

use super::{BankStrategy, ContentHandle, EntryData};

/// References the content's current file; nothing is copied
#[derive(Debug, Default)]
pub struct InPlaceStrategy;

impl InPlaceStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BankStrategy for InPlaceStrategy {
    fn name(&self) -> &str {
        "in_place"
    }

    async fn produce_entry(&self, content: &ContentHandle, _library_dir: &Path) -> Result<EntryData> {
        fs::metadata(&content.source_path)
            .await
            .with_context(|| format!("Source file not found: {}", content.source_path.display()))?;

        let mut data = EntryData::new(&content.name, content.source_path.to_string_lossy());
        data.tags = content.tags_or_none();
        Ok(data)
    }
}
