//! Command strategy: delegate publishing to an external program.
//!
//! The configured command is run with three extra arguments appended:
//! `<dest> <source> <content-name>`. It is expected to write the published
//! content to `<dest>`, which the entry then references. This is how a
//! headless run of the host application extracts a single content block
//! into its own file.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use super::{library_copy_path, BankStrategy, ContentHandle, EntryData};

/// Runs an external publishing command
#[derive(Debug)]
pub struct CommandStrategy {
    /// Program followed by its leading arguments
    command: Vec<String>,

    /// Maximum time the command may run
    timeout: Duration,
}

impl CommandStrategy {
    pub fn new(command: Vec<String>, timeout: Duration) -> Result<Self> {
        if command.is_empty() {
            anyhow::bail!("The command bank strategy needs a non-empty `bank.command`");
        }
        Ok(Self { command, timeout })
    }

    async fn run(&self, dest: &Path, content: &ContentHandle) -> Result<()> {
        let program = &self.command[0];

        debug!(program = %program, dest = %dest.display(), "Running bank command");

        let child = Command::new(program)
            .args(&self.command[1..])
            .arg(dest)
            .arg(&content.source_path)
            .arg(&content.name)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn bank command '{}'", program))?;

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .with_context(|| {
                format!("Bank command '{}' timed out after {:?}", program, self.timeout)
            })?
            .with_context(|| format!("Failed to wait for bank command '{}'", program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            anyhow::bail!(
                "Bank command '{}' failed with exit code {}: {}",
                program,
                exit_code,
                stderr.trim()
            );
        }

        Ok(())
    }
}

#[async_trait]
impl BankStrategy for CommandStrategy {
    fn name(&self) -> &str {
        "command"
    }

    async fn produce_entry(&self, content: &ContentHandle, library_dir: &Path) -> Result<EntryData> {
        let dest = library_copy_path(content, library_dir)?;

        tokio::fs::create_dir_all(library_dir)
            .await
            .with_context(|| format!("Failed to create library directory: {}", library_dir.display()))?;

        self.run(&dest, content).await?;

        if tokio::fs::metadata(&dest).await.is_err() {
            anyhow::bail!(
                "Bank command '{}' finished without writing {}",
                self.command[0],
                dest.display()
            );
        }
        info!(dest = %dest.display(), "Published content");

        let mut metadata = Map::new();
        metadata.insert(
            "published_from".to_string(),
            Value::from(content.source_path.to_string_lossy().into_owned()),
        );

        let mut data = EntryData::new(&content.name, dest.to_string_lossy());
        data.tags = content.tags_or_none();
        data.metadata = Some(metadata);
        Ok(data)
    }
}
