//! Configuration for assetbank.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (ASSETBANK_HOME, ASSETBANK_WRITE_MODE)
//! 2. Config file (.assetbank/config.yaml)
//! 3. Defaults (~/.assetbank, no libraries, direct writes)
//!
//! Without configured libraries, commands address libraries by path.
//!
//! Config file discovery:
//! - Searches the start directory and its parents for .assetbank/config.yaml
//! - Library paths in the config file are relative to the project root
//!   (the parent of .assetbank/)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::library::{IdScheme, WriteMode};
use crate::strategy::StrategyKind;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub home: Option<String>,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub bank: BankConfig,
    #[serde(default)]
    pub libraries: Vec<LibraryFileConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
    pub write_mode: Option<WriteMode>,
    pub backup: Option<bool>,
    pub id_scheme: Option<IdScheme>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BankConfig {
    pub strategy: Option<StrategyKind>,
    /// Program and leading arguments for the `command` strategy
    pub command: Option<Vec<String>>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryFileConfig {
    pub name: String,
    pub path: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub readonly: bool,
}

fn default_enabled() -> bool {
    true
}

/// A library as the rest of the application sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Display name, also used as the filter label
    pub name: String,
    /// Absolute path to the library JSON file
    pub path: PathBuf,
    /// Disabled libraries are skipped when listing
    pub enabled: bool,
    /// Read-only libraries reject banking and removal
    pub readonly: bool,
}

impl LibraryConfig {
    /// Ad-hoc library addressed by path, named after its file stem
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = normalize_library_path(path.as_ref());
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            name,
            path,
            enabled: true,
            readonly: false,
        }
    }

    /// Directory holding the library file
    pub fn dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Debug, Clone)]
pub struct RegistrySettings {
    pub write_mode: WriteMode,
    pub backup: bool,
    pub id_scheme: IdScheme,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            write_mode: WriteMode::Direct,
            backup: true,
            id_scheme: IdScheme::Stem,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BankSettings {
    pub strategy: StrategyKind,
    pub command: Vec<String>,
    pub timeout_seconds: u64,
}

impl Default for BankSettings {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::InPlace,
            command: Vec::new(),
            timeout_seconds: 600,
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to assetbank home (default library location)
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    /// Configured libraries, in config order
    pub libraries: Vec<LibraryConfig>,
    pub registry: RegistrySettings,
    pub bank: BankSettings,
}

impl ResolvedConfig {
    /// Resolve a `--library` argument: a configured name, else a file path
    pub fn library(&self, name_or_path: &str) -> LibraryConfig {
        self.libraries
            .iter()
            .find(|lib| lib.name == name_or_path)
            .cloned()
            .unwrap_or_else(|| LibraryConfig::from_path(name_or_path))
    }

    /// Libraries that take part in listing and search
    pub fn enabled_libraries(&self) -> Vec<LibraryConfig> {
        self.libraries.iter().filter(|lib| lib.enabled).cloned().collect()
    }
}

/// Append `.json` when the path does not already end with it
pub fn normalize_library_path(path: &Path) -> PathBuf {
    if path.to_string_lossy().ends_with(".json") {
        path.to_path_buf()
    } else {
        let mut raw = path.as_os_str().to_os_string();
        raw.push(".json");
        PathBuf::from(raw)
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".assetbank").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Load configuration, discovering the config file from the current directory
pub fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    load_config_from(&cwd)
}

/// Load configuration from all sources, discovering the config file from `start`
pub fn load_config_from(start: &Path) -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".assetbank");

    let config_file = find_config_file(start);

    let mut resolved = if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;
        resolve(config, config_path, default_home)
    } else {
        ResolvedConfig {
            home: default_home,
            config_file: None,
            libraries: Vec::new(),
            registry: RegistrySettings::default(),
            bank: BankSettings::default(),
        }
    };

    if let Ok(env_home) = std::env::var("ASSETBANK_HOME") {
        resolved.home = PathBuf::from(env_home);
    }
    if let Ok(mode) = std::env::var("ASSETBANK_WRITE_MODE") {
        resolved.registry.write_mode = mode
            .parse()
            .context("Invalid ASSETBANK_WRITE_MODE")?;
    }

    Ok(resolved)
}

fn resolve(config: ConfigFile, config_path: &Path, default_home: PathBuf) -> ResolvedConfig {
    // Base directory is the parent of .assetbank/ (i.e., grandparent of config.yaml)
    let base_dir = config_path
        .parent()
        .and_then(|p| p.parent())
        .unwrap_or(Path::new("."));

    let home = config
        .home
        .as_deref()
        .map(|h| resolve_path(base_dir, h))
        .unwrap_or(default_home);

    let libraries = config
        .libraries
        .into_iter()
        .map(|lib| LibraryConfig {
            name: lib.name,
            path: normalize_library_path(&resolve_path(base_dir, &lib.path)),
            enabled: lib.enabled,
            readonly: lib.readonly,
        })
        .collect();

    let defaults = RegistrySettings::default();
    let registry = RegistrySettings {
        write_mode: config.registry.write_mode.unwrap_or(defaults.write_mode),
        backup: config.registry.backup.unwrap_or(defaults.backup),
        id_scheme: config.registry.id_scheme.unwrap_or(defaults.id_scheme),
    };

    let defaults = BankSettings::default();
    let bank = BankSettings {
        strategy: config.bank.strategy.unwrap_or(defaults.strategy),
        command: config.bank.command.unwrap_or(defaults.command),
        timeout_seconds: config.bank.timeout_seconds.unwrap_or(defaults.timeout_seconds),
    };

    ResolvedConfig {
        home,
        config_file: Some(config_path.to_path_buf()),
        libraries,
        registry,
        bank,
    }
}
