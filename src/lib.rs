//! assetbank - Flat-file asset bank registry
//!
//! Artists "bank" named blocks of 3D content (collections, groups) into
//! libraries so they can be found and re-imported later. A library is a
//! single JSON document; this crate owns reading and writing it.
//!
//! # Modules
//!
//! - `library`: Registry, entries, filter and the cross-library catalog
//! - `strategy`: Pluggable ways of producing an entry from content
//! - `bank`: Context tying the active strategy to the registry
//! - `config`: Config file discovery and resolution
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Create a library
//! assetbank init ./libs/props.json
//!
//! # Bank a collection from a file
//! assetbank bank scenes/hero_v2.blend --name Hero --library ./libs/props.json --tags "rigged;biped"
//!
//! # Search
//! assetbank list --filter "hero rig"
//! ```

pub mod bank;
pub mod cli;
pub mod config;
pub mod library;
pub mod strategy;

// Re-export main types at crate root for convenience
pub use bank::{BankContext, BankOutcome};
pub use config::{LibraryConfig, ResolvedConfig};
pub use library::{
    Catalog, CatalogItem, Entry, EntryId, ErrorKind, LibraryDocument, Registry, RegistryError,
    WriteMode,
};
pub use strategy::{BankStrategy, ContentHandle, EntryData, StrategyKind};
