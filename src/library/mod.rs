//! Asset library registry.
//!
//! Each library is a single JSON document mapping entry ids to the file and
//! named content block they reference.
//!
//! # Storage Layout
//!
//! ```text
//! <library dir>/
//! ├── main.json                 # The library document
//! ├── main_backup.json          # Copy taken before the last mutation
//! ├── .main.json.lock           # Advisory lock (atomic write mode only)
//! └── thumbnails/
//!     └── UASBANK_<stem>_<name>.jpg
//! ```
//!
//! ```json
//! {
//!   "Hero:hero_v2": {
//!     "blend_path": "/lib/chars/hero_v2.blend",
//!     "data_name": "Hero",
//!     "tags": ["rigged", "biped"]
//!   }
//! }
//! ```

pub mod catalog;
pub mod entry;
pub mod error;
pub mod filter;
pub mod registry;

pub use catalog::{Catalog, CatalogError, CatalogItem};
pub use entry::{default_thumbnail_path, stem_of, Entry, EntryId, IdScheme};
pub use error::{ErrorKind, RegistryError, RegistryResult};
pub use filter::{matches_filter, parse_terms};
pub use registry::{backup_path, lock_path, LibraryDocument, Registry, WriteMode};
