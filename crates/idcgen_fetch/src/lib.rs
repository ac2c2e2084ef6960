//! # idcgen_fetch
//!
//! Reads an IAM Identity Center directory and normalizes it into records.
//!
//! ## Features
//!
//! - `DirectorySource` trait describing the paginated directory calls
//! - Snapshot-backed source serving YAML or JSON snapshots page by page
//! - Normalization engine resolving cross-entity references and import ids
//! - Optional TEAM table and application records
//!
//! ## Example
//!
//! ```rust,no_run
//! use idcgen_core::{RecordStore, Settings};
//! use idcgen_fetch::{Normalizer, SnapshotSource};
//! use std::path::Path;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::default();
//! let source = SnapshotSource::from_file(Path::new("demos/snapshot.yaml"))?;
//! let store = RecordStore::new(settings.store_dir());
//! let summary = Normalizer::new(&source, &store, &settings).run().await?;
//! println!("Fetched {} records", summary.total());
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod normalize;
pub mod snapshot;
pub mod source;

pub use engine::{FetchSummary, Normalizer, COURTESY_DELAY, MAX_OU_DEPTH, TEAM_APPLICATION_NAME};
pub use error::{FetchError, FetchResult};
pub use normalize::{CollisionCheck, NameRef};
pub use snapshot::{DirectorySnapshot, Fault, SnapshotSource, DEFAULT_PAGE_SIZE};
pub use source::{DirectorySource, Page};
