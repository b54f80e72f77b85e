//! `TuneVault` Core Library
//!
//! This crate provides the core functionality for the `TuneVault`
//! application:
//! - Durable keyed stores for user-curated collections
//! - Named playlist and watch-later queue management
//! - Compact reconstruction backups and their recovery protocol
//! - Playlist building from external channel feeds
//! - Export/import of playlists as shareable bundles
//! - Artwork variant selection for presentation
//!
//! Records persist as compact reconstruction text (a label plus member
//! references) rather than full snapshots: restoring a store re-resolves
//! every member against the embedder's [`platform::PlatformResolver`],
//! dropping members that are gone and aborting loudly when a source
//! capability is missing.
//!
//! # Error Handling
//!
//! This crate uses typed errors per domain, with
//! [`error::ReconstructError`] distinguishing recoverable member loss
//! from fatal aborts. See the [`error`] module for details.
//!
//! ```rust,ignore
//! use tunevault_core::{Error, Result};
//!
//! fn do_something() -> Result<()> {
//!     // Your code here
//!     Ok(())
//! }
//! ```

pub mod artwork;
pub mod backup;
pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod playlists;
pub mod reconstruct;
pub mod record;
pub mod storage;
pub mod store;

pub use artwork::{
    ImageVariant, MAX_IMAGE_BYTES, select_best_fit, select_highest_resolution,
    select_lowest_resolution,
};
pub use backup::{ExportBundle, ReconstructionJob};
pub use config::{AppConfig, default_storage_directory};
pub use error::{BackupError, Error, ReconstructError, ResolveError, Result, StoreError};
pub use logging::{LogRotation, LoggingConfig, LoggingGuard, default_log_directory};
pub use platform::{ChannelPager, PlatformChannel, PlatformContent, PlatformResolver, VideoDetails};
pub use playlists::{
    PageCallback, PlaylistBackup, PlaylistService, ServiceLoadReport, WatchLaterBackup,
};
pub use reconstruct::{Reconstructed, Reconstructor};
pub use record::{PlaylistRecord, VideoSummary, now_millis};
pub use storage::{DirectoryStorage, MemoryStorage, RecordStorage, StoredEntry};
pub use store::{LoadReport, QuarantinedEntry, RecordBackup, RecordStore, StoreEvent};
