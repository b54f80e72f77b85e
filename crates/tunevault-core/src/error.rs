//! Error types for TuneVault core operations.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in TuneVault core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Record store or backing storage operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Backup text is structurally invalid.
    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),

    /// Reconstruction aborted with a fatal failure.
    #[error("Reconstruction error: {0}")]
    Reconstruction(#[from] ReconstructError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from the record store and its backing storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No live record with the given identity exists.
    #[error("Record not found: {id}")]
    NotFound {
        /// Identity that was looked up.
        id: String,
    },

    /// Opening or preparing the backing storage failed.
    #[error("Failed to open storage at {path}: {reason}")]
    OpenFailed {
        /// Storage location.
        path: std::path::PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// Reading one durable entry failed.
    #[error("Failed to read entry {id}: {reason}")]
    ReadFailed {
        /// Identity of the entry.
        id: String,
        /// Underlying failure.
        reason: String,
    },

    /// Writing one durable entry failed.
    #[error("Failed to write entry {id}: {reason}")]
    WriteFailed {
        /// Identity of the entry.
        id: String,
        /// Underlying failure.
        reason: String,
    },

    /// Deleting one durable entry failed.
    #[error("Failed to delete entry {id}: {reason}")]
    DeleteFailed {
        /// Identity of the entry.
        id: String,
        /// Underlying failure.
        reason: String,
    },

    /// Enumerating durable entries failed.
    #[error("Failed to list entries: {reason}")]
    ListFailed {
        /// Underlying failure.
        reason: String,
    },
}

/// Structural errors in reconstruction backup text.
#[derive(Debug, Error)]
pub enum BackupError {
    /// The backup text contains no lines; a backup must carry at least
    /// the label line.
    #[error("Backup for {id} has no lines")]
    NoLines {
        /// Identity of the record the backup belongs to.
        id: String,
    },
}

/// Failure kinds a platform resolver reports for a single reference.
///
/// `Unavailable` is recoverable per item during reconstruction; the other
/// kinds abort the whole attempt.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The referenced content or its hosting source is gone or unreachable.
    #[error("reference is no longer available")]
    Unavailable,

    /// No resolver is registered for the reference's source.
    #[error("no source enabled")]
    NoCapability,

    /// Any other resolver failure, flattened to its message.
    #[error("{0}")]
    Other(String),
}

/// Fatal failures that abort a whole reconstruction attempt.
#[derive(Debug, Error)]
pub enum ReconstructError {
    /// No resolver capability covers one of the references; the whole
    /// attempt aborts rather than dropping members.
    #[error("No source enabled for [{reference}]")]
    CapabilityGap {
        /// Label of the collection being rebuilt.
        label: String,
        /// The reference that had no resolver.
        reference: String,
    },

    /// A resolver failed for a reason other than plain unavailability.
    #[error("{label}:[{reference}] {reason}")]
    ResolutionFailed {
        /// Label of the collection being rebuilt.
        label: String,
        /// The reference that failed.
        reference: String,
        /// Message of the original cause.
        reason: String,
        /// The resolver failure that triggered the abort.
        #[source]
        source: ResolveError,
    },

    /// The backup text could not be decoded into a reconstruction job.
    #[error(transparent)]
    Decode(#[from] BackupError),
}
