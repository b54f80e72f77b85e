//! Rebuilding records from backup text.
//!
//! The sequential resolve loop and its three-tier failure policy live here:
//! an unavailable member is dropped with a diagnostic, a missing resolver
//! capability aborts the whole attempt, and any other resolver failure
//! aborts wrapping the cause. Resolution is strictly sequential so the
//! rebuilt member list tracks input order and an abort stops further
//! lookups.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backup::ReconstructionJob;
use crate::error::{ReconstructError, ResolveError};
use crate::platform::{PlatformContent, PlatformResolver};
use crate::record::{PlaylistRecord, VideoSummary};

/// A rebuilt record together with the diagnostics its reconstruction
/// produced.
///
/// Diagnostics are non-fatal: they name members that were dropped because
/// their content is no longer available. Callers are expected to show them.
#[derive(Debug, Clone)]
pub struct Reconstructed<T> {
    /// The rebuilt record.
    pub record: T,
    /// Human-readable notes about dropped members.
    pub diagnostics: Vec<String>,
}

/// Rebuilds records by re-resolving their member references.
pub struct Reconstructor {
    resolver: Arc<dyn PlatformResolver>,
}

impl Reconstructor {
    /// Create a reconstructor on top of a resolver capability.
    #[must_use]
    pub fn new(resolver: Arc<dyn PlatformResolver>) -> Self {
        Self { resolver }
    }

    /// Rebuild a playlist from a decoded reconstruction job.
    ///
    /// A playlist whose members all dropped is still returned (empty, with
    /// diagnostics); an empty result is not itself a failure.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructError::CapabilityGap`] when no source covers a
    /// reference, and [`ReconstructError::ResolutionFailed`] for any
    /// resolver failure other than plain unavailability. Either aborts the
    /// attempt; no partial record escapes.
    pub async fn rebuild_playlist(
        &self,
        job: ReconstructionJob,
    ) -> Result<Reconstructed<PlaylistRecord>, ReconstructError> {
        info!(
            "Reconstructing playlist {} ({} references)",
            job.label,
            job.references.len()
        );

        let (members, diagnostics) = self.resolve_ordered(&job.label, &job.references).await?;

        if !diagnostics.is_empty() {
            info!(
                "Reconstructed {} with {} of {} members ({} dropped)",
                job.label,
                members.len(),
                job.references.len(),
                diagnostics.len()
            );
        }

        Ok(Reconstructed {
            record: PlaylistRecord::with_id(job.id, job.label, members),
            diagnostics,
        })
    }

    /// Resolve a single reference to a video summary.
    ///
    /// This is the degenerate one-line-backup path used by watch-later
    /// entries, where the reference is the whole record. `label` names the
    /// owning collection in error messages.
    ///
    /// # Errors
    ///
    /// Any failure is fatal here, including unavailability and non-video
    /// content: with a single member there is nothing to degrade to.
    pub async fn resolve_video(
        &self,
        label: &str,
        reference: &str,
    ) -> Result<VideoSummary, ReconstructError> {
        match self.resolver.resolve(reference).await {
            Ok(content) => content.into_video().map(VideoSummary::from).ok_or_else(|| {
                ReconstructError::ResolutionFailed {
                    label: label.to_string(),
                    reference: reference.to_string(),
                    reason: "resolved to non-video content".to_string(),
                    source: ResolveError::Other("resolved to non-video content".to_string()),
                }
            }),
            Err(ResolveError::NoCapability) => Err(ReconstructError::CapabilityGap {
                label: label.to_string(),
                reference: reference.to_string(),
            }),
            Err(err) => Err(ReconstructError::ResolutionFailed {
                label: label.to_string(),
                reference: reference.to_string(),
                reason: err.to_string(),
                source: err,
            }),
        }
    }

    /// Resolve references strictly in order, applying the per-item policy.
    async fn resolve_ordered(
        &self,
        label: &str,
        references: &[String],
    ) -> Result<(Vec<VideoSummary>, Vec<String>), ReconstructError> {
        let mut members = Vec::with_capacity(references.len());
        let mut diagnostics = Vec::new();

        for reference in references {
            match self.resolver.resolve(reference).await {
                Ok(PlatformContent::Video(details)) => members.push(details.into()),
                Ok(PlatformContent::Other { kind }) => {
                    debug!(
                        "Dropping non-video member {} ({}) of {}",
                        reference, kind, label
                    );
                }
                Err(ResolveError::Unavailable) => {
                    warn!("Member {} of {} is no longer available", reference, label);
                    diagnostics.push(format!("{label}:[{reference}] is no longer available"));
                }
                Err(ResolveError::NoCapability) => {
                    return Err(ReconstructError::CapabilityGap {
                        label: label.to_string(),
                        reference: reference.clone(),
                    });
                }
                Err(err) => {
                    return Err(ReconstructError::ResolutionFailed {
                        label: label.to_string(),
                        reference: reference.clone(),
                        reason: err.to_string(),
                        source: err,
                    });
                }
            }
        }

        Ok((members, diagnostics))
    }
}

impl std::fmt::Debug for Reconstructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconstructor").finish_non_exhaustive()
    }
}
