//! Reconstruction-string codec.
//!
//! A record's backup text is newline-delimited: a label line followed by
//! one member reference per line. The format is intentionally minimal (no
//! per-item metadata); member details are re-resolved live at restore time,
//! so a backup survives content moves and metadata churn at the cost of
//! timestamps and cached titles.

use crate::error::BackupError;

/// Decoded form of one backup text, ready for reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructionJob {
    /// Identity the rebuilt record will carry.
    pub id: String,
    /// Collection-level label (line 0 of the backup).
    pub label: String,
    /// Member references to resolve, in playback order.
    pub references: Vec<String>,
}

/// A file-like export of one record, ready to hand to share plumbing.
///
/// The core produces names and bytes only; writing files or minting URIs
/// is the embedder's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBundle {
    /// Suggested file name, derived from the record's label.
    pub file_name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Encode a label and member references into backup text.
///
/// Embedded line breaks are stripped from every field so each item stays
/// on its own line.
#[must_use]
pub fn encode(label: Option<&str>, references: &[String]) -> String {
    let mut lines = Vec::with_capacity(references.len() + 1);
    if let Some(label) = label {
        lines.push(strip_line_breaks(label));
    }
    lines.extend(references.iter().map(|r| strip_line_breaks(r)));
    lines.join("\n")
}

/// Decode backup text into a reconstruction job.
///
/// Line 0 is the label; remaining non-empty lines are member references.
///
/// # Errors
///
/// Returns [`BackupError::NoLines`] when the text is empty: a backup must
/// carry at least its label line.
pub fn decode(id: &str, backup: &str) -> Result<ReconstructionJob, BackupError> {
    if backup.is_empty() {
        return Err(BackupError::NoLines { id: id.to_string() });
    }

    let mut lines = backup.split('\n');
    let Some(label) = lines.next() else {
        return Err(BackupError::NoLines { id: id.to_string() });
    };
    let references = lines
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect();

    Ok(ReconstructionJob {
        id: id.to_string(),
        label: label.to_string(),
        references,
    })
}

/// Bundle a reconstruction text as a `.recp` file.
#[must_use]
pub fn text_bundle(label: &str, reconstruction: &str) -> ExportBundle {
    ExportBundle {
        file_name: format!("{label}.recp"),
        bytes: reconstruction.as_bytes().to_vec(),
    }
}

/// Bundle a reconstruction text as a `.json` file holding the array of
/// its lines.
pub fn json_bundle(label: &str, reconstruction: &str) -> Result<ExportBundle, serde_json::Error> {
    let lines: Vec<&str> = reconstruction.split('\n').collect();
    let bytes = serde_json::to_vec(&lines)?;
    Ok(ExportBundle {
        file_name: format!("{label}.json"),
        bytes,
    })
}

fn strip_line_breaks(field: &str) -> String {
    field.replace(['\n', '\r'], "")
}
