//! Error types for the archive patcher.
//!
//! Each layer owns a focused error enum: [`ReplacementError`] for patch
//! directory handling, [`RewriteError`] for the streaming rewrite, and
//! [`PromptError`] for interactive confirmation. [`PatchError`] gathers them
//! for the end-to-end patch flow and the CLI.

use camino::Utf8PathBuf;
use thiserror::Error;

pub use crate::policy::PromptError;
pub use crate::replacement::ReplacementError;
pub use crate::rewriter::RewriteError;

/// Errors that can occur while patching an archive in place.
#[derive(Debug, Error)]
pub enum PatchError {
    /// The archive to update does not exist or is not a regular file.
    #[error("archive file specified: {path} does not exist")]
    ArchiveNotFound {
        /// Path that was supplied for the archive.
        path: Utf8PathBuf,
    },

    /// The patch directory could not be turned into a replacement set.
    #[error(transparent)]
    Replacement(#[from] ReplacementError),

    /// The source archive could not be opened or is not a readable ZIP file.
    #[error("cannot open archive {path}: {source}")]
    SourceOpen {
        /// Path to the source archive.
        path: Utf8PathBuf,
        /// Underlying archive error.
        #[source]
        source: zip::result::ZipError,
    },

    /// The streaming rewrite failed; the original archive is untouched.
    #[error("patching {path} failed: {source}")]
    Rewrite {
        /// Path to the source archive.
        path: Utf8PathBuf,
        /// Underlying rewrite error.
        #[source]
        source: RewriteError,
    },

    /// The rewritten archive could not replace the original.
    #[error("cannot replace {path} with {temp_path}: {source}")]
    Swap {
        /// Path to the original archive.
        path: Utf8PathBuf,
        /// Path to the rewritten temporary archive.
        temp_path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The settings file could not be read or parsed.
    #[error("invalid configuration in {path}: {reason}")]
    Config {
        /// Path to the settings file.
        path: Utf8PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// An I/O operation outside the rewrite failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PatchError {
    /// Returns true when the error was raised before any file was touched.
    ///
    /// Precondition failures cover a missing archive and a missing or empty
    /// patch directory.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::ArchiveNotFound { .. }
                | Self::Replacement(
                    ReplacementError::NoPatchDirectory { .. }
                        | ReplacementError::EmptyPatchSet { .. }
                )
        )
    }
}

/// Result type alias using [`PatchError`].
pub type Result<T> = std::result::Result<T, PatchError>;
