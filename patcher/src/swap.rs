//! Temporary archive handling and the final in-place swap.
//!
//! A rewrite always targets a sibling `<archive>.tmp` file. The original is
//! only touched by [`PendingArchive::commit`], after the rewrite has fully
//! succeeded, so an interrupted run can at worst leave a stale temp file
//! behind. That file is removed at the start of the next run.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};

/// Suffix appended to the archive path to form the temporary path.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Return the sibling temporary path used while rewriting `archive`.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use archive_patcher::swap::temp_path_for;
///
/// assert_eq!(temp_path_for(Utf8Path::new("lib/app.jar")).as_str(), "lib/app.jar.tmp");
/// ```
#[must_use]
pub fn temp_path_for(archive: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{archive}{TEMP_SUFFIX}"))
}

/// Owns the temporary archive until it is committed or dropped.
///
/// Dropping an uncommitted guard deletes the temporary file, so every early
/// return leaves the original archive as the only copy on disk.
#[derive(Debug)]
pub struct PendingArchive {
    original: Utf8PathBuf,
    temp: Utf8PathBuf,
    armed: bool,
}

impl PendingArchive {
    /// Prepare a temporary path for rewriting `original`.
    ///
    /// A file already sitting at the temporary path is a leftover from an
    /// interrupted run and is removed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the stale file exists but cannot be removed.
    pub fn prepare(original: &Utf8Path) -> io::Result<Self> {
        let temp = temp_path_for(original);
        match fs::remove_file(&temp) {
            Ok(()) => warn!("removed stale temporary archive {temp}"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        Ok(Self {
            original: original.to_owned(),
            temp,
            armed: true,
        })
    }

    /// The archive that will be replaced on commit.
    #[must_use]
    pub fn original(&self) -> &Utf8Path {
        &self.original
    }

    /// The temporary path the rewrite should write to.
    #[must_use]
    pub fn temp_path(&self) -> &Utf8Path {
        &self.temp
    }

    /// Replace the original archive with the temporary one.
    ///
    /// The rename replaces the original atomically where the platform allows
    /// it. On Windows, where a rename cannot overwrite an existing file, the
    /// original is removed first.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from the rename. The temporary file is removed
    /// when the guard drops, unless the original is already gone, in which
    /// case it is kept as the only remaining copy.
    pub fn commit(mut self) -> io::Result<()> {
        if let Err(e) = replace_file(&self.temp, &self.original) {
            if !self.original.exists() {
                self.armed = false;
                warn!(
                    "{} was removed but not replaced; rewritten archive kept at {}",
                    self.original, self.temp
                );
            }
            return Err(e);
        }
        self.armed = false;
        debug!("replaced {} with {}", self.original, self.temp);
        Ok(())
    }

    /// Delete the temporary archive without touching the original.
    pub fn discard(self) {
        drop(self);
    }
}

impl Drop for PendingArchive {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(&self.temp) {
            Ok(()) => debug!("discarded temporary archive {}", self.temp),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove temporary archive {}: {e}", self.temp),
        }
    }
}

#[cfg(not(windows))]
fn replace_file(from: &Utf8Path, to: &Utf8Path) -> io::Result<()> {
    fs::rename(from, to)
}

#[cfg(windows)]
fn replace_file(from: &Utf8Path, to: &Utf8Path) -> io::Result<()> {
    fs::remove_file(to)?;
    fs::rename(from, to)
}
