//! End-to-end patch flow: check preconditions, rewrite to a temporary
//! archive, then swap it in place of the original.

use std::fs::File;
use std::io::{BufReader, Write};

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{PatchError, Result};
use crate::policy::ApplyPolicy;
use crate::replacement::{DEFAULT_PATCH_DIR, MatchMode, ReplacementSet};
use crate::rewriter::{ArchiveRewriter, RewriteOutcome};
use crate::swap::PendingArchive;

/// Everything needed to patch one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRequest {
    /// Archive updated in place.
    pub archive: Utf8PathBuf,
    /// Directory holding the replacement files.
    pub patch_dir: Utf8PathBuf,
    /// How entry names are matched against replacement files.
    pub match_mode: MatchMode,
    /// Rewrite and validate without replacing the archive.
    pub dry_run: bool,
}

impl PatchRequest {
    /// Request patching `archive` from the default `patches` directory.
    #[must_use]
    pub fn new(archive: impl Into<Utf8PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            patch_dir: Utf8PathBuf::from(DEFAULT_PATCH_DIR),
            match_mode: MatchMode::default(),
            dry_run: false,
        }
    }
}

/// Result of a completed patch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    /// What the rewrite did to each entry.
    pub outcome: RewriteOutcome,
    /// Whether the rewritten archive replaced the original.
    pub committed: bool,
}

/// Patch `request.archive` with the files from `request.patch_dir`.
///
/// Progress lines for the user are written to `progress`. The archive on
/// disk is only replaced when at least one entry was patched and the
/// request is not a dry run; in every other case, failures included, the
/// original bytes are left untouched and no temporary file remains.
///
/// # Errors
///
/// Returns [`PatchError::ArchiveNotFound`] or a [`PatchError::Replacement`]
/// before touching any file when a precondition fails. Returns
/// [`PatchError::SourceOpen`], [`PatchError::Rewrite`] or
/// [`PatchError::Swap`] when the corresponding stage fails.
pub fn patch_archive<P: ApplyPolicy>(
    request: &PatchRequest,
    policy: P,
    progress: &mut dyn Write,
) -> Result<PatchReport> {
    let archive = request.archive.as_path();
    if !archive.is_file() {
        return Err(PatchError::ArchiveNotFound {
            path: archive.to_owned(),
        });
    }
    let replacements = ReplacementSet::build(&request.patch_dir, request.match_mode)?;

    let pending = PendingArchive::prepare(archive)?;
    write_line(progress, &format!("Patching {archive} ..."));

    let outcome = {
        let mut source = open_archive(archive)?;
        ArchiveRewriter::new(&replacements, policy)
            .rewrite(&mut source, pending.temp_path())
            .map_err(|e| PatchError::Rewrite {
                path: archive.to_owned(),
                source: e,
            })?
    };

    for name in outcome.replaced_entries() {
        write_line(progress, &format!("{name} patched"));
    }

    let committed = if outcome.is_unchanged() {
        info!("no entries in {archive} matched a patch file; archive left unchanged");
        pending.discard();
        false
    } else if request.dry_run {
        info!(
            "dry run: {} entr{} in {archive} would be replaced",
            outcome.replaced(),
            if outcome.replaced() == 1 { "y" } else { "ies" }
        );
        pending.discard();
        false
    } else {
        let temp_path = pending.temp_path().to_owned();
        pending.commit().map_err(|e| PatchError::Swap {
            path: archive.to_owned(),
            temp_path,
            source: e,
        })?;
        info!("replaced {} entries in {archive}", outcome.replaced());
        true
    };

    write_line(progress, &format!("Finished patching {archive}"));
    Ok(PatchReport { outcome, committed })
}

/// Open `path` as a ZIP archive for reading.
///
/// # Errors
///
/// Returns [`PatchError::SourceOpen`] if the file cannot be opened or is not
/// a readable ZIP archive.
pub fn open_archive(path: &Utf8Path) -> Result<ZipArchive<BufReader<File>>> {
    let source_open = |source| PatchError::SourceOpen {
        path: path.to_owned(),
        source,
    };
    let file = File::open(path).map_err(|e| source_open(ZipError::Io(e)))?;
    ZipArchive::new(BufReader::new(file)).map_err(source_open)
}

fn write_line(out: &mut dyn Write, line: &str) {
    if let Err(e) = writeln!(out, "{line}") {
        debug!("failed to write progress line: {e}");
    }
}
