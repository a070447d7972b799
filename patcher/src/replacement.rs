//! Replacement catalogue built from the patch directory.
//!
//! A [`ReplacementSet`] maps a replacement key to the file whose bytes should
//! be written in place of every matching archive entry. In the default
//! [`MatchMode::BaseName`] mode the key is a bare file name taken from the top
//! level of the patch directory, and an entry matches when the last segment of
//! its name equals the key. [`MatchMode::FullPath`] walks the directory
//! recursively and keys each file by its slash-separated relative path, so an
//! entry matches only when its full name is identical.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use log::{trace, warn};
use serde::Deserialize;
use thiserror::Error;

/// Directory searched for replacement files when none is configured.
pub const DEFAULT_PATCH_DIR: &str = "patches";

/// How archive entry names are compared with replacement keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Compare the last path segment only; every entry sharing a file name is
    /// replaced, whatever directory it lives in.
    #[default]
    BaseName,
    /// Compare the full entry name with the file's path relative to the patch
    /// directory.
    FullPath,
}

/// Errors raised while building or extending a [`ReplacementSet`].
#[derive(Debug, Error)]
pub enum ReplacementError {
    /// The patch directory does not exist or is not a directory.
    #[error("cannot find the directory containing the patches; please create: {path}")]
    NoPatchDirectory {
        /// Path that was searched.
        path: Utf8PathBuf,
    },

    /// The patch directory holds no usable files.
    #[error("no patch files found in directory: {path}")]
    EmptyPatchSet {
        /// Path that was searched.
        path: Utf8PathBuf,
    },

    /// Two replacement files resolve to the same key.
    #[error("replacement {key} is provided by both {first} and {second}")]
    DuplicateReplacement {
        /// The clashing key.
        key: String,
        /// File already registered under the key.
        first: Utf8PathBuf,
        /// File that attempted to register the same key.
        second: Utf8PathBuf,
    },

    /// The patch directory could not be listed.
    #[error("failed to read patch directory {path}")]
    ReadDir {
        /// Directory being listed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// A file whose contents replace matching archive entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementCandidate {
    key: String,
    path: Utf8PathBuf,
}

impl ReplacementCandidate {
    /// Create a candidate keyed by `key` and backed by the file at `path`.
    #[must_use]
    pub fn new(key: impl Into<String>, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
        }
    }

    /// The replacement key (a base name, or a relative path in
    /// [`MatchMode::FullPath`]).
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Location of the replacement bytes on disk.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// Read-only catalogue of replacement files keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ReplacementSet {
    mode: MatchMode,
    candidates: BTreeMap<String, ReplacementCandidate>,
}

impl ReplacementSet {
    /// Create an empty set using the given match mode.
    #[must_use]
    pub const fn new(mode: MatchMode) -> Self {
        Self {
            mode,
            candidates: BTreeMap::new(),
        }
    }

    /// Build a set from the files inside `dir`.
    ///
    /// In [`MatchMode::BaseName`] only regular files directly inside `dir`
    /// are registered; sub-directories are ignored. In
    /// [`MatchMode::FullPath`] the directory is walked recursively. Names
    /// that are not valid UTF-8 are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ReplacementError::NoPatchDirectory`] if `dir` is not an
    /// existing directory, [`ReplacementError::EmptyPatchSet`] if it holds no
    /// files, or [`ReplacementError::ReadDir`] if it cannot be listed.
    pub fn build(dir: &Utf8Path, mode: MatchMode) -> Result<Self, ReplacementError> {
        if !dir.is_dir() {
            return Err(ReplacementError::NoPatchDirectory {
                path: dir.to_owned(),
            });
        }

        let mut set = Self::new(mode);
        set.collect_dir(dir, "")?;

        if set.is_empty() {
            return Err(ReplacementError::EmptyPatchSet {
                path: dir.to_owned(),
            });
        }

        trace!("built replacement set of {} file(s) from {dir}", set.len());
        Ok(set)
    }

    /// Build a set from explicit candidates.
    ///
    /// # Errors
    ///
    /// Returns [`ReplacementError::DuplicateReplacement`] if two candidates
    /// share a key.
    pub fn from_candidates(
        mode: MatchMode,
        candidates: impl IntoIterator<Item = ReplacementCandidate>,
    ) -> Result<Self, ReplacementError> {
        let mut set = Self::new(mode);
        for candidate in candidates {
            set.insert(candidate)?;
        }
        Ok(set)
    }

    /// Register a candidate.
    ///
    /// # Errors
    ///
    /// Returns [`ReplacementError::DuplicateReplacement`] if the key is
    /// already taken; the existing registration is kept.
    pub fn insert(&mut self, candidate: ReplacementCandidate) -> Result<(), ReplacementError> {
        match self.candidates.entry(candidate.key.clone()) {
            Entry::Occupied(existing) => Err(ReplacementError::DuplicateReplacement {
                key: candidate.key,
                first: existing.get().path.clone(),
                second: candidate.path,
            }),
            Entry::Vacant(slot) => {
                slot.insert(candidate);
                Ok(())
            }
        }
    }

    /// Look up a candidate by its exact key.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<&ReplacementCandidate> {
        self.candidates.get(key)
    }

    /// Find the candidate that replaces the archive entry `entry_name`.
    ///
    /// Directory entries (names ending in `/`) never match.
    #[must_use]
    pub fn match_entry(&self, entry_name: &str) -> Option<&ReplacementCandidate> {
        if entry_name.ends_with('/') {
            return None;
        }
        let key = match self.mode {
            MatchMode::BaseName => base_name(entry_name),
            MatchMode::FullPath => entry_name,
        };
        self.lookup(key)
    }

    /// The match mode used by [`Self::match_entry`].
    #[must_use]
    pub const fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Number of registered candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Returns true if no candidates are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Iterate over candidates in key order.
    pub fn iter(&self) -> impl Iterator<Item = &ReplacementCandidate> {
        self.candidates.values()
    }

    fn collect_dir(&mut self, dir: &Utf8Path, prefix: &str) -> Result<(), ReplacementError> {
        let read_error = |source| ReplacementError::ReadDir {
            path: dir.to_owned(),
            source,
        };

        for item in dir.read_dir_utf8().map_err(read_error)? {
            let entry = match item {
                Ok(entry) => entry,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    warn!("skipping patch file with a non UTF-8 name in {dir}: {e}");
                    continue;
                }
                Err(e) => return Err(read_error(e)),
            };

            let path = entry.path();
            let key = format!("{prefix}{}", entry.file_name());

            if path.is_file() {
                self.insert(ReplacementCandidate::new(key, path.to_owned()))?;
            } else if path.is_dir() && self.mode == MatchMode::FullPath {
                self.collect_dir(path, &format!("{key}/"))?;
            } else {
                trace!("ignoring {path}: not a regular file");
            }
        }

        Ok(())
    }
}

impl<'a> IntoIterator for &'a ReplacementSet {
    type Item = &'a ReplacementCandidate;
    type IntoIter = std::collections::btree_map::Values<'a, String, ReplacementCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.values()
    }
}

/// Return the last `/`-separated segment of an archive entry name.
///
/// # Examples
///
/// ```
/// use archive_patcher::replacement::base_name;
///
/// assert_eq!(base_name("com/acme/Foo.class"), "Foo.class");
/// assert_eq!(base_name("Foo.class"), "Foo.class");
/// ```
#[must_use]
pub fn base_name(entry_name: &str) -> &str {
    entry_name
        .rsplit_once('/')
        .map_or(entry_name, |(_, last)| last)
}
