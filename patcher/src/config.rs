//! Optional TOML settings file and its merge with the command line.
//!
//! Precedence is CLI flag, then settings file, then built-in default.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{PatchError, Result};
use crate::patch::PatchRequest;
use crate::replacement::{DEFAULT_PATCH_DIR, MatchMode};

/// Settings file read from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "archive-patcher.toml";

/// Values read from a settings file. Absent keys fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Directory holding the replacement files.
    pub patch_dir: Option<Utf8PathBuf>,
    /// Ask before each replacement.
    pub interactive: Option<bool>,
    /// How entry names are matched against replacement files.
    pub match_mode: Option<MatchMode>,
}

impl FileConfig {
    /// Parse settings from TOML text read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::Config`] on malformed TOML or unknown keys.
    pub fn parse(contents: &str, path: &Utf8Path) -> Result<Self> {
        toml::from_str(contents).map_err(|e| PatchError::Config {
            path: path.to_owned(),
            reason: e.message().to_owned(),
        })
    }

    /// Load the settings file.
    ///
    /// With `explicit` set the file must exist. Otherwise
    /// [`DEFAULT_CONFIG_FILE`] is read when present and defaults are used
    /// when it is not.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::Config`] if an explicitly named file is missing
    /// or any file cannot be read or parsed.
    pub fn load(explicit: Option<&Utf8Path>) -> Result<Self> {
        let path = explicit.unwrap_or_else(|| Utf8Path::new(DEFAULT_CONFIG_FILE));
        match fs::read_to_string(path) {
            Ok(contents) => {
                debug!("loading settings from {path}");
                Self::parse(&contents, path)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound && explicit.is_none() => {
                Ok(Self::default())
            }
            Err(e) => Err(PatchError::Config {
                path: path.to_owned(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Effective settings after merging the CLI with the settings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory holding the replacement files.
    pub patch_dir: Utf8PathBuf,
    /// Ask before each replacement.
    pub interactive: bool,
    /// How entry names are matched against replacement files.
    pub match_mode: MatchMode,
    /// Rewrite without replacing the archive.
    pub dry_run: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            patch_dir: Utf8PathBuf::from(DEFAULT_PATCH_DIR),
            interactive: true,
            match_mode: MatchMode::default(),
            dry_run: false,
        }
    }
}

impl Settings {
    /// Merge CLI flags over file values over defaults.
    #[must_use]
    pub fn resolve(cli: &Cli, file: &FileConfig) -> Self {
        let defaults = Self::default();
        Self {
            patch_dir: cli
                .patch_dir
                .clone()
                .or_else(|| file.patch_dir.clone())
                .unwrap_or(defaults.patch_dir),
            interactive: if cli.assume_yes {
                false
            } else {
                file.interactive.unwrap_or(defaults.interactive)
            },
            match_mode: cli
                .match_mode
                .or(file.match_mode)
                .unwrap_or(defaults.match_mode),
            dry_run: cli.dry_run,
        }
    }

    /// Build the request for patching `archive` with these settings.
    #[must_use]
    pub fn request_for(&self, archive: &Utf8Path) -> PatchRequest {
        PatchRequest {
            archive: archive.to_owned(),
            patch_dir: self.patch_dir.clone(),
            match_mode: self.match_mode,
            dry_run: self.dry_run,
        }
    }
}
