//! CLI argument definitions for the archive patcher.
//!
//! Kept apart from the entrypoint so the binary only orchestrates and the
//! argument surface can be unit tested.

use crate::replacement::MatchMode;
use camino::Utf8PathBuf;
use clap::Parser;

/// Replace entries inside a JAR or ZIP archive with files from a patch
/// directory.
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "archive-patcher")]
#[command(version, about)]
#[command(long_about = concat!(
    "Replace entries inside a JAR or ZIP archive with files from a patch directory.\n\n",
    "Every regular file directly inside the patch directory (./patches by default) is ",
    "a replacement keyed by its file name. Each archive entry whose last path segment ",
    "equals a replacement key has its content swapped for the file's bytes; all other ",
    "entries are copied unchanged.\n\n",
    "The archive is rewritten to a sibling .tmp file and only replaces the original ",
    "once the rewrite has fully succeeded.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Patch an archive, confirming each replacement:\n",
    "    $ archive-patcher app.jar\n\n",
    "  Apply every replacement without prompting:\n",
    "    $ archive-patcher --yes app.jar\n\n",
    "  Match on full entry paths using a nested patch tree:\n",
    "    $ archive-patcher --match-mode full-path -p build/patches app.jar\n\n",
    "  Check which entries would be replaced:\n",
    "    $ archive-patcher --yes --dry-run app.jar",
))]
pub struct Cli {
    /// Archive to update in place.
    #[arg(value_name = "ARCHIVE")]
    pub archive: Utf8PathBuf,

    /// Directory holding the replacement files [default: patches].
    #[arg(short, long, value_name = "DIR")]
    pub patch_dir: Option<Utf8PathBuf>,

    /// Apply every replacement without asking for confirmation.
    #[arg(short = 'y', long = "yes")]
    pub assume_yes: bool,

    /// How entry names are matched against replacement files.
    #[arg(long, value_enum, value_name = "MODE")]
    pub match_mode: Option<MatchMode>,

    /// Rewrite to the temporary file but never replace the archive.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Settings file [default: archive-patcher.toml when present].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only report errors.
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Default `env_logger` filter for the requested verbosity.
    ///
    /// `RUST_LOG` still takes precedence when set.
    #[must_use]
    pub const fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
