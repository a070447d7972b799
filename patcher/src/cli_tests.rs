//! Tests for CLI parsing and default behaviours.

use super::*;
use rstest::rstest;

#[test]
fn cli_parses_defaults() {
    let cli = Cli::parse_from(["archive-patcher", "app.jar"]);
    assert_eq!(cli.archive, Utf8PathBuf::from("app.jar"));
    assert!(cli.patch_dir.is_none());
    assert!(!cli.assume_yes);
    assert!(cli.match_mode.is_none());
    assert!(!cli.dry_run);
    assert!(cli.config.is_none());
    assert_eq!(cli.verbosity, 0);
    assert!(!cli.quiet);
}

#[test]
fn cli_requires_an_archive() {
    let err = Cli::try_parse_from(["archive-patcher"]).expect_err("archive is required");
    assert_eq!(
        err.kind(),
        clap::error::ErrorKind::MissingRequiredArgument
    );
}

#[test]
fn cli_parses_all_options() {
    let cli = Cli::parse_from([
        "archive-patcher",
        "-p",
        "build/patches",
        "--yes",
        "--match-mode",
        "full-path",
        "--dry-run",
        "--config",
        "custom.toml",
        "lib/app.jar",
    ]);
    assert_eq!(cli.archive, Utf8PathBuf::from("lib/app.jar"));
    assert_eq!(cli.patch_dir, Some(Utf8PathBuf::from("build/patches")));
    assert!(cli.assume_yes);
    assert_eq!(cli.match_mode, Some(MatchMode::FullPath));
    assert!(cli.dry_run);
    assert_eq!(cli.config, Some(Utf8PathBuf::from("custom.toml")));
}

#[test]
fn cli_rejects_unknown_match_mode() {
    let result = Cli::try_parse_from(["archive-patcher", "--match-mode", "fuzzy", "app.jar"]);
    assert!(result.is_err());
}

#[test]
fn cli_rejects_verbose_with_quiet() {
    let result = Cli::try_parse_from(["archive-patcher", "-v", "-q", "app.jar"]);
    assert!(result.is_err());
}

#[rstest]
#[case::default(&["archive-patcher", "app.jar"], "warn")]
#[case::verbose(&["archive-patcher", "-v", "app.jar"], "info")]
#[case::very_verbose(&["archive-patcher", "-vv", "app.jar"], "debug")]
#[case::trace(&["archive-patcher", "-vvvv", "app.jar"], "trace")]
#[case::quiet(&["archive-patcher", "-q", "app.jar"], "error")]
fn log_filter_follows_verbosity(#[case] args: &[&str], #[case] expected: &str) {
    let cli = Cli::parse_from(args);
    assert_eq!(cli.log_filter(), expected);
}
