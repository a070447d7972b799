//! Archive patcher CLI entrypoint.
//!
//! Replaces entries inside a JAR or ZIP archive with the files found in a
//! patch directory, rewriting the archive through a temporary file so the
//! original is only replaced once the rewrite has succeeded.

use archive_patcher::cli::Cli;
use archive_patcher::config::{FileConfig, Settings};
use archive_patcher::error::Result;
use archive_patcher::patch::{PatchReport, patch_archive};
use archive_patcher::policy::{AutoApply, Prompt};
use clap::Parser;
use std::io::{self, Write};

fn main() {
    let cli = Cli::try_parse().unwrap_or_else(|err| exit_on_parse_error(&err));
    init_logging(&cli);

    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Print clap's message and exit; usage errors exit 1, `--help` exits 0.
fn exit_on_parse_error(err: &clap::Error) -> ! {
    let exit_code = i32::from(err.use_stderr());
    if err.print().is_err() {
        // Best-effort output; the exit code still reports the failure.
    }
    std::process::exit(exit_code);
}

fn init_logging(cli: &Cli) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .format_timestamp(None)
        .init();
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let file_config = FileConfig::load(cli.config.as_deref())?;
    let settings = Settings::resolve(cli, &file_config);
    let request = settings.request_for(&cli.archive);

    let mut silenced = io::sink();
    let progress: &mut dyn Write = if cli.quiet { &mut silenced } else { stderr };

    let report = if settings.interactive {
        patch_archive(&request, Prompt::console(), progress)?
    } else {
        patch_archive(&request, AutoApply, progress)?
    };

    write_stderr_line(progress, summary_line(&report, settings.dry_run));
    Ok(())
}

fn summary_line(report: &PatchReport, dry_run: bool) -> String {
    let replaced = report.outcome.replaced();
    let declined = report.outcome.declined_entries().len();
    if replaced == 0 {
        return if declined == 0 {
            "No entries matched a patch file; archive left unchanged.".to_owned()
        } else {
            format!("All {declined} matching entries skipped; archive left unchanged.")
        };
    }
    if dry_run {
        return format!("Dry run: {replaced} entries would be replaced; archive left unchanged.");
    }
    format!(
        "Replaced {replaced} entries, skipped {declined}, copied {} unchanged.",
        report.outcome.copied() - declined
    )
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, err);
            1
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archive_patcher::error::PatchError;
    use archive_patcher::rewriter::RewriteOutcome;
    use camino::Utf8PathBuf;

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(()), &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[test]
    fn exit_code_for_run_result_prints_error_and_returns_one() {
        let err = PatchError::ArchiveNotFound {
            path: Utf8PathBuf::from("missing.jar"),
        };

        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert_eq!(
            stderr_text,
            "archive file specified: missing.jar does not exist\n"
        );
    }

    #[test]
    fn run_reports_missing_archive() {
        let cli = Cli {
            archive: Utf8PathBuf::from("definitely/not/here.jar"),
            assume_yes: true,
            ..Cli::default()
        };
        let mut stderr = Vec::new();

        // The default settings file is optional, so this only fails on the
        // archive precondition.
        let result = run(&cli, &mut stderr);

        assert!(matches!(result, Err(PatchError::ArchiveNotFound { .. })));
    }

    #[test]
    fn quiet_run_writes_nothing_to_stderr() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let root = camino::Utf8Path::from_path(dir.path())
            .expect("temp dir path not UTF-8")
            .to_owned();
        let archive = root.join("app.jar");
        let mut writer =
            zip::ZipWriter::new(std::fs::File::create(&archive).expect("create archive"));
        writer
            .start_file("com/x/B.class", zip::write::SimpleFileOptions::default())
            .expect("start entry");
        writer.write_all(b"old B").expect("write entry");
        writer.finish().expect("finish archive");
        let patch_dir = root.join("patches");
        std::fs::create_dir(&patch_dir).expect("create patch dir");
        std::fs::write(patch_dir.join("B.class"), b"new B").expect("write patch");
        let settings = root.join("settings.toml");
        std::fs::write(&settings, "").expect("write settings");

        let cli = Cli {
            archive,
            patch_dir: Some(patch_dir),
            assume_yes: true,
            config: Some(settings),
            quiet: true,
            ..Cli::default()
        };
        let mut stderr = Vec::new();

        run(&cli, &mut stderr).expect("patch");

        assert!(stderr.is_empty(), "unexpected output: {stderr:?}");
    }

    #[test]
    fn summary_for_untouched_archive() {
        let report = PatchReport {
            outcome: RewriteOutcome::default(),
            committed: false,
        };
        assert_eq!(
            summary_line(&report, false),
            "No entries matched a patch file; archive left unchanged."
        );
    }
}
