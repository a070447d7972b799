//! Per-entry confirmation policies.
//!
//! The rewriter decides *whether* an entry matches a replacement; an
//! [`ApplyPolicy`] decides whether that match is actually applied. Declined
//! matches are copied unmodified.

use std::io::{self, BufRead, Write};

use thiserror::Error;

/// Errors raised while asking whether to apply a replacement.
#[derive(Debug, Error)]
pub enum PromptError {
    /// The console input was closed before an answer arrived.
    #[error("console input closed while waiting for an answer")]
    InputClosed,

    /// Reading the answer or writing the question failed.
    #[error("failed to read answer from console: {0}")]
    Io(#[from] io::Error),
}

/// Decides whether a matched entry is replaced.
#[cfg_attr(test, mockall::automock)]
pub trait ApplyPolicy {
    /// Return `true` to replace `entry_name`, `false` to copy it unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError`] when no decision can be obtained; the rewrite
    /// is aborted.
    fn should_apply(&mut self, entry_name: &str) -> Result<bool, PromptError>;
}

/// Applies every match without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApply;

impl ApplyPolicy for AutoApply {
    fn should_apply(&mut self, _entry_name: &str) -> Result<bool, PromptError> {
        Ok(true)
    }
}

/// Asks a yes/no question for every match.
///
/// Only `y` (case-insensitive, surrounding whitespace ignored) applies the
/// replacement; any other answer skips it.
#[derive(Debug)]
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    /// Create a prompt reading answers from `input` and writing questions to
    /// `output`.
    #[must_use]
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl Prompt<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on the process console.
    #[must_use]
    pub fn console() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> ApplyPolicy for Prompt<R, W> {
    fn should_apply(&mut self, entry_name: &str) -> Result<bool, PromptError> {
        write!(self.output, "\nPatch {entry_name}? [y/n]: ")?;
        self.output.flush()?;

        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            return Err(PromptError::InputClosed);
        }

        let accepted = answer.trim().eq_ignore_ascii_case("y");
        if !accepted {
            writeln!(self.output, "Skipping...")?;
        }
        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::lower("y\n", true)]
    #[case::upper("Y\n", true)]
    #[case::padded("  y  \r\n", true)]
    #[case::no("n\n", false)]
    #[case::yes_word("yes\n", false)]
    #[case::blank("\n", false)]
    #[case::no_newline("y", true)]
    fn prompt_accepts_only_y(#[case] answer: &str, #[case] expected: bool) {
        let mut output = Vec::new();
        let mut prompt = Prompt::new(answer.as_bytes(), &mut output);

        let decision = prompt.should_apply("com/acme/Foo.class").expect("answer");

        assert_eq!(decision, expected);
        let text = String::from_utf8(output).expect("utf8");
        assert!(text.contains("Patch com/acme/Foo.class? [y/n]: "));
        assert_eq!(text.contains("Skipping..."), !expected);
    }

    #[test]
    fn prompt_reports_closed_input() {
        let mut prompt = Prompt::new(&b""[..], Vec::new());

        let err = prompt.should_apply("Foo.class").expect_err("must fail");

        assert!(matches!(err, PromptError::InputClosed));
    }

    #[test]
    fn prompt_reads_one_answer_per_question() {
        let mut prompt = Prompt::new(&b"y\nn\n"[..], Vec::new());

        assert!(prompt.should_apply("a/Foo.class").expect("first"));
        assert!(!prompt.should_apply("b/Foo.class").expect("second"));
        assert!(matches!(
            prompt.should_apply("c/Foo.class"),
            Err(PromptError::InputClosed)
        ));
    }

    #[test]
    fn auto_apply_accepts_everything() {
        assert!(AutoApply.should_apply("anything").expect("decision"));
    }
}
