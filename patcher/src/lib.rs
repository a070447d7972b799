//! Archive patcher library.
//!
//! This crate replaces entries inside JAR and ZIP archives with files taken
//! from a patch directory. Unmatched entries are copied through unchanged,
//! the rewrite goes to a temporary sibling file, and the original archive is
//! only replaced once that rewrite has fully succeeded. It is used by the
//! `archive-patcher` CLI binary and can be driven programmatically.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Settings file loading and precedence rules
//! - [`error`] - Error types for the patch flow
//! - [`patch`] - End-to-end patch orchestration
//! - [`policy`] - Per-entry confirmation policies
//! - [`replacement`] - Replacement catalogue built from the patch directory
//! - [`rewriter`] - Streaming archive rewrite
//! - [`swap`] - Temporary archive lifecycle and the in-place swap
//! - [`transfer`] - Bounded-buffer byte copying

pub mod cli;
pub mod config;
pub mod error;
pub mod patch;
pub mod policy;
pub mod replacement;
pub mod rewriter;
pub mod swap;
pub mod transfer;
