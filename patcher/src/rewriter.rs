//! Streaming archive rewrite.
//!
//! [`ArchiveRewriter`] reads every entry of a source archive in its native
//! order and writes a new archive:
//!
//! - entries with no matching replacement are read through once to check
//!   their CRC, then copied raw, so their compressed bytes, CRC, sizes and
//!   timestamps are carried over unchanged;
//! - matched entries are rewritten under the same entry name with the full
//!   contents of the replacement file, streamed through a bounded buffer.
//!
//! The pass is linear and all-or-nothing. Any read, write or decision error
//! aborts the rewrite, and [`ArchiveRewriter::rewrite`] removes the partial
//! output before returning. Once a rewrite has failed, nothing more reaches
//! the destination, including the trailer `ZipWriter` writes when dropped.

use std::cell::Cell;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::rc::Rc;

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::policy::{ApplyPolicy, PromptError};
use crate::replacement::{ReplacementCandidate, ReplacementSet};
use crate::transfer::TransferBuffer;

/// Entries at or above this size need ZIP64 headers.
const ZIP64_THRESHOLD: u64 = 0xFFFF_FFFF;

/// Errors that abort a rewrite.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// The destination archive could not be created.
    #[error("cannot create {path}: {source}")]
    DestWrite {
        /// Destination path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A source entry could not be read or failed its CRC check.
    #[error("cannot read entry #{index} of the source archive: {source}")]
    SourceRead {
        /// Position of the entry in the source archive.
        index: usize,
        /// Underlying archive error.
        #[source]
        source: ZipError,
    },

    /// A replacement file could not be opened or streamed into its entry.
    #[error("cannot stream replacement {path} into {entry}: {source}")]
    ReplacementStream {
        /// Entry being replaced.
        entry: String,
        /// Replacement file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A replacement entry could not be started in the output archive.
    #[error("cannot write entry {entry}: {source}")]
    EntryWrite {
        /// Entry being written.
        entry: String,
        /// Underlying archive error.
        #[source]
        source: ZipError,
    },

    /// An unmodified entry could not be copied into the output archive.
    #[error("cannot copy entry {entry}: {source}")]
    EntryCopy {
        /// Entry being copied.
        entry: String,
        /// Underlying archive error.
        #[source]
        source: ZipError,
    },

    /// The output archive could not be finalised and flushed.
    #[error("cannot finish writing the archive: {source}")]
    Flush {
        /// Underlying archive error.
        #[source]
        source: ZipError,
    },

    /// No decision could be obtained for a matched entry.
    #[error("no decision for {entry}: {source}")]
    Decision {
        /// Entry awaiting a decision.
        entry: String,
        /// Underlying prompt error.
        #[source]
        source: PromptError,
    },
}

/// Summary of a successful rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    replaced: Vec<String>,
    declined: Vec<String>,
    copied: usize,
}

impl RewriteOutcome {
    /// Number of entries whose content was replaced.
    #[must_use]
    pub fn replaced(&self) -> usize {
        self.replaced.len()
    }

    /// Names of replaced entries, in archive order.
    #[must_use]
    pub fn replaced_entries(&self) -> &[String] {
        &self.replaced
    }

    /// Names of matched entries the policy declined, in archive order.
    #[must_use]
    pub fn declined_entries(&self) -> &[String] {
        &self.declined
    }

    /// Number of entries copied unmodified, declined ones included.
    #[must_use]
    pub const fn copied(&self) -> usize {
        self.copied
    }

    /// Returns true if the output is a verbatim copy of the source.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.replaced.is_empty()
    }
}

/// Rewrites archives, substituting entries that match a [`ReplacementSet`].
#[derive(Debug)]
pub struct ArchiveRewriter<'a, P> {
    replacements: &'a ReplacementSet,
    policy: P,
}

impl<'a, P: ApplyPolicy> ArchiveRewriter<'a, P> {
    /// Create a rewriter that consults `policy` before each replacement.
    #[must_use]
    pub const fn new(replacements: &'a ReplacementSet, policy: P) -> Self {
        Self {
            replacements,
            policy,
        }
    }

    /// Rewrite `source` into a new archive at `dest`.
    ///
    /// `dest` is created or truncated. The file is flushed and synced before
    /// returning so it is ready to be swapped in place of the original. On
    /// failure the partially written file is removed.
    ///
    /// # Errors
    ///
    /// Returns [`RewriteError::DestWrite`] if `dest` cannot be created, and
    /// any error from [`Self::rewrite_into`].
    pub fn rewrite<R: Read + Seek>(
        &mut self,
        source: &mut ZipArchive<R>,
        dest: &Utf8Path,
    ) -> Result<RewriteOutcome, RewriteError> {
        let file = File::create(dest).map_err(|e| RewriteError::DestWrite {
            path: dest.to_owned(),
            source: e,
        })?;

        let result = self
            .rewrite_into(source, BufWriter::new(file))
            .and_then(|(outcome, writer)| {
                sync_output(writer)?;
                Ok(outcome)
            });

        if result.is_err() {
            discard_partial(dest);
        }
        result
    }

    /// Rewrite `source` into `writer`, returning the outcome and the writer.
    ///
    /// # Errors
    ///
    /// Returns a [`RewriteError`] describing the first failure; no further
    /// entries are processed after it and nothing more is written.
    pub fn rewrite_into<R, W>(
        &mut self,
        source: &mut ZipArchive<R>,
        writer: W,
    ) -> Result<(RewriteOutcome, W), RewriteError>
    where
        R: Read + Seek,
        W: Write + Seek,
    {
        let failed = Rc::new(Cell::new(false));
        let mut output = ZipWriter::new(AbortableSink::new(writer, Rc::clone(&failed)));

        let outcome = match self.write_entries(source, &mut output) {
            Ok(outcome) => outcome,
            Err(e) => {
                failed.set(true);
                return Err(e);
            }
        };

        let sink = output
            .finish()
            .map_err(|e| RewriteError::Flush { source: e })?;
        Ok((outcome, sink.inner))
    }

    fn write_entries<R, W>(
        &mut self,
        source: &mut ZipArchive<R>,
        output: &mut ZipWriter<W>,
    ) -> Result<RewriteOutcome, RewriteError>
    where
        R: Read + Seek,
        W: Write + Seek,
    {
        let replacements = self.replacements;
        let mut buffer = TransferBuffer::new();
        let mut outcome = RewriteOutcome::default();

        for index in 0..source.len() {
            let header = EntryHeader::read(source, index)?;
            debug!("{}", header.name);

            let matched = if header.is_dir {
                None
            } else {
                replacements.match_entry(&header.name)
            };

            let Some(candidate) = matched else {
                copy_unmodified(source, index, &header.name, output, &mut buffer)?;
                outcome.copied += 1;
                continue;
            };

            if !self.decide(&header.name)? {
                copy_unmodified(source, index, &header.name, output, &mut buffer)?;
                outcome.copied += 1;
                outcome.declined.push(header.name);
                continue;
            }

            let request = ReplacementRequest {
                entry: &header.name,
                candidate,
                method: header.method,
                unix_mode: header.unix_mode,
            };
            write_replacement(output, &request, &mut buffer)?;
            info!("{} patched with {}", header.name, candidate.path());
            outcome.replaced.push(header.name);
        }

        Ok(outcome)
    }

    fn decide(&mut self, entry: &str) -> Result<bool, RewriteError> {
        self.policy
            .should_apply(entry)
            .map_err(|e| RewriteError::Decision {
                entry: entry.to_owned(),
                source: e,
            })
    }
}

/// Central-directory facts about one source entry.
struct EntryHeader {
    name: String,
    is_dir: bool,
    method: CompressionMethod,
    unix_mode: Option<u32>,
}

impl EntryHeader {
    fn read<R: Read + Seek>(
        source: &mut ZipArchive<R>,
        index: usize,
    ) -> Result<Self, RewriteError> {
        let entry = source
            .by_index_raw(index)
            .map_err(|e| RewriteError::SourceRead { index, source: e })?;
        Ok(Self {
            name: entry.name().to_owned(),
            is_dir: entry.is_dir(),
            method: entry.compression(),
            unix_mode: entry.unix_mode(),
        })
    }
}

/// Metadata carried from a matched source entry to its replacement.
struct ReplacementRequest<'a> {
    entry: &'a str,
    candidate: &'a ReplacementCandidate,
    method: CompressionMethod,
    unix_mode: Option<u32>,
}

/// Check the entry's CRC by reading it through, then copy it raw.
///
/// A raw copy never decompresses, so without the read a corrupted entry
/// would be carried into the new archive unnoticed.
fn copy_unmodified<R, W>(
    source: &mut ZipArchive<R>,
    index: usize,
    name: &str,
    output: &mut ZipWriter<W>,
    buffer: &mut TransferBuffer,
) -> Result<(), RewriteError>
where
    R: Read + Seek,
    W: Write + Seek,
{
    let source_read = |e| RewriteError::SourceRead { index, source: e };

    let mut entry = source.by_index(index).map_err(source_read)?;
    buffer
        .copy(&mut entry, &mut io::sink())
        .map_err(|e| source_read(ZipError::Io(e)))?;
    drop(entry);

    let raw = source.by_index_raw(index).map_err(source_read)?;
    output
        .raw_copy_file(raw)
        .map_err(|e| RewriteError::EntryCopy {
            entry: name.to_owned(),
            source: e,
        })
}

fn write_replacement<W: Write + Seek>(
    output: &mut ZipWriter<W>,
    request: &ReplacementRequest<'_>,
    buffer: &mut TransferBuffer,
) -> Result<(), RewriteError> {
    let path = request.candidate.path();
    let read_error = |source| RewriteError::ReplacementStream {
        entry: request.entry.to_owned(),
        path: path.to_owned(),
        source,
    };

    let mut file = File::open(path).map_err(read_error)?;
    let len = file.metadata().map_err(read_error)?.len();

    output
        .start_file(request.entry, replacement_options(request, len))
        .map_err(|e| RewriteError::EntryWrite {
            entry: request.entry.to_owned(),
            source: e,
        })?;

    buffer.copy(&mut file, output).map_err(read_error)?;
    Ok(())
}

/// Stored entries stay stored; everything else is written deflated.
fn replacement_options(request: &ReplacementRequest<'_>, len: u64) -> SimpleFileOptions {
    let method = match request.method {
        CompressionMethod::Stored => CompressionMethod::Stored,
        _ => CompressionMethod::Deflated,
    };
    let options = SimpleFileOptions::default()
        .compression_method(method)
        .large_file(len >= ZIP64_THRESHOLD);

    request
        .unix_mode
        .map_or(options, |mode| options.unix_permissions(mode))
}

/// Destination wrapper that goes quiet once the rewrite has failed.
///
/// After the shared flag is raised, or after the first I/O error from the
/// inner writer, writes and seeks succeed without touching the destination.
/// Dropping an unfinished `ZipWriter` then cannot append a trailer to the
/// doomed output or report a second failure.
#[derive(Debug)]
struct AbortableSink<W> {
    inner: W,
    failed: Rc<Cell<bool>>,
    position: u64,
}

impl<W: Write + Seek> AbortableSink<W> {
    const fn new(inner: W, failed: Rc<Cell<bool>>) -> Self {
        Self {
            inner,
            failed,
            position: 0,
        }
    }

    fn track<T>(&mut self, result: io::Result<T>) -> io::Result<T> {
        if result.is_err() {
            self.failed.set(true);
        }
        result
    }
}

impl<W: Write + Seek> Write for AbortableSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.failed.get() {
            self.position = self.position.saturating_add(buf.len() as u64);
            return Ok(buf.len());
        }
        let result = self.inner.write(buf);
        if let Ok(written) = result {
            self.position = self.position.saturating_add(written as u64);
        }
        self.track(result)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.failed.get() {
            return Ok(());
        }
        let result = self.inner.flush();
        self.track(result)
    }
}

impl<W: Write + Seek> Seek for AbortableSink<W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if self.failed.get() {
            self.position = match pos {
                SeekFrom::Start(offset) => offset,
                SeekFrom::Current(delta) => self.position.saturating_add_signed(delta),
                SeekFrom::End(_) => self.position,
            };
            return Ok(self.position);
        }
        let result = self.inner.seek(pos);
        if let Ok(offset) = result {
            self.position = offset;
        }
        self.track(result)
    }
}

fn sync_output(writer: BufWriter<File>) -> Result<(), RewriteError> {
    let file = writer
        .into_inner()
        .map_err(|e| RewriteError::Flush {
            source: ZipError::Io(e.into_error()),
        })?;
    file.sync_all().map_err(|e| RewriteError::Flush {
        source: ZipError::Io(e),
    })
}

fn discard_partial(dest: &Utf8Path) {
    match fs::remove_file(dest) {
        Ok(()) => debug!("removed partial archive {dest}"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("failed to remove partial archive {dest}: {e}"),
    }
}

#[cfg(test)]
#[path = "rewriter_tests.rs"]
mod tests;
