//! Bounded stream copying.
//!
//! Replacement files are streamed into the output archive through a fixed
//! scratch buffer so arbitrarily large entries never have to fit in memory.

use std::io::{self, Read, Write};

/// Size of the scratch buffer used for streaming copies.
pub const TRANSFER_BUFFER_SIZE: usize = 8 * 1024;

/// A fixed-size scratch buffer reused across stream copies.
///
/// The buffer carries no state from one copy to the next; only the byte
/// count of each copy is reported back to the caller.
pub struct TransferBuffer {
    scratch: Box<[u8; TRANSFER_BUFFER_SIZE]>,
}

impl TransferBuffer {
    /// Allocate a new scratch buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scratch: Box::new([0; TRANSFER_BUFFER_SIZE]),
        }
    }

    /// Copy everything from `reader` into `writer`, returning the byte count.
    ///
    /// Reads interrupted by a signal are retried.
    ///
    /// # Errors
    ///
    /// Returns the first read or write error encountered.
    pub fn copy<R, W>(&mut self, reader: &mut R, writer: &mut W) -> io::Result<u64>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let mut total = 0u64;
        loop {
            let read = match reader.read(self.scratch.as_mut_slice()) {
                Ok(0) => return Ok(total),
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            let chunk = self.scratch.get(..read).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "reader overran buffer")
            })?;
            writer.write_all(chunk)?;
            total += read as u64;
        }
    }
}

impl Default for TransferBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransferBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferBuffer")
            .field("capacity", &TRANSFER_BUFFER_SIZE)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    /// Reader that hands out at most `chunk` bytes per call and fails once.
    struct StutteringReader {
        data: Cursor<Vec<u8>>,
        chunk: usize,
        interrupted: bool,
    }

    impl Read for StutteringReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::ErrorKind::Interrupted.into());
            }
            let limit = buf.len().min(self.chunk);
            let window = buf.get_mut(..limit).unwrap_or_default();
            self.data.read(window)
        }
    }

    #[rstest]
    #[case::empty(0)]
    #[case::smaller_than_buffer(100)]
    #[case::exactly_one_buffer(TRANSFER_BUFFER_SIZE)]
    #[case::several_buffers(TRANSFER_BUFFER_SIZE * 3 + 17)]
    fn copies_every_byte(#[case] len: usize) {
        let data: Vec<u8> = (0..=250u8).cycle().take(len).collect();
        let mut out = Vec::new();

        let copied = TransferBuffer::new()
            .copy(&mut data.as_slice(), &mut out)
            .expect("copy");

        assert_eq!(copied, u64::try_from(len).expect("length fits u64"));
        assert_eq!(out, data);
    }

    #[test]
    fn retries_interrupted_reads() {
        let mut reader = StutteringReader {
            data: Cursor::new(b"hello world".to_vec()),
            chunk: 3,
            interrupted: false,
        };
        let mut out = Vec::new();

        let copied = TransferBuffer::new()
            .copy(&mut reader, &mut out)
            .expect("copy");

        assert_eq!(copied, 11);
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn buffer_is_reusable_between_copies() {
        let mut buffer = TransferBuffer::new();
        let mut first = Vec::new();
        let mut second = Vec::new();

        buffer
            .copy(&mut &b"first payload"[..], &mut first)
            .expect("first copy");
        buffer.copy(&mut &b"2nd"[..], &mut second).expect("second copy");

        assert_eq!(first, b"first payload");
        assert_eq!(second, b"2nd");
    }
}
