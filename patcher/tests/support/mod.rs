//! Test support utilities for archive patcher behavioural tests.
//!
//! Helpers here build small ZIP archives on disk and read them back so step
//! definitions can compare entry contents and whole-file digests.

use camino::Utf8Path;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Content written for an entry when an archive is built from names only.
pub fn original_content(name: &str) -> Vec<u8> {
    format!("original bytes of {name}").into_bytes()
}

/// Writes a deflated archive at `path` with one entry per name.
pub fn write_archive(path: &Utf8Path, names: &[String]) {
    let file = File::create(path).expect("failed to create archive");
    let mut writer = ZipWriter::new(file);
    for name in names {
        writer
            .start_file(name.as_str(), SimpleFileOptions::default())
            .expect("failed to start entry");
        writer
            .write_all(&original_content(name))
            .expect("failed to write entry");
    }
    writer.finish().expect("failed to finish archive");
}

/// Returns the entry names of the archive at `path`, in archive order.
pub fn entry_names(path: &Utf8Path) -> Vec<String> {
    let mut archive = open(path);
    (0..archive.len())
        .map(|index| {
            archive
                .by_index_raw(index)
                .expect("failed to read entry")
                .name()
                .to_owned()
        })
        .collect()
}

/// Reads the decompressed content of `name` from the archive at `path`.
pub fn read_entry(path: &Utf8Path, name: &str) -> Vec<u8> {
    let mut archive = open(path);
    let mut entry = archive.by_name(name).expect("entry missing from archive");
    let mut data = Vec::new();
    entry.read_to_end(&mut data).expect("failed to read entry");
    data
}

/// Returns the SHA-256 digest of the file at `path` as lowercase hex.
pub fn sha256_file(path: &Utf8Path) -> String {
    let bytes = fs::read(path).expect("failed to read file");
    Sha256::digest(bytes)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

fn open(path: &Utf8Path) -> ZipArchive<File> {
    let file = File::open(path).expect("failed to open archive");
    ZipArchive::new(file).expect("archive is not a readable zip")
}
