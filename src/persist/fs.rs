//! Standard-filesystem adapter.

use super::{DirEntry, FileIo};
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// [`FileIo`] over `std::fs`.
///
/// Directory listings are sorted by file name so enumeration order is
/// deterministic across platforms.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFs;

impl FileIo for StdFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_entries(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::from)?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_directory: entry.file_type().is_dir(),
            });
        }
        Ok(entries)
    }

    fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        fs::write(path, bytes)
    }

    fn create_directory(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn delete_entry(&self, path: &Path) -> io::Result<()> {
        if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }
}
