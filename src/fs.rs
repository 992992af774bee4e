// src/fs.rs
//! File system access used by the responder and the freshness scan.
//!
//! Kept behind a trait so request handling can be exercised against an
//! in-memory or failing implementation in tests.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// The three file operations the server needs, plus an existence check.
pub trait FileSystem: Send + Sync {
    /// Lists regular files directly inside `dir` whose extension equals `extension`.
    ///
    /// Not recursive. The comparison is case-sensitive.
    fn list_matching(&self, dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>>;

    /// Returns `true` if `path` names an existing regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Reads the whole file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Returns the file's last modification time.
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    /// Resolves symlinks and relative components into an absolute path.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// [`FileSystem`] backed by the local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn list_matching(&self, dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
        let mut matches = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
                continue;
            }
            // An entry removed mid-scan just drops out of the listing.
            match entry.file_type() {
                Ok(ft) if ft.is_file() || (ft.is_symlink() && path.is_file()) => {
                    matches.push(path)
                }
                _ => {}
            }
        }
        matches.sort();
        Ok(matches)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }
}
