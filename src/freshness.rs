// src/freshness.rs
use crate::error::ServeError;
use crate::fs::FileSystem;
use serde::{Deserialize, Serialize, Serializer};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, trace, warn};

/// The latest modification time across the watch set, in seconds since the UNIX epoch.
///
/// Zero doubles as the "unknown" sentinel on the client side, and is what an
/// empty watch set reports.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[serde(transparent)]
pub struct Marker(pub f64);

impl Marker {
    /// No files observed yet.
    pub const UNSET: Marker = Marker(0.0);

    /// Converts a file timestamp into a marker. Times before the epoch clamp to zero.
    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(elapsed) => Marker(elapsed.as_secs_f64()),
            Err(_) => Marker::UNSET,
        }
    }

    pub fn is_unset(&self) -> bool {
        self.0 == 0.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

impl Serialize for Marker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Whole seconds go out as integers so an empty set renders `0`, not `0.0`.
        if self.0.fract() == 0.0 && self.0 >= 0.0 && self.0 < u64::MAX as f64 {
            serializer.serialize_u64(self.0 as u64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

/// Body of the `/status` endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub last_modified: Marker,
}

/// Scans `dir` for files with `extension` and returns the newest modification time.
///
/// Nothing is cached: every call lists the directory and stats every match.
/// A file that vanishes or cannot be stat'ed between listing and stat is
/// skipped, since an editor replacing a file can briefly leave it missing.
///
/// # Errors
///
/// Returns [`ServeError::Scan`] if the directory itself cannot be listed.
pub fn compute_marker(
    fs: &dyn FileSystem,
    dir: &Path,
    extension: &str,
) -> Result<Marker, ServeError> {
    let files = fs
        .list_matching(dir, extension)
        .map_err(|source| ServeError::Scan {
            dir: dir.to_path_buf(),
            source,
        })?;

    let mut latest = Marker::UNSET;
    for file in &files {
        match fs.modified(file) {
            Ok(time) => {
                let marker = Marker::from_system_time(time);
                trace!("{} modified at {}", file.display(), marker.0);
                if marker > latest {
                    latest = marker;
                }
            }
            Err(e) => {
                debug!("Skipping {} during freshness scan: {}", file.display(), e);
            }
        }
    }
    Ok(latest)
}

/// Computes the status body, reporting a zero marker if the scan fails.
///
/// Runs on every poll, so a persistent failure is logged at warn level.
pub fn current_status(fs: &dyn FileSystem, dir: &Path, extension: &str) -> Status {
    let last_modified = compute_marker(fs, dir, extension).unwrap_or_else(|e| {
        warn!("Freshness scan failed, reporting 0: {}", e);
        Marker::UNSET
    });
    Status { last_modified }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory file system keyed by path. A `None` mtime fails stat.
    #[derive(Default)]
    struct MemFs {
        files: Mutex<BTreeMap<PathBuf, Option<u64>>>,
        broken: bool,
    }

    impl MemFs {
        fn set(&self, name: &str, mtime: Option<u64>) {
            self.files
                .lock()
                .unwrap()
                .insert(PathBuf::from("/site").join(name), mtime);
        }
    }

    impl FileSystem for MemFs {
        fn list_matching(&self, _dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
            if self.broken {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
            }
            Ok(self
                .files
                .lock()
                .unwrap()
                .keys()
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(extension))
                .cloned()
                .collect())
        }

        fn is_file(&self, path: &Path) -> bool {
            self.files.lock().unwrap().contains_key(path)
        }

        fn read(&self, _path: &Path) -> io::Result<Vec<u8>> {
            Ok(Vec::new())
        }

        fn modified(&self, path: &Path) -> io::Result<SystemTime> {
            match self.files.lock().unwrap().get(path) {
                Some(Some(secs)) => Ok(UNIX_EPOCH + Duration::from_secs(*secs)),
                _ => Err(io::Error::new(io::ErrorKind::NotFound, "vanished")),
            }
        }

        fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
            Ok(path.to_path_buf())
        }
    }

    fn marker(fs: &MemFs) -> Marker {
        compute_marker(fs, Path::new("/site"), "html").unwrap()
    }

    #[test]
    fn empty_watch_set_is_zero() {
        let fs = MemFs::default();
        fs.set("style.css", Some(500));
        assert_eq!(marker(&fs), Marker::UNSET);
    }

    #[test]
    fn marker_is_maximum_across_watch_set() {
        let fs = MemFs::default();
        fs.set("index.html", Some(100));
        fs.set("about.html", Some(150));
        fs.set("app.js", Some(900));
        assert_eq!(marker(&fs), Marker(150.0));
    }

    #[test]
    fn repeated_queries_are_idempotent() {
        let fs = MemFs::default();
        fs.set("index.html", Some(100));
        assert_eq!(marker(&fs), marker(&fs));
    }

    #[test]
    fn marker_advances_when_a_file_is_touched() {
        let fs = MemFs::default();
        fs.set("index.html", Some(100));
        fs.set("about.html", Some(120));
        let before = marker(&fs);
        fs.set("index.html", Some(130));
        let after = marker(&fs);
        assert!(after >= before);
        assert_eq!(after, Marker(130.0));
    }

    #[test]
    fn new_files_are_picked_up_without_restart() {
        let fs = MemFs::default();
        fs.set("index.html", Some(100));
        assert_eq!(marker(&fs), Marker(100.0));
        fs.set("new.html", Some(200));
        assert_eq!(marker(&fs), Marker(200.0));
    }

    #[test]
    fn file_vanishing_mid_scan_is_skipped() {
        let fs = MemFs::default();
        fs.set("index.html", Some(100));
        fs.set("replaced.html", None);
        assert_eq!(marker(&fs), Marker(100.0));
    }

    #[test]
    fn scan_failure_reports_zero_status() {
        let fs = MemFs {
            broken: true,
            ..Default::default()
        };
        assert!(compute_marker(&fs, Path::new("/site"), "html").is_err());
        let status = current_status(&fs, Path::new("/site"), "html");
        assert_eq!(status.last_modified, Marker::UNSET);
    }

    #[test]
    fn status_serializes_with_camel_case_key() {
        let zero = Status {
            last_modified: Marker::UNSET,
        };
        assert_eq!(serde_json::to_string(&zero).unwrap(), r#"{"lastModified":0}"#);

        let fractional = Status {
            last_modified: Marker(1700000000.5),
        };
        assert_eq!(
            serde_json::to_string(&fractional).unwrap(),
            r#"{"lastModified":1700000000.5}"#
        );

        let parsed: Status = serde_json::from_str(r#"{"lastModified":150}"#).unwrap();
        assert_eq!(parsed.last_modified, Marker(150.0));
    }

    #[test]
    fn pre_epoch_times_clamp_to_zero() {
        let before = UNIX_EPOCH - Duration::from_secs(10);
        assert!(Marker::from_system_time(before).is_unset());
    }
}
