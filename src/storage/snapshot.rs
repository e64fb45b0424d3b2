//! Snapshot Persistence
//!
//! The whole mapping is written as one JSON document. Writes go to a sibling
//! temp file which is fsynced and then renamed over the target, so a reader
//! sees either the previous snapshot or the new one, never a partial file.
//!
//! ## Format
//!
//! ```text
//! {
//!   "version": 1,
//!   "entries": {
//!     "name": { "value": { "type": "string", "data": "Ariz" }, "expires_at": null, "raw_ttl": null }
//!   }
//! }
//! ```
//!
//! Loading never fails: a missing file means "no prior state" and a file that
//! cannot be decoded is logged and ignored.

use crate::storage::entry::Entry;
use crate::storage::error::StoreResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Snapshot file used when the caller does not pick one.
pub const DEFAULT_SNAPSHOT_PATH: &str = "snapkv_state.json";

/// Current snapshot format version.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    entries: &'a HashMap<String, Entry>,
}

#[derive(Deserialize)]
struct SnapshotFile {
    version: u32,
    entries: HashMap<String, Entry>,
}

/// Writes `entries` to `path`, replacing any existing snapshot.
pub fn save(entries: &HashMap<String, Entry>, path: &Path) -> StoreResult<()> {
    let bytes = serde_json::to_vec(&SnapshotRef {
        version: SNAPSHOT_VERSION,
        entries,
    })?;

    let tmp = temp_path(path);
    if let Err(e) = write_synced(&tmp, &bytes).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    debug!(
        path = %path.display(),
        keys = entries.len(),
        bytes = bytes.len(),
        "Snapshot written"
    );
    Ok(())
}

/// Reads the snapshot at `path`.
///
/// Returns an empty mapping if the file does not exist or cannot be decoded.
pub fn load(path: &Path) -> HashMap<String, Entry> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No snapshot found, starting empty");
            return HashMap::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read snapshot, starting empty");
            return HashMap::new();
        }
    };

    match serde_json::from_slice::<SnapshotFile>(&bytes) {
        Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => {
            info!(
                path = %path.display(),
                keys = snapshot.entries.len(),
                "Snapshot loaded"
            );
            snapshot.entries
        }
        Ok(snapshot) => {
            warn!(
                path = %path.display(),
                version = snapshot.version,
                "Unsupported snapshot version, starting empty"
            );
            HashMap::new()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed snapshot, starting empty");
            HashMap::new()
        }
    }
}

/// Returns the temp file a snapshot for `path` is staged in.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("snapshot"));
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::entry::Value;
    use std::collections::BTreeSet;
    use std::time::{Duration, SystemTime};

    fn sample() -> HashMap<String, Entry> {
        let mut entries = HashMap::new();
        entries.insert("name".to_string(), Entry::new(Value::from("Ariz")));
        entries.insert(
            "list".to_string(),
            Entry::new(Value::from(vec!["a", "b", "a"])),
        );
        let set: BTreeSet<String> = ["x", "y"].iter().map(|s| s.to_string()).collect();
        entries.insert(
            "session".to_string(),
            Entry::with_ttl(
                Value::from(set),
                60,
                SystemTime::UNIX_EPOCH + Duration::from_millis(1_700_000_000_123),
            )
            .unwrap(),
        );
        entries
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let entries = sample();

        save(&entries, &path).unwrap();
        assert_eq!(load(&path), entries);
    }

    #[test]
    fn test_save_overwrites_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        save(&sample(), &path).unwrap();
        save(&HashMap::new(), &path).unwrap();

        assert!(load(&path).is_empty());
        assert!(!temp_path(&path).exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("nope.json")).is_empty());
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        fs::write(&path, b"not json at all").unwrap();
        assert!(load(&path).is_empty());
    }

    #[test]
    fn test_load_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        save(&sample(), &path).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        assert!(load(&path).is_empty());
    }

    #[test]
    fn test_load_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        fs::write(&path, br#"{"version": 99, "entries": {}}"#).unwrap();
        assert!(load(&path).is_empty());
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("state.json");

        assert!(save(&sample(), &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let path = Path::new("/var/lib/snapkv/state.json");
        assert_eq!(temp_path(path), Path::new("/var/lib/snapkv/state.json.tmp"));
    }
}
