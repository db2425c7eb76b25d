//! Window persistence.
//!
//! Windows live in a TOML file (`windows.toml`) as `[[windows]]` tables.
//! Every write goes to a sibling temp file that is renamed over the original,
//! so a reader never sees a half-written file. Read-modify-write sequences
//! (`prune`, `append`, `remove`) hold the store lock for their whole duration:
//! an in-process mutex plus an exclusive advisory lock on a sibling
//! `windows.toml.lock`, since every CLI command and the `run` loop are
//! separate processes sharing one file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, TimeZone};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::data_dir;
use crate::error::StoreError;
use crate::window::{new_window_id, TimeWindow};

const FILE_NAME: &str = "windows.toml";

/// Storage for mute windows.
pub struct WindowStore {
    path: PathBuf,
    lock: Mutex<()>,
}

/// Wrapper for serializing windows to TOML
#[derive(Default, Serialize, Deserialize)]
struct WindowsFile {
    #[serde(default)]
    windows: Vec<TimeWindow>,
}

impl WindowStore {
    /// Open the store in the application data directory.
    pub fn open() -> Result<Self, StoreError> {
        let dir = data_dir().map_err(|e| StoreError::DataDir(e.to_string()))?;
        Ok(Self::with_path(dir.join(FILE_NAME)))
    }

    /// Open a store backed by an explicit file.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored window. A missing file is an empty collection.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unavailable`] if the file cannot be read and
    /// [`StoreError::MalformedRecord`] if any record fails to parse.
    pub fn load(&self) -> Result<Vec<TimeWindow>, StoreError> {
        let _guard = self.guard();
        self.read()
    }

    /// Drop one-shot windows whose end is at or before `now` and persist the
    /// survivors. Weekly windows are always kept.
    pub fn prune<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<Vec<TimeWindow>, StoreError> {
        let _guard = self.exclusive()?;
        let windows = self.read()?;
        let before = windows.len();
        let kept: Vec<TimeWindow> = windows.into_iter().filter(|w| !w.has_expired(now)).collect();

        if kept.len() != before {
            self.write(&kept)?;
            info!(
                removed = before - kept.len(),
                remaining = kept.len(),
                "pruned expired mute windows"
            );
        }
        Ok(kept)
    }

    /// Store `window` under a fresh identifier and return the stored copy.
    pub fn append(&self, window: TimeWindow) -> Result<TimeWindow, StoreError> {
        let _guard = self.exclusive()?;
        let mut windows = self.read()?;
        let window = window.with_id(new_window_id());
        windows.push(window.clone());
        self.write(&windows)?;
        info!(id = window.id(), window = %window, "stored mute window");
        Ok(window)
    }

    /// Remove the window with `id`. Returns whether anything was removed.
    pub fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.exclusive()?;
        let mut windows = self.read()?;
        let before = windows.len();
        windows.retain(|w| w.id() != id);
        if windows.len() == before {
            return Ok(false);
        }
        self.write(&windows)?;
        info!(id, "removed mute window");
        Ok(true)
    }

    /// Look up a single window.
    pub fn get(&self, id: &str) -> Result<Option<TimeWindow>, StoreError> {
        Ok(self.load()?.into_iter().find(|w| w.id() == id))
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take the in-process mutex, then the cross-process file lock. Both are
    /// released when the guard drops.
    fn exclusive(&self) -> Result<StoreGuard<'_>, StoreError> {
        let local = self.guard();
        let lock_path = self.sibling_path(|name| format!("{name}.lock"));
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::unavailable(parent, e))?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| StoreError::unavailable(&lock_path, e))?;
        file.lock_exclusive()
            .map_err(|e| StoreError::unavailable(&lock_path, e))?;
        Ok(StoreGuard {
            _file: file,
            _local: local,
        })
    }

    fn read(&self) -> Result<Vec<TimeWindow>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::unavailable(&self.path, e)),
        };
        let file: WindowsFile =
            toml::from_str(&content).map_err(|e| StoreError::MalformedRecord {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        debug!(count = file.windows.len(), path = %self.path.display(), "loaded mute windows");
        Ok(file.windows)
    }

    fn write(&self, windows: &[TimeWindow]) -> Result<(), StoreError> {
        let file = WindowsFile {
            windows: windows.to_vec(),
        };
        let content = toml::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::unavailable(parent, e))?;
        }
        let tmp = self.temp_path();
        let result = write_synced(&tmp, content.as_bytes()).and_then(|()| fs::rename(&tmp, &self.path));
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::unavailable(&self.path, e));
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling_path(|name| format!(".{name}.{}.tmp", std::process::id()))
    }

    fn sibling_path(&self, make: impl FnOnce(&str) -> String) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| FILE_NAME.to_string());
        self.path.with_file_name(make(&name))
    }
}

/// Held for a whole read-modify-write. Dropping the file handle releases the
/// advisory lock.
struct StoreGuard<'a> {
    _file: fs::File,
    _local: MutexGuard<'a, ()>,
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::CivilTime;
    use crate::window::WindowId;
    use chrono::Utc;

    fn ids(windows: &[TimeWindow]) -> Vec<WindowId> {
        windows.iter().map(|w| w.id().to_string()).collect()
    }

    fn store() -> (tempfile::TempDir, WindowStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = WindowStore::with_path(dir.path().join(FILE_NAME));
        (dir, store)
    }

    fn window(day: u32, repeat: bool) -> TimeWindow {
        TimeWindow::new(
            CivilTime::new(2024, 1, day, 10, 0),
            CivilTime::new(2024, 1, day, 12, 0),
            repeat,
        )
        .unwrap()
    }

    #[test]
    fn missing_file_loads_empty() {
        let (_dir, store) = store();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn append_assigns_fresh_id_and_persists() {
        let (_dir, store) = store();
        let original = window(1, false);
        let stored = store.append(original.clone()).unwrap();
        assert_ne!(stored.id(), original.id());

        let loaded = store.load().unwrap();
        assert_eq!(loaded, vec![stored]);
    }

    #[test]
    fn prune_drops_expired_one_shots_only() {
        let (_dir, store) = store();
        let expired = store.append(window(1, false)).unwrap();
        let weekly = store.append(window(1, true)).unwrap();
        let future = store.append(window(5, false)).unwrap();

        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let kept = store.prune(&now).unwrap();
        assert_eq!(ids(&kept), vec![weekly.id().to_string(), future.id().to_string()]);

        // On-disk state matches.
        assert_eq!(store.load().unwrap(), kept);
        assert!(store.get(expired.id()).unwrap().is_none());
    }

    #[test]
    fn prune_removes_window_ending_exactly_now() {
        let (_dir, store) = store();
        store.append(window(1, false)).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert!(store.prune(&now).unwrap().is_empty());
    }

    #[test]
    fn prune_is_idempotent() {
        let (_dir, store) = store();
        store.append(window(1, false)).unwrap();
        store.append(window(3, false)).unwrap();
        store.append(window(1, true)).unwrap();

        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let first = store.prune(&now).unwrap();
        let second = store.prune(&now).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn remove_reports_whether_anything_changed() {
        let (_dir, store) = store();
        let w = store.append(window(1, true)).unwrap();
        assert!(!store.remove("no-such-id").unwrap());
        assert!(store.remove(w.id()).unwrap());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn malformed_record_fails_the_whole_load() {
        let (_dir, store) = store();
        store.append(window(1, true)).unwrap();

        let mut content = fs::read_to_string(store.path()).unwrap();
        content.push_str(
            "\n[[windows]]\nid = \"bad\"\nstart_year = 2024\nstart_month = 2\nstart_day = 30\n\
             start_hour = 9\nstart_minute = 0\nend_year = 2024\nend_month = 3\nend_day = 1\n\
             end_hour = 9\nend_minute = 0\nrepeat_weekly = false\n",
        );
        fs::write(store.path(), content).unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::MalformedRecord { .. }));
    }

    #[test]
    fn unreadable_path_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be.
        let store = WindowStore::with_path(dir.path());
        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
    }

    #[test]
    fn write_leaves_no_temp_file_behind() {
        let (dir, store) = store();
        store.append(window(1, true)).unwrap();
        let mut names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![FILE_NAME.to_string(), format!("{FILE_NAME}.lock")]);
    }

    #[test]
    fn separate_handles_on_one_file_do_not_lose_appends() {
        let (dir, _store) = store();
        let path = dir.path().join(FILE_NAME);
        let handles: Vec<_> = (0..6)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    // Each thread opens its own store, as separate processes do.
                    let store = WindowStore::with_path(path);
                    for _ in 0..4 {
                        store.append(window(1 + i, i % 2 == 0)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(WindowStore::with_path(path).load().unwrap().len(), 24);
    }

    #[test]
    fn lock_path_under_a_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let store = WindowStore::with_path(blocker.join(FILE_NAME));
        let err = store.append(window(1, true)).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
    }
}
