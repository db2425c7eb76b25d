//! Window file watcher.
//!
//! Every `window add|add-at|remove` runs in its own process, so a running
//! `run` loop learns about edits by watching `windows.toml`. The parent
//! directory is watched because writes land as a rename over the file.

use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Quiet period before a burst of writes is reported as one change.
const DEBOUNCE_TIMEOUT: Duration = Duration::from_millis(250);

/// Keeps the OS watch alive; dropping it stops notifications.
pub struct WindowFileWatcher {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

/// Start watching `path`. The receiver yields once per debounced batch of
/// changes touching that file.
pub fn watch_window_file(
    path: &Path,
) -> Result<(WindowFileWatcher, mpsc::Receiver<()>), Box<dyn std::error::Error>> {
    let name = path
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| format!("not a file path: {}", path.display()))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => std::env::current_dir()?,
    };

    // One pending change is enough: the restart reloads everything.
    let (tx, rx) = mpsc::channel(1);
    let mut debouncer = new_debouncer(
        DEBOUNCE_TIMEOUT,
        None,
        move |result: DebounceEventResult| match result {
            Ok(events) => {
                if events.iter().any(|e| touches_file(&e.event, &name)) {
                    debug!("window file changed");
                    let _ = tx.try_send(());
                }
            }
            Err(errors) => {
                for e in errors {
                    error!(error = %e, "window file watcher error");
                }
            }
        },
    )?;
    debouncer.watch(&dir, RecursiveMode::NonRecursive)?;

    Ok((
        WindowFileWatcher {
            _debouncer: debouncer,
        },
        rx,
    ))
}

/// Whether `event` changes the contents of the file called `name`.
fn touches_file(event: &notify::Event, name: &OsString) -> bool {
    let changes_content = match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    };
    changes_content
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(name.as_os_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RenameMode};
    use std::path::PathBuf;

    fn event(kind: EventKind, paths: &[&str]) -> notify::Event {
        let mut ev = notify::Event::new(kind);
        ev.paths = paths.iter().map(PathBuf::from).collect();
        ev
    }

    fn name() -> OsString {
        OsString::from("windows.toml")
    }

    #[test]
    fn rename_over_the_file_counts() {
        let ev = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/d/.windows.toml.42.tmp", "/d/windows.toml"],
        );
        assert!(touches_file(&ev, &name()));
    }

    #[test]
    fn data_writes_and_creation_count() {
        let write = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/d/windows.toml"],
        );
        let create = event(EventKind::Create(CreateKind::File), &["/d/windows.toml"]);
        assert!(touches_file(&write, &name()));
        assert!(touches_file(&create, &name()));
    }

    #[test]
    fn other_files_and_reads_are_ignored() {
        let lock = event(EventKind::Create(CreateKind::File), &["/d/windows.toml.lock"]);
        let config = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/d/config.toml"],
        );
        let read = event(EventKind::Access(AccessKind::Any), &["/d/windows.toml"]);
        let touch = event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime)),
            &["/d/windows.toml"],
        );
        for ev in [lock, config, read, touch] {
            assert!(!touches_file(&ev, &name()));
        }
    }
}
