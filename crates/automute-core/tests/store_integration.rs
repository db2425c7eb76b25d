//! Integration tests for the window store.

use std::sync::Arc;
use std::thread;

use automute_core::{evaluate, CivilTime, EngineResult, StoreError, TimeWindow, WindowStore};
use chrono::{TimeZone, Utc};

fn window(hour: u32, repeat: bool) -> TimeWindow {
    TimeWindow::new(
        CivilTime::new(2024, 1, 1, hour, 0),
        CivilTime::new(2024, 1, 1, hour + 1, 0),
        repeat,
    )
    .unwrap()
}

#[test]
fn concurrent_appends_keep_every_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(WindowStore::with_path(dir.path().join("windows.toml")));
    store.append(window(8, true)).unwrap();
    let before = store.load().unwrap().len();

    let handles: Vec<_> = (0..2)
        .map(|i| {
            let store = store.clone();
            thread::spawn(move || store.append(window(10 + i, false)).unwrap())
        })
        .collect();
    let added: Vec<TimeWindow> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let after = store.load().unwrap();
    assert_eq!(after.len(), before + 2);
    for w in &added {
        assert!(after.contains(w), "missing appended window {}", w.id());
    }
}

#[test]
fn many_threads_appending_never_garble_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(WindowStore::with_path(dir.path().join("windows.toml")));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            thread::spawn(move || {
                for _ in 0..5 {
                    store.append(window(i, i % 2 == 0)).unwrap();
                    // Readers racing the writers must always see a whole file.
                    store.load().unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(store.load().unwrap().len(), 40);
}

#[test]
fn one_shot_window_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let store = WindowStore::with_path(dir.path().join("windows.toml"));
    store
        .append(
            TimeWindow::new(
                CivilTime::new(2024, 1, 1, 10, 0),
                CivilTime::new(2024, 1, 1, 12, 0),
                false,
            )
            .unwrap(),
        )
        .unwrap();

    let at = |h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();

    let windows = store.prune(&at(9)).unwrap();
    assert_eq!(
        evaluate(&windows, &at(9)),
        EngineResult {
            active: false,
            next_event_delay_secs: 3600
        }
    );

    let windows = store.prune(&at(11)).unwrap();
    assert_eq!(
        evaluate(&windows, &at(11)),
        EngineResult {
            active: true,
            next_event_delay_secs: 3600
        }
    );

    let windows = store.prune(&at(13)).unwrap();
    assert!(windows.is_empty());
    assert_eq!(evaluate(&windows, &at(13)), EngineResult::IDLE);
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn garbage_file_is_reported_not_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("windows.toml");
    std::fs::write(&path, "[[windows]]\nid = \"x\"\nstart_year = \"soon\"\n").unwrap();
    let store = WindowStore::with_path(&path);

    assert!(matches!(
        store.load().unwrap_err(),
        StoreError::MalformedRecord { .. }
    ));
    // Prune must not rewrite a file it could not parse.
    assert!(store.prune(&Utc::now()).is_err());
    assert!(std::fs::read_to_string(&path).unwrap().contains("soon"));
}
