//! Integration tests for the snapshot store.

use serde::{Deserialize, Serialize};
use vellum::{
    JsonCodec, SnapshotConflict,
    snapshot::{
        SnapshotState, SnapshotStore, SnapshotWriteError, StateError, StateType, inmemory,
        read_state, write_state,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct MenuState {
    items: Vec<String>,
}

impl StateType for MenuState {
    const TYPE_ID: &'static str = "menu";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PageState {
    title: String,
}

impl StateType for PageState {
    const TYPE_ID: &'static str = "page";
}

fn state(body: &str) -> SnapshotState {
    SnapshotState::new("page", body.as_bytes().to_vec())
}

fn menu(items: &[&str]) -> MenuState {
    MenuState {
        items: items.iter().map(ToString::to_string).collect(),
    }
}

#[tokio::test]
async fn key_written_twice_reads_second_state() {
    let store = inmemory::Store::new();

    assert!(store.read("k1").await.unwrap().is_none());
    store.write("k1", &state("A"), None, 0).await.unwrap();
    store.write("k1", &state("B"), Some(0), 1).await.unwrap();

    let snapshot = store.read("k1").await.unwrap().unwrap();
    assert_eq!(snapshot.version, 1);
    assert_eq!(snapshot.state, state("B"));

    let history = store.history("k1").await.unwrap();
    let flags: Vec<_> = history.iter().map(|r| (r.version, r.latest)).collect();
    assert_eq!(flags, vec![(1, true), (0, false)]);
}

#[tokio::test]
async fn stale_write_is_rejected_and_latest_is_unchanged() {
    let store = inmemory::Store::new();
    store.write("k1", &state("A"), None, 0).await.unwrap();
    store.write("k1", &state("B"), Some(0), 1).await.unwrap();

    let error = store.write("k1", &state("C"), Some(0), 2).await.unwrap_err();

    assert!(matches!(
        error,
        SnapshotWriteError::Conflict(SnapshotConflict {
            expected: Some(0),
            actual: Some(1),
        })
    ));
    assert_eq!(store.read("k1").await.unwrap().unwrap().state, state("B"));
    assert_eq!(store.history("k1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn first_write_must_expect_nothing() {
    let store = inmemory::Store::new();
    store.write("k1", &state("A"), None, 0).await.unwrap();

    let error = store.write("k1", &state("B"), None, 1).await.unwrap_err();

    assert!(matches!(
        error,
        SnapshotWriteError::Conflict(SnapshotConflict {
            expected: None,
            actual: Some(0),
        })
    ));
}

#[tokio::test]
async fn versions_may_skip_ahead() {
    let store = inmemory::Store::new();
    store.write("k1", &state("A"), None, 3).await.unwrap();
    store.write("k1", &state("B"), Some(3), 10).await.unwrap();

    assert_eq!(store.read("k1").await.unwrap().unwrap().version, 10);
}

#[tokio::test]
async fn typed_state_roundtrips() {
    let store = inmemory::Store::new();
    let first = menu(&["home"]);
    let second = menu(&["home", "blog"]);

    write_state(&store, &JsonCodec, "menu-main", &first, None, 0)
        .await
        .unwrap();
    write_state(&store, &JsonCodec, "menu-main", &second, Some(0), 1)
        .await
        .unwrap();

    let loaded = read_state::<_, _, MenuState>(&store, &JsonCodec, "menu-main")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.version, 1);
    assert_eq!(loaded.state, second);
}

#[tokio::test]
async fn typed_read_rejects_other_state_types() {
    let store = inmemory::Store::new();
    write_state(&store, &JsonCodec, "k1", &menu(&["home"]), None, 0)
        .await
        .unwrap();

    let error = read_state::<_, _, PageState>(&store, &JsonCodec, "k1")
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        StateError::TypeMismatch {
            expected: "page",
            ..
        }
    ));
}

#[tokio::test]
async fn typed_write_surfaces_conflicts() {
    let store = inmemory::Store::new();
    write_state(&store, &JsonCodec, "k1", &menu(&["a"]), None, 0)
        .await
        .unwrap();

    let error = write_state(&store, &JsonCodec, "k1", &menu(&["b"]), None, 1)
        .await
        .unwrap_err();

    assert!(matches!(error, StateError::Conflict(_)));
}

#[tokio::test]
async fn undecodable_state_reports_codec_error() {
    let store = inmemory::Store::new();
    store
        .write("k1", &SnapshotState::new("menu", b"{not json".to_vec()), None, 0)
        .await
        .unwrap();

    let error = read_state::<_, _, MenuState>(&store, &JsonCodec, "k1")
        .await
        .unwrap_err();

    assert!(matches!(error, StateError::Codec(_)));
}
