// Document store behavior: the contract every concept builds on.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use tempfile::TempDir;

use trailhead::store::{DocStore, Filter, ReadOptions, SortOrder};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Note {
    label: String,
    rank: i64,
    tags: Vec<String>,
}

async fn test_store() -> (TempDir, DocStore) {
    let dir = TempDir::new().expect("create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("store.db").display());
    let store = DocStore::connect(&url).await.expect("connect store");
    (dir, store)
}

fn note(label: &str, rank: i64, tags: &[&str]) -> Note {
    Note {
        label: label.to_string(),
        rank,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

#[tokio::test]
async fn create_assigns_id_and_timestamps() {
    let (_dir, store) = test_store().await;
    let notes = store.collection::<Note>("notes");

    let id = notes.create_one(note("a", 1, &[])).await.unwrap();
    let doc = notes.read_by_id(id).await.unwrap().unwrap();
    assert_eq!(doc.id, id);
    assert_eq!(doc.created, doc.updated);
    assert_eq!(doc.fields.label, "a");
}

#[tokio::test]
async fn read_one_returns_first_match_in_id_order() {
    let (_dir, store) = test_store().await;
    let notes = store.collection::<Note>("notes");

    let first = notes.create_one(note("dup", 1, &[])).await.unwrap();
    notes.create_one(note("dup", 2, &[])).await.unwrap();

    let doc = notes
        .read_one(Filter::new().eq("label", "dup"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc.id, first);
}

#[tokio::test]
async fn read_many_filters_and_sorts() {
    let (_dir, store) = test_store().await;
    let notes = store.collection::<Note>("notes");

    notes.create_one(note("a", 3, &["red"])).await.unwrap();
    notes.create_one(note("b", 1, &["red", "blue"])).await.unwrap();
    notes.create_one(note("c", 2, &["blue"])).await.unwrap();

    let reds = notes
        .read_many(
            Filter::new().contains("tags", "red"),
            ReadOptions::sort("rank", SortOrder::Desc),
        )
        .await
        .unwrap();
    let labels: Vec<_> = reds.iter().map(|d| d.fields.label.as_str()).collect();
    assert_eq!(labels, vec!["a", "b"]);

    assert_eq!(
        notes.count(Filter::new().contains("tags", "blue")).await.unwrap(),
        2
    );
    // No matches is an empty sequence, never an error.
    assert!(notes
        .read_many(Filter::new().eq("label", "zzz"), ReadOptions::default())
        .await
        .unwrap()
        .is_empty());
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stamp {
    label: String,
    at: String,
}

#[tokio::test]
async fn timestamp_strings_sort_chronologically_not_lexically() {
    let (_dir, store) = test_store().await;
    let stamps = store.collection::<Stamp>("stamps");

    // Fractional seconds render with different widths; ".123Z" sorts after
    // ".123456Z" as a plain string but is the earlier instant.
    stamps
        .create_one(Stamp {
            label: "wide".to_string(),
            at: "2026-01-01T12:00:00.123456Z".to_string(),
        })
        .await
        .unwrap();
    stamps
        .create_one(Stamp {
            label: "short".to_string(),
            at: "2026-01-01T12:00:00.123Z".to_string(),
        })
        .await
        .unwrap();

    let docs = stamps
        .read_many(Filter::new(), ReadOptions::sort("at", SortOrder::Asc))
        .await
        .unwrap();
    let labels: Vec<_> = docs.iter().map(|d| d.fields.label.as_str()).collect();
    assert_eq!(labels, vec!["short", "wide"]);
}

#[tokio::test]
async fn update_merges_fields_and_refreshes_updated() {
    let (_dir, store) = test_store().await;
    let notes = store.collection::<Note>("notes");

    let id = notes.create_one(note("a", 1, &[])).await.unwrap();
    let before = notes.read_by_id(id).await.unwrap().unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let mut changes = Map::new();
    changes.insert("rank".to_string(), json!(9));
    notes
        .update_one(Filter::by_id(id), &changes)
        .await
        .unwrap();

    let after = notes.read_by_id(id).await.unwrap().unwrap();
    assert_eq!(after.fields.rank, 9);
    assert_eq!(after.fields.label, "a");
    assert_eq!(after.created, before.created);
    assert!(after.updated > before.updated);
}

#[tokio::test]
async fn update_with_no_match_is_a_silent_noop() {
    let (_dir, store) = test_store().await;
    let notes = store.collection::<Note>("notes");

    let mut changes = Map::new();
    changes.insert("rank".to_string(), json!(9));
    notes
        .update_one(Filter::new().eq("label", "missing"), &changes)
        .await
        .unwrap();
    assert_eq!(notes.count(Filter::new()).await.unwrap(), 0);
}

#[tokio::test]
async fn update_cannot_rewrite_id_or_creation_time() {
    let (_dir, store) = test_store().await;
    let notes = store.collection::<Note>("notes");

    let id = notes.create_one(note("a", 1, &[])).await.unwrap();
    let mut changes = Map::new();
    changes.insert("_id".to_string(), json!(12345));
    changes.insert("created".to_string(), json!("1970-01-01T00:00:00Z"));
    changes.insert("rank".to_string(), json!(2));
    notes.update_one(Filter::by_id(id), &changes).await.unwrap();

    let doc = notes.read_by_id(id).await.unwrap().unwrap();
    assert_eq!(doc.id, id);
    assert_eq!(doc.fields.rank, 2);
    assert_ne!(doc.created.timestamp(), 0);
}

#[tokio::test]
async fn delete_removes_at_most_one() {
    let (_dir, store) = test_store().await;
    let notes = store.collection::<Note>("notes");

    notes.create_one(note("dup", 1, &[])).await.unwrap();
    notes.create_one(note("dup", 2, &[])).await.unwrap();

    assert!(notes
        .delete_one(Filter::new().eq("label", "dup"))
        .await
        .unwrap());
    assert_eq!(notes.count(Filter::new()).await.unwrap(), 1);

    assert!(!notes
        .delete_one(Filter::new().eq("label", "zzz"))
        .await
        .unwrap());
}

#[tokio::test]
async fn collections_are_isolated() {
    let (_dir, store) = test_store().await;
    let notes = store.collection::<Note>("notes");
    let drafts = store.collection::<Note>("drafts");

    notes.create_one(note("a", 1, &[])).await.unwrap();
    assert_eq!(drafts.count(Filter::new()).await.unwrap(), 0);
}
