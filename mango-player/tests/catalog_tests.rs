//! Catalog Index Tests
//!
//! Covers tree shape, folder membership, readiness notification and
//! snapshot consistency while rebuilds run on other threads.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use mango_common::MediaRecord;
use mango_player::catalog::{
    album_folder_id, artist_folder_id, genre_folder_id, CatalogIndex, NodeKind, ReadyState,
    ALBUMS_ID, ALL_ITEMS_ID, ARTISTS_ID, GENRES_ID, ROOT_ID, UNKNOWN_GENRE,
};

fn record(id: &str, album: &str, artist: &str, genre: Option<&str>) -> MediaRecord {
    let record = MediaRecord::new(id, format!("Track {id}"))
        .with_album(album, format!("Album {album}"))
        .with_artist(artist, format!("Artist {artist}"));
    match genre {
        Some(genre) => record.with_genre(genre),
        None => record,
    }
}

fn library() -> Vec<MediaRecord> {
    vec![
        record("1", "A", "X", Some("Rock")),
        record("2", "A", "Y", None),
        record("3", "B", "X", Some("Jazz")),
        record("4", "C", "Z", Some("Rock")),
        record("5", "B", "Y", Some("  ")),
    ]
}

fn child_media_ids(index: &CatalogIndex, folder: &str) -> Vec<String> {
    index
        .get_children(folder)
        .unwrap()
        .iter()
        .filter_map(|n| n.media_id().map(str::to_string))
        .collect()
}

#[test]
fn test_album_scenario() {
    let index = CatalogIndex::new();
    index
        .rebuild(vec![
            record("1", "A", "X", None),
            record("2", "A", "X", None),
            record("3", "B", "X", None),
        ])
        .unwrap();

    assert_eq!(child_media_ids(&index, "album:A"), ["1", "2"]);
    assert_eq!(child_media_ids(&index, "album:B"), ["3"]);
    assert_eq!(index.get_children(ROOT_ID).unwrap().len(), 4);
    assert_eq!(index.state(), ReadyState::Initialized);
}

#[test]
fn test_root_has_exactly_four_top_folders() {
    let index = CatalogIndex::new();
    index.rebuild(library()).unwrap();

    let root = index.get_root();
    assert_eq!(root.kind, NodeKind::Root);
    let ids: Vec<_> = index
        .get_children(ROOT_ID)
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(ids, [ALBUMS_ID, ARTISTS_ID, GENRES_ID, ALL_ITEMS_ID]);
}

#[test]
fn test_all_items_lists_every_record_once() {
    let index = CatalogIndex::new();
    index.rebuild(library()).unwrap();

    let all = child_media_ids(&index, ALL_ITEMS_ID);
    assert_eq!(all, ["1", "2", "3", "4", "5"]);
    let unique: HashSet<_> = all.iter().collect();
    assert_eq!(unique.len(), all.len());
    assert!(index
        .get_children(ALL_ITEMS_ID)
        .unwrap()
        .iter()
        .all(|n| n.is_playable));
}

#[test]
fn test_every_item_is_filed_once_per_grouping() {
    let index = CatalogIndex::new();
    index.rebuild(library()).unwrap();

    let groupings: [(&str, fn(&MediaRecord) -> String); 3] = [
        (ALBUMS_ID, |r| album_folder_id(&r.album_id)),
        (ARTISTS_ID, |r| artist_folder_id(&r.artist_id)),
        (GENRES_ID, |r| genre_folder_id(r.genre_tag().unwrap_or(UNKNOWN_GENRE))),
    ];

    for (top, expected_folder) in groupings {
        let mut seen = Vec::new();
        for folder in index.get_children(top).unwrap() {
            assert!(!folder.is_playable);
            for item in index.get_children(&folder.id).unwrap() {
                let record = item.record.as_ref().unwrap();
                assert_eq!(expected_folder(record), folder.id, "{} misfiled", record.id);
                seen.push(record.id.clone());
            }
        }
        seen.sort();
        assert_eq!(seen, ["1", "2", "3", "4", "5"], "grouping {top}");
    }
}

#[test]
fn test_missing_and_blank_genres_share_unknown_bucket() {
    let index = CatalogIndex::new();
    index.rebuild(library()).unwrap();

    assert_eq!(child_media_ids(&index, &genre_folder_id(UNKNOWN_GENRE)), ["2", "5"]);
    assert_eq!(child_media_ids(&index, "genre:Rock"), ["1", "4"]);
}

#[test]
fn test_folder_takes_metadata_from_first_record() {
    let index = CatalogIndex::new();
    index
        .rebuild(vec![
            MediaRecord::new("1", "a").with_album("A", "First Name"),
            MediaRecord::new("2", "b").with_album("A", "Second Name"),
        ])
        .unwrap();

    let folder = index.get_item("album:A").unwrap();
    assert_eq!(folder.title, "First Name");
    assert_eq!(folder.kind, NodeKind::AlbumFolder);
}

#[test]
fn test_folder_ids_stable_across_rebuilds() {
    let index = CatalogIndex::new();
    index.rebuild(library()).unwrap();
    let first: Vec<_> = index.get_children(ALBUMS_ID).unwrap().into_iter().map(|n| n.id).collect();

    index.rebuild(library()).unwrap();
    let second: Vec<_> = index.get_children(ALBUMS_ID).unwrap().into_iter().map(|n| n.id).collect();

    assert_eq!(first, second);
    assert_eq!(index.generation(), 2);
}

#[test]
fn test_unknown_ids_are_absent() {
    let index = CatalogIndex::new();
    index.rebuild(library()).unwrap();

    assert!(index.get_item("item:999").is_none());
    assert!(index.get_children("album:nope").is_none());
    assert!(index.get_record("999").is_none());
    assert_eq!(index.get_record("3").unwrap().album_id, "B");
}

#[test]
fn test_waiters_registered_before_settle_fire_once() {
    let index = Arc::new(CatalogIndex::new());
    let calls = Arc::new(Mutex::new(Vec::new()));

    for i in 0..3 {
        let calls = calls.clone();
        assert!(!index.when_ready(move |ok| calls.lock().unwrap().push((i, ok))));
    }
    index.rebuild(library()).unwrap();
    assert_eq!(*calls.lock().unwrap(), vec![(0, true), (1, true), (2, true)]);

    // A later rebuild does not re-deliver to drained waiters
    index.rebuild(library()).unwrap();
    assert_eq!(calls.lock().unwrap().len(), 3);
}

#[test]
fn test_waiter_after_settle_runs_immediately() {
    let index = CatalogIndex::new();
    index.rebuild(vec![MediaRecord::new("", "bad")]).unwrap_err();

    let seen = Arc::new(Mutex::new(None));
    let seen_clone = seen.clone();
    assert!(index.when_ready(move |ok| *seen_clone.lock().unwrap() = Some(ok)));
    assert_eq!(*seen.lock().unwrap(), Some(false));
}

#[test]
fn test_concurrent_registration_delivers_exactly_once() {
    let index = Arc::new(CatalogIndex::new());
    let delivered = Arc::new(AtomicUsize::new(0));

    let registrars: Vec<_> = (0..4)
        .map(|_| {
            let index = index.clone();
            let delivered = delivered.clone();
            thread::spawn(move || {
                for _ in 0..250 {
                    let delivered = delivered.clone();
                    index.when_ready(move |_| {
                        delivered.fetch_add(1, Ordering::SeqCst);
                    });
                }
            })
        })
        .collect();

    let builder = {
        let index = index.clone();
        thread::spawn(move || index.rebuild(library()).unwrap())
    };

    for handle in registrars {
        handle.join().unwrap();
    }
    builder.join().unwrap();

    // Everything registered either ran at settle or ran synchronously after it
    assert_eq!(delivered.load(Ordering::SeqCst), 1000);
}

#[test]
fn test_readers_only_see_complete_generations() {
    let index = Arc::new(CatalogIndex::new());
    let small: Vec<_> = (0..10).map(|i| record(&i.to_string(), "A", "X", None)).collect();
    let large: Vec<_> = (0..500).map(|i| record(&i.to_string(), "A", "X", None)).collect();
    index.rebuild(small.clone()).unwrap();

    let writer = {
        let index = index.clone();
        thread::spawn(move || {
            for round in 0..20 {
                let records = if round % 2 == 0 { large.clone() } else { small.clone() };
                index.rebuild(records).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let index = index.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let tree = index.snapshot();
                    let all = tree.children(ALL_ITEMS_ID).unwrap().len();
                    let album = tree.children("album:A").unwrap().len();
                    assert!(all == 10 || all == 500, "partial tree with {all} items");
                    assert_eq!(all, album);
                    assert_eq!(all, tree.item_count());
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}

#[tokio::test]
async fn test_wait_ready_resolves_after_blocking_rebuild() {
    let index = Arc::new(CatalogIndex::new());
    let waiter = {
        let index = index.clone();
        tokio::spawn(async move { index.wait_ready().await })
    };

    let builder = index.clone();
    tokio::task::spawn_blocking(move || builder.rebuild(library()))
        .await
        .unwrap()
        .unwrap();

    assert!(waiter.await.unwrap());
}
