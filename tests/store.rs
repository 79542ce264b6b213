//! End-to-end tests against the public API: create, append, search, reopen,
//! and cursor update, each driven through a real temp file on disk.

use embedstore::{Id, OpenMode, Score, Store, StoreError, StoreOptions};

fn unit(dim: usize, hot: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dim];
    v[hot] = 1.0;
    v
}

#[test]
fn create_append_search_ranks_by_cosine_similarity() {
    let store = Store::open(StoreOptions::ephemeral(4)).unwrap();
    store.append(Id::new([1; 16]), &unit(4, 0), false).unwrap();
    store.append(Id::new([2; 16]), &unit(4, 1), false).unwrap();
    store.append(Id::new([3; 16]), &[0.9, 0.1, 0.0, 0.0], true).unwrap();

    let results = store.search(&unit(4, 0), 2, 0.0, true).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, Id::new([1; 16]));
    assert!((results[0].score - 1.0).abs() < 1e-5);
    assert_eq!(results[1].id, Id::new([3; 16]));
}

#[test]
fn reappending_the_same_id_dedups_to_the_latest_write() {
    let store = Store::open(StoreOptions::ephemeral(2)).unwrap();
    store.append(Id::new([7; 16]), &[1.0, 0.0], false).unwrap();
    store.append(Id::new([7; 16]), &[0.0, 1.0], true).unwrap();

    let results = store.search(&[0.0, 1.0], 5, 0.0, true).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, Id::new([7; 16]));
    assert!((results[0].score - 1.0).abs() < 1e-5);
}

#[test]
fn reopen_with_a_different_dim_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vectors.dat");
    {
        let mut store = Store::open(StoreOptions {
            path: Some(path.clone()),
            mode: OpenMode::CreateAlways,
            dim: 4,
        })
        .unwrap();
        store.append(Id::new([1; 16]), &unit(4, 0), true).unwrap();
        store.close();
    }

    let err = Store::open(StoreOptions {
        path: Some(path),
        mode: OpenMode::AppendExisting,
        dim: 8,
    })
    .unwrap_err();
    assert!(matches!(err, StoreError::Format { .. }));
}

#[test]
fn cursor_update_rejects_stale_id_after_the_record_moved() {
    let store = Store::open(StoreOptions::ephemeral(2)).unwrap();
    store.append(Id::new([1; 16]), &[1.0, 0.0], false).unwrap();
    store.append(Id::new([2; 16]), &[0.0, 1.0], true).unwrap();

    let mut cursor = store.cursor(false).unwrap();
    let first = cursor.read().unwrap().unwrap();
    assert_eq!(first.id, Id::new([1; 16]));

    // Passing the wrong id for the record at the remembered offset must fail
    // without touching the bytes on disk.
    let err = cursor.update(Id::new([2; 16]), &[9.0, 9.0], true).unwrap_err();
    assert!(matches!(err, StoreError::IdMismatch { .. }));

    cursor.update(Id::new([1; 16]), &[5.0, 5.0], true).unwrap();

    cursor.reset().unwrap();
    let reread = cursor.read().unwrap().unwrap();
    assert_eq!(reread.blob(), vec![5.0, 5.0]);
}

#[test]
fn search_tolerates_a_torn_trailing_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vectors.dat");
    {
        let store = Store::open(StoreOptions {
            path: Some(path.clone()),
            mode: OpenMode::CreateAlways,
            dim: 2,
        })
        .unwrap();
        store.append(Id::new([1; 16]), &[1.0, 0.0], true).unwrap();
    }

    // Simulate a crash mid-append: truncate off the last few bytes of the
    // (already durable) first record, leaving a short, unreadable tail.
    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    let len = file.metadata().unwrap().len();
    file.set_len(len - 3).unwrap();

    let store = Store::open(StoreOptions {
        path: Some(path),
        mode: OpenMode::AppendExisting,
        dim: 2,
    })
    .unwrap();
    let results = store.search(&[1.0, 0.0], 5, 0.0, true).unwrap();
    assert!(results.is_empty());
}

#[test]
fn top_k_results_come_back_sorted_descending_by_score() {
    let store = Store::open(StoreOptions::ephemeral(2)).unwrap();
    let points: &[(u8, f32, f32)] = &[(1, 1.0, 0.0), (2, 0.8, 0.6), (3, 0.0, 1.0), (4, -1.0, 0.0)];
    for (id, x, y) in points {
        store.append(Id::new([*id; 16]), &[*x, *y], false).unwrap();
    }
    store.flush().unwrap();

    let results: Vec<Score> = store.search(&[1.0, 0.0], 4, -1.0, true).unwrap();
    assert_eq!(results.len(), 4);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert_eq!(results[0].id, Id::new([1; 16]));
    assert_eq!(results.last().unwrap().id, Id::new([4; 16]));
}

#[test]
fn min_score_filters_out_dissimilar_vectors() {
    let store = Store::open(StoreOptions::ephemeral(2)).unwrap();
    store.append(Id::new([1; 16]), &[1.0, 0.0], false).unwrap();
    store.append(Id::new([2; 16]), &[-1.0, 0.0], true).unwrap();

    let results = store.search(&[1.0, 0.0], 5, 0.5, true).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, Id::new([1; 16]));
}
