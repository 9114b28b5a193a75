use std::sync::Arc;

use strata_bytes::Bytes;
use strata_common::error::ErrorKind;
use strata_objectstore::{local_store::LocalFsObjectStore, url::ObjectUrl};
use strata_scalar_index::{
    DESCRIPTOR_BLOB, HybridScalarIndex, IndexKind, IndexManifest, ScalarValue, SliceBatchSource,
    ValueRange,
};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn build<T: ScalarValue>(values: &[T], limit: usize) -> HybridScalarIndex<T> {
    let mut index = HybridScalarIndex::<T>::with_cardinality_limit(limit);
    index.build(values).unwrap();
    index
}

#[test]
fn test_low_cardinality_int_column_uses_bitmap() {
    let index = build(&[1i64, 1, 2, 2, 3, 3], 3);
    assert_eq!(index.selected_kind(), Some(IndexKind::Bitmap));

    let rows = index.is_in(&[2]).unwrap();
    let marks: Vec<bool> = (0..6).map(|i| rows.get(i)).collect();
    assert_eq!(marks, vec![false, false, true, true, false, false]);
}

#[test]
fn test_distinct_string_column_uses_trie() {
    let index = build(&strings(&["a", "bb", "ccc", "dddd", "eeeee", "ffffff"]), 3);
    assert_eq!(index.selected_kind(), Some(IndexKind::Trie));

    let rows = index
        .range(&ValueRange::between(
            "bb".to_string(),
            true,
            "dddd".to_string(),
            true,
        ))
        .unwrap();
    assert_eq!(rows.positions().collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn test_high_cardinality_int_column_uses_sorted() {
    let values: Vec<i64> = (0..1000).collect();
    let index = build(&values, 16);
    assert_eq!(index.selected_kind(), Some(IndexKind::Sorted));

    let rows = index.range(&ValueRange::between(10, true, 12, false)).unwrap();
    assert_eq!(rows.positions().collect::<Vec<_>>(), vec![10, 11]);
}

#[test]
fn test_threshold_boundary() {
    let at_limit: Vec<i64> = (0..16).collect();
    assert_eq!(
        build(&at_limit, 16).selected_kind(),
        Some(IndexKind::Bitmap)
    );

    let over_limit: Vec<i64> = (0..17).collect();
    assert_eq!(
        build(&over_limit, 16).selected_kind(),
        Some(IndexKind::Sorted)
    );

    let strings_at_limit: Vec<String> = (0..16).map(|i| format!("key-{i}")).collect();
    assert_eq!(
        build(&strings_at_limit, 16).selected_kind(),
        Some(IndexKind::Bitmap)
    );

    let strings_over_limit: Vec<String> = (0..17).map(|i| format!("key-{i}")).collect();
    assert_eq!(
        build(&strings_over_limit, 16).selected_kind(),
        Some(IndexKind::Trie)
    );
}

#[test]
fn test_selection_ignores_row_order_and_chunking() {
    fastrand::seed(7_319_245_011);
    let mut values: Vec<i64> = (0..500).map(|_| fastrand::i64(0..200)).collect();
    let baseline = build(&values, 32).selected_kind();

    for chunk_size in [1, 7, 499] {
        fastrand::shuffle(&mut values);
        let batches: Vec<Vec<i64>> = values.chunks(chunk_size).map(|c| c.to_vec()).collect();
        let mut index = HybridScalarIndex::<i64>::with_cardinality_limit(32);
        index
            .build_from_source(&mut SliceBatchSource::new(batches))
            .unwrap();
        assert_eq!(index.selected_kind(), baseline);
    }
}

#[test]
fn test_empty_column_builds_and_round_trips() {
    let mut index = HybridScalarIndex::<i64>::new();
    index.build(&[]).unwrap();
    assert_eq!(index.selected_kind(), Some(IndexKind::Sorted));
    assert_eq!(index.count().unwrap(), 0);
    assert_eq!(index.is_in(&[5]).unwrap().len(), 0);
    assert_eq!(index.range(&ValueRange::unbounded()).unwrap().len(), 0);

    let blobs = index.serialize().unwrap();
    let mut reloaded = HybridScalarIndex::<i64>::new();
    reloaded.load(&blobs).unwrap();
    assert_eq!(reloaded.count().unwrap(), 0);
}

fn assert_round_trip<T: ScalarValue + PartialEq + std::fmt::Debug>(
    original: &HybridScalarIndex<T>,
    probes: &[T],
    range: ValueRange<T>,
) {
    let blobs = original.serialize().unwrap();
    let mut reloaded = HybridScalarIndex::<T>::with_cardinality_limit(original.cardinality_limit());
    reloaded.load(&blobs).unwrap();

    assert_eq!(reloaded.selected_kind(), original.selected_kind());
    assert_eq!(reloaded.count().unwrap(), original.count().unwrap());
    assert_eq!(
        reloaded.size_in_bytes().unwrap(),
        original.size_in_bytes().unwrap()
    );
    assert_eq!(
        reloaded.has_raw_data().unwrap(),
        original.has_raw_data().unwrap()
    );
    assert_eq!(
        reloaded.is_in(probes).unwrap(),
        original.is_in(probes).unwrap()
    );
    assert_eq!(
        reloaded.not_in(probes).unwrap(),
        original.not_in(probes).unwrap()
    );
    assert_eq!(reloaded.range(&range).unwrap(), original.range(&range).unwrap());
    for offset in 0..original.count().unwrap() {
        assert_eq!(
            reloaded.lookup(offset).unwrap(),
            original.lookup(offset).unwrap()
        );
    }
}

#[test]
fn test_round_trip_bitmap() {
    fastrand::seed(90_125_331);
    let values: Vec<i64> = (0..200).map(|_| fastrand::i64(0..10)).collect();
    let index = build(&values, 32);
    assert_eq!(index.selected_kind(), Some(IndexKind::Bitmap));
    assert_round_trip(&index, &[0, 3, 9, 42], ValueRange::between(2, true, 7, false));
}

#[test]
fn test_round_trip_sorted() {
    fastrand::seed(553_124_776);
    let values: Vec<i64> = (0..200).map(|_| fastrand::i64(-1000..1000)).collect();
    let index = build(&values, 8);
    assert_eq!(index.selected_kind(), Some(IndexKind::Sorted));
    assert_round_trip(
        &index,
        &values[..5].to_vec(),
        ValueRange::between(-250, false, 250, true),
    );
}

#[test]
fn test_round_trip_trie() {
    fastrand::seed(18_660_924);
    let values: Vec<String> = (0..200)
        .map(|_| format!("prefix/{}/{}", fastrand::u32(0..40), fastrand::u32(0..4)))
        .collect();
    let index = build(&values, 8);
    assert_eq!(index.selected_kind(), Some(IndexKind::Trie));
    assert_round_trip(
        &index,
        &values[..5].to_vec(),
        ValueRange::between("prefix/1".to_string(), true, "prefix/3".to_string(), false),
    );
}

#[test]
fn test_round_trip_float_and_bool_columns() {
    let floats = vec![1.5f64, -0.0, 0.0, f64::NAN, 1.5, f64::INFINITY];
    let index = build(&floats, 3);
    // Bit-pattern keys: -0.0, 0.0, 1.5, NaN and infinity are five distincts.
    assert_eq!(index.selected_kind(), Some(IndexKind::Sorted));
    let blobs = index.serialize().unwrap();
    let mut reloaded = HybridScalarIndex::<f64>::with_cardinality_limit(3);
    reloaded.load(&blobs).unwrap();
    assert_eq!(
        reloaded.is_in(&[1.5]).unwrap().positions().collect::<Vec<_>>(),
        vec![0, 4]
    );

    let bools = vec![true, false, true, true];
    let index = build(&bools, 4);
    assert_eq!(index.selected_kind(), Some(IndexKind::Bitmap));
    assert_round_trip(&index, &[true], ValueRange::at_least(false));
}

#[test]
fn test_corrupt_descriptor_is_rejected() {
    let index = build(&[1i64, 2, 3], 8);
    let blobs = index.serialize().unwrap();
    let descriptor = blobs.get(DESCRIPTOR_BLOB).unwrap().clone();

    // Truncated descriptor.
    let mut tampered = blobs.clone();
    tampered.remove(DESCRIPTOR_BLOB).unwrap();
    tampered
        .insert(DESCRIPTOR_BLOB, descriptor.slice(..4))
        .unwrap();
    let mut target = HybridScalarIndex::<i64>::new();
    assert!(matches!(
        target.load(&tampered).unwrap_err().kind(),
        ErrorKind::CorruptIndex { .. }
    ));
    assert!(!target.is_ready());

    // Flipped kind tag.
    let mut flipped = descriptor.as_ref().to_vec();
    flipped[5] = 77;
    let mut tampered = blobs.clone();
    tampered.remove(DESCRIPTOR_BLOB).unwrap();
    tampered
        .insert(DESCRIPTOR_BLOB, Bytes::from(flipped))
        .unwrap();
    let mut target = HybridScalarIndex::<i64>::new();
    assert!(matches!(
        target.load(&tampered).unwrap_err().kind(),
        ErrorKind::CorruptIndex { .. }
    ));

    // Missing descriptor.
    let mut tampered = blobs.clone();
    tampered.remove(DESCRIPTOR_BLOB).unwrap();
    let mut target = HybridScalarIndex::<i64>::new();
    assert!(matches!(
        target.load(&tampered).unwrap_err().kind(),
        ErrorKind::CorruptIndex { .. }
    ));
}

#[test]
fn test_element_type_mismatch_is_rejected() {
    let index = build(&[1i64, 2, 3], 8);
    let blobs = index.serialize().unwrap();

    let mut target = HybridScalarIndex::<String>::new();
    assert!(matches!(
        target.load(&blobs).unwrap_err().kind(),
        ErrorKind::TypeMismatch { .. }
    ));
    assert!(!target.is_ready());

    let mut target = HybridScalarIndex::<i32>::new();
    assert!(matches!(
        target.load(&blobs).unwrap_err().kind(),
        ErrorKind::TypeMismatch { .. }
    ));
}

#[test]
fn test_upload_and_load_from_store() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<LocalFsObjectStore> = Arc::new(LocalFsObjectStore::new(dir.path()).unwrap());
    let container = ObjectUrl::parse("file:///segment0/city/").unwrap();

    let values = strings(&["tokyo", "osaka", "tokyo", "kyoto", "osaka", "tokyo"]);
    let mut index = HybridScalarIndex::<String>::with_cardinality_limit(16);
    index.build(&values).unwrap();
    let manifest = index.upload(store.as_ref(), &container).unwrap();
    assert!(manifest.contains(DESCRIPTOR_BLOB));

    // A repeated upload of the same built state must not rewrite anything;
    // the store would reject re-creating existing objects.
    let again = index.upload(store.as_ref(), &container).unwrap();
    assert_eq!(again.entries().len(), manifest.entries().len());

    let fetched = IndexManifest::fetch(store.as_ref(), &container).unwrap();
    let mut reloaded = HybridScalarIndex::<String>::new();
    reloaded.load_from_store(store.clone(), &fetched).unwrap();

    assert_eq!(reloaded.selected_kind(), index.selected_kind());
    assert_eq!(reloaded.count().unwrap(), 6);
    assert_eq!(
        reloaded
            .is_in(&strings(&["tokyo"]))
            .unwrap()
            .positions()
            .collect::<Vec<_>>(),
        vec![0, 2, 5]
    );
    assert_eq!(reloaded.lookup(3).unwrap(), "kyoto");
}

#[test]
fn test_load_from_store_with_missing_blob_stays_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<LocalFsObjectStore> = Arc::new(LocalFsObjectStore::new(dir.path()).unwrap());
    let container = ObjectUrl::parse("file:///segment0/ints/").unwrap();

    let mut index = HybridScalarIndex::<i64>::with_cardinality_limit(4);
    index.build(&(0..100i64).collect::<Vec<_>>()).unwrap();
    let manifest = index.upload(store.as_ref(), &container).unwrap();

    // Delete a variant-body object behind the manifest's back.
    let body_entry = manifest
        .entries()
        .iter()
        .find(|entry| entry.name != DESCRIPTOR_BLOB)
        .unwrap();
    let body_url = container.resolve_relative(&body_entry.name).unwrap();
    std::fs::remove_file(store.url_to_path(&body_url).unwrap()).unwrap();

    let mut target = HybridScalarIndex::<i64>::new();
    let result = target.load_from_store(store.clone(), &manifest);
    assert!(result.is_err());
    assert!(!target.is_ready());

    // No partially initialized variant is reachable.
    assert!(matches!(
        target.count().unwrap_err().kind(),
        ErrorKind::NotReady { .. }
    ));
}

#[test]
fn test_query_results_cover_every_row_exactly_once() {
    fastrand::seed(41_990_217);
    let values: Vec<i64> = (0..300).map(|_| fastrand::i64(0..50)).collect();
    let index = build(&values, 64);

    let inside = index.is_in(&[7, 13]).unwrap();
    let outside = index.not_in(&[7, 13]).unwrap();
    assert_eq!(inside.len(), values.len());
    assert_eq!(outside.len(), values.len());
    assert_eq!(inside.count_ones() + outside.count_ones(), values.len());

    for (row, value) in values.iter().enumerate() {
        assert_eq!(inside.get(row), *value == 7 || *value == 13);
    }
}
