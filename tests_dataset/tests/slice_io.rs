//! Slice and Hyperslab I/O Tests
//!
//! Reads and writes against the seeded 5000 x 30 int32 grid:
//! - Range transfer sizes and contents
//! - Zero-count and out-of-bounds ranges
//! - Strided selections with stride and block

use array_types::decode;
use dataset_io::DatasetError;
use tests_dataset::{expected_rows, grid_value, seeded_registry, COLS, ROWS};

#[test]
fn test_read_slice_sizes() {
    let (_engine, _registry, handle) = seeded_registry();

    assert_eq!(handle.read_slice(0, 1).unwrap().len(), 120);
    for (start, count) in [(0, 10), (17, 3), (4990, 10), (2500, 1)] {
        let bytes = handle.read_slice(start, count).unwrap();
        assert_eq!(bytes.len() as u64, count * COLS * 4);
    }
}

#[test]
fn test_read_slice_contents() {
    let (_engine, _registry, handle) = seeded_registry();

    let rows: Vec<i32> = handle.read_slice_as(1234, 5).unwrap();
    assert_eq!(rows, expected_rows(1234, 5));

    let last: Vec<i32> = handle.read_slice_as(ROWS - 1, 1).unwrap();
    assert_eq!(last[COLS as usize - 1], grid_value(ROWS - 1, COLS - 1));
}

#[test]
fn test_zero_count_reads_are_empty() {
    let (engine, _registry, handle) = seeded_registry();
    let reads = engine.stats().reads;

    for start in [0, 1, 2500, ROWS] {
        assert!(handle.read_slice(start, 0).unwrap().is_empty());
    }
    assert_eq!(engine.stats().reads, reads);
}

#[test]
fn test_strided_zero_count_is_empty() {
    let (engine, _registry, handle) = seeded_registry();
    let before = engine.stats();

    let bytes = handle.read_strided(&[0, 0], None, &[0, 5], None).unwrap();
    assert!(bytes.is_empty());
    let bytes = handle
        .read_strided(&[10, 2], Some(&[3, 4]), &[4, 0], Some(&[2, 2]))
        .unwrap();
    assert!(bytes.is_empty());
    handle
        .write_strided(&[ROWS, 0], None, &[0, COLS], None, &[])
        .unwrap();

    let after = engine.stats();
    assert_eq!(after.reads, before.reads);
    assert_eq!(after.writes, before.writes);
    assert_eq!(after.spaces_created, before.spaces_created);
}

#[test]
fn test_zero_count_past_end_is_out_of_bounds() {
    let (_engine, _registry, handle) = seeded_registry();
    let err = handle.read_slice(ROWS + 1, 0).unwrap_err();
    assert!(matches!(err, DatasetError::Bounds(b) if b.dimension == 0));
}

#[test]
fn test_read_past_end_is_out_of_bounds() {
    let (_engine, _registry, handle) = seeded_registry();
    let err = handle.read_slice(ROWS - 1, 2).unwrap_err();
    match err {
        DatasetError::Bounds(bounds) => {
            assert_eq!(bounds.dimension, 0);
            assert_eq!(bounds.requested, ROWS + 1);
            assert_eq!(bounds.extent, ROWS);
        }
        other => panic!("expected bounds error, got {other}"),
    }
}

#[test]
fn test_round_trip() {
    let (_engine, _registry, handle) = seeded_registry();

    let original = handle.read_slice(100, 4).unwrap();
    handle.write_slice(3000, &original).unwrap();
    assert_eq!(handle.read_slice(3000, 4).unwrap(), original);

    let replaced: Vec<i32> = (0..(2 * COLS) as i32).map(|v| -v).collect();
    handle.write_slice_from(42, &replaced).unwrap();
    assert_eq!(handle.read_slice_as::<i32>(42, 2).unwrap(), replaced);
    assert_eq!(handle.read_slice_as::<i32>(44, 1).unwrap(), expected_rows(44, 1));
}

#[test]
fn test_strided_read() {
    let (_engine, _registry, handle) = seeded_registry();

    let bytes = handle
        .read_strided(&[0, 1], Some(&[4, 4]), &[2, 2], Some(&[2, 3]))
        .unwrap();
    assert_eq!(bytes.len(), 96);

    let values: Vec<i32> = decode(&bytes).unwrap();
    let expected: Vec<i32> = [0u64, 1, 4, 5]
        .iter()
        .flat_map(|&row| [1u64, 2, 3, 5, 6, 7].map(|col| grid_value(row, col)))
        .collect();
    assert_eq!(values, expected);
}

#[test]
fn test_strided_defaults() {
    let (_engine, _registry, handle) = seeded_registry();

    let bytes = handle.read_strided(&[10, 0], None, &[2, COLS], None).unwrap();
    assert_eq!(bytes, handle.read_slice(10, 2).unwrap());
}

#[test]
fn test_strided_rejects_overlapping_blocks() {
    let (_engine, _registry, handle) = seeded_registry();

    let err = handle
        .read_strided(&[0, 0], Some(&[1, 1]), &[2, 2], Some(&[2, 1]))
        .unwrap_err();
    assert!(matches!(err, DatasetError::Selection(_)));
}

#[test]
fn test_strided_rank_mismatch() {
    let (_engine, _registry, handle) = seeded_registry();

    let err = handle.read_strided(&[0], None, &[1], None).unwrap_err();
    assert!(matches!(err, DatasetError::Selection(_)));
}

#[test]
fn test_strided_write() {
    let (_engine, _registry, handle) = seeded_registry();

    let data = array_types::encode(&[7i32; 12]);
    handle
        .write_strided(&[20, 0], Some(&[2, 10]), &[2, 3], Some(&[1, 2]), &data)
        .unwrap();

    let row: Vec<i32> = handle.read_slice_as(20, 1).unwrap();
    for col in 0..COLS as usize {
        let expected = if col % 10 < 2 { 7 } else { grid_value(20, col as u64) };
        assert_eq!(row[col], expected, "column {col}");
    }
    let untouched: Vec<i32> = handle.read_slice_as(21, 1).unwrap();
    assert_eq!(untouched, expected_rows(21, 1));
}

#[test]
fn test_read_all() {
    let (_engine, _registry, handle) = seeded_registry();
    let values: Vec<i32> = decode(&handle.read_all().unwrap()).unwrap();
    assert_eq!(values.len() as u64, ROWS * COLS);
    assert_eq!(values, expected_rows(0, ROWS));
}
