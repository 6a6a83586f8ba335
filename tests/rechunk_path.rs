// Integration tests for re-chunking through the filesystem
mod common;

use simg_rechunk::simg::{self, Chunk, ChunkType, RechunkOptions, SparseError};
use tempfile::tempdir;

const BS: u32 = 4096;

#[test]
fn test_rechunk_file_to_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input_path = dir.path().join("system.simg");
    let output_path = dir.path().join("system.simg.out");

    // 16 KiB windows = 4 blocks
    let chunks = vec![
        common::raw_chunk(1, BS, 0x10),
        Chunk::fill(1, 0x01020304),
        Chunk::dont_care(1),
        common::raw_chunk(1, BS, 0x20),
        Chunk::dont_care(3),
        common::raw_chunk(2, BS, 0x30),
    ];
    let input = common::build_image(BS, &chunks);
    std::fs::write(&input_path, &input).expect("Failed to write input image");

    let summary = simg::rechunk_path(
        &input_path,
        &output_path,
        &RechunkOptions::with_alignment_kib(16),
    )
    .expect("Rechunk failed");

    assert_eq!(summary.input_chunks, 6);
    assert_eq!(summary.output_chunks, 3);
    assert_eq!(summary.input_blocks, 9);

    let output = std::fs::read(&output_path).expect("Failed to read output image");
    assert_eq!(output.len() as u64, summary.bytes_written);

    let (header, out_chunks) = common::decode_image(&output);
    assert_eq!(header.total_chunks, 3);
    assert_eq!(header.image_checksum, 0xC0FFEE);

    let shape: Vec<(ChunkType, u32)> = out_chunks
        .iter()
        .map(|c| (c.chunk_type(), c.block_count))
        .collect();
    assert_eq!(
        shape,
        vec![
            (ChunkType::Raw, 4),
            (ChunkType::DontCare, 3),
            (ChunkType::Raw, 2)
        ]
    );

    assert_eq!(common::expand_image(&output), common::expand_image(&input));
}

#[test]
fn test_rechunk_is_stable_on_its_own_output() {
    let dir = tempdir().expect("Failed to create temp dir");
    let first = dir.path().join("first.simg");
    let second = dir.path().join("second.simg");
    let third = dir.path().join("third.simg");

    let chunks = vec![
        Chunk::dont_care(2),
        common::raw_chunk(3, BS, 1),
        Chunk::fill(5, 0xFFFFFFFF),
        common::raw_chunk(1, BS, 2),
        Chunk::dont_care(1),
        common::raw_chunk(2, BS, 3),
    ];
    std::fs::write(&first, common::build_image(BS, &chunks)).expect("Failed to write input");

    let options = RechunkOptions::with_alignment_kib(16);
    let once = simg::rechunk_path(&first, &second, &options).expect("First pass failed");
    let twice = simg::rechunk_path(&second, &third, &options).expect("Second pass failed");
    assert_eq!(once.output_chunks, twice.output_chunks);

    let second_bytes = std::fs::read(&second).expect("Failed to read second");
    let third_bytes = std::fs::read(&third).expect("Failed to read third");
    assert_eq!(second_bytes, third_bytes);
}

#[test]
fn test_corrupt_input_reports_error() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input_path = dir.path().join("bad.simg");
    let output_path = dir.path().join("bad.simg.out");

    let mut input = common::build_image(BS, &[Chunk::dont_care(1), Chunk::dont_care(1)]);
    // Second chunk header starts after the file header and the first chunk
    input[28 + 12] = 0xC4;
    std::fs::write(&input_path, &input).expect("Failed to write input");

    let err = simg::rechunk_path(&input_path, &output_path, &RechunkOptions::default())
        .expect_err("Corrupt chunk type should fail");
    assert!(matches!(
        err,
        SparseError::UnknownChunkType {
            index: 1,
            chunk_type: 0xCAC4
        }
    ));
}

#[test]
fn test_rejected_input_keeps_existing_output() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input_path = dir.path().join("bad_magic.simg");
    let output_path = dir.path().join("out.simg");
    std::fs::write(&output_path, b"previous good image").expect("Failed to write output");

    let mut input = common::build_image(BS, &[Chunk::dont_care(4)]);
    input[0] = 0;
    std::fs::write(&input_path, &input).expect("Failed to write input");

    let err = simg::rechunk_path(&input_path, &output_path, &RechunkOptions::default())
        .expect_err("Bad magic should fail");
    assert!(matches!(err, SparseError::BadMagic(_)));
    assert_eq!(
        std::fs::read(&output_path).expect("Failed to read output"),
        b"previous good image"
    );

    let good_input = dir.path().join("good.simg");
    std::fs::write(&good_input, common::build_image(BS, &[Chunk::dont_care(4)]))
        .expect("Failed to write input");
    let err = simg::rechunk_path(
        &good_input,
        &output_path,
        &RechunkOptions::with_alignment_kib(0),
    )
    .expect_err("Zero alignment should fail");
    assert!(matches!(err, SparseError::InvalidAlignment(0)));
    assert_eq!(
        std::fs::read(&output_path).expect("Failed to read output"),
        b"previous good image"
    );
}

#[test]
fn test_missing_input_is_io_error() {
    let dir = tempdir().expect("Failed to create temp dir");
    let err = simg::rechunk_path(
        &dir.path().join("missing.simg"),
        &dir.path().join("out.simg"),
        &RechunkOptions::default(),
    )
    .expect_err("Missing input should fail");
    assert!(matches!(err, SparseError::Io(_)));
}

#[test]
fn test_inspect_path() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("image.simg");
    std::fs::write(
        &path,
        common::build_image(BS, &[Chunk::fill(3, 0), common::raw_chunk(2, BS, 7)]),
    )
    .expect("Failed to write image");

    let layout = simg::inspect_path(&path).expect("Inspect failed");
    assert_eq!(layout.header.total_blocks, 5);
    assert_eq!(layout.chunks.len(), 2);
    assert_eq!(layout.chunks[0].chunk_type, ChunkType::Fill);
    assert_eq!(layout.chunks[1].start_block, 3);
}

#[test]
fn test_default_output_path_is_next_to_input() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input_path = dir.path().join("vendor.simg");
    std::fs::write(&input_path, common::build_image(BS, &[Chunk::dont_care(8)]))
        .expect("Failed to write input");

    let output_path = simg::default_output_path(&input_path);
    simg::rechunk_path(&input_path, &output_path, &RechunkOptions::default())
        .expect("Rechunk failed");
    assert!(dir.path().join("vendor.simg.aligned").exists());
}
