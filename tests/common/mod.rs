// Shared test utilities
use simg_rechunk::simg::{Chunk, ChunkReader, ImageHeader};
use std::io::Cursor;

/// Build a version 1.0 sparse image from decoded chunks
pub fn build_image(block_size: u32, chunks: &[Chunk]) -> Vec<u8> {
    let total_blocks: u32 = chunks.iter().map(|c| c.block_count).sum();
    let header = ImageHeader {
        magic: 0xED26FF3A,
        major_version: 1,
        minor_version: 0,
        file_header_size: 28,
        chunk_header_size: 12,
        block_size,
        total_blocks,
        total_chunks: chunks.len() as u32,
        image_checksum: 0xC0FFEE,
    };

    let mut image = header.encode().to_vec();
    for chunk in chunks {
        chunk
            .write_to(&mut image, block_size)
            .expect("Failed to encode chunk");
    }
    image
}

#[allow(dead_code)]
/// Deterministic literal data for a RAW chunk
pub fn raw_chunk(blocks: u32, block_size: u32, seed: u8) -> Chunk {
    let data: Vec<u8> = (0..blocks * block_size)
        .map(|i| seed.wrapping_add((i % 251) as u8))
        .collect();
    Chunk::raw(blocks, data)
}

/// Decode an image into its header and chunk list
pub fn decode_image(image: &[u8]) -> (ImageHeader, Vec<Chunk>) {
    let mut cursor = Cursor::new(image);
    let header = ImageHeader::read_from(&mut cursor).expect("Failed to decode header");
    let mut reader = ChunkReader::new(cursor, header.block_size);
    let chunks = (0..header.total_chunks)
        .map(|_| reader.next_chunk().expect("Failed to decode chunk"))
        .collect();
    (header, chunks)
}

#[allow(dead_code)]
/// Expand an image to its full logical content (DONT_CARE as zeroes)
pub fn expand_image(image: &[u8]) -> Vec<u8> {
    let (header, chunks) = decode_image(image);
    let mut out = Vec::new();
    for chunk in &chunks {
        chunk.materialize_into(header.block_size, &mut out);
    }
    out
}
