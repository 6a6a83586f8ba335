use bytes::BytesMut;

use crate::simg::chunk::{Chunk, ChunkData, ChunkType};

/// Accumulation buffer for one alignment window.
///
/// The window starts out as DONT_CARE and is promoted to RAW as soon as a
/// RAW or FILL chunk lands in it. Once promoted, every byte of the window is
/// held literally in `buffer`; don't-care spans become zeroes.
#[derive(Debug)]
pub struct MergeWindow {
    capacity: u32,
    block_size: u32,
    filled: u64,
    aggregate_type: ChunkType,
    block_count: u32,
    buffer: BytesMut,
}

impl MergeWindow {
    pub fn new(capacity: u32, block_size: u32) -> Self {
        Self {
            capacity,
            block_size,
            filled: 0,
            aggregate_type: ChunkType::DontCare,
            block_count: 0,
            buffer: BytesMut::new(),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Bytes placed in the window so far; also the aggregate total size.
    pub fn filled(&self) -> u64 {
        self.filled
    }

    pub fn remaining(&self) -> u64 {
        self.capacity as u64 - self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn aggregate_type(&self) -> ChunkType {
        self.aggregate_type
    }

    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Place `chunk` into the window. The caller guarantees it fits.
    pub fn merge(&mut self, chunk: &Chunk) {
        let size = chunk.payload_bytes(self.block_size);
        debug_assert!(size <= self.remaining(), "chunk overflows merge window");
        if size == 0 {
            return;
        }

        match &chunk.data {
            ChunkData::Raw(bytes) => {
                self.promote();
                self.buffer.extend_from_slice(bytes);
            }
            ChunkData::Fill(pattern) => {
                self.promote();
                let pattern = pattern.to_le_bytes();
                self.buffer
                    .extend(pattern.iter().copied().cycle().take(size as usize));
            }
            ChunkData::DontCare => {
                if self.aggregate_type == ChunkType::Raw {
                    self.buffer.resize(self.buffer.len() + size as usize, 0);
                }
            }
        }

        self.block_count += chunk.block_count;
        self.filled += size;
    }

    /// Switch to RAW, materializing any don't-care span already accumulated.
    fn promote(&mut self) {
        if self.aggregate_type != ChunkType::Raw {
            self.buffer.resize(self.filled as usize, 0);
            self.aggregate_type = ChunkType::Raw;
        }
    }

    /// Turn the window contents into one output chunk and reset.
    ///
    /// Returns `None` when nothing has been placed.
    pub fn take(&mut self) -> Option<Chunk> {
        if self.is_empty() {
            return None;
        }

        let chunk = match self.aggregate_type {
            ChunkType::Raw => {
                debug_assert_eq!(self.buffer.len() as u64, self.filled);
                Chunk::raw(self.block_count, self.buffer.split().freeze())
            }
            ChunkType::Fill | ChunkType::DontCare => Chunk::dont_care(self.block_count),
        };

        self.filled = 0;
        self.block_count = 0;
        self.aggregate_type = ChunkType::DontCare;
        self.buffer.clear();
        Some(chunk)
    }
}
