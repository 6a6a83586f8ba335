// Module declarations
pub mod chunk;
mod engine;
mod error;
pub mod header;
mod options;
mod reader;
mod transcode;
mod window;
mod writer;

// Public re-exports
pub use chunk::{Chunk, ChunkData, ChunkHeader, ChunkType};
pub use engine::{ChunkSink, Feed, RechunkEngine};
pub use error::SparseError;
pub use header::ImageHeader;
pub use options::{RechunkOptions, DEFAULT_ALIGNMENT_KIB};
pub use reader::ChunkReader;
pub use transcode::{
    default_output_path, inspect, inspect_path, rechunk, rechunk_path, rechunk_spooled, ChunkInfo,
    ImageLayout, RechunkSummary, STDIO_PATH,
};
pub use window::MergeWindow;
pub use writer::SparseWriter;
