// Library module for simg-rechunk
// This exposes the public API for the CLI and integration tests

pub mod simg;

// Re-export the main public API
pub use simg::{rechunk, rechunk_path, RechunkOptions, RechunkSummary, SparseError};
