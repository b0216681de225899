//! Low-level chunk format: header/primitive decoding and the chunk id table.

/// Chunk id table and tagging.
pub mod id;
/// Cursor over a chunked byte stream.
pub mod reader;

pub use id::ChunkId;
pub use reader::{ChunkError, ChunkHeader, ChunkReader, HEADER_SIZE};
