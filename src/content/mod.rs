//! Content Selection and Batching
//!
//! Decides which listed files are worth documenting and packs their text into
//! size-bounded chunks for the completion endpoint.

mod chunk;
mod filter;

pub use chunk::{Chunk, ChunkStats, Chunker, format_section};
pub use filter::FileFilter;
