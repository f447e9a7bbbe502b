pub mod lz77;
pub mod split;

pub use crate::error::{DecompressionError, Lz77Error, SplitError};

/// Compressed sections are padded so the next one starts word-aligned.
pub const ALIGNMENT: usize = 4;
/// Largest chunk a single split-block part may cover.
pub const MAX_PART_SIZE: usize = 4096;
/// A split block's offset table never holds more than this many parts.
pub const MAX_PARTS: usize = 16;
