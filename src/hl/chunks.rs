use std::fmt::{self, Display};

use crate::hl::extents::checked_len;
use crate::internal_prelude::*;

/// Default cap on the byte size of an automatically derived chunk (256 MiB).
pub const DEFAULT_BUFFER_LIMIT: BufferLimit = BufferLimit(256 * 1024 * 1024);

/// Upper bound on the byte size of a single chunk when the chunk shape is derived
/// from the dataset shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferLimit(pub usize);

impl BufferLimit {
    pub fn bytes(self) -> usize {
        self.0
    }
}

impl Default for BufferLimit {
    fn default() -> Self {
        DEFAULT_BUFFER_LIMIT
    }
}

impl From<usize> for BufferLimit {
    fn from(bytes: usize) -> Self {
        Self(bytes)
    }
}

impl Display for BufferLimit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} bytes", self.0)
    }
}

/// Chunking mode of a new dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Chunk {
    /// Derive the chunk shape from the dataset shape (default).
    Auto,
    Manual(Vec<Ix>),
}

impl Default for Chunk {
    fn default() -> Self {
        Self::Auto
    }
}

impl Chunk {
    /// Resolves the chunk shape for a dataset of the given shape.
    pub fn resolve(&self, shape: &[Ix], elem_size: usize, limit: BufferLimit) -> Result<Vec<Ix>> {
        match self {
            Self::Auto => Ok(infer_chunk_shape(shape, elem_size, limit)),
            Self::Manual(chunk) => {
                validate_chunk(chunk, shape)?;
                ensure!(
                    checked_len(chunk).and_then(|len| len.checked_mul(elem_size)).is_some(),
                    InvalidArgument,
                    "chunk {:?} overflows the addressable size",
                    chunk
                );
                Ok(chunk.clone())
            }
        }
    }
}

/// Starts from `chunk = shape` and halves (rounding up) the largest chunk dimension,
/// lowest axis first on ties, until the chunk fits into `limit` bytes or is all ones.
pub fn infer_chunk_shape(shape: &[Ix], elem_size: usize, limit: BufferLimit) -> Vec<Ix> {
    let mut chunk: Vec<Ix> = shape.iter().map(|&dim| dim.max(1)).collect();
    loop {
        let bytes = chunk.iter().fold(elem_size, |acc, &c| acc.saturating_mul(c));
        if bytes <= limit.bytes() {
            break;
        }
        let (axis, &largest) = match chunk.iter().enumerate().rev().max_by_key(|&(_, &c)| c) {
            Some(item) => item,
            None => break,
        };
        if largest <= 1 {
            break;
        }
        chunk[axis] = (largest + 1) / 2;
    }
    chunk
}

/// Checks a manually specified chunk shape against the dataset shape.
pub fn validate_chunk(chunk: &[Ix], shape: &[Ix]) -> Result<()> {
    ensure!(
        chunk.len() == shape.len(),
        InvalidArgument,
        "invalid chunk ndim: expected {}, got {}",
        shape.len(),
        chunk.len()
    );
    ensure!(
        chunk.iter().all(|&c| c > 0),
        InvalidArgument,
        "invalid chunk: {:?} (all dimensions must be positive)",
        chunk
    );
    Ok(())
}
