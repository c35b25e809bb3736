//! Capability interface between datasets and the array store that backs them.
//!
//! Datasets and groups never talk to a concrete storage engine directly; they hold
//! [`ObjectId`] values handed out by a [`Storage`] implementation and go through the
//! trait for every create/open/extend/transfer call. [`memory::MemoryStorage`] is the
//! bundled chunked, extensible in-memory backend.

use std::fmt::{self, Display};

use crate::hl::attribute::AttributeValue;
use crate::hl::extents::SimpleExtents;
use crate::hl::hyperslab::RawHyperslab;
use crate::internal_prelude::*;

pub mod memory;

/// Opaque identifier of an open object within a [`Storage`] backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of object a link points to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Group,
    Array,
}

impl Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Group => write!(f, "group"),
            Self::Array => write!(f, "array"),
        }
    }
}

/// Stored descriptor of a chunked array: element type, extents and chunk shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayLayout {
    pub dtype: TypeDescriptor,
    pub extents: SimpleExtents,
    pub chunk: Vec<Ix>,
}

impl ArrayLayout {
    pub fn new(dtype: TypeDescriptor, extents: SimpleExtents, chunk: &[Ix]) -> Self {
        Self { dtype, extents, chunk: chunk.to_vec() }
    }

    pub fn ndim(&self) -> usize {
        self.extents.ndim()
    }

    pub fn shape(&self) -> Vec<Ix> {
        self.extents.dims()
    }

    /// Size of a single chunk in bytes.
    pub fn chunk_bytes(&self) -> usize {
        self.chunk.iter().product::<usize>() * self.dtype.size()
    }
}

/// Handle-based primitives an array store must provide.
///
/// All ids passed in must have been returned by the same backend and not yet closed.
/// Names are `/`-separated paths relative to the parent group.
pub trait Storage: Send + Sync {
    /// Opens a new handle on the root group.
    fn root(&self) -> Result<ObjectId>;

    fn create_group(&self, parent: ObjectId, name: &str) -> Result<ObjectId>;

    fn open_group(&self, parent: ObjectId, name: &str) -> Result<ObjectId>;

    fn link_exists(&self, parent: ObjectId, name: &str) -> Result<bool>;

    fn object_kind(&self, parent: ObjectId, name: &str) -> Result<ObjectKind>;

    /// Names of the direct members of a group, sorted.
    fn member_names(&self, parent: ObjectId) -> Result<Vec<String>>;

    fn unlink(&self, parent: ObjectId, name: &str) -> Result<()>;

    /// Allocates a chunked array; missing intermediate groups are created.
    fn create_array(&self, parent: ObjectId, name: &str, layout: &ArrayLayout) -> Result<ObjectId>;

    fn open_array(&self, parent: ObjectId, name: &str) -> Result<ObjectId>;

    fn array_layout(&self, id: ObjectId) -> Result<ArrayLayout>;

    /// Grows the current extent to `shape`, preserving stored data.
    fn extend_array(&self, id: ObjectId, shape: &[Ix]) -> Result<()>;

    /// Copies the selected elements, row-major, into `buf`.
    fn read_into(&self, id: ObjectId, selection: &RawHyperslab, buf: &mut [u8]) -> Result<()>;

    /// Copies `buf`, row-major, into the selected elements.
    fn write_from(&self, id: ObjectId, selection: &RawHyperslab, buf: &[u8]) -> Result<()>;

    /// Number of chunks with allocated storage.
    fn num_chunks(&self, id: ObjectId) -> Result<usize>;

    fn set_attribute(&self, id: ObjectId, name: &str, value: AttributeValue) -> Result<()>;

    fn attribute(&self, id: ObjectId, name: &str) -> Result<AttributeValue>;

    fn attribute_names(&self, id: ObjectId) -> Result<Vec<String>>;

    fn delete_attribute(&self, id: ObjectId, name: &str) -> Result<()>;

    /// Releases a handle.
    fn close(&self, id: ObjectId) -> Result<()>;

    fn is_valid(&self, id: ObjectId) -> bool;
}

/// Splits a `/`-separated path into its segments.
pub fn path_segments(name: &str) -> Result<Vec<&str>> {
    ensure!(!name.is_empty(), InvalidArgument, "empty object name");
    let segments: Vec<&str> = name.split('/').collect();
    ensure!(
        segments.iter().all(|s| !s.is_empty()),
        InvalidArgument,
        "empty path segment in `{}`",
        name
    );
    Ok(segments)
}
