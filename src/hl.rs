pub mod attribute;
pub mod chunks;
pub mod dataset;
pub mod extents;
pub mod file;
pub mod group;
pub mod hyperslab;

pub use self::{
    attribute::{AttributeValue, Location},
    chunks::{BufferLimit, Chunk, DEFAULT_BUFFER_LIMIT},
    dataset::{Dataset, DatasetBuilder, DatasetState},
    extents::{Extent, SimpleExtents},
    file::File,
    group::Group,
    hyperslab::{Hyperslab, RawHyperslab, RawSlice},
};
