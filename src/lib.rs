//! Hyperslab-addressed dataset I/O for the LOFAR Data Access Library.
//!
//! This crate provides chunked, extensible n-dimensional datasets organised in groups,
//! read and written through strided, blocked hyperslab selections. Some of the features
//! include:
//!
//! - Automatic growth of a dataset when a write addresses elements beyond its extent.
//! - Chunk shapes derived from the dataset shape under an explicit buffering limit.
//! - A storage capability trait with a bundled in-memory chunked backend.
//! - Multi-dimensional array reading/writing interface via `ndarray`.
//!
//! Native element types are provided by the `dal-types` crate.

#![cfg_attr(feature = "cargo-clippy", warn(clippy::all))]
#![cfg_attr(feature = "cargo-clippy", allow(clippy::module_name_repetitions))]
#![cfg_attr(feature = "cargo-clippy", allow(clippy::must_use_candidate))]
#![cfg_attr(feature = "cargo-clippy", allow(clippy::missing_errors_doc))]
#![cfg_attr(feature = "cargo-clippy", allow(clippy::wildcard_imports))]
#![cfg_attr(feature = "cargo-clippy", allow(clippy::cast_possible_wrap))]
#![cfg_attr(not(test), allow(dead_code))]

mod export {
    pub use crate::{
        error::{Error, ErrorKind, Result},
        hl::extents::{Extent, SimpleExtents, MAX_RANK},
        hl::hyperslab::{nof_datapoints, Hyperslab, RawHyperslab, RawSlice},
        hl::{
            AttributeValue, BufferLimit, Dataset, DatasetBuilder, DatasetState, File, Group,
            Location, DEFAULT_BUFFER_LIMIT,
        },
    };

    /// Index type used for shapes and offsets.
    pub type Ix = usize;

    pub mod types {
        pub use dal_types::*;
    }

    pub mod dataset {
        pub use crate::hl::chunks::{infer_chunk_shape, validate_chunk, Chunk};
        pub use crate::hl::dataset::{Dataset, DatasetBuilder, DatasetState};
    }
}

pub use crate::export::*;

#[macro_use]
mod macros;

mod error;
mod handle;

mod hl;
pub mod storage;

mod internal_prelude {
    pub use dal_types::{
        bytes_to_vec, slice_as_bytes, slice_as_bytes_mut, DalType, TypeDescriptor,
    };
    pub use log::{debug, trace, warn};

    pub use crate::{
        export::*,
        handle::Handle,
        storage::{ArrayLayout, ObjectId, ObjectKind, Storage},
    };
}
