//! Native Rust equivalents of the element types stored by the LOFAR Data Access Library.
//!
//! Every value written into or read from a dataset is described by a
//! [`TypeDescriptor`]; Rust types that can be transferred directly implement [`DalType`].

#![cfg_attr(feature = "cargo-clippy", allow(clippy::missing_safety_doc))]

mod element;

pub use self::element::{
    bytes_to_vec, slice_as_bytes, slice_as_bytes_mut, DalType, FloatSize, IntSize, TypeDescriptor,
};
