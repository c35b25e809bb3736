use std::fmt::{self, Debug, Display};
use std::ops::Deref;

use crate::internal_prelude::*;

/// Maximum number of dimensions of a stored array.
pub const MAX_RANK: usize = 32;

/// Number of elements in an array of shape `dims`, or `None` if it overflows `usize`.
pub fn checked_len(dims: &[Ix]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
}

/// Current and maximum size of a single dimension.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    pub dim: Ix,
    /// `None` if the dimension may grow without bound.
    pub max: Option<Ix>,
}

impl Extent {
    pub fn resizable(dim: Ix) -> Self {
        Self { dim, max: None }
    }

    pub fn is_unlimited(&self) -> bool {
        self.max.is_none()
    }

    pub fn is_valid(&self) -> bool {
        self.max.map_or(true, |max| max >= self.dim)
    }

    /// Whether the dimension may grow to `dim`.
    pub fn admits(&self, dim: Ix) -> bool {
        self.max.map_or(true, |max| dim <= max)
    }
}

impl Debug for Extent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Extent({})", self)
    }
}

impl Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..={}", self.dim, max),
            None => write!(f, "{}..", self.dim),
        }
    }
}

/// Per-axis extents of a stored array; the rank is fixed, dimensions only grow.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SimpleExtents {
    inner: Vec<Extent>,
}

impl SimpleExtents {
    /// Extents starting at `dims` with every axis unlimited.
    pub fn resizable(dims: &[Ix]) -> Self {
        Self { inner: dims.iter().map(|&dim| Extent::resizable(dim)).collect() }
    }

    pub fn ndim(&self) -> usize {
        self.inner.len()
    }

    pub fn dims(&self) -> Vec<Ix> {
        self.inner.iter().map(|e| e.dim).collect()
    }

    pub fn maxdims(&self) -> Vec<Option<Ix>> {
        self.inner.iter().map(|e| e.max).collect()
    }

    pub fn is_valid(&self) -> bool {
        self.ndim() <= MAX_RANK
            && self.inner.iter().all(Extent::is_valid)
            && checked_len(&self.dims()).is_some()
    }

    /// Returns a copy grown to `dims`, keeping the maximum sizes.
    ///
    /// Fails if the rank differs, if any dimension would shrink or pass its maximum,
    /// or if the element count would overflow.
    pub fn grown(&self, dims: &[Ix]) -> Result<Self> {
        ensure!(
            dims.len() == self.ndim(),
            InvalidArgument,
            "cannot extend rank-{} extents to rank {}",
            self.ndim(),
            dims.len()
        );
        ensure!(checked_len(dims).is_some(), InvalidArgument, "extents {:?} overflow", dims);
        let mut inner = self.inner.clone();
        for (axis, (extent, &dim)) in inner.iter_mut().zip(dims).enumerate() {
            ensure!(
                dim >= extent.dim,
                InvalidArgument,
                "cannot shrink axis {} from {} to {}",
                axis,
                extent.dim,
                dim
            );
            ensure!(
                extent.admits(dim),
                InvalidArgument,
                "axis {} cannot grow to {} beyond its maximum size {}",
                axis,
                dim,
                extent
            );
            extent.dim = dim;
        }
        Ok(Self { inner })
    }
}

impl Deref for SimpleExtents {
    type Target = [Extent];

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Debug for SimpleExtents {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SimpleExtents({})", self)
    }
}

impl Display for SimpleExtents {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let extents = self.iter().map(ToString::to_string).collect::<Vec<_>>();
        write!(f, "[{}]", extents.join(", "))
    }
}
