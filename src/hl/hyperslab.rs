use std::fmt::{self, Display};
use std::io;
use std::ops::Deref;

use crate::internal_prelude::*;

/// Number of elements addressed by `count` blocks of shape `block`.
///
/// An empty `count` stands for a single block. Returns 0 if `block` is empty and
/// saturates at `usize::MAX`.
pub fn nof_datapoints(count: &[isize], block: &[isize]) -> usize {
    if block.is_empty() {
        return 0;
    }
    block.iter().enumerate().fold(1usize, |acc, (axis, &b)| {
        let n = count.get(axis).copied().unwrap_or(1);
        acc.saturating_mul(b.max(0) as usize).saturating_mul(n.max(0) as usize)
    })
}

fn common_rank(seqs: &[(&str, &[isize])]) -> Result<usize> {
    let mut rank: Option<(&str, usize)> = None;
    for &(name, seq) in seqs.iter().filter(|(_, seq)| !seq.is_empty()) {
        match rank {
            None => rank = Some((name, seq.len())),
            Some((first, len)) => ensure!(
                seq.len() == len,
                InvalidArgument,
                "hyperslab {} has rank {} but {} has rank {}",
                name,
                seq.len(),
                first,
                len
            ),
        }
    }
    Ok(rank.map_or(0, |(_, len)| len))
}

/// A strided, blocked sub-region of a rectangular index space.
///
/// The four sequences are stored verbatim; empty sequences take their defaults
/// (`start` = 0, `stride` = 1, `count` = 1) when the slab is resolved against a
/// dataset. Only the mutual consistency of the sequence lengths is checked on
/// construction since the slab knows nothing of the target shape.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Hyperslab {
    start: Vec<isize>,
    stride: Vec<isize>,
    count: Vec<isize>,
    block: Vec<isize>,
}

impl Hyperslab {
    pub fn new(start: &[isize], stride: &[isize], count: &[isize], block: &[isize]) -> Result<Self> {
        common_rank(&[("start", start), ("stride", stride), ("count", count), ("block", block)])?;
        Ok(Self {
            start: start.to_vec(),
            stride: stride.to_vec(),
            count: count.to_vec(),
            block: block.to_vec(),
        })
    }

    /// A single block of shape `block` at offset `start`.
    pub fn from_block(start: &[isize], block: &[isize]) -> Result<Self> {
        Self::new(start, &[], &[], block)
    }

    /// `count` adjacent blocks of shape `block` starting at `start` (stride equals block).
    pub fn from_blocks(start: &[isize], count: &[isize], block: &[isize]) -> Result<Self> {
        Self::new(start, block, count, block)
    }

    pub fn start(&self) -> &[isize] {
        &self.start
    }

    pub fn stride(&self) -> &[isize] {
        &self.stride
    }

    pub fn count(&self) -> &[isize] {
        &self.count
    }

    pub fn block(&self) -> &[isize] {
        &self.block
    }

    /// Common length of the non-empty sequences, or 0 if all of them are empty.
    pub fn rank(&self) -> usize {
        [&self.start, &self.stride, &self.count, &self.block]
            .iter()
            .map(|seq| seq.len())
            .find(|&len| len > 0)
            .unwrap_or(0)
    }

    pub fn nof_datapoints(&self) -> usize {
        nof_datapoints(&self.count, &self.block)
    }

    /// Resolves the slab against an array of the given rank, filling in defaults.
    pub fn resolve(&self, ndim: usize) -> Result<RawHyperslab> {
        for (name, seq) in self.named() {
            ensure!(
                seq.is_empty() || seq.len() == ndim,
                InvalidArgument,
                "hyperslab {} has rank {}, dataset has rank {}",
                name,
                seq.len(),
                ndim
            );
        }
        ensure!(!self.block.is_empty(), InvalidArgument, "hyperslab block is not set");
        let or_default = |seq: &[isize], axis: usize, default: isize| {
            if seq.is_empty() {
                default
            } else {
                seq[axis]
            }
        };
        let mut dims = Vec::with_capacity(ndim);
        for axis in 0..ndim {
            let start = or_default(&self.start, axis, 0);
            let stride = or_default(&self.stride, axis, 1);
            let count = or_default(&self.count, axis, 1);
            let block = self.block[axis];
            ensure!(start >= 0, InvalidArgument, "start {} is unset for axis {}", start, axis);
            ensure!(stride >= 1, InvalidArgument, "stride {} < 1 for axis {}", stride, axis);
            ensure!(count >= 1, InvalidArgument, "count {} < 1 for axis {}", count, axis);
            ensure!(block >= 1, InvalidArgument, "block {} < 1 for axis {}", block, axis);
            ensure!(
                count == 1 || stride >= block,
                InvalidArgument,
                "blocks overlap for axis {}: stride {} < block {}",
                axis,
                stride,
                block
            );
            let slice = RawSlice::new(start as _, stride as _, count as _, block as _);
            ensure!(slice.checked_end().is_some(), InvalidArgument, "axis {} overflows", axis);
            dims.push(slice);
        }
        let hyper = RawHyperslab::from(dims);
        ensure!(hyper.checked_size().is_some(), InvalidArgument, "hyperslab size overflows");
        Ok(hyper)
    }

    /// Writes a human-readable description of the slab to `sink`.
    pub fn summary<W: io::Write>(&self, sink: &mut W) -> io::Result<()> {
        writeln!(sink, "[Hyperslab] Summary of internal parameters")?;
        writeln!(sink, "-- {:<14} = {}", "Rank", self.rank())?;
        for (name, seq) in self.named() {
            writeln!(sink, "-- {:<14} = {:?}", capitalize(name), seq)?;
        }
        writeln!(sink, "-- nof. datapoints = {}", self.nof_datapoints())
    }

    fn named(&self) -> [(&'static str, &[isize]); 4] {
        [
            ("start", &self.start),
            ("stride", &self.stride),
            ("count", &self.count),
            ("block", &self.block),
        ]
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |c| c.to_uppercase().chain(chars).collect())
}

impl Display for Hyperslab {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "start={:?} stride={:?} count={:?} block={:?}",
            self.start, self.stride, self.count, self.block
        )
    }
}

/// Fully resolved selection along a single axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawSlice {
    pub start: Ix,
    pub stride: Ix,
    pub count: Ix,
    pub block: Ix,
}

impl RawSlice {
    pub fn new(start: Ix, stride: Ix, count: Ix, block: Ix) -> Self {
        Self { start, stride, count, block }
    }

    /// A single block `[start, start + block)`.
    pub fn block(start: Ix, block: Ix) -> Self {
        Self::new(start, 1, 1, block)
    }

    /// One past the highest addressed index.
    pub fn end(&self) -> Ix {
        if self.count == 0 {
            self.start
        } else {
            self.start + self.stride * (self.count - 1) + self.block
        }
    }

    fn checked_end(&self) -> Option<Ix> {
        if self.count == 0 {
            return Some(self.start);
        }
        self.stride.checked_mul(self.count - 1)?.checked_add(self.block)?.checked_add(self.start)
    }

    /// Number of addressed indices along this axis.
    pub fn len(&self) -> usize {
        self.count * self.block
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Addressed indices in buffer order: block by block, then within each block.
    pub fn indices(&self) -> Vec<Ix> {
        let mut out = Vec::with_capacity(self.len());
        for c in 0..self.count {
            let offset = self.start + c * self.stride;
            out.extend(offset..offset + self.block);
        }
        out
    }

    /// Contiguous `(offset, length)` runs; adjacent blocks are merged.
    pub fn runs(&self) -> Vec<(Ix, Ix)> {
        if self.is_empty() {
            vec![]
        } else if self.stride == self.block || self.count == 1 {
            vec![(self.start, self.len())]
        } else {
            (0..self.count).map(|c| (self.start + c * self.stride, self.block)).collect()
        }
    }
}

/// A hyperslab resolved against a concrete rank, as consumed by storage backends.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RawHyperslab {
    dims: Vec<RawSlice>,
}

impl Deref for RawHyperslab {
    type Target = [RawSlice];

    fn deref(&self) -> &Self::Target {
        &self.dims
    }
}

impl From<Vec<RawSlice>> for RawHyperslab {
    fn from(dims: Vec<RawSlice>) -> Self {
        Self { dims }
    }
}

impl RawHyperslab {
    /// Selects the whole of an array with the given shape.
    pub fn all(shape: &[Ix]) -> Self {
        shape.iter().map(|&dim| RawSlice::block(0, dim)).collect::<Vec<_>>().into()
    }

    /// Selects a single block.
    pub fn from_block(start: &[Ix], block: &[Ix]) -> Self {
        start.iter().zip(block).map(|(&s, &b)| RawSlice::block(s, b)).collect::<Vec<_>>().into()
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Number of selected elements.
    pub fn size(&self) -> usize {
        self.dims.iter().map(RawSlice::len).product()
    }

    fn checked_size(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, s| acc.checked_mul(s.count.checked_mul(s.block)?))
    }

    /// Shape of the selection when its elements are packed densely.
    pub fn out_shape(&self) -> Vec<Ix> {
        self.dims.iter().map(RawSlice::len).collect()
    }

    /// One past the highest addressed index, per axis.
    pub fn end(&self) -> Vec<Ix> {
        self.dims.iter().map(RawSlice::end).collect()
    }

    /// Checks that the selection lies within an array of the given shape.
    pub fn ensure_within(&self, shape: &[Ix]) -> Result<()> {
        ensure!(
            self.ndim() == shape.len(),
            InvalidArgument,
            "selection rank ({}) != shape rank ({})",
            self.ndim(),
            shape.len()
        );
        for (axis, (slice, &dim)) in self.dims.iter().zip(shape).enumerate() {
            ensure!(
                slice.is_empty() || slice.end() <= dim,
                OutOfRange,
                "selection [{}, {}) out of bounds for axis {} with size {}",
                slice.start,
                slice.end(),
                axis,
                dim
            );
        }
        Ok(())
    }

    /// Calls `f` for every contiguous run of selected elements along the last axis.
    ///
    /// The arguments are the coordinates along the leading axes, the offset and length
    /// of the run along the last axis, and the position of the run's first element in
    /// a densely packed row-major buffer. Runs are visited in buffer order.
    pub fn try_for_each_run<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&[Ix], Ix, Ix, usize) -> Result<()>,
    {
        let ndim = self.ndim();
        if ndim == 0 || self.size() == 0 {
            return Ok(());
        }
        let lead: Vec<Vec<Ix>> = self.dims[..ndim - 1].iter().map(RawSlice::indices).collect();
        let runs = self.dims[ndim - 1].runs();
        let mut pos = vec![0; ndim - 1];
        let mut coords: Vec<Ix> = lead.iter().map(|ix| ix[0]).collect();
        let mut offset = 0;
        loop {
            for &(start, len) in &runs {
                f(&coords, start, len, offset)?;
                offset += len;
            }
            let mut axis = ndim - 1;
            loop {
                if axis == 0 {
                    return Ok(());
                }
                axis -= 1;
                pos[axis] += 1;
                if pos[axis] < lead[axis].len() {
                    coords[axis] = lead[axis][pos[axis]];
                    break;
                }
                pos[axis] = 0;
                coords[axis] = lead[axis][0];
            }
        }
    }
}
