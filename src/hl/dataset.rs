use std::fmt::{self, Debug, Display};
use std::io;

use ndarray::{ArrayD, ArrayView, Dimension, IxDyn};

use crate::hl::attribute::Location;
use crate::hl::chunks::{BufferLimit, Chunk};
use crate::hl::extents::{checked_len, SimpleExtents, MAX_RANK};
use crate::hl::group::Group;
use crate::hl::hyperslab::{Hyperslab, RawHyperslab};
use crate::internal_prelude::*;

/// Lifecycle state of a [`Dataset`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DatasetState {
    /// Constructed but not yet created or opened.
    Unopened,
    Open,
    /// Terminal: the storage handle has been released.
    Closed,
}

impl Display for DatasetState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unopened => write!(f, "unopened"),
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// A chunked, extensible n-dimensional array addressed by hyperslabs.
///
/// Writes that address elements beyond the current shape grow the array first; reads
/// must stay within the current shape. The dataset owns its storage handle exclusively
/// and releases it on [`close`](Dataset::close) or drop. The parent group is only
/// referred to by id and must outlive the dataset.
pub struct Dataset {
    name: String,
    parent: Option<ObjectId>,
    handle: Handle,
    shape: Vec<Ix>,
    chunk: Vec<Ix>,
    dtype: TypeDescriptor,
    state: DatasetState,
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.state {
            DatasetState::Open => write!(
                f,
                "<DAL dataset \"{}\": shape {:?}, type {}>",
                self.name, self.shape, self.dtype
            ),
            state => write!(f, "<DAL dataset \"{}\" ({})>", self.name, state),
        }
    }
}

impl Dataset {
    /// An unopened dataset; use one of the `create` methods or [`open`](Dataset::open).
    pub fn new() -> Self {
        Self {
            name: String::new(),
            parent: None,
            handle: Handle::invalid(),
            shape: vec![],
            chunk: vec![],
            dtype: TypeDescriptor::default(),
            state: DatasetState::Unopened,
        }
    }

    /// Creates a `float64` dataset with the chunk shape derived from `shape`.
    pub fn create(&mut self, parent: &Group, name: &str, shape: &[Ix]) -> Result<()> {
        self.create_from(&DatasetBuilder::new(parent), name, shape)
    }

    /// Creates a `float64` dataset with a manual chunk shape.
    pub fn create_with_chunk(
        &mut self, parent: &Group, name: &str, shape: &[Ix], chunk: &[Ix],
    ) -> Result<()> {
        let mut builder = DatasetBuilder::new(parent);
        builder.chunk(chunk);
        self.create_from(&builder, name, shape)
    }

    /// Creates a dataset of the given element type, with an optional manual chunk shape.
    pub fn create_typed(
        &mut self, parent: &Group, name: &str, shape: &[Ix], chunk: Option<&[Ix]>,
        dtype: TypeDescriptor,
    ) -> Result<()> {
        let mut builder = DatasetBuilder::new(parent);
        builder.element_type(dtype);
        if let Some(chunk) = chunk {
            builder.chunk(chunk);
        }
        self.create_from(&builder, name, shape)
    }

    fn create_from(&mut self, builder: &DatasetBuilder, name: &str, shape: &[Ix]) -> Result<()> {
        self.ensure_unopened("create")?;
        ensure!(!shape.is_empty(), InvalidArgument, "dataset rank must be at least 1");
        ensure!(
            shape.len() <= MAX_RANK,
            InvalidArgument,
            "dataset rank {} exceeds the maximum of {}",
            shape.len(),
            MAX_RANK
        );
        ensure!(
            shape.iter().all(|&dim| dim > 0),
            InvalidArgument,
            "invalid shape {:?} (all dimensions must be positive)",
            shape
        );
        ensure!(
            checked_len(shape).and_then(|len| len.checked_mul(builder.dtype.size())).is_some(),
            InvalidArgument,
            "shape {:?} overflows the addressable size",
            shape
        );
        let chunk = builder.chunk.resolve(shape, builder.dtype.size(), builder.limit)?;

        let parent = builder.parent;
        let shared = parent.storage_arc()?.clone();
        let (storage, parent_id) = parent.location()?;
        if builder.replace && storage.link_exists(parent_id, name)? {
            debug!("replacing `{}` in {}", name, parent.name());
            storage.unlink(parent_id, name)?;
        }
        let layout = ArrayLayout::new(builder.dtype, SimpleExtents::resizable(shape), &chunk);
        let id = storage
            .create_array(parent_id, name, &layout)
            .map_err(|err| err.context(format!("cannot create `{}` in {}", name, parent.name())))?;
        self.handle = Handle::new(shared, id);
        debug!(
            "created dataset `{}` in {}: shape {:?}, chunk {:?}, type {}",
            name,
            parent.name(),
            shape,
            chunk,
            builder.dtype
        );
        self.bind(name, parent_id, layout);
        Ok(())
    }

    /// Opens an existing dataset, reading its shape, chunk shape and type from storage.
    ///
    /// A missing dataset is reported as `NotFound` and leaves the dataset unopened.
    pub fn open(&mut self, parent: &Group, name: &str) -> Result<()> {
        self.ensure_unopened("open")?;
        let shared = parent.storage_arc()?.clone();
        let (storage, parent_id) = parent.location()?;
        let id = match storage.open_array(parent_id, name) {
            Ok(id) => id,
            Err(err) => {
                trace!("cannot open `{}` in {}: {}", name, parent.name(), err);
                return Err(err);
            }
        };
        let handle = Handle::new(shared, id);
        let layout = storage.array_layout(id)?;
        self.handle = handle;
        debug!("opened dataset `{}` in {}: shape {:?}", name, parent.name(), layout.shape());
        self.bind(name, parent_id, layout);
        Ok(())
    }

    fn bind(&mut self, name: &str, parent: ObjectId, layout: ArrayLayout) {
        self.name = name.to_owned();
        self.parent = Some(parent);
        self.shape = layout.shape();
        self.chunk = layout.chunk;
        self.dtype = layout.dtype;
        self.state = DatasetState::Open;
    }

    /// Releases the storage handle. Closing more than once is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let previous = self.state;
        self.state = DatasetState::Closed;
        if previous == DatasetState::Open {
            debug!("closing dataset `{}`", self.name);
            self.handle.close()?;
        }
        Ok(())
    }

    fn ensure_unopened(&self, op: &str) -> Result<()> {
        ensure!(
            self.state == DatasetState::Unopened,
            InvalidState,
            "cannot {} `{}`: dataset is already {}",
            op,
            if self.name.is_empty() { "<unnamed>" } else { self.name.as_str() },
            self.state
        );
        Ok(())
    }

    fn ensure_open(&self) -> Result<(&dyn Storage, ObjectId)> {
        match (self.state, self.handle.location()) {
            (DatasetState::Open, Some(location)) => Ok(location),
            (state, _) => fail!(InvalidState, "dataset `{}` is not open ({})", self.name, state),
        }
    }

    fn ensure_dtype<T: DalType>(&self) -> Result<()> {
        let requested = T::type_descriptor();
        ensure!(
            requested == self.dtype,
            InvalidArgument,
            "element type mismatch for `{}`: dataset holds {}, buffer holds {}",
            self.name,
            self.dtype,
            requested
        );
        Ok(())
    }

    fn resolve<T: DalType>(&self, slab: &Hyperslab, len: usize) -> Result<RawHyperslab> {
        self.ensure_open()?;
        self.ensure_dtype::<T>()?;
        let selection = slab.resolve(self.rank())?;
        ensure!(
            len == selection.size(),
            InvalidArgument,
            "buffer holds {} elements, hyperslab addresses {}",
            len,
            selection.size()
        );
        Ok(selection)
    }

    /// Grows the dataset so that it covers `end` (one past the highest index) on every axis.
    fn extend_to(&mut self, end: &[Ix]) -> Result<()> {
        let (storage, id) = self.ensure_open()?;
        let shape: Vec<Ix> = self.shape.iter().zip(end).map(|(&dim, &e)| dim.max(e)).collect();
        if shape != self.shape {
            ensure!(
                checked_len(&shape).is_some(),
                InvalidArgument,
                "cannot extend `{}` to {:?}: size overflows",
                self.name,
                shape
            );
            debug!("extending `{}` from {:?} to {:?}", self.name, self.shape, shape);
            storage.extend_array(id, &shape).map_err(|err| err.context(&self.name))?;
            self.shape = shape;
        }
        Ok(())
    }

    /// Writes `buf` into the region addressed by `slab`, growing the dataset if needed.
    ///
    /// The geometry is validated before anything is modified. If the transfer fails after
    /// the dataset has grown, the new shape stays in place.
    pub fn write_hyperslab<T: DalType>(&mut self, buf: &[T], slab: &Hyperslab) -> Result<()> {
        let selection = self.resolve::<T>(slab, buf.len())?;
        self.extend_to(&selection.end())?;
        let (storage, id) = self.ensure_open()?;
        trace!("writing {} elements to `{}` at {}", buf.len(), self.name, slab);
        storage
            .write_from(id, &selection, slice_as_bytes(buf))
            .map_err(|err| err.context(&self.name))
    }

    /// Writes a single block of shape `block` at `start`.
    pub fn write_data<T: DalType>(
        &mut self, buf: &[T], start: &[isize], block: &[isize],
    ) -> Result<()> {
        self.write_hyperslab(buf, &Hyperslab::from_block(start, block)?)
    }

    /// Writes `count` blocks of shape `block` starting at `start`.
    ///
    /// The blocks are packed side by side: the stride on every axis equals `block`.
    pub fn write_blocks<T: DalType>(
        &mut self, buf: &[T], start: &[isize], count: &[isize], block: &[isize],
    ) -> Result<()> {
        self.write_hyperslab(buf, &Hyperslab::from_blocks(start, count, block)?)
    }

    /// Reads the region addressed by `slab` into `buf`; the region must lie within the shape.
    pub fn read_hyperslab<T: DalType>(&self, buf: &mut [T], slab: &Hyperslab) -> Result<()> {
        let selection = self.resolve::<T>(slab, buf.len())?;
        selection.ensure_within(&self.shape).map_err(|err| err.context(&self.name))?;
        let (storage, id) = self.ensure_open()?;
        trace!("reading {} elements from `{}` at {}", buf.len(), self.name, slab);
        storage
            .read_into(id, &selection, slice_as_bytes_mut(buf))
            .map_err(|err| err.context(&self.name))
    }

    /// Reads a single block of shape `block` at `start`.
    pub fn read_data<T: DalType>(&self, buf: &mut [T], start: &[isize], block: &[isize]) -> Result<()> {
        self.read_hyperslab(buf, &Hyperslab::from_block(start, block)?)
    }

    /// Reads `count` blocks of shape `block` starting at `start`, packed with stride = `block`.
    pub fn read_blocks<T: DalType>(
        &self, buf: &mut [T], start: &[isize], count: &[isize], block: &[isize],
    ) -> Result<()> {
        self.read_hyperslab(buf, &Hyperslab::from_blocks(start, count, block)?)
    }

    /// Writes a standard-layout array with its top-left corner at `start`.
    pub fn write_array<'a, T, A, D>(&mut self, arr: A, start: &[isize]) -> Result<()>
    where
        T: DalType,
        A: Into<ArrayView<'a, T, D>>,
        D: Dimension,
    {
        let view = arr.into();
        let block: Vec<isize> = view.shape().iter().map(|&dim| dim as _).collect();
        match view.as_slice() {
            Some(data) => self.write_data(data, start, &block),
            None => fail!(InvalidArgument, "input array is not in standard layout"),
        }
    }

    /// Reads a block into a new array of shape `block`.
    pub fn read_array<T: DalType>(&self, start: &[isize], block: &[Ix]) -> Result<ArrayD<T>> {
        let size = match checked_len(block) {
            Some(size) => size,
            None => fail!(InvalidArgument, "block {:?} overflows the addressable size", block),
        };
        let mut data = zeroed_buffer::<T>(size)?;
        let slab: Vec<isize> = block.iter().map(|&dim| dim as _).collect();
        self.read_data(&mut data, start, &slab)?;
        Ok(ArrayD::from_shape_vec(IxDyn(block), data)?)
    }

    /// Reads the whole dataset into an array of its current shape.
    pub fn read_dyn<T: DalType>(&self) -> Result<ArrayD<T>> {
        self.ensure_open()?;
        let start = vec![0; self.rank()];
        self.read_array(&start, &self.shape)
    }

    /// Reads the whole dataset into a flat row-major vector.
    pub fn read_raw<T: DalType>(&self) -> Result<Vec<T>> {
        self.ensure_open()?;
        let mut data = zeroed_buffer::<T>(self.nof_datapoints())?;
        let block: Vec<isize> = self.shape.iter().map(|&dim| dim as _).collect();
        let slab = Hyperslab::from_block(&[], &block)?;
        self.read_hyperslab(&mut data, &slab)?;
        Ok(data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current extent per dimension.
    pub fn shape(&self) -> &[Ix] {
        &self.shape
    }

    pub fn chunk_shape(&self) -> &[Ix] {
        &self.chunk
    }

    pub fn dtype(&self) -> TypeDescriptor {
        self.dtype
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements within the current extent (0 unless open), saturating at `usize::MAX`.
    pub fn nof_datapoints(&self) -> usize {
        if self.shape.is_empty() {
            0
        } else {
            checked_len(&self.shape).unwrap_or(usize::MAX)
        }
    }

    pub fn state(&self) -> DatasetState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == DatasetState::Open
    }

    /// Number of chunks with allocated storage.
    pub fn num_chunks(&self) -> Result<usize> {
        let (storage, id) = self.ensure_open()?;
        storage.num_chunks(id)
    }

    /// Maximum extent per dimension as stored (`None` = unlimited).
    pub fn max_shape(&self) -> Result<Vec<Option<Ix>>> {
        let (storage, id) = self.ensure_open()?;
        Ok(storage.array_layout(id)?.extents.maxdims())
    }

    /// Writes a human-readable description of the dataset to `sink`.
    pub fn summary<W: io::Write>(&self, sink: &mut W) -> io::Result<()> {
        let fmt_id = |id: Option<ObjectId>| id.map_or_else(|| "-".to_owned(), |id| id.to_string());
        writeln!(sink, "[Dataset] Summary of internal parameters")?;
        writeln!(sink, "-- Dataset name    = {}", self.name)?;
        writeln!(sink, "-- Parent object   = {}", fmt_id(self.parent))?;
        writeln!(sink, "-- Object handle   = {}", fmt_id(self.handle.id()))?;
        writeln!(sink, "-- Handle valid    = {}", self.handle.is_valid())?;
        writeln!(sink, "-- State           = {}", self.state)?;
        writeln!(sink, "-- Element type    = {}", self.dtype)?;
        writeln!(sink, "-- Rank            = {}", self.rank())?;
        writeln!(sink, "-- Shape           = {:?}", self.shape)?;
        writeln!(sink, "-- Chunk shape     = {:?}", self.chunk)?;
        writeln!(sink, "-- nof. datapoints = {}", self.nof_datapoints())
    }
}

/// Allocates a zero-filled transfer buffer, reporting allocation failure as an error.
fn zeroed_buffer<T: DalType>(len: usize) -> Result<Vec<T>> {
    let mut data: Vec<T> = Vec::new();
    if let Err(err) = data.try_reserve_exact(len) {
        fail!(Io, "cannot allocate a buffer of {} elements: {}", len, err);
    }
    data.resize(len, bytemuck::Zeroable::zeroed());
    Ok(data)
}

impl Location for Dataset {
    fn location(&self) -> Result<(&dyn Storage, ObjectId)> {
        self.ensure_open()
    }
}

/// Configuration of a new dataset, bound to its parent group.
#[derive(Clone, Debug)]
pub struct DatasetBuilder<'p> {
    parent: &'p Group,
    dtype: TypeDescriptor,
    chunk: Chunk,
    limit: BufferLimit,
    replace: bool,
}

impl<'p> DatasetBuilder<'p> {
    /// A builder for a `float64` dataset with automatic chunking.
    pub fn new(parent: &'p Group) -> Self {
        Self {
            parent,
            dtype: TypeDescriptor::default(),
            chunk: Chunk::Auto,
            limit: BufferLimit::default(),
            replace: false,
        }
    }

    /// Set the element type.
    pub fn element_type(&mut self, dtype: TypeDescriptor) -> &mut Self {
        self.dtype = dtype;
        self
    }

    /// Set chunk shape manually.
    pub fn chunk(&mut self, chunk: &[Ix]) -> &mut Self {
        self.chunk = Chunk::Manual(chunk.to_vec());
        self
    }

    /// Derive the chunk shape from the dataset shape (default option).
    pub fn chunk_auto(&mut self) -> &mut Self {
        self.chunk = Chunk::Auto;
        self
    }

    /// Cap the byte size of an automatically derived chunk.
    pub fn buffer_limit(&mut self, bytes: usize) -> &mut Self {
        self.limit = BufferLimit(bytes);
        self
    }

    /// Unlink an existing object of the same name before creating the dataset.
    pub fn replace(&mut self, replace: bool) -> &mut Self {
        self.replace = replace;
        self
    }

    /// Create the dataset and link it into the parent group.
    pub fn create(&self, name: &str, shape: &[Ix]) -> Result<Dataset> {
        let mut ds = Dataset::new();
        ds.create_from(self, name, shape)?;
        Ok(ds)
    }
}

#[cfg(test)]
pub mod tests {
    use dal_types::{FloatSize, IntSize};
    use ndarray::{arr2, Array2};

    use super::*;
    use crate::test::{with_mem_file, with_mem_storage};

    #[test]
    pub fn test_state_machine() {
        with_mem_file(|file| {
            let mut ds = Dataset::new();
            assert_eq!(ds.state(), DatasetState::Unopened);
            assert!(!ds.is_open());
            assert_err!(ds.write_data(&[1.0], &[0], &[1]), InvalidState, "not open (unopened)");
            assert_err!(ds.num_chunks(), InvalidState, "not open");
            ds.create(&file, "x", &[10]).unwrap();
            assert!(ds.is_open());
            assert_err!(ds.create(&file, "y", &[10]), InvalidState, "already open");
            assert_err!(ds.open(&file, "x"), InvalidState, "cannot open `x`");
            ds.close().unwrap();
            ds.close().unwrap();
            assert_eq!(ds.state(), DatasetState::Closed);
            let mut buf = [0.0];
            assert_err!(ds.read_data(&mut buf, &[0], &[1]), InvalidState, "not open (closed)");
            assert_err!(ds.open(&file, "x"), InvalidState, "already closed");

            let mut ds = Dataset::new();
            ds.close().unwrap();
            assert_eq!(ds.state(), DatasetState::Closed);
        })
    }

    #[test]
    pub fn test_create() {
        with_mem_file(|file| {
            let mut ds = Dataset::new();
            ds.create(&file, "x", &[100, 60]).unwrap();
            assert_eq!(ds.name(), "x");
            assert_eq!(ds.shape(), &[100, 60]);
            assert_eq!(ds.chunk_shape(), &[100, 60]);
            assert_eq!(ds.dtype(), TypeDescriptor::Float(FloatSize::U8));
            assert_eq!(ds.rank(), 2);
            assert_eq!(ds.nof_datapoints(), 6000);
            assert_eq!(ds.max_shape().unwrap(), vec![None, None]);
            assert_eq!(ds.num_chunks().unwrap(), 0);

            let mut ds = Dataset::new();
            assert_err!(ds.create(&file, "x", &[3]), AlreadyExists, "cannot create `x` in /");
            assert_eq!(ds.state(), DatasetState::Unopened);
            assert_err!(ds.create(&file, "y", &[]), InvalidArgument, "rank must be at least 1");
            assert_err!(ds.create(&file, "y", &[3, 0]), InvalidArgument, "must be positive");
            assert_err!(ds.create(&file, "y", &[1; 33]), InvalidArgument, "maximum of 32");
            assert_err!(
                ds.create_with_chunk(&file, "y", &[10, 10], &[5]),
                InvalidArgument,
                "invalid chunk ndim"
            );
            assert!(!file.link_exists("y").unwrap());

            ds.create_with_chunk(&file, "DATASETS/y", &[10, 10], &[5, 5]).unwrap();
            assert_eq!(ds.chunk_shape(), &[5, 5]);
            assert!(file.link_exists("DATASETS").unwrap());

            let mut ds = Dataset::new();
            let dtype = TypeDescriptor::Integer(IntSize::U2);
            ds.create_typed(&file, "z", &[4], None, dtype).unwrap();
            assert_eq!(ds.dtype(), dtype);
            assert_eq!(ds.chunk_shape(), &[4]);
        })
    }

    #[test]
    pub fn test_builder() {
        with_mem_file(|file| {
            let ds = file.new_dataset::<u8>().buffer_limit(1000).create("a", &[100, 100]).unwrap();
            assert_eq!(ds.dtype(), TypeDescriptor::Unsigned(IntSize::U1));
            assert_eq!(ds.chunk_shape(), &[25, 25]);

            let ds = file.new_dataset::<u8>().chunk(&[1, 100]).chunk_auto().create("b", &[8, 8]);
            assert_eq!(ds.unwrap().chunk_shape(), &[8, 8]);

            let mut builder = file.new_dataset::<i32>();
            builder.element_type(TypeDescriptor::Float(FloatSize::U4));
            assert_eq!(builder.create("c", &[2]).unwrap().dtype(), TypeDescriptor::Float(FloatSize::U4));

            assert_err!(file.new_dataset::<u8>().create("a", &[1]), AlreadyExists, "already exists");
            let ds = file.new_dataset::<i64>().replace(true).create("a", &[7]).unwrap();
            assert_eq!(ds.shape(), &[7]);
            assert_eq!(ds.dtype(), TypeDescriptor::Integer(IntSize::U8));
            file.new_dataset::<i64>().replace(true).create("fresh", &[1]).unwrap();
        })
    }

    #[test]
    pub fn test_open() {
        with_mem_storage(|storage, file| {
            let handles = storage.num_open_handles();
            let mut ds = Dataset::new();
            assert_err!(ds.open(&file, "missing"), NotFound, "`missing` not found");
            assert_eq!(ds.state(), DatasetState::Unopened);
            assert_eq!(storage.num_open_handles(), handles);

            file.create_group("g").unwrap();
            assert_err!(ds.open(&file, "g"), InvalidArgument, "`g` is not an array");

            let mut created = Dataset::new();
            created.create_with_chunk(&file, "x", &[6, 4], &[3, 2]).unwrap();
            created.write_data(&[1.0; 4], &[5, 2], &[2, 2]).unwrap();

            ds.open(&file, "x").unwrap();
            assert_eq!(ds.shape(), &[7, 4]);
            assert_eq!(ds.chunk_shape(), &[3, 2]);
            assert_eq!(ds.dtype(), TypeDescriptor::Float(FloatSize::U8));
            let mut out = [0.0; 4];
            ds.read_data(&mut out, &[5, 2], &[2, 2]).unwrap();
            assert_eq!(out, [1.0; 4]);

            drop(created);
            ds.close().unwrap();
            assert_eq!(storage.num_open_handles(), handles);
        })
    }

    #[test]
    pub fn test_round_trip_1d() {
        with_mem_file(|file| {
            let mut ds = Dataset::new();
            ds.create(&file, "x", &[1024]).unwrap();
            ds.write_data(&[7.0; 64], &[0], &[64]).unwrap();
            let mut out = vec![0.0; 64];
            ds.read_data(&mut out, &[0], &[64]).unwrap();
            assert_eq!(out, vec![7.0; 64]);
            assert_eq!(ds.shape(), &[1024]);
        })
    }

    #[test]
    pub fn test_extend_on_write() {
        with_mem_file(|file| {
            let mut ds = Dataset::new();
            ds.create(&file, "x", &[100, 100]).unwrap();
            let base: Vec<f64> = (0..10000).map(|i| i as f64).collect();
            ds.write_data(&base, &[0, 0], &[100, 100]).unwrap();

            ds.write_data(&[1.0; 1600], &[50, 50], &[40, 40]).unwrap();
            assert_eq!(ds.shape(), &[100, 100]);

            ds.write_data(&[2.0; 3600], &[50, 50], &[60, 60]).unwrap();
            assert_eq!(ds.shape(), &[110, 110]);
            assert_eq!(ds.max_shape().unwrap(), vec![None, None]);

            let arr = ds.read_dyn::<f64>().unwrap();
            assert_eq!(arr.shape(), &[110, 110]);
            assert_eq!(arr[[0, 0]], 0.0);
            assert_eq!(arr[[49, 99]], 4999.0);
            assert_eq!(arr[[99, 49]], 9949.0);
            assert_eq!(arr[[50, 50]], 2.0);
            assert_eq!(arr[[109, 109]], 2.0);
            assert_eq!(arr[[105, 10]], 0.0);

            // only the axes that need it grow
            ds.write_data(&[3.0; 5], &[0, 120], &[1, 5]).unwrap();
            assert_eq!(ds.shape(), &[110, 125]);
        })
    }

    #[test]
    pub fn test_read_out_of_range() {
        with_mem_file(|file| {
            let mut ds = Dataset::new();
            ds.create(&file, "x", &[10, 10]).unwrap();
            let mut out = vec![0.0; 25];
            assert_err!(ds.read_data(&mut out, &[8, 0], &[5, 5]), OutOfRange, "x: selection");
            assert_eq!(ds.shape(), &[10, 10]);
            ds.read_data(&mut out, &[5, 5], &[5, 5]).unwrap();
            assert_eq!(out, vec![0.0; 25]);
        })
    }

    #[test]
    pub fn test_invalid_geometry() {
        with_mem_file(|file| {
            let mut ds = Dataset::new();
            ds.create(&file, "x", &[10, 10]).unwrap();
            assert_err!(ds.write_data(&[0.0; 4], &[0], &[2, 2]), InvalidArgument, "rank");
            assert_err!(ds.write_data(&[0.0; 4], &[20, 20], &[2]), InvalidArgument, "rank");
            assert_err!(ds.write_data(&[0.0; 3], &[20, 20], &[2, 2]), InvalidArgument, "holds 3");
            assert_err!(ds.write_data(&[0.0; 4], &[-1, 20], &[2, 2]), InvalidArgument, "unset");
            let slab = Hyperslab::new(&[30, 30], &[1, 1], &[2, 2], &[2, 2]).unwrap();
            assert_err!(ds.write_hyperslab(&[0.0; 16], &slab), InvalidArgument, "overlap");
            assert_err!(ds.write_data(&[0i32; 4], &[20, 20], &[2, 2]), InvalidArgument, "float64");
            assert_eq!(ds.shape(), &[10, 10]);
            assert_eq!(ds.num_chunks().unwrap(), 0);
        })
    }

    #[test]
    pub fn test_size_overflow() {
        with_mem_file(|file| {
            let mut ds = Dataset::new();
            ds.create(&file, "x", &[1 << 30, 1 << 30]).unwrap();
            assert_eq!(ds.nof_datapoints(), 1 << 60);
            ds.summary(&mut Vec::new()).unwrap();
            assert_eq!(ds.num_chunks().unwrap(), 0);

            let mut big = Dataset::new();
            assert_err!(big.create(&file, "y", &[1 << 40, 1 << 40]), InvalidArgument, "overflows");
            assert_eq!(big.state(), DatasetState::Unopened);
            assert!(!file.link_exists("y").unwrap());

            assert_err!(ds.read_array::<f64>(&[0, 0], &[usize::MAX, 2]), InvalidArgument, "overflows");
            let far = (1isize << 40) - 1;
            assert_err!(ds.write_data(&[1.0], &[far, far], &[1, 1]), InvalidArgument, "overflows");
            assert_eq!(ds.shape(), &[1 << 30, 1 << 30]);
        })
    }

    #[test]
    pub fn test_strided_hyperslab() {
        with_mem_file(|file| {
            let mut ds = Dataset::new();
            ds.create_typed(&file, "x", &[20, 20], Some(&[4, 4][..]), TypeDescriptor::Integer(IntSize::U4))
                .unwrap();
            let slab = Hyperslab::new(&[5, 5], &[10, 10], &[2, 2], &[5, 5]).unwrap();
            assert_eq!(slab.nof_datapoints(), 100);
            let data: Vec<i32> = (0..100).collect();
            ds.write_hyperslab(&data, &slab).unwrap();
            assert_eq!(ds.shape(), &[20, 20]);

            let mut out = vec![0; 100];
            ds.read_hyperslab(&mut out, &slab).unwrap();
            assert_eq!(out, data);

            let all = ds.read_dyn::<i32>().unwrap();
            assert_eq!(all[[5, 5]], 0);
            assert_eq!(all[[5, 15]], 5);
            assert_eq!(all[[6, 5]], 10);
            assert_eq!(all[[15, 15]], 55);
            assert_eq!(all[[10, 10]], 0);
            assert_eq!(all.iter().filter(|&&v| v != 0).count(), 99);
        })
    }

    #[test]
    pub fn test_write_blocks() {
        with_mem_file(|file| {
            let mut ds = file.new_dataset::<u16>().create("x", &[4]).unwrap();
            ds.write_blocks(&[1u16, 2, 3, 4, 5, 6], &[2], &[3], &[2]).unwrap();
            assert_eq!(ds.shape(), &[8]);
            assert_eq!(ds.read_raw::<u16>().unwrap(), vec![0, 0, 1, 2, 3, 4, 5, 6]);
            let mut out = [0u16; 4];
            ds.read_blocks(&mut out, &[4], &[2], &[2]).unwrap();
            assert_eq!(out, [3, 4, 5, 6]);
        })
    }

    #[test]
    pub fn test_ndarray() {
        with_mem_file(|file| {
            let mut ds = file.new_dataset::<f32>().chunk(&[2, 2]).create("x", &[3, 3]).unwrap();
            let arr = arr2(&[[1.0f32, 2.0], [3.0, 4.0]]);
            ds.write_array(&arr, &[1, 2]).unwrap();
            assert_eq!(ds.shape(), &[3, 4]);
            assert_eq!(ds.read_array::<f32>(&[1, 2], &[2, 2]).unwrap(), arr.into_dyn());

            let t = Array2::from_shape_fn((2, 2), |(i, j)| (i * 2 + j) as f32).reversed_axes();
            assert_err!(ds.write_array(&t, &[0, 0]), InvalidArgument, "standard layout");
            ds.write_array(&arr2(&[[9.0f32]]), &[0, 0]).unwrap();

            let all = ds.read_dyn::<f32>().unwrap();
            assert_eq!(all.shape(), &[3, 4]);
            assert_eq!(all[[0, 0]], 9.0);
            assert_eq!(all[[2, 3]], 4.0);
            assert_err!(ds.read_dyn::<f64>(), InvalidArgument, "buffer holds float64");
            assert_eq!(ds.read_raw::<f32>().unwrap().len(), 12);
        })
    }

    #[test]
    pub fn test_attributes() {
        with_mem_file(|file| {
            let mut ds = Dataset::new();
            assert_err!(ds.set_attr_str("NAME", "x"), InvalidState, "not open");
            ds.create(&file, "x", &[100, 100]).unwrap();
            ds.set_attr_str("NAME", "x").unwrap();
            ds.set_attr("RANK", &[2u32]).unwrap();
            ds.set_attr("SHAPE", &[100u64, 100]).unwrap();
            assert_eq!(ds.attr_names().unwrap(), vec!["NAME", "RANK", "SHAPE"]);
            assert_eq!(ds.attr::<u64>("SHAPE").unwrap(), vec![100, 100]);
            ds.close().unwrap();
            assert_err!(ds.attr_names(), InvalidState, "not open");

            let ds = file.dataset("x").unwrap();
            assert_eq!(ds.attr_str("NAME").unwrap(), "x");
            assert_eq!(ds.attr::<u32>("RANK").unwrap(), vec![2]);
        })
    }

    #[test]
    pub fn test_summary() {
        with_mem_file(|file| {
            let mut ds = Dataset::new();
            let mut out = Vec::new();
            ds.summary(&mut out).unwrap();
            let text = String::from_utf8(out).unwrap();
            assert!(text.contains("-- State           = unopened"));
            assert!(text.contains("-- Object handle   = -"));

            ds.create(&file, "x", &[4, 5]).unwrap();
            let mut out = Vec::new();
            ds.summary(&mut out).unwrap();
            let text = String::from_utf8(out).unwrap();
            assert!(text.contains("-- Dataset name    = x"));
            assert!(text.contains("-- Handle valid    = true"));
            assert!(text.contains("-- Shape           = [4, 5]"));
            assert!(text.contains("-- nof. datapoints = 20"));
            assert_eq!(format!("{:?}", ds), "<DAL dataset \"x\": shape [4, 5], type float64>");
        })
    }
}
