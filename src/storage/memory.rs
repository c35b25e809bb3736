use std::cmp;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Debug};

use parking_lot::RwLock;

use super::{path_segments, ArrayLayout, ObjectId, ObjectKind, Storage};
use crate::hl::attribute::AttributeValue;
use crate::hl::extents::checked_len;
use crate::hl::hyperslab::RawHyperslab;
use crate::internal_prelude::*;

type NodeId = usize;

const ROOT: NodeId = 0;

enum NodeData {
    Group { members: BTreeMap<String, NodeId> },
    Array { layout: ArrayLayout, chunks: HashMap<Vec<Ix>, Vec<u8>> },
}

struct Node {
    data: NodeData,
    attrs: BTreeMap<String, AttributeValue>,
    links: usize,
    handles: usize,
}

impl Node {
    fn group() -> Self {
        Self::with_data(NodeData::Group { members: BTreeMap::new() })
    }

    fn array(layout: ArrayLayout) -> Self {
        Self::with_data(NodeData::Array { layout, chunks: HashMap::new() })
    }

    fn with_data(data: NodeData) -> Self {
        Self { data, attrs: BTreeMap::new(), links: 0, handles: 0 }
    }

    fn kind(&self) -> ObjectKind {
        match self.data {
            NodeData::Group { .. } => ObjectKind::Group,
            NodeData::Array { .. } => ObjectKind::Array,
        }
    }
}

struct Inner {
    nodes: HashMap<NodeId, Node>,
    handles: HashMap<ObjectId, NodeId>,
    next_node: NodeId,
    next_id: u64,
}

impl Inner {
    fn new() -> Self {
        let mut root = Node::group();
        root.links = 1;
        let mut nodes = HashMap::new();
        nodes.insert(ROOT, root);
        Self { nodes, handles: HashMap::new(), next_node: ROOT + 1, next_id: 1 }
    }

    fn node_of(&self, id: ObjectId) -> Result<NodeId> {
        match self.handles.get(&id) {
            Some(&node) => Ok(node),
            None => fail!(InvalidState, "invalid object id {}", id),
        }
    }

    fn node(&self, node: NodeId) -> Result<&Node> {
        match self.nodes.get(&node) {
            Some(node) => Ok(node),
            None => fail!(Io, "dangling object reference"),
        }
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut Node> {
        match self.nodes.get_mut(&node) {
            Some(node) => Ok(node),
            None => fail!(Io, "dangling object reference"),
        }
    }

    fn members(&self, node: NodeId) -> Result<&BTreeMap<String, NodeId>> {
        match &self.node(node)?.data {
            NodeData::Group { members } => Ok(members),
            NodeData::Array { .. } => fail!(InvalidArgument, "object is not a group"),
        }
    }

    fn members_mut(&mut self, node: NodeId) -> Result<&mut BTreeMap<String, NodeId>> {
        match &mut self.node_mut(node)?.data {
            NodeData::Group { members } => Ok(members),
            NodeData::Array { .. } => fail!(InvalidArgument, "object is not a group"),
        }
    }

    fn layout(&self, node: NodeId) -> Result<&ArrayLayout> {
        match &self.node(node)?.data {
            NodeData::Array { layout, .. } => Ok(layout),
            NodeData::Group { .. } => fail!(InvalidArgument, "object is not an array"),
        }
    }

    fn lookup(&self, parent: NodeId, name: &str) -> Result<NodeId> {
        let mut node = parent;
        for segment in path_segments(name)? {
            node = match self.members(node)?.get(segment) {
                Some(&child) => child,
                None => fail!(NotFound, "object `{}` not found", name),
            };
        }
        Ok(node)
    }

    /// Resolves all but the last segment, creating missing groups if requested.
    fn parent_of<'n>(
        &mut self, parent: NodeId, name: &'n str, create: bool,
    ) -> Result<(NodeId, &'n str)> {
        let segments = path_segments(name)?;
        let (leaf, dirs) = match segments.split_last() {
            Some(split) => split,
            None => fail!(InvalidArgument, "empty object name"),
        };
        let mut node = parent;
        for &dir in dirs {
            let existing = self.members(node)?.get(dir).copied();
            node = match existing {
                Some(child) => child,
                None if create => self.insert(node, dir, Node::group())?,
                None => fail!(NotFound, "group `{}` not found in `{}`", dir, name),
            };
        }
        self.members(node)?;
        Ok((node, *leaf))
    }

    fn insert(&mut self, parent: NodeId, name: &str, mut node: Node) -> Result<NodeId> {
        ensure!(
            !self.members(parent)?.contains_key(name),
            AlreadyExists,
            "object `{}` already exists",
            name
        );
        let id = self.next_node;
        self.next_node += 1;
        node.links = 1;
        self.nodes.insert(id, node);
        self.members_mut(parent)?.insert(name.to_owned(), id);
        Ok(id)
    }

    fn open_handle(&mut self, node: NodeId) -> Result<ObjectId> {
        self.node_mut(node)?.handles += 1;
        let id = ObjectId::new(self.next_id);
        self.next_id += 1;
        self.handles.insert(id, node);
        Ok(id)
    }

    fn release(&mut self, node: NodeId) {
        let unused = matches!(self.nodes.get(&node), Some(n) if n.links == 0 && n.handles == 0);
        if !unused {
            return;
        }
        if let Some(Node { data: NodeData::Group { members }, .. }) = self.nodes.remove(&node) {
            for child in members.into_values() {
                if let Some(child_node) = self.nodes.get_mut(&child) {
                    child_node.links -= 1;
                }
                self.release(child);
            }
        }
    }
}

/// Per-array geometry needed to map element coordinates onto chunks.
struct ChunkMap<'a> {
    chunk: &'a [Ix],
    strides: Vec<usize>,
    elem_size: usize,
}

impl<'a> ChunkMap<'a> {
    fn new(layout: &'a ArrayLayout) -> Self {
        let chunk = layout.chunk.as_slice();
        let mut strides = vec![1; chunk.len()];
        for axis in (0..chunk.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * chunk[axis + 1];
        }
        Self { chunk, strides, elem_size: layout.dtype.size() }
    }

    fn chunk_bytes(&self) -> usize {
        self.chunk.iter().product::<usize>() * self.elem_size
    }

    /// Splits a run along the last axis at chunk boundaries.
    ///
    /// Calls `f(chunk_coords, byte_offset_in_chunk, byte_offset_in_run, byte_len)`.
    fn for_each_segment<F>(&self, lead: &[Ix], start: Ix, len: Ix, mut f: F) -> Result<()>
    where
        F: FnMut(Vec<Ix>, usize, usize, usize) -> Result<()>,
    {
        let last = self.chunk.len() - 1;
        let mut base = 0;
        let mut coords = Vec::with_capacity(self.chunk.len());
        for (axis, &ix) in lead.iter().enumerate() {
            coords.push(ix / self.chunk[axis]);
            base += (ix % self.chunk[axis]) * self.strides[axis];
        }
        let (end, width) = (start + len, self.chunk[last]);
        let mut x = start;
        while x < end {
            let seg_end = cmp::min(end, (x / width + 1) * width);
            let mut key = coords.clone();
            key.push(x / width);
            let offset = (base + x % width) * self.elem_size;
            f(key, offset, (x - start) * self.elem_size, (seg_end - x) * self.elem_size)?;
            x = seg_end;
        }
        Ok(())
    }
}

fn check_buffer(layout: &ArrayLayout, selection: &RawHyperslab, len: usize) -> Result<()> {
    selection.ensure_within(&layout.shape())?;
    let expected = selection.size() * layout.dtype.size();
    ensure!(
        len == expected,
        InvalidArgument,
        "buffer holds {} bytes, selection needs {}",
        len,
        expected
    );
    Ok(())
}

/// Chunked, extensible array store held entirely in memory.
///
/// Objects form a tree of groups rooted at `/`. Array data is split into chunks of the
/// layout's chunk shape, allocated on first write and zero-filled; regions never written
/// read back as zeros. An unlinked object stays alive while any handle to it is open.
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MemoryStorage")
            .field("objects", &inner.nodes.len())
            .field("handles", &inner.handles.len())
            .finish()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self { inner: RwLock::new(Inner::new()) }
    }

    /// Number of live objects, including the root group.
    pub fn num_objects(&self) -> usize {
        self.inner.read().nodes.len()
    }

    /// Number of handles that have not been closed.
    pub fn num_open_handles(&self) -> usize {
        self.inner.read().handles.len()
    }
}

impl Storage for MemoryStorage {
    fn root(&self) -> Result<ObjectId> {
        self.inner.write().open_handle(ROOT)
    }

    fn create_group(&self, parent: ObjectId, name: &str) -> Result<ObjectId> {
        let mut inner = self.inner.write();
        let parent = inner.node_of(parent)?;
        let (dir, leaf) = inner.parent_of(parent, name, true)?;
        let node = inner.insert(dir, leaf, Node::group())?;
        inner.open_handle(node)
    }

    fn open_group(&self, parent: ObjectId, name: &str) -> Result<ObjectId> {
        let mut inner = self.inner.write();
        let node = inner.lookup(inner.node_of(parent)?, name)?;
        ensure!(
            inner.node(node)?.kind() == ObjectKind::Group,
            InvalidArgument,
            "`{}` is not a group",
            name
        );
        inner.open_handle(node)
    }

    fn link_exists(&self, parent: ObjectId, name: &str) -> Result<bool> {
        let inner = self.inner.read();
        match inner.lookup(inner.node_of(parent)?, name) {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn object_kind(&self, parent: ObjectId, name: &str) -> Result<ObjectKind> {
        let inner = self.inner.read();
        let node = inner.lookup(inner.node_of(parent)?, name)?;
        Ok(inner.node(node)?.kind())
    }

    fn member_names(&self, parent: ObjectId) -> Result<Vec<String>> {
        let inner = self.inner.read();
        Ok(inner.members(inner.node_of(parent)?)?.keys().cloned().collect())
    }

    fn unlink(&self, parent: ObjectId, name: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let parent = inner.node_of(parent)?;
        let (dir, leaf) = inner.parent_of(parent, name, false)?;
        let node = match inner.members_mut(dir)?.remove(leaf) {
            Some(node) => node,
            None => fail!(NotFound, "object `{}` not found", name),
        };
        inner.node_mut(node)?.links -= 1;
        inner.release(node);
        Ok(())
    }

    fn create_array(&self, parent: ObjectId, name: &str, layout: &ArrayLayout) -> Result<ObjectId> {
        ensure!(layout.ndim() > 0, InvalidArgument, "array rank must be at least 1");
        ensure!(
            layout.chunk.len() == layout.ndim(),
            InvalidArgument,
            "chunk rank ({}) != array rank ({})",
            layout.chunk.len(),
            layout.ndim()
        );
        ensure!(layout.chunk.iter().all(|&c| c > 0), InvalidArgument, "chunk dims must be > 0");
        ensure!(
            checked_len(&layout.chunk).and_then(|len| len.checked_mul(layout.dtype.size())).is_some(),
            InvalidArgument,
            "chunk {:?} overflows the addressable size",
            layout.chunk
        );
        ensure!(layout.extents.is_valid(), InvalidArgument, "invalid extents: {}", layout.extents);
        let mut inner = self.inner.write();
        let parent = inner.node_of(parent)?;
        let (dir, leaf) = inner.parent_of(parent, name, true)?;
        let node = inner.insert(dir, leaf, Node::array(layout.clone()))?;
        inner.open_handle(node)
    }

    fn open_array(&self, parent: ObjectId, name: &str) -> Result<ObjectId> {
        let mut inner = self.inner.write();
        let node = inner.lookup(inner.node_of(parent)?, name)?;
        ensure!(
            inner.node(node)?.kind() == ObjectKind::Array,
            InvalidArgument,
            "`{}` is not an array",
            name
        );
        inner.open_handle(node)
    }

    fn array_layout(&self, id: ObjectId) -> Result<ArrayLayout> {
        let inner = self.inner.read();
        inner.layout(inner.node_of(id)?).cloned()
    }

    fn extend_array(&self, id: ObjectId, shape: &[Ix]) -> Result<()> {
        let mut inner = self.inner.write();
        let node = inner.node_of(id)?;
        match &mut inner.node_mut(node)?.data {
            NodeData::Array { layout, .. } => {
                layout.extents = layout.extents.grown(shape)?;
                Ok(())
            }
            NodeData::Group { .. } => fail!(InvalidArgument, "object is not an array"),
        }
    }

    fn read_into(&self, id: ObjectId, selection: &RawHyperslab, buf: &mut [u8]) -> Result<()> {
        let inner = self.inner.read();
        let node = inner.node(inner.node_of(id)?)?;
        let (layout, chunks) = match &node.data {
            NodeData::Array { layout, chunks } => (layout, chunks),
            NodeData::Group { .. } => fail!(InvalidArgument, "object is not an array"),
        };
        check_buffer(layout, selection, buf.len())?;
        let map = ChunkMap::new(layout);
        let elem_size = map.elem_size;
        selection.try_for_each_run(|lead, start, len, offset| {
            let run = &mut buf[offset * elem_size..(offset + len) * elem_size];
            map.for_each_segment(lead, start, len, |key, src, dst, n| {
                let out = &mut run[dst..dst + n];
                match chunks.get(&key) {
                    Some(data) => out.copy_from_slice(&data[src..src + n]),
                    None => out.fill(0),
                }
                Ok(())
            })
        })
    }

    fn write_from(&self, id: ObjectId, selection: &RawHyperslab, buf: &[u8]) -> Result<()> {
        let mut inner = self.inner.write();
        let node = inner.node_of(id)?;
        let (layout, chunks) = match &mut inner.node_mut(node)?.data {
            NodeData::Array { layout, chunks } => (&*layout, chunks),
            NodeData::Group { .. } => fail!(InvalidArgument, "object is not an array"),
        };
        check_buffer(layout, selection, buf.len())?;
        let map = ChunkMap::new(layout);
        let (elem_size, chunk_bytes) = (map.elem_size, map.chunk_bytes());
        selection.try_for_each_run(|lead, start, len, offset| {
            let run = &buf[offset * elem_size..(offset + len) * elem_size];
            map.for_each_segment(lead, start, len, |key, dst, src, n| {
                let data = chunks.entry(key).or_insert_with(|| vec![0; chunk_bytes]);
                data[dst..dst + n].copy_from_slice(&run[src..src + n]);
                Ok(())
            })
        })
    }

    fn num_chunks(&self, id: ObjectId) -> Result<usize> {
        let inner = self.inner.read();
        match &inner.node(inner.node_of(id)?)?.data {
            NodeData::Array { chunks, .. } => Ok(chunks.len()),
            NodeData::Group { .. } => fail!(InvalidArgument, "object is not an array"),
        }
    }

    fn set_attribute(&self, id: ObjectId, name: &str, value: AttributeValue) -> Result<()> {
        ensure!(!name.is_empty(), InvalidArgument, "empty attribute name");
        let mut inner = self.inner.write();
        let node = inner.node_of(id)?;
        inner.node_mut(node)?.attrs.insert(name.to_owned(), value);
        Ok(())
    }

    fn attribute(&self, id: ObjectId, name: &str) -> Result<AttributeValue> {
        let inner = self.inner.read();
        match inner.node(inner.node_of(id)?)?.attrs.get(name) {
            Some(value) => Ok(value.clone()),
            None => fail!(NotFound, "attribute `{}` not found", name),
        }
    }

    fn attribute_names(&self, id: ObjectId) -> Result<Vec<String>> {
        let inner = self.inner.read();
        Ok(inner.node(inner.node_of(id)?)?.attrs.keys().cloned().collect())
    }

    fn delete_attribute(&self, id: ObjectId, name: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let node = inner.node_of(id)?;
        match inner.node_mut(node)?.attrs.remove(name) {
            Some(_) => Ok(()),
            None => fail!(NotFound, "attribute `{}` not found", name),
        }
    }

    fn close(&self, id: ObjectId) -> Result<()> {
        let mut inner = self.inner.write();
        let node = match inner.handles.remove(&id) {
            Some(node) => node,
            None => fail!(InvalidState, "invalid object id {}", id),
        };
        inner.node_mut(node)?.handles -= 1;
        inner.release(node);
        Ok(())
    }

    fn is_valid(&self, id: ObjectId) -> bool {
        self.inner.read().handles.contains_key(&id)
    }
}
