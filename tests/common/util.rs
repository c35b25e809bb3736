use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dal::storage::memory::MemoryStorage;
use dal::storage::{ArrayLayout, ObjectId, ObjectKind, Storage};
use dal::{AttributeValue, Error, File, Ix, RawHyperslab, Result};

pub fn new_in_memory_file() -> Result<File> {
    File::in_memory()
}

/// Wraps a [`MemoryStorage`] and fails data transfers on demand.
pub struct FaultyStorage {
    inner: MemoryStorage,
    fail_transfers: AtomicBool,
}

impl FaultyStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { inner: MemoryStorage::new(), fail_transfers: AtomicBool::new(false) })
    }

    pub fn fail_transfers(&self, fail: bool) {
        self.fail_transfers.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryStorage {
        &self.inner
    }

    fn check(&self, id: ObjectId) -> Result<()> {
        if self.fail_transfers.load(Ordering::SeqCst) {
            Err(Error::Io(format!("injected transfer failure on {}", id)))
        } else {
            Ok(())
        }
    }
}

impl Storage for FaultyStorage {
    fn root(&self) -> Result<ObjectId> {
        self.inner.root()
    }

    fn create_group(&self, parent: ObjectId, name: &str) -> Result<ObjectId> {
        self.inner.create_group(parent, name)
    }

    fn open_group(&self, parent: ObjectId, name: &str) -> Result<ObjectId> {
        self.inner.open_group(parent, name)
    }

    fn link_exists(&self, parent: ObjectId, name: &str) -> Result<bool> {
        self.inner.link_exists(parent, name)
    }

    fn object_kind(&self, parent: ObjectId, name: &str) -> Result<ObjectKind> {
        self.inner.object_kind(parent, name)
    }

    fn member_names(&self, parent: ObjectId) -> Result<Vec<String>> {
        self.inner.member_names(parent)
    }

    fn unlink(&self, parent: ObjectId, name: &str) -> Result<()> {
        self.inner.unlink(parent, name)
    }

    fn create_array(&self, parent: ObjectId, name: &str, layout: &ArrayLayout) -> Result<ObjectId> {
        self.inner.create_array(parent, name, layout)
    }

    fn open_array(&self, parent: ObjectId, name: &str) -> Result<ObjectId> {
        self.inner.open_array(parent, name)
    }

    fn array_layout(&self, id: ObjectId) -> Result<ArrayLayout> {
        self.inner.array_layout(id)
    }

    fn extend_array(&self, id: ObjectId, shape: &[Ix]) -> Result<()> {
        self.inner.extend_array(id, shape)
    }

    fn read_into(&self, id: ObjectId, selection: &RawHyperslab, buf: &mut [u8]) -> Result<()> {
        self.check(id)?;
        self.inner.read_into(id, selection, buf)
    }

    fn write_from(&self, id: ObjectId, selection: &RawHyperslab, buf: &[u8]) -> Result<()> {
        self.check(id)?;
        self.inner.write_from(id, selection, buf)
    }

    fn num_chunks(&self, id: ObjectId) -> Result<usize> {
        self.inner.num_chunks(id)
    }

    fn set_attribute(&self, id: ObjectId, name: &str, value: AttributeValue) -> Result<()> {
        self.inner.set_attribute(id, name, value)
    }

    fn attribute(&self, id: ObjectId, name: &str) -> Result<AttributeValue> {
        self.inner.attribute(id, name)
    }

    fn attribute_names(&self, id: ObjectId) -> Result<Vec<String>> {
        self.inner.attribute_names(id)
    }

    fn delete_attribute(&self, id: ObjectId, name: &str) -> Result<()> {
        self.inner.delete_attribute(id, name)
    }

    fn close(&self, id: ObjectId) -> Result<()> {
        self.inner.close(id)
    }

    fn is_valid(&self, id: ObjectId) -> bool {
        self.inner.is_valid(id)
    }
}
