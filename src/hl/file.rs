use std::fmt::{self, Debug};
use std::ops::Deref;
use std::sync::Arc;

use crate::hl::group::Group;
use crate::internal_prelude::*;
use crate::storage::memory::MemoryStorage;

/// Root group of a storage backend.
pub struct File {
    root: Group,
}

impl Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Debug::fmt(&self.root, f)
    }
}

impl Deref for File {
    type Target = Group;

    fn deref(&self) -> &Group {
        &self.root
    }
}

impl File {
    /// Creates a file backed by a fresh [`MemoryStorage`].
    pub fn in_memory() -> Result<Self> {
        Self::with_storage(Arc::new(MemoryStorage::new()))
    }

    /// Opens the root group of an existing storage backend.
    pub fn with_storage(storage: Arc<dyn Storage>) -> Result<Self> {
        let id = storage.root()?;
        debug!("opened root group {}", id);
        Ok(Self { root: Group::from_handle(Handle::new(storage, id), "/".to_owned()) })
    }

    /// The storage backend shared by all objects in this file.
    pub fn storage(&self) -> Result<&Arc<dyn Storage>> {
        self.root.storage_arc()
    }

    /// Releases the root group handle. Objects opened from the file stay open.
    pub fn close(self) -> Result<()> {
        self.root.close()
    }
}
