use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::internal_prelude::*;

/// Owned identifier of an open storage object.
///
/// The identifier is released exactly once, either by [`Handle::close`] or on drop.
pub struct Handle {
    storage: Option<Arc<dyn Storage>>,
    id: Option<ObjectId>,
}

impl Handle {
    pub fn new(storage: Arc<dyn Storage>, id: ObjectId) -> Self {
        Self { storage: Some(storage), id: Some(id) }
    }

    /// A handle that refers to no object.
    pub fn invalid() -> Self {
        Self { storage: None, id: None }
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.id
    }

    pub fn storage(&self) -> Option<&Arc<dyn Storage>> {
        self.storage.as_ref()
    }

    /// Storage and identifier of a live handle.
    pub fn location(&self) -> Option<(&dyn Storage, ObjectId)> {
        match (&self.storage, self.id) {
            (Some(storage), Some(id)) => Some((&**storage, id)),
            _ => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.location().map_or(false, |(storage, id)| storage.is_valid(id))
    }

    /// Releases the identifier. Closing an invalid handle is a no-op.
    pub fn close(&mut self) -> Result<()> {
        match (&self.storage, self.id.take()) {
            (Some(storage), Some(id)) => storage.close(id),
            _ => Ok(()),
        }
    }
}

impl Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Handle({})", id),
            None => write!(f, "Handle(invalid)"),
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Some(id) = self.id {
            if let Err(err) = self.close() {
                warn!("failed to release object {}: {}", id, err);
            }
        }
    }
}
