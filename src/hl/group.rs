use std::fmt::{self, Debug};
use std::sync::Arc;

use crate::hl::attribute::Location;
use crate::hl::dataset::{Dataset, DatasetBuilder};
use crate::internal_prelude::*;

/// A container of named datasets and groups.
pub struct Group {
    handle: Handle,
    name: String,
}

impl Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.handle.is_valid() {
            return write!(f, "<DAL group: invalid id>");
        }
        let members = match self.len() {
            0 => "empty".to_owned(),
            1 => "1 member".to_owned(),
            n => format!("{} members", n),
        };
        write!(f, "<DAL group: \"{}\" ({})>", self.name, members)
    }
}

impl Location for Group {
    fn location(&self) -> Result<(&dyn Storage, ObjectId)> {
        match self.handle.location() {
            Some(location) => Ok(location),
            None => fail!(InvalidState, "group `{}` is closed", self.name),
        }
    }
}

impl Group {
    pub(crate) fn from_handle(handle: Handle, name: String) -> Self {
        Self { handle, name }
    }

    pub(crate) fn storage_arc(&self) -> Result<&Arc<dyn Storage>> {
        match self.handle.storage() {
            Some(storage) if self.handle.id().is_some() => Ok(storage),
            _ => fail!(InvalidState, "group `{}` is closed", self.name),
        }
    }

    /// Absolute path of the group, `/` for the root group.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.handle.id()
    }

    pub fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    fn child_path(&self, name: &str) -> String {
        if self.name.ends_with('/') {
            format!("{}{}", self.name, name)
        } else {
            format!("{}/{}", self.name, name)
        }
    }

    fn wrap(&self, id: ObjectId, name: &str) -> Result<Self> {
        let handle = Handle::new(self.storage_arc()?.clone(), id);
        Ok(Self::from_handle(handle, self.child_path(name)))
    }

    /// Returns the number of objects in the container (or 0 if the container is invalid).
    pub fn len(&self) -> usize {
        self.member_names().map(|names| names.len()).unwrap_or(0)
    }

    /// Returns true if the container has no linked objects (or if the container is invalid).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a new group, creating missing intermediate groups along the path.
    pub fn create_group(&self, name: &str) -> Result<Self> {
        let (storage, id) = self.location()?;
        let group = storage.create_group(id, name)?;
        debug!("created group `{}` in {}", name, self.name);
        self.wrap(group, name)
    }

    /// Opens an existing group.
    pub fn group(&self, name: &str) -> Result<Self> {
        let (storage, id) = self.location()?;
        let group = storage.open_group(id, name)?;
        self.wrap(group, name)
    }

    /// Removes a link to an object from this group; open handles to it stay usable.
    pub fn unlink(&self, name: &str) -> Result<()> {
        let (storage, id) = self.location()?;
        storage.unlink(id, name)
    }

    /// Check if a link with a given name exists in this group.
    pub fn link_exists(&self, name: &str) -> Result<bool> {
        let (storage, id) = self.location()?;
        storage.link_exists(id, name)
    }

    /// Kind of the object linked under `name`.
    pub fn object_kind(&self, name: &str) -> Result<ObjectKind> {
        let (storage, id) = self.location()?;
        storage.object_kind(id, name)
    }

    /// Names of all direct members, sorted.
    pub fn member_names(&self) -> Result<Vec<String>> {
        let (storage, id) = self.location()?;
        storage.member_names(id)
    }

    fn names_of_kind(&self, kind: ObjectKind) -> Result<Vec<String>> {
        let mut names = vec![];
        for name in self.member_names()? {
            if self.object_kind(&name)? == kind {
                names.push(name);
            }
        }
        Ok(names)
    }

    pub fn dataset_names(&self) -> Result<Vec<String>> {
        self.names_of_kind(ObjectKind::Array)
    }

    pub fn group_names(&self) -> Result<Vec<String>> {
        self.names_of_kind(ObjectKind::Group)
    }

    /// Instantiates a new dataset builder for element type `T`.
    pub fn new_dataset<T: DalType>(&self) -> DatasetBuilder<'_> {
        let mut builder = DatasetBuilder::new(self);
        builder.element_type(T::type_descriptor());
        builder
    }

    /// Opens an existing dataset in the group.
    pub fn dataset(&self, name: &str) -> Result<Dataset> {
        let mut ds = Dataset::new();
        ds.open(self, name)?;
        Ok(ds)
    }

    /// Releases the group handle; datasets opened from it stay open.
    pub fn close(mut self) -> Result<()> {
        self.handle.close()
    }
}
