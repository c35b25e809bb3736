use std::fmt::{self, Display};

use crate::internal_prelude::*;

/// Small metadata value attached to a group or dataset.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AttributeValue {
    /// A one-dimensional array of numbers, stored as native-endian bytes.
    Numeric { dtype: TypeDescriptor, data: Vec<u8>, len: usize },
    Text(String),
}

impl AttributeValue {
    pub fn from_slice<T: DalType>(values: &[T]) -> Self {
        Self::Numeric {
            dtype: T::type_descriptor(),
            data: slice_as_bytes(values).to_vec(),
            len: values.len(),
        }
    }

    pub fn dtype(&self) -> Option<TypeDescriptor> {
        match self {
            Self::Numeric { dtype, .. } => Some(*dtype),
            Self::Text(_) => None,
        }
    }

    /// Number of elements (characters for text).
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric { len, .. } => *len,
            Self::Text(text) => text.chars().count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes a numeric value; the stored element type must be exactly `T`.
    pub fn to_vec<T: DalType>(&self) -> Result<Vec<T>> {
        let expected = T::type_descriptor();
        match self {
            Self::Numeric { dtype, data, .. } => {
                ensure!(
                    *dtype == expected,
                    InvalidArgument,
                    "attribute type mismatch: stored {}, requested {}",
                    dtype,
                    expected
                );
                match bytes_to_vec(data) {
                    Some(values) => Ok(values),
                    None => fail!(Io, "corrupt attribute payload of {} bytes", data.len()),
                }
            }
            Self::Text(_) => fail!(InvalidArgument, "attribute is text, requested {}", expected),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Numeric { dtype, .. } => {
                fail!(InvalidArgument, "attribute is numeric ({}), requested text", dtype)
            }
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Numeric { dtype, len, .. } => write!(f, "<{}; {}>", dtype, len),
            Self::Text(text) => write!(f, "{:?}", text),
        }
    }
}

/// An object that can carry attributes: groups, files and open datasets.
pub trait Location {
    /// Storage backend and identifier of the object, or an error if it is not open.
    fn location(&self) -> Result<(&dyn Storage, ObjectId)>;

    fn set_attr<T: DalType>(&self, name: &str, values: &[T]) -> Result<()> {
        let (storage, id) = self.location()?;
        storage.set_attribute(id, name, AttributeValue::from_slice(values))
    }

    fn attr<T: DalType>(&self, name: &str) -> Result<Vec<T>> {
        self.attr_value(name)?.to_vec().map_err(|err| err.context(name))
    }

    fn set_attr_str(&self, name: &str, value: &str) -> Result<()> {
        let (storage, id) = self.location()?;
        storage.set_attribute(id, name, value.into())
    }

    fn attr_str(&self, name: &str) -> Result<String> {
        let value = self.attr_value(name)?;
        value.as_str().map(ToOwned::to_owned).map_err(|err| err.context(name))
    }

    fn attr_value(&self, name: &str) -> Result<AttributeValue> {
        let (storage, id) = self.location()?;
        storage.attribute(id, name)
    }

    fn attr_names(&self) -> Result<Vec<String>> {
        let (storage, id) = self.location()?;
        storage.attribute_names(id)
    }

    fn has_attr(&self, name: &str) -> Result<bool> {
        match self.attr_value(name) {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn delete_attr(&self, name: &str) -> Result<()> {
        let (storage, id) = self.location()?;
        storage.delete_attribute(id, name)
    }
}
