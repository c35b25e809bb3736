use std::fmt::{self, Display};
use std::mem;

use bytemuck::Pod;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntSize {
    U1 = 1,
    U2 = 2,
    U4 = 4,
    U8 = 8,
}

impl IntSize {
    pub fn from_int(size: usize) -> Option<IntSize> {
        match size {
            1 => Some(IntSize::U1),
            2 => Some(IntSize::U2),
            4 => Some(IntSize::U4),
            8 => Some(IntSize::U8),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FloatSize {
    U4 = 4,
    U8 = 8,
}

impl FloatSize {
    pub fn from_int(size: usize) -> Option<FloatSize> {
        match size {
            4 => Some(FloatSize::U4),
            8 => Some(FloatSize::U8),
            _ => None,
        }
    }
}

/// Element type of an array stored on disk.
///
/// Only fixed-size numeric types are supported; the byte layout of a stored
/// element is the native layout of the corresponding Rust type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Integer(IntSize),
    Unsigned(IntSize),
    Float(FloatSize),
}

impl Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TypeDescriptor::Integer(IntSize::U1) => write!(f, "int8"),
            TypeDescriptor::Integer(IntSize::U2) => write!(f, "int16"),
            TypeDescriptor::Integer(IntSize::U4) => write!(f, "int32"),
            TypeDescriptor::Integer(IntSize::U8) => write!(f, "int64"),
            TypeDescriptor::Unsigned(IntSize::U1) => write!(f, "uint8"),
            TypeDescriptor::Unsigned(IntSize::U2) => write!(f, "uint16"),
            TypeDescriptor::Unsigned(IntSize::U4) => write!(f, "uint32"),
            TypeDescriptor::Unsigned(IntSize::U8) => write!(f, "uint64"),
            TypeDescriptor::Float(FloatSize::U4) => write!(f, "float32"),
            TypeDescriptor::Float(FloatSize::U8) => write!(f, "float64"),
        }
    }
}

impl Default for TypeDescriptor {
    /// Double precision, the type used when a dataset is created without one.
    fn default() -> Self {
        TypeDescriptor::Float(FloatSize::U8)
    }
}

impl TypeDescriptor {
    /// Size of a single element in bytes.
    pub fn size(&self) -> usize {
        match *self {
            TypeDescriptor::Integer(size) | TypeDescriptor::Unsigned(size) => size as _,
            TypeDescriptor::Float(size) => size as _,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, TypeDescriptor::Float(_))
    }

    pub fn is_signed(&self) -> bool {
        !matches!(self, TypeDescriptor::Unsigned(_))
    }
}

/// A Rust type whose values can be transferred to and from storage byte-for-byte.
pub unsafe trait DalType: Pod + 'static {
    fn type_descriptor() -> TypeDescriptor;
}

macro_rules! impl_dal_type {
    ($ty:ty, $variant:ident, $size:expr) => {
        unsafe impl DalType for $ty {
            #[inline]
            fn type_descriptor() -> TypeDescriptor {
                $crate::element::TypeDescriptor::$variant($size)
            }
        }
    };
}

impl_dal_type!(i8, Integer, IntSize::U1);
impl_dal_type!(i16, Integer, IntSize::U2);
impl_dal_type!(i32, Integer, IntSize::U4);
impl_dal_type!(i64, Integer, IntSize::U8);
impl_dal_type!(u8, Unsigned, IntSize::U1);
impl_dal_type!(u16, Unsigned, IntSize::U2);
impl_dal_type!(u32, Unsigned, IntSize::U4);
impl_dal_type!(u64, Unsigned, IntSize::U8);
impl_dal_type!(f32, Float, FloatSize::U4);
impl_dal_type!(f64, Float, FloatSize::U8);

#[cfg(target_pointer_width = "32")]
impl_dal_type!(isize, Integer, IntSize::U4);
#[cfg(target_pointer_width = "32")]
impl_dal_type!(usize, Unsigned, IntSize::U4);

#[cfg(target_pointer_width = "64")]
impl_dal_type!(isize, Integer, IntSize::U8);
#[cfg(target_pointer_width = "64")]
impl_dal_type!(usize, Unsigned, IntSize::U8);

/// Views a slice of elements as its raw bytes.
pub fn slice_as_bytes<T: DalType>(data: &[T]) -> &[u8] {
    bytemuck::cast_slice(data)
}

/// Views a mutable slice of elements as its raw bytes.
pub fn slice_as_bytes_mut<T: DalType>(data: &mut [T]) -> &mut [u8] {
    bytemuck::cast_slice_mut(data)
}

/// Copies raw bytes into a freshly allocated vector of elements.
///
/// Returns `None` if the byte count is not a multiple of the element size.
pub fn bytes_to_vec<T: DalType>(bytes: &[u8]) -> Option<Vec<T>> {
    let size = mem::size_of::<T>();
    if bytes.len() % size != 0 {
        return None;
    }
    let mut out: Vec<T> = vec![bytemuck::Zeroable::zeroed(); bytes.len() / size];
    slice_as_bytes_mut(&mut out).copy_from_slice(bytes);
    Some(out)
}
