use std::error::Error as StdError;
use std::fmt;
use std::io;

use ndarray::ShapeError;

/// Broad category of an [`Error`], for callers that branch on the failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidState,
    NotFound,
    AlreadyExists,
    OutOfRange,
    Io,
}

/// The error type for dataset, hyperslab and storage operations.
#[derive(Clone, PartialEq, Eq)]
pub enum Error {
    /// Bad geometry, rank mismatch, non-positive dimensions or mismatched element type.
    /// Always reported before any state is mutated.
    InvalidArgument(String),
    /// The operation is not valid in the current state of the object.
    InvalidState(String),
    /// The named object does not exist. Expected when probing for optional objects.
    NotFound(String),
    /// An object with the requested name already exists.
    AlreadyExists(String),
    /// A read addressed elements outside of the current extent.
    OutOfRange(String),
    /// The storage backend failed to allocate or transfer data.
    Io(String),
}

/// A type for results generated by this crate where the `Err` type is set to `dal::Error`.
pub type Result<T, E = Error> = ::std::result::Result<T, E>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::OutOfRange(_) => ErrorKind::OutOfRange,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::InvalidArgument(desc)
            | Self::InvalidState(desc)
            | Self::NotFound(desc)
            | Self::AlreadyExists(desc)
            | Self::OutOfRange(desc)
            | Self::Io(desc) => desc,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Prefixes the description with `context`, keeping the kind.
    pub fn context<C: fmt::Display>(self, context: C) -> Self {
        let wrap = |desc: String| format!("{}: {}", context, desc);
        match self {
            Self::InvalidArgument(desc) => Self::InvalidArgument(wrap(desc)),
            Self::InvalidState(desc) => Self::InvalidState(wrap(desc)),
            Self::NotFound(desc) => Self::NotFound(wrap(desc)),
            Self::AlreadyExists(desc) => Self::AlreadyExists(wrap(desc)),
            Self::OutOfRange(desc) => Self::OutOfRange(wrap(desc)),
            Self::Io(desc) => Self::Io(wrap(desc)),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}({})", self.kind(), self.description())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl StdError for Error {}

impl From<ShapeError> for Error {
    fn from(err: ShapeError) -> Self {
        Self::InvalidArgument(format!("shape error: {}", err))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match err.kind() {
            ErrorKind::NotFound => io::ErrorKind::NotFound,
            ErrorKind::AlreadyExists => io::ErrorKind::AlreadyExists,
            ErrorKind::InvalidArgument | ErrorKind::OutOfRange => io::ErrorKind::InvalidInput,
            ErrorKind::InvalidState | ErrorKind::Io => io::ErrorKind::Other,
        };
        Self::new(kind, err)
    }
}
