//! Error types reported by fallible container operations.

use core::alloc::Layout;
use core::fmt;

/// The error type returned when the backing memory of a container could not
/// be obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The requested number of elements does not fit into `isize::MAX`
    /// bytes, or computing the size of the request overflowed.
    CapacityOverflow,
    /// The allocator failed to provide a memory block.
    AllocFailed {
        /// The layout that was requested from the allocator.
        layout: Layout,
    },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::CapacityOverflow => f.write_str("capacity overflow"),
            AllocError::AllocFailed { layout } => write!(
                f,
                "memory allocation of {} bytes (aligned to {}) failed",
                layout.size(),
                layout.align()
            ),
        }
    }
}

impl core::error::Error for AllocError {}

/// The error type reported by a fallible value producer that could not
/// supply the next element.
///
/// See [`FromFnValueAdapter`](crate::adapter::FromFnValueAdapter).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ConstructionError(());

impl ConstructionError {
    /// Creates a new `ConstructionError`.
    #[inline]
    pub const fn new() -> Self {
        ConstructionError(())
    }
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("element construction failed")
    }
}

impl core::error::Error for ConstructionError {}

/// The error type for all fallible mutating operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Backing memory could not be allocated.
    Alloc(AllocError),
    /// An element could not be constructed.
    Construction(ConstructionError),
}

impl From<AllocError> for Error {
    #[inline]
    fn from(err: AllocError) -> Self {
        Error::Alloc(err)
    }
}

impl From<ConstructionError> for Error {
    #[inline]
    fn from(err: ConstructionError) -> Self {
        Error::Construction(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Alloc(err) => fmt::Display::fmt(err, f),
            Error::Construction(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Error::Alloc(err) => Some(err),
            Error::Construction(err) => Some(err),
        }
    }
}

/// Panics with a message matching `err`, or diverts to the global allocation
/// error handler if the allocator itself failed.
#[cold]
#[inline(never)]
#[track_caller]
pub(crate) fn handle_error(err: Error) -> ! {
    match err {
        Error::Alloc(AllocError::CapacityOverflow) => panic!("capacity overflow"),
        Error::Alloc(AllocError::AllocFailed { layout }) => {
            alloc::alloc::handle_alloc_error(layout)
        }
        Error::Construction(_) => panic!("element construction failed"),
    }
}
