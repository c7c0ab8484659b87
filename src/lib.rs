#![no_std]
#![warn(missing_docs)]

//! A growable vector that stores its first `N` elements inline.
//!
//! [`InlinedVec<T, N>`](InlinedVec) keeps up to `N` elements in a buffer
//! embedded in the vector itself and only reaches for its [`Allocator`] once
//! it outgrows that buffer. The machinery behind it is exposed as well:
//!
//! - [`Storage`] is the inline-or-allocated storage engine. Its mutators are
//!   transactional: when an element cannot be constructed or memory cannot be
//!   obtained, the storage is left as it was before the call.
//! - [`adapter`] holds the value producers bulk operations draw from.
//! - [`allocator`] defines the memory interface a storage allocates through.
//!
//! # Examples
//! ```
//! use inlined::InlinedVec;
//!
//! let mut vec = InlinedVec::<u32, 4>::new();
//! vec.extend([1, 2, 3, 4]);
//! assert!(!vec.is_allocated());
//!
//! vec.push(5);
//! assert!(vec.is_allocated());
//! assert_eq!(vec.capacity(), 8);
//!
//! vec.erase(1..3);
//! assert_eq!(vec, [1, 4, 5]);
//!
//! vec.shrink_to_fit();
//! assert!(!vec.is_allocated());
//! ```

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod adapter;
pub mod allocator;
pub mod error;
pub mod storage;
pub mod transaction;
pub mod vec;

#[cfg(test)]
mod test_utils;

pub use crate::allocator::{Allocator, Global};
pub use crate::error::{AllocError, ConstructionError, Error};
pub use crate::storage::Storage;
pub use crate::vec::InlinedVec;

/// A specialized [`Result`](core::result::Result) type for fallible container
/// operations.
pub type Result<T> = core::result::Result<T, Error>;
