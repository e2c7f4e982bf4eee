//! Small standalone helpers.

pub mod bytes;
pub(crate) mod slab;
