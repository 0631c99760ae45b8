//! Image buffers: pixel formats, dense and run-length sparse images, and the
//! wire layout both share.

pub(crate) mod dense;
pub(crate) mod format;
pub(crate) mod header;
pub(crate) mod pixel;
pub(crate) mod pool;
pub(crate) mod runs;
pub(crate) mod sparse;
