//! Operations on sparse images that never expand them: compositing two
//! compressed images, splitting one into partitions, and interlacing.

pub(crate) mod composite;
pub(crate) mod interlace;
pub(crate) mod split;
