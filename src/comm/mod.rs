//! Message passing between compositing ranks.
//!
//! The compositor only talks to other ranks through [`Communicator`]. An
//! in-process implementation backed by threads lives in [`local`].

pub(crate) mod communicator;
pub(crate) mod local;

/// First tag of the radix-k exchange rounds; round `i` uses `base + i`.
pub const TAG_RADIXK_SWAP: u32 = 2200;
/// Tag of the telescoping pass between radix-k groups.
pub const TAG_RADIXK_TELESCOPE: u32 = 2300;
/// Tag of whole images moving up the binary tree.
pub const TAG_TREE_IMAGE: u32 = 2400;
/// Tag of pieces sent to the collecting rank.
pub const TAG_COLLECT: u32 = 2500;
/// Tag of compressed tiles sent straight to their display rank.
pub const TAG_DIRECT_IMAGE: u32 = 2600;
/// Tag used by the default `allgather`.
pub const TAG_ALLGATHER: u32 = 2700;
/// Tag used by the default `gather`.
pub const TAG_GATHER: u32 = 2710;
