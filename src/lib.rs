//! Sort-last parallel image compositing.
//!
//! Every rank renders its share of the geometry at full display resolution;
//! the compositor merges the partial images across ranks and delivers each
//! display tile to the rank that shows it.
//!
//! # Pipeline overview
//!
//! 1. **Project**: geometry bounds and tiles decide which pixels each rank
//!    draws (`Context::bounding_box`, `Context::add_tile`).
//! 2. **Render**: the [`DrawCallback`] fills a render buffer, or a
//!    pre-rendered buffer is handed to [`Context::composite_image`].
//! 3. **Compress**: dense pixels become run-length [`SparseImage`]s that skip
//!    background pixels.
//! 4. **Composite**: a strategy (sequential or direct, with radix-k, binary
//!    swap or tree inside) merges sparse images over a [`Communicator`].
//! 5. **Collect**: pieces land in the display rank's tile image.
//!
//! Ranks talk only through [`Communicator`]; [`LocalCluster`] runs a whole
//! session inside one process with a thread per rank.
#![forbid(unsafe_code)]

mod algebra;
mod codec;
mod comm;
mod foundation;
mod frame;
mod image;
mod strategy;

pub use crate::algebra::composite::composite_sparse;
pub use crate::algebra::interlace::{interlace, interlace_offset};
pub use crate::algebra::split::{Partition, split, split_in_place, split_into, split_partition_num_pixels};
pub use crate::codec::Background;
pub use crate::codec::composite::{composite_dense, correct_background};
pub use crate::codec::compress::{Padding, compress_image, compress_padded, compress_sub_image};
pub use crate::codec::decompress::{
    compressed_composite, compressed_sub_composite, decompress_image,
    decompress_image_correct_background, decompress_sub_image,
    decompress_sub_image_correct_background,
};
pub use crate::comm::communicator::{Communicator, CountingComm, RecvRequest, SendRequest};
pub use crate::comm::local::{DEFAULT_RECV_TIMEOUT, LocalCluster, LocalComm};
pub use crate::comm::{
    TAG_ALLGATHER, TAG_COLLECT, TAG_DIRECT_IMAGE, TAG_GATHER, TAG_RADIXK_SWAP,
    TAG_RADIXK_TELESCOPE, TAG_TREE_IMAGE,
};
pub use crate::foundation::config::{
    CompositeConfig, DEFAULT_MAGIC_K, DEFAULT_MAX_IMAGE_SPLIT, SingleImageStrategy, Strategy,
};
pub use crate::foundation::core::{Color, Viewport, color_to_rgba8, find_rank_in_group};
pub use crate::foundation::error::{CompositeError, CompositeResult, ErrorKind, Warning};
pub use crate::frame::context::{Context, Diagnostics, FrameOutput};
pub use crate::frame::draw::{DrawCallback, DrawRequest};
pub use crate::frame::matrix::Matrix;
pub use crate::frame::projection::{
    ContainedRegion, EMPTY_VIEWPORT, bounding_box, contained_region, contained_tiles,
    intersect_viewports, project_tile, viewport_project,
};
pub use crate::frame::tiles::{Tile, TileLayout};
pub use crate::frame::timing::{FrameStats, FrameTiming};
pub use crate::image::dense::{
    Image, OwnedImage, copy_pixels, copy_region, dense_buffer_size, pointer_buffer_size,
};
pub use crate::image::format::{ColorFormat, CompositeMode, DepthFormat, PixelFormat};
pub use crate::image::pool::{BufferKey, PoolStats, ScratchPool, ScratchPoolOpts};
pub use crate::image::sparse::{Runs, SparseImage, copy_sparse_pixels, sparse_buffer_size};
pub use crate::strategy::radixk::rounds::{RadixkInfo, RoundInfo};
pub use crate::strategy::radixk::telescope::{
    telescope_lower_group_receivers, telescope_upper_group_sender,
};
pub use crate::strategy::{ComposeParams, ValidPixels, single_image_compose};

/// 4x4 column-major matrix helpers used for projections.
pub mod matrix {
    pub use crate::frame::matrix::{identity, multiply, ortho, vector_multiply};
}
