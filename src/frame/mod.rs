//! Frame orchestration: the tiled display, projection of geometry bounds,
//! data replication, tile generation and the per-rank [`context::Context`]
//! that drives a frame through a strategy.

pub(crate) mod context;
pub(crate) mod draw;
pub(crate) mod matrix;
pub(crate) mod projection;
pub(crate) mod render;
pub(crate) mod replication;
pub(crate) mod tiles;
pub(crate) mod timing;
