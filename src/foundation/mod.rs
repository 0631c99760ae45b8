//! Shared primitives: errors, geometry, configuration and integer helpers.

pub(crate) mod config;
pub(crate) mod core;
pub(crate) mod error;
pub(crate) mod math;
