//! Window + runtime loop.
//!
//! Owns the `winit` event loop and the single window, and wires them to the
//! [`Gpu`](crate::device::Gpu) device.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
