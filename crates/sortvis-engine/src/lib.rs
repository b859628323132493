//! sortvis engine crate.
//!
//! A GL-style object layer (`gl`) over a device abstraction (`device`), plus the
//! window runtime that hosts it. The `gl` components are generic over
//! [`device::GraphicsDevice`], so they run against the wgpu-backed
//! [`device::Gpu`] or the headless [`device::RecordingDevice`] alike.

pub mod device;
pub mod gl;
pub mod window;
pub mod core;

pub mod logging;
