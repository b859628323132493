//! Object layer over a [`GraphicsDevice`](crate::device::GraphicsDevice).
//!
//! Four small types, each wrapping one native concept:
//! - [`Shader`]: one compiled shader stage
//! - [`Program`]: shader stages linked for drawing
//! - [`VertexBuffer`]: a growable `f32` sequence plus its attribute layout
//! - [`FrameRenderer`]: viewport, draw mode and attached buffers; draws one frame
//!
//! The device is never stored. Every operation that touches it takes it as an
//! argument, so the device in use is always visible at the call site.

mod buffer;
mod error;
mod program;
mod renderer;
mod shader;

pub use buffer::{VertexBuffer, VertexBufferConfig, VertexData};
pub use error::GlError;
pub use program::Program;
pub use renderer::{FrameRenderer, FrameRendererConfig, SharedBuffer};
pub use shader::Shader;
