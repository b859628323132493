//! Graphics device layer.
//!
//! [`GraphicsDevice`] is the GL-style contract the `gl` components are written
//! against. Two implementations live here:
//! - [`Gpu`]: wgpu-backed device bound to a window surface
//! - [`RecordingDevice`]: headless device that records every call
//!
//! Handles are plain ids; the device owns the underlying objects. Binding state
//! (current program, bound buffer, attribute layouts, viewport) is global to the
//! device and overwritten by every call, exactly like a GL context.

mod error;
mod gpu;
mod init;
mod objects;
mod pipeline;
mod recording;
mod surface;
mod types;
mod validate;
pub(crate) mod wgsl;

pub use error::{DeviceError, SurfaceErrorAction};
pub use gpu::Gpu;
pub use init::GpuInit;
pub use recording::{DeviceCall, RecordingDevice};
pub use types::{
    BufferId, BufferUsage, DataType, DrawMode, NumericKind, ProgramId, ShaderId, ShaderStage,
    VertexAttribLayout, ViewportRect,
};

/// GL-style graphics device.
///
/// Object creation and draw calls are fallible; the remaining calls mirror GL,
/// where misuse is recorded as device state rather than reported to the caller.
pub trait GraphicsDevice {
    // ── shaders ───────────────────────────────────────────────────────────

    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderId, DeviceError>;
    fn shader_source(&mut self, shader: ShaderId, source: &str);
    fn compile_shader(&mut self, shader: ShaderId);
    fn shader_compile_status(&self, shader: ShaderId) -> bool;
    fn shader_info_log(&self, shader: ShaderId) -> String;
    fn delete_shader(&mut self, shader: ShaderId);

    // ── programs ──────────────────────────────────────────────────────────

    fn create_program(&mut self) -> Result<ProgramId, DeviceError>;
    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId);
    fn link_program(&mut self, program: ProgramId);
    fn program_link_status(&self, program: ProgramId) -> bool;
    fn program_info_log(&self, program: ProgramId) -> String;
    /// Makes `program` current; `None` unbinds.
    fn use_program(&mut self, program: Option<ProgramId>);
    fn delete_program(&mut self, program: ProgramId);

    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&mut self) -> Result<BufferId, DeviceError>;
    /// Binds `buffer` to the array-buffer target; `None` unbinds.
    fn bind_array_buffer(&mut self, buffer: Option<BufferId>);
    /// Replaces the contents of the currently bound array buffer.
    fn buffer_data(&mut self, data: &[u8], usage: BufferUsage);
    fn delete_buffer(&mut self, buffer: BufferId);

    // ── vertex attributes ─────────────────────────────────────────────────

    fn enable_vertex_attrib_array(&mut self, index: u32);
    /// Stops attribute `index` from taking part in draws. Its layout is kept.
    fn disable_vertex_attrib_array(&mut self, index: u32);
    /// Describes attribute `layout.index` as reading from the currently bound array buffer.
    fn vertex_attrib_pointer(&mut self, layout: VertexAttribLayout);

    // ── frame ─────────────────────────────────────────────────────────────

    fn viewport(&mut self, rect: ViewportRect);
    fn clear_color(&mut self, rgba: [f32; 4]);
    /// Clears the color buffer to the current clear color.
    fn clear(&mut self);
    fn draw_arrays(&mut self, mode: DrawMode, first: u32, count: u32) -> Result<(), DeviceError>;

    /// Current drawable size in physical pixels.
    fn surface_size(&self) -> (u32, u32);
}
