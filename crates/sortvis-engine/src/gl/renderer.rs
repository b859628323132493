use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::device::{DrawMode, GraphicsDevice, ViewportRect};

use super::{GlError, Program, VertexBuffer};

/// A vertex buffer shared between the caller, who fills it between frames, and
/// the renderers it is attached to.
pub type SharedBuffer = Rc<RefCell<VertexBuffer>>;

/// Configuration for [`FrameRenderer`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct FrameRendererConfig {
    /// Primitive assembly mode (default: triangles).
    pub draw_mode: DrawMode,
    /// First vertex passed to the draw call.
    pub first: u32,
}

/// Draws one frame from an attached program and buffers.
///
/// The vertex count of the draw call comes from the buffer bound to attribute
/// index 0: `len / size`. When several attached buffers use index 0, the last
/// one attached wins; with none, the count is 0.
pub struct FrameRenderer {
    draw_mode: DrawMode,
    first: u32,
    viewport: ViewportRect,
    buffers: Vec<SharedBuffer>,
    program: Option<Rc<Program>>,
    /// Attribute indices enabled by the previous render.
    live_attributes: RefCell<BTreeSet<u32>>,
}

impl FrameRenderer {
    /// Creates a renderer whose viewport covers the device's current surface.
    pub fn new<D: GraphicsDevice>(device: &D, config: FrameRendererConfig) -> Self {
        let size = device.surface_size();
        log::debug!(
            "frame renderer created ({:?}, surface {}x{})",
            config.draw_mode,
            size.0,
            size.1
        );
        Self {
            draw_mode: config.draw_mode,
            first: config.first,
            viewport: ViewportRect::full(size),
            buffers: Vec::new(),
            program: None,
            live_attributes: RefCell::new(BTreeSet::new()),
        }
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    pub fn set_draw_mode(&mut self, mode: DrawMode) {
        self.draw_mode = mode;
    }

    /// Stores `rect` as the renderer's viewport. No device call is made, and
    /// `render` still covers the full surface.
    pub fn set_viewport(&mut self, rect: ViewportRect) {
        self.viewport = rect;
    }

    /// Last rectangle stored by `new` or `set_viewport`.
    pub fn viewport(&self) -> ViewportRect {
        self.viewport
    }

    /// Replaces the active program; returns the previous one.
    pub fn attach_program(&mut self, program: Rc<Program>) -> Option<Rc<Program>> {
        self.program.replace(program)
    }

    pub fn detach_program(&mut self) -> Option<Rc<Program>> {
        self.program.take()
    }

    pub fn program(&self) -> Option<&Rc<Program>> {
        self.program.as_ref()
    }

    pub fn attach_buffer(&mut self, buffer: SharedBuffer) {
        self.buffers.push(buffer);
    }

    /// Detaches `buffer` by identity. Returns whether it was attached.
    pub fn detach_buffer(&mut self, buffer: &SharedBuffer) -> bool {
        match self.buffers.iter().position(|b| Rc::ptr_eq(b, buffer)) {
            Some(i) => {
                self.buffers.remove(i);
                true
            }
            None => false,
        }
    }

    /// Detaches the buffer at `index`; later buffers shift down by one.
    pub fn detach_buffer_at(&mut self, index: usize) -> Result<SharedBuffer, GlError> {
        if index >= self.buffers.len() {
            return Err(GlError::BufferIndexOutOfRange {
                index,
                len: self.buffers.len(),
            });
        }
        Ok(self.buffers.remove(index))
    }

    pub fn buffers(&self) -> &[SharedBuffer] {
        &self.buffers
    }

    /// Vertex count the next draw call will use.
    pub fn vertex_count(&self) -> u32 {
        self.buffers
            .iter()
            .rev()
            .map(|b| b.borrow())
            .find(|b| b.index() == 0)
            .map_or(0, |b| u32::try_from(b.vertex_count()).unwrap_or(u32::MAX))
    }

    /// Renders one frame.
    ///
    /// Sets the viewport to the full surface, clears to transparent black,
    /// makes the program current, uploads and binds every attached buffer in
    /// order, then issues exactly one draw call.
    ///
    /// Attributes enabled by the previous render that no attached buffer uses
    /// any more are disabled first, so detached buffers stop feeding the draw.
    pub fn render<D: GraphicsDevice>(&self, device: &mut D) -> Result<(), GlError> {
        let viewport = ViewportRect::full(device.surface_size());
        device.viewport(viewport);

        device.clear_color([0.0, 0.0, 0.0, 0.0]);
        device.clear();

        if let Some(program) = &self.program {
            program.use_program(device)?;
        }

        let current: BTreeSet<u32> = self.buffers.iter().map(|b| b.borrow().index()).collect();
        let previous = self.live_attributes.replace(current.clone());
        for &index in previous.difference(&current) {
            device.disable_vertex_attrib_array(index);
        }

        for buffer in &self.buffers {
            buffer.borrow().render(device);
        }

        let count = self.vertex_count();
        device.draw_arrays(self.draw_mode, self.first, count)?;

        log::trace!(
            "frame rendered: {} buffers, {count} vertices, viewport {}x{}",
            self.buffers.len(),
            viewport.width,
            viewport.height
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::wgsl::fixtures;
    use crate::device::{DeviceCall, RecordingDevice, ShaderStage};
    use crate::gl::{Shader, VertexBufferConfig};

    fn shared(dev: &mut RecordingDevice, index: u32, size: u8) -> SharedBuffer {
        let config = VertexBufferConfig {
            index,
            size,
            ..Default::default()
        };
        Rc::new(RefCell::new(VertexBuffer::new(dev, config).unwrap()))
    }

    fn linked_program(dev: &mut RecordingDevice) -> Rc<Program> {
        let vs = Shader::new(dev, ShaderStage::Vertex, fixtures::VERTEX).unwrap();
        let fs = Shader::new(dev, ShaderStage::Fragment, fixtures::FRAGMENT).unwrap();
        Rc::new(Program::new(dev, &[&vs, &fs]).unwrap())
    }

    // ── vertex count ──────────────────────────────────────────────────────

    #[test]
    fn count_comes_from_index_zero_buffer() {
        let mut dev = RecordingDevice::new(100, 50);
        let mut r = FrameRenderer::new(&dev, FrameRendererConfig::default());

        let colors = shared(&mut dev, 1, 4);
        colors.borrow_mut().push(&[0.5f32; 16]);
        let positions = shared(&mut dev, 0, 3);
        positions.borrow_mut().push(&[0.0f32; 9]);

        r.attach_buffer(colors);
        r.attach_buffer(positions);
        assert_eq!(r.vertex_count(), 3);
    }

    #[test]
    fn count_is_zero_without_index_zero_buffer() {
        let mut dev = RecordingDevice::new(100, 50);
        let mut r = FrameRenderer::new(&dev, FrameRendererConfig::default());
        let colors = shared(&mut dev, 1, 3);
        colors.borrow_mut().push(&[1.0f32; 9]);
        r.attach_buffer(colors);
        assert_eq!(r.vertex_count(), 0);
    }

    #[test]
    fn last_index_zero_buffer_wins() {
        let mut dev = RecordingDevice::new(100, 50);
        let mut r = FrameRenderer::new(&dev, FrameRendererConfig::default());
        let a = shared(&mut dev, 0, 3);
        a.borrow_mut().push(&[0.0f32; 9]);
        let b = shared(&mut dev, 0, 2);
        b.borrow_mut().push(&[0.0f32; 10]);

        r.attach_buffer(a);
        r.attach_buffer(b);
        assert_eq!(r.vertex_count(), 5);
    }

    // ── attach / detach ───────────────────────────────────────────────────

    #[test]
    fn detach_at_shifts_later_buffers() {
        let mut dev = RecordingDevice::new(100, 50);
        let mut r = FrameRenderer::new(&dev, FrameRendererConfig::default());
        let bufs: Vec<_> = (0..3).map(|i| shared(&mut dev, i, 3)).collect();
        for b in &bufs {
            r.attach_buffer(Rc::clone(b));
        }

        let removed = r.detach_buffer_at(1).unwrap();
        assert!(Rc::ptr_eq(&removed, &bufs[1]));
        assert_eq!(r.buffers().len(), 2);
        assert!(Rc::ptr_eq(&r.buffers()[0], &bufs[0]));
        assert!(Rc::ptr_eq(&r.buffers()[1], &bufs[2]));
    }

    #[test]
    fn detach_at_out_of_range_is_an_error() {
        let dev = RecordingDevice::new(100, 50);
        let mut r = FrameRenderer::new(&dev, FrameRendererConfig::default());
        let err = r.detach_buffer_at(0).unwrap_err();
        assert!(matches!(err, GlError::BufferIndexOutOfRange { index: 0, len: 0 }));
    }

    #[test]
    fn attach_then_detach_by_identity_restores_order() {
        let mut dev = RecordingDevice::new(100, 50);
        let mut r = FrameRenderer::new(&dev, FrameRendererConfig::default());
        let a = shared(&mut dev, 0, 3);
        let b = shared(&mut dev, 1, 3);
        let extra = shared(&mut dev, 2, 3);
        r.attach_buffer(Rc::clone(&a));
        r.attach_buffer(Rc::clone(&b));

        r.attach_buffer(Rc::clone(&extra));
        assert!(r.detach_buffer(&extra));
        assert!(!r.detach_buffer(&extra));

        assert_eq!(r.buffers().len(), 2);
        assert!(Rc::ptr_eq(&r.buffers()[0], &a));
        assert!(Rc::ptr_eq(&r.buffers()[1], &b));
    }

    #[test]
    fn attach_program_is_last_write_wins() {
        let mut dev = RecordingDevice::new(100, 50);
        let mut r = FrameRenderer::new(&dev, FrameRendererConfig::default());
        let p1 = linked_program(&mut dev);
        let p2 = linked_program(&mut dev);

        assert!(r.attach_program(Rc::clone(&p1)).is_none());
        let previous = r.attach_program(Rc::clone(&p2)).unwrap();
        assert!(Rc::ptr_eq(&previous, &p1));
        assert!(Rc::ptr_eq(r.program().unwrap(), &p2));
    }

    // ── viewport ──────────────────────────────────────────────────────────

    #[test]
    fn viewport_starts_at_surface_size() {
        let dev = RecordingDevice::new(100, 50);
        let r = FrameRenderer::new(&dev, FrameRendererConfig::default());
        assert_eq!(r.viewport(), ViewportRect::new(0, 0, 100, 50));
    }

    #[test]
    fn render_covers_full_surface_regardless_of_stored_viewport() {
        let mut dev = RecordingDevice::new(100, 50);
        let program = linked_program(&mut dev);
        let mut r = FrameRenderer::new(&dev, FrameRendererConfig::default());
        r.attach_program(program);

        r.set_viewport(ViewportRect::new(10, 10, 20, 20));
        assert_eq!(r.viewport(), ViewportRect::new(10, 10, 20, 20));

        dev.take_calls();
        r.render(&mut dev).unwrap();
        assert_eq!(
            dev.calls()[0],
            DeviceCall::Viewport(ViewportRect::new(0, 0, 100, 50))
        );

        dev.resize(300, 200);
        dev.take_calls();
        r.render(&mut dev).unwrap();
        assert_eq!(
            dev.calls()[0],
            DeviceCall::Viewport(ViewportRect::new(0, 0, 300, 200))
        );
        assert_eq!(r.viewport(), ViewportRect::new(10, 10, 20, 20));
    }

    #[test]
    fn set_viewport_makes_no_device_call() {
        let mut dev = RecordingDevice::new(100, 50);
        let mut r = FrameRenderer::new(&dev, FrameRendererConfig::default());
        dev.take_calls();
        r.set_viewport(ViewportRect::new(0, 0, 1, 1));
        assert!(dev.calls().is_empty());
    }

    // ── render ────────────────────────────────────────────────────────────

    #[test]
    fn nine_floats_draw_three_vertices_once() {
        let mut dev = RecordingDevice::new(100, 50);
        let vs = Shader::new(&mut dev, ShaderStage::Vertex, fixtures::VERTEX).unwrap();
        let fs = Shader::new(&mut dev, ShaderStage::Fragment, fixtures::FRAGMENT).unwrap();
        assert!(vs.is_compiled() && fs.is_compiled());
        let program = Rc::new(Program::new(&mut dev, &[&vs, &fs]).unwrap());
        assert!(program.is_linked());

        let positions = shared(&mut dev, 0, 3);
        positions
            .borrow_mut()
            .push(&[[-1.0f32, -1.0, 0.0], [1.0, -1.0, 0.0], [0.0, 1.0, 0.0]]);

        let mut r = FrameRenderer::new(&dev, FrameRendererConfig::default());
        r.attach_program(Rc::clone(&program));
        r.attach_buffer(Rc::clone(&positions));
        r.render(&mut dev).unwrap();

        // Exactly one draw over the whole session, setup included.
        assert_eq!(dev.draws(), vec![(DrawMode::Triangles, 0, 3)]);

        let calls = dev.calls();
        let start = calls
            .iter()
            .position(|c| matches!(c, DeviceCall::Viewport(_)))
            .unwrap();
        let frame = &calls[start..];
        assert_eq!(frame[0], DeviceCall::Viewport(ViewportRect::new(0, 0, 100, 50)));
        assert_eq!(frame[1], DeviceCall::ClearColor([0.0, 0.0, 0.0, 0.0]));
        assert_eq!(frame[2], DeviceCall::Clear);
        assert_eq!(frame[3], DeviceCall::UseProgram(program.id()));
        assert!(matches!(frame.last(), Some(DeviceCall::DrawArrays { .. })));
    }

    #[test]
    fn buffer_changes_between_frames_are_uploaded() {
        let mut dev = RecordingDevice::new(100, 50);
        let program = linked_program(&mut dev);
        let positions = shared(&mut dev, 0, 3);
        positions.borrow_mut().push(&[0.0f32; 9]);

        let mut r = FrameRenderer::new(&dev, FrameRendererConfig::default());
        r.attach_program(program);
        r.attach_buffer(Rc::clone(&positions));
        r.render(&mut dev).unwrap();

        positions.borrow_mut().push(&[0.0f32; 9]);
        r.render(&mut dev).unwrap();

        positions.borrow_mut().clear();
        r.render(&mut dev).unwrap();

        assert_eq!(
            dev.draws(),
            vec![
                (DrawMode::Triangles, 0, 3),
                (DrawMode::Triangles, 0, 6),
                (DrawMode::Triangles, 0, 0),
            ]
        );
        let id = positions.borrow().id().unwrap();
        assert_eq!(dev.buffer_contents(id), Some(&[][..]));
    }

    #[test]
    fn configured_mode_and_first_reach_the_draw() {
        let mut dev = RecordingDevice::new(100, 50);
        let program = linked_program(&mut dev);
        let positions = shared(&mut dev, 0, 2);
        positions.borrow_mut().push(&[0.0f32; 8]);

        let config = FrameRendererConfig {
            draw_mode: DrawMode::LineStrip,
            first: 0,
        };
        let mut r = FrameRenderer::new(&dev, config);
        r.attach_program(program);
        r.attach_buffer(positions);
        r.render(&mut dev).unwrap();

        assert_eq!(dev.draws(), vec![(DrawMode::LineStrip, 0, 4)]);
    }

    #[test]
    fn first_past_the_data_is_rejected_by_the_device() {
        let mut dev = RecordingDevice::new(100, 50);
        let program = linked_program(&mut dev);
        let positions = shared(&mut dev, 0, 2);
        positions.borrow_mut().push(&[0.0f32; 8]);

        let config = FrameRendererConfig {
            first: 1,
            ..Default::default()
        };
        let mut r = FrameRenderer::new(&dev, config);
        r.attach_program(program);
        r.attach_buffer(positions);

        let err = r.render(&mut dev).unwrap_err();
        assert!(matches!(
            err,
            GlError::Device(crate::device::DeviceError::AttributeOutOfRange { index: 0, .. })
        ));
    }

    #[test]
    fn unlinked_program_stops_the_frame() {
        let mut dev = RecordingDevice::new(100, 50);
        let vs = Shader::new(&mut dev, ShaderStage::Vertex, fixtures::BROKEN).unwrap();
        let fs = Shader::new(&mut dev, ShaderStage::Fragment, fixtures::FRAGMENT).unwrap();
        let program = Rc::new(Program::new(&mut dev, &[&vs, &fs]).unwrap());

        let mut r = FrameRenderer::new(&dev, FrameRendererConfig::default());
        r.attach_program(program);

        let err = r.render(&mut dev).unwrap_err();
        assert!(matches!(err, GlError::ProgramNotLinked));
        assert!(dev.draws().is_empty());
    }

    #[test]
    fn detached_buffer_stops_feeding_the_draw() {
        let mut dev = RecordingDevice::new(100, 50);
        let program = linked_program(&mut dev);
        let positions = shared(&mut dev, 0, 3);
        positions.borrow_mut().push(&[0.0f32; 9]);
        let colors = shared(&mut dev, 1, 3);
        colors.borrow_mut().push(&[1.0f32; 9]);

        let mut r = FrameRenderer::new(&dev, FrameRendererConfig::default());
        r.attach_program(program);
        r.attach_buffer(Rc::clone(&positions));
        r.attach_buffer(Rc::clone(&colors));
        r.render(&mut dev).unwrap();

        assert!(r.detach_buffer(&colors));
        positions.borrow_mut().push(&[0.0f32; 9]);

        // The colour data only covers three vertices; six are drawn now.
        dev.take_calls();
        r.render(&mut dev).unwrap();
        assert_eq!(dev.draws(), vec![(DrawMode::Triangles, 0, 6)]);
        assert!(dev.calls().contains(&DeviceCall::DisableVertexAttribArray(1)));

        // Nothing left to disable on the next frame.
        dev.take_calls();
        r.render(&mut dev).unwrap();
        assert!(!dev
            .calls()
            .iter()
            .any(|c| matches!(c, DeviceCall::DisableVertexAttribArray(_))));
    }
}
