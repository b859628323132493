use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::objects::ObjectTable;
use super::pipeline::{self, LinkedModules, PipelineKey, VertexSlot};
use super::validate::{self, VertexLimits};
use super::wgsl::Compiled;
use super::{
    surface, BufferId, BufferUsage, DeviceError, DrawMode, GpuInit, GraphicsDevice, ProgramId,
    ShaderId, ShaderStage, VertexAttribLayout, ViewportRect,
};

/// A single acquired surface frame.
///
/// Holding the surface texture prevents acquisition of subsequent frames, so a
/// frame lives from the first clear/draw until [`Gpu::present`].
struct GpuFrame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

/// Device-side storage behind a [`BufferId`].
#[derive(Default)]
struct GpuBuffer {
    storage: Option<wgpu::Buffer>,
    capacity: u64,
    /// Bytes written by the last upload.
    len: u64,
}

#[derive(Debug, Copy, Clone)]
struct AttribState {
    layout: VertexAttribLayout,
    buffer: Option<BufferId>,
}

/// One enabled attribute resolved for a draw call.
struct VertexInput {
    slot: VertexSlot,
    buffer: BufferId,
    start: u64,
    end: u64,
}

/// wgpu-backed [`GraphicsDevice`] bound to a window surface.
///
/// wgpu has no global binding state, so this type keeps the GL state itself:
/// bound array buffer, per-index attribute layouts, enabled attributes, current
/// program, viewport and clear color. A draw call turns that state into a
/// cached render pipeline plus one render pass on the current frame.
///
/// Frames are acquired lazily by the first `clear` or `draw_arrays` and handed
/// to the compositor by [`Gpu::present`]. Uploads go through
/// `Queue::write_buffer`, which is staged until submission: several draws from
/// one buffer within a frame all see its last contents.
pub struct Gpu<'w> {
    /// Surface bound to the window; the window must outlive the `Gpu`.
    surface: wgpu::Surface<'w>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    limits: VertexLimits,

    objects: ObjectTable,
    modules: HashMap<ShaderId, wgpu::ShaderModule>,
    linked: HashMap<ProgramId, LinkedModules>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    buffers: HashMap<BufferId, GpuBuffer>,

    bound_buffer: Option<BufferId>,
    current_program: Option<ProgramId>,
    attribs: BTreeMap<u32, AttribState>,
    enabled: BTreeSet<u32>,
    viewport: ViewportRect,
    clear_color: wgpu::Color,

    pending_clear: Option<wgpu::Color>,
    frame: Option<GpuFrame>,
}

impl<'w> Gpu<'w> {
    /// Creates a device bound to `window`.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("sortvis device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_format(&caps, init.prefer_srgb)
            .context("no supported surface formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: init.present_mode,
            alpha_mode: surface::choose_alpha_mode(&caps, init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };

        surface.configure(&device, &config);
        let limits = VertexLimits::from_limits(&device.limits());
        log::info!(
            "gpu ready: {:?} on {} ({}x{})",
            format,
            adapter.get_info().name,
            size.width,
            size.height
        );

        Ok(Self {
            surface,
            device,
            queue,
            limits,
            config,
            size,
            objects: ObjectTable::default(),
            modules: HashMap::new(),
            linked: HashMap::new(),
            pipelines: HashMap::new(),
            buffers: HashMap::new(),
            bound_buffer: None,
            current_program: None,
            attribs: BTreeMap::new(),
            enabled: BTreeSet::new(),
            viewport: ViewportRect::full((size.width, size.height)),
            clear_color: wgpu::Color::TRANSPARENT,
            pending_clear: None,
            frame: None,
        })
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Returns the current drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Reconfigures the surface after a resize.
    ///
    /// A 0x0 surface cannot be configured; only the size is recorded then.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        // A frame acquired at the old size is stale.
        self.frame = None;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Submits everything recorded this frame and presents it.
    ///
    /// A clear with no following draw still reaches the screen. Without any
    /// clear or draw since the last present this is a no-op.
    pub fn present(&mut self) -> Result<(), DeviceError> {
        if self.frame.is_none() && self.pending_clear.is_some() {
            self.ensure_frame()?;
        }
        let Some(mut frame) = self.frame.take() else {
            return Ok(());
        };

        if let Some(color) = self.pending_clear.take() {
            let _rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sortvis clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        self.queue.submit(std::iter::once(frame.encoder.finish()));
        drop(frame.view);
        frame.surface_texture.present();
        Ok(())
    }

    fn ensure_frame(&mut self) -> Result<(), DeviceError> {
        if self.frame.is_some() {
            return Ok(());
        }
        if self.size.width == 0 || self.size.height == 0 {
            return Err(DeviceError::Surface(super::SurfaceErrorAction::SkipFrame));
        }

        let surface_texture = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(err) => {
                let action = surface::classify(&err);
                log::warn!("surface frame unavailable: {err} ({action:?})");
                if action == super::SurfaceErrorAction::Reconfigured {
                    self.surface.configure(&self.device, &self.config);
                }
                return Err(DeviceError::Surface(action));
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sortvis frame encoder"),
            });

        self.frame = Some(GpuFrame {
            surface_texture,
            view,
            encoder,
        });
        Ok(())
    }

    /// Converts the GL viewport (lower-left origin) into a wgpu viewport
    /// (top-left origin), clipped to the surface.
    fn physical_viewport(&self) -> Option<[f32; 4]> {
        let (sw, sh) = (i64::from(self.config.width), i64::from(self.config.height));
        let vp = self.viewport;

        let x0 = i64::from(vp.x).clamp(0, sw);
        let x1 = (i64::from(vp.x) + i64::from(vp.width)).clamp(0, sw);
        let top = sh - (i64::from(vp.y) + i64::from(vp.height));
        let y0 = top.clamp(0, sh);
        let y1 = (top + i64::from(vp.height)).clamp(0, sh);

        (x1 > x0 && y1 > y0).then(|| [x0 as f32, y0 as f32, (x1 - x0) as f32, (y1 - y0) as f32])
    }

    /// Resolves every enabled attribute against its buffer for vertices
    /// `first..first + count` and checks them against what `program` reads.
    fn vertex_inputs(
        &self,
        program: ProgramId,
        first: u32,
        count: u32,
    ) -> Result<Vec<VertexInput>, DeviceError> {
        let stages = self
            .objects
            .linked(program)
            .ok_or(DeviceError::NoProgramBound)?;
        let mut inputs = Vec::with_capacity(self.enabled.len());
        let mut kinds = Vec::with_capacity(self.enabled.len());

        for &index in &self.enabled {
            let Some(AttribState {
                layout,
                buffer: Some(buffer),
            }) = self.attribs.get(&index).copied()
            else {
                return Err(DeviceError::MissingAttributeBuffer(index));
            };

            let available = self.buffers.get(&buffer).map_or(0, |b| b.len);
            let format = validate::check_attribute(&layout, available, first, count, &self.limits)?;
            kinds.push((index, layout.numeric_kind()));

            inputs.push(VertexInput {
                slot: VertexSlot {
                    location: index,
                    stride: layout.effective_stride(),
                    format,
                },
                buffer,
                start: layout.offset as u64,
                end: available,
            });
        }

        validate::check_shader_inputs(&stages.vertex_inputs, &kinds, &self.limits)?;
        Ok(inputs)
    }

    fn forget_program(&mut self, program: ProgramId) {
        self.linked.remove(&program);
        self.pipelines.retain(|key, _| key.program != program);
    }
}

impl GraphicsDevice for Gpu<'_> {
    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderId, DeviceError> {
        self.objects.create_shader(stage)
    }

    fn shader_source(&mut self, shader: ShaderId, source: &str) {
        self.objects.shader_source(shader, source);
    }

    fn compile_shader(&mut self, shader: ShaderId) {
        self.modules.remove(&shader);

        let Some(Compiled::Ok { .. }) = self.objects.compile_shader(shader) else {
            return;
        };
        let Some(obj) = self.objects.shaders.get(&shader) else {
            return;
        };

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sortvis shader"),
            source: wgpu::ShaderSource::Wgsl(obj.source.as_str().into()),
        });
        self.modules.insert(shader, module);
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        self.objects.shader_compile_status(shader)
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.objects.shader_info_log(shader)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        // Linked programs keep their own module handles.
        self.objects.shaders.remove(&shader);
        self.modules.remove(&shader);
    }

    fn create_program(&mut self) -> Result<ProgramId, DeviceError> {
        self.objects.create_program()
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        self.objects.attach_shader(program, shader);
    }

    fn link_program(&mut self, program: ProgramId) {
        self.forget_program(program);

        let Some(stages) = self.objects.link_program(program).cloned() else {
            return;
        };
        let (Some(vs), Some(fs)) = (
            self.modules.get(&stages.vertex.0),
            self.modules.get(&stages.fragment.0),
        ) else {
            log::error!("program {program:?} linked without shader modules");
            return;
        };

        let modules = LinkedModules {
            vertex: (vs.clone(), stages.vertex.1),
            fragment: (fs.clone(), stages.fragment.1),
        };
        self.linked.insert(program, modules);
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        self.objects.program_link_status(program) && self.linked.contains_key(&program)
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.objects.program_info_log(program)
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.current_program = program;
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.objects.programs.remove(&program);
        self.forget_program(program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn create_buffer(&mut self) -> Result<BufferId, DeviceError> {
        let id = BufferId(self.objects.alloc("buffer")?);
        self.buffers.insert(id, GpuBuffer::default());
        Ok(id)
    }

    fn bind_array_buffer(&mut self, buffer: Option<BufferId>) {
        self.bound_buffer = buffer.filter(|b| self.buffers.contains_key(b));
    }

    fn buffer_data(&mut self, data: &[u8], usage: BufferUsage) {
        let Some(buf) = self.bound_buffer.and_then(|id| self.buffers.get_mut(&id)) else {
            log::warn!("buffer_data without a bound array buffer; ignored");
            return;
        };

        let len = data.len() as u64;
        let padded = len.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);

        if buf.storage.is_none() || buf.capacity < padded {
            let capacity = padded.next_power_of_two().max(256);
            buf.storage = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("sortvis vertex buffer"),
                size: capacity,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            buf.capacity = capacity;
            log::debug!("vertex buffer storage grown to {capacity} bytes");
        }
        buf.len = len;

        let Some(storage) = buf.storage.as_ref() else { return };
        if len == 0 {
            return;
        }
        if padded == len {
            self.queue.write_buffer(storage, 0, data);
        } else {
            let mut tail = data.to_vec();
            tail.resize(padded as usize, 0);
            self.queue.write_buffer(storage, 0, &tail);
        }
        log::trace!("uploaded {len} bytes ({usage:?})");
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        if self.bound_buffer == Some(buffer) {
            self.bound_buffer = None;
        }
        // Attributes sourced from a deleted buffer stop taking part in draws.
        for (index, attrib) in self.attribs.iter_mut() {
            if attrib.buffer == Some(buffer) {
                attrib.buffer = None;
                self.enabled.remove(index);
            }
        }
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.enabled.insert(index);
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        self.enabled.remove(&index);
    }

    fn vertex_attrib_pointer(&mut self, layout: VertexAttribLayout) {
        self.attribs.insert(
            layout.index,
            AttribState {
                layout,
                buffer: self.bound_buffer,
            },
        );
    }

    fn viewport(&mut self, rect: ViewportRect) {
        self.viewport = rect;
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        let [r, g, b, a] = rgba.map(f64::from);
        self.clear_color = wgpu::Color { r, g, b, a };
    }

    fn clear(&mut self) {
        self.pending_clear = Some(self.clear_color);
    }

    fn draw_arrays(&mut self, mode: DrawMode, first: u32, count: u32) -> Result<(), DeviceError> {
        if count == 0 {
            return Ok(());
        }

        let program = self
            .current_program
            .filter(|p| self.linked.contains_key(p))
            .ok_or(DeviceError::NoProgramBound)?;
        let inputs = self.vertex_inputs(program, first, count)?;

        let key = PipelineKey {
            program,
            topology: pipeline::topology(mode),
            target: self.config.format,
            slots: inputs.iter().map(|i| i.slot.clone()).collect(),
        };
        if !self.pipelines.contains_key(&key) {
            let modules = self.linked.get(&program).ok_or(DeviceError::NoProgramBound)?;
            let created = pipeline::create_pipeline(&self.device, &key, modules);
            log::debug!(
                "pipeline created for {program:?} ({:?}, {} vertex slots)",
                key.topology,
                key.slots.len()
            );
            self.pipelines.insert(key.clone(), created);
        }

        self.ensure_frame()?;
        let viewport = self.physical_viewport();
        let load = match self.pending_clear.take() {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };

        let (Some(frame), Some(pipeline)) = (self.frame.as_mut(), self.pipelines.get(&key)) else {
            return Ok(());
        };

        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("sortvis draw pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        // Fully clipped viewport: the pass still applies a pending clear.
        let Some([x, y, w, h]) = viewport else {
            return Ok(());
        };

        rpass.set_pipeline(pipeline);
        rpass.set_viewport(x, y, w, h, 0.0, 1.0);
        for (slot, input) in inputs.iter().enumerate() {
            let storage = self
                .buffers
                .get(&input.buffer)
                .and_then(|b| b.storage.as_ref())
                .ok_or(DeviceError::MissingAttributeBuffer(input.slot.location))?;
            rpass.set_vertex_buffer(slot as u32, storage.slice(input.start..input.end));
        }
        rpass.draw(first..first + count, 0..1);

        log::trace!("draw {mode:?} first={first} count={count}");
        Ok(())
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.size.width, self.size.height)
    }
}
