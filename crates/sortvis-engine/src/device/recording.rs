use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::objects::ObjectTable;
use super::validate::{self, VertexLimits};
use super::{
    BufferId, BufferUsage, DeviceError, DrawMode, GraphicsDevice, ProgramId, ShaderId,
    ShaderStage, VertexAttribLayout, ViewportRect,
};

/// One call observed by a [`RecordingDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateShader(ShaderStage, ShaderId),
    ShaderSource(ShaderId),
    CompileShader(ShaderId),
    DeleteShader(ShaderId),
    CreateProgram(ProgramId),
    AttachShader(ProgramId, ShaderId),
    LinkProgram(ProgramId),
    UseProgram(Option<ProgramId>),
    DeleteProgram(ProgramId),
    CreateBuffer(BufferId),
    BindArrayBuffer(Option<BufferId>),
    /// Upload to the bound buffer: target, payload, usage hint.
    BufferData(Option<BufferId>, Vec<u8>, BufferUsage),
    DeleteBuffer(BufferId),
    EnableVertexAttribArray(u32),
    DisableVertexAttribArray(u32),
    VertexAttribPointer(VertexAttribLayout),
    Viewport(ViewportRect),
    ClearColor([f32; 4]),
    Clear,
    DrawArrays {
        mode: DrawMode,
        first: u32,
        count: u32,
    },
}

/// Headless [`GraphicsDevice`].
///
/// Shader compilation and program linking run the same WGSL checks as [`Gpu`](super::Gpu),
/// so compile/link outcomes and info logs match a real device. Everything else is
/// tracked as plain state and appended to a call log.
#[derive(Debug)]
pub struct RecordingDevice {
    size: (u32, u32),
    limits: VertexLimits,
    objects: ObjectTable,
    buffers: HashMap<BufferId, Vec<u8>>,

    bound_buffer: Option<BufferId>,
    current_program: Option<ProgramId>,
    attribs: BTreeMap<u32, (VertexAttribLayout, Option<BufferId>)>,
    enabled: BTreeSet<u32>,

    calls: Vec<DeviceCall>,
}

impl RecordingDevice {
    /// Creates a device whose surface is `width` x `height` physical pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            limits: VertexLimits::default(),
            objects: ObjectTable::default(),
            buffers: HashMap::new(),
            bound_buffer: None,
            current_program: None,
            attribs: BTreeMap::new(),
            enabled: BTreeSet::new(),
            calls: Vec::new(),
        }
    }

    /// Simulates a surface resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    /// Every call observed so far, in order.
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Drains the call log.
    pub fn take_calls(&mut self) -> Vec<DeviceCall> {
        std::mem::take(&mut self.calls)
    }

    /// Draw calls observed so far as `(mode, first, count)`.
    pub fn draws(&self) -> Vec<(DrawMode, u32, u32)> {
        self.calls
            .iter()
            .filter_map(|c| match *c {
                DeviceCall::DrawArrays { mode, first, count } => Some((mode, first, count)),
                _ => None,
            })
            .collect()
    }

    /// Last uploaded contents of `buffer`.
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    /// Number of live buffer objects.
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Number of live shader objects.
    pub fn live_shaders(&self) -> usize {
        self.objects.shaders.len()
    }

    /// Number of live program objects.
    pub fn live_programs(&self) -> usize {
        self.objects.programs.len()
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderId, DeviceError> {
        let id = self.objects.create_shader(stage)?;
        self.calls.push(DeviceCall::CreateShader(stage, id));
        Ok(id)
    }

    fn shader_source(&mut self, shader: ShaderId, source: &str) {
        self.objects.shader_source(shader, source);
        self.calls.push(DeviceCall::ShaderSource(shader));
    }

    fn compile_shader(&mut self, shader: ShaderId) {
        self.objects.compile_shader(shader);
        self.calls.push(DeviceCall::CompileShader(shader));
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        self.objects.shader_compile_status(shader)
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.objects.shader_info_log(shader)
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.objects.shaders.remove(&shader);
        self.calls.push(DeviceCall::DeleteShader(shader));
    }

    fn create_program(&mut self) -> Result<ProgramId, DeviceError> {
        let id = self.objects.create_program()?;
        self.calls.push(DeviceCall::CreateProgram(id));
        Ok(id)
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        self.objects.attach_shader(program, shader);
        self.calls.push(DeviceCall::AttachShader(program, shader));
    }

    fn link_program(&mut self, program: ProgramId) {
        self.objects.link_program(program);
        self.calls.push(DeviceCall::LinkProgram(program));
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        self.objects.program_link_status(program)
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.objects.program_info_log(program)
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.current_program = program;
        self.calls.push(DeviceCall::UseProgram(program));
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.objects.programs.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.calls.push(DeviceCall::DeleteProgram(program));
    }

    fn create_buffer(&mut self) -> Result<BufferId, DeviceError> {
        let id = BufferId(self.objects.alloc("buffer")?);
        self.buffers.insert(id, Vec::new());
        self.calls.push(DeviceCall::CreateBuffer(id));
        Ok(id)
    }

    fn bind_array_buffer(&mut self, buffer: Option<BufferId>) {
        self.bound_buffer = buffer.filter(|b| self.buffers.contains_key(b));
        self.calls.push(DeviceCall::BindArrayBuffer(buffer));
    }

    fn buffer_data(&mut self, data: &[u8], usage: BufferUsage) {
        if let Some(contents) = self.bound_buffer.and_then(|b| self.buffers.get_mut(&b)) {
            contents.clear();
            contents.extend_from_slice(data);
        }
        self.calls
            .push(DeviceCall::BufferData(self.bound_buffer, data.to_vec(), usage));
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
        if self.bound_buffer == Some(buffer) {
            self.bound_buffer = None;
        }
        for (index, (_, source)) in self.attribs.iter_mut() {
            if *source == Some(buffer) {
                *source = None;
                self.enabled.remove(index);
            }
        }
        self.calls.push(DeviceCall::DeleteBuffer(buffer));
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.enabled.insert(index);
        self.calls.push(DeviceCall::EnableVertexAttribArray(index));
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        self.enabled.remove(&index);
        self.calls.push(DeviceCall::DisableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer(&mut self, layout: VertexAttribLayout) {
        self.attribs.insert(layout.index, (layout, self.bound_buffer));
        self.calls.push(DeviceCall::VertexAttribPointer(layout));
    }

    fn viewport(&mut self, rect: ViewportRect) {
        self.calls.push(DeviceCall::Viewport(rect));
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.calls.push(DeviceCall::ClearColor(rgba));
    }

    fn clear(&mut self) {
        self.calls.push(DeviceCall::Clear);
    }

    fn draw_arrays(&mut self, mode: DrawMode, first: u32, count: u32) -> Result<(), DeviceError> {
        self.calls.push(DeviceCall::DrawArrays { mode, first, count });

        if count == 0 {
            return Ok(());
        }
        let Some(stages) = self
            .current_program
            .and_then(|p| self.objects.linked(p))
        else {
            return Err(DeviceError::NoProgramBound);
        };

        let mut attributes = Vec::with_capacity(self.enabled.len());
        for &index in &self.enabled {
            let Some((layout, Some(buffer))) = self.attribs.get(&index) else {
                return Err(DeviceError::MissingAttributeBuffer(index));
            };
            let available = self.buffers.get(buffer).map_or(0, |b| b.len() as u64);
            validate::check_attribute(layout, available, first, count, &self.limits)?;
            attributes.push((index, layout.numeric_kind()));
        }
        validate::check_shader_inputs(&stages.vertex_inputs, &attributes, &self.limits)
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }
}
