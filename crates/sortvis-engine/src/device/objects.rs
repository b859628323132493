//! Shader/program object bookkeeping shared by the device implementations.

use std::collections::HashMap;

use super::types::HandleAlloc;
use super::wgsl::{self, Compiled, StageInterface, StageIo};
use super::{DeviceError, NumericKind, ProgramId, ShaderId, ShaderStage};

#[derive(Debug)]
pub(crate) struct ShaderObject {
    pub stage: ShaderStage,
    pub source: String,
    pub compiled: Option<Compiled>,
}

impl ShaderObject {
    pub fn entry_point(&self) -> Option<&str> {
        match &self.compiled {
            Some(Compiled::Ok { entry_point, .. }) => Some(entry_point),
            _ => None,
        }
    }

    pub fn interface(&self) -> Option<&StageInterface> {
        match &self.compiled {
            Some(Compiled::Ok { interface, .. }) => Some(interface),
            _ => None,
        }
    }
}

/// Result of a successful link: the stage entry points the program runs.
#[derive(Debug, Clone)]
pub(crate) struct LinkedStages {
    pub vertex: (ShaderId, String),
    pub fragment: (ShaderId, String),
    /// Attribute locations the vertex stage reads; every draw must supply them.
    pub vertex_inputs: Vec<StageIo>,
}

#[derive(Debug, Default)]
pub(crate) struct ProgramObject {
    pub attached: Vec<ShaderId>,
    pub linked: Option<LinkedStages>,
    pub log: String,
}

/// Shader and program tables plus the GL compile/link rules.
#[derive(Debug, Default)]
pub(crate) struct ObjectTable {
    handles: HandleAlloc,
    pub shaders: HashMap<ShaderId, ShaderObject>,
    pub programs: HashMap<ProgramId, ProgramObject>,
}

impl ObjectTable {
    pub fn alloc(&mut self, kind: &'static str) -> Result<u32, DeviceError> {
        self.handles.next().ok_or(DeviceError::ObjectCreation(kind))
    }

    pub fn create_shader(&mut self, stage: ShaderStage) -> Result<ShaderId, DeviceError> {
        let id = ShaderId(self.alloc("shader")?);
        self.shaders.insert(
            id,
            ShaderObject {
                stage,
                source: String::new(),
                compiled: None,
            },
        );
        Ok(id)
    }

    pub fn shader_source(&mut self, shader: ShaderId, source: &str) {
        if let Some(obj) = self.shaders.get_mut(&shader) {
            obj.source = source.to_owned();
        }
    }

    /// Compiles the shader's current source. Returns the new outcome, if the shader exists.
    pub fn compile_shader(&mut self, shader: ShaderId) -> Option<&Compiled> {
        let obj = self.shaders.get_mut(&shader)?;
        obj.compiled = Some(wgsl::compile(obj.stage, &obj.source));
        obj.compiled.as_ref()
    }

    pub fn shader_compile_status(&self, shader: ShaderId) -> bool {
        self.shaders
            .get(&shader)
            .is_some_and(|s| s.entry_point().is_some())
    }

    pub fn shader_info_log(&self, shader: ShaderId) -> String {
        match self.shaders.get(&shader).and_then(|s| s.compiled.as_ref()) {
            Some(Compiled::Failed { log }) => log.clone(),
            _ => String::new(),
        }
    }

    pub fn create_program(&mut self) -> Result<ProgramId, DeviceError> {
        let id = ProgramId(self.alloc("program")?);
        self.programs.insert(id, ProgramObject::default());
        Ok(id)
    }

    pub fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        if !self.shaders.contains_key(&shader) {
            return;
        }
        if let Some(p) = self.programs.get_mut(&program) {
            if !p.attached.contains(&shader) {
                p.attached.push(shader);
            }
        }
    }

    /// Links `program`: exactly one compiled vertex and one compiled fragment shader.
    pub fn link_program(&mut self, program: ProgramId) -> Option<&LinkedStages> {
        let p = self.programs.get(&program)?;
        let outcome = link(&self.shaders, &p.attached);

        let p = self.programs.get_mut(&program)?;
        match outcome {
            Ok(stages) => {
                p.linked = Some(stages);
                p.log.clear();
            }
            Err(log) => {
                p.linked = None;
                p.log = log;
            }
        }
        p.linked.as_ref()
    }

    pub fn program_link_status(&self, program: ProgramId) -> bool {
        self.programs
            .get(&program)
            .is_some_and(|p| p.linked.is_some())
    }

    pub fn linked(&self, program: ProgramId) -> Option<&LinkedStages> {
        self.programs.get(&program).and_then(|p| p.linked.as_ref())
    }

    pub fn program_info_log(&self, program: ProgramId) -> String {
        self.programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }
}

fn link(
    shaders: &HashMap<ShaderId, ShaderObject>,
    attached: &[ShaderId],
) -> Result<LinkedStages, String> {
    let mut vertex = None;
    let mut fragment = None;

    for id in attached {
        let Some(obj) = shaders.get(id) else { continue };
        let Some(entry) = obj.entry_point() else {
            return Err(format!("{} shader {} is not compiled", obj.stage, id.0));
        };
        let slot = match obj.stage {
            ShaderStage::Vertex => &mut vertex,
            ShaderStage::Fragment => &mut fragment,
        };
        if slot.is_some() {
            return Err(format!("more than one {} shader attached", obj.stage));
        }
        let interface = obj.interface().cloned().unwrap_or_default();
        *slot = Some((*id, entry.to_owned(), interface));
    }

    let (vertex, fragment) = match (vertex, fragment) {
        (Some(vertex), Some(fragment)) => (vertex, fragment),
        (None, _) => return Err("missing vertex shader".to_owned()),
        (_, None) => return Err("missing fragment shader".to_owned()),
    };
    check_interface(&vertex.2, &fragment.2)?;

    Ok(LinkedStages {
        vertex: (vertex.0, vertex.1),
        fragment: (fragment.0, fragment.1),
        vertex_inputs: vertex.2.inputs,
    })
}

/// Every fragment input must be a matching vertex output, and the only colour
/// output is a `vec4<f32>` at location 0 (the single surface target).
fn check_interface(vertex: &StageInterface, fragment: &StageInterface) -> Result<(), String> {
    for input in &fragment.inputs {
        let Some(output) = vertex.outputs.iter().find(|o| o.location == input.location) else {
            return Err(format!(
                "fragment input @location({}) is not written by the vertex shader",
                input.location
            ));
        };
        if !output.matches(input) {
            return Err(format!(
                "fragment input @location({}) does not match the vertex output type",
                input.location
            ));
        }
    }

    for output in &fragment.outputs {
        if output.location != 0 || output.kind != NumericKind::Float || output.components != 4 {
            return Err(format!(
                "fragment output @location({}) must be a vec4<f32> at location 0",
                output.location
            ));
        }
    }
    Ok(())
}
