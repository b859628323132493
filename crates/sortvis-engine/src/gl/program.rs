use crate::device::{GraphicsDevice, ProgramId, ShaderStage};

use super::{GlError, Shader};

/// Shader stages linked into an executable program.
///
/// Shaders are borrowed for the link only. Linking is refused, without
/// creating a native program, when any of them failed to compile.
#[derive(Debug)]
pub struct Program {
    id: Option<ProgramId>,
    stages: Vec<ShaderStage>,
    info_log: String,
}

impl Program {
    /// Attaches `shaders` in order and links them.
    ///
    /// Returns `Err` only when the device cannot create a program object; a
    /// failed link yields a program with [`is_linked`](Self::is_linked) false.
    pub fn new<D: GraphicsDevice>(device: &mut D, shaders: &[&Shader]) -> Result<Self, GlError> {
        let stages = shaders.iter().map(|s| s.stage()).collect();

        if let Some(failed) = shaders.iter().find(|s| !s.is_compiled()) {
            let info_log = format!("{} shader did not compile; link skipped", failed.stage());
            log::error!("Program: {info_log}");
            return Ok(Self {
                id: None,
                stages,
                info_log,
            });
        }

        let id = device.create_program()?;
        for shader in shaders {
            shader.attach_to(device, id);
        }
        device.link_program(id);

        if device.program_link_status(id) {
            log::debug!("program {id:?} linked from {} shaders", shaders.len());
            return Ok(Self {
                id: Some(id),
                stages,
                info_log: String::new(),
            });
        }

        let info_log = device.program_info_log(id);
        log::error!("Program: link error\n{info_log}");
        device.delete_program(id);

        Ok(Self {
            id: None,
            stages,
            info_log,
        })
    }

    /// Native handle; `None` when the link failed or was refused.
    pub fn id(&self) -> Option<ProgramId> {
        self.id
    }

    pub fn is_linked(&self) -> bool {
        self.id.is_some()
    }

    /// Stages of the shaders this program was built from, in attach order.
    pub fn stages(&self) -> &[ShaderStage] {
        &self.stages
    }

    /// Linker output (or the reason linking was skipped); empty on success.
    pub fn info_log(&self) -> &str {
        &self.info_log
    }

    pub fn status(&self) -> Result<(), GlError> {
        match self.id {
            Some(_) => Ok(()),
            None => Err(GlError::ProgramLink {
                log: self.info_log.clone(),
            }),
        }
    }

    /// Makes this program current on `device`.
    ///
    /// An unlinked program never reaches the device.
    pub fn use_program<D: GraphicsDevice>(&self, device: &mut D) -> Result<(), GlError> {
        let id = self.id.ok_or(GlError::ProgramNotLinked)?;
        device.use_program(Some(id));
        Ok(())
    }

    pub fn release<D: GraphicsDevice>(self, device: &mut D) {
        if let Some(id) = self.id {
            device.delete_program(id);
        }
    }
}
