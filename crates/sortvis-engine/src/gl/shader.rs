use crate::device::{GraphicsDevice, ProgramId, ShaderId, ShaderStage};

use super::GlError;

/// One shader stage, compiled at construction.
///
/// A failed compile is not an `Err`: the shader is returned in a failed state
/// (no native handle, [`is_compiled`](Self::is_compiled) is false) with the
/// driver's info log kept for inspection.
#[derive(Debug)]
pub struct Shader {
    stage: ShaderStage,
    source: String,
    id: Option<ShaderId>,
    info_log: String,
}

impl Shader {
    /// Creates and compiles a shader object.
    ///
    /// Returns `Err` only when the device cannot create a shader object at all.
    pub fn new<D: GraphicsDevice>(
        device: &mut D,
        stage: ShaderStage,
        source: impl Into<String>,
    ) -> Result<Self, GlError> {
        let source = source.into();

        let id = device.create_shader(stage)?;
        device.shader_source(id, &source);
        device.compile_shader(id);

        if device.shader_compile_status(id) {
            log::debug!("{stage} shader {id:?} compiled");
            return Ok(Self {
                stage,
                source,
                id: Some(id),
                info_log: String::new(),
            });
        }

        let info_log = device.shader_info_log(id);
        log::error!("Shader: {stage} shader compile error\n{info_log}");
        device.delete_shader(id);

        Ok(Self {
            stage,
            source,
            id: None,
            info_log,
        })
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Native handle; `None` after a failed compile.
    pub fn id(&self) -> Option<ShaderId> {
        self.id
    }

    pub fn is_compiled(&self) -> bool {
        self.id.is_some()
    }

    /// Compiler output; empty on success.
    pub fn info_log(&self) -> &str {
        &self.info_log
    }

    /// Compile outcome as a result.
    pub fn status(&self) -> Result<(), GlError> {
        match self.id {
            Some(_) => Ok(()),
            None => Err(GlError::ShaderCompile {
                stage: self.stage,
                log: self.info_log.clone(),
            }),
        }
    }

    /// Registers this shader with `program`'s next link.
    ///
    /// No-op returning `false` when the shader has no handle.
    pub fn attach_to<D: GraphicsDevice>(&self, device: &mut D, program: ProgramId) -> bool {
        match self.id {
            Some(id) => {
                device.attach_shader(program, id);
                true
            }
            None => false,
        }
    }

    /// Deletes the native shader object. Programs already linked from it keep working.
    pub fn release<D: GraphicsDevice>(self, device: &mut D) {
        if let Some(id) = self.id {
            device.delete_shader(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::wgsl::fixtures;
    use crate::device::{DeviceCall, RecordingDevice};

    #[test]
    fn valid_source_compiles() {
        let mut dev = RecordingDevice::new(64, 64);
        let shader = Shader::new(&mut dev, ShaderStage::Vertex, fixtures::VERTEX).unwrap();

        assert!(shader.is_compiled());
        assert!(shader.id().is_some());
        assert!(shader.info_log().is_empty());
        assert!(shader.status().is_ok());
    }

    #[test]
    fn invalid_source_fails_and_releases_handle() {
        let mut dev = RecordingDevice::new(64, 64);
        let shader = Shader::new(&mut dev, ShaderStage::Fragment, fixtures::BROKEN).unwrap();

        assert!(!shader.is_compiled());
        assert!(shader.id().is_none());
        assert!(!shader.info_log().is_empty());
        assert_eq!(dev.live_shaders(), 0);

        match shader.status() {
            Err(GlError::ShaderCompile { stage, .. }) => assert_eq!(stage, ShaderStage::Fragment),
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[test]
    fn failed_shader_attach_is_a_no_op() {
        let mut dev = RecordingDevice::new(64, 64);
        let shader = Shader::new(&mut dev, ShaderStage::Vertex, fixtures::BROKEN).unwrap();
        let program = dev.create_program().unwrap();
        dev.take_calls();

        assert!(!shader.attach_to(&mut dev, program));
        assert!(dev.calls().is_empty());
    }

    #[test]
    fn compiled_shader_attaches() {
        let mut dev = RecordingDevice::new(64, 64);
        let shader = Shader::new(&mut dev, ShaderStage::Vertex, fixtures::VERTEX).unwrap();
        let program = dev.create_program().unwrap();

        assert!(shader.attach_to(&mut dev, program));
        let id = shader.id().unwrap();
        assert_eq!(dev.calls().last(), Some(&DeviceCall::AttachShader(program, id)));
    }

    #[test]
    fn release_deletes_the_native_object() {
        let mut dev = RecordingDevice::new(64, 64);
        let shader = Shader::new(&mut dev, ShaderStage::Vertex, fixtures::VERTEX).unwrap();
        assert_eq!(dev.live_shaders(), 1);

        shader.release(&mut dev);
        assert_eq!(dev.live_shaders(), 0);
    }
}
