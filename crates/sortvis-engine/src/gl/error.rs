use crate::device::{DeviceError, ShaderStage};

/// Errors reported by the `gl` object layer.
#[derive(Debug, thiserror::Error)]
pub enum GlError {
    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    #[error("program failed to link: {log}")]
    ProgramLink { log: String },

    #[error("program is not linked")]
    ProgramNotLinked,

    #[error("vertex component count must be 1..=4, got {0}")]
    InvalidComponentCount(u8),

    #[error("buffer index {index} out of range ({len} attached)")]
    BufferIndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Device(#[from] DeviceError),
}
