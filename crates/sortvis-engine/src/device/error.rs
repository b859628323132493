use super::{DataType, NumericKind};

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

/// Failures reported by a [`GraphicsDevice`](super::GraphicsDevice).
///
/// GL-style calls that cannot fail on a real driver (binding, attribute setup,
/// viewport) do not return this type; object creation and draw calls do.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("failed to create {0} object")]
    ObjectCreation(&'static str),

    #[error("draw issued without a linked program in use")]
    NoProgramBound,

    #[error("vertex format {size} x {data_type:?} (normalized: {normalized}) is not supported")]
    UnsupportedVertexFormat {
        size: u8,
        data_type: DataType,
        normalized: bool,
    },

    #[error("vertex attribute {index} reads {required} bytes but its buffer holds {available}")]
    AttributeOutOfRange {
        index: u32,
        required: u64,
        available: u64,
    },

    #[error("vertex attribute {0} is enabled but has no buffer bound")]
    MissingAttributeBuffer(u32),

    #[error("vertex attribute index {index} exceeds the device limit of {max}")]
    AttributeIndexOutOfRange { index: u32, max: u32 },

    #[error("{enabled} vertex attributes enabled; the device draws from at most {max}")]
    TooManyAttributes { enabled: usize, max: u32 },

    #[error("vertex attribute {index}: stride {stride} and offset {offset} must be non-negative multiples of 4")]
    MisalignedAttribute { index: u32, stride: i64, offset: i32 },

    #[error("vertex attribute {index}: stride {stride} outside {min}..={max}")]
    InvalidStride { index: u32, stride: u64, min: u64, max: u32 },

    #[error("vertex shader reads @location({0}) but no attribute is enabled there")]
    UnboundShaderInput(u32),

    #[error("vertex shader reads @location({location}) as {shader:?} but the attribute provides {attribute:?}")]
    VertexInputMismatch {
        location: u32,
        shader: NumericKind,
        attribute: NumericKind,
    },

    #[error("surface unavailable ({0:?})")]
    Surface(SurfaceErrorAction),
}
