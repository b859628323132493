//! Draw-time vertex checks shared by both devices.
//!
//! Everything wgpu would reject while building the pipeline or binding vertex
//! buffers is caught here first and reported as a [`DeviceError`].

use super::pipeline;
use super::wgsl::StageIo;
use super::{DeviceError, NumericKind, VertexAttribLayout};

/// Granularity wgpu requires of vertex buffer offsets and strides.
const ALIGNMENT: u64 = 4;

/// Vertex limits of a device.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct VertexLimits {
    /// Vertex buffer slots per pipeline; each enabled attribute uses one.
    pub max_slots: u32,
    pub max_attributes: u32,
    pub max_stride: u32,
}

impl VertexLimits {
    pub fn from_limits(limits: &wgpu::Limits) -> Self {
        Self {
            max_slots: limits.max_vertex_buffers,
            max_attributes: limits.max_vertex_attributes,
            max_stride: limits.max_vertex_buffer_array_stride,
        }
    }
}

impl Default for VertexLimits {
    /// The limits `Gpu` requests from every adapter.
    fn default() -> Self {
        Self::from_limits(&wgpu::Limits::downlevel_defaults())
    }
}

/// Checks one enabled attribute for a draw of vertices `first..first + count`
/// from a buffer holding `available` bytes. Returns the wgpu vertex format.
pub(crate) fn check_attribute(
    layout: &VertexAttribLayout,
    available: u64,
    first: u32,
    count: u32,
    limits: &VertexLimits,
) -> Result<wgpu::VertexFormat, DeviceError> {
    let index = layout.index;
    if index >= limits.max_attributes {
        return Err(DeviceError::AttributeIndexOutOfRange {
            index,
            max: limits.max_attributes,
        });
    }

    let format = pipeline::vertex_format(layout)?;

    let stride = layout.effective_stride();
    if layout.stride < 0
        || layout.offset < 0
        || stride % ALIGNMENT != 0
        || layout.offset as u64 % ALIGNMENT != 0
    {
        let reported = if layout.stride == 0 {
            stride as i64
        } else {
            i64::from(layout.stride)
        };
        return Err(DeviceError::MisalignedAttribute {
            index,
            stride: reported,
            offset: layout.offset,
        });
    }

    let element = format.size();
    if stride < element || stride > u64::from(limits.max_stride) {
        return Err(DeviceError::InvalidStride {
            index,
            stride,
            min: element,
            max: limits.max_stride,
        });
    }

    let required = layout.bytes_needed(first, count);
    if required > available {
        return Err(DeviceError::AttributeOutOfRange {
            index,
            required,
            available,
        });
    }

    Ok(format)
}

/// Checks the enabled attributes, as `(index, kind)`, against what the vertex
/// shader reads. Attributes the shader ignores are allowed.
pub(crate) fn check_shader_inputs(
    inputs: &[StageIo],
    attributes: &[(u32, NumericKind)],
    limits: &VertexLimits,
) -> Result<(), DeviceError> {
    let max = limits.max_slots.min(limits.max_attributes);
    if attributes.len() > max as usize {
        return Err(DeviceError::TooManyAttributes {
            enabled: attributes.len(),
            max,
        });
    }

    for input in inputs {
        let Some(&(_, kind)) = attributes.iter().find(|(i, _)| *i == input.location) else {
            return Err(DeviceError::UnboundShaderInput(input.location));
        };
        if kind != input.kind {
            return Err(DeviceError::VertexInputMismatch {
                location: input.location,
                shader: input.kind,
                attribute: kind,
            });
        }
    }
    Ok(())
}
