//! Translation of GL-style draw state into wgpu render pipelines.

use super::{DataType, DeviceError, DrawMode, ProgramId, VertexAttribLayout};

/// One vertex buffer slot: a single attribute read from its own buffer.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub(super) struct VertexSlot {
    pub location: u32,
    pub stride: u64,
    pub format: wgpu::VertexFormat,
}

/// Everything a render pipeline depends on; the pipeline cache is keyed by it.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub(super) struct PipelineKey {
    pub program: ProgramId,
    pub topology: wgpu::PrimitiveTopology,
    pub target: wgpu::TextureFormat,
    pub slots: Vec<VertexSlot>,
}

/// Shader stages of a linked program.
pub(super) struct LinkedModules {
    pub vertex: (wgpu::ShaderModule, String),
    pub fragment: (wgpu::ShaderModule, String),
}

pub(super) fn topology(mode: DrawMode) -> wgpu::PrimitiveTopology {
    match mode {
        DrawMode::Points => wgpu::PrimitiveTopology::PointList,
        DrawMode::Lines => wgpu::PrimitiveTopology::LineList,
        DrawMode::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        DrawMode::Triangles => wgpu::PrimitiveTopology::TriangleList,
        DrawMode::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

/// Maps a GL attribute description onto a wgpu vertex format.
///
/// Float attributes ignore `normalized`, as in GL. Integer attributes without
/// normalization are exposed to WGSL as integer vectors.
pub(super) fn vertex_format(layout: &VertexAttribLayout) -> Result<wgpu::VertexFormat, DeviceError> {
    use wgpu::VertexFormat as F;

    let format = match (layout.data_type, layout.size, layout.normalized) {
        (DataType::Float, 1, _) => Some(F::Float32),
        (DataType::Float, 2, _) => Some(F::Float32x2),
        (DataType::Float, 3, _) => Some(F::Float32x3),
        (DataType::Float, 4, _) => Some(F::Float32x4),

        (DataType::UnsignedByte, 2, true) => Some(F::Unorm8x2),
        (DataType::UnsignedByte, 4, true) => Some(F::Unorm8x4),
        (DataType::UnsignedByte, 2, false) => Some(F::Uint8x2),
        (DataType::UnsignedByte, 4, false) => Some(F::Uint8x4),
        (DataType::Byte, 2, true) => Some(F::Snorm8x2),
        (DataType::Byte, 4, true) => Some(F::Snorm8x4),
        (DataType::Byte, 2, false) => Some(F::Sint8x2),
        (DataType::Byte, 4, false) => Some(F::Sint8x4),

        (DataType::UnsignedShort, 2, true) => Some(F::Unorm16x2),
        (DataType::UnsignedShort, 4, true) => Some(F::Unorm16x4),
        (DataType::UnsignedShort, 2, false) => Some(F::Uint16x2),
        (DataType::UnsignedShort, 4, false) => Some(F::Uint16x4),
        (DataType::Short, 2, true) => Some(F::Snorm16x2),
        (DataType::Short, 4, true) => Some(F::Snorm16x4),
        (DataType::Short, 2, false) => Some(F::Sint16x2),
        (DataType::Short, 4, false) => Some(F::Sint16x4),

        (DataType::UnsignedInt, 1, false) => Some(F::Uint32),
        (DataType::UnsignedInt, 2, false) => Some(F::Uint32x2),
        (DataType::UnsignedInt, 3, false) => Some(F::Uint32x3),
        (DataType::UnsignedInt, 4, false) => Some(F::Uint32x4),
        (DataType::Int, 1, false) => Some(F::Sint32),
        (DataType::Int, 2, false) => Some(F::Sint32x2),
        (DataType::Int, 3, false) => Some(F::Sint32x3),
        (DataType::Int, 4, false) => Some(F::Sint32x4),

        _ => None,
    };

    format.ok_or(DeviceError::UnsupportedVertexFormat {
        size: layout.size,
        data_type: layout.data_type,
        normalized: layout.normalized,
    })
}

/// Straight (non-premultiplied) alpha blending, matching the default GL setup
/// of `blendFunc(SRC_ALPHA, ONE_MINUS_SRC_ALPHA)`.
fn alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

pub(super) fn create_pipeline(
    device: &wgpu::Device,
    key: &PipelineKey,
    modules: &LinkedModules,
) -> wgpu::RenderPipeline {
    let attributes: Vec<[wgpu::VertexAttribute; 1]> = key
        .slots
        .iter()
        .map(|slot| {
            [wgpu::VertexAttribute {
                format: slot.format,
                offset: 0,
                shader_location: slot.location,
            }]
        })
        .collect();

    let buffers: Vec<wgpu::VertexBufferLayout<'_>> = key
        .slots
        .iter()
        .zip(&attributes)
        .map(|(slot, attrs)| wgpu::VertexBufferLayout {
            array_stride: slot.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: attrs,
        })
        .collect();

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("sortvis pipeline layout"),
        bind_group_layouts: &[],
        immediate_size: 0,
    });

    let (vs, vs_entry) = &modules.vertex;
    let (fs, fs_entry) = &modules.fragment;

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("sortvis program pipeline"),
        layout: Some(&layout),

        vertex: wgpu::VertexState {
            module: vs,
            entry_point: Some(vs_entry.as_str()),
            compilation_options: Default::default(),
            buffers: &buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: fs,
            entry_point: Some(fs_entry.as_str()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: key.target,
                blend: Some(alpha_blend()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: key.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
