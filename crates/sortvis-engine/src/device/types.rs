/// Opaque shader object handle issued by a [`GraphicsDevice`](super::GraphicsDevice).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ShaderId(pub(crate) u32);

/// Opaque program object handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ProgramId(pub(crate) u32);

/// Opaque buffer object handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BufferId(pub(crate) u32);

/// Monotonic handle allocator shared by device implementations.
///
/// Handles start at 1 and are never reused within a device's lifetime.
#[derive(Debug, Default)]
pub(crate) struct HandleAlloc {
    next: u32,
}

impl HandleAlloc {
    pub(crate) fn next(&mut self) -> Option<u32> {
        self.next = self.next.checked_add(1)?;
        Some(self.next)
    }
}

/// Pipeline stage a shader object is compiled for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Component type of a vertex attribute as stored in the bound buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum DataType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    #[default]
    Float,
}

impl DataType {
    /// Size of one component in bytes.
    pub const fn byte_size(self) -> u32 {
        match self {
            DataType::Byte | DataType::UnsignedByte => 1,
            DataType::Short | DataType::UnsignedShort => 2,
            DataType::Int | DataType::UnsignedInt | DataType::Float => 4,
        }
    }
}

/// Numeric class a shader sees a vertex attribute or stage variable as.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum NumericKind {
    Float,
    Sint,
    Uint,
}

/// Primitive assembly mode for a draw call.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum DrawMode {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

/// Usage hint passed along with a buffer upload.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum BufferUsage {
    /// Contents are written once (or rarely) and drawn many times.
    #[default]
    StaticDraw,
    /// Contents change frequently.
    DynamicDraw,
    /// Contents are written once and drawn a few times.
    StreamDraw,
}

/// Layout of one vertex attribute slot.
///
/// `stride == 0` means tightly packed (`size * data_type.byte_size()`).
/// `offset` is the byte offset of the first component inside the bound buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexAttribLayout {
    pub index: u32,
    pub size: u8,
    pub data_type: DataType,
    pub normalized: bool,
    pub stride: i32,
    pub offset: i32,
}

impl VertexAttribLayout {
    /// Effective distance between consecutive vertices in bytes.
    pub fn effective_stride(&self) -> u64 {
        if self.stride > 0 {
            self.stride as u64
        } else {
            u64::from(self.size) * u64::from(self.data_type.byte_size())
        }
    }

    /// How a shader reads this attribute. Float and normalized data arrive as `f32`.
    pub fn numeric_kind(&self) -> NumericKind {
        match self.data_type {
            DataType::Float => NumericKind::Float,
            _ if self.normalized => NumericKind::Float,
            DataType::Byte | DataType::Short | DataType::Int => NumericKind::Sint,
            DataType::UnsignedByte | DataType::UnsignedShort | DataType::UnsignedInt => {
                NumericKind::Uint
            }
        }
    }

    /// Bytes of the bound buffer read when drawing vertices `first..first + count`.
    pub fn bytes_needed(&self, first: u32, count: u32) -> u64 {
        if count == 0 {
            return 0;
        }
        let last = u64::from(first) + u64::from(count) - 1;
        let element = u64::from(self.size) * u64::from(self.data_type.byte_size());
        self.offset.max(0) as u64 + last * self.effective_stride() + element
    }
}

/// Viewport rectangle in physical pixels.
///
/// GL convention: `(x, y)` is the lower-left corner of the rectangle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct ViewportRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ViewportRect {
    #[inline]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle covering a whole surface of the given size.
    #[inline]
    pub const fn full(size: (u32, u32)) -> Self {
        Self::new(0, 0, size.0, size.1)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}
