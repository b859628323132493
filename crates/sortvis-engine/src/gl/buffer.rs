use crate::device::{BufferId, BufferUsage, DataType, GraphicsDevice, VertexAttribLayout};

use super::GlError;

/// Attribute layout for a [`VertexBuffer`].
///
/// Every field has a real default; zero is a valid index/stride/offset, never "unset".
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VertexBufferConfig {
    /// Attribute slot. Index 0 drives the renderer's vertex count.
    pub index: u32,
    /// Components per vertex, 1..=4.
    pub size: u8,
    pub data_type: DataType,
    pub normalized: bool,
    /// Bytes between consecutive vertices; 0 means tightly packed.
    pub stride: i32,
    /// Byte offset of the first component.
    pub offset: i32,
}

impl Default for VertexBufferConfig {
    fn default() -> Self {
        Self {
            index: 0,
            size: 3,
            data_type: DataType::Float,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }
}

/// Values that can be appended to a [`VertexBuffer`].
///
/// Implemented for `f32` and, recursively, for arrays, slices and vectors of
/// anything appendable, so nested sequences flatten in order.
pub trait VertexData {
    fn append_to(&self, out: &mut Vec<f32>);
}

impl VertexData for f32 {
    fn append_to(&self, out: &mut Vec<f32>) {
        out.push(*self);
    }
}

impl<T: VertexData> VertexData for [T] {
    fn append_to(&self, out: &mut Vec<f32>) {
        for v in self {
            v.append_to(out);
        }
    }
}

impl<T: VertexData, const N: usize> VertexData for [T; N] {
    fn append_to(&self, out: &mut Vec<f32>) {
        self.as_slice().append_to(out);
    }
}

impl<T: VertexData> VertexData for Vec<T> {
    fn append_to(&self, out: &mut Vec<f32>) {
        self.as_slice().append_to(out);
    }
}

impl<T: VertexData + ?Sized> VertexData for &T {
    fn append_to(&self, out: &mut Vec<f32>) {
        (**self).append_to(out);
    }
}

/// A growable `f32` sequence bound to one vertex attribute slot.
///
/// Contents are re-uploaded on every [`render`](Self::render); there is no
/// dirty tracking.
#[derive(Debug)]
pub struct VertexBuffer {
    layout: VertexAttribLayout,
    id: Option<BufferId>,
    values: Vec<f32>,
}

impl VertexBuffer {
    pub fn new<D: GraphicsDevice>(
        device: &mut D,
        config: VertexBufferConfig,
    ) -> Result<Self, GlError> {
        if !(1..=4).contains(&config.size) {
            return Err(GlError::InvalidComponentCount(config.size));
        }

        let id = device.create_buffer()?;
        log::debug!("vertex buffer {id:?} created for attribute {}", config.index);

        Ok(Self {
            layout: VertexAttribLayout {
                index: config.index,
                size: config.size,
                data_type: config.data_type,
                normalized: config.normalized,
                stride: config.stride,
                offset: config.offset,
            },
            id: Some(id),
            values: Vec::new(),
        })
    }

    pub fn layout(&self) -> VertexAttribLayout {
        self.layout
    }

    pub fn index(&self) -> u32 {
        self.layout.index
    }

    /// Components per vertex.
    pub fn size(&self) -> u8 {
        self.layout.size
    }

    pub fn id(&self) -> Option<BufferId> {
        self.id
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Replaces the whole sequence.
    pub fn set_values(&mut self, values: Vec<f32>) {
        self.values = values;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whole vertices held: `len / size`, remainder dropped.
    pub fn vertex_count(&self) -> usize {
        self.values.len() / usize::from(self.layout.size)
    }

    /// Empties the sequence. The native buffer is kept.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Appends a scalar or a (possibly nested) sequence, flattened in order.
    pub fn push<T: VertexData + ?Sized>(&mut self, data: &T) {
        data.append_to(&mut self.values);
    }

    /// Removes up to `n` trailing values; returns how many were removed.
    pub fn pop(&mut self, n: usize) -> usize {
        let removed = n.min(self.values.len());
        self.values.truncate(self.values.len() - removed);
        removed
    }

    pub fn pop_one(&mut self) -> Option<f32> {
        self.values.pop()
    }

    /// Drops the native buffer and creates a fresh one; values are kept.
    pub fn realloc<D: GraphicsDevice>(&mut self, device: &mut D) -> Result<(), GlError> {
        if let Some(old) = self.id.take() {
            device.delete_buffer(old);
        }
        let id = device.create_buffer()?;
        log::debug!("vertex buffer reallocated as {id:?}");
        self.id = Some(id);
        Ok(())
    }

    /// Enables the attribute, uploads the values and describes the layout.
    ///
    /// Overwrites the device's array-buffer binding.
    pub fn render<D: GraphicsDevice>(&self, device: &mut D) {
        let Some(id) = self.id else {
            log::warn!("vertex buffer for attribute {} has no native buffer", self.layout.index);
            return;
        };

        device.enable_vertex_attrib_array(self.layout.index);
        device.bind_array_buffer(Some(id));
        device.buffer_data(bytemuck::cast_slice(&self.values), BufferUsage::StaticDraw);
        device.vertex_attrib_pointer(self.layout);
    }

    /// Deletes the native buffer.
    pub fn release<D: GraphicsDevice>(mut self, device: &mut D) {
        if let Some(id) = self.id.take() {
            device.delete_buffer(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCall, RecordingDevice};

    fn buffer(dev: &mut RecordingDevice) -> VertexBuffer {
        VertexBuffer::new(dev, VertexBufferConfig::default()).unwrap()
    }

    // ── config ────────────────────────────────────────────────────────────

    #[test]
    fn defaults_match_float_vec3_at_index_zero() {
        let mut dev = RecordingDevice::new(8, 8);
        let b = buffer(&mut dev);
        let l = b.layout();
        assert_eq!((l.index, l.size, l.data_type), (0, 3, DataType::Float));
        assert_eq!((l.normalized, l.stride, l.offset), (false, 0, 0));
    }

    #[test]
    fn explicit_zero_is_kept() {
        let mut dev = RecordingDevice::new(8, 8);
        let config = VertexBufferConfig {
            index: 0,
            size: 2,
            ..Default::default()
        };
        let b = VertexBuffer::new(&mut dev, config).unwrap();
        assert_eq!(b.index(), 0);
        assert_eq!(b.size(), 2);
    }

    #[test]
    fn component_count_is_validated() {
        let mut dev = RecordingDevice::new(8, 8);
        for size in [0, 5] {
            let config = VertexBufferConfig { size, ..Default::default() };
            let err = VertexBuffer::new(&mut dev, config).unwrap_err();
            assert!(matches!(err, GlError::InvalidComponentCount(s) if s == size));
        }
        assert_eq!(dev.live_buffers(), 0);
    }

    // ── push / pop / clear ────────────────────────────────────────────────

    #[test]
    fn push_flattens_in_call_order() {
        let mut dev = RecordingDevice::new(8, 8);
        let mut b = buffer(&mut dev);

        b.push(&1.0f32);
        b.push(&[2.0f32, 3.0]);
        b.push(&vec![[4.0f32, 5.0], [6.0, 7.0]]);
        b.push(&[8.0f32][..]);

        assert_eq!(b.values(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn pop_removes_min_of_n_and_len() {
        let mut dev = RecordingDevice::new(8, 8);
        let mut b = buffer(&mut dev);
        b.push(&[1.0f32, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(b.pop(2), 2);
        assert_eq!(b.values(), &[1.0, 2.0, 3.0]);

        assert_eq!(b.pop(10), 3);
        assert!(b.is_empty());

        assert_eq!(b.pop(1), 0);
    }

    #[test]
    fn pop_one_returns_last_value() {
        let mut dev = RecordingDevice::new(8, 8);
        let mut b = buffer(&mut dev);
        b.push(&[1.0f32, 2.0]);
        assert_eq!(b.pop_one(), Some(2.0));
        assert_eq!(b.values(), &[1.0]);
    }

    #[test]
    fn clear_keeps_native_buffer() {
        let mut dev = RecordingDevice::new(8, 8);
        let mut b = buffer(&mut dev);
        let id = b.id();
        b.push(&[1.0f32, 2.0, 3.0]);

        b.clear();
        assert!(b.is_empty());
        assert_eq!(b.id(), id);
        assert_eq!(b.vertex_count(), 0);
    }

    #[test]
    fn vertex_count_drops_partial_vertex() {
        let mut dev = RecordingDevice::new(8, 8);
        let mut b = buffer(&mut dev);
        b.push(&[0.0f32; 10]);
        assert_eq!(b.vertex_count(), 3);
    }

    // ── device interaction ────────────────────────────────────────────────

    #[test]
    fn render_uploads_then_describes_layout() {
        let mut dev = RecordingDevice::new(8, 8);
        let mut b = buffer(&mut dev);
        b.push(&[1.0f32, 2.0, 3.0]);
        let id = b.id().unwrap();
        dev.take_calls();

        b.render(&mut dev);

        let bytes: Vec<u8> = bytemuck::cast_slice(&[1.0f32, 2.0, 3.0]).to_vec();
        assert_eq!(
            dev.calls(),
            &[
                DeviceCall::EnableVertexAttribArray(0),
                DeviceCall::BindArrayBuffer(Some(id)),
                DeviceCall::BufferData(Some(id), bytes, BufferUsage::StaticDraw),
                DeviceCall::VertexAttribPointer(b.layout()),
            ]
        );
    }

    #[test]
    fn cleared_buffer_uploads_nothing() {
        let mut dev = RecordingDevice::new(8, 8);
        let mut b = buffer(&mut dev);
        b.push(&[1.0f32, 2.0, 3.0]);
        b.render(&mut dev);

        b.clear();
        b.render(&mut dev);
        assert_eq!(dev.buffer_contents(b.id().unwrap()), Some(&[][..]));
    }

    #[test]
    fn realloc_swaps_handle_and_keeps_values() {
        let mut dev = RecordingDevice::new(8, 8);
        let mut b = buffer(&mut dev);
        b.push(&[1.0f32, 2.0, 3.0]);
        let old = b.id().unwrap();

        b.realloc(&mut dev).unwrap();

        assert_ne!(b.id(), Some(old));
        assert_eq!(b.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(dev.live_buffers(), 1);
        assert!(dev.buffer_contents(old).is_none());
    }

    #[test]
    fn release_deletes_native_buffer() {
        let mut dev = RecordingDevice::new(8, 8);
        let b = buffer(&mut dev);
        b.release(&mut dev);
        assert_eq!(dev.live_buffers(), 0);
    }
}
