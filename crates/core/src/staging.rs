use crate::attributes::{AttributeKind, AttributeSet};
use std::ops::Range;

/// CPU-side float array accumulating one attribute of a draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct StagingBuffer {
    kind: AttributeKind,
    data: Vec<f32>,
    resize_count: usize,
}

impl StagingBuffer {
    pub fn new(kind: AttributeKind, resize_count: usize) -> Self {
        Self {
            kind,
            data: Vec::with_capacity(resize_count * kind.components()),
            resize_count,
        }
    }

    pub fn from_data(kind: AttributeKind, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len() % kind.components(), 0);
        Self {
            kind,
            data,
            resize_count: 0,
        }
    }

    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub fn components(&self) -> usize {
        self.kind.components()
    }

    pub fn vertex_count(&self) -> usize {
        self.data.len() / self.components()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Vertices that fit without reallocating.
    pub fn capacity(&self) -> usize {
        self.data.capacity() / self.components()
    }

    pub fn push(&mut self, components: &[f32]) {
        debug_assert_eq!(components.len(), self.components());
        self.ensure_capacity();
        self.data.extend_from_slice(components);
    }

    pub fn reserve(&mut self, vertices: usize) {
        self.data.reserve(vertices * self.components());
    }

    pub fn vertex(&self, index: usize) -> &[f32] {
        &self.data[self.range(index)]
    }

    pub fn vertex_mut(&mut self, index: usize) -> &mut [f32] {
        let range = self.range(index);
        &mut self.data[range]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    fn range(&self, index: usize) -> Range<usize> {
        let components = self.components();
        index * components..(index + 1) * components
    }

    /// Grows by at least `resize_count` vertices, amortized over the current size.
    fn ensure_capacity(&mut self) {
        if self.data.len() == self.data.capacity() && self.resize_count > 0 {
            self.data.reserve(self.resize_count * self.components());
        }
    }
}

/// One staging buffer per attribute kind; all of them hold the same vertex count.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeStreams {
    buffers: [StagingBuffer; AttributeKind::COUNT],
}

impl AttributeStreams {
    pub fn new(resize_count: usize) -> Self {
        Self {
            buffers: AttributeKind::ALL.map(|kind| StagingBuffer::new(kind, resize_count)),
        }
    }

    /// Builds streams from already converted buffers.
    pub fn from_buffers(buffers: [StagingBuffer; AttributeKind::COUNT]) -> Self {
        debug_assert!(
            AttributeKind::ALL
                .iter()
                .all(|kind| buffers[kind.index()].kind() == *kind)
        );
        let result = Self { buffers };
        debug_assert!(result.is_consistent());
        result
    }

    /// Appends a snapshot of the current attribute values as a new vertex.
    pub fn push_vertex(&mut self, attributes: &AttributeSet) -> usize {
        let index = self.vertex_count();
        for buffer in &mut self.buffers {
            buffer.push(attributes.components(buffer.kind()));
        }
        index
    }

    pub fn vertex_count(&self) -> usize {
        self.buffers[AttributeKind::Position.index()].vertex_count()
    }

    pub fn get(&self, kind: AttributeKind) -> &StagingBuffer {
        &self.buffers[kind.index()]
    }

    pub fn get_mut(&mut self, kind: AttributeKind) -> &mut StagingBuffer {
        &mut self.buffers[kind.index()]
    }

    /// Positions read only, normals writable.
    pub fn positions_and_normals_mut(&mut self) -> (&StagingBuffer, &mut StagingBuffer) {
        let [position, normal, _, _] = &mut self.buffers;
        (position, normal)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StagingBuffer> {
        self.buffers.iter()
    }

    pub fn map(self, f: impl FnMut(StagingBuffer) -> StagingBuffer) -> Self {
        Self::from_buffers(self.buffers.map(f))
    }

    pub fn is_consistent(&self) -> bool {
        let count = self.vertex_count();
        self.buffers
            .iter()
            .all(|buffer| buffer.vertex_count() == count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_buffer() {
        let mut buffer = StagingBuffer::new(AttributeKind::TexCoord, 2);
        assert!(buffer.is_empty());
        buffer.push(&[0.0, 1.0]);
        buffer.push(&[2.0, 3.0]);
        buffer.push(&[4.0, 5.0]);
        assert_eq!(buffer.vertex_count(), 3);
        assert_eq!(buffer.vertex(1), &[2.0, 3.0]);
        buffer.vertex_mut(2)[0] = 6.0;
        assert_eq!(buffer.data(), &[0.0, 1.0, 2.0, 3.0, 6.0, 5.0]);
    }

    #[test]
    fn test_staging_buffer_growth_is_amortized() {
        let mut buffer = StagingBuffer::new(AttributeKind::Position, 1);
        assert!(buffer.capacity() >= 1);
        let mut capacity = buffer.capacity();
        let mut growths = 0;
        for index in 0..256 {
            buffer.push(&[index as f32, 0.0, 0.0]);
            if buffer.capacity() != capacity {
                assert!(buffer.capacity() >= capacity * 2);
                capacity = buffer.capacity();
                growths += 1;
            }
        }
        assert_eq!(buffer.vertex_count(), 256);
        assert!(growths <= 12, "{growths} reallocations");
    }

    #[test]
    fn test_attribute_streams_stay_consistent() {
        let mut streams = AttributeStreams::new(16);
        let mut attributes = AttributeSet::default();
        attributes.color(1.0, 0.0, 0.0, 1.0);
        attributes.position(1.0, 2.0, 3.0);
        assert_eq!(streams.push_vertex(&attributes), 0);
        attributes.position(4.0, 5.0, 6.0);
        assert_eq!(streams.push_vertex(&attributes), 1);

        assert_eq!(streams.vertex_count(), 2);
        assert!(streams.is_consistent());
        for kind in AttributeKind::ALL {
            assert_eq!(streams.get(kind).data().len(), 2 * kind.components());
        }
        assert_eq!(
            streams.get(AttributeKind::Position).data(),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
        assert_eq!(
            streams.get(AttributeKind::Color).vertex(1),
            &[1.0, 0.0, 0.0, 1.0]
        );
    }
}
