use crate::{
    attributes::AttributeKind,
    config::AttributeLocations,
    staging::AttributeStreams,
    topology::Topology,
};

/// Expected access pattern of an uploaded buffer.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum BufferUsage {
    #[default]
    Static,
    Dynamic,
    Stream,
}

/// Device-resident float buffer. Releasing the underlying resource is the job of `Drop`.
pub trait DeviceBuffer {
    /// Number of floats stored.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_mapped(&self) -> bool;

    /// Host view of the buffer contents while it is mapped.
    fn mapped_mut(&mut self) -> Option<&mut [f32]>;
}

/// Buffer bound to a shader attribute location.
pub struct AttributeBinding<'a, B> {
    pub kind: AttributeKind,
    pub location: u32,
    pub buffer: &'a B,
}

/// Rasterizer collaborator the draw batch records into.
pub trait DrawBackend {
    type Buffer: DeviceBuffer;
    type Layout;
    type Error;

    fn supports_topology(&self, topology: Topology) -> bool;

    fn create_buffer(
        &mut self,
        data: &[f32],
        usage: BufferUsage,
    ) -> Result<Self::Buffer, Self::Error>;

    fn create_layout(
        &mut self,
        bindings: &[AttributeBinding<'_, Self::Buffer>],
    ) -> Result<Self::Layout, Self::Error>;

    fn map_buffer(&mut self, buffer: &mut Self::Buffer) -> Result<(), Self::Error>;

    fn unmap_buffer(&mut self, buffer: &mut Self::Buffer) -> Result<(), Self::Error>;

    /// Called once before a sequence of `draw_arrays`.
    fn begin_draw(&mut self) -> Result<(), Self::Error>;

    fn draw_arrays(
        &mut self,
        layout: &Self::Layout,
        topology: Topology,
        vertices: usize,
    ) -> Result<(), Self::Error>;

    fn end_draw(&mut self) -> Result<(), Self::Error>;
}

/// Device buffers of a single draw call, one per attribute kind, plus their layout.
pub struct DeviceBufferPool<B: DrawBackend> {
    // layout references the buffers, so it goes first
    layout: B::Layout,
    buffers: Vec<B::Buffer>,
    vertex_count: usize,
}

impl<B: DrawBackend> DeviceBufferPool<B> {
    /// Creates fresh buffers sized to the staged vertex count and records their layout.
    pub fn upload(
        backend: &mut B,
        streams: &AttributeStreams,
        usage: BufferUsage,
        locations: &AttributeLocations,
    ) -> Result<Self, B::Error> {
        let buffers = streams
            .iter()
            .map(|staging| backend.create_buffer(staging.data(), usage))
            .collect::<Result<Vec<_>, _>>()?;
        let bindings = AttributeKind::ALL
            .iter()
            .filter_map(|kind| {
                locations.get(*kind).map(|location| AttributeBinding {
                    kind: *kind,
                    location,
                    buffer: &buffers[kind.index()],
                })
            })
            .collect::<Vec<_>>();
        let layout = backend.create_layout(&bindings)?;
        drop(bindings);
        Ok(Self {
            layout,
            buffers,
            vertex_count: streams.vertex_count(),
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn layout(&self) -> &B::Layout {
        &self.layout
    }

    pub fn buffer(&self, kind: AttributeKind) -> &B::Buffer {
        &self.buffers[kind.index()]
    }

    pub fn buffer_mut(&mut self, kind: AttributeKind) -> &mut B::Buffer {
        &mut self.buffers[kind.index()]
    }

    pub fn is_mapped(&self) -> bool {
        self.buffers.iter().any(|buffer| buffer.is_mapped())
    }

    /// Maps every buffer for read-write access. Empty pools have nothing to map.
    pub fn map(&mut self, backend: &mut B) -> Result<(), B::Error> {
        if self.vertex_count == 0 {
            return Ok(());
        }
        for buffer in &mut self.buffers {
            if !buffer.is_mapped() {
                backend.map_buffer(buffer)?;
            }
        }
        Ok(())
    }

    pub fn unmap(&mut self, backend: &mut B) -> Result<(), B::Error> {
        let mut result = Ok(());
        for buffer in &mut self.buffers {
            if buffer.is_mapped() {
                let status = backend.unmap_buffer(buffer);
                if result.is_ok() {
                    result = status;
                }
            }
        }
        result
    }

    /// Writes one vertex of `kind` into mapped memory.
    ///
    /// # Panics
    /// When the buffer is not mapped or `vertex` is out of range.
    pub fn write(&mut self, kind: AttributeKind, vertex: usize, values: &[f32]) {
        let components = kind.components();
        assert!(
            vertex < self.vertex_count,
            "Vertex {vertex} is out of range of {} vertices",
            self.vertex_count
        );
        let mapped = self.buffers[kind.index()]
            .mapped_mut()
            .unwrap_or_else(|| panic!("{kind:?} buffer is not mapped"));
        mapped[vertex * components..(vertex + 1) * components]
            .copy_from_slice(&values[..components]);
    }
}
