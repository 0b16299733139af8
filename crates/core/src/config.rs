use crate::{attributes::AttributeKind, device::BufferUsage, normals::ProvokingVertex};

/// Shader attribute location of every attribute kind. Kinds without a location are left out of
/// the recorded layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttributeLocations([Option<u32>; AttributeKind::COUNT]);

impl Default for AttributeLocations {
    fn default() -> Self {
        Self([Some(0), Some(1), Some(2), Some(3)])
    }
}

impl AttributeLocations {
    pub fn none() -> Self {
        Self([None; AttributeKind::COUNT])
    }

    pub fn get(&self, kind: AttributeKind) -> Option<u32> {
        self.0[kind.index()]
    }

    pub fn set(&mut self, kind: AttributeKind, location: Option<u32>) {
        self.0[kind.index()] = location;
    }

    pub fn with(mut self, kind: AttributeKind, location: Option<u32>) -> Self {
        self.set(kind, location);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawBatchConfig {
    pub provoking_vertex: ProvokingVertex,
    pub auto_flat_normals: bool,
    /// Synthesize flat normals over the recorded topology instead of the converted one.
    pub normals_before_conversion: bool,
    pub auto_normalize: bool,
    pub buffer_usage: BufferUsage,
    pub attribute_locations: AttributeLocations,
    /// Vertices staging buffers grow by when full.
    pub reserve_vertices: usize,
}

impl Default for DrawBatchConfig {
    fn default() -> Self {
        Self {
            provoking_vertex: ProvokingVertex::Last,
            auto_flat_normals: false,
            normals_before_conversion: false,
            auto_normalize: false,
            buffer_usage: BufferUsage::Static,
            attribute_locations: Default::default(),
            reserve_vertices: 128,
        }
    }
}

impl DrawBatchConfig {
    pub fn provoking_vertex(mut self, v: ProvokingVertex) -> Self {
        self.provoking_vertex = v;
        self
    }

    pub fn auto_flat_normals(mut self, v: bool) -> Self {
        self.auto_flat_normals = v;
        self
    }

    pub fn normals_before_conversion(mut self, v: bool) -> Self {
        self.normals_before_conversion = v;
        self
    }

    pub fn auto_normalize(mut self, v: bool) -> Self {
        self.auto_normalize = v;
        self
    }

    pub fn buffer_usage(mut self, v: BufferUsage) -> Self {
        self.buffer_usage = v;
        self
    }

    pub fn attribute_locations(mut self, v: AttributeLocations) -> Self {
        self.attribute_locations = v;
        self
    }

    pub fn attribute_location(mut self, kind: AttributeKind, v: Option<u32>) -> Self {
        self.attribute_locations.set(kind, v);
        self
    }

    pub fn reserve_vertices(mut self, v: usize) -> Self {
        self.reserve_vertices = v;
        self
    }
}
