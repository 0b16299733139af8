/// Primitive draw mode describing how a vertex sequence forms faces.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topology {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    Triangles,
    TriangleStrip,
    TriangleFan,
    Quads,
    QuadStrip,
}

impl Topology {
    pub const COUNT: usize = 9;
    pub const ALL: [Self; Self::COUNT] = [
        Self::Points,
        Self::Lines,
        Self::LineStrip,
        Self::LineLoop,
        Self::Triangles,
        Self::TriangleStrip,
        Self::TriangleFan,
        Self::Quads,
        Self::QuadStrip,
    ];

    /// Ordinal used to index per-topology tables.
    pub fn index(self) -> usize {
        match self {
            Self::Points => 0,
            Self::Lines => 1,
            Self::LineStrip => 2,
            Self::LineLoop => 3,
            Self::Triangles => 4,
            Self::TriangleStrip => 5,
            Self::TriangleFan => 6,
            Self::Quads => 7,
            Self::QuadStrip => 8,
        }
    }

    /// Topologies that only exist in legacy pipelines.
    pub fn is_legacy(self) -> bool {
        matches!(self, Self::Quads | Self::QuadStrip)
    }

    /// Supported equivalent a legacy topology is rewritten into.
    pub fn converted(self) -> Self {
        match self {
            Self::Quads => Self::Triangles,
            Self::QuadStrip => Self::TriangleStrip,
            other => other,
        }
    }

    /// Whether faces of this topology have a surface normal.
    pub fn has_faces(self) -> bool {
        matches!(
            self,
            Self::Triangles | Self::TriangleStrip | Self::TriangleFan | Self::Quads | Self::QuadStrip
        )
    }
}

/// Set of draw calls affected by an update pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UpdateScope {
    Topology(Topology),
    All,
}

impl UpdateScope {
    pub fn covers(self, topology: Topology) -> bool {
        match self {
            Self::Topology(scope) => scope == topology,
            Self::All => true,
        }
    }
}

impl From<Topology> for UpdateScope {
    fn from(value: Topology) -> Self {
        Self::Topology(value)
    }
}
