use vek::Vec3;

/// Kind of per-vertex attribute stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Position,
    Normal,
    TexCoord,
    Color,
}

impl AttributeKind {
    pub const COUNT: usize = 4;
    pub const ALL: [Self; Self::COUNT] = [Self::Position, Self::Normal, Self::TexCoord, Self::Color];

    pub fn index(self) -> usize {
        match self {
            Self::Position => 0,
            Self::Normal => 1,
            Self::TexCoord => 2,
            Self::Color => 3,
        }
    }

    /// Number of float components stored per vertex.
    pub fn components(self) -> usize {
        match self {
            Self::Position => 3,
            Self::Normal => 3,
            Self::TexCoord => 2,
            Self::Color => 4,
        }
    }
}

/// Attribute(s) written by a patch call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AttributeSelector {
    Kind(AttributeKind),
    /// Every attribute takes its current value, position takes the given one.
    Currents,
}

impl From<AttributeKind> for AttributeSelector {
    fn from(value: AttributeKind) -> Self {
        Self::Kind(value)
    }
}

/// Current value of every vertex attribute, as set by immediate-mode calls.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AttributeSet {
    values: [[f32; 4]; AttributeKind::COUNT],
}

impl Default for AttributeSet {
    fn default() -> Self {
        Self {
            values: [
                [0.0, 0.0, 0.0, 1.0],
                [0.0, 0.0, 0.0, 0.0],
                [0.0, 0.0, 0.0, 0.0],
                [1.0, 1.0, 1.0, 1.0],
            ],
        }
    }
}

impl AttributeSet {
    pub fn set(&mut self, kind: AttributeKind, value: [f32; 4]) {
        self.values[kind.index()] = value;
    }

    pub fn get(&self, kind: AttributeKind) -> [f32; 4] {
        self.values[kind.index()]
    }

    /// Components of `kind` that get stored into a staging buffer.
    pub fn components(&self, kind: AttributeKind) -> &[f32] {
        &self.values[kind.index()][..kind.components()]
    }

    pub fn position(&mut self, x: f32, y: f32, z: f32) {
        self.set(AttributeKind::Position, [x, y, z, 1.0]);
    }

    pub fn normal(&mut self, x: f32, y: f32, z: f32, normalize: bool) {
        let normal = if normalize {
            Vec3::new(x, y, z).normalized()
        } else {
            Vec3::new(x, y, z)
        };
        self.set(AttributeKind::Normal, [normal.x, normal.y, normal.z, 0.0]);
    }

    pub fn tex_coords(&mut self, u: f32, v: f32) {
        self.set(AttributeKind::TexCoord, [u, v, 0.0, 0.0]);
    }

    pub fn color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.set(AttributeKind::Color, [r, g, b, a]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_components() {
        let components = AttributeKind::ALL
            .iter()
            .map(|kind| kind.components())
            .collect::<Vec<_>>();
        assert_eq!(components, vec![3, 3, 2, 4]);
    }

    #[test]
    fn test_attribute_set() {
        let mut attributes = AttributeSet::default();
        assert_eq!(attributes.components(AttributeKind::Color), &[1.0; 4]);

        attributes.color(0.5, 0.25, 0.0, 1.0);
        attributes.tex_coords(0.1, 0.9);
        attributes.position(1.0, 2.0, 3.0);
        assert_eq!(
            attributes.components(AttributeKind::Color),
            &[0.5, 0.25, 0.0, 1.0]
        );
        assert_eq!(attributes.components(AttributeKind::TexCoord), &[0.1, 0.9]);
        assert_eq!(
            attributes.components(AttributeKind::Position),
            &[1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn test_normal_normalization() {
        let mut attributes = AttributeSet::default();
        attributes.normal(0.0, 3.0, 4.0, false);
        assert_eq!(attributes.components(AttributeKind::Normal), &[0.0, 3.0, 4.0]);
        attributes.normal(0.0, 3.0, 4.0, true);
        let normal = attributes.components(AttributeKind::Normal);
        assert!((normal[1] - 0.6).abs() < 1.0e-6);
        assert!((normal[2] - 0.8).abs() < 1.0e-6);
    }
}
