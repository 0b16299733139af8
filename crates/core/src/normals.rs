//! Flat per-face normal synthesis.
//!
//! Each face gets one normal, written to its provoking vertex only, so that a `flat` qualified
//! normal is constant across the face once rasterized. The convention must match the one the
//! rasterizer is configured with; nothing here can verify that.

use crate::{staging::StagingBuffer, topology::Topology};
use vek::Vec3;

/// Vertex of a primitive whose flat attributes are used for the whole primitive.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum ProvokingVertex {
    First,
    #[default]
    Last,
}

impl ProvokingVertex {
    fn pick(self, first: usize, last: usize) -> usize {
        match self {
            Self::First => first,
            Self::Last => last,
        }
    }
}

/// `normalize(cross(a - b, c - b))` of a triangle in winding order.
pub fn face_normal(a: Vec3<f32>, b: Vec3<f32>, c: Vec3<f32>) -> Vec3<f32> {
    (a - b).cross(c - b).normalized()
}

/// Face normal of a possibly non-planar quad, averaged over its two triangles.
pub fn quad_normal(a: Vec3<f32>, b: Vec3<f32>, c: Vec3<f32>, d: Vec3<f32>) -> Vec3<f32> {
    ((a - b).cross(d - b) + (c - d).cross(b - d)).normalized()
}

/// Computes flat normals of every face of `topology` from `positions` into `normals`.
///
/// Topologies without faces are left untouched.
pub fn synthesize_flat_normals(
    topology: Topology,
    positions: &StagingBuffer,
    normals: &mut StagingBuffer,
    provoking: ProvokingVertex,
) {
    debug_assert_eq!(positions.vertex_count(), normals.vertex_count());
    let count = positions.vertex_count();
    let point = |index: usize| {
        let vertex = positions.vertex(index);
        Vec3::new(vertex[0], vertex[1], vertex[2])
    };
    let mut write = |index: usize, normal: Vec3<f32>| {
        normals
            .vertex_mut(index)
            .copy_from_slice(&normal.into_array());
    };

    match topology {
        Topology::Triangles => {
            for face in 0..count / 3 {
                let base = face * 3;
                let normal = face_normal(point(base), point(base + 1), point(base + 2));
                write(provoking.pick(base, base + 2), normal);
            }
        }
        Topology::TriangleStrip => {
            for face in 0..count.saturating_sub(2) {
                let (a, b, c) = (face, face + 1, face + 2);
                // odd faces are wound the other way round
                let normal = if face % 2 == 0 {
                    face_normal(point(a), point(b), point(c))
                } else {
                    face_normal(point(b), point(a), point(c))
                };
                write(provoking.pick(a, c), normal);
            }
        }
        Topology::TriangleFan => {
            for face in 0..count.saturating_sub(2) {
                let (b, c) = (face + 1, face + 2);
                let normal = face_normal(point(0), point(b), point(c));
                write(provoking.pick(b, c), normal);
            }
        }
        Topology::Quads => {
            for face in 0..count / 4 {
                let base = face * 4;
                let normal = quad_normal(
                    point(base),
                    point(base + 1),
                    point(base + 2),
                    point(base + 3),
                );
                write(provoking.pick(base, base + 3), normal);
            }
        }
        Topology::QuadStrip => {
            for face in 0..(count / 2).saturating_sub(1) {
                let base = face * 2;
                let normal = quad_normal(
                    point(base),
                    point(base + 1),
                    point(base + 3),
                    point(base + 2),
                );
                write(provoking.pick(base, base + 3), normal);
            }
        }
        Topology::Points | Topology::Lines | Topology::LineStrip | Topology::LineLoop => {}
    }
}

/// Like [`synthesize_flat_normals`] over a legacy topology that gets converted afterwards.
///
/// Each quad face is split into two triangles by the conversion, so its normal is written to
/// every vertex that ends up provoking one of them. Other topologies are not converted and get
/// regular synthesis.
pub fn synthesize_flat_normals_for_conversion(
    topology: Topology,
    positions: &StagingBuffer,
    normals: &mut StagingBuffer,
    provoking: ProvokingVertex,
) {
    debug_assert_eq!(positions.vertex_count(), normals.vertex_count());
    let count = positions.vertex_count();
    let point = |index: usize| {
        let vertex = positions.vertex(index);
        Vec3::new(vertex[0], vertex[1], vertex[2])
    };
    let mut write = |indices: &[usize], normal: Vec3<f32>| {
        for index in indices {
            normals
                .vertex_mut(*index)
                .copy_from_slice(&normal.into_array());
        }
    };

    match topology {
        // (v0, v1, v2) and (v0, v2, v3)
        Topology::Quads => {
            for face in 0..count / 4 {
                let base = face * 4;
                let normal = quad_normal(
                    point(base),
                    point(base + 1),
                    point(base + 2),
                    point(base + 3),
                );
                match provoking {
                    ProvokingVertex::First => write(&[base], normal),
                    ProvokingVertex::Last => write(&[base + 2, base + 3], normal),
                }
            }
        }
        // pairs get swapped, so the face becomes (v1, v0, v3) and (v0, v3, v2)
        Topology::QuadStrip => {
            for face in 0..(count / 2).saturating_sub(1) {
                let base = face * 2;
                let normal = quad_normal(
                    point(base),
                    point(base + 1),
                    point(base + 3),
                    point(base + 2),
                );
                match provoking {
                    ProvokingVertex::First => write(&[base, base + 1], normal),
                    ProvokingVertex::Last => write(&[base + 2, base + 3], normal),
                }
            }
        }
        _ => synthesize_flat_normals(topology, positions, normals, provoking),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeKind;

    const EPSILON: f32 = 1.0e-6;

    fn positions(points: &[[f32; 3]]) -> StagingBuffer {
        StagingBuffer::from_data(
            AttributeKind::Position,
            points.iter().flatten().copied().collect(),
        )
    }

    fn normals(count: usize) -> StagingBuffer {
        StagingBuffer::from_data(AttributeKind::Normal, vec![0.0; count * 3])
    }

    fn assert_normal(normals: &StagingBuffer, index: usize, expected: [f32; 3]) {
        let actual = normals.vertex(index);
        for (actual, expected) in actual.iter().zip(expected) {
            assert!(
                (actual - expected).abs() < EPSILON,
                "vertex {index}: {:?} != {:?}",
                normals.vertex(index),
                expected
            );
        }
    }

    #[test]
    fn test_single_triangle() {
        let points = positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let expected = face_normal(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        assert!((expected.z + 1.0).abs() < EPSILON);

        let mut result = normals(3);
        synthesize_flat_normals(Topology::Triangles, &points, &mut result, ProvokingVertex::Last);
        assert_normal(&result, 0, [0.0, 0.0, 0.0]);
        assert_normal(&result, 1, [0.0, 0.0, 0.0]);
        assert_normal(&result, 2, expected.into_array());

        let mut result = normals(3);
        synthesize_flat_normals(Topology::Triangles, &points, &mut result, ProvokingVertex::First);
        assert_normal(&result, 0, expected.into_array());
        assert_normal(&result, 1, [0.0, 0.0, 0.0]);
        assert_normal(&result, 2, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_non_provoking_vertices_keep_prior_value() {
        let points = positions(&[[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]]);
        let mut result =
            StagingBuffer::from_data(AttributeKind::Normal, vec![5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 0.0, 0.0, 0.0]);
        synthesize_flat_normals(Topology::Triangles, &points, &mut result, ProvokingVertex::Last);
        assert_normal(&result, 0, [5.0, 6.0, 7.0]);
        assert_normal(&result, 1, [8.0, 9.0, 10.0]);
        assert_normal(&result, 2, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_triangle_strip_orientation_is_consistent() {
        let points = positions(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 2.0, 0.0],
        ]);
        let mut result = normals(5);
        synthesize_flat_normals(
            Topology::TriangleStrip,
            &points,
            &mut result,
            ProvokingVertex::Last,
        );
        assert_normal(&result, 0, [0.0, 0.0, 0.0]);
        assert_normal(&result, 1, [0.0, 0.0, 0.0]);
        for index in 2..5 {
            assert_normal(&result, index, [0.0, 0.0, -1.0]);
        }

        let mut result = normals(5);
        synthesize_flat_normals(
            Topology::TriangleStrip,
            &points,
            &mut result,
            ProvokingVertex::First,
        );
        for index in 0..3 {
            assert_normal(&result, index, [0.0, 0.0, -1.0]);
        }
        assert_normal(&result, 3, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_triangle_fan() {
        let points = positions(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ]);
        let mut result = normals(4);
        synthesize_flat_normals(Topology::TriangleFan, &points, &mut result, ProvokingVertex::Last);
        assert_normal(&result, 0, [0.0, 0.0, 0.0]);
        assert_normal(&result, 1, [0.0, 0.0, 0.0]);
        assert_normal(&result, 2, [0.0, 0.0, -1.0]);
        assert_normal(&result, 3, [0.0, 0.0, -1.0]);

        let mut result = normals(4);
        synthesize_flat_normals(Topology::TriangleFan, &points, &mut result, ProvokingVertex::First);
        assert_normal(&result, 0, [0.0, 0.0, 0.0]);
        assert_normal(&result, 1, [0.0, 0.0, -1.0]);
        assert_normal(&result, 2, [0.0, 0.0, -1.0]);
        assert_normal(&result, 3, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_native_quads_and_quad_strip() {
        let quad = positions(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ]);
        let mut result = normals(4);
        synthesize_flat_normals(Topology::Quads, &quad, &mut result, ProvokingVertex::Last);
        assert_normal(&result, 0, [0.0, 0.0, 0.0]);
        assert_normal(&result, 3, [0.0, 0.0, -1.0]);

        let strip = positions(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 2.0, 0.0],
            [1.0, 2.0, 0.0],
        ]);
        let mut result = normals(6);
        synthesize_flat_normals(Topology::QuadStrip, &strip, &mut result, ProvokingVertex::Last);
        assert_normal(&result, 3, [0.0, 0.0, -1.0]);
        assert_normal(&result, 5, [0.0, 0.0, -1.0]);
        assert_normal(&result, 4, [0.0, 0.0, 0.0]);

        let mut result = normals(6);
        synthesize_flat_normals(Topology::QuadStrip, &strip, &mut result, ProvokingVertex::First);
        assert_normal(&result, 0, [0.0, 0.0, -1.0]);
        assert_normal(&result, 2, [0.0, 0.0, -1.0]);
        assert_normal(&result, 4, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_normals_survive_quad_conversion() {
        use crate::converter::{quad_strip_to_triangle_strip, quads_to_triangles};

        let quad = positions(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ]);
        let cases = [
            (ProvokingVertex::Last, [2, 5]),
            (ProvokingVertex::First, [0, 3]),
        ];
        for (provoking, picked) in cases {
            let mut result = normals(4);
            synthesize_flat_normals_for_conversion(Topology::Quads, &quad, &mut result, provoking);
            let triangles = quads_to_triangles(&result);
            for index in picked {
                assert_normal(&triangles, index, [0.0, 0.0, -1.0]);
            }
        }

        let strip = positions(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 2.0, 0.0],
            [1.0, 2.0, 0.0],
        ]);
        for provoking in [ProvokingVertex::Last, ProvokingVertex::First] {
            let mut result = normals(6);
            synthesize_flat_normals_for_conversion(Topology::QuadStrip, &strip, &mut result, provoking);
            let converted = quad_strip_to_triangle_strip(&result);
            for face in 0..4 {
                let index = provoking.pick(face, face + 2);
                assert_normal(&converted, index, [0.0, 0.0, -1.0]);
            }
        }
    }

    #[test]
    fn test_faceless_topologies_are_untouched() {
        let points = positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        for topology in [
            Topology::Points,
            Topology::Lines,
            Topology::LineStrip,
            Topology::LineLoop,
        ] {
            let mut result = normals(3);
            synthesize_flat_normals(topology, &points, &mut result, ProvokingVertex::Last);
            assert!(result.data().iter().all(|value| *value == 0.0));
        }
    }
}
