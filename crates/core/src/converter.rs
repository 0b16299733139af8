use crate::{
    staging::{AttributeStreams, StagingBuffer},
    topology::Topology,
};

/// Quad corners emitted for each pair of triangles.
const QUAD_TRIANGLES: [usize; 6] = [0, 1, 2, 0, 2, 3];

/// Rewrites a quad list into a triangle list, copying every attribute value per new vertex.
pub fn quads_to_triangles(quads: &StagingBuffer) -> StagingBuffer {
    let components = quads.components();
    let count = quads.vertex_count() / 4;
    let mut data = Vec::with_capacity(count * 6 * components);
    for quad in 0..count {
        for corner in QUAD_TRIANGLES {
            data.extend_from_slice(quads.vertex(quad * 4 + corner));
        }
    }
    StagingBuffer::from_data(quads.kind(), data)
}

/// Rewrites a quad strip into a triangle strip of the same vertex count by swapping each vertex
/// pair.
pub fn quad_strip_to_triangle_strip(strip: &StagingBuffer) -> StagingBuffer {
    let count = strip.vertex_count();
    let mut data = Vec::with_capacity(strip.data().len());
    for index in 0..count {
        let source = if index % 2 == 0 {
            // unpaired trailing vertex keeps its own value
            (index + 1).min(count - 1)
        } else {
            index - 1
        };
        data.extend_from_slice(strip.vertex(source));
    }
    StagingBuffer::from_data(strip.kind(), data)
}

/// Rewrites every stream of a draw call into a topology the device supports.
///
/// Topologies that need no rewrite are returned untouched.
pub fn convert(topology: Topology, streams: AttributeStreams) -> (Topology, AttributeStreams) {
    let converted = topology.converted();
    let streams = match topology {
        Topology::Quads => streams.map(|buffer| quads_to_triangles(&buffer)),
        Topology::QuadStrip => streams.map(|buffer| quad_strip_to_triangle_strip(&buffer)),
        _ => return (topology, streams),
    };
    log::debug!(
        "Converted {:?} into {:?} with {} vertices",
        topology,
        converted,
        streams.vertex_count()
    );
    (converted, streams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{AttributeKind, AttributeSet};
    use vek::Vec3;

    fn positions(points: &[[f32; 3]]) -> StagingBuffer {
        StagingBuffer::from_data(
            AttributeKind::Position,
            points.iter().flatten().copied().collect(),
        )
    }

    fn winding(buffer: &StagingBuffer, a: usize, b: usize, c: usize) -> f32 {
        let point = |index: usize| {
            let vertex = buffer.vertex(index);
            Vec3::new(vertex[0], vertex[1], vertex[2])
        };
        let (a, b, c) = (point(a), point(b), point(c));
        (b - a).cross(c - a).z
    }

    #[test]
    fn test_quad_to_triangles() {
        let quad = positions(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ]);
        let triangles = quads_to_triangles(&quad);
        assert_eq!(triangles.vertex_count(), 6);
        assert_eq!(
            triangles.data(),
            &[
                0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, //
                0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0,
            ]
        );
    }

    #[test]
    fn test_quads_diagonal_values_are_copied_exactly() {
        let mut colors = StagingBuffer::new(AttributeKind::Color, 8);
        for quad in 0..3 {
            for corner in 0..4 {
                let value = 0.1 * quad as f32 + 0.013 * corner as f32;
                colors.push(&[value, value * 2.0, value * 3.0, 1.0 / (1.0 + value)]);
            }
        }
        let triangles = quads_to_triangles(&colors);
        assert_eq!(triangles.vertex_count(), 18);
        for quad in 0..3 {
            let source = |corner: usize| colors.vertex(quad * 4 + corner);
            let target = |index: usize| triangles.vertex(quad * 6 + index);
            assert_eq!(target(0), source(0));
            assert_eq!(target(3), source(0));
            assert_eq!(target(2), source(2));
            assert_eq!(target(4), source(2));
            assert_eq!(target(1), source(1));
            assert_eq!(target(5), source(3));
        }
    }

    #[test]
    fn test_partial_quad_is_dropped() {
        let buffer = positions(&[[0.0; 3]; 6]);
        assert_eq!(quads_to_triangles(&buffer).vertex_count(), 6);
    }

    #[test]
    fn test_quad_strip_to_triangle_strip() {
        let strip = positions(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 2.0, 0.0],
            [1.0, 2.0, 0.0],
        ]);
        let result = quad_strip_to_triangle_strip(&strip);
        assert_eq!(result.vertex_count(), 6);
        for (index, source) in [1, 0, 3, 2, 5, 4].into_iter().enumerate() {
            assert_eq!(result.vertex(index), strip.vertex(source));
        }
        let windings = (0..result.vertex_count() - 2)
            .map(|index| winding(&result, index, index + 1, index + 2))
            .collect::<Vec<_>>();
        for pair in windings.windows(2) {
            assert!(pair[0] * pair[1] < 0.0);
        }
    }

    #[test]
    fn test_quad_strip_odd_vertex_count() {
        let strip = positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
        let result = quad_strip_to_triangle_strip(&strip);
        assert_eq!(result.vertex_count(), 3);
        assert_eq!(result.vertex(2), strip.vertex(2));
    }

    #[test]
    fn test_convert_streams() {
        let mut streams = AttributeStreams::new(4);
        let mut attributes = AttributeSet::default();
        for index in 0..8 {
            attributes.tex_coords(index as f32, 0.0);
            attributes.position(index as f32, 0.0, 0.0);
            streams.push_vertex(&attributes);
        }

        let (topology, quads) = convert(Topology::Quads, streams.clone());
        assert_eq!(topology, Topology::Triangles);
        assert_eq!(quads.vertex_count(), 12);
        assert!(quads.is_consistent());

        let (topology, strip) = convert(Topology::QuadStrip, streams.clone());
        assert_eq!(topology, Topology::TriangleStrip);
        assert_eq!(strip.vertex_count(), 8);
        assert_eq!(strip.get(AttributeKind::TexCoord).vertex(0), &[1.0, 0.0]);

        let (topology, lines) = convert(Topology::LineStrip, streams.clone());
        assert_eq!(topology, Topology::LineStrip);
        assert_eq!(lines, streams);
    }
}
