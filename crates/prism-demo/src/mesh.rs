//! Procedural mesh builders.
//!
//! Pure functions with no GPU coupling; they produce non-indexed triangle
//! lists in the XY plane, counter-clockwise winding.

use prism_engine::scene::Vertex;

const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Two-triangle quad centered on the origin.
pub fn quad(size: f32) -> Vec<Vertex> {
    let h = size / 2.0;
    vec![
        Vertex::new([-h, -h, 0.0], WHITE),
        Vertex::new([h, -h, 0.0], WHITE),
        Vertex::new([h, h, 0.0], WHITE),
        Vertex::new([-h, -h, 0.0], WHITE),
        Vertex::new([h, h, 0.0], WHITE),
        Vertex::new([-h, h, 0.0], WHITE),
    ]
}

/// Circle (or ring, with a non-zero inner radius) parameters.
#[derive(Debug, Clone)]
pub struct CircleSpec {
    pub radius: f32,
    pub inner_radius: f32,
    pub subdivisions: u32,
    pub inner_color: [u8; 4],
    pub outer_color: [u8; 4],
}

impl Default for CircleSpec {
    fn default() -> Self {
        Self {
            radius: 1.0,
            inner_radius: 0.0,
            subdivisions: 24,
            inner_color: WHITE,
            outer_color: [26, 26, 26, 255],
        }
    }
}

/// Ring segment fan: two triangles per subdivision.
pub fn circle(spec: &CircleSpec) -> Vec<Vertex> {
    let n = spec.subdivisions.max(3);
    let mut vertices = Vec::with_capacity(n as usize * 6);

    let polar = |angle: f32, radius: f32| {
        [radius * angle.cos(), radius * angle.sin(), 0.0]
    };

    for i in 0..n {
        let a0 = std::f32::consts::TAU * i as f32 / n as f32;
        let a1 = std::f32::consts::TAU * (i + 1) as f32 / n as f32;

        let o0 = polar(a0, spec.radius);
        let o1 = polar(a1, spec.radius);
        let i0 = polar(a0, spec.inner_radius);
        let i1 = polar(a1, spec.inner_radius);

        vertices.push(Vertex::new(o0, spec.outer_color));
        vertices.push(Vertex::new(o1, spec.outer_color));
        vertices.push(Vertex::new(i0, spec.inner_color));

        vertices.push(Vertex::new(i0, spec.inner_color));
        vertices.push(Vertex::new(o1, spec.outer_color));
        vertices.push(Vertex::new(i1, spec.inner_color));
    }

    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_is_six_vertices() {
        let vertices = quad(2.0);
        assert_eq!(vertices.len(), 6);
        for vertex in &vertices {
            assert_eq!(vertex.position[0].abs(), 1.0);
            assert_eq!(vertex.position[1].abs(), 1.0);
            assert_eq!(vertex.position[2], 0.0);
        }
    }

    #[test]
    fn circle_emits_six_vertices_per_subdivision() {
        let spec = CircleSpec {
            subdivisions: 16,
            ..Default::default()
        };
        assert_eq!(circle(&spec).len(), 16 * 6);
    }

    #[test]
    fn circle_enforces_a_minimum_subdivision_count() {
        let spec = CircleSpec {
            subdivisions: 1,
            ..Default::default()
        };
        assert_eq!(circle(&spec).len(), 3 * 6);
    }

    #[test]
    fn ring_outer_vertices_sit_on_the_radius() {
        let spec = CircleSpec {
            radius: 2.0,
            inner_radius: 1.0,
            ..Default::default()
        };

        for vertex in circle(&spec) {
            let [x, y, _] = vertex.position;
            let distance = (x * x + y * y).sqrt();
            assert!(
                (distance - 2.0).abs() < 1e-5 || (distance - 1.0).abs() < 1e-5,
                "vertex off both rings: {distance}"
            );
        }
    }
}
