use std::f32::consts::TAU;

use super::TerrainMeshData;

/// A flat annulus in the XY plane facing +Z, four vertices per segment.
pub fn build_ring(radius: f32, width: f32, segments: usize, color: [f32; 4]) -> TerrainMeshData {
    let inner = radius - width;
    let point = |r: f32, angle: f32| [angle.cos() * r, angle.sin() * r, 0.];

    let mut mesh = TerrainMeshData::default();
    let mut prev = 0.;
    for i in 1..=segments {
        let angle = i as f32 / segments as f32 * TAU;
        let base = mesh.positions.len() as u32;

        mesh.positions.extend([
            point(inner, angle),
            point(inner, prev),
            point(radius, prev),
            point(radius, angle),
        ]);
        mesh.normals.extend([[0., 0., 1.]; 4]);
        mesh.uvs.extend([[0., 0.]; 4]);
        mesh.colors.extend([color; 4]);
        mesh.indices
            .extend([base, base + 1, base + 2, base, base + 2, base + 3]);

        prev = angle;
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::prelude::Vec3;

    #[test]
    fn ring_spans_inner_to_outer_radius() {
        let ring = build_ring(1., 0.1, 32, [1., 0., 0., 1.]);

        assert_eq!(ring.vertex_count(), 128);
        assert_eq!(ring.indices.len(), 32 * 6);
        assert!(ring.indices.iter().all(|i| (*i as usize) < ring.vertex_count()));

        for p in &ring.positions {
            let r = Vec3::from(*p).length();
            assert!((r - 0.9).abs() < 1e-5 || (r - 1.).abs() < 1e-5, "radius {r}");
            assert_eq!(p[2], 0.);
        }
    }

    #[test]
    fn ring_faces_up() {
        let ring = build_ring(2., 0.5, 8, [1.; 4]);
        for tri in ring.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|k| Vec3::from(ring.positions[tri[k] as usize]));
            assert!((b - a).cross(c - a).z > 0.);
        }
    }
}
