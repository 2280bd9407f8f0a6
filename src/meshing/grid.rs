use bevy::prelude::Vec3;

use super::{Diagonal, TerrainMeshData};
use crate::heightmap::HeightGrid;

pub const VERTICES_PER_CELL: usize = 6;

/// Builds the whole surface: two flat-shaded triangles per cell, split along
/// `diagonals[y * segments_x + x]`.
pub fn build_terrain_mesh(terrain: &HeightGrid, diagonals: &[Diagonal]) -> TerrainMeshData {
    let (segments_x, segments_y) = terrain.segments();
    debug_assert_eq!(diagonals.len(), segments_x * segments_y);

    let mut mesh = TerrainMeshData::with_vertex_count(segments_x * segments_y * VERTICES_PER_CELL);

    for y in 0..segments_y {
        for x in 0..segments_x {
            let cell = y * segments_x + x;
            write_cell(&mut mesh, terrain, x, y, diagonals[cell]);
        }
    }

    mesh
}

/// Writes the six vertices of cell `(x, y)` from the current heights.
///
/// Slots 0 and 1 are the bottom-left and bottom-right corners for either
/// diagonal. The remaining four depend on the diagonal. UVs stay `(0, 0)`.
pub fn write_cell(
    mesh: &mut TerrainMeshData,
    terrain: &HeightGrid,
    x: usize,
    y: usize,
    diagonal: Diagonal,
) {
    let (segments_x, _) = terrain.segments();
    let base = (y * segments_x + x) * VERTICES_PER_CELL;

    let [bl, br, tl, tr] = terrain.cell_corners(x, y);

    let avg_height = (bl.z + br.z + tl.z + tr.z) / 4.;
    let color = terrain.get_color_for_height(avg_height).as_rgba_f32();

    let triangles = match diagonal {
        Diagonal::BottomLeftTopRight => [[bl, br, tr], [bl, tr, tl]],
        Diagonal::BottomRightTopLeft => [[bl, br, tl], [br, tr, tl]],
    };

    for (t, [a, b, c]) in triangles.into_iter().enumerate() {
        let normal = face_normal(a, b, c).to_array();
        for (i, p) in [a, b, c].into_iter().enumerate() {
            let slot = base + t * 3 + i;
            mesh.positions[slot] = p.to_array();
            mesh.normals[slot] = normal;
            mesh.colors[slot] = color;
        }
    }
}

fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).try_normalize().unwrap_or(Vec3::Z)
}
