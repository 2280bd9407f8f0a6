use std::ops::Range;

use super::{write_cell, Diagonal, TerrainMeshData, VERTICES_PER_CELL};
use crate::brush::{Cell, CellSet};
use crate::heightmap::HeightGrid;

/// Rewrites the vertex blocks of `cells` from the current heights, keeping
/// each cell's diagonal from the last full build.
///
/// Only heights, normals and colors change; the XY of every vertex is the
/// same as before. Cells outside the grid are ignored. Returns the touched
/// vertex ranges, coalesced.
pub fn patch_cells(
    mesh: &mut TerrainMeshData,
    terrain: &HeightGrid,
    diagonals: &[Diagonal],
    cells: &CellSet,
) -> Vec<Range<usize>> {
    let (segments_x, segments_y) = terrain.segments();

    let in_bounds: Vec<Cell> = cells
        .iter()
        .copied()
        .filter(|c| c.x < segments_x && c.y < segments_y)
        .collect();

    for cell in &in_bounds {
        let diagonal = diagonals[cell.y * segments_x + cell.x];
        write_cell(mesh, terrain, cell.x, cell.y, diagonal);
    }

    vertex_ranges(in_bounds.iter(), segments_x)
}

/// Vertex ranges covering `cells`, merging cells whose blocks are adjacent in
/// the buffer. Expects row-major order.
pub fn vertex_ranges<'a>(
    cells: impl IntoIterator<Item = &'a Cell>,
    segments_x: usize,
) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = Vec::new();

    for cell in cells {
        let start = (cell.y * segments_x + cell.x) * VERTICES_PER_CELL;
        let end = start + VERTICES_PER_CELL;

        match ranges.last_mut() {
            Some(last) if last.end == start => last.end = end,
            _ => ranges.push(start..end),
        }
    }

    ranges
}
