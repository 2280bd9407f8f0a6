use std::collections::BTreeSet;

use bevy::prelude::{Vec2, Vec3};

use crate::error::TerrainError;
use crate::heightmap::HeightGrid;

/// A quad of the height grid, named by its bottom-left grid vertex.
///
/// `y` is declared first so cells order row-major, matching the layout of the
/// mesh vertex buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub y: usize,
    pub x: usize,
}

impl Cell {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

pub type CellSet = BTreeSet<Cell>;

/// Quadratic falloff: full strength at the center, zero at the rim.
pub fn base_height_change(vec: Vec3, radius: f32, strength: f32) -> f32 {
    let dist = vec.truncate().length();
    let falloff = (1. - dist / radius).max(0.);

    strength * falloff * falloff
}

/// Moves a sample toward the plane through the brush point with the given
/// normal.
///
/// Never overshoots the plane and never moves less than a tenth of the
/// remaining offset per call. Without a usable normal this is a no-op.
pub fn flatten_height_change(vec: Vec3, normal: Option<Vec3>, radius: f32, strength: f32) -> f32 {
    let Some(normal) = normal.and_then(Vec3::try_normalize) else {
        return 0.;
    };

    let dist = normal.dot(vec);
    let point_dist = vec.truncate().length();
    let falloff = (1. - point_dist / radius).max(0.);
    let squared = falloff * falloff;

    if squared * strength > dist.abs() {
        return dist;
    }
    if squared * strength < dist.abs() * 0.1 {
        return dist * 0.1;
    }

    squared * strength * dist.signum()
}

impl HeightGrid {
    /// Applies `height_update` to every grid vertex within `radius` of `point`
    /// (XY distance) and returns the cells sharing those vertices.
    ///
    /// `height_update` receives `point` minus the vertex's world position,
    /// using the height before this update as its Z. The footprint is clipped
    /// to the grid.
    pub fn get_cells(
        &mut self,
        point: Vec3,
        radius: f32,
        mut height_update: impl FnMut(Vec3) -> f32,
    ) -> Result<CellSet, TerrainError> {
        self.check_shape()?;

        let mut visited = CellSet::new();
        if !(radius > 0.) || !point.is_finite() {
            return Ok(visited);
        }

        let (segments_x, segments_y) = self.segments();
        let center = self.world_to_grid(point.x, point.y);
        let grid_radius = radius / self.cell_size();

        let min = (center - grid_radius).floor().max(Vec2::ZERO);
        let max = (center + grid_radius).ceil();
        let max_x = max.x.min(segments_x as f32);
        let max_y = max.y.min(segments_y as f32);

        if max_x < min.x || max_y < min.y {
            return Ok(visited);
        }

        let (min_x, min_y) = (min.x as usize, min.y as usize);
        let (max_x, max_y) = (max_x as usize, max_y as usize);

        for gy in min_y..=max_y {
            for gx in min_x..=max_x {
                let vec = point - self.vertex_at(gx, gy);
                if vec.truncate().length() > radius {
                    continue;
                }

                let delta = height_update(vec);
                let h = self.height_at_vertex(gx, gy);
                self.set_height_at_vertex(gx, gy, h + delta);

                if gx > 0 && gy > 0 {
                    visited.insert(Cell::new(gx - 1, gy - 1));
                }
                if gx < segments_x && gy > 0 {
                    visited.insert(Cell::new(gx, gy - 1));
                }
                if gx > 0 && gy < segments_y {
                    visited.insert(Cell::new(gx - 1, gy));
                }
                if gx < segments_x && gy < segments_y {
                    visited.insert(Cell::new(gx, gy));
                }
            }
        }

        Ok(visited)
    }

    pub fn terraform_heights(
        &mut self,
        point: Vec3,
        radius: f32,
        strength: f32,
    ) -> Result<CellSet, TerrainError> {
        self.get_cells(point, radius, |vec| {
            base_height_change(vec, radius, strength)
        })
    }

    pub fn flatten_heights(
        &mut self,
        point: Vec3,
        radius: f32,
        normal: Option<Vec3>,
        strength: f32,
    ) -> Result<CellSet, TerrainError> {
        if normal.and_then(Vec3::try_normalize).is_none() {
            self.check_shape()?;
            return Ok(CellSet::new());
        }

        self.get_cells(point, radius, |vec| {
            flatten_height_change(vec, normal, radius, strength)
        })
    }
}
