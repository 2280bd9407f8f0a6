use bevy::prelude::{Color, Vec2, Vec3};
use ndarray::Array2;

use crate::error::TerrainError;
use crate::palette;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainSettings {
    pub width: f32,
    pub height: f32,
    pub segments_x: usize,
    pub segments_y: usize,
    /// Height mapped to the top of the color ramp. Not a clamp.
    pub max_height: f32,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            width: 10.,
            height: 10.,
            segments_x: 16,
            segments_y: 16,
            max_height: 6.,
        }
    }
}

/// Scalar heights over a rectangle centered on the world origin.
///
/// Heights are stored row-major as `heights[[y, x]]`, with
/// `segments_y + 1` rows of `segments_x + 1` samples. The ground plane is XY
/// and heights run along +Z.
#[derive(Clone, Debug)]
pub struct HeightGrid {
    width: f32,
    height: f32,
    segments_x: usize,
    segments_y: usize,
    max_height: f32,
    heights: Array2<f32>,
}

impl Default for HeightGrid {
    fn default() -> Self {
        let settings = TerrainSettings::default();
        Self {
            width: settings.width,
            height: settings.height,
            segments_x: settings.segments_x,
            segments_y: settings.segments_y,
            max_height: settings.max_height,
            heights: Array2::zeros((settings.segments_y + 1, settings.segments_x + 1)),
        }
    }
}

fn positive_extent(name: &'static str, value: f32) -> Result<f32, TerrainError> {
    if value.is_finite() && value > 0. {
        Ok(value)
    } else {
        Err(TerrainError::InvalidDimension {
            name,
            value: value as f64,
        })
    }
}

fn positive_segments(name: &'static str, value: usize) -> Result<usize, TerrainError> {
    if value >= 1 {
        Ok(value)
    } else {
        Err(TerrainError::InvalidDimension {
            name,
            value: value as f64,
        })
    }
}

impl HeightGrid {
    pub fn new(
        width: f32,
        height: f32,
        segments_x: usize,
        segments_y: usize,
    ) -> Result<Self, TerrainError> {
        Self::from_settings(TerrainSettings {
            width,
            height,
            segments_x,
            segments_y,
            ..Default::default()
        })
    }

    pub fn from_settings(settings: TerrainSettings) -> Result<Self, TerrainError> {
        let width = positive_extent("width", settings.width)?;
        let height = positive_extent("height", settings.height)?;
        let max_height = positive_extent("max_height", settings.max_height)?;
        let segments_x = positive_segments("segments_x", settings.segments_x)?;
        let segments_y = positive_segments("segments_y", settings.segments_y)?;

        Ok(Self {
            width,
            height,
            segments_x,
            segments_y,
            max_height,
            heights: Array2::zeros((segments_y + 1, segments_x + 1)),
        })
    }

    /// Changes the subdivision. Reallocates and flattens every height.
    pub fn resize(&mut self, segments_x: usize, segments_y: usize) -> Result<(), TerrainError> {
        let segments_x = positive_segments("segments_x", segments_x)?;
        let segments_y = positive_segments("segments_y", segments_y)?;

        self.segments_x = segments_x;
        self.segments_y = segments_y;
        self.heights = Array2::zeros((segments_y + 1, segments_x + 1));
        Ok(())
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn segments(&self) -> (usize, usize) {
        (self.segments_x, self.segments_y)
    }

    pub fn cell_count(&self) -> usize {
        self.segments_x * self.segments_y
    }

    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    pub fn cell_size(&self) -> Vec2 {
        Vec2::new(
            self.width / self.segments_x as f32,
            self.height / self.segments_y as f32,
        )
    }

    pub fn heights(&self) -> &Array2<f32> {
        &self.heights
    }

    /// Raw access to the height array. Replacing it with an array of another
    /// shape makes every later brush or mesh operation fail with
    /// [`TerrainError::GridCorruption`].
    pub fn heights_mut(&mut self) -> &mut Array2<f32> {
        &mut self.heights
    }

    pub fn height_at_vertex(&self, gx: usize, gy: usize) -> f32 {
        self.heights[[gy, gx]]
    }

    pub fn set_height_at_vertex(&mut self, gx: usize, gy: usize, value: f32) {
        self.heights[[gy, gx]] = value;
    }

    pub fn check_shape(&self) -> Result<(), TerrainError> {
        let expected = (self.segments_y + 1, self.segments_x + 1);
        let found = self.heights.dim();
        if found == expected {
            Ok(())
        } else {
            Err(TerrainError::GridCorruption { expected, found })
        }
    }

    /// Continuous grid coordinates of a world position. Not rounded.
    pub fn world_to_grid(&self, world_x: f32, world_y: f32) -> Vec2 {
        Vec2::new(
            (world_x + self.width / 2.) * self.segments_x as f32 / self.width,
            (world_y + self.height / 2.) * self.segments_y as f32 / self.height,
        )
    }

    pub fn grid_to_world(&self, grid_x: f32, grid_y: f32) -> Vec2 {
        Vec2::new(
            grid_x * self.width / self.segments_x as f32 - self.width / 2.,
            grid_y * self.height / self.segments_y as f32 - self.height / 2.,
        )
    }

    /// World position of a grid vertex, with its height as Z.
    pub fn vertex_at(&self, gx: usize, gy: usize) -> Vec3 {
        self.grid_to_world(gx as f32, gy as f32)
            .extend(self.heights[[gy, gx]])
    }

    /// Corner positions of cell `(x, y)`: bottom-left, bottom-right, top-left,
    /// top-right.
    pub fn cell_corners(&self, x: usize, y: usize) -> [Vec3; 4] {
        [
            self.vertex_at(x, y),
            self.vertex_at(x + 1, y),
            self.vertex_at(x, y + 1),
            self.vertex_at(x + 1, y + 1),
        ]
    }

    pub fn contains(&self, world_x: f32, world_y: f32) -> bool {
        self.cell_under(world_x, world_y).is_some()
    }

    fn cell_under(&self, world_x: f32, world_y: f32) -> Option<(usize, usize, Vec2)> {
        let grid = self.world_to_grid(world_x, world_y);
        let ix = grid.x.floor();
        let iy = grid.y.floor();

        if !(ix >= 0. && iy >= 0. && ix < self.segments_x as f32 && iy < self.segments_y as f32) {
            return None;
        }

        Some((ix as usize, iy as usize, grid - Vec2::new(ix, iy)))
    }

    /// Bilinearly interpolated height. Positions off the grid read as `0`.
    pub fn get_height_at(&self, world_x: f32, world_y: f32) -> f32 {
        let Some((ix, iy, frac)) = self.cell_under(world_x, world_y) else {
            return 0.;
        };

        let h00 = self.heights[[iy, ix]];
        let h10 = self.heights.get([iy, ix + 1]).copied().unwrap_or(h00);
        let h01 = self.heights.get([iy + 1, ix]).copied().unwrap_or(h00);
        let h11 = self.heights.get([iy + 1, ix + 1]).copied().unwrap_or(h00);

        let h0 = h00 * (1. - frac.x) + h10 * frac.x;
        let h1 = h01 * (1. - frac.x) + h11 * frac.x;

        h0 * (1. - frac.y) + h1 * frac.y
    }

    pub fn normal_at(&self, world_x: f32, world_y: f32) -> Vec3 {
        let step = self.cell_size() * 0.5;

        let dx = (self.get_height_at(world_x + step.x, world_y)
            - self.get_height_at(world_x - step.x, world_y))
            / (2. * step.x);
        let dy = (self.get_height_at(world_x, world_y + step.y)
            - self.get_height_at(world_x, world_y - step.y))
            / (2. * step.y);

        Vec3::new(-dx, -dy, 1.).normalize()
    }

    pub fn get_color_at(&self, world_x: f32, world_y: f32) -> Color {
        self.get_color_for_height(self.get_height_at(world_x, world_y))
    }

    pub fn get_color_for_height(&self, height: f32) -> Color {
        palette::ramp(height / self.max_height)
    }
}
