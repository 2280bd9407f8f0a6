use bevy::prelude::{Quat, Resource, Transform, Vec3};
use noise::NoiseFn;

use crate::brush::CellSet;
use crate::error::TerrainError;
use crate::terrain::{MeshBuilder, RayHit, Terrain};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BrushMode {
    #[default]
    None,
    Raise,
    Lower,
    Flatten,
}

impl BrushMode {
    /// Exactly one held key selects its mode. Holding several cancels.
    pub fn from_keys(raise: bool, lower: bool, flatten: bool) -> Self {
        match (raise, lower, flatten) {
            (true, false, false) => BrushMode::Raise,
            (false, true, false) => BrushMode::Lower,
            (false, false, true) => BrushMode::Flatten,
            _ => BrushMode::None,
        }
    }
}

/// The plane a flatten stroke works toward, fixed when the stroke starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlattenPlane {
    pub point: Vec3,
    pub normal: Vec3,
}

impl FlattenPlane {
    pub fn intersect(&self, origin: Vec3, direction: Vec3) -> Option<Vec3> {
        let denom = self.normal.dot(direction);
        if denom.abs() <= 1e-5 {
            return None;
        }

        let d = (self.point - origin).dot(self.normal) / denom;
        (d >= 0.).then(|| origin + direction * d)
    }
}

#[derive(Resource, Clone, Debug)]
pub struct BrushTool {
    pub radius: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    /// Height change per second at the brush center.
    pub strength: f32,
    pub min_strength: f32,
    pub max_strength: f32,
    /// Flatten runs this many times faster than raise and lower.
    pub flatten_multiplier: f32,
    pub max_ray_distance: f32,
    mode: BrushMode,
    plane: Option<FlattenPlane>,
}

impl Default for BrushTool {
    fn default() -> Self {
        Self {
            radius: 1.,
            min_radius: 0.2,
            max_radius: 5.,
            strength: 3.,
            min_strength: 0.5,
            max_strength: 10.,
            flatten_multiplier: 5.,
            max_ray_distance: 200.,
            mode: BrushMode::None,
            plane: None,
        }
    }
}

impl BrushTool {
    pub fn mode(&self) -> BrushMode {
        self.mode
    }

    pub fn flatten_plane(&self) -> Option<FlattenPlane> {
        self.plane
    }

    pub fn set_mode(&mut self, mode: BrushMode) {
        if mode != BrushMode::Flatten {
            self.plane = None;
        }
        self.mode = mode;
    }

    pub fn resize_by(&mut self, delta: f32) {
        self.radius = (self.radius + delta).clamp(self.min_radius, self.max_radius);
    }

    pub fn adjust_strength(&mut self, delta: f32) {
        self.strength = (self.strength + delta).clamp(self.min_strength, self.max_strength);
    }

    /// Pose of a unit cursor ring lying on the surface at `hit`, in terrain
    /// space, lifted slightly off the ground and scaled to the brush radius.
    pub fn cursor_transform(&self, hit: &RayHit) -> Transform {
        let normal = hit.normal.try_normalize().unwrap_or(Vec3::Z);
        Transform {
            translation: hit.point + Vec3::Z * 0.05,
            rotation: Quat::from_rotation_arc(Vec3::Z, normal),
            scale: Vec3::splat(self.radius),
        }
    }

    /// Applies one frame of the current mode where the ray meets the terrain.
    ///
    /// Returns the edited cells, or `None` when nothing was under the cursor
    /// or no mode is active. During a flatten stroke the ray is intersected
    /// with the stroke's plane instead of the surface.
    pub fn apply<B, N>(
        &mut self,
        terrain: &mut Terrain<B, N>,
        origin: Vec3,
        direction: Vec3,
        dt: f32,
    ) -> Result<Option<CellSet>, TerrainError>
    where
        B: MeshBuilder,
        N: NoiseFn<f64, 2>,
    {
        let strength = self.strength * dt;

        let cells = match self.mode {
            BrushMode::None => return Ok(None),
            BrushMode::Raise | BrushMode::Lower => {
                let Some(hit) = terrain.raycast(origin, direction, self.max_ray_distance) else {
                    return Ok(None);
                };
                let sign = if self.mode == BrushMode::Raise { 1. } else { -1. };
                terrain.terraform(hit.point, self.radius, sign * strength)?
            }
            BrushMode::Flatten => {
                let plane = match self.plane {
                    Some(plane) => plane,
                    None => {
                        let Some(hit) =
                            terrain.raycast(origin, direction, self.max_ray_distance)
                        else {
                            return Ok(None);
                        };
                        let plane = FlattenPlane {
                            point: hit.point,
                            normal: hit.normal,
                        };
                        self.plane = Some(plane);
                        plane
                    }
                };

                let Some(point) = plane.intersect(origin, direction) else {
                    return Ok(None);
                };
                terrain.flatten(
                    point,
                    self.radius,
                    Some(plane.normal),
                    self.flatten_multiplier * strength,
                )?
            }
        };

        Ok(Some(cells))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightmap::HeightGrid;
    use crate::meshing::{DiagonalPolicy, TerrainMeshData};
    use crate::terrain::{MeshHandle, TerrainDependencies};
    use noise::Constant;

    struct Discard;

    impl MeshBuilder for Discard {
        fn create_mesh(&mut self, _data: &TerrainMeshData) -> MeshHandle {
            MeshHandle(0)
        }

        fn patch_vertex_range(&mut self, _: MeshHandle, _: usize, _: usize, _: &TerrainMeshData) {}
    }

    fn terrain() -> Terrain<Discard, Constant> {
        Terrain::new(
            HeightGrid::new(10., 10., 10, 10).unwrap(),
            TerrainDependencies {
                mesh_builder: Discard,
                noise: Constant::new(0.),
            },
            DiagonalPolicy::Hashed(0),
        )
        .unwrap()
    }

    const DOWN: Vec3 = Vec3::NEG_Z;

    #[test]
    fn keys_pick_a_single_mode() {
        assert_eq!(BrushMode::from_keys(true, false, false), BrushMode::Raise);
        assert_eq!(BrushMode::from_keys(false, true, false), BrushMode::Lower);
        assert_eq!(BrushMode::from_keys(false, false, true), BrushMode::Flatten);
        assert_eq!(BrushMode::from_keys(true, true, false), BrushMode::None);
        assert_eq!(BrushMode::from_keys(false, false, false), BrushMode::None);
    }

    #[test]
    fn radius_is_clamped() {
        let mut tool = BrushTool::default();
        tool.resize_by(10.);
        assert_eq!(tool.radius, 5.);
        tool.resize_by(-10.);
        assert_eq!(tool.radius, 0.2);
    }

    #[test]
    fn strength_is_clamped() {
        let mut tool = BrushTool::default();
        tool.adjust_strength(1.5);
        assert_eq!(tool.strength, 4.5);
        tool.adjust_strength(100.);
        assert_eq!(tool.strength, 10.);
        tool.adjust_strength(-100.);
        assert_eq!(tool.strength, 0.5);
    }

    #[test]
    fn cursor_sits_on_the_hit_facing_its_normal() {
        let mut tool = BrushTool::default();
        tool.resize_by(1.);

        let normal = Vec3::new(1., 0., 1.).normalize();
        let transform = tool.cursor_transform(&RayHit {
            point: Vec3::new(2., -1., 0.5),
            normal,
        });

        assert!((transform.translation - Vec3::new(2., -1., 0.55)).length() < 1e-6);
        assert_eq!(transform.scale, Vec3::splat(2.));
        assert!((transform.rotation * Vec3::Z - normal).length() < 1e-5);

        let flat = tool.cursor_transform(&RayHit {
            point: Vec3::ZERO,
            normal: Vec3::Z,
        });
        assert!((flat.rotation * Vec3::Z - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn plane_intersection() {
        let plane = FlattenPlane {
            point: Vec3::new(0., 0., 1.),
            normal: Vec3::Z,
        };
        assert_eq!(
            plane.intersect(Vec3::new(2., 3., 5.), DOWN),
            Some(Vec3::new(2., 3., 1.))
        );
        assert_eq!(plane.intersect(Vec3::new(2., 3., 5.), Vec3::Z), None);
        assert_eq!(plane.intersect(Vec3::new(2., 3., 5.), Vec3::X), None);
    }

    #[test]
    fn raise_and_lower_scale_by_time_step() {
        let mut terrain = terrain();
        let mut tool = BrushTool::default();

        tool.set_mode(BrushMode::Raise);
        let cells = tool
            .apply(&mut terrain, Vec3::new(0., 0., 5.), DOWN, 0.5)
            .unwrap()
            .unwrap();
        assert!(!cells.is_empty());
        assert!((terrain.grid().height_at_vertex(5, 5) - 1.5).abs() < 1e-4);

        tool.set_mode(BrushMode::Lower);
        tool.apply(&mut terrain, Vec3::new(0., 0., 5.), DOWN, 0.5)
            .unwrap();
        assert!(terrain.grid().height_at_vertex(5, 5).abs() < 1e-3);
    }

    #[test]
    fn no_mode_or_no_hit_does_nothing() {
        let mut terrain = terrain();
        let mut tool = BrushTool::default();
        assert_eq!(
            tool.apply(&mut terrain, Vec3::new(0., 0., 5.), DOWN, 1.).unwrap(),
            None
        );

        tool.set_mode(BrushMode::Raise);
        assert_eq!(
            tool.apply(&mut terrain, Vec3::new(0., 0., 5.), Vec3::Z, 1.).unwrap(),
            None
        );
    }

    #[test]
    fn flatten_stroke_keeps_its_plane() {
        let mut terrain = terrain();
        terrain.terraform(Vec3::new(2., 0., 0.), 2., 1.).unwrap();

        let mut tool = BrushTool::default();
        tool.set_mode(BrushMode::Flatten);
        tool.apply(&mut terrain, Vec3::new(-2., 0., 5.), DOWN, 0.01)
            .unwrap()
            .unwrap();

        let plane = tool.flatten_plane().unwrap();
        assert!(plane.point.z.abs() < 1e-4);

        // Dragging over the bump works toward the plane locked at stroke start.
        for _ in 0..200 {
            tool.apply(&mut terrain, Vec3::new(2., 0., 5.), DOWN, 0.05)
                .unwrap();
        }
        assert_eq!(tool.flatten_plane(), Some(plane));
        assert!(terrain.grid().height_at_vertex(7, 5).abs() < 0.05);

        tool.set_mode(BrushMode::None);
        assert_eq!(tool.flatten_plane(), None);
    }
}
