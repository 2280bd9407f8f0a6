use bevy::{input::mouse::MouseWheel, prelude::*};
use noise::OpenSimplex;

use crate::generation::HillSettings;
use crate::meshing::{TerrainMeshData, VertexSlice};
use crate::terrain::{MeshBuilder, MeshHandle, Terrain};
use crate::tool::{BrushMode, BrushTool};

pub enum MeshCommand {
    Create { handle: MeshHandle, mesh: Mesh },
    Patch { handle: MeshHandle, slice: VertexSlice },
}

/// A [`MeshBuilder`] that queues work for [`sync_terrain_mesh`], which owns
/// the `Assets<Mesh>` access.
#[derive(Default)]
pub struct TerrainMeshQueue {
    next_id: u64,
    commands: Vec<MeshCommand>,
}

impl TerrainMeshQueue {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, MeshCommand> {
        self.commands.drain(..)
    }
}

impl MeshBuilder for TerrainMeshQueue {
    fn create_mesh(&mut self, data: &TerrainMeshData) -> MeshHandle {
        self.next_id += 1;
        let handle = MeshHandle(self.next_id);

        // A new mesh supersedes anything still waiting.
        self.commands.clear();
        self.commands.push(MeshCommand::Create {
            handle,
            mesh: data.to_render_mesh(),
        });
        handle
    }

    fn patch_vertex_range(
        &mut self,
        handle: MeshHandle,
        start: usize,
        count: usize,
        data: &TerrainMeshData,
    ) {
        self.commands.push(MeshCommand::Patch {
            handle,
            slice: data.slice(start..start + count),
        });
    }
}

pub type SceneTerrain = Terrain<TerrainMeshQueue, OpenSimplex>;

#[derive(Resource)]
pub struct ActiveTerrain(pub SceneTerrain);

/// Hill parameters and noise seed used the next time hills are generated.
#[derive(Resource)]
pub struct HillControls {
    pub settings: HillSettings,
    pub seed: u32,
}

impl Default for HillControls {
    fn default() -> Self {
        Self {
            settings: HillSettings {
                scale: 0.15,
                amplitude: 0.5,
                octaves: 1,
            },
            seed: 0,
        }
    }
}

impl HillControls {
    pub fn adjust_amplitude(&mut self, delta: f32) {
        self.settings.amplitude = (self.settings.amplitude + delta).clamp(0., 1.5);
    }

    pub fn adjust_scale(&mut self, delta: f32) {
        self.settings.scale = (self.settings.scale + delta).clamp(0.05, 0.5);
    }
}

#[derive(Component)]
pub struct TerrainSurface;

/// Ring showing where the brush lands, a child of the [`TerrainSurface`].
#[derive(Component)]
pub struct TerrainCursor;

#[derive(Component)]
pub struct BrushCamera;

pub struct TerrainPlugin;

impl Plugin for TerrainPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BrushTool>()
            .init_resource::<HillControls>()
            .add_system(select_brush_mode)
            .add_system(scroll_brush_radius)
            .add_system(regenerate_terrain.after(adjust_controls))
            .add_system(adjust_controls)
            .add_system(apply_brush.after(select_brush_mode))
            .add_system(update_terrain_cursor.after(apply_brush))
            .add_system(
                sync_terrain_mesh
                    .after(apply_brush)
                    .after(regenerate_terrain),
            );
    }
}

pub fn sync_terrain_mesh(
    mut terrain: ResMut<ActiveTerrain>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut current: Local<Option<(MeshHandle, Handle<Mesh>)>>,
    mut surfaces: Query<&mut Handle<Mesh>, With<TerrainSurface>>,
) {
    if terrain.0.mesh_builder().is_empty() {
        return;
    }

    for command in terrain.0.mesh_builder_mut().drain() {
        match command {
            MeshCommand::Create { handle, mesh } => {
                let asset = meshes.add(mesh);
                for mut surface in &mut surfaces {
                    *surface = asset.clone();
                }
                *current = Some((handle, asset));
            }
            MeshCommand::Patch { handle, slice } => {
                let Some((id, asset)) = current.as_ref() else {
                    continue;
                };
                if *id != handle {
                    continue;
                }
                if let Some(mesh) = meshes.get_mut(asset) {
                    if !slice.apply_to(mesh) {
                        warn!("terrain patch at vertex {} does not fit the mesh", slice.start);
                    }
                }
            }
        }
    }
}

pub fn select_brush_mode(keys: Res<Input<KeyCode>>, mut tool: ResMut<BrushTool>) {
    let mode = BrushMode::from_keys(
        keys.pressed(KeyCode::E),
        keys.pressed(KeyCode::Q),
        keys.pressed(KeyCode::F),
    );
    if tool.mode() != mode {
        tool.set_mode(mode);
    }
}

pub fn scroll_brush_radius(mut wheel: EventReader<MouseWheel>, mut tool: ResMut<BrushTool>) {
    for event in wheel.iter() {
        tool.resize_by(event.y * 0.1);
    }
}

pub fn regenerate_terrain(
    keys: Res<Input<KeyCode>>,
    mut terrain: ResMut<ActiveTerrain>,
    mut hills: ResMut<HillControls>,
) {
    let result = if keys.just_pressed(KeyCode::H) {
        hills.seed = hills.seed.wrapping_add(1);
        terrain.0.set_noise(OpenSimplex::new(hills.seed));
        terrain.0.generate_hills(&hills.settings)
    } else if keys.just_pressed(KeyCode::R) {
        terrain.0.grid_mut().heights_mut().fill(0.);
        terrain.0.generate_geometry()
    } else {
        return;
    };

    if let Err(err) = result {
        warn!("terrain regeneration failed: {err}");
    }
}

pub fn apply_brush(
    time: Res<Time>,
    mut tool: ResMut<BrushTool>,
    mut terrain: ResMut<ActiveTerrain>,
    cameras: Query<&GlobalTransform, With<BrushCamera>>,
    surfaces: Query<&GlobalTransform, With<TerrainSurface>>,
) {
    if tool.mode() == BrushMode::None {
        return;
    }
    let (Ok(camera), Ok(surface)) = (cameras.get_single(), surfaces.get_single()) else {
        return;
    };

    let (origin, direction) = terrain_ray(camera, surface);
    if let Err(err) = tool.apply(&mut terrain.0, origin, direction, time.delta_seconds()) {
        warn!("brush rejected: {err}");
    }
}

/// The camera's view ray in the terrain's own Z-up space.
fn terrain_ray(camera: &GlobalTransform, surface: &GlobalTransform) -> (Vec3, Vec3) {
    let to_terrain = surface.compute_matrix().inverse();
    (
        to_terrain.transform_point3(camera.translation()),
        to_terrain.transform_vector3(camera.forward()),
    )
}

pub fn update_terrain_cursor(
    tool: Res<BrushTool>,
    terrain: Res<ActiveTerrain>,
    cameras: Query<&GlobalTransform, With<BrushCamera>>,
    surfaces: Query<&GlobalTransform, With<TerrainSurface>>,
    mut cursors: Query<(&mut Transform, &mut Visibility), With<TerrainCursor>>,
) {
    let hit = match (cameras.get_single(), surfaces.get_single()) {
        (Ok(camera), Ok(surface)) => {
            let (origin, direction) = terrain_ray(camera, surface);
            terrain.0.raycast(origin, direction, tool.max_ray_distance)
        }
        _ => None,
    };

    for (mut transform, mut visibility) in &mut cursors {
        match &hit {
            Some(hit) => {
                *transform = tool.cursor_transform(hit);
                *visibility = Visibility::Inherited;
            }
            None => *visibility = Visibility::Hidden,
        }
    }
}

/// Up/Down change brush strength, `=`/`-` hill amplitude and `]`/`[` hill
/// scale, all at a steady rate while held.
pub fn adjust_controls(
    time: Res<Time>,
    keys: Res<Input<KeyCode>>,
    mut tool: ResMut<BrushTool>,
    mut hills: ResMut<HillControls>,
) {
    let dt = time.delta_seconds();
    let axis = |up: KeyCode, down: KeyCode| {
        (keys.pressed(up) as i8 - keys.pressed(down) as i8) as f32 * dt
    };

    tool.adjust_strength(axis(KeyCode::Up, KeyCode::Down) * 3.);
    hills.adjust_amplitude(axis(KeyCode::Equals, KeyCode::Minus) * 0.5);
    hills.adjust_scale(axis(KeyCode::RBracket, KeyCode::LBracket) * 0.1);

    let released = [
        KeyCode::Up,
        KeyCode::Down,
        KeyCode::Equals,
        KeyCode::Minus,
        KeyCode::RBracket,
        KeyCode::LBracket,
    ];
    if keys.any_just_released(released) {
        info!(
            "brush strength {:.2}, hill amplitude {:.2}, hill scale {:.2}",
            tool.strength, hills.settings.amplitude, hills.settings.scale
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightmap::HeightGrid;
    use crate::meshing::DiagonalPolicy;
    use crate::terrain::TerrainDependencies;

    fn queued_terrain() -> SceneTerrain {
        Terrain::new(
            HeightGrid::new(10., 10., 10, 10).unwrap(),
            TerrainDependencies {
                mesh_builder: TerrainMeshQueue::default(),
                noise: OpenSimplex::new(1),
            },
            DiagonalPolicy::Seeded(4),
        )
        .unwrap()
    }

    #[test]
    fn hill_controls_stay_in_range() {
        let mut hills = HillControls::default();

        hills.adjust_amplitude(0.25);
        assert_eq!(hills.settings.amplitude, 0.75);
        hills.adjust_amplitude(5.);
        assert_eq!(hills.settings.amplitude, 1.5);
        hills.adjust_amplitude(-5.);
        assert_eq!(hills.settings.amplitude, 0.);

        hills.adjust_scale(1.);
        assert_eq!(hills.settings.scale, 0.5);
        hills.adjust_scale(-1.);
        assert_eq!(hills.settings.scale, 0.05);
    }

    #[test]
    fn terrain_ray_undoes_the_surface_rotation() {
        let surface = GlobalTransform::from(Transform::from_rotation(Quat::from_rotation_x(
            -std::f32::consts::FRAC_PI_2,
        )));
        // Above the terrain in Bevy's Y-up world, looking straight down.
        let camera = GlobalTransform::from(
            Transform::from_xyz(1., 5., -2.).looking_at(Vec3::new(1., 0., -2.), Vec3::Z),
        );

        let (origin, direction) = terrain_ray(&camera, &surface);
        assert!((origin - Vec3::new(1., 2., 5.)).length() < 1e-5);
        assert!((direction - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn rebuild_replaces_pending_commands() {
        let mut terrain = queued_terrain();
        terrain.terraform(Vec3::ZERO, 2., 1.).unwrap();
        terrain.generate_geometry().unwrap();

        let commands: Vec<_> = terrain.mesh_builder_mut().drain().collect();
        assert_eq!(commands.len(), 1);
        assert!(matches!(
            commands[0],
            MeshCommand::Create {
                handle: MeshHandle(2),
                ..
            }
        ));
        assert!(terrain.mesh_builder().is_empty());
    }

    #[test]
    fn queued_patches_reproduce_cpu_buffer() {
        let mut terrain = queued_terrain();
        let mut mesh = match terrain.mesh_builder_mut().drain().next() {
            Some(MeshCommand::Create { mesh, .. }) => mesh,
            _ => panic!("expected an initial mesh"),
        };

        terrain.terraform(Vec3::new(1., 1., 0.), 2.5, 0.8).unwrap();
        terrain.terraform(Vec3::new(-3., 2., 0.), 1.2, -0.4).unwrap();

        for command in terrain.mesh_builder_mut().drain() {
            match command {
                MeshCommand::Patch { handle, slice } => {
                    assert_eq!(handle, MeshHandle(1));
                    assert!(slice.apply_to(&mut mesh));
                }
                MeshCommand::Create { .. } => panic!("unexpected rebuild"),
            }
        }

        let rebuilt = terrain.mesh().to_render_mesh();
        for attribute in [
            Mesh::ATTRIBUTE_POSITION.id,
            Mesh::ATTRIBUTE_NORMAL.id,
            Mesh::ATTRIBUTE_COLOR.id,
        ] {
            assert_eq!(
                mesh.attribute(attribute).map(|a| a.get_bytes()),
                rebuilt.attribute(attribute).map(|a| a.get_bytes())
            );
        }
    }
}
