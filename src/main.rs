use lowpoly_terrain::{
    meshing::{build_ring, DiagonalPolicy},
    plugin::{
        ActiveTerrain, BrushCamera, HillControls, TerrainCursor, TerrainMeshQueue, TerrainPlugin,
        TerrainSurface,
    },
    HeightGrid, Terrain, TerrainDependencies, TerrainSettings,
};

use bevy::{
    pbr::wireframe::WireframePlugin,
    prelude::*,
    render::{
        render_resource::Face,
        settings::{WgpuFeatures, WgpuSettings},
        RenderPlugin,
    },
};
use bevy_atmosphere::prelude::*;
use bevy_fly_camera::{FlyCamera, FlyCameraPlugin};
use noise::OpenSimplex;
use std::f32::consts::FRAC_PI_2;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(RenderPlugin {
            wgpu_settings: WgpuSettings {
                features: WgpuFeatures::POLYGON_MODE_LINE,
                ..default()
            },
        }))
        .add_plugin(WireframePlugin)
        .add_plugin(FlyCameraPlugin)
        .add_plugin(AtmospherePlugin)
        .add_plugin(TerrainPlugin)
        .add_startup_system(setup_terrain)
        .run();
}

fn setup_terrain(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    hills: Res<HillControls>,
) {
    let settings = TerrainSettings {
        width: 40.,
        height: 40.,
        segments_x: 80,
        segments_y: 80,
        ..default()
    };

    let grid = match HeightGrid::from_settings(settings) {
        Ok(grid) => grid,
        Err(err) => {
            error!("cannot create terrain: {err}");
            return;
        }
    };

    let deps = TerrainDependencies {
        mesh_builder: TerrainMeshQueue::default(),
        noise: OpenSimplex::new(hills.seed),
    };

    let mut terrain = match Terrain::new(grid, deps, DiagonalPolicy::Random) {
        Ok(terrain) => terrain,
        Err(err) => {
            error!("cannot build terrain: {err}");
            return;
        }
    };

    terrain.on_geometry_changed(|update| debug!("terrain geometry changed: {update:?}"));

    if let Err(err) = terrain.generate_hills(&hills.settings) {
        warn!("hill generation failed: {err}");
    }

    commands.insert_resource(ActiveTerrain(terrain));

    // Terrain space is Z-up; turn it onto Bevy's Y-up ground plane.
    commands
        .spawn(PbrBundle {
            material: materials.add(StandardMaterial {
                base_color: Color::WHITE,
                perceptual_roughness: 0.9,
                cull_mode: None::<Face>,
                double_sided: true,
                ..default()
            }),
            transform: Transform::from_rotation(Quat::from_rotation_x(-FRAC_PI_2)),
            ..default()
        })
        .insert(TerrainSurface)
        .insert(bevy::pbr::wireframe::Wireframe)
        .with_children(|parent| {
            parent.spawn((
                PbrBundle {
                    mesh: meshes.add(build_ring(1., 0.1, 32, [1., 0., 0., 1.]).to_render_mesh()),
                    material: materials.add(StandardMaterial {
                        base_color: Color::WHITE,
                        unlit: true,
                        cull_mode: None,
                        double_sided: true,
                        ..default()
                    }),
                    visibility: Visibility::Hidden,
                    ..default()
                },
                TerrainCursor,
            ));
        });

    spawn_viewer(&mut commands, settings.width.max(settings.height));
}

/// Fly camera above the near edge of the terrain, plus a low sun so
/// the flat-shaded faces read clearly.
fn spawn_viewer(commands: &mut Commands, extent: f32) {
    let eye = Vec3::new(0., extent * 0.35, extent * 0.6);
    commands
        .spawn(Camera3dBundle {
            transform: Transform::from_translation(eye).looking_at(Vec3::ZERO, Vec3::Y),
            ..default()
        })
        .insert(FlyCamera::default())
        .insert(AtmosphereCamera::default())
        .insert(BrushCamera);

    commands.insert_resource(AmbientLight {
        color: Color::rgb(0.75, 0.85, 1.),
        brightness: 0.35,
    });
    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            illuminance: 12_000.,
            ..default()
        },
        transform: Transform::from_xyz(-1., 0.6, 0.4).looking_at(Vec3::ZERO, Vec3::Y),
        ..default()
    });
}
