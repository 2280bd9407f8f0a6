use bevy::log::{debug, info};
use bevy::prelude::Vec3;
use noise::NoiseFn;

use crate::brush::CellSet;
use crate::error::TerrainError;
use crate::generation::{generate_hills, HillSettings};
use crate::heightmap::{HeightGrid, TerrainSettings};
use crate::meshing::{
    build_terrain_mesh, patch_cells, Diagonal, DiagonalPicker, DiagonalPolicy, TerrainMeshData,
    VERTICES_PER_CELL,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

pub trait MeshBuilder {
    fn create_mesh(&mut self, data: &TerrainMeshData) -> MeshHandle;

    fn patch_vertex_range(
        &mut self,
        handle: MeshHandle,
        start: usize,
        count: usize,
        data: &TerrainMeshData,
    );
}

/// Sent to observers once per full rebuild or patch batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryUpdate {
    Rebuilt { handle: MeshHandle, vertices: usize },
    Patched { handle: MeshHandle, cells: usize, ranges: usize },
}

pub type GeometryObserver = Box<dyn FnMut(&GeometryUpdate) + Send + Sync>;

pub struct TerrainDependencies<B, N> {
    pub mesh_builder: B,
    pub noise: N,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
}

pub struct Terrain<B, N> {
    grid: HeightGrid,
    mesh: TerrainMeshData,
    diagonals: Vec<Diagonal>,
    picker: DiagonalPicker,
    deps: TerrainDependencies<B, N>,
    handle: MeshHandle,
    observers: Vec<GeometryObserver>,
}

impl<B, N> Terrain<B, N>
where
    B: MeshBuilder,
    N: NoiseFn<f64, 2>,
{
    pub fn new(
        grid: HeightGrid,
        mut deps: TerrainDependencies<B, N>,
        policy: DiagonalPolicy,
    ) -> Result<Self, TerrainError> {
        grid.check_shape()?;

        let mut picker = DiagonalPicker::new(policy);
        let (segments_x, segments_y) = grid.segments();
        let diagonals = picker.pick_all(segments_x, segments_y);
        let mesh = build_terrain_mesh(&grid, &diagonals);
        let handle = deps.mesh_builder.create_mesh(&mesh);

        info!(
            "built terrain mesh: {}x{} cells, {} vertices",
            segments_x,
            segments_y,
            mesh.vertex_count()
        );

        Ok(Self {
            grid,
            mesh,
            diagonals,
            picker,
            deps,
            handle,
            observers: Vec::new(),
        })
    }

    pub fn create(
        settings: TerrainSettings,
        deps: TerrainDependencies<B, N>,
    ) -> Result<Self, TerrainError> {
        Self::new(
            HeightGrid::from_settings(settings)?,
            deps,
            DiagonalPolicy::Random,
        )
    }

    pub fn grid(&self) -> &HeightGrid {
        &self.grid
    }

    /// Mutable grid access for bulk edits. Call
    /// [`generate_geometry`](Self::generate_geometry) afterwards.
    pub fn grid_mut(&mut self) -> &mut HeightGrid {
        &mut self.grid
    }

    pub fn mesh(&self) -> &TerrainMeshData {
        &self.mesh
    }

    pub fn mesh_handle(&self) -> MeshHandle {
        self.handle
    }

    pub fn diagonals(&self) -> &[Diagonal] {
        &self.diagonals
    }

    pub fn mesh_builder(&self) -> &B {
        &self.deps.mesh_builder
    }

    pub fn mesh_builder_mut(&mut self) -> &mut B {
        &mut self.deps.mesh_builder
    }

    pub fn set_noise(&mut self, noise: N) {
        self.deps.noise = noise;
    }

    pub fn on_geometry_changed(
        &mut self,
        observer: impl FnMut(&GeometryUpdate) + Send + Sync + 'static,
    ) {
        self.observers.push(Box::new(observer));
    }

    /// Fails if the grid was resized behind the cached mesh's back.
    fn check_geometry(&self) -> Result<(), TerrainError> {
        self.grid.check_shape()?;

        let cells = self.grid.cell_count();
        let found = (self.diagonals.len(), self.mesh.vertex_count());
        if found != (cells, cells * VERTICES_PER_CELL) {
            return Err(TerrainError::GridCorruption {
                expected: (cells, cells * VERTICES_PER_CELL),
                found,
            });
        }
        Ok(())
    }

    fn notify(&mut self, update: GeometryUpdate) {
        for observer in &mut self.observers {
            observer(&update);
        }
    }

    pub fn generate_geometry(&mut self) -> Result<(), TerrainError> {
        self.grid.check_shape()?;

        let (segments_x, segments_y) = self.grid.segments();
        self.diagonals = self.picker.pick_all(segments_x, segments_y);
        self.mesh = build_terrain_mesh(&self.grid, &self.diagonals);
        self.handle = self.deps.mesh_builder.create_mesh(&self.mesh);

        info!(
            "rebuilt terrain mesh: {}x{} cells, {} vertices",
            segments_x,
            segments_y,
            self.mesh.vertex_count()
        );

        self.notify(GeometryUpdate::Rebuilt {
            handle: self.handle,
            vertices: self.mesh.vertex_count(),
        });
        Ok(())
    }

    pub fn resize(&mut self, segments_x: usize, segments_y: usize) -> Result<(), TerrainError> {
        self.grid.resize(segments_x, segments_y)?;
        self.generate_geometry()
    }

    pub fn generate_hills(&mut self, settings: &HillSettings) -> Result<(), TerrainError> {
        self.grid.check_shape()?;
        generate_hills(&mut self.grid, &self.deps.noise, settings);
        info!(
            "generated hills: scale {}, amplitude {}, {} octave(s)",
            settings.scale, settings.amplitude, settings.octaves
        );
        self.generate_geometry()
    }

    pub fn terraform(
        &mut self,
        point: Vec3,
        radius: f32,
        strength: f32,
    ) -> Result<CellSet, TerrainError> {
        self.check_geometry()?;
        let visited = self.grid.terraform_heights(point, radius, strength)?;

        if !visited.is_empty() {
            self.update_vertices_for_cells(&visited)?;
        }

        Ok(visited)
    }

    pub fn flatten(
        &mut self,
        point: Vec3,
        radius: f32,
        normal: Option<Vec3>,
        strength: f32,
    ) -> Result<CellSet, TerrainError> {
        self.check_geometry()?;
        let visited = self.grid.flatten_heights(point, radius, normal, strength)?;

        if !visited.is_empty() {
            self.update_vertices_for_cells(&visited)?;
        }

        Ok(visited)
    }

    /// Patches the mesh for `cells` in place and forwards the changed vertex
    /// ranges to the mesh builder. Observers hear about the batch once.
    pub fn update_vertices_for_cells(&mut self, cells: &CellSet) -> Result<(), TerrainError> {
        self.check_geometry()?;
        if cells.is_empty() {
            return Ok(());
        }

        let ranges = patch_cells(&mut self.mesh, &self.grid, &self.diagonals, cells);
        for range in &ranges {
            self.deps.mesh_builder.patch_vertex_range(
                self.handle,
                range.start,
                range.len(),
                &self.mesh,
            );
        }

        debug!(
            "patched {} terrain cells in {} vertex range(s)",
            cells.len(),
            ranges.len()
        );

        self.notify(GeometryUpdate::Patched {
            handle: self.handle,
            cells: cells.len(),
            ranges: ranges.len(),
        });
        Ok(())
    }

    pub fn get_height_at(&self, world_x: f32, world_y: f32) -> f32 {
        self.grid.get_height_at(world_x, world_y)
    }

    /// First point where a ray meets the surface over the grid, marching in
    /// half-cell steps and refining by bisection.
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<RayHit> {
        let direction = direction.try_normalize()?;
        let step = self.grid.cell_size().min_element() * 0.5;

        let above = |p: Vec3| p.z > self.grid.get_height_at(p.x, p.y);
        let over_grid = |p: Vec3| self.grid.contains(p.x, p.y);

        let mut t_prev = 0.;
        let mut t = 0.;
        while t <= max_distance {
            let p = origin + direction * t;
            if over_grid(p) && !above(p) {
                if t == 0. {
                    return None;
                }

                let (mut lo, mut hi) = (t_prev, t);
                for _ in 0..16 {
                    let mid = (lo + hi) * 0.5;
                    let q = origin + direction * mid;
                    if over_grid(q) && !above(q) {
                        hi = mid;
                    } else {
                        lo = mid;
                    }
                }

                let hit = origin + direction * hi;
                let point = hit.truncate().extend(self.grid.get_height_at(hit.x, hit.y));
                return Some(RayHit {
                    point,
                    normal: self.grid.normal_at(point.x, point.y),
                });
            }
            t_prev = t;
            t += step;
        }

        None
    }
}
