mod diagonal;
mod grid;
mod patch;
mod ring;

pub use diagonal::{Diagonal, DiagonalPicker, DiagonalPolicy};
pub use grid::{build_terrain_mesh, write_cell, VERTICES_PER_CELL};
pub use patch::{patch_cells, vertex_ranges};
pub use ring::build_ring;

use std::ops::Range;

use bevy::{
    prelude::*,
    render::{
        mesh::{Indices, VertexAttributeValues},
        render_resource::PrimitiveTopology,
    },
};

/// CPU side of the terrain surface: one flat-shaded quad of six unshared
/// vertices per cell, cells laid out row-major.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TerrainMeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub colors: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
}

/// A contiguous run of patched vertex attributes, ready to be written into a
/// render mesh. UVs never change after a build and are not carried.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexSlice {
    pub start: usize,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
}

impl TerrainMeshData {
    pub fn with_vertex_count(count: usize) -> Self {
        Self {
            positions: vec![[0.; 3]; count],
            normals: vec![[0.; 3]; count],
            uvs: vec![[0.; 2]; count],
            colors: vec![[0.; 4]; count],
            indices: (0..count as u32).collect(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn slice(&self, range: Range<usize>) -> VertexSlice {
        VertexSlice {
            start: range.start,
            positions: self.positions[range.clone()].to_vec(),
            normals: self.normals[range.clone()].to_vec(),
            colors: self.colors[range].to_vec(),
        }
    }

    pub fn to_render_mesh(&self) -> Mesh {
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList);

        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, self.positions.clone());
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals.clone());
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, self.uvs.clone());
        mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, self.colors.clone());

        mesh.set_indices(Some(Indices::U32(self.indices.clone())));

        mesh
    }
}

impl VertexSlice {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Overwrites the matching vertex range of `mesh` in place. Returns
    /// `false` if the mesh is missing an attribute or is too short.
    pub fn apply_to(&self, mesh: &mut Mesh) -> bool {
        let range = self.start..self.start + self.len();

        let Some(VertexAttributeValues::Float32x3(positions)) =
            mesh.attribute_mut(Mesh::ATTRIBUTE_POSITION)
        else {
            return false;
        };
        let Some(dst) = positions.get_mut(range.clone()) else {
            return false;
        };
        dst.copy_from_slice(&self.positions);

        if let Some(VertexAttributeValues::Float32x3(normals)) =
            mesh.attribute_mut(Mesh::ATTRIBUTE_NORMAL)
        {
            if let Some(dst) = normals.get_mut(range.clone()) {
                dst.copy_from_slice(&self.normals);
            }
        }

        if let Some(VertexAttributeValues::Float32x4(colors)) =
            mesh.attribute_mut(Mesh::ATTRIBUTE_COLOR)
        {
            if let Some(dst) = colors.get_mut(range) {
                dst.copy_from_slice(&self.colors);
            }
        }

        true
    }
}
