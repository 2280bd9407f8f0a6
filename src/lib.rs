pub mod brush;
pub mod error;
pub mod generation;
pub mod heightmap;
pub mod meshing;
pub mod palette;
pub mod plugin;
pub mod terrain;
pub mod tool;

pub use brush::{Cell, CellSet};
pub use error::TerrainError;
pub use heightmap::{HeightGrid, TerrainSettings};
pub use terrain::{
    GeometryUpdate, MeshBuilder, MeshHandle, RayHit, Terrain, TerrainDependencies,
};
