use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TerrainError {
    /// A grid extent or segment count that cannot back a height grid.
    #[error("invalid terrain dimension `{name}`: {value} (must be positive and finite)")]
    InvalidDimension { name: &'static str, value: f64 },

    /// The height array or the cached mesh no longer matches the declared
    /// segment counts.
    #[error("terrain data has shape {found:?}, expected {expected:?} for its segment counts")]
    GridCorruption {
        expected: (usize, usize),
        found: (usize, usize),
    },
}
