use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Which pair of opposite corners a cell's two triangles share.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Diagonal {
    /// Triangles `bl, br, tr` and `bl, tr, tl`.
    BottomLeftTopRight,
    /// Triangles `bl, br, tl` and `br, tr, tl`.
    BottomRightTopLeft,
}

/// How a full rebuild picks each cell's diagonal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DiagonalPolicy {
    /// Fresh coin flips on every rebuild.
    #[default]
    Random,
    /// Coin flips from a seeded stream. The same sequence of rebuilds
    /// triangulates the same way.
    Seeded(u64),
    /// Each cell's diagonal is a fixed hash of the seed and its coordinates,
    /// so every rebuild triangulates identically.
    Hashed(u64),
}

pub struct DiagonalPicker {
    policy: DiagonalPolicy,
    rng: ChaCha8Rng,
}

impl DiagonalPicker {
    pub fn new(policy: DiagonalPolicy) -> Self {
        let rng = match policy {
            DiagonalPolicy::Random => ChaCha8Rng::seed_from_u64(rand::thread_rng().gen()),
            DiagonalPolicy::Seeded(seed) | DiagonalPolicy::Hashed(seed) => {
                ChaCha8Rng::seed_from_u64(seed)
            }
        };

        Self { policy, rng }
    }

    pub fn pick(&mut self, x: usize, y: usize) -> Diagonal {
        let flip = match self.policy {
            DiagonalPolicy::Random | DiagonalPolicy::Seeded(_) => self.rng.gen_bool(0.5),
            DiagonalPolicy::Hashed(seed) => hash_cell(seed, x, y) & 1 == 1,
        };

        if flip {
            Diagonal::BottomLeftTopRight
        } else {
            Diagonal::BottomRightTopLeft
        }
    }

    pub fn pick_all(&mut self, segments_x: usize, segments_y: usize) -> Vec<Diagonal> {
        let mut diagonals = Vec::with_capacity(segments_x * segments_y);
        for y in 0..segments_y {
            for x in 0..segments_x {
                diagonals.push(self.pick(x, y));
            }
        }
        diagonals
    }
}

/// Splitmix64-style mix of `(seed, x, y)`.
#[inline]
fn hash_cell(seed: u64, x: usize, y: usize) -> u64 {
    let mut h = seed;
    h = h.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(x as u64);
    h = h.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(y as u64);
    h ^= h >> 30;
    h = h.wrapping_mul(0xbf58476d1ce4e5b9);
    h ^= h >> 27;
    h = h.wrapping_mul(0x94d049bb133111eb);
    h ^= h >> 31;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_diagonals_repeat_across_rebuilds() {
        let mut picker = DiagonalPicker::new(DiagonalPolicy::Hashed(11));
        let first = picker.pick_all(8, 8);
        let second = picker.pick_all(8, 8);
        assert_eq!(first, second);
        assert_eq!(picker.pick(3, 2), first[2 * 8 + 3]);
    }

    #[test]
    fn seeded_pickers_agree() {
        let a = DiagonalPicker::new(DiagonalPolicy::Seeded(5)).pick_all(16, 16);
        let b = DiagonalPicker::new(DiagonalPolicy::Seeded(5)).pick_all(16, 16);
        assert_eq!(a, b);
    }

    #[test]
    fn both_diagonals_occur() {
        for policy in [
            DiagonalPolicy::Random,
            DiagonalPolicy::Seeded(1),
            DiagonalPolicy::Hashed(1),
        ] {
            let all = DiagonalPicker::new(policy).pick_all(16, 16);
            assert_eq!(all.len(), 256);
            assert!(all.contains(&Diagonal::BottomLeftTopRight), "{policy:?}");
            assert!(all.contains(&Diagonal::BottomRightTopLeft), "{policy:?}");
        }
    }
}
