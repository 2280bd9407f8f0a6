use super::heightmap::HeightGrid;

use noise::NoiseFn;

pub struct HillSettings {
    pub scale: f32,
    pub amplitude: f32,
    /// Extra octaves each add half the previous amplitude at twice the
    /// frequency. One octave is a single smooth noise layer.
    pub octaves: u32,
}

impl Default for HillSettings {
    fn default() -> Self {
        Self {
            scale: 0.3,
            amplitude: 0.5,
            octaves: 1,
        }
    }
}

/// Overwrites every height with rolling hills sampled from `noise`.
///
/// Each sample maps the noise from `-1..1` to `0..amplitude`. Samples are
/// taken at the grid vertex's offset from the grid's corner, not from its
/// center.
pub fn generate_hills(
    grid: &mut HeightGrid,
    noise: &impl NoiseFn<f64, 2>,
    settings: &HillSettings,
) {
    let octaves = settings.octaves.max(1);
    let (segments_x, segments_y) = grid.segments();
    let (width, height) = (grid.width(), grid.height());

    // Calculate the maximum magnitude of the summed octaves
    let (max_magnitude, _) = (0..octaves).fold((0.0, 1.0), |(max_magnitude, scale), _| {
        (max_magnitude + scale, scale / 2.0)
    });

    for ((y, x), h) in grid.heights_mut().indexed_iter_mut() {
        let world_x = x as f32 / segments_x as f32 * width;
        let world_y = y as f32 / segments_y as f32 * height;

        let mut value = 0.;
        let mut scale = 1.;
        for i in 0..octaves {
            let frequency = settings.scale / scale;
            value += scale
                * noise.get([
                    (i as f32 * 1000. + world_x * frequency) as f64,
                    (world_y * frequency) as f64,
                ]) as f32;
            scale /= 2.;
        }

        *h = (value / max_magnitude + 1.) * 0.5 * settings.amplitude;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noise::{Constant, OpenSimplex};

    struct EchoNoise;

    impl NoiseFn<f64, 2> for EchoNoise {
        fn get(&self, point: [f64; 2]) -> f64 {
            (point[0] * 0.01).clamp(-1., 1.)
        }
    }

    #[test]
    fn constant_noise_maps_into_amplitude_range() {
        let mut grid = HeightGrid::new(10., 10., 4, 4).unwrap();
        let settings = HillSettings {
            amplitude: 2.,
            ..Default::default()
        };

        generate_hills(&mut grid, &Constant::new(-1.), &settings);
        assert!(grid.heights().iter().all(|h| *h == 0.));

        generate_hills(&mut grid, &Constant::new(1.), &settings);
        assert!(grid.heights().iter().all(|h| *h == 2.));

        generate_hills(&mut grid, &Constant::new(0.), &settings);
        assert!(grid.heights().iter().all(|h| *h == 1.));
    }

    #[test]
    fn samples_from_grid_corner_at_scale() {
        let mut grid = HeightGrid::new(10., 10., 10, 10).unwrap();
        let settings = HillSettings {
            scale: 2.,
            amplitude: 1.,
            octaves: 1,
        };
        generate_hills(&mut grid, &EchoNoise, &settings);

        // Vertex x = 5 sits 5 world units from the corner: noise(10) = 0.1.
        let expected = (0.1 + 1.) * 0.5;
        assert!((grid.height_at_vertex(5, 3) - expected).abs() < 1e-6);
        assert!((grid.height_at_vertex(0, 7) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn simplex_hills_stay_within_amplitude() {
        let mut grid = HeightGrid::new(100., 100., 32, 32).unwrap();
        let settings = HillSettings {
            scale: 0.15,
            amplitude: 4.,
            octaves: 3,
        };
        generate_hills(&mut grid, &OpenSimplex::new(7), &settings);

        assert!(grid.heights().iter().all(|h| (-0.05..=4.05).contains(h)));
        assert!(grid.heights().iter().any(|h| *h != grid.height_at_vertex(0, 0)));
    }

    #[test]
    fn same_noise_gives_same_hills() {
        let mut a = HeightGrid::default();
        let mut b = HeightGrid::default();
        let noise = OpenSimplex::new(3);
        generate_hills(&mut a, &noise, &HillSettings::default());
        generate_hills(&mut b, &noise, &HillSettings::default());
        assert_eq!(a.heights(), b.heights());
    }
}
