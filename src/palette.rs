use bevy::prelude::Color;

/// Height color stops from the shoreline up to the peaks, as sRGB components.
pub const TERRAIN_PALETTE: [[f32; 4]; 5] = [
    [0.2, 0.6, 0.5, 1.0],
    [0.3, 0.75, 0.4, 1.0],
    [0.5, 0.85, 0.35, 1.0],
    [0.7, 0.9, 0.4, 1.0],
    [0.9, 0.85, 0.5, 1.0],
];

/// Samples the palette at `t` in `0..=1`, blending the two bracketing stops.
///
/// `t` is clamped first. Anything that lands on or past the last stop returns
/// that stop unchanged.
pub fn ramp(t: f32) -> Color {
    let t = t.clamp(0., 1.);
    let scale = t * (TERRAIN_PALETTE.len() - 1) as f32;
    let idx = scale.floor() as usize;
    let frac = scale - idx as f32;

    if idx >= TERRAIN_PALETTE.len() - 1 {
        return stop_color(TERRAIN_PALETTE.len() - 1);
    }

    let c1 = TERRAIN_PALETTE[idx];
    let c2 = TERRAIN_PALETTE[idx + 1];

    Color::rgba(
        c1[0] * (1. - frac) + c2[0] * frac,
        c1[1] * (1. - frac) + c2[1] * frac,
        c1[2] * (1. - frac) + c2[2] * frac,
        1.,
    )
}

pub fn stop_color(idx: usize) -> Color {
    let [r, g, b, a] = TERRAIN_PALETTE[idx];
    Color::rgba(r, g, b, a)
}
