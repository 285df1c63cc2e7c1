//! Color scales for the map and charts.

/// Viridis stops, low to high.
const RAMP: &[(u8, u8, u8)] = &[
    (0x44, 0x01, 0x54),
    (0x3b, 0x52, 0x8b),
    (0x21, 0x91, 0x8c),
    (0x5e, 0xc9, 0x62),
    (0xfd, 0xe7, 0x25),
];

/// Qualitative palette for species categories (Tableau 10).
const PALETTE: &[&str] = &[
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7",
    "#9c755f", "#bab0ac",
];

/// Marker color for occurrences without a species.
pub const UNIDENTIFIED: &str = "#7f7f7f";

/// Maps `value` in `[0, max]` onto the continuous ramp.
///
/// A zero `max` maps everything to the low end.
#[must_use]
pub fn ramp(value: u64, max: u64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let t = if max == 0 {
        0.0
    } else {
        (value.min(max) as f64) / (max as f64)
    };

    let segments = RAMP.len() - 1;
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let (lo, frac) = {
        let scaled = t * segments as f64;
        let lo = (scaled.floor() as usize).min(segments - 1);
        (lo, scaled - lo as f64)
    };

    let (a, b) = (RAMP[lo], RAMP[lo + 1]);
    format!(
        "#{:02x}{:02x}{:02x}",
        lerp(a.0, b.0, frac),
        lerp(a.1, b.1, frac),
        lerp(a.2, b.2, frac)
    )
}

/// Returns the ramp stops as a CSS gradient color list.
#[must_use]
pub fn ramp_css() -> String {
    RAMP.iter()
        .map(|(r, g, b)| format!("#{r:02x}{g:02x}{b:02x}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Returns the categorical color for the category at `rank`.
#[must_use]
pub fn category(rank: usize) -> &'static str {
    PALETTE[rank % PALETTE.len()]
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (f64::from(b) - f64::from(a))
        .mul_add(t, f64::from(a))
        .round()
        .clamp(0.0, 255.0) as u8
}
