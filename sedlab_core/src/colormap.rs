//! Perceptual color scale for energy.

use plotters::style::colors::colormaps::ViridisRGB;
use plotters::style::RGBColor;

/// 8-bit RGB triple.
pub type Rgb = [u8; 3];

/// Map a normalized value to viridis: dark purple (0) → teal → yellow (1).
///
/// Values outside [0, 1] saturate at the end colors; NaN maps to the low end.
pub fn viridis(t: f64) -> Rgb {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let RGBColor(r, g, b) = ViridisRGB::get_color(t as f32);
    [r, g, b]
}
