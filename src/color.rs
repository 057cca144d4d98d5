use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

use crate::analysis::series::SeriesKey;

// ---------------------------------------------------------------------------
// Color palette generators
// ---------------------------------------------------------------------------

/// Neutral grey used for the residual band.
pub const RESIDUAL_COLOR: &str = "#9e9e9e";

/// Anchor points of the viridis colour map, dark to bright.
const VIRIDIS: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

fn to_hex(rgb: Srgb) -> String {
    format!(
        "#{:02x}{:02x}{:02x}",
        (rgb.red.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8,
    )
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<String> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_hex(rgb)
        })
        .collect()
}

/// Generates `n` colours along the viridis gradient, so neighbouring
/// entries (e.g. adjacent age bands) get similar colours.
pub fn gradient_palette(n: usize) -> Vec<String> {
    match n {
        0 => Vec::new(),
        1 => vec![to_hex(viridis(0.0))],
        _ => (0..n)
            .map(|i| to_hex(viridis(i as f32 / (n - 1) as f32)))
            .collect(),
    }
}

fn viridis(t: f32) -> Srgb {
    let anchor = |i: usize| -> LinSrgb {
        let (r, g, b) = VIRIDIS[i];
        Srgb::new(r, g, b).into_format::<f32>().into_linear()
    };
    let scaled = t.clamp(0.0, 1.0) * (VIRIDIS.len() - 1) as f32;
    let i = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let mixed = anchor(i).mix(anchor(i + 1), scaled - i as f32);
    Srgb::from_linear(mixed)
}

// ---------------------------------------------------------------------------
// Color mapping: series key → colour
// ---------------------------------------------------------------------------

/// Colours for the columns of one chart, assigned by column position so
/// repeated runs on the same data keep their colours.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMap {
    mapping: Vec<(SeriesKey, String)>,
}

impl ColorMap {
    /// Distinct hues for categories; the residual is always grey.
    pub fn categorical(keys: &[SeriesKey]) -> Self {
        let n_categories = keys.iter().filter(|k| !k.is_residual()).count();
        Self::build(keys, generate_palette(n_categories))
    }

    /// Gradient colours for ordered bands such as age groups.
    pub fn gradient(keys: &[SeriesKey]) -> Self {
        let n_categories = keys.iter().filter(|k| !k.is_residual()).count();
        Self::build(keys, gradient_palette(n_categories))
    }

    fn build(keys: &[SeriesKey], palette: Vec<String>) -> Self {
        let mut colors = palette.into_iter();
        let mapping = keys
            .iter()
            .map(|key| {
                let color = if key.is_residual() {
                    RESIDUAL_COLOR.to_string()
                } else {
                    colors.next().unwrap_or_else(|| RESIDUAL_COLOR.to_string())
                };
                (key.clone(), color)
            })
            .collect();
        ColorMap { mapping }
    }

    /// Look up the colour for a given key.
    pub fn color_for(&self, key: &SeriesKey) -> &str {
        self.mapping
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, c)| c.as_str())
            .unwrap_or(RESIDUAL_COLOR)
    }
}
