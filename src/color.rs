use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.65, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Fill for positive / negative deltas.
pub const IMPROVED: Color32 = Color32::from_rgb(46, 160, 67);
pub const DECLINED: Color32 = Color32::from_rgb(218, 54, 51);

// ---------------------------------------------------------------------------
// Color mapping: category label → Color32
// ---------------------------------------------------------------------------

/// Maps the labels of one category (region, segment) to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map from the category's labels; duplicates collapse.
    /// `category` picks the palette rotation so regions and segments differ.
    pub fn new(category: &str, labels: impl IntoIterator<Item = String>) -> Self {
        let labels: Vec<String> = labels
            .into_iter()
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        let mapping = labels
            .into_iter()
            .zip(generate_palette_for(category))
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a label.
    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Return the legend entries (label → colour) for the UI.
    pub fn legend_entries(&self) -> Vec<(String, Color32)> {
        self.mapping
            .iter()
            .map(|(label, c)| (label.clone(), *c))
            .collect()
    }
}

/// An endless palette so any number of labels gets a colour; hues repeat
/// every twelve labels with a lightness shift.
fn generate_palette_for(category: &str) -> impl Iterator<Item = Color32> {
    let base = generate_palette(12);
    let shift = if category == "segment" { 6 } else { 0 };
    (0..).map(move |i: usize| {
        let c = base[(i + shift) % base.len()];
        if (i / base.len()) % 2 == 1 {
            c.gamma_multiply(0.7)
        } else {
            c
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size() {
        assert_eq!(generate_palette(5).len(), 5);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn labels_get_distinct_colours() {
        let map = ColorMap::new(
            "region",
            ["EGE", "KUZEY", "MERKEZ", "EGE"].iter().map(|s| s.to_string()),
        );
        let legend = map.legend_entries();
        assert_eq!(legend.len(), 3);
        assert_ne!(map.color_for("EGE"), map.color_for("KUZEY"));
        assert_eq!(map.color_for("unknown"), Color32::GRAY);
    }

    #[test]
    fn categories_use_different_rotations() {
        let label = || std::iter::once("EGE".to_string());
        let region = ColorMap::new("region", label());
        let segment = ColorMap::new("segment", label());
        assert_ne!(region.color_for("EGE"), segment.color_for("EGE"));
    }
}
