use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::Facet;

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
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: facet value → Color32
// ---------------------------------------------------------------------------

/// Maps the values of one facet (spectype, data release) to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    pub facet: Facet,
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new(facet: Facet, unique_values: &BTreeSet<String>) -> Self {
        let palette = generate_palette(unique_values.len());
        let mapping = unique_values.iter().cloned().zip(palette).collect();

        ColorMap {
            facet,
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, value: &str) -> Color32 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Return the legend entries (value label → colour) for the UI.
    pub fn legend_entries(&self) -> Vec<(String, Color32)> {
        self.mapping.iter().map(|(v, c)| (v.clone(), *c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_colours_are_distinct() {
        let colours = generate_palette(4);
        assert_eq!(colours.len(), 4);
        let unique: BTreeSet<[u8; 4]> = colours.iter().map(|c| c.to_array()).collect();
        assert_eq!(unique.len(), 4);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn unknown_value_falls_back_to_grey() {
        let values = BTreeSet::from(["GALAXY".to_string(), "QSO".to_string()]);
        let cm = ColorMap::new(Facet::SpecType, &values);
        assert_ne!(cm.color_for("GALAXY"), cm.color_for("QSO"));
        assert_eq!(cm.color_for("STAR"), Color32::GRAY);
        assert_eq!(cm.legend_entries().len(), 2);
    }
}
