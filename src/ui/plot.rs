use eframe::egui::{Color32, Ui};
use egui_plot::{Line, Plot, PlotUi};

use crate::data::model::SpectrumRecord;
use crate::smooth::{gaussian_smooth, DEFAULT_SIGMA};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Spectral plot (central panel)
// ---------------------------------------------------------------------------

/// Render the central plot: the focused record when there is one,
/// otherwise every visible record coloured by the selected facet.
pub fn spectral_plot(ui: &mut Ui, state: &AppState) {
    if state.table.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to view spectra  (File → Open…)");
        });
        return;
    }

    if let Some(rec) = state.focused_record() {
        ui.label(metadata_header(rec));
    }

    let dark = ui.visuals().dark_mode;
    let x_label = if state.rest_frame {
        "Rest-frame wavelength [Å]"
    } else {
        "Observed wavelength [Å]"
    };

    Plot::new("spectral_plot")
        .legend(egui_plot::Legend::default())
        .x_axis_label(x_label)
        .y_axis_label("Flux [10⁻¹⁷ erg s⁻¹ cm⁻² Å⁻¹]")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| match state.focused_record() {
            Some(rec) => focused_lines(plot_ui, state, rec, dark),
            None => overview_lines(plot_ui, state),
        });
}

/// One line per visible record.
fn overview_lines(plot_ui: &mut PlotUi, state: &AppState) {
    let Some(table) = &state.table else {
        return;
    };

    for &idx in &state.visible_indices {
        let rec = &table.records[idx];

        let (color, name) = match &state.color_map {
            Some(cm) => {
                let value = rec.facet_value(cm.facet);
                (cm.color_for(value), value.to_string())
            }
            None => (Color32::LIGHT_BLUE, rec.sparcl_id.clone()),
        };

        let y = if state.minmax_scaling {
            minmax_scale(&rec.flux)
        } else {
            rec.flux.clone()
        };

        plot_ui.line(
            Line::new(points(&state.x_values(rec), &y))
                .name(name)
                .color(color)
                .width(1.0),
        );
    }
}

/// Raw flux (faded), Gaussian-smoothed flux and the model in red.
fn focused_lines(plot_ui: &mut PlotUi, state: &AppState, rec: &SpectrumRecord, dark: bool) {
    let x = state.x_values(rec);

    plot_ui.line(
        Line::new(points(&x, &rec.flux))
            .name("flux")
            .color(Color32::from_gray(128).gamma_multiply(0.4))
            .width(1.0),
    );

    if state.show_smoothed {
        let smoothed = gaussian_smooth(&rec.flux, DEFAULT_SIGMA);
        let ink = if dark { Color32::WHITE } else { Color32::BLACK };
        plot_ui.line(
            Line::new(points(&x, &smoothed))
                .name(format!("smoothed (σ = {DEFAULT_SIGMA} px)"))
                .color(ink)
                .width(1.5),
        );
    }

    if let Some(model) = rec.model.as_ref().filter(|_| state.show_model) {
        plot_ui.line(
            Line::new(points(&x, model))
                .name("model")
                .color(Color32::RED)
                .width(1.5),
        );
    }
}

/// Plot points, skipping non-finite samples.
fn points(x: &[f64], y: &[f64]) -> Vec<[f64; 2]> {
    x.iter()
        .zip(y)
        .filter(|(xi, yi)| xi.is_finite() && yi.is_finite())
        .map(|(&xi, &yi)| [xi, yi])
        .collect()
}

/// Scale to [0, 1]; a flat spectrum maps to zero.
fn minmax_scale(y: &[f64]) -> Vec<f64> {
    let finite = y.iter().copied().filter(|v| v.is_finite());
    let min = finite.clone().fold(f64::INFINITY, f64::min);
    let max = finite.fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !range.is_finite() || range.abs() < f64::EPSILON {
        vec![0.0; y.len()]
    } else {
        y.iter().map(|&v| (v - min) / range).collect()
    }
}

fn metadata_header(rec: &SpectrumRecord) -> String {
    format!(
        "{}  {}  RA {:.5}  Dec {:.5}  z = {:.5}  ({})",
        rec.sparcl_id, rec.spectype, rec.ra, rec.dec, rec.redshift, rec.data_release
    )
}
