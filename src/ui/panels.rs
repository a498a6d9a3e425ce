use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::model::Facet;
use crate::data::store::load_file;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets and record list
// ---------------------------------------------------------------------------

/// Render the left panel: colour selector, facet filters, visible records.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(table) = &state.table else {
        ui.label("No spectra loaded.");
        return;
    };

    // Clone what we need so we can mutate state inside the loop.
    let unique = table.unique_values.clone();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Colour-by selector ----
            ui.strong("Color by");
            let current = state.color_facet;
            egui::ComboBox::from_id_salt("color_by")
                .selected_text(current.map(|f| f.to_string()).unwrap_or_default())
                .show_ui(ui, |ui: &mut Ui| {
                    for facet in Facet::ALL {
                        if ui
                            .selectable_label(current == Some(facet), facet.to_string())
                            .clicked()
                        {
                            state.set_color_facet(facet);
                        }
                    }
                });
            if let Some(cm) = &state.color_map {
                ui.horizontal_wrapped(|ui: &mut Ui| {
                    for (value, color) in cm.legend_entries() {
                        ui.colored_label(color, value);
                    }
                });
            }
            ui.separator();

            // ---- Per-facet filter widgets (collapsible) ----
            for (facet, all_values) in &unique {
                let facet = *facet;
                let n_selected = state.filters.get(&facet).map_or(0, |s| s.len());
                let header_text = format!("{facet}  ({n_selected}/{})", all_values.len());

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(facet)
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                state.select_all(facet);
                            }
                            if ui.small_button("None").clicked() {
                                state.select_none(facet);
                            }
                        });

                        for val in all_values {
                            let mut checked = state
                                .filters
                                .get(&facet)
                                .is_some_and(|s| s.contains(val));

                            let mut text = RichText::new(val);
                            if let Some(cm) =
                                state.color_map.as_ref().filter(|cm| cm.facet == facet)
                            {
                                text = text.color(cm.color_for(val));
                            }

                            if ui.checkbox(&mut checked, text).changed() {
                                state.toggle_filter_value(facet, val);
                            }
                        }
                    });
            }
            ui.separator();

            record_list(ui, state);
        });
}

/// Visible records; clicking one focuses it in the plot.
fn record_list(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Spectra");
    let Some(table) = &state.table else {
        return;
    };

    let mut clicked = None;
    for &idx in &state.visible_indices {
        let rec = &table.records[idx];
        let label = format!("{}  z={:.4}", rec.sparcl_id, rec.redshift);
        let mut text = RichText::new(label).monospace();
        if let Some(cm) = &state.color_map {
            text = text.color(cm.color_for(rec.facet_value(cm.facet)));
        }
        if ui
            .selectable_label(state.focused == Some(idx), text)
            .on_hover_text(format!("{} {}", rec.spectype, rec.data_release))
            .clicked()
        {
            clicked = Some(idx);
        }
    }
    if let Some(idx) = clicked {
        state.focus(idx);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(table) = &state.table {
            ui.label(format!(
                "{} spectra loaded, {} visible",
                table.len(),
                state.visible_indices.len()
            ));
        }

        ui.separator();

        ui.toggle_value(&mut state.rest_frame, "Rest frame");
        ui.toggle_value(&mut state.minmax_scaling, "Min-Max Scaling");
        ui.toggle_value(&mut state.show_smoothed, "Smoothed");
        ui.toggle_value(&mut state.show_model, "Model");

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open DESI spectra")
        .add_filter("Supported files", &["parquet", "pq", "json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        match load_file(&path) {
            Ok(table) => {
                log::info!("Loaded {} spectra from {}", table.len(), path.display());
                state.set_table(table);
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
