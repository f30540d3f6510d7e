//! egui control panel. Every edit becomes a [`ShadingRequest`]; the panel
//! never touches parameters directly.

use bevy::prelude::*;
use bevy_egui::{EguiContexts, EguiPrimaryContextPass, egui};

use crate::{
    controller::{SceneState, ShadingContext, UiGroup},
    params::{ColorParam, NumericParam, Pattern},
    systems::ShadingRequest,
};

/// Adds the "Terrain" window. Requires `bevy_egui::EguiPlugin`.
pub struct ShadingPanelPlugin;

impl Plugin for ShadingPanelPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(EguiPrimaryContextPass, shading_panel);
    }
}

fn label(param: NumericParam) -> &'static str {
    match param {
        NumericParam::TextureRepeat => "Repeat",
        NumericParam::HeightThreshold => "Height threshold",
        NumericParam::GrassNormalSuppression => "Grass normal suppression",
        NumericParam::HillNormalSuppression => "Hill normal suppression",
        NumericParam::UvZoom => "UV zoom",
        NumericParam::SpaceScale => "Space scale",
        NumericParam::HalfToneFrequency => "Frequency",
        NumericParam::HalfToneRadius => "Radius",
        NumericParam::HalfToneRotation => "Rotation",
        _ => "Scale",
    }
}

fn color_label(param: ColorParam) -> &'static str {
    match param {
        ColorParam::Grass => "Grass",
        ColorParam::Hill => "Hill",
        ColorParam::Noise => "Noise",
    }
}

fn slider(
    ui: &mut egui::Ui,
    context: &ShadingContext,
    param: NumericParam,
    requests: &mut Vec<ShadingRequest>,
) {
    let bounds = param.bounds();
    let mut value = context.params().get(param);
    let response = ui.add(
        egui::Slider::new(&mut value, bounds.min..=bounds.max)
            .step_by(bounds.step as f64)
            .text(label(param)),
    );
    if response.changed() {
        requests.push(ShadingRequest::SetNumber(param, value));
    }
}

/// Shown in linear RGB, edited through egui's sRGB picker.
fn color_row(
    ui: &mut egui::Ui,
    context: &ShadingContext,
    param: ColorParam,
    requests: &mut Vec<ShadingRequest>,
) {
    let [r, g, b] = context.params().color(param);
    let mut srgb = Color::linear_rgb(r, g, b).to_srgba().to_u8_array_no_alpha();
    ui.horizontal(|ui| {
        if ui.color_edit_button_srgb(&mut srgb).changed() {
            let linear = Color::srgb_u8(srgb[0], srgb[1], srgb[2]).to_linear();
            requests.push(ShadingRequest::SetColor(
                param,
                [linear.red, linear.green, linear.blue],
            ));
        }
        ui.label(color_label(param));
    });
}

fn pattern_section(
    ui: &mut egui::Ui,
    context: &ShadingContext,
    pattern: Pattern,
    requests: &mut Vec<ShadingRequest>,
) {
    let open = context.group_visible(UiGroup::Pattern(pattern));
    // Only the active pattern's section is shown, and always expanded.
    if !open {
        return;
    }
    egui::CollapsingHeader::new(pattern.label())
        .id_salt(("pattern", pattern.index()))
        .open(Some(true))
        .show(ui, |ui| {
            for param in NumericParam::ALL {
                if param.owner() == Some(pattern) {
                    slider(ui, context, param, requests);
                }
            }
        });
}

fn shading_panel(
    mut contexts: EguiContexts,
    context: Res<ShadingContext>,
    mut writer: MessageWriter<ShadingRequest>,
) {
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    let mut requests = Vec::new();
    egui::Window::new("Terrain")
        .default_width(300.0)
        .resizable(false)
        .show(ctx, |ui| {
            match context.scene() {
                SceneState::Loading => {
                    ui.label("Loading terrain…");
                }
                SceneState::Inert(err) => {
                    ui.colored_label(egui::Color32::LIGHT_RED, err.to_string());
                }
                SceneState::Ready { .. } => {}
            }
            ui.add_enabled_ui(matches!(context.scene(), SceneState::Ready { .. }), |ui| {
                let mut textured = context.params().texture_enabled;
                if ui.checkbox(&mut textured, "Texture").changed() {
                    requests.push(ShadingRequest::ToggleTexture(textured));
                }

                if context.group_visible(UiGroup::Texture) {
                    slider(ui, &context, NumericParam::TextureRepeat, &mut requests);
                }

                if context.group_visible(UiGroup::Patterns) {
                    let mut selected = context.params().active_pattern;
                    egui::ComboBox::from_id_salt("terrain_pattern")
                        .selected_text(selected.label())
                        .show_ui(ui, |ui| {
                            for pattern in Pattern::ALL {
                                ui.selectable_value(&mut selected, pattern, pattern.label());
                            }
                        });
                    if selected != context.params().active_pattern {
                        requests.push(ShadingRequest::SelectPattern(selected.index()));
                    }

                    ui.separator();
                    for param in ColorParam::ALL {
                        color_row(ui, &context, param, &mut requests);
                    }
                    for param in NumericParam::ALL {
                        if param.owner().is_none() && param != NumericParam::TextureRepeat {
                            slider(ui, &context, param, &mut requests);
                        }
                    }

                    ui.separator();
                    for pattern in Pattern::ALL {
                        pattern_section(ui, &context, pattern, &mut requests);
                    }
                }
            });
        });

    for request in requests {
        writer.write(request);
    }
}
