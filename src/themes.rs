use egui::style::{Selection, WidgetVisuals, Widgets};
use egui::{Color32, Stroke, Style, Visuals};

pub mod colorhash;

/// Flame surface background, independent of the chrome theme.
pub const SURFACE_BACKGROUND: Color32 = Color32::from_rgb(0x1e, 0x1e, 0x1e);
pub const AXIS_LINE: Color32 = Color32::from_rgb(0x44, 0x44, 0x44);
pub const TICK_MARK: Color32 = Color32::from_rgb(0x55, 0x55, 0x55);
pub const TICK_LABEL: Color32 = Color32::from_rgb(0xaa, 0xaa, 0xaa);
pub const SPAN_LABEL: Color32 = Color32::BLACK;
pub const LANE_LABEL: Color32 = Color32::WHITE;
pub const LANE_DIVIDER: Color32 = Color32::from_rgb(0x80, 0x80, 0x80);
pub const HINT_TEXT: Color32 = Color32::from_rgb(0xcc, 0xcc, 0xcc);
pub const PLACEHOLDER_TEXT: Color32 = Color32::from_rgb(0x66, 0x66, 0x66);

pub fn blend(a: Color32, b: Color32, t: f32) -> Color32 {
    let r = (a.r() as f32 * (1.0 - t) + b.r() as f32 * t).round() as u8;
    let g = (a.g() as f32 * (1.0 - t) + b.g() as f32 * t).round() as u8;
    let bch = (a.b() as f32 * (1.0 - t) + b.b() as f32 * t).round() as u8;
    Color32::from_rgb(r, g, bch)
}

fn chrome_visuals(
    foreground: Color32,
    background: Color32,
    accent: Color32,
    mut base_visuals: Visuals,
) -> Visuals {
    let border = blend(foreground, background, 0.4);
    let weak_text = blend(foreground, background, 0.55);
    let control_fill_hover = blend(background, foreground, 0.05);
    let control_fill_active = blend(control_fill_hover, accent, 0.12);
    let selection_fill = blend(background, foreground, 0.12);

    base_visuals.window_fill = background;
    base_visuals.panel_fill = background;
    base_visuals.weak_text_color = Some(weak_text);
    base_visuals.extreme_bg_color = control_fill_hover;
    base_visuals.selection = Selection {
        bg_fill: selection_fill,
        stroke: Stroke::new(1.5, accent),
    };
    base_visuals.window_stroke = Stroke::new(1.0, border);

    let widget = |fill: Color32, stroke: Stroke| WidgetVisuals {
        bg_fill: fill,
        weak_bg_fill: fill,
        bg_stroke: stroke,
        fg_stroke: Stroke::new(1.0, foreground),
        corner_radius: 2.0.into(),
        expansion: 0.0,
    };

    base_visuals.widgets = Widgets {
        noninteractive: widget(background, Stroke::new(1.0, border)),
        inactive: widget(background, Stroke::new(1.0, border)),
        hovered: widget(control_fill_hover, Stroke::new(1.4, border)),
        active: widget(control_fill_active, Stroke::new(1.4, accent)),
        open: widget(control_fill_hover, Stroke::new(1.4, accent)),
    };
    base_visuals.window_shadow = egui::epaint::Shadow::NONE;

    base_visuals
}

/// Viewer chrome (selector bar, tooltips) for the detected system theme.
pub fn chrome(dark_mode: bool) -> Style {
    let accent = Color32::from_rgb(0xff, 0x8e, 0x25);
    let visuals = if dark_mode {
        chrome_visuals(
            Color32::from_rgb(0xe6, 0xe6, 0xe6),
            Color32::from_rgb(0x26, 0x26, 0x26),
            accent,
            Visuals::dark(),
        )
    } else {
        chrome_visuals(
            Color32::from_rgb(0x1e, 0x1e, 0x1e),
            Color32::from_rgb(0xf2, 0xf2, 0xf2),
            accent,
            Visuals::light(),
        )
    };

    let mut style = Style::default();
    style.spacing.item_spacing = egui::vec2(12.0, 8.0);
    style.spacing.button_padding = egui::vec2(10.0, 6.0);
    style.visuals = visuals;
    style
}

/// Installs light and dark chrome and follows the system preference.
pub fn install(ctx: &egui::Context) {
    ctx.set_style_of(egui::Theme::Light, chrome(false));
    ctx.set_style_of(egui::Theme::Dark, chrome(true));
    let theme = match dark_light::detect() {
        Ok(dark_light::Mode::Light) => egui::ThemePreference::Light,
        Ok(dark_light::Mode::Dark) => egui::ThemePreference::Dark,
        Ok(dark_light::Mode::Unspecified) | Err(_) => egui::ThemePreference::Dark,
    };
    ctx.set_theme(theme);
}
