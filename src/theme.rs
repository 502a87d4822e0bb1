use crate::ui::action_link::ActionLink;
use eframe::egui::{self, Color32, CornerRadius, FontId, Frame, Margin, Stroke, TextStyle};

/// Colors and metrics for the console, named after the page states they mark.
#[derive(Debug, Clone)]
pub struct Theme {
    pub page_fill: Color32,
    pub card_fill: Color32,
    pub drop_zone_fill: Color32,
    pub drop_zone_outline: Color32,
    pub accent: Color32,
    pub accent_pressed: Color32,
    pub text: Color32,
    pub text_muted: Color32,
    pub text_on_accent: Color32,
    /// Catalog entries already present in the selection.
    pub catalog_taken: Color32,
    pub link_navigate: Color32,
    pub link_submit: Color32,
    pub link_confirm: Color32,
    pub busy: Color32,
    pub error: Color32,
    pub response_ok: Color32,
    pub gap_small: f32,
    pub gap: f32,
    pub gap_large: f32,
    pub corner: u8,
    pub card_corner: u8,
    pub control_height: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            page_fill: Color32::from_rgb(0x14, 0x19, 0x1D),
            card_fill: Color32::from_rgb(0x1B, 0x22, 0x27),
            drop_zone_fill: Color32::from_rgb(0x21, 0x2B, 0x30),
            drop_zone_outline: Color32::from_rgba_premultiplied(0x0E, 0x9F, 0x8E, 90),
            accent: Color32::from_rgb(0x0E, 0x9F, 0x8E),
            accent_pressed: Color32::from_rgb(0x0B, 0x7A, 0x6E),
            text: Color32::from_rgb(0xE4, 0xEB, 0xEE),
            text_muted: Color32::from_rgb(0x88, 0x95, 0x9B),
            text_on_accent: Color32::WHITE,
            catalog_taken: Color32::from_rgb(0x5A, 0x66, 0x6C),
            link_navigate: Color32::from_rgb(0x5C, 0xB8, 0xE6),
            link_submit: Color32::from_rgb(0xE0, 0xB0, 0x4C),
            link_confirm: Color32::from_rgb(0xE5, 0x53, 0x4B),
            busy: Color32::from_rgb(0x0E, 0x9F, 0x8E),
            error: Color32::from_rgb(0xE5, 0x53, 0x4B),
            response_ok: Color32::from_rgb(0x4C, 0xC3, 0x7A),
            gap_small: 4.0,
            gap: 8.0,
            gap_large: 12.0,
            corner: 6,
            card_corner: 10,
            control_height: 32.0,
        }
    }
}

impl Theme {
    pub fn apply_visuals(&self, ctx: &egui::Context) {
        let mut visuals = egui::Visuals::dark();
        visuals.panel_fill = self.page_fill;
        visuals.window_fill = self.card_fill;
        visuals.override_text_color = Some(self.text);
        visuals.hyperlink_color = self.link_navigate;
        visuals.selection.bg_fill = self.accent_pressed;

        let widgets = &mut visuals.widgets;
        for state in [
            &mut widgets.noninteractive,
            &mut widgets.inactive,
            &mut widgets.hovered,
            &mut widgets.open,
        ] {
            state.bg_stroke = Stroke::NONE;
            state.fg_stroke.color = self.text;
        }
        widgets.inactive.bg_fill = self.drop_zone_fill;
        widgets.inactive.weak_bg_fill = self.drop_zone_fill;
        widgets.hovered.bg_fill = self.accent_pressed;
        widgets.active.bg_fill = self.accent;
        widgets.active.fg_stroke.color = self.text_on_accent;

        let mut style = (*ctx.style()).clone();
        style.visuals = visuals;
        style.spacing.item_spacing = egui::vec2(self.gap, self.gap);
        style.spacing.button_padding = egui::vec2(self.gap_large, self.gap_small);
        style.text_styles.insert(TextStyle::Heading, FontId::proportional(18.0));
        style.text_styles.insert(TextStyle::Body, FontId::proportional(14.0));
        style.text_styles.insert(TextStyle::Monospace, FontId::monospace(13.0));
        style.text_styles.insert(TextStyle::Small, FontId::proportional(12.0));
        ctx.set_style(style);
    }

    /// Surface for forms, the search panel and the link bar.
    pub fn card_frame(&self) -> Frame {
        Frame::new()
            .fill(self.card_fill)
            .inner_margin(Margin::same(self.gap_large as i8))
            .corner_radius(CornerRadius::same(self.card_corner))
    }

    /// The selection column; outlined while a drag hovers over it.
    pub fn drop_zone_frame(&self, drag_active: bool) -> Frame {
        let stroke = if drag_active {
            Stroke::new(1.5, self.drop_zone_outline)
        } else {
            Stroke::NONE
        };
        Frame::new()
            .fill(self.drop_zone_fill)
            .stroke(stroke)
            .inner_margin(Margin::same(self.gap as i8))
            .corner_radius(CornerRadius::same(self.corner))
    }

    pub fn catalog_entry_color(&self, selected: bool) -> Color32 {
        if selected {
            self.catalog_taken
        } else {
            self.text
        }
    }

    /// Links are colored by what a click does: navigate, submit, or ask first.
    pub fn link_color(&self, link: &ActionLink) -> Color32 {
        if !link.intercepted() {
            self.link_navigate
        } else if link
            .confirm
            .as_deref()
            .is_some_and(|message| !message.trim().is_empty())
        {
            self.link_confirm
        } else {
            self.link_submit
        }
    }

    fn on_accent_text(&self, label: impl Into<String>) -> egui::RichText {
        egui::RichText::new(label).color(self.text_on_accent).size(13.0)
    }

    pub fn submit_button(&self, label: impl Into<String>) -> egui::Button<'static> {
        egui::Button::new(self.on_accent_text(label))
            .fill(self.accent)
            .corner_radius(CornerRadius::same(self.corner))
            .min_size(egui::vec2(0.0, self.control_height))
    }

    pub fn secondary_button(&self, label: impl Into<String>) -> egui::Button<'static> {
        egui::Button::new(label.into())
            .stroke(Stroke::new(1.0, self.text_muted))
            .corner_radius(CornerRadius::same(self.corner))
            .min_size(egui::vec2(0.0, self.control_height))
    }

    pub fn destructive_button(&self, label: impl Into<String>) -> egui::Button<'static> {
        egui::Button::new(self.on_accent_text(label))
            .fill(self.link_confirm)
            .corner_radius(CornerRadius::same(self.corner))
            .min_size(egui::vec2(0.0, self.control_height))
    }
}
