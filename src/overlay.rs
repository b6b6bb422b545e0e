//! Overlay presentation: the sink contract plus the style the overlay
//! should wear for a given settings snapshot.

use serde::Serialize;

use crate::settings::{OverlayPosition, Settings};

/// Renders or clears the translated line(s). `show` text uses `\n` between lines.
pub trait PresentationSink: Send {
    fn show(&mut self, text: &str);
    fn hide(&mut self);
    fn restyle(&mut self, _style: &OverlayStyle) {}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayStyle {
    pub anchor: OverlayPosition,
    /// CSS distance from the anchored edge.
    pub offset: &'static str,
    pub font_size_px: u32,
    pub color: String,
    pub background: String,
    pub padding: &'static str,
    pub border_radius: &'static str,
    pub opacity: f32,
}

impl OverlayStyle {
    pub fn from_settings(settings: &Settings) -> Self {
        let bg_alpha = if settings.show_background {
            f32::from(settings.bg_opacity.min(100)) / 100.0
        } else {
            0.0
        };
        let offset = match settings.position {
            OverlayPosition::Top => "10%",
            // Sits above the native captions.
            OverlayPosition::Bottom => "23%",
        };
        Self {
            anchor: settings.position,
            offset,
            font_size_px: settings.translated_size,
            color: settings.translated_color.clone(),
            background: format!("rgba(0, 0, 0, {bg_alpha})"),
            padding: if settings.show_background { "8px 16px" } else { "0" },
            border_radius: if settings.show_background { "4px" } else { "0" },
            opacity: f32::from(settings.text_opacity.min(100)) / 100.0,
        }
    }
}
