use std::path::PathBuf;

use crate::enums::ViewKind;
use crate::scene::Viewport;

/// One pane of the render window.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportConfig {
    pub kind: ViewKind,
    pub rect: Viewport,
    pub background: [f32; 3],
}

/// Every tunable of the viewer. `Default` gives the stock three-pane layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub dataset_dir: PathBuf,
    pub window_title: String,
    pub window_size: (u32, u32),
    pub iso_value: f32,
    /// Applied to the shared camera after it is fitted to the volume.
    pub camera_zoom: f32,
    /// Resolution factor of frames rendered while the mouse drags.
    pub interactive_scale: f32,
    pub viewports: Vec<ViewportConfig>,
    pub label_position: (f32, f32),
    pub label_font_size: u32,
    pub info_position: (f32, f32),
    pub info_font_size: u32,
    pub info_color: [f32; 3],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("Skull_Dataset"),
            window_title: "DICOM Volume Viewer".to_string(),
            window_size: (1800, 800),
            iso_value: 310.0,
            camera_zoom: 1.2,
            interactive_scale: 0.35,
            viewports: vec![
                ViewportConfig {
                    kind: ViewKind::Volume,
                    rect: Viewport::new(0.0, 0.0, 0.3333, 1.0),
                    background: [0.10, 0.10, 0.12],
                },
                ViewportConfig {
                    kind: ViewKind::IsoSurface,
                    rect: Viewport::new(0.3333, 0.0, 0.6666, 1.0),
                    background: [0.08, 0.08, 0.10],
                },
                ViewportConfig {
                    kind: ViewKind::Combined,
                    rect: Viewport::new(0.6666, 0.0, 1.0, 1.0),
                    background: [0.10, 0.08, 0.10],
                },
            ],
            label_position: (0.02, 0.95),
            label_font_size: 20,
            info_position: (0.02, 0.06),
            info_font_size: 14,
            info_color: [0.9, 0.9, 0.9],
        }
    }
}

impl ViewerConfig {
    /// Title drawn in the top-left corner of a viewport.
    pub fn title(&self, kind: ViewKind) -> String {
        match kind {
            ViewKind::Volume => "Viewport 1: Volume Rendering".to_string(),
            ViewKind::IsoSurface => {
                format!("Viewport 2: Iso-surface (MC, value={})", self.iso_value)
            }
            ViewKind::Combined => "Viewport 3: Volume + Iso-surface".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_three_pane_layout() {
        let config = ViewerConfig::default();
        assert_eq!(config.dataset_dir, PathBuf::from("Skull_Dataset"));
        assert_eq!(config.window_size, (1800, 800));
        assert_eq!(config.iso_value, 310.0);
        let kinds: Vec<_> = config.viewports.iter().map(|v| v.kind).collect();
        assert_eq!(kinds, [ViewKind::Volume, ViewKind::IsoSurface, ViewKind::Combined]);
        assert_eq!(config.viewports[1].rect, Viewport::new(0.3333, 0.0, 0.6666, 1.0));
    }

    #[test]
    fn titles_carry_iso_value() {
        let mut config = ViewerConfig::default();
        assert_eq!(
            config.title(ViewKind::IsoSurface),
            "Viewport 2: Iso-surface (MC, value=310)"
        );
        config.iso_value = 150.5;
        assert_eq!(
            config.title(ViewKind::IsoSurface),
            "Viewport 2: Iso-surface (MC, value=150.5)"
        );
    }
}
