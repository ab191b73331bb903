use log::debug;
use serde::Serialize;

use crate::voice::Theme;

pub const DEFAULT_FONT_SIZE: u32 = 20;
pub const MIN_FONT_SIZE: u32 = 16;
pub const MAX_FONT_SIZE: u32 = 48;
const FONT_STEP: u32 = 2;

/// Presentation flags the UI layer renders from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSettings {
    pub font_size: u32,
    pub theme: Theme,
    pub library_open: bool,
    pub help_open: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            theme: Theme::default(),
            library_open: false,
            help_open: false,
        }
    }
}

impl ViewSettings {
    pub fn zoom_in(&mut self) {
        self.font_size = (self.font_size + FONT_STEP).min(MAX_FONT_SIZE);
        debug!("Font size {}", self.font_size);
    }

    pub fn zoom_out(&mut self) {
        self.font_size = self.font_size.saturating_sub(FONT_STEP).max(MIN_FONT_SIZE);
        debug!("Font size {}", self.font_size);
    }

    pub fn set_theme(&mut self, theme: Theme) {
        debug!("Theme {theme}");
        self.theme = theme;
    }

    pub fn open_library(&mut self) {
        self.library_open = true;
    }

    pub fn show_help(&mut self) {
        self.help_open = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_is_clamped() {
        let mut view = ViewSettings::default();
        for _ in 0..20 {
            view.zoom_in();
        }
        assert_eq!(view.font_size, MAX_FONT_SIZE);
        for _ in 0..20 {
            view.zoom_out();
        }
        assert_eq!(view.font_size, MIN_FONT_SIZE);
    }

    #[test]
    fn defaults_to_light_theme() {
        let mut view = ViewSettings::default();
        assert_eq!(view.theme, Theme::Light);
        view.set_theme(Theme::Sepia);
        assert_eq!(view.theme, Theme::Sepia);
    }
}
