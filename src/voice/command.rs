use std::fmt;

use serde::{Deserialize, Serialize};

/// Colour schemes the reading view can switch between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    #[default]
    Light,
    Sepia,
    Dark,
    HighContrast,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Sepia => "sepia",
            Theme::Dark => "dark",
            Theme::HighContrast => "high-contrast",
        }
    }

    /// Nombre del tema tal y como se anuncia al usuario.
    pub fn spoken_name(self) -> &'static str {
        match self {
            Theme::Light => "claro",
            Theme::Sepia => "sepia",
            Theme::Dark => "oscuro",
            Theme::HighContrast => "alto contraste",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A spoken instruction after interpretation.
///
/// Commands are plain values: they carry no state and are never mutated
/// once produced by [`crate::voice::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    NextPage,
    PreviousPage,
    Play,
    Pause,
    Stop,
    IncreaseSpeed,
    DecreaseSpeed,
    IncreaseVolume,
    DecreaseVolume,
    /// Jump to a 1-based page number. Build it with [`Command::go_to_page`].
    GoToPage(u32),
    ZoomIn,
    ZoomOut,
    SetTheme(Theme),
    OpenLibrary,
    ShowHelp,
    WhereAmI,
    RepeatLastFeedback,
    Unrecognized(String),
}

impl Command {
    /// Returns `None` for page `0`, keeping `GoToPage` 1-based.
    pub fn go_to_page(page: u32) -> Option<Self> {
        (page >= 1).then_some(Command::GoToPage(page))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::NextPage => "nextPage",
            Command::PreviousPage => "previousPage",
            Command::Play => "play",
            Command::Pause => "pause",
            Command::Stop => "stop",
            Command::IncreaseSpeed => "increaseSpeed",
            Command::DecreaseSpeed => "decreaseSpeed",
            Command::IncreaseVolume => "increaseVolume",
            Command::DecreaseVolume => "decreaseVolume",
            Command::GoToPage(_) => "goToPage",
            Command::ZoomIn => "zoomIn",
            Command::ZoomOut => "zoomOut",
            Command::SetTheme(_) => "setTheme",
            Command::OpenLibrary => "openLibrary",
            Command::ShowHelp => "showHelp",
            Command::WhereAmI => "whereAmI",
            Command::RepeatLastFeedback => "repeatLastFeedback",
            Command::Unrecognized(_) => "unrecognized",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go_to_page_rejects_zero() {
        assert_eq!(Command::go_to_page(0), None);
        assert_eq!(Command::go_to_page(4), Some(Command::GoToPage(4)));
    }

    #[test]
    fn theme_serialises_kebab_case() {
        let json = serde_json::to_string(&Theme::HighContrast).unwrap();
        assert_eq!(json, "\"high-contrast\"");
        assert_eq!(Theme::HighContrast.to_string(), "high-contrast");
    }
}
