//! Which page is active and whether it is being read aloud.
//!
//! [`PlaybackMachine`] owns [`PlaybackState`] and is driven from one task:
//! commands arrive as method calls, and everything asynchronous (engine
//! results, end of audio) comes back as a [`PlaybackEvent`] on a channel.
//! Every event carries the [`RequestId`] it belongs to so results for a
//! superseded page are recognised and dropped.

use crate::engine::{AudioGenerationError, GeneratedAudio};

pub mod machine;
pub mod state;

pub use machine::PlaybackMachine;
pub use state::{HistoryEntry, PlaybackState, PlaybackStatus, ReadingHistory};

/// Identifies one generation/playback attempt for one page.
pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    AudioReady {
        request: RequestId,
        result: Result<GeneratedAudio, AudioGenerationError>,
    },
    /// The sink reached the natural end of the audio.
    Finished { request: RequestId },
    OutputFailed { request: RequestId, message: String },
}

/// Something the user should be told about after a playback operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackNotice {
    Error(String),
    PageUnavailable(u32),
    NoBook,
    StartOfBook,
    EndOfBook,
    /// Auto-advance started the given page.
    Advanced(u32),
}

impl PlaybackNotice {
    pub fn message(&self) -> String {
        match self {
            PlaybackNotice::Error(message) => message.clone(),
            PlaybackNotice::PageUnavailable(page) => format!("La página {page} no existe"),
            PlaybackNotice::NoBook => "No hay ningún libro cargado".to_string(),
            PlaybackNotice::StartOfBook => "Ya estás en la primera página".to_string(),
            PlaybackNotice::EndOfBook => "Fin del libro".to_string(),
            PlaybackNotice::Advanced(page) => format!("Página {page}"),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PlaybackNotice::Error(_))
    }
}
