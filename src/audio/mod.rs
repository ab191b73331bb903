//! Audio output for generated narration.
//!
//! [`AudioSink`] is the seam between the playback machine and whatever
//! actually renders audio. Sinks report natural end-of-audio (and late
//! failures) back to the machine as [`PlaybackEvent`]s tagged with the
//! request that produced the audio, so results for superseded requests
//! can be told apart.

use thiserror::Error;

use crate::engine::GeneratedAudio;
use crate::playback::RequestId;

pub mod export;
#[cfg(feature = "speaker")]
pub mod speaker;

pub use export::ExportSink;
#[cfg(feature = "speaker")]
pub use speaker::SpeakerSink;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioSinkError {
    #[error("no se pudo escribir el audio: {0}")]
    Io(String),
    #[error("el audio está corrupto: {0}")]
    Decode(String),
    #[error("no se encontró dispositivo de reproducción")]
    Device,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayRequest {
    pub request: RequestId,
    pub page: u32,
    pub audio: GeneratedAudio,
    pub rate: f32,
    pub volume: f32,
}

pub trait AudioSink: Send + Sync {
    /// Start playing, replacing anything currently audible.
    fn play(&self, request: PlayRequest) -> Result<(), AudioSinkError>;
    fn pause(&self);
    fn resume(&self);
    /// Silence and release the current source. No end-of-audio is reported.
    fn stop(&self);
    fn set_volume(&self, volume: f32);
    fn set_rate(&self, rate: f32);
}
