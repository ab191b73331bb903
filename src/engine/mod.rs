//! Audio-generation backends.
//!
//! The playback machine depends only on [`AudioEngine`]; which variant is
//! active (on-device Piper, Gemini cloud voices or an ElevenLabs cloned
//! voice) is a configuration detail.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod clone;
pub mod gemini;
pub mod piper;
pub mod text;

pub use clone::ClonedVoiceEngine;
pub use gemini::GeminiEngine;
pub use piper::PiperEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Local,
    Cloud,
    ClonedVoice,
}

impl EngineKind {
    /// Request/response engines have a visible loading phase before audio
    /// is ready; the local engine starts speaking straight away.
    pub fn has_generation_phase(self) -> bool {
        !matches!(self, EngineKind::Local)
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EngineKind::Local => "local",
            EngineKind::Cloud => "cloud",
            EngineKind::ClonedVoice => "clone",
        })
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "local" | "piper" => Ok(EngineKind::Local),
            "cloud" | "gemini" => Ok(EngineKind::Cloud),
            "clone" | "cloned" | "custom-voice" => Ok(EngineKind::ClonedVoice),
            other => Err(format!("motor de voz desconocido: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub text: String,
    /// Engine-specific voice id; `None` selects the engine default.
    pub voice: Option<String>,
    pub rate: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    /// Raw signed 16-bit little-endian mono samples.
    Pcm16 { sample_rate: u32 },
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Pcm16 { .. } => "pcm",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAudio {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioGenerationError {
    #[error("cuota agotada: {0}")]
    QuotaExceeded(String),
    #[error("el modelo se está cargando: {0}")]
    ModelLoading(String),
    #[error("error de red: {0}")]
    Network(String),
    #[error("voz no soportada: {0}")]
    UnsupportedVoice(String),
    #[error("{0}")]
    Unknown(String),
}

impl AudioGenerationError {
    pub fn code(&self) -> &'static str {
        match self {
            AudioGenerationError::QuotaExceeded(_) => "quota_exceeded",
            AudioGenerationError::ModelLoading(_) => "model_loading",
            AudioGenerationError::Network(_) => "network",
            AudioGenerationError::UnsupportedVoice(_) => "unsupported_voice",
            AudioGenerationError::Unknown(_) => "unknown",
        }
    }

    /// Short message shown to the user when playback fails.
    pub fn user_message(&self) -> String {
        match self {
            AudioGenerationError::QuotaExceeded(_) => "Cuota agotada.".to_string(),
            AudioGenerationError::ModelLoading(_) => {
                "El modelo se está cargando, inténtalo en unos segundos.".to_string()
            }
            AudioGenerationError::Network(_) => "No hay conexión con el servicio de voz.".to_string(),
            AudioGenerationError::UnsupportedVoice(voice) => format!("Voz no disponible: {voice}"),
            AudioGenerationError::Unknown(message) => format!("No se pudo generar el audio: {message}"),
        }
    }

    /// Map a non-success HTTP status from a TTS provider.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            429 => AudioGenerationError::QuotaExceeded(body),
            503 => AudioGenerationError::ModelLoading(body),
            400 | 404 | 422 if body.to_lowercase().contains("voice") => {
                AudioGenerationError::UnsupportedVoice(body)
            }
            _ => AudioGenerationError::Unknown(format!("HTTP {status}: {body}")),
        }
    }
}

impl From<reqwest::Error> for AudioGenerationError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            AudioGenerationError::Unknown(value.to_string())
        } else {
            AudioGenerationError::Network(value.to_string())
        }
    }
}

/// One text-to-speech backend.
///
/// Dropping the returned future must abort the work (kill the process,
/// abort the HTTP request); cancellation relies on it.
#[async_trait]
pub trait AudioEngine: Send + Sync {
    fn kind(&self) -> EngineKind;

    async fn generate(
        &self,
        request: &SynthesisRequest,
    ) -> Result<GeneratedAudio, AudioGenerationError>;
}
