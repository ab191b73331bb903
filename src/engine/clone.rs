//! Cloned-voice synthesis: an instant ElevenLabs voice built from a WAV
//! sample of the reader's own voice.

use async_trait::async_trait;
use log::{debug, error, info};
use parking_lot::Mutex;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;

use super::{
    text, AudioEngine, AudioFormat, AudioGenerationError, EngineKind, GeneratedAudio,
    SynthesisRequest,
};

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io/v1";

pub struct ClonedVoiceEngine {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    sample: Option<Vec<u8>>,
    voice_id: Mutex<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct CreatedVoice {
    voice_id: Option<String>,
    #[serde(rename = "voiceId")]
    voice_id_camel: Option<String>,
    id: Option<String>,
}

impl CreatedVoice {
    fn into_id(self) -> Option<String> {
        self.voice_id.or(self.voice_id_camel).or(self.id)
    }
}

impl ClonedVoiceEngine {
    pub fn new(api_key: String, sample: Option<Vec<u8>>) -> Self {
        Self::with_base_url(api_key, sample, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, sample: Option<Vec<u8>>, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            sample,
            voice_id: Mutex::new(None),
        }
    }

    fn check_ready(&self) -> Result<&[u8], AudioGenerationError> {
        if self.api_key.is_empty() {
            return Err(AudioGenerationError::Unknown(
                "Falta la API Key de ElevenLabs".to_string(),
            ));
        }
        self.sample
            .as_deref()
            .filter(|sample| !sample.is_empty())
            .ok_or_else(|| {
                AudioGenerationError::UnsupportedVoice(
                    "no hay muestra de voz para clonar".to_string(),
                )
            })
    }

    async fn ensure_voice(&self, sample: &[u8]) -> Result<String, AudioGenerationError> {
        let cached = self.voice_id.lock().clone();
        if let Some(id) = cached {
            return Ok(id);
        }

        let name = format!("temp-clone-{}", OffsetDateTime::now_utc().unix_timestamp());
        info!("Creating cloned voice {name}");
        let file = Part::bytes(sample.to_vec())
            .file_name("sample.wav")
            .mime_str("audio/wav")
            .map_err(AudioGenerationError::from)?;
        let form = Form::new()
            .text("name", name)
            .text("description", "Voz clonada para lectura en voz alta")
            .part("files", file);

        let response = self
            .client
            .post(format!("{}/voices/add", self.base_url))
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!("ElevenLabs voice creation failed {status}: {body}");
            return Err(AudioGenerationError::from_status(status, body));
        }

        let created: CreatedVoice = response.json().await?;
        let id = created.into_id().ok_or_else(|| {
            AudioGenerationError::Unknown("No se obtuvo voice_id de ElevenLabs".to_string())
        })?;
        *self.voice_id.lock() = Some(id.clone());
        Ok(id)
    }
}

fn speech_body(text: &str) -> serde_json::Value {
    json!({
        "text": text,
        "voice_settings": {
            "stability": 0.75,
            "similarity_boost": 0.75
        }
    })
}

#[async_trait]
impl AudioEngine for ClonedVoiceEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::ClonedVoice
    }

    async fn generate(
        &self,
        request: &SynthesisRequest,
    ) -> Result<GeneratedAudio, AudioGenerationError> {
        let sample = self.check_ready()?;
        // Unlike Gemini, the whole page is sent.
        let text = text::clean(&request.text);
        if text.is_empty() {
            return Err(AudioGenerationError::Unknown("El texto está vacío".to_string()));
        }

        let voice_id = self.ensure_voice(sample).await?;
        let response = self
            .client
            .post(format!("{}/text-to-speech/{voice_id}/stream", self.base_url))
            .header("xi-api-key", &self.api_key)
            .json(&speech_body(&text))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!("ElevenLabs synthesis failed {status}: {body}");
            if status == 404 {
                // The temporary voice may have been removed server side.
                self.voice_id.lock().take();
            }
            return Err(AudioGenerationError::from_status(status, body));
        }

        let bytes = response.bytes().await?.to_vec();
        debug!("ElevenLabs returned {} audio bytes", bytes.len());
        Ok(GeneratedAudio {
            bytes,
            format: AudioFormat::Mp3,
        })
    }
}
