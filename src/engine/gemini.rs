//! Cloud neural voices through the Gemini text-to-speech API.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, error, info};
use serde::Deserialize;
use serde_json::json;

use super::{
    text, AudioEngine, AudioFormat, AudioGenerationError, EngineKind, GeneratedAudio,
    SynthesisRequest,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const MODEL: &str = "gemini-2.5-flash-preview-tts";
const DEFAULT_SAMPLE_RATE: u32 = 24_000;

pub const VOICES: &[&str] = &["Puck", "Charon", "Kore", "Fenrir", "Zephyr"];
pub const DEFAULT_VOICE: &str = "Kore";

pub struct GeminiEngine {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiEngine {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    data: String,
    #[serde(default)]
    mime_type: Option<String>,
}

fn resolve_voice(selector: Option<&str>) -> Result<&'static str, AudioGenerationError> {
    match selector {
        None => Ok(DEFAULT_VOICE),
        Some(name) => VOICES
            .iter()
            .copied()
            .find(|voice| voice.eq_ignore_ascii_case(name))
            .ok_or_else(|| AudioGenerationError::UnsupportedVoice(name.to_string())),
    }
}

fn prepare_text(raw: &str) -> Result<String, AudioGenerationError> {
    let cleaned = text::clean(raw);
    if cleaned.is_empty() {
        return Err(AudioGenerationError::Unknown("El texto está vacío".to_string()));
    }
    Ok(text::truncate_for_remote(&cleaned))
}

fn request_body(text: &str, voice: &str) -> serde_json::Value {
    json!({
        "contents": [{ "parts": [{ "text": text }] }],
        "generationConfig": {
            "responseModalities": ["AUDIO"],
            "speechConfig": {
                "voiceConfig": {
                    "prebuiltVoiceConfig": { "voiceName": voice }
                }
            }
        }
    })
}

/// Reads the `rate=` parameter of an `audio/L16;codec=pcm;rate=24000` mime type.
fn sample_rate(mime_type: Option<&str>) -> u32 {
    mime_type
        .and_then(|mime| {
            mime.split(';')
                .filter_map(|param| param.trim().strip_prefix("rate="))
                .find_map(|rate| rate.parse().ok())
        })
        .unwrap_or(DEFAULT_SAMPLE_RATE)
}

fn decode_response(response: GenerateResponse) -> Result<GeneratedAudio, AudioGenerationError> {
    let inline = response
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .find_map(|part| part.inline_data)
        .ok_or_else(|| AudioGenerationError::Unknown("La IA no devolvió audio.".to_string()))?;

    let bytes = STANDARD
        .decode(inline.data.as_bytes())
        .map_err(|err| AudioGenerationError::Unknown(format!("audio base64 inválido: {err}")))?;
    let mime = inline.mime_type.as_deref();
    let format = match mime {
        Some(mime) if mime.contains("mp3") || mime.contains("mpeg") => AudioFormat::Mp3,
        Some(mime) if mime.contains("wav") => AudioFormat::Wav,
        _ => AudioFormat::Pcm16 {
            sample_rate: sample_rate(mime),
        },
    };
    Ok(GeneratedAudio { bytes, format })
}

#[async_trait]
impl AudioEngine for GeminiEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Cloud
    }

    async fn generate(
        &self,
        request: &SynthesisRequest,
    ) -> Result<GeneratedAudio, AudioGenerationError> {
        let voice = resolve_voice(request.voice.as_deref())?;
        let text = prepare_text(&request.text)?;
        if self.api_key.len() < 10 {
            return Err(AudioGenerationError::Unknown(
                "API Key de Gemini no válida".to_string(),
            ));
        }

        info!(
            "Requesting Gemini audio with voice {voice} for {} chars",
            text.chars().count()
        );
        let url = format!("{}/models/{MODEL}:generateContent", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(&text, voice))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!("Gemini TTS error {status}: {body}");
            return Err(AudioGenerationError::from_status(status, body));
        }

        let parsed: GenerateResponse = response.json().await?;
        let audio = decode_response(parsed)?;
        debug!("Gemini returned {} audio bytes", audio.bytes.len());
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voices_are_matched_case_insensitively() {
        assert_eq!(resolve_voice(None), Ok("Kore"));
        assert_eq!(resolve_voice(Some("puck")), Ok("Puck"));
        assert_eq!(
            resolve_voice(Some("Nova")),
            Err(AudioGenerationError::UnsupportedVoice("Nova".into()))
        );
    }

    #[test]
    fn empty_text_is_rejected_before_request() {
        assert!(matches!(
            prepare_text("  [pie de página]  "),
            Err(AudioGenerationError::Unknown(_))
        ));
    }

    #[test]
    fn body_selects_prebuilt_voice() {
        let body = request_body("Hola", "Zephyr");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Hola");
        assert_eq!(
            body["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
                ["voiceName"],
            "Zephyr"
        );
    }

    #[test]
    fn decodes_inline_pcm_audio() {
        let payload = STANDARD.encode([1u8, 2, 3, 4]);
        let json = format!(
            r#"{{"candidates":[{{"content":{{"parts":[{{"inlineData":{{"mimeType":"audio/L16;codec=pcm;rate=22050","data":"{payload}"}}}}]}}}}]}}"#
        );
        let response: GenerateResponse = serde_json::from_str(&json).unwrap();
        let audio = decode_response(response).unwrap();
        assert_eq!(audio.bytes, vec![1, 2, 3, 4]);
        assert_eq!(
            audio.format,
            AudioFormat::Pcm16 {
                sample_rate: 22_050
            }
        );
    }

    #[test]
    fn missing_audio_is_an_error() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{}]}}]}"#).unwrap();
        assert!(decode_response(response).is_err());
    }

    #[tokio::test]
    async fn short_api_key_fails_without_network() {
        let engine = GeminiEngine::with_base_url("abc".into(), "http://127.0.0.1:9".into());
        let error = engine
            .generate(&SynthesisRequest {
                text: "Hola".into(),
                voice: None,
                rate: 1.0,
            })
            .await
            .unwrap_err();
        assert_eq!(error.code(), "unknown");
    }
}
