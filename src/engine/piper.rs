use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::{io::AsyncWriteExt, process::Command};

use super::{AudioEngine, AudioFormat, AudioGenerationError, EngineKind, GeneratedAudio, SynthesisRequest};
use crate::util::piper_path::{command_to_args, PiperCommand};
use crate::voices::VoiceLibrary;

/// Removes Piper's output file however generation ends.
struct TempOutput(PathBuf);

impl Drop for TempOutput {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => debug!("Could not remove {}: {err}", self.0.display()),
        }
    }
}

/// On-device synthesis through a Piper subprocess.
pub struct PiperEngine {
    command: PiperCommand,
    voices: Arc<VoiceLibrary>,
    output_dir: PathBuf,
    default_voice: Option<String>,
    counter: AtomicU64,
}

impl PiperEngine {
    pub fn new(
        command: PiperCommand,
        voices: Arc<VoiceLibrary>,
        output_dir: PathBuf,
        default_voice: Option<String>,
    ) -> Self {
        Self {
            command,
            voices,
            output_dir,
            default_voice,
            counter: AtomicU64::new(0),
        }
    }

    fn output_path(&self) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.output_dir
            .join(format!("piper-{}-{n}.wav", std::process::id()))
    }

    fn build_command(&self, model: &Path, output: &Path, rate: f32) -> Command {
        let (program, args) = command_to_args(&self.command);
        let mut command = Command::new(program);
        command.args(args);
        command.arg("--model").arg(model);
        command.arg("--output_file").arg(output);
        if (rate - 1.0).abs() > f32::EPSILON && rate > 0.0 {
            command.arg("--length_scale").arg(format!("{:.3}", 1.0 / rate));
        }
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl AudioEngine for PiperEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Local
    }

    async fn generate(
        &self,
        request: &SynthesisRequest,
    ) -> Result<GeneratedAudio, AudioGenerationError> {
        let selector = request.voice.as_deref().or(self.default_voice.as_deref());
        let voice = self
            .voices
            .select(selector)
            .map_err(|err| AudioGenerationError::UnsupportedVoice(err.to_string()))?;
        if !voice.model_path.exists() {
            return Err(AudioGenerationError::UnsupportedVoice(format!(
                "modelo no encontrado: {}",
                voice.model_path.display()
            )));
        }

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|err| {
                AudioGenerationError::Unknown(format!(
                    "no se pudo crear {}: {err}",
                    self.output_dir.display()
                ))
            })?;

        let output = TempOutput(self.output_path());
        let output_path = output.0.as_path();
        info!(
            "Invoking Piper with voice {} writing to {}",
            voice.id,
            output_path.display()
        );
        let start = Instant::now();
        let mut child = self
            .build_command(&voice.model_path, output_path, request.rate)
            .spawn()
            .map_err(|err| AudioGenerationError::Unknown(format!("no se pudo lanzar Piper: {err}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(request.text.as_bytes())
                .await
                .map_err(|err| AudioGenerationError::Unknown(err.to_string()))?;
        }

        let finished = child
            .wait_with_output()
            .await
            .map_err(|err| AudioGenerationError::Unknown(err.to_string()))?;
        let stderr = String::from_utf8_lossy(&finished.stderr).trim().to_string();

        if !finished.status.success() {
            let code = finished.status.code().unwrap_or_default();
            error!("Piper exited with status {code}: {stderr}");
            return Err(AudioGenerationError::Unknown(format!(
                "Piper terminó con estado {code}: {stderr}"
            )));
        }
        if !stderr.is_empty() {
            debug!("Piper stderr: {stderr}");
        }

        let bytes = tokio::fs::read(output_path).await.map_err(|err| {
            warn!(
                "Piper succeeded but {} could not be read: {err}",
                output_path.display()
            );
            AudioGenerationError::Unknown(format!("Piper no generó audio: {err}"))
        })?;
        debug!("Piper finished in {} ms", start.elapsed().as_millis());

        Ok(GeneratedAudio {
            bytes,
            format: AudioFormat::Wav,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    fn engine_with_script(temp: &TempDir, script: &str) -> PiperEngine {
        let voices_dir = temp.child("voices");
        voices_dir.child("es_ES-test.onnx").touch().unwrap();
        let script_path = temp.child("mock_piper.sh");
        script_path.write_str(script).unwrap();
        PiperEngine::new(
            PiperCommand::Custom(vec![
                "sh".into(),
                script_path.path().to_string_lossy().into_owned(),
            ]),
            Arc::new(VoiceLibrary::new(voices_dir.path().to_path_buf())),
            temp.path().join("out"),
            None,
        )
    }

    fn request(text: &str) -> SynthesisRequest {
        SynthesisRequest {
            text: text.into(),
            voice: None,
            rate: 1.0,
        }
    }

    const WRITE_STDIN: &str = r#"OUT=""
while [ "$#" -gt 0 ]; do
  if [ "$1" = "--output_file" ]; then
    shift
    OUT="$1"
  fi
  shift
done
printf 'WAV:' > "$OUT"
cat >> "$OUT"
"#;

    #[tokio::test]
    async fn synthesizes_text_from_stdin() {
        let temp = TempDir::new().unwrap();
        let engine = engine_with_script(&temp, WRITE_STDIN);
        let audio = engine.generate(&request("hola")).await.unwrap();
        assert_eq!(audio.bytes, b"WAV:hola");
        assert_eq!(audio.format, AudioFormat::Wav);
    }

    #[tokio::test]
    async fn unknown_voice_is_unsupported() {
        let temp = TempDir::new().unwrap();
        let engine = engine_with_script(&temp, WRITE_STDIN);
        let mut request = request("hola");
        request.voice = Some("en_US-missing".into());
        let error = engine.generate(&request).await.unwrap_err();
        assert_eq!(error.code(), "unsupported_voice");
    }

    #[tokio::test]
    async fn process_failure_is_reported() {
        let temp = TempDir::new().unwrap();
        let engine = engine_with_script(&temp, "cat > /dev/null\necho boom >&2\nexit 2\n");
        let error = engine.generate(&request("hola")).await.unwrap_err();
        match error {
            AudioGenerationError::Unknown(message) => assert!(message.contains("boom")),
            other => panic!("Error inesperado: {other:?}"),
        }
    }

    fn leftover_wavs(temp: &TempDir) -> usize {
        std::fs::read_dir(temp.path().join("out"))
            .map(|entries| entries.flatten().count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn output_file_is_removed_after_success() {
        let temp = TempDir::new().unwrap();
        let engine = engine_with_script(&temp, WRITE_STDIN);
        engine.generate(&request("hola")).await.unwrap();
        assert_eq!(leftover_wavs(&temp), 0);
    }

    #[tokio::test]
    async fn partial_output_is_removed_when_piper_fails() {
        let temp = TempDir::new().unwrap();
        let script = WRITE_STDIN.to_string() + "exit 3\n";
        let engine = engine_with_script(&temp, &script);
        assert!(engine.generate(&request("hola")).await.is_err());
        assert_eq!(leftover_wavs(&temp), 0);
    }

    #[test]
    fn rate_becomes_length_scale() {
        let temp = TempDir::new().unwrap();
        let engine = engine_with_script(&temp, WRITE_STDIN);
        let command = engine.build_command(Path::new("v.onnx"), Path::new("o.wav"), 2.0);
        let args: Vec<String> = command
            .as_std()
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert!(args.windows(2).any(|w| w[0] == "--length_scale" && w[1] == "0.500"));
    }
}
