use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use log::debug;
use shlex::Shlex;

use crate::book::pdf::DEFAULT_PDF_COMMAND;
use crate::engine::EngineKind;
use crate::voice::session::{DEFAULT_RESTART_ATTEMPTS, MAX_RESTART_ATTEMPTS};

/// Everything the reader needs from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderConfig {
    pub runtime_dir: PathBuf,
    pub voices_dir: PathBuf,
    pub output_dir: PathBuf,
    pub library_dir: PathBuf,
    pub engine: EngineKind,
    pub voice: Option<String>,
    pub gemini_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub voice_sample: Option<PathBuf>,
    pub pdf_command: Vec<String>,
    pub restart_attempts: u32,
}

fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn path_var(key: &str, default: impl Into<PathBuf>) -> PathBuf {
    var(key).map(PathBuf::from).unwrap_or_else(|| default.into())
}

impl ReaderConfig {
    pub fn from_env() -> Result<Self> {
        let runtime_dir = path_var("READER_RUNTIME_DIR", "runtime");
        let voices_dir = path_var("READER_VOICES_DIR", "assets/voices");
        let output_dir = path_var("READER_OUTPUT_DIR", runtime_dir.join("output"));
        let library_dir = path_var("READER_LIBRARY_DIR", runtime_dir.join("library"));

        let engine = match var("READER_ENGINE") {
            Some(raw) => raw
                .parse::<EngineKind>()
                .map_err(anyhow::Error::msg)
                .context("invalid READER_ENGINE")?,
            None => EngineKind::Local,
        };

        let pdf_raw = var("READER_PDF_COMMAND").unwrap_or_else(|| DEFAULT_PDF_COMMAND.to_string());
        let pdf_command: Vec<String> = Shlex::new(&pdf_raw).collect();
        if pdf_command.is_empty() {
            bail!("READER_PDF_COMMAND could not be split into a program: {pdf_raw:?}");
        }

        let restart_attempts = match var("READER_RESTART_ATTEMPTS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("invalid READER_RESTART_ATTEMPTS {raw:?}"))?
                .clamp(1, MAX_RESTART_ATTEMPTS),
            None => DEFAULT_RESTART_ATTEMPTS,
        };

        fs::create_dir_all(&output_dir).with_context(|| {
            format!("unable to create output directory {}", output_dir.display())
        })?;

        let config = Self {
            runtime_dir,
            voices_dir,
            output_dir,
            library_dir,
            engine,
            voice: var("READER_VOICE"),
            gemini_api_key: var("READER_GEMINI_API_KEY").or_else(|| var("GEMINI_API_KEY")),
            elevenlabs_api_key: var("READER_ELEVENLABS_API_KEY")
                .or_else(|| var("ELEVENLABS_API_KEY")),
            voice_sample: var("READER_VOICE_SAMPLE").map(PathBuf::from),
            pdf_command,
            restart_attempts,
        };
        debug!("Loaded configuration {config:?}");
        Ok(config)
    }

    pub fn voice_sample_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.voice_sample
            .as_deref()
            .map(|path: &Path| {
                fs::read(path)
                    .with_context(|| format!("unable to read voice sample {}", path.display()))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "READER_RUNTIME_DIR",
        "READER_VOICES_DIR",
        "READER_OUTPUT_DIR",
        "READER_LIBRARY_DIR",
        "READER_ENGINE",
        "READER_VOICE",
        "READER_GEMINI_API_KEY",
        "GEMINI_API_KEY",
        "READER_ELEVENLABS_API_KEY",
        "ELEVENLABS_API_KEY",
        "READER_VOICE_SAMPLE",
        "READER_PDF_COMMAND",
        "READER_RESTART_ATTEMPTS",
    ];

    struct EnvGuard;

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for key in KEYS {
                std::env::remove_var(key);
            }
        }
    }

    fn clean_env(temp: &tempfile::TempDir) -> EnvGuard {
        for key in KEYS {
            std::env::remove_var(key);
        }
        std::env::set_var("READER_RUNTIME_DIR", temp.path());
        EnvGuard
    }

    #[test]
    #[serial]
    fn defaults_live_under_runtime_dir() {
        let temp = tempfile::tempdir().unwrap();
        let _guard = clean_env(&temp);
        let config = ReaderConfig::from_env().unwrap();
        assert_eq!(config.engine, EngineKind::Local);
        assert_eq!(config.output_dir, temp.path().join("output"));
        assert_eq!(config.library_dir, temp.path().join("library"));
        assert!(config.output_dir.exists());
        assert_eq!(config.pdf_command, vec!["python", "scripts/py/pdf_extract.py"]);
        assert_eq!(config.restart_attempts, DEFAULT_RESTART_ATTEMPTS);
    }

    #[test]
    #[serial]
    fn reads_overrides_and_fallback_keys() {
        let temp = tempfile::tempdir().unwrap();
        let _guard = clean_env(&temp);
        std::env::set_var("READER_ENGINE", "gemini");
        std::env::set_var("GEMINI_API_KEY", "fallback-key-123");
        std::env::set_var("READER_PDF_COMMAND", "\"/opt/my tools/extract\" --json");
        std::env::set_var("READER_RESTART_ATTEMPTS", "9");
        let config = ReaderConfig::from_env().unwrap();
        assert_eq!(config.engine, EngineKind::Cloud);
        assert_eq!(config.gemini_api_key.as_deref(), Some("fallback-key-123"));
        assert_eq!(config.pdf_command, vec!["/opt/my tools/extract", "--json"]);
        assert_eq!(config.restart_attempts, MAX_RESTART_ATTEMPTS);
    }

    #[test]
    #[serial]
    fn invalid_engine_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let _guard = clean_env(&temp);
        std::env::set_var("READER_ENGINE", "espeak");
        let error = ReaderConfig::from_env().unwrap_err();
        assert!(format!("{error:#}").contains("READER_ENGINE"));
    }

    #[test]
    #[serial]
    fn missing_voice_sample_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let _guard = clean_env(&temp);
        std::env::set_var("READER_VOICE_SAMPLE", temp.path().join("nope.wav"));
        let config = ReaderConfig::from_env().unwrap();
        assert!(config.voice_sample_bytes().is_err());
    }
}
