//! Piper voice discovery.
//!
//! Every `*.onnx` model under the voices directory is a selectable voice
//! for the on-device engine; a sibling `*.onnx.json` supplies its label.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use log::warn;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoiceError {
    #[error("voz '{0}' no encontrada")]
    NotFound(String),
    #[error("no hay voces instaladas en {0}")]
    Empty(PathBuf),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VoiceInfo {
    pub id: String,
    pub label: String,
    pub language: Option<String>,
    pub quality: Option<String>,
    pub model_path: PathBuf,
}

#[derive(Default)]
pub struct VoiceLibrary {
    base_dir: PathBuf,
    voices: RwLock<HashMap<String, VoiceInfo>>,
}

impl VoiceLibrary {
    pub fn new(base_dir: PathBuf) -> Self {
        let library = Self {
            base_dir,
            voices: RwLock::new(HashMap::new()),
        };
        library.refresh();
        library
    }

    pub fn refresh(&self) {
        let mut discovered = HashMap::new();
        if self.base_dir.exists() {
            for entry in WalkDir::new(&self.base_dir)
                .into_iter()
                .filter_map(Result::ok)
            {
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("onnx") {
                    continue;
                }
                if let Some(info) = build_voice_info(path) {
                    discovered.insert(info.id.clone(), info);
                }
            }
        }
        *self.voices.write() = discovered;
    }

    pub fn list(&self) -> Vec<VoiceInfo> {
        let mut voices: Vec<_> = self.voices.read().values().cloned().collect();
        voices.sort_by(|a, b| a.label.cmp(&b.label));
        voices
    }

    pub fn get(&self, id: &str) -> Result<VoiceInfo, VoiceError> {
        self.voices
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| VoiceError::NotFound(id.to_string()))
    }

    /// Resolve a voice selector, falling back to the first voice by label.
    pub fn select(&self, selector: Option<&str>) -> Result<VoiceInfo, VoiceError> {
        match selector {
            Some(id) => self.get(id),
            None => self
                .list()
                .into_iter()
                .next()
                .ok_or_else(|| VoiceError::Empty(self.base_dir.clone())),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

fn build_voice_info(path: &Path) -> Option<VoiceInfo> {
    let id = path.file_stem()?.to_string_lossy().to_string();
    let metadata = metadata_path_for(path).and_then(|path| match fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str::<Value>(&contents)
            .map_err(|err| warn!("Failed to parse voice metadata {}: {err}", path.display()))
            .ok(),
        Err(err) => {
            warn!("Failed to read voice metadata {}: {err}", path.display());
            None
        }
    });

    let language = metadata.as_ref().and_then(|value| value.get("language"));
    let label = language
        .and_then(|lang| lang.get("name_native").or_else(|| lang.get("name")))
        .and_then(Value::as_str)
        .map(|lang| format!("{lang} · {id}"))
        .unwrap_or_else(|| id.clone());

    Some(VoiceInfo {
        label,
        language: language
            .and_then(|lang| lang.get("code"))
            .and_then(Value::as_str)
            .map(str::to_string),
        quality: metadata
            .as_ref()
            .and_then(|value| value.get("audio"))
            .and_then(|audio| audio.get("quality"))
            .and_then(Value::as_str)
            .map(str::to_string),
        model_path: path.to_path_buf(),
        id,
    })
}

fn metadata_path_for(path: &Path) -> Option<PathBuf> {
    let mut metadata_path = path.to_path_buf();
    metadata_path.set_extension("onnx.json");
    metadata_path.exists().then_some(metadata_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn discovers_voices_in_nested_directories() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("es/es_ES-davefx-medium.onnx").touch().unwrap();
        temp.child("notes.txt").touch().unwrap();
        let library = VoiceLibrary::new(temp.path().to_path_buf());
        let voices = library.list();
        assert_eq!(voices.len(), 1);
        assert_eq!(voices[0].id, "es_ES-davefx-medium");
    }

    #[test]
    fn metadata_provides_label_and_quality() {
        let temp = assert_fs::TempDir::new().unwrap();
        let model = temp.child("demo.onnx");
        model.touch().unwrap();
        temp.child("demo.onnx.json")
            .write_str(
                r#"{"language":{"code":"es_ES","name_native":"Español"},"audio":{"quality":"high"}}"#,
            )
            .unwrap();
        let info = build_voice_info(model.path()).unwrap();
        assert_eq!(info.label, "Español · demo");
        assert_eq!(info.language.as_deref(), Some("es_ES"));
        assert_eq!(info.quality.as_deref(), Some("high"));
    }

    #[test]
    fn select_falls_back_to_first_voice() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("b.onnx").touch().unwrap();
        temp.child("a.onnx").touch().unwrap();
        let library = VoiceLibrary::new(temp.path().to_path_buf());
        assert_eq!(library.select(None).unwrap().id, "a");
        assert_eq!(
            library.select(Some("zz")),
            Err(VoiceError::NotFound("zz".into()))
        );
    }

    #[test]
    fn empty_library_reports_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        let library = VoiceLibrary::new(temp.path().to_path_buf());
        assert!(matches!(library.select(None), Err(VoiceError::Empty(_))));
    }
}
