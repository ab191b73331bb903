use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;
use shlex::Shlex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum PiperCommand {
    Executable(PathBuf),
    PythonModule,
    /// Program plus leading arguments, split from `READER_PIPER_COMMAND`.
    Custom(Vec<String>),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PiperPathError {
    #[error("READER_PIPER_COMMAND está vacío")]
    EmptyOverride,
    #[error("python no está disponible en el PATH para ejecutar 'python -m piper'")]
    PythonUnavailable,
}

pub fn resolve(runtime_dir: &Path) -> Result<PiperCommand, PiperPathError> {
    if let Some(raw) = std::env::var_os("READER_PIPER_COMMAND") {
        let raw = raw.to_string_lossy().into_owned();
        let parts: Vec<String> = Shlex::new(&raw).collect();
        if parts.is_empty() {
            return Err(PiperPathError::EmptyOverride);
        }
        return Ok(PiperCommand::Custom(parts));
    }

    let candidate =
        runtime_dir
            .join("piper")
            .join(if cfg!(windows) { "piper.exe" } else { "piper" });
    if candidate.exists() {
        return Ok(PiperCommand::Executable(candidate));
    }

    if which::which("python").is_ok() {
        return Ok(PiperCommand::PythonModule);
    }

    Err(PiperPathError::PythonUnavailable)
}

pub fn command_to_args(cmd: &PiperCommand) -> (OsString, Vec<OsString>) {
    match cmd {
        PiperCommand::Executable(path) => (path.as_os_str().into(), vec![]),
        PiperCommand::PythonModule => (
            OsString::from("python"),
            vec!["-m".into(), "piper".into()],
        ),
        PiperCommand::Custom(parts) => {
            let mut parts = parts.iter().map(OsString::from);
            let program = parts.next().unwrap_or_default();
            (program, parts.collect())
        }
    }
}
