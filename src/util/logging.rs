use std::path::{Path, PathBuf};

use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};
use once_cell::sync::OnceCell;

static LOGGER: OnceCell<LoggerHandle> = OnceCell::new();

/// Install the file logger once; later calls are no-ops.
pub fn init() -> anyhow::Result<()> {
    init_in(&log_dir())
}

pub fn init_in(log_dir: &Path) -> anyhow::Result<()> {
    LOGGER.get_or_try_init(|| -> anyhow::Result<LoggerHandle> {
        std::fs::create_dir_all(log_dir)?;
        let handle = Logger::try_with_env_or_str("info")?
            .log_to_file(
                FileSpec::default()
                    .directory(log_dir)
                    .basename("reader")
                    .suppress_timestamp(),
            )
            .duplicate_to_stderr(Duplicate::Info)
            .rotate(
                Criterion::AgeOrSize(Age::Day, 5_000_000),
                Naming::Numbers,
                Cleanup::KeepLogFiles(7),
            )
            .start()?;
        Ok(handle)
    })?;
    Ok(())
}

fn log_dir() -> PathBuf {
    PathBuf::from("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logger_creates_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let logs = temp_dir.path().join("logs");
        init_in(&logs).unwrap();
        init_in(&logs).unwrap();
        assert!(logs.exists());
    }
}
