//! Per-mesh log files.
//!
//! Each rendered mesh gets its own log file next to its images. Records are
//! written as `[LEVEL] message` lines and also forwarded to the [`log`]
//! facade under the `render_uv` target, so they show up in the global log
//! too.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::Level;

use crate::error::Result;

/// Target used for every forwarded record.
pub const LOG_TARGET: &str = "render_uv";

/// A log file for a single mesh.
#[derive(Debug)]
pub struct MeshLog {
    path: PathBuf,
    name: String,
    writer: Option<BufWriter<File>>,
}

impl MeshLog {
    /// Create (truncate) the log file at `path`. `name` prefixes the
    /// forwarded records.
    pub fn create<P: AsRef<Path>>(path: P, name: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            path,
            name: name.into(),
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one record.
    pub fn record(&mut self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(target: LOG_TARGET, level, "{}: {}", self.name, args);

        if let Some(writer) = self.writer.as_mut() {
            let written = writeln!(writer, "[{}] {}", level, args).and_then(|_| writer.flush());
            if let Err(e) = written {
                log::warn!(
                    target: LOG_TARGET,
                    "{}: disabling log file {}: {}",
                    self.name,
                    self.path.display(),
                    e
                );
                self.writer = None;
            }
        }
    }

    /// Info record.
    pub fn info(&mut self, message: impl fmt::Display) {
        self.record(Level::Info, format_args!("{}", message));
    }

    /// Error record.
    pub fn error(&mut self, message: impl fmt::Display) {
        self.record(Level::Error, format_args!("{}", message));
    }

    /// Debug record.
    pub fn debug(&mut self, message: impl fmt::Display) {
        self.record(Level::Debug, format_args!("{}", message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_are_written_in_order() {
        let path = std::env::temp_dir().join(format!("uvrender_log_{}.log", std::process::id()));
        {
            let mut log = MeshLog::create(&path, "square").unwrap();
            log.info("Rendering square");
            log.error(format_args!("Could not load camera at {}", "cam.json"));
            assert_eq!(log.path(), path.as_path());
        }
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec!["[INFO] Rendering square", "[ERROR] Could not load camera at cam.json"]
        );
    }

    #[test]
    fn test_create_fails_in_missing_directory() {
        let path = std::env::temp_dir()
            .join(format!("uvrender_nolog_{}", std::process::id()))
            .join("missing")
            .join("x.log");
        assert!(MeshLog::create(&path, "x").is_err());
    }
}
