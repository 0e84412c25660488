use anyhow::Result;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::MakeWriter;

use crate::core::config::LoggingConfig;

/// Writes every log line to stderr and, when configured, appends it to a file.
#[derive(Clone)]
pub(crate) struct TeeMakeWriter {
    pub file: Option<Arc<Mutex<File>>>,
}

impl<'a> MakeWriter<'a> for TeeMakeWriter {
    type Writer = TeeWriter;

    fn make_writer(&'a self) -> Self::Writer {
        TeeWriter {
            file: self.file.clone(),
        }
    }
}

pub(crate) struct TeeWriter {
    file: Option<Arc<Mutex<File>>>,
}

impl std::io::Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(file) = &self.file
            && let Ok(mut file) = file.lock()
        {
            let _ = file.write_all(buf); // stderr still gets the line
        }
        std::io::stderr().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Some(file) = &self.file
            && let Ok(mut file) = file.lock()
        {
            let _ = file.flush();
        }
        std::io::stderr().flush()
    }
}

/// Installs the global subscriber. Calling it twice is harmless.
pub fn init(config: &LoggingConfig, data_dir: &Path) -> Result<()> {
    let file = match &config.file {
        Some(name) if !name.trim().is_empty() => {
            std::fs::create_dir_all(data_dir)?;
            let handle = OpenOptions::new()
                .create(true)
                .append(true)
                .open(data_dir.join(name.trim()))?;
            Some(Arc::new(Mutex::new(handle)))
        }
        _ => None,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.max_level())
        .with_writer(TeeMakeWriter { file })
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tee_writer_appends_to_file() {
        let tmpdir = tempfile::tempdir().unwrap();
        let path = tmpdir.path().join("crew.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();
        let make = TeeMakeWriter {
            file: Some(Arc::new(Mutex::new(file))),
        };

        let mut writer = make.make_writer();
        writer.write_all(b"first line\n").unwrap();
        writer.flush().unwrap();
        make.make_writer().write_all(b"second line\n").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first line\nsecond line\n");
    }
}
