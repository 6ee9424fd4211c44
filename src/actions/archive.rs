//! Archive writing
//!
//! Backups are zip files. The archiver exposes only what a backup run
//! needs: open a file, add entries, optionally encrypt them, close.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use zeroize::Zeroizing;
use zip::write::SimpleFileOptions;
use zip::{AesMode, CompressionMethod, ZipWriter};

use crate::config::EncryptionMethod;
use crate::error::{StewardError, StewardResult};

/// Writes one archive
pub trait Archiver {
    /// Create the archive file
    fn open(&mut self, path: &Path) -> StewardResult<()>;

    /// Copy a local file into the archive under `name`
    fn add_file(&mut self, source: &Path, name: &str) -> StewardResult<()>;

    /// Encrypt every entry added from now on
    fn set_password(&mut self, password: &str);

    fn set_encryption(&mut self, method: EncryptionMethod);

    /// Finish the archive and return its size in bytes
    fn close(&mut self) -> StewardResult<u64>;
}

/// Zip archiver with optional AES encryption
pub struct ZipArchiver {
    writer: Option<ZipWriter<File>>,
    path: Option<PathBuf>,
    password: Option<Zeroizing<String>>,
    encryption: EncryptionMethod,
    entries: usize,
}

impl Default for ZipArchiver {
    fn default() -> Self {
        Self {
            writer: None,
            path: None,
            password: None,
            encryption: EncryptionMethod::default(),
            entries: 0,
        }
    }
}

impl ZipArchiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries added so far
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    fn aes_mode(&self) -> AesMode {
        match self.encryption {
            EncryptionMethod::Aes128 => AesMode::Aes128,
            EncryptionMethod::Aes192 => AesMode::Aes192,
            EncryptionMethod::Aes256 => AesMode::Aes256,
        }
    }
}

impl Archiver for ZipArchiver {
    fn open(&mut self, path: &Path) -> StewardResult<()> {
        let file = File::create(path).map_err(|e| {
            StewardError::Archive(format!("Failed to create {}: {}", path.display(), e))
        })?;
        self.writer = Some(ZipWriter::new(file));
        self.path = Some(path.to_path_buf());
        self.entries = 0;
        Ok(())
    }

    fn add_file(&mut self, source: &Path, name: &str) -> StewardResult<()> {
        let mode = self.aes_mode();
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| StewardError::Archive("Archive is not open".to_string()))?;

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(true);

        match &self.password {
            Some(password) => {
                writer.start_file(name, options.with_aes_encryption(mode, password.as_str()))?
            }
            None => writer.start_file(name, options)?,
        }

        let mut input = File::open(source).map_err(|e| {
            StewardError::Archive(format!("Failed to read {}: {}", source.display(), e))
        })?;
        io::copy(&mut input, writer).map_err(|e| {
            StewardError::Archive(format!("Failed to add {}: {}", source.display(), e))
        })?;

        self.entries += 1;
        debug!(entry = name, "Added file to archive");
        Ok(())
    }

    fn set_password(&mut self, password: &str) {
        self.password = Some(Zeroizing::new(password.to_string()));
    }

    fn set_encryption(&mut self, method: EncryptionMethod) {
        self.encryption = method;
    }

    fn close(&mut self) -> StewardResult<u64> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| StewardError::Archive("Archive is not open".to_string()))?;
        let file = writer.finish()?;
        let size = file
            .metadata()
            .map_err(|e| StewardError::Archive(format!("Failed to stat archive: {}", e)))?
            .len();

        if let Some(path) = self.path.take() {
            debug!(path = %path.display(), entries = self.entries, size, "Closed archive");
        }
        Ok(size)
    }
}
