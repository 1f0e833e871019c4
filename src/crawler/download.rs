//! Output file handling for downloaded images
//!
//! Files are opened with create-new semantics. If the derived name cannot be
//! created (collision, invalid name) a random name is tried once. A file that
//! is dropped before [`OutputFile::commit`] is removed again, so an abandoned
//! download never leaves a half-written image behind.

use crate::url::{output_filename, random_filename};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use url::Url;

/// An image file being written into the output directory
#[derive(Debug)]
pub struct OutputFile {
    file: File,
    path: PathBuf,
    committed: bool,
}

impl OutputFile {
    /// Creates the output file for an image URL
    ///
    /// # Errors
    ///
    /// Returns the error of the random-name fallback if both attempts fail.
    pub async fn create(dir: &Path, url: &Url) -> io::Result<Self> {
        let name = output_filename(url);
        let primary = dir.join(&name);

        match open_new(&primary).await {
            Ok(file) => Ok(Self::new(file, primary)),
            Err(e) => {
                let fallback = dir.join(fallback_name(&name));
                tracing::debug!(
                    "Cannot create {} ({}), falling back to {}",
                    primary.display(),
                    e,
                    fallback.display()
                );
                let file = open_new(&fallback).await?;
                Ok(Self::new(file, fallback))
            }
        }
    }

    fn new(file: File, path: PathBuf) -> Self {
        Self {
            file,
            path,
            committed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes).await
    }

    /// Flushes the file and keeps it on disk
    pub async fn commit(mut self) -> io::Result<PathBuf> {
        self.file.flush().await?;
        self.committed = true;
        Ok(self.path.clone())
    }
}

impl Drop for OutputFile {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!("Failed to remove partial file {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Random stem that keeps the original extension so converters still
/// recognize the format
fn fallback_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!("{}.{}", random_filename(), ext),
        _ => random_filename(),
    }
}

async fn open_new(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
}

/// Final file name component of a path, lossily converted
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
