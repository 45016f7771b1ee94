//! A store medium backed by a local file

use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::fs::OpenOptions;

use super::AsyncStoreMedium;

/// A token store kept in a file on the local filesystem
///
/// The file is created on first write. Every write goes to a sibling
/// temporary file that is then renamed over the store, so readers see either
/// the previous contents or the new contents, never a partial write. On Unix
/// the file is only readable by its owner.
#[derive(Debug)]
pub struct FileStoreMedium {
    path: PathBuf,
}

impl FileStoreMedium {
    /// Constructs a new file store medium
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> io::Result<PathBuf> {
        let name = self.path.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "token store path does not name a file",
            )
        })?;

        let mut staged = OsString::from(".");
        staged.push(name);
        staged.push(".tmp");
        Ok(self.path.with_file_name(staged))
    }
}

async fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut file_opts = OpenOptions::new();

    file_opts.create(true).truncate(true).write(true);

    #[cfg(unix)]
    file_opts.mode(0o600);

    let mut file = file_opts.open(path).await?;
    file.write_all(contents.as_bytes()).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

#[async_trait]
impl AsyncStoreMedium for FileStoreMedium {
    async fn read_to_string(&mut self) -> io::Result<String> {
        use tokio::io::AsyncReadExt;

        let mut file = OpenOptions::new().read(true).open(&self.path).await?;
        let mut data = String::new();
        file.read_to_string(&mut data).await?;
        Ok(data)
    }

    async fn write_all(&mut self, contents: &str) -> io::Result<()> {
        let staged = self.staging_path()?;

        let written = match write_private(&staged, contents).await {
            Ok(()) => tokio::fs::rename(&staged, &self.path).await,
            Err(error) => Err(error),
        };

        if let Err(error) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&staged).await {
                tracing::debug!(
                    path = %staged.display(),
                    error = &cleanup as &dyn std::error::Error,
                    "unable to remove staged token store"
                );
            }
            return Err(error);
        }

        tracing::debug!(path = %self.path.display(), bytes = contents.len(), "wrote token store");
        Ok(())
    }
}
