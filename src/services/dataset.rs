use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while downloading the dataset
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Download of {url} returned {status}")]
    BadStatus { url: String, status: u16 },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One remote file and the name it is stored under
#[derive(Debug, Clone)]
pub struct DatasetFile {
    pub url: String,
    pub file_name: String,
}

impl DatasetFile {
    pub fn new(url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: file_name.into(),
        }
    }
}

/// A file written by the fetcher
#[derive(Debug, Clone)]
pub struct Downloaded {
    pub path: PathBuf,
    pub bytes: usize,
}

/// Downloads fixed files verbatim into a directory
///
/// Reruns overwrite. Writes are not atomic and nothing is retried.
pub struct DatasetFetcher {
    dir: PathBuf,
    files: Vec<DatasetFile>,
    client: Client,
}

impl DatasetFetcher {
    pub fn new(dir: impl Into<PathBuf>, files: Vec<DatasetFile>) -> Result<Self, DatasetError> {
        let client = Client::builder().timeout(Duration::from_secs(300)).build()?;

        Ok(Self {
            dir: dir.into(),
            files,
            client,
        })
    }

    /// The two Adult Income files: `adult.data` and `adult.test`
    pub fn adult(dir: impl Into<PathBuf>, data_url: &str, test_url: &str) -> Result<Self, DatasetError> {
        Self::new(
            dir,
            vec![
                DatasetFile::new(data_url, "adult.data"),
                DatasetFile::new(test_url, "adult.test"),
            ],
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn fetch_all(&self) -> Result<Vec<Downloaded>, DatasetError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| DatasetError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let mut written = Vec::with_capacity(self.files.len());
        for file in &self.files {
            tracing::info!("Downloading {}...", file.file_name);
            let downloaded = self.fetch(file).await?;
            tracing::info!("Downloaded {} ({} bytes)", file.file_name, downloaded.bytes);
            written.push(downloaded);
        }

        tracing::info!("Dataset downloaded successfully to {}", self.dir.display());
        Ok(written)
    }

    async fn fetch(&self, file: &DatasetFile) -> Result<Downloaded, DatasetError> {
        let response = self.client.get(&file.url).send().await?;

        if !response.status().is_success() {
            return Err(DatasetError::BadStatus {
                url: file.url.clone(),
                status: response.status().as_u16(),
            });
        }

        let body = response.bytes().await?;
        let path = self.dir.join(&file.file_name);

        tokio::fs::write(&path, &body)
            .await
            .map_err(|source| DatasetError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(Downloaded {
            path,
            bytes: body.len(),
        })
    }
}
