//! Client for the image transfer service.
//!
//! Uploads stream the blob in fixed-size chunks with the filename carried
//! on every chunk message; every call runs under a request timeout, which
//! tonic propagates to the server as the `grpc-timeout` header.

use futures::stream;
use imagevault_proto::transfer::image_transfer_client::ImageTransferClient;
use imagevault_proto::transfer::{DownloadRequest, InformRequest, UploadRequest, UploadResponse};
use std::path::Path;
use std::time::Duration;
use tonic::transport::Channel;
use tonic::Request;
use tracing::debug;

/// Default chunk size for uploads.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default per-call time budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client-side errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
    #[error("rpc failed: {0}")]
    Rpc(#[from] tonic::Status),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One row of stored-image metadata, as returned by Inform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImageInfo {
    pub filename: String,
    pub created_at: String,
    pub changed_at: String,
}

/// Client for the transfer service
pub struct TransferClient {
    inner: ImageTransferClient<Channel>,
    chunk_size: usize,
    timeout: Duration,
}

impl TransferClient {
    /// Connect to the transfer service at `endpoint` (e.g. `http://host:port`).
    pub async fn connect(endpoint: String) -> Result<Self, ClientError> {
        let inner = ImageTransferClient::connect(endpoint).await?;
        Ok(Self {
            inner,
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Override the upload chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Override the per-call time budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Upload `data` under `filename`, streamed in chunks.
    pub async fn upload(
        &mut self,
        filename: &str,
        data: &[u8],
    ) -> Result<UploadResponse, ClientError> {
        let chunks: Vec<UploadRequest> = data
            .chunks(self.chunk_size)
            .map(|chunk| UploadRequest {
                image_data: chunk.to_vec(),
                filename: filename.to_string(),
            })
            .collect();

        debug!(filename, chunks = chunks.len(), "uploading image");

        let mut request = Request::new(stream::iter(chunks));
        request.set_timeout(self.timeout);

        let response = self.inner.upload(request).await?.into_inner();
        Ok(response)
    }

    /// Upload a file from disk; its base name becomes the stored filename.
    pub async fn upload_file(&mut self, path: impl AsRef<Path>) -> Result<UploadResponse, ClientError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let data = tokio::fs::read(path).await?;
        self.upload(&filename, &data).await
    }

    /// Fetch metadata for every stored image.
    pub async fn inform(&mut self) -> Result<Vec<StoredImageInfo>, ClientError> {
        let mut request = Request::new(stream::iter([InformRequest {}]));
        request.set_timeout(self.timeout);

        let response = self.inner.inform(request).await?.into_inner();
        Ok(response
            .rows
            .into_iter()
            .map(|row| StoredImageInfo {
                filename: row.filename,
                created_at: row.created_at,
                changed_at: row.changed_at,
            })
            .collect())
    }

    /// Download the full content of one stored image.
    pub async fn download(&mut self, filename: &str) -> Result<Vec<u8>, ClientError> {
        let mut request = Request::new(stream::iter([DownloadRequest {
            filename: filename.to_string(),
        }]));
        request.set_timeout(self.timeout);

        let response = self.inner.download(request).await?.into_inner();
        Ok(response.image_data)
    }
}
