//! Transfer gRPC service implementation.

use crate::deadline;
use bytes::BytesMut;
use imagevault_common::config::LimitsConfig;
use imagevault_common::{Error, ImageRecord};
use imagevault_proto::transfer::image_transfer_server::ImageTransfer;
use imagevault_proto::transfer::{
    DownloadRequest, DownloadResponse, ImageInfo, InformRequest, InformResponse, UploadRequest,
    UploadResponse,
};
use imagevault_repo::ImageRepository;
use imagevault_store::DiskImageStore;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tonic::{Request, Response, Status, Streaming};
use tracing::{error, info};

/// Admission pools and the upload size ceiling.
///
/// The pools bound memory used by concurrent in-flight buffers; they are
/// not a correctness mechanism. A caller arriving when a pool is exhausted
/// waits until a slot frees.
pub struct TransferLimits {
    max_image_size: usize,
    uploads: Semaphore,
    informs: Semaphore,
    downloads: Semaphore,
}

impl TransferLimits {
    #[must_use]
    pub fn new(config: &LimitsConfig) -> Self {
        Self {
            max_image_size: config.max_image_size,
            uploads: Semaphore::new(config.upload_slots),
            informs: Semaphore::new(config.inform_slots),
            downloads: Semaphore::new(config.download_slots),
        }
    }
}

/// Transfer service state.
pub struct TransferService {
    store: Arc<DiskImageStore>,
    repo: Arc<dyn ImageRepository>,
    limits: TransferLimits,
}

impl TransferService {
    pub fn new(
        store: Arc<DiskImageStore>,
        repo: Arc<dyn ImageRepository>,
        limits: &LimitsConfig,
    ) -> Self {
        Self {
            store,
            repo,
            limits: TransferLimits::new(limits),
        }
    }
}

/// Log a terminal call failure once, where it is detected.
fn log_status(status: Status) -> Status {
    error!(code = ?status.code(), "{}", status.message());
    status
}

/// Map a store or repository failure onto its gRPC status code.
fn status_from_error(err: Error) -> Status {
    let status = match &err {
        Error::ImageNotFound { .. } | Error::RecordNotFound { .. } => {
            Status::not_found(err.to_string())
        }
        Error::ImageTooLarge { .. } | Error::InvalidArgument(_) => {
            Status::invalid_argument(err.to_string())
        }
        Error::DiskIo(_) | Error::Repository(_) => Status::internal(err.to_string()),
    };
    log_status(status)
}

#[tonic::async_trait]
impl ImageTransfer for TransferService {
    async fn upload(
        &self,
        request: Request<Streaming<UploadRequest>>,
    ) -> Result<Response<UploadResponse>, Status> {
        let _permit = self
            .limits
            .uploads
            .acquire()
            .await
            .map_err(|_| Status::unavailable("service is shutting down"))?;

        let call_deadline = deadline::from_metadata(request.metadata());
        let mut stream = request.into_inner();

        let mut filename = String::new();
        let mut image_data = BytesMut::new();
        let mut received = false;

        while let Some(chunk) = deadline::next_message(&mut stream, call_deadline)
            .await
            .map_err(log_status)?
        {
            received = true;
            // The filename rides on every chunk; the last value wins.
            filename = chunk.filename;

            let size = image_data.len() + chunk.image_data.len();
            if size > self.limits.max_image_size {
                return Err(status_from_error(Error::ImageTooLarge {
                    size,
                    max_size: self.limits.max_image_size,
                }));
            }
            image_data.extend_from_slice(&chunk.image_data);
        }

        if !received {
            return Err(log_status(Status::invalid_argument(
                "upload stream carried no chunks",
            )));
        }

        let record = ImageRecord::new(filename);
        let filename = record.filename.clone();
        let created_at = record.created_at.clone();

        let image_id = self
            .store
            .save_new_image(image_data.freeze(), record, self.repo.as_ref())
            .await
            .map_err(status_from_error)?;

        info!(filename = %filename, created_at = %created_at, "saved image");

        Ok(Response::new(UploadResponse {
            image_id,
            filename,
            created_at,
        }))
    }

    async fn inform(
        &self,
        request: Request<Streaming<InformRequest>>,
    ) -> Result<Response<InformResponse>, Status> {
        let _permit = self
            .limits
            .informs
            .acquire()
            .await
            .map_err(|_| Status::unavailable("service is shutting down"))?;

        let call_deadline = deadline::from_metadata(request.metadata());
        let mut stream = request.into_inner();

        deadline::next_message(&mut stream, call_deadline)
            .await
            .map_err(log_status)?
            .ok_or_else(|| log_status(Status::invalid_argument("missing request")))?;

        let records = self
            .repo
            .get_all_info()
            .await
            .map_err(status_from_error)?;

        let rows = records
            .into_iter()
            .map(|record| ImageInfo {
                filename: record.filename,
                created_at: record.created_at,
                changed_at: record.changed_at,
            })
            .collect();

        info!("sent metadata for all stored images");

        Ok(Response::new(InformResponse { rows }))
    }

    async fn download(
        &self,
        request: Request<Streaming<DownloadRequest>>,
    ) -> Result<Response<DownloadResponse>, Status> {
        let _permit = self
            .limits
            .downloads
            .acquire()
            .await
            .map_err(|_| Status::unavailable("service is shutting down"))?;

        let call_deadline = deadline::from_metadata(request.metadata());
        let mut stream = request.into_inner();

        let req = deadline::next_message(&mut stream, call_deadline)
            .await
            .map_err(log_status)?
            .ok_or_else(|| log_status(Status::invalid_argument("missing request")))?;

        let image_data = self
            .store
            .get_image(&req.filename)
            .await
            .map_err(status_from_error)?;

        info!(filename = %req.filename, size = image_data.len(), "sent image");

        Ok(Response::new(DownloadResponse {
            image_data: image_data.to_vec(),
        }))
    }
}
