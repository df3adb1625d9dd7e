//! ImageVault Client - RPC client for the transfer service

pub mod transfer;

pub use transfer::{ClientError, StoredImageInfo, TransferClient};
