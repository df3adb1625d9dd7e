//! Configuration types for ImageVault
//!
//! This module defines the configuration structures consumed by the server
//! binary. Loaded once at process start and immutable afterwards.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Root configuration for the ImageVault server
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Network configuration
    #[serde(default)]
    pub network: NetworkConfig,
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Transfer limits
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Address for the transfer gRPC service
    #[serde(default = "default_grpc_listen")]
    pub grpc_listen: SocketAddr,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            grpc_listen: default_grpc_listen(),
        }
    }
}

/// Storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one file per stored image
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    /// Connection URL for the metadata database
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            database_url: default_database_url(),
        }
    }
}

/// Limits on in-flight transfers
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum cumulative bytes accepted per upload stream
    #[serde(default = "default_max_image_size")]
    pub max_image_size: usize,
    /// Admission slots for concurrent uploads
    #[serde(default = "default_upload_slots")]
    pub upload_slots: usize,
    /// Admission slots for concurrent inform calls
    #[serde(default = "default_inform_slots")]
    pub inform_slots: usize,
    /// Admission slots for concurrent downloads
    #[serde(default = "default_download_slots")]
    pub download_slots: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_image_size: default_max_image_size(),
            upload_slots: default_upload_slots(),
            inform_slots: default_inform_slots(),
            download_slots: default_download_slots(),
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_grpc_listen() -> SocketAddr {
    "0.0.0.0:9302".parse().expect("valid default listen address")
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./imagevault-data")
}

fn default_database_url() -> String {
    "sqlite://imagevault.db".to_string()
}

fn default_max_image_size() -> usize {
    1 << 20 // 1 MiB
}

fn default_upload_slots() -> usize {
    10
}

fn default_inform_slots() -> usize {
    100
}

fn default_download_slots() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}
