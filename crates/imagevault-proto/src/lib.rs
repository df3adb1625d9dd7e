//! ImageVault Protocol - gRPC service definitions
//!
//! This crate contains the protobuf-generated code for the ImageVault
//! transfer service.

/// Transfer service (upload, inform, download)
pub mod transfer {
    tonic::include_proto!("imagevault.transfer");
}
