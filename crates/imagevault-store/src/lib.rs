//! ImageVault Store - filesystem blob storage
//!
//! One plain file per image under a configured directory, named by the
//! original filename. Disk state and the metadata table are kept in
//! lockstep by a store-owned lock around every write-then-update pair.

pub mod disk;

pub use disk::DiskImageStore;
