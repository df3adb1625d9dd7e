//! ImageVault Repository - relational metadata storage
//!
//! One row per stored filename in the `images` table, guarded by a unique
//! constraint. Inserts are self-healing: a conflicting insert degrades to a
//! `changed_at` update instead of surfacing the constraint violation.

pub mod repository;

pub use repository::{ImageRepository, SqlImageRepository};
