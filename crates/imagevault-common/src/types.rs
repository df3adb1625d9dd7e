//! Core metadata types.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Metadata row for one stored blob.
///
/// Exactly one record exists per `filename`. `created_at` is set once at the
/// first successful save and never rewritten; `changed_at` is rewritten on
/// every overwrite, so `changed_at >= created_at` always holds. Timestamps
/// are RFC 3339 strings, which compare chronologically as plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Opaque identifier assigned at first save. Stable per filename: an
    /// overwrite keeps the identifier the row already holds.
    pub image_id: String,
    /// Original filename, the unique key within the store.
    pub filename: String,
    pub created_at: String,
    pub changed_at: String,
}

impl ImageRecord {
    /// Create a record for an incoming upload, stamped with the current time.
    ///
    /// The identifier is left empty; the blob store assigns one when it
    /// decides between the insert and overwrite paths.
    #[must_use]
    pub fn new(filename: impl Into<String>) -> Self {
        let now = now_rfc3339();
        Self {
            image_id: String::new(),
            filename: filename.into(),
            created_at: now.clone(),
            changed_at: now,
        }
    }
}

/// Current UTC time as an RFC 3339 string with microsecond precision.
#[must_use]
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
