//! Deadline and cancellation handling for streaming calls.
//!
//! tonic surfaces the caller's time budget as the `grpc-timeout` request
//! header and a cancelled caller as a failed receive. This module turns
//! both into the status codes the protocol promises: every receive step
//! checks the deadline before consuming further input, and a transport
//! failure on a receive maps to `Cancelled` or `Unknown`.

use std::time::{Duration, Instant};
use tonic::metadata::MetadataMap;
use tonic::{Code, Status, Streaming};

/// Absolute deadline for a call, derived from its `grpc-timeout` header.
#[must_use]
pub fn from_metadata(metadata: &MetadataMap) -> Option<Instant> {
    let value = metadata.get("grpc-timeout")?.to_str().ok()?;
    parse_grpc_timeout(value).map(|timeout| Instant::now() + timeout)
}

/// Receive the next message, respecting the call's deadline.
///
/// Returns `Ok(None)` when the client half-closes the stream. An elapsed
/// deadline yields `DeadlineExceeded` without consuming further input; a
/// receive failure yields `Cancelled` when the caller went away, `Unknown`
/// otherwise.
pub async fn next_message<T>(
    stream: &mut Streaming<T>,
    deadline: Option<Instant>,
) -> Result<Option<T>, Status> {
    match deadline {
        Some(deadline) => {
            if Instant::now() >= deadline {
                return Err(Status::deadline_exceeded("deadline is exceeded"));
            }
            match tokio::time::timeout_at(deadline.into(), stream.message()).await {
                Ok(result) => map_recv_error(result),
                Err(_) => Err(Status::deadline_exceeded("deadline is exceeded")),
            }
        }
        None => map_recv_error(stream.message().await),
    }
}

fn map_recv_error<T>(result: Result<Option<T>, Status>) -> Result<Option<T>, Status> {
    result.map_err(|status| match status.code() {
        Code::Cancelled => Status::cancelled("request is canceled"),
        Code::DeadlineExceeded => Status::deadline_exceeded("deadline is exceeded"),
        _ => Status::unknown(format!("cannot receive request: {}", status.message())),
    })
}

/// Parse a `grpc-timeout` header value: up to eight digits and a unit
/// suffix (`H`, `M`, `S`, `m`, `u`, `n`).
fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 || value.len() > 9 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    let amount: u64 = digits.parse().ok()?;
    match unit {
        "H" => Some(Duration::from_secs(amount.checked_mul(3600)?)),
        "M" => Some(Duration::from_secs(amount.checked_mul(60)?)),
        "S" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_millis(amount)),
        "u" => Some(Duration::from_micros(amount)),
        "n" => Some(Duration::from_nanos(amount)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_unit() {
        assert_eq!(parse_grpc_timeout("5S"), Some(Duration::from_secs(5)));
        assert_eq!(parse_grpc_timeout("2M"), Some(Duration::from_secs(120)));
        assert_eq!(parse_grpc_timeout("1H"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_grpc_timeout("250m"), Some(Duration::from_millis(250)));
        assert_eq!(parse_grpc_timeout("10u"), Some(Duration::from_micros(10)));
        assert_eq!(parse_grpc_timeout("99n"), Some(Duration::from_nanos(99)));
    }

    #[test]
    fn rejects_malformed_values() {
        assert_eq!(parse_grpc_timeout(""), None);
        assert_eq!(parse_grpc_timeout("S"), None);
        assert_eq!(parse_grpc_timeout("5"), None);
        assert_eq!(parse_grpc_timeout("5x"), None);
        assert_eq!(parse_grpc_timeout("-5S"), None);
        assert_eq!(parse_grpc_timeout("123456789S"), None);
    }

    #[test]
    fn metadata_without_timeout_has_no_deadline() {
        assert!(from_metadata(&MetadataMap::new()).is_none());
    }

    #[test]
    fn metadata_timeout_yields_future_deadline() {
        let mut metadata = MetadataMap::new();
        metadata.insert("grpc-timeout", "5S".parse().unwrap());
        let deadline = from_metadata(&metadata).expect("deadline");
        assert!(deadline > Instant::now());
    }
}
