//! Byte codec for control events.
//!
//! JSON on the wire. The payload type tag is the discriminant; unknown
//! tags decode to [`Payload::Unknown`](crate::Payload::Unknown) so the
//! protocol can evolve without breaking older consumers.

use thiserror::Error;

use crate::event::Event;

/// Errors from encoding or decoding control events.
#[derive(Debug, Error)]
pub enum EventError {
    /// The byte payload was not a valid event.
    #[error("malformed control event: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Encodes an event to its wire representation.
///
/// # Errors
///
/// Returns [`EventError::Malformed`] if serialization fails.
pub fn encode(event: &Event) -> Result<Vec<u8>, EventError> {
    Ok(serde_json::to_vec(event)?)
}

/// Decodes an event from its wire representation.
///
/// # Errors
///
/// Returns [`EventError::Malformed`] if the bytes are not a valid event
/// envelope. An unknown payload type tag is not an error; it decodes to
/// `Payload::Unknown`.
pub fn decode(bytes: &[u8]) -> Result<Event, EventError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Payload, PayloadType};
    use crate::types::{CommitId, DataFile, FileFormat, PartitionWatermark, TableReference};
    use chrono::{TimeZone, Utc};

    #[test]
    fn round_trips_start_commit() {
        let event = Event::new(
            "cg-1",
            Payload::StartCommit {
                commit_id: CommitId::random(),
            },
        );
        let decoded = decode(&encode(&event).unwrap()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn wire_tag_is_screaming_snake_case() {
        let event = Event::new(
            "cg-1",
            Payload::DataComplete {
                commit_id: CommitId::random(),
                watermarks: vec![PartitionWatermark::new(
                    "events",
                    3,
                    Some(42),
                    Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()),
                )],
            },
        );
        let bytes = encode(&event).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["payload"]["type"], "DATA_COMPLETE");
    }

    #[test]
    fn data_written_preserves_file_lists() {
        let event = Event::new(
            "cg-1",
            Payload::DataWritten {
                commit_id: CommitId::random(),
                table: TableReference::new("main", vec!["db".into()], "tbl"),
                data_files: vec![DataFile {
                    path: "a.parquet".into(),
                    format: FileFormat::Parquet,
                    partition_spec_id: 0,
                    schema_id: 0,
                    record_count: 5,
                    file_size_bytes: 100,
                }],
                delete_files: vec![],
            },
        );
        let decoded = decode(&encode(&event).unwrap()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn unknown_tag_decodes_to_unknown_payload() {
        let bytes = br#"{"group":"cg-1","payload":{"type":"FENCE_WRITER","epoch":7}}"#;
        let decoded = decode(bytes).unwrap();
        assert_eq!(decoded.payload.payload_type(), PayloadType::Unknown);
    }

    #[test]
    fn garbage_bytes_are_malformed() {
        assert!(decode(b"not json").is_err());
    }
}
