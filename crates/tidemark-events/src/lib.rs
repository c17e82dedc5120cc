//! # Tidemark Events
//!
//! Control-channel protocol for Tidemark commit coordination: the typed
//! event envelope exchanged between the elected coordinator and writer
//! tasks, plus the byte codec used on the wire.
//!
//! Events are immutable once constructed. [`Payload::StartCommit`]
//! announces a cycle's [`CommitId`]; every other payload carries the id
//! of the cycle it answers, and consumers drop events whose commit id
//! does not match the cycle they have open.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

/// Byte codec for control events.
pub mod codec;
/// Event envelope and payload variants.
pub mod event;
/// Shared protocol types (commit ids, table references, file descriptors).
pub mod types;

pub use codec::{decode, encode, EventError};
pub use event::{Event, Payload, PayloadType};
pub use types::{
    CommitId, DataFile, DeleteFile, DeleteKind, FileFormat, PartitionWatermark, TableReference,
};
