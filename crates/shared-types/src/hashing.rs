//! # Canonical Hashing
//!
//! Event hashes are Keccak-256 over the bincode encoding of the
//! [`StreamEvent`](crate::events::StreamEvent), wrapped in a fixed header and
//! footer so an event hash can never collide with a hash of any other
//! structure that happens to share its encoding.

use sha3::{Digest, Keccak256};

use crate::entities::Hash;
use crate::errors::{ErrorCode, ProtocolError, ProtocolResult};
use crate::events::StreamEvent;

const EVENT_HASH_HEADER: &[u8; 8] = b"STRMEVT<";
const EVENT_HASH_FOOTER: &[u8; 8] = b">TVEMRTS";

/// Plain Keccak-256.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    Keccak256::digest(data).into()
}

/// Domain-separated hash of already-encoded event bytes.
#[must_use]
pub fn event_hash(encoded: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(EVENT_HASH_HEADER);
    hasher.update(encoded);
    hasher.update(EVENT_HASH_FOOTER);
    hasher.finalize().into()
}

/// Canonical byte encoding of an event.
pub fn canonical_event_bytes(event: &StreamEvent) -> ProtocolResult<Vec<u8>> {
    bincode::serialize(event).map_err(|e| {
        ProtocolError::new(ErrorCode::BadEvent, "failed to encode event").tag("error", e)
    })
}

/// Hash of the canonical encoding of `event`.
pub fn hash_event(event: &StreamEvent) -> ProtocolResult<Hash> {
    Ok(event_hash(&canonical_event_bytes(event)?))
}
