//! Identity token model.

use uuid::Uuid;

/// Opaque durable token identifying one task-list owner on one device
/// profile.
///
/// Minted once, persisted locally, never mutated in place. The only way an
/// established device changes identity is adoption after a successful
/// display-name verification, which points the device at the verified
/// owner's records.
pub type Identity = Uuid;
