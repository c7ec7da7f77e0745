//! Use-case services orchestrating model, repository and clock seams.
//!
//! # Responsibility
//! - Host the access session state machine.
//! - Keep repositories free of session lifecycle concerns.
//!
//! # Invariants
//! - Services never bypass repository validation or persistence contracts.

pub mod access_session;
