//! A Double Ratchet implementation with encrypted headers.
//!
//! This crate implements the symmetric-key ratchet and the
//! Diffie-Hellman ratchet on top of it — the part of a Signal-style secure
//! messaging session that runs after the two parties have already agreed on
//! an initial shared secret (via X3DH or any other key agreement) and the
//! pair of header keys that seed each side's first message chain. What it
//! provides:
//!
//! - [`participant::Participant`], the two roles ([`participant::Participant::new_sender`] and
//!   [`participant::Participant::new_recipient`]) of a ratchet session, and their `encrypt`/`decrypt` operations.
//! - [`crypto`], the capability traits the ratchet is generic over (Diffie-Hellman,
//!   root-chain, sending-chain and receiving-chain crypto), each with a default
//!   implementation built from X25519, a BLAKE2b-based KDF/MAC pair and
//!   XChaCha20-Poly1305.
//! - [`skipped_keys`], the bounded store that lets a receiving chain absorb
//!   messages that arrive out of order or after a dropped network packet.
//! - [`header`], the plaintext message header and its wire codec.
//! - [`keys`], nominal wrapper types so the various keys that flow through a
//!   ratchet session can never be mixed up at the type level.
//! - [`config`], the builder used to assemble a [`config::Config`] before
//!   constructing a [`participant::Participant`] from it.
//!
//! What it does not provide: the initial key agreement itself, transport,
//! or persistence of ratchet state between process restarts — those are
//! left to the caller.

pub mod config;
pub mod constants;
pub mod crypto;
pub mod errors;
pub mod header;
pub mod keys;
pub mod participant;
pub mod receiving_chain;
pub mod root_chain;
pub mod sending_chain;
pub mod skipped_keys;
pub(crate) mod transaction;

pub use config::{Config, ConfigBuilder};
pub use errors::{CryptoError, Error};
pub use participant::Participant;
