//! The message header and its wire codec.
//!
//! Layout (little-endian): 8 bytes `message_number`, 8 bytes
//! `previous_sending_chain_messages_count`, followed by the public key's raw
//! bytes with no length prefix — the enclosing ciphertext determines the
//! header's total length.

use crate::errors::Error;
use crate::keys::Public;

const MESSAGE_NUMBER_LENGTH: usize = 8;
const PREVIOUS_CHAIN_COUNT_LENGTH: usize = 8;
const FIXED_PREFIX_LENGTH: usize = MESSAGE_NUMBER_LENGTH + PREVIOUS_CHAIN_COUNT_LENGTH;

/// A Double Ratchet message header.
///
/// The public key may be empty: the very first message a recipient sends,
/// before it has performed its own first DH ratchet, carries no public key
/// of its own in this slot. Callers must not assume it is always present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub public_key: Public,
    pub previous_sending_chain_messages_count: u64,
    pub message_number: u64,
}

impl Header {
    pub fn new(
        public_key: Public,
        previous_sending_chain_messages_count: u64,
        message_number: u64,
    ) -> Self {
        Self {
            public_key,
            previous_sending_chain_messages_count,
            message_number,
        }
    }

    /// Serializes this header to its wire layout.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(FIXED_PREFIX_LENGTH + self.public_key.as_bytes().len());
        bytes.extend_from_slice(&self.message_number.to_le_bytes());
        bytes.extend_from_slice(&self.previous_sending_chain_messages_count.to_le_bytes());
        bytes.extend_from_slice(self.public_key.as_bytes());
        bytes
    }

    /// Decodes a header from its wire layout.
    ///
    /// Fails with [`Error::NotEnoughBytes`] if `bytes` is shorter than 16
    /// bytes. The public key is empty when `bytes` is exactly 16 long.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < FIXED_PREFIX_LENGTH {
            return Err(Error::NotEnoughBytes {
                expected: FIXED_PREFIX_LENGTH,
                got: bytes.len(),
            });
        }

        let message_number = u64::from_le_bytes(
            bytes[..MESSAGE_NUMBER_LENGTH].try_into().expect("slice is 8 bytes"),
        );
        let previous_sending_chain_messages_count = u64::from_le_bytes(
            bytes[MESSAGE_NUMBER_LENGTH..FIXED_PREFIX_LENGTH]
                .try_into()
                .expect("slice is 8 bytes"),
        );
        let public_key = Public::from(&bytes[FIXED_PREFIX_LENGTH..]);

        Ok(Self {
            public_key,
            previous_sending_chain_messages_count,
            message_number,
        })
    }
}
