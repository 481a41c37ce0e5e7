//! Storage for message keys skipped over by the receiving chain, so that
//! messages which arrive out of order can still be decrypted later.
//!
//! The default implementation bounds memory use two ways: it caps the number
//! of message keys stored per header key, and it clears everything once too
//! many distinct header keys have accumulated (an old header key signals a
//! DH ratchet step happened since, so anything still unused under it is
//! unlikely to ever arrive).

use std::collections::HashMap;

use crate::constants::{
    DEFAULT_SKIPPED_KEYS_HEADER_KEYS_BEFORE_CLEAR, DEFAULT_SKIPPED_KEYS_MESSAGE_KEYS_LIMIT,
};
use crate::errors::Error;
use crate::keys::{Header, Message};

/// Storage capability for skipped message keys, keyed by header key and
/// message number.
pub trait SkippedKeysStorage: Clone {
    /// Stores a message key skipped under `header_key` at `message_number`.
    ///
    /// Returns [`Error::TooManySkippedMessageKeys`] if storing would exceed
    /// this implementation's per-header-key quota.
    fn add(&mut self, header_key: &Header, message_number: u64, message_key: Message) -> Result<(), Error>;

    /// Removes and returns the message key stored under `header_key` at
    /// `message_number`, if any.
    fn delete(&mut self, header_key: &Header, message_number: u64) -> Option<Message>;

    /// Calls `f` with every `(header_key, message_number, message_key)` entry
    /// currently stored, in unspecified order.
    ///
    /// The message key is handed out by reference rather than removed, so a
    /// caller can trial-decrypt with it and only call [`Self::delete`] once
    /// decryption actually succeeds — a failed trial must not lose the entry.
    fn iterate(&self, f: impl FnMut(&Header, u64, &Message));
}

/// The crate's default skipped-keys storage: an in-memory map bounded by
/// [`DEFAULT_SKIPPED_KEYS_HEADER_KEYS_BEFORE_CLEAR`] distinct header keys and
/// [`DEFAULT_SKIPPED_KEYS_MESSAGE_KEYS_LIMIT`] message keys per header key.
#[derive(Clone, Default)]
pub struct DefaultSkippedKeysStorage {
    keys: HashMap<Vec<u8>, HashMap<u64, Message>>,
}

impl DefaultSkippedKeysStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SkippedKeysStorage for DefaultSkippedKeysStorage {
    fn add(&mut self, header_key: &Header, message_number: u64, message_key: Message) -> Result<(), Error> {
        if self.keys.len() >= DEFAULT_SKIPPED_KEYS_HEADER_KEYS_BEFORE_CLEAR {
            self.keys.clear();
        }

        let message_keys = self.keys.entry(header_key.as_bytes().to_vec()).or_default();
        if message_keys.len() >= DEFAULT_SKIPPED_KEYS_MESSAGE_KEYS_LIMIT {
            return Err(Error::TooManySkippedMessageKeys);
        }

        message_keys.insert(message_number, message_key);
        Ok(())
    }

    fn delete(&mut self, header_key: &Header, message_number: u64) -> Option<Message> {
        let message_keys = self.keys.get_mut(header_key.as_bytes())?;
        message_keys.remove(&message_number)
    }

    fn iterate(&self, mut f: impl FnMut(&Header, u64, &Message)) {
        for (header_key_bytes, message_keys) in &self.keys {
            let header_key = Header::from(header_key_bytes.as_slice());
            for (message_number, message_key) in message_keys {
                f(&header_key, *message_number, message_key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_key(tag: u8) -> Header {
        Header::from(vec![tag; 32])
    }

    #[test]
    fn add_then_delete_round_trips() {
        let mut storage = DefaultSkippedKeysStorage::new();
        let key = header_key(1);
        storage.add(&key, 3, Message::from(vec![9u8; 64])).unwrap();

        let found = storage.delete(&key, 3);
        assert_eq!(found.map(|m| m.into_bytes()), Some(vec![9u8; 64]));
        assert!(storage.delete(&key, 3).is_none());
    }

    #[test]
    fn message_keys_per_header_key_are_bounded() {
        let mut storage = DefaultSkippedKeysStorage::new();
        let key = header_key(1);
        for i in 0..DEFAULT_SKIPPED_KEYS_MESSAGE_KEYS_LIMIT as u64 {
            storage.add(&key, i, Message::from(vec![0u8; 64])).unwrap();
        }

        let err = storage
            .add(&key, DEFAULT_SKIPPED_KEYS_MESSAGE_KEYS_LIMIT as u64, Message::from(vec![0u8; 64]))
            .unwrap_err();
        assert!(matches!(err, Error::TooManySkippedMessageKeys));
    }

    #[test]
    fn storage_clears_once_too_many_header_keys_accumulate() {
        let mut storage = DefaultSkippedKeysStorage::new();
        for tag in 0..DEFAULT_SKIPPED_KEYS_HEADER_KEYS_BEFORE_CLEAR as u8 {
            storage.add(&header_key(tag), 0, Message::from(vec![tag; 64])).unwrap();
        }
        assert_eq!(storage.keys.len(), DEFAULT_SKIPPED_KEYS_HEADER_KEYS_BEFORE_CLEAR);

        let one_more = header_key(DEFAULT_SKIPPED_KEYS_HEADER_KEYS_BEFORE_CLEAR as u8);
        storage.add(&one_more, 0, Message::from(vec![0xFFu8; 64])).unwrap();

        let mut seen = Vec::new();
        storage.iterate(|header_key, message_number, _message_key| {
            seen.push((header_key.clone(), message_number));
        });
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.as_bytes(), one_more.as_bytes());
    }

    #[test]
    fn clear_also_fires_when_adding_again_under_an_already_present_header_key() {
        // The clear check counts distinct header keys only, with no exemption
        // for a key that is already present — matching the upstream Go
        // implementation this storage is ported from.
        let mut storage = DefaultSkippedKeysStorage::new();
        for tag in 0..DEFAULT_SKIPPED_KEYS_HEADER_KEYS_BEFORE_CLEAR as u8 {
            storage.add(&header_key(tag), 0, Message::from(vec![tag; 64])).unwrap();
        }

        let first_key = header_key(0);
        storage.add(&first_key, 1, Message::from(vec![0u8; 64])).unwrap();

        let mut seen = Vec::new();
        storage.iterate(|header_key, message_number, _message_key| {
            seen.push((header_key.clone(), message_number));
        });
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], (first_key, 1));
    }

    #[test]
    fn delete_leaves_an_empty_sub_map_in_place() {
        let mut storage = DefaultSkippedKeysStorage::new();
        let key = header_key(1);
        storage.add(&key, 0, Message::from(vec![1u8; 64])).unwrap();
        storage.delete(&key, 0);

        assert_eq!(storage.keys.len(), 1);
        assert_eq!(storage.keys.get(key.as_bytes()).map(|m| m.len()), Some(0));
    }
}
