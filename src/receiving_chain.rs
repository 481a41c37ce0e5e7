//! The receiving chain: mirrors [`crate::sending_chain::SendingChain`] on the
//! decrypting side, and additionally absorbs out-of-order messages by
//! skipping ahead and stashing the message keys it passes over.

use crate::crypto::{message_associated_data, ReceivingChainCrypto};
use crate::errors::Error;
use crate::header::Header;
use crate::keys::{Header as HeaderKey, Master, Message};
use crate::skipped_keys::SkippedKeysStorage;

/// Holds the receiving side's chain key, header keys, and skipped-key store.
pub struct ReceivingChain<C, S> {
    chain_key: Option<Master>,
    header_key: Option<HeaderKey>,
    next_header_key: Option<HeaderKey>,
    messages_count: u64,
    crypto: C,
    skipped_keys: S,
}

impl<C: Clone, S: Clone> Clone for ReceivingChain<C, S> {
    fn clone(&self) -> Self {
        Self {
            chain_key: self.chain_key.clone(),
            header_key: self.header_key.clone(),
            next_header_key: self.next_header_key.clone(),
            messages_count: self.messages_count,
            crypto: self.crypto.clone(),
            skipped_keys: self.skipped_keys.clone(),
        }
    }
}

impl<C: ReceivingChainCrypto, S: SkippedKeysStorage> ReceivingChain<C, S> {
    pub fn new(crypto: C, skipped_keys: S) -> Self {
        Self {
            chain_key: None,
            header_key: None,
            next_header_key: None,
            messages_count: 0,
            crypto,
            skipped_keys,
        }
    }

    /// Seeds (or reseeds, after a Diffie-Hellman ratchet step) this chain
    /// with a fresh chain key and header key, resetting the message counter.
    pub fn upgrade(&mut self, chain_key: Master, header_key: HeaderKey, next_header_key: Option<HeaderKey>) {
        self.chain_key = Some(chain_key);
        self.header_key = Some(header_key);
        self.next_header_key = next_header_key;
        self.messages_count = 0;
    }

    /// Sets only the next header key, leaving the chain otherwise
    /// unseeded. Used when this side has not yet received a message and so
    /// has no chain key of its own, only the header key it expects the
    /// first incoming message to be encrypted under.
    pub fn upgrade_next_header_key_only(&mut self, next_header_key: HeaderKey) {
        self.next_header_key = Some(next_header_key);
    }

    /// The header key this chain currently expects messages to arrive under,
    /// used by the caller to recognise when a remote public key is already known.
    pub fn next_header_key(&self) -> Option<&HeaderKey> {
        self.next_header_key.as_ref()
    }

    /// Decrypts an incoming message.
    ///
    /// `on_new_ratchet` is called when the header only decrypts under this
    /// chain's *next* header key, i.e. the sender has performed a
    /// Diffie-Hellman ratchet step. It receives the decoded header (whose
    /// public key is the sender's new ratchet public key) and must return the
    /// `(chain_key, next_header_key)` the root chain derives from it; the
    /// header key to receive under is always the one that just matched, so
    /// callers never need to supply it themselves.
    pub fn decrypt(
        &mut self,
        encrypted_header: &[u8],
        encrypted_message: &[u8],
        auth: &[u8],
        mut on_new_ratchet: impl FnMut(&Header) -> Result<(Master, HeaderKey), Error>,
    ) -> Result<Vec<u8>, Error> {
        if let Some(plaintext) = self.try_skipped_message_keys(encrypted_header, encrypted_message, auth)? {
            return Ok(plaintext);
        }

        let (header, is_new_ratchet) = self.decrypt_header(encrypted_header)?;

        if is_new_ratchet {
            log::debug!("incoming header matched the next header key, performing a DH ratchet step");
            self.skip_message_keys(header.previous_sending_chain_messages_count)?;
            let promoted_header_key = self
                .next_header_key
                .take()
                .expect("is_new_ratchet is only set when next_header_key just matched");
            let (chain_key, next_header_key) = on_new_ratchet(&header)?;
            self.upgrade(chain_key, promoted_header_key, Some(next_header_key));
        }

        self.skip_message_keys(header.message_number)?;

        let chain_key = self
            .chain_key
            .as_ref()
            .ok_or_else(|| Error::InvalidValue("receiving chain has no chain key".into()))?;
        let (new_chain_key, message_key) = self.crypto.advance_chain(chain_key)?;
        self.chain_key = Some(new_chain_key);
        self.messages_count += 1;

        let message_auth = message_associated_data(encrypted_header, auth);
        self.crypto.decrypt_message(&message_key, encrypted_message, &message_auth)
    }

    /// Tries every header key stashed alongside skipped message keys.
    /// Returns `Ok(None)` if none of them decrypt the header — callers then
    /// fall back to the current or next header key.
    ///
    /// A header key is trial-decrypted at most once even though several
    /// message numbers may be stashed under it (the inner short-circuit
    /// spec.md's design notes call for, to avoid redundant AEAD work). The
    /// message key is only removed from storage once it has actually been
    /// used to decrypt the message; a failed trial leaves the entry in place
    /// for a later, legitimate delivery to still find.
    fn try_skipped_message_keys(
        &mut self,
        encrypted_header: &[u8],
        encrypted_message: &[u8],
        auth: &[u8],
    ) -> Result<Option<Vec<u8>>, Error> {
        let mut grouped: std::collections::HashMap<Vec<u8>, (HeaderKey, Vec<(u64, Message)>)> =
            std::collections::HashMap::new();
        self.skipped_keys.iterate(|header_key, message_number, message_key| {
            grouped
                .entry(header_key.as_bytes().to_vec())
                .or_insert_with(|| (header_key.clone(), Vec::new()))
                .1
                .push((message_number, message_key.clone()));
        });

        for (header_key, entries) in grouped.into_values() {
            let Ok(header) = self.crypto.decrypt_header(&header_key, encrypted_header) else {
                continue;
            };
            let Some((_, message_key)) = entries.iter().find(|(number, _)| *number == header.message_number) else {
                continue;
            };

            let message_auth = message_associated_data(encrypted_header, auth);
            let plaintext = self.crypto.decrypt_message(message_key, encrypted_message, &message_auth)?;
            self.skipped_keys.delete(&header_key, header.message_number);
            return Ok(Some(plaintext));
        }
        Ok(None)
    }

    /// Decodes `encrypted_header` under the current or next header key,
    /// reporting which one matched.
    fn decrypt_header(&self, encrypted_header: &[u8]) -> Result<(Header, bool), Error> {
        if let Some(header_key) = &self.header_key {
            if let Ok(header) = self.crypto.decrypt_header(header_key, encrypted_header) {
                return Ok((header, false));
            }
        }
        if let Some(next_header_key) = &self.next_header_key {
            if let Ok(header) = self.crypto.decrypt_header(next_header_key, encrypted_header) {
                return Ok((header, true));
            }
        }
        Err(Error::join(
            Error::SkippedKeysNotFound,
            Error::InvalidValue("header does not decrypt under the current or next header key".into()),
        ))
    }

    /// Advances the chain up to, but not including, message number `until`,
    /// stashing each message key it passes over under the current header key.
    ///
    /// Unlike advancing through ordinary decryption, this never rewinds:
    /// a `until` behind the chain's current message number is a caller error,
    /// not a no-op, since silently ignoring it would let a malicious or
    /// buggy peer replay header/message-number pairs undetected.
    fn skip_message_keys(&mut self, until: u64) -> Result<(), Error> {
        if until < self.messages_count {
            return Err(Error::InvalidValue(format!(
                "cannot skip to message {until} from {}: receiving chain must not move backwards",
                self.messages_count
            )));
        }

        if until > self.messages_count {
            log::trace!(
                "skipping {} message key(s) ahead of the current receiving chain position",
                until - self.messages_count
            );
        }

        while self.messages_count < until {
            let chain_key = self
                .chain_key
                .as_ref()
                .ok_or_else(|| Error::InvalidValue("receiving chain has no chain key to skip with".into()))?;
            let (new_chain_key, message_key) = self.crypto.advance_chain(chain_key)?;
            self.chain_key = Some(new_chain_key);

            let header_key = self
                .header_key
                .clone()
                .ok_or_else(|| Error::InvalidValue("receiving chain has no header key to skip with".into()))?;
            self.skipped_keys.add(&header_key, self.messages_count, message_key)?;
            self.messages_count += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{DefaultReceivingChainCrypto, DefaultSendingChainCrypto};
    use crate::keys::Public;
    use crate::sending_chain::SendingChain;
    use crate::skipped_keys::DefaultSkippedKeysStorage;

    fn seeded_pair() -> (SendingChain<DefaultSendingChainCrypto>, ReceivingChain<DefaultReceivingChainCrypto, DefaultSkippedKeysStorage>) {
        let chain_key = Master::from(vec![7u8; 64]);
        let header_key = HeaderKey::from(vec![8u8; 32]);
        let next_header_key = HeaderKey::from(vec![9u8; 32]);

        let mut sending = SendingChain::new(DefaultSendingChainCrypto);
        sending.upgrade(chain_key.clone(), header_key.clone(), next_header_key.clone());

        let mut receiving = ReceivingChain::new(DefaultReceivingChainCrypto, DefaultSkippedKeysStorage::new());
        receiving.upgrade(chain_key, header_key, Some(next_header_key));

        (sending, receiving)
    }

    #[test]
    fn decrypts_messages_in_order() {
        let (mut sending, mut receiving) = seeded_pair();
        let header = sending.prepare_header(Public::from(vec![1u8; 32]), 0);
        let (encrypted_header, encrypted_message) = sending.encrypt(&header, b"hello", b"").unwrap();

        let plaintext = receiving
            .decrypt(&encrypted_header, &encrypted_message, b"", |_| {
                panic!("no ratchet step expected")
            })
            .unwrap();
        assert_eq!(plaintext, b"hello");
    }

    #[test]
    fn decrypts_an_out_of_order_message_after_skipping() {
        let (mut sending, mut receiving) = seeded_pair();
        let header_a = sending.prepare_header(Public::from(vec![1u8; 32]), 0);
        let (encrypted_header_a, encrypted_message_a) = sending.encrypt(&header_a, b"first", b"").unwrap();

        let header_b = sending.prepare_header(Public::from(vec![1u8; 32]), 0);
        let (encrypted_header_b, encrypted_message_b) = sending.encrypt(&header_b, b"second", b"").unwrap();

        let plaintext_b = receiving
            .decrypt(&encrypted_header_b, &encrypted_message_b, b"", |_| {
                panic!("no ratchet step expected")
            })
            .unwrap();
        assert_eq!(plaintext_b, b"second");

        let plaintext_a = receiving
            .decrypt(&encrypted_header_a, &encrypted_message_a, b"", |_| {
                panic!("no ratchet step expected")
            })
            .unwrap();
        assert_eq!(plaintext_a, b"first");
    }

    #[test]
    fn skip_message_keys_fails_on_an_uninitialized_chain_when_asked_to_move_forward() {
        let mut receiving = ReceivingChain::new(DefaultReceivingChainCrypto, DefaultSkippedKeysStorage::new());
        let err = receiving.skip_message_keys(3).unwrap_err();
        assert!(matches!(err, Error::InvalidValue(_)));
    }

    #[test]
    fn skip_message_keys_rejects_moving_backwards() {
        let (mut sending, mut receiving) = seeded_pair();
        let header = sending.prepare_header(Public::from(vec![1u8; 32]), 0);
        let (encrypted_header, encrypted_message) = sending.encrypt(&header, b"hello", b"").unwrap();
        receiving
            .decrypt(&encrypted_header, &encrypted_message, b"", |_| panic!("unexpected"))
            .unwrap();

        let err = receiving.skip_message_keys(0).unwrap_err();
        assert!(matches!(err, Error::InvalidValue(_)));
    }

    #[test]
    fn a_skipped_key_survives_a_failed_decrypt_attempt() {
        let (mut sending, mut receiving) = seeded_pair();
        let header_a = sending.prepare_header(Public::from(vec![1u8; 32]), 0);
        let (encrypted_header_a, encrypted_message_a) = sending.encrypt(&header_a, b"first", b"real-aad").unwrap();

        let header_b = sending.prepare_header(Public::from(vec![1u8; 32]), 0);
        let (encrypted_header_b, encrypted_message_b) = sending.encrypt(&header_b, b"second", b"real-aad").unwrap();

        receiving
            .decrypt(&encrypted_header_b, &encrypted_message_b, b"real-aad", |_| {
                panic!("no ratchet step expected")
            })
            .unwrap();

        let err = receiving
            .decrypt(&encrypted_header_a, &encrypted_message_a, b"wrong-aad", |_| {
                panic!("no ratchet step expected")
            })
            .unwrap_err();
        assert!(matches!(err, Error::Crypto(_)));

        let plaintext = receiving
            .decrypt(&encrypted_header_a, &encrypted_message_a, b"real-aad", |_| {
                panic!("no ratchet step expected")
            })
            .unwrap();
        assert_eq!(plaintext, b"first");
    }

    #[test]
    fn out_of_order_delivery_with_four_messages_reorders_correctly() {
        let (mut sending, mut receiving) = seeded_pair();
        let messages = [b"m0".as_slice(), b"m1", b"m2", b"m3"];
        let encrypted: Vec<_> = messages
            .iter()
            .map(|m| {
                let header = sending.prepare_header(Public::from(vec![1u8; 32]), 0);
                sending.encrypt(&header, m, b"").unwrap()
            })
            .collect();

        let delivery_order = [2, 0, 3, 1];
        for &i in &delivery_order {
            let (encrypted_header, encrypted_message) = &encrypted[i];
            let plaintext = receiving
                .decrypt(encrypted_header, encrypted_message, b"", |_| panic!("no ratchet step expected"))
                .unwrap();
            assert_eq!(plaintext, messages[i]);
        }
    }
}
