//! The sending chain: derives one message key per outgoing message and
//! encrypts both the header and the message body under it.

use crate::crypto::{message_associated_data, SendingChainCrypto};
use crate::errors::Error;
use crate::header::Header;
use crate::keys::{Header as HeaderKey, Master, Public};

/// Holds the sending side's chain key and header keys, advancing once per
/// message sent.
pub struct SendingChain<C> {
    chain_key: Option<Master>,
    header_key: Option<HeaderKey>,
    next_header_key: Option<HeaderKey>,
    messages_count: u64,
    crypto: C,
}

impl<C: Clone> Clone for SendingChain<C> {
    fn clone(&self) -> Self {
        Self {
            chain_key: self.chain_key.clone(),
            header_key: self.header_key.clone(),
            next_header_key: self.next_header_key.clone(),
            messages_count: self.messages_count,
            crypto: self.crypto.clone(),
        }
    }
}

impl<C: SendingChainCrypto> SendingChain<C> {
    pub fn new(crypto: C) -> Self {
        Self {
            chain_key: None,
            header_key: None,
            next_header_key: None,
            messages_count: 0,
            crypto,
        }
    }

    /// Seeds (or reseeds, after a Diffie-Hellman ratchet step) this chain
    /// with a fresh chain key and header keys, resetting the message counter.
    pub fn upgrade(&mut self, chain_key: Master, header_key: HeaderKey, next_header_key: HeaderKey) {
        self.chain_key = Some(chain_key);
        self.header_key = Some(header_key);
        self.next_header_key = Some(next_header_key);
        self.messages_count = 0;
    }

    /// Sets only the next header key, leaving the chain otherwise
    /// unseeded. Used by a freshly constructed recipient, which knows the
    /// header key its first reply must be encrypted under but has no chain
    /// key of its own until its first Diffie-Hellman ratchet step.
    pub fn upgrade_next_header_key_only(&mut self, next_header_key: HeaderKey) {
        self.next_header_key = Some(next_header_key);
    }

    /// The header key a peer will need to decrypt the next message's header.
    pub fn next_header_key(&self) -> Option<&HeaderKey> {
        self.next_header_key.as_ref()
    }

    /// Builds the plaintext header for the next outgoing message.
    pub fn prepare_header(&self, public_key: Public, previous_sending_chain_messages_count: u64) -> Header {
        Header::new(public_key, previous_sending_chain_messages_count, self.messages_count)
    }

    /// Advances the chain and encrypts `header` and `plaintext`, returning
    /// `(encrypted_header, encrypted_message)`.
    ///
    /// The message is bound to its own encrypted header: the associated data
    /// passed to the message AEAD is `encrypted_header || auth`, not `auth`
    /// alone, so a header from a different message can never be paired with
    /// this ciphertext without the swap being detected.
    pub fn encrypt(&mut self, header: &Header, plaintext: &[u8], auth: &[u8]) -> Result<(Vec<u8>, Vec<u8>), Error> {
        let chain_key = self
            .chain_key
            .as_ref()
            .ok_or_else(|| Error::InvalidValue("sending chain has no chain key".into()))?;
        let header_key = self
            .header_key
            .as_ref()
            .ok_or_else(|| Error::InvalidValue("sending chain has no header key".into()))?;

        let (new_chain_key, message_key) = self.crypto.advance_chain(chain_key)?;
        let encrypted_header = self.crypto.encrypt_header(header_key, header)?;

        let message_auth = message_associated_data(&encrypted_header, auth);
        let encrypted_message = self.crypto.encrypt_message(&message_key, plaintext, &message_auth)?;

        self.chain_key = Some(new_chain_key);
        self.messages_count += 1;
        Ok((encrypted_header, encrypted_message))
    }

    /// The number of messages sent under the current chain key.
    pub fn messages_count(&self) -> u64 {
        self.messages_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::DefaultSendingChainCrypto;

    #[test]
    fn encrypt_requires_a_chain_key() {
        let mut chain = SendingChain::new(DefaultSendingChainCrypto);
        let header = chain.prepare_header(Public::from(vec![1u8; 32]), 0);
        let err = chain.encrypt(&header, b"hi", b"").unwrap_err();
        assert!(matches!(err, Error::InvalidValue(_)));
    }

    #[test]
    fn encrypt_advances_the_message_counter() {
        let mut chain = SendingChain::new(DefaultSendingChainCrypto);
        chain.upgrade(
            Master::from(vec![1u8; 64]),
            HeaderKey::from(vec![2u8; 32]),
            HeaderKey::from(vec![3u8; 32]),
        );

        let header = chain.prepare_header(Public::from(vec![9u8; 32]), 0);
        chain.encrypt(&header, b"hello", b"").unwrap();
        assert_eq!(chain.messages_count(), 1);

        let header = chain.prepare_header(Public::from(vec![9u8; 32]), 0);
        chain.encrypt(&header, b"again", b"").unwrap();
        assert_eq!(chain.messages_count(), 2);
    }
}
