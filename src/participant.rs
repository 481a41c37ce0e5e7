//! Ties the root, sending and receiving chains together into the two roles
//! of a Double Ratchet session: the party that sends the first message and
//! the party that receives it.
//!
//! Both roles are constructed from a shared secret and a pair of header keys
//! — material an X3DH-style handshake (or any other key-agreement the caller
//! runs beforehand) is expected to hand in. The sender's sending-chain header
//! key is the recipient's receiving-chain header key, and the sender's
//! receiving-chain header key is the recipient's sending-chain header key:
//! the two chains that face each other always share a key. Establishing that
//! initial secret is outside this crate's concern; from here on,
//! [`Participant`] owns the ratchet.

use crate::config::Config;
use crate::crypto::{Dh, ReceivingChainCrypto, RootChainCrypto, SendingChainCrypto};
use crate::errors::Error;
use crate::header::Header as MessageHeader;
use crate::keys::{Header as HeaderKey, Private, Public, Root, Shared};
use crate::receiving_chain::ReceivingChain;
use crate::root_chain::RootChain;
use crate::sending_chain::SendingChain;
use crate::skipped_keys::SkippedKeysStorage;
use crate::transaction;

/// One side of a Double Ratchet session.
pub struct Participant<D, RC, SC, RCC, S> {
    dh: D,
    local_private: Private,
    local_public: Public,
    remote_public: Option<Public>,
    previous_sending_chain_messages_count: u64,
    need_sending_ratchet: bool,
    root: RootChain<RC>,
    sending: SendingChain<SC>,
    receiving: ReceivingChain<RCC, S>,
}

/// Every mutating operation below runs against a clone of the whole
/// participant and only writes it back on success (see
/// [`crate::transaction::atomically`]): a DH ratchet step that advances the
/// root chain but then fails to re-seed a message chain must not leave the
/// participant half-advanced.
impl<D, RC, SC, RCC, S> Clone for Participant<D, RC, SC, RCC, S>
where
    D: Clone,
    RC: Clone,
    SC: Clone,
    RCC: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            dh: self.dh.clone(),
            local_private: self.local_private.clone(),
            local_public: self.local_public.clone(),
            remote_public: self.remote_public.clone(),
            previous_sending_chain_messages_count: self.previous_sending_chain_messages_count,
            need_sending_ratchet: self.need_sending_ratchet,
            root: self.root.clone(),
            sending: self.sending.clone(),
            receiving: self.receiving.clone(),
        }
    }
}

impl<D, RC, SC, RCC, S> Participant<D, RC, SC, RCC, S>
where
    D: Dh + Clone,
    RC: RootChainCrypto + Clone,
    SC: SendingChainCrypto + Clone,
    RCC: ReceivingChainCrypto + Clone,
    S: SkippedKeysStorage,
{
    /// Initializes the participant that sends the first message.
    ///
    /// `remote_public` is the recipient's ratchet public key,
    /// `send_header_key` the header key the first outgoing message is
    /// encrypted under, and `recv_next_header_key` the header key this
    /// participant expects the recipient's first reply to arrive under;
    /// together with `shared_secret` these seed the root chain and the
    /// first sending chain in one step, so this participant can encrypt
    /// immediately.
    pub fn new_sender(
        shared_secret: Shared,
        send_header_key: HeaderKey,
        recv_next_header_key: HeaderKey,
        remote_public: Public,
        config: Config<D, RC, SC, RCC, S>,
    ) -> Result<Self, Error> {
        let (local_private, local_public) = config.dh.generate_key_pair()?;
        let shared = config.dh.diffie_hellman(&local_private, &remote_public)?;

        let mut root = RootChain::new(Root::from(shared_secret.into_bytes()), config.root_chain_crypto);
        let (master, next_header_key) = root.advance(&shared)?;

        let mut sending = SendingChain::new(config.sending_chain_crypto);
        sending.upgrade(master, send_header_key, next_header_key);

        let mut receiving = ReceivingChain::new(config.receiving_chain_crypto, config.skipped_keys_storage);
        receiving.upgrade_next_header_key_only(recv_next_header_key);

        Ok(Self {
            dh: config.dh,
            local_private,
            local_public,
            remote_public: Some(remote_public),
            previous_sending_chain_messages_count: 0,
            need_sending_ratchet: false,
            root,
            sending,
            receiving,
        })
    }

    /// Initializes the participant that receives the first message.
    ///
    /// `local_key_pair` is this participant's own ratchet key pair, already
    /// published to the sender as part of the handshake that produced
    /// `shared_secret`. `send_next_header_key` is the header key this
    /// participant's first reply must be encrypted under, once it performs
    /// its first Diffie-Hellman ratchet step, and `recv_next_header_key` the
    /// header key the sender's first message arrives under.
    pub fn new_recipient(
        shared_secret: Shared,
        send_next_header_key: HeaderKey,
        recv_next_header_key: HeaderKey,
        local_key_pair: (Private, Public),
        config: Config<D, RC, SC, RCC, S>,
    ) -> Result<Self, Error> {
        let (local_private, local_public) = local_key_pair;
        let root = RootChain::new(Root::from(shared_secret.into_bytes()), config.root_chain_crypto);

        let mut sending = SendingChain::new(config.sending_chain_crypto);
        sending.upgrade_next_header_key_only(send_next_header_key);

        let mut receiving = ReceivingChain::new(config.receiving_chain_crypto, config.skipped_keys_storage);
        receiving.upgrade_next_header_key_only(recv_next_header_key);

        Ok(Self {
            dh: config.dh,
            local_private,
            local_public,
            remote_public: None,
            previous_sending_chain_messages_count: 0,
            need_sending_ratchet: false,
            root,
            sending,
            receiving,
        })
    }

    /// Encrypts `plaintext`, performing a Diffie-Hellman ratchet step first
    /// if a message has arrived since this participant last sent one.
    ///
    /// Runs against a clone of this participant via
    /// [`transaction::atomically`]; a failure midway through the ratchet step
    /// or the sending chain's own encryption leaves this participant exactly
    /// as it was before the call.
    pub fn encrypt(&mut self, plaintext: &[u8], auth: &[u8]) -> Result<(Vec<u8>, Vec<u8>), Error> {
        transaction::atomically(self, |participant| {
            if participant.need_sending_ratchet {
                participant.perform_sending_ratchet()?;
            }

            let header = participant
                .sending
                .prepare_header(participant.local_public.clone(), participant.previous_sending_chain_messages_count);
            participant.sending.encrypt(&header, plaintext, auth)
        })
    }

    /// Decrypts an incoming message, transparently performing a
    /// Diffie-Hellman ratchet step if the header announces one.
    ///
    /// Runs against a clone of this participant via
    /// [`transaction::atomically`]; if the ratchet callback or the
    /// receiving chain's decrypt fails at any point this participant is left
    /// unchanged, including any message keys the chain skipped ahead of
    /// before the failure.
    pub fn decrypt(&mut self, encrypted_header: &[u8], encrypted_message: &[u8], auth: &[u8]) -> Result<Vec<u8>, Error> {
        transaction::atomically(self, |participant| {
            let local_private = participant.local_private.clone();
            let mut new_remote_public = None;

            let root = &mut participant.root;
            let dh = &participant.dh;

            let plaintext = participant.receiving.decrypt(encrypted_header, encrypted_message, auth, |header: &MessageHeader| {
                new_remote_public = Some(header.public_key.clone());
                let shared = dh.diffie_hellman(&local_private, &header.public_key)?;
                root.advance(&shared)
            })?;

            if let Some(remote_public) = new_remote_public {
                participant.remote_public = Some(remote_public);
                participant.need_sending_ratchet = true;
            }

            Ok(plaintext)
        })
    }

    /// Generates a fresh ratchet key pair and advances the root chain
    /// against the current remote public key, seeding a new sending chain.
    fn perform_sending_ratchet(&mut self) -> Result<(), Error> {
        let remote_public = self
            .remote_public
            .clone()
            .ok_or_else(|| Error::InvalidValue("cannot ratchet the sending chain before a remote public key is known".into()))?;

        let header_key = self
            .sending
            .next_header_key()
            .cloned()
            .ok_or_else(|| Error::InvalidValue("sending chain has no next header key to promote".into()))?;

        log::debug!("performing a sending-chain DH ratchet step before the next encrypt");

        let (new_private, new_public) = self.dh.generate_key_pair()?;
        let shared = self.dh.diffie_hellman(&new_private, &remote_public)?;
        let (master, next_header_key) = self.root.advance(&shared)?;

        self.previous_sending_chain_messages_count = self.sending.messages_count();
        self.sending.upgrade(master, header_key, next_header_key);
        self.local_private = new_private;
        self.local_public = new_public;
        self.need_sending_ratchet = false;
        Ok(())
    }

    /// This participant's current ratchet public key.
    pub fn local_public(&self) -> &Public {
        &self.local_public
    }
}
