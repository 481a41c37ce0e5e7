//! Builder for the crypto capabilities a [`crate::participant::Participant`]
//! is constructed with.
//!
//! Each capability defaults to this crate's own primitive (X25519, the
//! BLAKE2b-based KDF/MAC pair, XChaCha20-Poly1305, and the bounded in-memory
//! skipped-keys store) so a caller only needs to override the pieces it wants
//! to swap — a test harness overriding the skipped-keys store to assert on
//! its contents, say, without having to also respecify the AEAD.

use crate::crypto::{
    DefaultDh, DefaultReceivingChainCrypto, DefaultRootChainCrypto, DefaultSendingChainCrypto, Dh,
    ReceivingChainCrypto, RootChainCrypto, SendingChainCrypto,
};
use crate::errors::Error;
use crate::skipped_keys::{DefaultSkippedKeysStorage, SkippedKeysStorage};

/// Resolved set of capabilities ready to build a
/// [`crate::participant::Participant`] from.
pub struct Config<
    D = DefaultDh,
    RC = DefaultRootChainCrypto,
    SC = DefaultSendingChainCrypto,
    RCC = DefaultReceivingChainCrypto,
    S = DefaultSkippedKeysStorage,
> {
    pub(crate) dh: D,
    pub(crate) root_chain_crypto: RC,
    pub(crate) sending_chain_crypto: SC,
    pub(crate) receiving_chain_crypto: RCC,
    pub(crate) skipped_keys_storage: S,
}

/// Accumulates option overrides before [`ConfigBuilder::build`] resolves them
/// against this crate's defaults.
pub struct ConfigBuilder<D, RC, SC, RCC, S> {
    dh: Option<D>,
    root_chain_crypto: Option<RC>,
    sending_chain_crypto: Option<SC>,
    receiving_chain_crypto: Option<RCC>,
    skipped_keys_storage: Option<S>,
}

impl Default
    for ConfigBuilder<DefaultDh, DefaultRootChainCrypto, DefaultSendingChainCrypto, DefaultReceivingChainCrypto, DefaultSkippedKeysStorage>
{
    fn default() -> Self {
        Self {
            dh: None,
            root_chain_crypto: None,
            sending_chain_crypto: None,
            receiving_chain_crypto: None,
            skipped_keys_storage: None,
        }
    }
}

impl ConfigBuilder<DefaultDh, DefaultRootChainCrypto, DefaultSendingChainCrypto, DefaultReceivingChainCrypto, DefaultSkippedKeysStorage> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D, RC, SC, RCC, S> ConfigBuilder<D, RC, SC, RCC, S> {
    /// Overrides the participant-level Diffie-Hellman capability.
    pub fn with_crypto<D2: Dh>(self, dh: D2) -> ConfigBuilder<D2, RC, SC, RCC, S> {
        ConfigBuilder {
            dh: Some(dh),
            root_chain_crypto: self.root_chain_crypto,
            sending_chain_crypto: self.sending_chain_crypto,
            receiving_chain_crypto: self.receiving_chain_crypto,
            skipped_keys_storage: self.skipped_keys_storage,
        }
    }

    /// Overrides the root-chain crypto.
    pub fn with_root_chain_crypto<RC2: RootChainCrypto>(self, crypto: RC2) -> ConfigBuilder<D, RC2, SC, RCC, S> {
        ConfigBuilder {
            dh: self.dh,
            root_chain_crypto: Some(crypto),
            sending_chain_crypto: self.sending_chain_crypto,
            receiving_chain_crypto: self.receiving_chain_crypto,
            skipped_keys_storage: self.skipped_keys_storage,
        }
    }

    /// Overrides the sending-chain crypto.
    pub fn with_sending_chain_crypto<SC2: SendingChainCrypto>(self, crypto: SC2) -> ConfigBuilder<D, RC, SC2, RCC, S> {
        ConfigBuilder {
            dh: self.dh,
            root_chain_crypto: self.root_chain_crypto,
            sending_chain_crypto: Some(crypto),
            receiving_chain_crypto: self.receiving_chain_crypto,
            skipped_keys_storage: self.skipped_keys_storage,
        }
    }

    /// Overrides the receiving-chain crypto.
    pub fn with_receiving_chain_crypto<RCC2: ReceivingChainCrypto>(self, crypto: RCC2) -> ConfigBuilder<D, RC, SC, RCC2, S> {
        ConfigBuilder {
            dh: self.dh,
            root_chain_crypto: self.root_chain_crypto,
            sending_chain_crypto: self.sending_chain_crypto,
            receiving_chain_crypto: Some(crypto),
            skipped_keys_storage: self.skipped_keys_storage,
        }
    }

    /// Overrides the skipped-message-keys store used by the receiving chain.
    pub fn with_skipped_keys_storage<S2: SkippedKeysStorage>(self, storage: S2) -> ConfigBuilder<D, RC, SC, RCC, S2> {
        ConfigBuilder {
            dh: self.dh,
            root_chain_crypto: self.root_chain_crypto,
            sending_chain_crypto: self.sending_chain_crypto,
            receiving_chain_crypto: self.receiving_chain_crypto,
            skipped_keys_storage: Some(storage),
        }
    }
}

impl<D, RC, SC, RCC, S> ConfigBuilder<D, RC, SC, RCC, S>
where
    D: Dh + Default,
    RC: RootChainCrypto + Default,
    SC: SendingChainCrypto + Default,
    RCC: ReceivingChainCrypto + Default,
    S: SkippedKeysStorage + Default,
{
    /// Resolves every unset capability to this crate's default and produces
    /// a [`Config`].
    ///
    /// This never fails today — every capability this crate ships has a
    /// usable default — but returns `Result` because a future capability
    /// (e.g. a remote skipped-keys store needing a connection string) may
    /// need to validate its configuration before a [`crate::participant::Participant`]
    /// is built from it.
    pub fn build(self) -> Result<Config<D, RC, SC, RCC, S>, Error> {
        Ok(Config {
            dh: self.dh.unwrap_or_default(),
            root_chain_crypto: self.root_chain_crypto.unwrap_or_default(),
            sending_chain_crypto: self.sending_chain_crypto.unwrap_or_default(),
            receiving_chain_crypto: self.receiving_chain_crypto.unwrap_or_default(),
            skipped_keys_storage: self.skipped_keys_storage.unwrap_or_default(),
        })
    }
}

impl Config<DefaultDh, DefaultRootChainCrypto, DefaultSendingChainCrypto, DefaultReceivingChainCrypto, DefaultSkippedKeysStorage> {
    /// Starts building a [`Config`] from this crate's defaults.
    pub fn builder() -> ConfigBuilder<DefaultDh, DefaultRootChainCrypto, DefaultSendingChainCrypto, DefaultReceivingChainCrypto, DefaultSkippedKeysStorage>
    {
        ConfigBuilder::new()
    }
}
