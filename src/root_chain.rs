//! The root chain: the outermost ratchet, advanced once per Diffie-Hellman
//! ratchet step and used to seed a fresh sending or receiving chain.

use crate::crypto::RootChainCrypto;
use crate::errors::Error;
use crate::keys::{Header as HeaderKey, Master, Root, Shared};

/// Holds the current root key and advances it under a [`RootChainCrypto`].
pub struct RootChain<C> {
    root_key: Root,
    crypto: C,
}

impl<C: RootChainCrypto> RootChain<C> {
    pub fn new(root_key: Root, crypto: C) -> Self {
        Self { root_key, crypto }
    }

    /// Feeds a new Diffie-Hellman shared secret into the root chain, returning
    /// the master key and header key to seed a sending or receiving chain with.
    pub fn advance(&mut self, shared: &Shared) -> Result<(Master, HeaderKey), Error> {
        let (new_root, master, header_key) = self.crypto.advance_chain(&self.root_key, shared)?;
        self.root_key = new_root;
        Ok((master, header_key))
    }
}

impl<C: Clone> Clone for RootChain<C> {
    fn clone(&self) -> Self {
        Self {
            root_key: self.root_key.clone(),
            crypto: self.crypto.clone(),
        }
    }
}
