//! Capability interfaces for the cryptographic primitives the ratchet needs,
//! plus the crate's default implementations.
//!
//! The core never names X25519, BLAKE2b or XChaCha20-Poly1305 directly —
//! every chain and the participant are generic over these traits — but the
//! defaults below pin those exact primitives so the wire format and the
//! testable properties in the spec are reproducible across implementations.

use crate::constants::{
    CURVE25519_KEY_LENGTH, MESSAGE_CIPHER_KDF_OUTPUT_LENGTH, MIN_ENCRYPTED_HEADER_LENGTH,
    ROOT_CHAIN_KDF_OUTPUT_LENGTH, ROOT_CHAIN_KDF_SLOT_LENGTH, XCHACHA20_KEY_LENGTH,
    XCHACHA20_NONCE_LENGTH,
};
use crate::errors::{CryptoError, Error};
use crate::header::Header;
use crate::keys::{Master, Message, Private, Public, Root, Shared};

use blake2::Blake2b512;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key as ChaChaKey, XChaCha20Poly1305, XNonce};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand_core::{OsRng, RngCore};

/// Participant-level Diffie-Hellman and key-generation capability.
pub trait Dh {
    /// Generates a fresh local key pair.
    fn generate_key_pair(&self) -> Result<(Private, Public), Error>;

    /// Computes the shared secret between a local private key and a peer's public key.
    fn diffie_hellman(&self, local_private: &Private, remote_public: &Public) -> Result<Shared, Error>;
}

/// Root-chain crypto capability: advances the root chain given a new DH shared secret.
pub trait RootChainCrypto {
    /// Returns `(new_root_key, message_chain_master_key, next_header_key)`.
    fn advance_chain(&self, root_key: &Root, shared: &Shared) -> Result<(Root, Master, Header), Error>;
}

/// Sending-chain crypto capability.
pub trait SendingChainCrypto {
    /// Advances the symmetric chain, returning `(new_master_key, message_key)`.
    fn advance_chain(&self, master_key: &Master) -> Result<(Master, Message), Error>;

    /// Encrypts an encoded header under a header key, prepending a random nonce.
    fn encrypt_header(&self, key: &Header, header: &crate::header::Header) -> Result<Vec<u8>, Error>;

    /// Encrypts a message under a per-message key with the given associated data.
    fn encrypt_message(&self, key: &Message, data: &[u8], auth: &[u8]) -> Result<Vec<u8>, Error>;
}

/// Receiving-chain crypto capability.
pub trait ReceivingChainCrypto {
    /// Advances the symmetric chain, returning `(new_master_key, message_key)`.
    fn advance_chain(&self, master_key: &Master) -> Result<(Master, Message), Error>;

    /// Decrypts an encrypted header under a header key.
    fn decrypt_header(&self, key: &Header, encrypted_header: &[u8]) -> Result<crate::header::Header, Error>;

    /// Decrypts a message under a per-message key with the given associated data.
    fn decrypt_message(&self, key: &Message, encrypted_message: &[u8], auth: &[u8]) -> Result<Vec<u8>, Error>;
}

/// Derives the XChaCha20-Poly1305 key and nonce used to encrypt a message, from
/// its message key. Shared between the sending and receiving default crypto so
/// both sides agree on the cipher key regardless of direction.
fn derive_message_cipher_key_and_nonce(message_key: &Message) -> Result<([u8; XCHACHA20_KEY_LENGTH], [u8; XCHACHA20_NONCE_LENGTH]), Error> {
    let salt = [0u8; MESSAGE_CIPHER_KDF_OUTPUT_LENGTH];
    let kdf = Hkdf::<Blake2b512>::new(Some(&salt), message_key.as_bytes());

    let mut output = [0u8; MESSAGE_CIPHER_KDF_OUTPUT_LENGTH];
    kdf.expand(b"message cipher", &mut output)?;

    let mut key = [0u8; XCHACHA20_KEY_LENGTH];
    let mut nonce = [0u8; XCHACHA20_NONCE_LENGTH];
    key.copy_from_slice(&output[..XCHACHA20_KEY_LENGTH]);
    nonce.copy_from_slice(&output[XCHACHA20_KEY_LENGTH..]);
    Ok((key, nonce))
}

/// Binds a message ciphertext to the encrypted header it travels with: the
/// message AEAD's associated data is `encrypted_header || auth`, never
/// `auth` alone, so a header from a different message can never be
/// substituted in without the AEAD tag failing to verify.
pub(crate) fn message_associated_data(encrypted_header: &[u8], auth: &[u8]) -> Vec<u8> {
    let mut combined = Vec::with_capacity(encrypted_header.len() + auth.len());
    combined.extend_from_slice(encrypted_header);
    combined.extend_from_slice(auth);
    combined
}

fn seal(key: &[u8], nonce: &[u8], data: &[u8], auth: &[u8]) -> Result<Vec<u8>, Error> {
    let cipher = XChaCha20Poly1305::new(ChaChaKey::from_slice(key));
    let payload = Payload { msg: data, aad: auth };
    Ok(cipher.encrypt(XNonce::from_slice(nonce), payload)?)
}

fn open(key: &[u8], nonce: &[u8], data: &[u8], auth: &[u8]) -> Result<Vec<u8>, Error> {
    let cipher = XChaCha20Poly1305::new(ChaChaKey::from_slice(key));
    let payload = Payload { msg: data, aad: auth };
    Ok(cipher.decrypt(XNonce::from_slice(nonce), payload)?)
}

/// Advances a symmetric (master-key) chain one step via HMAC-BLAKE2b-512,
/// the way both the sending and receiving chain's default crypto do.
///
/// The tag bytes `0x02`/`0x01` are part of the wire-level contract with any
/// peer running the same default crypto and must not change.
fn advance_symmetric_chain(master_key: &Master) -> Result<(Master, Message), Error> {
    const MASTER_KEY_TAG: u8 = 0x02;
    const MESSAGE_KEY_TAG: u8 = 0x01;

    let mut mac = Hmac::<Blake2b512>::new_from_slice(master_key.as_bytes())?;
    mac.update(&[MASTER_KEY_TAG]);
    let new_master_key = Master::from(mac.finalize_reset().into_bytes().to_vec());

    mac.update(&[MESSAGE_KEY_TAG]);
    let message_key = Message::from(mac.finalize().into_bytes().to_vec());

    Ok((new_master_key, message_key))
}

/// The crate's default X25519 Diffie-Hellman capability.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultDh;

impl Dh for DefaultDh {
    fn generate_key_pair(&self) -> Result<(Private, Public), Error> {
        let private = x25519_dalek::StaticSecret::random_from_rng(OsRng);
        let public = x25519_dalek::PublicKey::from(&private);
        Ok((
            Private::from(private.to_bytes().to_vec()),
            Public::from(public.to_bytes().to_vec()),
        ))
    }

    fn diffie_hellman(&self, local_private: &Private, remote_public: &Public) -> Result<Shared, Error> {
        let private_bytes: [u8; CURVE25519_KEY_LENGTH] = local_private
            .as_bytes()
            .try_into()
            .map_err(|_| Error::Crypto(CryptoError::Dh("private key is not 32 bytes".into())))?;
        let public_bytes: [u8; CURVE25519_KEY_LENGTH] = remote_public
            .as_bytes()
            .try_into()
            .map_err(|_| Error::Crypto(CryptoError::Dh("public key is not 32 bytes".into())))?;

        let private = x25519_dalek::StaticSecret::from(private_bytes);
        let public = x25519_dalek::PublicKey::from(public_bytes);
        let shared = private.diffie_hellman(&public);
        Ok(Shared::from(shared.to_bytes().to_vec()))
    }
}

/// The crate's default root-chain crypto: HKDF-BLAKE2b-512 over `ikm = shared`,
/// `salt = root`, `info = "advance root chain"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultRootChainCrypto;

impl RootChainCrypto for DefaultRootChainCrypto {
    fn advance_chain(&self, root_key: &Root, shared: &Shared) -> Result<(Root, Master, Header), Error> {
        let kdf = Hkdf::<Blake2b512>::new(Some(root_key.as_bytes()), shared.as_bytes());
        let mut output = [0u8; ROOT_CHAIN_KDF_OUTPUT_LENGTH];
        kdf.expand(b"advance root chain", &mut output)?;

        let new_root = Root::from(output[..ROOT_CHAIN_KDF_SLOT_LENGTH].to_vec());
        let master = Master::from(
            output[ROOT_CHAIN_KDF_SLOT_LENGTH..2 * ROOT_CHAIN_KDF_SLOT_LENGTH].to_vec(),
        );
        let next_header = Header::from(output[2 * ROOT_CHAIN_KDF_SLOT_LENGTH..].to_vec());
        Ok((new_root, master, next_header))
    }
}

/// The crate's default sending-chain crypto: HMAC-BLAKE2b-512 symmetric
/// ratchet, XChaCha20-Poly1305 for both header and message encryption.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultSendingChainCrypto;

impl SendingChainCrypto for DefaultSendingChainCrypto {
    fn advance_chain(&self, master_key: &Master) -> Result<(Master, Message), Error> {
        advance_symmetric_chain(master_key)
    }

    fn encrypt_header(&self, key: &Header, header: &crate::header::Header) -> Result<Vec<u8>, Error> {
        let mut nonce = [0u8; XCHACHA20_NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = seal(key.as_bytes(), &nonce, &header.encode(), &[])?;
        let mut encrypted_header = Vec::with_capacity(XCHACHA20_NONCE_LENGTH + ciphertext.len());
        encrypted_header.extend_from_slice(&nonce);
        encrypted_header.extend_from_slice(&ciphertext);
        Ok(encrypted_header)
    }

    fn encrypt_message(&self, key: &Message, data: &[u8], auth: &[u8]) -> Result<Vec<u8>, Error> {
        let (cipher_key, nonce) = derive_message_cipher_key_and_nonce(key)?;
        seal(&cipher_key, &nonce, data, auth)
    }
}

/// The crate's default receiving-chain crypto, symmetric to
/// [`DefaultSendingChainCrypto`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultReceivingChainCrypto;

impl ReceivingChainCrypto for DefaultReceivingChainCrypto {
    fn advance_chain(&self, master_key: &Master) -> Result<(Master, Message), Error> {
        advance_symmetric_chain(master_key)
    }

    fn decrypt_header(&self, key: &Header, encrypted_header: &[u8]) -> Result<crate::header::Header, Error> {
        if encrypted_header.len() < MIN_ENCRYPTED_HEADER_LENGTH {
            return Err(Error::InvalidValue(format!(
                "encrypted header too short: expected at least {MIN_ENCRYPTED_HEADER_LENGTH} bytes, got {}",
                encrypted_header.len()
            )));
        }

        let (nonce, ciphertext) = encrypted_header.split_at(XCHACHA20_NONCE_LENGTH);
        let header_bytes = open(key.as_bytes(), nonce, ciphertext, &[])?;
        crate::header::Header::decode(&header_bytes)
    }

    fn decrypt_message(&self, key: &Message, encrypted_message: &[u8], auth: &[u8]) -> Result<Vec<u8>, Error> {
        let (cipher_key, nonce) = derive_message_cipher_key_and_nonce(key)?;
        open(&cipher_key, &nonce, encrypted_message, auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dh_produces_matching_shared_secrets() {
        let dh = DefaultDh;
        let (alice_private, alice_public) = dh.generate_key_pair().unwrap();
        let (bob_private, bob_public) = dh.generate_key_pair().unwrap();

        let alice_shared = dh.diffie_hellman(&alice_private, &bob_public).unwrap();
        let bob_shared = dh.diffie_hellman(&bob_private, &alice_public).unwrap();
        assert_eq!(alice_shared.as_bytes(), bob_shared.as_bytes());
    }

    #[test]
    fn root_chain_advance_outputs_are_distinct_and_non_empty() {
        let crypto = DefaultRootChainCrypto;
        let root = Root::from(vec![1u8; 32]);
        let shared = Shared::from(vec![2u8; 32]);

        let (new_root, master, next_header) = crypto.advance_chain(&root, &shared).unwrap();
        assert!(!new_root.as_bytes().is_empty());
        assert!(!master.as_bytes().is_empty());
        assert!(!next_header.as_bytes().is_empty());
        assert_ne!(new_root.as_bytes(), root.as_bytes());
        assert_ne!(new_root.as_bytes(), master.as_bytes());
        assert_ne!(master.as_bytes(), next_header.as_bytes());
    }

    #[test]
    fn symmetric_ratchet_is_deterministic_and_one_way() {
        let master = Master::from(vec![5u8; 64]);
        let (next_master, message_key) = advance_symmetric_chain(&master).unwrap();
        let (next_master_again, message_key_again) = advance_symmetric_chain(&master).unwrap();
        assert_eq!(next_master.as_bytes(), next_master_again.as_bytes());
        assert_eq!(message_key.as_bytes(), message_key_again.as_bytes());
        assert_ne!(next_master.as_bytes(), message_key.as_bytes());
        assert_ne!(next_master.as_bytes(), master.as_bytes());
    }

    #[test]
    fn header_encrypt_decrypt_round_trips() {
        let key = Header::from(vec![3u8; 32]);
        let original = crate::header::Header::new(Public::from(vec![4u8; 32]), 1, 2);

        let sending = DefaultSendingChainCrypto;
        let receiving = DefaultReceivingChainCrypto;

        let encrypted = sending.encrypt_header(&key, &original).unwrap();
        let decrypted = receiving.decrypt_header(&key, &encrypted).unwrap();
        assert_eq!(original, decrypted);
    }

    #[test]
    fn decrypt_header_rejects_short_input() {
        let key = Header::from(vec![3u8; 32]);
        let receiving = DefaultReceivingChainCrypto;
        let err = receiving.decrypt_header(&key, &[0u8; 10]).unwrap_err();
        assert!(matches!(err, Error::InvalidValue(_)));
    }

    #[test]
    fn message_encrypt_decrypt_round_trips_with_matching_auth() {
        let key = Message::from(vec![9u8; 64]);
        let sending = DefaultSendingChainCrypto;
        let receiving = DefaultReceivingChainCrypto;

        let encrypted = sending.encrypt_message(&key, b"hello", b"aad").unwrap();
        let decrypted = receiving.decrypt_message(&key, &encrypted, b"aad").unwrap();
        assert_eq!(decrypted, b"hello");

        assert!(receiving.decrypt_message(&key, &encrypted, b"wrong").is_err());
    }
}
