//! The closed error taxonomy used throughout the ratchet core.
//!
//! Every fallible operation in this crate returns [`Error`]. Lower-level
//! cryptographic failures are wrapped into [`CryptoError`] and surfaced as
//! [`Error::Crypto`]; callers that only care about the broad category can
//! match on [`Error`] directly, while callers that need the underlying
//! cause can drill into [`Error::Crypto`].

use std::fmt::{self, Display, Formatter};

/// Top-level error kind, matching the closed taxonomy this crate commits to.
#[derive(Debug)]
pub enum Error {
    /// A configuration or state precondition was violated: a nil capability,
    /// a missing key where one is required, a too-short encrypted header, or
    /// a skip target below the chain's current message number.
    InvalidValue(String),

    /// A cryptographic primitive failed: key generation, Diffie-Hellman,
    /// AEAD seal/open, KDF expansion, or hasher construction.
    Crypto(CryptoError),

    /// The header decoder was given fewer than 16 bytes.
    NotEnoughBytes { expected: usize, got: usize },

    /// No skipped-key entry decrypted the header. This kind is internal to
    /// the receiving chain's decrypt algorithm: it is always joined into a
    /// wider failure and must never be the sole error returned to a caller.
    SkippedKeysNotFound,

    /// The skipped-keys storage would exceed its per-header-key quota.
    TooManySkippedMessageKeys,

    /// A [`crate::config::Config`] option failed to apply.
    Option(String),

    /// Two failures joined together: used when the receiving chain's
    /// skipped-keys attempt and its main decrypt path both fail, so the
    /// caller can inspect either cause.
    Joined(Box<Error>, Box<Error>),
}

impl Error {
    pub(crate) fn join(first: Error, second: Error) -> Error {
        Error::Joined(Box::new(first), Box::new(second))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidValue(msg) => write!(f, "invalid value: {msg}"),
            Error::Crypto(e) => write!(f, "crypto: {e}"),
            Error::NotEnoughBytes { expected, got } => {
                write!(f, "not enough bytes: expected at least {expected}, got {got}")
            }
            Error::SkippedKeysNotFound => write!(f, "skipped keys not found"),
            Error::TooManySkippedMessageKeys => write!(f, "too many skipped message keys"),
            Error::Option(msg) => write!(f, "apply options: {msg}"),
            Error::Joined(first, second) => write!(f, "{first}; {second}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<CryptoError> for Error {
    fn from(value: CryptoError) -> Self {
        Error::Crypto(value)
    }
}

impl From<hkdf::InvalidLength> for Error {
    fn from(value: hkdf::InvalidLength) -> Self {
        Error::Crypto(CryptoError::Kdf(value))
    }
}

impl From<chacha20poly1305::Error> for Error {
    fn from(value: chacha20poly1305::Error) -> Self {
        Error::Crypto(CryptoError::Aead(value))
    }
}

impl From<hmac::digest::InvalidLength> for Error {
    fn from(value: hmac::digest::InvalidLength) -> Self {
        Error::Crypto(CryptoError::Mac(value))
    }
}

/// Failures from the cryptographic primitive layer.
#[derive(Debug)]
pub enum CryptoError {
    /// A KDF (HKDF) was asked to expand to an invalid output length.
    Kdf(hkdf::InvalidLength),

    /// A MAC key was rejected as an invalid length.
    Mac(hmac::digest::InvalidLength),

    /// An AEAD seal or open operation failed (wrong key, tampered
    /// ciphertext, or wrong associated data).
    Aead(chacha20poly1305::Error),

    /// A Diffie-Hellman key exchange could not be completed.
    Dh(String),
}

impl Display for CryptoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::Kdf(e) => write!(f, "KDF: {e}"),
            CryptoError::Mac(e) => write!(f, "MAC: {e}"),
            CryptoError::Aead(_) => write!(f, "AEAD operation failed"),
            CryptoError::Dh(msg) => write!(f, "Diffie-Hellman: {msg}"),
        }
    }
}

impl std::error::Error for CryptoError {}
