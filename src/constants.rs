//! Byte-size constants shared by the default crypto implementations.

/// Byte size of an X25519 private or public key.
pub(crate) const CURVE25519_KEY_LENGTH: usize = 32;

/// Byte size of an XChaCha20-Poly1305 key.
pub(crate) const XCHACHA20_KEY_LENGTH: usize = 32;

/// Byte size of an XChaCha20-Poly1305 nonce.
pub(crate) const XCHACHA20_NONCE_LENGTH: usize = 24;

/// Output size of a single root-chain KDF slot (root, master, and next header
/// key are each this size).
pub(crate) const ROOT_CHAIN_KDF_SLOT_LENGTH: usize = 32;

/// Total output length of the root-chain KDF (three slots).
pub(crate) const ROOT_CHAIN_KDF_OUTPUT_LENGTH: usize = 3 * ROOT_CHAIN_KDF_SLOT_LENGTH;

/// Combined length of the message cipher key and nonce derived from a message key.
pub(crate) const MESSAGE_CIPHER_KDF_OUTPUT_LENGTH: usize =
    XCHACHA20_KEY_LENGTH + XCHACHA20_NONCE_LENGTH;

/// Minimum valid length of an encrypted header: a nonce plus at least one byte of ciphertext.
pub(crate) const MIN_ENCRYPTED_HEADER_LENGTH: usize = XCHACHA20_NONCE_LENGTH + 1;

/// Number of distinct header keys the default skipped-keys storage holds before clearing.
pub const DEFAULT_SKIPPED_KEYS_HEADER_KEYS_BEFORE_CLEAR: usize = 4;

/// Number of message keys per header key the default skipped-keys storage allows.
pub const DEFAULT_SKIPPED_KEYS_MESSAGE_KEYS_LIMIT: usize = 1024;
