//! Nominal key types.
//!
//! Each type below wraps an owned, opaque byte buffer. They carry no
//! cryptographic behaviour of their own — key generation, Diffie-Hellman and
//! KDF logic live in [`crate::crypto`] — so that a caller can swap the
//! concrete curve or hash function without touching the types that flow
//! through the chains and the participant. The type system forbids mixing
//! them up: a [`Master`] can never be passed where a [`Root`] is expected.

use zeroize::{Zeroize, ZeroizeOnDrop};

macro_rules! key_type {
    ($name:ident, secret) => {
        #[derive(Clone, PartialEq, Eq, Hash, Zeroize, ZeroizeOnDrop)]
        pub struct $name(Vec<u8>);
        key_type!(@impls $name);
    };
    ($name:ident, public) => {
        #[derive(Clone, PartialEq, Eq, Hash)]
        pub struct $name(Vec<u8>);
        key_type!(@impls $name);
    };
    (@impls $name:ident) => {

        impl $name {
            /// Wraps raw bytes as a key of this kind.
            pub fn new(bytes: Vec<u8>) -> Self {
                Self(bytes)
            }

            /// Borrows the underlying bytes.
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            /// Consumes the key, returning the underlying bytes.
            pub fn into_bytes(mut self) -> Vec<u8> {
                std::mem::take(&mut self.0)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<Vec<u8>> for $name {
            fn from(bytes: Vec<u8>) -> Self {
                Self(bytes)
            }
        }

        impl From<&[u8]> for $name {
            fn from(bytes: &[u8]) -> Self {
                Self(bytes.to_vec())
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($name))
                    .field(&format!("{} bytes", self.0.len()))
                    .finish()
            }
        }
    };
}

key_type!(Private, secret);
key_type!(Public, public);
key_type!(Shared, secret);
key_type!(Root, secret);
key_type!(Master, secret);
key_type!(Header, secret);
key_type!(Message, secret);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_allocates_a_distinct_buffer() {
        let key = Master::from(vec![1u8, 2, 3, 4]);
        let cloned = key.clone();
        assert_eq!(key.as_bytes(), cloned.as_bytes());
        assert_ne!(key.as_bytes().as_ptr(), cloned.as_bytes().as_ptr());
    }

    #[test]
    fn equal_bytes_compare_equal() {
        let a = Header::from(vec![9u8; 32]);
        let b = Header::from(vec![9u8; 32]);
        assert_eq!(a, b);
    }

    #[test]
    fn debug_never_prints_raw_bytes() {
        let key = Private::from(vec![0xAA; 32]);
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("170"));
        assert!(rendered.contains("32 bytes"));
    }
}
