// Copyright (C) Microsoft Corporation. All rights reserved.

use crate::types::algo::AeadAlgorithm;
use crate::types::algo::AeadMode;

/// Symmetric key type enumeration.
///
/// Identifies the underlying cipher family a key's material is intended for.
/// The type constrains both the acceptable material lengths and the AEAD
/// modes the key may be used with.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyType {
    /// AES key (128, 192 or 256 bits). Usable with CCM and GCM.
    Aes,

    /// ARIA key (128, 192 or 256 bits). Usable with CCM and GCM.
    Aria,

    /// ChaCha20 key (256 bits). Usable with ChaCha20-Poly1305 only.
    ChaCha20,
}

impl KeyType {
    /// Checks whether `len` bytes is a valid key material length for this
    /// key type.
    pub fn valid_material_len(&self, len: usize) -> bool {
        match self {
            KeyType::Aes | KeyType::Aria => matches!(len, 16 | 24 | 32),
            KeyType::ChaCha20 => len == 32,
        }
    }

    /// Checks whether a key of this type can drive the given AEAD mode.
    pub fn supports_mode(&self, mode: AeadMode) -> bool {
        match self {
            KeyType::Aes | KeyType::Aria => {
                matches!(mode, AeadMode::Ccm | AeadMode::Gcm)
            }
            KeyType::ChaCha20 => mode == AeadMode::ChaCha20Poly1305,
        }
    }
}

/// Permitted directions of use for a key.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyUsage {
    /// The key may only encrypt.
    Encrypt,

    /// The key may only decrypt.
    Decrypt,

    /// The key may encrypt and decrypt.
    EncryptDecrypt,
}

impl KeyUsage {
    /// True if encryption is permitted.
    pub fn can_encrypt(&self) -> bool {
        matches!(self, KeyUsage::Encrypt | KeyUsage::EncryptDecrypt)
    }

    /// True if decryption is permitted.
    pub fn can_decrypt(&self) -> bool {
        matches!(self, KeyUsage::Decrypt | KeyUsage::EncryptDecrypt)
    }
}

/// Attributes bound to a key at creation time.
///
/// The attributes fix the key type, the permitted directions of use and the
/// single AEAD algorithm (mode plus tag length) the key may be used with.
/// There are no wildcard policies; an operation requesting any other
/// algorithm is rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KeyAttributes {
    key_type: KeyType,
    usage: KeyUsage,
    algorithm: AeadAlgorithm,
}

impl KeyAttributes {
    /// Creates a new attribute set.
    pub fn new(key_type: KeyType, usage: KeyUsage, algorithm: AeadAlgorithm) -> Self {
        Self {
            key_type,
            usage,
            algorithm,
        }
    }

    /// Returns the key type.
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Returns the permitted usage.
    pub fn usage(&self) -> KeyUsage {
        self.usage
    }

    /// Returns the algorithm the key is bound to.
    pub fn algorithm(&self) -> AeadAlgorithm {
        self.algorithm
    }

    /// True if the key's policy covers the requested algorithm.
    pub(crate) fn permits_algorithm(&self, algorithm: &AeadAlgorithm) -> bool {
        self.algorithm == *algorithm
    }
}
