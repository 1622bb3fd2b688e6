// Copyright (C) Microsoft Corporation. All rights reserved.

//! Block-cipher primitives behind the CCM and GCM engines.

use aes::cipher::BlockEncrypt;
use aes::cipher::KeyInit;

use crate::error::SkeError;
use crate::types::KeyType;

/// One cipher block.
pub(crate) type Block = [u8; 16];

/// A 128-bit block cipher selected at run time from a key's type and
/// material length.
///
/// CCM and GCM only ever run the cipher forward, so no decryption side is
/// carried here.
pub(crate) enum BlockCipher {
    Aes128(aes::Aes128),
    Aes192(aes::Aes192),
    Aes256(aes::Aes256),
    Aria128(aria::Aria128),
    Aria192(aria::Aria192),
    Aria256(aria::Aria256),
}

impl BlockCipher {
    /// Builds a cipher instance from raw key material.
    ///
    /// The store validates material length at import, so a mismatch here
    /// means the key entry itself went bad, not the caller's arguments.
    pub(crate) fn new(key_type: KeyType, material: &[u8]) -> Result<Self, SkeError> {
        let cipher = match (key_type, material.len()) {
            (KeyType::Aes, 16) => aes::Aes128::new_from_slice(material).map(Self::Aes128),
            (KeyType::Aes, 24) => aes::Aes192::new_from_slice(material).map(Self::Aes192),
            (KeyType::Aes, 32) => aes::Aes256::new_from_slice(material).map(Self::Aes256),
            (KeyType::Aria, 16) => aria::Aria128::new_from_slice(material).map(Self::Aria128),
            (KeyType::Aria, 24) => aria::Aria192::new_from_slice(material).map(Self::Aria192),
            (KeyType::Aria, 32) => aria::Aria256::new_from_slice(material).map(Self::Aria256),
            (KeyType::ChaCha20, _) => {
                tracing::error!("chacha20 is not a block cipher");
                return Err(SkeError::NotSupported);
            }
            (_, len) => {
                tracing::error!(?key_type, len, "key material does not match key type");
                return Err(SkeError::CorruptionDetected);
            }
        };

        cipher.map_err(|_| SkeError::CorruptionDetected)
    }

    /// Encrypts one block in place.
    pub(crate) fn encrypt_block(&self, block: &mut Block) {
        let block = aes::Block::from_mut_slice(&mut block[..]);
        match self {
            Self::Aes128(cipher) => cipher.encrypt_block(block),
            Self::Aes192(cipher) => cipher.encrypt_block(block),
            Self::Aes256(cipher) => cipher.encrypt_block(block),
            Self::Aria128(cipher) => cipher.encrypt_block(block),
            Self::Aria192(cipher) => cipher.encrypt_block(block),
            Self::Aria256(cipher) => cipher.encrypt_block(block),
        }
    }
}
