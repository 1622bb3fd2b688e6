// Copyright (C) Microsoft Corporation. All rights reserved.

//! AEAD algorithm selectors.

use crate::SkeError;

/// Cipher block size shared by the block-mode engines, in bytes.
pub const AEAD_BLOCK_SIZE: usize = 16;

/// Default authentication tag size in bytes.
pub const AEAD_TAG_SIZE: usize = 16;

/// Smallest CCM nonce accepted, in bytes.
pub const CCM_NONCE_MIN_SIZE: usize = 7;

/// Largest CCM nonce accepted, in bytes.
pub const CCM_NONCE_MAX_SIZE: usize = 13;

/// Size of the nonce written by `generate_nonce` for CCM, in bytes.
pub const CCM_GENERATED_NONCE_SIZE: usize = 13;

/// GCM nonce size at the public boundary, in bytes.
pub const GCM_NONCE_SIZE: usize = 12;

/// Size of a GCM counter block, in bytes. `generate_nonce` for GCM writes
/// this much: the random nonce with the initial counter suffix appended.
pub const GCM_COUNTER_BLOCK_SIZE: usize = 16;

/// ChaCha20-Poly1305 nonce size in bytes.
pub const CHACHA20_POLY1305_NONCE_SIZE: usize = 12;

/// AEAD cipher mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadMode {
    /// Counter with CBC-MAC.
    Ccm,
    /// Galois/Counter Mode.
    Gcm,
    /// ChaCha20 stream cipher with Poly1305 authenticator.
    ChaCha20Poly1305,
}

/// An AEAD algorithm: a cipher mode paired with an authentication tag
/// length.
///
/// The constants [`AeadAlgorithm::CCM`], [`AeadAlgorithm::GCM`] and
/// [`AeadAlgorithm::CHACHA20_POLY1305`] carry the default 16-byte tag;
/// [`AeadAlgorithm::with_tag_length`] derives a truncated-tag variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AeadAlgorithm {
    mode: AeadMode,
    tag_length: usize,
}

impl AeadAlgorithm {
    /// CCM with the default 16-byte tag.
    pub const CCM: Self = Self {
        mode: AeadMode::Ccm,
        tag_length: AEAD_TAG_SIZE,
    };

    /// GCM with the default 16-byte tag.
    pub const GCM: Self = Self {
        mode: AeadMode::Gcm,
        tag_length: AEAD_TAG_SIZE,
    };

    /// ChaCha20-Poly1305 with its fixed 16-byte tag.
    pub const CHACHA20_POLY1305: Self = Self {
        mode: AeadMode::ChaCha20Poly1305,
        tag_length: AEAD_TAG_SIZE,
    };

    /// Derives the same mode with a truncated tag.
    ///
    /// Valid tag lengths are 4, 6, 8, 10, 12, 14 or 16 bytes for CCM and
    /// 4, 8, or 12 through 16 bytes for GCM. ChaCha20-Poly1305 only ever
    /// uses its full 16-byte tag.
    ///
    /// # Arguments
    ///
    /// * `tag_length` - The tag length in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SkeError::InvalidArgument`] if the length is not valid for
    /// the mode.
    pub fn with_tag_length(self, tag_length: usize) -> Result<Self, SkeError> {
        let valid = match self.mode {
            AeadMode::Ccm => (4..=16).contains(&tag_length) && tag_length % 2 == 0,
            AeadMode::Gcm => tag_length == 4 || tag_length == 8 || (12..=16).contains(&tag_length),
            AeadMode::ChaCha20Poly1305 => tag_length == AEAD_TAG_SIZE,
        };
        if !valid {
            return Err(SkeError::InvalidArgument);
        }
        Ok(Self {
            mode: self.mode,
            tag_length,
        })
    }

    /// Returns the cipher mode.
    pub fn mode(&self) -> AeadMode {
        self.mode
    }

    /// Returns the tag length in bytes.
    pub fn tag_length(&self) -> usize {
        self.tag_length
    }

    /// Whether the mode processes data in 16-byte cipher blocks.
    pub fn is_block_mode(&self) -> bool {
        matches!(self.mode, AeadMode::Ccm | AeadMode::Gcm)
    }

    /// Validates a nonce for the single-shot operations.
    ///
    /// CCM accepts 7 through 13 bytes. GCM accepts 12 bytes, or a whole
    /// 16-byte counter block. ChaCha20-Poly1305 accepts exactly 12 bytes.
    pub(crate) fn validate_nonce(&self, nonce: &[u8]) -> Result<(), SkeError> {
        let valid = match self.mode {
            AeadMode::Ccm => (CCM_NONCE_MIN_SIZE..=CCM_NONCE_MAX_SIZE).contains(&nonce.len()),
            AeadMode::Gcm => {
                nonce.len() == GCM_NONCE_SIZE || nonce.len() == GCM_COUNTER_BLOCK_SIZE
            }
            AeadMode::ChaCha20Poly1305 => nonce.len() == CHACHA20_POLY1305_NONCE_SIZE,
        };
        if !valid {
            return Err(SkeError::InvalidArgument);
        }
        Ok(())
    }

    /// Validates a nonce for the multi-part operations, where GCM takes the
    /// 12-byte form only; the 16-byte counter block stays internal.
    pub(crate) fn validate_stream_nonce(&self, nonce: &[u8]) -> Result<(), SkeError> {
        let valid = match self.mode {
            AeadMode::Ccm => (CCM_NONCE_MIN_SIZE..=CCM_NONCE_MAX_SIZE).contains(&nonce.len()),
            AeadMode::Gcm => nonce.len() == GCM_NONCE_SIZE,
            AeadMode::ChaCha20Poly1305 => false,
        };
        if !valid {
            return Err(SkeError::InvalidArgument);
        }
        Ok(())
    }

    /// Number of bytes `generate_nonce` writes for this algorithm.
    pub fn generated_nonce_length(&self) -> usize {
        match self.mode {
            AeadMode::Ccm => CCM_GENERATED_NONCE_SIZE,
            AeadMode::Gcm => GCM_COUNTER_BLOCK_SIZE,
            AeadMode::ChaCha20Poly1305 => CHACHA20_POLY1305_NONCE_SIZE,
        }
    }

    /// Size of the single-shot encrypt output (ciphertext plus tag) for a
    /// plaintext of `plaintext_length` bytes, or `None` on overflow.
    pub fn encrypt_output_size(&self, plaintext_length: usize) -> Option<usize> {
        plaintext_length.checked_add(self.tag_length)
    }

    /// Size of the single-shot decrypt output for an input of
    /// `ciphertext_length` bytes (ciphertext plus tag), or `None` when the
    /// input cannot even hold the tag.
    pub fn decrypt_output_size(&self, ciphertext_length: usize) -> Option<usize> {
        ciphertext_length.checked_sub(self.tag_length)
    }
}
