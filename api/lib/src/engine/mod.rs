// Copyright (C) Microsoft Corporation. All rights reserved.

//! Incremental AEAD transforms.
//!
//! The block-mode engines absorb additional data first, then message data,
//! and produce the authentication tag last. Both the streaming operation and
//! the one-shot calls drive the same engines, which is what makes chunked
//! and single-call processing byte-identical.

pub(crate) mod chacha;

mod ccm;
mod gcm;

pub(crate) use ccm::CcmEngine;
pub(crate) use gcm::GcmEngine;

use subtle::ConstantTimeEq;

use crate::error::SkeError;
use crate::primitive::BlockCipher;
use crate::types::AeadAlgorithm;
use crate::types::AeadMode;
use crate::types::AEAD_TAG_SIZE;

/// Direction of an AEAD transform.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Plaintext in, ciphertext out.
    Encrypt,
    /// Ciphertext in, plaintext out.
    Decrypt,
}

/// Authentication tag produced by an engine, truncated to the algorithm's
/// tag length.
pub(crate) struct Tag {
    bytes: [u8; AEAD_TAG_SIZE],
    len: usize,
}

impl Tag {
    pub(crate) fn new(bytes: [u8; AEAD_TAG_SIZE], len: usize) -> Self {
        debug_assert!(len <= AEAD_TAG_SIZE);
        Self { bytes, len }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Compares against a caller-provided tag in constant time. The tag
    /// length is public, so a length mismatch may short-circuit.
    pub(crate) fn matches(&self, other: &[u8]) -> bool {
        other.len() == self.len && bool::from(self.as_bytes().ct_eq(other))
    }
}

/// An incremental CCM or GCM transform over a block cipher.
pub(crate) enum BlockEngine {
    Ccm(CcmEngine),
    Gcm(GcmEngine),
}

impl BlockEngine {
    /// Builds the engine matching `algorithm` over `cipher`.
    ///
    /// `aad_len` and `msg_len` are the total lengths the transform will see;
    /// CCM bakes both into its first MAC block.
    pub(crate) fn new(
        cipher: BlockCipher,
        algorithm: &AeadAlgorithm,
        nonce: &[u8],
        aad_len: u64,
        msg_len: u64,
    ) -> Result<Self, SkeError> {
        match algorithm.mode() {
            AeadMode::Ccm => Ok(Self::Ccm(CcmEngine::new(
                cipher,
                nonce,
                algorithm.tag_length(),
                aad_len,
                msg_len,
            )?)),
            AeadMode::Gcm => Ok(Self::Gcm(GcmEngine::new(
                cipher,
                nonce,
                algorithm.tag_length(),
            )?)),
            AeadMode::ChaCha20Poly1305 => {
                // Stream-cipher mode, handled by chacha::seal / chacha::open
                tracing::error!("chacha20-poly1305 has no block engine");
                Err(SkeError::NotSupported)
            }
        }
    }

    /// Absorbs additional data. All additional data must be absorbed before
    /// the first `process` call.
    pub(crate) fn absorb_aad(&mut self, aad: &[u8]) {
        match self {
            Self::Ccm(engine) => engine.absorb_aad(aad),
            Self::Gcm(engine) => engine.absorb_aad(aad),
        }
    }

    /// Transforms `input` into `output` of the same length. Every call must
    /// be a whole number of blocks except the last one before `finalize`.
    pub(crate) fn process(&mut self, direction: Direction, input: &[u8], output: &mut [u8]) {
        match self {
            Self::Ccm(engine) => engine.process(direction, input, output),
            Self::Gcm(engine) => engine.process(direction, input, output),
        }
    }

    /// Completes the transform and returns the truncated tag.
    pub(crate) fn finalize(self) -> Tag {
        match self {
            Self::Ccm(engine) => engine.finalize(),
            Self::Gcm(engine) => engine.finalize(),
        }
    }
}
