// Copyright (C) Microsoft Corporation. All rights reserved.

//! Single-shot AEAD entry points on the key store.

use tracing::instrument;

use crate::engine::chacha;
use crate::engine::BlockEngine;
use crate::engine::Direction;
use crate::error::SkeError;
use crate::keystore::KeyHandle;
use crate::keystore::KeyStore;
use crate::primitive::BlockCipher;
use crate::types::AeadAlgorithm;
use crate::types::AeadMode;

impl KeyStore {
    /// Encrypts and authenticates `plaintext` in one call, writing the
    /// ciphertext followed by the authentication tag to `ciphertext`.
    /// Returns the number of bytes written.
    ///
    /// CCM takes a 7 to 13 byte nonce. GCM takes the usual 12 bytes or a
    /// whole 16-byte counter block. ChaCha20-Poly1305 takes exactly 12
    /// bytes.
    ///
    /// # Errors
    ///
    /// * [`SkeError::InvalidHandle`] if `key` does not name a key.
    /// * [`SkeError::NotPermitted`] if the key's usage or algorithm policy
    ///   does not cover this request.
    /// * [`SkeError::BufferTooSmall`] if `ciphertext` cannot hold the
    ///   payload plus the tag.
    /// * [`SkeError::InvalidArgument`] if the nonce length is not valid for
    ///   the algorithm, or the payload is too long for it.
    /// * [`SkeError::NotSupported`] if the key type cannot drive the
    ///   algorithm.
    #[instrument(skip_all, fields(key = ?key, ?algorithm, len = plaintext.len()))]
    pub fn aead_encrypt(
        &self,
        key: KeyHandle,
        algorithm: AeadAlgorithm,
        nonce: &[u8],
        additional_data: &[u8],
        plaintext: &[u8],
        ciphertext: &mut [u8],
    ) -> Result<usize, SkeError> {
        let attributes = self.key_attributes(key)?;
        if !attributes.usage().can_encrypt() {
            tracing::error!(key = ?key, "key usage does not permit encryption");
            Err(SkeError::NotPermitted)?
        }
        if !attributes.permits_algorithm(&algorithm) {
            tracing::error!(key = ?key, "key policy does not permit this algorithm");
            Err(SkeError::NotPermitted)?
        }
        let needed = match algorithm.encrypt_output_size(plaintext.len()) {
            Some(needed) => needed,
            None => {
                tracing::error!(len = plaintext.len(), "plaintext too long");
                return Err(SkeError::InvalidArgument);
            }
        };
        if ciphertext.len() < needed {
            tracing::error!(
                have = ciphertext.len(),
                needed,
                "ciphertext buffer too small"
            );
            Err(SkeError::BufferTooSmall)?
        }
        if let Err(err) = algorithm.validate_nonce(nonce) {
            tracing::error!(
                nonce_len = nonce.len(),
                "nonce length not valid for this algorithm"
            );
            Err(err)?
        }
        if !attributes.key_type().supports_mode(algorithm.mode()) {
            tracing::error!(
                key_type = ?attributes.key_type(),
                ?algorithm,
                "key type cannot drive this algorithm"
            );
            Err(SkeError::NotSupported)?
        }
        let active = self.acquire(key)?;
        match algorithm.mode() {
            AeadMode::ChaCha20Poly1305 => {
                chacha::seal(
                    active.material(),
                    nonce,
                    additional_data,
                    plaintext,
                    &mut ciphertext[..needed],
                )?;
            }
            AeadMode::Ccm | AeadMode::Gcm => {
                let cipher = BlockCipher::new(attributes.key_type(), active.material())?;
                let mut engine = BlockEngine::new(
                    cipher,
                    &algorithm,
                    nonce,
                    additional_data.len() as u64,
                    plaintext.len() as u64,
                )?;
                engine.absorb_aad(additional_data);
                let (body, tag_out) = ciphertext[..needed].split_at_mut(plaintext.len());
                engine.process(Direction::Encrypt, plaintext, body);
                let tag = engine.finalize();
                tag_out.copy_from_slice(tag.as_bytes());
            }
        }
        Ok(needed)
    }

    /// Checks the authentication tag trailing `ciphertext` and, when it
    /// matches, writes the decrypted payload to `plaintext`. Returns the
    /// number of bytes written. On a tag mismatch every byte this call
    /// wrote is zeroed before the error is returned.
    ///
    /// # Errors
    ///
    /// * [`SkeError::InvalidHandle`] if `key` does not name a key.
    /// * [`SkeError::NotPermitted`] if the key's usage or algorithm policy
    ///   does not cover this request.
    /// * [`SkeError::InvalidArgument`] if `ciphertext` cannot even hold the
    ///   tag, or the nonce length is not valid for the algorithm.
    /// * [`SkeError::BufferTooSmall`] if `plaintext` cannot hold the
    ///   payload.
    /// * [`SkeError::NotSupported`] if the key type cannot drive the
    ///   algorithm.
    /// * [`SkeError::AuthenticationFailed`] if the tag does not match.
    #[instrument(skip_all, fields(key = ?key, ?algorithm, len = ciphertext.len()))]
    pub fn aead_decrypt(
        &self,
        key: KeyHandle,
        algorithm: AeadAlgorithm,
        nonce: &[u8],
        additional_data: &[u8],
        ciphertext: &[u8],
        plaintext: &mut [u8],
    ) -> Result<usize, SkeError> {
        let attributes = self.key_attributes(key)?;
        if !attributes.usage().can_decrypt() {
            tracing::error!(key = ?key, "key usage does not permit decryption");
            Err(SkeError::NotPermitted)?
        }
        if !attributes.permits_algorithm(&algorithm) {
            tracing::error!(key = ?key, "key policy does not permit this algorithm");
            Err(SkeError::NotPermitted)?
        }
        let needed = match algorithm.decrypt_output_size(ciphertext.len()) {
            Some(needed) => needed,
            None => {
                tracing::error!(
                    len = ciphertext.len(),
                    "ciphertext shorter than the authentication tag"
                );
                return Err(SkeError::InvalidArgument);
            }
        };
        if plaintext.len() < needed {
            tracing::error!(
                have = plaintext.len(),
                needed,
                "plaintext buffer too small"
            );
            Err(SkeError::BufferTooSmall)?
        }
        if let Err(err) = algorithm.validate_nonce(nonce) {
            tracing::error!(
                nonce_len = nonce.len(),
                "nonce length not valid for this algorithm"
            );
            Err(err)?
        }
        if !attributes.key_type().supports_mode(algorithm.mode()) {
            tracing::error!(
                key_type = ?attributes.key_type(),
                ?algorithm,
                "key type cannot drive this algorithm"
            );
            Err(SkeError::NotSupported)?
        }
        let active = self.acquire(key)?;
        match algorithm.mode() {
            AeadMode::ChaCha20Poly1305 => {
                if let Err(err) = chacha::open(
                    active.material(),
                    nonce,
                    additional_data,
                    ciphertext,
                    &mut plaintext[..needed],
                ) {
                    plaintext[..needed].fill(0);
                    Err(err)?
                }
            }
            AeadMode::Ccm | AeadMode::Gcm => {
                let cipher = BlockCipher::new(attributes.key_type(), active.material())?;
                let mut engine = BlockEngine::new(
                    cipher,
                    &algorithm,
                    nonce,
                    additional_data.len() as u64,
                    needed as u64,
                )?;
                engine.absorb_aad(additional_data);
                let (body, tag) = ciphertext.split_at(needed);
                engine.process(Direction::Decrypt, body, &mut plaintext[..needed]);
                let computed = engine.finalize();
                if !computed.matches(tag) {
                    plaintext[..needed].fill(0);
                    tracing::error!("authentication tag mismatch");
                    Err(SkeError::AuthenticationFailed)?
                }
            }
        }
        Ok(needed)
    }
}
