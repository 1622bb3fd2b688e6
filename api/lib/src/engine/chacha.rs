// Copyright (C) Microsoft Corporation. All rights reserved.

//! ChaCha20-Poly1305 seal and open (RFC 8439), via the `chacha20poly1305`
//! crate.
//!
//! This mode has no incremental form here; the streaming operation rejects
//! it at setup, so only whole-message calls exist.

use chacha20poly1305::aead::AeadInPlace;
use chacha20poly1305::ChaCha20Poly1305;
use chacha20poly1305::KeyInit;
use chacha20poly1305::Nonce;

use crate::error::SkeError;
use crate::types::AEAD_TAG_SIZE;
use crate::types::CHACHA20_POLY1305_NONCE_SIZE;

/// Encrypts `plaintext` into `output` as ciphertext followed by the 16-byte
/// tag. The caller has already validated the nonce and sized `output` to
/// `plaintext.len() + 16`.
pub(crate) fn seal(
    material: &[u8],
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
    output: &mut [u8],
) -> Result<(), SkeError> {
    debug_assert_eq!(nonce.len(), CHACHA20_POLY1305_NONCE_SIZE);
    debug_assert_eq!(output.len(), plaintext.len() + AEAD_TAG_SIZE);

    let cipher =
        ChaCha20Poly1305::new_from_slice(material).map_err(|_| SkeError::CorruptionDetected)?;

    let (body, tag_out) = output.split_at_mut(plaintext.len());
    body.copy_from_slice(plaintext);
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(nonce), aad, body)
        .map_err(|_| {
            tracing::error!("chacha20-poly1305 seal failed");
            SkeError::InvalidArgument
        })?;
    tag_out.copy_from_slice(&tag);
    Ok(())
}

/// Verifies the trailing 16-byte tag of `ciphertext` and decrypts the body
/// into `output`. `output` is only valid plaintext when `Ok` is returned.
pub(crate) fn open(
    material: &[u8],
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    output: &mut [u8],
) -> Result<(), SkeError> {
    debug_assert_eq!(nonce.len(), CHACHA20_POLY1305_NONCE_SIZE);
    debug_assert!(ciphertext.len() >= AEAD_TAG_SIZE);
    debug_assert_eq!(output.len(), ciphertext.len() - AEAD_TAG_SIZE);

    let cipher =
        ChaCha20Poly1305::new_from_slice(material).map_err(|_| SkeError::CorruptionDetected)?;

    let (body, tag) = ciphertext.split_at(ciphertext.len() - AEAD_TAG_SIZE);
    output.copy_from_slice(body);
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(nonce),
            aad,
            output,
            chacha20poly1305::Tag::from_slice(tag),
        )
        .map_err(|_| {
            tracing::error!("authentication tag mismatch");
            SkeError::AuthenticationFailed
        })?;
    Ok(())
}
