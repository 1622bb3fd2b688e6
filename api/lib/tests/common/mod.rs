// Copyright (C) Microsoft Corporation. All rights reserved.

#![allow(dead_code)]

use rand::rngs::OsRng;
use rand::RngCore;
use ske_api::*;

pub fn generate_random_vector(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    OsRng.fill_bytes(&mut data);
    data
}

pub fn attrs(key_type: KeyType, algorithm: AeadAlgorithm) -> KeyAttributes {
    KeyAttributes::new(key_type, KeyUsage::EncryptDecrypt, algorithm)
}

/// A one-shot nonce length every algorithm accepts.
pub fn one_shot_nonce_len(algorithm: &AeadAlgorithm) -> usize {
    match algorithm.mode() {
        AeadMode::Ccm => 13,
        AeadMode::Gcm | AeadMode::ChaCha20Poly1305 => 12,
    }
}

/// Streams `payload` through a multi-part encrypt in `chunk` sized pieces
/// and returns ciphertext plus tag, the one-shot layout.
pub fn stream_encrypt(
    store: &KeyStore,
    key: KeyHandle,
    algorithm: AeadAlgorithm,
    nonce: &[u8],
    aad: &[u8],
    payload: &[u8],
    chunk: usize,
) -> Vec<u8> {
    let mut op = AeadOperation::new();
    op.encrypt_setup(store, key, algorithm).unwrap();
    op.set_lengths(aad.len(), payload.len()).unwrap();
    op.set_nonce(nonce).unwrap();
    if !aad.is_empty() {
        op.update_ad(aad).unwrap();
    }
    let mut ciphertext = Vec::new();
    let mut out = vec![0u8; chunk + AEAD_BLOCK_SIZE];
    for piece in payload.chunks(chunk) {
        let written = op.update(piece, &mut out).unwrap();
        ciphertext.extend_from_slice(&out[..written]);
    }
    let mut tail = [0u8; AEAD_BLOCK_SIZE];
    let mut tag = [0u8; AEAD_TAG_SIZE];
    let (flushed, tag_len) = op.finish(&mut tail, &mut tag).unwrap();
    ciphertext.extend_from_slice(&tail[..flushed]);
    ciphertext.extend_from_slice(&tag[..tag_len]);
    ciphertext
}

/// Streams a one-shot layout `ciphertext` through a multi-part decrypt in
/// `chunk` sized pieces.
pub fn stream_decrypt(
    store: &KeyStore,
    key: KeyHandle,
    algorithm: AeadAlgorithm,
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    chunk: usize,
) -> Result<Vec<u8>, SkeError> {
    let payload_len = ciphertext.len() - algorithm.tag_length();
    let (body, tag) = ciphertext.split_at(payload_len);

    let mut op = AeadOperation::new();
    op.decrypt_setup(store, key, algorithm)?;
    op.set_lengths(aad.len(), payload_len)?;
    op.set_nonce(nonce)?;
    if !aad.is_empty() {
        op.update_ad(aad)?;
    }
    let mut plaintext = Vec::new();
    let mut out = vec![0u8; chunk + AEAD_BLOCK_SIZE];
    for piece in body.chunks(chunk) {
        let written = op.update(piece, &mut out)?;
        plaintext.extend_from_slice(&out[..written]);
    }
    let mut tail = [0u8; AEAD_BLOCK_SIZE];
    let read = op.verify(&mut tail, tag)?;
    plaintext.extend_from_slice(&tail[..read]);
    Ok(plaintext)
}
