// Copyright (C) Microsoft Corporation. All rights reserved.

use crate::types::algo::*;
use crate::SkeError;

#[test]
fn test_default_algorithms_use_full_tag() {
    assert_eq!(AeadAlgorithm::CCM.tag_length(), AEAD_TAG_SIZE);
    assert_eq!(AeadAlgorithm::GCM.tag_length(), AEAD_TAG_SIZE);
    assert_eq!(AeadAlgorithm::CHACHA20_POLY1305.tag_length(), AEAD_TAG_SIZE);

    assert_eq!(AeadAlgorithm::CCM.mode(), AeadMode::Ccm);
    assert_eq!(AeadAlgorithm::GCM.mode(), AeadMode::Gcm);
    assert_eq!(
        AeadAlgorithm::CHACHA20_POLY1305.mode(),
        AeadMode::ChaCha20Poly1305
    );
}

#[test]
fn test_ccm_tag_lengths() {
    // CCM accepts the even lengths 4 through 16
    for tag_length in [4, 6, 8, 10, 12, 14, 16] {
        let algo = AeadAlgorithm::CCM.with_tag_length(tag_length);
        assert!(algo.is_ok(), "tag_length {} algo {:?}", tag_length, algo);
        assert_eq!(algo.unwrap().tag_length(), tag_length);
    }

    for tag_length in [0, 2, 3, 5, 7, 9, 11, 13, 15, 17, 18] {
        let algo = AeadAlgorithm::CCM.with_tag_length(tag_length);
        assert_eq!(algo, Err(SkeError::InvalidArgument));
    }
}

#[test]
fn test_gcm_tag_lengths() {
    for tag_length in [4, 8, 12, 13, 14, 15, 16] {
        let algo = AeadAlgorithm::GCM.with_tag_length(tag_length);
        assert!(algo.is_ok(), "tag_length {} algo {:?}", tag_length, algo);
    }

    for tag_length in [0, 2, 3, 5, 6, 7, 9, 10, 11, 17, 32] {
        let algo = AeadAlgorithm::GCM.with_tag_length(tag_length);
        assert_eq!(algo, Err(SkeError::InvalidArgument));
    }
}

#[test]
fn test_chacha20_poly1305_tag_length_is_fixed() {
    assert!(AeadAlgorithm::CHACHA20_POLY1305.with_tag_length(16).is_ok());

    for tag_length in [4, 8, 12, 15, 17] {
        let algo = AeadAlgorithm::CHACHA20_POLY1305.with_tag_length(tag_length);
        assert_eq!(algo, Err(SkeError::InvalidArgument));
    }
}

#[test]
fn test_ccm_nonce_lengths() {
    for len in CCM_NONCE_MIN_SIZE..=CCM_NONCE_MAX_SIZE {
        let nonce = vec![0u8; len];
        assert!(AeadAlgorithm::CCM.validate_nonce(&nonce).is_ok());
        assert!(AeadAlgorithm::CCM.validate_stream_nonce(&nonce).is_ok());
    }

    for len in [0, 6, 14, 16] {
        let nonce = vec![0u8; len];
        assert_eq!(
            AeadAlgorithm::CCM.validate_nonce(&nonce),
            Err(SkeError::InvalidArgument)
        );
        assert_eq!(
            AeadAlgorithm::CCM.validate_stream_nonce(&nonce),
            Err(SkeError::InvalidArgument)
        );
    }
}

#[test]
fn test_gcm_nonce_lengths() {
    let nonce12 = [0u8; GCM_NONCE_SIZE];
    let nonce16 = [0u8; GCM_COUNTER_BLOCK_SIZE];
    let nonce13 = [0u8; 13];

    // One-shot accepts 12 (expanded internally) or a full counter block
    assert!(AeadAlgorithm::GCM.validate_nonce(&nonce12).is_ok());
    assert!(AeadAlgorithm::GCM.validate_nonce(&nonce16).is_ok());
    assert_eq!(
        AeadAlgorithm::GCM.validate_nonce(&nonce13),
        Err(SkeError::InvalidArgument)
    );

    // Streaming set_nonce only takes the 12-byte form
    assert!(AeadAlgorithm::GCM.validate_stream_nonce(&nonce12).is_ok());
    assert_eq!(
        AeadAlgorithm::GCM.validate_stream_nonce(&nonce16),
        Err(SkeError::InvalidArgument)
    );
}

#[test]
fn test_chacha20_poly1305_nonce_lengths() {
    let nonce12 = [0u8; CHACHA20_POLY1305_NONCE_SIZE];
    let nonce8 = [0u8; 8];

    assert!(AeadAlgorithm::CHACHA20_POLY1305.validate_nonce(&nonce12).is_ok());
    assert_eq!(
        AeadAlgorithm::CHACHA20_POLY1305.validate_nonce(&nonce8),
        Err(SkeError::InvalidArgument)
    );

    // ChaCha20-Poly1305 has no streaming form at all
    assert_eq!(
        AeadAlgorithm::CHACHA20_POLY1305.validate_stream_nonce(&nonce12),
        Err(SkeError::InvalidArgument)
    );
}

#[test]
fn test_generated_nonce_lengths() {
    assert_eq!(
        AeadAlgorithm::CCM.generated_nonce_length(),
        CCM_GENERATED_NONCE_SIZE
    );
    assert_eq!(
        AeadAlgorithm::GCM.generated_nonce_length(),
        GCM_COUNTER_BLOCK_SIZE
    );
    assert_eq!(
        AeadAlgorithm::CHACHA20_POLY1305.generated_nonce_length(),
        CHACHA20_POLY1305_NONCE_SIZE
    );
}

#[test]
fn test_output_size_helpers() {
    let algo = AeadAlgorithm::CCM.with_tag_length(8).unwrap();

    assert_eq!(algo.encrypt_output_size(23), Some(31));
    assert_eq!(algo.encrypt_output_size(0), Some(8));
    assert_eq!(algo.encrypt_output_size(usize::MAX), None);

    assert_eq!(algo.decrypt_output_size(31), Some(23));
    assert_eq!(algo.decrypt_output_size(8), Some(0));
    // Shorter than the tag itself cannot be a valid ciphertext
    assert_eq!(algo.decrypt_output_size(7), None);
}

#[test]
fn test_block_mode_predicate() {
    assert!(AeadAlgorithm::CCM.is_block_mode());
    assert!(AeadAlgorithm::GCM.is_block_mode());
    assert!(!AeadAlgorithm::CHACHA20_POLY1305.is_block_mode());
}
