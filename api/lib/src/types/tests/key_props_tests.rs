// Copyright (C) Microsoft Corporation. All rights reserved.

use crate::types::algo::AeadAlgorithm;
use crate::types::algo::AeadMode;
use crate::types::key_props::*;

#[test]
fn test_key_type_material_lengths() {
    for len in [16, 24, 32] {
        assert!(KeyType::Aes.valid_material_len(len));
        assert!(KeyType::Aria.valid_material_len(len));
    }
    for len in [0, 8, 15, 17, 20, 33, 64] {
        assert!(!KeyType::Aes.valid_material_len(len));
        assert!(!KeyType::Aria.valid_material_len(len));
    }

    // ChaCha20 keys are always 256 bits
    assert!(KeyType::ChaCha20.valid_material_len(32));
    assert!(!KeyType::ChaCha20.valid_material_len(16));
    assert!(!KeyType::ChaCha20.valid_material_len(24));
}

#[test]
fn test_key_type_mode_support() {
    assert!(KeyType::Aes.supports_mode(AeadMode::Ccm));
    assert!(KeyType::Aes.supports_mode(AeadMode::Gcm));
    assert!(!KeyType::Aes.supports_mode(AeadMode::ChaCha20Poly1305));

    assert!(KeyType::Aria.supports_mode(AeadMode::Ccm));
    assert!(KeyType::Aria.supports_mode(AeadMode::Gcm));
    assert!(!KeyType::Aria.supports_mode(AeadMode::ChaCha20Poly1305));

    assert!(KeyType::ChaCha20.supports_mode(AeadMode::ChaCha20Poly1305));
    assert!(!KeyType::ChaCha20.supports_mode(AeadMode::Ccm));
    assert!(!KeyType::ChaCha20.supports_mode(AeadMode::Gcm));
}

#[test]
fn test_key_usage_directions() {
    assert!(KeyUsage::Encrypt.can_encrypt());
    assert!(!KeyUsage::Encrypt.can_decrypt());

    assert!(!KeyUsage::Decrypt.can_encrypt());
    assert!(KeyUsage::Decrypt.can_decrypt());

    assert!(KeyUsage::EncryptDecrypt.can_encrypt());
    assert!(KeyUsage::EncryptDecrypt.can_decrypt());
}

#[test]
fn test_key_attributes_accessors() {
    let attrs = KeyAttributes::new(
        KeyType::Aes,
        KeyUsage::EncryptDecrypt,
        AeadAlgorithm::GCM,
    );

    assert_eq!(attrs.key_type(), KeyType::Aes);
    assert_eq!(attrs.usage(), KeyUsage::EncryptDecrypt);
    assert_eq!(attrs.algorithm(), AeadAlgorithm::GCM);
}

#[test]
fn test_key_attributes_algorithm_policy_is_exact() {
    let ccm8 = AeadAlgorithm::CCM.with_tag_length(8).unwrap();
    let attrs = KeyAttributes::new(KeyType::Aes, KeyUsage::EncryptDecrypt, ccm8);

    assert!(attrs.permits_algorithm(&ccm8));

    // Same mode with a different tag length is a different algorithm
    assert!(!attrs.permits_algorithm(&AeadAlgorithm::CCM));
    assert!(!attrs.permits_algorithm(&AeadAlgorithm::GCM));
}
