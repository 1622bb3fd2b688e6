// Copyright (C) Microsoft Corporation. All rights reserved.

//! In-memory symmetric key store with per-key in-use accounting.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::instrument;
use zeroize::Zeroize;
use zeroize::Zeroizing;

use crate::error::SkeError;
use crate::types::KeyAttributes;

/// Opaque handle to a key held by a [`KeyStore`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct KeyHandle(u32);

struct KeyEntry {
    attributes: KeyAttributes,
    material: Vec<u8>,
    use_count: usize,
}

impl Drop for KeyEntry {
    fn drop(&mut self) {
        self.material.zeroize();
    }
}

struct KeyStoreInner {
    keys: HashMap<u32, KeyEntry>,
    next_id: u32,
}

impl KeyStoreInner {
    fn new() -> Self {
        Self {
            keys: HashMap::new(),
            next_id: 1,
        }
    }

    fn insert(&mut self, attributes: KeyAttributes, material: Vec<u8>) -> KeyHandle {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.keys.insert(
            id,
            KeyEntry {
                attributes,
                material,
                use_count: 0,
            },
        );
        KeyHandle(id)
    }

    fn entry(&self, handle: KeyHandle) -> Result<&KeyEntry, SkeError> {
        self.keys.get(&handle.0).ok_or_else(|| {
            tracing::error!(key = ?handle, "key not found");
            SkeError::InvalidHandle
        })
    }
}

/// Store for symmetric AEAD keys.
///
/// Clones are cheap and share the same key table, so a store can be handed
/// to operations running on other threads. Keys are addressed through opaque
/// [`KeyHandle`] values; a key that is currently held by an active operation
/// cannot be destroyed.
#[derive(Clone)]
pub struct KeyStore {
    inner: Arc<RwLock<KeyStoreInner>>,
}

impl KeyStore {
    /// Creates an empty key store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(KeyStoreInner::new())),
        }
    }

    /// Imports key material into the store.
    ///
    /// # Arguments
    /// * `attributes` - Type, usage and algorithm policy to bind to the key.
    /// * `material` - Raw key bytes; copied into the store and wiped when the
    ///   key is destroyed.
    ///
    /// # Returns
    /// * Handle of the imported key.
    ///
    /// # Errors
    /// * `SkeError::InvalidArgument` - The material length does not match the
    ///   key type.
    #[instrument(skip_all)]
    pub fn import_key(
        &self,
        attributes: KeyAttributes,
        material: &[u8],
    ) -> Result<KeyHandle, SkeError> {
        if !attributes.key_type().valid_material_len(material.len()) {
            tracing::error!(
                key_type = ?attributes.key_type(),
                len = material.len(),
                "invalid key material length"
            );
            Err(SkeError::InvalidArgument)?
        }

        let handle = self.inner.write().insert(attributes, material.to_vec());
        tracing::debug!(key = ?handle, key_type = ?attributes.key_type(), "key imported");
        Ok(handle)
    }

    /// Generates a key from the operating system RNG.
    ///
    /// # Arguments
    /// * `attributes` - Type, usage and algorithm policy to bind to the key.
    /// * `bits` - Key size in bits; must be a valid size for the key type.
    ///
    /// # Returns
    /// * Handle of the generated key.
    ///
    /// # Errors
    /// * `SkeError::InvalidArgument` - `bits` is not a valid key size for the
    ///   key type.
    #[instrument(skip(self))]
    pub fn generate_key(
        &self,
        attributes: KeyAttributes,
        bits: usize,
    ) -> Result<KeyHandle, SkeError> {
        if bits % 8 != 0 || !attributes.key_type().valid_material_len(bits / 8) {
            tracing::error!(key_type = ?attributes.key_type(), bits, "invalid key size");
            Err(SkeError::InvalidArgument)?
        }

        let mut material = vec![0u8; bits / 8];
        OsRng.fill_bytes(&mut material);

        let handle = self.inner.write().insert(attributes, material);
        tracing::debug!(key = ?handle, key_type = ?attributes.key_type(), "key generated");
        Ok(handle)
    }

    /// Destroys a key and wipes its material.
    ///
    /// # Arguments
    /// * `handle` - The key to destroy.
    ///
    /// # Errors
    /// * `SkeError::InvalidHandle` - The handle does not name a live key.
    /// * `SkeError::NotPermitted` - The key is held by an active operation.
    ///   The key stays in the store; retry once the operation has finished or
    ///   aborted.
    #[instrument(skip(self))]
    pub fn destroy_key(&self, handle: KeyHandle) -> Result<(), SkeError> {
        let mut inner = self.inner.write();

        let entry = inner.entry(handle)?;
        if entry.use_count != 0 {
            tracing::error!(key = ?handle, use_count = entry.use_count, "key is in use");
            Err(SkeError::NotPermitted)?
        }

        inner.keys.remove(&handle.0);
        tracing::debug!(key = ?handle, "key destroyed");
        Ok(())
    }

    /// Returns the attributes bound to a key.
    ///
    /// # Errors
    /// * `SkeError::InvalidHandle` - The handle does not name a live key.
    pub fn key_attributes(&self, handle: KeyHandle) -> Result<KeyAttributes, SkeError> {
        Ok(self.inner.read().entry(handle)?.attributes)
    }

    /// Returns the number of active operations currently holding the key.
    ///
    /// # Errors
    /// * `SkeError::InvalidHandle` - The handle does not name a live key.
    pub fn key_in_use_count(&self, handle: KeyHandle) -> Result<usize, SkeError> {
        Ok(self.inner.read().entry(handle)?.use_count)
    }

    /// Checks out a key for an operation, incrementing its in-use count.
    ///
    /// The count is decremented when the returned [`ActiveKey`] is dropped.
    /// The material copy handed out here is wiped on drop.
    #[instrument(skip(self))]
    pub(crate) fn acquire(&self, handle: KeyHandle) -> Result<ActiveKey, SkeError> {
        let mut inner = self.inner.write();

        let entry = inner.keys.get_mut(&handle.0).ok_or_else(|| {
            tracing::error!(key = ?handle, "key not found");
            SkeError::InvalidHandle
        })?;

        let attributes = entry.attributes;
        if !attributes.key_type().valid_material_len(entry.material.len()) {
            // The slot no longer matches its own attributes
            tracing::error!(key = ?handle, "key material inconsistent with attributes");
            Err(SkeError::CorruptionDetected)?
        }

        let material = Zeroizing::new(entry.material.clone());
        entry.use_count += 1;

        Ok(ActiveKey {
            attributes,
            material,
            _guard: KeyUseGuard {
                inner: Arc::clone(&self.inner),
                id: handle.0,
            },
        })
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A key checked out by an operation.
///
/// Holds a wiped-on-drop copy of the material and the in-use increment on
/// the store entry. Dropping it releases the increment.
pub(crate) struct ActiveKey {
    attributes: KeyAttributes,
    material: Zeroizing<Vec<u8>>,
    _guard: KeyUseGuard,
}

impl ActiveKey {
    pub(crate) fn attributes(&self) -> KeyAttributes {
        self.attributes
    }

    pub(crate) fn material(&self) -> &[u8] {
        &self.material
    }
}

struct KeyUseGuard {
    inner: Arc<RwLock<KeyStoreInner>>,
    id: u32,
}

impl Drop for KeyUseGuard {
    fn drop(&mut self) {
        let mut inner = self.inner.write();
        if let Some(entry) = inner.keys.get_mut(&self.id) {
            entry.use_count = entry.use_count.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use test_with_tracing::test;

    use super::*;
    use crate::types::AeadAlgorithm;
    use crate::types::KeyType;
    use crate::types::KeyUsage;

    fn aes_gcm_attrs() -> KeyAttributes {
        KeyAttributes::new(KeyType::Aes, KeyUsage::EncryptDecrypt, AeadAlgorithm::GCM)
    }

    #[test]
    fn import_key_basic() {
        let store = KeyStore::new();

        let handle = store.import_key(aes_gcm_attrs(), &[0x2b; 16]);
        assert!(handle.is_ok(), "handle {:?}", handle);

        let handle = handle.unwrap();
        let attrs = store.key_attributes(handle).unwrap();
        assert_eq!(attrs.key_type(), KeyType::Aes);
        assert_eq!(store.key_in_use_count(handle).unwrap(), 0);
    }

    #[test]
    fn import_key_bad_material_length() {
        let store = KeyStore::new();

        let result = store.import_key(aes_gcm_attrs(), &[0u8; 15]);
        assert_eq!(result.unwrap_err(), SkeError::InvalidArgument);

        let chacha_attrs = KeyAttributes::new(
            KeyType::ChaCha20,
            KeyUsage::EncryptDecrypt,
            AeadAlgorithm::CHACHA20_POLY1305,
        );
        let result = store.import_key(chacha_attrs, &[0u8; 16]);
        assert_eq!(result.unwrap_err(), SkeError::InvalidArgument);
    }

    #[test]
    fn generate_key_sizes() {
        let store = KeyStore::new();

        for bits in [128, 192, 256] {
            let handle = store.generate_key(aes_gcm_attrs(), bits);
            assert!(handle.is_ok(), "bits {} handle {:?}", bits, handle);
        }

        for bits in [0, 64, 100, 129, 512] {
            let result = store.generate_key(aes_gcm_attrs(), bits);
            assert_eq!(result.unwrap_err(), SkeError::InvalidArgument, "bits {}", bits);
        }
    }

    #[test]
    fn generated_keys_differ() {
        let store = KeyStore::new();

        let first = store.generate_key(aes_gcm_attrs(), 256).unwrap();
        let second = store.generate_key(aes_gcm_attrs(), 256).unwrap();

        let first = store.acquire(first).unwrap();
        let second = store.acquire(second).unwrap();
        assert_ne!(first.material(), second.material());
    }

    #[test]
    fn destroy_key_basic() {
        let store = KeyStore::new();

        let handle = store.import_key(aes_gcm_attrs(), &[0x2b; 16]).unwrap();
        assert!(store.destroy_key(handle).is_ok());

        // A second destroy and any further use report a dead handle
        assert_eq!(store.destroy_key(handle).unwrap_err(), SkeError::InvalidHandle);
        assert_eq!(
            store.key_attributes(handle).unwrap_err(),
            SkeError::InvalidHandle
        );
    }

    #[test]
    fn destroy_key_in_use() {
        let store = KeyStore::new();
        let handle = store.import_key(aes_gcm_attrs(), &[0x2b; 16]).unwrap();

        let active = store.acquire(handle).unwrap();
        assert_eq!(store.key_in_use_count(handle).unwrap(), 1);
        assert_eq!(store.destroy_key(handle).unwrap_err(), SkeError::NotPermitted);

        drop(active);
        assert_eq!(store.key_in_use_count(handle).unwrap(), 0);
        assert!(store.destroy_key(handle).is_ok());
    }

    #[test]
    fn acquire_counts_nest() {
        let store = KeyStore::new();
        let handle = store.import_key(aes_gcm_attrs(), &[0x2b; 16]).unwrap();

        let first = store.acquire(handle).unwrap();
        let second = store.acquire(handle).unwrap();
        assert_eq!(store.key_in_use_count(handle).unwrap(), 2);

        drop(first);
        assert_eq!(store.key_in_use_count(handle).unwrap(), 1);
        drop(second);
        assert_eq!(store.key_in_use_count(handle).unwrap(), 0);
    }

    #[test]
    fn acquire_unknown_handle() {
        let store = KeyStore::new();
        let handle = store.import_key(aes_gcm_attrs(), &[0x2b; 16]).unwrap();
        store.destroy_key(handle).unwrap();

        let result = store.acquire(handle);
        assert!(matches!(result, Err(SkeError::InvalidHandle)));
    }

    #[test]
    fn clones_share_the_table() {
        let store = KeyStore::new();
        let clone = store.clone();

        let handle = clone.import_key(aes_gcm_attrs(), &[0x2b; 16]).unwrap();
        assert!(store.key_attributes(handle).is_ok());

        store.destroy_key(handle).unwrap();
        assert_eq!(
            clone.key_attributes(handle).unwrap_err(),
            SkeError::InvalidHandle
        );
    }
}
