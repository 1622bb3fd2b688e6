// Copyright (C) Microsoft Corporation. All rights reserved.

//! Authenticated encryption over keys held in a
//! [`KeyStore`](crate::keystore::KeyStore).
//!
//! [`KeyStore::aead_encrypt`](crate::keystore::KeyStore::aead_encrypt) and
//! [`KeyStore::aead_decrypt`](crate::keystore::KeyStore::aead_decrypt) run a
//! whole message in one call. [`AeadOperation`] streams a message through a
//! declared-length, multi-part exchange.

mod oneshot;
mod operation;

pub use operation::AeadOperation;
