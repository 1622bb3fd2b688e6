// Copyright (C) Microsoft Corporation. All rights reserved.

#![warn(missing_docs)]

//! Symmetric Key Engine API
//!
//! This crate keeps symmetric keys in an in-memory [`KeyStore`] and runs
//! authenticated encryption over them: AES and ARIA in CCM and GCM, and
//! ChaCha20-Poly1305, either whole-message in one call or streamed through
//! a declared-length multi-part [`AeadOperation`].

mod aead;
mod engine;
mod error;
mod keystore;
mod primitive;
mod types;

pub use aead::AeadOperation;
pub use error::SkeError;
pub use keystore::KeyHandle;
pub use keystore::KeyStore;
pub use types::*;
