// Copyright (C) Microsoft Corporation. All rights reserved.

/// AEAD algorithm identifiers and their nonce, tag and size rules.
pub mod algo;
/// Key types, usage policies and creation-time attributes.
pub mod key_props;

#[cfg(test)]
mod tests;

#[allow(unused_imports)]
pub use algo::*;
pub use key_props::*;
