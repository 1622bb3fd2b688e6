// Copyright (C) Microsoft Corporation. All rights reserved.

//! Incremental AES/ARIA-GCM transform.
//!
//! Composed from the block cipher in counter mode plus the `ghash`
//! universal hash, the same construction the `aes-gcm` crate assembles
//! internally. Carrying the GHASH state explicitly is what allows the
//! streaming operation to feed data in chunks.

use ghash::universal_hash::KeyInit;
use ghash::universal_hash::UniversalHash;
use ghash::GHash;

use crate::engine::Direction;
use crate::engine::Tag;
use crate::error::SkeError;
use crate::primitive::Block;
use crate::primitive::BlockCipher;
use crate::types::AEAD_BLOCK_SIZE;
use crate::types::GCM_COUNTER_BLOCK_SIZE;
use crate::types::GCM_NONCE_SIZE;

/// Incremental GCM state.
pub(crate) struct GcmEngine {
    cipher: BlockCipher,
    ghash: GHash,
    tag_mask: Block,
    counter: Block,
    buf: Block,
    buf_fill: usize,
    aad_len: u64,
    msg_len: u64,
    aad_open: bool,
    tag_length: usize,
}

impl GcmEngine {
    /// Starts a GCM transform.
    ///
    /// A 12-byte nonce is expanded into the initial counter block by
    /// appending the 32-bit block counter value 1; a 16-byte nonce is taken
    /// verbatim as the initial counter block.
    pub(crate) fn new(
        cipher: BlockCipher,
        nonce: &[u8],
        tag_length: usize,
    ) -> Result<Self, SkeError> {
        let mut counter: Block = [0u8; AEAD_BLOCK_SIZE];
        match nonce.len() {
            GCM_NONCE_SIZE => {
                counter[..GCM_NONCE_SIZE].copy_from_slice(nonce);
                counter[AEAD_BLOCK_SIZE - 1] = 1;
            }
            GCM_COUNTER_BLOCK_SIZE => counter.copy_from_slice(nonce),
            len => {
                tracing::error!(len, "invalid gcm nonce length");
                Err(SkeError::InvalidArgument)?
            }
        }

        let mut hash_key: Block = [0u8; AEAD_BLOCK_SIZE];
        cipher.encrypt_block(&mut hash_key);
        let ghash = GHash::new(ghash::Key::from_slice(&hash_key));

        let mut tag_mask = counter;
        cipher.encrypt_block(&mut tag_mask);

        Ok(Self {
            cipher,
            ghash,
            tag_mask,
            counter,
            buf: [0u8; AEAD_BLOCK_SIZE],
            buf_fill: 0,
            aad_len: 0,
            msg_len: 0,
            aad_open: true,
            tag_length,
        })
    }

    pub(crate) fn absorb_aad(&mut self, aad: &[u8]) {
        debug_assert!(self.aad_open, "aad after message data");
        self.aad_len += aad.len() as u64;
        self.hash_bytes(aad);
    }

    pub(crate) fn process(&mut self, direction: Direction, input: &[u8], output: &mut [u8]) {
        debug_assert_eq!(input.len(), output.len());
        debug_assert!(
            self.msg_len % AEAD_BLOCK_SIZE as u64 == 0,
            "only the final process call may be partial"
        );

        if self.aad_open {
            self.close_aad();
        }
        self.msg_len += input.len() as u64;

        for (in_chunk, out_chunk) in input
            .chunks(AEAD_BLOCK_SIZE)
            .zip(output.chunks_mut(AEAD_BLOCK_SIZE))
        {
            increment_counter(&mut self.counter);
            let mut keystream = self.counter;
            self.cipher.encrypt_block(&mut keystream);

            for (index, byte) in in_chunk.iter().enumerate() {
                out_chunk[index] = byte ^ keystream[index];
            }

            // GHASH always covers the ciphertext side
            match direction {
                Direction::Encrypt => self.hash_bytes(out_chunk),
                Direction::Decrypt => self.hash_bytes(in_chunk),
            }
        }
    }

    pub(crate) fn finalize(mut self) -> Tag {
        if self.aad_open {
            self.close_aad();
        }
        self.flush_padded();

        let mut length_block = ghash::Block::default();
        length_block[..8].copy_from_slice(&(self.aad_len * 8).to_be_bytes());
        length_block[8..].copy_from_slice(&(self.msg_len * 8).to_be_bytes());
        self.ghash.update(&[length_block]);

        let hash = self.ghash.finalize();
        let mut tag: Block = [0u8; AEAD_BLOCK_SIZE];
        for (index, byte) in hash.iter().enumerate() {
            tag[index] = byte ^ self.tag_mask[index];
        }
        Tag::new(tag, self.tag_length)
    }

    fn close_aad(&mut self) {
        self.flush_padded();
        self.aad_open = false;
    }

    fn hash_bytes(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let take = usize::min(AEAD_BLOCK_SIZE - self.buf_fill, data.len());
            self.buf[self.buf_fill..self.buf_fill + take].copy_from_slice(&data[..take]);
            self.buf_fill += take;
            data = &data[take..];

            if self.buf_fill == AEAD_BLOCK_SIZE {
                self.ghash.update(&[ghash::Block::clone_from_slice(&self.buf)]);
                self.buf_fill = 0;
            }
        }
    }

    fn flush_padded(&mut self) {
        if self.buf_fill > 0 {
            self.buf[self.buf_fill..].fill(0);
            self.ghash.update(&[ghash::Block::clone_from_slice(&self.buf)]);
            self.buf_fill = 0;
        }
    }
}

/// Increments the 32-bit big-endian block counter in the low four bytes.
fn increment_counter(counter: &mut Block) {
    let mut value = u32::from_be_bytes([counter[12], counter[13], counter[14], counter[15]]);
    value = value.wrapping_add(1);
    counter[12..].copy_from_slice(&value.to_be_bytes());
}
