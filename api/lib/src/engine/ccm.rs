// Copyright (C) Microsoft Corporation. All rights reserved.

//! Incremental AES/ARIA-CCM transform (RFC 3610).
//!
//! CCM authenticates the plaintext with CBC-MAC and encrypts with the block
//! cipher in counter mode. The total additional-data and message lengths are
//! part of the very first MAC block, which is why the streaming operation
//! requires declared lengths before the nonce can be set.

use crate::engine::Direction;
use crate::engine::Tag;
use crate::error::SkeError;
use crate::primitive::Block;
use crate::primitive::BlockCipher;
use crate::types::AEAD_BLOCK_SIZE;
use crate::types::CCM_NONCE_MAX_SIZE;
use crate::types::CCM_NONCE_MIN_SIZE;

/// Incremental CCM state.
pub(crate) struct CcmEngine {
    cipher: BlockCipher,
    mac: Block,
    buf: Block,
    buf_fill: usize,
    counter: Block,
    counter_width: usize,
    tag_mask: Block,
    aad_remaining: u64,
    tag_length: usize,
}

impl CcmEngine {
    /// Starts a CCM transform.
    ///
    /// The nonce length determines the counter width `q = 15 - n`, which in
    /// turn bounds the message length to `2^(8q) - 1` bytes.
    pub(crate) fn new(
        cipher: BlockCipher,
        nonce: &[u8],
        tag_length: usize,
        aad_len: u64,
        msg_len: u64,
    ) -> Result<Self, SkeError> {
        let nonce_len = nonce.len();
        if !(CCM_NONCE_MIN_SIZE..=CCM_NONCE_MAX_SIZE).contains(&nonce_len) {
            tracing::error!(len = nonce_len, "invalid ccm nonce length");
            Err(SkeError::InvalidArgument)?
        }

        let counter_width = 15 - nonce_len;
        if counter_width < 8 && (msg_len >> (8 * counter_width as u32)) != 0 {
            tracing::error!(
                msg_len,
                counter_width,
                "message too long for the nonce length"
            );
            Err(SkeError::InvalidArgument)?
        }

        // B0: flags, nonce, message length
        let mut block0: Block = [0u8; AEAD_BLOCK_SIZE];
        block0[0] = (u8::from(aad_len != 0) << 6)
            | ((((tag_length - 2) / 2) as u8) << 3)
            | (counter_width - 1) as u8;
        block0[1..=nonce_len].copy_from_slice(nonce);
        block0[AEAD_BLOCK_SIZE - counter_width..]
            .copy_from_slice(&msg_len.to_be_bytes()[8 - counter_width..]);

        let mut mac = block0;
        cipher.encrypt_block(&mut mac);

        // A0: counter-mode template with the block counter at zero
        let mut counter: Block = [0u8; AEAD_BLOCK_SIZE];
        counter[0] = (counter_width - 1) as u8;
        counter[1..=nonce_len].copy_from_slice(nonce);
        let mut tag_mask = counter;
        cipher.encrypt_block(&mut tag_mask);

        let mut engine = Self {
            cipher,
            mac,
            buf: [0u8; AEAD_BLOCK_SIZE],
            buf_fill: 0,
            counter,
            counter_width,
            tag_mask,
            aad_remaining: aad_len,
            tag_length,
        };

        // The additional data is prefixed with its own length encoding
        if aad_len > 0 {
            let mut prefix = [0u8; 10];
            let prefix_len = if aad_len < 0xFF00 {
                prefix[..2].copy_from_slice(&(aad_len as u16).to_be_bytes());
                2
            } else if aad_len <= u64::from(u32::MAX) {
                prefix[0] = 0xFF;
                prefix[1] = 0xFE;
                prefix[2..6].copy_from_slice(&(aad_len as u32).to_be_bytes());
                6
            } else {
                prefix[0] = 0xFF;
                prefix[1] = 0xFF;
                prefix[2..10].copy_from_slice(&aad_len.to_be_bytes());
                10
            };
            engine.mac_bytes(&prefix[..prefix_len]);
        }

        Ok(engine)
    }

    pub(crate) fn absorb_aad(&mut self, aad: &[u8]) {
        self.mac_bytes(aad);
        self.aad_remaining = self.aad_remaining.saturating_sub(aad.len() as u64);
        if self.aad_remaining == 0 {
            self.flush_padded();
        }
    }

    pub(crate) fn process(&mut self, direction: Direction, input: &[u8], output: &mut [u8]) {
        debug_assert_eq!(input.len(), output.len());

        if self.aad_remaining > 0 {
            // Declared additional data never fully arrived. Close the region
            // so the transform stays well formed; the operation layer fails
            // the final length check before any tag is released.
            self.aad_remaining = 0;
            self.flush_padded();
        }

        for (in_chunk, out_chunk) in input
            .chunks(AEAD_BLOCK_SIZE)
            .zip(output.chunks_mut(AEAD_BLOCK_SIZE))
        {
            // The MAC covers the plaintext side
            if direction == Direction::Encrypt {
                self.mac_bytes(in_chunk);
            }

            self.increment_counter();
            let mut keystream = self.counter;
            self.cipher.encrypt_block(&mut keystream);
            for (index, byte) in in_chunk.iter().enumerate() {
                out_chunk[index] = byte ^ keystream[index];
            }

            if direction == Direction::Decrypt {
                self.mac_bytes(out_chunk);
            }
        }
    }

    pub(crate) fn finalize(mut self) -> Tag {
        self.flush_padded();

        let mut tag: Block = [0u8; AEAD_BLOCK_SIZE];
        for (index, byte) in self.mac.iter().enumerate() {
            tag[index] = byte ^ self.tag_mask[index];
        }
        Tag::new(tag, self.tag_length)
    }

    fn mac_bytes(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let take = usize::min(AEAD_BLOCK_SIZE - self.buf_fill, data.len());
            self.buf[self.buf_fill..self.buf_fill + take].copy_from_slice(&data[..take]);
            self.buf_fill += take;
            data = &data[take..];

            if self.buf_fill == AEAD_BLOCK_SIZE {
                self.mac_block();
            }
        }
    }

    fn flush_padded(&mut self) {
        if self.buf_fill > 0 {
            self.buf[self.buf_fill..].fill(0);
            self.mac_block();
        }
    }

    fn mac_block(&mut self) {
        for (index, byte) in self.buf.iter().enumerate() {
            self.mac[index] ^= byte;
        }
        self.cipher.encrypt_block(&mut self.mac);
        self.buf_fill = 0;
    }

    fn increment_counter(&mut self) {
        for index in (AEAD_BLOCK_SIZE - self.counter_width..AEAD_BLOCK_SIZE).rev() {
            self.counter[index] = self.counter[index].wrapping_add(1);
            if self.counter[index] != 0 {
                break;
            }
        }
    }
}
