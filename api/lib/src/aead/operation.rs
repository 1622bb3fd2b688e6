// Copyright (C) Microsoft Corporation. All rights reserved.

//! Multi-part AEAD operations.

use std::mem;

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::instrument;

use crate::engine::BlockEngine;
use crate::engine::Direction;
use crate::error::SkeError;
use crate::keystore::ActiveKey;
use crate::keystore::KeyHandle;
use crate::keystore::KeyStore;
use crate::primitive::BlockCipher;
use crate::types::AeadAlgorithm;
use crate::types::AeadMode;
use crate::types::KeyType;
use crate::types::AEAD_BLOCK_SIZE;
use crate::types::GCM_COUNTER_BLOCK_SIZE;
use crate::types::GCM_NONCE_SIZE;

/// Key, algorithm and direction bound at setup time.
struct SetupState {
    direction: Direction,
    algorithm: AeadAlgorithm,
    key: ActiveKey,
}

/// Setup plus the declared input totals.
struct LengthsState {
    setup: SetupState,
    aad_total: u64,
    data_total: u64,
}

/// A running transform with its input accounting.
///
/// `leftover` holds up to one block of payload that has been accepted but
/// not yet pushed through the engine; the final block is always held back
/// so `finish` and `verify` can close the transform.
struct ActiveState {
    direction: Direction,
    algorithm: AeadAlgorithm,
    key: ActiveKey,
    aad_total: u64,
    data_total: u64,
    aad_consumed: u64,
    data_consumed: u64,
    data_started: bool,
    engine: BlockEngine,
    leftover: [u8; AEAD_BLOCK_SIZE],
    leftover_fill: usize,
}

impl ActiveState {
    fn new(lengths: LengthsState, engine: BlockEngine) -> Self {
        Self {
            direction: lengths.setup.direction,
            algorithm: lengths.setup.algorithm,
            key: lengths.setup.key,
            aad_total: lengths.aad_total,
            data_total: lengths.data_total,
            aad_consumed: 0,
            data_consumed: 0,
            data_started: false,
            engine,
            leftover: [0; AEAD_BLOCK_SIZE],
            leftover_fill: 0,
        }
    }
}

enum State {
    Init,
    Setup(SetupState),
    LengthsSet(LengthsState),
    Active(ActiveState),
    Terminal,
}

impl State {
    fn direction(&self) -> Option<Direction> {
        match self {
            State::Init | State::Terminal => None,
            State::Setup(setup) => Some(setup.direction),
            State::LengthsSet(lengths) => Some(lengths.setup.direction),
            State::Active(active) => Some(active.direction),
        }
    }
}

/// A multi-part AEAD operation.
///
/// An operation walks a fixed sequence: [`encrypt_setup`] or
/// [`decrypt_setup`] binds a key and algorithm, [`set_lengths`] declares the
/// exact input totals, [`set_nonce`] or [`generate_nonce`] fixes the nonce,
/// additional data and payload stream through [`update_ad`] and [`update`],
/// and [`finish`] (encrypt) or [`verify`] (decrypt) closes the transform.
/// [`abort`] resets the operation from any point, including after an error.
///
/// The bound key is marked in use for the whole life of the operation and
/// released when it completes or aborts.
///
/// [`encrypt_setup`]: AeadOperation::encrypt_setup
/// [`decrypt_setup`]: AeadOperation::decrypt_setup
/// [`set_lengths`]: AeadOperation::set_lengths
/// [`set_nonce`]: AeadOperation::set_nonce
/// [`generate_nonce`]: AeadOperation::generate_nonce
/// [`update_ad`]: AeadOperation::update_ad
/// [`update`]: AeadOperation::update
/// [`finish`]: AeadOperation::finish
/// [`verify`]: AeadOperation::verify
/// [`abort`]: AeadOperation::abort
pub struct AeadOperation {
    state: State,
}

impl Default for AeadOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl AeadOperation {
    /// Creates an idle operation.
    pub fn new() -> Self {
        Self { state: State::Init }
    }

    /// Binds `key` and `algorithm` to this operation for encryption.
    ///
    /// On success the key's in-use count is incremented; it stays
    /// incremented until the operation finishes or aborts.
    ///
    /// # Errors
    ///
    /// * [`SkeError::InvalidHandle`] if `key` does not name a key.
    /// * [`SkeError::NotPermitted`] if the key's usage or algorithm policy
    ///   does not cover this request.
    /// * [`SkeError::BadState`] if the operation is not idle.
    /// * [`SkeError::NotSupported`] if the key is not an AES key; the
    ///   multi-part path only drives the block modes.
    /// * [`SkeError::InvalidArgument`] if `algorithm` is not CCM or GCM.
    #[instrument(skip(self, store))]
    pub fn encrypt_setup(
        &mut self,
        store: &KeyStore,
        key: KeyHandle,
        algorithm: AeadAlgorithm,
    ) -> Result<(), SkeError> {
        self.setup(store, key, algorithm, Direction::Encrypt)
    }

    /// Binds `key` and `algorithm` to this operation for decryption.
    ///
    /// Fails exactly as [`AeadOperation::encrypt_setup`] does, against the
    /// key's decrypt usage.
    #[instrument(skip(self, store))]
    pub fn decrypt_setup(
        &mut self,
        store: &KeyStore,
        key: KeyHandle,
        algorithm: AeadAlgorithm,
    ) -> Result<(), SkeError> {
        self.setup(store, key, algorithm, Direction::Decrypt)
    }

    fn setup(
        &mut self,
        store: &KeyStore,
        key: KeyHandle,
        algorithm: AeadAlgorithm,
        direction: Direction,
    ) -> Result<(), SkeError> {
        let attributes = store.key_attributes(key)?;
        let permitted = match direction {
            Direction::Encrypt => attributes.usage().can_encrypt(),
            Direction::Decrypt => attributes.usage().can_decrypt(),
        };
        if !permitted {
            tracing::error!(key = ?key, "key usage does not permit this direction");
            Err(SkeError::NotPermitted)?
        }
        if !attributes.permits_algorithm(&algorithm) {
            tracing::error!(key = ?key, "key policy does not permit this algorithm");
            Err(SkeError::NotPermitted)?
        }
        if !matches!(self.state, State::Init) {
            tracing::error!("operation is already set up");
            Err(SkeError::BadState)?
        }
        if attributes.key_type() != KeyType::Aes {
            tracing::error!(
                key_type = ?attributes.key_type(),
                "multi-part operations require an AES key"
            );
            Err(SkeError::NotSupported)?
        }
        if !algorithm.is_block_mode() {
            tracing::error!(?algorithm, "multi-part operations require a block mode");
            Err(SkeError::InvalidArgument)?
        }
        // All checks passed; taking the key marks it in use.
        let key = store.acquire(key)?;
        self.state = State::Setup(SetupState {
            direction,
            algorithm,
            key,
        });
        Ok(())
    }

    /// Declares the exact number of additional-data and payload bytes the
    /// operation will see. Both totals are binding; `finish` and `verify`
    /// reject an operation whose inputs do not add up to them.
    ///
    /// # Errors
    ///
    /// * [`SkeError::InvalidArgument`] if both lengths are zero.
    /// * [`SkeError::BadState`] unless called directly after setup.
    #[instrument(skip(self))]
    pub fn set_lengths(&mut self, ad_length: usize, data_length: usize) -> Result<(), SkeError> {
        if ad_length == 0 && data_length == 0 {
            tracing::error!("at least one declared length must be non-zero");
            Err(SkeError::InvalidArgument)?
        }
        match mem::replace(&mut self.state, State::Init) {
            State::Setup(setup) => {
                self.state = State::LengthsSet(LengthsState {
                    setup,
                    aad_total: ad_length as u64,
                    data_total: data_length as u64,
                });
                Ok(())
            }
            other => {
                self.state = other;
                tracing::error!("lengths can only be declared directly after setup");
                Err(SkeError::BadState)
            }
        }
    }

    /// Fixes the caller-chosen nonce and starts the transform.
    ///
    /// CCM accepts 7 through 13 bytes. GCM accepts exactly 12 bytes here;
    /// the 16-byte counter-block form stays internal to the transform.
    ///
    /// # Errors
    ///
    /// * [`SkeError::InvalidArgument`] if the nonce is empty or its length
    ///   is not valid for the algorithm, or if the declared payload total
    ///   cannot be carried by a CCM nonce of this length.
    /// * [`SkeError::BadState`] unless the lengths have been declared.
    #[instrument(skip(self, nonce), fields(nonce_len = nonce.len()))]
    pub fn set_nonce(&mut self, nonce: &[u8]) -> Result<(), SkeError> {
        if nonce.is_empty() {
            tracing::error!("empty nonce");
            Err(SkeError::InvalidArgument)?
        }
        match mem::replace(&mut self.state, State::Init) {
            State::LengthsSet(lengths) => {
                if let Err(err) = lengths.setup.algorithm.validate_stream_nonce(nonce) {
                    tracing::error!(
                        nonce_len = nonce.len(),
                        "nonce length not valid for this algorithm"
                    );
                    self.state = State::LengthsSet(lengths);
                    return Err(err);
                }
                match Self::start_stream(&lengths, nonce) {
                    Ok(engine) => {
                        self.state = State::Active(ActiveState::new(lengths, engine));
                        Ok(())
                    }
                    Err(err) => {
                        self.state = State::LengthsSet(lengths);
                        Err(err)
                    }
                }
            }
            other => {
                self.state = other;
                tracing::error!("a nonce requires declared lengths");
                Err(SkeError::BadState)
            }
        }
    }

    /// Draws a fresh random nonce, writes it to `nonce` and starts the
    /// transform. CCM produces 13 bytes; GCM produces a whole 16-byte
    /// counter block whose first 12 bytes are random. Returns the number of
    /// bytes written.
    ///
    /// # Errors
    ///
    /// * [`SkeError::BadState`] unless the lengths have been declared.
    /// * [`SkeError::BufferTooSmall`] if `nonce` cannot hold the generated
    ///   form.
    /// * [`SkeError::InvalidArgument`] if the declared payload total cannot
    ///   be carried by a generated CCM nonce.
    #[instrument(skip(self, nonce))]
    pub fn generate_nonce(&mut self, nonce: &mut [u8]) -> Result<usize, SkeError> {
        match mem::replace(&mut self.state, State::Init) {
            State::LengthsSet(lengths) => {
                let needed = lengths.setup.algorithm.generated_nonce_length();
                if nonce.len() < needed {
                    tracing::error!(have = nonce.len(), needed, "nonce buffer too small");
                    self.state = State::LengthsSet(lengths);
                    return Err(SkeError::BufferTooSmall);
                }
                let mut generated = [0u8; GCM_COUNTER_BLOCK_SIZE];
                match lengths.setup.algorithm.mode() {
                    AeadMode::Ccm => OsRng.fill_bytes(&mut generated[..needed]),
                    AeadMode::Gcm => {
                        // Random 12-byte nonce with the initial counter
                        // value appended.
                        OsRng.fill_bytes(&mut generated[..GCM_NONCE_SIZE]);
                        generated[GCM_COUNTER_BLOCK_SIZE - 1] = 1;
                    }
                    // Setup only admits the block modes.
                    AeadMode::ChaCha20Poly1305 => (),
                }
                match Self::start_stream(&lengths, &generated[..needed]) {
                    Ok(engine) => {
                        nonce[..needed].copy_from_slice(&generated[..needed]);
                        self.state = State::Active(ActiveState::new(lengths, engine));
                        Ok(needed)
                    }
                    Err(err) => {
                        self.state = State::LengthsSet(lengths);
                        Err(err)
                    }
                }
            }
            other => {
                self.state = other;
                tracing::error!("nonce generation requires declared lengths");
                Err(SkeError::BadState)
            }
        }
    }

    /// Builds the block engine once the nonce is known. The declared totals
    /// are fixed here; CCM bakes them into its first MAC block.
    fn start_stream(lengths: &LengthsState, nonce: &[u8]) -> Result<BlockEngine, SkeError> {
        let setup = &lengths.setup;
        let cipher = BlockCipher::new(setup.key.attributes().key_type(), setup.key.material())?;
        BlockEngine::new(
            cipher,
            &setup.algorithm,
            nonce,
            lengths.aad_total,
            lengths.data_total,
        )
    }

    /// Feeds a chunk of additional data. May be called repeatedly, but only
    /// between the nonce and the first payload update.
    ///
    /// # Errors
    ///
    /// * [`SkeError::InvalidArgument`] if `input` is empty or would push the
    ///   running total past the declared additional-data length.
    /// * [`SkeError::BadState`] if no nonce is set or payload updates have
    ///   already begun.
    #[instrument(skip(self, input), fields(len = input.len()))]
    pub fn update_ad(&mut self, input: &[u8]) -> Result<(), SkeError> {
        if input.is_empty() {
            tracing::error!("empty additional data");
            Err(SkeError::InvalidArgument)?
        }
        let active = match &mut self.state {
            State::Active(active) if !active.data_started => active,
            _ => {
                tracing::error!("additional data is only accepted between nonce and payload");
                Err(SkeError::BadState)?
            }
        };
        let remaining = active.aad_total - active.aad_consumed;
        if (input.len() as u64) > remaining {
            tracing::error!(
                declared = active.aad_total,
                consumed = active.aad_consumed,
                len = input.len(),
                "additional data exceeds the declared total"
            );
            Err(SkeError::InvalidArgument)?
        }
        active.engine.absorb_aad(input);
        active.aad_consumed += input.len() as u64;
        Ok(())
    }

    /// Feeds a chunk of payload and writes the transformed bytes to
    /// `output`. Output is produced in whole blocks; the trailing partial
    /// block, and on an exact block boundary the final whole block, is held
    /// back until [`AeadOperation::finish`] or [`AeadOperation::verify`].
    /// Returns the number of bytes written.
    ///
    /// Nothing is written and the operation state is unchanged unless the
    /// call succeeds.
    ///
    /// # Errors
    ///
    /// * [`SkeError::InvalidArgument`] if `input` is empty, would push the
    ///   running total past the declared payload length, or arrives before
    ///   all declared additional data.
    /// * [`SkeError::BadState`] if no nonce is set or the operation has
    ///   completed.
    /// * [`SkeError::BufferTooSmall`] if `output` cannot hold every block
    ///   this call would produce.
    #[instrument(skip(self, input, output), fields(len = input.len()))]
    pub fn update(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, SkeError> {
        if input.is_empty() {
            tracing::error!("empty input");
            Err(SkeError::InvalidArgument)?
        }
        let active = match &mut self.state {
            State::Active(active) => active,
            _ => {
                tracing::error!("payload updates require a nonce");
                Err(SkeError::BadState)?
            }
        };
        let remaining = active.data_total - active.data_consumed;
        if (input.len() as u64) > remaining {
            tracing::error!(
                declared = active.data_total,
                consumed = active.data_consumed,
                len = input.len(),
                "input exceeds the declared total"
            );
            Err(SkeError::InvalidArgument)?
        }
        if active.aad_consumed != active.aad_total {
            tracing::error!(
                declared = active.aad_total,
                consumed = active.aad_consumed,
                "additional data is incomplete"
            );
            Err(SkeError::InvalidArgument)?
        }
        let total = active.leftover_fill + input.len();
        let held = (total - 1) % AEAD_BLOCK_SIZE + 1;
        let processed = total - held;
        if output.len() < processed {
            tracing::error!(
                have = output.len(),
                needed = processed,
                "output buffer too small"
            );
            Err(SkeError::BufferTooSmall)?
        }

        let mut body = input;
        if processed > 0 {
            let mut written = 0;
            if active.leftover_fill > 0 {
                // Top the held bytes up to a whole block and push it first.
                let (head, rest) = body.split_at(AEAD_BLOCK_SIZE - active.leftover_fill);
                active.leftover[active.leftover_fill..].copy_from_slice(head);
                let block = active.leftover;
                active
                    .engine
                    .process(active.direction, &block, &mut output[..AEAD_BLOCK_SIZE]);
                written = AEAD_BLOCK_SIZE;
                body = rest;
            }
            let (head, rest) = body.split_at(processed - written);
            active
                .engine
                .process(active.direction, head, &mut output[written..processed]);
            body = rest;
            active.leftover[..body.len()].copy_from_slice(body);
            active.leftover_fill = body.len();
        } else {
            active.leftover[active.leftover_fill..total].copy_from_slice(body);
            active.leftover_fill = total;
        }
        active.data_started = true;
        active.data_consumed += input.len() as u64;
        Ok(processed)
    }

    /// Closes an encrypt operation: flushes the held payload bytes to
    /// `output`, writes the authentication tag to `tag` and returns the two
    /// byte counts. The operation ends up completed; [`AeadOperation::abort`]
    /// readies it for reuse.
    ///
    /// Both buffers are checked before anything is written to either.
    ///
    /// # Errors
    ///
    /// * [`SkeError::InvalidArgument`] unless the operation encrypts, or
    ///   when the supplied inputs do not add up to the declared totals.
    /// * [`SkeError::BadState`] if no nonce is set.
    /// * [`SkeError::BufferTooSmall`] if either buffer is undersized.
    #[instrument(skip_all)]
    pub fn finish(&mut self, output: &mut [u8], tag: &mut [u8]) -> Result<(usize, usize), SkeError> {
        if self.state.direction() != Some(Direction::Encrypt) {
            tracing::error!("finish requires an encrypt operation");
            Err(SkeError::InvalidArgument)?
        }
        let mut active = match mem::replace(&mut self.state, State::Terminal) {
            State::Active(active) => active,
            other => {
                self.state = other;
                tracing::error!("finish requires a nonce and streamed inputs");
                Err(SkeError::BadState)?
            }
        };
        if let Err(err) = Self::final_checks(&active, output.len(), Some(tag.len())) {
            self.state = State::Active(active);
            return Err(err);
        }
        let fill = active.leftover_fill;
        let tag_length = active.algorithm.tag_length();
        active
            .engine
            .process(active.direction, &active.leftover[..fill], &mut output[..fill]);
        let ActiveState { engine, .. } = active;
        let computed = engine.finalize();
        tag[..tag_length].copy_from_slice(computed.as_bytes());
        Ok((fill, tag_length))
    }

    /// Closes a decrypt operation: flushes the held payload bytes to
    /// `output` and checks the caller's `tag` against the computed one in
    /// constant time. Returns the number of payload bytes written. The
    /// operation ends up completed either way; on a tag mismatch the bytes
    /// this call wrote are zeroed first.
    ///
    /// # Errors
    ///
    /// * [`SkeError::InvalidArgument`] on an encrypt operation, an empty
    ///   `tag`, or inputs that do not add up to the declared totals.
    /// * [`SkeError::BadState`] if no nonce is set.
    /// * [`SkeError::BufferTooSmall`] if `output` is undersized.
    /// * [`SkeError::AuthenticationFailed`] if the tag does not match.
    #[instrument(skip_all)]
    pub fn verify(&mut self, output: &mut [u8], tag: &[u8]) -> Result<usize, SkeError> {
        if tag.is_empty() {
            tracing::error!("empty tag");
            Err(SkeError::InvalidArgument)?
        }
        if self.state.direction() == Some(Direction::Encrypt) {
            tracing::error!("verify requires a decrypt operation");
            Err(SkeError::InvalidArgument)?
        }
        let mut active = match mem::replace(&mut self.state, State::Terminal) {
            State::Active(active) => active,
            other => {
                self.state = other;
                tracing::error!("verify requires a nonce and streamed inputs");
                Err(SkeError::BadState)?
            }
        };
        if let Err(err) = Self::final_checks(&active, output.len(), None) {
            self.state = State::Active(active);
            return Err(err);
        }
        let fill = active.leftover_fill;
        active
            .engine
            .process(active.direction, &active.leftover[..fill], &mut output[..fill]);
        let ActiveState { engine, .. } = active;
        let computed = engine.finalize();
        if !computed.matches(tag) {
            output[..fill].fill(0);
            tracing::error!("authentication tag mismatch");
            Err(SkeError::AuthenticationFailed)?
        }
        Ok(fill)
    }

    /// Buffer and accounting checks shared by `finish` and `verify`, run
    /// before either touches an output buffer. `tag_capacity` is `None` for
    /// `verify`, which reads the tag instead of writing it.
    fn final_checks(
        active: &ActiveState,
        out_capacity: usize,
        tag_capacity: Option<usize>,
    ) -> Result<(), SkeError> {
        let needed = active.leftover_fill;
        let tag_length = active.algorithm.tag_length();
        let tag_short = tag_capacity.is_some_and(|capacity| capacity < tag_length);
        if out_capacity < needed || tag_short {
            tracing::error!(
                out_capacity,
                needed,
                tag_short,
                "output or tag buffer too small for the finale"
            );
            Err(SkeError::BufferTooSmall)?
        }
        if active.data_consumed != active.data_total || active.aad_consumed != active.aad_total {
            tracing::error!(
                data_declared = active.data_total,
                data_consumed = active.data_consumed,
                ad_declared = active.aad_total,
                ad_consumed = active.aad_consumed,
                "declared totals were not fully supplied"
            );
            Err(SkeError::InvalidArgument)?
        }
        Ok(())
    }

    /// Resets the operation to idle, releasing the bound key if one is
    /// held. Safe to call from any state, any number of times.
    #[instrument(skip(self))]
    pub fn abort(&mut self) {
        self.state = State::Init;
    }
}
