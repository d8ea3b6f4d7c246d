//! DWP streaming state machine and the one-shot wrap/unwrap operations.

use core::fmt;

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::block::{BLOCK_SIZE, ScheduledKey};
use crate::ctr::BeltCtr;
use crate::gf::{self, Element};
use crate::{Error, Iv, TAG_SIZE, Tag};

/// First 16 octets of the belt H-table: the initial accumulator value.
const T_INIT: [u8; BLOCK_SIZE] = [
    0xB1, 0x94, 0xBA, 0xC8, 0x0A, 0x08, 0xF5, 0x3B, 0x36, 0x6D, 0x00, 0x8E, 0x58, 0x4A, 0x5D, 0xE4,
];

/// Which kind of data the state currently accepts.
///
/// The phase moves forward once, on the first non-empty payload operation;
/// finalization consumes the state, so no third variant is needed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    Header,
    Payload,
}

/// Universal-hash accumulator: `t ← (t ⊕ B) ⊙ r` per 128-bit block, with a
/// staging buffer for partial blocks.
struct UnivHash {
    r: Element,
    t: Element,
    block: [u8; BLOCK_SIZE],
    filled: usize,
}

impl UnivHash {
    fn new(r: Element) -> Self {
        Self {
            r,
            t: gf::from_block(&T_INIT),
            block: [0u8; BLOCK_SIZE],
            filled: 0,
        }
    }

    fn absorb(&mut self, mut data: &[u8]) {
        if self.filled != 0 {
            let take = (BLOCK_SIZE - self.filled).min(data.len());
            self.block[self.filled..self.filled + take].copy_from_slice(&data[..take]);
            self.filled += take;
            data = &data[take..];
            if self.filled < BLOCK_SIZE {
                return;
            }
            let staged = self.block;
            self.compress(gf::from_block(&staged));
            self.filled = 0;
        }

        let mut blocks = data.chunks_exact(BLOCK_SIZE);
        for chunk in &mut blocks {
            let mut block = [0u8; BLOCK_SIZE];
            block.copy_from_slice(chunk);
            self.compress(gf::from_block(&block));
        }

        let rem = blocks.remainder();
        if !rem.is_empty() {
            self.block[..rem.len()].copy_from_slice(rem);
            self.filled = rem.len();
        }
    }

    /// Zero-pad and consume a partially filled staging buffer.
    ///
    /// Called at the header/payload boundary and at finalization.
    fn flush_padded(&mut self) {
        if self.filled != 0 {
            self.block[self.filled..].fill(0);
            let staged = self.block;
            self.compress(gf::from_block(&staged));
            self.filled = 0;
        }
    }

    fn compress(&mut self, m: Element) {
        self.t = gf::mul([self.t[0] ^ m[0], self.t[1] ^ m[1]], self.r);
    }

    fn output(&self) -> Element {
        self.t
    }
}

impl Drop for UnivHash {
    fn drop(&mut self) {
        self.r.zeroize();
        self.t.zeroize();
        self.block.zeroize();
    }
}

/// Streaming DWP state for one authenticated message.
///
/// The lifecycle is: absorb header chunks with [`update_ad`], then encrypt
/// (or decrypt) and authenticate payload chunks in any interleaving, then
/// finalize with [`compute_tag`] or [`verify_tag`]. Finalization consumes
/// the state; secret material is wiped when the state is dropped on any
/// path.
///
/// Feeding header data after the first non-empty payload operation is a
/// contract violation and is caught by a debug assertion.
///
/// [`update_ad`]: DwpState::update_ad
/// [`compute_tag`]: DwpState::compute_tag
/// [`verify_tag`]: DwpState::verify_tag
pub struct DwpState {
    key: ScheduledKey,
    ctr: BeltCtr,
    hash: UnivHash,
    ad_bits: u64,
    msg_bits: u64,
    phase: Phase,
}

impl DwpState {
    /// Start a DWP message under the given key and 16-octet IV.
    ///
    /// The key must be 16, 24, or 32 octets long. An IV must never be
    /// reused under the same key.
    pub fn new(key: &[u8], iv: &Iv) -> Result<Self, Error> {
        Ok(Self::with_key(ScheduledKey::schedule(key)?, iv))
    }

    fn with_key(key: ScheduledKey, iv: &Iv) -> Self {
        let mut block = *iv;
        // counter₀ = belt(IV), r = belt(counter₀)
        key.encrypt_block(&mut block);
        let ctr = BeltCtr::new(u128::from_le_bytes(block));
        key.encrypt_block(&mut block);
        let r = gf::from_block(&block);
        block.zeroize();

        Self {
            key,
            ctr,
            hash: UnivHash::new(r),
            ad_bits: 0,
            msg_bits: 0,
            phase: Phase::Header,
        }
    }

    /// Absorb a chunk of the associated header.
    ///
    /// Permitted only before the first non-empty payload operation.
    pub fn update_ad(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        debug_assert_eq!(
            self.phase,
            Phase::Header,
            "header data after payload has started"
        );
        add_bits(&mut self.ad_bits, data.len());
        self.hash.absorb(data);
    }

    /// Encrypt a chunk of payload in place.
    ///
    /// The produced ciphertext is what must be fed to [`authenticate`];
    /// this method only applies keystream.
    ///
    /// [`authenticate`]: DwpState::authenticate
    pub fn encrypt(&mut self, buffer: &mut [u8]) {
        self.enter_payload(buffer.len());
        self.ctr.apply_keystream(&self.key, buffer);
    }

    /// Decrypt a chunk of payload in place.
    ///
    /// CTR keystream application is an involution, so this is the same
    /// operation as [`encrypt`] under a different name.
    ///
    /// [`encrypt`]: DwpState::encrypt
    pub fn decrypt(&mut self, buffer: &mut [u8]) {
        self.encrypt(buffer);
    }

    /// Authenticate a chunk of payload ciphertext.
    pub fn authenticate(&mut self, data: &[u8]) {
        self.enter_payload(data.len());
        add_bits(&mut self.msg_bits, data.len());
        self.hash.absorb(data);
    }

    /// Finalize and return the 8-octet authentication tag.
    pub fn compute_tag(mut self) -> Tag {
        self.finalize_hash()
    }

    /// Finalize and compare the computed tag with `tag` in constant time.
    pub fn verify_tag(mut self, tag: &Tag) -> Result<(), Error> {
        let mut computed = self.finalize_hash();
        let ok: bool = computed.as_slice().ct_eq(tag.as_slice()).into();
        computed.zeroize();
        if ok { Ok(()) } else { Err(Error::BadMac) }
    }

    /// First non-empty payload operation pads the outstanding header block
    /// and moves the phase forward.
    fn enter_payload(&mut self, count: usize) {
        if count != 0 && self.phase == Phase::Header {
            self.hash.flush_padded();
            self.phase = Phase::Payload;
        }
    }

    fn finalize_hash(&mut self) -> Tag {
        self.hash.flush_padded();
        self.hash.compress([self.ad_bits, self.msg_bits]);

        let mut block = gf::to_block(self.hash.output());
        self.key.encrypt_block(&mut block);

        // tag = low 8 octets of the little-endian serialization of the
        // encrypted accumulator; the octet order is pinned by the
        // STB 34.101.31 appendix A vectors
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&block[..TAG_SIZE]);
        block.zeroize();
        tag
    }
}

impl fmt::Debug for DwpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DwpState")
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

/// Keyed DWP instance for one-shot wrap/unwrap operations.
///
/// Schedules the key once; each message supplies its own IV.
pub struct BeltDwp {
    key: ScheduledKey,
}

impl BeltDwp {
    /// Schedule a 16-, 24-, or 32-octet belt key.
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        Ok(Self {
            key: ScheduledKey::schedule(key)?,
        })
    }

    /// Start a streaming state for one message under this key.
    pub fn start(&self, iv: &Iv) -> DwpState {
        DwpState::with_key(self.key.clone(), iv)
    }

    /// Encrypt `buffer` in place, authenticating it together with `header`,
    /// and return the authentication tag.
    pub fn wrap_in_place(&self, iv: &Iv, header: &[u8], buffer: &mut [u8]) -> Tag {
        let mut state = self.start(iv);
        state.update_ad(header);
        state.encrypt(buffer);
        state.authenticate(buffer);
        state.compute_tag()
    }

    /// Verify `tag` over `header` and the ciphertext in `buffer`, then
    /// decrypt `buffer` in place.
    ///
    /// On [`Error::BadMac`] the buffer still holds the ciphertext: no
    /// plaintext is ever written for unauthentic data.
    pub fn unwrap_in_place(
        &self,
        iv: &Iv,
        header: &[u8],
        buffer: &mut [u8],
        tag: &Tag,
    ) -> Result<(), Error> {
        let mut state = self.start(iv);
        state.update_ad(header);
        state.authenticate(buffer);

        let mut computed = state.finalize_hash();
        let ok: bool = computed.as_slice().ct_eq(tag.as_slice()).into();
        computed.zeroize();
        if !ok {
            return Err(Error::BadMac);
        }

        state.decrypt(buffer);
        Ok(())
    }
}

impl fmt::Debug for BeltDwp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeltDwp").finish_non_exhaustive()
    }
}

/// Track an absorbed chunk in a 64-bit bit-length counter.
///
/// Overflowing 2^64 bits in one phase is outside the DWP message bound and
/// a contract violation.
fn add_bits(counter: &mut u64, count: usize) {
    let bits = (count as u64).wrapping_mul(8);
    let (sum, overflow) = counter.overflowing_add(bits);
    debug_assert!(
        count as u64 <= (u64::MAX >> 3) && !overflow,
        "DWP message length limit exceeded"
    );
    *counter = sum;
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x33; 32];
    const IV: Iv = [0x77; 16];

    #[test]
    fn empty_message_tag_is_deterministic() {
        let a = DwpState::new(&KEY, &IV).expect("valid key").compute_tag();
        let b = DwpState::new(&KEY, &IV).expect("valid key").compute_tag();
        assert_eq!(a, b);

        let other_iv = [0x78; 16];
        let c = DwpState::new(&KEY, &other_iv).expect("valid key").compute_tag();
        assert_ne!(a, c);
    }

    #[test]
    fn header_chunking_does_not_change_the_tag() {
        let header = b"0123456789abcdefghijklmnopqrstu";

        let mut one_shot = DwpState::new(&KEY, &IV).expect("valid key");
        one_shot.update_ad(header);

        let mut chunked = DwpState::new(&KEY, &IV).expect("valid key");
        for part in header.chunks(7) {
            chunked.update_ad(part);
        }

        assert_eq!(one_shot.compute_tag(), chunked.compute_tag());
    }

    #[test]
    fn verify_accepts_computed_tag() {
        let dwp = BeltDwp::new(&KEY).expect("valid key");
        let mut buffer = *b"some payload bytes";
        let tag = dwp.wrap_in_place(&IV, b"header", &mut buffer);

        let mut state = dwp.start(&IV);
        state.update_ad(b"header");
        state.authenticate(&buffer);
        assert_eq!(state.verify_tag(&tag), Ok(()));
    }

    #[test]
    fn verify_rejects_a_flipped_tag_bit() {
        let dwp = BeltDwp::new(&KEY).expect("valid key");
        let mut buffer = *b"some payload bytes";
        let mut tag = dwp.wrap_in_place(&IV, b"header", &mut buffer);
        tag[0] ^= 1;

        let mut state = dwp.start(&IV);
        state.update_ad(b"header");
        state.authenticate(&buffer);
        assert_eq!(state.verify_tag(&tag), Err(Error::BadMac));
    }
}
