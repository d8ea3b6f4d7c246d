//! Belt CTR keystream engine.
//!
//! The counter starts at the belt encryption of the IV and is incremented
//! as a little-endian 128-bit integer before each keystream block is
//! produced, matching the belt CTR reference semantics. The last keystream
//! block is buffered so that a stream interrupted mid-block resumes from
//! the unconsumed keystream octets.

use zeroize::Zeroize;

use crate::block::{BLOCK_SIZE, ScheduledKey};

pub(crate) struct BeltCtr {
    ctr: u128,
    keystream: [u8; BLOCK_SIZE],
    reserved: usize,
}

impl BeltCtr {
    pub(crate) fn new(counter: u128) -> Self {
        Self {
            ctr: counter,
            keystream: [0u8; BLOCK_SIZE],
            reserved: 0,
        }
    }

    /// XOR keystream into `buf`. Encryption and decryption are the same
    /// operation.
    pub(crate) fn apply_keystream(&mut self, key: &ScheduledKey, buf: &mut [u8]) {
        let mut buf = buf;

        // use up buffered keystream first
        if self.reserved != 0 {
            let take = self.reserved.min(buf.len());
            let (head, tail) = buf.split_at_mut(take);
            xor_assign(head, &self.keystream[BLOCK_SIZE - self.reserved..][..take]);
            self.reserved -= take;
            buf = tail;
        }

        let mut blocks = buf.chunks_exact_mut(BLOCK_SIZE);
        for block in &mut blocks {
            self.next_block(key);
            xor_assign(block, &self.keystream);
        }

        let rem = blocks.into_remainder();
        if !rem.is_empty() {
            self.next_block(key);
            xor_assign(rem, &self.keystream[..rem.len()]);
            self.reserved = BLOCK_SIZE - rem.len();
        }
    }

    fn next_block(&mut self, key: &ScheduledKey) {
        self.ctr = self.ctr.wrapping_add(1);
        self.keystream = self.ctr.to_le_bytes();
        key.encrypt_block(&mut self.keystream);
    }
}

impl Drop for BeltCtr {
    fn drop(&mut self) {
        self.ctr.zeroize();
        self.keystream.zeroize();
    }
}

fn xor_assign(a: &mut [u8], b: &[u8]) {
    for (a_byte, b_byte) in a.iter_mut().zip(b.iter()) {
        *a_byte ^= b_byte;
    }
}
