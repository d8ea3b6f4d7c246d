//! Belt block primitive adapter.
//!
//! The rest of the crate handles blocks as plain octet strings; the belt
//! cipher is driven through the `cipher` traits the `belt-block` crate
//! exposes, and the 128/192-bit key expansion happens here before the key
//! reaches the cipher.

use belt_block::BeltBlock;
use cipher::{Array, BlockCipherEncrypt, KeyInit};
use zeroize::Zeroize;

use crate::Error;

/// Belt block size in octets.
pub(crate) const BLOCK_SIZE: usize = 16;

/// Scheduled belt key.
///
/// [`BeltBlock`] takes 256-bit keys only; 128- and 192-bit keys are
/// expanded first by the STB 34.101.31 rule: a 128-bit key is repeated,
/// a 192-bit key is completed with θ₇ = θ₁ ⊕ θ₂ ⊕ θ₃ and
/// θ₈ = θ₄ ⊕ θ₅ ⊕ θ₆ over the 32-bit subwords.
#[derive(Clone)]
pub(crate) struct ScheduledKey(BeltBlock);

impl ScheduledKey {
    pub(crate) fn schedule(key: &[u8]) -> Result<Self, Error> {
        let mut theta = [0u8; 32];
        match key.len() {
            16 => {
                theta[..16].copy_from_slice(key);
                theta[16..].copy_from_slice(key);
            }
            24 => {
                theta[..24].copy_from_slice(key);
                // the subword XORs act octet-wise in 4-octet groups
                for i in 0..4 {
                    theta[24 + i] = key[i] ^ key[4 + i] ^ key[8 + i];
                    theta[28 + i] = key[12 + i] ^ key[16 + i] ^ key[20 + i];
                }
            }
            32 => theta.copy_from_slice(key),
            _ => return Err(Error::InvalidKeyLength),
        }
        let cipher = BeltBlock::new_from_slice(&theta).expect("Invalid key length");
        theta.zeroize();
        Ok(Self(cipher))
    }

    /// Encrypt one 128-bit block in place.
    pub(crate) fn encrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        let mut buf = Array::from(*block);
        self.0.encrypt_block(&mut buf);
        block.copy_from_slice(&buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn encrypt_one(key: &[u8], mut block: [u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
        let key = ScheduledKey::schedule(key).expect("valid key length");
        key.encrypt_block(&mut block);
        block
    }

    /// Belt block encryption vector from STB 34.101.31 table A.1.
    #[test]
    fn stb_table_a1() {
        let key = hex!("E9DEE72C 8F0C0FA6 2DDB49F4 6F739647 06075316 ED247A37 39CBA383 03A98BF6");
        let block = encrypt_one(&key, hex!("B194BAC8 0A08F53B 366D008E 584A5DE4"));
        assert_eq!(block, hex!("69CCA1C9 3557C9E3 D66BC3E0 FA88FA6E"));
    }

    #[test]
    fn schedule_128_equals_repeated_key() {
        let short = hex!("E9DEE72C 8F0C0FA6 2DDB49F4 6F739647");
        let mut long = [0u8; 32];
        long[..16].copy_from_slice(&short);
        long[16..].copy_from_slice(&short);

        let block = hex!("B194BAC8 0A08F53B 366D008E 584A5DE4");
        assert_eq!(encrypt_one(&short, block), encrypt_one(&long, block));
    }

    #[test]
    fn schedule_192_completion_rule() {
        let short = hex!("E9DEE72C 8F0C0FA6 2DDB49F4 6F739647 06075316 ED247A37");
        let mut long = [0u8; 32];
        long[..24].copy_from_slice(&short);
        for i in 0..4 {
            long[24 + i] = short[i] ^ short[4 + i] ^ short[8 + i];
            long[28 + i] = short[12 + i] ^ short[16 + i] ^ short[20 + i];
        }

        let block = hex!("B194BAC8 0A08F53B 366D008E 584A5DE4");
        assert_eq!(encrypt_one(&short, block), encrypt_one(&long, block));

        // and the completion is not a plain zero padding
        let mut padded = [0u8; 32];
        padded[..24].copy_from_slice(&short);
        assert_ne!(encrypt_one(&short, block), encrypt_one(&padded, block));
    }

    #[test]
    fn schedule_rejects_other_lengths() {
        for len in [0, 1, 15, 17, 23, 25, 31, 33, 64] {
            let key = [0u8; 64];
            assert_eq!(
                ScheduledKey::schedule(&key[..len]).err(),
                Some(Error::InvalidKeyLength)
            );
        }
    }
}
