//! SHAKE256 extendable output function (FIPS PUB 202)
//!
//! Only the 256-bit variant is needed: it is the stream behind
//! [`RandomSampler`](crate::sampler::RandomSampler). Absorbing after the
//! first squeeze is rejected; [`ShakeXof256::reset`] starts a fresh sponge.

use evi_params::SHAKE256_RATE;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::ExtendableOutputFunction;
use crate::error::{validate, Error, Result};

const KECCAK_ROUNDS: usize = 24;
const KECCAK_STATE_SIZE: usize = 25;

// Round constants for Keccak
const RC: [u64; KECCAK_ROUNDS] = [
    0x0000000000000001, 0x0000000000008082, 0x800000000000808A, 0x8000000080008000,
    0x000000000000808B, 0x0000000080000001, 0x8000000080008081, 0x8000000000008009,
    0x000000000000008A, 0x0000000000000088, 0x0000000080008009, 0x000000008000000A,
    0x000000008000808B, 0x800000000000008B, 0x8000000000008089, 0x8000000000008003,
    0x8000000000008002, 0x8000000000000080, 0x000000000000800A, 0x800000008000000A,
    0x8000000080008081, 0x8000000000008080, 0x0000000080000001, 0x8000000080008008,
];

// Rotation offsets, in the order lanes are visited by the pi walk
const RHO: [u32; 24] = [
    1, 3, 6, 10, 15, 21, 28, 36, 45, 55, 2, 14,
    27, 41, 56, 8, 25, 43, 62, 18, 39, 61, 20, 44,
];

// Destination lane of each step of the pi walk
const PI: [usize; 24] = [
    10, 7, 11, 17, 18, 3, 5, 16, 8, 21, 24, 4,
    15, 23, 19, 13, 12, 2, 20, 14, 22, 9, 6, 1,
];

/// Keccak-f[1600] permutation
fn keccak_f1600(state: &mut [u64; KECCAK_STATE_SIZE]) {
    let mut c = [0u64; 5];
    let mut b = [0u64; KECCAK_STATE_SIZE];

    for &rc in RC.iter() {
        // Theta
        for x in 0..5 {
            c[x] = state[x] ^ state[x + 5] ^ state[x + 10] ^ state[x + 15] ^ state[x + 20];
        }
        for x in 0..5 {
            let d = c[(x + 4) % 5] ^ c[(x + 1) % 5].rotate_left(1);
            for y in 0..5 {
                state[x + 5 * y] ^= d;
            }
        }

        // Rho and Pi
        let mut x = 1;
        let mut y = 0;
        b[0] = state[0];
        for i in 0..24 {
            b[PI[i]] = state[x + 5 * y].rotate_left(RHO[i]);
            let t = y;
            y = (2 * x + 3 * y) % 5;
            x = t;
        }

        // Chi
        for y in 0..5 {
            for x in 0..5 {
                let idx = x + 5 * y;
                state[idx] = b[idx] ^ ((!b[(x + 1) % 5 + 5 * y]) & b[(x + 2) % 5 + 5 * y]);
            }
        }

        // Iota
        state[0] ^= rc;
    }

    c.zeroize();
    b.zeroize();
}

/// XOR one rate-sized block into the state and permute
fn keccak_absorb(state: &mut [u64; KECCAK_STATE_SIZE], block: &[u8]) {
    for (lane, chunk) in state.iter_mut().zip(block.chunks_exact(8)) {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        *lane ^= u64::from_le_bytes(word);
    }
    keccak_f1600(state);
}

/// SHAKE-256 extendable output function
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ShakeXof256 {
    state: [u64; KECCAK_STATE_SIZE],
    buffer: [u8; SHAKE256_RATE],
    buffer_idx: usize,
    is_finalized: bool,
    squeezing: bool,
}

impl ShakeXof256 {
    fn init() -> Self {
        Self {
            state: [0u64; KECCAK_STATE_SIZE],
            buffer: [0u8; SHAKE256_RATE],
            buffer_idx: 0,
            is_finalized: false,
            squeezing: false,
        }
    }

    /// A sponge that has already absorbed `seed`
    pub fn with_seed(seed: &[u8]) -> Result<Self> {
        let mut xof = Self::init();
        xof.update(seed)?;
        xof.finalize()?;
        Ok(xof)
    }

    /// Next eight output bytes as a little-endian word
    pub fn next_u64(&mut self) -> Result<u64> {
        let mut word = [0u8; 8];
        self.squeeze(&mut word)?;
        Ok(u64::from_le_bytes(word))
    }

    fn fill_output_block(&mut self) {
        for (chunk, lane) in self.buffer.chunks_exact_mut(8).zip(self.state.iter()) {
            chunk.copy_from_slice(&lane.to_le_bytes());
        }
    }
}

impl ExtendableOutputFunction for ShakeXof256 {
    fn new() -> Self {
        Self::init()
    }

    fn update(&mut self, data: &[u8]) -> Result<()> {
        if self.is_finalized {
            return Err(Error::Processing {
                operation: "SHAKE256",
                details: "cannot absorb after finalization",
            });
        }

        let mut idx = 0;
        if self.buffer_idx > 0 {
            let to_copy = (SHAKE256_RATE - self.buffer_idx).min(data.len());
            self.buffer[self.buffer_idx..self.buffer_idx + to_copy].copy_from_slice(&data[..to_copy]);
            self.buffer_idx += to_copy;
            idx = to_copy;

            if self.buffer_idx == SHAKE256_RATE {
                let block = self.buffer;
                keccak_absorb(&mut self.state, &block);
                self.buffer_idx = 0;
            }
        }

        while data.len() - idx >= SHAKE256_RATE {
            keccak_absorb(&mut self.state, &data[idx..idx + SHAKE256_RATE]);
            idx += SHAKE256_RATE;
        }

        if idx < data.len() {
            let rem = data.len() - idx;
            self.buffer[..rem].copy_from_slice(&data[idx..]);
            self.buffer_idx = rem;
        }

        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        if self.is_finalized {
            return Ok(());
        }

        let mut pad_block = [0u8; SHAKE256_RATE];
        pad_block[..self.buffer_idx].copy_from_slice(&self.buffer[..self.buffer_idx]);
        pad_block[self.buffer_idx] ^= 0x1F;
        pad_block[SHAKE256_RATE - 1] ^= 0x80;
        keccak_absorb(&mut self.state, &pad_block);
        pad_block.zeroize();

        self.is_finalized = true;
        self.buffer_idx = 0;
        Ok(())
    }

    fn squeeze(&mut self, output: &mut [u8]) -> Result<()> {
        validate::parameter(!output.is_empty(), "output_length", "Output buffer must not be empty")?;

        if !self.is_finalized {
            self.finalize()?;
        }
        if !self.squeezing {
            self.fill_output_block();
            self.squeezing = true;
        }

        let mut offset = 0;
        while offset < output.len() {
            if self.buffer_idx == SHAKE256_RATE {
                keccak_f1600(&mut self.state);
                self.fill_output_block();
                self.buffer_idx = 0;
            }

            let to_copy = (SHAKE256_RATE - self.buffer_idx).min(output.len() - offset);
            output[offset..offset + to_copy]
                .copy_from_slice(&self.buffer[self.buffer_idx..self.buffer_idx + to_copy]);
            offset += to_copy;
            self.buffer_idx += to_copy;
        }

        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.zeroize();
        *self = Self::init();
        Ok(())
    }

    fn security_level() -> usize {
        256
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_of(bytes: &[u8]) -> String {
        hex::encode(bytes)
    }

    #[test]
    fn test_shake256_empty() {
        let out = ShakeXof256::generate(b"", 32).unwrap();
        assert_eq!(
            hex_of(&out),
            "46b9dd2b0ba88d13233b3feb743eeb243fcd52ea62b81b82b50c27646ed5762f"
        );
    }

    #[test]
    fn test_shake256_abc() {
        let out = ShakeXof256::generate(b"abc", 32).unwrap();
        assert_eq!(
            hex_of(&out),
            "483366601360a8771c6863080cc4114d8db44530f8f1e1ee4f94ea37e78b5739"
        );
    }

    #[test]
    fn test_shake256_multi_block_squeeze() {
        // 200-byte input spans two absorb blocks; 300 output bytes cross two
        // squeeze blocks. The tail of the stream is checked.
        let input: Vec<u8> = (0u8..200).collect();
        let out = ShakeXof256::generate(&input, 300).unwrap();
        assert_eq!(hex_of(&out[280..]), "01358ae64f3f0ccedfa05b29e84e1a11a635bfe7");
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let input: Vec<u8> = (0u8..200).collect();
        let one_shot = ShakeXof256::generate(&input, 300).unwrap();

        let mut xof = ShakeXof256::new();
        for chunk in input.chunks(7) {
            xof.update(chunk).unwrap();
        }
        let mut out = vec![0u8; 300];
        for chunk in out.chunks_mut(13) {
            xof.squeeze(chunk).unwrap();
        }
        assert_eq!(out, one_shot);
    }

    #[test]
    fn test_update_after_squeeze_fails() {
        let mut xof = ShakeXof256::new();
        xof.update(b"seed").unwrap();
        let _ = xof.next_u64().unwrap();
        assert!(xof.update(b"more").is_err());

        xof.reset().unwrap();
        xof.update(b"abc").unwrap();
        let out = xof.squeeze_into_vec(32).unwrap();
        assert_eq!(
            hex_of(&out),
            "483366601360a8771c6863080cc4114d8db44530f8f1e1ee4f94ea37e78b5739"
        );
    }

    #[test]
    fn test_zero_length_rejected() {
        assert!(ShakeXof256::generate(b"abc", 0).is_err());
    }
}
