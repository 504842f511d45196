//! Seed derivation and per-call deterministic streams.
//!
//! # Invariants
//! - `hash_to_seed` depends only on the input bytes and `SEED_SALT`.
//! - `hash_to_seed` never returns zero.
//! - A `SeedStream` owns its state; no generator is shared between calls.

const SEED_SALT: &str = "logogram/v1:";
const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;
const ZERO_SEED_REPLACEMENT: u32 = 0x9e37_79b9;
const MULBERRY_INCREMENT: u32 = 0x6d2b_79f5;
const U32_RANGE: f64 = 4_294_967_296.0;

/// Maps a text key to a stable, non-zero 32-bit seed.
pub fn hash_to_seed(text: &str) -> u32 {
    let hash = fnv1a32(SEED_SALT.as_bytes(), FNV_OFFSET_BASIS);
    match fnv1a32(text.as_bytes(), hash) {
        0 => ZERO_SEED_REPLACEMENT,
        seed => seed,
    }
}

fn fnv1a32(bytes: &[u8], basis: u32) -> u32 {
    bytes.iter().fold(basis, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Mulberry32 stream over a private 32-bit state.
#[derive(Debug, Clone)]
pub struct SeedStream {
    state: u32,
}

impl SeedStream {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Advances the state and returns a float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / U32_RANGE
    }

    /// Returns `(draw - 0.5) * amplitude`, centered jitter in
    /// `[-amplitude / 2, amplitude / 2)`.
    pub fn jitter(&mut self, amplitude: f64) -> f64 {
        (self.next_f64() - 0.5) * amplitude
    }

    /// Picks an index in `0..len`. `len` must be non-zero.
    pub fn pick(&mut self, len: usize) -> usize {
        let index = (self.next_f64() * len as f64) as usize;
        index.min(len.saturating_sub(1))
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(MULBERRY_INCREMENT);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }
}
