//! Additive (synchronous) scrambler.
//!
//! XORs the bit stream with a keystream produced by a linear feedback
//! shift register that is reseeded for every frame. Because the keystream
//! depends only on the seed, applying the same scrambler twice restores
//! the original bits, so one type serves both directions.

use serde::Deserialize;

/// Frame-synchronous LFSR scrambler.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Scrambler {
    /// Register width in bits.
    pub register_length: u32,
    /// Feedback tap mask; bit i selects register stage i.
    pub taps: u32,
    /// Register contents at the start of each frame. Must be nonzero or
    /// the keystream degenerates to all zeros.
    pub seed: u32,
}

impl Scrambler {
    /// DVB-framing polynomial 1 + x^14 + x^15 with the standard init
    /// sequence 100101010000000.
    pub fn dvb() -> Self {
        Scrambler { register_length: 15, taps: 0x6000, seed: 0x4A80 }
    }

    /// XOR `bits` with the keystream. Scrambling and descrambling are the
    /// same operation.
    pub fn scramble(&self, bits: &[bool]) -> Vec<bool> {
        let mask = (1u32 << self.register_length) - 1;
        let mut register = self.seed & mask;
        bits.iter()
            .map(|&bit| {
                let feedback = (register & self.taps).count_ones() % 2 == 1;
                register = ((register << 1) | feedback as u32) & mask;
                bit ^ feedback
            })
            .collect()
    }
}
