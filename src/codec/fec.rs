//! Convolutional forward error correction.
//!
//! The code is described by a constraint length K and one generator
//! polynomial per output bit. Encoding shifts each data bit through a
//! K-bit register and emits the parity of the register masked by each
//! generator; K-1 zero flush bits terminate the trellis. Decoding is
//! hard-decision Viterbi: add-compare-select over the 2^(K-1) state
//! trellis followed by traceback.

use serde::Deserialize;

/// Descriptor of a convolutional code.
///
/// Carried inside transmission bit models so a receiver can decode with
/// the exact code the transmitter used.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConvCode {
    /// Constraint length K (register memory + 1).
    pub constraint_length: usize,
    /// Generator polynomials, one per output bit, customarily written in
    /// octal.
    pub generators: Vec<u32>,
}

impl ConvCode {
    /// NASA standard K=7 rate 1/2 code (generators 171, 133 octal), as
    /// used by CCSDS and 802.11a/g.
    pub fn k7_rate_half() -> Self {
        ConvCode { constraint_length: 7, generators: vec![0o171, 0o133] }
    }

    /// Minimal K=3 rate 1/2 code (generators 7, 5 octal), cheap enough
    /// for short frames.
    pub fn k3_rate_half() -> Self {
        ConvCode { constraint_length: 3, generators: vec![0o7, 0o5] }
    }

    fn state_count(&self) -> usize {
        1 << (self.constraint_length - 1)
    }

    /// Encoded length in bits for `data_len` data bits, including the
    /// flush tail.
    pub fn encoded_len(&self, data_len: usize) -> usize {
        (data_len + self.constraint_length - 1) * self.generators.len()
    }

    // Output bits for one trellis branch: parity of the register under
    // each generator mask.
    fn branch_output(&self, register: u32, out: &mut Vec<bool>) {
        for &generator in &self.generators {
            out.push((register & generator).count_ones() % 2 == 1);
        }
    }

    /// Encode `data` and terminate the trellis with K-1 flush zeros.
    pub fn encode(&self, data: &[bool]) -> Vec<bool> {
        let register_mask = (1u32 << self.constraint_length) - 1;
        let mut register = 0u32;
        let mut output = Vec::with_capacity(self.encoded_len(data.len()));
        let flush = std::iter::repeat(false).take(self.constraint_length - 1);
        for bit in data.iter().copied().chain(flush) {
            register = ((register << 1) | bit as u32) & register_mask;
            self.branch_output(register, &mut output);
        }
        output
    }

    /// Hard-decision Viterbi decode.
    ///
    /// `received` holds the demodulated coded bits, possibly corrupted;
    /// `data_len` is the number of data bits expected before the flush
    /// tail. Trailing bits beyond the tail are ignored.
    pub fn decode(&self, received: &[bool], data_len: usize) -> Vec<bool> {
        let n = self.generators.len();
        let states = self.state_count();
        let state_mask = states - 1;
        let steps = received.len() / n;
        if steps == 0 {
            return Vec::new();
        }

        // Expected output bits per (state, input) branch, precomputed once
        let mut branch_table = Vec::with_capacity(states * 2 * n);
        for state in 0..states as u32 {
            for input in 0..2u32 {
                self.branch_output((state << 1) | input, &mut branch_table);
            }
        }
        let expected = |state: usize, input: usize| {
            let index = (state * 2 + input) * n;
            &branch_table[index..index + n]
        };

        // Trellis starts in the zero state
        let mut metrics = vec![u32::MAX; states];
        metrics[0] = 0;
        let mut predecessors = vec![vec![0usize; states]; steps];

        for step in 0..steps {
            let observed = &received[step * n..(step + 1) * n];
            let mut next_metrics = vec![u32::MAX; states];
            for state in 0..states {
                if metrics[state] == u32::MAX {
                    continue;
                }
                for input in 0..2usize {
                    let next = ((state << 1) | input) & state_mask;
                    let distance = expected(state, input)
                        .iter()
                        .zip(observed)
                        .filter(|(a, b)| a != b)
                        .count() as u32;
                    let candidate = metrics[state] + distance;
                    if candidate < next_metrics[next] {
                        next_metrics[next] = candidate;
                        predecessors[step][next] = state;
                    }
                }
            }
            metrics = next_metrics;
        }

        // Flushed trellises end in state zero; fall back to the best
        // surviving state when the tail was truncated
        let mut state = if metrics[0] != u32::MAX {
            0
        } else {
            metrics
                .iter()
                .enumerate()
                .min_by_key(|&(_, m)| m)
                .map(|(s, _)| s)
                .unwrap_or(0)
        };

        let mut decoded = vec![false; steps];
        for step in (0..steps).rev() {
            decoded[step] = state & 1 == 1;
            state = predecessors[step][state];
        }
        decoded.truncate(data_len);
        decoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn k3_roundtrip() {
        let code = ConvCode::k3_rate_half();
        let data = vec![true, false, true, true, false, false, true, false];
        let encoded = code.encode(&data);
        assert_eq!(encoded.len(), code.encoded_len(data.len()));
        assert_eq!(encoded.len(), (data.len() + 2) * 2);
        assert_eq!(code.decode(&encoded, data.len()), data);
    }

    #[test]
    fn k7_roundtrip() {
        let code = ConvCode::k7_rate_half();
        let data: Vec<bool> = (0..40).map(|i| i % 5 < 2).collect();
        let encoded = code.encode(&data);
        assert_eq!(encoded.len(), (data.len() + 6) * 2);
        assert_eq!(code.decode(&encoded, data.len()), data);
    }

    #[test]
    fn single_error_corrected() {
        let code = ConvCode::k3_rate_half();
        let data = vec![true, false, true, true, false, false, true, false];
        let mut encoded = code.encode(&data);
        encoded[5] = !encoded[5];
        assert_eq!(code.decode(&encoded, data.len()), data);
    }

    #[test]
    fn scattered_errors_corrected_by_k7() {
        let code = ConvCode::k7_rate_half();
        let data: Vec<bool> = (0..32).map(|i| i % 3 == 0).collect();
        let mut encoded = code.encode(&data);
        encoded[3] = !encoded[3];
        encoded[20] = !encoded[20];
        encoded[47] = !encoded[47];
        assert_eq!(code.decode(&encoded, data.len()), data);
    }

    #[test]
    fn constant_inputs_roundtrip() {
        let code = ConvCode::k3_rate_half();
        for data in [vec![false; 16], vec![true; 16]] {
            let encoded = code.encode(&data);
            assert_eq!(code.decode(&encoded, data.len()), data);
        }
    }

    #[test]
    fn empty_input_yields_flush_only() {
        let code = ConvCode::k3_rate_half();
        let encoded = code.encode(&[]);
        assert_eq!(encoded.len(), 4);
        assert!(code.decode(&encoded, 0).is_empty());
        assert!(code.decode(&[], 0).is_empty());
    }
}
