//! Token population counts and the population-to-bit-estimate conversion
//! that the cost model builds its per-symbol costs from.
//!
//! Grounded in `original_source/src/enc/histogram.c`'s `VP8LHistogram`
//! (`literal_`/`red_`/`blue_`/`alpha_`/`distance_` counts,
//! `VP8LHistogramAddSinglePixOrCopy`) and
//! `VP8LConvertPopulationCountTableToBitEstimates`.

use super::cost::prefix_code;
use super::token::Token;

/// `NUM_LITERAL_CODES` (green channel + palette/cache indices share this
/// byte-valued alphabet in the real VP8L bitstream).
pub const NUM_LITERAL_CODES: usize = 256;
/// `NUM_LENGTH_CODES`: prefix codes for copy lengths.
pub const NUM_LENGTH_CODES: usize = 24;
/// `DISTANCE_CODES_MAX`: prefix codes for plane-coded distances.
pub const NUM_DISTANCE_CODES: usize = 40;
/// `MAX_COLOR_CACHE_BITS` from `backward_references.h`.
pub const MAX_CACHE_BITS: u32 = 9;

fn literal_alphabet_size(cache_bits: u32) -> usize {
    NUM_LITERAL_CODES + NUM_LENGTH_CODES + (1usize << cache_bits.min(MAX_CACHE_BITS))
}

/// Population counts over one token stream, bucketed the way
/// `VP8LHistogramAddSinglePixOrCopy` does: literals split by ARGB byte
/// lane, cache indices and length prefix-codes share the `literal_`
/// alphabet past byte 256, distances (already plane-coded, see
/// `planner::plane_distance`) get their own prefix-code alphabet.
pub struct Histogram {
    pub alpha: [u32; 256],
    pub red: [u32; 256],
    pub blue: [u32; 256],
    pub literal: Vec<u32>,
    pub distance: [u32; NUM_DISTANCE_CODES],
}

impl Histogram {
    pub fn new(cache_bits: u32) -> Self {
        Histogram {
            alpha: [0; 256],
            red: [0; 256],
            blue: [0; 256],
            literal: vec![0; literal_alphabet_size(cache_bits)],
            distance: [0; NUM_DISTANCE_CODES],
        }
    }

    pub fn build(tokens: &[Token], cache_bits: u32) -> Self {
        let mut h = Histogram::new(cache_bits);
        for t in tokens {
            h.add_token(t);
        }
        h
    }

    pub fn add_token(&mut self, token: &Token) {
        match *token {
            Token::Literal(argb) => {
                self.alpha[(argb >> 24 & 0xff) as usize] += 1;
                self.red[(argb >> 16 & 0xff) as usize] += 1;
                self.literal[(argb >> 8 & 0xff) as usize] += 1;
                self.blue[(argb & 0xff) as usize] += 1;
            }
            Token::CacheIndex(idx) => {
                let literal_ix = NUM_LITERAL_CODES + NUM_LENGTH_CODES + idx as usize;
                if literal_ix < self.literal.len() {
                    self.literal[literal_ix] += 1;
                }
            }
            Token::Copy { distance, length } => {
                let (code, _) = prefix_code(length as u32);
                self.literal[NUM_LITERAL_CODES + code as usize] += 1;
                let (dcode, _) = prefix_code(distance);
                self.distance[(dcode as usize).min(NUM_DISTANCE_CODES - 1)] += 1;
            }
        }
    }
}

/// `VP8LConvertPopulationCountTableToBitEstimates`: a symbol occurring
/// `count` times out of `sum` total costs `log2(sum) - log2(count)` bits;
/// an alphabet with at most one nonzero symbol costs nothing to signal
/// (there's only one thing it could be).
pub fn population_to_bit_estimates(counts: &[u32]) -> Vec<f64> {
    let sum: u64 = counts.iter().map(|&c| c as u64).sum();
    let nonzeros = counts.iter().filter(|&&c| c > 0).count();
    if nonzeros <= 1 {
        return vec![0.0; counts.len()];
    }
    let log2sum = (sum as f64).log2();
    counts.iter().map(|&c| if c == 0 { log2sum } else { log2sum - (c as f64).log2() }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_symbol_alphabet_costs_nothing() {
        let counts = [5u32, 0, 0, 0];
        let bits = population_to_bit_estimates(&counts);
        assert!(bits.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn rarer_symbol_costs_more_bits() {
        let counts = [100u32, 1];
        let bits = population_to_bit_estimates(&counts);
        assert!(bits[1] > bits[0]);
    }

    #[test]
    fn histogram_tallies_literal_channels() {
        let tokens = [Token::Literal(0xAABBCCDD)];
        let h = Histogram::build(&tokens, 0);
        assert_eq!(h.alpha[0xAA], 1);
        assert_eq!(h.red[0xBB], 1);
        assert_eq!(h.literal[0xCC], 1);
        assert_eq!(h.blue[0xDD], 1);
    }
}
