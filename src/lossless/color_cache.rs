//! Small direct-mapped cache of recently seen ARGB colors, used by the
//! backward-reference planner to emit a compact cache index instead of a
//! literal or a copy when a pixel's exact color was seen recently.
//!
//! Grounded in `original_source/src/utils/color_cache_utils.c`'s
//! `VP8LColorCache`; the hash multiplier (`0x1e35_a7bd`) is the
//! well-known VP8L color-cache constant, not present verbatim in the
//! retrieval sample's trimmed `.c` file — see `DESIGN.md`.

const HASH_MULTIPLIER: u32 = 0x1e35_a7bd;

pub struct ColorCache {
    colors: Vec<u32>,
    hash_shift: u32,
    hash_bits: u32,
}

impl ColorCache {
    pub fn new(hash_bits: u32) -> Self {
        assert!(hash_bits > 0 && hash_bits <= 11);
        ColorCache {
            colors: vec![0u32; 1 << hash_bits],
            hash_shift: 32 - hash_bits,
            hash_bits,
        }
    }

    #[inline(always)]
    fn hash(&self, argb: u32) -> usize {
        ((argb.wrapping_mul(HASH_MULTIPLIER)) >> self.hash_shift) as usize
    }

    pub fn contains(&self, argb: u32) -> bool {
        let idx = self.hash(argb);
        self.colors[idx] == argb
    }

    pub fn index(&self, argb: u32) -> usize {
        self.hash(argb)
    }

    pub fn insert(&mut self, argb: u32) {
        let idx = self.hash(argb);
        self.colors[idx] = argb;
    }

    pub fn hash_bits(&self) -> u32 {
        self.hash_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_contains_round_trips() {
        let mut c = ColorCache::new(4);
        c.insert(0xff00_12ab);
        assert!(c.contains(0xff00_12ab));
    }

    #[test]
    fn distinct_colors_hashing_together_evict_each_other() {
        let mut c = ColorCache::new(1);
        c.insert(0x1111_1111);
        c.insert(0x2222_2222);
        assert!(!c.contains(0x1111_1111) || c.index(0x1111_1111) != c.index(0x2222_2222));
    }
}
