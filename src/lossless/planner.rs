//! §4.H's three backward-reference entry points: the RLE fallback lives in
//! `rle.rs`; this module holds the greedy two-alternative hash-chain
//! planner and the cost-model DP planner.
//!
//! The greedy planner is ported from
//! `original_source/src/enc/backward_references.c`'s
//! `BackwardReferencesHashChain`: at each pixel, compare "copy starting
//! here" against "emit one literal, then copy starting at the next
//! pixel", and take whichever yields the longer remaining match.
//!
//! The cost-model planner is ported from the same file's
//! `BackwardReferencesHashChainDistanceOnly` (cost model build +
//! DP-over-an-entropy-cost-model pass), `TraceBackwards`, and
//! `BackwardReferencesHashChainFollowChosenPath`, using the histogram- and
//! `CostModel`-backed estimates from `histogram.rs`/`cost.rs`.

use super::color_cache::ColorCache;
use super::cost::CostModel;
use super::hash_chain::{HashChain, MAX_LENGTH, MIN_LENGTH};
use super::plane_code;
use super::token::Token;

pub struct PlannerConfig {
    pub quality: i32,
    pub cache_bits: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig { quality: 75, cache_bits: 0 }
    }
}

/// Builds the backward-reference token stream for one ARGB image, raster
/// order, `width * height` pixels in `argb`, using the greedy
/// two-alternative hash-chain planner.
pub fn plan_backward_references(width: usize, height: usize, argb: &[u32], config: &PlannerConfig) -> Vec<Token> {
    let pix_count = width * height;
    debug_assert_eq!(argb.len(), pix_count);
    let use_cache = config.cache_bits > 0;

    let mut hash_chain = HashChain::new(pix_count.max(1));
    let mut cache = if use_cache { Some(ColorCache::new(config.cache_bits)) } else { None };
    let mut stream = Vec::with_capacity(pix_count);

    let mut i = 0usize;
    while i < pix_count {
        let mut offset = 0usize;
        let mut len = 0usize;
        if i < pix_count - 1 {
            let maxlen = (pix_count - i).min(MAX_LENGTH);
            let (o, l) = hash_chain.find_copy(config.quality, i, width, argb, maxlen);
            offset = o;
            len = l;
        }

        if len >= MIN_LENGTH {
            hash_chain.insert(argb, i);
            let mut advance_by_one = false;
            let (mut best_offset, mut best_len) = (offset, len);

            if i < pix_count.saturating_sub(2) {
                let maxlen2 = (pix_count - (i + 1)).min(MAX_LENGTH);
                let (offset2, len2) = hash_chain.find_copy(config.quality, i + 1, width, argb, maxlen2);
                if len2 > len + 1 {
                    advance_by_one = true;
                    best_offset = offset2;
                    best_len = len2;
                }
            }

            if advance_by_one {
                push_pixel(&mut stream, argb[i], &mut cache);
                i += 1;
            }
            if best_len >= MAX_LENGTH {
                best_len = MAX_LENGTH - 1;
            }
            stream.push(Token::Copy { distance: plane_distance(width, best_offset), length: best_len as u16 });
            for k in 0..best_len {
                if let Some(c) = cache.as_mut() {
                    c.insert(argb[i + k]);
                }
                if k != 0 && i + k + 1 < pix_count {
                    hash_chain.insert(argb, i + k);
                }
            }
            i += best_len;
        } else {
            push_pixel(&mut stream, argb[i], &mut cache);
            if i + 1 < pix_count {
                hash_chain.insert(argb, i);
            }
            i += 1;
        }
    }

    stream
}

/// Builds the backward-reference token stream using the two-pass
/// cost-model planner: pass 1 estimates per-symbol bit costs from a
/// greedy trace (`plan_backward_references`), pass 2 runs a forward DP
/// over per-pixel cost with a short/long match probe and the `len >= 128
/// && code < 2` fast-skip, and a trace-back replay emits the final
/// tokens against fresh hash-chain/cache state.
pub fn plan_backward_references_cost_model(width: usize, height: usize, argb: &[u32], config: &PlannerConfig) -> Vec<Token> {
    let pix_count = width * height;
    debug_assert_eq!(argb.len(), pix_count);
    if pix_count == 0 {
        return Vec::new();
    }
    let use_cache = config.cache_bits > 0;

    let trace = plan_backward_references(width, height, argb, config);
    let model = CostModel::build(&trace, config.cache_bits);

    let dist_array = run_dp(width, pix_count, argb, config, &model, use_cache);
    let chosen_path = trace_back(&dist_array, pix_count);
    replay_chosen_path(width, argb, config, use_cache, &chosen_path)
}

/// Pass 2: forward DP. `cost[m]`/`dist_array[m]` describe the cheapest
/// way to have the first `m` pixels encoded; `dist_array[m]` is the
/// length of the literal/copy hop that lands on `m`.
fn run_dp(width: usize, pix_count: usize, argb: &[u32], config: &PlannerConfig, model: &CostModel, use_cache: bool) -> Vec<u32> {
    let mut cost = vec![f64::MAX; pix_count + 1];
    cost[0] = 0.0;
    let mut dist_array = vec![0u32; pix_count + 1];

    let mut hash_chain = HashChain::new(pix_count.max(1));
    let mut cache = if use_cache { Some(ColorCache::new(config.cache_bits)) } else { None };

    let mut i = 0usize;
    while i < pix_count {
        let prev_cost = cost[i];
        let mut jumped = false;

        if i + 1 < pix_count {
            for &probe_cap in &[2usize, MAX_LENGTH] {
                let maxlen = probe_cap.min(pix_count - i);
                let (offset, len) = hash_chain.find_copy(config.quality, i, width, argb, maxlen);
                if len < MIN_LENGTH {
                    continue;
                }
                let code = plane_code::distance_to_plane_code(width.max(1) as i32, offset as i32) as u32;
                let distance_cost = prev_cost + model.distance_cost(code);
                for k in MIN_LENGTH..=len {
                    let cost_val = distance_cost + model.length_cost(k as u32);
                    if cost[i + k] > cost_val {
                        cost[i + k] = cost_val;
                        dist_array[i + k] = k as u32;
                    }
                }
                // Fast-skip: a long, common-distance match doesn't need its
                // interior positions explored as their own DP frontier.
                if len >= 128 && code < 2 {
                    for k in 0..len {
                        if let Some(c) = cache.as_mut() {
                            c.insert(argb[i + k]);
                        }
                        if i + k + 1 < pix_count {
                            hash_chain.insert(argb, i + k);
                        }
                    }
                    i += len;
                    jumped = true;
                    break;
                }
            }
        }
        if jumped {
            continue;
        }

        if i + 1 < pix_count {
            hash_chain.insert(argb, i);
        }
        let literal_cost = if let Some(c) = cache.as_ref() {
            if c.contains(argb[i]) {
                prev_cost + model.palette_cost(c.index(argb[i]) as u16) * 0.68
            } else {
                prev_cost + model.literal_cost(argb[i]) * 0.82
            }
        } else {
            prev_cost + model.literal_cost(argb[i]) * 0.82
        };
        if cost[i + 1] > literal_cost {
            cost[i + 1] = literal_cost;
            dist_array[i + 1] = 1;
        }
        if let Some(c) = cache.as_mut() {
            c.insert(argb[i]);
        }
        i += 1;
    }

    dist_array
}

/// Walks `dist_array` backwards from `pix_count`, recovering the ordered
/// (forward) sequence of hop lengths that produced the optimal cost.
fn trace_back(dist_array: &[u32], pix_count: usize) -> Vec<usize> {
    let mut path = Vec::new();
    let mut j = pix_count;
    while j > 0 {
        let k = dist_array[j] as usize;
        debug_assert!(k >= 1);
        path.push(k);
        j -= k;
    }
    path.reverse();
    path
}

/// Replays the chosen hop lengths against fresh hash-chain/cache state to
/// emit the real token stream (a length-1 hop is a literal or cache hit;
/// anything longer is re-resolved through `find_copy` to recover its
/// distance).
fn replay_chosen_path(width: usize, argb: &[u32], config: &PlannerConfig, use_cache: bool, chosen_path: &[usize]) -> Vec<Token> {
    let pix_count = argb.len();
    let mut hash_chain = HashChain::new(pix_count.max(1));
    let mut cache = if use_cache { Some(ColorCache::new(config.cache_bits)) } else { None };
    let mut stream = Vec::with_capacity(chosen_path.len());

    let mut i = 0usize;
    for &hop_len in chosen_path {
        if hop_len == 1 {
            push_pixel(&mut stream, argb[i], &mut cache);
            if i + 1 < pix_count {
                hash_chain.insert(argb, i);
            }
            i += 1;
        } else {
            let (offset, len) = hash_chain.find_copy(config.quality, i, width, argb, hop_len);
            debug_assert_eq!(len, hop_len);
            stream.push(Token::Copy { distance: plane_distance(width, offset), length: len as u16 });
            for k in 0..len {
                if let Some(c) = cache.as_mut() {
                    c.insert(argb[i + k]);
                }
                if i + k + 1 < pix_count {
                    hash_chain.insert(argb, i + k);
                }
            }
            i += len;
        }
    }
    stream
}

fn push_pixel(stream: &mut Vec<Token>, argb: u32, cache: &mut Option<ColorCache>) {
    if let Some(c) = cache.as_ref() {
        if c.contains(argb) {
            stream.push(Token::CacheIndex(c.index(argb) as u16));
            cache.as_mut().unwrap().insert(argb);
            return;
        }
    }
    stream.push(Token::Literal(argb));
    if let Some(c) = cache.as_mut() {
        c.insert(argb);
    }
}

/// Converts a raw pixel-linearized backward-reference offset into its
/// plane code (`1..120` for the fixed short-distance table, else
/// `offset + PLANE_CODE_LIMIT`), per §3's `Token::Copy` data model.
fn plane_distance(width: usize, offset: usize) -> u32 {
    plane_code::distance_to_plane_code(width.max(1) as i32, offset as i32) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_image_collapses_to_one_literal_and_one_long_copy() {
        let width = 8;
        let height = 8;
        let argb = vec![0xff00_00ffu32; width * height];
        let config = PlannerConfig { quality: 75, cache_bits: 0 };
        let stream = plan_backward_references(width, height, &argb, &config);
        assert!(stream.len() <= 3);
        let total: usize = stream.iter().map(Token::pixel_count).sum();
        assert_eq!(total, width * height);
    }

    #[test]
    fn distinct_pixels_yield_all_literals() {
        let width = 4;
        let height = 4;
        let argb: Vec<u32> = (0..16).collect();
        let config = PlannerConfig { quality: 75, cache_bits: 0 };
        let stream = plan_backward_references(width, height, &argb, &config);
        assert_eq!(stream.len(), 16);
        assert!(stream.iter().all(|t| matches!(t, Token::Literal(_))));
    }

    #[test]
    fn color_cache_hits_are_reused_on_repeat() {
        let width = 4;
        let height = 1;
        let argb = vec![1u32, 2, 3, 1];
        let config = PlannerConfig { quality: 75, cache_bits: 4 };
        let stream = plan_backward_references(width, height, &argb, &config);
        assert!(stream.iter().any(|t| matches!(t, Token::CacheIndex(_)) || matches!(t, Token::Copy { .. })));
    }

    #[test]
    fn copy_tokens_store_plane_codes_not_raw_offsets() {
        let width = 8;
        let height = 2;
        let argb = vec![0xaabb_ccddu32; width * height];
        let config = PlannerConfig::default();
        let stream = plan_backward_references(width, height, &argb, &config);
        for t in &stream {
            if let Token::Copy { distance, .. } = t {
                assert!(*distance <= plane_code::PLANE_CODE_LIMIT as u32 || *distance > width as u32);
            }
        }
    }

    #[test]
    fn cost_model_planner_covers_every_pixel() {
        let width = 16;
        let height = 16;
        let mut argb = vec![0u32; width * height];
        for (i, px) in argb.iter_mut().enumerate() {
            *px = (i % 5) as u32;
        }
        let config = PlannerConfig { quality: 75, cache_bits: 0 };
        let stream = plan_backward_references_cost_model(width, height, &argb, &config);
        let total: usize = stream.iter().map(Token::pixel_count).sum();
        assert_eq!(total, width * height);
    }

    #[test]
    fn cost_model_planner_handles_flat_image() {
        let width = 8;
        let height = 8;
        let argb = vec![0x1122_3344u32; width * height];
        let config = PlannerConfig { quality: 75, cache_bits: 0 };
        let stream = plan_backward_references_cost_model(width, height, &argb, &config);
        let total: usize = stream.iter().map(Token::pixel_count).sum();
        assert_eq!(total, width * height);
    }

    #[test]
    fn cost_model_planner_with_color_cache_covers_every_pixel() {
        let width = 4;
        let height = 4;
        let argb = vec![1u32, 2, 3, 1, 2, 3, 1, 2, 3, 4, 4, 4, 4, 4, 4, 4];
        let config = PlannerConfig { quality: 75, cache_bits: 4 };
        let stream = plan_backward_references_cost_model(width, height, &argb, &config);
        let total: usize = stream.iter().map(Token::pixel_count).sum();
        assert_eq!(total, width * height);
    }

    #[test]
    fn single_pixel_image_is_one_literal() {
        let argb = vec![42u32];
        let config = PlannerConfig::default();
        let stream = plan_backward_references_cost_model(1, 1, &argb, &config);
        assert_eq!(stream.len(), 1);
        assert_eq!(stream[0], Token::Literal(42));
    }
}
