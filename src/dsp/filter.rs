//! §4.D in-loop deblocking filter: simple and complex (normal + wide
//! macroblock-edge) kernels, parameterized over edge orientation via a
//! `neighbor_step`/`line_step` pair so the same code filters both vertical
//! and horizontal edges (mirroring how `original_source/src/dec/frame.c`'s
//! `DoFilter` calls the same underlying kernels for H and V edges).

#[inline(always)]
fn u2s(v: u8) -> i32 {
    v as i32 - 128
}

#[inline(always)]
fn s2u(v: i32) -> u8 {
    (v.clamp(-128, 127) + 128) as u8
}

#[inline(always)]
fn c128(v: i32) -> i32 {
    v.clamp(-128, 127)
}

/// Simple filter: touches only `p0, q0`.
pub fn simple_filter_edge(
    buf: &mut [u8],
    pos0: usize,
    neighbor_step: usize,
    line_step: usize,
    count: usize,
    edge_limit: i32,
) {
    for i in 0..count {
        let pos = pos0 + i * line_step;
        let p1 = u2s(buf[pos - 2 * neighbor_step]);
        let p0 = u2s(buf[pos - neighbor_step]);
        let q0 = u2s(buf[pos]);
        let q1 = u2s(buf[pos + neighbor_step]);

        if (p0 - q0).abs() * 2 + (p1 - q1).abs() / 2 > edge_limit {
            continue;
        }
        let a = c128(c128(p1 - q1) + 3 * (q0 - p0));
        let f1 = c128(a + 4) >> 3;
        let f2 = c128(a + 3) >> 3;
        buf[pos] = s2u(q0 - f1);
        buf[pos - neighbor_step] = s2u(p0 + f2);
    }
}

fn hev(p1: i32, p0: i32, q0: i32, q1: i32, thresh: i32) -> bool {
    (p1 - p0).abs() > thresh || (q1 - q0).abs() > thresh
}

fn filter_common_adjust(use_outer_taps: bool, p1: i32, p0: i32, q0: i32, q1: i32) -> (i32, i32, i32) {
    let a = c128((if use_outer_taps { c128(p1 - q1) } else { 0 }) + 3 * (q0 - p0));
    let f1 = c128(a + 4) >> 3;
    let f2 = c128(a + 3) >> 3;
    (q0 - f1, p0 + f2, f1)
}

/// Complex/normal filter for subblock (inner) edges: touches `p1,p0,q0,q1`.
pub fn normal_filter_edge(
    buf: &mut [u8],
    pos0: usize,
    neighbor_step: usize,
    line_step: usize,
    count: usize,
    edge_limit: i32,
    interior_limit: i32,
    hev_thresh: i32,
) {
    for i in 0..count {
        let pos = pos0 + i * line_step;
        let p3 = u2s(buf[pos - 4 * neighbor_step]);
        let p2 = u2s(buf[pos - 3 * neighbor_step]);
        let p1 = u2s(buf[pos - 2 * neighbor_step]);
        let p0 = u2s(buf[pos - neighbor_step]);
        let q0 = u2s(buf[pos]);
        let q1 = u2s(buf[pos + neighbor_step]);
        let q2 = u2s(buf[pos + 2 * neighbor_step]);
        let q3 = u2s(buf[pos + 3 * neighbor_step]);

        if (p0 - q0).abs() * 2 + (p1 - q1).abs() / 2 > edge_limit {
            continue;
        }
        if (p3 - p2).abs() > interior_limit
            || (p2 - p1).abs() > interior_limit
            || (p1 - p0).abs() > interior_limit
            || (q3 - q2).abs() > interior_limit
            || (q2 - q1).abs() > interior_limit
            || (q1 - q0).abs() > interior_limit
        {
            continue;
        }

        let is_hev = hev(p1, p0, q0, q1, hev_thresh);
        let (new_q0, new_p0, f1) = filter_common_adjust(is_hev, p1, p0, q0, q1);
        buf[pos] = s2u(new_q0);
        buf[pos - neighbor_step] = s2u(new_p0);
        if !is_hev {
            let a = (f1 + 1) >> 1;
            buf[pos + neighbor_step] = s2u(q1 - a);
            buf[pos - 2 * neighbor_step] = s2u(p1 + a);
        }
    }
}

/// Wide macroblock-edge filter: on non-HEV pixels touches `p2,p1,p0,q0,q1,q2`;
/// on HEV pixels falls back to the simple two-tap adjustment.
pub fn mb_edge_filter_edge(
    buf: &mut [u8],
    pos0: usize,
    neighbor_step: usize,
    line_step: usize,
    count: usize,
    edge_limit: i32,
    interior_limit: i32,
    hev_thresh: i32,
) {
    for i in 0..count {
        let pos = pos0 + i * line_step;
        let p3 = u2s(buf[pos - 4 * neighbor_step]);
        let p2 = u2s(buf[pos - 3 * neighbor_step]);
        let p1 = u2s(buf[pos - 2 * neighbor_step]);
        let p0 = u2s(buf[pos - neighbor_step]);
        let q0 = u2s(buf[pos]);
        let q1 = u2s(buf[pos + neighbor_step]);
        let q2 = u2s(buf[pos + 2 * neighbor_step]);
        let q3 = u2s(buf[pos + 3 * neighbor_step]);

        if (p0 - q0).abs() * 2 + (p1 - q1).abs() / 2 > edge_limit {
            continue;
        }
        if (p3 - p2).abs() > interior_limit
            || (p2 - p1).abs() > interior_limit
            || (p1 - p0).abs() > interior_limit
            || (q3 - q2).abs() > interior_limit
            || (q2 - q1).abs() > interior_limit
            || (q1 - q0).abs() > interior_limit
        {
            continue;
        }

        if hev(p1, p0, q0, q1, hev_thresh) {
            let (new_q0, new_p0, _) = filter_common_adjust(true, p1, p0, q0, q1);
            buf[pos] = s2u(new_q0);
            buf[pos - neighbor_step] = s2u(new_p0);
        } else {
            let w = c128(c128(p1 - q1) + 3 * (q0 - p0));
            let a0 = (27 * w + 63) >> 7;
            buf[pos] = s2u(q0 - a0);
            buf[pos - neighbor_step] = s2u(p0 + a0);
            let a1 = (18 * w + 63) >> 7;
            buf[pos + neighbor_step] = s2u(q1 - a1);
            buf[pos - 2 * neighbor_step] = s2u(p1 + a1);
            let a2 = (9 * w + 63) >> 7;
            buf[pos + 2 * neighbor_step] = s2u(q2 - a2);
            buf[pos - 3 * neighbor_step] = s2u(p2 + a2);
        }
    }
}

/// `hev_thresh` as a function of filter level and keyframe-ness (§4.D).
pub fn hev_threshold(level: i32, keyframe: bool) -> i32 {
    if keyframe {
        if level >= 40 {
            2
        } else if level >= 15 {
            1
        } else {
            0
        }
    } else if level >= 40 {
        3
    } else if level >= 20 {
        2
    } else if level >= 15 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_filter_leaves_flat_region_untouched() {
        let stride = 16usize;
        let mut buf = vec![128u8; stride * 4];
        let pos = stride * 2 + 8;
        simple_filter_edge(&mut buf, pos, 1, stride, 4, 40);
        assert!(buf.iter().all(|&p| p == 128));
    }

    #[test]
    fn hev_threshold_increases_with_level() {
        assert_eq!(hev_threshold(10, true), 0);
        assert_eq!(hev_threshold(20, true), 1);
        assert_eq!(hev_threshold(50, true), 2);
    }
}
