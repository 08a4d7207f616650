//! §4.D macroblock-pipeline driver: plane allocation with border defaults,
//! the per-macroblock reconstruct/store loop, and the whole-picture
//! deblocking pass.
//!
//! Grounded in `original_source/src/dec/frame.c`'s `VP8ReconstructBlock` /
//! `VP8StoreBlock` / `DoFilter` sequencing, adapted to operate on
//! whole-plane buffers with a one-pixel border (plus a small right margin
//! for the top-right intra-prediction quirk) instead of the original's
//! per-macroblock `BPS`-strided scratch cache — see `DESIGN.md` for why
//! that's a deliberate simplification rather than a literal port.

use anyhow::{Context, Result};

use crate::bitreader::BoolDecoder;
use crate::dsp::{filter, predict, transform};
use crate::headers::{self, DequantFactors, KeyframeHeader};
use crate::here;
use crate::mb::{self, BModeContext, MacroblockMode, NzContext};
use crate::tables::LumaMode;

/// RFC 6386 §12.2 default border samples: unavailable "above" pixels read
/// as 127, unavailable "left" pixels read as 129.
const TOP_BORDER: u8 = 127;
const LEFT_BORDER: u8 = 129;
/// Extra replicated columns past the right edge so rightmost-column 4x4
/// top-right reads never run off the buffer.
const RIGHT_MARGIN: usize = 8;

pub struct Plane {
    data: Vec<u8>,
    stride: usize,
    origin: usize,
    width: usize,
    height: usize,
}

impl Plane {
    pub(crate) fn new(width: usize, height: usize) -> Self {
        let stride = width + 1 + RIGHT_MARGIN;
        let mut data = vec![TOP_BORDER; stride * (height + 1)];
        for y in 0..=height {
            data[y * stride] = LEFT_BORDER;
        }
        Plane {
            data,
            stride,
            origin: stride + 1,
            width,
            height,
        }
    }

    #[inline(always)]
    pub fn pos(&self, x: usize, y: usize) -> usize {
        self.origin + y * self.stride + x
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Row slice starting at `(0, y)`, `width` samples, for callers that
    /// read out finished pixels (e.g. the YUV→RGB upsampler).
    pub fn row(&self, y: usize) -> &[u8] {
        let p = self.pos(0, y);
        &self.data[p..p + self.width]
    }

    /// Mutable counterpart of [`Self::row`], for callers assembling a
    /// cropped plane from slices of a decoded one.
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let p = self.pos(0, y);
        let w = self.width;
        &mut self.data[p..p + w]
    }

    /// Allocates a plane sized for a post-decode crop; same border
    /// convention as a freshly decoded plane even though crop output never
    /// reads its own border.
    pub fn new_for_crop(width: usize, height: usize) -> Self {
        Self::new(width, height)
    }

    fn finish_row(&mut self, y: usize) {
        let row_start = self.pos(0, y);
        let last = self.data[row_start + self.width - 1];
        for k in 0..RIGHT_MARGIN {
            self.data[row_start + self.width + k] = last;
        }
    }
}

pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub y: Plane,
    pub u: Plane,
    pub v: Plane,
}

const BLOCK_SCAN_ORDER: [(usize, usize); 16] = [
    (0, 0),
    (4, 0),
    (8, 0),
    (12, 0),
    (0, 4),
    (4, 4),
    (8, 4),
    (12, 4),
    (0, 8),
    (4, 8),
    (8, 8),
    (12, 8),
    (0, 12),
    (4, 12),
    (8, 12),
    (12, 12),
];

fn segment_dequant(header: &KeyframeHeader<'_>) -> [DequantFactors; headers::MAX_SEGMENTS] {
    let mut out = [DequantFactors::default(); headers::MAX_SEGMENTS];
    for (seg, slot) in out.iter_mut().enumerate() {
        if header.segment_header.enabled {
            let delta = header.segment_header.quantizer[seg] as i32;
            *slot = headers::build_dequant_factors(
                header.quant,
                delta,
                header.segment_header.absolute_delta,
            );
        } else {
            *slot = headers::build_dequant_factors(header.quant, 0, false);
        }
    }
    out
}

/// Decodes one VP8 keyframe's compressed payload (partition 0 onward, as
/// handed to us by the RIFF/container boundary) into reconstructed,
/// deblocked YUV planes.
pub fn decode_keyframe(payload: &[u8]) -> Result<DecodedImage> {
    let (header, mut mode_br) = headers::parse_keyframe_header(payload).context(here!())?;

    let mb_w = header.mb_w as usize;
    let mb_h = header.mb_h as usize;
    let dequant = segment_dequant(&header);

    let mut y = Plane::new(mb_w * 16, mb_h * 16);
    let mut u = Plane::new(mb_w * 8, mb_h * 8);
    let mut v = Plane::new(mb_w * 8, mb_h * 8);

    let mut nz = NzContext::new(mb_w);
    let mut bctx = BModeContext::new(mb_w);
    let num_parts = header.partitions.len().max(1);
    // Filter-skip bookkeeping, one flag per macroblock, raster order.
    let mut has_coeffs = vec![false; mb_w * mb_h];
    let mut modes: Vec<MacroblockMode> = Vec::with_capacity(mb_w * mb_h);

    for mb_y in 0..mb_h {
        nz.reset_left();
        bctx.reset_left();
        let part = header.partitions[mb_y % num_parts];
        let mut residual_br = BoolDecoder::new(part);

        for mb_x in 0..mb_w {
            let mode = mb::decode_mb_mode(&mut mode_br, &header, &mut bctx, mb_x);
            let dq = dequant[mode.segment_id as usize];
            let residuals =
                mb::decode_residuals(&mut residual_br, &header.coeff_probs, &dq, &mode, &mut nz, mb_x);

            reconstruct_luma(&mut y, mb_x, mb_y, &mode, &residuals);
            reconstruct_chroma(&mut u, mb_x, mb_y, mode.uv_mode, &residuals.u);
            reconstruct_chroma(&mut v, mb_x, mb_y, mode.uv_mode, &residuals.v);

            let any_residual = residuals.nonzero.iter().any(|&b| b);
            has_coeffs[mb_y * mb_w + mb_x] = any_residual || mode.y_mode == LumaMode::BPred;
            modes.push(mode);
        }
        for r in 0..16 {
            y.finish_row(mb_y * 16 + r);
        }
        for r in 0..8 {
            u.finish_row(mb_y * 8 + r);
            v.finish_row(mb_y * 8 + r);
        }
    }

    if header.filter_header.filter_type() != 0 {
        deblock_frame(&mut y, &mut u, &mut v, &header, &modes, &has_coeffs, mb_w, mb_h);
    }

    Ok(DecodedImage {
        width: header.picture.width as u32,
        height: header.picture.height as u32,
        y,
        u,
        v,
    })
}

fn reconstruct_luma(
    plane: &mut Plane,
    mb_x: usize,
    mb_y: usize,
    mode: &MacroblockMode,
    residuals: &mb::MbResiduals,
) {
    let ox = mb_x * 16;
    let oy = mb_y * 16;
    let has_top = mb_y > 0;
    let has_left = mb_x > 0;
    let stride = plane.stride();

    let mut y_coeffs = residuals.y;
    if let Some(y2) = residuals.y2 {
        let mut wht_out = [0i16; 256];
        transform::inverse_wht(&y2, &mut wht_out);
        for i in 0..16 {
            y_coeffs[i][0] = wht_out[i * 16];
        }
    }

    if mode.y_mode == LumaMode::BPred {
        let mut tr_cache = [TOP_BORDER; 4];
        for (idx, &(bx, by)) in BLOCK_SCAN_ORDER.iter().enumerate() {
            let pos = plane.pos(ox + bx, oy + by);
            if bx == 12 {
                if by == 0 {
                    for k in 0..4 {
                        tr_cache[k] = plane.data[pos - stride + 4 + k];
                    }
                } else {
                    for k in 0..4 {
                        plane.data[pos - stride + 4 + k] = tr_cache[k];
                    }
                }
            }
            predict::predict_b(mode.b_modes[idx], &mut plane.data, pos, stride);
            transform::inverse_dct4x4_add(&y_coeffs[idx], &mut plane.data[pos..], stride);
        }
    } else {
        let pos = plane.pos(ox, oy);
        match mode.y_mode {
            LumaMode::DC => predict::predict_dc(&mut plane.data, pos, stride, 16, has_top, has_left),
            LumaMode::V => predict::predict_v(&mut plane.data, pos, stride, 16),
            LumaMode::H => predict::predict_h(&mut plane.data, pos, stride, 16),
            LumaMode::TM => predict::predict_tm(&mut plane.data, pos, stride, 16),
            LumaMode::BPred => unreachable!(),
        }
        for (idx, &(bx, by)) in BLOCK_SCAN_ORDER.iter().enumerate() {
            let bpos = plane.pos(ox + bx, oy + by);
            transform::inverse_dct4x4_add(&y_coeffs[idx], &mut plane.data[bpos..], stride);
        }
    }
}

fn reconstruct_chroma(plane: &mut Plane, mb_x: usize, mb_y: usize, uv_mode: LumaMode, coeffs: &[[i16; 16]; 4]) {
    let ox = mb_x * 8;
    let oy = mb_y * 8;
    let has_top = mb_y > 0;
    let has_left = mb_x > 0;
    let stride = plane.stride();
    let pos = plane.pos(ox, oy);

    match uv_mode {
        LumaMode::DC => predict::predict_dc(&mut plane.data, pos, stride, 8, has_top, has_left),
        LumaMode::V => predict::predict_v(&mut plane.data, pos, stride, 8),
        LumaMode::H => predict::predict_h(&mut plane.data, pos, stride, 8),
        LumaMode::TM | LumaMode::BPred => predict::predict_tm(&mut plane.data, pos, stride, 8),
    }
    for by in 0..2 {
        for bx in 0..2 {
            let idx = by * 2 + bx;
            let bpos = plane.pos(ox + bx * 4, oy + by * 4);
            transform::inverse_dct4x4_add(&coeffs[idx], &mut plane.data[bpos..], stride);
        }
    }
}

struct FilterLimits {
    interior: i32,
    mb_edge: i32,
    sub_edge: i32,
    hev_thresh: i32,
}

fn filter_limits(level: i32, sharpness: u8) -> FilterLimits {
    let mut interior = level;
    if sharpness > 0 {
        interior >>= if sharpness > 4 { 2 } else { 1 };
        interior = interior.min(9 - sharpness as i32);
    }
    interior = interior.max(1);
    FilterLimits {
        interior,
        mb_edge: (level + 2) * 2 + interior,
        sub_edge: level * 2 + interior,
        hev_thresh: filter::hev_threshold(level, true),
    }
}

fn deblock_frame(
    y: &mut Plane,
    u: &mut Plane,
    v: &mut Plane,
    header: &KeyframeHeader<'_>,
    modes: &[MacroblockMode],
    has_coeffs: &[bool],
    mb_w: usize,
    mb_h: usize,
) {
    let simple = header.filter_header.simple;
    let base_level = header.filter_header.level as i32;

    for mb_y in 0..mb_h {
        for mb_x in 0..mb_w {
            let idx = mb_y * mb_w + mb_x;
            let mode = &modes[idx];
            let mut level = base_level;
            if header.segment_header.enabled {
                let delta = header.segment_header.filter_strength[mode.segment_id as usize] as i32;
                level = if header.segment_header.absolute_delta {
                    delta
                } else {
                    base_level + delta
                };
            }
            let level = level.clamp(0, 63);
            if level == 0 {
                continue;
            }
            let lim = filter_limits(level, header.filter_header.sharpness);
            let y_stride = y.stride();
            let uv_stride = u.stride();
            let inner = has_coeffs[idx];

            if mb_x > 0 {
                let pos = y.pos(mb_x * 16, mb_y * 16);
                if simple {
                    filter::simple_filter_edge(&mut y.data, pos, 1, y_stride, 16, lim.mb_edge);
                } else {
                    filter::mb_edge_filter_edge(&mut y.data, pos, 1, y_stride, 16, lim.mb_edge, lim.interior, lim.hev_thresh);
                    let upos = u.pos(mb_x * 8, mb_y * 8);
                    let vpos = v.pos(mb_x * 8, mb_y * 8);
                    filter::mb_edge_filter_edge(&mut u.data, upos, 1, uv_stride, 8, lim.mb_edge, lim.interior, lim.hev_thresh);
                    filter::mb_edge_filter_edge(&mut v.data, vpos, 1, uv_stride, 8, lim.mb_edge, lim.interior, lim.hev_thresh);
                }
            }
            if !simple && inner {
                for col in [4usize, 8, 12] {
                    let pos = y.pos(mb_x * 16 + col, mb_y * 16);
                    filter::normal_filter_edge(&mut y.data, pos, 1, y_stride, 16, lim.sub_edge, lim.interior, lim.hev_thresh);
                }
                let upos = u.pos(mb_x * 8 + 4, mb_y * 8);
                let vpos = v.pos(mb_x * 8 + 4, mb_y * 8);
                filter::normal_filter_edge(&mut u.data, upos, 1, uv_stride, 8, lim.sub_edge, lim.interior, lim.hev_thresh);
                filter::normal_filter_edge(&mut v.data, vpos, 1, uv_stride, 8, lim.sub_edge, lim.interior, lim.hev_thresh);
            } else if simple && inner {
                for col in [4usize, 8, 12] {
                    let pos = y.pos(mb_x * 16 + col, mb_y * 16);
                    filter::simple_filter_edge(&mut y.data, pos, 1, y_stride, 16, lim.sub_edge);
                }
            }

            if mb_y > 0 {
                let pos = y.pos(mb_x * 16, mb_y * 16);
                if simple {
                    filter::simple_filter_edge(&mut y.data, pos, y_stride, 1, 16, lim.mb_edge);
                } else {
                    filter::mb_edge_filter_edge(&mut y.data, pos, y_stride, 1, 16, lim.mb_edge, lim.interior, lim.hev_thresh);
                    let upos = u.pos(mb_x * 8, mb_y * 8);
                    let vpos = v.pos(mb_x * 8, mb_y * 8);
                    filter::mb_edge_filter_edge(&mut u.data, upos, uv_stride, 1, 8, lim.mb_edge, lim.interior, lim.hev_thresh);
                    filter::mb_edge_filter_edge(&mut v.data, vpos, uv_stride, 1, 8, lim.mb_edge, lim.interior, lim.hev_thresh);
                }
            }
            if !simple && inner {
                for row in [4usize, 8, 12] {
                    let pos = y.pos(mb_x * 16, mb_y * 16 + row);
                    filter::normal_filter_edge(&mut y.data, pos, y_stride, 1, 16, lim.sub_edge, lim.interior, lim.hev_thresh);
                }
                let upos = u.pos(mb_x * 8, mb_y * 8 + 4);
                let vpos = v.pos(mb_x * 8, mb_y * 8 + 4);
                filter::normal_filter_edge(&mut u.data, upos, uv_stride, 1, 8, lim.sub_edge, lim.interior, lim.hev_thresh);
                filter::normal_filter_edge(&mut v.data, vpos, uv_stride, 1, 8, lim.sub_edge, lim.interior, lim.hev_thresh);
            } else if simple && inner {
                for row in [4usize, 8, 12] {
                    let pos = y.pos(mb_x * 16, mb_y * 16 + row);
                    filter::simple_filter_edge(&mut y.data, pos, y_stride, 1, 16, lim.sub_edge);
                }
            }
        }
    }
}

/// Tiny fixture images for other modules' tests (`io.rs` in particular),
/// built directly rather than through a real bitstream decode.
#[cfg(test)]
pub mod tests_support {
    use super::Plane;
    use crate::frame::DecodedImage;

    pub fn tiny_gray_image() -> DecodedImage {
        let mut y = Plane::new(4, 4);
        let mut u = Plane::new(2, 2);
        let mut v = Plane::new(2, 2);
        for row in 0..4 {
            for col in 0..4 {
                let p = y.pos(col, row);
                y.data[p] = 128;
            }
        }
        for row in 0..2 {
            for col in 0..2 {
                u.data[u.pos(col, row)] = 128;
                v.data[v.pos(col, row)] = 128;
            }
        }
        DecodedImage { width: 4, height: 4, y, u, v }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_border_defaults_match_spec() {
        let p = Plane::new(16, 16);
        assert_eq!(p.data[p.pos(0, 0) - p.stride], TOP_BORDER);
        assert_eq!(p.data[p.pos(0, 0) - 1], LEFT_BORDER);
    }

    #[test]
    fn finish_row_replicates_last_pixel() {
        let mut p = Plane::new(8, 8);
        for x in 0..8 {
            p.data[p.pos(x, 0)] = 10 + x as u8;
        }
        p.finish_row(0);
        let last = p.data[p.pos(7, 0)];
        for k in 0..RIGHT_MARGIN {
            assert_eq!(p.data[p.pos(8 + k, 0)], last);
        }
    }
}
