//! §4.D per-macroblock mode and residual decode: segment id, skip flag,
//! luma/chroma intra mode trees, and the 25-block (1 WHT + 16 luma + 8
//! chroma) coefficient-token decode with band/context chaining and the
//! category escape codes.
//!
//! Grounded in `original_source/src/dec/vp8.c`'s `ParseIntraMode` and
//! `original_source/src/dec/tree.c`'s `GetCoeffsFast`-style token loop; the
//! EOB-skip-after-zero rule is RFC 6386 §13.2's "the end-of-block flag is
//! not read if the preceding token was zero".

use crate::bitreader::BoolDecoder;
use crate::headers::{CoeffProbs, DequantFactors, KeyframeHeader};
use crate::tables::{self, BMode, LumaMode};

/// `UV` mode tree: shallower than `YMODE_TREE` since chroma has no `BPred`.
pub const UV_MODE_TREE: [i8; 6] = [
    -(LumaMode::DC as i8),
    2,
    -(LumaMode::V as i8),
    4,
    -(LumaMode::H as i8),
    -(LumaMode::TM as i8),
];

#[derive(Debug, Clone)]
pub struct MacroblockMode {
    pub segment_id: u8,
    pub skip_coeff: bool,
    pub y_mode: LumaMode,
    pub uv_mode: LumaMode,
    /// Per-4x4-subblock mode, populated only when `y_mode == BPred`.
    pub b_modes: [BMode; 16],
}

fn mode_from_tree_symbol(sym: i8) -> LumaMode {
    match sym {
        x if x == LumaMode::DC as i8 => LumaMode::DC,
        x if x == LumaMode::V as i8 => LumaMode::V,
        x if x == LumaMode::H as i8 => LumaMode::H,
        x if x == LumaMode::TM as i8 => LumaMode::TM,
        _ => LumaMode::BPred,
    }
}

/// Tracks the running above/left 4x4 sub-mode context (RFC 6386 §11.5)
/// across a frame's macroblock raster scan, the B-mode analogue of
/// `NzContext`. A whole-macroblock (non-`BPred`) mode is a valid context
/// value for its neighbors too: `vp8i.h` aliases `DC_PRED`/`V_PRED`/
/// `H_PRED`/`TM_PRED` onto `B_DC_PRED`/`B_VE_PRED`/`B_HE_PRED`/`B_TM_PRED`,
/// so the same numbering substitutes directly.
pub struct BModeContext {
    top: Vec<[BMode; 4]>,
    left: [BMode; 4],
}

impl BModeContext {
    pub fn new(mb_w: usize) -> Self {
        BModeContext { top: vec![[BMode::DC; 4]; mb_w], left: [BMode::DC; 4] }
    }

    pub fn reset_left(&mut self) {
        self.left = [BMode::DC; 4];
    }
}

fn whole_mb_bmode(y_mode: LumaMode) -> BMode {
    match y_mode {
        LumaMode::DC => BMode::DC,
        LumaMode::V => BMode::VE,
        LumaMode::H => BMode::HE,
        LumaMode::TM => BMode::TM,
        LumaMode::BPred => unreachable!("BPred has explicit per-block sub-modes"),
    }
}

/// Decodes one macroblock's prediction mode (§4.D "mode decode").
pub fn decode_mb_mode(br: &mut BoolDecoder, header: &KeyframeHeader<'_>, bctx: &mut BModeContext, mb_x: usize) -> MacroblockMode {
    let segment_id = if header.segment_header.enabled && header.segment_header.update_map {
        br.get_tree(&tables::SEGMENT_TREE, &header.segment_header.tree_probs) as u8
    } else {
        0
    };
    let skip_coeff = header.use_skip_proba && br.get_bit(header.skip_prob);

    let y_sym = br.get_tree(&tables::YMODE_TREE, &tables::KF_YMODE_PROB);
    let y_mode = mode_from_tree_symbol(y_sym);

    let mut b_modes = [BMode::DC; 16];
    let effective = if y_mode == LumaMode::BPred {
        for r in 0..4 {
            for c in 0..4 {
                let above = if r == 0 { bctx.top[mb_x][c] } else { b_modes[(r - 1) * 4 + c] };
                let left = if c == 0 { bctx.left[r] } else { b_modes[r * 4 + c - 1] };
                let probs = tables::kf_bmode_prob(above, left);
                let sym = br.get_tree(&tables::BMODE_TREE, &probs);
                b_modes[r * 4 + c] = bmode_from_symbol(sym);
            }
        }
        b_modes
    } else {
        [whole_mb_bmode(y_mode); 16]
    };

    for r in 0..4 {
        bctx.left[r] = effective[r * 4 + 3];
    }
    bctx.top[mb_x] = [effective[12], effective[13], effective[14], effective[15]];

    let uv_sym = br.get_tree(&UV_MODE_TREE, &tables::KF_UV_MODE_PROB);
    let uv_mode = mode_from_tree_symbol(uv_sym);

    MacroblockMode {
        segment_id,
        skip_coeff,
        y_mode,
        uv_mode,
        b_modes,
    }
}

fn bmode_from_symbol(sym: i8) -> BMode {
    use BMode::*;
    match sym {
        x if x == DC as i8 => DC,
        x if x == TM as i8 => TM,
        x if x == VE as i8 => VE,
        x if x == HE as i8 => HE,
        x if x == LD as i8 => LD,
        x if x == RD as i8 => RD,
        x if x == VR as i8 => VR,
        x if x == VL as i8 => VL,
        x if x == HD as i8 => HD,
        _ => HU,
    }
}

/// Running above/left non-zero-block context, maintained across a frame's
/// macroblock raster scan (§3's `non_zero` bitfields, unpacked into flat
/// per-edge arrays for the token-probability context lookup).
pub struct NzContext {
    top_y: Vec<bool>,
    top_u: Vec<bool>,
    top_v: Vec<bool>,
    top_y2: Vec<bool>,
    left_y: [bool; 4],
    left_u: [bool; 2],
    left_v: [bool; 2],
    left_y2: bool,
}

impl NzContext {
    pub fn new(mb_w: usize) -> Self {
        NzContext {
            top_y: vec![false; 4 * mb_w],
            top_u: vec![false; 2 * mb_w],
            top_v: vec![false; 2 * mb_w],
            top_y2: vec![false; mb_w],
            left_y: [false; 4],
            left_u: [false; 2],
            left_v: [false; 2],
            left_y2: false,
        }
    }

    pub fn reset_left(&mut self) {
        self.left_y = [false; 4];
        self.left_u = [false; 2];
        self.left_v = [false; 2];
        self.left_y2 = false;
    }
}

/// One macroblock's decoded residual coefficients, natural (non-zigzag)
/// order per 4x4 block.
pub struct MbResiduals {
    pub y2: Option<[i16; 16]>,
    pub y: [[i16; 16]; 16],
    pub u: [[i16; 16]; 4],
    pub v: [[i16; 16]; 4],
    /// Per-block nonzero flag, in `y2, y[0..16], u[0..4], v[0..4]` order.
    pub nonzero: [bool; 25],
}

/// Decodes all 25 coefficient blocks for one macroblock, threading the
/// above/left nonzero context through `nz` and advancing it in place.
pub fn decode_residuals(
    br: &mut BoolDecoder,
    probs: &CoeffProbs,
    dq: &DequantFactors,
    mode: &MacroblockMode,
    nz: &mut NzContext,
    mb_x: usize,
) -> MbResiduals {
    let has_y2 = mode.y_mode != LumaMode::BPred;
    let mut out = MbResiduals {
        y2: None,
        y: [[0i16; 16]; 16],
        u: [[0i16; 16]; 4],
        v: [[0i16; 16]; 4],
        nonzero: [false; 25],
    };

    if mode.skip_coeff {
        // A skipped MB codes no coefficients; its nonzero context is
        // cleared rather than left inherited from whatever preceded it.
        for i in 0..4 {
            nz.left_y[i] = false;
            nz.top_y[4 * mb_x + i] = false;
        }
        for i in 0..2 {
            nz.left_u[i] = false;
            nz.top_u[2 * mb_x + i] = false;
            nz.left_v[i] = false;
            nz.top_v[2 * mb_x + i] = false;
        }
        if has_y2 {
            nz.left_y2 = false;
            nz.top_y2[mb_x] = false;
        }
        return out;
    }

    let first_coeff = if has_y2 { 1 } else { 0 };
    let y_type = if has_y2 { 0 } else { 3 };

    if has_y2 {
        let ctx = nz.left_y2 as usize + nz.top_y2[mb_x] as usize;
        let (coeffs, any) = decode_coeffs(br, &probs[1], 0, ctx, dq.y2_dc, dq.y2_ac);
        nz.left_y2 = any;
        nz.top_y2[mb_x] = any;
        out.nonzero[0] = any;
        out.y2 = Some(coeffs);
    }

    for by in 0..4 {
        for bx in 0..4 {
            let idx = by * 4 + bx;
            let ctx = nz.left_y[by] as usize + nz.top_y[4 * mb_x + bx] as usize;
            let (coeffs, any) =
                decode_coeffs(br, &probs[y_type], first_coeff, ctx, dq.y1_dc, dq.y1_ac);
            nz.left_y[by] = any;
            nz.top_y[4 * mb_x + bx] = any;
            out.nonzero[1 + idx] = any;
            out.y[idx] = coeffs;
        }
    }

    for by in 0..2 {
        for bx in 0..2 {
            let idx = by * 2 + bx;
            let ctx = nz.left_u[by] as usize + nz.top_u[2 * mb_x + bx] as usize;
            let (coeffs, any) = decode_coeffs(br, &probs[2], 0, ctx, dq.uv_dc, dq.uv_ac);
            nz.left_u[by] = any;
            nz.top_u[2 * mb_x + bx] = any;
            out.u[idx] = coeffs;
        }
    }
    for by in 0..2 {
        for bx in 0..2 {
            let idx = by * 2 + bx;
            let ctx = nz.left_v[by] as usize + nz.top_v[2 * mb_x + bx] as usize;
            let (coeffs, any) = decode_coeffs(br, &probs[2], 0, ctx, dq.uv_dc, dq.uv_ac);
            nz.left_v[by] = any;
            nz.top_v[2 * mb_x + bx] = any;
            out.v[idx] = coeffs;
        }
    }
    out.nonzero[17..21].copy_from_slice(&[
        out.u[0] != [0i16; 16],
        out.u[1] != [0i16; 16],
        out.u[2] != [0i16; 16],
        out.u[3] != [0i16; 16],
    ]);
    out.nonzero[21..25].copy_from_slice(&[
        out.v[0] != [0i16; 16],
        out.v[1] != [0i16; 16],
        out.v[2] != [0i16; 16],
        out.v[3] != [0i16; 16],
    ]);

    out
}

/// Decodes one 4x4 coefficient block's token stream starting at zigzag
/// position `first_coeff`, applying dequantization inline. Returns the
/// natural-order coefficients and whether any were nonzero.
pub fn decode_coeffs(
    br: &mut BoolDecoder,
    probs_for_type: &[[[u8; 11]; 3]; 8],
    first_coeff: usize,
    mut ctx: usize,
    dq_dc: i32,
    dq_ac: i32,
) -> ([i16; 16], bool) {
    let mut coeffs = [0i16; 16];
    let mut any_nonzero = false;
    let mut n = first_coeff;
    let mut check_eob = true;

    while n < 16 {
        let band = tables::COEFF_BANDS[n];
        let p = &probs_for_type[band][ctx];

        if check_eob && !br.get_bit(p[0]) {
            break;
        }
        if !br.get_bit(p[1]) {
            ctx = 0;
            check_eob = false;
            n += 1;
            continue;
        }
        check_eob = true;

        let magnitude: i32 = if !br.get_bit(p[2]) {
            1
        } else if !br.get_bit(p[3]) {
            if !br.get_bit(p[4]) {
                2
            } else if !br.get_bit(p[5]) {
                3
            } else {
                4
            }
        } else if !br.get_bit(p[6]) {
            if !br.get_bit(p[7]) {
                tables::CAT_BASE[0] + br.get_value_with_probs(&tables::CAT1) as i32
            } else {
                tables::CAT_BASE[1] + br.get_value_with_probs(&tables::CAT2) as i32
            }
        } else if !br.get_bit(p[8]) {
            if !br.get_bit(p[9]) {
                tables::CAT_BASE[2] + br.get_value_with_probs(&tables::CAT3) as i32
            } else {
                tables::CAT_BASE[3] + br.get_value_with_probs(&tables::CAT4) as i32
            }
        } else if !br.get_bit(p[10]) {
            tables::CAT_BASE[4] + br.get_value_with_probs(&tables::CAT5) as i32
        } else {
            tables::CAT_BASE[5] + br.get_value_with_probs(&tables::CAT6) as i32
        };

        ctx = if magnitude == 1 { 1 } else { 2 };
        let sign = br.get_bit(128);
        let signed = if sign { -magnitude } else { magnitude };
        let dq = if n == 0 { dq_dc } else { dq_ac };
        coeffs[tables::ZIGZAG[n]] = (signed * dq).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        any_nonzero = true;
        n += 1;
    }

    (coeffs, any_nonzero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers;

    #[test]
    fn all_zero_block_decodes_to_eob_immediately() {
        // EOB bit false at the very first position: entire block is zero.
        let data = [0x00u8; 4];
        let mut br = BoolDecoder::new(&data);
        let probs = headers::default_coeff_probs();
        let (coeffs, any) = decode_coeffs(&mut br, &probs[0], 0, 0, 4, 4);
        assert!(!any);
        assert_eq!(coeffs, [0i16; 16]);
    }

    #[test]
    fn uv_mode_tree_has_no_bpred_leaf() {
        for &entry in UV_MODE_TREE.iter() {
            assert_ne!(entry, -(LumaMode::BPred as i8));
        }
    }
}
