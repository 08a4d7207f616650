//! Short-distance "plane code" table: maps the 120 most common small
//! `(dx, dy)` backward-reference offsets onto compact codes 1..120, with
//! everything else falling back to `distance + 120`.
//!
//! Ported verbatim from `original_source/src/enc/backward_references.c`'s
//! `plane_to_code_lut` and `DistanceToPlaneCode` — the construction rule
//! spec.md's Open Questions section flags as unspecified is simply "this
//! fixed 128-entry table", which the original source carries as a literal.

#[rustfmt::skip]
const PLANE_TO_CODE_LUT: [u8; 128] = [
    96,  73,  55,  39,  23,  13,   5,   1, 255, 255, 255, 255, 255, 255, 255, 255,
    101, 78,  58,  42,  26,  16,   8,   2,   0,   3,   9,  17,  27,  43,  59,  79,
    102, 86,  62,  46,  32,  20,  10,   6,   4,   7,  11,  21,  33,  47,  63,  87,
    105, 90,  70,  52,  37,  28,  18,  14,  12,  15,  19,  29,  38,  53,  71,  91,
    110, 99,  82,  66,  48,  35,  30,  24,  22,  25,  31,  36,  49,  67,  83, 100,
    115, 108, 94,  76,  64,  50,  44,  40,  34,  41,  45,  51,  65,  77,  95, 109,
    118, 113, 103, 92,  80,  68,  60,  56,  54,  57,  61,  69,  81,  93, 104, 114,
    119, 116, 111, 106, 97,  88,  84,  74,  72,  75,  85,  89,  98, 107, 112, 117,
];

/// First code past the fixed short-distance table; raw distances are
/// coded as `dist + PLANE_CODE_LIMIT`.
pub const PLANE_CODE_LIMIT: i32 = 120;

/// Converts a 1-D pixel distance (`dy * xsize + dx`, linearized over the
/// raster) to its plane code, given the image's `xsize`.
pub fn distance_to_plane_code(xsize: i32, dist: i32) -> i32 {
    let yoffset = dist / xsize;
    let xoffset = dist - yoffset * xsize;
    if xoffset <= 8 && yoffset < 8 {
        PLANE_TO_CODE_LUT[(yoffset * 16 + 8 - xoffset) as usize] as i32 + 1
    } else if xoffset > xsize - 8 && yoffset < 7 {
        PLANE_TO_CODE_LUT[((yoffset + 1) * 16 + 8 + (xsize - xoffset)) as usize] as i32 + 1
    } else {
        dist + PLANE_CODE_LIMIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_one_maps_to_code_two() {
        // dx=1, dy=0 -> yoffset*16 + 8 - xoffset = 7 -> lut[7] = 1 -> code 2
        assert_eq!(distance_to_plane_code(100, 1), 2);
    }

    #[test]
    fn full_row_distance_maps_to_code_one() {
        // dx=0, dy=1 -> index 16*1 + 8 - 0 = 24 -> lut[24]=0 -> code 1
        assert_eq!(distance_to_plane_code(100, 100), 1);
    }

    #[test]
    fn large_distance_falls_back_to_raw_plus_limit() {
        assert_eq!(distance_to_plane_code(4, 1000), 1000 + PLANE_CODE_LIMIT);
    }
}
