//! §4.F output path: the `VP8Io` setup/put/teardown callback trait and the
//! three row-emission strategies (YUV pass-through, point-sampled, fancy
//! upsampled).
//!
//! Grounded in spec.md's description of the per-row-pair `put(io)`
//! callback and `original_source/src/dec/frame.c`'s row-release timing
//! (the callback fires once per finished, deblocked macroblock-row strip).

use crate::dsp::yuv::{self, ColorSpace};
use crate::error::{Error, Result};
use crate::frame::DecodedImage;

/// Implemented by callers that want a streaming (row-by-row) view of the
/// decode instead of one final buffer.
pub trait Vp8Io {
    /// Called once, after the picture header is known. Returning `false`
    /// aborts the decode with `UserAbort`.
    fn setup(&mut self, width: u32, height: u32) -> bool;

    /// Called once per completed, deblocked row strip. Returning `false`
    /// aborts the decode.
    fn put(&mut self, y: u32, height: u32, rgb_row: &[u8]) -> bool;

    fn teardown(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsampleMode {
    Fancy,
    PointSample,
    YuvPassthrough,
}

/// Renders the whole decoded picture into a freshly allocated buffer in
/// `cs`, using `mode` for chroma reconstruction.
pub fn render(image: &DecodedImage, cs: ColorSpace, mode: UpsampleMode) -> Vec<u8> {
    let w = image.width as usize;
    let h = image.height as usize;
    let bpp = bytes_per_pixel(cs);
    let mut out = vec![0u8; w * h * bpp];

    match mode {
        UpsampleMode::YuvPassthrough => render_yuv_passthrough(image, &mut out, w, h),
        UpsampleMode::PointSample => render_rows(image, &mut out, w, h, bpp, cs, false),
        UpsampleMode::Fancy => render_rows(image, &mut out, w, h, bpp, cs, true),
    }
    out
}

fn bytes_per_pixel(cs: ColorSpace) -> usize {
    match cs {
        ColorSpace::Rgb | ColorSpace::Bgr => 3,
        ColorSpace::Rgba | ColorSpace::Bgra | ColorSpace::Argb | ColorSpace::Yuva => 4,
        ColorSpace::Rgba4444 | ColorSpace::Rgb565 => 2,
        ColorSpace::Yuv => 3,
    }
}

fn render_yuv_passthrough(image: &DecodedImage, out: &mut [u8], w: usize, h: usize) {
    for row in 0..h {
        let y_row = image.y.row(row);
        let u_row = image.u.row(row / 2);
        let v_row = image.v.row(row / 2);
        for col in 0..w {
            let o = (row * w + col) * 3;
            out[o] = y_row[col];
            out[o + 1] = u_row[col / 2];
            out[o + 2] = v_row[col / 2];
        }
    }
}

fn render_rows(image: &DecodedImage, out: &mut [u8], w: usize, h: usize, bpp: usize, cs: ColorSpace, fancy: bool) {
    for row in 0..h {
        let y_row = image.y.row(row);
        for col in 0..w {
            let (u, v) = if fancy {
                fancy_uv(image, col, row, w, h)
            } else {
                let uv_row = row / 2;
                let uv_col = col / 2;
                (image.u.row(uv_row)[uv_col], image.v.row(uv_row)[uv_col])
            };
            let o = (row * w + col) * bpp;
            yuv::write_pixel(cs, y_row[col], u, v, &mut out[o..o + bpp]);
        }
    }
}

/// 2x2 bilinear fancy-upsampling of one output pixel's chroma, per the
/// `[9,3,3,1]/16`-family kernels in `dsp/yuv.rs`.
fn fancy_uv(image: &DecodedImage, x: usize, y: usize, w: usize, h: usize) -> (u8, u8) {
    let uv_w = image.u.row(0).len();
    let uv_h = (h + 1) / 2;
    let cx = (x / 2).min(uv_w.saturating_sub(1));
    let cy = (y / 2).min(uv_h.saturating_sub(1));
    let left = x % 2 == 0;
    let top = y % 2 == 0;
    let nx = if left {
        cx.saturating_sub(1)
    } else {
        (cx + 1).min(uv_w.saturating_sub(1))
    };
    let ny = if top {
        cy.saturating_sub(1)
    } else {
        (cy + 1).min(uv_h.saturating_sub(1))
    };

    let weight_row = match (top, left) {
        (true, true) => 0,
        (true, false) => 1,
        (false, true) => 2,
        (false, false) => 3,
    };
    let w4 = yuv::UPSAMPLE_WEIGHTS[weight_row];
    let mix = |plane_row_cy: &[u8], plane_row_ny: &[u8]| -> u8 {
        let tl = plane_row_cy[cx] as i32;
        let tr = plane_row_cy[nx] as i32;
        let bl = plane_row_ny[cx] as i32;
        let br = plane_row_ny[nx] as i32;
        let sum = w4[0] * tl + w4[1] * tr + w4[2] * bl + w4[3] * br + yuv::UPSAMPLE_ROUND;
        (sum >> 4).clamp(0, 255) as u8
    };
    let u_cy = image.u.row(cy).to_vec();
    let u_ny = image.u.row(ny).to_vec();
    let v_cy = image.v.row(cy).to_vec();
    let v_ny = image.v.row(ny).to_vec();
    let _ = w;
    (mix(&u_cy, &u_ny), mix(&v_cy, &v_ny))
}

/// Drives `io` over the already-decoded picture, row by row, converting to
/// `cs` with the requested upsampling strategy. `UserAbort` propagates from
/// a `false` return of either callback.
pub fn drive<T: Vp8Io>(io: &mut T, image: &DecodedImage, cs: ColorSpace, mode: UpsampleMode) -> Result<()> {
    if !io.setup(image.width, image.height) {
        return Err(Error::UserAbort);
    }
    let buf = render(image, cs, mode);
    let bpp = bytes_per_pixel(cs);
    let stride = image.width as usize * bpp;
    for row in 0..image.height as usize {
        if !io.put(row as u32, 1, &buf[row * stride..(row + 1) * stride]) {
            io.teardown();
            return Err(Error::UserAbort);
        }
    }
    io.teardown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Collector {
        rows: usize,
    }
    impl Vp8Io for Collector {
        fn setup(&mut self, _w: u32, _h: u32) -> bool {
            true
        }
        fn put(&mut self, _y: u32, _h: u32, _row: &[u8]) -> bool {
            self.rows += 1;
            true
        }
    }

    #[test]
    fn drive_reports_user_abort_on_false_setup() {
        struct Refuser;
        impl Vp8Io for Refuser {
            fn setup(&mut self, _w: u32, _h: u32) -> bool {
                false
            }
            fn put(&mut self, _y: u32, _h: u32, _row: &[u8]) -> bool {
                true
            }
        }
        let image = crate::frame::tests_support::tiny_gray_image();
        let mut r = Refuser;
        assert!(matches!(drive(&mut r, &image, ColorSpace::Rgb, UpsampleMode::PointSample), Err(Error::UserAbort)));
    }
}
