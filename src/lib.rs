//! VP8 still-image ("simple" WebP) keyframe decoder, a sharp gamma-aware
//! YUV420 downsampler for the encode side, and the lossless (VP8L)
//! backward-reference planning stage.
//!
//! The public surface is intentionally small: [`decode_rgb`] for the
//! common case, [`idec::IncrementalDecoder`] for streaming input, and
//! [`io::drive`] for callers that want a row callback instead of one big
//! buffer.

pub mod bitreader;
pub mod container;
pub mod dsp;
pub mod error;
pub mod frame;
pub mod headers;
pub mod idec;
pub mod io;
pub mod lossless;
pub mod mb;
pub mod options;
pub mod rescaler;
pub mod sharpyuv;
pub mod tables;
pub mod worker;

pub use error::{Error, Result, Status};
pub use frame::DecodedImage;
pub use options::DecoderOptions;

use dsp::yuv::ColorSpace;
use io::UpsampleMode;

/// Decodes a whole WebP (lossy, keyframe-only) buffer straight to packed
/// RGB, honoring `options`' cropping/scaling/filtering flags where set.
pub fn decode_rgb(webp_data: &[u8], options: &DecoderOptions) -> Result<Vec<u8>> {
    decode_into(webp_data, options, ColorSpace::Rgb)
}

/// As [`decode_rgb`], but into an arbitrary [`ColorSpace`].
pub fn decode_into(webp_data: &[u8], options: &DecoderOptions, cs: ColorSpace) -> Result<Vec<u8>> {
    let payload = container::find_vp8_chunk(webp_data)?;
    let mut image = frame::decode_keyframe(payload).map_err(|e| Error::BitstreamError(e.to_string()))?;

    if options.use_cropping {
        image = crop(image, options)?;
    }
    let mode = if options.no_fancy_upsampling { UpsampleMode::PointSample } else { UpsampleMode::Fancy };
    let mut rgb = io::render(&image, cs, mode);

    if options.use_scaling {
        rgb = scale(&rgb, image.width, image.height, options, cs);
    }
    Ok(rgb)
}

fn crop(image: DecodedImage, options: &DecoderOptions) -> Result<DecodedImage> {
    let left = options.crop_left as usize;
    let top = options.crop_top as usize;
    let w = options.crop_width as usize;
    let h = options.crop_height as usize;
    if left + w > image.width as usize || top + h > image.height as usize {
        return Err(Error::InvalidParam("crop rectangle exceeds picture bounds".into()));
    }

    let mut y = frame::Plane::new_for_crop(w, h);
    let uv_w = (w + 1) / 2;
    let uv_h = (h + 1) / 2;
    let mut u = frame::Plane::new_for_crop(uv_w, uv_h);
    let mut v = frame::Plane::new_for_crop(uv_w, uv_h);
    for row in 0..h {
        y.row_mut(row).copy_from_slice(&image.y.row(top + row)[left..left + w]);
    }
    for row in 0..uv_h {
        let src_row = (top / 2) + row;
        u.row_mut(row).copy_from_slice(&image.u.row(src_row)[left / 2..left / 2 + uv_w]);
        v.row_mut(row).copy_from_slice(&image.v.row(src_row)[left / 2..left / 2 + uv_w]);
    }
    Ok(DecodedImage { width: w as u32, height: h as u32, y, u, v })
}

fn scale(rgb: &[u8], width: u32, height: u32, options: &DecoderOptions, cs: ColorSpace) -> Vec<u8> {
    let bpp = match cs {
        ColorSpace::Rgb | ColorSpace::Bgr | ColorSpace::Yuv => 3,
        ColorSpace::Rgba4444 | ColorSpace::Rgb565 => 2,
        _ => 4,
    };
    let mut out = vec![0u8; options.scaled_width as usize * options.scaled_height as usize * bpp];

    for channel in 0..bpp {
        let mut rescaler_ch = rescaler::Rescaler::new(width as usize, height as usize, options.scaled_width as usize, options.scaled_height as usize);
        let mut src_row = vec![0u8; width as usize];
        let mut dst_row = vec![0u8; options.scaled_width as usize];
        let mut dst_y = 0usize;
        for row in 0..height as usize {
            for col in 0..width as usize {
                src_row[col] = rgb[(row * width as usize + col) * bpp + channel];
            }
            rescaler_ch.import_row(&src_row);
            rescaler_ch.advance_row();
            while rescaler_ch.export_row(&mut dst_row) {
                if dst_y >= options.scaled_height as usize {
                    break;
                }
                for col in 0..options.scaled_width as usize {
                    out[(dst_y * options.scaled_width as usize + col) * bpp + channel] = dst_row[col];
                }
                dst_y += 1;
            }
        }
    }
    out
}

/// Converts one packed-RGB image to sharp gamma-aware YUV420, the
/// encoder-side counterpart of the fancy-upsampling decode path.
pub fn sharp_rgb_to_yuv420(rgb: &[u8], width: usize, height: usize) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let conv = sharpyuv::SharpYuvConverter::new();
    let uv_w = (width + 1) / 2;
    let uv_h = (height + 1) / 2;
    let mut y = vec![0u8; width * height];
    let mut u = vec![0u8; uv_w * uv_h];
    let mut v = vec![0u8; uv_w * uv_h];
    conv.convert(rgb, width, height, &mut y, &mut u, &mut v);
    (y, u, v)
}
