//! Minimal RIFF container boundary: locates the `VP8 ` (lossy keyframe)
//! chunk inside a `RIFF....WEBP` file and hands back its payload.
//!
//! Grounded in spec.md's container section and the RIFF framing used
//! throughout `original_source/src/demux/demux.c` (chunk header = 4-byte
//! fourcc + little-endian `u32` size, chunks padded to even length).

use crate::error::{Error, Result};

pub struct RiffChunk<'a> {
    pub fourcc: [u8; 4],
    pub payload: &'a [u8],
}

const RIFF_HEADER_SIZE: usize = 12;
const CHUNK_HEADER_SIZE: usize = 8;

/// Walks the top-level chunk list of a `RIFF????WEBP` file, returning the
/// first chunk whose fourcc is `VP8 ` (note the trailing space).
pub fn find_vp8_chunk(data: &[u8]) -> Result<&[u8]> {
    if data.len() < RIFF_HEADER_SIZE || &data[0..4] != b"RIFF" || &data[8..12] != b"WEBP" {
        return Err(Error::BitstreamError("not a RIFF/WEBP file".into()));
    }
    let riff_size = u32::from_le_bytes(data[4..8].try_into().unwrap()) as usize;
    let end = (riff_size + 8).min(data.len());

    let mut pos = RIFF_HEADER_SIZE;
    while pos + CHUNK_HEADER_SIZE <= end {
        let mut fourcc = [0u8; 4];
        fourcc.copy_from_slice(&data[pos..pos + 4]);
        let size = u32::from_le_bytes(data[pos + 4..pos + 8].try_into().unwrap()) as usize;
        let payload_start = pos + CHUNK_HEADER_SIZE;
        if payload_start + size > data.len() {
            return Err(Error::NotEnoughData);
        }
        if &fourcc == b"VP8 " {
            return Ok(&data[payload_start..payload_start + size]);
        }
        let padded = size + (size & 1);
        pos = payload_start + padded;
    }
    Err(Error::BitstreamError("no VP8 chunk found".into()))
}

/// Iterates every top-level chunk, for callers that need `ALPH`/`ICCP`/
/// `EXIF`/etc. alongside the image data (container-level metadata is
/// otherwise out of scope for this crate).
pub fn iter_chunks(data: &[u8]) -> Result<Vec<RiffChunk<'_>>> {
    if data.len() < RIFF_HEADER_SIZE || &data[0..4] != b"RIFF" || &data[8..12] != b"WEBP" {
        return Err(Error::BitstreamError("not a RIFF/WEBP file".into()));
    }
    let riff_size = u32::from_le_bytes(data[4..8].try_into().unwrap()) as usize;
    let end = (riff_size + 8).min(data.len());
    let mut out = Vec::new();
    let mut pos = RIFF_HEADER_SIZE;
    while pos + CHUNK_HEADER_SIZE <= end {
        let mut fourcc = [0u8; 4];
        fourcc.copy_from_slice(&data[pos..pos + 4]);
        let size = u32::from_le_bytes(data[pos + 4..pos + 8].try_into().unwrap()) as usize;
        let payload_start = pos + CHUNK_HEADER_SIZE;
        if payload_start + size > data.len() {
            return Err(Error::NotEnoughData);
        }
        out.push(RiffChunk { fourcc, payload: &data[payload_start..payload_start + size] });
        let padded = size + (size & 1);
        pos = payload_start + padded;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_riff(chunks: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(b"WEBP");
        for (fourcc, payload) in chunks {
            body.extend_from_slice(*fourcc);
            body.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            body.extend_from_slice(payload);
            if payload.len() % 2 == 1 {
                body.push(0);
            }
        }
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn finds_vp8_chunk_after_odd_length_sibling() {
        let data = build_riff(&[(b"ICCP", &[1, 2, 3]), (b"VP8 ", &[9, 9, 9, 9])]);
        let chunk = find_vp8_chunk(&data).unwrap();
        assert_eq!(chunk, &[9, 9, 9, 9]);
    }

    #[test]
    fn rejects_non_riff_data() {
        assert!(find_vp8_chunk(b"not a riff file").is_err());
    }
}
