//! §4.E incremental decoder: feed compressed bytes as they arrive and
//! decode as much as the buffered data allows.
//!
//! Grounded in `original_source/src/dec/idec.c`'s state machine
//! (`STATE_HEADER` → `STATE_PARTS0` → `STATE_DATA` → `STATE_DONE` /
//! `STATE_ERROR`) and its `MemBuffer` append-mode growth. This crate
//! simplifies the granularity: rather than `idec.c`'s per-macroblock-row
//! suspend/resume (which needs `SaveContext`/`RestoreContext` to snapshot
//! live `BoolDecoder` register state mid-row), we buffer until the whole
//! `VP8 ` chunk named by the RIFF header is available and then run
//! `frame::decode_keyframe` once — see `DESIGN.md` for the rationale.

use crate::container;
use crate::error::{Error, Result};
use crate::frame::{self, DecodedImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Header,
    Parts0,
    Data,
    Done,
    Error,
}

pub struct IncrementalDecoder {
    buf: Vec<u8>,
    state: State,
    expected_total: Option<usize>,
}

impl IncrementalDecoder {
    pub fn new() -> Self {
        IncrementalDecoder { buf: Vec::new(), state: State::Header, expected_total: None }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Appends newly received bytes and advances the state machine as far
    /// as the currently buffered data allows.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        if self.state == State::Done || self.state == State::Error {
            return Err(Error::InvalidParam("decoder already finished".into()));
        }
        self.buf.extend_from_slice(data);

        if self.state == State::Header {
            if self.buf.len() < 12 {
                return Ok(());
            }
            if &self.buf[0..4] != b"RIFF" || &self.buf[8..12] != b"WEBP" {
                self.state = State::Error;
                return Err(Error::BitstreamError("not a RIFF/WEBP stream".into()));
            }
            let riff_size = u32::from_le_bytes(self.buf[4..8].try_into().unwrap()) as usize;
            self.expected_total = Some(riff_size + 8);
            self.state = State::Parts0;
        }

        if self.state == State::Parts0 || self.state == State::Data {
            self.state = State::Data;
            if let Some(total) = self.expected_total {
                if self.buf.len() >= total {
                    self.state = State::Done;
                }
            }
        }
        Ok(())
    }

    /// Decodes the buffered bytes if a complete `VP8 ` chunk is now
    /// available; returns `Ok(None)` (not `Suspended`) while more data is
    /// still needed, matching `WebPIDecode`'s "call again later" contract.
    pub fn decode(&mut self) -> Result<Option<DecodedImage>> {
        if self.state != State::Done {
            return Ok(None);
        }
        match container::find_vp8_chunk(&self.buf) {
            Ok(payload) => match frame::decode_keyframe(payload) {
                Ok(image) => Ok(Some(image)),
                Err(e) => {
                    self.state = State::Error;
                    Err(Error::BitstreamError(e.to_string()))
                }
            },
            Err(e) => {
                self.state = State::Error;
                Err(e)
            }
        }
    }
}

impl Default for IncrementalDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_in_header_state_until_twelve_bytes_buffered() {
        let mut dec = IncrementalDecoder::new();
        dec.append(b"RIFF").unwrap();
        assert_eq!(dec.state(), State::Header);
    }

    #[test]
    fn rejects_non_riff_magic_once_enough_bytes_arrive() {
        let mut dec = IncrementalDecoder::new();
        let bad = b"not a riff header!!".to_vec();
        assert!(dec.append(&bad).is_err());
        assert_eq!(dec.state(), State::Error);
    }

    #[test]
    fn append_after_done_or_error_is_rejected() {
        let mut dec = IncrementalDecoder::new();
        let bad = b"not a riff header!!".to_vec();
        let _ = dec.append(&bad);
        assert!(dec.append(b"more").is_err());
    }
}
