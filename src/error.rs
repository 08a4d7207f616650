//! Error types at the crate boundary.
//!
//! Internal plumbing threads `anyhow::Result` with `.context()` breadcrumbs,
//! the way the pipeline in `mb.rs`/`headers.rs` does; this module holds the
//! small set of types callers actually match on.

use thiserror::Error;

/// Boundary error type returned by the `decode_*` family of entry points.
#[derive(Debug, Error)]
pub enum Error {
    #[error("bitstream error: {0}")]
    BitstreamError(String),

    #[error("out of memory: {0}")]
    OutOfMemory(String),

    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("decoder suspended, more bytes needed")]
    Suspended,

    #[error("caller aborted decode")]
    UserAbort,

    #[error("not enough data in chunk")]
    NotEnoughData,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Mirrors §6's status enum for the `decode_into`-style entry points that
/// report a code rather than unwind via `Result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    OutOfMemory,
    InvalidParam,
    BitstreamError,
    UnsupportedFeature,
    Suspended,
    UserAbort,
    NotEnoughData,
}

impl From<&Error> for Status {
    fn from(e: &Error) -> Self {
        match e {
            Error::BitstreamError(_) => Status::BitstreamError,
            Error::OutOfMemory(_) => Status::OutOfMemory,
            Error::InvalidParam(_) => Status::InvalidParam,
            Error::UnsupportedFeature(_) => Status::UnsupportedFeature,
            Error::Suspended => Status::Suspended,
            Error::UserAbort => Status::UserAbort,
            Error::NotEnoughData => Status::NotEnoughData,
            Error::Io(_) => Status::BitstreamError,
        }
    }
}

/// Breadcrumb macro for `anyhow::Context`, in the spirit of the teacher's
/// `here!()` call sites in `lepton_decoder.rs` (that macro itself lives in a
/// support module not present in the retrieval sample, so we provide our own
/// minimal equivalent).
#[macro_export]
macro_rules! here {
    () => {
        concat!(file!(), ":", line!())
    };
}
