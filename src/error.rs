use std::{io, string::FromUtf8Error};
use thiserror::Error;

use crate::file::ImageType;

type FallbackError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    /// No Exif payload was found anywhere in the source.
    #[error("no exif data found")]
    NoExif,

    #[error("insufficient data; at least 16 bytes are needed to detect the image type")]
    InsufficientData,

    #[error("invalid header; {0}")]
    InvalidHeader(&'static str),

    #[error("read at negative offset")]
    ReadNegativeOffset,

    #[error("tag type is not valid: {0}")]
    TagTypeNotValid(u16),

    #[error("not enough data; need {needed} bytes at offset {offset}")]
    NotEnoughData { offset: u64, needed: usize },

    #[error("ifd buffer length is invalid: {0} entries")]
    IfdBufferLength(u16),

    #[error("parse gps failed; {0}")]
    ParseGps(&'static str),

    #[error("parse gps failed; rational array length is {0}, expected 3")]
    ParseGpsRationalLength(usize),

    #[error("parse timestamp failed: {0}")]
    ParseTimestamp(String),

    #[error("parse sub-second failed: {0}")]
    ParseSubSecond(String),

    #[error("parse rationals failed; {0}")]
    ParseRationals(&'static str),

    #[error("nikon maker-note header is invalid")]
    NikonMkNote,

    #[error("item not found: {0}")]
    ItemNotFound(&'static str),

    #[error("malformed CTMD; {0}")]
    MalformedCtmd(&'static str),

    #[error("incorrect CameraInfo length for {model}; expected at least {expected}, got {actual}")]
    IncorrectLength {
        model: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported AF point count: {0}")]
    UnsupportedAfPoints(u16),

    #[error("expected a JPEG marker at offset {0}")]
    ExpectedMarker(u64),

    #[error("unsupported image type: {0}")]
    UnsupportedImageType(ImageType),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("parse failed; {0}")]
    ParseFailed(FallbackError),
}

use Error::*;

impl From<String> for Error {
    fn from(src: String) -> Error {
        ParseFailed(src.into())
    }
}

impl From<&str> for Error {
    fn from(src: &str) -> Error {
        src.to_string().into()
    }
}

impl From<FromUtf8Error> for Error {
    fn from(value: FromUtf8Error) -> Self {
        ParseFailed(value.into())
    }
}

impl From<nom::Err<nom::error::Error<&[u8]>>> for crate::Error {
    fn from(e: nom::Err<nom::error::Error<&[u8]>>) -> Self {
        convert_parse_error(e, "")
    }
}

pub(crate) fn convert_parse_error(e: nom::Err<nom::error::Error<&[u8]>>, message: &str) -> Error {
    let s = match e {
        nom::Err::Incomplete(_) => format!("{e}; {message}"),
        nom::Err::Error(e) => format!("{}; {message}", e.code.description()),
        nom::Err::Failure(e) => format!("{}; {message}", e.code.description()),
    };

    s.into()
}

impl Error {
    /// Whether the error came from the reader reporting cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Io(e) if e.kind() == io::ErrorKind::Interrupted)
    }
}
