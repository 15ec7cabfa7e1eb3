//! nom-imagemeta decodes Exif metadata and camera maker notes from photo
//! files, written in pure Rust with [nom](https://github.com/rust-bakery/nom).
//!
//! ## Key Features
//!
//! - Image type sniffing: the container is detected from its first bytes,
//!   no need to look at file extensions.
//!
//! - One flat record: every supported container is decoded into the same
//!   [`Exif`] record, holding camera identity, exposure, lens, dates, GPS,
//!   and the full tag map.
//!
//! - First-class Canon maker notes: camera settings, shot info, the
//!   per-model CameraInfo layouts, AF points, lens identification, Original
//!   Decision Data, creative filters and CR3 timed metadata, see
//!   [`canon`]. Nikon and Sony maker notes are recognized and their IFDs
//!   read.
//!
//! - Random access reads: sources implement [`ReadAt`], so that only the
//!   bytes that hold metadata are ever read, and a source can be shared by
//!   several decodes.
//!
//! - Robustness: malformed tags and maker notes are logged (with
//!   [tracing](https://docs.rs/tracing)) and skipped instead of failing the
//!   whole decode.
//!
//! ## Supported File Types
//!
//! - *.jpg, *.jpeg
//! - *.tif, *.tiff, and the TIFF based raw formats: *.cr2, *.nef, *.arw,
//!   *.dng, *.rw2
//! - *.cr3
//! - *.heic, *.heif, *.hif
//! - *.png
//! - *.webp
//!
//! ## Usage
//!
//! ```rust,no_run
//! use nom_imagemeta::*;
//! use std::fs::File;
//!
//! fn main() -> Result<()> {
//!     let f = File::open("./testdata/canon-r6.cr3")?;
//!     let exif = decode(&f)?;
//!
//!     println!("{:?} {:?}", exif.make, exif.model);
//!     println!("ISO {:?} f/{:?}", exif.exposure.iso, exif.exposure.aperture());
//!     if let Some(canon) = exif.maker_note.as_canon() {
//!         println!("{:?} {:?}", canon.model_name(), canon.lens_name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! A [`MetaParser`] keeps its buffers between decodes, reuse one when
//! decoding many files:
//!
//! ```rust,no_run
//! use nom_imagemeta::*;
//! use std::fs::File;
//!
//! fn main() -> Result<()> {
//!     let mut parser = MetaParser::with_options(DecodeOptions::new().decode_maker_notes(false));
//!     for path in ["a.jpg", "b.heic"] {
//!         let exif = parser.parse(&File::open(path)?)?;
//!         println!("{path}: {:?}", exif.dates.original);
//!     }
//!     Ok(())
//! }
//! ```

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

pub use exif::{
    tag_name, Dates, Exif, ExifTag, Exposure, GpsInfo, GpsTag, IfdId, IfdKind, ImageRegion,
    InteropTag, LatLng, LensInfo, MakerNote, NikonMakerNote, SonyMakerNote, Tag, TagKey, TagMap,
    TiffHeader, XmpHeader, DEFAULT_MAX_IFD_ENTRIES,
};
pub use file::{sniff, ImageType};
pub use jpeg::{scan_segments, JpegSegment};
pub use parser::{
    decode, decode_cr3, decode_heif, decode_jpeg, decode_png, decode_tiff, decode_webp,
    decode_with, DecodeOptions, MetaParser,
};
pub use reader::{ByteOrder, ReadAt};
pub use values::{EntryValue, IRational, Rational, TagType, URational};

pub mod canon;

mod bbox;
mod buffer;
mod cr3;
mod error;
mod exif;
mod file;
mod heif;
mod jpeg;
mod parser;
mod png;
mod reader;
mod tiff;
mod utils;
mod values;
mod webp;

#[cfg(test)]
mod testkit;
