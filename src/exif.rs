//! TIFF/Exif decoding: the IFD walker, tag materialization and the
//! normalized [`Exif`] record.

use crate::{parser::DecodeOptions, reader::ReadAt};

pub use gps::{GpsInfo, LatLng};
pub use header::TiffHeader;
pub use ifd::{IfdId, IfdKind, Tag, TagKey, TagMap};
pub use makernote::{MakerNote, NikonMakerNote, SonyMakerNote};
pub use record::{Dates, Exif, Exposure, ImageRegion, LensInfo, XmpHeader};
pub use tags::{tag_name, ExifTag, GpsTag, InteropTag};
pub use walker::DEFAULT_MAX_IFD_ENTRIES;

pub(crate) use header::{check_exif_header, EXIF_IDENT, TIFF_HEADER_SIZE};
pub(crate) use makernote::{decode_canon, decode_maker_note};
pub(crate) use walker::IfdWalker;

mod gps;
mod header;
mod ifd;
mod makernote;
mod record;
pub(crate) mod tags;
mod walker;

/// Walks the TIFF structure described by `header` and returns the filled
/// record, maker note included.
#[tracing::instrument(skip(reader, opts))]
pub(crate) fn read_exif<R: ReadAt + ?Sized>(
    reader: &R,
    header: TiffHeader,
    opts: &DecodeOptions,
) -> crate::Result<Exif> {
    let mut exif = Exif::new(header);
    let maker_note = {
        let mut walker = IfdWalker::new(reader, &mut exif, opts.max_ifd_entries);
        walker.walk_tiff(&header)?;
        walker.maker_note
    };
    decode_maker_note(reader, &mut exif, maker_note, opts)?;
    exif.finish();
    tracing::debug!(tags = exif.tags.len(), image_type = %exif.image_type, "exif decoded");
    Ok(exif)
}
