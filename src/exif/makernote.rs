//! Maker-note dispatch.
//!
//! The MakerNote tag of the Exif IFD is only located during the walk. Once
//! the walk is over, `Make` is known and the payload is handed to the
//! vendor specific reader selected here.

use crate::{
    canon::CanonMakerNote,
    file::ImageType,
    parser::DecodeOptions,
    reader::{read_up_to, ByteOrder, ReadAt, TiffCursor},
};

use super::{
    header::{TiffHeader, TIFF_HEADER_SIZE},
    ifd::IfdId,
    record::Exif,
    walker::{IfdWalker, MakerNoteLocation},
};

const NIKON_IDENT: &[u8] = b"Nikon\0";
// "Nikon\0", a 2-byte version and 2 reserved bytes precede the TIFF header.
const NIKON_TIFF_OFFSET: u32 = 10;
const SONY_IDENTS: &[&[u8]] = &[b"SONY DSC \0\0\0", b"SONY CAM \0\0\0"];
const SONY_HEADER_LEN: u32 = 12;

/// The decoded maker note, tagged by vendor.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MakerNote {
    #[default]
    None,
    Canon(Box<CanonMakerNote>),
    Nikon(NikonMakerNote),
    Sony(SonyMakerNote),
}

impl MakerNote {
    pub fn as_canon(&self) -> Option<&CanonMakerNote> {
        match self {
            MakerNote::Canon(c) => Some(c),
            _ => None,
        }
    }
}

/// A Nikon type-3 maker note: an embedded TIFF structure with its own byte
/// order and origin. Its tags are stored in the MakerNote IFD.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NikonMakerNote {
    pub version: [u8; 2],
    pub byte_order: ByteOrder,
    /// Absolute position of the embedded TIFF header.
    pub tiff_header_offset: u64,
    pub first_ifd_offset: u32,
}

/// A Sony maker note. Offsets inside it are relative to the main TIFF
/// header.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SonyMakerNote {
    pub has_header: bool,
    /// Absolute position of the maker-note IFD.
    pub ifd_offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vendor {
    Canon,
    Nikon,
    Sony,
}

impl Vendor {
    fn detect(make: Option<&str>, prefix: &[u8]) -> Option<Vendor> {
        if prefix.starts_with(NIKON_IDENT) {
            return Some(Vendor::Nikon);
        }
        if SONY_IDENTS.iter().any(|id| prefix.starts_with(id)) {
            return Some(Vendor::Sony);
        }
        let make = make?.trim().to_ascii_lowercase();
        if make.starts_with("canon") {
            Some(Vendor::Canon)
        } else if make.starts_with("nikon") {
            Some(Vendor::Nikon)
        } else if make.starts_with("sony") {
            Some(Vendor::Sony)
        } else {
            None
        }
    }
}

/// Decodes the maker note found during the walk, if any.
///
/// Failures are logged and the maker note is left out; only a cancelled
/// read is returned.
#[tracing::instrument(skip_all)]
pub(crate) fn decode_maker_note<R: ReadAt + ?Sized>(
    reader: &R,
    exif: &mut Exif,
    location: Option<MakerNoteLocation>,
    opts: &DecodeOptions,
) -> crate::Result<()> {
    let Some(location) = location else {
        return Ok(());
    };
    if !opts.decode_maker_notes {
        tracing::debug!("maker note decoding is disabled");
        return Ok(());
    }

    match dispatch(reader, exif, location, opts) {
        Ok(()) => Ok(()),
        Err(e) if e.is_cancelled() => Err(e),
        Err(e) => {
            tracing::warn!(?e, "skip maker note");
            Ok(())
        }
    }
}

fn dispatch<R: ReadAt + ?Sized>(
    reader: &R,
    exif: &mut Exif,
    location: MakerNoteLocation,
    opts: &DecodeOptions,
) -> crate::Result<()> {
    let mut prefix = [0u8; 18];
    let n = read_up_to(reader, &mut prefix, location.absolute()?)?;
    let prefix = &prefix[..n.min(location.length as usize)];

    let Some(vendor) = Vendor::detect(exif.make.as_deref(), prefix) else {
        tracing::debug!(make = ?exif.make, "maker note vendor is not supported");
        return Ok(());
    };
    tracing::debug!(?vendor, offset = location.absolute()?, "maker note");

    match vendor {
        Vendor::Canon => {
            let mut walker = IfdWalker::new(reader, exif, opts.max_ifd_entries);
            walker.walk_single(location.cursor, location.offset, IfdId::MAKER_NOTE)?;
            decode_canon(reader, exif, opts)
        }
        Vendor::Nikon => {
            // The file is a NEF even when the note itself is unreadable.
            promote(exif, ImageType::NEF);
            let note = nikon_header(prefix, location)?;
            exif.maker_note = MakerNote::Nikon(note);
            let cursor = TiffCursor::new(note.tiff_header_offset, note.byte_order);
            let mut walker = IfdWalker::new(reader, exif, opts.max_ifd_entries);
            walker.walk_single(cursor, note.first_ifd_offset, IfdId::MAKER_NOTE)
        }
        Vendor::Sony => {
            promote(exif, ImageType::ARW);
            let has_header = SONY_IDENTS.iter().any(|id| prefix.starts_with(id));
            let offset = if has_header {
                location.offset.saturating_add(SONY_HEADER_LEN)
            } else {
                location.offset
            };
            exif.maker_note = MakerNote::Sony(SonyMakerNote {
                has_header,
                ifd_offset: location.cursor.absolute(offset)?,
            });
            let mut walker = IfdWalker::new(reader, exif, opts.max_ifd_entries);
            walker.walk_single(location.cursor, offset, IfdId::MAKER_NOTE)
        }
    }
}

/// Runs the Canon decoders over the MakerNote IFD tags already in `exif`.
pub(crate) fn decode_canon<R: ReadAt + ?Sized>(
    reader: &R,
    exif: &mut Exif,
    opts: &DecodeOptions,
) -> crate::Result<()> {
    let note = CanonMakerNote::decode(reader, exif, opts)?;
    if exif.lens.id.is_none() {
        exif.lens.id = note.lens_type;
    }
    if exif.lens.model.is_none() {
        exif.lens.model = note.lens_name.clone();
    }
    exif.maker_note = MakerNote::Canon(Box::new(note));
    Ok(())
}

fn promote(exif: &mut Exif, to: ImageType) {
    if exif.image_type == ImageType::TIFF {
        tracing::debug!(%to, "TIFF promoted");
        exif.image_type = to;
    }
}

// "Nikon\0" + version + 2 bytes, then the TIFF header at +10.
fn nikon_header(prefix: &[u8], location: MakerNoteLocation) -> crate::Result<NikonMakerNote> {
    let end = NIKON_TIFF_OFFSET as usize + TIFF_HEADER_SIZE;
    if !prefix.starts_with(NIKON_IDENT) || prefix.len() < end {
        return Err(crate::Error::NikonMkNote);
    }
    let (_, header) = TiffHeader::parse(&prefix[NIKON_TIFF_OFFSET as usize..end])
        .map_err(|_| crate::Error::NikonMkNote)?;
    Ok(NikonMakerNote {
        version: [prefix[6], prefix[7]],
        byte_order: header.byte_order,
        tiff_header_offset: location.cursor.absolute(location.offset + NIKON_TIFF_OFFSET)?,
        first_ifd_offset: header.first_ifd_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Some("Canon"), b"\x10\x00", Some(Vendor::Canon))]
    #[test_case(Some("NIKON CORPORATION"), b"\x10\x00", Some(Vendor::Nikon))]
    #[test_case(Some("SONY"), b"SONY DSC \0\0\0", Some(Vendor::Sony))]
    #[test_case(None, b"Nikon\0\x02\x10\0\0MM", Some(Vendor::Nikon); "nikon by header")]
    #[test_case(Some("FUJIFILM"), b"FUJIFILM", None)]
    fn vendor(make: Option<&str>, prefix: &[u8], expect: Option<Vendor>) {
        assert_eq!(Vendor::detect(make, prefix), expect);
    }

    fn location(offset: u32) -> MakerNoteLocation {
        MakerNoteLocation {
            cursor: TiffCursor::new(12, ByteOrder::LittleEndian),
            offset,
            length: 100,
        }
    }

    #[test]
    fn nikon_type3_header() {
        let prefix = b"Nikon\0\x02\x10\0\0MM\0\x2a\0\0\0\x08";
        let note = nikon_header(prefix, location(0x200)).unwrap();
        assert_eq!(note.byte_order, ByteOrder::BigEndian);
        assert_eq!(note.first_ifd_offset, 8);
        assert_eq!(note.tiff_header_offset, 12 + 0x200 + 10);
        assert_eq!(note.version, [0x02, 0x10]);
    }

    #[test]
    fn nikon_type1_has_no_tiff_header() {
        let prefix = b"Nikon\0\x01\0\x05\0\x02\0\x04\0\x01\0\0\0";
        assert!(matches!(
            nikon_header(prefix, location(0)),
            Err(crate::Error::NikonMkNote)
        ));
    }
}
