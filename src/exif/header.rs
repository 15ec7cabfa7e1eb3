use std::fmt::Debug;

use nom::{
    branch::alt, bytes::complete::tag, combinator, number::Endianness, sequence, IResult,
};

use crate::{file::ImageType, reader::ByteOrder};

pub(crate) const EXIF_IDENT: &str = "Exif\0\0";

/// Size of the TIFF header: byte order, magic and first IFD offset.
pub(crate) const TIFF_HEADER_SIZE: usize = 8;

const TIFF_MAGIC: u16 = 0x2a;
// Panasonic RW2 uses its own magic in place of 42.
const RW2_MAGIC: u16 = 0x55;

/// Location and byte order of a TIFF structure inside a source.
///
/// `tiff_header_offset` is the absolute position of the `II`/`MM` marker;
/// every offset found inside the TIFF structure is relative to it.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct TiffHeader {
    pub byte_order: ByteOrder,
    pub first_ifd_offset: u32,
    pub tiff_header_offset: u32,
    /// Length of the Exif payload starting at the header, 0 if unknown.
    pub exif_payload_length: u32,
    pub image_type: ImageType,
}

impl Debug for TiffHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiffHeader")
            .field("byte_order", &self.byte_order)
            .field("first_ifd_offset", &format!("{:#x}", self.first_ifd_offset))
            .field(
                "tiff_header_offset",
                &format!("{:#x}", self.tiff_header_offset),
            )
            .field("exif_payload_length", &self.exif_payload_length)
            .field("image_type", &self.image_type)
            .finish()
    }
}

impl TiffHeader {
    /// Parses the 8 header bytes. The returned header has a zero
    /// `tiff_header_offset`; callers locate it with [`Self::at`].
    pub fn parse(input: &[u8]) -> IResult<&[u8], TiffHeader> {
        use nom::number::complete::{u16, u32};
        let (remain, endian) = TiffHeader::parse_endian(input)?;
        let (remain, (_, offset)) = sequence::tuple((
            combinator::verify(u16(endian), |magic| {
                *magic == TIFF_MAGIC || *magic == RW2_MAGIC
            }),
            u32(endian),
        ))(remain)?;

        let header = Self {
            byte_order: endian.into(),
            first_ifd_offset: offset,
            ..Default::default()
        };

        Ok((remain, header))
    }

    pub fn at(mut self, tiff_header_offset: u32, exif_payload_length: u32) -> Self {
        self.tiff_header_offset = tiff_header_offset;
        self.exif_payload_length = exif_payload_length;
        self
    }

    pub fn with_image_type(mut self, image_type: ImageType) -> Self {
        self.image_type = image_type;
        self
    }

    fn parse_endian(input: &[u8]) -> IResult<&[u8], Endianness> {
        combinator::map(alt((tag("MM"), tag("II"))), |endian_marker| {
            if endian_marker == b"MM" {
                Endianness::Big
            } else {
                Endianness::Little
            }
        })(input)
    }
}

pub(crate) fn check_exif_header(data: &[u8]) -> bool {
    tag::<_, _, nom::error::Error<_>>(EXIF_IDENT)(data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(b"MM\0*\0\0\0\x08", ByteOrder::BigEndian, 8)]
    #[test_case(b"II*\0\x10\0\0\0", ByteOrder::LittleEndian, 0x10)]
    #[test_case(b"IIU\0\x18\0\0\0", ByteOrder::LittleEndian, 0x18; "rw2")]
    fn header(data: &[u8], order: ByteOrder, first_ifd: u32) {
        let (remain, header) = TiffHeader::parse(data).unwrap();
        assert!(remain.is_empty());
        assert_eq!(header.byte_order, order);
        assert_eq!(header.first_ifd_offset, first_ifd);
        assert_eq!(header.tiff_header_offset, 0);
    }

    #[test_case(b"MM\0+\0\0\0\x08"; "bad magic")]
    #[test_case(b"XX\0*\0\0\0\x08"; "bad order")]
    #[test_case(b"II*\0"; "truncated")]
    fn bad_header(data: &[u8]) {
        TiffHeader::parse(data).unwrap_err();
    }

    #[test]
    fn exif_ident() {
        assert!(check_exif_header(b"Exif\0\0MM"));
        assert!(!check_exif_header(b"Exif\0"));
        assert!(!check_exif_header(b"http://ns.adobe.com/xap/1.0/\0"));
    }
}
