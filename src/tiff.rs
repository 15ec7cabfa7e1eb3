use crate::{
    exif::{read_exif, Exif, TiffHeader, TIFF_HEADER_SIZE},
    file::ImageType,
    parser::DecodeOptions,
    reader::{read_exact_at, ReadAt},
};

/// Reads a TIFF-based file (TIFF, CR2, NEF, ARW, DNG, RW2) whose header
/// sits at offset 0.
///
/// A plain TIFF may come back as NEF, ARW or DNG once the maker note or
/// the DNG version tag has been seen.
#[tracing::instrument(skip(reader, opts))]
pub(crate) fn read_tiff<R: ReadAt + ?Sized>(
    reader: &R,
    image_type: ImageType,
    opts: &DecodeOptions,
) -> crate::Result<Exif> {
    let mut buf = [0u8; TIFF_HEADER_SIZE];
    read_exact_at(reader, &mut buf, 0)?;
    let (_, header) = TiffHeader::parse(&buf)
        .map_err(|_| crate::Error::InvalidHeader("TIFF byte order or magic is invalid"))?;

    let length = reader
        .size()
        .and_then(|s| u32::try_from(s).ok())
        .unwrap_or_default();
    let header = header.at(0, length).with_image_type(image_type);
    tracing::debug!(?header, "tiff header");

    read_exif(reader, header, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        reader::ByteOrder,
        testkit::{TiffBuilder, Val},
    };

    #[test]
    fn ifd0_failure_is_fatal() {
        // IFD0 claims 300 entries.
        let mut data = b"II\x2a\0\x08\0\0\0".to_vec();
        data.extend(300u16.to_le_bytes());
        data.resize(64, 0);
        assert!(matches!(
            read_tiff(&data, ImageType::TIFF, &DecodeOptions::default()),
            Err(crate::Error::IfdBufferLength(300))
        ));
    }

    #[test]
    fn bad_magic() {
        let data = b"II\x2b\0\x08\0\0\0\0\0\0\0\0\0\0\0".to_vec();
        assert!(matches!(
            read_tiff(&data, ImageType::TIFF, &DecodeOptions::default()),
            Err(crate::Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn thumbnail_in_ifd1() {
        let data = TiffBuilder::new(ByteOrder::BigEndian)
            .root(0x010f, Val::ascii("NIKON CORPORATION"))
            .ifd1(0x0201, Val::Long(vec![0x400]))
            .ifd1(0x0202, Val::Long(vec![0x1234]))
            .build();
        let exif = read_tiff(&data, ImageType::TIFF, &DecodeOptions::default()).unwrap();
        assert_eq!(exif.header.byte_order, ByteOrder::BigEndian);
        let thumb = exif.thumbnail.unwrap();
        assert_eq!((thumb.offset, thumb.length), (0x400, 0x1234));
        // No maker note: the type stays TIFF.
        assert_eq!(exif.image_type, ImageType::TIFF);
    }
}
