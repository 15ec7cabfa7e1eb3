use std::fmt::Display;

use nom::{bytes::complete, IResult};

use crate::reader::{read_up_to, ReadAt};

/// Number of bytes the sniffer needs to decide on an image type.
pub const SNIFF_LEN: usize = 16;

const HEIF_BRAND_NAMES: &[&[u8]] = &[
    b"heic", // the usual HEIF images
    b"heix", // 10bit images, or anything that uses h265 with range extension
    b"hevc", // 'hevx': brands for image sequences
    b"heim", // multiview
    b"heis", // scalable
    b"hevm", // multiview sequence
    b"hevs", // scalable sequence
    b"mif1", b"msf1", b"avif",
];

const JP2_SIGNATURE: &[u8] = &[0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20];
const RW2_MAGIC: &[u8] = &[0x88, 0xE7, 0x74, 0xD8];
const XMP_SIDECAR: &[u8] = b"<x:xmpmeta";

/// The container family of a source, as decided from its leading bytes.
///
/// `NEF`, `ARW` and `DNG` are never sniffed; a plain `TIFF` is specialized
/// into them once the metadata has been read.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageType {
    JPEG,
    PNG,
    TIFF,
    CR2,
    CR3,
    CRW,
    NEF,
    ARW,
    DNG,
    HEIF,
    PanaRaw,
    WebP,
    BMP,
    PSD,
    XMP,
    #[default]
    Unknown,
}

impl ImageType {
    /// Decides the image type from the first [`SNIFF_LEN`] bytes.
    pub fn from_bytes(input: &[u8]) -> crate::Result<ImageType> {
        if input.len() < SNIFF_LEN {
            return Err(crate::Error::InsufficientData);
        }
        Ok(sniff_bytes(input))
    }

    /// Whether the image is laid out as a TIFF file (header at offset 0).
    pub fn is_tiff_based(&self) -> bool {
        matches!(
            self,
            ImageType::TIFF
                | ImageType::CR2
                | ImageType::NEF
                | ImageType::ARW
                | ImageType::DNG
                | ImageType::PanaRaw
        )
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ImageType::JPEG => "image/jpeg",
            ImageType::PNG => "image/png",
            ImageType::TIFF => "image/tiff",
            ImageType::CR2 => "image/x-canon-cr2",
            ImageType::CR3 => "image/x-canon-cr3",
            ImageType::CRW => "image/x-canon-crw",
            ImageType::NEF => "image/x-nikon-nef",
            ImageType::ARW => "image/x-sony-arw",
            ImageType::DNG => "image/x-adobe-dng",
            ImageType::HEIF => "image/heif",
            ImageType::PanaRaw => "image/x-panasonic-raw",
            ImageType::WebP => "image/webp",
            ImageType::BMP => "image/bmp",
            ImageType::PSD => "image/vnd.adobe.photoshop",
            ImageType::XMP => "application/rdf+xml",
            ImageType::Unknown => "application/octet-stream",
        }
    }
}

impl Display for ImageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ImageType::JPEG => "JPEG",
            ImageType::PNG => "PNG",
            ImageType::TIFF => "TIFF",
            ImageType::CR2 => "CR2",
            ImageType::CR3 => "CR3",
            ImageType::CRW => "CRW",
            ImageType::NEF => "NEF",
            ImageType::ARW => "ARW",
            ImageType::DNG => "DNG",
            ImageType::HEIF => "HEIF",
            ImageType::PanaRaw => "RW2",
            ImageType::WebP => "WebP",
            ImageType::BMP => "BMP",
            ImageType::PSD => "PSD",
            ImageType::XMP => "XMP",
            ImageType::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Peeks at the start of `reader` and returns its image type. The reader
/// position is not affected since all reads are positioned.
#[tracing::instrument(skip_all)]
pub fn sniff<R: ReadAt + ?Sized>(reader: &R) -> crate::Result<ImageType> {
    let mut buf = [0u8; SNIFF_LEN];
    let n = read_up_to(reader, &mut buf, 0)?;
    let t = ImageType::from_bytes(&buf[..n])?;
    tracing::debug!(image_type = %t, "sniffed");
    Ok(t)
}

// Earliest match wins.
fn sniff_bytes(input: &[u8]) -> ImageType {
    if input.starts_with(&[0xFF, 0xD8]) || input.starts_with(JP2_SIGNATURE) {
        ImageType::JPEG
    } else if input.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        ImageType::PNG
    } else if input.starts_with(b"IIU\0") && &input[8..12] == RW2_MAGIC {
        ImageType::PanaRaw
    } else if input.starts_with(b"II*\0") || input.starts_with(b"MM\0*") {
        if &input[8..12] == b"CR\x02\0" {
            ImageType::CR2
        } else {
            ImageType::TIFF
        }
    } else if let Ok((_, brand)) = ftyp_brand(input) {
        if brand == b"crx " {
            ImageType::CR3
        } else if HEIF_BRAND_NAMES.contains(&brand) {
            ImageType::HEIF
        } else {
            ImageType::Unknown
        }
    } else if input.starts_with(b"II") && &input[6..14] == b"HEAPCCDR" {
        ImageType::CRW
    } else if input.starts_with(b"RIFF") && &input[8..12] == b"WEBP" {
        ImageType::WebP
    } else if input.starts_with(b"8BPS") {
        ImageType::PSD
    } else if input.starts_with(XMP_SIDECAR) {
        ImageType::XMP
    } else if input.starts_with(b"BM") {
        ImageType::BMP
    } else {
        ImageType::Unknown
    }
}

fn ftyp_brand(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (remain, _) = complete::take(4_usize)(input)?;
    let (remain, _) = complete::tag(b"ftyp")(remain)?;
    complete::take(4_usize)(remain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn padded(prefix: &[u8]) -> Vec<u8> {
        let mut v = prefix.to_vec();
        v.resize(SNIFF_LEN.max(v.len()), 0);
        v
    }

    #[test_case(&[0xFF, 0xD8, 0xFF, 0xE1], ImageType::JPEG)]
    #[test_case(&[0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20], ImageType::JPEG; "jp2")]
    #[test_case(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A], ImageType::PNG)]
    #[test_case(b"IIU\0\x18\0\0\0\x88\xE7\x74\xD8", ImageType::PanaRaw)]
    #[test_case(b"II*\0\x10\0\0\0CR\x02\0", ImageType::CR2)]
    #[test_case(b"II*\0\x08\0\0\0", ImageType::TIFF; "tiff le")]
    #[test_case(b"MM\0*\0\0\0\x08", ImageType::TIFF; "tiff be")]
    #[test_case(b"\0\0\0\x18ftypcrx \0\0\0\x01", ImageType::CR3)]
    #[test_case(b"\0\0\0\x18ftypheic\0\0\0\0", ImageType::HEIF)]
    #[test_case(b"\0\0\0\x18ftypmif1\0\0\0\0", ImageType::HEIF; "mif1")]
    #[test_case(b"\0\0\0\x18ftypisom\0\0\0\0", ImageType::Unknown; "mp4")]
    #[test_case(b"II\x1a\0\0\0HEAPCCDR", ImageType::CRW)]
    #[test_case(b"RIFF\0\0\0\0WEBPVP8X", ImageType::WebP)]
    #[test_case(b"8BPS\0\x01", ImageType::PSD)]
    #[test_case(b"<x:xmpmeta xmlns", ImageType::XMP)]
    #[test_case(b"BM\x36\0\0\0", ImageType::BMP)]
    #[test_case(b"GIF89a", ImageType::Unknown)]
    fn sniff_types(prefix: &[u8], expect: ImageType) {
        let data = padded(prefix);
        assert_eq!(sniff(&data).unwrap(), expect);
    }

    #[test]
    fn sniff_needs_16_bytes() {
        let data = vec![0xFFu8, 0xD8, 0xFF];
        assert!(matches!(sniff(&data), Err(crate::Error::InsufficientData)));
    }

    #[test]
    fn tiff_family() {
        assert!(ImageType::CR2.is_tiff_based());
        assert!(ImageType::PanaRaw.is_tiff_based());
        assert!(!ImageType::CR3.is_tiff_based());
        assert_eq!(ImageType::PanaRaw.to_string(), "RW2");
    }
}
