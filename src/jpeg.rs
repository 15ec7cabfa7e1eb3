use nom::{bytes::complete::tag, number, sequence::tuple, IResult};

use crate::{
    exif::{check_exif_header, read_exif, Exif, TiffHeader, XmpHeader, EXIF_IDENT, TIFF_HEADER_SIZE},
    file::ImageType,
    parser::DecodeOptions,
    reader::{read_exact_at, read_up_to, ReadAt},
};

const XMP_NAMESPACE: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const SCAN_CHUNK: usize = 4096;

/// A marker code is a byte following 0xFF that indicates the kind of marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerCode {
    // Start of Image
    Soi = 0xD8,

    // APP1 marker
    APP1 = 0xE1,

    // Start of Scan
    Sos = 0xDA,

    // End of Image
    Eoi = 0xD9,

    // Temporary use in arithmetic coding
    Tem = 0x01,
}

impl MarkerCode {
    fn code(self) -> u8 {
        self as u8
    }
}

// Markers that are not followed by a length.
fn is_standalone(code: u8) -> bool {
    code == MarkerCode::Soi.code()
        || code == MarkerCode::Eoi.code()
        || code == MarkerCode::Tem.code()
        || (0xD0..=0xD7).contains(&code)
}

/// One JPEG segment as found by [`scan_segments`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegSegment {
    pub marker: u8,
    /// Absolute position of the `0xFF` marker byte.
    pub offset: u64,
    /// Absolute position and length of the payload (after the length
    /// field). Standalone markers have an empty payload.
    pub payload_offset: u64,
    pub payload_len: u32,
}

/// What the header segments of a JPEG point at.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct JpegMeta {
    pub exif: Option<TiffHeader>,
    pub xmp: Option<XmpHeader>,
}

/// Reads the Exif of a JPEG, failing with [`crate::Error::NoExif`] when no
/// Exif APP1 segment precedes the first scan.
#[tracing::instrument(skip_all)]
pub(crate) fn read_jpeg<R: ReadAt + ?Sized>(
    reader: &R,
    opts: &DecodeOptions,
) -> crate::Result<Exif> {
    let meta = locate_metadata(reader)?;
    let header = meta.exif.ok_or(crate::Error::NoExif)?;
    let mut exif = read_exif(reader, header, opts)?;
    exif.image_type = ImageType::JPEG;
    exif.xmp = meta.xmp;
    Ok(exif)
}

/// Walks the segments from SOI up to SOS (or EOI) and records the first
/// Exif and XMP APP1 payloads.
#[tracing::instrument(skip_all)]
pub(crate) fn locate_metadata<R: ReadAt + ?Sized>(reader: &R) -> crate::Result<JpegMeta> {
    check_soi(reader)?;

    let mut meta = JpegMeta::default();
    let mut pos = 2u64;
    loop {
        let (segment, next) = read_segment(reader, pos)?;
        tracing::debug!(marker = format!("0x{:02x}", segment.marker), offset = segment.offset, "segment");

        if segment.marker == MarkerCode::Sos.code() || segment.marker == MarkerCode::Eoi.code() {
            break;
        }
        if segment.marker == MarkerCode::APP1.code() {
            classify_app1(reader, &segment, &mut meta)?;
        }
        pos = next;
    }
    Ok(meta)
}

fn classify_app1<R: ReadAt + ?Sized>(
    reader: &R,
    segment: &JpegSegment,
    meta: &mut JpegMeta,
) -> crate::Result<()> {
    let mut prefix = [0u8; 29];
    let n = read_up_to(reader, &mut prefix, segment.payload_offset)?;
    let prefix = &prefix[..n.min(segment.payload_len as usize)];

    if meta.exif.is_none() && check_exif_header(prefix) {
        let ident = EXIF_IDENT.len();
        if prefix.len() < ident + TIFF_HEADER_SIZE {
            tracing::warn!(offset = segment.offset, "exif segment is too short");
            return Ok(());
        }
        let (_, header) = TiffHeader::parse(&prefix[ident..ident + TIFF_HEADER_SIZE])?;
        let origin = segment.payload_offset + ident as u64;
        let origin = u32::try_from(origin).map_err(|_| crate::Error::ReadNegativeOffset)?;
        meta.exif = Some(
            header
                .at(origin, segment.payload_len - ident as u32)
                .with_image_type(ImageType::JPEG),
        );
        tracing::debug!(header = ?meta.exif, "exif found");
    } else if meta.xmp.is_none() && prefix.starts_with(XMP_NAMESPACE) {
        let ns = XMP_NAMESPACE.len() as u64;
        meta.xmp = Some(XmpHeader {
            offset: segment.payload_offset + ns,
            length: segment.payload_len as u64 - ns,
        });
        tracing::debug!(xmp = ?meta.xmp, "xmp found");
    }
    Ok(())
}

/// Lists every segment of the file, scanning past entropy-coded data after
/// each SOS, until EOI or the end of the data.
#[tracing::instrument(skip_all)]
pub fn scan_segments<R: ReadAt + ?Sized>(reader: &R) -> crate::Result<Vec<JpegSegment>> {
    check_soi(reader)?;

    let mut segments = vec![JpegSegment {
        marker: MarkerCode::Soi.code(),
        offset: 0,
        payload_offset: 2,
        payload_len: 0,
    }];
    let mut pos = 2u64;
    loop {
        let (segment, next) = match read_segment(reader, pos) {
            Ok(s) => s,
            // Trailing garbage after the last segment.
            Err(crate::Error::NotEnoughData { .. }) => break,
            Err(e) => return Err(e),
        };
        segments.push(segment);

        if segment.marker == MarkerCode::Eoi.code() {
            break;
        }
        pos = if segment.marker == MarkerCode::Sos.code() {
            match skip_entropy_coded(reader, next)? {
                Some(p) => p,
                None => break,
            }
        } else {
            next
        };
    }
    Ok(segments)
}

fn check_soi<R: ReadAt + ?Sized>(reader: &R) -> crate::Result<()> {
    let mut soi = [0u8; 2];
    read_exact_at(reader, &mut soi, 0)?;
    let (_, code) = marker(&soi).map_err(|_| crate::Error::ExpectedMarker(0))?;
    if code != MarkerCode::Soi.code() {
        return Err(crate::Error::InvalidHeader("SOI marker not found"));
    }
    Ok(())
}

fn marker(input: &[u8]) -> IResult<&[u8], u8> {
    let (remain, (_, code)) = tuple((tag([0xFF]), number::complete::u8))(input)?;
    Ok((remain, code))
}

/// Reads the segment whose marker starts at `pos` and returns it with the
/// position following it.
fn read_segment<R: ReadAt + ?Sized>(reader: &R, mut pos: u64) -> crate::Result<(JpegSegment, u64)> {
    let mut head = [0u8; 2];
    read_exact_at(reader, &mut head, pos)?;
    let (_, mut code) = marker(&head).map_err(|_| crate::Error::ExpectedMarker(pos))?;

    // Any number of 0xFF fill bytes may precede the marker code.
    while code == 0xFF {
        pos += 1;
        read_exact_at(reader, &mut head, pos)?;
        code = head[1];
    }

    if is_standalone(code) {
        let segment = JpegSegment {
            marker: code,
            offset: pos,
            payload_offset: pos + 2,
            payload_len: 0,
        };
        return Ok((segment, pos + 2));
    }

    read_exact_at(reader, &mut head, pos + 2)?;
    // The length counts its own two bytes.
    let size = u16::from_be_bytes(head);
    if size < 2 {
        return Err(crate::Error::InvalidHeader("JPEG segment length is below 2"));
    }
    let segment = JpegSegment {
        marker: code,
        offset: pos,
        payload_offset: pos + 4,
        payload_len: size as u32 - 2,
    };
    Ok((segment, pos + 2 + size as u64))
}

/// Finds the next marker after entropy-coded data: a 0xFF that is neither
/// stuffed (`FF 00`) nor a restart marker.
fn skip_entropy_coded<R: ReadAt + ?Sized>(reader: &R, start: u64) -> crate::Result<Option<u64>> {
    let mut buf = vec![0u8; SCAN_CHUNK];
    let mut pos = start;
    loop {
        let n = read_up_to(reader, &mut buf, pos)?;
        if n < 2 {
            return Ok(None);
        }
        let found = buf[..n].windows(2).position(|w| {
            w[0] == 0xFF && w[1] != 0x00 && w[1] != 0xFF && !(0xD0..=0xD7).contains(&w[1])
        });
        if let Some(i) = found {
            return Ok(Some(pos + i as u64));
        }
        // Overlap by one byte so that a marker split across chunks is seen.
        pos += n as u64 - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        reader::ByteOrder,
        testkit::{jpeg_with, TiffBuilder, Val},
    };

    fn tiff() -> Vec<u8> {
        TiffBuilder::new(ByteOrder::BigEndian)
            .root(0x010f, Val::ascii("Canon"))
            .root(0x0110, Val::ascii("Canon EOS 6D"))
            .exif(0x8827, Val::Short(vec![500]))
            .build()
    }

    #[test]
    fn exif_and_xmp_found() {
        let tiff = tiff();
        let data = jpeg_with(Some(&tiff), Some("<x:xmpmeta/>"));
        let meta = locate_metadata(&data).unwrap();

        let header = meta.exif.unwrap();
        // SOI(2) + APP0(18) + marker and length(4) + "Exif\0\0"(6)
        assert_eq!(header.tiff_header_offset, 30);
        assert_eq!(header.byte_order, ByteOrder::BigEndian);
        assert_eq!(header.exif_payload_length as usize, tiff.len());
        assert_eq!(&data[30..32], b"MM");

        let xmp = meta.xmp.unwrap();
        let start = xmp.offset as usize;
        assert_eq!(&data[start..start + xmp.length as usize], b"<x:xmpmeta/>");
    }

    #[test]
    fn read_exif_from_jpeg() {
        let data = jpeg_with(Some(&tiff()), None);
        let exif = read_jpeg(&data, &DecodeOptions::default()).unwrap();
        assert_eq!(exif.image_type, ImageType::JPEG);
        assert_eq!(exif.model.as_deref(), Some("Canon EOS 6D"));
        assert_eq!(exif.exposure.iso, Some(500));
        assert!(exif.xmp.is_none());
    }

    #[test]
    fn no_exif_before_sos() {
        let data = jpeg_with(None, Some("<x:xmpmeta/>"));
        assert!(matches!(
            read_jpeg(&data, &DecodeOptions::default()),
            Err(crate::Error::NoExif)
        ));
    }

    #[test]
    fn expected_marker() {
        let mut data = jpeg_with(None, None);
        // Corrupt the APP0 marker.
        data[2] = 0x00;
        assert!(matches!(
            locate_metadata(&data),
            Err(crate::Error::ExpectedMarker(2))
        ));
    }

    #[test]
    fn full_segment_walk() {
        let data = jpeg_with(Some(&tiff()), None);
        let markers: Vec<u8> = scan_segments(&data)
            .unwrap()
            .iter()
            .map(|s| s.marker)
            .collect();
        assert_eq!(markers, [0xD8, 0xE0, 0xE1, 0xDB, 0xDA, 0xD9]);
    }
}
