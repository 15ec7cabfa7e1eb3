use nom::{
    bytes::complete::take,
    number::complete::{be_u32, u8},
    sequence::tuple,
    IResult,
};

use crate::{
    exif::{check_exif_header, read_exif, Exif, TiffHeader, XmpHeader, EXIF_IDENT, TIFF_HEADER_SIZE},
    file::ImageType,
    parser::DecodeOptions,
    reader::{read_exact_at, read_up_to, ReadAt},
    utils::parse_cstr,
};

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const XMP_KEYWORD: &str = "XML:com.adobe.xmp";
// Enough for the keyword, flags, language tag and translated keyword of
// an iTXt chunk.
const ITXT_PREFIX_LEN: usize = 512;
const MAX_CHUNKS: usize = 4096;

#[derive(Debug, Clone, Copy)]
struct Chunk {
    kind: [u8; 4],
    data_offset: u64,
    len: u32,
}

impl Chunk {
    // length + type + data + crc
    fn next(&self) -> u64 {
        self.data_offset + self.len as u64 + 4
    }
}

fn chunk_header(input: &[u8]) -> IResult<&[u8], (u32, &[u8])> {
    tuple((be_u32, take(4usize)))(input)
}

#[tracing::instrument(skip_all)]
pub(crate) fn read_png<R: ReadAt + ?Sized>(reader: &R, opts: &DecodeOptions) -> crate::Result<Exif> {
    let mut sig = [0u8; 8];
    read_exact_at(reader, &mut sig, 0)?;
    if sig != PNG_SIGNATURE {
        return Err(crate::Error::InvalidHeader("PNG signature not found"));
    }

    let mut header = None;
    let mut xmp = None;
    let mut dimensions = None;
    let mut pos = PNG_SIGNATURE.len() as u64;

    for _ in 0..MAX_CHUNKS {
        let mut head = [0u8; 8];
        if read_up_to(reader, &mut head, pos)? < head.len() {
            break;
        }
        let (_, (len, kind)) = chunk_header(&head)?;
        let chunk = Chunk {
            kind: [kind[0], kind[1], kind[2], kind[3]],
            data_offset: pos + 8,
            len,
        };
        tracing::debug!(kind = %String::from_utf8_lossy(&chunk.kind), len, "chunk");

        match &chunk.kind {
            b"IHDR" => {
                let mut wh = [0u8; 8];
                read_exact_at(reader, &mut wh, chunk.data_offset)?;
                let (_, (w, h)) = tuple((be_u32, be_u32))(&wh[..])?;
                dimensions = Some((w, h));
            }
            b"eXIf" if header.is_none() => header = Some(exif_chunk(reader, &chunk)?),
            b"iTXt" if xmp.is_none() => xmp = xmp_chunk(reader, &chunk)?,
            b"IEND" => break,
            _ => (),
        }
        pos = chunk.next();
    }

    let header = header.ok_or(crate::Error::NoExif)?;
    let mut exif = read_exif(reader, header, opts)?;
    exif.image_type = ImageType::PNG;
    exif.xmp = xmp;
    if let (Some((w, h)), 0) = (dimensions, exif.image_width) {
        exif.image_width = w;
        exif.image_height = h;
    }
    Ok(exif)
}

// The TIFF header either starts the chunk or follows "Exif\0\0".
fn exif_chunk<R: ReadAt + ?Sized>(reader: &R, chunk: &Chunk) -> crate::Result<TiffHeader> {
    let mut prefix = [0u8; 14];
    let n = read_up_to(reader, &mut prefix, chunk.data_offset)?;
    let prefix = &prefix[..n.min(chunk.len as usize)];
    let skip = if check_exif_header(prefix) {
        EXIF_IDENT.len()
    } else {
        0
    };
    let tiff = prefix
        .get(skip..skip + TIFF_HEADER_SIZE)
        .ok_or(crate::Error::InvalidHeader("eXIf chunk is too short"))?;
    let (_, header) = TiffHeader::parse(tiff)?;
    let origin = u32::try_from(chunk.data_offset + skip as u64)
        .map_err(|_| crate::Error::ReadNegativeOffset)?;
    Ok(header
        .at(origin, chunk.len - skip as u32)
        .with_image_type(ImageType::PNG))
}

fn xmp_chunk<R: ReadAt + ?Sized>(reader: &R, chunk: &Chunk) -> crate::Result<Option<XmpHeader>> {
    let mut buf = vec![0u8; ITXT_PREFIX_LEN.min(chunk.len as usize)];
    read_exact_at(reader, &mut buf, chunk.data_offset)?;

    let Ok((_, consumed)) = itxt_text_start(&buf) else {
        return Ok(None);
    };
    let Some(consumed) = consumed else {
        return Ok(None);
    };
    Ok(Some(XmpHeader {
        offset: chunk.data_offset + consumed as u64,
        length: (chunk.len as usize).saturating_sub(consumed) as u64,
    }))
}

/// Position of the text of an uncompressed XMP iTXt chunk: keyword,
/// compression flag and method, language tag, translated keyword.
fn itxt_text_start(input: &[u8]) -> IResult<&[u8], Option<usize>> {
    let (remain, keyword) = parse_cstr(input)?;
    let (remain, (compressed, _method)) = tuple((u8, u8))(remain)?;
    let (remain, _lang) = parse_cstr(remain)?;
    let (remain, _translated) = parse_cstr(remain)?;
    if keyword != XMP_KEYWORD || compressed != 0 {
        return Ok((remain, None));
    }
    Ok((remain, Some(input.len() - remain.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        reader::ByteOrder,
        testkit::{TiffBuilder, Val},
    };

    fn chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = (data.len() as u32).to_be_bytes().to_vec();
        out.extend_from_slice(kind);
        out.extend_from_slice(data);
        out.extend_from_slice(&[0, 0, 0, 0]);
        out
    }

    fn png(exif_prefix: &[u8]) -> Vec<u8> {
        let tiff = TiffBuilder::new(ByteOrder::LittleEndian)
            .root(0x010f, Val::ascii("Apple"))
            .build();
        let mut exif = exif_prefix.to_vec();
        exif.extend(tiff);

        let mut ihdr = 640u32.to_be_bytes().to_vec();
        ihdr.extend(480u32.to_be_bytes());
        ihdr.extend([8, 2, 0, 0, 0]);

        let mut itxt = b"XML:com.adobe.xmp\0\0\0\0\0".to_vec();
        itxt.extend(b"<x:xmpmeta/>");

        let mut out = PNG_SIGNATURE.to_vec();
        out.extend(chunk(b"IHDR", &ihdr));
        out.extend(chunk(b"iTXt", &itxt));
        out.extend(chunk(b"eXIf", &exif));
        out.extend(chunk(b"IDAT", &[1, 2, 3]));
        out.extend(chunk(b"IEND", &[]));
        out
    }

    #[test]
    fn exif_xmp_and_dimensions() {
        for prefix in [&b""[..], b"Exif\0\0"] {
            let data = png(prefix);
            let exif = read_png(&data, &DecodeOptions::default()).unwrap();
            assert_eq!(exif.image_type, ImageType::PNG);
            assert_eq!(exif.make.as_deref(), Some("Apple"));
            assert_eq!((exif.image_width, exif.image_height), (640, 480));
            let xmp = exif.xmp.unwrap();
            let start = xmp.offset as usize;
            assert_eq!(&data[start..start + xmp.length as usize], b"<x:xmpmeta/>");
        }
    }

    #[test]
    fn no_exif_chunk() {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend(chunk(b"IEND", &[]));
        assert!(matches!(
            read_png(&data, &DecodeOptions::default()),
            Err(crate::Error::NoExif)
        ));
    }
}
