use nom::{
    bytes::complete::{tag, take},
    number::complete::{le_u24, le_u32},
    sequence::tuple,
    IResult,
};

use crate::{
    exif::{check_exif_header, read_exif, Exif, TiffHeader, XmpHeader, EXIF_IDENT, TIFF_HEADER_SIZE},
    file::ImageType,
    parser::DecodeOptions,
    reader::{read_exact_at, read_up_to, ReadAt},
};

const RIFF_HEADER_LEN: u64 = 12;
const MAX_CHUNKS: usize = 1024;

fn riff_header(input: &[u8]) -> IResult<&[u8], u32> {
    let (remain, (_, size, _)) = tuple((tag("RIFF"), le_u32, tag("WEBP")))(input)?;
    Ok((remain, size))
}

fn chunk_header(input: &[u8]) -> IResult<&[u8], (&[u8], u32)> {
    tuple((take(4usize), le_u32))(input)
}

// flags(1) + reserved(3) + canvas width - 1 (24 bits) + height - 1 (24 bits)
fn vp8x_canvas(input: &[u8]) -> IResult<&[u8], (u32, u32)> {
    let (remain, (_, w, h)) = tuple((take(4usize), le_u24, le_u24))(input)?;
    Ok((remain, (w + 1, h + 1)))
}

#[tracing::instrument(skip_all)]
pub(crate) fn read_webp<R: ReadAt + ?Sized>(reader: &R, opts: &DecodeOptions) -> crate::Result<Exif> {
    let mut head = [0u8; RIFF_HEADER_LEN as usize];
    read_exact_at(reader, &mut head, 0)?;
    let (_, riff_size) = riff_header(&head)?;
    let end = 8 + riff_size as u64;

    let mut header = None;
    let mut xmp = None;
    let mut canvas = None;
    let mut pos = RIFF_HEADER_LEN;

    for _ in 0..MAX_CHUNKS {
        if pos + 8 > end {
            break;
        }
        let mut buf = [0u8; 8];
        if read_up_to(reader, &mut buf, pos)? < buf.len() {
            break;
        }
        let (_, (fourcc, len)) = chunk_header(&buf)?;
        let data_offset = pos + 8;
        tracing::debug!(fourcc = %String::from_utf8_lossy(fourcc), len, "chunk");

        match fourcc {
            b"VP8X" => {
                let mut data = [0u8; 10];
                read_exact_at(reader, &mut data, data_offset)?;
                canvas = Some(vp8x_canvas(&data)?.1);
            }
            b"EXIF" if header.is_none() => {
                header = Some(exif_chunk(reader, data_offset, len)?);
            }
            b"XMP " if xmp.is_none() => {
                xmp = Some(XmpHeader {
                    offset: data_offset,
                    length: len as u64,
                });
            }
            _ => (),
        }
        // Chunks are padded to an even size.
        pos = data_offset + len as u64 + (len as u64 & 1);
    }

    let header = header.ok_or(crate::Error::NoExif)?;
    let mut exif = read_exif(reader, header, opts)?;
    exif.image_type = ImageType::WebP;
    exif.xmp = xmp;
    if let (Some((w, h)), 0) = (canvas, exif.image_width) {
        exif.image_width = w;
        exif.image_height = h;
    }
    Ok(exif)
}

fn exif_chunk<R: ReadAt + ?Sized>(reader: &R, data_offset: u64, len: u32) -> crate::Result<TiffHeader> {
    let mut prefix = [0u8; 14];
    let n = read_up_to(reader, &mut prefix, data_offset)?;
    let prefix = &prefix[..n.min(len as usize)];
    let skip = if check_exif_header(prefix) {
        EXIF_IDENT.len()
    } else {
        0
    };
    let tiff = prefix
        .get(skip..skip + TIFF_HEADER_SIZE)
        .ok_or(crate::Error::InvalidHeader("EXIF chunk is too short"))?;
    let (_, header) = TiffHeader::parse(tiff)?;
    let origin =
        u32::try_from(data_offset + skip as u64).map_err(|_| crate::Error::ReadNegativeOffset)?;
    Ok(header
        .at(origin, len - skip as u32)
        .with_image_type(ImageType::WebP))
}
