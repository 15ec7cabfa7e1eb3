use nom::number::complete::be_u32;

use crate::{
    bbox::{self, Boxes, ConstructionMethod, ItemLocation, MetaBox},
    buffer::load_at,
    exif::{read_exif, Exif, TiffHeader, XmpHeader, TIFF_HEADER_SIZE},
    file::ImageType,
    parser::DecodeOptions,
    reader::{read_exact_at, ReadAt},
};

/// Decodes the Exif item of a HEIF file.
///
/// The `meta` box is loaded into `buf`; the Exif item itself is read in
/// place. The item starts with a big-endian offset to the TIFF header,
/// counted from the end of that offset field.
#[tracing::instrument(skip_all)]
pub(crate) fn read_heif<R: ReadAt + ?Sized>(
    reader: &R,
    buf: &mut Vec<u8>,
    opts: &DecodeOptions,
) -> crate::Result<Exif> {
    let mut meta_box = None;
    for bbox in Boxes::new(reader) {
        let bbox = bbox?;
        if bbox.box_type == "meta" {
            meta_box = Some(bbox);
            break;
        }
    }
    let meta_box = meta_box.ok_or(crate::Error::NoExif)?;
    let body_len = usize::try_from(meta_box.body_size()).unwrap_or(usize::MAX);
    load_at(reader, buf, meta_box.body_offset(), body_len)?;

    let meta = MetaBox::parse(buf)?;
    let item = meta.item_of_type("Exif").ok_or(crate::Error::NoExif)?;
    let location = meta
        .location(item)
        .ok_or(crate::Error::ItemNotFound("Exif item location"))?;
    let (start, length) = item_extent(&meta, meta_box.body_offset(), location)?;

    let header = exif_item_header(reader, start, length)?;
    tracing::debug!(?header, item, "exif item");
    let mut exif = read_exif(reader, header, opts)?;
    exif.image_type = ImageType::HEIF;

    if let Some(xmp) = meta.xmp_item().and_then(|id| meta.location(id)) {
        match item_extent(&meta, meta_box.body_offset(), xmp) {
            Ok((offset, length)) => exif.xmp = Some(XmpHeader { offset, length }),
            Err(e) => tracing::warn!(?e, "xmp item"),
        }
    }

    let primary = meta.primary_item.unwrap_or(1);
    if let Some((w, h)) = meta.iprp.dimensions(primary) {
        exif.image_width = w;
        exif.image_height = h;
    }
    Ok(exif)
}

/// Absolute offset and length of an item.
fn item_extent(
    meta: &MetaBox,
    meta_body_offset: u64,
    location: &ItemLocation,
) -> crate::Result<(u64, u64)> {
    let (method, offset, length) = location.first_extent().ok_or_else(|| {
        crate::Error::from(bbox::Error::UnsupportedConstructionMethod(
            location.construction_method,
        ))
    })?;
    let start = match method {
        ConstructionMethod::FileOffset => offset,
        ConstructionMethod::IdatOffset => {
            let idat = meta
                .idat
                .as_ref()
                .ok_or(crate::Error::ItemNotFound("idat box"))?;
            meta_body_offset + idat.start as u64 + offset
        }
        ConstructionMethod::ItemOffset => {
            return Err(bbox::Error::UnsupportedConstructionMethod(2).into());
        }
    };
    Ok((start, length))
}

fn exif_item_header<R: ReadAt + ?Sized>(
    reader: &R,
    start: u64,
    length: u64,
) -> crate::Result<TiffHeader> {
    let mut prefix = [0u8; 4];
    read_exact_at(reader, &mut prefix, start)?;
    let (_, skip) = be_u32(&prefix[..])?;

    let tiff_start = start + 4 + skip as u64;
    if length != 0 && 4 + skip as u64 + TIFF_HEADER_SIZE as u64 > length {
        return Err(crate::Error::InvalidHeader("exif item is too short"));
    }
    let mut head = [0u8; TIFF_HEADER_SIZE];
    read_exact_at(reader, &mut head, tiff_start)?;
    let (_, header) = TiffHeader::parse(&head)?;

    let payload_len = if length != 0 {
        length - 4 - skip as u64
    } else {
        reader
            .size()
            .map(|size| size.saturating_sub(tiff_start))
            .unwrap_or_default()
    };
    let origin = u32::try_from(tiff_start).map_err(|_| crate::Error::ReadNegativeOffset)?;
    Ok(header
        .at(origin, u32::try_from(payload_len).unwrap_or(u32::MAX))
        .with_image_type(ImageType::HEIF))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        parser::decode,
        reader::ByteOrder,
        testkit::{bmff_box, bmff_full_box, ftyp, TiffBuilder, Val},
    };

    const TIFF_AT: usize = 0x1178;
    const XMP: &[u8] = b"<x:xmpmeta/>";

    fn infe(id: u16, item_type: &[u8; 4], content_type: &str) -> Vec<u8> {
        let mut body = id.to_be_bytes().to_vec();
        body.extend([0, 0]);
        body.extend(item_type);
        body.push(0);
        if !content_type.is_empty() {
            body.extend(content_type.as_bytes());
            body.push(0);
        }
        bmff_full_box(b"infe", 2, 0, &body)
    }

    // (id, construction method, offset, length)
    fn iloc(items: &[(u16, u16, u32, u32)]) -> Vec<u8> {
        let mut body = vec![0x44, 0x00];
        body.extend((items.len() as u16).to_be_bytes());
        for (id, method, offset, length) in items {
            body.extend(id.to_be_bytes());
            body.extend(method.to_be_bytes());
            body.extend([0, 0, 0, 1]);
            body.extend(offset.to_be_bytes());
            body.extend(length.to_be_bytes());
        }
        bmff_full_box(b"iloc", 1, 0, &body)
    }

    fn iprp(w: u32, h: u32) -> Vec<u8> {
        let mut ispe = w.to_be_bytes().to_vec();
        ispe.extend(h.to_be_bytes());
        let mut ipma = 1u32.to_be_bytes().to_vec();
        ipma.extend([0, 1, 1, 0x81]);

        let mut body = bmff_box(b"ipco", &bmff_full_box(b"ispe", 0, 0, &ispe));
        body.extend(bmff_full_box(b"ipma", 0, 0, &ipma));
        bmff_box(b"iprp", &body)
    }

    fn canon_6d_tiff() -> Vec<u8> {
        TiffBuilder::new(ByteOrder::BigEndian)
            .root(0x010f, Val::ascii("Canon"))
            .root(0x0110, Val::ascii("Canon EOS 6D"))
            .exif(0x829d, Val::Rational(vec![(5, 1)]))
            .exif(0x8827, Val::Short(vec![500]))
            .exif(0x9003, Val::ascii("2019:12:06 05:01:47"))
            .exif(0x920a, Val::Rational(vec![(20, 1)]))
            .build()
    }

    fn heif(exif_method: u16) -> Vec<u8> {
        let tiff = canon_6d_tiff();
        let mut item = 6u32.to_be_bytes().to_vec();
        item.extend(b"Exif\0\0");
        item.extend(&tiff);
        let item_at = TIFF_AT - 10;

        let mut iinf = 3u16.to_be_bytes().to_vec();
        iinf.extend(infe(1, b"hvc1", ""));
        iinf.extend(infe(2, b"Exif", ""));
        iinf.extend(infe(3, b"mime", "application/rdf+xml"));

        let mut meta = vec![0, 0, 0, 0];
        meta.extend(bmff_full_box(b"hdlr", 0, 0, &[0; 20]));
        meta.extend(bmff_full_box(b"pitm", 0, 0, &1u16.to_be_bytes()));
        meta.extend(bmff_full_box(b"iinf", 0, 0, &iinf));
        meta.extend(iloc(&[
            (2, exif_method, item_at as u32, item.len() as u32),
            (3, 1, 0, XMP.len() as u32),
        ]));
        meta.extend(iprp(5472, 3648));
        meta.extend(bmff_box(b"idat", XMP));

        let mut data = ftyp(b"heic");
        data.extend(bmff_box(b"meta", &meta));
        let pad = item_at - data.len() - 8;
        let mut mdat = vec![0; pad];
        mdat.extend(&item);
        data.extend(bmff_box(b"mdat", &mdat));
        data
    }

    #[test]
    fn canon_heif_scenario() {
        let data = heif(0);
        let exif = decode(&data).unwrap();
        assert_eq!(exif.image_type, ImageType::HEIF);
        assert_eq!(exif.header.byte_order, ByteOrder::BigEndian);
        assert_eq!(exif.header.tiff_header_offset as usize, TIFF_AT);
        assert_eq!(exif.exposure.iso, Some(500));
        assert_eq!(exif.exposure.aperture(), Some(5.0));
        assert_eq!(exif.focal_length.and_then(|f| f.to_f64()), Some(20.0));
        assert_eq!(exif.dates.original.unwrap().timestamp(), 1575608507);
        assert_eq!(exif.model.as_deref(), Some("Canon EOS 6D"));
        assert_eq!((exif.image_width, exif.image_height), (5472, 3648));

        let xmp = exif.xmp.unwrap();
        let range = xmp.offset as usize..(xmp.offset + xmp.length) as usize;
        assert_eq!(&data[range], XMP);
    }

    #[test]
    fn unsupported_construction_method() {
        let data = heif(2);
        let err = read_heif(&data, &mut Vec::new(), &DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, crate::Error::ParseFailed(_)));
    }

    #[test]
    fn no_exif_item() {
        let mut data = ftyp(b"heic");
        data.extend(bmff_box(b"meta", &[0; 4]));
        data.extend(bmff_box(b"mdat", &[0; 16]));
        assert!(matches!(
            read_heif(&data, &mut Vec::new(), &DecodeOptions::default()),
            Err(crate::Error::NoExif)
        ));
    }
}
