//! Canon CR3: an ISOBMFF file whose `moov` box carries Canon's uuid box
//! with one TIFF structure per IFD (`CMT1..CMT4`).

use crate::{
    bbox::{
        children, find_ctmd_sample, parse_preview, Boxes, CanonUuidBox, CmtKind, SampleLocation,
        CANON_UUID, PREVIEW_UUID, UUID_SIZE, XMP_UUID,
    },
    buffer::load_at,
    canon::{parse_ctmd, CanonMakerNote, CtmdRecord},
    exif::{decode_canon, Exif, IfdWalker, ImageRegion, MakerNote, XmpHeader},
    file::ImageType,
    parser::DecodeOptions,
    reader::{read_up_to, ReadAt, TiffCursor},
};

// Enough for the preview uuid up to the JPEG.
const UUID_PEEK_LEN: usize = 64;

#[derive(Debug, Default)]
struct Cr3Layout {
    canon: Option<CanonUuidBox>,
    ctmd: Option<SampleLocation>,
    xmp: Option<XmpHeader>,
    preview: Option<ImageRegion>,
}

/// Decodes the CMT boxes of a CR3 file, plus its XMP and preview locations
/// and the first CTMD sample.
#[tracing::instrument(skip_all)]
pub(crate) fn read_cr3<R: ReadAt + ?Sized>(
    reader: &R,
    buf: &mut Vec<u8>,
    opts: &DecodeOptions,
) -> crate::Result<Exif> {
    let layout = scan(reader, buf)?;
    let canon = layout.canon.ok_or(crate::Error::NoExif)?;
    let cmt1 = canon.cmt(CmtKind::Cmt1).ok_or(crate::Error::NoExif)?;
    let header = cmt1.header.with_image_type(ImageType::CR3);

    let mut exif = Exif::new(header);
    {
        let mut walker = IfdWalker::new(reader, &mut exif, opts.max_ifd_entries);
        walker.walk_tiff(&header)?;
        for cmt in canon.cmts().iter().filter(|c| c.kind != CmtKind::Cmt1) {
            let cursor = TiffCursor::new(cmt.header.tiff_header_offset as u64, cmt.header.byte_order);
            match walker.walk_single(cursor, cmt.header.first_ifd_offset, cmt.kind.ifd()) {
                Ok(()) => (),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => tracing::warn!(kind = ?cmt.kind, ?e, "skip cmt box"),
            }
        }
    }

    if opts.decode_maker_notes {
        if canon.cmt(CmtKind::Cmt3).is_some() {
            match decode_canon(reader, &mut exif, opts) {
                Ok(()) => (),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => tracing::warn!(?e, "skip maker note"),
            }
        }
        if let Some(sample) = layout.ctmd {
            match timed_metadata(reader, buf, sample, opts) {
                Ok(records) => attach_timed_metadata(&mut exif, records),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => tracing::warn!(?e, "skip timed metadata"),
            }
        }
    }

    exif.finish();
    exif.xmp = layout.xmp;
    if exif.preview.is_none() {
        exif.preview = layout.preview;
    }
    tracing::debug!(tags = exif.tags.len(), "cr3 decoded");
    Ok(exif)
}

fn scan<R: ReadAt + ?Sized>(reader: &R, buf: &mut Vec<u8>) -> crate::Result<Cr3Layout> {
    let mut layout = Cr3Layout::default();
    for bbox in Boxes::new(reader) {
        let bbox = match bbox {
            Ok(b) => b,
            // A damaged media box does not hide metadata already found.
            Err(e) if layout.canon.is_some() && !e.is_cancelled() => {
                tracing::warn!(?e, "stop box scan");
                break;
            }
            Err(e) => return Err(e),
        };

        match bbox.box_type.as_str() {
            "moov" if layout.canon.is_none() => {
                let len = usize::try_from(bbox.body_size()).unwrap_or(usize::MAX);
                load_at(reader, buf, bbox.body_offset(), len)?;
                for child in children(buf) {
                    let (offset, child) = child?;
                    let body = child.body_data();
                    if child.box_type() == "uuid" && body.starts_with(&CANON_UUID) {
                        let base = bbox.body_offset() + (offset + child.header_size()) as u64;
                        layout.canon = Some(CanonUuidBox::parse(body, base));
                    }
                }
                layout.ctmd = find_ctmd_sample(buf);
            }
            "uuid" => {
                let mut head = [0u8; UUID_PEEK_LEN];
                let n = read_up_to(reader, &mut head, bbox.body_offset())?;
                let head = &head[..n.min(bbox.body_size() as usize)];
                if head.starts_with(&XMP_UUID) {
                    layout.xmp = Some(XmpHeader {
                        offset: bbox.body_offset() + UUID_SIZE as u64,
                        length: bbox.body_size().saturating_sub(UUID_SIZE as u64),
                    });
                } else if head.starts_with(&PREVIEW_UUID) {
                    match parse_preview(head) {
                        Ok((_, range)) => {
                            layout.preview = Some(ImageRegion {
                                offset: bbox.body_offset() + range.start as u64,
                                length: range.len() as u64,
                            })
                        }
                        Err(e) => tracing::warn!(?e, "preview box"),
                    }
                }
            }
            _ => (),
        }
    }
    tracing::debug!(?layout, "cr3 layout");
    Ok(layout)
}

fn timed_metadata<R: ReadAt + ?Sized>(
    reader: &R,
    buf: &mut Vec<u8>,
    sample: SampleLocation,
    opts: &DecodeOptions,
) -> crate::Result<Vec<CtmdRecord>> {
    let len = usize::try_from(sample.size).unwrap_or(usize::MAX);
    load_at(reader, buf, sample.offset, len)?;
    parse_ctmd(buf, opts.max_ifd_entries)
}

fn attach_timed_metadata(exif: &mut Exif, records: Vec<CtmdRecord>) {
    match &mut exif.maker_note {
        MakerNote::Canon(note) => note.timed_metadata = records,
        MakerNote::None => {
            exif.maker_note = MakerNote::Canon(Box::new(CanonMakerNote {
                timed_metadata: records,
                ..Default::default()
            }))
        }
        other => tracing::debug!(?other, "timed metadata without a canon maker note"),
    }
}
