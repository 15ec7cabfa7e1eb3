use std::ops::Range;

use nom::{
    bytes::complete::take,
    combinator::fail,
    error::context,
    number::complete::{be_u16, be_u32},
    sequence::tuple,
    IResult,
};

use super::{children, BoxHeader};
use crate::exif::{IfdId, TiffHeader};

/// Size of a UUID in bytes
pub const UUID_SIZE: usize = 16;

/// Canon's UUID for CR3 files: 85c0b687-820f-11e0-8111-f4ce462b6a48
pub const CANON_UUID: [u8; 16] = [
    0x85, 0xc0, 0xb6, 0x87, 0x82, 0x0f, 0x11, 0xe0, 0x81, 0x11, 0xf4, 0xce, 0x46, 0x2b, 0x6a, 0x48,
];

/// XMP packet box: be7acfcb-97a9-42e8-9c71-999491e3afac
pub const XMP_UUID: [u8; 16] = [
    0xbe, 0x7a, 0xcf, 0xcb, 0x97, 0xa9, 0x42, 0xe8, 0x9c, 0x71, 0x99, 0x94, 0x91, 0xe3, 0xaf, 0xac,
];

/// Canon preview box: eaf42b5e-1c98-4b88-b9fb-b7dc406e4d16
pub const PREVIEW_UUID: [u8; 16] = [
    0xea, 0xf4, 0x2b, 0x5e, 0x1c, 0x98, 0x4b, 0x88, 0xb9, 0xfb, 0xb7, 0xdc, 0x40, 0x6e, 0x4d, 0x16,
];

/// The Canon metadata boxes of a CR3 `moov/uuid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CmtKind {
    /// IFD0
    Cmt1,
    /// Exif IFD
    Cmt2,
    /// MakerNote IFD
    Cmt3,
    /// GPS IFD
    Cmt4,
}

impl CmtKind {
    fn from_box_type(box_type: &str) -> Option<CmtKind> {
        match box_type {
            "CMT1" => Some(CmtKind::Cmt1),
            "CMT2" => Some(CmtKind::Cmt2),
            "CMT3" => Some(CmtKind::Cmt3),
            "CMT4" => Some(CmtKind::Cmt4),
            _ => None,
        }
    }

    pub fn ifd(self) -> IfdId {
        match self {
            CmtKind::Cmt1 => IfdId::ROOT,
            CmtKind::Cmt2 => IfdId::EXIF,
            CmtKind::Cmt3 => IfdId::MAKER_NOTE,
            CmtKind::Cmt4 => IfdId::GPS,
        }
    }
}

/// One `CMTn` box: a complete TIFF structure of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmtBox {
    pub kind: CmtKind,
    /// Located at the start of the box payload.
    pub header: TiffHeader,
}

/// Canon's UUID box inside `moov`, holding the `CMT1..CMT4` boxes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonUuidBox {
    cmts: Vec<CmtBox>,
}

impl CanonUuidBox {
    /// Parses the body of the uuid box, the UUID included. `base` is the
    /// absolute offset of that body. Boxes without a TIFF header are
    /// skipped.
    pub fn parse(body: &[u8], base: u64) -> CanonUuidBox {
        let Some(boxes) = body.get(UUID_SIZE..) else {
            return CanonUuidBox::default();
        };

        let mut cmts: Vec<CmtBox> = children(boxes)
            .map_while(|c| c.map_err(|e| tracing::warn!(?e, "canon uuid box")).ok())
            .filter_map(|(offset, bbox)| {
                let kind = CmtKind::from_box_type(bbox.box_type())?;
                let payload = bbox.body_data();
                let Ok((_, header)) = TiffHeader::parse(payload) else {
                    tracing::warn!(?kind, "cmt box has no tiff header");
                    return None;
                };
                let start = base + (UUID_SIZE + offset + bbox.header_size()) as u64;
                let (Ok(start), Ok(len)) = (u32::try_from(start), u32::try_from(payload.len()))
                else {
                    tracing::warn!(?kind, start, "cmt box is out of range");
                    return None;
                };
                tracing::debug!(?kind, start, len, "cmt");
                Some(CmtBox {
                    kind,
                    header: header.at(start, len),
                })
            })
            .collect();
        cmts.sort_by_key(|c| c.kind);
        cmts.dedup_by_key(|c| c.kind);

        CanonUuidBox { cmts }
    }

    pub fn cmt(&self, kind: CmtKind) -> Option<&CmtBox> {
        self.cmts.iter().find(|c| c.kind == kind)
    }

    pub fn cmts(&self) -> &[CmtBox] {
        &self.cmts
    }
}

/// Locates the JPEG of a Canon preview uuid box. `body` starts with the
/// UUID; the returned range is relative to it.
pub fn parse_preview(body: &[u8]) -> IResult<&[u8], Range<usize>> {
    // uuid, 8 unknown bytes, then the PRVW box
    let (remain, _) = take(UUID_SIZE + 8)(body)?;
    let (remain, header) = BoxHeader::parse(remain)?;
    if header.box_type != "PRVW" {
        return context("PRVW box expected", fail)(remain);
    }
    let (remain, (_, _, _width, _height, _, length)) =
        tuple((be_u32, be_u16, be_u16, be_u16, be_u16, be_u32))(remain)?;
    let start = body.len() - remain.len();
    Ok((remain, start..start + length as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        reader::ByteOrder,
        testkit::{bmff_box, TiffBuilder, Val},
    };

    #[test]
    fn cmt_boxes() {
        let cmt1 = TiffBuilder::new(ByteOrder::LittleEndian)
            .root(0x010f, Val::ascii("Canon"))
            .build();
        let cmt4 = TiffBuilder::new(ByteOrder::BigEndian)
            .root(0x0000, Val::Byte(vec![2, 2, 0, 0]))
            .build();

        let mut body = CANON_UUID.to_vec();
        body.extend(bmff_box(b"CNCV", b"CanonCR3_001/00.09.00/00.00.00"));
        body.extend(bmff_box(b"CMT4", &cmt4));
        body.extend(bmff_box(b"CMT1", &cmt1));
        body.extend(bmff_box(b"CMT2", b"junk"));

        let uuid = CanonUuidBox::parse(&body, 1000);
        let kinds: Vec<_> = uuid.cmts().iter().map(|c| c.kind).collect();
        assert_eq!(kinds, [CmtKind::Cmt1, CmtKind::Cmt4]);

        let cmt1_at = body.len() - 12 - cmt1.len();
        let header = uuid.cmt(CmtKind::Cmt1).unwrap().header;
        assert_eq!(header.tiff_header_offset as usize, 1000 + cmt1_at);
        assert_eq!(header.exif_payload_length as usize, cmt1.len());
        assert_eq!(header.byte_order, ByteOrder::LittleEndian);
        assert_eq!(
            uuid.cmt(CmtKind::Cmt4).unwrap().header.byte_order,
            ByteOrder::BigEndian
        );
        assert!(uuid.cmt(CmtKind::Cmt3).is_none());
        assert_eq!(CmtKind::Cmt3.ifd(), IfdId::MAKER_NOTE);
    }

    #[test]
    fn preview() {
        let mut prvw = 0u32.to_be_bytes().to_vec();
        prvw.extend(1u16.to_be_bytes());
        prvw.extend(1620u16.to_be_bytes());
        prvw.extend(1080u16.to_be_bytes());
        prvw.extend(1u16.to_be_bytes());
        prvw.extend(4u32.to_be_bytes());
        prvw.extend([0xff, 0xd8, 0xff, 0xd9]);

        let mut body = PREVIEW_UUID.to_vec();
        body.extend([0; 8]);
        body.extend(bmff_box(b"PRVW", &prvw));

        let (_, range) = parse_preview(&body).unwrap();
        assert_eq!(&body[range], [0xff, 0xd8, 0xff, 0xd9]);

        let mut other = PREVIEW_UUID.to_vec();
        other.extend([0; 8]);
        other.extend(bmff_box(b"free", &[0; 20]));
        assert!(parse_preview(&other).is_err());
    }
}
