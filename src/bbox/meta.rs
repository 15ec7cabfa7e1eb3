use std::ops::Range;

use nom::number::complete::{be_u16, be_u32};

use super::{children, iinf::IinfBox, iloc::IlocBox, iprp::IprpBox, ParseBox};

/// The `meta` box of a HEIF file. Offsets are relative to the loaded body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaBox {
    pub primary_item: Option<u32>,
    pub iinf: Option<IinfBox>,
    pub iloc: Option<IlocBox>,
    pub iprp: IprpBox,
    /// Body of the `idat` box.
    pub idat: Option<Range<usize>>,
}

impl MetaBox {
    /// Parses a `meta` body, the bytes following its plain box header.
    pub fn parse(body: &[u8]) -> crate::Result<MetaBox> {
        let boxes = body
            .get(4..)
            .ok_or(crate::Error::InvalidHeader("meta box is too short"))?;
        let base = 4;

        let mut meta = MetaBox::default();
        for child in children(boxes) {
            let (offset, bbox) = child?;
            match bbox.box_type() {
                "pitm" => {
                    let (_, header) = super::FullBoxHeader::parse(bbox.data)?;
                    let body = bbox.data.get(header.header_size..).unwrap_or_default();
                    let (_, id) = if header.version == 0 {
                        nom::combinator::map(be_u16, |x| x as u32)(body)?
                    } else {
                        be_u32(body)?
                    };
                    meta.primary_item = Some(id);
                }
                "iinf" => meta.iinf = Some(IinfBox::parse_box(bbox.data)?.1),
                "iloc" => meta.iloc = Some(IlocBox::parse_box(bbox.data)?.1),
                "iprp" => meta.iprp = IprpBox::parse(bbox.body_data()),
                "idat" => {
                    let start = base + offset + bbox.header_size();
                    meta.idat = Some(start..base + offset + bbox.data.len());
                }
                _ => (),
            }
        }
        tracing::debug!(primary = ?meta.primary_item, idat = ?meta.idat, "meta");
        Ok(meta)
    }

    /// Id of the item typed `item_type`.
    pub fn item_of_type(&self, item_type: &str) -> Option<u32> {
        self.iinf.as_ref()?.find_type(item_type).map(|e| e.id)
    }

    pub fn xmp_item(&self) -> Option<u32> {
        self.iinf.as_ref()?.find_xmp().map(|e| e.id)
    }

    pub fn location(&self, item_id: u32) -> Option<&super::ItemLocation> {
        self.iloc.as_ref()?.item(item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{bmff_box, bmff_full_box};

    #[test]
    fn children_of_meta() {
        let mut infe = 1u16.to_be_bytes().to_vec();
        infe.extend([0, 0]);
        infe.extend(b"Exif\0");
        let mut iinf = 1u16.to_be_bytes().to_vec();
        iinf.extend(bmff_full_box(b"infe", 2, 0, &infe));

        let mut body = vec![0, 0, 0, 0];
        body.extend(bmff_full_box(b"pitm", 0, 0, &9u16.to_be_bytes()));
        body.extend(bmff_full_box(b"iinf", 0, 0, &iinf));
        body.extend(bmff_box(b"hdlr", &[0; 4]));
        let idat_at = body.len();
        body.extend(bmff_box(b"idat", b"abcd"));

        let meta = MetaBox::parse(&body).unwrap();
        assert_eq!(meta.primary_item, Some(9));
        assert_eq!(meta.item_of_type("Exif"), Some(1));
        assert_eq!(meta.xmp_item(), None);
        assert!(meta.location(1).is_none());
        let idat = meta.idat.unwrap();
        assert_eq!(idat.start, idat_at + 8);
        assert_eq!(&body[idat], b"abcd");
    }

    #[test]
    fn truncated_child() {
        let mut body = vec![0, 0, 0, 0];
        body.extend(bmff_box(b"iloc", &[0; 16]));
        body.truncate(body.len() - 3);
        assert!(MetaBox::parse(&body).is_err());
    }
}
