use nom::{
    combinator::{cond, fail, map},
    error::context,
    multi::many_m_n,
    number::complete::{be_u16, be_u32, be_u64, be_u8},
    IResult,
};

use crate::bbox::FullBoxHeader;

use super::{Error, ParseBody};

/// Item location box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IlocBox {
    items: Vec<ItemLocation>,
}

const MAX_ILOC_EXTENTS_PER_ITEM: u16 = 32;

impl ParseBody<IlocBox> for IlocBox {
    fn parse_body<'a>(remain: &'a [u8], header: FullBoxHeader) -> IResult<&'a [u8], IlocBox> {
        let version = header.version;

        let (remain, (offset_size, length_size)) = map(be_u8, |res| (res >> 4, res & 0xF))(remain)?;
        // index_size is reserved in version 0
        let (remain, (base_offset_size, index_size)) =
            map(be_u8, |res| (res >> 4, if version == 0 { 0 } else { res & 0xF }))(remain)?;

        let (remain, item_count) = if version < 2 {
            map(be_u16, |x| x as u32)(remain)?
        } else {
            be_u32(remain)?
        };
        if item_count as usize > remain.len() / 4 {
            return context("too many iloc items", fail)(remain);
        }

        let (remain, items) = many_m_n(item_count as usize, item_count as usize, |remain| {
            let (remain, id) = if version < 2 {
                map(be_u16, |x| x as u32)(remain)?
            } else {
                be_u32(remain)?
            };

            let (remain, construction_method) =
                cond(version >= 1, map(be_u16, |res| (res & 0xF) as u8))(remain)?;

            let (remain, _data_ref_index) = be_u16(remain)?;

            let (remain, base_offset) =
                parse_sized(base_offset_size, remain, "base_offset_size is not 4 or 8")?;

            let (remain, extent_count) = be_u16(remain)?;
            if extent_count > MAX_ILOC_EXTENTS_PER_ITEM {
                context("extent_count > 32", fail::<_, (), _>)(remain)?;
            }

            let (remain, extents) =
                many_m_n(extent_count as usize, extent_count as usize, |remain| {
                    let (remain, _index) =
                        parse_sized(index_size, remain, "index_size is not 4 or 8")?;
                    let (remain, offset) =
                        parse_sized(offset_size, remain, "offset_size is not 4 or 8")?;
                    let (remain, length) =
                        parse_sized(length_size, remain, "length_size is not 4 or 8")?;
                    Ok((remain, ItemExtent { offset, length }))
                })(remain)?;

            Ok((
                remain,
                ItemLocation {
                    id,
                    construction_method: construction_method.unwrap_or(0),
                    base_offset,
                    extents,
                },
            ))
        })(remain)?;

        Ok((remain, IlocBox { items }))
    }
}

impl IlocBox {
    pub fn item(&self, id: u32) -> Option<&ItemLocation> {
        self.items.iter().find(|item| item.id == id)
    }
}

fn parse_sized<'a>(size: u8, remain: &'a [u8], msg: &'static str) -> IResult<&'a [u8], u64> {
    match size {
        0 => Ok((remain, 0)),
        4 => map(be_u32, |x| x as u64)(remain),
        8 => be_u64(remain),
        _ => context(msg, fail)(remain),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemExtent {
    pub offset: u64,
    /// 0 means the rest of the source.
    pub length: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLocation {
    pub id: u32,
    pub construction_method: u8,
    pub base_offset: u64,
    pub extents: Vec<ItemExtent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionMethod {
    FileOffset = 0,
    IdatOffset = 1,
    ItemOffset = 2,
}

impl TryFrom<u8> for ConstructionMethod {
    type Error = Error;
    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::FileOffset),
            1 => Ok(Self::IdatOffset),
            2 => Ok(Self::ItemOffset),
            other => Err(Error::UnsupportedConstructionMethod(other)),
        }
    }
}

impl ItemLocation {
    /// Offset and length of the first extent; items made of several extents
    /// are not needed for metadata.
    pub fn first_extent(&self) -> Option<(ConstructionMethod, u64, u64)> {
        let method = ConstructionMethod::try_from(self.construction_method).ok()?;
        let extent = self.extents.first()?;
        Some((
            method,
            self.base_offset.checked_add(extent.offset)?,
            extent.length,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bbox::ParseBox, testkit::bmff_full_box};
    use test_case::test_case;

    fn iloc_v1(items: &[(u16, u16, u32, u32)]) -> Vec<u8> {
        // offset_size 4, length_size 4, base_offset_size 0, index_size 0
        let mut body = vec![0x44, 0x00];
        body.extend((items.len() as u16).to_be_bytes());
        for (id, method, offset, length) in items {
            body.extend(id.to_be_bytes());
            body.extend(method.to_be_bytes());
            body.extend([0, 0]);
            body.extend(1u16.to_be_bytes());
            body.extend(offset.to_be_bytes());
            body.extend(length.to_be_bytes());
        }
        bmff_full_box(b"iloc", 1, 0, &body)
    }

    #[test_case(1, ConstructionMethod::FileOffset, 0x1000)]
    #[test_case(2, ConstructionMethod::IdatOffset, 4)]
    fn items(id: u32, method: ConstructionMethod, offset: u64) {
        let data = iloc_v1(&[(1, 0, 0x1000, 0x200), (2, 1, 4, 16)]);
        let (_, iloc) = IlocBox::parse_box(&data).unwrap();
        let (m, o, _) = iloc.item(id).unwrap().first_extent().unwrap();
        assert_eq!((m, o), (method, offset));
    }

    #[test]
    fn version0_base_offset() {
        // offset_size 4, length_size 4, base_offset_size 4
        let mut body = vec![0x44, 0x40, 0, 1];
        body.extend(7u16.to_be_bytes());
        body.extend([0, 0]);
        body.extend(0x100u32.to_be_bytes());
        body.extend(1u16.to_be_bytes());
        body.extend(0x20u32.to_be_bytes());
        body.extend(0x30u32.to_be_bytes());
        let data = bmff_full_box(b"iloc", 0, 0, &body);

        let (_, iloc) = IlocBox::parse_box(&data).unwrap();
        assert_eq!(
            iloc.item(7).unwrap().first_extent(),
            Some((ConstructionMethod::FileOffset, 0x120, 0x30))
        );
        assert!(iloc.item(8).is_none());
    }

    #[test]
    fn unsupported_method() {
        let data = iloc_v1(&[(1, 3, 0, 0)]);
        let (_, iloc) = IlocBox::parse_box(&data).unwrap();
        assert_eq!(iloc.item(1).unwrap().first_extent(), None);
        assert_eq!(
            ConstructionMethod::try_from(3),
            Err(Error::UnsupportedConstructionMethod(3))
        );
    }
}
