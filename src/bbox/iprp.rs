use nom::{
    combinator::{fail, map},
    error::context,
    multi::many_m_n,
    number::complete::{be_u16, be_u32, u8},
    IResult,
};

use super::{children, BoxHolder, FullBoxHeader, ParseBody, ParseBox};

/// Item properties: the `ipco` property list plus the `ipma` associations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IprpBox {
    /// Image sizes by 0-based `ipco` index; other properties are `None`.
    properties: Vec<Option<(u32, u32)>>,
    associations: Vec<IpmaEntry>,
}

impl IprpBox {
    /// Parses the body of an `iprp` box. Malformed children are skipped.
    pub fn parse(body: &[u8]) -> IprpBox {
        let mut iprp = IprpBox::default();
        for (_, bbox) in children(body).map_while(Result::ok) {
            match bbox.box_type() {
                "ipco" => iprp.properties = parse_ipco(bbox.body_data()),
                "ipma" => match IpmaBox::parse_box(bbox.data) {
                    Ok((_, ipma)) => iprp.associations.extend(ipma.entries),
                    Err(e) => tracing::warn!(?e, "ipma"),
                },
                _ => (),
            }
        }
        iprp
    }

    /// Width and height from the `ispe` property associated with `item_id`.
    pub fn dimensions(&self, item_id: u32) -> Option<(u32, u32)> {
        let entry = self.associations.iter().find(|e| e.item_id == item_id)?;
        entry
            .indices
            .iter()
            .filter(|&&idx| idx > 0)
            .find_map(|&idx| self.properties.get(idx as usize - 1).copied().flatten())
    }
}

fn parse_ipco(body: &[u8]) -> Vec<Option<(u32, u32)>> {
    children(body)
        .map_while(Result::ok)
        .map(|(_, bbox)| match bbox.box_type() {
            "ispe" => parse_ispe(&bbox).ok(),
            _ => None,
        })
        .collect()
}

fn parse_ispe(bbox: &BoxHolder) -> crate::Result<(u32, u32)> {
    // version and flags come first
    let body = bbox.body_data();
    let (_, (w, h)) = nom::sequence::preceded(
        nom::bytes::complete::take(4usize),
        nom::sequence::pair(be_u32, be_u32),
    )(body)?;
    Ok((w, h))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct IpmaEntry {
    item_id: u32,
    /// 1-based `ipco` indices; 0 means no property.
    indices: Vec<u16>,
}

struct IpmaBox {
    entries: Vec<IpmaEntry>,
}

impl ParseBody<IpmaBox> for IpmaBox {
    fn parse_body(remain: &[u8], header: FullBoxHeader) -> IResult<&[u8], IpmaBox> {
        let (remain, count) = be_u32(remain)?;
        // item id plus association count at least
        if count as usize > remain.len() / 3 {
            return context("too many ipma entries", fail)(remain);
        }
        let wide = header.flags & 1 == 1;

        let (remain, entries) = many_m_n(count as usize, count as usize, |remain| {
            let (remain, item_id) = if header.version < 1 {
                map(be_u16, |x| x as u32)(remain)?
            } else {
                be_u32(remain)?
            };
            let (remain, n) = u8(remain)?;
            let (remain, indices) = many_m_n(n as usize, n as usize, |remain| {
                // the top bit flags an essential property
                if wide {
                    map(be_u16, |x| x & 0x7fff)(remain)
                } else {
                    map(u8, |x| (x & 0x7f) as u16)(remain)
                }
            })(remain)?;
            Ok((remain, IpmaEntry { item_id, indices }))
        })(remain)?;

        Ok((remain, IpmaBox { entries }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{bmff_box, bmff_full_box};

    fn ispe(w: u32, h: u32) -> Vec<u8> {
        let mut body = w.to_be_bytes().to_vec();
        body.extend(h.to_be_bytes());
        bmff_full_box(b"ispe", 0, 0, &body)
    }

    #[test]
    fn dimensions_by_association() {
        let mut ipco = bmff_box(b"hvcC", &[0; 6]);
        ipco.extend(ispe(4032, 3024));
        ipco.extend(ispe(512, 512));

        // item 1 -> [hvcC, ispe 4032], item 2 -> [ispe 512, essential flag]
        let mut ipma = 2u32.to_be_bytes().to_vec();
        ipma.extend([0, 1, 2, 0x81, 0x02]);
        ipma.extend([0, 2, 1, 0x83]);

        let mut body = bmff_box(b"ipco", &ipco);
        body.extend(bmff_full_box(b"ipma", 0, 0, &ipma));

        let iprp = IprpBox::parse(&body);
        assert_eq!(iprp.dimensions(1), Some((4032, 3024)));
        assert_eq!(iprp.dimensions(2), Some((512, 512)));
        assert_eq!(iprp.dimensions(3), None);
    }

    #[test]
    fn wide_indices() {
        let ipco = ispe(100, 50);
        let mut ipma = 1u32.to_be_bytes().to_vec();
        ipma.extend(7u32.to_be_bytes());
        ipma.push(1);
        ipma.extend(0x8001u16.to_be_bytes());

        let mut body = bmff_box(b"ipco", &ipco);
        body.extend(bmff_full_box(b"ipma", 1, 1, &ipma));

        assert_eq!(IprpBox::parse(&body).dimensions(7), Some((100, 50)));
    }
}
