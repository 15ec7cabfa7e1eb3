use nom::{
    bytes::complete,
    combinator::{cond, fail, map},
    error::context,
    multi::many_m_n,
    number::complete::{be_u16, be_u32},
    IResult,
};

use crate::{bbox::FullBoxHeader, utils::parse_cstr};

use super::{ParseBody, ParseBox};

const XMP_CONTENT_TYPE: &str = "application/rdf+xml";

/// Item information box: one `infe` per item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IinfBox {
    entries: Vec<InfeBox>,
}

impl ParseBody<Self> for IinfBox {
    fn parse_body(remain: &[u8], header: FullBoxHeader) -> IResult<&[u8], Self> {
        let (remain, item_count) = if header.version > 0 {
            be_u32(remain)?
        } else {
            map(be_u16, |x| x as u32)(remain)?
        };

        // Every entry takes at least a full box header.
        if item_count as usize > remain.len() / 12 {
            return context("too many infe entries", fail)(remain);
        }
        let (remain, entries) =
            many_m_n(item_count as usize, item_count as usize, InfeBox::parse_box)(remain)?;

        Ok((remain, Self { entries }))
    }
}

impl IinfBox {
    pub fn find_type(&self, item_type: &str) -> Option<&InfeBox> {
        self.entries
            .iter()
            .find(|e| e.item_type.as_deref() == Some(item_type))
    }

    /// The XMP item, a `mime` item typed `application/rdf+xml`.
    pub fn find_xmp(&self) -> Option<&InfeBox> {
        self.entries.iter().find(|e| {
            e.item_type.as_deref() == Some("mime")
                && e.content_type.as_deref() == Some(XMP_CONTENT_TYPE)
        })
    }
}

/// Info entry box
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InfeBox {
    pub id: u32,
    pub item_type: Option<String>, // version >= 2
    pub item_name: String,
    pub content_type: Option<String>,
}

impl ParseBody<Self> for InfeBox {
    fn parse_body<'a>(remain: &'a [u8], header: FullBoxHeader) -> IResult<&'a [u8], Self> {
        let version = header.version;

        let (remain, id) = if version > 2 {
            be_u32(remain)?
        } else {
            map(be_u16, |x| x as u32)(remain)?
        };

        let (remain, _protection_index) = be_u16(remain)?;

        let (remain, item_type) = cond(
            version >= 2,
            map(complete::take(4_usize), |res: &'a [u8]| {
                String::from_utf8_lossy(res).into_owned()
            }),
        )(remain)?;

        let (remain, item_name) = parse_cstr(remain).map_err(|e| {
            if e.is_incomplete() {
                nom::Err::Error(nom::error::Error::new(remain, nom::error::ErrorKind::Eof))
            } else {
                e
            }
        })?;

        let is_mime = item_type.as_deref() == Some("mime");
        let (remain, content_type) = if version <= 1 || is_mime {
            let (remain, content_type) = cond(!remain.is_empty(), parse_cstr)(remain)?;
            // content_encoding is optional and not needed
            (&remain[remain.len()..], content_type)
        } else {
            (&remain[remain.len()..], None)
        };

        tracing::debug!(id, ?item_type, ?item_name, ?content_type, version, "infe");

        Ok((
            remain,
            Self {
                id,
                item_type,
                item_name,
                content_type,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::bmff_full_box;

    fn infe(id: u16, item_type: &[u8; 4], extra: &[u8]) -> Vec<u8> {
        let mut body = id.to_be_bytes().to_vec();
        body.extend([0, 0]);
        body.extend(item_type);
        body.push(0);
        body.extend(extra);
        bmff_full_box(b"infe", 2, 0, &body)
    }

    #[test]
    fn entries() {
        let mut body = 3u16.to_be_bytes().to_vec();
        body.extend(infe(1, b"hvc1", b""));
        body.extend(infe(2, b"Exif", b""));
        body.extend(infe(3, b"mime", b"application/rdf+xml\0"));
        let data = bmff_full_box(b"iinf", 0, 0, &body);

        let (remain, iinf) = IinfBox::parse_box(&data).unwrap();
        assert!(remain.is_empty());
        assert_eq!(iinf.find_type("Exif").unwrap().id, 2);
        assert_eq!(iinf.find_xmp().unwrap().id, 3);
        assert!(iinf.find_type("grid").is_none());
    }

    #[test]
    fn count_beyond_body() {
        let body = 500u16.to_be_bytes().to_vec();
        let data = bmff_full_box(b"iinf", 0, 0, &body);
        assert!(IinfBox::parse_box(&data).is_err());
    }
}
