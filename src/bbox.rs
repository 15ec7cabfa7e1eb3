//! ISO base media file format boxes, as found in HEIF and CR3 files.
//!
//! Top-level boxes are located straight from the reader ([`Boxes`]); the
//! bodies of interest (`meta`, `moov`) are loaded into a buffer and parsed
//! with nom.

use std::fmt::Display;

use nom::{
    bytes::{complete, streaming},
    combinator::{fail, map_res},
    error::context,
    number, AsChar, IResult,
};

use crate::reader::{read_up_to, ReadAt};

mod iinf;
mod iloc;
mod iprp;
mod meta;
mod stbl;
mod uuid;

pub(crate) use iloc::{ConstructionMethod, ItemLocation};
pub(crate) use meta::MetaBox;
pub(crate) use stbl::{find_ctmd_sample, SampleLocation};
pub(crate) use uuid::{
    parse_preview, CanonUuidBox, CmtKind, CANON_UUID, PREVIEW_UUID, UUID_SIZE, XMP_UUID,
};

const MAX_BODY_LEN: usize = 100 * 1024 * 1024;
const MAX_TOP_LEVEL_BOXES: usize = 1024;

/// Nested boxes are not followed deeper than this.
pub(crate) const MAX_BOX_DEPTH: usize = 8;

#[derive(Debug, PartialEq)]
pub enum Error {
    UnsupportedConstructionMethod(u8),
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnsupportedConstructionMethod(x) => {
                write!(f, "unsupported construction method ({x})")
            }
        }
    }
}

impl From<Error> for crate::Error {
    fn from(e: Error) -> Self {
        crate::Error::ParseFailed(Box::new(e))
    }
}

/// Representing an ISO base media file format box header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxHeader {
    /// Size of the box, header included. 0 means the box extends to the end
    /// of its container.
    pub box_size: u64,
    pub box_type: String,
    pub header_size: usize, // include size, type
}

impl BoxHeader {
    pub fn parse<'a>(input: &'a [u8]) -> IResult<&'a [u8], BoxHeader> {
        let (remain, size) = number::streaming::be_u32(input)?;

        // Not UTF-8: types like "©xyz" exist.
        let (remain, box_type) = map_res(streaming::take(4_usize), |res: &'a [u8]| {
            Ok::<String, ()>(res.iter().map(|b| b.as_char()).collect::<String>())
        })(remain)?;

        let (remain, box_size) = if size == 1 {
            number::streaming::be_u64(remain)?
        } else if size != 0 && size < 8 {
            context("invalid box header: box_size is too small", fail)(remain)?
        } else {
            (remain, size as u64)
        };

        let header_size = input.len() - remain.len();
        if box_size != 0 && box_size < header_size as u64 {
            return fail(remain);
        }

        if box_size > (MAX_BODY_LEN + header_size) as u64 {
            tracing::warn!(
                box_type = %box_type
                    .chars()
                    .map(|c| if c.is_ascii_graphic() { c } else { '*' })
                    .collect::<String>(),
                box_size,
                "box is too big"
            );
            return fail(remain);
        }

        Ok((
            remain,
            BoxHeader {
                box_size,
                box_type,
                header_size,
            },
        ))
    }
}

/// Representing an ISO base media file format full box header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullBoxHeader {
    pub box_size: u64,
    pub box_type: String,
    pub header_size: usize, // include size, type, version, flags

    pub version: u8, // 8 bits
    pub flags: u32,  // 24 bits
}

impl FullBoxHeader {
    fn parse(input: &[u8]) -> IResult<&[u8], FullBoxHeader> {
        let (remain, header) = BoxHeader::parse(input)?;

        let (remain, version) = number::streaming::u8(remain)?;
        let (remain, flags) = number::streaming::be_u24(remain)?;

        let header_size = input.len() - remain.len();
        let box_size = if header.box_size == 0 {
            input.len() as u64
        } else {
            header.box_size
        };
        if box_size < header_size as u64 {
            return fail(remain);
        }

        Ok((
            remain,
            FullBoxHeader {
                box_type: header.box_type,
                box_size,
                header_size,
                version,
                flags,
            },
        ))
    }
}

/// Representing a generic ISO base media file format box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxHolder<'a> {
    pub header: BoxHeader,
    // Including header
    pub data: &'a [u8],
}

impl<'a> BoxHolder<'a> {
    /// Parses one box. A zero size takes the rest of `input`.
    pub fn parse(input: &'a [u8]) -> IResult<&'a [u8], BoxHolder<'a>> {
        let (_, mut header) = BoxHeader::parse(input)?;
        if header.box_size == 0 {
            header.box_size = input.len() as u64;
        }
        let (remain, data) = streaming::take(header.box_size)(input)?;
        Ok((remain, BoxHolder { header, data }))
    }

    pub fn box_type(&self) -> &str {
        &self.header.box_type
    }

    pub fn header_size(&self) -> usize {
        self.header.header_size
    }

    pub fn body_data(&self) -> &'a [u8] {
        &self.data[self.header_size()..] // Safe-slice
    }
}

/// Iterates the boxes of a loaded body, yielding each with its offset in
/// `input`. A truncated box ends the iteration with an error.
pub(crate) fn children<'a>(
    input: &'a [u8],
) -> impl Iterator<Item = crate::Result<(usize, BoxHolder<'a>)>> + 'a {
    let mut remain = input;
    let mut failed = false;
    std::iter::from_fn(move || {
        if remain.is_empty() || failed {
            return None;
        }
        let offset = input.len() - remain.len();
        match BoxHolder::parse(remain) {
            Ok((rem, bbox)) => {
                remain = rem;
                Some(Ok((offset, bbox)))
            }
            Err(e) => {
                failed = true;
                Some(Err(crate::error::convert_parse_error(e, "truncated box")))
            }
        }
    })
}

/// Parses every box while `predicate` returns true, then returns the last
/// parsed box.
pub fn travel_while<'a, F>(input: &'a [u8], mut predicate: F) -> IResult<&'a [u8], BoxHolder<'a>>
where
    F: FnMut(&BoxHolder<'a>) -> bool,
{
    let mut remain = input;
    loop {
        let (rem, bbox) = BoxHolder::parse(remain)?;
        remain = rem;

        if !predicate(&bbox) {
            break Ok((rem, bbox));
        }
    }
}

/// Find a box by atom `path`, which is separated by '/', e.g.: "mdia/minf".
pub fn find_box<'a>(input: &'a [u8], path: &str) -> IResult<&'a [u8], Option<BoxHolder<'a>>> {
    if path.is_empty() || path.split('/').count() > MAX_BOX_DEPTH {
        context("path is empty or too deep", fail::<_, BoxHolder<'a>, _>)(input)?;
    }

    let mut bbox = None;
    let mut remain = input;
    let mut data = input;

    for box_type in path.split('/') {
        if box_type.is_empty() {
            continue;
        }
        let found = travel_while(data, |b| b.box_type() != box_type);
        let (rem, b) = match found {
            Ok(x) => x,
            // Ran out of boxes without a match.
            Err(nom::Err::Incomplete(_)) => return Ok((remain, None)),
            Err(e) => return Err(e),
        };
        data = b.body_data();
        (remain, bbox) = (rem, Some(b));
    }

    Ok((remain, bbox))
}

trait ParseBody<O> {
    fn parse_body(body: &[u8], header: FullBoxHeader) -> IResult<&[u8], O>;
}

pub trait ParseBox<O> {
    fn parse_box(input: &[u8]) -> IResult<&[u8], O>;
}

/// auto implements parse_box for each Box which implements ParseBody
impl<O, T: ParseBody<O>> ParseBox<O> for T {
    fn parse_box(input: &[u8]) -> IResult<&[u8], O> {
        let (remain, header) = FullBoxHeader::parse(input)?;

        // limit parsing size
        let body_len = (header.box_size - header.header_size as u64) as usize;
        let (remain, data) = complete::take(body_len)(remain)?;

        let (rem, bbox) = Self::parse_body(data, header)?;

        if !rem.is_empty() {
            // body is invalid
            return fail(rem);
        }

        Ok((remain, bbox))
    }
}

/// A box located in the source by absolute offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BoxLocation {
    pub box_type: String,
    pub offset: u64,
    pub header_size: u64,
    /// Size including the header.
    pub size: u64,
}

impl BoxLocation {
    pub fn body_offset(&self) -> u64 {
        self.offset + self.header_size
    }

    pub fn body_size(&self) -> u64 {
        self.size - self.header_size
    }

    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Iterates the top-level boxes of a source. Unknown boxes are simply
/// yielded; a box running past the end of the source is an error.
pub(crate) struct Boxes<'a, R: ?Sized> {
    reader: &'a R,
    pos: u64,
    count: usize,
    done: bool,
}

impl<'a, R: ReadAt + ?Sized> Boxes<'a, R> {
    pub fn new(reader: &'a R) -> Self {
        Self {
            reader,
            pos: 0,
            count: 0,
            done: false,
        }
    }

    fn read_next(&mut self) -> crate::Result<Option<BoxLocation>> {
        let mut buf = [0u8; 16];
        let n = read_up_to(self.reader, &mut buf, self.pos)?;
        if n == 0 {
            return Ok(None);
        }
        let (_, header) = BoxHeader::parse(&buf[..n]).map_err(|e| match e {
            nom::Err::Incomplete(_) => crate::Error::NotEnoughData {
                offset: self.pos,
                needed: 16 - n,
            },
            e => crate::error::convert_parse_error(e, "box header"),
        })?;

        let size = match (header.box_size, self.reader.size()) {
            (0, Some(end)) => end.saturating_sub(self.pos),
            (0, None) => return Err(crate::Error::InvalidHeader("open ended box in unsized source")),
            (size, _) => size,
        };
        let location = BoxLocation {
            box_type: header.box_type,
            offset: self.pos,
            header_size: header.header_size as u64,
            size,
        };
        if let Some(end) = self.reader.size() {
            if location.end() > end {
                return Err(crate::Error::NotEnoughData {
                    offset: location.offset,
                    needed: size as usize,
                });
            }
        }
        tracing::debug!(box_type = %location.box_type, offset = location.offset, size, "box");
        self.pos = location.end();
        Ok(Some(location))
    }
}

impl<R: ReadAt + ?Sized> Iterator for Boxes<'_, R> {
    type Item = crate::Result<BoxLocation>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.count >= MAX_TOP_LEVEL_BOXES {
            return None;
        }
        self.count += 1;
        let res = self.read_next().transpose();
        if !matches!(res, Some(Ok(_))) {
            self.done = true;
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{bmff_box, ftyp};
    use nom::error::make_error;

    #[test]
    fn box_header() {
        let data = [
            0x00, 0x00, 0x01, 0xdd, 0x6d, 0x65, 0x74, 0x61, 0x02, 0x04, 0x04, 0x00,
        ];
        let (remain, header) = FullBoxHeader::parse(&data).unwrap();
        assert_eq!(header.box_type, "meta");
        assert_eq!(header.box_size, 0x01dd);
        assert_eq!(header.version, 0x2);
        assert_eq!(header.flags, 0x40400,);
        assert_eq!(header.header_size, 12);
        assert_eq!(remain, b"");

        let data = [
            0x00, 0x00, 0x00, 0x01, 0x6d, 0x64, 0x61, 0x74, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0e,
            0xfa, 0x74, 0x01, 0x04, 0x04, 0x00,
        ];
        let (remain, header) = FullBoxHeader::parse(&data).unwrap();
        assert_eq!(header.box_type, "mdat");
        assert_eq!(header.box_size, 0xefa74);
        assert_eq!(header.version, 0x1);
        assert_eq!(header.flags, 0x40400,);
        assert_eq!(header.header_size, 20);
        assert_eq!(remain, b"");

        let data = [0x00, 0x00, 0x01, 0xdd, 0x6d, 0x65, 0x74];
        let err = BoxHeader::parse(&data).unwrap_err();
        assert!(err.is_incomplete());

        let data = [0x00, 0x00, 0x00, 0x07, 0x00, 0x00, 0x00, 0x00];
        let err = BoxHeader::parse(&data).unwrap_err();
        assert_eq!(
            err,
            nom::Err::Error(make_error(&[] as &[u8], nom::error::ErrorKind::Fail))
        );
    }

    #[test]
    fn top_level_boxes() {
        let mut data = ftyp(b"heic");
        data.extend(bmff_box(b"free", &[0; 5]));
        // size 0: to the end of the file
        data.extend([0, 0, 0, 0]);
        data.extend(b"mdat");
        data.extend([1, 2, 3]);

        let boxes: Vec<_> = Boxes::new(&data).collect::<crate::Result<_>>().unwrap();
        let types: Vec<_> = boxes.iter().map(|b| b.box_type.as_str()).collect();
        assert_eq!(types, ["ftyp", "free", "mdat"]);
        assert_eq!(boxes[1].body_size(), 5);
        assert_eq!(boxes[2].end(), data.len() as u64);
        assert_eq!(boxes[2].body_size(), 3);
    }

    #[test]
    fn truncated_box_is_fatal() {
        let mut data = ftyp(b"heic");
        data.extend(bmff_box(b"meta", &[0; 32]));
        data.truncate(data.len() - 4);
        let res: crate::Result<Vec<_>> = Boxes::new(&data).collect();
        assert!(matches!(res, Err(crate::Error::NotEnoughData { .. })));
    }

    #[test]
    fn nested_lookup() {
        let stbl = bmff_box(b"stbl", &bmff_box(b"stsd", &[0; 8]));
        let minf = bmff_box(b"minf", &stbl);
        let mut mdia = bmff_box(b"hdlr", &[0; 4]);
        mdia.extend(minf);

        let (_, found) = find_box(&mdia, "minf/stbl/stsd").unwrap();
        assert_eq!(found.unwrap().body_data(), &[0; 8]);
        let (_, missing) = find_box(&mdia, "minf/stco").unwrap();
        assert!(missing.is_none());

        let offsets: Vec<_> = children(&mdia).map(|c| c.unwrap().0).collect();
        assert_eq!(offsets, [0, 12]);
    }
}
