//! Builders for synthetic fixtures: TIFF structures with real IFD layout and
//! the containers that wrap them.

use bytes::{BufMut, BytesMut};

use crate::reader::ByteOrder;

/// A tag value as written into a fixture.
#[derive(Debug, Clone)]
pub enum Val {
    Ascii(String),
    Byte(Vec<u8>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<(i32, i32)>),
    Undefined(Vec<u8>),
    /// A raw entry: type, count and the 4-byte slot written as-is.
    Raw(u16, u32, u32),
}

impl Val {
    pub fn ascii(s: &str) -> Val {
        Val::Ascii(s.to_owned())
    }

    fn type_code(&self) -> u16 {
        match self {
            Val::Byte(_) => 1,
            Val::Ascii(_) => 2,
            Val::Short(_) => 3,
            Val::Long(_) => 4,
            Val::Rational(_) => 5,
            Val::Undefined(_) => 7,
            Val::SShort(_) => 8,
            Val::SLong(_) => 9,
            Val::SRational(_) => 10,
            Val::Raw(t, _, _) => *t,
        }
    }

    fn count(&self) -> u32 {
        (match self {
            Val::Ascii(s) => s.len() + 1,
            Val::Byte(v) | Val::Undefined(v) => v.len(),
            Val::Short(v) => v.len(),
            Val::SShort(v) => v.len(),
            Val::Long(v) => v.len(),
            Val::SLong(v) => v.len(),
            Val::Rational(v) => v.len(),
            Val::SRational(v) => v.len(),
            Val::Raw(_, n, _) => return *n,
        }) as u32
    }

    fn encode(&self, order: ByteOrder) -> Vec<u8> {
        let mut out = BytesMut::new();
        let le = order == ByteOrder::LittleEndian;
        macro_rules! put {
            ($v:expr, $le:ident, $be:ident) => {
                if le {
                    out.$le($v)
                } else {
                    out.$be($v)
                }
            };
        }
        match self {
            Val::Ascii(s) => {
                out.put_slice(s.as_bytes());
                out.put_u8(0);
            }
            Val::Byte(v) | Val::Undefined(v) => out.put_slice(v),
            Val::Short(v) => v.iter().for_each(|x| put!(*x, put_u16_le, put_u16)),
            Val::SShort(v) => v.iter().for_each(|x| put!(*x, put_i16_le, put_i16)),
            Val::Long(v) => v.iter().for_each(|x| put!(*x, put_u32_le, put_u32)),
            Val::SLong(v) => v.iter().for_each(|x| put!(*x, put_i32_le, put_i32)),
            Val::Rational(v) => v.iter().for_each(|(n, d)| {
                put!(*n, put_u32_le, put_u32);
                put!(*d, put_u32_le, put_u32);
            }),
            Val::SRational(v) => v.iter().for_each(|(n, d)| {
                put!(*n, put_i32_le, put_i32);
                put!(*d, put_i32_le, put_i32);
            }),
            Val::Raw(..) => (),
        }
        out.to_vec()
    }
}

/// One IFD: entries in the order they are written.
pub type Entries = Vec<(u16, Val)>;

/// How the MakerNote of the Exif IFD is laid out.
#[derive(Debug, Clone)]
pub enum MakerNoteSpec {
    /// A plain IFD (Canon) whose offsets are relative to the outer TIFF.
    Ifd(Entries),
    /// An IFD behind a fixed prefix (Sony "SONY DSC \0\0\0").
    PrefixedIfd(Vec<u8>, Entries),
    /// Opaque bytes (a Nikon note with its own TIFF header).
    Blob(Vec<u8>),
}

/// Builds a TIFF structure with IFD0, an optional IFD1, the Exif and GPS
/// IFDs and a maker note.
#[derive(Debug, Clone)]
pub struct TiffBuilder {
    order: ByteOrder,
    first_ifd_offset: u32,
    header_extra: Vec<u8>,
    pub root: Entries,
    pub ifd1: Entries,
    pub exif: Entries,
    pub gps: Entries,
    pub maker_note: Option<MakerNoteSpec>,
}

impl TiffBuilder {
    pub fn new(order: ByteOrder) -> Self {
        Self {
            order,
            first_ifd_offset: 8,
            header_extra: Vec::new(),
            root: Vec::new(),
            ifd1: Vec::new(),
            exif: Vec::new(),
            gps: Vec::new(),
            maker_note: None,
        }
    }

    /// Bytes written between the header and IFD0, as CR2 does with
    /// `CR\x02\0` + raw IFD offset.
    pub fn header_extra(mut self, extra: &[u8]) -> Self {
        self.first_ifd_offset = 8 + extra.len() as u32;
        self.header_extra = extra.to_vec();
        self
    }

    pub fn root(mut self, id: u16, v: Val) -> Self {
        self.root.push((id, v));
        self
    }

    pub fn ifd1(mut self, id: u16, v: Val) -> Self {
        self.ifd1.push((id, v));
        self
    }

    pub fn exif(mut self, id: u16, v: Val) -> Self {
        self.exif.push((id, v));
        self
    }

    pub fn gps(mut self, id: u16, v: Val) -> Self {
        self.gps.push((id, v));
        self
    }

    pub fn maker_note(mut self, spec: MakerNoteSpec) -> Self {
        self.maker_note = Some(spec);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut root = self.root.clone();
        let mut exif = self.exif.clone();

        let root_pos = self.first_ifd_offset as usize;
        let links = (!self.exif.is_empty() || self.maker_note.is_some()) as usize
            + !self.gps.is_empty() as usize;
        let root_size = ifd_size(&root) + links * 12;
        let ifd1_pos = root_pos + root_size;
        let ifd1_size = if self.ifd1.is_empty() { 0 } else { ifd_size(&self.ifd1) };
        let exif_pos = ifd1_pos + ifd1_size;
        let exif_size = match (&self.maker_note, exif.is_empty()) {
            (Some(_), _) => ifd_size(&exif) + 12,
            (None, false) => ifd_size(&exif),
            (None, true) => 0,
        };
        let gps_pos = exif_pos + exif_size;
        let gps_size = if self.gps.is_empty() { 0 } else { ifd_size(&self.gps) };
        let mn_pos = gps_pos + gps_size;

        if exif_size > 0 {
            root.push((0x8769, Val::Long(vec![exif_pos as u32])));
        }
        if gps_size > 0 {
            root.push((0x8825, Val::Long(vec![gps_pos as u32])));
        }

        let mn_bytes = self.maker_note.as_ref().map(|spec| match spec {
            MakerNoteSpec::Ifd(entries) => {
                let mut buf = vec![0u8; mn_pos];
                write_ifd(&mut buf, entries, self.order, 0);
                buf.split_off(mn_pos)
            }
            MakerNoteSpec::PrefixedIfd(prefix, entries) => {
                let mut buf = vec![0u8; mn_pos];
                buf.extend_from_slice(prefix);
                write_ifd(&mut buf, entries, self.order, 0);
                buf.split_off(mn_pos)
            }
            MakerNoteSpec::Blob(b) => b.clone(),
        });
        if let Some(mn) = &mn_bytes {
            exif.push((
                0x927c,
                Val::Raw(7, mn.len() as u32, mn_pos as u32),
            ));
        }

        let mut buf = match self.order {
            ByteOrder::BigEndian => b"MM\0\x2a".to_vec(),
            _ => b"II\x2a\0".to_vec(),
        };
        buf.extend(u32_bytes(self.first_ifd_offset, self.order));
        buf.extend_from_slice(&self.header_extra);
        assert_eq!(buf.len(), root_pos);

        let next = if self.ifd1.is_empty() { 0 } else { ifd1_pos as u32 };
        write_ifd(&mut buf, &root, self.order, next);
        assert_eq!(buf.len(), ifd1_pos);
        if !self.ifd1.is_empty() {
            write_ifd(&mut buf, &self.ifd1, self.order, 0);
        }
        assert_eq!(buf.len(), exif_pos);
        if exif_size > 0 {
            write_ifd(&mut buf, &exif, self.order, 0);
        }
        assert_eq!(buf.len(), gps_pos);
        if gps_size > 0 {
            write_ifd(&mut buf, &self.gps, self.order, 0);
        }
        assert_eq!(buf.len(), mn_pos);
        if let Some(mn) = mn_bytes {
            buf.extend(mn);
        }
        buf
    }
}

fn u16_bytes(v: u16, order: ByteOrder) -> [u8; 2] {
    match order {
        ByteOrder::BigEndian => v.to_be_bytes(),
        _ => v.to_le_bytes(),
    }
}

fn u32_bytes(v: u32, order: ByteOrder) -> [u8; 4] {
    match order {
        ByteOrder::BigEndian => v.to_be_bytes(),
        _ => v.to_le_bytes(),
    }
}

fn padded_len(n: usize) -> usize {
    n + n % 2
}

fn ifd_size(entries: &Entries) -> usize {
    let data: usize = entries
        .iter()
        .map(|(_, v)| match v {
            Val::Raw(..) => 0,
            v => {
                let n = v.encode(ByteOrder::LittleEndian).len();
                if n > 4 {
                    padded_len(n)
                } else {
                    0
                }
            }
        })
        .sum();
    2 + entries.len() * 12 + 4 + data
}

/// Appends an IFD at the end of `buf`. Offsets are relative to the start
/// of `buf`.
pub fn write_ifd(buf: &mut Vec<u8>, entries: &Entries, order: ByteOrder, next: u32) {
    let start = buf.len();
    let mut data_pos = start + 2 + entries.len() * 12 + 4;
    let mut data = Vec::new();

    buf.extend(u16_bytes(entries.len() as u16, order));
    for (id, v) in entries {
        buf.extend(u16_bytes(*id, order));
        buf.extend(u16_bytes(v.type_code(), order));
        buf.extend(u32_bytes(v.count(), order));
        if let Val::Raw(_, _, slot) = v {
            buf.extend(u32_bytes(*slot, order));
            continue;
        }
        let bytes = v.encode(order);
        if bytes.len() <= 4 {
            let mut slot = [0u8; 4];
            slot[..bytes.len()].copy_from_slice(&bytes);
            buf.extend(slot);
        } else {
            buf.extend(u32_bytes(data_pos as u32, order));
            let n = padded_len(bytes.len());
            data.extend(&bytes);
            data.resize(data.len() + n - bytes.len(), 0);
            data_pos += n;
        }
    }
    buf.extend(u32_bytes(next, order));
    buf.extend(data);
}

/// Wraps a TIFF structure into a JPEG: SOI, JFIF APP0, Exif APP1, an
/// optional XMP APP1, a tiny scan and EOI.
pub fn jpeg_with(tiff: Option<&[u8]>, xmp: Option<&str>) -> Vec<u8> {
    let mut out = BytesMut::new();
    out.put_slice(&[0xFF, 0xD8]);
    out.put_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    out.put_slice(b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0");
    if let Some(tiff) = tiff {
        out.put_slice(&[0xFF, 0xE1]);
        out.put_u16(tiff.len() as u16 + 8);
        out.put_slice(b"Exif\0\0");
        out.put_slice(tiff);
    }
    if let Some(xmp) = xmp {
        let ns = b"http://ns.adobe.com/xap/1.0/\0";
        out.put_slice(&[0xFF, 0xE1]);
        out.put_u16((ns.len() + xmp.len() + 2) as u16);
        out.put_slice(ns);
        out.put_slice(xmp.as_bytes());
    }
    out.put_slice(&[0xFF, 0xDB, 0x00, 0x04, 0x00, 0x00]);
    out.put_slice(&[0xFF, 0xDA, 0x00, 0x08, 1, 2, 3, 4, 5, 6]);
    // Entropy-coded data with a stuffed 0xFF and a restart marker.
    out.put_slice(&[0x12, 0xFF, 0x00, 0x34, 0xFF, 0xD0, 0x56]);
    out.put_slice(&[0xFF, 0xD9]);
    out.to_vec()
}

/// An ISOBMFF box: big-endian size, type and body.
pub fn bmff_box(box_type: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = BytesMut::new();
    out.put_u32(8 + body.len() as u32);
    out.put_slice(box_type);
    out.put_slice(body);
    out.to_vec()
}

/// A full box: version and flags precede the body.
pub fn bmff_full_box(box_type: &[u8; 4], version: u8, flags: u32, body: &[u8]) -> Vec<u8> {
    let mut b = vec![version];
    b.extend_from_slice(&flags.to_be_bytes()[1..]);
    b.extend_from_slice(body);
    bmff_box(box_type, &b)
}

pub fn ftyp(brand: &[u8; 4]) -> Vec<u8> {
    let mut body = brand.to_vec();
    body.extend_from_slice(&[0, 0, 0, 1]);
    body.extend_from_slice(brand);
    bmff_box(b"ftyp", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        let data = TiffBuilder::new(ByteOrder::LittleEndian)
            .root(0x010f, Val::ascii("Canon"))
            .root(0x0112, Val::Short(vec![1]))
            .exif(0x829d, Val::Rational(vec![(12, 10)]))
            .build();
        assert_eq!(&data[..8], b"II\x2a\0\x08\0\0\0");
        // Make, Orientation and ExifOffset.
        assert_eq!(u16::from_le_bytes([data[8], data[9]]), 3);
        // "Canon\0" is 6 bytes: stored out of line right after the IFD.
        let make_pos = 8 + 2 + 3 * 12 + 4;
        assert_eq!(&data[make_pos..make_pos + 6], b"Canon\0");
    }
}
