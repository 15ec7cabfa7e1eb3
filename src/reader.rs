//! Positioned, random-access reads over the source bytes.
//!
//! Every walker in this crate reads through [`ReadAt`] with explicit
//! absolute offsets. Offsets found inside a TIFF structure are relative to
//! its header, so they travel together with the byte order as a
//! [`TiffCursor`].

use std::{fmt::Display, io};

use nom::number::Endianness;

/// A source that can be read at arbitrary absolute offsets without any
/// shared cursor state.
///
/// A reader that wants to cancel an ongoing decode can return an error of
/// kind [`io::ErrorKind::Interrupted`]; it is propagated unchanged.
pub trait ReadAt {
    /// Reads up to `buf.len()` bytes starting at `offset`. Returns the
    /// number of bytes read, 0 at end of data.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Total size of the source, when known.
    fn size(&self) -> Option<u64> {
        None
    }
}

impl ReadAt for [u8] {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= self.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> Option<u64> {
        Some(self.len() as u64)
    }
}

impl ReadAt for Vec<u8> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.as_slice().read_at(buf, offset)
    }

    fn size(&self) -> Option<u64> {
        Some(self.len() as u64)
    }
}

impl ReadAt for bytes::Bytes {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.as_ref().read_at(buf, offset)
    }

    fn size(&self) -> Option<u64> {
        Some(self.len() as u64)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for &T {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }

    fn size(&self) -> Option<u64> {
        (**self).size()
    }
}

#[cfg(unix)]
impl ReadAt for std::fs::File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }

    fn size(&self) -> Option<u64> {
        self.metadata().ok().map(|m| m.len())
    }
}

#[cfg(windows)]
impl ReadAt for std::fs::File {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(self, buf, offset)
    }

    fn size(&self) -> Option<u64> {
        self.metadata().ok().map(|m| m.len())
    }
}

/// Fills `buf` from `offset`, failing with [`crate::Error::NotEnoughData`]
/// if the source ends first.
pub(crate) fn read_exact_at<R: ReadAt + ?Sized>(
    reader: &R,
    buf: &mut [u8],
    offset: u64,
) -> crate::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let pos = offset
            .checked_add(filled as u64)
            .ok_or(crate::Error::ReadNegativeOffset)?;
        let n = reader.read_at(&mut buf[filled..], pos)?;
        if n == 0 {
            return Err(crate::Error::NotEnoughData {
                offset,
                needed: buf.len(),
            });
        }
        filled += n;
    }
    Ok(())
}

/// Reads `len` bytes at `offset` into a new vector.
pub(crate) fn read_vec_at<R: ReadAt + ?Sized>(
    reader: &R,
    offset: u64,
    len: usize,
) -> crate::Result<Vec<u8>> {
    if let Some(size) = reader.size() {
        if offset.saturating_add(len as u64) > size {
            return Err(crate::Error::NotEnoughData {
                offset,
                needed: len,
            });
        }
    }
    let mut buf = vec![0u8; len];
    read_exact_at(reader, &mut buf, offset)?;
    Ok(buf)
}

/// Reads up to `buf.len()` bytes and returns how many were available.
pub(crate) fn read_up_to<R: ReadAt + ?Sized>(
    reader: &R,
    buf: &mut [u8],
    offset: u64,
) -> crate::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let pos = offset
            .checked_add(filled as u64)
            .ok_or(crate::Error::ReadNegativeOffset)?;
        let n = reader.read_at(&mut buf[filled..], pos)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Byte order of a TIFF structure.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
    #[default]
    Unknown,
}

impl ByteOrder {
    pub fn from_marker(marker: &[u8]) -> ByteOrder {
        match marker {
            [b'I', b'I', ..] => ByteOrder::LittleEndian,
            [b'M', b'M', ..] => ByteOrder::BigEndian,
            _ => ByteOrder::Unknown,
        }
    }

    pub fn endianness(self) -> crate::Result<Endianness> {
        match self {
            ByteOrder::BigEndian => Ok(Endianness::Big),
            ByteOrder::LittleEndian => Ok(Endianness::Little),
            ByteOrder::Unknown => Err(crate::Error::InvalidHeader("unknown byte order")),
        }
    }

    pub fn u16(self, bs: [u8; 2]) -> u16 {
        match self {
            ByteOrder::BigEndian => u16::from_be_bytes(bs),
            _ => u16::from_le_bytes(bs),
        }
    }

    pub fn u32(self, bs: [u8; 4]) -> u32 {
        match self {
            ByteOrder::BigEndian => u32::from_be_bytes(bs),
            _ => u32::from_le_bytes(bs),
        }
    }

    pub fn i16(self, bs: [u8; 2]) -> i16 {
        self.u16(bs) as i16
    }

    pub fn i32(self, bs: [u8; 4]) -> i32 {
        self.u32(bs) as i32
    }
}

impl From<Endianness> for ByteOrder {
    fn from(value: Endianness) -> Self {
        match value {
            Endianness::Big => ByteOrder::BigEndian,
            Endianness::Little => ByteOrder::LittleEndian,
            #[cfg(target_endian = "big")]
            Endianness::Native => ByteOrder::BigEndian,
            #[cfg(target_endian = "little")]
            Endianness::Native => ByteOrder::LittleEndian,
        }
    }
}

impl Display for ByteOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ByteOrder::BigEndian => "big-endian",
            ByteOrder::LittleEndian => "little-endian",
            ByteOrder::Unknown => "unknown",
        })
    }
}

/// The `(origin, byte_order)` pair every TIFF sub-walker works against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TiffCursor {
    /// Absolute position of the `II`/`MM` marker.
    pub origin: u64,
    pub order: ByteOrder,
}

impl TiffCursor {
    pub fn new(origin: u64, order: ByteOrder) -> Self {
        Self { origin, order }
    }

    /// Absolute position of an offset relative to the origin.
    pub fn absolute(&self, relative: u32) -> crate::Result<u64> {
        self.origin
            .checked_add(relative as u64)
            .ok_or(crate::Error::ReadNegativeOffset)
    }

    pub fn read_u16<R: ReadAt + ?Sized>(&self, reader: &R, relative: u32) -> crate::Result<u16> {
        let mut bs = [0u8; 2];
        read_exact_at(reader, &mut bs, self.absolute(relative)?)?;
        Ok(self.order.u16(bs))
    }

    pub fn read_u32<R: ReadAt + ?Sized>(&self, reader: &R, relative: u32) -> crate::Result<u32> {
        let mut bs = [0u8; 4];
        read_exact_at(reader, &mut bs, self.absolute(relative)?)?;
        Ok(self.order.u32(bs))
    }

    pub fn read_bytes<R: ReadAt + ?Sized>(
        &self,
        reader: &R,
        relative: u32,
        len: usize,
    ) -> crate::Result<Vec<u8>> {
        read_vec_at(reader, self.absolute(relative)?, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(b"II*\0", ByteOrder::LittleEndian)]
    #[test_case(b"MM\0*", ByteOrder::BigEndian)]
    #[test_case(b"XX\0*", ByteOrder::Unknown)]
    #[test_case(b"I", ByteOrder::Unknown)]
    fn byte_order_marker(marker: &[u8], expect: ByteOrder) {
        assert_eq!(ByteOrder::from_marker(marker), expect);
    }

    #[test]
    fn read_past_end() {
        let data = vec![1u8, 2, 3];
        let mut buf = [0u8; 4];
        let err = read_exact_at(&data, &mut buf, 0).unwrap_err();
        assert!(matches!(err, crate::Error::NotEnoughData { .. }));

        assert_eq!(read_up_to(&data, &mut buf, 1).unwrap(), 2);
        assert_eq!(&buf[..2], &[2, 3]);
        assert_eq!(data.read_at(&mut buf, 100).unwrap(), 0);
    }

    #[test]
    fn cursor_reads_relative_to_origin() {
        let data = [0xAAu8, 0xBB, 0x01, 0x02, 0x03, 0x04, 0x00, 0x00, 0x00, 0x02];
        let le = TiffCursor::new(2, ByteOrder::LittleEndian);
        assert_eq!(le.read_u16(&data[..], 0).unwrap(), 0x0201);
        assert_eq!(le.read_u32(&data[..], 0).unwrap(), 0x04030201);

        let be = TiffCursor::new(2, ByteOrder::BigEndian);
        assert_eq!(be.read_u16(&data[..], 0).unwrap(), 0x0102);
        assert_eq!(be.read_u32(&data[..], 4).unwrap(), 2);

        assert!(matches!(
            TiffCursor::new(u64::MAX, ByteOrder::BigEndian).absolute(1),
            Err(crate::Error::ReadNegativeOffset)
        ));
    }

    // Yields one zero byte at any offset.
    struct Trickle;

    impl ReadAt for Trickle {
        fn read_at(&self, buf: &mut [u8], _offset: u64) -> io::Result<usize> {
            buf[0] = 0;
            Ok(1)
        }
    }

    #[test_case(0, Some(4))]
    #[test_case(u64::MAX - 3, Some(4))]
    #[test_case(u64::MAX - 2, None)]
    #[test_case(u64::MAX, None)]
    fn read_up_to_near_the_end_of_the_offset_space(offset: u64, read: Option<usize>) {
        let mut buf = [0xffu8; 4];
        match read {
            Some(n) => assert_eq!(read_up_to(&Trickle, &mut buf, offset).unwrap(), n),
            None => assert!(matches!(
                read_up_to(&Trickle, &mut buf, offset),
                Err(crate::Error::ReadNegativeOffset)
            )),
        }
        assert!(matches!(
            read_exact_at(&Trickle, &mut buf, u64::MAX),
            Err(crate::Error::ReadNegativeOffset)
        ));
    }

    #[test]
    fn unknown_order_is_rejected() {
        assert!(ByteOrder::Unknown.endianness().is_err());
        assert_eq!(
            ByteOrder::BigEndian.endianness().unwrap(),
            Endianness::Big
        );
    }
}
