use std::fmt::Display;

use nom::number::Endianness;
#[cfg(feature = "json_dump")]
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Represent a materialized tag value.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryValue {
    Text(String),
    URational(URational),
    IRational(IRational),

    U8(u8),
    U16(u16),
    U32(u32),

    I8(i8),
    I16(i16),
    I32(i32),

    F32(f32),
    F64(f64),

    Undefined(Vec<u8>),

    U8Array(Vec<u8>),
    U16Array(Vec<u16>),
    U32Array(Vec<u32>),
    I8Array(Vec<i8>),
    I16Array(Vec<i16>),
    I32Array(Vec<i32>),
    URationalArray(Vec<URational>),
    IRationalArray(Vec<IRational>),
}

/// The bytes of one tag value, already resolved (embedded or indirect).
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct EntryData<'a> {
    pub endian: Endianness,
    pub tag: u16,
    pub data: &'a [u8],
    pub data_format: TagType,
    pub components_num: u32,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub(crate) enum ParseEntryError {
    #[error("size is too big")]
    EntrySizeTooBig,

    #[error("data is invalid: {0}")]
    InvalidData(String),

    #[error("data format is unsupported: {0}")]
    Unsupported(String),
}

use ParseEntryError as Error;

impl EntryData<'_> {
    // Ensure that the returned Vec is not empty.
    fn try_as_rationals<T: TryFromBytes>(&self) -> Result<Vec<Rational<T>>, Error> {
        if self.components_num == 0 {
            return Err(Error::InvalidData("components is 0".to_string()));
        }

        let mut vec = Vec::with_capacity(self.components_num as usize);
        for i in 0..self.components_num as usize {
            let Some(bs) = self.data.get(i * 8..) else {
                return Err(Error::InvalidData("rational array is truncated".into()));
            };
            vec.push(decode_rational::<T>(bs, self.endian)?);
        }
        Ok(vec)
    }

    fn try_as_vec<T: TryFromBytes>(&self) -> Result<Vec<T>, Error> {
        let size = std::mem::size_of::<T>();
        (0..self.components_num as usize)
            .map(|i| {
                self.data
                    .get(i * size..)
                    .ok_or_else(|| Error::InvalidData("array is truncated".into()))
                    .and_then(|bs| T::try_from_bytes(bs, self.endian))
            })
            .collect()
    }
}

impl EntryValue {
    /// Materialize an IFD entry value.
    ///
    /// ```txt
    /// | 2   | 2           | 4              | 4                      |
    /// | tag | data format | components num | data (value or offset) |
    /// ```
    ///
    /// `data` must already hold exactly `component_size * components_num`
    /// bytes; the caller resolves embedded versus indirect storage.
    pub(crate) fn parse(entry: &EntryData) -> Result<EntryValue, Error> {
        let endian = entry.endian;
        let data = entry.data;
        let components_num = entry.components_num;

        if data.is_empty() || components_num == 0 {
            return Ok(EntryValue::variant_default(entry.data_format));
        }
        let expected = entry.data_format.component_size() * components_num as usize;
        if data.len() < expected {
            return Err(Error::InvalidData(format!(
                "tag 0x{:04x} needs {expected} bytes, got {}",
                entry.tag,
                data.len()
            )));
        }
        let data = &data[..expected];

        match entry.data_format {
            TagType::U8 => match components_num {
                1 => Ok(Self::U8(data[0])),
                _ => Ok(Self::U8Array(data.to_vec())),
            },
            TagType::Text | TagType::Utf8 => Ok(EntryValue::Text(get_cstr(data))),
            TagType::U16 => match components_num {
                1 => Ok(Self::U16(u16::try_from_bytes(data, endian)?)),
                _ => Ok(Self::U16Array(entry.try_as_vec()?)),
            },
            TagType::U32 | TagType::Ifd => match components_num {
                1 => Ok(Self::U32(u32::try_from_bytes(data, endian)?)),
                _ => Ok(Self::U32Array(entry.try_as_vec()?)),
            },
            TagType::URational => {
                let rationals = entry.try_as_rationals::<u32>()?;
                if rationals.len() == 1 {
                    Ok(Self::URational(rationals[0]))
                } else {
                    Ok(Self::URationalArray(rationals))
                }
            }
            TagType::I8 => match components_num {
                1 => Ok(Self::I8(data[0] as i8)),
                _ => Ok(Self::I8Array(data.iter().map(|b| *b as i8).collect())),
            },
            TagType::Undefined => Ok(Self::Undefined(data.to_vec())),
            TagType::I16 => match components_num {
                1 => Ok(Self::I16(i16::try_from_bytes(data, endian)?)),
                _ => Ok(Self::I16Array(entry.try_as_vec()?)),
            },
            TagType::I32 => match components_num {
                1 => Ok(Self::I32(i32::try_from_bytes(data, endian)?)),
                _ => Ok(Self::I32Array(entry.try_as_vec()?)),
            },
            TagType::IRational => {
                let rationals = entry.try_as_rationals::<i32>()?;
                if rationals.len() == 1 {
                    Ok(Self::IRational(rationals[0]))
                } else {
                    Ok(Self::IRationalArray(rationals))
                }
            }
            TagType::F32 => match components_num {
                1 => Ok(Self::F32(f32::try_from_bytes(data, endian)?)),
                x => Err(Error::Unsupported(format!("float with {x} components"))),
            },
            TagType::F64 => match components_num {
                1 => Ok(Self::F64(f64::try_from_bytes(data, endian)?)),
                x => Err(Error::Unsupported(format!("double with {x} components"))),
            },
        }
    }

    fn variant_default(data_format: TagType) -> EntryValue {
        match data_format {
            TagType::U8 => Self::U8(0),
            TagType::Text | TagType::Utf8 => Self::Text(String::default()),
            TagType::U16 => Self::U16(0),
            TagType::U32 | TagType::Ifd => Self::U32(0),
            TagType::URational => Self::URational(URational::default()),
            TagType::I8 => Self::I8(0),
            TagType::Undefined => Self::Undefined(Vec::default()),
            TagType::I16 => Self::I16(0),
            TagType::I32 => Self::I32(0),
            TagType::IRational => Self::IRational(IRational::default()),
            TagType::F32 => Self::F32(0.0),
            TagType::F64 => Self::F64(0.0),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            EntryValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            EntryValue::U8(v) => Some(*v),
            EntryValue::U8Array(v) => v.first().copied(),
            _ => None,
        }
    }

    /// Any unsigned integer value that fits in u16.
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            EntryValue::U16(v) => Some(*v),
            EntryValue::U8(v) => Some(*v as u16),
            EntryValue::U32(v) => u16::try_from(*v).ok(),
            EntryValue::U16Array(v) => v.first().copied(),
            _ => None,
        }
    }

    /// Any unsigned integer value, widened to u32.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            EntryValue::U32(v) => Some(*v),
            EntryValue::U16(v) => Some(*v as u32),
            EntryValue::U8(v) => Some(*v as u32),
            EntryValue::U32Array(v) => v.first().copied(),
            EntryValue::U16Array(v) => v.first().map(|x| *x as u32),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            EntryValue::I32(v) => Some(*v),
            EntryValue::I16(v) => Some(*v as i32),
            EntryValue::I8(v) => Some(*v as i32),
            _ => None,
        }
    }

    pub fn as_u16_slice(&self) -> Option<&[u16]> {
        match self {
            EntryValue::U16Array(v) => Some(v),
            EntryValue::U16(v) => Some(std::slice::from_ref(v)),
            _ => None,
        }
    }

    pub fn as_u32_slice(&self) -> Option<&[u32]> {
        match self {
            EntryValue::U32Array(v) => Some(v),
            EntryValue::U32(v) => Some(std::slice::from_ref(v)),
            _ => None,
        }
    }

    pub fn as_i32_slice(&self) -> Option<&[i32]> {
        match self {
            EntryValue::I32Array(v) => Some(v),
            EntryValue::I32(v) => Some(std::slice::from_ref(v)),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            EntryValue::Undefined(v) | EntryValue::U8Array(v) => Some(v),
            EntryValue::U8(v) => Some(std::slice::from_ref(v)),
            _ => None,
        }
    }

    pub fn as_urational(&self) -> Option<URational> {
        match self {
            EntryValue::URational(v) => Some(*v),
            EntryValue::URationalArray(v) => v.first().copied(),
            _ => None,
        }
    }

    pub fn as_irational(&self) -> Option<IRational> {
        match self {
            EntryValue::IRational(v) => Some(*v),
            EntryValue::IRationalArray(v) => v.first().copied(),
            _ => None,
        }
    }

    pub fn as_urational_array(&self) -> Option<&[URational]> {
        match self {
            EntryValue::URationalArray(v) => Some(v),
            EntryValue::URational(v) => Some(std::slice::from_ref(v)),
            _ => None,
        }
    }

    /// Any integer value or array, widened to i64.
    pub fn to_i64_vec(&self) -> Option<Vec<i64>> {
        let v = match self {
            EntryValue::U8(v) => vec![*v as i64],
            EntryValue::U16(v) => vec![*v as i64],
            EntryValue::U32(v) => vec![*v as i64],
            EntryValue::I8(v) => vec![*v as i64],
            EntryValue::I16(v) => vec![*v as i64],
            EntryValue::I32(v) => vec![*v as i64],
            EntryValue::U8Array(v) => v.iter().map(|x| *x as i64).collect(),
            EntryValue::U16Array(v) => v.iter().map(|x| *x as i64).collect(),
            EntryValue::U32Array(v) => v.iter().map(|x| *x as i64).collect(),
            EntryValue::I8Array(v) => v.iter().map(|x| *x as i64).collect(),
            EntryValue::I16Array(v) => v.iter().map(|x| *x as i64).collect(),
            EntryValue::I32Array(v) => v.iter().map(|x| *x as i64).collect(),
            _ => return None,
        };
        Some(v)
    }
}

/// TIFF field types.
///
/// ```txt
/// | Value           |             1 |             2 |              3 |               4 |                 5 |            6 |
/// |-----------------+---------------+---------------+----------------+-----------------+-------------------+--------------|
/// | Format          | unsigned byte | ascii strings | unsigned short |   unsigned long | unsigned rational |  signed byte |
/// | Bytes/component |             1 |             1 |              2 |               4 |                 8 |            1 |
///
/// | Value           |             7 |             8 |              9 |              10 |                11 |           12 |
/// |-----------------+---------------+---------------+----------------+-----------------+-------------------+--------------|
/// | Format          |     undefined |  signed short |    signed long | signed rational |      single float | double float |
/// | Bytes/component |             1 |             2 |              4 |               8 |                 4 |            8 |
/// ```
///
/// `13` is an IFD offset (a long) and `129` is a UTF-8 string whose NUL
/// terminator is optional.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagType {
    U8 = 1,
    Text = 2,
    U16 = 3,
    U32 = 4,
    URational = 5,
    I8 = 6,
    Undefined = 7,
    I16 = 8,
    I32 = 9,
    IRational = 10,
    F32 = 11,
    F64 = 12,
    Ifd = 13,
    Utf8 = 129,
}

impl TagType {
    pub fn component_size(&self) -> usize {
        match self {
            Self::U8 | Self::I8 | Self::Text | Self::Utf8 | Self::Undefined => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 | Self::Ifd => 4,
            Self::URational | Self::IRational | Self::F64 => 8,
        }
    }
}

impl TryFrom<u16> for TagType {
    type Error = crate::Error;
    fn try_from(v: u16) -> Result<Self, Self::Error> {
        Ok(match v {
            1 => Self::U8,
            2 => Self::Text,
            3 => Self::U16,
            4 => Self::U32,
            5 => Self::URational,
            6 => Self::I8,
            7 => Self::Undefined,
            8 => Self::I16,
            9 => Self::I32,
            10 => Self::IRational,
            11 => Self::F32,
            12 => Self::F64,
            13 => Self::Ifd,
            129 => Self::Utf8,
            other => return Err(crate::Error::TagTypeNotValid(other)),
        })
    }
}

#[cfg(feature = "json_dump")]
impl Serialize for EntryValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl Display for EntryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryValue::Text(v) => f.write_str(v),
            EntryValue::URational(v) => Display::fmt(v, f),
            EntryValue::IRational(v) => Display::fmt(v, f),
            EntryValue::U32(v) => Display::fmt(&v, f),
            EntryValue::U16(v) => Display::fmt(&v, f),
            EntryValue::I16(v) => Display::fmt(&v, f),
            EntryValue::I32(v) => Display::fmt(&v, f),
            EntryValue::F32(v) => Display::fmt(&v, f),
            EntryValue::F64(v) => Display::fmt(&v, f),
            EntryValue::U8(v) => Display::fmt(&v, f),
            EntryValue::I8(v) => Display::fmt(&v, f),
            EntryValue::Undefined(v) => write!(f, "Undefined[{}]", list_to_string(v, 8)),
            EntryValue::U8Array(v) => write!(f, "[{}]", list_to_string(v, 8)),
            EntryValue::U16Array(v) => write!(f, "[{}]", list_to_string(v, 8)),
            EntryValue::U32Array(v) => write!(f, "[{}]", list_to_string(v, 8)),
            EntryValue::I8Array(v) => write!(f, "[{}]", list_to_string(v, 8)),
            EntryValue::I16Array(v) => write!(f, "[{}]", list_to_string(v, 8)),
            EntryValue::I32Array(v) => write!(f, "[{}]", list_to_string(v, 8)),
            EntryValue::URationalArray(v) => {
                write!(f, "URationalArray[{}]", list_to_string(v, 3))
            }
            EntryValue::IRationalArray(v) => {
                write!(f, "IRationalArray[{}]", list_to_string(v, 3))
            }
        }
    }
}

// Display up to `max` components, and replace the rest with ellipsis
fn list_to_string<T: Display>(values: &[T], max: usize) -> String {
    values
        .iter()
        .map(|x| x.to_string())
        .take(max + 1)
        .enumerate()
        .map(|(i, x)| if i >= max { "...".to_owned() } else { x })
        .collect::<Vec<String>>()
        .join(", ")
}

impl From<u16> for EntryValue {
    fn from(value: u16) -> Self {
        EntryValue::U16(value)
    }
}

impl From<u32> for EntryValue {
    fn from(value: u32) -> Self {
        EntryValue::U32(value)
    }
}

impl From<&str> for EntryValue {
    fn from(value: &str) -> Self {
        EntryValue::Text(value.to_owned())
    }
}

impl From<(u32, u32)> for EntryValue {
    fn from(value: (u32, u32)) -> Self {
        Self::URational(value.into())
    }
}

impl From<(i32, i32)> for EntryValue {
    fn from(value: (i32, i32)) -> Self {
        Self::IRational(value.into())
    }
}

pub type URational = Rational<u32>;
pub type IRational = Rational<i32>;

/// A numerator/denominator pair. The denominator may be zero; nothing here
/// divides unless asked to.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Hash)]
pub struct Rational<T>(pub T, pub T);

impl<T> Rational<T> {
    pub const fn new(numerator: T, denominator: T) -> Self {
        Self(numerator, denominator)
    }
}

impl<T> Rational<T>
where
    T: Copy + Into<f64>,
{
    /// Returns `None` when the denominator is zero.
    pub fn to_f64(&self) -> Option<f64> {
        let den: f64 = self.1.into();
        if den == 0.0 {
            None
        } else {
            Some(self.0.into() / den)
        }
    }
}

impl<T: Display> Display for Rational<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0, self.1)
    }
}

impl<T> From<(T, T)> for Rational<T>
where
    T: Copy,
{
    fn from(value: (T, T)) -> Self {
        Self(value.0, value.1)
    }
}

impl<T> From<Rational<T>> for (T, T)
where
    T: Copy,
{
    fn from(value: Rational<T>) -> Self {
        (value.0, value.1)
    }
}

/// ASCII value with trailing NUL and space bytes stripped. Bytes after the
/// first NUL are ignored; invalid UTF-8 is replaced rather than rejected.
pub(crate) fn get_cstr(data: &[u8]) -> String {
    let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
    let trimmed = data[..end]
        .iter()
        .rposition(|b| *b != b' ')
        .map(|i| &data[..=i])
        .unwrap_or(&[]);
    String::from_utf8_lossy(trimmed).into_owned()
}

pub(crate) trait TryFromBytes: Sized {
    fn try_from_bytes(bs: &[u8], endian: Endianness) -> Result<Self, Error>;
}

macro_rules! impl_try_from_bytes {
    ($($ty:ty),*) => {
        $(
            impl TryFromBytes for $ty {
                fn try_from_bytes(bs: &[u8], endian: Endianness) -> Result<Self, Error> {
                    fn make_err<T>() -> Error {
                        Error::InvalidData(format!(
                            "data is too small to convert to {}",
                            std::any::type_name::<T>(),
                        ))
                    }
                    let (int_bytes, _) = bs
                        .split_at_checked(std::mem::size_of::<Self>())
                        .ok_or_else(make_err::<Self>)?;
                    let int_bytes = int_bytes.try_into().map_err(|_| make_err::<Self>())?;
                    Ok(match endian {
                        Endianness::Big => Self::from_be_bytes(int_bytes),
                        Endianness::Little => Self::from_le_bytes(int_bytes),
                        Endianness::Native => Self::from_ne_bytes(int_bytes),
                    })
                }
            }
        )*
    };
}

impl_try_from_bytes!(u16, i16, u32, i32, f32, f64);

pub(crate) fn decode_rational<T: TryFromBytes>(
    data: &[u8],
    endian: Endianness,
) -> Result<Rational<T>, Error> {
    if data.len() < 8 {
        return Err(Error::InvalidData(
            "data is too small to decode a rational".to_string(),
        ));
    }

    let numerator = T::try_from_bytes(data, endian)?;
    let denominator = T::try_from_bytes(&data[4..], endian)?; // Safe-slice
    Ok(Rational::<T>(numerator, denominator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn entry(data: &[u8], fmt: TagType, n: u32, endian: Endianness) -> EntryData<'_> {
        EntryData {
            endian,
            tag: 0x0110,
            data,
            data_format: fmt,
            components_num: n,
        }
    }

    #[test_case(b"Canon\0", "Canon")]
    #[test_case(b"NIKON D7100 \0\0", "NIKON D7100")]
    #[test_case(b"SONY   ", "SONY")]
    #[test_case(b"abc\0def", "abc")]
    #[test_case(b"\0\0\0", "")]
    fn ascii_is_trimmed(data: &[u8], expect: &str) {
        let v = EntryValue::parse(&entry(data, TagType::Text, data.len() as u32, Endianness::Little))
            .unwrap();
        assert_eq!(v, EntryValue::Text(expect.to_owned()));
    }

    #[test]
    fn shorts_and_longs() {
        let data = [0x01, 0x00, 0x02, 0x00];
        let v = EntryValue::parse(&entry(&data, TagType::U16, 2, Endianness::Little)).unwrap();
        assert_eq!(v, EntryValue::U16Array(vec![1, 2]));

        let v = EntryValue::parse(&entry(&data, TagType::U16, 1, Endianness::Big)).unwrap();
        assert_eq!(v, EntryValue::U16(0x0100));

        let v = EntryValue::parse(&entry(&data, TagType::U32, 1, Endianness::Little)).unwrap();
        assert_eq!(v, EntryValue::U32(0x00020001));
    }

    #[test_case(&[0xff], 1, EntryValue::I8(-1))]
    #[test_case(&[0xff, 0x02, 0x80], 3, EntryValue::I8Array(vec![-1, 2, -128]))]
    #[test_case(&[0x7f, 0x00, 0x00, 0x00], 2, EntryValue::I8Array(vec![127, 0]))]
    fn signed_bytes(data: &[u8], n: u32, expect: EntryValue) {
        let v = EntryValue::parse(&entry(data, TagType::I8, n, Endianness::Big)).unwrap();
        assert_eq!(v, expect);
        assert_eq!(v.to_i64_vec().map(|v| v.len()), Some(n as usize));
    }

    #[test]
    fn zero_denominator_is_kept() {
        let data = [0, 0, 0, 13, 0, 0, 0, 0];
        let v = EntryValue::parse(&entry(&data, TagType::URational, 1, Endianness::Big)).unwrap();
        let r = v.as_urational().unwrap();
        assert_eq!((r.0, r.1), (13, 0));
        assert_eq!(r.to_f64(), None);
    }

    #[test]
    fn signed_rational() {
        let data = [0xFF, 0xFF, 0xFF, 0xFD, 0, 0, 0, 3];
        let v = EntryValue::parse(&entry(&data, TagType::IRational, 1, Endianness::Big)).unwrap();
        assert_eq!(v, EntryValue::IRational(Rational(-3, 3)));
        assert_eq!(v.as_irational().unwrap().to_f64(), Some(-1.0));
    }

    #[test]
    fn truncated_value_is_an_error() {
        let data = [0u8; 4];
        let err = EntryValue::parse(&entry(&data, TagType::URational, 1, Endianness::Big));
        assert!(matches!(err, Err(Error::InvalidData(_))));
    }

    #[test_case(1, Some(TagType::U8))]
    #[test_case(13, Some(TagType::Ifd))]
    #[test_case(129, Some(TagType::Utf8))]
    #[test_case(0, None)]
    #[test_case(14, None)]
    fn tag_type_codes(code: u16, expect: Option<TagType>) {
        assert_eq!(TagType::try_from(code).ok(), expect);
    }
}
