//! Canon Timed MetaData, the per-frame records of the CTMD track in CR3
//! files.

use chrono::{NaiveDate, NaiveDateTime};
use nom::{
    bytes::complete::take,
    number::complete::{le_u16, le_u32, le_u8},
    sequence::tuple,
    IResult,
};

use crate::{
    exif::{Exif, IfdId, IfdWalker, TagMap, TiffHeader},
    reader::TiffCursor,
    values::URational,
};

const RECORD_HEADER_SIZE: usize = 12;
const EXIF_INFO_HEADER_SIZE: usize = 8;

const EXIF_IFD_POINTER: u32 = 0x8769;
const MAKER_NOTE: u32 = 0x927c;

/// One embedded TIFF of an ExifInfo record.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CtmdExif {
    /// Which IFD the TIFF carries, e.g. `0x8769` for the Exif IFD.
    pub tag: u32,
    pub tags: TagMap,
}

#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum CtmdRecord {
    TimeStamp(NaiveDateTime),
    FocalInfo {
        focal_length: URational,
    },
    ExposureInfo {
        f_number: URational,
        exposure_time: URational,
        iso: u32,
    },
    ExifInfo {
        kind: u16,
        entries: Vec<CtmdExif>,
    },
    Unknown {
        kind: u16,
        length: usize,
    },
}

fn record_header(input: &[u8]) -> IResult<&[u8], (u32, u16)> {
    let (rest, (size, kind, _)) = tuple((le_u32, le_u16, take(6usize)))(input)?;
    Ok((rest, (size, kind)))
}

fn rational16(input: &[u8]) -> IResult<&[u8], URational> {
    let (rest, (num, den)) = tuple((le_u16, le_u16))(input)?;
    Ok((rest, URational::new(num as u32, den as u32)))
}

fn timestamp(input: &[u8]) -> IResult<&[u8], (u16, [u8; 6])> {
    let (rest, (_, year, month, day, hour, minute, second, hundredths)) =
        tuple((take(2usize), le_u16, le_u8, le_u8, le_u8, le_u8, le_u8, le_u8))(input)?;
    Ok((rest, (year, [month, day, hour, minute, second, hundredths])))
}

fn malformed(_: nom::Err<nom::error::Error<&[u8]>>) -> crate::Error {
    crate::Error::MalformedCtmd("record payload is too short")
}

/// Splits a CTMD sample into records. The record sizes must add up to the
/// sample length exactly.
#[tracing::instrument(skip_all, fields(len = data.len()))]
pub fn parse_ctmd(data: &[u8], max_ifd_entries: u16) -> crate::Result<Vec<CtmdRecord>> {
    let mut records = Vec::new();
    let mut remain = data;
    while !remain.is_empty() {
        let (_, (size, kind)) = record_header(remain)
            .map_err(|_| crate::Error::MalformedCtmd("truncated record header"))?;
        let size = size as usize;
        if size < RECORD_HEADER_SIZE || size > remain.len() {
            return Err(crate::Error::MalformedCtmd("record size exceeds the sample"));
        }
        let payload = &remain[RECORD_HEADER_SIZE..size];
        let record = CtmdRecord::decode(kind, payload, max_ifd_entries)?;
        tracing::debug!(kind, size, "ctmd record");
        records.push(record);
        remain = &remain[size..];
    }
    Ok(records)
}

impl CtmdRecord {
    fn decode(kind: u16, payload: &[u8], max_ifd_entries: u16) -> crate::Result<CtmdRecord> {
        let record = match kind {
            1 => {
                let (_, (year, [month, day, hour, minute, second, hundredths])) =
                    timestamp(payload).map_err(malformed)?;
                let ts = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
                    .and_then(|d| {
                        d.and_hms_milli_opt(
                            hour as u32,
                            minute as u32,
                            second as u32,
                            hundredths as u32 * 10,
                        )
                    })
                    .ok_or(crate::Error::MalformedCtmd("invalid timestamp"))?;
                CtmdRecord::TimeStamp(ts)
            }
            3 => {
                let (_, focal_length) = rational16(payload).map_err(malformed)?;
                CtmdRecord::FocalInfo { focal_length }
            }
            4 => {
                let (_, (f_number, exposure_time, iso)) =
                    tuple((rational16, rational16, le_u32))(payload).map_err(malformed)?;
                CtmdRecord::ExposureInfo {
                    f_number,
                    exposure_time,
                    iso,
                }
            }
            7..=9 => CtmdRecord::ExifInfo {
                kind,
                entries: exif_info(payload, max_ifd_entries)?,
            },
            _ => CtmdRecord::Unknown {
                kind,
                length: payload.len(),
            },
        };
        Ok(record)
    }
}

/// A sequence of `len u32, tag u32, TIFF` blocks; each TIFF is walked on
/// its own with the block start as origin.
fn exif_info(mut payload: &[u8], max_ifd_entries: u16) -> crate::Result<Vec<CtmdExif>> {
    let mut entries = Vec::new();
    while payload.len() >= EXIF_INFO_HEADER_SIZE {
        let (_, (len, tag)) = tuple((le_u32, le_u32))(payload).map_err(malformed)?;
        let len = len as usize;
        if len < EXIF_INFO_HEADER_SIZE || len > payload.len() {
            return Err(crate::Error::MalformedCtmd("exif block exceeds the record"));
        }
        let tiff = &payload[EXIF_INFO_HEADER_SIZE..len];
        entries.push(CtmdExif {
            tag,
            tags: walk_embedded(tiff, tag, max_ifd_entries)?,
        });
        payload = &payload[len..];
    }
    Ok(entries)
}

fn walk_embedded(tiff: &[u8], tag: u32, max_ifd_entries: u16) -> crate::Result<TagMap> {
    let (_, header) = TiffHeader::parse(tiff)
        .map_err(|_| crate::Error::MalformedCtmd("exif block has no TIFF header"))?;
    let mut scratch = Exif::new(header);
    let cursor = TiffCursor::new(0, header.byte_order);
    let mut walker = IfdWalker::new(tiff, &mut scratch, max_ifd_entries);
    match tag {
        EXIF_IFD_POINTER => walker.walk_chain(cursor, header.first_ifd_offset, IfdId::EXIF)?,
        MAKER_NOTE => walker.walk_single(cursor, header.first_ifd_offset, IfdId::MAKER_NOTE)?,
        _ => walker.walk_single(cursor, header.first_ifd_offset, IfdId::ROOT)?,
    }
    Ok(scratch.tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        reader::ByteOrder,
        testkit::{TiffBuilder, Val},
        values::EntryValue,
    };

    fn record(kind: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = ((payload.len() + RECORD_HEADER_SIZE) as u32).to_le_bytes().to_vec();
        out.extend(kind.to_le_bytes());
        out.extend([0u8; 6]);
        out.extend(payload);
        out
    }

    #[test]
    fn time_focal_exposure() {
        let mut data = record(1, &[0, 0, 0xe4, 0x07, 6, 15, 13, 45, 30, 25]);
        data.extend(record(3, &[50, 0, 1, 0]));
        data.extend(record(4, &[28, 0, 10, 0, 1, 0, 200, 0, 0x90, 0x01, 0, 0]));
        data.extend(record(5, &[0; 7]));

        let records = parse_ctmd(&data, 256).unwrap();
        assert_eq!(records.len(), 4);
        let ts = NaiveDate::from_ymd_opt(2020, 6, 15)
            .unwrap()
            .and_hms_milli_opt(13, 45, 30, 250)
            .unwrap();
        assert_eq!(records[0], CtmdRecord::TimeStamp(ts));
        assert_eq!(
            records[1],
            CtmdRecord::FocalInfo {
                focal_length: URational::new(50, 1)
            }
        );
        assert_eq!(
            records[2],
            CtmdRecord::ExposureInfo {
                f_number: URational::new(28, 10),
                exposure_time: URational::new(1, 200),
                iso: 400,
            }
        );
        assert_eq!(records[3], CtmdRecord::Unknown { kind: 5, length: 7 });
    }

    #[test]
    fn sizes_must_cover_the_sample() {
        let mut data = record(3, &[50, 0, 1, 0]);
        data[0] = 40;
        assert!(matches!(
            parse_ctmd(&data, 256),
            Err(crate::Error::MalformedCtmd(_))
        ));

        let mut data = record(3, &[50, 0, 1, 0]);
        data.extend([1, 2, 3]);
        assert!(matches!(
            parse_ctmd(&data, 256),
            Err(crate::Error::MalformedCtmd(_))
        ));
    }

    #[test]
    fn short_payload() {
        let data = record(4, &[28, 0, 10, 0]);
        assert!(matches!(
            parse_ctmd(&data, 256),
            Err(crate::Error::MalformedCtmd(_))
        ));
    }

    #[test]
    fn exif_info_blocks() {
        let tiff = TiffBuilder::new(ByteOrder::LittleEndian)
            .root(0x8827, Val::Short(vec![800]))
            .root(0x829a, Val::Rational(vec![(1, 60)]))
            .build();
        let mut block = ((tiff.len() + 8) as u32).to_le_bytes().to_vec();
        block.extend(EXIF_IFD_POINTER.to_le_bytes());
        block.extend(&tiff);
        let data = record(8, &block);

        let records = parse_ctmd(&data, 256).unwrap();
        let CtmdRecord::ExifInfo { kind, entries } = &records[0] else {
            panic!("expected exif info, got {:?}", records[0]);
        };
        assert_eq!(*kind, 8);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tag, EXIF_IFD_POINTER);
        assert_eq!(
            entries[0].tags.value(IfdId::EXIF, 0x8827),
            Some(&EntryValue::U16(800))
        );
    }
}
