//! Original Decision Data, the image verification block that tag `0x0083`
//! points at.

use crate::reader::{read_exact_at, read_vec_at, ByteOrder, ReadAt};

const SENTINEL: [u8; 4] = [0xff; 4];
const V1_HEADER_SIZE: u64 = 24;
const V1_RECORD_SIZE: usize = 32;
const V3_SEGMENTS: usize = 3;
const MAX_RECORDS: u32 = 1024;

#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OddRecord {
    pub kind: u32,
    pub offset: u32,
    pub length: u32,
    pub hash: [u8; 20],
}

/// A version 3 segment. `offset` is the absolute position of its payload.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OddSegment {
    pub kind: u32,
    pub offset: u64,
    pub length: u32,
}

#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OddBody {
    Records(Vec<OddRecord>),
    Segments(Vec<OddSegment>),
}

#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalDecisionData {
    /// Absolute file offset of the block.
    pub offset: u64,
    pub version: u32,
    pub byte_order: ByteOrder,
    pub body: OddBody,
    /// Bytes the block occupies, header included.
    pub length: u64,
}

fn version_order(bs: [u8; 4]) -> Option<(u32, ByteOrder)> {
    [ByteOrder::LittleEndian, ByteOrder::BigEndian]
        .into_iter()
        .map(|order| (order.u32(bs), order))
        .find(|(v, _)| (1..=3).contains(v))
}

/// Reads the block at an absolute file offset.
pub fn read_odd<R: ReadAt + ?Sized>(reader: &R, offset: u64) -> crate::Result<OriginalDecisionData> {
    let mut head = [0u8; 8];
    read_exact_at(reader, &mut head, offset)?;
    if head[..4] != SENTINEL {
        return Err(crate::Error::InvalidHeader("original decision data sentinel"));
    }
    let (version, order) = version_order([head[4], head[5], head[6], head[7]])
        .ok_or(crate::Error::InvalidHeader("original decision data version"))?;
    let u32_at = |bs: &[u8], i: usize| order.u32([bs[i], bs[i + 1], bs[i + 2], bs[i + 3]]);

    let (body, length) = match version {
        1 | 2 => {
            let header = read_vec_at(reader, offset, V1_HEADER_SIZE as usize)?;
            let count = u32_at(&header, 8);
            if count > MAX_RECORDS {
                return Err(crate::Error::InvalidHeader("too many original decision records"));
            }
            let size = count as usize * V1_RECORD_SIZE;
            let data = read_vec_at(reader, offset + V1_HEADER_SIZE, size)?;
            let records = data
                .chunks_exact(V1_RECORD_SIZE)
                .map(|r| {
                    let mut hash = [0u8; 20];
                    hash.copy_from_slice(&r[12..32]);
                    OddRecord {
                        kind: u32_at(r, 0),
                        offset: u32_at(r, 4),
                        length: u32_at(r, 8),
                        hash,
                    }
                })
                .collect();
            (OddBody::Records(records), V1_HEADER_SIZE + size as u64)
        }
        _ => {
            let mut pos = offset + head.len() as u64;
            let mut segments = Vec::with_capacity(V3_SEGMENTS);
            for _ in 0..V3_SEGMENTS {
                let mut seg = [0u8; 8];
                read_exact_at(reader, &mut seg, pos)?;
                let length = u32_at(&seg, 4);
                segments.push(OddSegment {
                    kind: u32_at(&seg, 0),
                    offset: pos + seg.len() as u64,
                    length,
                });
                pos = pos
                    .checked_add(seg.len() as u64 + length as u64)
                    .ok_or(crate::Error::ReadNegativeOffset)?;
            }
            if let Some(size) = reader.size() {
                if pos > size {
                    return Err(crate::Error::NotEnoughData {
                        offset,
                        needed: (pos - offset) as usize,
                    });
                }
            }
            (OddBody::Segments(segments), pos - offset)
        }
    };

    tracing::debug!(version, ?order, length, "original decision data");
    Ok(OriginalDecisionData {
        offset,
        version,
        byte_order: order,
        body,
        length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn v1(order: ByteOrder, version: u32, count: u32) -> Vec<u8> {
        let enc = |v: u32| match order {
            ByteOrder::BigEndian => v.to_be_bytes(),
            _ => v.to_le_bytes(),
        };
        let mut out = vec![0u8; 16];
        out.extend([0xff; 4]);
        out.extend(enc(version));
        out.extend(enc(count));
        out.extend([0u8; 12]);
        for i in 0..count {
            out.extend(enc(i + 1));
            out.extend(enc(0x1000 * (i + 1)));
            out.extend(enc(0x200));
            out.extend([i as u8; 20]);
        }
        out
    }

    #[test_case(ByteOrder::LittleEndian, 1)]
    #[test_case(ByteOrder::BigEndian, 2)]
    fn records(order: ByteOrder, version: u32) {
        let data = v1(order, version, 3);
        let odd = read_odd(&data, 16).unwrap();
        assert_eq!(odd.version, version);
        assert_eq!(odd.byte_order, order);
        assert_eq!(odd.length, 24 + 3 * 32);
        let OddBody::Records(records) = odd.body else {
            panic!("expected records");
        };
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].kind, 2);
        assert_eq!(records[1].offset, 0x2000);
        assert_eq!(records[2].hash, [2u8; 20]);
    }

    #[test]
    fn segments() {
        let mut data = vec![0xff, 0xff, 0xff, 0xff, 3, 0, 0, 0];
        for (kind, len) in [(1u32, 4u32), (2, 0), (3, 2)] {
            data.extend(kind.to_le_bytes());
            data.extend(len.to_le_bytes());
            data.extend(vec![0xaa; len as usize]);
        }
        let odd = read_odd(&data, 0).unwrap();
        assert_eq!(odd.length, data.len() as u64);
        assert_eq!(
            odd.body,
            OddBody::Segments(vec![
                OddSegment { kind: 1, offset: 16, length: 4 },
                OddSegment { kind: 2, offset: 28, length: 0 },
                OddSegment { kind: 3, offset: 36, length: 2 },
            ])
        );
    }

    #[test]
    fn bad_sentinel_or_version() {
        let mut data = v1(ByteOrder::LittleEndian, 1, 0);
        assert!(read_odd(&data, 0).is_err());
        data[20] = 4;
        assert!(matches!(
            read_odd(&data, 16),
            Err(crate::Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn truncated_records() {
        let data = v1(ByteOrder::LittleEndian, 1, 3);
        assert!(matches!(
            read_odd(&data[..100], 16),
            Err(crate::Error::NotEnoughData { .. })
        ));
    }
}
