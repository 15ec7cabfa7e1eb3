use nom::{
    bytes::complete::take,
    combinator::{fail, map},
    error::context,
    number::complete::{be_u32, be_u64},
    sequence::tuple,
    IResult,
};

use super::{children, find_box, BoxHolder};

/// Absolute position of a sample in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLocation {
    pub offset: u64,
    pub size: u64,
}

/// Looks through the `trak` boxes of a `moov` body for the Canon timed
/// metadata track and returns its first sample.
pub(crate) fn find_ctmd_sample(moov_body: &[u8]) -> Option<SampleLocation> {
    children(moov_body)
        .map_while(Result::ok)
        .filter(|(_, b)| b.box_type() == "trak")
        .find_map(|(_, trak)| {
            let (_, stbl) = find_box(trak.body_data(), "mdia/minf/stbl").ok()?;
            let stbl = stbl?;
            let location = ctmd_sample(stbl.body_data());
            if let Err(e) = &location {
                tracing::debug!(?e, "sample table");
            }
            location.ok().flatten()
        })
}

fn ctmd_sample(stbl: &[u8]) -> crate::Result<Option<SampleLocation>> {
    let mut entry_type = None;
    let mut size = None;
    let mut offset = None;

    for child in children(stbl) {
        let (_, bbox) = child?;
        match bbox.box_type() {
            "stsd" => entry_type = Some(first_entry_type(&bbox)?.1),
            "stsz" => size = Some(first_sample_size(&bbox)?.1),
            "stco" => offset = Some(first_chunk_offset(&bbox, false)?.1),
            "co64" => offset = Some(first_chunk_offset(&bbox, true)?.1),
            _ => (),
        }
    }

    if entry_type.as_deref() != Some("CTMD") {
        return Ok(None);
    }
    match (offset, size) {
        (Some(offset), Some(size)) => Ok(Some(SampleLocation { offset, size })),
        _ => Err(crate::Error::ItemNotFound("CTMD sample")),
    }
}

/// Skips version and flags.
fn full_body<'a>(bbox: &BoxHolder<'a>) -> IResult<&'a [u8], &'a [u8]> {
    take(4usize)(bbox.body_data())
}

fn first_entry_type<'a>(bbox: &BoxHolder<'a>) -> IResult<&'a [u8], String> {
    let (remain, _) = full_body(bbox)?;
    let (remain, count) = be_u32(remain)?;
    if count == 0 {
        return context("empty stsd", fail)(remain);
    }
    let (remain, (_size, kind)) = tuple((be_u32, take(4usize)))(remain)?;
    Ok((remain, String::from_utf8_lossy(kind).into_owned()))
}

fn first_sample_size<'a>(bbox: &BoxHolder<'a>) -> IResult<&'a [u8], u64> {
    let (remain, _) = full_body(bbox)?;
    let (remain, (sample_size, count)) = tuple((be_u32, be_u32))(remain)?;
    if sample_size != 0 {
        return Ok((remain, sample_size as u64));
    }
    if count == 0 {
        return context("empty stsz", fail)(remain);
    }
    map(be_u32, |x| x as u64)(remain)
}

fn first_chunk_offset<'a>(bbox: &BoxHolder<'a>, wide: bool) -> IResult<&'a [u8], u64> {
    let (remain, _) = full_body(bbox)?;
    let (remain, count) = be_u32(remain)?;
    if count == 0 {
        return context("no chunks", fail)(remain);
    }
    if wide {
        be_u64(remain)
    } else {
        map(be_u32, |x| x as u64)(remain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{bmff_box, bmff_full_box};

    fn trak(entry: &[u8; 4], stsz: &[u8], chunk: Vec<u8>) -> Vec<u8> {
        let mut stsd = 1u32.to_be_bytes().to_vec();
        stsd.extend(bmff_box(entry, &[0; 8]));
        let mut stbl = bmff_full_box(b"stsd", 0, 0, &stsd);
        stbl.extend(bmff_full_box(b"stsz", 0, 0, stsz));
        stbl.extend(chunk);

        let minf = bmff_box(b"minf", &bmff_box(b"stbl", &stbl));
        let mut mdia = bmff_box(b"mdhd", &[0; 24]);
        mdia.extend(minf);
        bmff_box(b"trak", &bmff_box(b"mdia", &mdia))
    }

    fn stco(offset: u32) -> Vec<u8> {
        let mut body = 1u32.to_be_bytes().to_vec();
        body.extend(offset.to_be_bytes());
        bmff_full_box(b"stco", 0, 0, &body)
    }

    #[test]
    fn second_track_is_ctmd() {
        let fixed = [0, 0, 0, 64, 0, 0, 0, 1];
        let mut moov = bmff_box(b"mvhd", &[0; 100]);
        moov.extend(trak(b"CRAW", &fixed, stco(0x1000)));
        // per-sample sizes
        let listed = [0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 80, 0, 0, 0, 90];
        let mut co64 = 1u32.to_be_bytes().to_vec();
        co64.extend(0x1_0000_0000u64.to_be_bytes());
        moov.extend(trak(b"CTMD", &listed, bmff_full_box(b"co64", 0, 0, &co64)));

        assert_eq!(
            find_ctmd_sample(&moov),
            Some(SampleLocation {
                offset: 0x1_0000_0000,
                size: 80
            })
        );
    }

    #[test]
    fn no_ctmd_track() {
        let moov = trak(b"CRAW", &[0, 0, 0, 64, 0, 0, 0, 1], stco(0x20));
        assert_eq!(find_ctmd_sample(&moov), None);
    }
}
