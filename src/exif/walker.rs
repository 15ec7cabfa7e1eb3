use std::collections::HashSet;

use nom::{number::complete, sequence::tuple};

use crate::{
    reader::{read_vec_at, ReadAt, TiffCursor},
    values::{EntryData, EntryValue, TagType},
};

use super::{
    header::TiffHeader,
    ifd::{IfdId, IfdKind, Tag},
    record::Exif,
    tags::ExifTag,
};

pub(crate) const IFD_ENTRY_SIZE: usize = 12;
pub(crate) const MAX_IFD_DEPTH: usize = 8;

/// Default bound on the entries of one camera IFD.
pub const DEFAULT_MAX_IFD_ENTRIES: u16 = 256;
const MAX_MAKER_NOTE_ENTRIES: u16 = 1024;

// IFD indices are a u8, so longer chains cannot be told apart.
const MAX_CHAIN_LEN: usize = u8::MAX as usize;

// Values above this size are located but not copied.
const MAX_MATERIALIZED_LEN: u64 = 64 * 1024;

/// Where the MakerNote payload sits, remembered during the walk and handed
/// to the maker-note dispatcher once the Exif IFD sweep is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MakerNoteLocation {
    pub cursor: TiffCursor,
    /// Offset of the payload relative to the cursor origin.
    pub offset: u32,
    pub length: u32,
}

impl MakerNoteLocation {
    pub fn absolute(&self) -> crate::Result<u64> {
        self.cursor.absolute(self.offset)
    }
}

#[derive(Debug, Clone, Copy)]
struct ChildLink {
    ifd: IfdId,
    offset: u32,
}

#[derive(Debug)]
struct RawEntry {
    id: u16,
    type_code: u16,
    count: u32,
    value_or_offset: u32,
    slot: [u8; 4],
}

/// Walks TIFF IFD chains and writes every tag into an [`Exif`] record.
///
/// The walker holds no read position: each call receives the
/// `(origin, byte_order)` cursor it works against.
pub(crate) struct IfdWalker<'a, R: ReadAt + ?Sized> {
    reader: &'a R,
    exif: &'a mut Exif,
    max_entries: u16,
    visited: HashSet<u64>,
    sub_index: u8,
    pub maker_note: Option<MakerNoteLocation>,
}

impl<'a, R: ReadAt + ?Sized> IfdWalker<'a, R> {
    pub fn new(reader: &'a R, exif: &'a mut Exif, max_entries: u16) -> Self {
        Self {
            reader,
            exif,
            max_entries,
            visited: HashSet::new(),
            sub_index: 0,
            maker_note: None,
        }
    }

    /// Walks the IFD chain starting at the header's first IFD: IFD0, then
    /// IFD1 and so on through the next-IFD offsets.
    ///
    /// A failure in IFD0 aborts the decode; later IFDs of the chain are
    /// best effort.
    #[tracing::instrument(skip_all, fields(origin = header.tiff_header_offset))]
    pub fn walk_tiff(&mut self, header: &TiffHeader) -> crate::Result<()> {
        let cursor = TiffCursor::new(header.tiff_header_offset as u64, header.byte_order);
        header.byte_order.endianness()?;
        self.walk_chain(cursor, header.first_ifd_offset, IfdId::ROOT)
    }

    /// Walks a chain of IFDs of one kind.
    pub fn walk_chain(
        &mut self,
        cursor: TiffCursor,
        first_offset: u32,
        first: IfdId,
    ) -> crate::Result<()> {
        let mut ifd = first;
        let mut offset = first_offset;
        let mut walked = 0;
        while offset != 0 {
            if walked > MAX_CHAIN_LEN {
                tracing::warn!(%first, "ifd chain is too long");
                break;
            }
            walked += 1;
            match self.walk_ifd(cursor, offset, ifd, 0) {
                Ok(next) => offset = next,
                Err(e) if ifd == first || e.is_cancelled() => return Err(e),
                Err(e) => {
                    tracing::warn!(%ifd, ?e, "ifd chain ends early");
                    break;
                }
            }
            ifd = ifd.next();
        }
        Ok(())
    }

    /// Walks one IFD, ignoring its next-IFD offset and without descending
    /// into child directories. Used for maker notes.
    pub fn walk_single(
        &mut self,
        cursor: TiffCursor,
        offset: u32,
        ifd: IfdId,
    ) -> crate::Result<()> {
        let links = self.sweep(cursor, offset, ifd)?.unwrap_or_default();
        if !links.is_empty() {
            tracing::debug!(%ifd, n = links.len(), "links in a single ifd are not followed");
        }
        Ok(())
    }

    /// Walks one IFD and its children. Returns the next-IFD offset.
    fn walk_ifd(
        &mut self,
        cursor: TiffCursor,
        offset: u32,
        ifd: IfdId,
        depth: usize,
    ) -> crate::Result<u32> {
        if depth >= MAX_IFD_DEPTH {
            tracing::warn!(%ifd, depth, "ifd nesting is too deep");
            return Ok(0);
        }

        // A revisited IFD ends its chain.
        let Some(links) = self.sweep(cursor, offset, ifd)? else {
            return Ok(0);
        };
        let next = self.read_next_offset(cursor, offset)?;

        // Children are walked only once the parent's sweep is complete, so
        // that Make/Model are known before the maker note is interpreted.
        for link in links {
            if let Err(e) = self.walk_child(cursor, link, depth) {
                if e.is_cancelled() {
                    return Err(e);
                }
                tracing::warn!(ifd = %link.ifd, ?e, "skip child ifd");
            }
        }

        Ok(next)
    }

    fn walk_child(&mut self, cursor: TiffCursor, link: ChildLink, depth: usize) -> crate::Result<()> {
        if link.offset == 0 {
            return Ok(());
        }
        match link.ifd.kind {
            // A SubIFD can have its own chain (e.g. DNG previews).
            IfdKind::Sub => {
                let mut offset = link.offset;
                let mut ifd = link.ifd;
                let mut walked = 0;
                while offset != 0 {
                    if walked > MAX_CHAIN_LEN {
                        tracing::warn!(ifd = %link.ifd, "sub ifd chain is too long");
                        break;
                    }
                    walked += 1;
                    offset = self.walk_ifd(cursor, offset, ifd, depth + 1)?;
                    if offset != 0 {
                        self.sub_index = self.sub_index.saturating_add(1);
                        ifd = IfdId::new(IfdKind::Sub, self.sub_index);
                    }
                }
                Ok(())
            }
            _ => self.walk_ifd(cursor, link.offset, link.ifd, depth + 1).map(|_| ()),
        }
    }

    /// Reads every entry of one IFD in file order and returns the links to
    /// child IFDs found on the way, or `None` if the IFD was already walked.
    fn sweep(
        &mut self,
        cursor: TiffCursor,
        offset: u32,
        ifd: IfdId,
    ) -> crate::Result<Option<Vec<ChildLink>>> {
        let start = cursor.absolute(offset)?;
        if !self.visited.insert(start) {
            tracing::warn!(%ifd, offset, "ifd visited twice");
            return Ok(None);
        }

        let entry_num = cursor.read_u16(self.reader, offset)?;
        let limit = if ifd.kind == IfdKind::MakerNote {
            MAX_MAKER_NOTE_ENTRIES
        } else {
            self.max_entries
        };
        if entry_num > limit {
            return Err(crate::Error::IfdBufferLength(entry_num));
        }
        tracing::debug!(%ifd, offset = format!("0x{offset:08x}"), entry_num, "new ifd");

        let entries_pos = start.checked_add(2).ok_or(crate::Error::ReadNegativeOffset)?;
        let buf = read_vec_at(self.reader, entries_pos, entry_num as usize * IFD_ENTRY_SIZE)?;
        let endian = cursor.order.endianness()?;

        let mut links = Vec::new();
        for chunk in buf.chunks_exact(IFD_ENTRY_SIZE) {
            let Some(raw) = parse_raw_entry(chunk, endian) else {
                continue;
            };
            let tag_type = match TagType::try_from(raw.type_code) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!(%ifd, tag = format!("0x{:04x}", raw.id), ?e, "skip entry");
                    continue;
                }
            };

            links.extend(self.classify(ifd, &raw, tag_type, cursor));

            let target = if ifd.kind == IfdKind::Root && raw.id == ExifTag::DNGPrivateData.code() {
                IfdId::new(IfdKind::DngPrivate, 0)
            } else {
                ifd
            };
            match self.materialize(cursor, &raw, tag_type, target) {
                Ok(tag) => {
                    // The first occurrence of a key wins in both views.
                    if self.exif.tags.get(tag.ifd, tag.id).is_none() {
                        self.exif.add_tag(&tag);
                        self.exif.tags.insert(tag);
                    } else {
                        tracing::debug!(%ifd, tag = format!("0x{:04x}", tag.id), "duplicate tag ignored");
                    }
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    tracing::warn!(%ifd, tag = format!("0x{:04x}", raw.id), ?e, "skip entry");
                }
            }
        }

        Ok(Some(links))
    }

    /// Recognizes entries that point at child IFDs.
    fn classify(
        &mut self,
        ifd: IfdId,
        raw: &RawEntry,
        tag_type: TagType,
        cursor: TiffCursor,
    ) -> Vec<ChildLink> {
        let Ok(tag) = ExifTag::try_from(raw.id) else {
            return Vec::new();
        };
        let link = |ifd: IfdId| {
            vec![ChildLink {
                ifd,
                offset: raw.value_or_offset,
            }]
        };
        let container = matches!(ifd.kind, IfdKind::Root | IfdKind::Sub);
        match tag {
            ExifTag::ExifOffset if container => link(IfdId::EXIF),
            ExifTag::GPSInfo if container => link(IfdId::GPS),
            ExifTag::InteropOffset if ifd.kind == IfdKind::Exif => {
                link(IfdId::new(IfdKind::Iop, 0))
            }
            ExifTag::SubIFDs if container => {
                // Each u32 of the array is a SubIFD walked with its own index.
                let offsets = match self.sub_ifd_offsets(cursor, raw, tag_type) {
                    Ok(offsets) => offsets,
                    Err(e) => {
                        tracing::warn!(?e, "skip SubIFDs");
                        return Vec::new();
                    }
                };
                offsets
                    .into_iter()
                    .map(|offset| {
                        let ifd = IfdId::new(IfdKind::Sub, self.sub_index);
                        self.sub_index = self.sub_index.saturating_add(1);
                        ChildLink { ifd, offset }
                    })
                    .collect()
            }
            ExifTag::MakerNote if ifd.kind == IfdKind::Exif => {
                let length = raw.count.saturating_mul(tag_type.component_size() as u32);
                self.maker_note = Some(MakerNoteLocation {
                    cursor,
                    offset: raw.value_or_offset,
                    length,
                });
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn sub_ifd_offsets(
        &self,
        cursor: TiffCursor,
        raw: &RawEntry,
        tag_type: TagType,
    ) -> crate::Result<Vec<u32>> {
        if raw.count <= 1 || tag_type.component_size() != 4 {
            return Ok(vec![raw.value_or_offset]);
        }
        let count = raw.count.min(self.max_entries as u32) as usize;
        let buf = cursor.read_bytes(self.reader, raw.value_or_offset, count * 4)?;
        Ok(buf
            .chunks_exact(4)
            .map(|c| cursor.order.u32([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Resolves the value bytes of an entry (embedded or indirect) and
    /// converts them.
    fn materialize(
        &self,
        cursor: TiffCursor,
        raw: &RawEntry,
        tag_type: TagType,
        ifd: IfdId,
    ) -> crate::Result<Tag> {
        let size = tag_type.component_size() as u64 * raw.count as u64;
        let mut tag = Tag {
            id: raw.id,
            tag_type,
            unit_count: raw.count,
            value_or_offset: raw.value_or_offset,
            ifd,
            value: None,
        };

        let indirect;
        let data: &[u8] = if size <= 4 {
            &raw.slot[..size as usize]
        } else if size > MAX_MATERIALIZED_LEN {
            tracing::debug!(%ifd, tag = format!("0x{:04x}", raw.id), size, "value located only");
            return Ok(tag);
        } else {
            indirect = cursor.read_bytes(self.reader, raw.value_or_offset, size as usize)?;
            &indirect
        };

        let value = EntryValue::parse(&EntryData {
            endian: cursor.order.endianness()?,
            tag: raw.id,
            data,
            data_format: tag_type,
            components_num: raw.count,
        })
        .map_err(|e| crate::Error::ParseFailed(e.into()))?;
        tag.value = Some(value);
        Ok(tag)
    }

    fn read_next_offset(&self, cursor: TiffCursor, offset: u32) -> crate::Result<u32> {
        let entry_num = cursor.read_u16(self.reader, offset)?;
        let pos = offset as u64 + 2 + entry_num as u64 * IFD_ENTRY_SIZE as u64;
        let pos = u32::try_from(pos).map_err(|_| crate::Error::ReadNegativeOffset)?;
        match cursor.read_u32(self.reader, pos) {
            Ok(next) => Ok(next),
            // A missing next pointer at the very end of the data ends the chain.
            Err(crate::Error::NotEnoughData { .. }) => Ok(0),
            Err(e) => Err(e),
        }
    }
}

fn parse_raw_entry(entry_data: &[u8], endian: nom::number::Endianness) -> Option<RawEntry> {
    let (_, (id, type_code, count, value_or_offset)) = tuple((
        complete::u16::<_, nom::error::Error<_>>(endian),
        complete::u16(endian),
        complete::u32(endian),
        complete::u32(endian),
    ))(entry_data)
    .ok()?;

    let slot = entry_data.get(8..12)?.try_into().ok()?;
    Some(RawEntry {
        id,
        type_code,
        count,
        value_or_offset,
        slot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        reader::ByteOrder,
        testkit::{write_ifd, Entries, Val},
    };
    use test_case::test_case;

    const LE: ByteOrder = ByteOrder::LittleEndian;

    fn tiff_prefix() -> Vec<u8> {
        b"II\x2a\0\x08\0\0\0".to_vec()
    }

    fn walk(data: &[u8], max_entries: u16) -> (crate::Result<()>, Exif) {
        let (_, header) = TiffHeader::parse(data).unwrap();
        let mut exif = Exif::new(header);
        let res = IfdWalker::new(data, &mut exif, max_entries).walk_tiff(&header);
        (res, exif)
    }

    // One SHORT entry per IFD, so every IFD is 18 bytes and IFD `i` sits
    // at 8 + 18 * i.
    fn ifd_chain(nexts: &[u32]) -> Vec<u8> {
        let mut buf = tiff_prefix();
        for (i, next) in nexts.iter().enumerate() {
            let entries: Entries = vec![(0x0100, Val::Short(vec![i as u16]))];
            write_ifd(&mut buf, &entries, LE, *next);
        }
        buf
    }

    #[test_case(&[8], 1; "self loop")]
    #[test_case(&[26, 8], 2; "two ifd cycle")]
    #[test_case(&[26, 26], 2; "second ifd loops on itself")]
    #[test_case(&[26, 44, 26], 3; "cycle after three")]
    #[test_case(&[26, 0], 2; "terminated chain")]
    fn ifd_chain_terminates(nexts: &[u32], walked: usize) {
        let data = ifd_chain(nexts);
        let (res, exif) = walk(&data, DEFAULT_MAX_IFD_ENTRIES);
        res.unwrap();
        assert_eq!(exif.tags.len(), walked);
        let mut ifd = IfdId::ROOT;
        for i in 0..walked {
            assert_eq!(exif.get(ifd, 0x0100).and_then(|v| v.as_u16()), Some(i as u16));
            ifd = ifd.next();
        }
    }

    #[test]
    fn self_loop_through_decode() {
        let data = ifd_chain(&[8]);
        let exif = crate::decode(&data[..]).unwrap();
        assert_eq!(exif.tags.len(), 1);
    }

    // Every IFD holds ImageWidth plus a SubIFDs pointer to the next one,
    // 30 bytes apart.
    #[test_case(3, 3; "shallow")]
    #[test_case(8, 8; "at the limit")]
    #[test_case(12, MAX_IFD_DEPTH; "too deep")]
    fn sub_ifd_nesting(levels: u32, walked: usize) {
        let mut buf = tiff_prefix();
        for i in 0..levels {
            let child = if i + 1 < levels { 8 + 30 * (i + 1) } else { 0 };
            let entries: Entries = vec![
                (0x0100, Val::Short(vec![i as u16])),
                (ExifTag::SubIFDs.code(), Val::Long(vec![child])),
            ];
            write_ifd(&mut buf, &entries, LE, 0);
        }
        let (res, exif) = walk(&buf, DEFAULT_MAX_IFD_ENTRIES);
        res.unwrap();
        let widths = exif.tags.sorted().into_iter().filter(|t| t.id == 0x0100).count();
        assert_eq!(widths, walked);
    }

    #[test_case(IfdId::ROOT, 256, true)]
    #[test_case(IfdId::ROOT, 257, false)]
    #[test_case(IfdId::EXIF, 300, false)]
    #[test_case(IfdId::MAKER_NOTE, 1024, true)]
    #[test_case(IfdId::MAKER_NOTE, 1025, false)]
    fn entry_count_bound(ifd: IfdId, count: u16, accepted: bool) {
        let mut data = tiff_prefix();
        data.extend(count.to_le_bytes());
        // Zeroed entries carry an invalid type and are skipped.
        data.resize(data.len() + count as usize * IFD_ENTRY_SIZE + 4, 0);

        let (_, header) = TiffHeader::parse(&data).unwrap();
        let mut exif = Exif::new(header);
        let res = IfdWalker::new(&data[..], &mut exif, DEFAULT_MAX_IFD_ENTRIES).walk_single(
            TiffCursor::new(0, LE),
            8,
            ifd,
        );
        if accepted {
            res.unwrap();
        } else {
            assert!(matches!(res, Err(crate::Error::IfdBufferLength(n)) if n == count));
        }
    }

    #[test]
    fn ifd0_over_limit_fails_the_walk() {
        let mut data = tiff_prefix();
        data.extend(20u16.to_le_bytes());
        data.resize(data.len() + 20 * IFD_ENTRY_SIZE + 4, 0);
        let (res, _) = walk(&data, 16);
        assert!(matches!(res, Err(crate::Error::IfdBufferLength(20))));
    }

    #[test_case(64 * 1024 + 1; "just over")]
    #[test_case(u32::MAX; "huge")]
    fn large_value_is_located_only(count: u32) {
        let mut buf = tiff_prefix();
        let entries: Entries = vec![
            (0x010f, Val::ascii("Canon")),
            (0xabcd, Val::Raw(7, count, 0x1000)),
        ];
        write_ifd(&mut buf, &entries, LE, 0);
        let (res, exif) = walk(&buf, DEFAULT_MAX_IFD_ENTRIES);
        res.unwrap();

        let tag = exif.tags.get(IfdId::ROOT, 0xabcd).unwrap();
        assert_eq!(tag.unit_count, count);
        assert_eq!(tag.value_or_offset, 0x1000);
        assert!(tag.value.is_none());
        assert_eq!(exif.make.as_deref(), Some("Canon"));
    }

    #[test]
    fn first_duplicate_wins() {
        let mut buf = tiff_prefix();
        let entries: Entries = vec![
            (0x010f, Val::ascii("Canon")),
            (0x010f, Val::ascii("Nikon")),
        ];
        write_ifd(&mut buf, &entries, LE, 0);
        let (res, exif) = walk(&buf, DEFAULT_MAX_IFD_ENTRIES);
        res.unwrap();

        assert_eq!(exif.tags.len(), 1);
        assert_eq!(exif.get(IfdId::ROOT, 0x010f).and_then(|v| v.as_str()), Some("Canon"));
        assert_eq!(exif.make.as_deref(), Some("Canon"));
    }
}
