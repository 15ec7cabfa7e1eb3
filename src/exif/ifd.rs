use std::{collections::HashMap, fmt::Display};

use crate::values::{EntryValue, TagType};

/// Which directory a tag was found in.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum IfdKind {
    Root = 1,
    Sub = 2,
    Exif = 3,
    Gps = 4,
    Iop = 5,
    MakerNote = 6,
    DngPrivate = 7,
}

impl IfdKind {
    fn from_u8(v: u8) -> Option<IfdKind> {
        Some(match v {
            1 => IfdKind::Root,
            2 => IfdKind::Sub,
            3 => IfdKind::Exif,
            4 => IfdKind::Gps,
            5 => IfdKind::Iop,
            6 => IfdKind::MakerNote,
            7 => IfdKind::DngPrivate,
            _ => return None,
        })
    }
}

impl Display for IfdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            IfdKind::Root => "IFD",
            IfdKind::Sub => "SubIFD",
            IfdKind::Exif => "ExifIFD",
            IfdKind::Gps => "GPSIFD",
            IfdKind::Iop => "InteropIFD",
            IfdKind::MakerNote => "MakerNoteIFD",
            IfdKind::DngPrivate => "DNGPrivateData",
        })
    }
}

/// An IFD kind plus its index among IFDs of the same kind (IFD0, IFD1, the
/// n-th SubIFD, ...).
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IfdId {
    pub kind: IfdKind,
    pub index: u8,
}

impl IfdId {
    pub const ROOT: IfdId = IfdId::new(IfdKind::Root, 0);
    pub const EXIF: IfdId = IfdId::new(IfdKind::Exif, 0);
    pub const GPS: IfdId = IfdId::new(IfdKind::Gps, 0);
    pub const MAKER_NOTE: IfdId = IfdId::new(IfdKind::MakerNote, 0);

    pub const fn new(kind: IfdKind, index: u8) -> Self {
        Self { kind, index }
    }

    pub fn next(self) -> Self {
        Self {
            kind: self.kind,
            index: self.index.saturating_add(1),
        }
    }

    pub fn key(self, tag_id: u16) -> TagKey {
        TagKey::new(self, tag_id)
    }
}

impl Display for IfdId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.kind, self.index)
    }
}

/// `(kind, index, tag_id)` packed into 32 bits: `kind << 24 | index << 16 |
/// tag_id`.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagKey(pub u32);

impl TagKey {
    pub const fn new(ifd: IfdId, tag_id: u16) -> Self {
        TagKey((ifd.kind as u32) << 24 | (ifd.index as u32) << 16 | tag_id as u32)
    }

    pub fn tag_id(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    pub fn ifd(self) -> Option<IfdId> {
        let kind = IfdKind::from_u8((self.0 >> 24) as u8)?;
        Some(IfdId::new(kind, ((self.0 >> 16) & 0xFF) as u8))
    }
}

/// One IFD entry.
///
/// `value` is filled in during the walk unless the payload is a large blob,
/// in which case only its location is kept.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: u16,
    pub tag_type: TagType,
    pub unit_count: u32,
    /// The raw four bytes of the entry's value slot, in the IFD's byte
    /// order.
    pub value_or_offset: u32,
    pub ifd: IfdId,
    pub value: Option<EntryValue>,
}

impl Tag {
    pub fn size_bytes(&self) -> u64 {
        self.tag_type.component_size() as u64 * self.unit_count as u64
    }

    /// Whether the value sits in the entry itself.
    pub fn is_embedded(&self) -> bool {
        self.size_bytes() <= 4
    }

    pub fn key(&self) -> TagKey {
        self.ifd.key(self.id)
    }
}

/// All tags of one decode, keyed by [`TagKey`].
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagMap {
    tags: HashMap<TagKey, Tag>,
}

impl TagMap {
    /// Inserts a tag. A tag already present under the same key is kept and
    /// the new one is dropped.
    pub fn insert(&mut self, tag: Tag) -> bool {
        let key = tag.key();
        if self.tags.contains_key(&key) {
            tracing::debug!(?key, "duplicate tag ignored");
            return false;
        }
        self.tags.insert(key, tag);
        true
    }

    pub fn get(&self, ifd: IfdId, tag_id: u16) -> Option<&Tag> {
        self.tags.get(&ifd.key(tag_id))
    }

    pub fn value(&self, ifd: IfdId, tag_id: u16) -> Option<&EntryValue> {
        self.get(ifd, tag_id).and_then(|t| t.value.as_ref())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tags ordered by key, which groups them by IFD.
    pub fn sorted(&self) -> Vec<&Tag> {
        let mut tags: Vec<&Tag> = self.tags.values().collect();
        tags.sort_by_key(|t| t.key());
        tags
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    pub fn ifd(&self, ifd: IfdId) -> impl Iterator<Item = &Tag> {
        self.tags.values().filter(move |t| t.ifd == ifd)
    }
}
