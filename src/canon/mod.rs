//! The Canon maker note.
//!
//! The MakerNote IFD is walked like any other IFD; this module turns its
//! raw tags into typed records. Most of them are arrays of shorts indexed
//! by position, `CameraInfo` is a byte blob whose layout depends on the
//! body (see [`CameraInfo`]), and the lens name is looked up from the
//! `LensType` id (see [`resolve_lens`]).
//!
//! A subsystem that fails to decode is logged and left empty, the rest of
//! the note is still returned.

use crate::{
    exif::{Exif, IfdId},
    parser::DecodeOptions,
    reader::{ByteOrder, ReadAt},
    values::EntryValue,
};

pub use af_info::{AfInfo, AfRect};
pub use camera_info::CameraInfo;
pub use camera_settings::CameraSettings;
pub use ctmd::{parse_ctmd, CtmdExif, CtmdRecord};
pub use ev::{
    canon_ev, canon_ev_inv, f_number_from_raw, f_number_to_raw, iso_from_raw, iso_to_raw,
    temperature,
};
pub use file_info::FileInfo;
pub use filter::{decode_filter_info, CreativeFilter, FilterParam};
pub use lens::{
    lens_candidates, resolve_lens, rf_lens_name, LensOverrides, LensQuery, RF_LENS_PLACEHOLDER,
};
pub use odd::{read_odd, OddBody, OddRecord, OddSegment, OriginalDecisionData};
pub use shot_info::ShotInfo;
pub use tags::CanonTag;

pub mod camera_info;
pub mod model;

mod af_info;
mod camera_settings;
mod ctmd;
mod ev;
mod file_info;
mod filter;
mod lens;
mod odd;
mod shot_info;
mod tags;

/// Positional view over an integer array tag. Out of range indices read as
/// `None`.
#[derive(Clone, Copy)]
pub(crate) struct Words<'a>(pub &'a [i64]);

impl Words<'_> {
    pub fn i16(&self, i: usize) -> Option<i16> {
        self.0.get(i).map(|v| *v as i16)
    }

    pub fn u16(&self, i: usize) -> Option<u16> {
        self.0.get(i).map(|v| *v as u16)
    }

    pub fn i32(&self, i: usize) -> Option<i32> {
        self.0.get(i).map(|v| *v as i32)
    }
}

/// TimeInfo (tag `0x0035`).
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeInfo {
    /// Minutes east of UTC.
    pub time_zone: Option<i32>,
    pub time_zone_city: Option<i32>,
    pub daylight_savings: Option<i32>,
}

impl TimeInfo {
    fn decode(w: Words) -> TimeInfo {
        TimeInfo {
            time_zone: w.i32(1),
            time_zone_city: w.i32(2),
            daylight_savings: w.i32(3),
        }
    }

    /// UTC offset in seconds, DST included.
    pub fn utc_offset(&self) -> Option<i32> {
        let dst = match self.daylight_savings {
            Some(60) => 3600,
            _ => 0,
        };
        self.time_zone.map(|tz| tz * 60 + dst)
    }
}

/// FocalLength (tag `0x0002`).
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FocalLength {
    /// 1 fixed, 2 zoom.
    pub focal_type: Option<u16>,
    /// In `FocalUnits` of CameraSettings.
    pub focal_length: Option<u16>,
    pub focal_plane_x_size: Option<u16>,
    pub focal_plane_y_size: Option<u16>,
}

impl FocalLength {
    fn decode(w: Words) -> FocalLength {
        FocalLength {
            focal_type: w.u16(0),
            focal_length: w.u16(1),
            focal_plane_x_size: w.u16(2).filter(|v| *v != 0),
            focal_plane_y_size: w.u16(3).filter(|v| *v != 0),
        }
    }
}

/// The decoded Canon maker note.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonMakerNote {
    /// Canon `ModelID`, see [`model::model_name`].
    pub model_id: Option<u32>,
    pub camera_settings: Option<CameraSettings>,
    pub focal_length: Option<FocalLength>,
    pub shot_info: Option<ShotInfo>,
    pub camera_info: Option<CameraInfo>,
    pub file_info: Option<FileInfo>,
    pub af_info: Option<AfInfo>,
    pub time_info: Option<TimeInfo>,
    pub image_type: Option<String>,
    pub firmware_version: Option<String>,
    pub owner_name: Option<String>,
    pub serial_number: Option<u32>,
    pub internal_serial_number: Option<String>,
    /// The `LensModel` string as written by the body.
    pub lens_model: Option<String>,
    /// `LensType` from CameraSettings, or CameraInfo when the former is
    /// unknown.
    pub lens_type: Option<u16>,
    /// Resolved lens name.
    pub lens_name: Option<String>,
    pub original_decision_data: Option<OriginalDecisionData>,
    pub filters: Vec<CreativeFilter>,
    /// Records of the first CTMD sample; CR3 only.
    pub timed_metadata: Vec<CtmdRecord>,
}

impl CanonMakerNote {
    /// Decodes the Canon tags `exif` holds in its MakerNote IFD. The reader
    /// is needed for Original Decision Data, which lives outside the note.
    #[tracing::instrument(skip_all)]
    pub fn decode<R: ReadAt + ?Sized>(
        reader: &R,
        exif: &Exif,
        opts: &DecodeOptions,
    ) -> crate::Result<CanonMakerNote> {
        let get = |tag: CanonTag| exif.get(IfdId::MAKER_NOTE, tag.code());
        let words = |tag: CanonTag| get(tag).and_then(EntryValue::to_i64_vec);
        let text = |tag: CanonTag| {
            get(tag)
                .and_then(EntryValue::as_str)
                .map(|s| s.trim_end_matches('\0').trim().to_owned())
                .filter(|s| !s.is_empty())
        };
        let order = exif.header.byte_order;

        let mut note = CanonMakerNote {
            model_id: get(CanonTag::ModelID).and_then(EntryValue::as_u32),
            camera_settings: words(CanonTag::CameraSettings)
                .map(|v| CameraSettings::decode(Words(&v))),
            focal_length: words(CanonTag::FocalLength).map(|v| FocalLength::decode(Words(&v))),
            shot_info: words(CanonTag::ShotInfo).map(|v| ShotInfo::decode(Words(&v))),
            file_info: words(CanonTag::FileInfo).map(|v| FileInfo::decode(Words(&v))),
            time_info: words(CanonTag::TimeInfo).map(|v| TimeInfo::decode(Words(&v))),
            image_type: text(CanonTag::ImageType),
            firmware_version: text(CanonTag::FirmwareVersion),
            owner_name: text(CanonTag::OwnerName),
            serial_number: get(CanonTag::SerialNumber).and_then(EntryValue::as_u32),
            internal_serial_number: text(CanonTag::InternalSerialNumber),
            lens_model: text(CanonTag::LensModel),
            ..Default::default()
        };

        if let (Some(model_id), Some(value)) = (note.model_id, get(CanonTag::CameraInfo)) {
            let data = raw_bytes(value, order);
            let values: Vec<i32> = value
                .to_i64_vec()
                .unwrap_or_default()
                .into_iter()
                .map(|v| v as i32)
                .collect();
            match CameraInfo::decode(model_id, &data, &values) {
                Ok(info) => note.camera_info = Some(info),
                Err(e) => tracing::warn!(?e, model_id, "skip CameraInfo"),
            }
        }

        if let Some(af) = get(CanonTag::AFInfo2).and_then(EntryValue::as_u16_slice) {
            match AfInfo::decode(af) {
                Ok(info) => note.af_info = Some(info),
                Err(e) => tracing::warn!(?e, "skip AFInfo2"),
            }
        }

        if let Some(value) = get(CanonTag::FilterInfo) {
            match decode_filter_info(&u32_words(value, order)) {
                Ok(filters) => note.filters = filters,
                Err(e) => tracing::warn!(?e, "skip FilterInfo"),
            }
        }

        let odd_offset = get(CanonTag::OriginalDecisionDataOffset)
            .and_then(EntryValue::as_u32)
            .filter(|v| *v != 0);
        if let Some(offset) = odd_offset {
            match read_odd(reader, offset as u64) {
                Ok(odd) => note.original_decision_data = Some(odd),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => tracing::warn!(?e, offset, "skip original decision data"),
            }
        }

        note.lens_type = note
            .camera_settings
            .as_ref()
            .and_then(CameraSettings::known_lens_type)
            .or_else(|| {
                note.camera_info
                    .as_ref()
                    .and_then(CameraInfo::lens_type)
                    .filter(|v| *v != 0 && *v != 0xffff)
            });
        note.lens_name = note.resolve_lens_name(&opts.lens_overrides);
        tracing::debug!(model_id = ?note.model_id, lens = ?note.lens_name, "canon maker note");
        Ok(note)
    }

    /// Model name for [`CanonMakerNote::model_id`].
    pub fn model_name(&self) -> Option<&'static str> {
        model::model_name(self.model_id?)
    }

    fn resolve_lens_name(&self, overrides: &LensOverrides) -> Option<String> {
        let Some(lens_type) = self.lens_type else {
            return self.lens_model.clone();
        };

        if lens_type == RF_LENS_PLACEHOLDER {
            let rf = self
                .file_info
                .as_ref()
                .and_then(|f| f.rf_lens_type)
                .and_then(rf_lens_name);
            if let Some(name) = rf {
                return Some(name.to_owned());
            }
        }

        let settings = self.camera_settings.as_ref();
        let (short_focal, long_focal) = settings
            .and_then(CameraSettings::focal_range)
            .or_else(|| {
                self.camera_info
                    .as_ref()
                    .and_then(CameraInfo::focal_range)
                    .map(|(s, l)| (s as f64, l as f64))
            })
            .unwrap_or_default();
        let query = LensQuery {
            lens_type,
            lens_model: self.lens_model.as_deref().unwrap_or_default(),
            short_focal,
            long_focal,
            max_aperture: settings.and_then(|s| s.max_aperture).unwrap_or_default(),
        };
        Some(resolve_lens(&query, overrides))
    }
}

/// The payload of a binary tag as bytes. Integer arrays are re-encoded in
/// the order they were read with.
fn raw_bytes(value: &EntryValue, order: ByteOrder) -> Vec<u8> {
    let be = order == ByteOrder::BigEndian;
    match value {
        EntryValue::Undefined(v) | EntryValue::U8Array(v) => v.clone(),
        EntryValue::I8Array(v) => v.iter().map(|x| *x as u8).collect(),
        EntryValue::U16Array(v) => v
            .iter()
            .flat_map(|x| if be { x.to_be_bytes() } else { x.to_le_bytes() })
            .collect(),
        EntryValue::I16Array(v) => v
            .iter()
            .flat_map(|x| if be { x.to_be_bytes() } else { x.to_le_bytes() })
            .collect(),
        EntryValue::U32Array(v) => v
            .iter()
            .flat_map(|x| if be { x.to_be_bytes() } else { x.to_le_bytes() })
            .collect(),
        EntryValue::I32Array(v) => v
            .iter()
            .flat_map(|x| if be { x.to_be_bytes() } else { x.to_le_bytes() })
            .collect(),
        _ => Vec::new(),
    }
}

/// The payload of a tag as u32 words, whether it was stored as LONGs or as
/// an opaque blob.
fn u32_words(value: &EntryValue, order: ByteOrder) -> Vec<u32> {
    match value.as_bytes() {
        Some(bytes) => bytes
            .chunks_exact(4)
            .map(|c| order.u32([c[0], c[1], c[2], c[3]]))
            .collect(),
        None => value
            .to_i64_vec()
            .unwrap_or_default()
            .into_iter()
            .map(|v| v as u32)
            .collect(),
    }
}
