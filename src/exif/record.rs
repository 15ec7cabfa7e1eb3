use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

use crate::{
    file::ImageType,
    values::{EntryValue, IRational, URational},
};

use super::{
    gps::GpsInfo,
    header::TiffHeader,
    ifd::{IfdId, IfdKind, Tag, TagMap},
    makernote::MakerNote,
    tags::{self, ExifTag},
};

/// The normalized metadata of one image.
///
/// The record is filled while the IFDs are walked: every tag lands in
/// [`Exif::tags`], and the well-known ones are also copied into the typed
/// fields. Derived values (dates, GPS, embedded image regions) are computed
/// once the walk is over.
///
/// ## Example
///
/// ```rust
/// use nom_imagemeta::*;
///
/// fn main() -> Result<()> {
///     let data = std::fs::read("./testdata/exif.jpg").unwrap_or_default();
///     match decode(&data) {
///         Ok(exif) => println!("{} {}", exif.make.unwrap_or_default(), exif.model.unwrap_or_default()),
///         Err(Error::NoExif) | Err(Error::InsufficientData) => (),
///         Err(e) => return Err(e),
///     }
///     Ok(())
/// }
/// ```
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exif {
    pub image_type: ImageType,
    /// The primary TIFF structure the tags were read from.
    pub header: TiffHeader,

    pub make: Option<String>,
    pub model: Option<String>,
    pub software: Option<String>,
    pub image_description: Option<String>,
    pub artist: Option<String>,
    pub copyright: Option<String>,
    pub camera_serial: Option<String>,

    pub image_width: u32,
    pub image_height: u32,
    pub orientation: Option<u16>,

    pub exposure: Exposure,
    pub focal_length: Option<URational>,
    pub focal_length_35mm: Option<u16>,

    pub dates: Dates,
    pub gps: Option<GpsInfo>,
    pub lens: LensInfo,

    pub xmp: Option<XmpHeader>,
    pub thumbnail: Option<ImageRegion>,
    pub preview: Option<ImageRegion>,

    pub maker_note: MakerNote,

    pub tags: TagMap,

    #[cfg_attr(feature = "json_dump", serde(skip))]
    dimensions_from_exif: bool,
}

/// Exposure parameters. Rationals are kept as read so that a zero
/// denominator stays visible to the caller.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exposure {
    pub f_number: Option<URational>,
    pub exposure_time: Option<URational>,
    pub iso: Option<u32>,
    pub exposure_bias: Option<IRational>,
    pub exposure_program: Option<u16>,
    pub metering_mode: Option<u16>,
    pub flash: Option<u16>,
    pub exposure_mode: Option<u16>,
    pub white_balance: Option<u16>,
    pub subject_distance: Option<URational>,
}

impl Exposure {
    pub fn aperture(&self) -> Option<f64> {
        self.f_number?.to_f64()
    }

    pub fn shutter_seconds(&self) -> Option<f64> {
        self.exposure_time?.to_f64()
    }
}

/// Timestamps, all in UTC.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dates {
    pub modify: Option<DateTime<Utc>>,
    pub original: Option<DateTime<Utc>>,
    pub digitized: Option<DateTime<Utc>>,
    pub gps: Option<DateTime<Utc>>,
}

#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LensInfo {
    pub make: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    /// Vendor lens id, e.g. Canon `LensType`.
    pub id: Option<u16>,
    /// `LensSpecification`: min/max focal length, min/max aperture.
    pub specification: Option<[URational; 4]>,
}

/// Where an XMP packet sits in the source. The packet is not parsed.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XmpHeader {
    pub offset: u64,
    pub length: u64,
}

/// An embedded image (thumbnail or preview), as absolute file offsets.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageRegion {
    pub offset: u64,
    pub length: u64,
}

impl Exif {
    pub(crate) fn new(header: TiffHeader) -> Self {
        Self {
            image_type: header.image_type,
            header,
            ..Default::default()
        }
    }

    /// Value of a tag in the given IFD.
    pub fn get(&self, ifd: IfdId, tag_id: u16) -> Option<&EntryValue> {
        self.tags.value(ifd, tag_id)
    }

    /// Value of an Exif tag, looked up in IFD0 first and then in the Exif
    /// IFD.
    pub fn get_tag(&self, tag: ExifTag) -> Option<&EntryValue> {
        self.get(IfdId::ROOT, tag.code())
            .or_else(|| self.get(IfdId::EXIF, tag.code()))
    }

    /// Human readable name of a tag. Maker-note tags are named according to
    /// the maker note that was decoded.
    pub fn tag_name(&self, tag: &Tag) -> Option<&'static str> {
        match (tag.ifd.kind, &self.maker_note) {
            (IfdKind::MakerNote, MakerNote::Canon(_)) => {
                crate::canon::CanonTag::try_from(tag.id).ok().map(|t| t.name())
            }
            (kind, _) => tags::tag_name(kind, tag.id),
        }
    }

    pub fn is_canon(&self) -> bool {
        self.make
            .as_deref()
            .is_some_and(|m| m.trim().to_ascii_lowercase().starts_with("canon"))
    }

    /// Copies a freshly walked tag into the typed fields.
    pub(crate) fn add_tag(&mut self, tag: &Tag) {
        let Some(value) = &tag.value else {
            return;
        };
        match tag.ifd.kind {
            IfdKind::Root if tag.ifd.index == 0 => self.add_root_tag(tag.id, value),
            IfdKind::Exif => self.add_exif_tag(tag.id, value),
            // Read from the tag map once the walk is over.
            IfdKind::Root | IfdKind::Gps => (),
            IfdKind::Sub | IfdKind::Iop | IfdKind::MakerNote | IfdKind::DngPrivate => (),
        }
    }

    fn add_root_tag(&mut self, id: u16, value: &EntryValue) {
        let Ok(tag) = ExifTag::try_from(id) else {
            return;
        };
        let text = || value.as_str().map(|s| s.trim().to_owned());
        match tag {
            ExifTag::Make => self.make = text(),
            ExifTag::Model => self.model = text(),
            ExifTag::Software => self.software = text(),
            ExifTag::ImageDescription => self.image_description = text(),
            ExifTag::Artist => self.artist = text(),
            ExifTag::Copyright => self.copyright = text(),
            ExifTag::Orientation => self.orientation = value.as_u16(),
            ExifTag::ImageWidth if !self.dimensions_from_exif => {
                self.image_width = value.as_u32().unwrap_or_default()
            }
            ExifTag::ImageHeight if !self.dimensions_from_exif => {
                self.image_height = value.as_u32().unwrap_or_default()
            }
            ExifTag::DNGVersion if self.image_type == ImageType::TIFF => {
                tracing::debug!("DNGVersion found; TIFF promoted to DNG");
                self.image_type = ImageType::DNG;
            }
            _ => (),
        }
    }

    fn add_exif_tag(&mut self, id: u16, value: &EntryValue) {
        let Ok(tag) = ExifTag::try_from(id) else {
            return;
        };
        let text = || value.as_str().map(|s| s.trim().to_owned()).filter(|s| !s.is_empty());
        let exposure = &mut self.exposure;
        match tag {
            ExifTag::FNumber => exposure.f_number = value.as_urational(),
            ExifTag::ExposureTime => exposure.exposure_time = value.as_urational(),
            ExifTag::ISOSpeedRatings => exposure.iso = value.as_u32(),
            ExifTag::ExposureBiasValue => exposure.exposure_bias = value.as_irational(),
            ExifTag::ExposureProgram => exposure.exposure_program = value.as_u16(),
            ExifTag::MeteringMode => exposure.metering_mode = value.as_u16(),
            ExifTag::Flash => exposure.flash = value.as_u16(),
            ExifTag::ExposureMode => exposure.exposure_mode = value.as_u16(),
            ExifTag::WhiteBalance => exposure.white_balance = value.as_u16(),
            ExifTag::SubjectDistance => exposure.subject_distance = value.as_urational(),
            ExifTag::FocalLength => self.focal_length = value.as_urational(),
            ExifTag::FocalLengthIn35mmFormat => self.focal_length_35mm = value.as_u16(),
            // The Exif IFD describes the main image; IFD0 may describe a
            // reduced one.
            ExifTag::ExifImageWidth => {
                if let Some(w) = value.as_u32() {
                    self.image_width = w;
                    self.dimensions_from_exif = true;
                }
            }
            ExifTag::ExifImageHeight => {
                if let Some(h) = value.as_u32() {
                    self.image_height = h;
                    self.dimensions_from_exif = true;
                }
            }
            ExifTag::SerialNumber => self.camera_serial = text(),
            ExifTag::LensMake => self.lens.make = text(),
            ExifTag::LensModel => self.lens.model = text(),
            ExifTag::LensSerialNumber => self.lens.serial = text(),
            ExifTag::LensSpecification => {
                if let Some([a, b, c, d]) = value.as_urational_array() {
                    self.lens.specification = Some([*a, *b, *c, *d]);
                }
            }
            _ => (),
        }
    }

    /// Computes the values that depend on several tags. Called once the
    /// walk is over.
    pub(crate) fn finish(&mut self) {
        self.dates.modify = self.date(
            IfdId::ROOT,
            ExifTag::ModifyDate,
            ExifTag::SubSecTime,
            ExifTag::OffsetTime,
        );
        self.dates.original = self.date(
            IfdId::EXIF,
            ExifTag::DateTimeOriginal,
            ExifTag::SubSecTimeOriginal,
            ExifTag::OffsetTimeOriginal,
        );
        self.dates.digitized = self.date(
            IfdId::EXIF,
            ExifTag::CreateDate,
            ExifTag::SubSecTimeDigitized,
            ExifTag::OffsetTimeDigitized,
        );

        match GpsInfo::from_tags(&self.tags) {
            Ok(gps) => {
                self.dates.gps = gps.and_then(|g| g.time);
                self.gps = gps;
            }
            Err(e) => tracing::warn!(?e, "skip gps info"),
        }

        self.thumbnail = self.region(
            IfdId::ROOT.next(),
            ExifTag::ThumbnailOffset,
            ExifTag::ThumbnailLength,
        );
        self.preview = self.region(
            IfdId::ROOT,
            ExifTag::StripOffsets,
            ExifTag::StripByteCounts,
        );
    }

    fn date(
        &self,
        ifd: IfdId,
        tag: ExifTag,
        sub_sec: ExifTag,
        offset: ExifTag,
    ) -> Option<DateTime<Utc>> {
        let text = self.get(ifd, tag.code()).and_then(|v| v.as_str())?;
        let sub_sec = self.get(IfdId::EXIF, sub_sec.code()).and_then(|v| v.as_str());
        let offset = self.get(IfdId::EXIF, offset.code()).and_then(|v| v.as_str());
        match parse_exif_datetime(text, sub_sec, offset) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(%tag, ?e, "skip date");
                None
            }
        }
    }

    fn region(&self, ifd: IfdId, offset: ExifTag, length: ExifTag) -> Option<ImageRegion> {
        let first = |tag: ExifTag| {
            self.get(ifd, tag.code())
                .and_then(|v| v.as_u32_slice().and_then(|s| s.first().copied()).or(v.as_u32()))
        };
        let (offset, length) = (first(offset)?, first(length)?);
        if length == 0 {
            return None;
        }
        Some(ImageRegion {
            offset: self.header.tiff_header_offset as u64 + offset as u64,
            length: length as u64,
        })
    }
}

/// Parses an Exif `YYYY:MM:DD HH:MM:SS` value.
///
/// The value is taken as UTC unless an `OffsetTime*` value (`+09:00`) is
/// given. Blank or all-zero dates yield `None`.
pub(crate) fn parse_exif_datetime(
    text: &str,
    sub_sec: Option<&str>,
    offset: Option<&str>,
) -> crate::Result<Option<DateTime<Utc>>> {
    let text = text.trim();
    if text.is_empty() || text.chars().all(|c| matches!(c, '0' | ':' | ' ')) {
        return Ok(None);
    }

    let offset = offset.map(str::trim).filter(|s| !s.is_empty());
    let t = match offset {
        Some(tz) => DateTime::parse_from_str(&format!("{text} {tz}"), "%Y:%m:%d %H:%M:%S %:z")
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| crate::Error::ParseTimestamp(format!("{text} {tz}: {e}")))?,
        None => NaiveDateTime::parse_from_str(text, "%Y:%m:%d %H:%M:%S")
            .map(|t| t.and_utc())
            .map_err(|e| crate::Error::ParseTimestamp(format!("{text}: {e}")))?,
    };

    let Some(sub_sec) = sub_sec.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(Some(t));
    };
    let nanos = parse_sub_second(sub_sec)?;
    t.with_nanosecond(nanos)
        .map(Some)
        .ok_or_else(|| crate::Error::ParseSubSecond(sub_sec.to_owned()))
}

// "5" is half a second, "050" is 50 ms.
fn parse_sub_second(s: &str) -> crate::Result<u32> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(crate::Error::ParseSubSecond(s.to_owned()));
    }
    let digits: String = s.chars().chain(std::iter::repeat('0')).take(9).collect();
    digits
        .parse()
        .map_err(|_| crate::Error::ParseSubSecond(s.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::TagType;
    use test_case::test_case;

    #[test_case("2017:10:22 11:54:20", None, None, Some(1508673260))]
    #[test_case("2013:09:03 09:45:16", None, None, Some(1378201516))]
    #[test_case("2019:12:06 14:01:47", None, Some("+09:00"), Some(1575608507); "with offset")]
    #[test_case("    ", None, None, None; "blank")]
    #[test_case("0000:00:00 00:00:00", None, None, None; "zeros")]
    fn exif_datetime(text: &str, sub: Option<&str>, tz: Option<&str>, expect: Option<i64>) {
        let t = parse_exif_datetime(text, sub, tz).unwrap();
        assert_eq!(t.map(|t| t.timestamp()), expect);
    }

    #[test_case("5", 500_000_000)]
    #[test_case("050", 50_000_000)]
    #[test_case("123456789123", 123_456_789)]
    fn sub_seconds(s: &str, nanos: u32) {
        let t = parse_exif_datetime("2007:10:18 13:44:32", Some(s), None)
            .unwrap()
            .unwrap();
        assert_eq!(t.timestamp(), 1192715072);
        assert_eq!(t.nanosecond(), nanos);
    }

    #[test]
    fn bad_values() {
        assert!(matches!(
            parse_exif_datetime("2007-10-18", None, None),
            Err(crate::Error::ParseTimestamp(_))
        ));
        assert!(matches!(
            parse_exif_datetime("2007:10:18 13:44:32", Some("1a"), None),
            Err(crate::Error::ParseSubSecond(_))
        ));
    }

    fn tag(ifd: IfdId, id: ExifTag, value: EntryValue) -> Tag {
        Tag {
            id: id.code(),
            tag_type: TagType::Undefined,
            unit_count: 1,
            value_or_offset: 0,
            ifd,
            value: Some(value),
        }
    }

    fn add(exif: &mut Exif, t: Tag) {
        exif.add_tag(&t);
        exif.tags.insert(t);
    }

    #[test]
    fn exif_dimensions_win() {
        let mut exif = Exif::default();
        add(&mut exif, tag(IfdId::EXIF, ExifTag::ExifImageWidth, 5616u32.into()));
        add(&mut exif, tag(IfdId::ROOT, ExifTag::ImageWidth, 160u32.into()));
        add(&mut exif, tag(IfdId::ROOT.next(), ExifTag::ImageHeight, 120u32.into()));
        assert_eq!(exif.image_width, 5616);
        assert_eq!(exif.image_height, 0);
    }

    #[test]
    fn finish_fills_derived_fields() {
        let header = TiffHeader {
            tiff_header_offset: 12,
            ..Default::default()
        };
        let mut exif = Exif::new(header);
        add(&mut exif, tag(IfdId::ROOT, ExifTag::Make, "Canon ".into()));
        add(&mut exif, tag(IfdId::ROOT, ExifTag::ModifyDate, "2007:10:18 13:44:32".into()));
        add(&mut exif, tag(IfdId::EXIF, ExifTag::SubSecTime, "25".into()));
        add(&mut exif, tag(IfdId::ROOT.next(), ExifTag::ThumbnailOffset, 100u32.into()));
        add(&mut exif, tag(IfdId::ROOT.next(), ExifTag::ThumbnailLength, 2000u32.into()));
        exif.finish();

        assert!(exif.is_canon());
        assert_eq!(exif.make.as_deref(), Some("Canon"));
        let modify = exif.dates.modify.unwrap();
        assert_eq!(modify.timestamp(), 1192715072);
        assert_eq!(modify.timestamp_subsec_millis(), 250);
        assert_eq!(
            exif.thumbnail,
            Some(ImageRegion {
                offset: 112,
                length: 2000
            })
        );
        assert!(exif.preview.is_none());
        assert!(exif.gps.is_none());
    }

    #[test]
    fn dng_promotion() {
        let mut exif = Exif::new(TiffHeader::default().with_image_type(ImageType::TIFF));
        add(
            &mut exif,
            tag(IfdId::ROOT, ExifTag::DNGVersion, EntryValue::U8Array(vec![1, 4, 0, 0])),
        );
        assert_eq!(exif.image_type, ImageType::DNG);
    }
}
