use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::values::URational;

use super::{
    ifd::{IfdId, TagMap},
    tags::GpsTag,
};

/// GPS position read from the GPS IFD.
///
/// Coordinates are kept as the raw degree/minute/second rationals plus their
/// reference letters; [`GpsInfo::latitude`] and [`GpsInfo::longitude`] give
/// the signed decimal values.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GpsInfo {
    // N, S
    pub latitude_ref: char,
    pub latitude_dms: LatLng,

    // E, W
    pub longitude_ref: char,
    pub longitude_dms: LatLng,

    /// 0 above sea level, 1 below.
    pub altitude_ref: u8,
    pub altitude: Option<URational>,

    /// `GPSDateStamp` + `GPSTimeStamp`, always UTC.
    pub time: Option<DateTime<Utc>>,
}

/// Degrees, minutes and seconds.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct LatLng(pub URational, pub URational, pub URational);

impl LatLng {
    /// Unsigned decimal degrees, or `None` if a component has a zero
    /// denominator.
    pub fn to_degrees(&self) -> Option<f64> {
        Some(self.0.to_f64()? + self.1.to_f64()? / 60.0 + self.2.to_f64()? / 3600.0)
    }
}

impl From<[URational; 3]> for LatLng {
    fn from(value: [URational; 3]) -> Self {
        Self(value[0], value[1], value[2])
    }
}

impl TryFrom<&[URational]> for LatLng {
    type Error = crate::Error;

    fn try_from(value: &[URational]) -> Result<Self, Self::Error> {
        match value {
            [d, m, s] => Ok(Self(*d, *m, *s)),
            _ => Err(crate::Error::ParseGpsRationalLength(value.len())),
        }
    }
}

impl GpsInfo {
    /// Signed latitude, negative in the southern hemisphere.
    pub fn latitude(&self) -> Option<f64> {
        let v = self.latitude_dms.to_degrees()?;
        Some(if self.latitude_ref == 'S' { -v } else { v })
    }

    /// Signed longitude, negative west of Greenwich.
    pub fn longitude(&self) -> Option<f64> {
        let v = self.longitude_dms.to_degrees()?;
        Some(if self.longitude_ref == 'W' { -v } else { v })
    }

    /// Altitude in meters, negative below sea level.
    pub fn altitude_meters(&self) -> Option<f64> {
        let v = self.altitude?.to_f64()?;
        Some(if self.altitude_ref == 1 { -v } else { v })
    }

    /// Returns an ISO 6709 geographic point location string such as
    /// `+48.8577+002.295/`. `None` if the position is not computable.
    pub fn to_iso6709(&self) -> Option<String> {
        let latitude = self.latitude_dms.to_degrees()?;
        let longitude = self.longitude_dms.to_degrees()?;
        let altitude = match self.altitude_meters() {
            Some(alt) => format!("{alt:+.3}CRSWGS_84"),
            None => String::new(),
        };
        Some(format!(
            "{}{latitude:08.5}{}{longitude:09.5}{altitude}/",
            if self.latitude_ref == 'S' { '-' } else { '+' },
            if self.longitude_ref == 'W' { '-' } else { '+' },
        ))
    }

    /// Builds the GPS info from the tags of the GPS IFD. Returns `Ok(None)`
    /// when the IFD holds no position at all.
    pub(crate) fn from_tags(tags: &TagMap) -> crate::Result<Option<GpsInfo>> {
        let get = |tag: GpsTag| tags.value(IfdId::GPS, tag.code());

        let (Some(lat), Some(lng)) = (get(GpsTag::GPSLatitude), get(GpsTag::GPSLongitude)) else {
            if get(GpsTag::GPSLatitude).is_some() || get(GpsTag::GPSLongitude).is_some() {
                return Err(crate::Error::ParseGps("latitude or longitude is missing"));
            }
            return Ok(None);
        };

        let latitude_dms: LatLng = lat
            .as_urational_array()
            .ok_or(crate::Error::ParseGps("latitude is not rational"))?
            .try_into()?;
        let longitude_dms: LatLng = lng
            .as_urational_array()
            .ok_or(crate::Error::ParseGps("longitude is not rational"))?
            .try_into()?;

        let reference = |tag: GpsTag, default: char| {
            get(tag)
                .and_then(|v| v.as_str())
                .and_then(|s| s.chars().next())
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or(default)
        };

        let time = match gps_time(tags) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(?e, "ignore gps time");
                None
            }
        };

        Ok(Some(GpsInfo {
            latitude_ref: reference(GpsTag::GPSLatitudeRef, 'N'),
            latitude_dms,
            longitude_ref: reference(GpsTag::GPSLongitudeRef, 'E'),
            longitude_dms,
            altitude_ref: get(GpsTag::GPSAltitudeRef)
                .and_then(|v| v.as_u8())
                .unwrap_or(0),
            altitude: get(GpsTag::GPSAltitude).and_then(|v| v.as_urational()),
            time,
        }))
    }
}

/// `GPSDateStamp` ("YYYY:MM:DD") combined with the `GPSTimeStamp` rationals.
fn gps_time(tags: &TagMap) -> crate::Result<Option<DateTime<Utc>>> {
    let Some(date) = tags
        .value(IfdId::GPS, GpsTag::GPSDateStamp.code())
        .and_then(|v| v.as_str())
    else {
        return Ok(None);
    };
    let Some(hms) = tags
        .value(IfdId::GPS, GpsTag::GPSTimeStamp.code())
        .and_then(|v| v.as_urational_array())
    else {
        return Ok(None);
    };

    let date = NaiveDate::parse_from_str(date.trim(), "%Y:%m:%d")
        .map_err(|e| crate::Error::ParseTimestamp(format!("{date}: {e}")))?;

    let [h, m, s] = hms else {
        return Err(crate::Error::ParseGpsRationalLength(hms.len()));
    };
    let (Some(h), Some(m), Some(s)) = (h.to_f64(), m.to_f64(), s.to_f64()) else {
        return Err(crate::Error::ParseRationals("gps time has a zero denominator"));
    };
    let secs = s.trunc();
    let nanos = ((s - secs) * 1e9).round() as u32;
    let time = NaiveTime::from_hms_nano_opt(h as u32, m as u32, secs as u32, nanos)
        .ok_or_else(|| crate::Error::ParseTimestamp(format!("{h}:{m}:{s}")))?;

    Ok(Some(date.and_time(time).and_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        exif::ifd::{IfdKind, Tag},
        values::{EntryValue, TagType},
    };
    use test_case::test_case;

    fn r(n: u32, d: u32) -> URational {
        URational::new(n, d)
    }

    fn gps_tag(id: GpsTag, value: EntryValue) -> Tag {
        Tag {
            id: id.code(),
            tag_type: TagType::Undefined,
            unit_count: 0,
            value_or_offset: 0,
            ifd: IfdId::new(IfdKind::Gps, 0),
            value: Some(value),
        }
    }

    #[test]
    fn gps_iso6709() {
        let palace = GpsInfo {
            latitude_ref: 'N',
            latitude_dms: LatLng(r(39, 1), r(55, 1), r(0, 1)),
            longitude_ref: 'E',
            longitude_dms: LatLng(r(116, 1), r(23, 1), r(27, 1)),
            altitude_ref: 0,
            altitude: None,
            time: None,
        };
        assert_eq!(palace.to_iso6709().as_deref(), Some("+39.91667+116.39083/"));

        let liberty = GpsInfo {
            latitude_ref: 'N',
            latitude_dms: LatLng(r(40, 1), r(41, 1), r(21, 1)),
            longitude_ref: 'W',
            longitude_dms: LatLng(r(74, 1), r(2, 1), r(40, 1)),
            altitude_ref: 0,
            altitude: None,
            time: None,
        };
        assert_eq!(liberty.to_iso6709().as_deref(), Some("+40.68917-074.04444/"));
        assert!((liberty.longitude().unwrap() + 74.04444).abs() < 1e-4);
    }

    #[test]
    fn signed_coordinates_from_tags() {
        let mut tags = TagMap::default();
        tags.insert(gps_tag(GpsTag::GPSLatitudeRef, "S".into()));
        tags.insert(gps_tag(
            GpsTag::GPSLatitude,
            EntryValue::URationalArray(vec![r(33, 1), r(51, 1), r(3540, 100)]),
        ));
        tags.insert(gps_tag(GpsTag::GPSLongitudeRef, "E".into()));
        tags.insert(gps_tag(
            GpsTag::GPSLongitude,
            EntryValue::URationalArray(vec![r(151, 1), r(12, 1), r(0, 1)]),
        ));
        tags.insert(gps_tag(GpsTag::GPSAltitudeRef, EntryValue::U8(1)));
        tags.insert(gps_tag(GpsTag::GPSAltitude, EntryValue::URational(r(25, 2))));
        tags.insert(gps_tag(GpsTag::GPSDateStamp, "2019:12:06".into()));
        tags.insert(gps_tag(
            GpsTag::GPSTimeStamp,
            EntryValue::URationalArray(vec![r(5, 1), r(1, 1), r(4750, 100)]),
        ));

        let gps = GpsInfo::from_tags(&tags).unwrap().unwrap();
        assert!((gps.latitude().unwrap() + 33.8598).abs() < 1e-4);
        assert!((gps.longitude().unwrap() - 151.2).abs() < 1e-9);
        assert_eq!(gps.altitude_meters(), Some(-12.5));
        let time = gps.time.unwrap();
        assert_eq!(time.timestamp(), 1575608507);
        assert_eq!(time.timestamp_subsec_millis(), 500);
    }

    #[test_case(LatLng(r(10, 1), r(30, 1), r(0, 1)), Some(10.5))]
    #[test_case(LatLng(r(10, 0), r(30, 1), r(0, 1)), None; "zero degree denominator")]
    #[test_case(LatLng(r(10, 1), r(30, 1), r(0, 0)), None; "zero second denominator")]
    fn degrees(dms: LatLng, expect: Option<f64>) {
        assert_eq!(dms.to_degrees(), expect);

        let gps = GpsInfo {
            latitude_ref: 'S',
            latitude_dms: dms,
            longitude_ref: 'E',
            longitude_dms: LatLng(r(1, 1), r(0, 1), r(0, 1)),
            altitude_ref: 0,
            altitude: None,
            time: None,
        };
        assert_eq!(gps.latitude(), expect.map(|v| -v));
        assert_eq!(gps.longitude(), Some(1.0));
        assert_eq!(gps.to_iso6709().is_some(), expect.is_some());
    }

    #[test]
    fn no_position() {
        let tags = TagMap::default();
        assert!(GpsInfo::from_tags(&tags).unwrap().is_none());
    }

    #[test]
    fn wrong_rational_count() {
        let mut tags = TagMap::default();
        tags.insert(gps_tag(
            GpsTag::GPSLatitude,
            EntryValue::URationalArray(vec![r(33, 1), r(51, 1)]),
        ));
        tags.insert(gps_tag(
            GpsTag::GPSLongitude,
            EntryValue::URationalArray(vec![r(1, 1), r(2, 1), r(3, 1)]),
        ));
        assert!(matches!(
            GpsInfo::from_tags(&tags),
            Err(crate::Error::ParseGpsRationalLength(2))
        ));
    }
}
