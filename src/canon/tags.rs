//! Canon maker-note tag identifiers, see
//! <https://exiftool.org/TagNames/Canon.html>.

use std::fmt::Display;

use crate::exif::tags::tag_enum;

tag_enum! {
    /// Tags of the Canon MakerNote IFD.
    CanonTag {
        CameraSettings = 0x0001,
        FocalLength = 0x0002,
        ShotInfo = 0x0004,
        ImageType = 0x0006,
        FirmwareVersion = 0x0007,
        OwnerName = 0x0009,
        SerialNumber = 0x000c,
        CameraInfo = 0x000d,
        ModelID = 0x0010,
        AFInfo2 = 0x0026,
        TimeInfo = 0x0035,
        OriginalDecisionDataOffset = 0x0083,
        FileInfo = 0x0093,
        LensModel = 0x0095,
        InternalSerialNumber = 0x0096,
        FilterInfo = 0x4024,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0x0010, Some("ModelID"))]
    #[test_case(0x4024, Some("FilterInfo"))]
    #[test_case(0x0003, None)]
    fn names(id: u16, expect: Option<&str>) {
        assert_eq!(CanonTag::try_from(id).ok().map(|t| t.name()), expect);
    }

    #[test]
    fn display() {
        assert_eq!(CanonTag::AFInfo2.to_string(), "AFInfo2");
        assert_eq!(CanonTag::LensModel.code(), 0x0095);
    }
}
