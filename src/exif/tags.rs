//! Exif tag identifiers, see <https://exiftool.org/TagNames/EXIF.html> and
//! <https://exiftool.org/TagNames/GPS.html>.

use std::fmt::Display;

use super::ifd::IfdKind;

macro_rules! tag_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:literal,)* }) => {
        $(#[$meta])*
        #[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
        #[derive(Debug, Eq, PartialEq, Hash, Clone, Copy)]
        #[repr(u16)]
        pub enum $name {
            $($variant = $code,)*
        }

        impl $name {
            pub const fn code(self) -> u16 {
                self as u16
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant),)*
                }
            }
        }

        impl TryFrom<u16> for $name {
            type Error = u16;

            fn try_from(v: u16) -> Result<Self, Self::Error> {
                match v {
                    $($code => Ok($name::$variant),)*
                    other => Err(other),
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

pub(crate) use tag_enum;

tag_enum! {
    /// Tags of IFD0/IFD1, SubIFDs and the Exif IFD.
    ExifTag {
        NewSubfileType = 0x00fe,
        ImageWidth = 0x0100,
        ImageHeight = 0x0101,
        BitsPerSample = 0x0102,
        Compression = 0x0103,
        PhotometricInterpretation = 0x0106,
        ImageDescription = 0x010e,
        Make = 0x010f,
        Model = 0x0110,
        StripOffsets = 0x0111,
        Orientation = 0x0112,
        SamplesPerPixel = 0x0115,
        RowsPerStrip = 0x0116,
        StripByteCounts = 0x0117,
        XResolution = 0x011a,
        YResolution = 0x011b,
        PlanarConfiguration = 0x011c,
        ResolutionUnit = 0x0128,
        Software = 0x0131,
        ModifyDate = 0x0132,
        Artist = 0x013b,
        HostComputer = 0x013c,
        WhitePoint = 0x013e,
        PrimaryChromaticities = 0x013f,
        TileWidth = 0x0142,
        TileLength = 0x0143,
        TileOffsets = 0x0144,
        TileByteCounts = 0x0145,
        SubIFDs = 0x014a,
        ThumbnailOffset = 0x0201,
        ThumbnailLength = 0x0202,
        YCbCrCoefficients = 0x0211,
        YCbCrPositioning = 0x0213,
        ReferenceBlackWhite = 0x0214,
        ApplicationNotes = 0x02bc,
        Rating = 0x4746,
        CR2Slice = 0xc640,
        Copyright = 0x8298,
        ExposureTime = 0x829a,
        FNumber = 0x829d,
        ExifOffset = 0x8769,
        ExposureProgram = 0x8822,
        SpectralSensitivity = 0x8824,
        GPSInfo = 0x8825,
        ISOSpeedRatings = 0x8827,
        OECF = 0x8828,
        SensitivityType = 0x8830,
        RecommendedExposureIndex = 0x8832,
        ExifVersion = 0x9000,
        DateTimeOriginal = 0x9003,
        CreateDate = 0x9004,
        OffsetTime = 0x9010,
        OffsetTimeOriginal = 0x9011,
        OffsetTimeDigitized = 0x9012,
        ComponentsConfiguration = 0x9101,
        ShutterSpeedValue = 0x9201,
        ApertureValue = 0x9202,
        BrightnessValue = 0x9203,
        ExposureBiasValue = 0x9204,
        MaxApertureValue = 0x9205,
        SubjectDistance = 0x9206,
        MeteringMode = 0x9207,
        LightSource = 0x9208,
        Flash = 0x9209,
        FocalLength = 0x920a,
        SubjectArea = 0x9214,
        MakerNote = 0x927c,
        UserComment = 0x9286,
        SubSecTime = 0x9290,
        SubSecTimeOriginal = 0x9291,
        SubSecTimeDigitized = 0x9292,
        FlashPixVersion = 0xa000,
        ColorSpace = 0xa001,
        ExifImageWidth = 0xa002,
        ExifImageHeight = 0xa003,
        RelatedSoundFile = 0xa004,
        InteropOffset = 0xa005,
        FlashEnergy = 0xa20b,
        FocalPlaneXResolution = 0xa20e,
        FocalPlaneYResolution = 0xa20f,
        FocalPlaneResolutionUnit = 0xa210,
        SubjectLocation = 0xa214,
        ExposureIndex = 0xa215,
        SensingMethod = 0xa217,
        FileSource = 0xa300,
        SceneType = 0xa301,
        CFAPattern = 0xa302,
        CustomRendered = 0xa401,
        ExposureMode = 0xa402,
        WhiteBalance = 0xa403,
        DigitalZoomRatio = 0xa404,
        FocalLengthIn35mmFormat = 0xa405,
        SceneCaptureType = 0xa406,
        GainControl = 0xa407,
        Contrast = 0xa408,
        Saturation = 0xa409,
        Sharpness = 0xa40a,
        DeviceSettingDescription = 0xa40b,
        SubjectDistanceRange = 0xa40c,
        ImageUniqueID = 0xa420,
        OwnerName = 0xa430,
        SerialNumber = 0xa431,
        LensSpecification = 0xa432,
        LensMake = 0xa433,
        LensModel = 0xa434,
        LensSerialNumber = 0xa435,
        Gamma = 0xa500,
        DNGVersion = 0xc612,
        DNGBackwardVersion = 0xc613,
        UniqueCameraModel = 0xc614,
        DNGPrivateData = 0xc634,
    }
}

tag_enum! {
    /// Tags of the GPS IFD.
    GpsTag {
        GPSVersionID = 0x0000,
        GPSLatitudeRef = 0x0001,
        GPSLatitude = 0x0002,
        GPSLongitudeRef = 0x0003,
        GPSLongitude = 0x0004,
        GPSAltitudeRef = 0x0005,
        GPSAltitude = 0x0006,
        GPSTimeStamp = 0x0007,
        GPSSatellites = 0x0008,
        GPSStatus = 0x0009,
        GPSMeasureMode = 0x000a,
        GPSDOP = 0x000b,
        GPSSpeedRef = 0x000c,
        GPSSpeed = 0x000d,
        GPSTrackRef = 0x000e,
        GPSTrack = 0x000f,
        GPSImgDirectionRef = 0x0010,
        GPSImgDirection = 0x0011,
        GPSMapDatum = 0x0012,
        GPSDestLatitudeRef = 0x0013,
        GPSDestLatitude = 0x0014,
        GPSDestLongitudeRef = 0x0015,
        GPSDestLongitude = 0x0016,
        GPSDestBearingRef = 0x0017,
        GPSDestBearing = 0x0018,
        GPSDestDistanceRef = 0x0019,
        GPSDestDistance = 0x001a,
        GPSProcessingMethod = 0x001b,
        GPSAreaInformation = 0x001c,
        GPSDateStamp = 0x001d,
        GPSDifferential = 0x001e,
        GPSHPositioningError = 0x001f,
    }
}

tag_enum! {
    /// Tags of the Interoperability IFD.
    InteropTag {
        InteropIndex = 0x0001,
        InteropVersion = 0x0002,
        RelatedImageFileFormat = 0x1000,
        RelatedImageWidth = 0x1001,
        RelatedImageHeight = 0x1002,
    }
}

/// Human readable name of a tag found in an IFD of the given kind.
pub fn tag_name(kind: IfdKind, id: u16) -> Option<&'static str> {
    match kind {
        IfdKind::Root | IfdKind::Sub | IfdKind::Exif => ExifTag::try_from(id).ok().map(|t| t.name()),
        IfdKind::Gps => GpsTag::try_from(id).ok().map(|t| t.name()),
        IfdKind::Iop => InteropTag::try_from(id).ok().map(|t| t.name()),
        // Maker-note tag names depend on the vendor, see `Exif::tag_name`.
        IfdKind::MakerNote | IfdKind::DngPrivate => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(IfdKind::Root, 0x010f, Some("Make"))]
    #[test_case(IfdKind::Exif, 0x927c, Some("MakerNote"))]
    #[test_case(IfdKind::Gps, 0x0002, Some("GPSLatitude"))]
    #[test_case(IfdKind::Iop, 0x0001, Some("InteropIndex"))]
    #[test_case(IfdKind::Root, 0xfffe, None)]
    fn names(kind: IfdKind, id: u16, expect: Option<&str>) {
        assert_eq!(tag_name(kind, id), expect);
    }

    #[test]
    fn codes_round_trip() {
        assert_eq!(ExifTag::try_from(0x8769), Ok(ExifTag::ExifOffset));
        assert_eq!(ExifTag::MakerNote.code(), 0x927c);
        assert_eq!(GpsTag::try_from(0x1d), Ok(GpsTag::GPSDateStamp));
        assert_eq!(ExifTag::try_from(0x1234), Err(0x1234));
    }
}
