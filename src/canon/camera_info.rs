//! CameraInfo (tag `0x000D`): a fixed-layout binary record whose layout
//! depends on the camera body.
//!
//! Each layout is a list of `field: Kind = offset` lines. A field kind knows
//! its width, byte order and conversion; the smallest payload a layout
//! accepts is the largest field end.

use super::{
    ev::{exposure_time_from_raw, f_number_from_raw, iso_from_raw, temperature},
    model::*,
};

/// How one CameraInfo field is stored.
pub trait Field {
    type Out;
    const WIDTH: usize;
    fn read(bytes: &[u8]) -> Self::Out;
}

pub struct FNumber;
pub struct ExposureTime;
pub struct Iso;
pub struct Temperature;
pub struct Byte;
/// 16-bit big-endian, even inside little-endian files.
pub struct U16Rev;
pub struct U16;
pub struct U32;
/// Big-endian distance in cm, decoded to metres.
pub struct FocusDistance;
/// Stored 1-based.
pub struct FileIndex;
/// Stored with an offset of one.
pub struct DirIndex;
pub struct Text<const N: usize>;

impl Field for FNumber {
    type Out = f64;
    const WIDTH: usize = 1;
    fn read(bytes: &[u8]) -> f64 {
        f_number_from_raw(bytes[0])
    }
}

impl Field for ExposureTime {
    type Out = f64;
    const WIDTH: usize = 1;
    fn read(bytes: &[u8]) -> f64 {
        exposure_time_from_raw(bytes[0])
    }
}

impl Field for Iso {
    type Out = f64;
    const WIDTH: usize = 1;
    fn read(bytes: &[u8]) -> f64 {
        iso_from_raw(bytes[0])
    }
}

impl Field for Temperature {
    type Out = Option<i16>;
    const WIDTH: usize = 1;
    fn read(bytes: &[u8]) -> Option<i16> {
        temperature(bytes[0])
    }
}

impl Field for Byte {
    type Out = u8;
    const WIDTH: usize = 1;
    fn read(bytes: &[u8]) -> u8 {
        bytes[0]
    }
}

impl Field for U16Rev {
    type Out = u16;
    const WIDTH: usize = 2;
    fn read(bytes: &[u8]) -> u16 {
        u16::from_be_bytes([bytes[0], bytes[1]])
    }
}

impl Field for U16 {
    type Out = u16;
    const WIDTH: usize = 2;
    fn read(bytes: &[u8]) -> u16 {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }
}

impl Field for U32 {
    type Out = u32;
    const WIDTH: usize = 4;
    fn read(bytes: &[u8]) -> u32 {
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

impl Field for FocusDistance {
    type Out = f64;
    const WIDTH: usize = 2;
    fn read(bytes: &[u8]) -> f64 {
        U16Rev::read(bytes) as f64 / 100.0
    }
}

impl Field for FileIndex {
    type Out = u32;
    const WIDTH: usize = 4;
    fn read(bytes: &[u8]) -> u32 {
        U32::read(bytes).wrapping_add(1)
    }
}

impl Field for DirIndex {
    type Out = u32;
    const WIDTH: usize = 4;
    fn read(bytes: &[u8]) -> u32 {
        U32::read(bytes).wrapping_sub(1)
    }
}

impl<const N: usize> Field for Text<N> {
    type Out = String;
    const WIDTH: usize = N;
    fn read(bytes: &[u8]) -> String {
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        String::from_utf8_lossy(&bytes[..end]).trim().to_owned()
    }
}

const fn max_end(ends: &[usize]) -> usize {
    let mut i = 0;
    let mut max = 0;
    while i < ends.len() {
        if ends[i] > max {
            max = ends[i];
        }
        i += 1;
    }
    max
}

fn check_len(model: &'static str, data: &[u8], expected: usize) -> crate::Result<()> {
    if data.len() < expected {
        return Err(crate::Error::IncorrectLength {
            model,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

macro_rules! layout {
    (
        $(#[$doc:meta])*
        $name:ident = $label:literal {
            $( $field:ident: $kind:ty = $off:literal, )+
        }
    ) => {
        $(#[$doc])*
        #[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            $( pub $field: <$kind as Field>::Out, )+
        }

        impl $name {
            /// Smallest payload holding every field.
            pub const MIN_LEN: usize = max_end(&[$( $off + <$kind as Field>::WIDTH ),+]);

            pub fn decode(data: &[u8]) -> crate::Result<Self> {
                check_len($label, data, Self::MIN_LEN)?;
                Ok(Self {
                    $( $field: <$kind as Field>::read(&data[$off..$off + <$kind as Field>::WIDTH]), )+
                })
            }
        }
    };
}

layout! {
    CameraInfo1D = "EOS-1D" {
        exposure_time: ExposureTime = 0x04,
        focal_length: U16Rev = 0x0a,
        lens_type: Byte = 0x0d,
        min_focal_length: U16Rev = 0x0e,
        max_focal_length: U16Rev = 0x10,
        white_balance: U16 = 0x44,
        color_temperature: U16 = 0x48,
    }
}

layout! {
    CameraInfo1DMarkII = "EOS-1D Mark II" {
        exposure_time: ExposureTime = 0x04,
        focal_length: U16Rev = 0x09,
        lens_type: Byte = 0x0c,
        min_focal_length: U16Rev = 0x11,
        max_focal_length: U16Rev = 0x13,
        white_balance: Byte = 0x30,
        color_temperature: U16Rev = 0x31,
    }
}

layout! {
    CameraInfo1DMarkIIN = "EOS-1D Mark II N" {
        exposure_time: ExposureTime = 0x04,
        focal_length: U16Rev = 0x09,
        lens_type: Byte = 0x0c,
        min_focal_length: U16Rev = 0x11,
        max_focal_length: U16Rev = 0x13,
        picture_style: Byte = 0x74,
    }
}

layout! {
    CameraInfo1DMarkIII = "EOS-1D Mark III" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x18,
        focal_length: U16Rev = 0x1d,
        camera_orientation: Byte = 0x30,
        focus_distance_upper: FocusDistance = 0x43,
        focus_distance_lower: FocusDistance = 0x45,
        white_balance: U16 = 0x5e,
        color_temperature: U16 = 0x62,
        picture_style: Byte = 0x86,
        lens_type: U16Rev = 0x111,
        min_focal_length: U16Rev = 0x113,
        max_focal_length: U16Rev = 0x115,
        firmware_version: Text<6> = 0x136,
        file_index: FileIndex = 0x172,
        shutter_count: U32 = 0x176,
        directory_index: DirIndex = 0x17e,
    }
}

layout! {
    CameraInfo1DMarkIV = "EOS-1D Mark IV" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x19,
        focal_length: U16Rev = 0x1e,
        camera_orientation: Byte = 0x35,
        focus_distance_upper: FocusDistance = 0x54,
        focus_distance_lower: FocusDistance = 0x56,
        white_balance: U16 = 0x78,
        color_temperature: U16 = 0x7c,
        lens_type: U16Rev = 0x14f,
        min_focal_length: U16Rev = 0x151,
        max_focal_length: U16Rev = 0x153,
        firmware_version: Text<6> = 0x1ed,
        file_index: FileIndex = 0x22c,
    }
}

layout! {
    CameraInfo1DX = "EOS-1D X" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x1b,
        focal_length: U16Rev = 0x23,
        camera_orientation: Byte = 0x7d,
        focus_distance_upper: FocusDistance = 0x8c,
        focus_distance_lower: FocusDistance = 0x8e,
        white_balance: U16 = 0xbc,
        color_temperature: U16 = 0xc0,
        picture_style: Byte = 0xf4,
        lens_type: U16Rev = 0x1a7,
        min_focal_length: U16Rev = 0x1a9,
        max_focal_length: U16Rev = 0x1ab,
        firmware_version: Text<6> = 0x280,
    }
}

layout! {
    CameraInfo5D = "EOS 5D" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        lens_type: U16Rev = 0x0c,
        camera_temperature: Temperature = 0x17,
        camera_orientation: Byte = 0x27,
        focal_length: U16Rev = 0x28,
        white_balance: U16 = 0x54,
        color_temperature: U16 = 0x58,
        picture_style: Byte = 0x6c,
        min_focal_length: U16Rev = 0x93,
        max_focal_length: U16Rev = 0x95,
    }
}

layout! {
    CameraInfo5DMarkII = "EOS 5D Mark II" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x19,
        focal_length: U16Rev = 0x1e,
        camera_orientation: Byte = 0x31,
        focus_distance_upper: FocusDistance = 0x50,
        focus_distance_lower: FocusDistance = 0x52,
        white_balance: U16 = 0x6f,
        color_temperature: U16 = 0x73,
        picture_style: Byte = 0xa7,
        lens_type: U16Rev = 0xe6,
        min_focal_length: U16Rev = 0xe8,
        max_focal_length: U16Rev = 0xea,
    }
}

layout! {
    CameraInfo5DMarkIII = "EOS 5D Mark III" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x1b,
        focal_length: U16Rev = 0x23,
        camera_orientation: Byte = 0x7d,
        focus_distance_upper: FocusDistance = 0x8c,
        focus_distance_lower: FocusDistance = 0x8e,
        white_balance: U16 = 0xbc,
        color_temperature: U16 = 0xc0,
        picture_style: Byte = 0xf4,
        lens_type: U16Rev = 0x153,
        min_focal_length: U16Rev = 0x155,
        max_focal_length: U16Rev = 0x157,
        firmware_version: Text<6> = 0x23c,
        file_index: FileIndex = 0x28c,
    }
}

layout! {
    CameraInfo6D = "EOS 6D" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x1b,
        focal_length: U16Rev = 0x23,
        camera_orientation: Byte = 0x83,
        focus_distance_upper: FocusDistance = 0x92,
        focus_distance_lower: FocusDistance = 0x94,
        white_balance: U16 = 0xc2,
        color_temperature: U16 = 0xc6,
        picture_style: Byte = 0xfa,
        lens_type: U16Rev = 0x161,
        min_focal_length: U16Rev = 0x163,
        max_focal_length: U16Rev = 0x165,
        firmware_version: Text<6> = 0x256,
        file_index: FileIndex = 0x2aa,
    }
}

layout! {
    CameraInfo7D = "EOS 7D" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x19,
        focal_length: U16Rev = 0x1e,
        camera_orientation: Byte = 0x35,
        focus_distance_upper: FocusDistance = 0x54,
        focus_distance_lower: FocusDistance = 0x56,
        white_balance: U16 = 0x77,
        color_temperature: U16 = 0x7b,
        picture_style: Byte = 0xaf,
        lens_type: U16Rev = 0x112,
        min_focal_length: U16Rev = 0x114,
        max_focal_length: U16Rev = 0x116,
        firmware_version: Text<6> = 0x1ac,
        file_index: FileIndex = 0x1eb,
    }
}

layout! {
    CameraInfo40D = "EOS 40D" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x18,
        focal_length: U16Rev = 0x1d,
        camera_orientation: Byte = 0x30,
        focus_distance_upper: FocusDistance = 0x43,
        focus_distance_lower: FocusDistance = 0x45,
        white_balance: U16 = 0x6f,
        color_temperature: U16 = 0x73,
        lens_type: U16Rev = 0xd6,
        min_focal_length: U16Rev = 0xd8,
        max_focal_length: U16Rev = 0xda,
        firmware_version: Text<6> = 0xff,
        file_index: FileIndex = 0x133,
        directory_index: DirIndex = 0x13f,
        lens_model: Text<64> = 0x92b,
    }
}

layout! {
    CameraInfo50D = "EOS 50D" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x19,
        focal_length: U16Rev = 0x1e,
        camera_orientation: Byte = 0x31,
        focus_distance_upper: FocusDistance = 0x50,
        focus_distance_lower: FocusDistance = 0x52,
        white_balance: U16 = 0x6f,
        color_temperature: U16 = 0x73,
        picture_style: Byte = 0xa7,
        lens_type: U16Rev = 0xea,
        min_focal_length: U16Rev = 0xec,
        max_focal_length: U16Rev = 0xee,
        firmware_version: Text<6> = 0x15a,
        file_index: FileIndex = 0x17e,
    }
}

layout! {
    CameraInfo60D = "EOS 60D" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x19,
        focal_length: U16Rev = 0x1e,
        camera_orientation: Byte = 0x36,
        focus_distance_upper: FocusDistance = 0x55,
        focus_distance_lower: FocusDistance = 0x57,
        color_temperature: U16 = 0x7d,
        lens_type: U16Rev = 0xe8,
        min_focal_length: U16Rev = 0xea,
        max_focal_length: U16Rev = 0xec,
        firmware_version: Text<6> = 0x199,
        file_index: FileIndex = 0x1d9,
    }
}

layout! {
    CameraInfo70D = "EOS 70D" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x1b,
        focal_length: U16Rev = 0x23,
        camera_orientation: Byte = 0x84,
        focus_distance_upper: FocusDistance = 0x93,
        focus_distance_lower: FocusDistance = 0x95,
        white_balance: U16 = 0xc7,
        color_temperature: U16 = 0xcb,
        lens_type: U16Rev = 0x166,
        min_focal_length: U16Rev = 0x168,
        max_focal_length: U16Rev = 0x16a,
        firmware_version: Text<6> = 0x25e,
    }
}

layout! {
    CameraInfo80D = "EOS 80D" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x1b,
        focal_length: U16Rev = 0x23,
        camera_orientation: Byte = 0x96,
        focus_distance_upper: FocusDistance = 0xa5,
        focus_distance_lower: FocusDistance = 0xa7,
        white_balance: U16 = 0x13a,
        color_temperature: U16 = 0x13e,
        lens_type: U16Rev = 0x189,
        min_focal_length: U16Rev = 0x18b,
        max_focal_length: U16Rev = 0x18d,
        firmware_version: Text<6> = 0x45a,
    }
}

layout! {
    CameraInfo450D = "EOS 450D" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x18,
        focal_length: U16Rev = 0x1d,
        camera_orientation: Byte = 0x30,
        focus_distance_upper: FocusDistance = 0x43,
        focus_distance_lower: FocusDistance = 0x45,
        white_balance: U16 = 0x6f,
        color_temperature: U16 = 0x73,
        lens_type: U16Rev = 0xde,
        firmware_version: Text<6> = 0x107,
        owner_name: Text<32> = 0x10f,
        directory_index: DirIndex = 0x133,
        file_index: FileIndex = 0x13f,
        lens_model: Text<64> = 0x933,
    }
}

layout! {
    CameraInfo500D = "EOS 500D" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x19,
        focal_length: U16Rev = 0x1e,
        camera_orientation: Byte = 0x31,
        focus_distance_upper: FocusDistance = 0x50,
        focus_distance_lower: FocusDistance = 0x52,
        white_balance: U16 = 0x73,
        color_temperature: U16 = 0x77,
        picture_style: Byte = 0xab,
        lens_type: U16Rev = 0xf6,
        min_focal_length: U16Rev = 0xf8,
        max_focal_length: U16Rev = 0xfa,
        firmware_version: Text<6> = 0x190,
        file_index: FileIndex = 0x1d3,
    }
}

layout! {
    CameraInfo550D = "EOS 550D" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x19,
        focal_length: U16Rev = 0x1e,
        camera_orientation: Byte = 0x35,
        focus_distance_upper: FocusDistance = 0x54,
        focus_distance_lower: FocusDistance = 0x56,
        white_balance: U16 = 0x78,
        color_temperature: U16 = 0x7c,
        picture_style: Byte = 0xb0,
        lens_type: U16Rev = 0xff,
        min_focal_length: U16Rev = 0x101,
        max_focal_length: U16Rev = 0x103,
        firmware_version: Text<6> = 0x1a4,
        file_index: FileIndex = 0x1e4,
    }
}

layout! {
    CameraInfo600D = "EOS 600D" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x19,
        focal_length: U16Rev = 0x1e,
        camera_orientation: Byte = 0x38,
        focus_distance_upper: FocusDistance = 0x57,
        focus_distance_lower: FocusDistance = 0x59,
        white_balance: U16 = 0x7b,
        color_temperature: U16 = 0x7f,
        picture_style: Byte = 0xb3,
        lens_type: U16Rev = 0xea,
        min_focal_length: U16Rev = 0xec,
        max_focal_length: U16Rev = 0xee,
        firmware_version: Text<6> = 0x19b,
        file_index: FileIndex = 0x1db,
    }
}

layout! {
    CameraInfo650D = "EOS 650D" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x1b,
        focal_length: U16Rev = 0x23,
        camera_orientation: Byte = 0x7d,
        focus_distance_upper: FocusDistance = 0x8c,
        focus_distance_lower: FocusDistance = 0x8e,
        white_balance: U16 = 0xbc,
        color_temperature: U16 = 0xc0,
        picture_style: Byte = 0xf4,
        lens_type: U16Rev = 0x127,
        min_focal_length: U16Rev = 0x129,
        max_focal_length: U16Rev = 0x12b,
        firmware_version: Text<6> = 0x220,
        file_index: FileIndex = 0x270,
    }
}

layout! {
    /// Same offsets as the 650D so far; kept apart until a sample shows a
    /// difference.
    CameraInfo700D = "EOS 700D" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x1b,
        focal_length: U16Rev = 0x23,
        camera_orientation: Byte = 0x7d,
        focus_distance_upper: FocusDistance = 0x8c,
        focus_distance_lower: FocusDistance = 0x8e,
        white_balance: U16 = 0xbc,
        color_temperature: U16 = 0xc0,
        picture_style: Byte = 0xf4,
        lens_type: U16Rev = 0x127,
        min_focal_length: U16Rev = 0x129,
        max_focal_length: U16Rev = 0x12b,
        firmware_version: Text<6> = 0x220,
        file_index: FileIndex = 0x270,
    }
}

layout! {
    CameraInfo1000D = "EOS 1000D" {
        f_number: FNumber = 0x03,
        exposure_time: ExposureTime = 0x04,
        iso: Iso = 0x06,
        camera_temperature: Temperature = 0x18,
        focal_length: U16Rev = 0x1d,
        camera_orientation: Byte = 0x30,
        focus_distance_upper: FocusDistance = 0x43,
        focus_distance_lower: FocusDistance = 0x45,
        white_balance: U16 = 0x6f,
        color_temperature: U16 = 0x73,
        lens_type: U16Rev = 0xe2,
        min_focal_length: U16Rev = 0xe4,
        max_focal_length: U16Rev = 0xe6,
        firmware_version: Text<6> = 0x10b,
        directory_index: DirIndex = 0x137,
        file_index: FileIndex = 0x143,
        lens_model: Text<64> = 0x937,
    }
}

layout! {
    CameraInfoR6 = "EOS R6" {
        shutter_count: U32 = 0x0af1,
    }
}

layout! {
    CameraInfoR6MarkII = "EOS R6 Mark II" {
        shutter_count: U32 = 0x0d29,
    }
}

layout! {
    CameraInfoG5XMarkII = "PowerShot G5 X Mark II" {
        shutter_count: U32 = 0x0293,
    }
}

/// PowerShot CameraInfo, an array of signed 32-bit values.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CameraInfoPowerShot {
    pub iso: f64,
    pub f_number: f64,
    pub exposure_time: f64,
    pub rotation: i32,
    /// Only the second PowerShot layout records it.
    pub camera_temperature: Option<i32>,
}

struct PowerShotLayout {
    iso: usize,
    f_number: usize,
    exposure_time: usize,
    rotation: usize,
    temperature: Option<usize>,
}

const POWERSHOT: PowerShotLayout = PowerShotLayout {
    iso: 0,
    f_number: 5,
    exposure_time: 6,
    rotation: 0x17,
    temperature: None,
};

const POWERSHOT2: PowerShotLayout = PowerShotLayout {
    iso: 1,
    f_number: 6,
    exposure_time: 7,
    rotation: 0x18,
    temperature: Some(0x99),
};

impl CameraInfoPowerShot {
    fn decode(values: &[i32], layout: &PowerShotLayout) -> crate::Result<Self> {
        let needed = layout.temperature.unwrap_or(0).max(layout.rotation) + 1;
        if values.len() < needed {
            return Err(crate::Error::IncorrectLength {
                model: "PowerShot",
                expected: needed * 4,
                actual: values.len() * 4,
            });
        }
        let v = |i: usize| values[i] as f64;
        Ok(Self {
            iso: 100.0 * ((v(layout.iso) - 411.0) / 96.0 * std::f64::consts::LN_2).exp(),
            f_number: (v(layout.f_number) / 192.0 * std::f64::consts::LN_2).exp(),
            exposure_time: (-v(layout.exposure_time) / 96.0 * std::f64::consts::LN_2).exp(),
            rotation: values[layout.rotation],
            camera_temperature: layout.temperature.map(|i| values[i]),
        })
    }
}

/// A decoded CameraInfo record, one variant per layout.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum CameraInfo {
    Eos1D(CameraInfo1D),
    Eos1DMarkII(CameraInfo1DMarkII),
    Eos1DMarkIIN(CameraInfo1DMarkIIN),
    Eos1DMarkIII(CameraInfo1DMarkIII),
    Eos1DMarkIV(CameraInfo1DMarkIV),
    Eos1DX(CameraInfo1DX),
    Eos5D(CameraInfo5D),
    Eos5DMarkII(CameraInfo5DMarkII),
    Eos5DMarkIII(CameraInfo5DMarkIII),
    Eos6D(CameraInfo6D),
    Eos7D(CameraInfo7D),
    Eos40D(CameraInfo40D),
    Eos50D(CameraInfo50D),
    Eos60D(CameraInfo60D),
    Eos70D(CameraInfo70D),
    Eos80D(CameraInfo80D),
    Eos450D(CameraInfo450D),
    Eos500D(CameraInfo500D),
    Eos550D(CameraInfo550D),
    Eos600D(CameraInfo600D),
    Eos650D(CameraInfo650D),
    Eos700D(CameraInfo700D),
    Eos1000D(CameraInfo1000D),
    EosR6(CameraInfoR6),
    EosR6MarkII(CameraInfoR6MarkII),
    G5XMarkII(CameraInfoG5XMarkII),
    PowerShot(CameraInfoPowerShot),
    PowerShot2(CameraInfoPowerShot),
    /// No layout is known for this model id.
    NotDecoded(u32),
}

macro_rules! field_of {
    ($self:ident, $field:ident, $conv:expr, [$($variant:ident),+ $(,)?]) => {
        match $self {
            $( CameraInfo::$variant(c) => Some($conv(&c.$field)), )+
            _ => None,
        }
    };
}

impl CameraInfo {
    /// Decodes a CameraInfo payload. EOS layouts take the raw bytes,
    /// PowerShot layouts the i32 array.
    pub fn decode(model_id: u32, data: &[u8], values: &[i32]) -> crate::Result<CameraInfo> {
        let info = match model_id {
            EOS_1D | EOS_1DS => CameraInfo::Eos1D(CameraInfo1D::decode(data)?),
            EOS_1D_MARK_II | EOS_1DS_MARK_II => {
                CameraInfo::Eos1DMarkII(CameraInfo1DMarkII::decode(data)?)
            }
            EOS_1D_MARK_II_N => CameraInfo::Eos1DMarkIIN(CameraInfo1DMarkIIN::decode(data)?),
            EOS_1D_MARK_III | EOS_1DS_MARK_III => {
                CameraInfo::Eos1DMarkIII(CameraInfo1DMarkIII::decode(data)?)
            }
            EOS_1D_MARK_IV => CameraInfo::Eos1DMarkIV(CameraInfo1DMarkIV::decode(data)?),
            EOS_1D_X | EOS_1D_C => CameraInfo::Eos1DX(CameraInfo1DX::decode(data)?),
            EOS_5D => CameraInfo::Eos5D(CameraInfo5D::decode(data)?),
            EOS_5D_MARK_II => CameraInfo::Eos5DMarkII(CameraInfo5DMarkII::decode(data)?),
            EOS_5D_MARK_III => CameraInfo::Eos5DMarkIII(CameraInfo5DMarkIII::decode(data)?),
            EOS_6D => CameraInfo::Eos6D(CameraInfo6D::decode(data)?),
            EOS_7D => CameraInfo::Eos7D(CameraInfo7D::decode(data)?),
            EOS_40D => CameraInfo::Eos40D(CameraInfo40D::decode(data)?),
            EOS_50D => CameraInfo::Eos50D(CameraInfo50D::decode(data)?),
            EOS_60D => CameraInfo::Eos60D(CameraInfo60D::decode(data)?),
            EOS_70D => CameraInfo::Eos70D(CameraInfo70D::decode(data)?),
            EOS_80D => CameraInfo::Eos80D(CameraInfo80D::decode(data)?),
            EOS_450D => CameraInfo::Eos450D(CameraInfo450D::decode(data)?),
            EOS_500D => CameraInfo::Eos500D(CameraInfo500D::decode(data)?),
            EOS_550D => CameraInfo::Eos550D(CameraInfo550D::decode(data)?),
            EOS_600D | EOS_1100D => CameraInfo::Eos600D(CameraInfo600D::decode(data)?),
            EOS_650D => CameraInfo::Eos650D(CameraInfo650D::decode(data)?),
            EOS_700D => CameraInfo::Eos700D(CameraInfo700D::decode(data)?),
            EOS_1000D => CameraInfo::Eos1000D(CameraInfo1000D::decode(data)?),
            EOS_R6 => CameraInfo::EosR6(CameraInfoR6::decode(data)?),
            EOS_R6_MARK_II => CameraInfo::EosR6MarkII(CameraInfoR6MarkII::decode(data)?),
            POWERSHOT_G5_X_MARK_II => CameraInfo::G5XMarkII(CameraInfoG5XMarkII::decode(data)?),
            id if is_powershot(id) => match values.len() {
                138 | 148 => CameraInfo::PowerShot(CameraInfoPowerShot::decode(values, &POWERSHOT)?),
                156 | 162 | 167 | 171 | 264 => {
                    CameraInfo::PowerShot2(CameraInfoPowerShot::decode(values, &POWERSHOT2)?)
                }
                _ => CameraInfo::NotDecoded(id),
            },
            id => CameraInfo::NotDecoded(id),
        };
        Ok(info)
    }

    pub fn is_decoded(&self) -> bool {
        !matches!(self, CameraInfo::NotDecoded(_))
    }

    pub fn lens_type(&self) -> Option<u16> {
        field_of!(
            self,
            lens_type,
            |v: &u16| *v,
            [
                Eos1DMarkIII, Eos1DMarkIV, Eos1DX, Eos5D, Eos5DMarkII, Eos5DMarkIII, Eos6D, Eos7D,
                Eos40D, Eos50D, Eos60D, Eos70D, Eos80D, Eos450D, Eos500D, Eos550D, Eos600D,
                Eos650D, Eos700D, Eos1000D,
            ]
        )
        .or_else(|| {
            field_of!(self, lens_type, |v: &u8| *v as u16, [Eos1D, Eos1DMarkII, Eos1DMarkIIN])
        })
    }

    /// Focal range of the mounted lens in mm.
    pub fn focal_range(&self) -> Option<(u16, u16)> {
        macro_rules! range {
            ($($variant:ident),+) => {
                match self {
                    $( CameraInfo::$variant(c) => Some((c.min_focal_length, c.max_focal_length)), )+
                    _ => None,
                }
            };
        }
        range!(
            Eos1D, Eos1DMarkII, Eos1DMarkIIN, Eos1DMarkIII, Eos1DMarkIV, Eos1DX, Eos5D,
            Eos5DMarkII, Eos5DMarkIII, Eos6D, Eos7D, Eos40D, Eos50D, Eos60D, Eos70D, Eos80D,
            Eos500D, Eos550D, Eos600D, Eos650D, Eos700D, Eos1000D
        )
    }

    pub fn camera_temperature(&self) -> Option<i16> {
        field_of!(
            self,
            camera_temperature,
            |v: &Option<i16>| *v,
            [
                Eos1DMarkIII, Eos1DMarkIV, Eos1DX, Eos5D, Eos5DMarkII, Eos5DMarkIII, Eos6D, Eos7D,
                Eos40D, Eos50D, Eos60D, Eos70D, Eos80D, Eos450D, Eos500D, Eos550D, Eos600D,
                Eos650D, Eos700D, Eos1000D,
            ]
        )
        .flatten()
    }

    pub fn firmware_version(&self) -> Option<&str> {
        macro_rules! firmware {
            ($($variant:ident),+) => {
                match self {
                    $( CameraInfo::$variant(c) => Some(c.firmware_version.as_str()), )+
                    _ => None,
                }
            };
        }
        firmware!(
            Eos1DMarkIII, Eos1DMarkIV, Eos1DX, Eos5DMarkIII, Eos6D, Eos7D, Eos40D, Eos50D,
            Eos60D, Eos70D, Eos80D, Eos450D, Eos500D, Eos550D, Eos600D, Eos650D, Eos700D,
            Eos1000D
        )
    }

    pub fn shutter_count(&self) -> Option<u32> {
        field_of!(
            self,
            shutter_count,
            |v: &u32| *v,
            [Eos1DMarkIII, EosR6, EosR6MarkII, G5XMarkII]
        )
    }
}
