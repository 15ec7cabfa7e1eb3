use super::{ev::aperture_from_ev, Words};

/// CameraSettings (tag `0x0001`), an array of signed shorts. Values are
/// kept raw unless noted; a missing index leaves the field empty.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraSettings {
    pub macro_mode: Option<i16>,
    /// Seconds.
    pub self_timer: Option<f64>,
    pub quality: Option<i16>,
    pub flash_mode: Option<i16>,
    pub continuous_drive: Option<i16>,
    pub focus_mode: Option<i16>,
    pub record_mode: Option<i16>,
    pub image_size: Option<i16>,
    pub easy_mode: Option<i16>,
    pub digital_zoom: Option<i16>,
    pub contrast: Option<i16>,
    pub saturation: Option<i16>,
    pub sharpness: Option<i16>,
    pub camera_iso: Option<i16>,
    pub metering_mode: Option<i16>,
    pub focus_range: Option<i16>,
    pub af_point: Option<i16>,
    pub exposure_mode: Option<i16>,
    pub lens_type: Option<u16>,
    pub max_focal_length: Option<u16>,
    pub min_focal_length: Option<u16>,
    pub focal_units: Option<u16>,
    pub max_aperture: Option<f64>,
    pub min_aperture: Option<f64>,
    pub flash_activity: Option<i16>,
    pub flash_bits: Option<u16>,
    pub focus_continuous: Option<i16>,
    pub ae_setting: Option<i16>,
    pub image_stabilization: Option<i16>,
    pub display_aperture: Option<f64>,
    pub zoom_source_width: Option<i16>,
    pub zoom_target_width: Option<i16>,
    pub spot_metering_mode: Option<i16>,
    pub photo_effect: Option<i16>,
    pub manual_flash_output: Option<i16>,
    pub color_tone: Option<i16>,
    pub sraw_quality: Option<i16>,
}

impl CameraSettings {
    pub(crate) fn decode(w: Words) -> CameraSettings {
        CameraSettings {
            macro_mode: w.i16(1),
            self_timer: w.i16(2).map(|v| (v as u16 & 0x0fff) as f64 / 10.0),
            quality: w.i16(3),
            flash_mode: w.i16(4),
            continuous_drive: w.i16(5),
            focus_mode: w.i16(7),
            record_mode: w.i16(9),
            image_size: w.i16(10),
            easy_mode: w.i16(11),
            digital_zoom: w.i16(12),
            contrast: w.i16(13),
            saturation: w.i16(14),
            sharpness: w.i16(15),
            camera_iso: w.i16(16),
            metering_mode: w.i16(17),
            focus_range: w.i16(18),
            af_point: w.i16(19),
            exposure_mode: w.i16(20),
            lens_type: w.u16(22),
            max_focal_length: w.u16(23),
            min_focal_length: w.u16(24),
            focal_units: w.u16(25),
            max_aperture: w.i16(26).map(|v| aperture_from_ev(v as i32)),
            min_aperture: w.i16(27).map(|v| aperture_from_ev(v as i32)),
            flash_activity: w.i16(28),
            flash_bits: w.u16(29),
            focus_continuous: w.i16(32),
            ae_setting: w.i16(33),
            image_stabilization: w.i16(34),
            display_aperture: w.i16(35).filter(|v| *v != 0).map(|v| v as f64 / 10.0),
            zoom_source_width: w.i16(36),
            zoom_target_width: w.i16(37),
            spot_metering_mode: w.i16(39),
            photo_effect: w.i16(40),
            manual_flash_output: w.i16(41),
            color_tone: w.i16(42),
            sraw_quality: w.i16(46),
        }
    }

    /// Focal range of the lens in mm, scaled by `FocalUnits`.
    pub fn focal_range(&self) -> Option<(f64, f64)> {
        let units = match self.focal_units {
            Some(0) | None => 1.0,
            Some(u) => u as f64,
        };
        let short = self.min_focal_length? as f64 / units;
        let long = self.max_focal_length? as f64 / units;
        Some((short, long))
    }

    /// `LensType` as written by the body; 0 and 0xffff mean unknown.
    pub fn known_lens_type(&self) -> Option<u16> {
        self.lens_type.filter(|v| *v != 0 && *v != 0xffff)
    }
}
