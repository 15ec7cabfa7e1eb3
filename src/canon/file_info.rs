use super::Words;

/// FileInfo (tag `0x0093`).
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileInfo {
    pub file_number: Option<u32>,
    pub bracket_mode: Option<i16>,
    pub bracket_value: Option<i16>,
    pub bracket_shot_number: Option<i16>,
    pub raw_jpg_quality: Option<i16>,
    pub raw_jpg_size: Option<i16>,
    pub long_exposure_noise_reduction2: Option<i16>,
    pub wb_bracket_mode: Option<i16>,
    pub wb_bracket_value_ab: Option<i16>,
    pub wb_bracket_value_gm: Option<i16>,
    pub filter_effect: Option<i16>,
    pub toning_effect: Option<i16>,
    pub macro_magnification: Option<i16>,
    pub live_view_shooting: Option<i16>,
    /// Metres.
    pub focus_distance_upper: Option<f64>,
    pub focus_distance_lower: Option<f64>,
    pub flash_exposure_lock: Option<i16>,
    /// Real lens id of RF lenses, see [`super::lens::rf_lens_name`].
    pub rf_lens_type: Option<u16>,
}

impl FileInfo {
    pub(crate) fn decode(w: Words) -> FileInfo {
        // A 32-bit value spread over words 1 and 2, low word first.
        let file_number = match (w.u16(1), w.u16(2)) {
            (Some(lo), Some(hi)) => Some((hi as u32) << 16 | lo as u32),
            _ => None,
        };
        FileInfo {
            file_number,
            bracket_mode: w.i16(3),
            bracket_value: w.i16(4),
            bracket_shot_number: w.i16(5),
            raw_jpg_quality: w.i16(6),
            raw_jpg_size: w.i16(7),
            long_exposure_noise_reduction2: w.i16(8),
            wb_bracket_mode: w.i16(9),
            wb_bracket_value_ab: w.i16(12),
            wb_bracket_value_gm: w.i16(13),
            filter_effect: w.i16(14),
            toning_effect: w.i16(15),
            macro_magnification: w.i16(16),
            live_view_shooting: w.i16(19),
            focus_distance_upper: w.u16(20).map(|v| v as f64 / 100.0),
            focus_distance_lower: w.u16(21).map(|v| v as f64 / 100.0),
            flash_exposure_lock: w.i16(25),
            rf_lens_type: w.u16(0x3d).filter(|v| *v != 0),
        }
    }
}
