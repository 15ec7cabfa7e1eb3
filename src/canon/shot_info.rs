use super::{
    ev::{aperture_from_ev, canon_ev, exposure_time_from_ev},
    Words,
};

/// ShotInfo (tag `0x0004`): exposure state at capture time.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShotInfo {
    pub auto_iso: Option<f64>,
    pub base_iso: Option<f64>,
    pub measured_ev: Option<f64>,
    pub target_aperture: Option<f64>,
    /// Seconds.
    pub target_exposure_time: Option<f64>,
    /// Stops.
    pub exposure_compensation: Option<f64>,
    pub white_balance: Option<i16>,
    pub slow_shutter: Option<i16>,
    pub sequence_number: Option<i16>,
    pub optical_zoom_code: Option<i16>,
    /// °C.
    pub camera_temperature: Option<i16>,
    pub flash_guide_number: Option<f64>,
    pub af_points_in_focus: Option<u16>,
    pub flash_exposure_comp: Option<f64>,
    pub auto_exposure_bracketing: Option<i16>,
    pub aeb_bracket_value: Option<f64>,
    pub control_mode: Option<i16>,
    /// Metres.
    pub focus_distance_upper: Option<f64>,
    pub focus_distance_lower: Option<f64>,
    pub f_number: Option<f64>,
    pub exposure_time: Option<f64>,
    pub measured_ev2: Option<f64>,
    pub bulb_duration: Option<i16>,
    pub camera_type: Option<i16>,
    pub auto_rotate: Option<i16>,
    pub nd_filter: Option<i16>,
    /// Seconds.
    pub self_timer2: Option<f64>,
    pub flash_output: Option<i16>,
}

fn nonzero(v: Option<i16>) -> Option<i32> {
    v.filter(|v| *v != 0).map(|v| v as i32)
}

impl ShotInfo {
    pub(crate) fn decode(w: Words) -> ShotInfo {
        let ln2 = std::f64::consts::LN_2;
        ShotInfo {
            auto_iso: w.i16(1).map(|v| (v as f64 / 32.0 * ln2).exp() * 100.0),
            base_iso: nonzero(w.i16(2)).map(|v| (canon_ev(v) * ln2).exp() * 100.0 / 32.0),
            measured_ev: w.i16(3).map(|v| v as f64 / 32.0 + 5.0),
            target_aperture: nonzero(w.i16(4)).map(aperture_from_ev),
            target_exposure_time: nonzero(w.i16(5)).map(exposure_time_from_ev),
            exposure_compensation: w.i16(6).map(|v| canon_ev(v as i32)),
            white_balance: w.i16(7),
            slow_shutter: w.i16(8),
            sequence_number: w.i16(9),
            optical_zoom_code: w.i16(10),
            camera_temperature: w.i16(12).filter(|v| *v != 0).map(|v| v - 128),
            flash_guide_number: w.i16(13).map(|v| v as f64 / 32.0),
            af_points_in_focus: w.u16(14),
            flash_exposure_comp: w.i16(15).map(|v| canon_ev(v as i32)),
            auto_exposure_bracketing: w.i16(16),
            aeb_bracket_value: w.i16(17).map(|v| canon_ev(v as i32)),
            control_mode: w.i16(18),
            focus_distance_upper: w.u16(19).map(|v| v as f64 / 100.0),
            focus_distance_lower: w.u16(20).map(|v| v as f64 / 100.0),
            f_number: nonzero(w.i16(21)).map(aperture_from_ev),
            exposure_time: nonzero(w.i16(22)).map(exposure_time_from_ev),
            measured_ev2: w.i16(23).map(|v| v as f64 / 8.0 - 6.0),
            bulb_duration: w.i16(24),
            camera_type: w.i16(26),
            auto_rotate: w.i16(27),
            nd_filter: w.i16(28),
            self_timer2: w.i16(29).map(|v| v as f64 / 10.0),
            flash_output: w.i16(33),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn with(index: usize, value: i64) -> ShotInfo {
        let mut raw = vec![0i64; 34];
        raw[index] = value;
        ShotInfo::decode(Words(&raw))
    }

    #[test]
    fn iso() {
        assert!((with(1, 64).auto_iso.unwrap() - 400.0).abs() < 1e-9);
        // 2^(5 + 1/3) * 100 / 32
        let base = with(2, 0xac).base_iso.unwrap();
        assert!((base - 125.99).abs() < 0.01);
    }

    #[test_case(6, 0x0c, 1.0 / 3.0)]
    #[test_case(6, -0x14i64, -2.0 / 3.0)]
    #[test_case(15, 0x20, 1.0)]
    fn compensation(index: usize, raw: i64, ev: f64) {
        let s = with(index, raw);
        let got = match index {
            6 => s.exposure_compensation,
            _ => s.flash_exposure_comp,
        };
        let got = got.unwrap();
        assert!((got - ev).abs() < 1e-9);
    }

    #[test]
    fn exposure() {
        let s = with(21, 0x60);
        assert!((s.f_number.unwrap() - 2.828).abs() < 0.001);
        let s = with(22, 0x100);
        assert!((s.exposure_time.unwrap() - 1.0 / 256.0).abs() < 1e-9);
        assert_eq!(with(21, 0).f_number, None);
    }

    #[test]
    fn temperature_and_distance() {
        assert_eq!(with(12, 0).camera_temperature, None);
        assert_eq!(with(12, 150).camera_temperature, Some(22));
        assert_eq!(with(19, 250).focus_distance_upper, Some(2.5));
        assert_eq!(with(19, 0xffff).focus_distance_upper, Some(655.35));
    }

    #[test]
    fn measured_ev() {
        assert_eq!(with(3, 96).measured_ev, Some(8.0));
        assert_eq!(with(23, 104).measured_ev2, Some(7.0));
    }
}
