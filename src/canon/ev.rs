//! Canon's exposure encodings.
//!
//! Canon stores stops in 1/32 EV units, with the one-third and two-third
//! fractions written as the codes `0x0c` and `0x14`.

const EV_UNIT: f64 = 32.0;
const ONE_THIRD: i32 = 0x0c;
const TWO_THIRDS: i32 = 0x14;

/// Converts a raw Canon EV value into stops.
pub fn canon_ev(raw: i32) -> f64 {
    let sign = if raw < 0 { -1.0 } else { 1.0 };
    let abs = raw.unsigned_abs() as i64;
    let frac = abs & 0x1f;
    let whole = (abs - frac) as f64;
    let frac = match frac as i32 {
        ONE_THIRD => EV_UNIT / 3.0,
        TWO_THIRDS => 2.0 * EV_UNIT / 3.0,
        f => f as f64,
    };
    sign * (whole + frac) / EV_UNIT
}

/// Inverse of [`canon_ev`]. The value is rounded to the nearest third of
/// a stop; results outside the `i32` range saturate.
pub fn canon_ev_inv(ev: f64) -> i32 {
    let sign: i64 = if ev < 0.0 { -1 } else { 1 };
    // Float to int casts saturate, so huge inputs stay finite here.
    let thirds = (ev.abs() * 3.0).round() as i64;
    let frac = match thirds % 3 {
        1 => ONE_THIRD,
        2 => TWO_THIRDS,
        _ => 0,
    };
    let code = (thirds / 3)
        .saturating_mul(EV_UNIT as i64)
        .saturating_add(frac as i64)
        .saturating_mul(sign);
    code.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Aperture from a Canon EV value (`2^(ev/2)`).
pub fn aperture_from_ev(raw: i32) -> f64 {
    (canon_ev(raw) * std::f64::consts::LN_2 / 2.0).exp()
}

/// Exposure time in seconds from a Canon EV value (`2^-ev`).
pub fn exposure_time_from_ev(raw: i32) -> f64 {
    (-canon_ev(raw) * std::f64::consts::LN_2).exp()
}

/// F-number from the one-byte CameraInfo encoding.
pub fn f_number_from_raw(raw: u8) -> f64 {
    ((raw as f64 - 8.0) / 16.0 * std::f64::consts::LN_2).exp()
}

pub fn f_number_to_raw(f_number: f64) -> u8 {
    (8.0 + 16.0 * f_number.log2()).round().clamp(0.0, 255.0) as u8
}

/// ISO speed from the one-byte CameraInfo encoding.
pub fn iso_from_raw(raw: u8) -> f64 {
    100.0 * ((raw as f64 / 8.0 - 9.0) * std::f64::consts::LN_2).exp()
}

pub fn iso_to_raw(iso: f64) -> u8 {
    (8.0 * ((iso / 100.0).log2() + 9.0))
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Exposure time in seconds from the one-byte CameraInfo encoding.
pub fn exposure_time_from_raw(raw: u8) -> f64 {
    (4.0 * std::f64::consts::LN_2 * (1.0 - canon_ev(raw as i32 - 24))).exp()
}

/// Camera temperature in °C. Raw 0 means the value is unavailable.
pub fn temperature(raw: u8) -> Option<i16> {
    (raw != 0).then(|| raw as i16 - 128)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn ev_round_trip_in_thirds() {
        for k in -15..=15 {
            let ev = k as f64 / 3.0;
            let back = canon_ev(canon_ev_inv(ev));
            assert!((back - ev).abs() < 1e-6, "{ev} -> {back}");
        }
    }

    #[test_case(0.0, 0)]
    #[test_case(0.25, 0x0c; "quarter rounds to a third")]
    #[test_case(0.5, 0x14; "half rounds to two thirds")]
    #[test_case(0.1, 0; "tenth rounds down")]
    #[test_case(0.9, 0x20; "rounds up to the next stop")]
    #[test_case(-1.3, -0x2c)]
    #[test_case(2.0, 0x40)]
    #[test_case(1e12, i32::MAX; "huge")]
    #[test_case(-1e12, i32::MIN; "huge negative")]
    fn ev_inverse(ev: f64, raw: i32) {
        assert_eq!(canon_ev_inv(ev), raw);
    }

    #[test_case(0x0c, 1.0 / 3.0)]
    #[test_case(0x14, 2.0 / 3.0)]
    #[test_case(0x20, 1.0)]
    #[test_case(0x30, 1.5)]
    #[test_case(-0x2c, -(1.0 + 1.0 / 3.0))]
    fn ev_codes(raw: i32, ev: f64) {
        assert!((canon_ev(raw) - ev).abs() < 1e-9);
    }

    #[test]
    fn f_number_round_trip() {
        for f in [1.0, 1.4, 2.0, 2.8, 4.0, 5.6, 8.0, 11.0, 16.0, 22.0] {
            let back = f_number_from_raw(f_number_to_raw(f));
            assert!((back - f).abs() / f < 0.02, "{f} -> {back}");
        }
    }

    #[test_case(72, 100.0)]
    #[test_case(80, 200.0)]
    #[test_case(104, 1600.0)]
    fn iso(raw: u8, iso: f64) {
        assert!((iso_from_raw(raw) - iso).abs() < 1e-6);
        assert_eq!(iso_to_raw(iso), raw);
    }

    #[test]
    fn temperatures() {
        assert_eq!(temperature(0), None);
        assert_eq!(temperature(153), Some(25));
        assert_eq!(temperature(120), Some(-8));
    }

    #[test]
    fn aperture_and_time() {
        // f/8 is 6 EV, 1/250 s is about 8 EV.
        assert!((aperture_from_ev(6 * 32) - 8.0).abs() < 1e-9);
        assert!((exposure_time_from_ev(8 * 32) - 1.0 / 256.0).abs() < 1e-9);
    }
}
