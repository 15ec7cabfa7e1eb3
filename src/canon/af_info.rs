//! AF point geometry from AFInfo2 (tag `0x0026`).

const POINTS_OFFSET: usize = 8;

/// Words per "in focus" or "selected" bitmap, by number of valid points.
const BITMAP_WORDS: &[(u16, usize)] = &[
    (7, 1),
    (9, 1),
    (11, 1),
    (19, 2),
    (31, 2),
    (45, 3),
    (61, 4),
    (65, 5),
    (1053, 66),
];

fn bitmap_words(valid_points: u16) -> Option<usize> {
    BITMAP_WORDS
        .iter()
        .find(|(n, _)| *n == valid_points)
        .map(|(_, words)| *words)
}

/// One AF point, in pixels from the top-left corner of the image.
#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AfRect {
    pub left: i32,
    pub top: i32,
    pub width: u16,
    pub height: u16,
}

#[cfg_attr(feature = "json_dump", derive(serde::Serialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AfInfo {
    pub area_mode: u16,
    pub num_points: u16,
    pub valid_points: u16,
    pub image_width: u16,
    pub image_height: u16,
    pub points: Vec<AfRect>,
    /// Indices into `points`.
    pub in_focus: Vec<usize>,
    pub selected: Vec<usize>,
}

impl AfInfo {
    /// Decodes the packed AFInfo2 array.
    ///
    /// The point arrays are centred on the image: x grows to the right and
    /// y grows upwards.
    pub fn decode(af: &[u16]) -> crate::Result<AfInfo> {
        if af.len() < POINTS_OFFSET {
            return Err(too_short(af, POINTS_OFFSET));
        }
        let valid_points = af[3];
        let words =
            bitmap_words(valid_points).ok_or(crate::Error::UnsupportedAfPoints(valid_points))?;
        let n = valid_points as usize;
        let bitmaps = POINTS_OFFSET + 4 * n;
        if af.len() < bitmaps + words {
            return Err(too_short(af, bitmaps + words));
        }

        let image_width = af[4];
        let image_height = af[5];
        let column = |i: usize| &af[POINTS_OFFSET + i * n..POINTS_OFFSET + (i + 1) * n];
        let (widths, heights, xs, ys) = (column(0), column(1), column(2), column(3));

        let points = (0..n)
            .map(|i| {
                let (w, h) = (widths[i], heights[i]);
                let x = xs[i] as i16 as i32;
                let y = ys[i] as i16 as i32;
                AfRect {
                    left: x + image_width as i32 / 2 - w as i32 / 2,
                    top: image_height as i32 / 2 - y - h as i32 / 2,
                    width: w,
                    height: h,
                }
            })
            .collect();

        let in_focus = bits(&af[bitmaps..bitmaps + words], n);
        // Older bodies stop after the in-focus bitmap.
        let selected = af
            .get(bitmaps + words..bitmaps + 2 * words)
            .map(|s| bits(s, n))
            .unwrap_or_default();

        Ok(AfInfo {
            area_mode: af[0],
            num_points: af[2],
            valid_points,
            image_width,
            image_height,
            points,
            in_focus,
            selected,
        })
    }
}

fn too_short(af: &[u16], needed_words: usize) -> crate::Error {
    crate::Error::NotEnoughData {
        offset: af.len() as u64 * 2,
        needed: (needed_words - af.len()) * 2,
    }
}

fn bits(words: &[u16], limit: usize) -> Vec<usize> {
    words
        .iter()
        .enumerate()
        .flat_map(|(w, word)| {
            (0..16u16)
                .filter(move |b| *word & (1u16 << *b) != 0)
                .map(move |b| w * 16 + b as usize)
        })
        .filter(|i| *i < limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn af_info(valid: u16, with_selected: bool) -> Vec<u16> {
        let n = valid as usize;
        let words = bitmap_words(valid).unwrap();
        let mut af = vec![1, 0, valid, valid, 6000, 4000, 0, 0];
        af.extend(std::iter::repeat(100).take(n));
        af.extend(std::iter::repeat(80).take(n));
        af.extend((0..n).map(|i| (i as i16 * 10 - 30) as u16));
        af.extend((0..n).map(|i| (20 - i as i16 * 5) as u16));
        let mut focus = vec![0u16; words];
        focus[0] = 0b101;
        af.extend(&focus);
        if with_selected {
            let mut selected = vec![0u16; words];
            selected[words - 1] = 0x8000;
            af.extend(&selected);
        }
        af
    }

    #[test_case(7)]
    #[test_case(9)]
    #[test_case(11)]
    #[test_case(19)]
    #[test_case(31)]
    #[test_case(45)]
    #[test_case(61)]
    #[test_case(65)]
    fn one_rect_per_valid_point(valid: u16) {
        let info = AfInfo::decode(&af_info(valid, false)).unwrap();
        assert_eq!(info.points.len(), valid as usize);
        assert_eq!(info.in_focus, vec![0, 2]);
        assert!(info.selected.is_empty());
    }

    #[test]
    fn geometry() {
        let info = AfInfo::decode(&af_info(9, true)).unwrap();
        assert_eq!(info.area_mode, 1);
        assert_eq!((info.image_width, info.image_height), (6000, 4000));
        // x = -30, y = 20
        assert_eq!(
            info.points[0],
            AfRect {
                left: -30 + 3000 - 50,
                top: 2000 - 20 - 40,
                width: 100,
                height: 80,
            }
        );
        // 0x8000 lands past the last of 9 points.
        assert!(info.selected.is_empty());
    }

    #[test]
    fn selected_bitmap() {
        let mut af = af_info(19, true);
        let len = af.len();
        af[len - 2] = 0b11;
        let info = AfInfo::decode(&af).unwrap();
        assert_eq!(info.selected, vec![0, 1]);
    }

    #[test]
    fn unsupported_count() {
        let mut af = af_info(9, false);
        af[3] = 10;
        assert!(matches!(
            AfInfo::decode(&af),
            Err(crate::Error::UnsupportedAfPoints(10))
        ));
    }

    #[test]
    fn truncated() {
        let af = af_info(31, false);
        assert!(matches!(
            AfInfo::decode(&af[..40]),
            Err(crate::Error::NotEnoughData { .. })
        ));
    }
}
