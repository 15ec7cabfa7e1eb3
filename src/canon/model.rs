//! Canon `ModelID` (maker-note tag `0x0010`) registry.

use std::{collections::HashMap, sync::LazyLock};

pub const EOS_1D: u32 = 0x80000001;
pub const EOS_1DS: u32 = 0x80000167;
pub const EOS_1D_MARK_III: u32 = 0x80000169;
pub const EOS_1D_MARK_II: u32 = 0x80000174;
pub const EOS_450D: u32 = 0x80000176;
pub const EOS_1DS_MARK_II: u32 = 0x80000188;
pub const EOS_40D: u32 = 0x80000190;
pub const EOS_5D: u32 = 0x80000213;
pub const EOS_1DS_MARK_III: u32 = 0x80000215;
pub const EOS_5D_MARK_II: u32 = 0x80000218;
pub const EOS_1D_MARK_II_N: u32 = 0x80000232;
pub const EOS_7D: u32 = 0x80000250;
pub const EOS_500D: u32 = 0x80000252;
pub const EOS_1000D: u32 = 0x80000254;
pub const EOS_50D: u32 = 0x80000261;
pub const EOS_1D_X: u32 = 0x80000269;
pub const EOS_550D: u32 = 0x80000270;
pub const EOS_1D_MARK_IV: u32 = 0x80000281;
pub const EOS_5D_MARK_III: u32 = 0x80000285;
pub const EOS_600D: u32 = 0x80000286;
pub const EOS_60D: u32 = 0x80000287;
pub const EOS_1100D: u32 = 0x80000288;
pub const EOS_650D: u32 = 0x80000301;
pub const EOS_6D: u32 = 0x80000302;
pub const EOS_1D_C: u32 = 0x80000324;
pub const EOS_70D: u32 = 0x80000325;
pub const EOS_700D: u32 = 0x80000326;
pub const EOS_760D: u32 = 0x80000347;
pub const EOS_80D: u32 = 0x80000350;
pub const EOS_750D: u32 = 0x80000393;
pub const EOS_R6: u32 = 0x80000453;
pub const EOS_R6_MARK_II: u32 = 0x80000481;
/// The M50 reports a short id instead of the `0x80000xxx` form of the
/// other EOS bodies.
pub const EOS_M50: u32 = 0x412;
pub const POWERSHOT_G5_X_MARK_II: u32 = 0x804;

const EOS_D30: u32 = 0x1140000;
const EOS_D60: u32 = 0x1668000;

static MODELS: &[(u32, &str)] = &[
    (0x1010000, "PowerShot A30"),
    (0x1040000, "PowerShot S300 / Digital IXUS 300 / IXY Digital 300"),
    (0x1060000, "PowerShot A20"),
    (0x1080000, "PowerShot A10"),
    (0x1090000, "PowerShot S110 / Digital IXUS v / IXY Digital 200"),
    (0x1100000, "PowerShot G2"),
    (0x1110000, "PowerShot S40"),
    (0x1120000, "PowerShot S30"),
    (0x1130000, "PowerShot A40"),
    (EOS_D30, "EOS D30"),
    (0x1150000, "PowerShot A100"),
    (0x1160000, "PowerShot S200 / Digital IXUS v2 / IXY Digital 200a"),
    (0x1170000, "PowerShot A200"),
    (0x1180000, "PowerShot S330 / Digital IXUS 330 / IXY Digital 300a"),
    (0x1190000, "PowerShot G3"),
    (0x1210000, "PowerShot S45"),
    (0x1230000, "PowerShot SD100 / Digital IXUS II / IXY Digital 30"),
    (0x1240000, "PowerShot S230 / Digital IXUS v3 / IXY Digital 320"),
    (0x1250000, "PowerShot A70"),
    (0x1260000, "PowerShot A60"),
    (0x1270000, "PowerShot S400 / Digital IXUS 400 / IXY Digital 400"),
    (0x1290000, "PowerShot G5"),
    (0x1300000, "PowerShot A300"),
    (0x1310000, "PowerShot S50"),
    (0x1340000, "PowerShot A80"),
    (0x1350000, "PowerShot SD10 / Digital IXUS i / IXY Digital L"),
    (0x1360000, "PowerShot S1 IS"),
    (0x1370000, "PowerShot Pro1"),
    (0x1380000, "PowerShot S70"),
    (0x1390000, "PowerShot S60"),
    (0x1400000, "PowerShot G6"),
    (0x1410000, "PowerShot S500 / Digital IXUS 500 / IXY Digital 500"),
    (0x1420000, "PowerShot A75"),
    (0x1440000, "PowerShot SD110 / Digital IXUS IIs / IXY Digital 30a"),
    (0x1450000, "PowerShot A400"),
    (0x1470000, "PowerShot A310"),
    (0x1490000, "PowerShot A85"),
    (0x1520000, "PowerShot S410 / Digital IXUS 430 / IXY Digital 450"),
    (0x1530000, "PowerShot A95"),
    (0x1540000, "PowerShot SD300 / Digital IXUS 40 / IXY Digital 50"),
    (0x1550000, "PowerShot SD200 / Digital IXUS 30 / IXY Digital 40"),
    (0x1560000, "PowerShot A520"),
    (0x1570000, "PowerShot A510"),
    (0x1590000, "PowerShot SD20 / Digital IXUS i5 / IXY Digital L2"),
    (0x1640000, "PowerShot S2 IS"),
    (0x1650000, "PowerShot SD430 / Digital IXUS Wireless / IXY Digital Wireless"),
    (0x1660000, "PowerShot SD500 / Digital IXUS 700 / IXY Digital 600"),
    (EOS_D60, "EOS D60"),
    (0x1700000, "PowerShot SD30 / Digital IXUS i Zoom / IXY Digital L3"),
    (0x1740000, "PowerShot A430"),
    (0x1750000, "PowerShot A410"),
    (0x1760000, "PowerShot S80"),
    (0x1780000, "PowerShot A620"),
    (0x1790000, "PowerShot A610"),
    (0x1800000, "PowerShot SD630 / Digital IXUS 65 / IXY Digital 80"),
    (0x1810000, "PowerShot SD450 / Digital IXUS 55 / IXY Digital 60"),
    (0x1820000, "PowerShot TX1"),
    (0x1870000, "PowerShot SD400 / Digital IXUS 50 / IXY Digital 55"),
    (0x1880000, "PowerShot A420"),
    (0x1890000, "PowerShot SD900 / Digital IXUS 900 Ti / IXY Digital 1000"),
    (0x1900000, "PowerShot SD550 / Digital IXUS 750 / IXY Digital 700"),
    (0x1920000, "PowerShot A700"),
    (0x1940000, "PowerShot SD700 IS / Digital IXUS 800 IS / IXY Digital 800 IS"),
    (0x1950000, "PowerShot S3 IS"),
    (0x1960000, "PowerShot A540"),
    (0x1970000, "PowerShot SD600 / Digital IXUS 60 / IXY Digital 70"),
    (0x1980000, "PowerShot G7"),
    (0x1990000, "PowerShot A530"),
    (0x2000000, "PowerShot SD800 IS / Digital IXUS 850 IS / IXY Digital 900 IS"),
    (0x2010000, "PowerShot SD40 / Digital IXUS i7 / IXY Digital L4"),
    (0x2020000, "PowerShot A710 IS"),
    (0x2030000, "PowerShot A640"),
    (0x2040000, "PowerShot A630"),
    (0x2090000, "PowerShot S5 IS"),
    (0x2100000, "PowerShot A460"),
    (0x2120000, "PowerShot SD850 IS / Digital IXUS 950 IS / IXY Digital 810 IS"),
    (0x2130000, "PowerShot A570 IS"),
    (0x2140000, "PowerShot A560"),
    (0x2150000, "PowerShot SD750 / Digital IXUS 75 / IXY Digital 90"),
    (0x2160000, "PowerShot SD1000 / Digital IXUS 70 / IXY Digital 10"),
    (0x2180000, "PowerShot A550"),
    (0x2190000, "PowerShot A450"),
    (0x2230000, "PowerShot G9"),
    (0x2240000, "PowerShot A650 IS"),
    (0x2260000, "PowerShot A720 IS"),
    (0x2290000, "PowerShot SX100 IS"),
    (0x2300000, "PowerShot SD950 IS / Digital IXUS 960 IS / IXY Digital 2000 IS"),
    (0x2310000, "PowerShot SD870 IS / Digital IXUS 860 IS / IXY Digital 910 IS"),
    (0x2320000, "PowerShot SD890 IS / Digital IXUS 970 IS / IXY Digital 820 IS"),
    (0x2360000, "PowerShot SD790 IS / Digital IXUS 90 IS / IXY Digital 95 IS"),
    (0x2370000, "PowerShot SD770 IS / Digital IXUS 85 IS / IXY Digital 25 IS"),
    (0x2380000, "PowerShot A590 IS"),
    (0x2390000, "PowerShot A580"),
    (0x2420000, "PowerShot A470"),
    (0x2430000, "PowerShot SD1100 IS / Digital IXUS 80 IS / IXY Digital 20 IS"),
    (0x2460000, "PowerShot SX1 IS"),
    (0x2470000, "PowerShot SX10 IS"),
    (0x2480000, "PowerShot A1000 IS"),
    (0x2490000, "PowerShot G10"),
    (0x2510000, "PowerShot A2000 IS"),
    (0x2520000, "PowerShot SX110 IS"),
    (0x2530000, "PowerShot SD990 IS / Digital IXUS 980 IS / IXY Digital 3000 IS"),
    (0x2540000, "PowerShot SD880 IS / Digital IXUS 870 IS / IXY Digital 920 IS"),
    (0x2550000, "PowerShot E1"),
    (0x2560000, "PowerShot D10"),
    (0x2570000, "PowerShot SD960 IS / Digital IXUS 110 IS / IXY Digital 510 IS"),
    (0x2580000, "PowerShot A2100 IS"),
    (0x2590000, "PowerShot A480"),
    (0x2600000, "PowerShot SX200 IS"),
    (0x2610000, "PowerShot SD970 IS / Digital IXUS 990 IS / IXY Digital 830 IS"),
    (0x2620000, "PowerShot SD780 IS / Digital IXUS 100 IS / IXY Digital 210 IS"),
    (0x2630000, "PowerShot A1100 IS"),
    (0x2640000, "PowerShot SD1200 IS / Digital IXUS 95 IS / IXY Digital 110 IS"),
    (0x2700000, "PowerShot G11"),
    (0x2710000, "PowerShot SX120 IS"),
    (0x2720000, "PowerShot S90"),
    (0x2750000, "PowerShot SX20 IS"),
    (0x2760000, "PowerShot SD980 IS / Digital IXUS 200 IS / IXY Digital 930 IS"),
    (0x2770000, "PowerShot SD940 IS / Digital IXUS 120 IS / IXY Digital 220 IS"),
    (0x2800000, "PowerShot A495"),
    (0x2810000, "PowerShot A490"),
    (0x2820000, "PowerShot A3100 IS / A3150 IS"),
    (0x2830000, "PowerShot A3000 IS"),
    (0x2840000, "PowerShot SD1400 IS / IXUS 130 / IXY 400F"),
    (0x2850000, "PowerShot SD1300 IS / IXUS 105 / IXY 200F"),
    (0x2860000, "PowerShot SD3500 IS / IXUS 210 / IXY 10S"),
    (0x2870000, "PowerShot SX210 IS"),
    (0x2880000, "PowerShot SD4000 IS / IXUS 300 HS / IXY 30S"),
    (0x2890000, "PowerShot SD4500 IS / IXUS 1000 HS / IXY 50S"),
    (0x2920000, "PowerShot G12"),
    (0x2930000, "PowerShot SX30 IS"),
    (0x2940000, "PowerShot SX130 IS"),
    (0x2950000, "PowerShot S95"),
    (0x2980000, "PowerShot A3300 IS"),
    (0x2990000, "PowerShot A3200 IS"),
    (0x3000000, "PowerShot ELPH 500 HS / IXUS 310 HS / IXY 31S"),
    (0x3010000, "PowerShot Pro90 IS"),
    (0x3010001, "PowerShot A800"),
    (0x3020000, "PowerShot ELPH 100 HS / IXUS 115 HS / IXY 210F"),
    (0x3030000, "PowerShot SX230 HS"),
    (0x3040000, "PowerShot ELPH 300 HS / IXUS 220 HS / IXY 410F"),
    (0x3050000, "PowerShot A2200"),
    (0x3060000, "PowerShot A1200"),
    (0x3070000, "PowerShot SX220 HS"),
    (0x3080000, "PowerShot G1 X"),
    (0x3090000, "PowerShot SX150 IS"),
    (0x3100000, "PowerShot ELPH 510 HS / IXUS 1100 HS / IXY 51S"),
    (0x3110000, "PowerShot S100 (new)"),
    (0x3120000, "PowerShot ELPH 310 HS / IXUS 230 HS / IXY 600F"),
    (0x3130000, "PowerShot SX40 HS"),
    (0x3160000, "PowerShot A1300"),
    (0x3170000, "PowerShot A810"),
    (0x3180000, "PowerShot ELPH 320 HS / IXUS 240 HS / IXY 420F"),
    (0x3190000, "PowerShot ELPH 110 HS / IXUS 125 HS / IXY 220F"),
    (0x3200000, "PowerShot D20"),
    (0x3210000, "PowerShot A4000 IS"),
    (0x3220000, "PowerShot SX260 HS"),
    (0x3230000, "PowerShot SX240 HS"),
    (0x3240000, "PowerShot ELPH 530 HS / IXUS 510 HS / IXY 1"),
    (0x3250000, "PowerShot ELPH 520 HS / IXUS 500 HS / IXY 3"),
    (0x3260000, "PowerShot A3400 IS"),
    (0x3270000, "PowerShot A2400 IS"),
    (0x3280000, "PowerShot A2300"),
    (0x3330000, "PowerShot G15"),
    (0x3340000, "PowerShot SX50 HS"),
    (0x3350000, "PowerShot SX160 IS"),
    (0x3360000, "PowerShot S110 (new)"),
    (0x3370000, "PowerShot SX500 IS"),
    (0x3380000, "PowerShot N"),
    (0x3390000, "IXUS 245 HS / IXY 430F"),
    (0x3400000, "PowerShot SX280 HS"),
    (0x3410000, "PowerShot SX270 HS"),
    (0x3420000, "PowerShot A3500 IS"),
    (0x3430000, "PowerShot A2600"),
    (0x3440000, "PowerShot SX275 HS"),
    (0x3450000, "PowerShot A1400"),
    (0x3460000, "PowerShot ELPH 130 IS / IXUS 140 / IXY 110F"),
    (0x3470000, "PowerShot ELPH 115/120 IS / IXUS 132/135 / IXY 90F/100F"),
    (0x3490000, "PowerShot ELPH 330 HS / IXUS 255 HS / IXY 610F"),
    (0x3510000, "PowerShot A2500"),
    (0x3540000, "PowerShot G16"),
    (0x3550000, "PowerShot S120"),
    (0x3560000, "PowerShot SX170 IS"),
    (0x3580000, "PowerShot SX510 HS"),
    (0x3590000, "PowerShot S200 (new)"),
    (0x3600000, "IXY 620F"),
    (0x3610000, "PowerShot N100"),
    (0x3640000, "PowerShot G1 X Mark II"),
    (0x3650000, "PowerShot D30"),
    (0x3660000, "PowerShot SX700 HS"),
    (0x3670000, "PowerShot SX600 HS"),
    (0x3680000, "PowerShot ELPH 140 IS / IXUS 150 / IXY 130"),
    (0x3690000, "PowerShot ELPH 135 / IXUS 145 / IXY 120"),
    (0x3700000, "PowerShot ELPH 340 HS / IXUS 265 HS / IXY 630"),
    (0x3710000, "PowerShot ELPH 150 IS / IXUS 155 / IXY 140"),
    (0x3740000, "EOS M3"),
    (0x3750000, "PowerShot SX60 HS"),
    (0x3760000, "PowerShot SX520 HS"),
    (0x3770000, "PowerShot SX400 IS"),
    (0x3780000, "PowerShot G7 X"),
    (0x3790000, "PowerShot N2"),
    (0x3800000, "PowerShot SX530 HS"),
    (0x3820000, "PowerShot SX710 HS"),
    (0x3830000, "PowerShot SX610 HS"),
    (0x3840000, "EOS M10"),
    (0x3850000, "PowerShot G3 X"),
    (0x3860000, "PowerShot ELPH 165 HS / IXUS 165 / IXY 160"),
    (0x3870000, "PowerShot ELPH 160 / IXUS 160"),
    (0x3880000, "PowerShot ELPH 350 HS / IXUS 275 HS / IXY 640"),
    (0x3890000, "PowerShot ELPH 170 IS / IXUS 170"),
    (0x3910000, "PowerShot SX410 IS"),
    (0x3930000, "PowerShot G9 X"),
    (0x3940000, "EOS M5"),
    (0x3950000, "PowerShot G5 X"),
    (0x3970000, "PowerShot G7 X Mark II"),
    (0x3980000, "EOS M100"),
    (0x3990000, "PowerShot ELPH 360 HS / IXUS 285 HS / IXY 650"),
    (0x4010000, "PowerShot SX540 HS"),
    (0x4020000, "PowerShot SX420 IS"),
    (0x4030000, "PowerShot ELPH 190 IS / IXUS 180 / IXY 190"),
    (0x4040000, "PowerShot G1"),
    (0x4040001, "PowerShot ELPH 180 IS / IXUS 175 / IXY 180"),
    (0x4050000, "PowerShot SX720 HS"),
    (0x4060000, "PowerShot SX620 HS"),
    (0x4070000, "EOS M6"),
    (0x4100000, "PowerShot G9 X Mark II"),
    (0x4150000, "PowerShot ELPH 185 / IXUS 185 / IXY 200"),
    (0x4160000, "PowerShot SX430 IS"),
    (0x4170000, "PowerShot SX730 HS"),
    (0x4180000, "PowerShot G1 X Mark III"),
    (0x6040000, "PowerShot S100 / Digital IXUS / IXY Digital"),
    (EOS_M50, "EOS M50 / Kiss M"),
    (0x801, "PowerShot SX740 HS"),
    (POWERSHOT_G5_X_MARK_II, "PowerShot G5 X Mark II"),
    (0x805, "PowerShot SX70 HS"),
    (0x808, "PowerShot G7 X Mark III"),
    (0x811, "EOS M6 Mark II"),
    (0x812, "EOS M200"),
    (EOS_1D, "EOS-1D"),
    (EOS_1DS, "EOS-1DS"),
    (0x80000168, "EOS 10D"),
    (EOS_1D_MARK_III, "EOS-1D Mark III"),
    (0x80000170, "EOS Digital Rebel / 300D / Kiss Digital"),
    (EOS_1D_MARK_II, "EOS-1D Mark II"),
    (0x80000175, "EOS 20D"),
    (EOS_450D, "EOS Digital Rebel XSi / 450D / Kiss X2"),
    (EOS_1DS_MARK_II, "EOS-1Ds Mark II"),
    (0x80000189, "EOS Digital Rebel XT / 350D / Kiss Digital N"),
    (EOS_40D, "EOS 40D"),
    (EOS_5D, "EOS 5D"),
    (EOS_1DS_MARK_III, "EOS-1Ds Mark III"),
    (EOS_5D_MARK_II, "EOS 5D Mark II"),
    (0x80000219, "WFT-E1"),
    (EOS_1D_MARK_II_N, "EOS-1D Mark II N"),
    (0x80000234, "EOS 30D"),
    (0x80000236, "EOS Digital Rebel XTi / 400D / Kiss Digital X"),
    (0x80000241, "WFT-E2"),
    (0x80000246, "WFT-E3"),
    (EOS_7D, "EOS 7D"),
    (EOS_500D, "EOS Rebel T1i / 500D / Kiss X3"),
    (EOS_1000D, "EOS Rebel XS / 1000D / Kiss F"),
    (EOS_50D, "EOS 50D"),
    (EOS_1D_X, "EOS-1D X"),
    (EOS_550D, "EOS Rebel T2i / 550D / Kiss X4"),
    (0x80000271, "WFT-E4"),
    (0x80000273, "WFT-E5"),
    (EOS_1D_MARK_IV, "EOS-1D Mark IV"),
    (EOS_5D_MARK_III, "EOS 5D Mark III"),
    (EOS_600D, "EOS Rebel T3i / 600D / Kiss X5"),
    (EOS_60D, "EOS 60D"),
    (EOS_1100D, "EOS Rebel T3 / 1100D / Kiss X50"),
    (0x80000289, "EOS 7D Mark II"),
    (0x80000297, "WFT-E2 II"),
    (0x80000298, "WFT-E4 II"),
    (EOS_650D, "EOS Rebel T4i / 650D / Kiss X6i"),
    (EOS_6D, "EOS 6D"),
    (EOS_1D_C, "EOS-1D C"),
    (EOS_70D, "EOS 70D"),
    (EOS_700D, "EOS Rebel T5i / 700D / Kiss X7i"),
    (0x80000327, "EOS Rebel T5 / 1200D / Kiss X70 / Hi"),
    (0x80000328, "EOS-1D X Mark II"),
    (0x80000331, "EOS M"),
    (0x80000346, "EOS Rebel SL1 / 100D / Kiss X7"),
    (EOS_760D, "EOS Rebel T6s / 760D / 8000D"),
    (0x80000349, "EOS 5D Mark IV"),
    (EOS_80D, "EOS 80D"),
    (0x80000355, "EOS M2"),
    (0x80000382, "EOS 5DS"),
    (EOS_750D, "EOS Rebel T6i / 750D / Kiss X8i"),
    (0x80000401, "EOS 5DS R"),
    (0x80000404, "EOS Rebel T6 / 1300D / Kiss X80"),
    (0x80000405, "EOS Rebel T7i / 800D / Kiss X9i"),
    (0x80000406, "EOS 6D Mark II"),
    (0x80000408, "EOS 77D / 9000D"),
    (0x80000417, "EOS Rebel SL2 / 200D / Kiss X9"),
    (0x80000421, "EOS R5"),
    (0x80000422, "EOS Rebel T100 / 4000D / 3000D"),
    (0x80000424, "EOS R"),
    (0x80000428, "EOS-1D X Mark III"),
    (0x80000432, "EOS Rebel T7 / 2000D / 1500D / Kiss X90"),
    (0x80000433, "EOS RP"),
    (0x80000435, "EOS Rebel T8i / 850D / X10i"),
    (0x80000436, "EOS SL3 / 250D / Kiss X10"),
    (0x80000437, "EOS 90D"),
    (0x80000450, "EOS R3"),
    (EOS_R6, "EOS R6"),
    (0x80000464, "EOS R7"),
    (0x80000465, "EOS R10"),
    (0x80000467, "PowerShot ZOOM"),
    (0x80000468, "EOS M50 Mark II / Kiss M2"),
    (0x80000480, "EOS R50"),
    (EOS_R6_MARK_II, "EOS R6 Mark II"),
    (0x80000487, "EOS R8"),
    (0x80000491, "PowerShot V10"),
    (0x80000495, "EOS R1"),
    (0x80000496, "EOS R5 Mark II"),
    (0x80000498, "EOS R100"),
    (0x80000520, "EOS D2000C"),
    (0x80000560, "EOS D6000C"),
];

static MODEL_NAMES: LazyLock<HashMap<u32, &'static str>> =
    LazyLock::new(|| MODELS.iter().copied().collect());

/// Name of a Canon model id, e.g. `0x80000285` -> `"EOS 5D Mark III"`.
pub fn model_name(model_id: u32) -> Option<&'static str> {
    MODEL_NAMES.get(&model_id).copied()
}

/// Compact cameras from the `0x01xx0000..0x06xx0000` id range. The EOS D30
/// and D60 share the range but are not PowerShots.
pub fn is_powershot(model_id: u32) -> bool {
    (0x0100_0000..0x0700_0000).contains(&model_id) && !matches!(model_id, EOS_D30 | EOS_D60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0x80000215, Some("EOS-1Ds Mark III"))]
    #[test_case(0x80000285, Some("EOS 5D Mark III"))]
    #[test_case(0x412, Some("EOS M50 / Kiss M"))]
    #[test_case(0x80000412, None; "m50 long form is not a known id")]
    #[test_case(0x3340000, Some("PowerShot SX50 HS"))]
    #[test_case(0, None)]
    fn names(id: u32, expect: Option<&str>) {
        assert_eq!(model_name(id), expect);
    }

    #[test]
    fn no_duplicate_ids() {
        assert_eq!(MODEL_NAMES.len(), MODELS.len());
    }

    #[test_case(0x3340000, true)]
    #[test_case(0x1140000, false; "eos d30")]
    #[test_case(0x80000285, false)]
    #[test_case(0x804, false)]
    fn powershot_range(id: u32, expect: bool) {
        assert_eq!(is_powershot(id), expect);
    }
}
