use crate::{screen::{RelativeBound::*, RelativeRect}, HsvRange};

/// Region of the screen where entities are searched for by colour, away from the HUD
pub const GAME_AREA: RelativeRect = RelativeRect {
	left: ScreenW(0.1),
	top: ScreenH(1.0 / 6.0),
	right: ScreenW(0.9),
	bottom: ScreenH(5.0 / 6.0)
};

/// Top and bottom HUD bands
pub const UI_MARGIN: crate::screen::RelativeBound = ScreenH(1.0 / 6.0);

pub const COLOR_SAMPLE_GRID: u32 = 25;
pub const COLOR_SIMILARITY_TOLERANCE: f32 = 50.0;
pub const COLOR_EXPANSION_MARGIN: i32 = 2;

pub const BRIGHT_SUM_THRESHOLD: u16 = 600;
pub const BRIGHT_CONTRAST_THRESHOLD: u8 = 150;

pub const MOTION_DIFF_THRESHOLD: u8 = 20;
pub const MOTION_CLOSE_RADIUS: u8 = 1;

// 5x5 kernel
pub const EDGE_BLUR_SIGMA: f32 = 1.1;
pub const EDGE_LOW_THRESHOLD: f32 = 50.0;
pub const EDGE_HIGH_THRESHOLD: f32 = 150.0;

pub const CIRCULARITY_WINDOW: (f32, f32) = (0.2, 0.8);
pub const RECTANGULARITY_WINDOW: (f32, f32) = (0.3, 0.9);

pub const RED_HSV_RANGES: [HsvRange; 2] = [
	HsvRange { hue: (0, 20), min_saturation: 39, min_value: 39 },
	HsvRange { hue: (340, 360), min_saturation: 39, min_value: 39 },
];

pub const MERGE_OVERLAP_RATIO: f32 = 0.3;

pub const ASPECT_RATIO_WINDOW: (f32, f32) = (0.2, 1.2);
pub const MIN_COLOR_VARIANCE: f32 = 50.0;
pub const VARIANCE_SAMPLE_GRID: i32 = 10;
