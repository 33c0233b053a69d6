use super::*;

#[inline]
pub(super) fn is_entity_color(pixel: image::Rgb<u8>, profile: &GameDetectionConfig) -> bool {
	let [r, g, b] = pixel.0;

	let red_dominant = r > profile.red_threshold && r as f32 > g as f32 * profile.red_dominance_ratio && r as f32 > b as f32 * profile.red_dominance_ratio;

	let max = r.max(g).max(b);
	let min = r.min(g).min(b);
	let bright_contrast = (r as u16 + g as u16 + b as u16) > consts::BRIGHT_SUM_THRESHOLD && max - min > consts::BRIGHT_CONTRAST_THRESHOLD;

	red_dominant || bright_contrast
}

/// Grows a seed pixel along its row and column while the colour stays close to the seed
fn expand(image: &RgbImage, area: Rect<u32>, x: u32, y: u32) -> Rect<i32> {
	let seed = image.get_pixel_fast(x, y);
	let similar = |x: u32, y: u32| image.get_pixel_fast(x, y).rgb_distance(&seed) < consts::COLOR_SIMILARITY_TOLERANCE;

	let mut left = x;
	while left > area.left && similar(left - 1, y) {
		left -= 1;
	}

	let mut right = x;
	while right + 1 < area.right && similar(right + 1, y) {
		right += 1;
	}

	let mut top = y;
	while top > area.top && similar(x, top - 1) {
		top -= 1;
	}

	let mut bottom = y;
	while bottom + 1 < area.bottom && similar(x, bottom + 1) {
		bottom += 1;
	}

	let margin = consts::COLOR_EXPANSION_MARGIN;
	Rect {
		left: (left as i32 - margin).max(area.left as i32),
		top: (top as i32 - margin).max(area.top as i32),
		right: (right as i32 + 1 + margin).min(area.right as i32),
		bottom: (bottom as i32 + 1 + margin).min(area.bottom as i32),
	}
}

/// Samples a grid over the game area and expands every entity-coloured sample into a region
pub(super) fn detect(image: &RgbImage, profile: &GameDetectionConfig, min_size: i32) -> Vec<DetectionRegion> {
	let area = consts::GAME_AREA.into_absolute([image.width(), image.height()]);
	if area.is_empty() {
		return Vec::new();
	}

	let step_x = (area.width() / consts::COLOR_SAMPLE_GRID).max(1) as usize;
	let step_y = (area.height() / consts::COLOR_SAMPLE_GRID).max(1) as usize;

	let mut regions = Vec::new();
	for y in (area.top..area.bottom).step_by(step_y) {
		for x in (area.left..area.right).step_by(step_x) {
			if !is_entity_color(image.get_pixel_fast(x, y), profile) {
				continue;
			}

			// Already covered by an earlier seed
			if regions.iter().any(|region: &DetectionRegion| region.rect.contains(Point::new(x as i32, y as i32))) {
				continue;
			}

			let rect = expand(image, area, x, y);
			if rect.width() > min_size && rect.height() > min_size {
				regions.push(DetectionRegion::new(rect, DetectionMethod::Color));
			}
		}
	}

	merge_overlapping(regions)
}

#[test]
fn test_entity_colors() {
	let profile = GameDetectionConfig::default();

	assert!(is_entity_color(image::Rgb([200, 20, 20]), &profile));
	assert!(!is_entity_color(image::Rgb([140, 20, 20]), &profile));
	assert!(!is_entity_color(image::Rgb([200, 150, 20]), &profile));
	assert!(!is_entity_color(image::Rgb([90, 90, 90]), &profile));

	// Bright and high contrast
	assert!(is_entity_color(image::Rgb([255, 255, 100]), &profile));

	let lenient = GameDetectionConfig { red_threshold: 130, red_dominance_ratio: 1.3, ..Default::default() };
	assert!(is_entity_color(image::Rgb([140, 100, 20]), &lenient));
}

#[test]
fn test_expansion_stops_at_color_edge() {
	let image = RgbImage::from_fn(100, 100, |x, y| {
		if (40..60).contains(&x) && (30..80).contains(&y) {
			image::Rgb([210, 25, 25])
		} else {
			image::Rgb([20, 20, 120])
		}
	});

	let rect = expand(&image, Rect::new(0, 0, 100, 100), 50, 50);
	assert_eq!(rect, Rect::new(38, 28, 62, 82));

	// Neither the scan nor the margin leaves the game area
	let rect = expand(&image, Rect::new(45, 35, 100, 100), 50, 50);
	assert_eq!(rect, Rect::new(45, 35, 62, 82));
}
