use super::*;

/// Largest per-channel population variance over a 10x10 sample grid inside `rect`
pub fn color_variance(image: &RgbImage, rect: Rect<i32>) -> f32 {
	let rect = rect.clamp_to(image.width(), image.height());
	if rect.is_empty() {
		return 0.0;
	}

	let step_x = (rect.width() / consts::VARIANCE_SAMPLE_GRID).max(1) as usize;
	let step_y = (rect.height() / consts::VARIANCE_SAMPLE_GRID).max(1) as usize;

	let mut channels: [Vec<f32>; 3] = Default::default();
	for y in (rect.top..rect.bottom).step_by(step_y) {
		for x in (rect.left..rect.right).step_by(step_x) {
			if let Some(pixel) = image.get_pixel_checked(x as u32, y as u32) {
				for (channel, value) in channels.iter_mut().zip(pixel.0) {
					channel.push(value as f32);
				}
			}
		}
	}

	channels.iter().filter_map(|channel| variance(channel)).fold(0.0, f32::max)
}

/// Size window, aspect ratio and texture checks for one candidate
pub fn validate_candidate(image: &RgbImage, rect: Rect<i32>, profile: &GameDetectionConfig) -> bool {
	if rect.is_empty() {
		return false;
	}

	let screen_area = image.width() as f32 * image.height() as f32;
	let area = rect.area() as f32 / screen_area;
	if area < profile.min_bounding_size_percent || area > profile.max_bounding_size_percent {
		return false;
	}

	let aspect = rect.width() as f32 / rect.height() as f32;
	let (min_aspect, max_aspect) = consts::ASPECT_RATIO_WINDOW;
	if aspect < min_aspect || aspect > max_aspect {
		return false;
	}

	// Near-uniform regions are usually HUD
	color_variance(image, rect) >= consts::MIN_COLOR_VARIANCE
}

/// Drops undersized regions, regions reaching into the HUD bands and regions failing `validate_candidate`
pub fn filter_regions(regions: Vec<DetectionRegion>, image: &RgbImage, profile: &GameDetectionConfig, min_size: i32) -> Vec<DetectionRegion> {
	let height = image.height() as i32;
	let margin = consts::UI_MARGIN.into_absolute([image.width(), image.height()]) as i32;

	regions
		.into_iter()
		.filter(|region| {
			let rect = region.rect;
			if rect.width() < min_size || rect.height() < min_size {
				return false;
			}
			if rect.top < margin || rect.bottom > height - margin {
				return false;
			}
			validate_candidate(image, rect, profile)
		})
		.collect()
}

#[cfg(test)]
fn textured(size: (u32, u32)) -> RgbImage {
	RgbImage::from_fn(size.0, size.1, |x, y| {
		if (x + y) % 7 < 3 {
			image::Rgb([200, 40, 40])
		} else {
			image::Rgb([60, 60, 160])
		}
	})
}

#[test]
fn test_color_variance() {
	let flat = RgbImage::from_pixel(100, 100, image::Rgb([120, 30, 30]));
	assert_eq!(color_variance(&flat, Rect::new(10, 10, 60, 90)), 0.0);

	assert!(color_variance(&textured((100, 100)), Rect::new(10, 10, 60, 90)) >= consts::MIN_COLOR_VARIANCE);

	// Entirely off-screen
	assert_eq!(color_variance(&flat, Rect::new(200, 200, 260, 300)), 0.0);
}

#[test]
fn test_filter_rules() {
	let image = textured((600, 600));
	let profile = GameDetectionConfig::default();
	let region = |left, top, right, bottom| DetectionRegion::new(Rect::new(left, top, right, bottom), DetectionMethod::Motion);

	let kept = region(250, 200, 310, 320);
	let regions = vec![
		kept.clone(),
		// too narrow
		region(250, 200, 270, 320),
		// inside the top HUD band
		region(250, 50, 310, 170),
		// reaches into the bottom HUD band
		region(250, 400, 310, 520),
		// too wide for a silhouette
		region(100, 200, 300, 320),
		// too small a share of the screen
		region(250, 200, 290, 240),
		// too large a share of the screen
		region(150, 110, 450, 480),
	];

	assert_eq!(filter_regions(regions, &image, &profile, 30), vec![kept]);
}

#[test]
fn test_uniform_region_rejected() {
	let image = RgbImage::from_pixel(600, 600, image::Rgb([200, 20, 20]));
	assert!(!validate_candidate(&image, Rect::new(250, 200, 310, 320), &GameDetectionConfig::default()));
}
