use super::*;

/// `4 * PI * area / perimeter^2`, 1 for a circle
pub fn circularity(contour: &Contour) -> f32 {
	let perimeter = contour.perimeter();
	if perimeter <= f32::EPSILON {
		return 0.0;
	}
	4.0 * core::f32::consts::PI * contour.area() / (perimeter * perimeter)
}

/// Share of the bounding box covered by the contour
pub fn rectangularity(contour: &Contour) -> f32 {
	match contour.bounding_rect() {
		Some(rect) if rect.area() > 0 => contour.area() / rect.area() as f32,
		_ => 0.0,
	}
}

#[inline]
fn within((min, max): (f32, f32), value: f32) -> bool {
	value > min && value < max
}

pub(super) fn detect<O: ImageOps>(ops: &O, image: &RgbImage, profile: &GameDetectionConfig, min_size: i32) -> Vec<DetectionRegion> {
	let min_area = (min_size * min_size) as f32;
	let mut regions = Vec::new();

	if profile.use_shape_analysis {
		let gray = ops.grayscale(image);
		let blurred = ops.blur(&gray, consts::EDGE_BLUR_SIGMA);
		let edges = ops.edge_detect(&blurred, consts::EDGE_LOW_THRESHOLD, consts::EDGE_HIGH_THRESHOLD);

		for contour in ops.external_contours(&edges) {
			if contour.area() <= min_area {
				continue;
			}
			if !within(consts::CIRCULARITY_WINDOW, circularity(&contour)) || !within(consts::RECTANGULARITY_WINDOW, rectangularity(&contour)) {
				continue;
			}
			if let Some(rect) = contour.bounding_rect() {
				regions.push(DetectionRegion::new(rect, DetectionMethod::Contour));
			}
		}
	}

	if profile.use_edge_detection {
		let mask = ops.hsv_mask(image, &consts::RED_HSV_RANGES);
		regions.extend(
			ops.external_contours(&mask)
				.into_iter()
				.filter(|contour| contour.area() > min_area)
				.filter_map(|contour| contour.bounding_rect())
				.map(|rect| DetectionRegion::new(rect, DetectionMethod::ColorMask))
		);
	}

	regions
}

#[cfg(test)]
fn polygon(points: &[(i32, i32)]) -> Contour {
	Contour { points: points.iter().map(|&(x, y)| Point::new(x, y)).collect() }
}

#[test]
fn test_shape_scores() {
	// L-shaped silhouette: 80x120 with a 40x60 corner cut out
	let l_shape = polygon(&[(0, 0), (40, 0), (40, 60), (80, 60), (80, 120), (0, 120)]);
	assert!(within(consts::CIRCULARITY_WINDOW, circularity(&l_shape)));
	assert!(within(consts::RECTANGULARITY_WINDOW, rectangularity(&l_shape)));

	// Plain boxes read as HUD panels
	let panel = polygon(&[(0, 0), (80, 0), (80, 120), (0, 120)]);
	assert!(!within(consts::RECTANGULARITY_WINDOW, rectangularity(&panel)));

	// Long thin lines are not silhouettes
	let line = polygon(&[(0, 0), (300, 0), (300, 4), (0, 4)]);
	assert!(!within(consts::CIRCULARITY_WINDOW, circularity(&line)));

	assert_eq!(circularity(&polygon(&[(3, 3)])), 0.0);
}

#[test]
fn test_hsv_mask_pass() {
	let image = RgbImage::from_fn(300, 300, |x, y| {
		if (100..150).contains(&x) && (80..200).contains(&y) {
			image::Rgb([210, 30, 40])
		} else {
			image::Rgb([40, 120, 40])
		}
	});

	let edge_profile = GameDetectionConfig { use_edge_detection: true, ..Default::default() };
	let regions = detect(&CpuImageOps, &image, &edge_profile, 30);
	assert_eq!(regions, vec![DetectionRegion::new(Rect::new(100, 80, 150, 200), DetectionMethod::ColorMask)]);

	// Neither sub-pass enabled
	assert!(detect(&CpuImageOps, &image, &GameDetectionConfig::default(), 30).is_empty());
}
