use super::*;

/// Regions that changed between `previous` and `current`
pub(super) fn detect<O: ImageOps>(ops: &O, current: &RgbImage, previous: &RgbImage, min_size: i32) -> Result<Vec<DetectionRegion>, AnyError> {
	let diff = ops.abs_diff(current, previous)?;
	let gray = ops.grayscale(&diff);
	let mask = ops.threshold(&gray, consts::MOTION_DIFF_THRESHOLD);
	let mask = ops.morphological_close(&mask, consts::MOTION_CLOSE_RADIUS);

	let min_area = (min_size * min_size) as f32;
	Ok(ops.external_contours(&mask)
		.into_iter()
		.filter(|contour| contour.area() > min_area)
		.filter_map(|contour| contour.bounding_rect())
		.map(|rect| DetectionRegion::new(rect, DetectionMethod::Motion))
		.collect())
}

#[test]
fn test_moving_block() {
	use crate::detector::test_frames::*;

	let previous = blank((400, 400), 0);
	let current = figure((400, 400), Rect::new(200, 150, 260, 270), 100);

	let regions = detect(&CpuImageOps, &current.image, &previous.image, 30).unwrap();
	assert_eq!(regions, vec![DetectionRegion::new(Rect::new(200, 150, 260, 270), DetectionMethod::Motion)]);

	// Sub-threshold flicker and tiny blobs are ignored
	let speck = figure((400, 400), Rect::new(10, 10, 20, 20), 200);
	assert!(detect(&CpuImageOps, &speck.image, &previous.image, 30).unwrap().is_empty());
}

#[test]
fn test_mismatched_frames() {
	use crate::detector::test_frames::*;

	let previous = blank((300, 200), 0);
	let current = blank((400, 400), 100);
	assert!(detect(&CpuImageOps, &current.image, &previous.image, 30).is_err());
}
