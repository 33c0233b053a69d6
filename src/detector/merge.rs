use super::*;

/// Whether the intersection covers more than `MERGE_OVERLAP_RATIO` of the smaller rectangle
pub fn overlaps(a: &Rect<i32>, b: &Rect<i32>) -> bool {
	let intersection = match a.intersection(b) {
		Some(intersection) => intersection.area() as i64,
		None => return false,
	};
	let smaller = (a.area() as i64).min(b.area() as i64);
	intersection as f32 > consts::MERGE_OVERLAP_RATIO * smaller as f32
}

/// Folds overlapping regions into their union until no two remaining regions overlap
///
/// Earlier regions absorb later ones, so a merged region keeps the method of whichever came first.
pub fn merge_overlapping(regions: Vec<DetectionRegion>) -> Vec<DetectionRegion> {
	let mut regions = regions.into_iter().filter(|region| !region.rect.is_empty()).collect::<Vec<_>>();

	loop {
		let mut merged: Vec<DetectionRegion> = Vec::with_capacity(regions.len());
		let mut changed = false;

		for region in regions {
			match merged.iter_mut().find(|existing| overlaps(&existing.rect, &region.rect)) {
				Some(existing) => {
					existing.rect = existing.rect.union(&region.rect);
					existing.confidence = match (existing.confidence, region.confidence) {
						(Some(a), Some(b)) => Some(a.max(b)),
						(a, b) => a.or(b),
					};
					changed = true;
				},
				None => merged.push(region),
			}
		}

		regions = merged;
		if !changed {
			break regions;
		}
	}
}

#[cfg(test)]
fn region(left: i32, top: i32, right: i32, bottom: i32) -> DetectionRegion {
	DetectionRegion::new(Rect::new(left, top, right, bottom), DetectionMethod::Color)
}

#[test]
fn test_merge_high_overlap() {
	let merged = merge_overlapping(vec![region(100, 100, 150, 200), region(120, 110, 170, 210)]);
	assert_eq!(merged, vec![region(100, 100, 170, 210)]);
}

#[test]
fn test_low_overlap_stays_distinct() {
	// 10x100 strip of overlap against 5000px areas
	let regions = vec![region(100, 100, 150, 200), region(140, 100, 190, 200)];
	assert!(!overlaps(&regions[0].rect, &regions[1].rect));
	assert_eq!(merge_overlapping(regions.clone()), regions);
}

#[test]
fn test_merge_cascades() {
	// The second region only overlaps enough once the first has grown
	let merged = merge_overlapping(vec![
		region(0, 0, 40, 40),
		region(290, 0, 330, 40),
		region(20, 0, 60, 40),
		region(35, 0, 305, 40),
	]);
	assert_eq!(merged, vec![region(0, 0, 330, 40)]);
}

#[test]
fn test_merge_keeps_best_confidence() {
	let mut a = region(0, 0, 50, 50);
	a.confidence = Some(0.7);
	let mut b = region(5, 5, 55, 55);
	b.method = DetectionMethod::LearnedModel;
	b.confidence = Some(0.9);

	let merged = merge_overlapping(vec![a, b, region(10, 10, 10, 60)]);
	assert_eq!(merged.len(), 1);
	assert_eq!(merged[0].method, DetectionMethod::Color);
	assert_eq!(merged[0].confidence, Some(0.9));
}
