use crate::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleFit {
	pub center: Point<f32>,
	pub radius: f32,

	/// Mean radial error as a fraction of the radius
	pub error: f32,

	/// No unique circle exists, `center` is the centroid
	pub collinear: bool,
}

/// Algebraic least-squares circle fit over mean-centred coordinates
///
/// Collinear (or coincident) points have no unique solution; the centroid is
/// used as the centre instead, which yields a large error for any real line.
pub fn fit_circle(points: &[Point<f32>]) -> Option<CircleFit> {
	if points.len() < 3 {
		return None;
	}

	let n = points.len() as f64;
	let (mean_x, mean_y) = points.iter().fold((0.0f64, 0.0f64), |(x, y), pt| (x + pt.x as f64, y + pt.y as f64));
	let (mean_x, mean_y) = (mean_x / n, mean_y / n);

	let mut suu = 0.0f64;
	let mut svv = 0.0f64;
	let mut suv = 0.0;
	let mut suuu = 0.0;
	let mut svvv = 0.0;
	let mut suvv = 0.0;
	let mut svuu = 0.0;
	for pt in points {
		let u = pt.x as f64 - mean_x;
		let v = pt.y as f64 - mean_y;
		suu += u * u;
		svv += v * v;
		suv += u * v;
		suuu += u * u * u;
		svvv += v * v * v;
		suvv += u * v * v;
		svuu += v * u * u;
	}

	let det = suu * svv - suv * suv;
	let offset = if det.abs() <= 1e-9 * (suu * svv).max(1.0) {
		None
	} else {
		let a = 0.5 * (suuu + suvv);
		let b = 0.5 * (svvv + svuu);
		Some(((a * svv - b * suv) / det, (b * suu - a * suv) / det))
	};

	let (center, radius) = match offset {
		Some((uc, vc)) => (
			Point::new((uc + mean_x) as f32, (vc + mean_y) as f32),
			(uc * uc + vc * vc + (suu + svv) / n).sqrt(),
		),
		None => {
			let centroid = Point::new(mean_x as f32, mean_y as f32);
			(centroid, points.iter().map(|pt| pt.distance(&centroid) as f64).sum::<f64>() / n)
		}
	};

	if !radius.is_finite() || radius < f32::EPSILON as f64 {
		return None;
	}

	let error = points.iter().map(|pt| (pt.distance(&center) as f64 - radius).abs()).sum::<f64>() / n / radius;

	Some(CircleFit {
		center,
		radius: radius as f32,
		error: error as f32,
		collinear: offset.is_none(),
	})
}

#[test]
fn test_fit_circle() {
	let points = (0..10)
		.map(|i| {
			let angle = i as f32 * 0.5;
			Point::new(30.0 + 100.0 * angle.cos(), -20.0 + 100.0 * angle.sin())
		})
		.collect::<Vec<_>>();

	let fit = fit_circle(&points).unwrap();
	assert!(fit.center.distance(&Point::new(30.0, -20.0)) < 0.1, "{fit:?}");
	assert!((fit.radius - 100.0).abs() < 0.1, "{fit:?}");
	assert!(fit.error < 0.01, "{fit:?}");
	assert!(!fit.collinear);
}

#[test]
fn test_fit_collinear_falls_back_to_centroid() {
	let points = (0..10).map(|i| Point::new(i as f32 * 10.0, 5.0)).collect::<Vec<_>>();

	let fit = fit_circle(&points).unwrap();
	assert!(fit.collinear);
	assert_eq!(fit.center, Point::new(45.0, 5.0));
	assert!(fit.error > 0.3);

	assert!(fit_circle(&[Point::new(1.0, 1.0); 5]).is_none());
	assert!(fit_circle(&points[..2]).is_none());
}
