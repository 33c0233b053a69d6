use core::f32::consts::PI;

/// Wraps an angle in radians into `(-PI, PI]`
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
	if !angle.is_finite() {
		return 0.0;
	}
	angle %= 2.0 * PI;
	if angle > PI {
		angle -= 2.0 * PI;
	} else if angle <= -PI {
		angle += 2.0 * PI;
	}
	angle
}

#[inline]
pub fn mean(values: &[f32]) -> Option<f32> {
	if values.is_empty() {
		None
	} else {
		Some(values.iter().sum::<f32>() / values.len() as f32)
	}
}

/// Population variance
pub fn variance(values: &[f32]) -> Option<f32> {
	let mean = mean(values)?;
	Some(values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / values.len() as f32)
}

#[test]
fn test_normalize_angle() {
	assert!((normalize_angle(1.5 * PI) + PI / 2.0).abs() < 1e-5);
	assert!((normalize_angle(-PI) - PI).abs() < 1e-5);
	assert!((normalize_angle(PI / 2.0 + 4.0 * PI) - PI / 2.0).abs() < 1e-4);
	assert_eq!(normalize_angle(f32::NAN), 0.0);
	assert_eq!(variance(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), Some(4.0));
}
