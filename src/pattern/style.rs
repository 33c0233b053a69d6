use crate::prelude::*;

const MIN_SAMPLES: usize = 5;

// Substituted for non-increasing timestamps, one frame at 60 Hz
const FALLBACK_DT: f32 = 0.016;

/// Coarse description of how an entity has been moving over its whole history
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MotionStyle {
	#[default]
	Unknown,
	Stationary,
	Strafing,
	Vertical,
	Linear,
	Circling,
	Peeking,
	Erratic,
}
impl MotionStyle {
	pub fn name(&self) -> &'static str {
		match self {
			Self::Unknown => "unknown",
			Self::Stationary => "stationary",
			Self::Strafing => "strafing",
			Self::Vertical => "vertical",
			Self::Linear => "linear",
			Self::Circling => "circling",
			Self::Peeking => "peeking",
			Self::Erratic => "erratic",
		}
	}
}
impl std::fmt::Display for MotionStyle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

/// Number of runs of consecutive `true`s and of consecutive `false`s
fn count_runs(flags: impl Iterator<Item = bool>) -> (usize, usize) {
	let mut runs = (0, 0);
	let mut previous = None;
	for flag in flags {
		if previous != Some(flag) {
			if flag {
				runs.0 += 1;
			} else {
				runs.1 += 1;
			}
		}
		previous = Some(flag);
	}
	runs
}

pub fn classify_style(history: &VecDeque<Sample>) -> MotionStyle {
	if history.len() < MIN_SAMPLES {
		return MotionStyle::Unknown;
	}

	let steps = history.iter().zip(history.iter().skip(1)).map(|(a, b)| {
		let delta = b.position - a.position;
		let dt = match b.timestamp_ms.checked_sub(a.timestamp_ms) {
			Some(dt) if dt > 0 => dt as f32 / 1000.0,
			_ => FALLBACK_DT,
		};
		(delta, delta / dt)
	}).collect::<Vec<_>>();

	let distances = steps.iter().map(|(delta, _)| delta.length()).collect::<Vec<_>>();
	let vx = steps.iter().map(|(_, velocity)| velocity.x).collect::<Vec<_>>();
	let vy = steps.iter().map(|(_, velocity)| velocity.y).collect::<Vec<_>>();

	let avg_step = mean(&distances).unwrap_or(0.0);
	let x_variance = variance(&vx).unwrap_or(0.0);
	let y_variance = variance(&vy).unwrap_or(0.0);
	let avg_vx = mean(&vx).unwrap_or(0.0);
	let avg_vy = mean(&vy).unwrap_or(0.0);

	let directions = steps.iter().map(|(delta, _)| delta.y.atan2(delta.x)).collect::<Vec<_>>();
	let direction_changes = directions.windows(2).map(|pair| normalize_angle(pair[1] - pair[0]).abs()).collect::<Vec<_>>();
	let direction_change = mean(&direction_changes).unwrap_or(0.0);

	if avg_step < 10.0 {
		return MotionStyle::Stationary;
	}

	if x_variance > 5000.0 && y_variance < 2000.0 && avg_vy.abs() < 50.0 {
		return MotionStyle::Strafing;
	}

	if y_variance > 5000.0 && x_variance < 2000.0 && avg_vx.abs() < 50.0 {
		return MotionStyle::Vertical;
	}

	if direction_change < 0.5 && avg_step > 50.0 {
		return MotionStyle::Linear;
	}

	if direction_change > 0.5 && direction_change < 1.0 && avg_step > 20.0 {
		return MotionStyle::Circling;
	}

	let (moving, stopped) = count_runs(distances.iter().map(|&distance| distance > 5.0));
	if moving >= 2 && stopped >= 2 {
		return MotionStyle::Peeking;
	}

	if x_variance > 3000.0 && y_variance > 3000.0 && direction_change > 1.0 {
		return MotionStyle::Erratic;
	}

	MotionStyle::Unknown
}

#[cfg(test)]
fn history(points: &[(f32, f32)]) -> VecDeque<Sample> {
	points
		.iter()
		.enumerate()
		.map(|(i, &(x, y))| Sample {
			position: Point::new(x, y),
			timestamp_ms: i as u64 * 100,
			velocity: None,
		})
		.collect()
}

#[test]
fn test_style_needs_history() {
	assert_eq!(classify_style(&history(&[(0.0, 0.0), (50.0, 0.0), (100.0, 0.0), (150.0, 0.0)])), MotionStyle::Unknown);
}

#[test]
fn test_styles() {
	assert_eq!(classify_style(&history(&[(100.0, 100.0), (102.0, 101.0), (101.0, 99.0), (100.0, 100.0), (103.0, 100.0)])), MotionStyle::Stationary);

	// Side to side at a steady height
	let strafe = [(0.0, 0.0), (60.0, 0.0), (0.0, 0.0), (60.0, 0.0), (0.0, 0.0), (60.0, 0.0)];
	assert_eq!(classify_style(&history(&strafe)), MotionStyle::Strafing);

	let vertical = strafe.map(|(x, y)| (y, x));
	assert_eq!(classify_style(&history(&vertical)), MotionStyle::Vertical);

	let run = (0..8).map(|i| (i as f32 * 60.0, i as f32 * 20.0)).collect::<Vec<_>>();
	assert_eq!(classify_style(&history(&run)), MotionStyle::Linear);

	// Move, hold, move, hold
	let peek = [(0.0, 0.0), (30.0, 30.0), (60.0, 60.0), (60.0, 60.0), (60.0, 60.0), (90.0, 90.0), (120.0, 120.0), (120.0, 120.0), (120.0, 120.0)];
	assert_eq!(classify_style(&history(&peek)), MotionStyle::Peeking);

	assert_eq!(MotionStyle::Circling.to_string(), "circling");
}
