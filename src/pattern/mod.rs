use crate::prelude::*;
use core::f32::consts::{FRAC_PI_2, PI};

mod circle;
pub use circle::{fit_circle, CircleFit};

mod style;
pub use style::{classify_style, MotionStyle};

/// Samples the scorers look at
pub const WINDOW: usize = 10;

const MIN_WINNING_CONFIDENCE: f32 = 0.4;
const FALLBACK_CONFIDENCE: f32 = 0.5;

const MIN_LINEAR_SPEED: f32 = 50.0;
const LINEAR_VARIANCE_SCALE: f32 = 0.5;

const MAX_CIRCLE_ERROR: f32 = 0.3;

const ZIGZAG_EPSILON: f32 = 1e-3;

const MIN_DECELERATION: f32 = 100.0;
const STOPPING_RATIO: f32 = 0.7;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MovementPattern {
	Linear,
	Circular {
		center: Point<f32>,
		radius: f32,

		/// Radians per second
		angular_velocity: f32,

		/// Angle of the latest position around `center`
		angle: f32,
	},
	Zigzag {
		base_velocity: Point<f32>,
		amplitude: f32,
		frequency: f32,
		phase: f32,
	},
	Stopping {
		/// px/s^2
		deceleration: f32,
	},
	Stationary,
	Erratic,
}
impl MovementPattern {
	pub fn name(&self) -> &'static str {
		match self {
			Self::Linear => "LINEAR",
			Self::Circular { .. } => "CIRCULAR",
			Self::Zigzag { .. } => "ZIGZAG",
			Self::Stopping { .. } => "STOPPING",
			Self::Stationary => "STATIONARY",
			Self::Erratic => "ERRATIC",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatternEstimate {
	pub pattern: MovementPattern,

	/// In `[0, 1]`
	pub confidence: f32,
}
impl PatternEstimate {
	#[inline]
	fn new(pattern: MovementPattern, confidence: f32) -> Self {
		Self {
			pattern,
			confidence: if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) },
		}
	}
}
impl Default for PatternEstimate {
	#[inline]
	fn default() -> Self {
		Self::new(MovementPattern::Linear, FALLBACK_CONFIDENCE)
	}
}

/// The last `WINDOW` samples as positions and seconds since the first of them
struct Window {
	positions: Vec<Point<f32>>,
	seconds: Vec<f32>,
}
impl Window {
	fn new(history: &VecDeque<Sample>) -> Option<Self> {
		if history.len() < WINDOW {
			return None;
		}

		let samples = history.iter().skip(history.len() - WINDOW);
		let start = history[history.len() - WINDOW].timestamp_ms;

		let (positions, seconds) = samples.map(|sample| (sample.position, sample.timestamp_ms.saturating_sub(start) as f32 / 1000.0)).unzip();
		Some(Self { positions, seconds })
	}

	#[inline]
	fn span(&self) -> f32 {
		self.seconds.last().copied().unwrap_or(0.0)
	}

	/// Velocity between each pair of consecutive samples, skipping pairs without elapsed time
	fn velocities(&self) -> Vec<Point<f32>> {
		(1..self.positions.len())
			.filter_map(|i| {
				let dt = self.seconds[i] - self.seconds[i - 1];
				if dt > 0.0 {
					Some((self.positions[i] - self.positions[i - 1]) / dt)
				} else {
					None
				}
			})
			.collect()
	}
}

fn mean_point(points: &[Point<f32>]) -> Option<Point<f32>> {
	if points.is_empty() {
		return None;
	}
	let mut sum = Point::ZERO;
	for pt in points {
		sum += *pt;
	}
	Some(sum / points.len() as f32)
}

fn score_linear(window: &Window) -> Option<PatternEstimate> {
	let velocities = window.velocities();
	let mean = mean_point(&velocities)?;
	let speed = mean.length();

	// Barely moving is not meaningfully linear
	if speed < MIN_LINEAR_SPEED {
		return Some(PatternEstimate::new(MovementPattern::Linear, 0.2));
	}

	let variance = velocities.iter().map(|v| v.distance_sqr(&mean)).sum::<f32>() / velocities.len() as f32;
	let normalized = variance / (speed * speed);

	Some(PatternEstimate::new(MovementPattern::Linear, 1.0 - (normalized / LINEAR_VARIANCE_SCALE).min(1.0)))
}

fn score_circular(window: &Window) -> Option<PatternEstimate> {
	let fit = fit_circle(&window.positions)?;
	if fit.collinear || fit.error >= MAX_CIRCLE_ERROR {
		return None;
	}

	let angles = window.positions.iter().map(|pt| (pt.y - fit.center.y).atan2(pt.x - fit.center.x)).collect::<Vec<_>>();
	let sweep = angles.windows(2).map(|pair| normalize_angle(pair[1] - pair[0])).sum::<f32>();

	let confidence = if sweep.abs() > FRAC_PI_2 { 0.7 - fit.error } else { 0.4 - fit.error };

	let n = angles.len();
	let angle = angles[n - 1];
	let dt = window.seconds[n - 1] - window.seconds[n - 3];
	let angular_velocity = if dt > 0.0 { normalize_angle(angle - angles[n - 3]) / dt } else { 0.0 };

	Some(PatternEstimate::new(
		MovementPattern::Circular {
			center: fit.center,
			radius: fit.radius,
			angular_velocity,
			angle,
		},
		confidence,
	))
}

fn score_zigzag(window: &Window) -> Option<PatternEstimate> {
	let velocities = window.velocities();
	let base_velocity = mean_point(&velocities)?;

	// Heading from unit steps, so a few fast steps cannot swing it
	let heading = mean_point(&velocities.iter().filter_map(Point::normalized).collect::<Vec<_>>())?;
	let axis = heading.normalized()?.perpendicular();

	let origin = window.positions[0];
	let projections = window.positions.iter().map(|pt| (*pt - origin).dot(&axis)).collect::<Vec<_>>();

	let mut reversals = 0;
	let mut last_sign = 0.0;
	for pair in projections.windows(2) {
		let diff = pair[1] - pair[0];
		if diff.abs() < ZIGZAG_EPSILON {
			continue;
		}
		let sign = diff.signum();
		if last_sign != 0.0 && sign != last_sign {
			reversals += 1;
		}
		last_sign = sign;
	}

	if reversals < 2 {
		return None;
	}

	let (min, max) = projections.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), &p| (min.min(p), max.max(p)));
	let span = window.span();
	let latest = projections[projections.len() - 1];

	Some(PatternEstimate::new(
		MovementPattern::Zigzag {
			base_velocity,
			amplitude: (max - min) / 2.0,
			frequency: if span > 0.0 { reversals as f32 / 2.0 / span } else { 0.0 },
			phase: if latest > (max + min) / 2.0 { PI } else { 0.0 },
		},
		(0.3 + 0.15 * (reversals - 2) as f32).min(0.8),
	))
}

fn score_stopping(window: &Window) -> Option<PatternEstimate> {
	let speeds = window.velocities().iter().map(Point::length).collect::<Vec<_>>();
	if speeds.len() < 2 {
		return None;
	}

	let initial = speeds[0];
	let last = speeds[speeds.len() - 1];

	let slowing = initial > f32::EPSILON && last <= initial * STOPPING_RATIO;
	let non_increasing = speeds.windows(2).all(|pair| pair[1] <= pair[0]);
	let decreasing = speeds.windows(2).filter(|pair| pair[1] < pair[0]).count() as f32 / (speeds.len() - 1) as f32;

	let confidence = if non_increasing && slowing {
		0.8
	} else if decreasing >= STOPPING_RATIO {
		0.6
	} else if slowing {
		0.4
	} else {
		return None;
	};

	let span = window.span();
	let deceleration = if span > 0.0 { ((initial - last) / span).max(MIN_DECELERATION) } else { MIN_DECELERATION };

	Some(PatternEstimate::new(MovementPattern::Stopping { deceleration }, confidence))
}

/// Scores an entity's recent history against each movement pattern
#[derive(Clone, Copy, Debug, Default)]
pub struct MotionPatternClassifier;
impl MotionPatternClassifier {
	pub fn classify(&self, history: &VecDeque<Sample>) -> PatternEstimate {
		let window = match Window::new(history) {
			Some(window) => window,
			None => return PatternEstimate::default(),
		};

		let mut best: Option<PatternEstimate> = None;
		for estimate in [score_linear(&window), score_circular(&window), score_zigzag(&window), score_stopping(&window)].into_iter().flatten() {
			if best.map_or(true, |best| estimate.confidence > best.confidence) {
				best = Some(estimate);
			}
		}

		match best {
			Some(best) if best.confidence >= MIN_WINNING_CONFIDENCE => best,

			// Nothing fits well, let the coarse motion style break the tie
			_ => match classify_style(history) {
				MotionStyle::Stationary => PatternEstimate::new(MovementPattern::Stationary, FALLBACK_CONFIDENCE),
				MotionStyle::Erratic => PatternEstimate::new(MovementPattern::Erratic, FALLBACK_CONFIDENCE),
				_ => PatternEstimate::default(),
			},
		}
	}
}

#[cfg(test)]
fn history(points: impl IntoIterator<Item = (f32, f32)>) -> VecDeque<Sample> {
	points
		.into_iter()
		.enumerate()
		.map(|(i, (x, y))| Sample {
			position: Point::new(x, y),
			timestamp_ms: i as u64 * 100,
			velocity: None,
		})
		.collect()
}

#[test]
fn test_short_history_defaults_to_linear() {
	let estimate = MotionPatternClassifier.classify(&history((0..9).map(|i| (i as f32 * 10.0, 0.0))));
	assert_eq!(estimate, PatternEstimate { pattern: MovementPattern::Linear, confidence: 0.5 });
}

#[test]
fn test_linear() {
	let estimate = MotionPatternClassifier.classify(&history((0..10).map(|i| (i as f32 * 10.0, 0.0))));
	assert_eq!(estimate.pattern, MovementPattern::Linear);
	assert!(estimate.confidence > 0.8, "{estimate:?}");

	// Only the last ten samples are scored
	let mut long = history((0..5).map(|i| (0.0, i as f32 * 37.0 % 50.0)));
	long.extend(history((0..10).map(|i| (i as f32 * 10.0, 0.0))).into_iter().map(|mut sample| {
		sample.timestamp_ms += 500;
		sample
	}));
	assert_eq!(MotionPatternClassifier.classify(&long).pattern, MovementPattern::Linear);
}

#[test]
fn test_circular() {
	// Radius 100 around the origin, 5 rad/s sampled every 100ms
	let estimate = MotionPatternClassifier.classify(&history((0..10).map(|i| {
		let angle = i as f32 * 0.5;
		(100.0 * angle.cos(), 100.0 * angle.sin())
	})));

	let MovementPattern::Circular { center, radius, angular_velocity, angle } = estimate.pattern else {
		panic!("expected circular motion, got {estimate:?}");
	};
	assert!(center.distance(&Point::ZERO) < 0.5);
	assert!((radius - 100.0).abs() < 0.5);
	assert!((angular_velocity - 5.0).abs() < 0.05, "{angular_velocity}");
	assert!((angle - normalize_angle(4.5)).abs() < 0.01);

	// 0.7 minus the radial error
	assert!(estimate.confidence > 0.6 && estimate.confidence <= 0.7, "{estimate:?}");
	let error = fit_circle(&history((0..10).map(|i| {
		let angle = i as f32 * 0.5;
		(100.0 * angle.cos(), 100.0 * angle.sin())
	})).iter().map(|sample| sample.position).collect::<Vec<_>>()).unwrap().error;
	assert!(error < 0.1);
}

#[test]
fn test_zigzag() {
	let estimate = MotionPatternClassifier.classify(&history((0..10).map(|i| (i as f32 * 10.0, if i % 2 == 0 { 20.0 } else { -20.0 }))));

	let MovementPattern::Zigzag { amplitude, frequency, .. } = estimate.pattern else {
		panic!("expected zigzag motion, got {estimate:?}");
	};
	assert_eq!(estimate.confidence, 0.8);
	assert!(amplitude > 15.0, "{amplitude}");
	assert!(frequency > 0.0);
}

#[test]
fn test_zigzag_heading_ignores_step_timing() {
	// Same path as a plain zigzag, but one swing is captured over 20ms instead of 100ms
	let mut samples = history((0..10).map(|i| (i as f32 * 10.0, if i % 2 == 0 { 20.0 } else { -20.0 })));
	for sample in samples.iter_mut().skip(2) {
		sample.timestamp_ms -= 80;
	}

	let estimate = MotionPatternClassifier.classify(&samples);
	let MovementPattern::Zigzag { amplitude, .. } = estimate.pattern else {
		panic!("expected zigzag motion, got {estimate:?}");
	};
	assert!((amplitude - 32.5).abs() < 1.0, "{amplitude}");
}

#[test]
fn test_stopping() {
	// Speeds 200, 180, ..., 40 px/s
	let mut x = 0.0;
	let points = (0..10).map(|i| {
		let pt = (x, 0.0);
		x += 20.0 - 2.0 * i as f32;
		pt
	}).collect::<Vec<_>>();

	let estimate = MotionPatternClassifier.classify(&history(points));
	let MovementPattern::Stopping { deceleration } = estimate.pattern else {
		panic!("expected stopping motion, got {estimate:?}");
	};
	assert_eq!(estimate.confidence, 0.8);
	assert!(deceleration >= 100.0);
}

#[test]
fn test_fallback_refinement() {
	let still = MotionPatternClassifier.classify(&history((0..10).map(|_| (300.0, 200.0))));
	assert_eq!(still, PatternEstimate { pattern: MovementPattern::Stationary, confidence: 0.5 });
}

#[test]
fn test_confidence_bounds() {
	let mut seed = 0x2545f491_u32;
	let mut random = move || {
		seed ^= seed << 13;
		seed ^= seed >> 17;
		seed ^= seed << 5;
		(seed % 1000) as f32 - 500.0
	};

	for _ in 0..200 {
		let samples = history((0..10).map(|_| (random(), random())).collect::<Vec<_>>());
		let window = Window::new(&samples).unwrap();
		for estimate in [score_linear(&window), score_circular(&window), score_zigzag(&window), score_stopping(&window)].into_iter().flatten() {
			assert!((0.0..=1.0).contains(&estimate.confidence), "{estimate:?}");
		}
		let estimate = MotionPatternClassifier.classify(&samples);
		assert!((0.0..=1.0).contains(&estimate.confidence));
	}
}
