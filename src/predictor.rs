use crate::prelude::*;

/// Fewer samples than this and there is no motion to extrapolate
pub const MIN_SAMPLES: usize = 3;

/// Patterns classified with less confidence are extrapolated linearly
const PATTERN_CONFIDENCE: f32 = 0.6;

#[derive(Clone, Copy, Debug, Default)]
pub struct PositionPredictor;
impl PositionPredictor {
	/// Where the entity's centre will be `lead_time_ms` from its latest sample
	pub fn predict(&self, entity: &TrackedEntity, lead_time_ms: u64) -> Option<Point<f32>> {
		if entity.history.len() < MIN_SAMPLES {
			return None;
		}

		let t = lead_time_ms as f32 / 1000.0;
		let position = entity.center;
		let velocity = entity.velocity;

		let predicted = if entity.pattern.confidence > PATTERN_CONFIDENCE {
			match entity.pattern.pattern {
				MovementPattern::Linear => position + velocity * t + entity.acceleration * (0.5 * t * t),

				MovementPattern::Circular { center, radius, angular_velocity, angle } => {
					let angle = angle + angular_velocity * t;
					center + Point::new(angle.cos(), angle.sin()) * radius
				},

				MovementPattern::Zigzag { base_velocity, amplitude, frequency, phase } => {
					let offset = match base_velocity.normalized() {
						Some(direction) => direction.perpendicular() * (amplitude * (phase + frequency * t).sin()),
						None => Point::ZERO,
					};
					position + base_velocity * t + offset
				},

				MovementPattern::Stopping { deceleration } => position + stopping_displacement(velocity, deceleration, t),

				MovementPattern::Stationary => position,

				MovementPattern::Erratic => position + velocity * (0.5 * t),
			}
		} else {
			position + velocity * t
		};

		if predicted.is_finite() {
			Some(predicted)
		} else {
			log::debug!("discarding non-finite prediction for entity {}", entity.id);
			Some(position)
		}
	}

	/// `predict`, shifted from the centre to the entity's aim point
	pub fn predict_aim_point(&self, entity: &TrackedEntity, lead_time_ms: u64) -> Option<Point<f32>> {
		self.predict(entity, lead_time_ms).map(|center| center + (entity.aim_point - entity.center))
	}
}

/// Constant deceleration along the current heading, never reversing
fn stopping_displacement(velocity: Point<f32>, deceleration: f32, t: f32) -> Point<f32> {
	let speed = velocity.length();
	let direction = match velocity.normalized() {
		Some(direction) if deceleration > 0.0 => direction,
		_ => return velocity * t,
	};

	let time_to_stop = speed / deceleration;
	let distance = if t >= time_to_stop {
		speed * speed / (2.0 * deceleration)
	} else {
		let reduced = speed - deceleration * t;
		(speed + reduced) / 2.0 * t
	};

	direction * distance
}

#[cfg(test)]
fn entity(pattern: MovementPattern, confidence: f32, velocity: Point<f32>) -> TrackedEntity {
	let mut tracker = EntityTracker::default();
	for i in 0..3 {
		tracker.update(&[DetectionRegion::new(Rect::new(80, 60, 120, 140), DetectionMethod::Motion)], i * 100);
	}

	let mut entity = tracker.snapshot().remove(0);
	entity.pattern = PatternEstimate { pattern, confidence };
	entity.velocity = velocity;
	entity.acceleration = Point::new(0.0, 100.0);
	entity
}

#[cfg(test)]
fn assert_near(a: Option<Point<f32>>, b: Point<f32>) {
	let a = a.unwrap();
	assert!(a.distance(&b) < 1e-3, "{a:?} != {b:?}");
}

#[test]
fn test_needs_history() {
	let mut tracker = EntityTracker::default();
	let rect = DetectionRegion::new(Rect::new(80, 60, 120, 140), DetectionMethod::Motion);
	tracker.update(&[rect.clone()], 0);
	tracker.update(&[rect], 100);
	assert!(PositionPredictor.predict(&tracker.snapshot()[0], 200).is_none());
}

#[test]
fn test_linear() {
	let predictor = PositionPredictor;

	// Confident: acceleration counts
	let e = entity(MovementPattern::Linear, 0.9, Point::new(100.0, 0.0));
	assert_near(predictor.predict(&e, 200), Point::new(120.0, 102.0));

	// Unsure: velocity only
	let e = entity(MovementPattern::Linear, 0.5, Point::new(100.0, 0.0));
	assert_near(predictor.predict(&e, 200), Point::new(120.0, 100.0));

	let e = entity(MovementPattern::Stationary, 0.5, Point::new(100.0, 0.0));
	assert_near(predictor.predict(&e, 200), Point::new(120.0, 100.0));

	// Aim point keeps its offset from the centre
	assert_near(predictor.predict_aim_point(&e, 200), Point::new(120.0, 76.0));
}

#[test]
fn test_circular() {
	let e = entity(
		MovementPattern::Circular {
			center: Point::ZERO,
			radius: 100.0,
			angular_velocity: core::f32::consts::PI,
			angle: 0.0,
		},
		0.7,
		Point::new(0.0, 314.0),
	);
	assert_near(PositionPredictor.predict(&e, 500), Point::new(0.0, 100.0));
}

#[test]
fn test_zigzag() {
	let e = entity(
		MovementPattern::Zigzag {
			base_velocity: Point::new(100.0, 0.0),
			amplitude: 20.0,
			frequency: core::f32::consts::PI,
			phase: 0.0,
		},
		0.8,
		Point::new(100.0, 0.0),
	);

	// Perpendicular to (1, 0) is (0, 1); sin(PI / 2) = 1
	assert_near(PositionPredictor.predict(&e, 500), Point::new(150.0, 120.0));
}

#[test]
fn test_stopping() {
	let e = entity(MovementPattern::Stopping { deceleration: 200.0 }, 0.8, Point::new(100.0, 0.0));

	// Stops after 0.5s having covered 25px
	assert_near(PositionPredictor.predict(&e, 1000), Point::new(125.0, 100.0));

	// Halfway: average of 100 and 50 px/s over 0.25s
	assert_near(PositionPredictor.predict(&e, 250), Point::new(100.0 + 18.75, 100.0));
}

#[test]
fn test_stationary_and_erratic() {
	let e = entity(MovementPattern::Stationary, 0.9, Point::new(100.0, 0.0));
	assert_near(PositionPredictor.predict(&e, 500), Point::new(100.0, 100.0));

	let e = entity(MovementPattern::Erratic, 0.9, Point::new(100.0, 40.0));
	assert_near(PositionPredictor.predict(&e, 500), Point::new(125.0, 110.0));
}
