use crate::prelude::*;

const ERRATIC_BIAS: f32 = 0.1;
const AXIS_BIAS: f32 = 0.15;

/// Field of view spanned by the screen width, for converting pixel offsets to view angles
const HORIZONTAL_FOV_DEGREES: f32 = 90.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssistLevel {
	#[default]
	None,
	Subtle,
	Moderate,
	Significant,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WeaponClass {
	#[default]
	Automatic,
	Precision,
}

/// What the player is doing right now
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerContext {
	pub weapon: WeaponClass,
	pub aiming: bool,
	pub firing: bool,
	pub moving: bool,
}

pub trait PlayerContextProvider: Send {
	fn player_context(&self) -> PlayerContext;
}
impl PlayerContextProvider for PlayerContext {
	#[inline]
	fn player_context(&self) -> PlayerContext {
		*self
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyPart {
	Head,
	Chest,
	Waist,
	Legs,
}
impl BodyPart {
	/// Fraction of the bounding box height, from the top
	pub fn height_ratio(&self) -> f32 {
		match self {
			Self::Head => 0.2,
			Self::Chest => 0.4,
			Self::Waist => 0.6,
			Self::Legs => 0.8,
		}
	}

	pub fn point(&self, rect: &Rect<i32>) -> Point<f32> {
		Point::new(rect.center().x, rect.top as f32 + rect.height() as f32 * self.height_ratio())
	}
}

/// Candidate points on one target
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AimTarget {
	pub current: Option<Point<f32>>,
	pub optimal: Option<Point<f32>>,
	pub predicted: Option<Point<f32>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AimStats {
	pub assists: u64,
	pub significant_corrections: u64,
	pub total_correction_distance: f32,
}
impl AimStats {
	pub fn significant_percentage(&self) -> f32 {
		if self.assists == 0 {
			0.0
		} else {
			self.significant_corrections as f32 / self.assists as f32 * 100.0
		}
	}

	pub fn average_correction_distance(&self) -> f32 {
		if self.assists == 0 {
			0.0
		} else {
			self.total_correction_distance / self.assists as f32
		}
	}
}

/// Pulls a raw aim point toward a target, smoothing successive outputs
pub struct AimCorrector {
	settings: AimSettings,
	profile: AimConfig,
	max_aim_distance: f32,
	last_output: Option<Point<f32>>,
	stats: AimStats,
}
impl AimCorrector {
	pub fn new(settings: AimSettings, profile: AimConfig) -> Self {
		let max_aim_distance = settings.max_aim_distance.unwrap_or_else(|| default_max_aim_distance(settings.screen_width, settings.screen_height));
		Self {
			settings,
			profile,
			max_aim_distance,
			last_output: None,
			stats: AimStats::default(),
		}
	}

	#[inline]
	pub fn set_profile(&mut self, profile: AimConfig) {
		self.profile = profile;
	}

	#[inline]
	pub fn profile(&self) -> &AimConfig {
		&self.profile
	}

	pub fn set_screen_dimensions(&mut self, width: u32, height: u32) {
		self.settings.screen_width = width;
		self.settings.screen_height = height;
		self.max_aim_distance = default_max_aim_distance(width, height);
	}

	#[inline]
	pub fn max_aim_distance(&self) -> f32 {
		self.max_aim_distance
	}

	pub fn strength(&self, level: AssistLevel) -> f32 {
		let strength = match level {
			AssistLevel::None => 0.0,
			AssistLevel::Subtle => self.settings.subtle_strength,
			AssistLevel::Moderate => self.settings.moderate_strength,
			AssistLevel::Significant => self.settings.significant_strength,
		};
		if strength.is_nan() { 0.0 } else { strength.clamp(0.0, 1.0) }
	}

	#[inline]
	pub fn stats(&self) -> AimStats {
		self.stats
	}

	pub fn reset_stats(&mut self) {
		self.stats = AimStats::default();
	}

	/// Forgets the previous output; call when the target is lost or changes
	pub fn reset_smoothing(&mut self) {
		self.last_output = None;
	}

	/// Head point if the profile prefers head tracking, otherwise the chest
	pub fn optimal_point(&self, entity: &TrackedEntity) -> Point<f32> {
		if self.profile.use_headtracking_preference {
			let rect = &entity.rect;
			Point::new(rect.center().x, rect.top as f32 + rect.height() as f32 * self.profile.head_offset_ratio.clamp(0.0, 1.0))
		} else {
			BodyPart::Chest.point(&entity.rect)
		}
	}

	/// Degrees the view would turn to move the crosshair from `from` to `to`
	pub fn view_angle(&self, from: Point<f32>, to: Point<f32>) -> f32 {
		let focal = self.settings.screen_width as f32 / 2.0 / (HORIZONTAL_FOV_DEGREES.to_radians() / 2.0).tan();
		if focal <= 0.0 {
			return 0.0;
		}
		(from.distance(&to) / focal).atan().to_degrees()
	}

	fn choose_target(target: &AimTarget, style: MotionStyle, player: &PlayerContext) -> Option<Point<f32>> {
		let chosen = target.optimal.or(target.current)?;
		match target.predicted {
			Some(predicted) if matches!(style, MotionStyle::Linear | MotionStyle::Strafing) && player.weapon == WeaponClass::Automatic => Some(predicted),
			_ => Some(chosen),
		}
	}

	pub fn correct(&mut self, raw: Point<f32>, target: &AimTarget, style: MotionStyle, level: AssistLevel, player: &PlayerContext) -> Point<f32> {
		self.stats.assists += 1;

		let strength = self.strength(level);
		if strength <= 0.0 || !raw.is_finite() {
			return raw;
		}

		let target = match Self::choose_target(target, style, player) {
			Some(target) if target.is_finite() => target,
			_ => return raw,
		};

		if raw.distance(&target) > self.max_aim_distance {
			return raw;
		}
		if self.view_angle(raw, target) > self.profile.max_assist_angle_degrees {
			return raw;
		}

		let mut corrected = raw.lerp(target, strength);
		match style {
			MotionStyle::Erratic => corrected = corrected.lerp(target, ERRATIC_BIAS),
			MotionStyle::Strafing => corrected.x += (target.x - corrected.x) * AXIS_BIAS,
			MotionStyle::Vertical => corrected.y += (target.y - corrected.y) * AXIS_BIAS,
			_ => {},
		}

		if self.settings.smoothing {
			if let Some(last) = self.last_output {
				let factor = self.profile.aim_smoothing_factor.clamp(0.0, 1.0);
				corrected = last * factor + corrected * (1.0 - factor);
			}
		}

		if !corrected.is_finite() {
			return raw;
		}
		self.last_output = Some(corrected);

		let distance = raw.distance(&corrected);
		if distance > self.settings.significant_correction_px {
			self.stats.significant_corrections += 1;
		}
		self.stats.total_correction_distance += distance;

		corrected
	}

	/// Corrects toward the nearest visible entity within range
	pub fn find_and_assist(&mut self, raw: Point<f32>, entities: &[TrackedEntity], level: AssistLevel, player: &PlayerContext) -> Point<f32> {
		let nearest = entities
			.iter()
			.filter(|entity| entity.visible)
			.map(|entity| (entity, raw.distance(&entity.center)))
			.filter(|(_, distance)| *distance <= self.max_aim_distance)
			.fold(None, |nearest: Option<(&TrackedEntity, f32)>, (entity, distance)| match nearest {
				Some((_, best)) if best <= distance => nearest,
				_ => Some((entity, distance)),
			});

		match nearest {
			Some((entity, _)) => {
				let target = AimTarget {
					current: Some(entity.center),
					optimal: Some(self.optimal_point(entity)),
					predicted: None,
				};
				self.correct(raw, &target, entity.style, level, player)
			},
			None => raw,
		}
	}
}
impl Default for AimCorrector {
	#[inline]
	fn default() -> Self {
		Self::new(AimSettings::default(), AimConfig::default())
	}
}

#[inline]
fn default_max_aim_distance(width: u32, height: u32) -> f32 {
	width.min(height) as f32 / 3.0
}

#[cfg(test)]
fn at(target: (f32, f32)) -> AimTarget {
	AimTarget {
		optimal: Some(Point::new(target.0, target.1)),
		..Default::default()
	}
}

#[test]
fn test_no_assist_is_identity() {
	let mut aim = AimCorrector::default();
	let player = PlayerContext::default();

	for raw in [Point::new(500.0, 500.0), Point::new(-3.5, 1e9), Point::new(f32::NAN, 2.0)] {
		let corrected = aim.correct(raw, &at((510.0, 505.0)), MotionStyle::Erratic, AssistLevel::None, &player);
		assert!(corrected == raw || (corrected.x.is_nan() && raw.x.is_nan()));
	}
	assert_eq!(aim.stats().assists, 3);
}

#[test]
fn test_moderate_halfway() {
	let mut aim = AimCorrector::default();
	let corrected = aim.correct(Point::new(500.0, 500.0), &at((600.0, 500.0)), MotionStyle::Unknown, AssistLevel::Moderate, &PlayerContext::default());
	assert_eq!(corrected, Point::new(550.0, 500.0));
}

#[test]
fn test_range_gate() {
	let mut aim = AimCorrector::default();
	assert_eq!(aim.max_aim_distance(), 360.0);

	let raw = Point::new(100.0, 100.0);
	assert_eq!(aim.correct(raw, &at((100.0, 500.0)), MotionStyle::Unknown, AssistLevel::Significant, &PlayerContext::default()), raw);

	aim.set_screen_dimensions(1920, 1080);
	assert_eq!(aim.max_aim_distance(), 360.0);
	aim.set_screen_dimensions(3000, 1500);
	assert_ne!(aim.correct(raw, &at((100.0, 500.0)), MotionStyle::Unknown, AssistLevel::Significant, &PlayerContext::default()), raw);

	let mut aim = AimCorrector::new(AimSettings { max_aim_distance: Some(50.0), ..Default::default() }, AimConfig::default());
	assert_eq!(aim.correct(raw, &at((160.0, 100.0)), MotionStyle::Unknown, AssistLevel::Significant, &PlayerContext::default()), raw);
}

#[test]
fn test_bad_input() {
	let mut aim = AimCorrector::default();
	let raw = Point::new(500.0, 500.0);
	let player = PlayerContext::default();

	assert_eq!(aim.correct(raw, &AimTarget::default(), MotionStyle::Unknown, AssistLevel::Moderate, &player), raw);
	assert_eq!(aim.correct(raw, &at((f32::INFINITY, 500.0)), MotionStyle::Unknown, AssistLevel::Moderate, &player), raw);
	assert_eq!(aim.correct(raw, &at((f32::NAN, 500.0)), MotionStyle::Unknown, AssistLevel::Moderate, &player), raw);
}

#[test]
fn test_smoothing_converges() {
	let mut aim = AimCorrector::default();
	let player = PlayerContext::default();

	aim.correct(Point::new(400.0, 500.0), &at((440.0, 500.0)), MotionStyle::Unknown, AssistLevel::Moderate, &player);

	let target = Point::new(600.0, 500.0);
	let mut last_distance = f32::INFINITY;
	for _ in 0..30 {
		let corrected = aim.correct(Point::new(500.0, 500.0), &at((600.0, 500.0)), MotionStyle::Unknown, AssistLevel::Moderate, &player);
		let distance = corrected.distance(&target);
		assert!(distance < last_distance, "{distance} >= {last_distance}");
		last_distance = distance;
	}

	// After a reset the unsmoothed candidate comes straight back
	aim.reset_smoothing();
	assert_eq!(aim.correct(Point::new(500.0, 500.0), &at((600.0, 500.0)), MotionStyle::Unknown, AssistLevel::Moderate, &player), Point::new(550.0, 500.0));
}

#[test]
fn test_style_bias() {
	let settings = AimSettings { smoothing: false, ..Default::default() };
	let mut aim = AimCorrector::new(settings, AimConfig::default());
	let player = PlayerContext::default();
	let raw = Point::new(500.0, 500.0);
	let target = at((600.0, 600.0));

	assert_eq!(aim.correct(raw, &target, MotionStyle::Stationary, AssistLevel::Moderate, &player), Point::new(550.0, 550.0));
	assert_eq!(aim.correct(raw, &target, MotionStyle::Erratic, AssistLevel::Moderate, &player), Point::new(555.0, 555.0));
	assert_eq!(aim.correct(raw, &target, MotionStyle::Strafing, AssistLevel::Moderate, &player), Point::new(557.5, 550.0));
	assert_eq!(aim.correct(raw, &target, MotionStyle::Vertical, AssistLevel::Moderate, &player), Point::new(550.0, 557.5));
}

#[test]
fn test_predicted_target_selection() {
	let settings = AimSettings { smoothing: false, ..Default::default() };
	let mut aim = AimCorrector::new(settings, AimConfig::default());
	let raw = Point::new(500.0, 500.0);
	let target = AimTarget {
		current: Some(Point::new(600.0, 540.0)),
		optimal: Some(Point::new(600.0, 500.0)),
		predicted: Some(Point::new(640.0, 500.0)),
	};

	let automatic = PlayerContext::default();
	let precision = PlayerContext { weapon: WeaponClass::Precision, ..Default::default() };

	assert_eq!(aim.correct(raw, &target, MotionStyle::Linear, AssistLevel::Moderate, &automatic), Point::new(570.0, 500.0));
	assert_eq!(aim.correct(raw, &target, MotionStyle::Linear, AssistLevel::Moderate, &precision), Point::new(550.0, 500.0));
	assert_eq!(aim.correct(raw, &target, MotionStyle::Peeking, AssistLevel::Moderate, &automatic), Point::new(550.0, 500.0));

	// No optimal point: aim at the current one
	let current_only = AimTarget { current: Some(Point::new(600.0, 540.0)), ..Default::default() };
	assert_eq!(aim.correct(raw, &current_only, MotionStyle::Unknown, AssistLevel::Moderate, &automatic), Point::new(550.0, 520.0));
}

#[test]
fn test_stats() {
	let settings = AimSettings { smoothing: false, ..Default::default() };
	let mut aim = AimCorrector::new(settings, AimConfig::default());
	let player = PlayerContext::default();

	aim.correct(Point::new(500.0, 500.0), &at((600.0, 500.0)), MotionStyle::Unknown, AssistLevel::Moderate, &player);
	aim.correct(Point::new(500.0, 500.0), &at((520.0, 500.0)), MotionStyle::Unknown, AssistLevel::Moderate, &player);

	let stats = aim.stats();
	assert_eq!(stats.assists, 2);
	assert_eq!(stats.significant_corrections, 1);
	assert_eq!(stats.total_correction_distance, 60.0);
	assert_eq!(stats.significant_percentage(), 50.0);
	assert_eq!(stats.average_correction_distance(), 30.0);

	aim.reset_stats();
	assert_eq!(aim.stats(), AimStats::default());
}

#[test]
fn test_find_and_assist() {
	let mut tracker = EntityTracker::default();
	let entities = tracker.update(&[
		DetectionRegion::new(Rect::new(580, 450, 620, 550), DetectionMethod::Color),
		DetectionRegion::new(Rect::new(280, 450, 320, 550), DetectionMethod::Color),
	], 0);

	let mut aim = AimCorrector::new(AimSettings { smoothing: false, ..Default::default() }, AimConfig::default());
	let player = PlayerContext::default();

	// Nearest is the first box; its head point is 20% down
	let corrected = aim.find_and_assist(Point::new(500.0, 470.0), &entities, AssistLevel::Moderate, &player);
	assert_eq!(corrected, Point::new(550.0, 470.0));

	let mut chest = AimCorrector::new(AimSettings { smoothing: false, ..Default::default() }, AimConfig { use_headtracking_preference: false, ..Default::default() });
	assert_eq!(chest.find_and_assist(Point::new(600.0, 490.0), &entities, AssistLevel::Significant, &player), Point::new(600.0, 490.0));

	assert_eq!(aim.find_and_assist(Point::new(1000.0, 2000.0), &entities, AssistLevel::Moderate, &player), Point::new(1000.0, 2000.0));
}

#[test]
fn test_assist_angle_gate() {
	let settings = AimSettings { smoothing: false, ..Default::default() };
	let raw = Point::new(500.0, 500.0);
	let player = PlayerContext::default();

	// 1080 px wide at 90 degrees: 150 px off is a little over 15 degrees, well inside the range gate
	let mut aim = AimCorrector::new(settings.clone(), AimConfig::default());
	assert!(aim.view_angle(raw, Point::new(650.0, 500.0)) > 15.0);
	assert_eq!(aim.correct(raw, &at((650.0, 500.0)), MotionStyle::Unknown, AssistLevel::Moderate, &player), raw);
	assert_eq!(aim.correct(raw, &at((640.0, 500.0)), MotionStyle::Unknown, AssistLevel::Moderate, &player), Point::new(570.0, 500.0));

	let mut wide = AimCorrector::new(settings, AimConfig { max_assist_angle_degrees: 20.0, ..Default::default() });
	assert_eq!(wide.correct(raw, &at((650.0, 500.0)), MotionStyle::Unknown, AssistLevel::Moderate, &player), Point::new(575.0, 500.0));
}

#[test]
fn test_profile_head_offset() {
	let mut tracker = EntityTracker::default();
	let entities = tracker.update(&[DetectionRegion::new(Rect::new(100, 100, 140, 200), DetectionMethod::Color)], 0);

	let aim = AimCorrector::new(AimSettings::default(), AimConfig { head_offset_ratio: 0.1, ..Default::default() });
	assert_eq!(aim.optimal_point(&entities[0]), Point::new(120.0, 110.0));

	let aim = AimCorrector::default();
	assert_eq!(aim.optimal_point(&entities[0]), entities[0].aim_point);
}
