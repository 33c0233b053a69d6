use crate::prelude::*;
use crate::pattern::classify_style;

const VELOCITY_SMOOTHING: f32 = 0.7;

const DEFAULT_HEALTH: u32 = 100;
const DEFAULT_THREAT_LEVEL: f32 = 0.5;

/// Detections whose area differs from an entity's by this fraction or more never match it
const MAX_AREA_DIFFERENCE: f32 = 0.5;

const DEFAULT_SCREEN: (u32, u32) = (1080, 2340);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);
impl std::fmt::Display for EntityId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "#{}", self.0)
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
	pub position: Point<f32>,
	pub timestamp_ms: u64,

	/// Instantaneous velocity from the previous sample, px/s
	pub velocity: Option<Point<f32>>,
}

#[derive(Clone, Debug)]
pub struct TrackedEntity {
	pub id: EntityId,

	pub rect: Rect<i32>,
	pub center: Point<f32>,

	/// Approximate head position
	pub aim_point: Point<f32>,

	/// Smoothed, px/s
	pub velocity: Point<f32>,

	/// From unsmoothed velocities, px/s^2
	pub acceleration: Point<f32>,

	pub pattern: PatternEstimate,
	pub style: MotionStyle,

	/// Oldest first
	pub history: VecDeque<Sample>,

	pub visible: bool,
	pub last_seen_ms: u64,

	pub health: u32,
	pub threat_level: f32,
}
impl TrackedEntity {
	fn new(id: EntityId, rect: Rect<i32>, timestamp_ms: u64, head_offset: f32) -> Self {
		let center = rect.center();

		let mut history = VecDeque::new();
		history.push_back(Sample {
			position: center,
			timestamp_ms,
			velocity: None,
		});

		Self {
			id,
			rect,
			center,
			aim_point: head_point(&rect, head_offset),
			velocity: Point::ZERO,
			acceleration: Point::ZERO,
			pattern: PatternEstimate::default(),
			style: MotionStyle::Unknown,
			history,
			visible: true,
			last_seen_ms: timestamp_ms,
			health: DEFAULT_HEALTH,
			threat_level: DEFAULT_THREAT_LEVEL,
		}
	}

	fn observe(&mut self, rect: Rect<i32>, timestamp_ms: u64, head_offset: f32, settings: &TrackerSettings, screen: (u32, u32)) {
		let center = rect.center();

		self.rect = rect;
		self.center = center;
		self.aim_point = head_point(&rect, head_offset);
		self.visible = true;

		let last = match self.history.back_mut() {
			Some(last) => last,
			None => {
				self.history.push_back(Sample { position: center, timestamp_ms, velocity: None });
				self.last_seen_ms = timestamp_ms;
				return;
			}
		};

		if timestamp_ms < last.timestamp_ms {
			// Late detection, the bounds are still the freshest we have
			return;
		}

		if timestamp_ms == last.timestamp_ms {
			last.position = center;
			self.last_seen_ms = timestamp_ms;
			return;
		}

		let dt = (timestamp_ms - last.timestamp_ms) as f32 / 1000.0;
		let velocity = (center - last.position) / dt;

		self.velocity = match last.velocity {
			Some(previous) => {
				self.acceleration = (velocity - previous) / dt;
				velocity * VELOCITY_SMOOTHING + self.velocity * (1.0 - VELOCITY_SMOOTHING)
			},
			None => velocity,
		};

		self.history.push_back(Sample {
			position: center,
			timestamp_ms,
			velocity: Some(velocity),
		});
		self.last_seen_ms = timestamp_ms;

		while self.history.len() > settings.history_capacity.max(1) {
			self.history.pop_front();
		}
		while let Some(oldest) = self.history.front() {
			if timestamp_ms - oldest.timestamp_ms <= settings.history_max_age_ms {
				break;
			}
			self.history.pop_front();
		}

		self.style = classify_style(&self.history);
		self.threat_level = self.estimate_threat(screen);
	}

	/// Threat from motion style, speed, apparent size and distance from the screen centre
	fn estimate_threat(&self, screen: (u32, u32)) -> f32 {
		if self.history.len() < 2 {
			return DEFAULT_THREAT_LEVEL;
		}

		let style = match self.style {
			MotionStyle::Stationary => 0.8,
			MotionStyle::Erratic => 1.2,
			MotionStyle::Strafing | MotionStyle::Circling | MotionStyle::Peeking => 1.1,
			_ => 1.0,
		};

		let speed = if self.history.len() < 3 {
			1.0
		} else {
			let speeds = self.history.iter().filter_map(|sample| sample.velocity).map(|velocity| velocity.length()).collect::<Vec<_>>();
			let mean = speeds.iter().sum::<f32>() / speeds.len().max(1) as f32;
			if mean < 10.0 {
				0.9
			} else if mean > 200.0 {
				1.3
			} else if mean > 100.0 {
				1.2
			} else {
				1.0
			}
		};

		let (width, height) = (screen.0.max(1) as f32, screen.1.max(1) as f32);

		// Bigger on screen is closer
		let coverage = self.rect.width() as f32 * self.rect.height() as f32 / (width * height);
		let size = if coverage > 0.1 {
			1.5
		} else if coverage > 0.05 {
			1.3
		} else if coverage > 0.02 {
			1.2
		} else {
			1.0
		};

		let half_diagonal = (width * width + height * height).sqrt() / 2.0;
		let offset = (self.center.distance(&Point::new(width / 2.0, height / 2.0)) / half_diagonal).min(1.0);
		let proximity = 1.5 - 0.5 * offset;

		let threat = DEFAULT_THREAT_LEVEL * style * speed * size * proximity;
		if threat.is_finite() { threat.clamp(0.0, 1.0) } else { DEFAULT_THREAT_LEVEL }
	}

	#[inline]
	pub fn time_since_seen(&self, now_ms: u64) -> u64 {
		now_ms.saturating_sub(self.last_seen_ms)
	}

	#[inline]
	pub fn speed(&self) -> f32 {
		self.velocity.length()
	}

	/// Lowers the estimated health, flooring at zero
	pub fn hit(&mut self, damage: u32) {
		self.health = self.health.saturating_sub(damage);
	}

	pub fn set_threat_level(&mut self, level: f32) {
		self.threat_level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
	}

	fn expired(&self, now_ms: u64, settings: &TrackerSettings) -> bool {
		let unseen = self.time_since_seen(now_ms);
		unseen > settings.eviction_timeout_ms || unseen > settings.history_max_age_ms
	}
}

fn head_point(rect: &Rect<i32>, head_offset: f32) -> Point<f32> {
	Point::new(rect.center().x, rect.top as f32 + rect.height() as f32 * head_offset)
}

/// Owns every tracked entity and associates each frame's detections with them
///
/// Each detection, in order, is matched to the nearest not-yet-matched entity
/// whose centre lies closer than the detection's longer side and whose area is
/// within half of the detection's; ties go to the lowest id. Unmatched
/// detections start new entities.
///
/// Threat levels are re-estimated on every observation, so `set_threat_level`
/// only holds until the entity is next seen.
pub struct EntityTracker {
	settings: TrackerSettings,
	head_offset: f32,
	screen: (u32, u32),
	entities: BTreeMap<EntityId, TrackedEntity>,
	next_id: u64,
}
impl EntityTracker {
	pub fn new(settings: TrackerSettings) -> Self {
		Self {
			settings,
			head_offset: GameDetectionConfig::default().head_target_offset_percent,
			screen: DEFAULT_SCREEN,
			entities: BTreeMap::new(),
			next_id: 0,
		}
	}

	#[inline]
	pub fn settings(&self) -> &TrackerSettings {
		&self.settings
	}

	/// Fraction of the box height, from the top, where the aim point sits
	#[inline]
	pub fn set_head_offset(&mut self, head_offset: f32) {
		self.head_offset = head_offset.clamp(0.0, 1.0);
	}

	/// Size of the frames detections come from
	#[inline]
	pub fn set_screen_dimensions(&mut self, width: u32, height: u32) {
		self.screen = (width, height);
	}

	pub fn update(&mut self, detections: &[DetectionRegion], timestamp_ms: u64) -> Vec<TrackedEntity> {
		// Anything unseen past its grace period goes first, whether or not it was reported lost
		let settings = &self.settings;
		self.entities.retain(|id, entity| {
			let evict = entity.expired(timestamp_ms, settings);
			if evict {
				log::debug!("evicting entity {id} after {}ms unseen", entity.time_since_seen(timestamp_ms));
			}
			!evict
		});

		let mut matched = BTreeSet::new();
		for detection in detections {
			let rect = detection.rect;
			if rect.is_empty() {
				continue;
			}

			let center = rect.center();
			let threshold = rect.width().max(rect.height()) as f32;
			let area = rect.width() as f32 * rect.height() as f32;

			let mut nearest: Option<(EntityId, f32)> = None;
			for (id, entity) in self.entities.iter() {
				if matched.contains(id) {
					continue;
				}
				if (entity.rect.width() as f32 * entity.rect.height() as f32 - area).abs() / area >= MAX_AREA_DIFFERENCE {
					continue;
				}
				let distance = entity.center.distance(&center);
				if distance < threshold && nearest.map_or(true, |(_, nearest)| distance < nearest) {
					nearest = Some((*id, distance));
				}
			}

			match nearest.and_then(|(id, _)| self.entities.get_mut(&id)) {
				Some(entity) => {
					entity.observe(rect, timestamp_ms, self.head_offset, &self.settings, self.screen);
					matched.insert(entity.id);
				},
				None => {
					let id = EntityId(self.next_id);
					self.next_id += 1;

					log::debug!("tracking new entity {id} at {rect:?}");
					self.entities.insert(id, TrackedEntity::new(id, rect, timestamp_ms, self.head_offset));
					matched.insert(id);
				},
			}
		}

		for (id, entity) in self.entities.iter_mut() {
			if entity.visible && !matched.contains(id) {
				log::debug!("lost sight of entity {id}");
				entity.visible = false;
			}
		}

		self.snapshot()
	}

	/// Marks visible entities unseen past the timeout as not visible and removes timed out entities that already were
	pub fn evict(&mut self, timestamp_ms: u64) {
		let settings = &self.settings;
		self.entities.retain(|id, entity| {
			if !entity.expired(timestamp_ms, settings) {
				return true;
			}
			if entity.visible {
				log::debug!("lost sight of entity {id}");
				entity.visible = false;
				true
			} else {
				log::debug!("evicting entity {id} after {}ms unseen", entity.time_since_seen(timestamp_ms));
				false
			}
		});
	}

	/// Reclassifies the movement of every visible entity
	pub fn classify(&mut self, classifier: &MotionPatternClassifier) {
		for entity in self.entities.values_mut().filter(|entity| entity.visible) {
			entity.pattern = classifier.classify(&entity.history);
		}
	}

	/// Copies of every entity, in id order
	pub fn snapshot(&self) -> Vec<TrackedEntity> {
		self.entities.values().cloned().collect()
	}

	#[inline]
	pub fn get(&self, id: EntityId) -> Option<&TrackedEntity> {
		self.entities.get(&id)
	}

	pub fn visible(&self) -> impl Iterator<Item = &TrackedEntity> + '_ {
		self.entities.values().filter(|entity| entity.visible)
	}

	/// Highest threat level among visible entities, ties to the lowest id
	pub fn most_threatening(&self) -> Option<&TrackedEntity> {
		self.visible().fold(None, |best: Option<&TrackedEntity>, entity| match best {
			Some(best) if best.threat_level >= entity.threat_level => Some(best),
			_ => Some(entity),
		})
	}

	pub fn hit(&mut self, id: EntityId, damage: u32) -> bool {
		match self.entities.get_mut(&id) {
			Some(entity) => {
				entity.hit(damage);
				true
			},
			None => false,
		}
	}

	pub fn set_threat_level(&mut self, id: EntityId, level: f32) -> bool {
		match self.entities.get_mut(&id) {
			Some(entity) => {
				entity.set_threat_level(level);
				true
			},
			None => false,
		}
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.entities.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.entities.is_empty()
	}

	/// Forgets every entity; ids are never reused
	pub fn reset(&mut self) {
		self.entities.clear();
	}
}
impl Default for EntityTracker {
	#[inline]
	fn default() -> Self {
		Self::new(TrackerSettings::default())
	}
}

#[cfg(test)]
fn region(left: i32, top: i32, right: i32, bottom: i32) -> DetectionRegion {
	DetectionRegion::new(Rect::new(left, top, right, bottom), DetectionMethod::Color)
}

#[test]
fn test_new_entity() {
	let mut tracker = EntityTracker::default();
	let entities = tracker.update(&[region(100, 100, 150, 200)], 0);

	assert_eq!(entities.len(), 1);
	let entity = &entities[0];
	assert_eq!(entity.center, Point::new(125.0, 150.0));
	assert_eq!(entity.aim_point, Point::new(125.0, 120.0));
	assert_eq!(entity.history.len(), 1);
	assert_eq!(entity.velocity, Point::ZERO);
	assert!(entity.visible);
	assert_eq!(entity.health, 100);
}

#[test]
fn test_velocity() {
	let mut tracker = EntityTracker::default();
	tracker.update(&[region(-10, -20, 10, 20)], 0);
	tracker.update(&[region(0, -20, 20, 20)], 100);
	let entities = tracker.update(&[region(10, -20, 30, 20)], 200);

	assert_eq!(entities.len(), 1);
	let entity = &entities[0];
	assert!(entity.velocity.distance(&Point::new(100.0, 0.0)) < 1e-3, "{:?}", entity.velocity);
	assert!(entity.acceleration.length() < 1e-3);
	assert_eq!(entity.history.iter().map(|sample| sample.position.x).collect::<Vec<_>>(), vec![0.0, 10.0, 20.0]);

	// Speeding up: acceleration follows the raw velocities, velocity is smoothed
	let entities = tracker.update(&[region(30, -20, 50, 20)], 300);
	let entity = &entities[0];
	assert!((entity.acceleration.x - 1000.0).abs() < 1e-2, "{:?}", entity.acceleration);
	assert!((entity.velocity.x - 170.0).abs() < 1e-3, "{:?}", entity.velocity);
}

#[test]
fn test_linear_entity_classification() {
	let mut tracker = EntityTracker::default();
	for i in 0..10 {
		tracker.update(&[region(i * 10, 300, i * 10 + 40, 380)], i as u64 * 100);
	}
	tracker.classify(&MotionPatternClassifier);

	let entity = tracker.get(EntityId(0)).unwrap();
	assert_eq!(entity.pattern.pattern, MovementPattern::Linear);
	assert!(entity.pattern.confidence > 0.8);
}

#[test]
fn test_history_bounds() {
	let mut tracker = EntityTracker::default();
	for i in 0..50 {
		tracker.update(&[region(i * 2, 0, i * 2 + 40, 80)], i as u64 * 16);
	}
	let entity = tracker.get(EntityId(0)).unwrap();
	assert_eq!(entity.history.len(), 20);

	// Sparse updates age the history out before it fills up
	let mut tracker = EntityTracker::new(TrackerSettings { eviction_timeout_ms: 10_000, ..Default::default() });
	for i in 0..10 {
		tracker.update(&[region(0, 0, 40, 80)], i * 2000);
	}
	let entity = tracker.get(EntityId(0)).unwrap();
	let first = entity.history.front().unwrap().timestamp_ms;
	let last = entity.history.back().unwrap().timestamp_ms;
	assert!(last - first <= 5000);
	assert_eq!(entity.history.len(), 3);
}

#[test]
fn test_lost_then_evicted() {
	let mut tracker = EntityTracker::default();
	tracker.update(&[region(100, 100, 150, 200)], 0);

	let entities = tracker.update(&[], 100);
	assert_eq!(entities.len(), 1);
	assert!(!entities[0].visible);
	assert_eq!(entities[0].time_since_seen(100), 100);

	// Still inside the grace period
	assert_eq!(tracker.update(&[], 2000).len(), 1);

	assert!(tracker.update(&[], 3200).is_empty());
}

#[test]
fn test_evict() {
	let mut tracker = EntityTracker::default();
	tracker.update(&[region(100, 100, 150, 200)], 0);

	tracker.evict(1000);
	assert!(tracker.get(EntityId(0)).unwrap().visible);

	// Observed as lost before it disappears
	tracker.evict(3500);
	assert!(!tracker.get(EntityId(0)).unwrap().visible);

	tracker.evict(3600);
	assert!(tracker.is_empty());
}

#[test]
fn test_reacquire() {
	let mut tracker = EntityTracker::default();
	tracker.update(&[region(100, 100, 150, 200)], 0);
	tracker.update(&[], 100);

	let entities = tracker.update(&[region(105, 100, 155, 200)], 200);
	assert_eq!(entities.len(), 1);
	assert_eq!(entities[0].id, EntityId(0));
	assert!(entities[0].visible);
}

#[test]
fn test_association_is_deterministic() {
	let mut tracker = EntityTracker::default();
	tracker.update(&[region(100, 100, 140, 180), region(300, 100, 340, 180)], 0);

	// Both detections moved right, the second one far enough to start a new entity
	let entities = tracker.update(&[region(110, 100, 150, 180), region(500, 100, 540, 180)], 100);
	assert_eq!(entities.iter().map(|entity| (entity.id, entity.visible)).collect::<Vec<_>>(), vec![
		(EntityId(0), true),
		(EntityId(1), false),
		(EntityId(2), true),
	]);

	// Equidistant from both entities: the lower id wins, the other detection takes the rest
	let mut tracker = EntityTracker::default();
	tracker.update(&[region(100, 100, 140, 180), region(160, 100, 200, 180)], 0);
	let entities = tracker.update(&[region(130, 100, 170, 180), region(130, 100, 170, 180)], 100);
	assert_eq!(entities.len(), 2);
	assert_eq!(entities[0].center, Point::new(150.0, 140.0));
	assert_eq!(entities[1].center, Point::new(150.0, 140.0));
	assert!(entities.iter().all(|entity| entity.visible && entity.history.len() == 2));

	// Degenerate detections are ignored
	assert_eq!(tracker.update(&[region(10, 10, 10, 50)], 200).iter().filter(|entity| entity.visible).count(), 0);
}

#[test]
fn test_threat_and_health() {
	let mut tracker = EntityTracker::default();
	tracker.update(&[region(100, 100, 140, 180), region(300, 100, 340, 180), region(500, 100, 540, 180)], 0);

	assert_eq!(tracker.most_threatening().map(|entity| entity.id), Some(EntityId(0)));

	assert!(tracker.set_threat_level(EntityId(2), 0.9));
	assert!(tracker.set_threat_level(EntityId(1), 0.9));
	assert_eq!(tracker.most_threatening().map(|entity| entity.id), Some(EntityId(1)));

	assert!(tracker.set_threat_level(EntityId(0), 7.0));
	assert_eq!(tracker.get(EntityId(0)).unwrap().threat_level, 1.0);

	// Lost entities are never the most threatening
	tracker.update(&[region(300, 100, 340, 180)], 100);
	assert_eq!(tracker.most_threatening().map(|entity| entity.id), Some(EntityId(1)));

	assert!(tracker.hit(EntityId(1), 30));
	assert!(tracker.hit(EntityId(1), 90));
	assert_eq!(tracker.get(EntityId(1)).unwrap().health, 0);
	assert!(!tracker.hit(EntityId(9), 1));

	tracker.reset();
	assert_eq!(tracker.len(), 0);
	assert_eq!(tracker.update(&[region(0, 0, 40, 80)], 200)[0].id, EntityId(3));
}

#[test]
fn test_expires_after_single_long_gap() {
	let mut tracker = EntityTracker::default();
	tracker.update(&[region(100, 100, 150, 200)], 0);

	// Never reported lost in between, still gone once past the timeout
	assert!(tracker.update(&[], 4000).is_empty());

	// A detection at the same spot after the gap starts a new entity
	let mut tracker = EntityTracker::default();
	tracker.update(&[region(100, 100, 150, 200)], 0);
	let entities = tracker.update(&[region(100, 100, 150, 200)], 3500);
	assert_eq!(entities.len(), 1);
	assert_eq!(entities[0].id, EntityId(1));
}

#[test]
fn test_size_change_starts_new_entity() {
	let mut tracker = EntityTracker::default();
	tracker.update(&[region(100, 100, 140, 180)], 0);

	// Same centre, four times the area
	let entities = tracker.update(&[region(80, 60, 160, 220)], 100);
	assert_eq!(entities.iter().map(|entity| (entity.id, entity.visible)).collect::<Vec<_>>(), vec![
		(EntityId(0), false),
		(EntityId(1), true),
	]);

	// A modest size change keeps the id
	let entities = tracker.update(&[region(85, 65, 165, 225)], 200);
	assert_eq!(entities.iter().filter(|entity| entity.visible).map(|entity| entity.id).collect::<Vec<_>>(), vec![EntityId(1)]);
}

#[test]
fn test_threat_estimate() {
	let mut tracker = EntityTracker::default();
	tracker.set_screen_dimensions(1080, 2340);

	for i in 0..10 {
		// Small and idle in a corner, large and fast near the centre
		tracker.update(&[
			region(50, 50, 90, 130),
			region(440 + i * 40, 970, 640 + i * 40, 1370),
		], i as u64 * 100);
	}

	let idle = tracker.get(EntityId(0)).unwrap();
	let rushing = tracker.get(EntityId(1)).unwrap();
	assert_eq!(idle.style, MotionStyle::Stationary);
	assert!(idle.threat_level < 0.5, "{}", idle.threat_level);
	assert!(rushing.threat_level > idle.threat_level, "{} <= {}", rushing.threat_level, idle.threat_level);
	assert!((0.0..=1.0).contains(&rushing.threat_level));
	assert_eq!(tracker.most_threatening().map(|entity| entity.id), Some(EntityId(1)));
}
