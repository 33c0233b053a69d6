use crate::prelude::*;
use crate::detector::ObjectDetector;

/// Everything learned from one frame
#[derive(Clone, Debug)]
pub struct FrameResult {
	pub timestamp_ms: u64,
	pub regions: Vec<DetectionRegion>,
	pub entities: Vec<TrackedEntity>,

	/// Aim point of each entity predicted at the lead time
	pub predictions: Vec<(EntityId, Point<f32>)>,

	pub timeshares: Timeshares,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AimDecision {
	pub target: Option<EntityId>,
	pub point: Point<f32>,
	pub strength: f32,
	pub stats: AimStats,
}

/// One game session: the whole pipeline and the state it carries between frames
pub struct Session {
	game_id: Box<str>,
	profile: GameProfile,
	lead_time_ms: u64,

	detector: RegionDetector,
	tracker: EntityTracker,
	classifier: MotionPatternClassifier,
	predictor: PositionPredictor,
	aim: AimCorrector,
	player: Box<dyn PlayerContextProvider>,

	last_timestamp_ms: Option<u64>,
	aim_target: Option<EntityId>,
}
impl Session {
	pub fn new(settings: &Settings, registry: &ProfileRegistry, game_id: &str) -> Self {
		let profile = registry.get(game_id).clone();
		if !registry.contains(game_id) {
			log::info!("no profile for {game_id}, using defaults");
		}

		let mut tracker = EntityTracker::new(settings.tracker.clone());
		tracker.set_head_offset(profile.detection.head_target_offset_percent);

		Self {
			game_id: Box::from(game_id),
			lead_time_ms: settings.lead_time_ms,
			detector: RegionDetector::new(CpuImageOps, settings.detector.clone()),
			tracker,
			classifier: MotionPatternClassifier,
			predictor: PositionPredictor,
			aim: AimCorrector::new(settings.aim.clone(), profile.aim.clone()),
			player: Box::new(PlayerContext::default()),
			profile,
			last_timestamp_ms: None,
			aim_target: None,
		}
	}

	/// Adds the learned-model pass
	pub fn with_model<D: ObjectDetector + 'static>(mut self, detector: D) -> Result<Self, Error> {
		self.detector = self.detector.with_model(detector)?;
		Ok(self)
	}

	pub fn with_player<P: PlayerContextProvider + 'static>(mut self, player: P) -> Self {
		self.player = Box::new(player);
		self
	}

	#[inline]
	pub fn game_id(&self) -> &str {
		&self.game_id
	}

	#[inline]
	pub fn profile(&self) -> &GameProfile {
		&self.profile
	}

	#[inline]
	pub fn detector(&self) -> &RegionDetector {
		&self.detector
	}

	#[inline]
	pub fn tracker(&self) -> &EntityTracker {
		&self.tracker
	}

	#[inline]
	pub fn tracker_mut(&mut self) -> &mut EntityTracker {
		&mut self.tracker
	}

	#[inline]
	pub fn aim_corrector(&mut self) -> &mut AimCorrector {
		&mut self.aim
	}

	/// Drops all frame-to-frame state
	pub fn reset(&mut self) {
		self.detector.reset();
		self.tracker.reset();
		self.aim.reset_smoothing();
		self.last_timestamp_ms = None;
		self.aim_target = None;
	}

	/// Runs detection, tracking, classification and prediction over `frame`
	///
	/// Frames not newer than the last processed one are ignored.
	pub fn process(&mut self, frame: Arc<Frame>) -> Option<FrameResult> {
		let timestamp_ms = frame.timestamp_ms;
		if matches!(self.last_timestamp_ms, Some(last) if timestamp_ms <= last) {
			log::debug!("dropping out-of-order frame at {timestamp_ms}ms");
			return None;
		}
		self.last_timestamp_ms = Some(timestamp_ms);
		self.tracker.set_screen_dimensions(frame.image.width(), frame.image.height());

		let regions = self.detector.detect(frame, &self.profile.detection);

		let mut timeshares = self.detector.timeshares().clone();

		let (tracker, classifier) = (&mut self.tracker, &self.classifier);
		let entities = debug_waterfall!(timeshares, track => {
			tracker.update(&regions, timestamp_ms);
			tracker.classify(classifier);
			tracker.snapshot()
		});

		let predictions = debug_waterfall!(timeshares, predict => entities
			.iter()
			.filter(|entity| entity.visible)
			.filter_map(|entity| self.predictor.predict_aim_point(entity, self.lead_time_ms).map(|point| (entity.id, point)))
			.collect::<Vec<_>>());

		log::trace!("{timestamp_ms}ms: {} regions, {} entities, {} predictions", regions.len(), entities.len(), predictions.len());

		Some(FrameResult {
			timestamp_ms,
			regions,
			entities,
			predictions,
			timeshares,
		})
	}

	/// Corrects `raw` toward the most threatening visible entity, the one nearest `raw` among equals
	pub fn aim(&mut self, raw: Point<f32>, level: AssistLevel) -> AimDecision {
		let target = self.tracker.visible().fold(None, |best: Option<&TrackedEntity>, entity| match best {
			Some(best) if best.threat_level > entity.threat_level => Some(best),
			Some(best) if best.threat_level == entity.threat_level && best.center.distance(&raw) <= entity.center.distance(&raw) => Some(best),
			_ => Some(entity),
		});

		let target_id = target.map(|entity| entity.id);
		if target_id != self.aim_target {
			log::debug!("aim target changed from {:?} to {:?}", self.aim_target, target_id);
			self.aim.reset_smoothing();
			self.aim_target = target_id;
		}

		let strength = self.aim.strength(level);
		let point = match target {
			Some(entity) => {
				let aim_target = AimTarget {
					current: Some(entity.center),
					optimal: Some(self.aim.optimal_point(entity)),
					predicted: self.predictor.predict_aim_point(entity, self.lead_time_ms),
				};
				self.aim.correct(raw, &aim_target, entity.style, level, &self.player.player_context())
			},
			None => raw,
		};

		AimDecision {
			target: target_id,
			point,
			strength,
			stats: self.aim.stats(),
		}
	}

	/// `process` followed by `aim`
	pub fn step(&mut self, frame: Arc<Frame>, raw: Point<f32>, level: AssistLevel) -> Option<(FrameResult, AimDecision)> {
		let result = self.process(frame)?;
		Some((result, self.aim(raw, level)))
	}
}

/// Runs a `Session` on its own thread
///
/// At most one frame waits while another is processed; frames arriving beyond
/// that are dropped. Only the newest result is kept for the consumer.
pub struct SessionWorker {
	session: Arc<Mutex<Session>>,
	frames: Option<crossbeam::Sender<Arc<Frame>>>,
	latest: Arc<Mutex<Option<FrameResult>>>,
	delivered: AtomicU64,
	dropped: AtomicU64,
	handle: Option<JoinHandle<()>>,
}
impl SessionWorker {
	pub fn spawn(session: Session) -> Result<Self, Error> {
		let session = Arc::new(Mutex::new(session));
		let latest = Arc::new(Mutex::new(None::<FrameResult>));
		let (frames, rx) = crossbeam::bounded::<Arc<Frame>>(1);

		let handle = {
			let session = session.clone();
			let latest = latest.clone();
			std::thread::Builder::new()
				.name("session".to_string())
				.spawn(move || {
					while let Ok(frame) = rx.recv() {
						let result = match session.lock().process(frame) {
							Some(result) => result,
							None => continue,
						};

						let mut latest = latest.lock();
						if latest.as_ref().map_or(true, |latest| latest.timestamp_ms < result.timestamp_ms) {
							*latest = Some(result);
						}
					}
					log::info!("session worker shutting down...");
				})
				.map_err(|source| Error::Spawn { name: "session", source })?
		};

		Ok(Self {
			session,
			frames: Some(frames),
			latest,
			delivered: AtomicU64::new(0),
			dropped: AtomicU64::new(0),
			handle: Some(handle),
		})
	}

	/// Queues `frame` unless the worker already has one waiting
	pub fn submit(&self, frame: Arc<Frame>) -> bool {
		let frames = match &self.frames {
			Some(frames) => frames,
			None => return false,
		};

		match frames.try_send(frame) {
			Ok(()) => true,
			Err(crossbeam::TrySendError::Full(frame)) => {
				log::trace!("worker busy, dropping frame at {}ms", frame.timestamp_ms);
				self.dropped.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
				false
			},
			Err(crossbeam::TrySendError::Disconnected(_)) => false,
		}
	}

	/// Frames waiting to be processed
	#[inline]
	pub fn pending(&self) -> usize {
		self.frames.as_ref().map_or(0, |frames| frames.len())
	}

	#[inline]
	pub fn dropped_frames(&self) -> u64 {
		self.dropped.load(std::sync::atomic::Ordering::Relaxed)
	}

	/// Takes the newest result, unless it is no newer than one already taken
	pub fn latest_result(&self) -> Option<FrameResult> {
		let result = self.latest.lock().take()?;

		// One past the newest timestamp handed out so far
		let delivered = self.delivered.fetch_max(result.timestamp_ms.saturating_add(1), std::sync::atomic::Ordering::AcqRel);
		if result.timestamp_ms < delivered {
			log::trace!("discarding stale result at {}ms", result.timestamp_ms);
			return None;
		}

		Some(result)
	}

	/// Serialised with frame processing
	pub fn aim(&self, raw: Point<f32>, level: AssistLevel) -> AimDecision {
		self.session.lock().aim(raw, level)
	}

	#[inline]
	pub fn lock(&self) -> parking_lot::MutexGuard<'_, Session> {
		self.session.lock()
	}

	/// Stops accepting frames and waits for the worker to finish the one in hand
	pub fn shutdown(&mut self) {
		self.frames = None;
		if let Some(handle) = self.handle.take() {
			if handle.join().is_err() {
				log::error!("session worker panicked");
			}
		}
	}
}
impl Drop for SessionWorker {
	fn drop(&mut self) {
		self.shutdown();
	}
}

#[cfg(test)]
fn session() -> Session {
	Session::new(&Settings::default(), &ProfileRegistry::builtin(), "com.tencent.ig")
}

#[cfg(test)]
fn frame_with_box(left: i32, timestamp_ms: u64) -> Arc<Frame> {
	crate::detector::test_frames::figure((600, 600), Rect::new(left, 200, left + 60, 320), timestamp_ms)
}

#[test]
fn test_process_tracks_and_predicts() {
	let mut session = session();

	let mut last = None;
	for i in 0..4 {
		last = session.process(frame_with_box(200 + i * 10, i as u64 * 200));
		assert!(last.is_some());
	}

	let result = last.unwrap();
	assert_eq!(result.timestamp_ms, 600);
	assert_eq!(result.entities.len(), 1);
	assert!(result.entities[0].visible);
	assert!(result.entities[0].velocity.x > 0.0);

	// Moving right, so the prediction leads the current aim point
	assert_eq!(result.predictions.len(), 1);
	assert!(result.predictions[0].1.x > result.entities[0].aim_point.x);
	assert!(result.timeshares.track.is_some());

	// Out of order
	assert!(session.process(frame_with_box(200, 400)).is_none());
	assert!(session.process(frame_with_box(200, 600)).is_none());
}

#[test]
fn test_unknown_game_uses_fallback() {
	let session = Session::new(&Settings::default(), &ProfileRegistry::builtin(), "com.example.unknown");
	assert_eq!(session.game_id(), "com.example.unknown");
	assert_eq!(session.profile(), ProfileRegistry::builtin().fallback());
}

#[test]
fn test_aim_follows_most_threatening() {
	let mut session = session();
	assert_eq!(session.aim(Point::new(300.0, 300.0), AssistLevel::Moderate), AimDecision {
		target: None,
		point: Point::new(300.0, 300.0),
		strength: 0.5,
		stats: AimStats::default(),
	});

	session.tracker_mut().update(&[
		DetectionRegion::new(Rect::new(100, 200, 140, 300), DetectionMethod::Color),
		DetectionRegion::new(Rect::new(400, 200, 440, 300), DetectionMethod::Color),
	], 0);

	// Equal threat: nearest to the crosshair
	let decision = session.aim(Point::new(380.0, 220.0), AssistLevel::Moderate);
	assert_eq!(decision.target, Some(EntityId(1)));
	assert_eq!(decision.point, Point::new(400.0, 220.0));

	session.tracker_mut().set_threat_level(EntityId(0), 0.9);
	let decision = session.aim(Point::new(150.0, 220.0), AssistLevel::Moderate);
	assert_eq!(decision.target, Some(EntityId(0)));

	// Switching targets starts smoothing afresh
	assert_eq!(decision.point, Point::new(135.0, 220.0));
	assert_eq!(decision.stats.assists, 2);
}

#[test]
fn test_worker_drops_newest_when_busy() {
	let worker = SessionWorker::spawn(session()).unwrap();

	let guard = worker.lock();
	assert!(worker.submit(frame_with_box(200, 100)));

	// Wait for the worker to pick up the first frame and block on the session
	let start = Instant::now();
	while worker.pending() > 0 {
		assert!(start.elapsed() < Duration::from_secs(5));
		std::thread::yield_now();
	}

	assert!(worker.submit(frame_with_box(210, 200)));
	assert!(!worker.submit(frame_with_box(220, 300)));
	assert_eq!(worker.dropped_frames(), 1);
	drop(guard);

	let start = Instant::now();
	let mut newest = None;
	while newest != Some(200) {
		assert!(start.elapsed() < Duration::from_secs(10));
		if let Some(result) = worker.latest_result() {
			newest = Some(result.timestamp_ms);
		}
		std::thread::yield_now();
	}

	assert!(worker.latest_result().is_none());
}

#[test]
fn test_stale_results_are_discarded() {
	let mut worker = SessionWorker::spawn(session()).unwrap();

	*worker.latest.lock() = worker.lock().process(frame_with_box(200, 500));
	assert_eq!(worker.latest_result().map(|result| result.timestamp_ms), Some(500));

	// An older result showing up late is never handed out
	let stale = session().process(frame_with_box(200, 400));
	*worker.latest.lock() = stale;
	assert!(worker.latest_result().is_none());

	worker.shutdown();
	assert!(!worker.submit(frame_with_box(200, 600)));
}
