use crate::prelude::*;

mod color;
mod contour;
mod filter;
mod learned;
mod merge;
mod motion;

pub use contour::{circularity, rectangularity};
pub use filter::{color_variance, filter_regions, validate_candidate};
pub use learned::{LabeledBox, LabeledBoxes, ModelPass, NullObjectDetector, ObjectDetector, PendingDetection};
pub use merge::{merge_overlapping, overlaps};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DetectionMethod {
	LearnedModel,
	Color,
	Motion,
	Contour,
	ColorMask,
}

/// A rectangle proposed for one frame, with no identity across frames
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionRegion {
	pub rect: Rect<i32>,
	pub method: DetectionMethod,
	pub confidence: Option<f32>,
}
impl DetectionRegion {
	#[inline]
	pub fn new(rect: Rect<i32>, method: DetectionMethod) -> Self {
		Self { rect, method, confidence: None }
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DetectorStats {
	pub total_detections: u64,
	pub successful_detections: u64,
}
impl DetectorStats {
	pub fn success_rate(&self) -> f32 {
		if self.total_detections == 0 {
			0.0
		} else {
			self.successful_detections as f32 / self.total_detections as f32
		}
	}
}

pub struct RegionDetector<O: ImageOps = CpuImageOps> {
	ops: O,
	settings: DetectorSettings,
	model: Option<ModelPass>,

	previous: Option<Arc<Frame>>,
	cache: Option<(u64, Vec<DetectionRegion>)>,

	stats: DetectorStats,
	timeshares: Timeshares,
}
impl<O: ImageOps> RegionDetector<O> {
	pub fn new(ops: O, settings: DetectorSettings) -> Self {
		Self {
			ops,
			settings,
			model: None,
			previous: None,
			cache: None,
			stats: DetectorStats::default(),
			timeshares: Timeshares::default(),
		}
	}

	/// Runs `detector` on its own thread for the learned-model pass
	pub fn with_model<D: ObjectDetector + 'static>(mut self, detector: D) -> Result<Self, Error> {
		self.model = Some(ModelPass::spawn(detector, Duration::from_millis(self.settings.model_timeout_ms))?);
		Ok(self)
	}

	#[inline]
	pub fn stats(&self) -> DetectorStats {
		self.stats
	}

	#[inline]
	pub fn settings(&self) -> &DetectorSettings {
		&self.settings
	}

	/// Stage timings of the last frame that ran the passes
	#[inline]
	pub fn timeshares(&self) -> &Timeshares {
		&self.timeshares
	}

	#[inline]
	pub fn previous_frame(&self) -> Option<&Frame> {
		self.previous.as_deref()
	}

	/// Forgets the retained frame and cached regions
	pub fn reset(&mut self) {
		self.previous = None;
		self.cache = None;
	}

	/// Detects against the frame retained from the previous call, then retains `frame` in its place
	pub fn detect(&mut self, frame: Arc<Frame>, profile: &GameDetectionConfig) -> Vec<DetectionRegion> {
		if let Some((cached_at, cached)) = &self.cache {
			let age = frame.timestamp_ms.checked_sub(*cached_at);
			if !cached.is_empty() && matches!(age, Some(age) if age < self.settings.cache_ttl_ms) {
				self.stats.total_detections += 1;
				self.stats.successful_detections += 1;
				return cached.clone();
			}
		}

		let previous = if frame.is_empty() {
			None
		} else {
			self.previous.replace(frame.clone())
		};

		let regions = self.detect_with_previous(&frame, previous.as_deref(), profile);
		self.cache = Some((frame.timestamp_ms, regions.clone()));
		regions
	}

	/// Runs every enabled pass over `frame`, then merges and filters the results
	pub fn detect_with_previous(&mut self, frame: &Arc<Frame>, previous: Option<&Frame>, profile: &GameDetectionConfig) -> Vec<DetectionRegion> {
		self.stats.total_detections += 1;

		if frame.is_empty() {
			log::debug!("skipping detection on an empty frame");
			return Vec::new();
		}

		let start = Instant::now();
		let mut timeshares = Timeshares::default();

		// The model thread works while the image passes run
		let pending = match (&self.model, self.settings.use_learned_model) {
			(Some(model), true) => match model.submit(frame.clone()) {
				Ok(pending) => Some(pending),
				Err(err) => {
					log::debug!("learned-model pass skipped: {err}");
					None
				}
			},
			_ => None,
		};

		let (ops, settings) = (&self.ops, &self.settings);
		let min_size = settings.min_entity_size;

		let ((color, motion), contour) = rayon::join(
			|| rayon::join(
				|| timed(settings.use_color, || Ok(color::detect(&frame.image, profile, min_size))),
				|| timed(settings.use_motion && previous.is_some(), || match previous {
					Some(previous) => motion::detect(ops, &frame.image, &previous.image, min_size),
					None => Ok(Vec::new()),
				}),
			),
			|| timed(settings.use_contour, || Ok(contour::detect(ops, &frame.image, profile, min_size))),
		);

		let learned = debug_waterfall!(timeshares, learned_pass => match pending {
			Some(pending) => match pending.wait() {
				Ok(boxes) => learned::regions(boxes, settings.detection_threshold),
				Err(err) => {
					log::warn!("learned-model pass contributed nothing: {err}");
					Vec::new()
				}
			},
			None => Vec::new(),
		});

		let mut regions = learned;
		for (pass, event, (result, time)) in [
			("color", &mut timeshares.color_pass, color),
			("motion", &mut timeshares.motion_pass, motion),
			("contour", &mut timeshares.contour_pass, contour),
		] {
			*event = time;
			match result {
				Ok(found) => regions.extend(found),
				Err(err) => log::warn!("{pass} pass contributed nothing: {err}"),
			}
		}

		let regions = debug_waterfall!(timeshares, merge => merge_overlapping(regions));
		let regions = debug_waterfall!(timeshares, filter => filter_regions(regions, &frame.image, profile, min_size));

		if !regions.is_empty() {
			self.stats.successful_detections += 1;
		}

		timeshares.entire_frame = Some(start.elapsed());
		timeshares.log();
		self.timeshares = timeshares;

		log::trace!("detected {} regions at {}ms", regions.len(), frame.timestamp_ms);

		regions
	}
}

type PassResult = (Result<Vec<DetectionRegion>, AnyError>, Option<Duration>);

fn timed(enabled: bool, pass: impl FnOnce() -> Result<Vec<DetectionRegion>, AnyError>) -> PassResult {
	if !enabled {
		return (Ok(Vec::new()), None);
	}
	let start = Instant::now();
	let result = pass();
	(result, Some(start.elapsed()))
}

#[cfg(test)]
pub(crate) mod test_frames {
	use super::*;

	pub const BACKGROUND: image::Rgb<u8> = image::Rgb([90, 90, 90]);

	/// A striped red figure on a flat grey background
	pub fn figure(size: (u32, u32), at: Rect<i32>, timestamp_ms: u64) -> Arc<Frame> {
		let image = RgbImage::from_fn(size.0, size.1, |x, y| {
			if at.contains(Point::new(x as i32, y as i32)) {
				if y % 2 == 0 {
					image::Rgb([220, 30, 30])
				} else {
					image::Rgb([200, 20, 20])
				}
			} else {
				BACKGROUND
			}
		});
		Arc::new(Frame::new(image, timestamp_ms))
	}

	pub fn blank(size: (u32, u32), timestamp_ms: u64) -> Arc<Frame> {
		Arc::new(Frame::new(RgbImage::from_pixel(size.0, size.1, BACKGROUND), timestamp_ms))
	}
}

#[test]
fn test_detects_red_figure() {
	use test_frames::*;

	let figure_rect = Rect::new(250, 200, 310, 320);
	let mut detector = RegionDetector::new(CpuImageOps, DetectorSettings::default());

	let regions = detector.detect(figure((600, 600), figure_rect, 0), &GameDetectionConfig::default());
	assert_eq!(regions.len(), 1);

	let rect = regions[0].rect;
	assert!(rect.left <= 250 && rect.top <= 200 && rect.right >= 310 && rect.bottom >= 320, "{rect:?}");
	assert!(rect.left >= 246 && rect.top >= 196 && rect.right <= 314 && rect.bottom <= 324, "{rect:?}");

	assert_eq!(detector.stats(), DetectorStats { total_detections: 1, successful_detections: 1 });
	assert!(detector.previous_frame().is_some());
}

#[test]
fn test_nothing_on_flat_frames() {
	use test_frames::*;

	let mut detector = RegionDetector::new(CpuImageOps, DetectorSettings::default());
	assert!(detector.detect(blank((400, 400), 0), &GameDetectionConfig::default()).is_empty());
	assert!(detector.detect(blank((400, 400), 200), &GameDetectionConfig::default()).is_empty());
	assert_eq!(detector.stats().successful_detections, 0);
	assert_eq!(detector.stats().success_rate(), 0.0);
}

#[test]
fn test_cache_within_ttl() {
	use test_frames::*;

	let profile = GameDetectionConfig::default();
	let mut detector = RegionDetector::new(CpuImageOps, DetectorSettings::default());

	let first = detector.detect(figure((600, 600), Rect::new(250, 200, 310, 320), 1000), &profile);
	assert_eq!(first.len(), 1);

	// A blank frame inside the TTL still reports the cached figure
	assert_eq!(detector.detect(blank((600, 600), 1050), &profile), first);
	assert_eq!(detector.previous_frame().map(|frame| frame.timestamp_ms), Some(1000));

	// Past the TTL the passes run again
	assert!(detector.detect(blank((600, 600), 1100), &profile).is_empty());
	assert_eq!(detector.stats().total_detections, 3);
}

#[test]
fn test_ignores_hud_bands() {
	use test_frames::*;

	let settings = DetectorSettings { use_motion: false, ..Default::default() };
	let mut detector = RegionDetector::new(CpuImageOps, settings);

	// Entirely inside the top sixth of the screen
	let regions = detector.detect(figure((600, 600), Rect::new(250, 10, 310, 90), 0), &GameDetectionConfig::default());
	assert!(regions.is_empty());
}

#[test]
fn test_empty_frame() {
	let mut detector = RegionDetector::new(CpuImageOps, DetectorSettings::default());
	let frame = Arc::new(Frame::new(RgbImage::new(0, 0), 0));
	assert!(detector.detect(frame, &GameDetectionConfig::default()).is_empty());
	assert!(detector.previous_frame().is_none());
}
