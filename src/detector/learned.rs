use super::*;

/// Labels the learned-model pass accepts
pub const ENTITY_LABELS: [&str; 2] = ["person", "enemy"];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabeledBox {
	pub rect: Rect<i32>,
	pub confidence: Option<f32>,
}

/// Boxes grouped by class name
pub type LabeledBoxes = HashMap<String, Vec<LabeledBox>>;

/// A learned object detector
pub trait ObjectDetector: Send {
	fn detect(&mut self, frame: &Frame) -> Result<LabeledBoxes, AnyError>;
}

/// Detector for environments without a model
#[derive(Default, Debug, Clone, Copy)]
pub struct NullObjectDetector;
impl ObjectDetector for NullObjectDetector {
	#[inline]
	fn detect(&mut self, _frame: &Frame) -> Result<LabeledBoxes, AnyError> {
		Ok(LabeledBoxes::new())
	}
}

struct ModelRequest {
	frame: Arc<Frame>,
	reply: crossbeam::Sender<Result<LabeledBoxes, AnyError>>,
}

/// An `ObjectDetector` running on its own thread, answering within a deadline
pub struct ModelPass {
	requests: crossbeam::Sender<ModelRequest>,
	timeout: Duration,
}
impl ModelPass {
	pub fn spawn<D: ObjectDetector + 'static>(mut detector: D, timeout: Duration) -> Result<Self, Error> {
		// One request in flight; anything beyond that is refused rather than queued
		let (requests, rx) = crossbeam::bounded::<ModelRequest>(1);

		std::thread::Builder::new()
			.name("object-detector".to_string())
			.spawn(move || {
				while let Ok(ModelRequest { frame, reply }) = rx.recv() {
					reply.send(detector.detect(&frame)).ok();
				}
				log::info!("object detector shutting down...");
			})
			.map_err(|source| Error::Spawn { name: "object-detector", source })?;

		Ok(Self { requests, timeout })
	}

	#[inline]
	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Hands `frame` to the model thread; the deadline starts now
	pub fn submit(&self, frame: Arc<Frame>) -> Result<PendingDetection, Error> {
		let (reply, rx) = crossbeam::bounded(1);
		let deadline = Instant::now() + self.timeout;

		self.requests.try_send(ModelRequest { frame, reply }).map_err(|err| match err {
			crossbeam::TrySendError::Full(_) => Error::ModelBusy,
			crossbeam::TrySendError::Disconnected(_) => Error::ModelDisconnected,
		})?;

		Ok(PendingDetection { rx, deadline, timeout: self.timeout })
	}

	pub fn detect(&self, frame: Arc<Frame>) -> Result<LabeledBoxes, Error> {
		self.submit(frame)?.wait()
	}
}

pub struct PendingDetection {
	rx: crossbeam::Receiver<Result<LabeledBoxes, AnyError>>,
	deadline: Instant,
	timeout: Duration,
}
impl PendingDetection {
	pub fn wait(self) -> Result<LabeledBoxes, Error> {
		match self.rx.recv_deadline(self.deadline) {
			Ok(Ok(boxes)) => Ok(boxes),
			Ok(Err(err)) => Err(Error::Model(err)),
			Err(crossbeam::RecvTimeoutError::Timeout) => Err(Error::ModelTimeout(self.timeout)),
			Err(crossbeam::RecvTimeoutError::Disconnected) => Err(Error::ModelDisconnected),
		}
	}
}

pub(super) fn regions(boxes: LabeledBoxes, threshold: f32) -> Vec<DetectionRegion> {
	let mut regions = Vec::new();

	// HashMap order is unstable, walk the labels in a fixed order
	for label in ENTITY_LABELS {
		let Some(boxes) = boxes.get(label) else { continue };
		for labeled in boxes {
			if labeled.rect.is_empty() {
				continue;
			}
			if matches!(labeled.confidence, Some(confidence) if !(confidence >= threshold)) {
				continue;
			}
			regions.push(DetectionRegion {
				rect: labeled.rect,
				method: DetectionMethod::LearnedModel,
				confidence: labeled.confidence,
			});
		}
	}

	regions
}

#[cfg(test)]
struct FixedDetector(Vec<(&'static str, LabeledBox)>, Duration);
#[cfg(test)]
impl ObjectDetector for FixedDetector {
	fn detect(&mut self, _frame: &Frame) -> Result<LabeledBoxes, AnyError> {
		std::thread::sleep(self.1);

		let mut boxes = LabeledBoxes::new();
		for (label, labeled) in self.0.iter() {
			boxes.entry(label.to_string()).or_default().push(*labeled);
		}
		Ok(boxes)
	}
}

#[test]
fn test_label_filtering() {
	let mut boxes = LabeledBoxes::new();
	boxes.insert("car".to_string(), vec![LabeledBox { rect: Rect::new(0, 0, 50, 50), confidence: Some(0.9) }]);
	boxes.insert("enemy".to_string(), vec![
		LabeledBox { rect: Rect::new(10, 10, 60, 110), confidence: Some(0.9) },
		LabeledBox { rect: Rect::new(200, 10, 260, 110), confidence: Some(0.3) },
		LabeledBox { rect: Rect::new(300, 10, 360, 110), confidence: None },
	]);
	boxes.insert("person".to_string(), vec![LabeledBox { rect: Rect::new(400, 400, 400, 500), confidence: None }]);

	let regions = regions(boxes, 0.65);
	assert_eq!(regions.iter().map(|region| region.rect).collect::<Vec<_>>(), vec![Rect::new(10, 10, 60, 110), Rect::new(300, 10, 360, 110)]);
	assert!(regions.iter().all(|region| region.method == DetectionMethod::LearnedModel));
}

#[test]
fn test_model_answers() {
	let detector = FixedDetector(vec![("person", LabeledBox { rect: Rect::new(1, 2, 3, 4), confidence: Some(0.8) })], Duration::ZERO);
	let model = ModelPass::spawn(detector, Duration::from_secs(5)).unwrap();

	let frame = crate::detector::test_frames::blank((8, 8), 0);
	let boxes = model.detect(frame).unwrap();
	assert_eq!(boxes["person"][0].rect, Rect::new(1, 2, 3, 4));
}

#[test]
fn test_model_timeout() {
	let detector = FixedDetector(vec![("enemy", LabeledBox { rect: Rect::new(1, 2, 3, 4), confidence: None })], Duration::from_millis(300));
	let model = ModelPass::spawn(detector, Duration::from_millis(20)).unwrap();

	let frame = crate::detector::test_frames::blank((8, 8), 0);
	assert!(matches!(model.detect(frame.clone()), Err(Error::ModelTimeout(_))));

	// Still chewing on the first frame; one more fits in the queue, the next is refused
	assert!(model.submit(frame.clone()).is_ok());
	assert!(matches!(model.submit(frame), Err(Error::ModelBusy)));
}

#[test]
fn test_slow_model_does_not_block_detection() {
	use crate::detector::test_frames::*;

	let detector = FixedDetector(vec![("enemy", LabeledBox { rect: Rect::new(100, 150, 160, 270), confidence: None })], Duration::from_millis(500));
	let settings = DetectorSettings { model_timeout_ms: 10, ..Default::default() };
	let mut region_detector = RegionDetector::new(CpuImageOps, settings).with_model(detector).unwrap();

	let start = Instant::now();
	let regions = region_detector.detect(blank((600, 600), 0), &GameDetectionConfig::default());
	assert!(regions.is_empty());
	assert!(start.elapsed() < Duration::from_millis(400));
}
