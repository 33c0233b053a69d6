//! Frame-to-aim pipeline: region detection, entity tracking, motion
//! classification, position prediction and aim correction.

pub mod aim;
pub mod config;
pub mod detector;
pub mod error;
pub mod logs;
pub mod pattern;
pub mod predictor;
pub mod session;
pub mod tracker;

pub use error::Error;

pub mod prelude {
	pub use crate::{
		aim::{AimCorrector, AimStats, AimTarget, AssistLevel, BodyPart, PlayerContext, PlayerContextProvider, WeaponClass},
		config::{AimConfig, AimSettings, DetectorSettings, GameDetectionConfig, GameProfile, ProfileRegistry, Settings, TrackerSettings},
		detector::{DetectionMethod, DetectionRegion, DetectorStats, RegionDetector},
		pattern::{MotionPatternClassifier, MotionStyle, MovementPattern, PatternEstimate},
		predictor::PositionPredictor,
		session::{AimDecision, FrameResult, Session, SessionWorker},
		tracker::{EntityId, EntityTracker, Sample, TrackedEntity},
		Error,
	};

	pub use reticle_vision_common::{debug_waterfall, prelude::*};
	pub use reticle_vision_cpu::CpuImageOps;
}
