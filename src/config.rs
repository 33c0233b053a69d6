use crate::prelude::*;
use serde::{Deserialize, Serialize};

pub const FALLBACK_GAME_ID: &str = "default";

/// Per-title tuning for `RegionDetector`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameDetectionConfig {
	pub red_threshold: u8,
	pub red_dominance_ratio: f32,

	/// Enables the blur + edge contour shape pass
	pub use_shape_analysis: bool,

	/// Enables the HSV red mask pass
	pub use_edge_detection: bool,

	/// Fraction of the screen area a region must cover
	pub min_bounding_size_percent: f32,
	pub max_bounding_size_percent: f32,

	pub head_target_offset_percent: f32,
}
impl Default for GameDetectionConfig {
	fn default() -> Self {
		Self {
			red_threshold: 150,
			red_dominance_ratio: 1.5,
			use_shape_analysis: false,
			use_edge_detection: false,
			min_bounding_size_percent: 0.01,
			max_bounding_size_percent: 0.2,
			head_target_offset_percent: 0.2,
		}
	}
}

/// Per-title tuning for `AimCorrector`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimConfig {
	/// Where the head target sits, as a fraction of the box height from the top
	pub head_offset_ratio: f32,
	pub use_headtracking_preference: bool,

	/// Targets further than this from the crosshair, as a view angle, get no assist
	pub max_assist_angle_degrees: f32,
	pub aim_smoothing_factor: f32,
}
impl Default for AimConfig {
	fn default() -> Self {
		Self {
			head_offset_ratio: 0.2,
			use_headtracking_preference: true,
			max_assist_angle_degrees: 15.0,
			aim_smoothing_factor: 0.8,
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameProfile {
	pub detection: GameDetectionConfig,
	pub aim: AimConfig,
}

/// Game profiles keyed by game identifier, with a fallback for unknown titles
#[derive(Clone, Debug)]
pub struct ProfileRegistry {
	profiles: BTreeMap<Box<str>, GameProfile>,
	fallback: GameProfile,
}
impl ProfileRegistry {
	pub fn empty() -> Self {
		Self {
			profiles: BTreeMap::new(),
			fallback: GameProfile::default(),
		}
	}

	pub fn builtin() -> Self {
		let mut registry = Self::empty();

		registry.insert("com.tencent.ig", GameProfile {
			detection: GameDetectionConfig {
				red_threshold: 160,
				red_dominance_ratio: 1.4,
				min_bounding_size_percent: 0.01,
				max_bounding_size_percent: 0.2,
				head_target_offset_percent: 0.2,
				..Default::default()
			},
			aim: AimConfig {
				head_offset_ratio: 0.2,
				max_assist_angle_degrees: 15.0,
				aim_smoothing_factor: 0.85,
				..Default::default()
			},
		});

		registry.insert("com.dts.freefireth", GameProfile {
			detection: GameDetectionConfig {
				red_threshold: 150,
				red_dominance_ratio: 1.3,
				use_shape_analysis: true,
				min_bounding_size_percent: 0.015,
				max_bounding_size_percent: 0.25,
				head_target_offset_percent: 0.23,
				..Default::default()
			},
			aim: AimConfig {
				head_offset_ratio: 0.23,
				max_assist_angle_degrees: 18.0,
				aim_smoothing_factor: 0.8,
				..Default::default()
			},
		});

		registry.insert("com.activision.callofduty.shooter", GameProfile {
			detection: GameDetectionConfig {
				red_threshold: 140,
				red_dominance_ratio: 1.5,
				use_edge_detection: true,
				min_bounding_size_percent: 0.02,
				max_bounding_size_percent: 0.3,
				head_target_offset_percent: 0.18,
				..Default::default()
			},
			aim: AimConfig {
				head_offset_ratio: 0.18,
				max_assist_angle_degrees: 12.0,
				aim_smoothing_factor: 0.9,
				..Default::default()
			},
		});

		registry
	}

	pub fn insert(&mut self, game_id: &str, profile: GameProfile) {
		if game_id == FALLBACK_GAME_ID {
			self.fallback = profile;
		} else {
			self.profiles.insert(Box::from(game_id), profile);
		}
	}

	/// Looks up a title, falling back to the default profile
	pub fn get(&self, game_id: &str) -> &GameProfile {
		self.profiles.get(game_id).unwrap_or(&self.fallback)
	}

	#[inline]
	pub fn contains(&self, game_id: &str) -> bool {
		self.profiles.contains_key(game_id)
	}

	#[inline]
	pub fn fallback(&self) -> &GameProfile {
		&self.fallback
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &GameProfile)> + '_ {
		self.profiles.iter().map(|(id, profile)| (id.as_ref(), profile))
	}
}
impl Default for ProfileRegistry {
	#[inline]
	fn default() -> Self {
		Self::builtin()
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
	/// Smallest accepted region side in pixels
	pub min_entity_size: i32,

	/// Learned-model boxes reporting a lower confidence are discarded
	pub detection_threshold: f32,

	pub use_learned_model: bool,
	pub use_color: bool,
	pub use_motion: bool,
	pub use_contour: bool,

	pub cache_ttl_ms: u64,
	pub model_timeout_ms: u64,
}
impl Default for DetectorSettings {
	fn default() -> Self {
		Self {
			min_entity_size: 30,
			detection_threshold: 0.65,
			use_learned_model: true,
			use_color: true,
			use_motion: true,
			use_contour: true,
			cache_ttl_ms: 100,
			model_timeout_ms: 30,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
	pub history_capacity: usize,
	pub history_max_age_ms: u64,
	pub eviction_timeout_ms: u64,
}
impl Default for TrackerSettings {
	fn default() -> Self {
		Self {
			history_capacity: 20,
			history_max_age_ms: 5000,
			eviction_timeout_ms: 3000,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimSettings {
	pub subtle_strength: f32,
	pub moderate_strength: f32,
	pub significant_strength: f32,

	pub smoothing: bool,

	/// Corrections longer than this count as significant
	pub significant_correction_px: f32,

	pub screen_width: u32,
	pub screen_height: u32,

	/// Overrides the default of a third of the shorter screen side
	pub max_aim_distance: Option<f32>,
}
impl Default for AimSettings {
	fn default() -> Self {
		Self {
			subtle_strength: 0.25,
			moderate_strength: 0.5,
			significant_strength: 0.75,
			smoothing: true,
			significant_correction_px: 20.0,
			screen_width: 1080,
			screen_height: 2340,
			max_aim_distance: None,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub detector: DetectorSettings,
	pub tracker: TrackerSettings,
	pub aim: AimSettings,

	/// How far ahead entity positions are predicted for aiming
	pub lead_time_ms: u64,

	/// Extra or overriding game profiles; the key "default" replaces the fallback
	pub profiles: BTreeMap<Box<str>, GameProfile>,
}
impl Default for Settings {
	fn default() -> Self {
		Self {
			detector: DetectorSettings::default(),
			tracker: TrackerSettings::default(),
			aim: AimSettings::default(),
			lead_time_ms: 200,
			profiles: BTreeMap::new(),
		}
	}
}
impl Settings {
	pub fn try_load(path: impl AsRef<Path>) -> Result<Self, Error> {
		let path = path.as_ref();
		let f = File::open(path).map_err(|source| Error::SettingsIo { path: path.to_owned(), source })?;
		Ok(serde_json::from_reader(std::io::BufReader::new(f))?)
	}

	/// Loads settings, falling back to defaults if the file is missing or invalid
	pub fn load(path: impl AsRef<Path>) -> Self {
		match Self::try_load(path.as_ref()) {
			Ok(settings) => settings,
			Err(Error::SettingsIo { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => Self::default(),
			Err(err) => {
				log::warn!("Ignoring settings at {}: {err}", path.as_ref().display());
				Self::default()
			}
		}
	}

	pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
		let path = path.as_ref();
		let settings = serde_json::to_string_pretty(self)?;
		std::fs::write(path, settings).map_err(|source| Error::SettingsIo { path: path.to_owned(), source })
	}

	/// Built-in profiles with the overrides from these settings applied
	pub fn registry(&self) -> ProfileRegistry {
		let mut registry = ProfileRegistry::builtin();
		for (game_id, profile) in self.profiles.iter() {
			registry.insert(game_id, profile.clone());
		}
		registry
	}
}

#[test]
fn test_registry_fallback() {
	let registry = ProfileRegistry::builtin();

	assert_eq!(registry.get("com.tencent.ig").detection.red_threshold, 160);
	assert!(registry.get("com.dts.freefireth").detection.use_shape_analysis);
	assert!(registry.get("com.activision.callofduty.shooter").detection.use_edge_detection);
	assert_eq!(registry.get("com.activision.callofduty.shooter").aim.aim_smoothing_factor, 0.9);

	assert!(!registry.contains("com.example.unknown"));
	assert_eq!(registry.get("com.example.unknown"), &GameProfile::default());
}

#[test]
fn test_settings_roundtrip() {
	let mut settings = Settings::default();
	settings.lead_time_ms = 150;
	settings.detector.use_motion = false;
	settings.profiles.insert(Box::from("com.example.shooter"), GameProfile {
		detection: GameDetectionConfig { red_threshold: 170, ..Default::default() },
		..Default::default()
	});

	let path = std::env::temp_dir().join(format!("reticle-settings-{}.json", std::process::id()));
	settings.save(&path).unwrap();
	let loaded = Settings::try_load(&path).unwrap();
	std::fs::remove_file(&path).ok();

	assert_eq!(loaded, settings);
	assert_eq!(loaded.registry().get("com.example.shooter").detection.red_threshold, 170);
	assert_eq!(loaded.registry().get("com.tencent.ig").detection.red_threshold, 160);
}

#[test]
fn test_settings_partial_json() {
	let settings: Settings = serde_json::from_str(r#"{ "tracker": { "eviction_timeout_ms": 1000 } }"#).unwrap();
	assert_eq!(settings.tracker.eviction_timeout_ms, 1000);
	assert_eq!(settings.tracker.history_capacity, 20);
	assert_eq!(settings.lead_time_ms, 200);

	assert_eq!(Settings::load("/nonexistent/reticle/settings.json"), Settings::default());
}
