use crate::prelude::*;

#[derive(thiserror::Error, Debug)]
pub enum Error {
	#[error("failed to access settings at {path}: {source}")]
	SettingsIo {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse settings: {0}")]
	SettingsParse(#[from] serde_json::Error),

	#[error("object detector did not answer within {0:?}")]
	ModelTimeout(Duration),

	#[error("object detector is still busy with an earlier frame")]
	ModelBusy,

	#[error("object detector thread has stopped")]
	ModelDisconnected,

	#[error("object detector failed: {0}")]
	Model(AnyError),

	#[error("failed to spawn {name} thread: {source}")]
	Spawn {
		name: &'static str,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to open log file {path}: {source}")]
	LogFile {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("a logger is already installed")]
	LoggerInstalled,

	#[error(transparent)]
	Vision(#[from] VisionError),
}
