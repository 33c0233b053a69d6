use crate::prelude::*;
use std::{fs::OpenOptions, io::Write as IoWrite};

const LOG_BACKLOG: usize = 1024;

pub struct Log {
	pub level: log::Level,
	pub text: Box<str>
}

/// Receiving end of the records emitted after `init`
pub struct LogState {
	rx: crossbeam::Receiver<Log>
}
impl LogState {
	/// Takes every record received so far
	pub fn digest(&self) -> Vec<Log> {
		self.rx.try_iter().collect()
	}
}

struct ReticleLogger {
	level: log::LevelFilter,
	file: Option<Mutex<File>>,
	tx: crossbeam::Sender<Log>
}
impl log::Log for ReticleLogger {
	#[inline]
	fn enabled(&self, metadata: &log::Metadata) -> bool {
		metadata.level() <= self.level
	}

	fn log(&self, record: &log::Record) {
		if !self.enabled(record.metadata()) {
			return;
		}

		let text = format!("[{}] {}", record.module_path().unwrap_or("?"), record.args()).into_boxed_str();

		println!("[{}] {text}", record.level());

		if let Some(file) = &self.file {
			writeln!(&mut *file.lock(), "[{}] {text}", record.level()).ok();
		}

		// Hosts that never digest just lose the backlog
		self.tx.try_send(Log { level: record.level(), text }).ok();
	}

	fn flush(&self) {
		if let Some(file) = &self.file {
			file.lock().flush().ok();
		}
	}
}

fn install(level: log::LevelFilter, file: Option<File>) -> Result<LogState, Error> {
	let (tx, rx) = crossbeam::bounded(LOG_BACKLOG);

	let logger = ReticleLogger {
		level,
		file: file.map(Mutex::new),
		tx
	};
	log::set_logger(Box::leak(Box::new(logger))).map_err(|_| Error::LoggerInstalled)?;
	log::set_max_level(level);

	Ok(LogState { rx })
}

/// Installs the process-wide logger, printing to stdout
pub fn init(level: log::LevelFilter) -> Result<LogState, Error> {
	install(level, None)
}

/// Like `init`, also appending every record to `path`
pub fn init_with_file(level: log::LevelFilter, path: impl AsRef<Path>) -> Result<LogState, Error> {
	let path = path.as_ref();

	let mut f = OpenOptions::new().append(true).create(true).open(path).map_err(|source| Error::LogFile { path: path.to_owned(), source })?;
	writeln!(f, "============ RETICLE LOG {} ============", std::time::SystemTime::now().duration_since(std::time::SystemTime::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)).ok();

	install(level, Some(f))
}

#[test]
fn test_init_once() {
	let state = init(log::LevelFilter::Info).unwrap();
	assert!(matches!(init(log::LevelFilter::Debug), Err(Error::LoggerInstalled)));

	log::info!("tracking started");
	log::debug!("filtered out");

	let logs = state.digest();
	assert!(logs.iter().any(|log| log.level == log::Level::Info && log.text.ends_with("tracking started")));
	assert!(!logs.iter().any(|log| log.text.ends_with("filtered out")));
}
