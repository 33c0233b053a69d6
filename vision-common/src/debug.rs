use crate::prelude::*;

macro_rules! timeshares {
	{$($event:ident),*} => {
		/// Wall time spent in each stage of one frame
		#[derive(Default, Debug, Clone)]
		pub struct Timeshares {
			pub entire_frame: Option<Duration>,
			$(pub $event: Option<Duration>),*
		}
		impl Timeshares {
			pub fn iter(&self) -> impl Iterator<Item = (&'static str, Duration)> + '_ {
				[$((stringify!($event), &self.$event)),*].into_iter().filter_map(|(name, event)| event.as_ref().map(|event| (name, *event)))
			}
		}
	};
}
timeshares! {
	learned_pass,
	color_pass,
	motion_pass,
	contour_pass,
	merge,
	filter,
	track,
	predict
}

/// Runs `$code`, storing its wall time in `$timeshares.$event`
#[macro_export]
macro_rules! debug_waterfall {
	($timeshares:expr, $event:ident => $code:expr) => {{
		let start = $crate::Instant::now();
		let ret = $code;
		$timeshares.$event = Some(start.elapsed());
		ret
	}};
}

impl Timeshares {
	pub fn log(&self) {
		if !log::log_enabled!(log::Level::Trace) {
			return;
		}

		let stages = self.iter().map(|(name, time)| format!("{name}={time:?}")).collect::<Vec<_>>().join(" ");
		log::trace!("frame took {:?}: {stages}", self.entire_frame.unwrap_or_default());
	}
}

#[test]
fn test_timeshares_iter() {
	let mut timeshares = Timeshares::default();
	let sum = debug_waterfall!(timeshares, merge => 2 + 2);
	assert_eq!(sum, 4);
	assert_eq!(timeshares.iter().map(|(name, _)| name).collect::<Vec<_>>(), vec!["merge"]);
}
