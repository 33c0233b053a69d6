pub use image::{GenericImage, GenericImageView, GrayImage, RgbImage, RgbaImage};
pub use parking_lot::{Mutex, RwLock};
pub use rayon::prelude::*;

pub type AnyError = anyhow::Error;

pub use std::{
	borrow::Cow,
	collections::{btree_map::Entry as BTreeMapEntry, BTreeMap, BTreeSet, HashMap, VecDeque},
	fs::File,
	path::{Path, PathBuf},
	sync::{
		atomic::{AtomicBool, AtomicU64, AtomicUsize},
		Arc,
	},
	thread::JoinHandle,
	time::Instant,
};

pub use core::{
	ops::{Deref, DerefMut},
	time::Duration,
};

pub use crossbeam_channel as crossbeam;
pub use rayon;
pub use image;
pub use imageproc;
pub use parking_lot;
pub use anyhow;
pub use log;

mod geometry;
pub use geometry::*;

mod maths;
pub use maths::*;

#[path = "image.rs"]
mod util_image;
pub use util_image::*;

pub trait LossyFrom<T>: Sized {
	fn lossy_from(val: T) -> Self;
}
impl<T> LossyFrom<T> for T {
	#[inline]
	fn lossy_from(val: T) -> Self {
		val
	}
}

pub trait LossyInto<T>: Sized {
	fn lossy_into(self) -> T;
}
impl<T: LossyFrom<U>, U> LossyInto<T> for U {
	#[inline]
	fn lossy_into(self) -> T {
		LossyFrom::lossy_from(self)
	}
}

macro_rules! impl_lossy_from {
	($($ty1:ty as $ty2:ty),*) => {$(
		impl LossyFrom<$ty1> for $ty2 {
			#[inline(always)]
			fn lossy_from(val: $ty1) -> Self {
				val as $ty2
			}
		}
		impl LossyFrom<$ty2> for $ty1 {
			#[inline(always)]
			fn lossy_from(val: $ty2) -> Self {
				val as $ty1
			}
		}
	)*}
}
impl_lossy_from!(
	i32 as f32,
	u32 as f32,
	i64 as f32
);
