pub use reticle_util::*;

pub mod prelude {
	pub use crate::{
		consts,
		debug::{self, Timeshares},
		screen::{
			RelativeBound::{self, *},
			RelativeRect,
		},
		Contour, Frame, HsvRange, ImageOps, VisionError,
	};

	pub use reticle_util::*;
}
use prelude::*;

pub mod consts;
pub mod debug;
pub mod screen;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VisionError {
	#[error("frame has no pixels")]
	EmptyFrame,

	#[error("frame dimensions differ ({0}x{1} vs {2}x{3})")]
	DimensionMismatch(u32, u32, u32, u32),

	#[error("pixel buffer holds {actual} bytes, expected {expected}")]
	BufferSize { expected: usize, actual: usize },
}

/// An immutable captured frame
#[derive(Clone, Debug)]
pub struct Frame {
	pub image: RgbImage,
	pub timestamp_ms: u64,
}
impl Frame {
	#[inline]
	pub fn new(image: RgbImage, timestamp_ms: u64) -> Self {
		Self { image, timestamp_ms }
	}

	/// Builds a frame from a tightly packed RGBA buffer, dropping the alpha channel
	pub fn from_rgba(width: u32, height: u32, rgba: &[u8], timestamp_ms: u64) -> Result<Self, VisionError> {
		let expected = width as usize * height as usize * 4;
		if rgba.len() != expected {
			return Err(VisionError::BufferSize { expected, actual: rgba.len() });
		}
		if expected == 0 {
			return Err(VisionError::EmptyFrame);
		}

		let rgb = rgba.chunks_exact(4).flat_map(|px| [px[0], px[1], px[2]]).collect::<Vec<u8>>();
		let image = RgbImage::from_raw(width, height, rgb).ok_or(VisionError::BufferSize { expected, actual: rgba.len() })?;

		Ok(Self { image, timestamp_ms })
	}

	#[inline]
	pub fn width(&self) -> u32 {
		self.image.width()
	}

	#[inline]
	pub fn height(&self) -> u32 {
		self.image.height()
	}

	#[inline]
	pub fn dimensions(&self) -> (u32, u32) {
		self.image.dimensions()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.width() == 0 || self.height() == 0
	}
}

/// Inclusive hue window in degrees, with minimum saturation and value in percent
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HsvRange {
	pub hue: (u16, u16),
	pub min_saturation: u8,
	pub min_value: u8,
}
impl HsvRange {
	#[inline]
	pub fn contains(&self, (h, s, v): (u16, u8, u8)) -> bool {
		h >= self.hue.0 && h <= self.hue.1 && s >= self.min_saturation && v >= self.min_value
	}
}

/// A closed border traced around a connected foreground region
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Contour {
	pub points: Vec<Point<i32>>,
}
impl Contour {
	/// Enclosed polygon area (shoelace)
	pub fn area(&self) -> f32 {
		if self.points.len() < 3 {
			return 0.0;
		}

		let mut sum = 0i64;
		for (i, a) in self.points.iter().enumerate() {
			let b = &self.points[(i + 1) % self.points.len()];
			sum += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
		}
		(sum.abs() as f32) / 2.0
	}

	/// Closed arc length
	pub fn perimeter(&self) -> f32 {
		if self.points.len() < 2 {
			return 0.0;
		}

		self.points.iter().enumerate().map(|(i, a)| {
			let b = &self.points[(i + 1) % self.points.len()];
			Point::<f32>::from(*a).distance(&Point::<f32>::from(*b))
		}).sum()
	}

	/// Pixel bounding box, exclusive on the right and bottom
	pub fn bounding_rect(&self) -> Option<Rect<i32>> {
		let first = self.points.first()?;
		let mut rect = Rect::new(first.x, first.y, first.x + 1, first.y + 1);
		for pt in &self.points[1..] {
			rect.left = rect.left.min(pt.x);
			rect.top = rect.top.min(pt.y);
			rect.right = rect.right.max(pt.x + 1);
			rect.bottom = rect.bottom.max(pt.y + 1);
		}
		Some(rect)
	}
}

/// Image primitives the detection passes are written against
pub trait ImageOps: Send + Sync {
	fn grayscale(&self, image: &RgbImage) -> GrayImage;

	/// Per-channel absolute difference
	fn abs_diff(&self, current: &RgbImage, previous: &RgbImage) -> Result<RgbImage, VisionError>;

	/// Pixels strictly above `threshold` become 255, everything else 0
	fn threshold(&self, image: &GrayImage, threshold: u8) -> GrayImage;

	/// Dilation followed by erosion with a square kernel of the given radius
	fn morphological_close(&self, image: &GrayImage, radius: u8) -> GrayImage;

	/// Outermost borders of the non-zero regions only
	fn external_contours(&self, image: &GrayImage) -> Vec<Contour>;

	fn blur(&self, image: &GrayImage, sigma: f32) -> GrayImage;

	fn edge_detect(&self, image: &GrayImage, low: f32, high: f32) -> GrayImage;

	/// 255 where the pixel falls inside any of the ranges
	fn hsv_mask(&self, image: &RgbImage, ranges: &[HsvRange]) -> GrayImage;
}

#[test]
fn test_contour_measurements() {
	let contour = Contour {
		points: vec![Point::new(0, 0), Point::new(10, 0), Point::new(10, 20), Point::new(0, 20)],
	};
	assert_eq!(contour.area(), 200.0);
	assert_eq!(contour.perimeter(), 60.0);
	assert_eq!(contour.bounding_rect(), Some(Rect::new(0, 0, 11, 21)));
}

#[test]
fn test_frame_from_rgba() {
	let frame = Frame::from_rgba(2, 1, &[255, 0, 0, 255, 0, 255, 0, 128], 5).unwrap();
	assert_eq!(frame.image.get_pixel(0, 0).0, [255, 0, 0]);
	assert_eq!(frame.image.get_pixel(1, 0).0, [0, 255, 0]);
	assert_eq!(frame.timestamp_ms, 5);

	assert_eq!(Frame::from_rgba(2, 2, &[0; 4], 0).unwrap_err(), VisionError::BufferSize { expected: 16, actual: 4 });
	assert_eq!(Frame::from_rgba(0, 0, &[], 0).unwrap_err(), VisionError::EmptyFrame);
}
