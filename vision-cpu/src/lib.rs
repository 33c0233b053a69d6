use reticle_vision_common::{
	prelude::{
		image::{self, Pixel},
		imageproc::{self, contours::BorderType, distance_transform::Norm},
		*,
	},
	ImageOps,
};

/// `ImageOps` on the CPU, backed by imageproc
#[derive(Default, Debug, Clone, Copy)]
pub struct CpuImageOps;

impl CpuImageOps {
	#[inline]
	pub fn init() -> Result<Self, AnyError> {
		Ok(CpuImageOps)
	}
}

impl ImageOps for CpuImageOps {
	#[inline]
	fn grayscale(&self, image: &RgbImage) -> GrayImage {
		image::imageops::grayscale(image)
	}

	fn abs_diff(&self, current: &RgbImage, previous: &RgbImage) -> Result<RgbImage, VisionError> {
		if current.dimensions() != previous.dimensions() {
			return Err(VisionError::DimensionMismatch(current.width(), current.height(), previous.width(), previous.height()));
		}

		let mut out = RgbImage::new(current.width(), current.height());
		out.par_iter_mut()
			.zip(current.as_raw().par_iter().zip(previous.as_raw().par_iter()))
			.for_each(|(out, (a, b))| *out = a.abs_diff(*b));

		Ok(out)
	}

	#[inline]
	fn threshold(&self, image: &GrayImage, threshold: u8) -> GrayImage {
		imageproc::contrast::threshold(image, threshold)
	}

	#[inline]
	fn morphological_close(&self, image: &GrayImage, radius: u8) -> GrayImage {
		imageproc::morphology::close(image, Norm::LInf, radius)
	}

	fn external_contours(&self, image: &GrayImage) -> Vec<Contour> {
		imageproc::contours::find_contours::<i32>(image)
			.into_iter()
			.filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
			.map(|contour| Contour {
				points: contour.points.into_iter().map(|pt| Point::new(pt.x, pt.y)).collect(),
			})
			.collect()
	}

	#[inline]
	fn blur(&self, image: &GrayImage, sigma: f32) -> GrayImage {
		imageproc::filter::gaussian_blur_f32(image, sigma)
	}

	#[inline]
	fn edge_detect(&self, image: &GrayImage, low: f32, high: f32) -> GrayImage {
		imageproc::edges::canny(image, low, high)
	}

	fn hsv_mask(&self, image: &RgbImage, ranges: &[HsvRange]) -> GrayImage {
		let mut out = GrayImage::new(image.width(), image.height());
		out.par_iter_mut()
			.zip(image.as_raw().par_chunks_exact(3))
			.for_each(|(out, rgb)| {
				let hsv = image::Rgb::from_slice(rgb).to_hsv();
				if ranges.iter().any(|range| range.contains(hsv)) {
					*out = 255;
				}
			});
		out
	}
}

#[cfg(test)]
fn square(size: u32, at: (u32, u32), side: u32) -> GrayImage {
	GrayImage::from_fn(size, size, |x, y| {
		if x >= at.0 && x < at.0 + side && y >= at.1 && y < at.1 + side {
			image::Luma([255])
		} else {
			image::Luma([0])
		}
	})
}

#[test]
fn test_external_contours() {
	let ops = CpuImageOps;

	// Hollow square: one outer border, the hole is not reported
	let mut image = square(64, (10, 10), 30);
	for (x, y, px) in image.enumerate_pixels_mut() {
		if (15..35).contains(&x) && (15..35).contains(&y) {
			*px = image::Luma([0]);
		}
	}

	let contours = ops.external_contours(&image);
	assert_eq!(contours.len(), 1);
	assert_eq!(contours[0].bounding_rect(), Some(Rect::new(10, 10, 40, 40)));
	assert!((contours[0].area() - 29.0 * 29.0).abs() < 1.0);
}

#[test]
fn test_abs_diff() {
	let ops = CpuImageOps;

	let a = RgbImage::from_pixel(4, 4, image::Rgb([10, 200, 30]));
	let b = RgbImage::from_pixel(4, 4, image::Rgb([30, 100, 30]));
	let diff = ops.abs_diff(&a, &b).unwrap();
	assert_eq!(diff.get_pixel(2, 2).0, [20, 100, 0]);

	assert!(ops.abs_diff(&a, &RgbImage::new(3, 4)).is_err());
}

#[test]
fn test_close_fills_gaps() {
	let ops = CpuImageOps;

	let mut image = square(32, (8, 8), 12);
	image.put_pixel(14, 14, image::Luma([0]));

	let closed = ops.morphological_close(&ops.threshold(&image, 20), 1);
	assert_eq!(closed.get_pixel(14, 14).0, [255]);
	assert_eq!(closed.get_pixel(2, 2).0, [0]);
}

#[test]
fn test_hsv_mask() {
	let ops = CpuImageOps;

	let mut image = RgbImage::from_pixel(4, 1, image::Rgb([40, 40, 40]));
	image.put_pixel(0, 0, image::Rgb([220, 20, 20]));
	image.put_pixel(1, 0, image::Rgb([220, 20, 60]));
	image.put_pixel(2, 0, image::Rgb([20, 220, 20]));

	let mask = ops.hsv_mask(&image, &reticle_vision_common::consts::RED_HSV_RANGES);
	assert_eq!(mask.as_raw(), &vec![255, 255, 0, 0]);
}
