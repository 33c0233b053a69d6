pub trait GetPixelCheckedPolyfill: image::GenericImageView {
	fn get_pixel_checked(&self, x: u32, y: u32) -> Option<<Self as image::GenericImageView>::Pixel>;
}
impl<I: image::GenericImageView> GetPixelCheckedPolyfill for I {
	#[inline]
	fn get_pixel_checked(&self, x: u32, y: u32) -> Option<<Self as image::GenericImageView>::Pixel> {
		if x >= self.width() || y >= self.height() {
			return None;
		}
		Some(self.get_pixel(x, y))
	}
}

pub trait FastPixelGet: image::GenericImageView {
	fn get_pixel_fast(&self, x: u32, y: u32) -> <Self as image::GenericImageView>::Pixel;
}
impl<I: image::GenericImageView> FastPixelGet for I {
	#[inline]
	#[cfg(debug_assertions)]
	fn get_pixel_fast(&self, x: u32, y: u32) -> <Self as image::GenericImageView>::Pixel {
		self.get_pixel(x, y)
	}

	#[inline]
	#[cfg(not(debug_assertions))]
	fn get_pixel_fast(&self, x: u32, y: u32) -> <Self as image::GenericImageView>::Pixel {
		unsafe { self.unsafe_get_pixel(x, y) }
	}
}

fn hsv(r: u8, g: u8, b: u8) -> (u16, u8, u8) {
	let r = r as f32 / 255.0;
	let g = g as f32 / 255.0;
	let b = b as f32 / 255.0;

	let max = r.max(g.max(b));
	let min = r.min(g.min(b));
	let delta = max - min;

	let h = if max == min {
		0.0
	} else if max == r {
		60.0 * (((g - b) / delta).rem_euclid(6.0))
	} else if max == g {
		60.0 * (((b - r) / delta) + 2.0)
	} else {
		60.0 * (((r - g) / delta) + 4.0)
	};
	let s = if max == 0.0 { 0.0 } else { 100.0 * delta / max };
	let v = 100.0 * max;

	(h as u16, s as u8, v as u8)
}

/// Hue in degrees, saturation and value in percent
pub trait HSV: image::Pixel {
	fn to_hsv(self) -> (u16, u8, u8);
}
impl HSV for image::Rgb<u8> {
	#[inline]
	fn to_hsv(self) -> (u16, u8, u8) {
		hsv(self.0[0], self.0[1], self.0[2])
	}
}
impl HSV for image::Rgba<u8> {
	#[inline]
	fn to_hsv(self) -> (u16, u8, u8) {
		hsv(self.0[0], self.0[1], self.0[2])
	}
}

pub trait RgbDistance {
	/// Euclidean distance in RGB space
	fn rgb_distance(&self, other: &Self) -> f32;
}
impl RgbDistance for image::Rgb<u8> {
	#[inline]
	fn rgb_distance(&self, other: &Self) -> f32 {
		let [dr, dg, db] = [0, 1, 2].map(|c| self.0[c] as f32 - other.0[c] as f32);
		(dr * dr + dg * dg + db * db).sqrt()
	}
}

#[test]
fn test_hsv() {
	assert_eq!(image::Rgb([255u8, 0, 0]).to_hsv(), (0, 100, 100));
	assert_eq!(image::Rgb([0u8, 0, 0]).to_hsv(), (0, 0, 0));
	assert_eq!(image::Rgb([0u8, 255, 0]).to_hsv().0, 120);

	let (h, _, _) = image::Rgb([255u8, 0, 40]).to_hsv();
	assert!(h > 340);

	assert_eq!(image::Rgb([0u8, 0, 0]).rgb_distance(&image::Rgb([3u8, 4, 0])), 5.0);
}
