use reticle_util::Rect;

#[derive(Clone, Copy, Debug)]
pub enum RelativeBound {
	ScreenW(f64),
	ScreenH(f64)
}
impl RelativeBound {
	#[inline]
	pub fn into_absolute(self, screen_size: [u32; 2]) -> u32 {
		match self {
			Self::ScreenW(w) => (w * screen_size[0] as f64).round() as u32,
			Self::ScreenH(h) => (h * screen_size[1] as f64).round() as u32
		}
	}
}

/// A rectangle whose edges are fractions of the screen size
#[derive(Clone, Copy, Debug)]
pub struct RelativeRect {
	pub left: RelativeBound,
	pub top: RelativeBound,
	pub right: RelativeBound,
	pub bottom: RelativeBound
}
impl RelativeRect {
	#[inline]
	pub fn into_absolute(self, screen_size: [u32; 2]) -> Rect<u32> {
		Rect {
			left: self.left.into_absolute(screen_size).min(screen_size[0]),
			top: self.top.into_absolute(screen_size).min(screen_size[1]),
			right: self.right.into_absolute(screen_size).min(screen_size[0]),
			bottom: self.bottom.into_absolute(screen_size).min(screen_size[1])
		}
	}
}

#[test]
fn test_game_area() {
	let area = crate::consts::GAME_AREA.into_absolute([1000, 600]);
	assert_eq!(area, Rect::new(100, 100, 900, 500));
}
