use super::*;
use core::ops::*;

#[inline]
fn partial_min<T: PartialOrd>(a: T, b: T) -> T {
	if b < a { b } else { a }
}

#[inline]
fn partial_max<T: PartialOrd>(a: T, b: T) -> T {
	if b > a { b } else { a }
}

/// Axis-aligned rectangle, `right` and `bottom` exclusive
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect<T> {
	pub left: T,
	pub top: T,
	pub right: T,
	pub bottom: T,
}
impl<T: Copy> Rect<T> {
	#[inline]
	pub const fn new(left: T, top: T, right: T, bottom: T) -> Self {
		Self { left, top, right, bottom }
	}

	#[inline]
	pub fn top_left(&self) -> [T; 2] {
		[self.left, self.top]
	}

	#[inline]
	pub fn bottom_right(&self) -> [T; 2] {
		[self.right, self.bottom]
	}

	#[inline]
	pub fn width(&self) -> T
	where
		T: Sub<Output = T>
	{
		self.right - self.left
	}

	#[inline]
	pub fn height(&self) -> T
	where
		T: Sub<Output = T>
	{
		self.bottom - self.top
	}

	#[inline]
	pub fn area(&self) -> T
	where
		T: Sub<Output = T> + Mul<Output = T>
	{
		self.width() * self.height()
	}

	#[inline]
	pub fn is_empty(&self) -> bool
	where
		T: PartialOrd
	{
		self.right <= self.left || self.bottom <= self.top
	}

	pub fn intersection(&self, other: &Self) -> Option<Self>
	where
		T: PartialOrd
	{
		let rect = Rect {
			left: partial_max(self.left, other.left),
			top: partial_max(self.top, other.top),
			right: partial_min(self.right, other.right),
			bottom: partial_min(self.bottom, other.bottom),
		};
		if rect.is_empty() {
			None
		} else {
			Some(rect)
		}
	}

	/// Smallest rectangle containing both
	pub fn union(&self, other: &Self) -> Self
	where
		T: PartialOrd
	{
		Rect {
			left: partial_min(self.left, other.left),
			top: partial_min(self.top, other.top),
			right: partial_max(self.right, other.right),
			bottom: partial_max(self.bottom, other.bottom),
		}
	}

	#[inline]
	pub fn contains(&self, pt: Point<T>) -> bool
	where
		T: PartialOrd
	{
		pt.x >= self.left && pt.x < self.right && pt.y >= self.top && pt.y < self.bottom
	}

	#[inline]
	pub fn center(&self) -> Point<f32>
	where
		f32: LossyFrom<T>
	{
		let (left, top, right, bottom) = (f32::lossy_from(self.left), f32::lossy_from(self.top), f32::lossy_from(self.right), f32::lossy_from(self.bottom));
		Point::new((left + right) / 2.0, (top + bottom) / 2.0)
	}
}
impl Rect<i32> {
	/// Clamps the rectangle into `[0, width) x [0, height)`
	pub fn clamp_to(&self, width: u32, height: u32) -> Self {
		let (w, h) = (width as i32, height as i32);
		Rect {
			left: self.left.clamp(0, w),
			top: self.top.clamp(0, h),
			right: self.right.clamp(0, w),
			bottom: self.bottom.clamp(0, h),
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Point<T> {
	pub x: T,
	pub y: T,
}
impl<T> Point<T> {
	#[inline]
	pub const fn new(x: T, y: T) -> Self {
		Self { x, y }
	}

	#[inline]
	pub fn distance_sqr(&self, other: &Self) -> f32
	where
		T: Sub<T, Output = T> + Mul<T, Output = T> + Add<T, Output = T> + Copy,
		f32: LossyFrom<T>
	{
		f32::lossy_from((self.x - other.x) * (self.x - other.x) + (self.y - other.y) * (self.y - other.y))
	}
}
impl Point<f32> {
	pub const ZERO: Self = Point::new(0.0, 0.0);

	#[inline]
	pub fn distance(&self, other: &Self) -> f32 {
		self.distance_sqr(other).sqrt()
	}

	#[inline]
	pub fn length(&self) -> f32 {
		self.x.hypot(self.y)
	}

	#[inline]
	pub fn dot(&self, other: &Self) -> f32 {
		self.x * other.x + self.y * other.y
	}

	#[inline]
	pub fn cross(&self, other: &Self) -> f32 {
		self.x * other.y - self.y * other.x
	}

	/// Unit vector, or `None` if the vector is too short to have a direction
	#[inline]
	pub fn normalized(&self) -> Option<Self> {
		let len = self.length();
		if len < f32::EPSILON || !len.is_finite() {
			None
		} else {
			Some(*self / len)
		}
	}

	/// Rotated 90 degrees
	#[inline]
	pub fn perpendicular(&self) -> Self {
		Point::new(-self.y, self.x)
	}

	#[inline]
	pub fn is_finite(&self) -> bool {
		self.x.is_finite() && self.y.is_finite()
	}

	#[inline]
	pub fn lerp(&self, to: Self, t: f32) -> Self {
		*self + (to - *self) * t
	}
}
impl From<Point<i32>> for Point<f32> {
	#[inline]
	fn from(pt: Point<i32>) -> Self {
		Point::new(pt.x as f32, pt.y as f32)
	}
}
impl<T> From<Point<T>> for [T; 2] {
	#[inline]
	fn from(pt: Point<T>) -> Self {
		[pt.x, pt.y]
	}
}
impl<T: Copy> From<[T; 2]> for Point<T> {
	#[inline]
	fn from(pt: [T; 2]) -> Self {
		Point { x: pt[0], y: pt[1] }
	}
}
impl<T> From<(T, T)> for Point<T> {
	#[inline]
	fn from((x, y): (T, T)) -> Self {
		Point { x, y }
	}
}
impl<T: Sub<T, Output = T>> Sub for Point<T> {
	type Output = Point<T>;

	#[inline]
	fn sub(self, rhs: Self) -> Self::Output {
		Point::new(
			self.x - rhs.x,
			self.y - rhs.y
		)
	}
}
impl<T: Mul<T, Output = T> + Copy> Mul<T> for Point<T> {
	type Output = Point<T>;

	#[inline]
	fn mul(self, rhs: T) -> Self::Output {
		Point::new(
			self.x * rhs,
			self.y * rhs
		)
	}
}
impl<T: Div<T, Output = T> + Copy> Div<T> for Point<T> {
	type Output = Point<T>;

	#[inline]
	fn div(self, rhs: T) -> Self::Output {
		Point::new(
			self.x / rhs,
			self.y / rhs
		)
	}
}
impl<T: Add<T, Output = T>> Add for Point<T> {
	type Output = Point<T>;

	#[inline]
	fn add(self, rhs: Self) -> Self::Output {
		Point::new(
			self.x + rhs.x,
			self.y + rhs.y
		)
	}
}
impl<T: AddAssign<T>> AddAssign for Point<T> {
	#[inline]
	fn add_assign(&mut self, rhs: Self) {
		self.x += rhs.x;
		self.y += rhs.y;
	}
}
impl<T: Neg<Output = T>> Neg for Point<T> {
	type Output = Point<T>;

	#[inline]
	fn neg(self) -> Self::Output {
		Point::new(-self.x, -self.y)
	}
}

#[test]
fn test_rect_overlap() {
	let a = Rect::new(100, 100, 150, 200);
	let b = Rect::new(120, 110, 170, 210);

	assert_eq!(a.intersection(&b), Some(Rect::new(120, 110, 150, 200)));
	assert_eq!(a.union(&b), Rect::new(100, 100, 170, 210));
	assert_eq!(a.intersection(&Rect::new(150, 100, 200, 200)), None);
	assert_eq!(a.center(), Point::new(125.0, 150.0));
}
