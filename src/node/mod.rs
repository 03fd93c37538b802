pub mod error;
pub mod sample;
pub mod stats;

use error::RegionError;
use sample::PixelSampler;
use stats::Color;

/// Axis-aligned rectangle in working-image coordinates.
///
/// Coordinates are kept fractional: halving is never snapped to whole
/// pixels, so deep subdivisions stay centered on the true midpoints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
}

impl Rect {
	pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
		Rect { x, y, width, height }
	}

	/// Whether the rectangle has a finite origin and a finite, positive size.
	pub fn is_valid(&self) -> bool {
		self.x.is_finite() && self.y.is_finite() &&
			self.width.is_finite() && self.height.is_finite() &&
			self.width > 0. && self.height > 0.
	}

	pub fn area(&self) -> f64 {
		self.width * self.height
	}

	/// The four quadrants, in the order top-left, top-right, bottom-left,
	/// bottom-right.
	pub fn quadrants(&self) -> [Rect; 4] {
		let hw = self.width / 2.;
		let hh = self.height / 2.;
		[
			Rect::new(self.x, self.y, hw, hh),
			Rect::new(self.x + hw, self.y, hw, hh),
			Rect::new(self.x, self.y + hh, hw, hh),
			Rect::new(self.x + hw, self.y + hh, hw, hh),
		]
	}
}

/// Identifier of a node. Allocated in increasing order and never reused
/// by the engine that allocated it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

/// One rectangular region of the decomposition.
///
/// Every field is fixed at construction; the decomposition changes only by
/// replacing a node with its four children.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadNode {
	id: NodeId,
	rect: Rect,
	color: Color,
	previous_color: Color,
	error: f64,
	terminal: bool,
}

impl QuadNode {
	/// Samples `rect` from `image` and builds a node for it.
	///
	/// `previous_color` is the color the region showed before this node
	/// existed (its parent's color). The node is terminal when either side
	/// is shorter than `min_leaf_size`.
	pub fn new<S: PixelSampler + ?Sized>(
		id: NodeId,
		rect: Rect,
		image: &S,
		previous_color: Color,
		min_leaf_size: u32,
	) -> Result<Self, RegionError> {
		let samples = image.sample(&rect)?;
		let color = stats::average_color(&samples).ok_or(RegionError::Degenerate)?;
		let error = stats::color_error(&samples, &color);
		let min = min_leaf_size as f64;
		Ok(QuadNode {
			id,
			rect,
			color,
			previous_color,
			error,
			terminal: rect.width < min || rect.height < min,
		})
	}

	pub fn id(&self) -> NodeId {
		self.id
	}

	pub fn rect(&self) -> &Rect {
		&self.rect
	}

	/// Mean color of the region.
	pub fn color(&self) -> Color {
		self.color
	}

	pub fn previous_color(&self) -> Color {
		self.previous_color
	}

	/// Color-fidelity error of the region against its own mean color.
	pub fn error(&self) -> f64 {
		self.error
	}

	/// Whether the node is too small to ever be split.
	pub fn is_terminal(&self) -> bool {
		self.terminal
	}

	/// Builds the four children of this node, taking identifiers from
	/// `next_id` in quadrant order.
	///
	/// If any quadrant can't be sampled no children are returned, but
	/// identifiers already taken from `next_id` are not given back.
	pub fn split<S, F>(
		&self,
		image: &S,
		min_leaf_size: u32,
		mut next_id: F,
	) -> Result<[QuadNode; 4], RegionError>
	where
		S: PixelSampler + ?Sized,
		F: FnMut() -> NodeId,
	{
		let [tl, tr, bl, br] = self.rect.quadrants();
		Ok([
			QuadNode::new(next_id(), tl, image, self.color, min_leaf_size)?,
			QuadNode::new(next_id(), tr, image, self.color, min_leaf_size)?,
			QuadNode::new(next_id(), bl, image, self.color, min_leaf_size)?,
			QuadNode::new(next_id(), br, image, self.color, min_leaf_size)?,
		])
	}

	#[cfg(test)]
	pub(crate) fn with_error(id: NodeId, rect: Rect, error: f64, terminal: bool) -> Self {
		QuadNode {
			id,
			rect,
			color: image::Rgb([0, 0, 0]),
			previous_color: image::Rgb([0, 0, 0]),
			error,
			terminal,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn counter() -> impl FnMut() -> NodeId {
		let mut n = 0;
		move || { n += 1; NodeId(n) }
	}

	#[test]
	fn quadrants_tile_the_parent() {
		let r = Rect::new(3., 5., 25., 9.);
		let q = r.quadrants();
		assert_eq!(q[0], Rect::new(3., 5., 12.5, 4.5));
		assert_eq!(q[1], Rect::new(15.5, 5., 12.5, 4.5));
		assert_eq!(q[2], Rect::new(3., 9.5, 12.5, 4.5));
		assert_eq!(q[3], Rect::new(15.5, 9.5, 12.5, 4.5));
		assert_eq!(q.iter().map(Rect::area).sum::<f64>(), r.area());
	}

	#[test]
	fn node_from_uniform_region() {
		let img = image::RgbaImage::from_pixel(10, 10, image::Rgba([128, 64, 32, 255]));
		let n = QuadNode::new(NodeId(1), Rect::new(0., 0., 10., 10.), &img, image::Rgb([0, 0, 0]), 12)
			.unwrap();
		assert_eq!(n.color(), image::Rgb([128, 64, 32]));
		assert_eq!(n.previous_color(), image::Rgb([0, 0, 0]));
		assert_eq!(n.error(), 0.);
		assert!(n.is_terminal());
	}

	#[test]
	fn terminal_when_either_side_is_short() {
		let img = image::RgbaImage::new(16, 16);
		let mk = |w, h| QuadNode::new(NodeId(1), Rect::new(0., 0., w, h), &img, image::Rgb([0, 0, 0]), 8)
			.unwrap()
			.is_terminal();
		assert!(!mk(8., 8.));
		assert!(mk(7.5, 16.));
		assert!(mk(16., 4.));
	}

	#[test]
	fn rejects_degenerate_regions() {
		let img = image::RgbaImage::new(4, 4);
		let r = QuadNode::new(NodeId(1), Rect::new(0., 0., 0., 4.), &img, image::Rgb([0, 0, 0]), 1);
		assert_eq!(r, Err(RegionError::Degenerate));
	}

	#[test]
	fn children_inherit_parent_color() {
		let mut img = image::RgbaImage::from_pixel(8, 8, image::Rgba([255, 255, 255, 255]));
		for y in 0..4 {
			for x in 0..4 {
				img.put_pixel(x, y, image::Rgba([0, 0, 0, 255]));
			}
		}
		let root = QuadNode::new(NodeId(0), Rect::new(0., 0., 8., 8.), &img, image::Rgb([0, 0, 0]), 2)
			.unwrap();
		assert!(root.error() > 0.);
		let children = root.split(&img, 2, counter()).unwrap();
		let ids = children.iter().map(|c| c.id().0).collect::<Vec<_>>();
		assert_eq!(ids, vec![1, 2, 3, 4]);
		assert_eq!(children[0].color(), image::Rgb([0, 0, 0]));
		assert_eq!(children[3].color(), image::Rgb([255, 255, 255]));
		assert!(children.iter().all(|c| c.previous_color() == root.color() && c.error() == 0.));
	}
}
