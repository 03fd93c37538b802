use super::error::RegionError;
use super::stats::Color;
use super::Rect;

/// Source of per-pixel samples for rectangular regions of an image.
pub trait PixelSampler {
	/// Width and height of the image, in pixels.
	fn dimensions(&self) -> (u32, u32);
	/// Returns the colors of every pixel covered by `region`, row by row.
	///
	/// Must return an `Err` for degenerate regions and for regions whose
	/// origin is outside the image; never returns an empty `Vec`.
	fn sample(&self, region: &Rect) -> Result<Vec<Color>, RegionError>;
}

/// Integer pixel window `(x, y, width, height)` sampled for `region`.
///
/// The origin is floored and the size truncated, like a canvas read of
/// fractional coordinates, but the window is at least one pixel wide and
/// high and is clamped to the image.
pub fn pixel_window(region: &Rect, dimensions: (u32, u32)) -> Result<(u32, u32, u32, u32), RegionError> {
	if !region.is_valid() {
		return Err(RegionError::Degenerate);
	}
	let (img_w, img_h) = dimensions;
	if region.x < 0. || region.y < 0. ||
		region.x >= img_w as f64 || region.y >= img_h as f64 {
		return Err(RegionError::OutOfBounds);
	}
	let x = region.x.floor() as u32;
	let y = region.y.floor() as u32;
	let w = (region.width.floor() as u32).max(1).min(img_w - x);
	let h = (region.height.floor() as u32).max(1).min(img_h - y);
	Ok((x, y, w, h))
}

impl PixelSampler for image::RgbaImage {
	fn dimensions(&self) -> (u32, u32) {
		image::RgbaImage::dimensions(self)
	}

	fn sample(&self, region: &Rect) -> Result<Vec<Color>, RegionError> {
		let (x, y, w, h) = pixel_window(region, PixelSampler::dimensions(self))?;
		let mut samples = Vec::with_capacity((w * h) as usize);
		for row in y..y + h {
			for col in x..x + w {
				let p = self.get_pixel(col, row).0;
				samples.push(image::Rgb([p[0], p[1], p[2]]));
			}
		}
		Ok(samples)
	}
}
