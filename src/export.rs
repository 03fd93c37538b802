//! Drawing frames as bitmaps or SVG documents.

use std::path::Path;

use crate::engine::{Frame, Shape};
use crate::node::error::ExportError;
use crate::node::stats::Color;
use crate::node::Rect;

/// Every shape is shrunk by this much on each side, leaving a hairline of
/// background between neighbours.
pub const INSET: f64 = 0.25;

fn to_rgba(c: Color) -> image::Rgba<u8> {
	image::Rgba([c.0[0], c.0[1], c.0[2], 255])
}

/// `#rrggbb` form of a color.
pub fn hex(c: Color) -> String {
	format!("#{:02x}{:02x}{:02x}", c.0[0], c.0[1], c.0[2])
}

/// Parses `rrggbb` or `#rrggbb`.
pub fn parse_hex(s: &str) -> Option<Color> {
	let s = s.strip_prefix('#').unwrap_or(s);
	if s.len() != 6 || !s.is_ascii() {
		return None;
	}
	let channel = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok();
	Some(image::Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

/// Whether the point `(px, py)` lies in `rect` once inset and rounded.
fn covers(rect: &Rect, radius: f64, px: f64, py: f64) -> bool {
	let (x0, y0) = (rect.x + INSET, rect.y + INSET);
	let (x1, y1) = (rect.x + rect.width - INSET, rect.y + rect.height - INSET);
	if px < x0 || px >= x1 || py < y0 || py >= y1 {
		return false;
	}
	let r = radius.min((x1 - x0) / 2.).min((y1 - y0) / 2.);
	if r <= 0. {
		return true;
	}
	// Distance to the nearest point of the rectangle shrunk by r
	let cx = px.max(x0 + r).min(x1 - r);
	let cy = py.max(y0 + r).min(y1 - r);
	(px - cx).powi(2) + (py - cy).powi(2) <= r * r
}

fn paint(img: &mut image::RgbaImage, shape: &Shape, radius: f64) {
	let r = &shape.rect;
	let col_end = ((r.x + r.width).ceil().max(0.) as u32).min(img.width());
	let row_end = ((r.y + r.height).ceil().max(0.) as u32).min(img.height());
	let fill = to_rgba(shape.color);
	for row in (r.y.floor().max(0.) as u32)..row_end {
		for col in (r.x.floor().max(0.) as u32)..col_end {
			if covers(r, radius, col as f64 + 0.5, row as f64 + 0.5) {
				img.put_pixel(col, row, fill);
			}
		}
	}
}

/// Paints every shape of `frame` in its current color over `background`.
///
/// Pixels are filled when their center falls inside a shape.
pub fn rasterize(frame: &Frame, background: Color) -> image::RgbaImage {
	let mut img = image::RgbaImage::from_pixel(frame.width, frame.height, to_rgba(background));
	for shape in frame.shapes.iter() {
		paint(&mut img, shape, frame.corner_radius);
	}
	img
}

/// Renders `frame` as a standalone SVG document.
pub fn to_svg(frame: &Frame, background: Color) -> String {
	let mut out = format!(
		"<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {w} {h}\" width=\"{w}\" height=\"{h}\">\n",
		w = frame.width,
		h = frame.height,
	);
	out.push_str(&format!("<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>\n", hex(background)));
	for shape in frame.shapes.iter() {
		let r = &shape.rect;
		out.push_str(&format!(
			"<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"{}\" fill=\"{}\"/>\n",
			r.x + INSET,
			r.y + INSET,
			(r.width - 2. * INSET).max(0.),
			(r.height - 2. * INSET).max(0.),
			frame.corner_radius,
			hex(shape.color),
		));
	}
	out.push_str("</svg>\n");
	out
}

pub fn save_png<P: AsRef<Path>>(frame: &Frame, background: Color, path: P) -> Result<(), ExportError> {
	rasterize(frame, background).save(path)?;
	Ok(())
}

pub fn save_svg<P: AsRef<Path>>(frame: &Frame, background: Color, path: P) -> Result<(), ExportError> {
	std::fs::write(path, to_svg(frame, background))?;
	Ok(())
}
