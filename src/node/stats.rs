/// Color of a region. Alpha is ignored throughout.
pub type Color = image::Rgb<u8>;

/// Luma weights applied to the squared red, green and blue differences.
pub const LUMA_WEIGHTS: [f64; 3] = [0.2989, 0.5870, 0.1140];

/// Arithmetic mean of each channel, rounded half up to the nearest integer.
///
/// Returns `None` for an empty sample set; region geometry always yields
/// at least one sample, so callers inside the crate never see that case.
pub fn average_color(samples: &[Color]) -> Option<Color> {
	if samples.is_empty() {
		return None;
	}
	let sums = samples.iter().fold([0u64; 3], |mut acc, c| {
		acc[0] += c.0[0] as u64;
		acc[1] += c.0[1] as u64;
		acc[2] += c.0[2] as u64;
		acc
	});
	let area = samples.len() as u64;
	// (2s + n) / 2n == round(s / n) with halves rounded up
	let channel = |sum: u64| ((2 * sum + area) / (2 * area)) as u8;
	Some(image::Rgb([channel(sums[0]), channel(sums[1]), channel(sums[2])]))
}

/// Weighted squared distance between two colors.
fn weighted_square(a: &Color, b: &Color) -> f64 {
	(0..3).map(|i| {
		let d = a.0[i] as f64 - b.0[i] as f64;
		LUMA_WEIGHTS[i] * d * d
	}).sum()
}

/// Color-fidelity error of `samples` against `reference`.
///
/// This is the square root of the *sum* (not the mean) of the luma-weighted
/// squared channel differences, so larger regions accumulate larger error
/// for the same per-pixel deviation.
pub fn color_error(samples: &[Color], reference: &Color) -> f64 {
	samples.iter()
		.map(|s| weighted_square(s, reference))
		.sum::<f64>()
		.sqrt()
}
