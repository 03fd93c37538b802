use std::fmt;

/// Reason why a region couldn't be sampled or turned into a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionError {
	/// The region's width or height is zero, negative, or not finite.
	Degenerate,
	/// The region's origin lies outside the image being sampled.
	OutOfBounds,
}

/// Reason why a configuration was rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
	/// The minimum leaf size must be at least one pixel.
	ZeroLeafSize,
	/// The error threshold is negative or NaN.
	InvalidThreshold,
	/// The corner radius is negative or not finite.
	InvalidCornerRadius,
	/// The model update interval is zero.
	ZeroModelInterval,
	/// The view update interval is shorter than the model update interval.
	ViewFasterThanModel,
}

/// Reason why the engine couldn't carry out an operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineError {
	/// No image has been loaded with `reset` yet.
	NoImage,
	/// A node could not be built for a region.
	Region(RegionError),
}

/// Reason why a scheduler couldn't be joined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchedulerError {
	/// One of the scheduler's tasks panicked.
	Panicked,
}

/// Reason why a frame couldn't be exported.
#[derive(Debug)]
pub enum ExportError {
	/// Writing the output failed.
	Io(std::io::Error),
	/// Encoding the output image failed.
	Image(image::ImageError),
}

impl fmt::Display for RegionError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RegionError::Degenerate => f.write_str("region has a non-positive or non-finite size"),
			RegionError::OutOfBounds => f.write_str("region lies outside the image"),
		}
	}
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			ConfigError::ZeroLeafSize => "minimum leaf size must be greater than zero",
			ConfigError::InvalidThreshold => "error threshold must be a non-negative number",
			ConfigError::InvalidCornerRadius => "corner radius must be a non-negative number",
			ConfigError::ZeroModelInterval => "model update interval must be greater than zero",
			ConfigError::ViewFasterThanModel =>
				"view update interval must not be shorter than the model update interval",
		})
	}
}

impl fmt::Display for EngineError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			EngineError::NoImage => f.write_str("no image loaded"),
			EngineError::Region(e) => write!(f, "invalid region: {}", e),
		}
	}
}

impl fmt::Display for SchedulerError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SchedulerError::Panicked => f.write_str("a scheduler task panicked"),
		}
	}
}

impl fmt::Display for ExportError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ExportError::Io(e) => write!(f, "could not write output: {}", e),
			ExportError::Image(e) => write!(f, "could not encode output: {}", e),
		}
	}
}

impl std::error::Error for RegionError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for SchedulerError {}

impl std::error::Error for EngineError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			EngineError::Region(e) => Some(e),
			EngineError::NoImage => None,
		}
	}
}

impl std::error::Error for ExportError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			ExportError::Io(e) => Some(e),
			ExportError::Image(e) => Some(e),
		}
	}
}

impl From<RegionError> for EngineError {
	fn from(e: RegionError) -> Self {
		EngineError::Region(e)
	}
}

impl From<std::io::Error> for ExportError {
	fn from(e: std::io::Error) -> Self {
		ExportError::Io(e)
	}
}

impl From<image::ImageError> for ExportError {
	fn from(e: image::ImageError) -> Self {
		ExportError::Image(e)
	}
}
