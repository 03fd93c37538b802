use image::error::ImageError;

use quadtree_art::engine::{Config, Engine, Frame};
use quadtree_art::error::ExportError;
use quadtree_art::export;
use quadtree_art::schedule::{self, Cadence, Renderer, Scheduler};
use quadtree_art::stats::Color;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Helper function for `main`.
fn error_exit(msg: &str, code: i32) -> ! {
	eprintln!("{}", msg);
	std::process::exit(code)
}

/// Parses an optional argument, falling back to `default` when absent.
fn arg_or<T: FromStr>(matches: &clap::ArgMatches<'_>, name: &str, default: T) -> T {
	match matches.value_of(name) {
		None => default,
		Some(s) => match s.parse() {
			Ok(n) => n,
			Err(_) => error_exit(&format!("Non-numeric value for {}", name), 2),
		},
	}
}

/// Writes view-update frames as numbered PNGs, if asked to, and logs progress.
struct FrameWriter {
	dir: Option<PathBuf>,
	background: Color,
	written: u64,
	failure: Option<ExportError>,
}

impl Renderer for FrameWriter {
	fn render(&mut self, frame: &Frame) {
		info!(
			iterations = frame.iterations,
			shapes = frame.shape_count(),
			error = frame.last_error.unwrap_or(0.),
			"frame"
		);
		if self.failure.is_some() {
			return;
		}
		if let Some(dir) = &self.dir {
			let path = dir.join(format!("frame_{:05}.png", self.written));
			match export::save_png(frame, self.background, &path) {
				Ok(()) => self.written += 1,
				Err(e) => {
					warn!(path = %path.display(), error = %e, "could not write frame");
					self.failure = Some(e);
				}
			}
		}
	}
}

/// `clap`-based CLI for turning images into quadtree art.
///
/// May exit process with status code if there are errors:
///
/// 1: `clap` error
///
/// 2: invalid arguments
///
/// 3: file I/O issues
///
/// 4: invalid image data
///
/// 5: computation limits exceeded
///
/// 10: other, potentially unknown error
fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with_writer(std::io::stderr)
		.init();

	let clap_matches = clap::App::new("quadtree_art")
		.version("0.1.0")
		.author("vkcz")
		.about("Approximates an image with progressively smaller flat-colored rectangles.")
		.arg_from_usage("-l, --leaf-size=[N] 'Regions narrower or shorter than N pixels are never split; defaults to 12'")
		.arg_from_usage("-e, --error-threshold=[N] 'Stop once the worst splittable region has less error than N; defaults to 420'")
		.arg_from_usage("-r, --corner-radius=[N] 'Corner radius of the drawn rectangles; defaults to 0'")
		.arg_from_usage("-m, --max-size=[N] 'Scale the input down to fit within N pixels on each side; defaults to 1024'")
		.arg_from_usage("-n, --max-steps=[N] 'Stop after N splits even if the error threshold was not reached'")
		.arg_from_usage("--model-interval=[MS] 'Milliseconds between splits; defaults to 1'")
		.arg_from_usage("--view-interval=[MS] 'Milliseconds between rendered frames; defaults to 200'")
		.arg_from_usage("--frames=[DIR] 'Directory to write every rendered frame to as PNG'")
		.arg_from_usage("--svg=[PATH] 'Also write the final result as SVG'")
		.arg_from_usage("--background=[RRGGBB] 'Background color showing between rectangles; defaults to ffffff'")
		.arg_from_usage("<INPUT> 'Path to input image'")
		.arg_from_usage("[OUTPUT] 'Path to output PNG; defaults to INPUT with a .quad.png extension'")
		.get_matches();

	let config = match Config::new(
		arg_or(&clap_matches, "leaf-size", 12),
		arg_or(&clap_matches, "error-threshold", 420.),
		arg_or(&clap_matches, "corner-radius", 0.),
	) {
		Ok(c) => c,
		Err(e) => error_exit(&e.to_string(), 2),
	};
	let cadence = match Cadence::new(
		Duration::from_millis(arg_or(&clap_matches, "model-interval", 1)),
		Duration::from_millis(arg_or(&clap_matches, "view-interval", 200)),
	) {
		Ok(c) => c,
		Err(e) => error_exit(&e.to_string(), 2),
	};
	let background = match clap_matches.value_of("background") {
		None => image::Rgb([255, 255, 255]),
		Some(s) => match export::parse_hex(s) {
			Some(c) => c,
			None => error_exit("Background must be a color like ff8800", 2),
		},
	};

	let input_path = match clap_matches.value_of("INPUT") {
		Some(p) => p,
		None => error_exit("Missing input path", 2),
	};
	let source = match image::open(input_path) {
		Ok(i) => i,
		Err(e) => {
			let (msg, code) = match e {
				ImageError::Decoding(_) | ImageError::Unsupported(_) => ("Invalid image data", 4),
				ImageError::Limits(_) => ("Computation limits exceeded", 5),
				ImageError::IoError(_) => ("File not found or could not be read", 3),
				_ => ("An error occurred", 10)
			};
			error_exit(msg, code)
		}
	}.into_rgba8();

	let mut engine = Engine::new(config).with_max_dimension(arg_or(&clap_matches, "max-size", 1024));
	if let Err(e) = engine.reset(&source) {
		error_exit(&format!("Could not decompose image: {}", e), 4);
	}
	let engine = schedule::share(engine);

	let frames_dir = clap_matches.value_of("frames").map(PathBuf::from);
	if let Some(dir) = &frames_dir {
		if std::fs::create_dir_all(dir).is_err() {
			error_exit("Could not create frames directory", 3);
		}
	}
	let writer = FrameWriter { dir: frames_dir, background, written: 0, failure: None };

	let mut scheduler = Scheduler::new(cadence);
	if let Some(n) = clap_matches.value_of("max-steps") {
		match n.parse() {
			Ok(n) => scheduler = scheduler.with_max_steps(n),
			Err(_) => error_exit("Non-numeric value for max-steps", 2),
		}
	}
	let finished = match scheduler.spawn(engine.clone(), writer) {
		Ok(handle) => match handle.join() {
			Ok(f) => f,
			Err(e) => error_exit(&e.to_string(), 10),
		},
		Err(_) => error_exit("Could not start worker threads", 10),
	};
	if finished.renderer.failure.is_some() {
		error_exit("Could not write to frames directory", 3);
	}

	let frame = schedule::lock(&engine).snapshot();
	eprintln!(
		"Iterations: {} - Shapes: {} - Error: {:.5}",
		frame.iterations,
		frame.shape_count(),
		frame.last_error.unwrap_or(0.)
	);

	let output_path = clap_matches.value_of("OUTPUT")
		.map(PathBuf::from)
		.unwrap_or_else(|| Path::new(input_path).with_extension("quad.png"));
	if export::save_png(&frame, background, &output_path).is_err() {
		error_exit("Could not save output", 3);
	}
	if let Some(svg_path) = clap_matches.value_of("svg") {
		if export::save_svg(&frame, background, svg_path).is_err() {
			error_exit("Could not save SVG output", 3);
		}
	}
}
