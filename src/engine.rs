//! Worst-error-first decomposition of an image into quad regions.
//!
//! The engine keeps the frontier as a flat arena of nodes plus a live set;
//! there are no parent/child links. Splitting the worst region removes it
//! from the live set and appends its four children.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bitvec::vec::BitVec;
use tracing::{debug, info, trace};

use crate::node::error::{ConfigError, EngineError, RegionError};
use crate::node::stats::Color;
use crate::node::{NodeId, QuadNode, Rect};

/// Default bound on the working image's width and height.
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;

/// Color shown "before" the root region, for transition rendering.
pub const ROOT_PREVIOUS_COLOR: Color = image::Rgb([0, 0, 0]);

/// Live flags, indexed by arena position.
type LiveSet = BitVec<bitvec::order::Lsb0, usize>;

/// Parameters of one decomposition run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
	min_leaf_size: u32,
	error_threshold: f64,
	corner_radius: f64,
}

impl Config {
	/// Validates and builds a configuration.
	///
	/// An infinite `error_threshold` is accepted and means "never split".
	/// `corner_radius` is only carried through to renderers.
	pub fn new(min_leaf_size: u32, error_threshold: f64, corner_radius: f64) -> Result<Self, ConfigError> {
		if min_leaf_size == 0 {
			return Err(ConfigError::ZeroLeafSize);
		}
		if error_threshold.is_nan() || error_threshold < 0. {
			return Err(ConfigError::InvalidThreshold);
		}
		if !corner_radius.is_finite() || corner_radius < 0. {
			return Err(ConfigError::InvalidCornerRadius);
		}
		Ok(Config { min_leaf_size, error_threshold, corner_radius })
	}

	/// Regions with a side shorter than this are never split.
	pub fn min_leaf_size(&self) -> u32 {
		self.min_leaf_size
	}

	/// Splitting stops once the worst splittable region's error is below this.
	pub fn error_threshold(&self) -> f64 {
		self.error_threshold
	}

	pub fn corner_radius(&self) -> f64 {
		self.corner_radius
	}
}

impl Default for Config {
	fn default() -> Self {
		Config { min_leaf_size: 12, error_threshold: 420., corner_radius: 0. }
	}
}

/// Lifecycle of the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
	/// Loaded but not running; either fresh from `reset` or paused.
	Idle,
	/// Being stepped by a scheduler.
	Running,
	/// Nothing left worth splitting under the current configuration.
	Stalled,
}

/// Why a step did not split anything.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StallReason {
	/// Every live node is terminal.
	NoCandidates,
	/// The worst splittable node is already good enough.
	Converged { error: f64 },
}

/// Outcome of a single `step`.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
	/// `parent` left the frontier and `children` took its place.
	Split { parent: QuadNode, children: [QuadNode; 4] },
	Stalled(StallReason),
}

/// One region as handed to a renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
	pub id: NodeId,
	pub rect: Rect,
	pub color: Color,
	pub previous_color: Color,
}

/// Read-only view of the frontier at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
	/// Working image width.
	pub width: u32,
	/// Working image height.
	pub height: u32,
	/// Live regions, in no particular order.
	pub shapes: Vec<Shape>,
	/// Error of the most recently split region.
	pub last_error: Option<f64>,
	pub iterations: u64,
	pub corner_radius: f64,
	pub state: State,
}

impl Frame {
	pub fn shape_count(&self) -> usize {
		self.shapes.len()
	}
}

/// Heap entry for a non-terminal live node.
#[derive(Clone, Copy, Debug)]
struct Candidate {
	error: f64,
	id: NodeId,
}

impl Ord for Candidate {
	/// Larger error first; among equal errors, the older node first.
	fn cmp(&self, other: &Self) -> Ordering {
		self.error.total_cmp(&other.error)
			.then_with(|| other.id.cmp(&self.id))
	}
}

impl PartialOrd for Candidate {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for Candidate {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for Candidate {}

/// Scales `(width, height)` down to fit within `max` on both sides,
/// keeping the aspect ratio. Sizes already within bounds are unchanged.
pub fn working_size(width: u32, height: u32, max: u32) -> (u32, u32) {
	if width <= max && height <= max {
		return (width, height);
	}
	let scale = (max as f64 / width as f64).min(max as f64 / height as f64);
	(
		((width as f64 * scale).round() as u32).max(1),
		((height as f64 * scale).round() as u32).max(1),
	)
}

/// The decomposition engine.
#[derive(Debug)]
pub struct Engine {
	config: Config,
	max_dimension: u32,
	image: Option<image::RgbaImage>,
	nodes: Vec<QuadNode>,
	live: LiveSet,
	live_count: usize,
	candidates: BinaryHeap<Candidate>,
	/// First identifier of the current run; arena index is `id - base`.
	base: u64,
	next_id: u64,
	state: State,
	last_error: Option<f64>,
}

impl Engine {
	/// Creates an engine with no image loaded.
	pub fn new(config: Config) -> Self {
		Engine {
			config,
			max_dimension: DEFAULT_MAX_DIMENSION,
			image: None,
			nodes: Vec::new(),
			live: LiveSet::new(),
			live_count: 0,
			candidates: BinaryHeap::new(),
			base: 0,
			next_id: 0,
			state: State::Idle,
			last_error: None,
		}
	}

	/// Sets the bound applied to images passed to later `reset` calls.
	pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
		self.max_dimension = max_dimension.max(1);
		self
	}

	/// Loads `image` (scaled down to the working size if needed) and seeds
	/// the frontier with a single root region covering it.
	///
	/// Leaves the engine `Idle`.
	pub fn reset(&mut self, image: &image::RgbaImage) -> Result<(), EngineError> {
		let (w, h) = working_size(image.width(), image.height(), self.max_dimension);
		if w == 0 || h == 0 {
			return Err(RegionError::Degenerate.into());
		}
		let working = if (w, h) == image.dimensions() {
			image.clone()
		} else {
			image::imageops::resize(image, w, h, image::imageops::FilterType::Triangle)
		};
		info!(
			source_width = image.width(),
			source_height = image.height(),
			width = w,
			height = h,
			"reset decomposition"
		);
		self.image = Some(working);
		self.seed()
	}

	fn seed(&mut self) -> Result<(), EngineError> {
		let image = self.image.as_ref().ok_or(EngineError::NoImage)?;
		let (w, h) = image.dimensions();
		let root = QuadNode::new(
			NodeId(self.next_id),
			Rect::new(0., 0., w as f64, h as f64),
			image,
			ROOT_PREVIOUS_COLOR,
			self.config.min_leaf_size,
		)?;
		self.clear();
		self.next_id += 1;
		self.admit(root);
		self.last_error = None;
		self.state = State::Idle;
		Ok(())
	}

	/// Empties the frontier. Identifiers keep counting up.
	fn clear(&mut self) {
		self.nodes.clear();
		self.live.clear();
		self.live_count = 0;
		self.candidates.clear();
		self.base = self.next_id;
	}

	/// Appends a freshly built node to the arena as a live member.
	fn admit(&mut self, node: QuadNode) {
		debug_assert_eq!(self.index_of(node.id()), self.nodes.len());
		if !node.is_terminal() {
			self.candidates.push(Candidate { error: node.error(), id: node.id() });
		}
		self.nodes.push(node);
		self.live.push(true);
		self.live_count += 1;
	}

	fn index_of(&self, id: NodeId) -> usize {
		(id.0 - self.base) as usize
	}

	/// `Idle` or `Stalled` becomes `Running`.
	pub fn start(&mut self) {
		if self.state != State::Running {
			debug!(from = ?self.state, "start");
			self.state = State::Running;
		}
	}

	/// Pauses a running engine. The frontier is kept as is.
	pub fn stop(&mut self) {
		if self.state == State::Running {
			debug!("stop");
			self.state = State::Idle;
		}
	}

	/// Applies `config`, discards the current decomposition, and starts
	/// again from a single root region.
	///
	/// Without a loaded image this fails and the old configuration stays.
	pub fn restart(&mut self, config: Config) -> Result<(), EngineError> {
		if self.image.is_none() {
			return Err(EngineError::NoImage);
		}
		debug!(?config, "restart");
		self.config = config;
		self.seed()?;
		self.start();
		Ok(())
	}

	/// Splits the live region with the greatest error, unless no region is
	/// worth splitting, in which case the engine becomes `Stalled`.
	///
	/// Terminal regions are never candidates. Equal errors are resolved in
	/// favor of the lowest identifier. A worst error of exactly zero always
	/// counts as converged. Stepping a stalled engine stalls again, and
	/// stepping is allowed in any state so a paused engine can be advanced
	/// by hand.
	pub fn step(&mut self) -> Result<Step, EngineError> {
		let image = self.image.as_ref().ok_or(EngineError::NoImage)?;
		let worst = match self.candidates.peek() {
			Some(c) => *c,
			None => return Ok(self.stall(StallReason::NoCandidates)),
		};
		if worst.error == 0. || worst.error < self.config.error_threshold {
			return Ok(self.stall(StallReason::Converged { error: worst.error }));
		}

		let index = self.index_of(worst.id);
		let parent = self.nodes[index].clone();
		let mut next = self.next_id;
		let children = parent.split(image, self.config.min_leaf_size, || {
			let id = NodeId(next);
			next += 1;
			id
		})?;
		self.next_id = next;

		self.candidates.pop();
		self.live.set(index, false);
		self.live_count -= 1;
		for child in children.iter() {
			self.admit(child.clone());
		}
		self.last_error = Some(parent.error());
		trace!(
			parent = parent.id().0,
			error = parent.error(),
			first_child = children[0].id().0,
			"split"
		);
		Ok(Step::Split { parent, children })
	}

	fn stall(&mut self, reason: StallReason) -> Step {
		if self.state != State::Stalled {
			info!(?reason, shapes = self.live_count, "decomposition stalled");
		}
		self.state = State::Stalled;
		Step::Stalled(reason)
	}

	pub fn state(&self) -> State {
		self.state
	}

	pub fn is_running(&self) -> bool {
		self.state == State::Running
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Dimensions of the working image, if one is loaded.
	pub fn working_size(&self) -> Option<(u32, u32)> {
		self.image.as_ref().map(|i| i.dimensions())
	}

	/// Error of the most recently split region since the last reset.
	pub fn last_error(&self) -> Option<f64> {
		self.last_error
	}

	/// Number of splits since the last reset.
	pub fn iterations(&self) -> u64 {
		(self.nodes.len().saturating_sub(1) / 4) as u64
	}

	/// Number of live regions.
	pub fn shape_count(&self) -> usize {
		self.live_count
	}

	/// A node created since the last reset, live or superseded.
	pub fn node(&self, id: NodeId) -> Option<&QuadNode> {
		if id.0 < self.base {
			return None;
		}
		self.nodes.get(self.index_of(id))
	}

	/// Live regions, oldest first.
	pub fn frontier(&self) -> impl Iterator<Item = &QuadNode> + '_ {
		let live = &self.live;
		self.nodes.iter()
			.enumerate()
			.filter(move |(i, _)| live[*i])
			.map(|(_, n)| n)
	}

	/// Copies the frontier out for a renderer.
	pub fn snapshot(&self) -> Frame {
		let (width, height) = self.working_size().unwrap_or((0, 0));
		Frame {
			width,
			height,
			shapes: self.frontier()
				.map(|n| Shape {
					id: n.id(),
					rect: *n.rect(),
					color: n.color(),
					previous_color: n.previous_color(),
				})
				.collect(),
			last_error: self.last_error,
			iterations: self.iterations(),
			corner_radius: self.config.corner_radius,
			state: self.state,
		}
	}
}
