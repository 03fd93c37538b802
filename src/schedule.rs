//! Periodic drivers for an [`Engine`].
//!
//! A model task performs one step per tick, and a view task hands frontier
//! snapshots to a [`Renderer`] at a coarser cadence. Both share the engine
//! through one mutex, so a snapshot never sees a half-applied split. Both
//! quiesce once the engine leaves the `Running` state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::engine::{Engine, Frame, State, Step};
use crate::node::error::{ConfigError, SchedulerError};

/// An engine shared between the scheduler's tasks and their owner.
pub type SharedEngine = Arc<Mutex<Engine>>;

/// Wraps `engine` for use with a [`Scheduler`].
pub fn share(engine: Engine) -> SharedEngine {
	Arc::new(Mutex::new(engine))
}

/// Locks the engine, recovering it if a task panicked while holding it.
pub fn lock(engine: &Mutex<Engine>) -> MutexGuard<'_, Engine> {
	engine.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tick intervals of the model and view tasks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cadence {
	model: Duration,
	view: Duration,
}

impl Cadence {
	pub fn new(model: Duration, view: Duration) -> Result<Self, ConfigError> {
		if model == Duration::from_secs(0) {
			return Err(ConfigError::ZeroModelInterval);
		}
		if view < model {
			return Err(ConfigError::ViewFasterThanModel);
		}
		Ok(Cadence { model, view })
	}

	pub fn model(&self) -> Duration {
		self.model
	}

	pub fn view(&self) -> Duration {
		self.view
	}
}

impl Default for Cadence {
	fn default() -> Self {
		Cadence {
			model: Duration::from_millis(1),
			view: Duration::from_millis(200),
		}
	}
}

/// Receives frontier snapshots from the view task.
pub trait Renderer {
	fn render(&mut self, frame: &Frame);
}

impl<F: FnMut(&Frame)> Renderer for F {
	fn render(&mut self, frame: &Frame) {
		self(frame)
	}
}

/// Spawns model and view tasks for an engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct Scheduler {
	cadence: Cadence,
	max_steps: Option<u64>,
}

/// What the tasks of a finished scheduler hand back.
#[derive(Debug)]
pub struct Finished<R> {
	/// Splits performed by the model task.
	pub steps: u64,
	pub renderer: R,
}

/// Handle to a running pair of tasks.
#[derive(Debug)]
pub struct SchedulerHandle<R> {
	engine: SharedEngine,
	model: JoinHandle<u64>,
	view: JoinHandle<R>,
}

/// Pauses the engine when the model task ends, however it ends.
struct StopOnExit(SharedEngine);

impl Drop for StopOnExit {
	fn drop(&mut self) {
		lock(&self.0).stop();
	}
}

impl Scheduler {
	pub fn new(cadence: Cadence) -> Self {
		Scheduler { cadence, max_steps: None }
	}

	/// Pauses the engine after `max_steps` splits, for configurations that
	/// would otherwise keep splitting down to single pixels.
	pub fn with_max_steps(mut self, max_steps: u64) -> Self {
		self.max_steps = Some(max_steps);
		self
	}

	pub fn cadence(&self) -> Cadence {
		self.cadence
	}

	/// Starts `engine` and spawns the model and view tasks.
	///
	/// The view task renders one frame right away and a final one after
	/// the engine stops running.
	pub fn spawn<R>(&self, engine: SharedEngine, mut renderer: R) -> std::io::Result<SchedulerHandle<R>>
	where
		R: Renderer + Send + 'static,
	{
		lock(&engine).start();

		let model_engine = Arc::clone(&engine);
		let (interval, max_steps) = (self.cadence.model, self.max_steps);
		let model = thread::Builder::new()
			.name("quadtree-model".to_owned())
			.spawn(move || {
				let _guard = StopOnExit(Arc::clone(&model_engine));
				let mut steps = 0u64;
				loop {
					{
						let mut engine = lock(&model_engine);
						if !engine.is_running() {
							break;
						}
						if max_steps.map_or(false, |m| steps >= m) {
							debug!(steps, "step limit reached");
							engine.stop();
							break;
						}
						match engine.step() {
							Ok(Step::Split { .. }) => steps += 1,
							Ok(Step::Stalled(_)) => break,
							Err(e) => {
								warn!(error = %e, "step failed");
								break;
							}
						}
					}
					thread::sleep(interval);
				}
				debug!(steps, "model task quiesced");
				steps
			});
		let model = match model {
			Ok(handle) => handle,
			Err(e) => {
				lock(&engine).stop();
				return Err(e);
			}
		};

		let view_engine = Arc::clone(&engine);
		let interval = self.cadence.view;
		let view = thread::Builder::new()
			.name("quadtree-view".to_owned())
			.spawn(move || {
				let mut frames = 0u64;
				loop {
					let frame = lock(&view_engine).snapshot();
					renderer.render(&frame);
					frames += 1;
					if frame.state != State::Running {
						break;
					}
					thread::sleep(interval);
				}
				debug!(frames, "view task quiesced");
				renderer
			});
		let view = match view {
			Ok(handle) => handle,
			Err(e) => {
				lock(&engine).stop();
				return Err(e);
			}
		};

		Ok(SchedulerHandle { engine, model, view })
	}
}

impl<R> SchedulerHandle<R> {
	pub fn engine(&self) -> &SharedEngine {
		&self.engine
	}

	/// Asks both tasks to quiesce after their current tick. The frontier is
	/// kept, so the engine can be resumed with another `spawn`.
	pub fn stop(&self) {
		lock(&self.engine).stop();
	}

	/// Waits for both tasks to quiesce.
	pub fn join(self) -> Result<Finished<R>, SchedulerError> {
		let steps = self.model.join().map_err(|_| SchedulerError::Panicked)?;
		let renderer = self.view.join().map_err(|_| SchedulerError::Panicked)?;
		Ok(Finished { steps, renderer })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::Config;

	#[derive(Default)]
	struct Recorder {
		frames: Vec<Frame>,
	}

	impl Renderer for Recorder {
		fn render(&mut self, frame: &Frame) {
			self.frames.push(frame.clone());
		}
	}

	fn fast() -> Cadence {
		Cadence::new(Duration::from_micros(50), Duration::from_millis(2)).unwrap()
	}

	fn noise(size: u32) -> image::RgbaImage {
		image::RgbaImage::from_fn(size, size, |x, y| {
			let v = ((x * 37 + y * 91 + x * y * 13) % 256) as u8;
			image::Rgba([v, v.wrapping_mul(3), 255 - v, 255])
		})
	}

	fn engine_for(img: &image::RgbaImage, config: Config) -> SharedEngine {
		let mut engine = Engine::new(config);
		engine.reset(img).unwrap();
		share(engine)
	}

	#[test]
	fn runs_until_stalled() {
		let engine = engine_for(&noise(64), Config::new(8, 0., 0.).unwrap());
		let handle = Scheduler::new(fast()).spawn(engine, Recorder::default()).unwrap();
		let shared = Arc::clone(handle.engine());
		let finished = handle.join().unwrap();

		let engine = lock(&shared);
		assert_eq!(engine.state(), State::Stalled);
		assert_eq!(finished.steps, engine.iterations());
		let frames = finished.renderer.frames;
		assert!(!frames.is_empty());
		for frame in frames.iter() {
			// every frame is a settled tiling of the working image
			let area: f64 = frame.shapes.iter().map(|s| s.rect.area()).sum();
			assert_eq!(area, 64. * 64.);
			assert_eq!(frame.shapes.len() as u64, 1 + 3 * frame.iterations);
		}
		let last = frames.last().unwrap();
		assert_eq!(last.state, State::Stalled);
		assert_eq!(last.shapes, engine.snapshot().shapes);
	}

	#[test]
	fn step_limit_pauses() {
		let engine = engine_for(&noise(64), Config::new(1, 0., 0.).unwrap());
		let scheduler = Scheduler::new(fast()).with_max_steps(10);
		let finished = scheduler.spawn(Arc::clone(&engine), |_: &Frame| {}).unwrap().join().unwrap();
		assert_eq!(finished.steps, 10);
		let engine = lock(&engine);
		assert_eq!(engine.state(), State::Idle);
		assert_eq!(engine.iterations(), 10);
		assert_eq!(engine.shape_count(), 31);
	}

	#[test]
	fn stop_and_resume_keeps_frontier() {
		let engine = engine_for(&noise(64), Config::new(1, 0., 0.).unwrap());
		let slow = Cadence::new(Duration::from_millis(1), Duration::from_millis(5)).unwrap();
		let handle = Scheduler::new(slow).spawn(Arc::clone(&engine), |_: &Frame| {}).unwrap();
		thread::sleep(Duration::from_millis(20));
		handle.stop();
		let first = handle.join().unwrap().steps;

		let paused = lock(&engine).snapshot();
		assert_eq!(paused.state, State::Idle);
		assert_eq!(paused.iterations, first);

		let handle = Scheduler::new(slow).with_max_steps(3).spawn(Arc::clone(&engine), |_: &Frame| {}).unwrap();
		assert_eq!(handle.join().unwrap().steps, 3);
		let resumed = lock(&engine).snapshot();
		assert_eq!(resumed.iterations, first + 3);
		assert_eq!(resumed.shape_count(), paused.shape_count() + 9);
	}

	#[test]
	fn failed_step_quiesces_both_tasks() {
		// no image loaded, so the first step fails
		let engine = share(Engine::new(Config::default()));
		let handle = Scheduler::new(fast()).spawn(Arc::clone(&engine), Recorder::default()).unwrap();
		let finished = handle.join().unwrap();
		assert_eq!(finished.steps, 0);
		assert_eq!(lock(&engine).state(), State::Idle);
		let last = finished.renderer.frames.last().unwrap();
		assert_eq!(last.state, State::Idle);
		assert!(last.shapes.is_empty());
	}

	#[test]
	fn renderer_panic_is_reported() {
		let solid = image::RgbaImage::from_pixel(16, 16, image::Rgba([7, 7, 7, 255]));
		let engine = engine_for(&solid, Config::new(4, 0., 0.).unwrap());
		let handle = Scheduler::new(fast())
			.spawn(Arc::clone(&engine), |_: &Frame| panic!("renderer failed"))
			.unwrap();
		assert!(matches!(handle.join(), Err(SchedulerError::Panicked)));
		assert_eq!(lock(&engine).state(), State::Stalled);
	}

	#[test]
	fn cadence_validation() {
		let ms = Duration::from_millis;
		assert_eq!(Cadence::new(ms(0), ms(10)), Err(ConfigError::ZeroModelInterval));
		assert_eq!(Cadence::new(ms(10), ms(5)), Err(ConfigError::ViewFasterThanModel));
		assert!(Cadence::new(ms(5), ms(5)).is_ok());
		assert_eq!(Cadence::default().view(), ms(200));
	}
}
