pub mod node;
pub mod engine;
pub mod export;
pub mod schedule;

pub use node::*;

pub use engine::{Config, Engine, Frame, Shape, StallReason, State, Step};
pub use schedule::{Cadence, Renderer, Scheduler, SchedulerHandle};
