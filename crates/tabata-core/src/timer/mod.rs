mod accumulator;
mod engine;

#[cfg(test)]
mod properties_tests;

pub use accumulator::ActiveTimeAccumulator;
pub use engine::{TimerEngine, TimerState};
